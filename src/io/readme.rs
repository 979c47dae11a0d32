//! README persistence for the latest pipeline output.
//!
//! The only cross-run state this program keeps: one delimited section of a
//! markdown file, replaced in place on every update. Consumed by the outer
//! CLI; the pipeline core never touches it.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub const START_MARKER: &str = "<!-- AUTO_GEN_OUTPUT_START -->";
pub const END_MARKER: &str = "<!-- AUTO_GEN_OUTPUT_END -->";

const DEFAULT_CONTENT: &str = "# Roundtable Demo\n\n## Latest Output\n";

/// Write `output_text` into the delimited section of the file at `path`.
///
/// If both markers are present the section between them is replaced and
/// everything outside it is preserved. Otherwise a fresh section is appended
/// under a `## Latest Output` header. A missing file is created first.
/// Replacing with identical text is idempotent.
pub fn update_output_section(path: &Path, output_text: &str) -> Result<()> {
    let content = if path.exists() {
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?
    } else {
        DEFAULT_CONTENT.to_string()
    };

    let new_section = format!("{START_MARKER}\n```\n{output_text}\n```\n{END_MARKER}");

    let updated = if let Some(start_idx) = content.find(START_MARKER)
        && let Some(end_rel) = content[start_idx..].find(END_MARKER)
    {
        let end_idx = start_idx + end_rel + END_MARKER.len();
        let mut updated =
            String::with_capacity(content.len() + new_section.len());
        updated.push_str(&content[..start_idx]);
        updated.push_str(&new_section);
        updated.push_str(&content[end_idx..]);
        updated
    } else {
        format!("{content}\n\n## Latest Output\n{new_section}\n")
    };

    write_atomic(path, &updated)
}

/// Atomically replace the file (temp file + rename).
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("invalid file name {}", path.display()))?;
    let tmp_path = path.with_file_name(format!("{file_name}.tmp"));
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp file {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
