//! Process configuration loaded from `roundtable.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Environment variable holding the completion API key.
///
/// This is the one secret the process needs. It is read exactly once at
/// startup and passed into constructors; components never consult the
/// environment themselves.
pub const API_KEY_ENV: &str = "GROQ_KEY";

/// Pipeline configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable.
/// Missing fields default to the canned demo values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoundtableConfig {
    /// Model id sent with every completion request.
    pub model: String,

    /// Attempt bound for the generate/review/execute loop.
    pub max_tries: u32,

    /// Wall-clock budget for one completion HTTP request, in seconds.
    pub request_timeout_secs: u64,

    /// Directory receiving per-attempt artifacts.
    pub artifacts_dir: PathBuf,

    pub generator: StageParams,
    pub reviewer: StageParams,
    pub sandbox: SandboxConfig,
}

/// Sampling parameters for one completion-backed stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StageParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SandboxConfig {
    /// Interpreter used to run candidates.
    pub python_bin: String,

    /// Wall-clock budget per execution, in seconds. The child is killed on
    /// overrun.
    pub timeout_secs: u64,

    /// Best-effort address-space ceiling for the interpreter, in MiB.
    pub memory_limit_mb: u32,

    /// Truncate captured sandbox stdout/stderr beyond this many bytes.
    /// Also the budget the driver fits its report line into.
    pub output_limit_bytes: usize,
}

impl Default for RoundtableConfig {
    fn default() -> Self {
        Self {
            model: "llama-3.1-8b-instant".to_string(),
            max_tries: 3,
            request_timeout_secs: 60,
            artifacts_dir: PathBuf::from(".roundtable"),
            generator: StageParams {
                temperature: 0.7,
                max_tokens: 800,
            },
            reviewer: StageParams {
                temperature: 0.3,
                max_tokens: 200,
            },
            sandbox: SandboxConfig::default(),
        }
    }
}

impl Default for StageParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 800,
        }
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            python_bin: "python3".to_string(),
            timeout_secs: 10,
            memory_limit_mb: 256,
            output_limit_bytes: 100_000,
        }
    }
}

impl RoundtableConfig {
    pub fn validate(&self) -> Result<()> {
        if self.model.trim().is_empty() {
            return Err(anyhow!("model must be non-empty"));
        }
        if self.max_tries == 0 {
            return Err(anyhow!("max_tries must be >= 1"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("request_timeout_secs must be > 0"));
        }
        for (name, stage) in [("generator", &self.generator), ("reviewer", &self.reviewer)] {
            if !(0.0..=2.0).contains(&stage.temperature) {
                return Err(anyhow!("{name}.temperature must be within 0.0..=2.0"));
            }
            if stage.max_tokens == 0 {
                return Err(anyhow!("{name}.max_tokens must be > 0"));
            }
        }
        if self.sandbox.python_bin.trim().is_empty() {
            return Err(anyhow!("sandbox.python_bin must be non-empty"));
        }
        if self.sandbox.timeout_secs == 0 {
            return Err(anyhow!("sandbox.timeout_secs must be > 0"));
        }
        if self.sandbox.memory_limit_mb == 0 {
            return Err(anyhow!("sandbox.memory_limit_mb must be > 0"));
        }
        if self.sandbox.output_limit_bytes < 4096 {
            return Err(anyhow!("sandbox.output_limit_bytes must be at least 4096"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `RoundtableConfig::default()`.
pub fn load_config(path: &Path) -> Result<RoundtableConfig> {
    if !path.exists() {
        let cfg = RoundtableConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: RoundtableConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Read the completion API key from the environment.
///
/// A missing or empty key is a fatal configuration error, reported before
/// any pipeline work starts.
pub fn require_api_key() -> Result<String> {
    match std::env::var(API_KEY_ENV) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(anyhow!(
            "missing {API_KEY_ENV}: get a free key at https://console.groq.com/ and `export {API_KEY_ENV}=<key>`"
        )),
    }
}
