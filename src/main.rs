//! Multi-agent coding pipeline CLI.
//!
//! A Coder, a Reviewer and an Executor agent cooperate on one coding task:
//! the Coder asks the completion service for Python code, the Reviewer
//! judges it, the Executor runs it in a sandboxed interpreter, and the
//! Orchestrator retries with error feedback until the task succeeds or the
//! retry bound is hit.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use roundtable::agents::generator::CompletionGenerator;
use roundtable::agents::reviewer::CompletionReviewer;
use roundtable::agents::runner::SandboxRunner;
use roundtable::core::types::{ExecutionOutcome, Task};
use roundtable::exit_codes;
use roundtable::io::completion::GroqClient;
use roundtable::io::config::{API_KEY_ENV, RoundtableConfig, load_config, require_api_key};
use roundtable::io::console::ConsoleNarrator;
use roundtable::io::readme::update_output_section;
use roundtable::io::sandbox::Sandbox;
use roundtable::io::session_log::allocate_session_dir;
use roundtable::logging;
use roundtable::pipeline::{PipelineConfig, PipelineOutcome, PipelineStop, run_task};

/// Canned task for `roundtable demo`.
const DEMO_TASK: &str = "Write a Python function that calculates the 10th Fibonacci number";

#[derive(Parser)]
#[command(name = "roundtable", version, about = "Multi-agent coding pipeline demo")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, global = true, default_value = "roundtable.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the canned Fibonacci scenario with a deliberate first-attempt gap.
    Demo,
    /// Solve an arbitrary task and record the output.
    Run {
        /// Natural-language description of the code to produce.
        task: String,
        /// Override the configured retry bound.
        #[arg(long)]
        max_tries: Option<u32>,
        /// Markdown file receiving the latest-output section.
        #[arg(long, default_value = "README.md")]
        readme: PathBuf,
        /// Skip updating the markdown file.
        #[arg(long)]
        no_readme: bool,
    },
    /// Verify config, API key and sandbox interpreter.
    Check,
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Demo => cmd_demo(&cli.config),
        Command::Run {
            task,
            max_tries,
            readme,
            no_readme,
        } => cmd_run(&cli.config, &task, max_tries, &readme, no_readme),
        Command::Check => cmd_check(&cli.config),
    }
}

fn cmd_demo(config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let api_key = require_api_key()?;

    show_intro();
    let outcome = run_pipeline(&cfg, &api_key, DEMO_TASK, cfg.max_tries, true)?;
    render_final_result(&outcome.outcome);
    Ok(exit_code_for(outcome.stop))
}

fn cmd_run(
    config_path: &Path,
    task: &str,
    max_tries: Option<u32>,
    readme: &Path,
    no_readme: bool,
) -> Result<i32> {
    let cfg = load_config(config_path)?;
    let api_key = require_api_key()?;
    let max_tries = max_tries.unwrap_or(cfg.max_tries);
    if max_tries == 0 {
        bail!("max_tries must be >= 1");
    }

    let outcome = run_pipeline(&cfg, &api_key, task, max_tries, false)?;

    let (succeeded, text) = match &outcome.outcome {
        ExecutionOutcome::Success { output } => (true, output.as_str()),
        ExecutionOutcome::Failure { detail, .. } => (false, detail.as_str()),
    };
    println!("\n{}", "=".repeat(60));
    if succeeded {
        println!("\u{2705} Result: {text}");
    } else {
        println!("\u{274c} Error: {text}");
    }
    println!("{}", "=".repeat(60));

    if !no_readme {
        update_output_section(readme, text)?;
        println!("\n\u{2705} {} updated with latest output!\n", readme.display());
    }
    Ok(exit_code_for(outcome.stop))
}

fn cmd_check(config_path: &Path) -> Result<i32> {
    let cfg = load_config(config_path)?;
    println!(
        "check: config ok (model={}, max_tries={})",
        cfg.model, cfg.max_tries
    );

    require_api_key()?;
    println!("check: {API_KEY_ENV} present");

    let output = std::process::Command::new(&cfg.sandbox.python_bin)
        .arg("--version")
        .output()
        .with_context(|| {
            format!(
                "run `{} --version`; set sandbox.python_bin in {}",
                cfg.sandbox.python_bin,
                config_path.display()
            )
        })?;
    if !output.status.success() {
        bail!(
            "`{} --version` exited with {:?}",
            cfg.sandbox.python_bin,
            output.status.code()
        );
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let version = stdout.trim();
    let version = if version.is_empty() {
        stderr.trim()
    } else {
        version
    };
    println!("check: interpreter ok ({version})");
    Ok(exit_codes::OK)
}

/// Wire the agents to one completion client and session directory, then run.
fn run_pipeline(
    cfg: &RoundtableConfig,
    api_key: &str,
    task: &str,
    max_tries: u32,
    demo_gap: bool,
) -> Result<PipelineOutcome> {
    let client = GroqClient::new(
        api_key,
        &cfg.model,
        Duration::from_secs(cfg.request_timeout_secs),
    )?;
    let narrator = ConsoleNarrator;
    let session_dir = allocate_session_dir(&cfg.artifacts_dir)?;

    let generator = CompletionGenerator::new(&client, &narrator, cfg.generator.clone(), demo_gap);
    let reviewer = CompletionReviewer::new(&client, &narrator, cfg.reviewer.clone());
    let sandbox = Sandbox::new(
        &cfg.sandbox.python_bin,
        Duration::from_secs(cfg.sandbox.timeout_secs),
        cfg.sandbox.memory_limit_mb,
        cfg.sandbox.output_limit_bytes,
    );
    let runner = SandboxRunner::new(sandbox, &narrator, &session_dir);

    println!("Agents ready!");
    println!("\n{}", "=".repeat(60));
    println!("  Starting Multi-Agent Workflow");
    println!("{}", "=".repeat(60));

    let config = PipelineConfig {
        max_tries,
        session_dir,
    };
    run_task(
        &Task::new(task),
        &generator,
        &reviewer,
        &runner,
        &narrator,
        &config,
    )
}

fn show_intro() {
    println!("\n{}", "=".repeat(60));
    println!("  Roundtable Multi-Agent Demo - AI Teamwork in Action");
    println!("{}", "=".repeat(60));
    println!("\nWhat you're about to see:");
    println!("\u{2022} Coder Agent writes Python code");
    println!("\u{2022} Reviewer Agent checks the code quality");
    println!("\u{2022} Executor Agent runs it safely");
    println!("\u{2022} They work together, fixing mistakes automatically");
    println!("\nThis is way better than asking one AI to do everything!");
    println!("\nUsing: Groq (free & super fast) + Llama 3.1");
    println!("{}", "=".repeat(60));
}

fn render_final_result(outcome: &ExecutionOutcome) {
    println!("\n{}", "=".repeat(60));
    println!("  Final Result");
    println!("{}", "=".repeat(60));
    match outcome {
        ExecutionOutcome::Success { output } => {
            println!("\n\u{2705} Success! Here's what we got:\n");
            println!("   {output}");
        }
        ExecutionOutcome::Failure { detail, .. } => {
            println!("\n\u{274c} Couldn't complete the task:");
            println!("   {detail}");
        }
    }
    println!("{}\n", "=".repeat(60));
}

fn exit_code_for(stop: PipelineStop) -> i32 {
    match stop {
        PipelineStop::Succeeded => exit_codes::OK,
        PipelineStop::ExhaustedRetries => exit_codes::TASK_FAILED,
    }
}
