//! Forge - interactive script runner
//! Command-line interface for running, rewriting, checking and formatting Forge scripts

use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{ArgAction, Parser, Subcommand};
use colored::*;
use forge_core::{check, format, rewrite, ForgeConfig, RewriteResult};
use forge_runtime::{RuntimeConfig, ScriptHost};
use forge_term::{
    ControllerConfig, ExecutionController, RunState, StartOutcome, TerminalBridge, TerminalEvent,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "forge")]
#[command(author = "Forge Contributors")]
#[command(version = "2026.1.16")]
#[command(about = "Forge - run scripts interactively", long_about = None)]
struct Cli {
    /// Path to forge.toml (default: searched upward from the script's directory)
    #[arg(long, global = true, value_name = "FILE", env = "FORGE_CONFIG")]
    config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a script, answering its input prompts from stdin
    Run {
        /// Script file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Write the final terminal snapshot as JSON
        #[arg(long, value_name = "PATH")]
        transcript: Option<PathBuf>,

        /// Print a `$ forge run <file>` banner first
        #[arg(long)]
        banner: bool,
    },

    /// Print the suspendable form of a script
    Rewrite {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Check syntax without running
    Check {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },

    /// Print a script in canonical layout
    Fmt {
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Only report whether the file is already formatted
        #[arg(long)]
        check: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match &cli.command {
        Commands::Run { input, transcript, banner } => {
            run_command(input, cli.config.as_deref(), transcript.as_deref(), *banner).await
        }
        Commands::Rewrite { input } => rewrite_command(input, cli.config.as_deref()),
        Commands::Check { input } => check_command(input),
        Commands::Fmt { input, check } => fmt_command(input, cli.config.as_deref(), *check),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "forge_term=debug,forge_runtime=debug,forge=debug,warn",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// forge.toml from `--config`, or discovered next to the script
fn load_config(explicit: Option<&Path>, input: &Path) -> anyhow::Result<ForgeConfig> {
    if let Some(path) = explicit {
        return Ok(ForgeConfig::from_file(path)?);
    }
    let start = input
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let (config, found) = ForgeConfig::discover(&start)?;
    if let Some(path) = found {
        tracing::debug!(path = %path.display(), "loaded config");
    }
    Ok(config)
}

fn read_source(input: &Path) -> anyhow::Result<String> {
    fs::read_to_string(input).with_context(|| format!("Failed to read {}", input.display()))
}

// ============================================================================
// run
// ============================================================================

async fn run_command(
    input: &Path,
    config_path: Option<&Path>,
    transcript: Option<&Path>,
    banner: bool,
) -> anyhow::Result<bool> {
    let config = load_config(config_path, input)?;
    let source = read_source(input)?;
    let script_name = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    let mut controller_config = ControllerConfig::from_forge(&config, &script_name);
    if banner {
        controller_config.banner = Some(format!("$ forge run {}", script_name));
    }

    let host = Arc::new(ScriptHost::new(RuntimeConfig::from(&config.runtime)));
    let bridge = TerminalBridge::new(&config.terminal.echo_prefix);
    let controller = ExecutionController::new(host, bridge.clone(), controller_config);

    if !controller.boot().await {
        bail!("{}", bridge.state());
    }

    let mut events = bridge.subscribe();
    match controller.start(&source) {
        StartOutcome::Started => {}
        outcome => bail!("run did not start: {:?}", outcome),
    }

    // A terminal already shows what the user typed
    let show_echo = !std::io::stdin().is_terminal();
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut echo_next = false;

    let final_state = loop {
        match events.recv().await {
            Ok(TerminalEvent::Output(chunk)) => {
                if echo_next {
                    if show_echo {
                        println!("{}", chunk.dimmed());
                    }
                    echo_next = false;
                } else {
                    println!("{}", chunk);
                }
            }
            Ok(TerminalEvent::AwaitingInput(_)) => match stdin.next_line().await? {
                Some(line) => {
                    echo_next = controller.submit_line(&line);
                }
                None => {
                    controller.clear();
                    bail!("stdin closed while the script was waiting for input");
                }
            },
            Ok(TerminalEvent::StateChanged(state)) if state.is_settled() => break state,
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "terminal fell behind; some output was not shown");
            }
            Err(RecvError::Closed) => break bridge.state(),
        }
    };

    if let Some(path) = transcript {
        let json = bridge.snapshot().to_json()?;
        fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(final_state == RunState::Finished)
}

// ============================================================================
// rewrite / check / fmt
// ============================================================================

fn rewrite_command(input: &Path, config_path: Option<&Path>) -> anyhow::Result<bool> {
    let config = load_config(config_path, input)?;
    let source = read_source(input)?;

    match rewrite(&source, &config.rewrite) {
        RewriteResult::Ok(unit) => {
            print!("{}", unit.source);
            tracing::debug!(suspension_points = unit.suspension_points, "rewrote script");
            Ok(true)
        }
        RewriteResult::Failed(diagnostic) => {
            eprintln!("{} {}", "error:".red().bold(), diagnostic);
            Ok(false)
        }
    }
}

fn check_command(input: &Path) -> anyhow::Result<bool> {
    let source = read_source(input)?;

    match check(&source) {
        Ok(program) => {
            println!(
                "{} {} ({} statements)",
                "✓".green().bold(),
                input.display().to_string().cyan(),
                program.stmts.len()
            );
            Ok(true)
        }
        Err(errors) => {
            for error in errors.errors() {
                eprintln!("{} {}: {}", "error:".red().bold(), input.display(), error);
            }
            eprintln!("{} {} error(s)", "Found".red().bold(), errors.len());
            Ok(false)
        }
    }
}

fn fmt_command(input: &Path, config_path: Option<&Path>, check_only: bool) -> anyhow::Result<bool> {
    let config = load_config(config_path, input)?;
    let source = read_source(input)?;
    let formatted = format(&source, &config.format)?;

    if !check_only {
        print!("{}", formatted);
        return Ok(true);
    }
    if formatted == source {
        println!("{} {}", "Formatted".green().bold(), input.display());
        Ok(true)
    } else {
        println!("{} {}", "Would reformat".yellow().bold(), input.display());
        Ok(false)
    }
}
