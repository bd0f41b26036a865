// crates/go-transformer-cli/src/main.rs
// ============================================================================
// Module: Go Transformer CLI Entry Point
// Description: Host process for one build or test invocation.
// Purpose: Resolve flags and env overrides, then run the task.
// Dependencies: clap, go-transformer-config, go-transformer-core, thiserror
// ============================================================================

//! ## Overview
//! `go-transformer` reads an input manifest holding a golang-source contract
//! and writes an output manifest holding executable or test-run contracts.
//! Every flag falls back to an uppercase environment variable of the same
//! name when it is not given on the command line. Progress goes to stderr as
//! JSON lines; a failure ends with one plain diagnostic line and a non-zero
//! exit status.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Parser;
use clap::builder::BoolishValueParser;
use go_transformer_config::TransformerConfig;
use go_transformer_core::InstallerRegistry;
use go_transformer_core::RunMode;
use go_transformer_core::StderrLogSink;
use go_transformer_core::SystemCommandRunner;
use go_transformer_core::TaskContext;
use go_transformer_core::TaskLogEvent;
use go_transformer_core::TaskLogSink;
use go_transformer_core::TaskOptions;
use go_transformer_core::legacy_root_from_env;
use go_transformer_core::run_task;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Definitions
// ============================================================================

/// Go source to executable / test-run transformer.
#[derive(Parser, Debug)]
#[command(name = "go-transformer", disable_help_subcommand = true)]
struct Cli {
    /// Input manifest path.
    #[arg(long, env = "INPUT", default_value = "./input/input-contract.json")]
    input: PathBuf,
    /// Output manifest path.
    #[arg(long, env = "OUTPUT", default_value = "./output/output-manifest.json")]
    output: PathBuf,
    /// What to do: `build` or `test`.
    #[arg(long, env = "MODE", default_value = "build")]
    mode: String,
    /// Artifact directory, relative to the output manifest's directory.
    #[arg(long = "outputArtifactDirectory", env = "OUTPUTARTIFACTDIRECTORY", default_value = "artifacts")]
    output_artifact_directory: String,
    /// Be verbose.
    #[arg(long, env = "DEBUG", action = ArgAction::SetTrue, value_parser = BoolishValueParser::new())]
    debug: bool,
    /// Optional TOML configuration (falls back to `GO_TRANSFORMER_CONFIG`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error carrying the final diagnostic.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Resolves settings and runs one task.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let log = StderrLogSink::new(cli.debug);
    log.record(
        &TaskLogEvent::info("settings", "effective settings")
            .with_field("input", cli.input.display().to_string())
            .with_field("output", cli.output.display().to_string())
            .with_field("mode", cli.mode.clone())
            .with_field("outputArtifactDirectory", cli.output_artifact_directory.clone())
            .with_field("debug", cli.debug.to_string()),
    );

    let mode = parse_mode(&cli.mode)?;
    let config = TransformerConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    let installers = InstallerRegistry::with_builtin_installers();
    let ctx = TaskContext {
        config: &config,
        runner: &SystemCommandRunner,
        installers: &installers,
        log: &log,
        legacy_root: legacy_root_from_env(),
    };
    let options = TaskOptions {
        input_path: cli.input,
        output_path: cli.output,
        mode,
        output_artifact_directory: cli.output_artifact_directory,
        debug: cli.debug,
    };
    run_task(&ctx, &options).map_err(|err| CliError::new(err.to_string()))?;
    Ok(ExitCode::SUCCESS)
}

/// Maps the `--mode` value onto a run mode.
fn parse_mode(mode: &str) -> CliResult<RunMode> {
    match mode {
        "build" => Ok(RunMode::Build),
        "test" => Ok(RunMode::Test),
        other => Err(CliError::new(format!("unknown mode {other:?}"))),
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message as one stderr line and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let line = message.lines().map(str::trim).filter(|part| !part.is_empty()).collect::<Vec<_>>();
    let _ = write_stderr_line(&line.join("; "));
    ExitCode::FAILURE
}
