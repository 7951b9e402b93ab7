//! Binary entry point for the apicheck CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Compare two API snapshots
//! apicheck check --baseline api/current.json --candidate build/api.json
//!
//! # Same, as JSON, with the added surface
//! apicheck --format json check --baseline old/ --candidate new/ --delta
//!
//! # Print the visible API of one snapshot
//! apicheck surface --snapshot build/api.json
//! ```
//!
//! Exit status is 0 when no diagnostic is reported at error severity, 1 when
//! at least one is, and the `OutputErrorCode` of any failure otherwise.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use apicheck::cli::{run_check, run_surface, CheckArgs, OutputFormat, SurfaceArgs};
use apicheck::config::{CliOverrides, ResolvedConfig};
use apicheck_core::compat::DiagnosticKind;
use apicheck_core::error::{ApiError, OutputErrorCode};
use apicheck_core::output::{emit_response, ErrorResponse};
use apicheck_core::visibility::ShowLevel;

// ============================================================================
// CLI Structure
// ============================================================================

/// Binary compatibility checker for Java-style API snapshots.
#[derive(Parser, Debug)]
#[command(name = "apicheck", version, about = "Check API snapshots for incompatible changes")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// JSON config file (show level, hidden packages, severities).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Visibility flags shared by `check` and `surface`.
#[derive(clap::Args, Debug, Clone, Default)]
struct VisibilityArgs {
    /// Lowest visibility that is part of the API.
    #[arg(long, value_parser = parse_show_level)]
    show_level: Option<ShowLevel>,

    /// Hide packages matching a glob (repeatable).
    #[arg(long = "hide-package", value_name = "GLOB")]
    hide_packages: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compare a baseline snapshot against a candidate.
    Check {
        /// Snapshot file or directory of the released API.
        #[arg(long)]
        baseline: PathBuf,

        /// Snapshot file or directory of the new API.
        #[arg(long)]
        candidate: PathBuf,

        #[command(flatten)]
        visibility: VisibilityArgs,

        /// Skip the type diff for a qualified type name (repeatable).
        #[arg(long = "ignore-type", value_name = "QNAME")]
        ignore_types: Vec<String>,

        /// Report a diagnostic kind as an error (name or code, repeatable).
        #[arg(long, value_name = "KIND", value_parser = parse_kind)]
        error: Vec<DiagnosticKind>,

        /// Report a diagnostic kind as a warning (name or code, repeatable).
        #[arg(long, value_name = "KIND", value_parser = parse_kind)]
        warning: Vec<DiagnosticKind>,

        /// Do not report a diagnostic kind (name or code, repeatable).
        #[arg(long, value_name = "KIND", value_parser = parse_kind)]
        hide: Vec<DiagnosticKind>,

        /// Include added types and members in the report.
        #[arg(long)]
        delta: bool,

        /// Check packages in parallel.
        #[arg(long)]
        parallel: bool,
    },
    /// Print the visible API of one snapshot.
    Surface {
        /// Snapshot file or directory.
        #[arg(long)]
        snapshot: PathBuf,

        #[command(flatten)]
        visibility: VisibilityArgs,
    },
}

fn parse_show_level(s: &str) -> Result<ShowLevel, String> {
    s.parse().map_err(|e: ApiError| e.to_string())
}

fn parse_kind(s: &str) -> Result<DiagnosticKind, String> {
    s.parse().map_err(|e: ApiError| e.to_string())
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level);

    match execute(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors go to stdout as JSON so callers parse one stream.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Execute the CLI command. Returns whether the run passed.
fn execute(cli: Cli) -> Result<bool, ApiError> {
    let format = cli.global.format;
    let mut stdout = io::stdout();
    let passed = match cli.command {
        Command::Check {
            baseline,
            candidate,
            visibility,
            ignore_types,
            error,
            warning,
            hide,
            delta,
            parallel,
        } => {
            let overrides = CliOverrides {
                config: cli.global.config,
                show_level: visibility.show_level,
                hidden_packages: visibility.hide_packages,
                ignore_types,
                parallel,
                errors: error,
                warnings: warning,
                hidden: hide,
            };
            let config = ResolvedConfig::resolve(&overrides)?;
            let args = CheckArgs {
                baseline,
                candidate,
                delta,
                format,
            };
            run_check(&args, &config, &mut stdout)?.passed
        }
        Command::Surface {
            snapshot,
            visibility,
        } => {
            let overrides = CliOverrides {
                config: cli.global.config,
                show_level: visibility.show_level,
                hidden_packages: visibility.hide_packages,
                ..CliOverrides::default()
            };
            let config = ResolvedConfig::resolve(&overrides)?;
            run_surface(&SurfaceArgs { snapshot, format }, &config, &mut stdout)?;
            true
        }
    };
    let _ = stdout.flush();
    Ok(passed)
}
