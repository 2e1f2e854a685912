// crates/interface-tester-cli/src/main.rs
// ============================================================================
// Module: Interface Tester CLI Entry Point
// Description: Command dispatcher for catalog reporting and linting.
// Purpose: Inspect an interface catalog without a component runtime.
// Dependencies: clap, interface-tester, interface-tester-config, thiserror,
//               tracing, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `interface-tester` binary works on the catalog alone:
//!
//! - `collect` prints, per interface, version, and role, the registered tests,
//!   the schema status, and the components listed in `charms.yaml`;
//! - `check` loads every schema and test manifest and exits non-zero when any
//!   of them fails to load.
//!
//! Running tests against a component needs a runtime implementation and is
//! done from a harness through the library.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use interface_tester::CatalogReport;
use interface_tester::IncludePattern;
use interface_tester::report;
use interface_tester_config::LogLevel;
use interface_tester_config::TesterConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "interface-tester", version, disable_help_subcommand = true)]
struct Cli {
    /// Path to `interface-tester.toml` (overrides `INTERFACE_TESTER_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Log level written to stderr (overrides the config file).
    #[arg(long, value_enum, value_name = "LEVEL", global = true)]
    log_level: Option<LogLevelArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the tests, schemas, and components of every interface.
    Collect(CatalogArgs),
    /// Load every schema and test manifest and report failures.
    Check(CatalogArgs),
}

/// Catalog selection shared by every subcommand.
#[derive(Args, Debug, Default)]
struct CatalogArgs {
    /// Catalog root directory (overrides `catalog.root`).
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,
    /// Glob over interface names (overrides `catalog.include`).
    #[arg(long, value_name = "GLOB")]
    include: Option<String>,
}

/// Log levels accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevelArg {
    /// Trace.
    Trace,
    /// Debug.
    Debug,
    /// Info.
    Info,
    /// Warn.
    Warn,
    /// Error.
    Error,
}

impl From<LogLevelArg> for LogLevel {
    fn from(level: LogLevelArg) -> Self {
        match level {
            LogLevelArg::Trace => Self::Trace,
            LogLevelArg::Debug => Self::Debug,
            LogLevelArg::Info => Self::Info,
            LogLevelArg::Warn => Self::Warn,
            LogLevelArg::Error => Self::Error,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a printable message.
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

/// Parses arguments, loads configuration, and dispatches the command.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let mut config = TesterConfig::load_or_default(cli.config.as_deref())
        .map_err(|err| CliError::new(err.to_string()))?;
    if let Some(level) = cli.log_level {
        config.logging.level = level.into();
    }
    init_logging(config.logging.level)?;

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Commands::Collect(args) => command_collect(&args, &config, &mut stdout),
        Commands::Check(args) => command_check(&args, &config, &mut stdout),
    }
}

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
fn init_logging(level: LogLevel) -> CliResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Collects the catalog and prints the report.
fn command_collect(
    args: &CatalogArgs,
    config: &TesterConfig,
    out: &mut impl Write,
) -> CliResult<ExitCode> {
    let catalog = collect_catalog(args, config)?;
    report::render(&catalog, out).map_err(|err| output_error(&err))?;
    Ok(ExitCode::SUCCESS)
}

/// Collects the catalog and fails when anything did not load.
fn command_check(
    args: &CatalogArgs,
    config: &TesterConfig,
    out: &mut impl Write,
) -> CliResult<ExitCode> {
    let catalog = collect_catalog(args, config)?;
    let issues = catalog.issues();
    write_check_summary(&catalog, &issues, out).map_err(|err| output_error(&err))?;
    if issues.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    Ok(ExitCode::FAILURE)
}

/// Writes the check result lines.
fn write_check_summary(
    catalog: &CatalogReport,
    issues: &[String],
    out: &mut impl Write,
) -> std::io::Result<()> {
    for issue in issues {
        writeln!(out, "error: {issue}")?;
    }
    let versions: usize =
        catalog.interfaces.iter().map(|interface| interface.versions.len()).sum();
    let verdict = if issues.is_empty() {
        "ok".to_string()
    } else {
        format!("{} problem(s)", issues.len())
    };
    writeln!(
        out,
        "checked {} interface(s), {versions} version(s), {} test(s): {verdict}",
        catalog.interfaces.len(),
        catalog.test_count(),
    )
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the catalog root and include pattern, then collects the report.
fn collect_catalog(args: &CatalogArgs, config: &TesterConfig) -> CliResult<CatalogReport> {
    let (root, include) = catalog_selection(args, config)?;
    tracing::debug!(root = %root.display(), include = include.as_str(), "collecting catalog");
    report::collect(root, &include).map_err(|err| CliError::new(err.to_string()))
}

/// Applies command-line overrides over the configured catalog selection.
fn catalog_selection<'a>(
    args: &'a CatalogArgs,
    config: &'a TesterConfig,
) -> CliResult<(&'a Path, IncludePattern)> {
    let root = args.root.as_deref().unwrap_or(&config.catalog.root);
    let include = match &args.include {
        Some(glob) => IncludePattern::new(glob).map_err(|err| CliError::new(err.to_string()))?,
        None => config.include_pattern().map_err(|err| CliError::new(err.to_string()))?,
    };
    Ok((root, include))
}

/// Formats an output failure.
fn output_error(error: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write output: {error}"))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
