// crates/authority-gate-cli/src/main.rs
// ============================================================================
// Module: Authority Gate CLI Entry Point
// Description: Command dispatcher for config validation and decision checks.
// Purpose: Let operators verify configuration and probe the authority.
// Dependencies: clap, authority-gate-authority, authority-gate-config, tokio
// ============================================================================

//! ## Overview
//! `authority-gate config validate` loads and validates the configuration.
//! `authority-gate check` runs one full gate decision for a signed query
//! against the configured authority and prints a JSON decision report. The
//! exit code is zero only when every executed stage allowed the request.
//! Security posture: the report never echoes the request signature.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use authority_gate_authority::AuthScheme;
use authority_gate_authority::GateError;
use authority_gate_authority::GateStage;
use authority_gate_config::GateConfig;
use authority_gate_core::AuthRequest;
use authority_gate_core::Credentials;
use authority_gate_core::Payload;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Authority gate command-line interface.
#[derive(Parser, Debug)]
#[command(name = "authority-gate", version, about = "Signed-query authority gate tooling")]
struct Cli {
    /// Selected subcommand.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Run one gate decision against the configured authority.
    Check(CheckCommand),
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate an authority gate configuration file.
    Validate(ConfigValidateCommand),
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to authority-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for `check`.
#[derive(Args, Debug)]
struct CheckCommand {
    /// Raw query string carrying hash, timestamp, app_id and user.
    #[arg(long, value_name = "QUERY")]
    query: String,
    /// User identifier taken from the route, if the route has one.
    #[arg(long, value_name = "ID")]
    route_user: Option<String>,
    /// Route path of the simulated request.
    #[arg(long, value_name = "PATH", default_value = "/")]
    path: String,
    /// Form-encoded body; when given, the payload stage runs as well.
    #[arg(long, value_name = "FORM")]
    payload_form: Option<String>,
    /// Optional config file path (defaults to authority-gate.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// JSON decision report printed by `check`.
#[derive(Debug, Serialize)]
struct DecisionReport {
    /// `allow` or `deny`.
    decision: &'static str,
    /// Last stage executed.
    stage: GateStage,
    /// Internal reason label on deny.
    reason: Option<&'static str>,
    /// Caller-facing message on deny.
    message: Option<String>,
    /// Primary-stage credentials on allow.
    credentials: Option<Credentials>,
    /// Payload-stage credentials when the payload stage ran and allowed.
    payload_credentials: Option<Credentials>,
}

impl DecisionReport {
    /// Builds a deny report.
    fn denied(stage: GateStage, error: &GateError) -> Self {
        Self {
            decision: "deny",
            stage,
            reason: Some(error.reason_label()),
            message: Some(error.public_message()),
            credentials: None,
            payload_credentials: None,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for operator-facing messages.
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
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Check(command) => command_check(command).await,
    }
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_ref())?;
    write_stdout_line(&format!("Config valid: authority {}", config.authority.endpoint()))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Check Command
// ============================================================================

/// Executes one gate decision and prints the report.
async fn command_check(command: CheckCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_ref())?;
    let scheme = AuthScheme::from_config(&config)
        .map_err(|err| CliError::new(format!("Failed to build gate: {err}")))?;
    let request = build_request(&command);
    let report = decide(&scheme, &request, command.payload_form.as_deref()).await;
    write_json_line(&report)?;
    if report.decision == "allow" { Ok(ExitCode::SUCCESS) } else { Ok(ExitCode::FAILURE) }
}

/// Builds the raw request view from CLI arguments.
fn build_request(command: &CheckCommand) -> AuthRequest {
    let query = command.query.strip_prefix('?').unwrap_or(&command.query);
    let request = AuthRequest::from_query(query).with_path(command.path.as_str());
    match &command.route_user {
        Some(route_user) => request.with_route_user_id(route_user.as_str()),
        None => request,
    }
}

/// Runs the primary stage and, when a payload is given, the payload stage.
async fn decide(
    scheme: &AuthScheme,
    request: &AuthRequest,
    payload_form: Option<&str>,
) -> DecisionReport {
    let authenticated = match scheme.authenticate(request).await {
        Ok(authenticated) => authenticated,
        Err(error) => return DecisionReport::denied(GateStage::Primary, &error),
    };
    let Some(form) = payload_form else {
        return DecisionReport {
            decision: "allow",
            stage: GateStage::Primary,
            reason: None,
            message: None,
            credentials: Some(authenticated.into_credentials()),
            payload_credentials: None,
        };
    };
    let payload = Payload::from_form_bytes(form.as_bytes());
    match scheme.authorize_payload(&authenticated, &payload).await {
        Ok(payload_credentials) => DecisionReport {
            decision: "allow",
            stage: GateStage::Payload,
            reason: None,
            message: None,
            credentials: Some(authenticated.into_credentials()),
            payload_credentials: Some(payload_credentials),
        },
        Err(error) => DecisionReport::denied(GateStage::Payload, &error),
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads configuration, mapping failures to CLI errors.
fn load_config(path: Option<&PathBuf>) -> CliResult<GateConfig> {
    GateConfig::load(path.map(PathBuf::as_path))
        .map_err(|err| CliError::new(format!("Failed to load config: {err}")))
}

/// Writes a value as one JSON line to stdout.
fn write_json_line<T: Serialize>(value: &T) -> CliResult<()> {
    let line = serde_json::to_string(value)
        .map_err(|err| CliError::new(format!("Failed to serialize report: {err}")))?;
    write_stdout_line(&line).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("Failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
