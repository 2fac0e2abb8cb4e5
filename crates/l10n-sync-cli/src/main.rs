// crates/l10n-sync-cli/src/main.rs
// ============================================================================
// Module: L10n Sync CLI Entry Point
// Description: Command dispatcher for pipeline runs, plugins, config, and estimates.
// Purpose: Drive the orchestrator from a terminal and answer its checkpoints.
// Dependencies: clap, l10n-sync-*, thiserror, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! `l10n-sync run` starts a pipeline run, streams its events one line each,
//! and answers the two checkpoints: the review pause (Enter uploads, `abort`
//! exits with the report left in place) and the unused-key deletion decision.
//! `plugins`, `config validate`, and `estimate` are read-only helpers.
//!
//! Diagnostics go to stderr through `tracing`, filtered by `L10N_SYNC_LOG`.
//! All user-facing strings are routed through the message catalog.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use l10n_sync_cli::answers::DeletePolicy;
use l10n_sync_cli::answers::DeletionAnswer;
use l10n_sync_cli::answers::ReviewAnswer;
use l10n_sync_cli::render::render_candidates;
use l10n_sync_cli::render::render_estimate;
use l10n_sync_cli::render::render_event;
use l10n_sync_cli::t;
use l10n_sync_cli::wiring::Collaborators;
use l10n_sync_cli::wiring::discover_plugins;
use l10n_sync_cli::wiring::lokalise_config;
use l10n_sync_cli::wiring::project_cost;
use l10n_sync_config::L10nSyncConfig;
use l10n_sync_core::CommandError;
use l10n_sync_core::Extractor;
use l10n_sync_core::Orchestrator;
use l10n_sync_core::PipelineConfig;
use l10n_sync_core::PipelineState;
use l10n_sync_core::UnusedKeyCandidate;
use l10n_sync_core::runtime::CharRatioCounter;
use l10n_sync_core::runtime::Checkpoint;
use l10n_sync_core::runtime::EstimateReport;
use l10n_sync_core::runtime::EventKind;
use l10n_sync_core::runtime::LogSink;
use l10n_sync_plugins::PluginRegistry;
use l10n_sync_providers::LokaliseClient;
use l10n_sync_providers::SourceExtractor;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the log filter.
const LOG_ENV: &str = "L10N_SYNC_LOG";
/// Log filter used when `L10N_SYNC_LOG` is unset or invalid.
const DEFAULT_LOG_FILTER: &str = "warn";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "l10n-sync", version, disable_help_subcommand = true)]
struct Cli {
    /// Config file path (defaults to `L10N_SYNC_CONFIG`, then ./l10n-sync.toml).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the sync pipeline: extract, reconcile, translate, review, upload.
    Run(RunCommand),
    /// List discovered plugins and their enablement.
    Plugins,
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Project the cost of the next run without changing anything.
    Estimate,
}

/// Options for the `run` command.
#[derive(Args, Debug)]
struct RunCommand {
    /// Upload without pausing at the review checkpoint.
    #[arg(long)]
    yes_upload: bool,
    /// Unused-key deletion policy.
    #[arg(long, value_enum, value_name = "POLICY", default_value_t = DeletePolicy::Ask)]
    delete: DeletePolicy,
    /// Append every pipeline event to this file as JSON lines.
    #[arg(long, value_name = "PATH")]
    event_log: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate the configuration file.
    Validate,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for catalog messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a catalog message.
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
    init_logging();
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Run(command) => command_run(config_path, &command).await,
        Commands::Plugins => command_plugins(config_path),
        Commands::Config {
            command,
        } => command_config(config_path, &command),
        Commands::Estimate => command_estimate(config_path).await,
    }
}

/// Installs the stderr log subscriber.
fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(config_path: Option<&Path>, command: &RunCommand) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let credentials =
        config.credentials().map_err(|err| CliError::new(t!("config.credentials_failed", error = err)))?;
    let collaborators = Collaborators::build(&config, &credentials)
        .map_err(|err| CliError::new(t!("run.setup_failed", error = err)))?;
    for line in plugin_problems(&collaborators.plugins) {
        write_stderr_line(&line).map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    let pipeline = pipeline_config(&config)?;

    let orchestrator = Orchestrator::new(pipeline, collaborators.services());
    if let Some(path) = &command.event_log {
        let file = File::options().create(true).append(true).open(path).map_err(|err| {
            CliError::new(t!("run.event_log_failed", path = path.display(), error = err))
        })?;
        orchestrator.add_sink(Arc::new(LogSink::new(file)));
    }
    let mut events = orchestrator.subscribe();
    let run_id = orchestrator.start().await.map_err(command_error)?;
    write_line(&t!("run.started", run_id = run_id))?;

    while let Some(event) = events.recv().await {
        write_line(&render_event(&event))?;
        match event.kind {
            EventKind::Checkpoint(Checkpoint::AwaitingReview {
                report, ..
            }) => {
                let location = report_location(&collaborators, &report);
                let answer =
                    if command.yes_upload { ReviewAnswer::Upload } else { ask_review(&location).await? };
                if answer == ReviewAnswer::Abort {
                    write_line(&t!("review.left_in_place", path = location))?;
                    return Ok(ExitCode::SUCCESS);
                }
                orchestrator.resume_upload().await.map_err(command_error)?;
            }
            EventKind::Checkpoint(Checkpoint::AwaitingDeletionDecision {
                candidates,
            }) => {
                for line in render_candidates(&candidates) {
                    write_line(&line)?;
                }
                let approved = match command.delete.preset() {
                    Some(answer) => answer.approved(&candidates).map_err(|err| CliError::new(err.to_string()))?,
                    None => ask_deletion(&candidates).await?,
                };
                let outcome = if approved.is_empty() {
                    orchestrator.skip_deletion().await
                } else {
                    orchestrator.confirm_deletion(approved).await
                };
                outcome.map_err(command_error)?;
            }
            EventKind::Completed {
                ..
            }
            | EventKind::Error {
                ..
            } => break,
            EventKind::Progress {
                ..
            }
            | EventKind::Estimate(_) => {}
        }
    }

    let finished = orchestrator.wait().await;
    Ok(match finished.map(|run| run.state) {
        Some(PipelineState::Completed) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

/// Prompts at the review checkpoint until a valid answer arrives.
///
/// End of input counts as `abort`.
async fn ask_review(location: &str) -> CliResult<ReviewAnswer> {
    write_line(&t!("review.prompt", path = location))?;
    loop {
        let Some(line) = read_line().await? else {
            return Ok(ReviewAnswer::Abort);
        };
        match ReviewAnswer::parse(&line) {
            Ok(answer) => return Ok(answer),
            Err(err) => write_line(&t!("prompt.retry", error = err))?,
        }
    }
}

/// Prompts at the deletion checkpoint until a valid answer arrives.
///
/// End of input deletes nothing.
async fn ask_deletion(candidates: &[UnusedKeyCandidate]) -> CliResult<BTreeSet<String>> {
    write_line(&t!("deletion.prompt"))?;
    loop {
        let Some(line) = read_line().await? else {
            return Ok(BTreeSet::new());
        };
        match DeletionAnswer::parse(&line).approved(candidates) {
            Ok(approved) => return Ok(approved),
            Err(err) => write_line(&t!("prompt.retry", error = err))?,
        }
    }
}

/// Reads one stdin line off the async runtime; `None` at end of input.
async fn read_line() -> CliResult<Option<String>> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        let read = std::io::stdin().read_line(&mut line)?;
        Ok::<_, std::io::Error>((read > 0).then_some(line))
    })
    .await
    .map_err(|err| CliError::new(t!("input.read_failed", error = err)))?
    .map_err(|err| CliError::new(t!("input.read_failed", error = err)))
}

/// Returns the on-disk location of a report for display.
fn report_location(collaborators: &Collaborators, report: &str) -> String {
    collaborators
        .reports
        .report_path(report)
        .map_or_else(|_| report.to_string(), |path| path.display().to_string())
}

/// Maps a rejected orchestrator command to a CLI error.
fn command_error(err: CommandError) -> CliError {
    CliError::new(t!("run.command_failed", error = err))
}

// ============================================================================
// SECTION: Plugins Command
// ============================================================================

/// Executes the `plugins` command.
fn command_plugins(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let registry =
        discover_plugins(&config).map_err(|err| CliError::new(t!("plugins.discovery_failed", error = err)))?;
    let listings = registry.listings();
    if listings.is_empty() {
        write_line(&t!("plugins.none", dir = config.plugins_dir().display()))?;
    }
    for listing in &listings {
        let state = if listing.enabled { t!("plugins.enabled") } else { t!("plugins.disabled") };
        write_line(&t!(
            "plugins.entry",
            name = listing.name,
            kind = listing.kind,
            state = state,
            source = listing.source
        ))?;
        if let Some(description) = &listing.description {
            write_line(&t!("plugins.description", description = description))?;
        }
    }
    for line in plugin_problems(&registry) {
        write_line(&line)?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Formats configured-but-absent plugins and excluded manifests.
fn plugin_problems(registry: &PluginRegistry) -> Vec<String> {
    let missing = registry.missing().into_iter().map(|name| t!("plugins.missing", name = name));
    let issues = registry.issues().iter().map(|issue| t!("plugins.issue", issue = issue));
    missing.chain(issues).collect()
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(config_path: Option<&Path>, command: &ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate => command_config_validate(config_path),
    }
}

/// Executes the config validation command.
fn command_config_validate(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let pipeline = pipeline_config(&config)?;
    write_line(&t!(
        "config.validate.ok",
        project = pipeline.project_id,
        locales = pipeline.active_locales().len().saturating_sub(1),
        model = pipeline.model.name
    ))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Estimate Command
// ============================================================================

/// Executes the read-only `estimate` command.
async fn command_estimate(config_path: Option<&Path>) -> CliResult<ExitCode> {
    let config = load_config(config_path)?;
    let credentials =
        config.credentials().map_err(|err| CliError::new(t!("config.credentials_failed", error = err)))?;
    let pipeline = pipeline_config(&config)?;
    let extractor = SourceExtractor::new().map_err(|err| CliError::new(t!("run.setup_failed", error = err)))?;
    let backend = LokaliseClient::new(lokalise_config(&config, &credentials))
        .map_err(|err| CliError::new(t!("run.setup_failed", error = err)))?;

    let extractor: Arc<dyn Extractor> = Arc::new(extractor);
    let projection = project_cost(&pipeline, extractor, &backend, &CharRatioCounter::default())
        .await
        .map_err(|err| CliError::new(t!("estimate.failed", error = err)))?;
    write_line(&t!(
        "estimate.scope",
        extracted = projection.extracted,
        missing = projection.missing,
        locales = projection.locales,
        unused = projection.unused
    ))?;
    write_line(&render_estimate(&EstimateReport::from_estimate(&projection.estimate, projection.exceeds_warning)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Config Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(path: Option<&Path>) -> CliResult<L10nSyncConfig> {
    L10nSyncConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

/// Converts configuration into the core pipeline settings.
fn pipeline_config(config: &L10nSyncConfig) -> CliResult<PipelineConfig> {
    config.pipeline_config().map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout, mapping failures to a CLI error.
fn write_line(message: &str) -> CliResult<()> {
    write_stdout_line(message).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout and flushes it.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")?;
    stdout.flush()
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    t!("output.write_failed", stream = stream, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
