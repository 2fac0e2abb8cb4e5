// crates/l10n-sync-core/src/runtime/orchestrator.rs
// ============================================================================
// Module: L10n Sync Workflow Orchestrator
// Description: Single-run orchestrator handle, pipeline configuration, and commands.
// Purpose: Start runs on a background worker and route checkpoint commands to it.
// Dependencies: bigdecimal, thiserror, tokio, tracing, crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! [`Orchestrator`] is a cloneable handle around the single active-run slot.
//! `start` validates configuration, captures the plugin snapshot, and spawns
//! a worker task that owns the [`PipelineRun`]. The worker publishes its state
//! on a `watch` channel and parks on a command channel at the two checkpoints.
//! Commands are checked against the published state before they are queued,
//! and the worker re-checks them when it receives them, replying through a
//! oneshot channel.
//!
//! Invariants:
//! - At most one run is active (`Running` or parked at a checkpoint).
//! - The worker is the only writer of run state.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use bigdecimal::BigDecimal;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::core::LocaleCode;
use crate::core::PipelineRun;
use crate::core::PipelineState;
use crate::core::Platform;
use crate::core::RunId;
use crate::core::Stage;
use crate::core::SupportedLocale;
use crate::core::Timestamp;
use crate::interfaces::BackendClient;
use crate::interfaces::Extractor;
use crate::interfaces::ReportStore;
use crate::interfaces::TranslationProvider;
use crate::runtime::cost::CharRatioCounter;
use crate::runtime::cost::ModelProfile;
use crate::runtime::cost::TokenCounter;
use crate::runtime::events::ChannelSink;
use crate::runtime::events::EventEmitter;
use crate::runtime::events::EventSink;
use crate::runtime::events::PipelineEvent;
use crate::runtime::events::SinkRegistry;
use crate::runtime::gateway::Gateway;
use crate::runtime::gateway::RetryPolicy;
use crate::runtime::plugins::PluginCatalog;
use crate::runtime::plugins::PluginSet;
use crate::runtime::worker::Supervision;
use crate::runtime::worker::Worker;
use crate::runtime::worker::supervise;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Queued commands per run.
const COMMAND_QUEUE_DEPTH: usize = 8;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Report names used by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportNames {
    /// Reconciled missing entries (informational).
    pub missing: String,
    /// Review report edited by humans between checkpoints.
    pub review: String,
    /// Entries written to the backend.
    pub uploaded: String,
    /// Entries the backend rejected.
    pub failed: String,
}

impl Default for ReportNames {
    fn default() -> Self {
        Self {
            missing: "missing_translations".to_string(),
            review: "translation_done".to_string(),
            uploaded: "final_report".to_string(),
            failed: "failed_update".to_string(),
        }
    }
}

/// Pipeline configuration consumed by the orchestrator.
///
/// # Invariants
/// - Validated by [`PipelineConfig::validate`] before any stage runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Backend project identifier.
    pub project_id: String,
    /// Source roots per platform.
    pub sources: BTreeMap<Platform, PathBuf>,
    /// Supported locales in configured order.
    pub locales: Vec<SupportedLocale>,
    /// Base (source) locale.
    pub base_locale: LocaleCode,
    /// Locales excluded from every stage.
    pub excluded_locales: BTreeSet<LocaleCode>,
    /// Translation model pricing profile.
    pub model: ModelProfile,
    /// Cost above which the estimate is flagged.
    pub cost_warning: Option<BigDecimal>,
    /// Keys per translation request.
    pub translation_batch_size: usize,
    /// Locales translated concurrently.
    pub max_concurrency: usize,
    /// Entries per upload request.
    pub upload_batch_size: usize,
    /// Gateway retry policy.
    pub retry: RetryPolicy,
    /// Report names.
    pub reports: ReportNames,
}

impl PipelineConfig {
    /// Creates a configuration with default batching and report names.
    #[must_use]
    pub fn new(project_id: impl Into<String>, model: ModelProfile) -> Self {
        Self {
            project_id: project_id.into(),
            sources: BTreeMap::new(),
            locales: Vec::new(),
            base_locale: LocaleCode::new("en"),
            excluded_locales: BTreeSet::new(),
            model,
            cost_warning: None,
            translation_batch_size: 20,
            max_concurrency: 4,
            upload_batch_size: 100,
            retry: RetryPolicy::default(),
            reports: ReportNames::default(),
        }
    }

    /// Checks the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if self.project_id.trim().is_empty() {
            return Err("project id must be set".to_string());
        }
        if self.sources.is_empty() {
            return Err("at least one platform source root is required".to_string());
        }
        if self.locales.is_empty() {
            return Err("at least one supported locale is required".to_string());
        }
        let mut seen = BTreeSet::new();
        for locale in &self.locales {
            if locale.code.as_str().trim().is_empty() {
                return Err("supported locale codes must be non-empty".to_string());
            }
            if !seen.insert(&locale.code) {
                return Err(format!("duplicate supported locale: {}", locale.code));
            }
        }
        if self.model.name.trim().is_empty() {
            return Err("translation model must be set".to_string());
        }
        if self.translation_batch_size == 0 || self.upload_batch_size == 0 {
            return Err("batch sizes must be at least 1".to_string());
        }
        if self.max_concurrency == 0 {
            return Err("max concurrency must be at least 1".to_string());
        }
        Ok(())
    }

    /// Returns supported locales minus exclusions (base locale included).
    #[must_use]
    pub fn active_locales(&self) -> Vec<SupportedLocale> {
        self.locales
            .iter()
            .filter(|locale| !self.excluded_locales.contains(&locale.code))
            .cloned()
            .collect()
    }
}

/// Collaborators used by every run.
#[derive(Clone)]
pub struct PipelineServices {
    /// Source key extractor.
    pub extractor: Arc<dyn Extractor>,
    /// Translation-management backend.
    pub backend: Arc<dyn BackendClient>,
    /// Machine-translation provider.
    pub translator: Arc<dyn TranslationProvider>,
    /// Report store.
    pub reports: Arc<dyn ReportStore>,
    /// Plugin snapshot source.
    pub plugins: Arc<dyn PluginCatalog>,
    /// Token counter for cost estimates.
    pub token_counter: Arc<dyn TokenCounter>,
}

impl PipelineServices {
    /// Creates services with no plugins and the default token counter.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn Extractor>,
        backend: Arc<dyn BackendClient>,
        translator: Arc<dyn TranslationProvider>,
        reports: Arc<dyn ReportStore>,
    ) -> Self {
        Self {
            extractor,
            backend,
            translator,
            reports,
            plugins: Arc::new(PluginSet::new()),
            token_counter: Arc::new(CharRatioCounter::default()),
        }
    }

    /// Replaces the plugin catalog.
    #[must_use]
    pub fn with_plugins(mut self, plugins: Arc<dyn PluginCatalog>) -> Self {
        self.plugins = plugins;
        self
    }

    /// Replaces the token counter.
    #[must_use]
    pub fn with_token_counter(mut self, counter: Arc<dyn TokenCounter>) -> Self {
        self.token_counter = counter;
        self
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Command rejection.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    /// A run is already active.
    #[error("run {0} is still active")]
    RunActive(RunId),
    /// No run has been started.
    #[error("no active run")]
    NoActiveRun,
    /// The command does not apply in the current state.
    #[error("{command} is not allowed while {state}")]
    InvalidState {
        /// Rejected command.
        command: &'static str,
        /// State at the time of the command.
        state: PipelineState,
    },
    /// A deletion approval named a key that was not offered.
    #[error("unknown deletion candidate: {0}")]
    UnknownCandidate(String),
    /// Configuration or credentials are missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The worker stopped before replying.
    #[error("pipeline worker stopped")]
    WorkerGone,
}

/// Checkpoint command routed to the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    /// Leave the review checkpoint and upload.
    ResumeUpload,
    /// Delete exactly these candidate identifiers.
    ConfirmDeletion(BTreeSet<String>),
    /// Delete nothing.
    SkipDeletion,
}

impl Command {
    /// Returns the command name used in rejections.
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::ResumeUpload => "resume_upload",
            Self::ConfirmDeletion(_) => "confirm_deletion",
            Self::SkipDeletion => "skip_deletion",
        }
    }
}

/// Command plus its reply channel.
#[derive(Debug)]
pub(crate) struct CommandEnvelope {
    /// Command to apply.
    pub(crate) command: Command,
    /// Reply channel.
    pub(crate) reply: oneshot::Sender<Result<(), CommandError>>,
}

// ============================================================================
// SECTION: Orchestrator
// ============================================================================

/// Handles for the run occupying the slot.
struct ActiveRun {
    /// Run identifier.
    run_id: RunId,
    /// Command queue into the worker.
    commands: mpsc::Sender<CommandEnvelope>,
    /// Published worker state.
    state: watch::Receiver<PipelineState>,
    /// Cancellation flag checked at stage boundaries.
    cancel: Arc<AtomicBool>,
    /// Worker task, until joined.
    task: Option<JoinHandle<PipelineRun>>,
}

/// Shared orchestrator state.
struct OrchestratorInner {
    /// Pipeline configuration.
    config: Arc<PipelineConfig>,
    /// Collaborators.
    services: PipelineServices,
    /// Gateway shared by all runs.
    gateway: Arc<Gateway>,
    /// Event sinks.
    sinks: SinkRegistry,
    /// Single active-run slot.
    slot: Mutex<Option<ActiveRun>>,
}

/// Workflow orchestrator handle.
///
/// # Invariants
/// - `start` is rejected while a run is active.
#[derive(Clone)]
pub struct Orchestrator {
    /// Shared state.
    inner: Arc<OrchestratorInner>,
}

impl Orchestrator {
    /// Creates an orchestrator.
    #[must_use]
    pub fn new(config: PipelineConfig, services: PipelineServices) -> Self {
        let gateway = Arc::new(Gateway::new(config.retry.clone()));
        Self {
            inner: Arc::new(OrchestratorInner {
                config: Arc::new(config),
                services,
                gateway,
                sinks: SinkRegistry::new(),
                slot: Mutex::new(None),
            }),
        }
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.inner.config
    }

    /// Returns the gateway, for request counters.
    #[must_use]
    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    /// Registers a sink for events of all subsequent runs.
    pub fn add_sink(&self, sink: Arc<dyn EventSink>) {
        self.inner.sinks.register(sink);
    }

    /// Subscribes to events through an unbounded channel.
    #[must_use]
    pub fn subscribe(&self) -> UnboundedReceiver<PipelineEvent> {
        let (sink, receiver) = ChannelSink::pair();
        self.inner.sinks.register(Arc::new(sink));
        receiver
    }

    /// Starts a new run on a background worker.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::RunActive`] when a run is active and
    /// [`CommandError::Configuration`] when configuration or plugins are invalid.
    pub async fn start(&self) -> Result<RunId, CommandError> {
        let mut slot = self.inner.slot.lock().await;
        if let Some(active) = slot.as_ref() {
            let finished = active.task.as_ref().is_some_and(JoinHandle::is_finished);
            if active.state.borrow().is_active() && !finished {
                return Err(CommandError::RunActive(active.run_id.clone()));
            }
        }
        self.inner.config.validate().map_err(CommandError::Configuration)?;
        let plugins = self
            .inner
            .services
            .plugins
            .snapshot()
            .map_err(|err| CommandError::Configuration(err.to_string()))?;

        let run_id = RunId::generate();
        let mut run = PipelineRun::new(run_id.clone(), Timestamp::now());
        run.transition(PipelineState::Running)
            .map_err(|err| CommandError::Configuration(err.to_string()))?;
        let (state_tx, state_rx) = watch::channel(PipelineState::Running);
        let (stage_tx, stage_rx) = watch::channel(Stage::Setup);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let cancel = Arc::new(AtomicBool::new(false));
        let events = EventEmitter::new(run_id.clone(), self.inner.sinks.clone());

        let supervision = Supervision {
            run: run.clone(),
            state: state_tx.clone(),
            stage: stage_rx,
            events: events.clone(),
        };
        let worker = Worker {
            run,
            config: Arc::clone(&self.inner.config),
            services: self.inner.services.clone(),
            gateway: Arc::clone(&self.inner.gateway),
            plugins,
            events,
            state: state_tx,
            stage: stage_tx,
            commands: command_rx,
            cancel: Arc::clone(&cancel),
            extracted: BTreeMap::new(),
        };
        let task = tokio::spawn(supervise(worker, supervision));
        info!(run_id = %run_id, project = %self.inner.config.project_id, "pipeline run started");
        *slot = Some(ActiveRun {
            run_id: run_id.clone(),
            commands: command_tx,
            state: state_rx,
            cancel,
            task: Some(task),
        });
        drop(slot);
        Ok(run_id)
    }

    /// Resumes a run parked for review.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] unless the run is awaiting review.
    pub async fn resume_upload(&self) -> Result<(), CommandError> {
        self.send(Command::ResumeUpload, PipelineState::AwaitingReview).await
    }

    /// Approves deletion of exactly the named candidates.
    ///
    /// An empty set deletes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::UnknownCandidate`] when a name was not offered;
    /// the run stays parked.
    pub async fn confirm_deletion(&self, approved: BTreeSet<String>) -> Result<(), CommandError> {
        self.send(Command::ConfirmDeletion(approved), PipelineState::AwaitingDeletionDecision).await
    }

    /// Declines every deletion candidate.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] unless the run awaits a deletion decision.
    pub async fn skip_deletion(&self) -> Result<(), CommandError> {
        self.send(Command::SkipDeletion, PipelineState::AwaitingDeletionDecision).await
    }

    /// Requests cancellation at the next stage boundary.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError`] unless the run is `Running`.
    pub async fn cancel(&self) -> Result<(), CommandError> {
        let slot = self.inner.slot.lock().await;
        let active = slot.as_ref().ok_or(CommandError::NoActiveRun)?;
        let state = *active.state.borrow();
        if state != PipelineState::Running {
            return Err(CommandError::InvalidState {
                command: "cancel",
                state,
            });
        }
        active.cancel.store(true, Ordering::Release);
        info!(run_id = %active.run_id, "pipeline run cancellation requested");
        drop(slot);
        Ok(())
    }

    /// Returns the state of the current run (`Idle` before the first run).
    pub async fn state(&self) -> PipelineState {
        self.inner
            .slot
            .lock()
            .await
            .as_ref()
            .map_or(PipelineState::Idle, |active| *active.state.borrow())
    }

    /// Returns the identifier of the current run.
    pub async fn run_id(&self) -> Option<RunId> {
        self.inner.slot.lock().await.as_ref().map(|active| active.run_id.clone())
    }

    /// Returns a state watcher for the current run.
    pub async fn watch_state(&self) -> Option<watch::Receiver<PipelineState>> {
        self.inner.slot.lock().await.as_ref().map(|active| active.state.clone())
    }

    /// Waits for the current run's worker to finish and returns the final run.
    ///
    /// A worker that panicked yields a run in `Error`. Returns `None` when there
    /// is no run or it was already joined.
    pub async fn wait(&self) -> Option<PipelineRun> {
        let task = self.inner.slot.lock().await.as_mut().and_then(|active| active.task.take())?;
        task.await.ok()
    }

    /// Routes a checkpoint command to the worker.
    async fn send(&self, command: Command, expected: PipelineState) -> Result<(), CommandError> {
        let (sender, state) = {
            let slot = self.inner.slot.lock().await;
            let active = slot.as_ref().ok_or(CommandError::NoActiveRun)?;
            let state = *active.state.borrow();
            (active.commands.clone(), state)
        };
        if state != expected {
            return Err(CommandError::InvalidState {
                command: command.name(),
                state,
            });
        }
        let (reply, response) = oneshot::channel();
        sender
            .send(CommandEnvelope {
                command,
                reply,
            })
            .await
            .map_err(|_| CommandError::WorkerGone)?;
        response.await.map_err(|_| CommandError::WorkerGone)?
    }
}
