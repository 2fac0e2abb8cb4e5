// crates/l10n-sync-cli/src/wiring.rs
// ============================================================================
// Module: Collaborator Wiring
// Description: Builds runtime collaborators from validated configuration.
// Purpose: Connect config, providers, the CSV store, and plugins to the core.
// Dependencies: l10n-sync-{core, config, plugins, providers, store-csv}, thiserror, tokio
// ============================================================================

//! ## Overview
//! [`Collaborators::build`] turns an [`L10nSyncConfig`] plus resolved
//! [`Credentials`] into the concrete extractor, backend client, translator,
//! report store, and plugin registry, and [`Collaborators::services`] hands
//! them to the orchestrator as trait objects.
//!
//! [`project_cost`] is the read-only path behind `l10n-sync estimate`: it runs
//! extraction, the snapshot fetch (through a [`Gateway`]), reconciliation,
//! and the cost estimator, and never writes anywhere.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::sync::Arc;

use l10n_sync_config::ConfigError;
use l10n_sync_config::Credentials;
use l10n_sync_config::L10nSyncConfig;
use l10n_sync_core::BackendClient;
use l10n_sync_core::Extractor;
use l10n_sync_core::PipelineConfig;
use l10n_sync_core::PipelineServices;
use l10n_sync_core::ReportStore;
use l10n_sync_core::TranslationProvider;
use l10n_sync_core::runtime::CostEstimate;
use l10n_sync_core::runtime::ExtractedKeys;
use l10n_sync_core::runtime::Gateway;
use l10n_sync_core::runtime::Lane;
use l10n_sync_core::runtime::PluginCatalog;
use l10n_sync_core::runtime::ReconcileScope;
use l10n_sync_core::runtime::TokenCounter;
use l10n_sync_core::runtime::estimate;
use l10n_sync_core::runtime::reconcile;
use l10n_sync_plugins::PluginRegistry;
use l10n_sync_providers::LokaliseClient;
use l10n_sync_providers::LokaliseConfig;
use l10n_sync_providers::OpenAiConfig;
use l10n_sync_providers::OpenAiTranslator;
use l10n_sync_providers::SourceExtractor;
use l10n_sync_store_csv::CsvReportStore;
use thiserror::Error;
use tracing::debug;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Wiring and projection failures.
#[derive(Debug, Error)]
pub enum WiringError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A client or the extractor could not be constructed.
    #[error("client setup failed: {0}")]
    Setup(String),
    /// The reports directory could not be opened.
    #[error("report store unavailable: {0}")]
    Reports(String),
    /// The plugin directory could not be listed.
    #[error("plugin discovery failed: {0}")]
    Plugins(String),
    /// A source tree could not be scanned.
    #[error("extraction failed: {0}")]
    Extraction(String),
    /// The backend snapshot could not be fetched.
    #[error("backend snapshot failed: {0}")]
    Backend(String),
}

// ============================================================================
// SECTION: Client Settings
// ============================================================================

/// Builds the backend client settings, defaulting to the public API.
#[must_use]
pub fn lokalise_config(config: &L10nSyncConfig, credentials: &Credentials) -> LokaliseConfig {
    let mut settings = LokaliseConfig::new(credentials.backend_token.clone());
    if let Some(base_url) = &config.backend.base_url {
        settings.base_url.clone_from(base_url);
    }
    settings.timeout_ms = config.backend.timeout_ms;
    settings.page_size = config.backend.page_size;
    settings
}

/// Builds the translator settings, defaulting to the public API.
#[must_use]
pub fn openai_config(config: &L10nSyncConfig, credentials: &Credentials) -> OpenAiConfig {
    let mut settings = OpenAiConfig::new(credentials.translation_key.clone(), config.translation.model.clone());
    if let Some(base_url) = &config.translation.base_url {
        settings.base_url.clone_from(base_url);
    }
    settings.temperature = config.translation.temperature;
    settings.timeout_ms = config.translation.timeout_ms;
    settings
}

/// Discovers plugins under the configured plugin directory.
///
/// # Errors
///
/// Returns [`WiringError::Plugins`] when the directory cannot be listed.
pub fn discover_plugins(config: &L10nSyncConfig) -> Result<PluginRegistry, WiringError> {
    let dir = config.plugins_dir();
    let registry = PluginRegistry::discover(&dir, config.plugin_settings())
        .map_err(|err| WiringError::Plugins(err.to_string()))?;
    debug!(dir = %dir.display(), plugins = registry.listings().len(), "plugin registry ready");
    Ok(registry)
}

// ============================================================================
// SECTION: Collaborators
// ============================================================================

/// Concrete collaborators for one CLI invocation.
#[derive(Clone)]
pub struct Collaborators {
    /// Source key extractor.
    pub extractor: Arc<SourceExtractor>,
    /// Backend client.
    pub backend: Arc<LokaliseClient>,
    /// Machine-translation client.
    pub translator: Arc<OpenAiTranslator>,
    /// CSV report store.
    pub reports: Arc<CsvReportStore>,
    /// Plugin registry.
    pub plugins: Arc<PluginRegistry>,
}

impl Collaborators {
    /// Builds every collaborator from configuration and credentials.
    ///
    /// # Errors
    ///
    /// Returns [`WiringError`] when a client, the report store, or plugin
    /// discovery cannot be set up.
    pub fn build(config: &L10nSyncConfig, credentials: &Credentials) -> Result<Self, WiringError> {
        let extractor = SourceExtractor::new().map_err(|err| WiringError::Setup(err.to_string()))?;
        let backend = LokaliseClient::new(lokalise_config(config, credentials))
            .map_err(|err| WiringError::Setup(err.to_string()))?;
        let translator = OpenAiTranslator::new(openai_config(config, credentials))
            .map_err(|err| WiringError::Setup(err.to_string()))?;
        let reports = CsvReportStore::new(config.reports_dir()).map_err(|err| WiringError::Reports(err.to_string()))?;
        let plugins = discover_plugins(config)?;
        Ok(Self {
            extractor: Arc::new(extractor),
            backend: Arc::new(backend),
            translator: Arc::new(translator),
            reports: Arc::new(reports),
            plugins: Arc::new(plugins),
        })
    }

    /// Returns the collaborators as orchestrator services.
    #[must_use]
    pub fn services(&self) -> PipelineServices {
        PipelineServices::new(
            Arc::clone(&self.extractor) as Arc<dyn Extractor>,
            Arc::clone(&self.backend) as Arc<dyn BackendClient>,
            Arc::clone(&self.translator) as Arc<dyn TranslationProvider>,
            Arc::clone(&self.reports) as Arc<dyn ReportStore>,
        )
        .with_plugins(Arc::clone(&self.plugins) as Arc<dyn PluginCatalog>)
    }
}

// ============================================================================
// SECTION: Cost Projection
// ============================================================================

/// Read-only projection of the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    /// Keys extracted across platforms.
    pub extracted: usize,
    /// Missing entries across target locales.
    pub missing: usize,
    /// Target locales.
    pub locales: usize,
    /// Backend keys no platform references.
    pub unused: usize,
    /// Cost projection for every missing entry.
    pub estimate: CostEstimate,
    /// True when the projection exceeds the configured warning threshold.
    pub exceeds_warning: bool,
}

/// Projects the translation cost of the next run without side effects.
///
/// Action plugins are not consulted, so the projection is an upper bound.
///
/// # Errors
///
/// Returns [`WiringError::Extraction`] or [`WiringError::Backend`] when a
/// stage fails.
pub async fn project_cost(
    pipeline: &PipelineConfig,
    extractor: Arc<dyn Extractor>,
    backend: &dyn BackendClient,
    counter: &dyn TokenCounter,
) -> Result<Projection, WiringError> {
    let mut extracted = ExtractedKeys::new();
    for (platform, root) in &pipeline.sources {
        let platform = *platform;
        let root = root.clone();
        let extractor = Arc::clone(&extractor);
        let keys = tokio::task::spawn_blocking(move || extractor.scan(&root, platform))
            .await
            .map_err(|err| WiringError::Extraction(err.to_string()))?
            .map_err(|err| WiringError::Extraction(err.to_string()))?;
        extracted.insert(platform, keys);
    }

    let gateway = Gateway::new(pipeline.retry.clone());
    let active = pipeline.active_locales();
    let project = pipeline.project_id.as_str();
    let locales = active.as_slice();
    let snapshot = gateway
        .call(Lane::Backend, move || backend.fetch_snapshot(project, locales))
        .await
        .map_err(|err| WiringError::Backend(err.to_string()))?;

    let scope = ReconcileScope {
        supported: &pipeline.locales,
        excluded: &pipeline.excluded_locales,
        base_locale: &pipeline.base_locale,
    };
    let result = reconcile(&extracted, &snapshot, &scope);
    let projected = estimate(&result.missing, &pipeline.model, counter);
    let exceeds_warning = projected.exceeds(pipeline.cost_warning.as_ref());
    Ok(Projection {
        extracted: extracted.values().map(BTreeSet::len).sum(),
        missing: result.missing.len(),
        locales: scope.target_locales().len(),
        unused: result.unused.len(),
        estimate: projected,
        exceeds_warning,
    })
}
