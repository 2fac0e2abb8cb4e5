// crates/l10n-sync-config/src/config.rs
// ============================================================================
// Module: L10n Sync Configuration
// Description: Configuration loading, validation, and runtime conversions.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: bigdecimal, l10n-sync-core, l10n-sync-plugins, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The file is resolved from an explicit path, then `L10N_SYNC_CONFIG`, then
//! `l10n-sync.toml` in the working directory. Relative paths inside the file
//! are resolved against the directory holding it.
//!
//! Credentials are never required to parse or validate the structure; they
//! are resolved on demand by [`L10nSyncConfig::credentials`] so commands that
//! never reach the network (plugin listing) work without them.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use bigdecimal::BigDecimal;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::PipelineConfig;
use l10n_sync_core::Platform;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::runtime::ModelProfile;
use l10n_sync_core::runtime::PriceTable;
use l10n_sync_core::runtime::RetryPolicy;
use l10n_sync_plugins::PluginSettings;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
pub const DEFAULT_CONFIG_NAME: &str = "l10n-sync.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "L10N_SYNC_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Environment variable read for the backend token by default.
pub const DEFAULT_BACKEND_TOKEN_ENV: &str = "LOKALISE_API_TOKEN";
/// Environment variable read for the translation key by default.
pub const DEFAULT_TRANSLATION_KEY_ENV: &str = "OPENAI_API_KEY";
/// Default translation model.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
/// Maximum entries per upload request.
const MAX_UPLOAD_BATCH_SIZE: usize = 500;
/// Maximum keys per page when reading the backend.
const MAX_PAGE_SIZE: u32 = 500;
/// Maximum keys per translation request.
const MAX_TRANSLATION_BATCH_SIZE: usize = 100;
/// Maximum locales translated concurrently.
const MAX_CONCURRENCY: usize = 16;
/// Maximum gateway retries per call.
const MAX_RETRIES: u32 = 10;
/// Minimum request timeout in milliseconds.
const MIN_TIMEOUT_MS: u64 = 1_000;
/// Maximum request timeout in milliseconds.
const MAX_TIMEOUT_MS: u64 = 600_000;
/// Maximum sampling temperature.
const MAX_TEMPERATURE: f32 = 2.0;

/// Locales used when the file lists none: `(code, name, backend code)`.
const DEFAULT_LOCALES: [(&str, &str, Option<&str>); 15] = [
    ("en", "English", None),
    ("de", "German", None),
    ("fr", "French", None),
    ("it", "Italian", None),
    ("pl", "Polish", None),
    ("sv", "Swedish", None),
    ("nb", "Norwegian (Bokmal)", None),
    ("da", "Danish", None),
    ("fi", "Finnish", None),
    ("lt", "Lithuanian", Some("lt_LT")),
    ("lv", "Latvian", Some("lv_LV")),
    ("et", "Estonian", Some("et_EE")),
    ("tr", "Turkish", Some("tr_TR")),
    ("ar", "Arabic", None),
    ("el", "Greek", None),
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Configuration Types
// ============================================================================

/// L10n sync configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct L10nSyncConfig {
    /// Project and source layout.
    #[serde(default)]
    pub project: ProjectConfig,
    /// Translation-management backend.
    #[serde(default)]
    pub backend: BackendConfig,
    /// Machine-translation provider.
    #[serde(default)]
    pub translation: TranslationConfig,
    /// Supported and excluded locales.
    #[serde(default)]
    pub locales: LocalesConfig,
    /// Plugin enablement.
    #[serde(default)]
    pub plugins: PluginsConfig,
    /// Gateway retry policy.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Cost estimation.
    #[serde(default)]
    pub cost: CostConfig,
    /// Directory relative paths are resolved against (not serialized).
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl L10nSyncConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(format!("{}: {err}", resolved.display())))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content =
            std::str::from_utf8(&bytes).map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        let base_dir = resolved.parent().filter(|parent| !parent.as_os_str().is_empty()).unwrap_or(Path::new("."));
        Self::from_toml(content, base_dir)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed TOML and
    /// [`ConfigError::Invalid`] when validation fails.
    pub fn from_toml(content: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.base_dir = base_dir.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.project.validate()?;
        self.backend.validate()?;
        self.translation.validate()?;
        self.locales.validate()?;
        self.gateway.validate()?;
        self.cost.validate()?;
        self.price_table()?
            .profile(&self.translation.model)
            .map_err(|err| ConfigError::Invalid(format!("translation.model: {err}")))?;
        Ok(())
    }

    /// Resolves credentials from inline values or the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a credential is missing.
    pub fn credentials(&self) -> Result<Credentials, ConfigError> {
        self.credentials_with(|name| env::var(name).ok())
    }

    /// Resolves credentials using `lookup` for environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a credential is missing.
    pub fn credentials_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<Credentials, ConfigError> {
        let backend_token =
            resolve_secret("backend.api_token", self.backend.api_token.as_deref(), &self.backend.api_token_env, &lookup)?;
        let translation_key = resolve_secret(
            "translation.api_key",
            self.translation.api_key.as_deref(),
            &self.translation.api_key_env,
            &lookup,
        )?;
        Ok(Credentials {
            backend_token,
            translation_key,
        })
    }

    /// Resolves `path` against the configuration directory.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() { path.to_path_buf() } else { self.base_dir.join(path) }
    }

    /// Returns the configured source roots per platform.
    #[must_use]
    pub fn source_roots(&self) -> BTreeMap<Platform, PathBuf> {
        let mut roots = BTreeMap::new();
        if let Some(path) = &self.project.ios_path {
            roots.insert(Platform::Ios, self.resolve(path));
        }
        if let Some(path) = &self.project.android_path {
            roots.insert(Platform::Android, self.resolve(path));
        }
        roots
    }

    /// Returns the report directory.
    #[must_use]
    pub fn reports_dir(&self) -> PathBuf {
        self.resolve(&self.project.reports_dir)
    }

    /// Returns the plugin directory.
    #[must_use]
    pub fn plugins_dir(&self) -> PathBuf {
        self.resolve(&self.project.plugins_dir)
    }

    /// Returns the supported locales in configured order.
    #[must_use]
    pub fn supported_locales(&self) -> Vec<SupportedLocale> {
        self.locales.supported.iter().map(LocaleEntry::to_supported).collect()
    }

    /// Returns the gateway retry policy.
    #[must_use]
    pub const fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.gateway.max_retries,
            base_delay: Duration::from_millis(self.gateway.base_delay_ms),
            max_delay: Duration::from_millis(self.gateway.max_delay_ms),
            jitter: self.gateway.jitter,
        }
    }

    /// Returns the built-in price table with configured models merged over it.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a configured price is invalid.
    pub fn price_table(&self) -> Result<PriceTable, ConfigError> {
        let mut table = PriceTable::builtin();
        for (index, model) in self.cost.models.iter().enumerate() {
            let field = format!("cost.models[{index}]");
            table.insert(ModelProfile::new(
                model.name.trim(),
                model.input_per_million.to_decimal(&format!("{field}.input_per_million"))?,
                model.output_per_million.to_decimal(&format!("{field}.output_per_million"))?,
            ));
        }
        Ok(table)
    }

    /// Returns the plugin enablement settings.
    #[must_use]
    pub fn plugin_settings(&self) -> PluginSettings {
        PluginSettings {
            auto_discover: self.plugins.auto_discover,
            enabled: self.plugins.enabled.clone(),
        }
    }

    /// Builds the orchestrator configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the translation model has no
    /// price or a decimal setting is invalid.
    pub fn pipeline_config(&self) -> Result<PipelineConfig, ConfigError> {
        let model = self
            .price_table()?
            .profile(&self.translation.model)
            .map_err(|err| ConfigError::Invalid(format!("translation.model: {err}")))?
            .clone();
        let cost_warning = self.cost.warn_threshold.as_ref().map(|value| value.to_decimal("cost.warn_threshold")).transpose()?;
        let mut config = PipelineConfig::new(self.project.id.trim(), model);
        config.sources = self.source_roots();
        config.locales = self.supported_locales();
        config.base_locale = LocaleCode::new(self.locales.base.trim());
        config.excluded_locales = self.locales.excluded.iter().map(|code| LocaleCode::new(code.trim())).collect();
        config.cost_warning = cost_warning;
        config.translation_batch_size = self.translation.batch_size;
        config.max_concurrency = self.translation.max_concurrency;
        config.upload_batch_size = self.backend.upload_batch_size;
        config.retry = self.retry_policy();
        Ok(config)
    }
}

/// Resolved credentials.
///
/// # Invariants
/// - `Debug` output never includes secret values.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Backend API token.
    pub backend_token: String,
    /// Translation provider API key.
    pub translation_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("backend_token", &"<redacted>")
            .field("translation_key", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// SECTION: Project
// ============================================================================

/// Project and source layout.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Backend project identifier.
    #[serde(default)]
    pub id: String,
    /// iOS source root.
    #[serde(default)]
    pub ios_path: Option<PathBuf>,
    /// Android source root.
    #[serde(default)]
    pub android_path: Option<PathBuf>,
    /// Report directory.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
    /// Plugin manifest directory.
    #[serde(default = "default_plugins_dir")]
    pub plugins_dir: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            id: String::new(),
            ios_path: None,
            android_path: None,
            reports_dir: default_reports_dir(),
            plugins_dir: default_plugins_dir(),
        }
    }
}

impl ProjectConfig {
    /// Validates project settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::Invalid("project.id must be non-empty".to_string()));
        }
        if self.ios_path.is_none() && self.android_path.is_none() {
            return Err(ConfigError::Invalid("project requires ios_path or android_path".to_string()));
        }
        for (field, path) in [("project.ios_path", self.ios_path.as_deref()), ("project.android_path", self.android_path.as_deref())] {
            if let Some(path) = path {
                validate_path_field(field, path)?;
            }
        }
        validate_path_field("project.reports_dir", &self.reports_dir)?;
        validate_path_field("project.plugins_dir", &self.plugins_dir)
    }
}

// ============================================================================
// SECTION: Backend
// ============================================================================

/// Translation-management backend settings.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// API base URL; the client default applies when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Inline API token.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Environment variable holding the token.
    #[serde(default = "default_backend_token_env")]
    pub api_token_env: String,
    /// Entries per upload request.
    #[serde(default = "default_upload_batch_size")]
    pub upload_batch_size: usize,
    /// Keys per page when reading.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Request timeout in milliseconds.
    #[serde(default = "default_backend_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            api_token_env: default_backend_token_env(),
            upload_batch_size: default_upload_batch_size(),
            page_size: default_page_size(),
            timeout_ms: default_backend_timeout_ms(),
        }
    }
}

impl BackendConfig {
    /// Validates backend settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("backend.base_url", self.base_url.as_deref())?;
        validate_range("backend.upload_batch_size", self.upload_batch_size, 1, MAX_UPLOAD_BATCH_SIZE)?;
        validate_range("backend.page_size", self.page_size, 1, MAX_PAGE_SIZE)?;
        validate_range("backend.timeout_ms", self.timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)?;
        validate_env_name("backend.api_token_env", &self.api_token_env)
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Machine-translation provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslationConfig {
    /// API base URL; the client default applies when unset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Inline API key.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the key.
    #[serde(default = "default_translation_key_env")]
    pub api_key_env: String,
    /// Chat model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Keys per translation request.
    #[serde(default = "default_translation_batch_size")]
    pub batch_size: usize,
    /// Locales translated concurrently.
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Request timeout in milliseconds.
    #[serde(default = "default_translation_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            api_key_env: default_translation_key_env(),
            model: default_model(),
            batch_size: default_translation_batch_size(),
            max_concurrency: default_max_concurrency(),
            temperature: default_temperature(),
            timeout_ms: default_translation_timeout_ms(),
        }
    }
}

impl TranslationConfig {
    /// Validates translation settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url("translation.base_url", self.base_url.as_deref())?;
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("translation.model must be non-empty".to_string()));
        }
        validate_range("translation.batch_size", self.batch_size, 1, MAX_TRANSLATION_BATCH_SIZE)?;
        validate_range("translation.max_concurrency", self.max_concurrency, 1, MAX_CONCURRENCY)?;
        validate_range("translation.timeout_ms", self.timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS)?;
        if !(0.0 ..= MAX_TEMPERATURE).contains(&self.temperature) {
            return Err(ConfigError::Invalid(format!("translation.temperature must be between 0 and {MAX_TEMPERATURE}")));
        }
        validate_env_name("translation.api_key_env", &self.api_key_env)
    }
}

// ============================================================================
// SECTION: Locales
// ============================================================================

/// One supported locale.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocaleEntry {
    /// Canonical locale code.
    pub code: String,
    /// Language name used in translation prompts.
    pub name: String,
    /// Backend spelling, when it differs from `code`.
    #[serde(default)]
    pub backend_code: Option<String>,
}

impl LocaleEntry {
    /// Converts to the runtime locale type.
    fn to_supported(&self) -> SupportedLocale {
        let locale = SupportedLocale::new(self.code.trim(), self.name.trim());
        match self.backend_code.as_deref().map(str::trim).filter(|code| !code.is_empty()) {
            Some(code) => locale.with_backend_code(code),
            None => locale,
        }
    }
}

/// Locale settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalesConfig {
    /// Base (source) locale.
    #[serde(default = "default_base_locale")]
    pub base: String,
    /// Locales excluded from every stage.
    #[serde(default)]
    pub excluded: Vec<String>,
    /// Supported locales in processing order.
    #[serde(default = "default_supported_locales")]
    pub supported: Vec<LocaleEntry>,
}

impl Default for LocalesConfig {
    fn default() -> Self {
        Self {
            base: default_base_locale(),
            excluded: Vec::new(),
            supported: default_supported_locales(),
        }
    }
}

impl LocalesConfig {
    /// Validates locale settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.supported.is_empty() {
            return Err(ConfigError::Invalid("locales.supported must list at least one locale".to_string()));
        }
        let mut codes = BTreeSet::new();
        for entry in &self.supported {
            let code = entry.code.trim();
            if code.is_empty() || entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid("locales.supported entries need a code and a name".to_string()));
            }
            if !codes.insert(code) {
                return Err(ConfigError::Invalid(format!("locales.supported lists {code} twice")));
            }
        }
        let base = self.base.trim();
        if !codes.contains(base) {
            return Err(ConfigError::Invalid(format!("locales.base {base} is not a supported locale")));
        }
        for code in &self.excluded {
            let code = code.trim();
            if code == base {
                return Err(ConfigError::Invalid(format!("locales.excluded must not contain the base locale {base}")));
            }
            if !codes.contains(code) {
                return Err(ConfigError::Invalid(format!("locales.excluded names unknown locale {code}")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Plugins, Gateway, Cost
// ============================================================================

/// Plugin enablement settings.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginsConfig {
    /// Enables discovered plugins without an explicit entry.
    #[serde(default = "default_true")]
    pub auto_discover: bool,
    /// Explicit per-plugin enablement.
    #[serde(default)]
    pub enabled: BTreeMap<String, bool>,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            auto_discover: true,
            enabled: BTreeMap::new(),
        }
    }
}

/// Gateway retry settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Retries after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound for computed delays in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Randomize computed delays.
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

impl GatewayConfig {
    /// Validates gateway settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!("gateway.max_retries must be at most {MAX_RETRIES}")));
        }
        if self.max_delay_ms == 0 {
            return Err(ConfigError::Invalid("gateway.max_delay_ms must be greater than zero".to_string()));
        }
        if self.base_delay_ms > self.max_delay_ms {
            return Err(ConfigError::Invalid("gateway.base_delay_ms must not exceed gateway.max_delay_ms".to_string()));
        }
        Ok(())
    }
}

/// Decimal written as a string, integer, or float.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DecimalValue {
    /// Exact decimal text.
    Text(String),
    /// Whole number.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
}

impl DecimalValue {
    /// Converts to a non-negative decimal.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming `field` when the value is not a
    /// non-negative decimal.
    pub fn to_decimal(&self, field: &str) -> Result<BigDecimal, ConfigError> {
        let text = match self {
            Self::Text(text) => text.trim().to_string(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) if value.is_finite() => value.to_string(),
            Self::Float(_) => String::new(),
        };
        let value = BigDecimal::from_str(&text)
            .map_err(|_| ConfigError::Invalid(format!("{field} must be a decimal number")))?;
        if value < BigDecimal::from(0) {
            return Err(ConfigError::Invalid(format!("{field} must not be negative")));
        }
        Ok(value)
    }
}

/// Model price override.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelPriceConfig {
    /// Model name.
    pub name: String,
    /// USD per million input tokens.
    pub input_per_million: DecimalValue,
    /// USD per million output tokens.
    pub output_per_million: DecimalValue,
}

/// Cost estimation settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CostConfig {
    /// Cost in USD above which the estimate is flagged.
    #[serde(default)]
    pub warn_threshold: Option<DecimalValue>,
    /// Model prices merged over the built-in table.
    #[serde(default)]
    pub models: Vec<ModelPriceConfig>,
}

impl CostConfig {
    /// Validates cost settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = &self.warn_threshold {
            threshold.to_decimal("cost.warn_threshold")?;
        }
        let mut names = BTreeSet::new();
        for (index, model) in self.models.iter().enumerate() {
            let name = model.name.trim();
            if name.is_empty() {
                return Err(ConfigError::Invalid(format!("cost.models[{index}].name must be non-empty")));
            }
            if !names.insert(name) {
                return Err(ConfigError::Invalid(format!("cost.models lists {name} twice")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Defaults
// ============================================================================

/// Default report directory.
fn default_reports_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// Default plugin directory.
fn default_plugins_dir() -> PathBuf {
    PathBuf::from("plugins")
}

/// Default backend token variable.
fn default_backend_token_env() -> String {
    DEFAULT_BACKEND_TOKEN_ENV.to_string()
}

/// Default translation key variable.
fn default_translation_key_env() -> String {
    DEFAULT_TRANSLATION_KEY_ENV.to_string()
}

/// Default upload batch size.
const fn default_upload_batch_size() -> usize {
    100
}

/// Default backend page size.
const fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

/// Default backend timeout.
const fn default_backend_timeout_ms() -> u64 {
    30_000
}

/// Default translation model.
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// Default translation batch size.
const fn default_translation_batch_size() -> usize {
    20
}

/// Default translation concurrency.
const fn default_max_concurrency() -> usize {
    4
}

/// Default sampling temperature.
const fn default_temperature() -> f32 {
    0.2
}

/// Default translation timeout.
const fn default_translation_timeout_ms() -> u64 {
    120_000
}

/// Default base locale.
fn default_base_locale() -> String {
    "en".to_string()
}

/// Default supported locales.
fn default_supported_locales() -> Vec<LocaleEntry> {
    DEFAULT_LOCALES
        .iter()
        .map(|(code, name, backend_code)| LocaleEntry {
            code: (*code).to_string(),
            name: (*name).to_string(),
            backend_code: backend_code.map(str::to_string),
        })
        .collect()
}

/// Default retry count.
const fn default_max_retries() -> u32 {
    5
}

/// Default first retry delay.
const fn default_base_delay_ms() -> u64 {
    5_000
}

/// Default delay cap.
const fn default_max_delay_ms() -> u64 {
    60_000
}

/// Serde default for enabled flags.
const fn default_true() -> bool {
    true
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from the argument, environment, or default.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    if path.to_string_lossy().len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a configured path field.
fn validate_path_field(field: &str, path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in path.components() {
        if component.as_os_str().to_string_lossy().len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Validates an optional base URL.
fn validate_base_url(field: &str, value: Option<&str>) -> Result<(), ConfigError> {
    let Some(value) = value else {
        return Ok(());
    };
    let value = value.trim();
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(ConfigError::Invalid(format!("{field} must be an http or https url")));
    }
    if value.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    Ok(())
}

/// Validates an inclusive numeric range.
fn validate_range<T: PartialOrd + fmt::Display>(field: &str, value: T, min: T, max: T) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::Invalid(format!("{field} must be between {min} and {max}")));
    }
    Ok(())
}

/// Validates an environment variable name.
fn validate_env_name(field: &str, name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && !name.starts_with(|ch: char| ch.is_ascii_digit())
        && name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_');
    if valid { Ok(()) } else { Err(ConfigError::Invalid(format!("{field} is not a valid variable name"))) }
}

/// Resolves a secret from its inline value or environment variable.
fn resolve_secret(
    field: &str,
    inline: Option<&str>,
    env_name: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    inline
        .map(str::to_string)
        .or_else(|| lookup(env_name))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::Invalid(format!("{field} is not set and {env_name} is empty")))
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, reason = "Test assertions use unwrap for clarity.")]

    use bigdecimal::BigDecimal;

    use super::DecimalValue;
    use super::validate_env_name;

    #[test]
    fn decimals_accept_text_integers_and_floats() {
        assert_eq!(DecimalValue::Text(" 0.15 ".to_string()).to_decimal("x").unwrap(), "0.15".parse::<BigDecimal>().unwrap());
        assert_eq!(DecimalValue::Integer(5).to_decimal("x").unwrap(), BigDecimal::from(5));
        assert_eq!(DecimalValue::Float(2.5).to_decimal("x").unwrap(), "2.5".parse::<BigDecimal>().unwrap());
        assert!(DecimalValue::Integer(-1).to_decimal("x").is_err());
        assert!(DecimalValue::Float(f64::NAN).to_decimal("x").is_err());
        assert!(DecimalValue::Text("cheap".to_string()).to_decimal("x").is_err());
    }

    #[test]
    fn env_names_are_shell_identifiers() {
        assert!(validate_env_name("f", "OPENAI_API_KEY").is_ok());
        assert!(validate_env_name("f", "").is_err());
        assert!(validate_env_name("f", "1TOKEN").is_err());
        assert!(validate_env_name("f", "MY-TOKEN").is_err());
    }
}
