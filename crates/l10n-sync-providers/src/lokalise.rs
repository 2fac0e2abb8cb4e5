// crates/l10n-sync-providers/src/lokalise.rs
// ============================================================================
// Module: Lokalise Backend Client
// Description: BackendClient for the Lokalise REST API v2.
// Purpose: Read keys and translations, write translations, and delete keys.
// Dependencies: l10n-sync-core, reqwest, serde, serde_json, tracing
// ============================================================================

//! ## Overview
//! - Snapshots page through `GET /projects/{id}/keys` with translations
//!   included, until a page comes back short or empty.
//! - Uploads issue one `PUT /projects/{id}/translations/{translation_id}` per
//!   entry. A refused entry is reported as a rejection; rate limiting, server
//!   errors, and rejected credentials fail the whole batch.
//! - Deletion is a single `DELETE /projects/{id}/keys` with the key ids.
//!
//! Backend locale spellings (for example `tr_TR`) are mapped back to the
//! canonical codes of the requested locales; translations in other languages
//! are ignored. Keys attached to neither iOS nor Android are left out of the
//! snapshot so they can never become deletion candidates.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use l10n_sync_core::BackendClient;
use l10n_sync_core::BackendId;
use l10n_sync_core::BackendKeyRecord;
use l10n_sync_core::BackendSnapshot;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::ProviderFailure;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationStatus;
use l10n_sync_core::UploadOutcome;
use l10n_sync_core::UploadRejection;
use reqwest::Client;
use reqwest::Url;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;
use tracing::warn;

use crate::http::ClientSetupError;
use crate::http::HttpReply;
use crate::http::body_preview;
use crate::http::build_client;
use crate::http::send;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default Lokalise API base URL.
pub const DEFAULT_LOKALISE_URL: &str = "https://api.lokalise.com/api2";
/// Largest page the API serves.
const MAX_PAGE_SIZE: u32 = 500;
/// Upper bound on pages read for one snapshot.
const MAX_PAGES: u32 = 10_000;
/// Authentication header.
const TOKEN_HEADER: &str = "X-Api-Token";

/// Lokalise client configuration.
///
/// # Invariants
/// - `page_size` is clamped to `1 ..= 500` when requests are built.
/// - `Debug` output never includes the token.
#[derive(Clone, PartialEq, Eq)]
pub struct LokaliseConfig {
    /// API base URL.
    pub base_url: String,
    /// API token.
    pub api_token: String,
    /// Whole-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Keys requested per page.
    pub page_size: u32,
}

impl LokaliseConfig {
    /// Creates a configuration for the public API.
    #[must_use]
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_LOKALISE_URL.to_string(),
            api_token: api_token.into(),
            timeout_ms: 30_000,
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl fmt::Debug for LokaliseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LokaliseConfig")
            .field("base_url", &self.base_url)
            .field("api_token", &"<redacted>")
            .field("timeout_ms", &self.timeout_ms)
            .field("page_size", &self.page_size)
            .finish()
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// One page of `GET /keys`.
#[derive(Debug, Deserialize)]
struct KeysPage {
    /// Keys on this page.
    #[serde(default)]
    keys: Vec<ApiKey>,
}

/// Key as served by the API.
#[derive(Debug, Deserialize)]
struct ApiKey {
    /// Numeric key id.
    key_id: Value,
    /// Key name, per platform or shared.
    key_name: ApiKeyName,
    /// Platforms the key is attached to.
    #[serde(default)]
    platforms: Vec<String>,
    /// Translations, present when requested.
    #[serde(default)]
    translations: Vec<ApiTranslation>,
}

/// Key name shape.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiKeyName {
    /// Distinct names per platform.
    PerPlatform(BTreeMap<String, String>),
    /// One name for every platform.
    Shared(String),
}

impl ApiKeyName {
    /// Returns the name used on `platform`.
    fn for_platform(&self, platform: Platform) -> Option<&str> {
        match self {
            Self::Shared(name) => Some(name.as_str()),
            Self::PerPlatform(names) => names
                .get(platform.as_str())
                .filter(|name| !name.is_empty())
                .or_else(|| names.get("other").filter(|name| !name.is_empty()))
                .or_else(|| names.values().find(|name| !name.is_empty()))
                .map(String::as_str),
        }
    }
}

/// Translation as served by the API.
#[derive(Debug, Deserialize)]
struct ApiTranslation {
    /// Numeric translation id.
    translation_id: Value,
    /// Backend locale spelling.
    language_iso: String,
    /// Translated text.
    #[serde(default)]
    translation: String,
}

/// Renders a numeric or string id.
fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

/// Normalises a locale spelling for comparison.
fn locale_token(code: &str) -> String {
    code.trim().to_ascii_lowercase().replace('-', "_")
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Lokalise REST API client.
#[derive(Debug, Clone)]
pub struct LokaliseClient {
    /// HTTP client.
    client: Client,
    /// Parsed base URL.
    base_url: Url,
    /// Client configuration.
    config: LokaliseConfig,
}

impl LokaliseClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientSetupError`] when the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: LokaliseConfig) -> Result<Self, ClientSetupError> {
        let base_url = Url::parse(&config.base_url).map_err(|err| ClientSetupError::InvalidUrl(err.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientSetupError::InvalidUrl(config.base_url));
        }
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            base_url,
            config,
        })
    }

    /// Builds `<base>/projects/<project>/<segments...>`.
    fn endpoint(&self, project_id: &str, segments: &[&str]) -> Result<Url, ProviderFailure> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ProviderFailure::Fatal("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("projects")
            .push(project_id)
            .extend(segments);
        Ok(url)
    }

    /// Sends an authenticated request.
    async fn request(&self, method: reqwest::Method, url: Url, body: Option<Value>) -> Result<HttpReply, ProviderFailure> {
        let mut request = self
            .client
            .request(method, url)
            .header(ACCEPT, "application/json")
            .header(TOKEN_HEADER, self.config.api_token.as_str());
        if let Some(body) = body {
            let payload =
                serde_json::to_vec(&body).map_err(|err| ProviderFailure::Fatal(format!("request encoding failed: {err}")))?;
            request = request.header(CONTENT_TYPE, "application/json").body(payload);
        }
        send(request).await
    }

    /// Reads one page of keys.
    async fn fetch_page(&self, project_id: &str, page: u32, limit: u32) -> Result<Vec<ApiKey>, ProviderFailure> {
        let mut url = self.endpoint(project_id, &["keys"])?;
        url.query_pairs_mut()
            .append_pair("include_translations", "1")
            .append_pair("limit", &limit.to_string())
            .append_pair("page", &page.to_string());
        let reply = self.request(reqwest::Method::GET, url, None).await?;
        if !reply.status.is_success() {
            return Err(reply.failure());
        }
        let page: KeysPage = serde_json::from_slice(&reply.body)
            .map_err(|err| ProviderFailure::Fatal(format!("invalid keys page: {err}")))?;
        Ok(page.keys)
    }

    /// Writes one translation.
    async fn put_translation(&self, project_id: &str, entry: &TranslationEntry, translation_id: &BackendId) -> Result<Option<String>, ProviderFailure> {
        let url = self.endpoint(project_id, &["translations", translation_id.as_str()])?;
        let value = entry.value.clone().unwrap_or_default();
        let reply = self.request(reqwest::Method::PUT, url, Some(json!({ "translation": value }))).await?;
        if reply.status.is_success() {
            return Ok(None);
        }
        match reply.failure() {
            ProviderFailure::Fatal(message) if !matches!(reply.status.as_u16(), 401 | 403) => Ok(Some(message)),
            failure => Err(failure),
        }
    }
}

#[async_trait]
impl BackendClient for LokaliseClient {
    async fn fetch_snapshot(
        &self,
        project_id: &str,
        locales: &[SupportedLocale],
    ) -> Result<BackendSnapshot, ProviderFailure> {
        let wanted: BTreeMap<String, LocaleCode> =
            locales.iter().map(|locale| (locale_token(locale.backend_code()), locale.code.clone())).collect();
        let limit = self.config.page_size.clamp(1, MAX_PAGE_SIZE);
        let mut snapshot = BackendSnapshot::new();
        let mut keys_read = 0usize;
        for page in 1 ..= MAX_PAGES {
            let keys = self.fetch_page(project_id, page, limit).await?;
            let count = keys.len();
            keys_read += count;
            for key in keys {
                add_key(&mut snapshot, key, &wanted);
            }
            if count < usize::try_from(limit).unwrap_or(usize::MAX) {
                break;
            }
        }
        debug!(project_id, keys = keys_read, "backend snapshot fetched");
        Ok(snapshot)
    }

    async fn upload(&self, project_id: &str, entries: &[TranslationEntry]) -> Result<UploadOutcome, ProviderFailure> {
        let mut outcome = UploadOutcome::default();
        for entry in entries {
            let Some(translation_id) = entry.backend_id.as_ref() else {
                outcome.rejected.push(UploadRejection {
                    entry: entry.id(),
                    reason: "missing backend translation id".to_string(),
                });
                continue;
            };
            match self.put_translation(project_id, entry, translation_id).await? {
                None => outcome.accepted.push(entry.id()),
                Some(reason) => {
                    warn!(entry = %entry.id(), %reason, "translation refused by backend");
                    outcome.rejected.push(UploadRejection {
                        entry: entry.id(),
                        reason,
                    });
                }
            }
        }
        Ok(outcome)
    }

    async fn delete(&self, project_id: &str, key_ids: &[BackendId]) -> Result<(), ProviderFailure> {
        let ids: Vec<Value> = key_ids
            .iter()
            .map(|id| id.as_str().parse::<u64>().map_or_else(|_| Value::String(id.to_string()), Value::from))
            .collect();
        let url = self.endpoint(project_id, &["keys"])?;
        let reply = self.request(reqwest::Method::DELETE, url, Some(json!({ "keys": ids }))).await?;
        if !reply.status.is_success() {
            return Err(reply.failure());
        }
        debug!(project_id, keys = key_ids.len(), response = %body_preview(&reply.body), "backend keys deleted");
        Ok(())
    }
}

/// Adds one API key and its wanted translations to the snapshot.
fn add_key(snapshot: &mut BackendSnapshot, key: ApiKey, wanted: &BTreeMap<String, LocaleCode>) {
    let Some(key_id) = id_text(&key.key_id) else {
        return;
    };
    let mut names: BTreeMap<String, BTreeSet<Platform>> = BTreeMap::new();
    for platform in key.platforms.iter().filter_map(|label| Platform::parse(label)) {
        if let Some(name) = key.key_name.for_platform(platform) {
            names.entry(name.to_string()).or_default().insert(platform);
        }
    }
    for (name, platforms) in &names {
        snapshot.insert_key(name.clone(), BackendKeyRecord::new(key_id.as_str(), platforms.iter().copied()));
    }
    for translation in &key.translations {
        let Some(locale) = wanted.get(&locale_token(&translation.language_iso)) else {
            continue;
        };
        let translation_id = id_text(&translation.translation_id).map(BackendId::new);
        for (name, platforms) in &names {
            for platform in platforms {
                let mut entry = TranslationEntry::missing(
                    LocalizationKey::bare(name.clone(), *platform),
                    locale.clone(),
                    translation_id.clone(),
                );
                entry.value = Some(translation.translation.clone());
                entry.status = TranslationStatus::Uploaded;
                snapshot.insert_entry(entry);
            }
        }
    }
}
