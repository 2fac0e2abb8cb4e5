// crates/l10n-sync-providers/src/openai.rs
// ============================================================================
// Module: OpenAI Translation Client
// Description: TranslationProvider backed by a chat completions endpoint.
// Purpose: Translate key batches into one locale per request.
// Dependencies: l10n-sync-core, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! Each batch becomes one JSON-mode chat completion. The user message is a
//! JSON object mapping key identifiers to base values; the model answers with
//! the same identifiers mapped to translations. Identifiers the model leaves
//! out stay untranslated. A reply that is not a JSON object is treated as
//! transient, so the gateway asks again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::ProviderFailure;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::TranslationBatch;
use l10n_sync_core::TranslationProvider;
use reqwest::Client;
use reqwest::Url;
use reqwest::header::AUTHORIZATION;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;
use tracing::debug;

use crate::http::ClientSetupError;
use crate::http::build_client;
use crate::http::send;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Default OpenAI API base URL.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Translation client configuration.
///
/// # Invariants
/// - `Debug` output never includes the key.
#[derive(Clone, PartialEq)]
pub struct OpenAiConfig {
    /// API base URL.
    pub base_url: String,
    /// API key.
    pub api_key: String,
    /// Chat model name.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Whole-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl OpenAiConfig {
    /// Creates a configuration for the public API.
    #[must_use]
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_OPENAI_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.2,
            timeout_ms: 120_000,
        }
    }
}

impl fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

// ============================================================================
// SECTION: Wire Types
// ============================================================================

/// Chat completion response.
#[derive(Debug, Deserialize)]
struct Completion {
    /// Candidate replies.
    #[serde(default)]
    choices: Vec<Choice>,
}

/// One candidate reply.
#[derive(Debug, Deserialize)]
struct Choice {
    /// Assistant message.
    message: Message,
}

/// Assistant message.
#[derive(Debug, Deserialize)]
struct Message {
    /// Message text.
    #[serde(default)]
    content: Option<String>,
}

// ============================================================================
// SECTION: Prompt
// ============================================================================

/// Builds the system prompt for one locale.
fn system_prompt(locale: &SupportedLocale, addendum: &str) -> String {
    let mut prompt = format!(
        "You are a professional software localization expert translating user interface strings.\n\
         Translate every value of the JSON object in the user message into {name} (language code: `{code}`).\n\
         Reply with a JSON object that has exactly the same keys, each mapped to its translation.\n\
         Preserve placeholders (like `{{variable}}`, `%s`, `%d`, `%@`) exactly as they appear.\n\
         Keep a neutral, clear tone suitable for software and leave URLs untouched.",
        name = locale.name,
        code = locale.code,
    );
    let addendum = addendum.trim();
    if !addendum.is_empty() {
        prompt.push_str("\n\nAdditional instructions:\n");
        prompt.push_str(addendum);
    }
    prompt
}

// ============================================================================
// SECTION: Client
// ============================================================================

/// Chat completions translation client.
#[derive(Debug, Clone)]
pub struct OpenAiTranslator {
    /// HTTP client.
    client: Client,
    /// Completions endpoint.
    endpoint: Url,
    /// Client configuration.
    config: OpenAiConfig,
}

impl OpenAiTranslator {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientSetupError`] when the base URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, ClientSetupError> {
        let mut endpoint =
            Url::parse(&config.base_url).map_err(|err| ClientSetupError::InvalidUrl(err.to_string()))?;
        endpoint
            .path_segments_mut()
            .map_err(|()| ClientSetupError::InvalidUrl(config.base_url.clone()))?
            .pop_if_empty()
            .push("chat")
            .push("completions");
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            endpoint,
            config,
        })
    }
}

#[async_trait]
impl TranslationProvider for OpenAiTranslator {
    async fn translate(
        &self,
        batch: &TranslationBatch,
        prompt_addendum: &str,
    ) -> Result<BTreeMap<LocalizationKey, String>, ProviderFailure> {
        if batch.keys.is_empty() {
            return Ok(BTreeMap::new());
        }
        let source: serde_json::Map<String, Value> = batch
            .keys
            .iter()
            .map(|key| (key.identifier.clone(), Value::String(key.base_value.clone())))
            .collect();
        let body = json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system_prompt(&batch.locale, prompt_addendum) },
                { "role": "user", "content": Value::Object(source).to_string() },
            ],
        });
        let payload =
            serde_json::to_vec(&body).map_err(|err| ProviderFailure::Fatal(format!("request encoding failed: {err}")))?;
        let request = self
            .client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(CONTENT_TYPE, "application/json")
            .body(payload);
        let reply = send(request).await?;
        if !reply.status.is_success() {
            return Err(reply.failure());
        }

        let completion: Completion = serde_json::from_slice(&reply.body)
            .map_err(|err| ProviderFailure::Transient(format!("invalid completion response: {err}")))?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderFailure::Transient("completion carried no content".to_string()))?;
        let translated: BTreeMap<String, Value> = serde_json::from_str(content.trim())
            .map_err(|err| ProviderFailure::Transient(format!("completion is not a json object: {err}")))?;

        let mut result = BTreeMap::new();
        for key in &batch.keys {
            if let Some(Value::String(value)) = translated.get(&key.identifier) {
                result.insert(key.clone(), value.clone());
            }
        }
        debug!(locale = %batch.locale.code, requested = batch.keys.len(), translated = result.len(), "batch translated");
        Ok(result)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use l10n_sync_core::SupportedLocale;

    use super::system_prompt;

    #[test]
    fn prompt_names_the_language_and_appends_addendum() {
        let locale = SupportedLocale::new("de", "German");
        let prompt = system_prompt(&locale, "  Use du, not Sie.  ");
        assert!(prompt.contains("into German (language code: `de`)"));
        assert!(prompt.contains("`{variable}`"));
        assert!(prompt.ends_with("Additional instructions:\nUse du, not Sie."));
        assert!(!system_prompt(&locale, "  ").contains("Additional instructions"));
    }
}
