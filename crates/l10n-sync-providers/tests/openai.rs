// crates/l10n-sync-providers/tests/openai.rs
// ============================================================================
// Module: OpenAI Client Tests
// Description: Tests for the chat completions translator against a local server.
// Purpose: Validate request shape, reply mapping, and failure classification.
// ============================================================================

//! ## Overview
//! Scripts a local completions endpoint and checks:
//! - The request carries the model, JSON mode, and the source strings
//! - Replies map back onto every platform sharing an identifier
//! - Malformed replies are transient; 429 and 401 classify as usual

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only assertions and helpers are permitted."
)]

mod common;

use std::time::Duration;

use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::ProviderFailure;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::TranslationBatch;
use l10n_sync_core::TranslationProvider;
use l10n_sync_providers::OpenAiConfig;
use l10n_sync_providers::OpenAiTranslator;
use serde_json::json;

use crate::common::Canned;
use crate::common::serve;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn translator(base: &str) -> OpenAiTranslator {
    let mut config = OpenAiConfig::new("sk-test", "gpt-4o-mini");
    config.base_url = format!("{base}/v1");
    config.timeout_ms = 5_000;
    OpenAiTranslator::new(config).unwrap()
}

fn batch() -> TranslationBatch {
    TranslationBatch {
        locale: SupportedLocale::new("de", "German"),
        keys: vec![
            LocalizationKey::new("greeting", Platform::Ios, "Hello"),
            LocalizationKey::new("greeting", Platform::Android, "Hello"),
            LocalizationKey::new("title", Platform::Ios, "Title"),
        ],
    }
}

fn completion(content: &str) -> String {
    json!({
        "id": "chatcmpl-1",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }]
    })
    .to_string()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[tokio::test]
async fn translations_map_onto_every_matching_key() {
    let reply = completion(r#"{"greeting": "Hallo", "unrequested": "x"}"#);
    let (base, server) = serve(vec![Canned::json(200, &reply)]);

    let result = translator(&base).translate(&batch(), "Use du, not Sie.").await.unwrap();
    let requests = server.join().unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result[&LocalizationKey::bare("greeting", Platform::Ios)], "Hallo");
    assert_eq!(result[&LocalizationKey::bare("greeting", Platform::Android)], "Hallo");
    assert!(!result.contains_key(&LocalizationKey::bare("title", Platform::Ios)));

    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.url, "/v1/chat/completions");
    assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
    let body = request.json();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["response_format"]["type"], "json_object");
    let system = body["messages"][0]["content"].as_str().unwrap();
    assert!(system.contains("German"));
    assert!(system.ends_with("Use du, not Sie."));
    let source: serde_json::Value = serde_json::from_str(body["messages"][1]["content"].as_str().unwrap()).unwrap();
    assert_eq!(source, json!({ "greeting": "Hello", "title": "Title" }));
}

#[tokio::test]
async fn malformed_replies_are_transient() {
    let (base, server) = serve(vec![
        Canned::json(200, &completion("Sure! Here are your translations.")),
        Canned::json(200, r#"{"choices": []}"#),
        Canned::json(200, "<html>gateway</html>"),
    ]);
    let translator = translator(&base);
    for _ in 0 .. 3 {
        let failure = translator.translate(&batch(), "").await.unwrap_err();
        assert!(matches!(failure, ProviderFailure::Transient(_)), "unexpected failure: {failure:?}");
    }
    server.join().unwrap();
}

#[tokio::test]
async fn status_failures_classify() {
    let (base, server) = serve(vec![
        Canned::json(429, r#"{"error":{"message":"Rate limit reached"}}"#).with_header("Retry-After", "2"),
        Canned::json(401, r#"{"error":{"message":"Incorrect API key provided"}}"#),
    ]);
    let translator = translator(&base);

    let limited = translator.translate(&batch(), "").await.unwrap_err();
    assert!(matches!(limited, ProviderFailure::RateLimited { retry_after: Some(wait), .. } if wait == Duration::from_secs(2)));

    let unauthorized = translator.translate(&batch(), "").await.unwrap_err();
    assert!(matches!(unauthorized, ProviderFailure::Fatal(message) if message.contains("Incorrect API key")));
    server.join().unwrap();
}

#[tokio::test]
async fn empty_batches_skip_the_network() {
    let translator = translator("http://127.0.0.1:9");
    let empty = TranslationBatch { locale: SupportedLocale::new("de", "German"), keys: Vec::new() };
    assert!(translator.translate(&empty, "").await.unwrap().is_empty());
}

#[test]
fn debug_output_redacts_the_key() {
    let rendered = format!("{:?}", OpenAiConfig::new("sk-test", "gpt-4o-mini"));
    assert!(!rendered.contains("sk-test"));
}
