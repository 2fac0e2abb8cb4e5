// crates/l10n-sync-providers/tests/lokalise.rs
// ============================================================================
// Module: Lokalise Client Tests
// Description: Tests for the Lokalise backend client against a local server.
// Purpose: Validate pagination, locale mapping, uploads, deletion, and failures.
// ============================================================================

//! ## Overview
//! Each test scripts a local HTTP server and checks both what the client
//! returns and what it sent:
//! - Snapshots page until a short page and map backend locale spellings
//! - Uploads report refused entries without failing the batch
//! - Rate limiting, outages, and bad credentials classify correctly
//! - Deletion sends numeric key ids

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

use l10n_sync_core::BackendClient;
use l10n_sync_core::BackendId;
use l10n_sync_core::LocaleCode;
use l10n_sync_core::LocalizationKey;
use l10n_sync_core::Platform;
use l10n_sync_core::ProviderFailure;
use l10n_sync_core::SupportedLocale;
use l10n_sync_core::TranslationEntry;
use l10n_sync_core::TranslationOrigin;
use l10n_sync_providers::LokaliseClient;
use l10n_sync_providers::LokaliseConfig;
use serde_json::json;

use crate::common::Canned;
use crate::common::serve;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn client(base: &str, page_size: u32) -> LokaliseClient {
    let mut config = LokaliseConfig::new("secret-token");
    config.base_url = format!("{base}/api2");
    config.timeout_ms = 5_000;
    config.page_size = page_size;
    LokaliseClient::new(config).unwrap()
}

fn locales() -> Vec<SupportedLocale> {
    vec![SupportedLocale::new("en", "English"), SupportedLocale::new("tr", "Turkish").with_backend_code("tr_TR")]
}

fn translated(identifier: &str, locale: &str, value: &str, backend_id: Option<&str>) -> TranslationEntry {
    let mut entry = TranslationEntry::missing(
        LocalizationKey::new(identifier, Platform::Ios, "Hello"),
        LocaleCode::new(locale),
        backend_id.map(BackendId::new),
    );
    entry.mark_translated(value, TranslationOrigin::Provider).unwrap();
    entry
}

// ============================================================================
// SECTION: Snapshot
// ============================================================================

#[tokio::test]
async fn snapshot_pages_until_short_page_and_maps_locales() {
    let first = json!({
        "project_id": "p1",
        "keys": [
            {
                "key_id": 11,
                "key_name": { "ios": "greeting", "android": "greeting", "web": "", "other": "" },
                "platforms": ["ios", "android"],
                "translations": [
                    { "translation_id": 101, "language_iso": "en", "translation": "Hello" },
                    { "translation_id": 102, "language_iso": "tr_TR", "translation": "Merhaba" },
                    { "translation_id": 103, "language_iso": "fr", "translation": "Bonjour" }
                ]
            },
            { "key_id": 12, "key_name": "legacy_web", "platforms": ["web"], "translations": [] }
        ]
    });
    let second = json!({
        "keys": [
            {
                "key_id": "13",
                "key_name": { "ios": "title_ios", "android": "title" },
                "platforms": ["ios", "android"],
                "translations": [{ "translation_id": 131, "language_iso": "tr-tr", "translation": "" }]
            }
        ]
    });
    let (base, server) =
        serve(vec![Canned::json(200, &first.to_string()), Canned::json(200, &second.to_string())]);

    let snapshot = client(&base, 2).fetch_snapshot("p1", &locales()).await.unwrap();
    let requests = server.join().unwrap();

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].url, "/api2/projects/p1/keys?include_translations=1&limit=2&page=1");
    assert_eq!(requests[1].url, "/api2/projects/p1/keys?include_translations=1&limit=2&page=2");
    assert_eq!(requests[0].header("x-api-token"), Some("secret-token"));

    let names: Vec<&str> = snapshot.keys.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["greeting", "title", "title_ios"]);
    assert_eq!(snapshot.keys["greeting"].key_id, BackendId::new("11"));
    assert_eq!(snapshot.keys["greeting"].platforms.len(), 2);
    assert_eq!(snapshot.keys["title_ios"].platforms.iter().copied().collect::<Vec<_>>(), vec![Platform::Ios]);
    assert_eq!(snapshot.keys["title"].key_id, BackendId::new("13"));

    let tr = LocaleCode::new("tr");
    assert!(!snapshot.entries.contains_key(&LocaleCode::new("fr")));
    assert_eq!(snapshot.translation_id("greeting", Platform::Android, &tr), Some(BackendId::new("102")));
    assert_eq!(snapshot.translation_id("title", Platform::Android, &tr), Some(BackendId::new("131")));
    assert_eq!(snapshot.translated_identifiers(&tr, Platform::Ios).into_iter().collect::<Vec<_>>(), vec!["greeting"]);
    assert_eq!(snapshot.base_value("greeting", Platform::Ios, &LocaleCode::new("en")), Some("Hello"));
}

#[tokio::test]
async fn snapshot_failures_classify_by_status() {
    let (base, server) = serve(vec![
        Canned::json(401, r#"{"error":{"message":"Invalid `X-Api-Token` header","code":401}}"#),
        Canned::json(503, "upstream unavailable"),
        Canned::json(429, "slow down").with_header("Retry-After", "5"),
    ]);
    let client = client(&base, 500);

    let unauthorized = client.fetch_snapshot("p1", &locales()).await.unwrap_err();
    assert!(matches!(unauthorized, ProviderFailure::Fatal(message) if message.contains("401")));

    let outage = client.fetch_snapshot("p1", &locales()).await.unwrap_err();
    assert!(matches!(outage, ProviderFailure::Transient(message) if message.contains("upstream unavailable")));

    let limited = client.fetch_snapshot("p1", &locales()).await.unwrap_err();
    assert!(matches!(limited, ProviderFailure::RateLimited { retry_after: Some(wait), .. } if wait == Duration::from_secs(5)));
    server.join().unwrap();
}

// ============================================================================
// SECTION: Upload
// ============================================================================

#[tokio::test]
async fn upload_reports_refused_entries_per_entry() {
    let (base, server) = serve(vec![
        Canned::json(200, r#"{"translation":{"translation_id":201}}"#),
        Canned::json(404, r#"{"error":{"message":"Not found","code":404}}"#),
    ]);
    let entries = vec![
        translated("orphan", "de", "Waise", None),
        translated("greeting", "de", "Hallo", Some("201")),
        translated("title", "de", "Titel", Some("202")),
    ];

    let outcome = client(&base, 500).upload("p1", &entries).await.unwrap();
    let requests = server.join().unwrap();

    assert_eq!(outcome.accepted, vec![entries[1].id()]);
    assert_eq!(outcome.rejected.len(), 2);
    assert_eq!(outcome.rejected[0].entry, entries[0].id());
    assert_eq!(outcome.rejected[0].reason, "missing backend translation id");
    assert_eq!(outcome.rejected[1].entry, entries[2].id());
    assert!(outcome.rejected[1].reason.contains("404"));

    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].url, "/api2/projects/p1/translations/201");
    assert_eq!(requests[0].json(), json!({ "translation": "Hallo" }));
    assert_eq!(requests[1].url, "/api2/projects/p1/translations/202");
}

#[tokio::test]
async fn upload_fails_the_batch_on_rate_limit_and_bad_credentials() {
    let (base, server) = serve(vec![
        Canned::json(429, "").with_header("Retry-After", "7"),
        Canned::json(403, r#"{"error":{"message":"Forbidden","code":403}}"#),
    ]);
    let client = client(&base, 500);
    let entries = vec![translated("greeting", "de", "Hallo", Some("201"))];

    let limited = client.upload("p1", &entries).await.unwrap_err();
    assert!(matches!(limited, ProviderFailure::RateLimited { retry_after: Some(wait), .. } if wait == Duration::from_secs(7)));

    let forbidden = client.upload("p1", &entries).await.unwrap_err();
    assert!(matches!(forbidden, ProviderFailure::Fatal(_)));
    server.join().unwrap();
}

// ============================================================================
// SECTION: Delete
// ============================================================================

#[tokio::test]
async fn delete_sends_numeric_key_ids() {
    let (base, server) = serve(vec![Canned::json(200, r#"{"keys_removed":true}"#)]);
    client(&base, 500).delete("p1", &[BackendId::new("11"), BackendId::new("13")]).await.unwrap();
    let requests = server.join().unwrap();
    assert_eq!(requests[0].method, "DELETE");
    assert_eq!(requests[0].url, "/api2/projects/p1/keys");
    assert_eq!(requests[0].json(), json!({ "keys": [11, 13] }));
}

#[test]
fn debug_output_redacts_the_token() {
    let rendered = format!("{:?}", LokaliseConfig::new("secret-token"));
    assert!(!rendered.contains("secret-token"));
    assert!(rendered.contains("<redacted>"));
}

#[test]
fn rejects_unusable_base_urls() {
    let mut config = LokaliseConfig::new("token");
    config.base_url = "not a url".to_string();
    assert!(LokaliseClient::new(config.clone()).is_err());
    config.base_url = "mailto:ops@example.com".to_string();
    assert!(LokaliseClient::new(config).is_err());
}
