// crates/l10n-sync-providers/src/lib.rs
// ============================================================================
// Module: L10n Sync Providers
// Description: Concrete collaborators for extraction, backend access, and translation.
// Purpose: Implement the core capability interfaces against real systems.
// Dependencies: l10n-sync-core, regex, reqwest, serde, serde_json, walkdir
// ============================================================================

//! ## Overview
//! - [`SourceExtractor`] walks iOS and Android source trees and collects the
//!   localization keys the code references.
//! - [`LokaliseClient`] reads keys and translations from a Lokalise-style
//!   REST API, writes translations, and deletes keys.
//! - [`OpenAiTranslator`] translates batches through an OpenAI-style chat
//!   completions endpoint.
//!
//! ## Invariants
//! - Network clients classify every failure into
//!   [`l10n_sync_core::ProviderFailure`]; they never retry on their own.
//! - Response bodies are read under a hard byte limit.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod extractor;
pub mod http;
pub mod lokalise;
pub mod openai;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use extractor::SKIPPED_DIRECTORIES;
pub use extractor::SourceExtractor;
pub use http::ClientSetupError;
pub use http::MAX_RESPONSE_BYTES;
pub use http::classify_status;
pub use http::parse_retry_after;
pub use lokalise::DEFAULT_LOKALISE_URL;
pub use lokalise::LokaliseClient;
pub use lokalise::LokaliseConfig;
pub use openai::DEFAULT_OPENAI_URL;
pub use openai::OpenAiConfig;
pub use openai::OpenAiTranslator;
