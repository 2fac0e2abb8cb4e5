// crates/l10n-sync-plugins/src/lib.rs
// ============================================================================
// Module: L10n Sync Plugins
// Description: Plugin registry with manifest discovery and built-in handlers.
// Purpose: Turn a plugin directory plus enablement settings into run snapshots.
// Dependencies: l10n-sync-core, csv, regex, serde, toml, tracing
// ============================================================================

//! ## Overview
//! A plugin directory holds one `*.toml` manifest per plugin. Each manifest
//! names its extension point (`kind`), the built-in `handler` implementing it,
//! and handler parameters. [`PluginRegistry`] discovers manifests in file-name
//! order, applies the enablement settings, accepts compiled-in plugins, and
//! implements [`l10n_sync_core::runtime::PluginCatalog`] so the orchestrator can
//! snapshot it at run start.
//!
//! ## Invariants
//! - A manifest that cannot be read or interpreted is excluded and recorded as
//!   a [`DiscoveryIssue`]; discovery never fails because of one bad manifest.
//! - Plugin names are unique; the manifest file stem is the plugin name.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod handlers;
pub mod manifest;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use handlers::InjectTranslations;
pub use handlers::PatternFilter;
pub use handlers::PluginHandle;
pub use handlers::PromptText;
pub use handlers::build_handler;
pub use manifest::MAX_MANIFEST_BYTES;
pub use manifest::PluginManifest;
pub use registry::DiscoveryIssue;
pub use registry::PluginListing;
pub use registry::PluginRegistry;
pub use registry::PluginRegistryError;
pub use registry::PluginSettings;
pub use registry::PluginSource;
