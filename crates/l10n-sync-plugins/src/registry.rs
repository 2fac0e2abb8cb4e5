// crates/l10n-sync-plugins/src/registry.rs
// ============================================================================
// Module: Plugin Registry
// Description: Registry for discovered and compiled-in plugins.
// Purpose: Classify plugins by kind, apply enablement, and snapshot per run.
// Dependencies: l10n-sync-core, thiserror, tracing
// ============================================================================

//! ## Overview
//! The registry owns every known plugin in discovery order: manifests found in
//! the plugin directory (sorted by file name) followed by compiled-in plugins
//! in registration order. Enablement is resolved against [`PluginSettings`]:
//! an explicit entry wins, otherwise `auto_discover` decides.
//! Configured names with no plugin behind them are reported as missing; they
//! are never an error because the configuration may name plugins that are
//! only installed on some machines.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use l10n_sync_core::ActionPlugin;
use l10n_sync_core::ExtensionPlugin;
use l10n_sync_core::PluginError;
use l10n_sync_core::PluginKind;
use l10n_sync_core::PluginName;
use l10n_sync_core::PromptPlugin;
use l10n_sync_core::runtime::PluginCatalog;
use l10n_sync_core::runtime::PluginSet;
use thiserror::Error;
use tracing::debug;
use tracing::warn;

use crate::handlers::PluginHandle;
use crate::handlers::build_handler;
use crate::manifest::PluginManifest;

// ============================================================================
// SECTION: Settings
// ============================================================================

/// Plugin enablement settings.
///
/// # Invariants
/// - An entry in `enabled` overrides `auto_discover` for that name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginSettings {
    /// Enables plugins that have no explicit entry.
    pub auto_discover: bool,
    /// Explicit per-plugin enablement.
    pub enabled: BTreeMap<String, bool>,
}

impl PluginSettings {
    /// Returns whether `name` participates in dispatch.
    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.get(name).copied().unwrap_or(self.auto_discover)
    }
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            auto_discover: true,
            enabled: BTreeMap::new(),
        }
    }
}

// ============================================================================
// SECTION: Listings and Issues
// ============================================================================

/// Where a plugin came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginSource {
    /// Discovered manifest file.
    Manifest(PathBuf),
    /// Registered in code.
    Compiled,
}

impl fmt::Display for PluginSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manifest(path) => write!(f, "{}", path.display()),
            Self::Compiled => f.write_str("compiled-in"),
        }
    }
}

/// Registry view of one plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginListing {
    /// Plugin name.
    pub name: PluginName,
    /// Extension point.
    pub kind: PluginKind,
    /// Whether the plugin participates in dispatch.
    pub enabled: bool,
    /// Manifest description.
    pub description: Option<String>,
    /// Origin of the plugin.
    pub source: PluginSource,
}

/// Manifest excluded during discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryIssue {
    /// Manifest path.
    pub path: PathBuf,
    /// Reason for exclusion.
    pub message: String,
}

impl fmt::Display for DiscoveryIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.message)
    }
}

/// Plugin registry errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PluginRegistryError {
    /// Plugin directory could not be listed.
    #[error("plugin directory io error: {0}")]
    Io(String),
    /// Plugin name already registered.
    #[error("plugin already registered: {0}")]
    Duplicate(String),
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// One registered plugin.
#[derive(Clone)]
struct PluginUnit {
    /// Plugin name.
    name: PluginName,
    /// Manifest description.
    description: Option<String>,
    /// Origin of the plugin.
    source: PluginSource,
    /// Typed handler.
    handle: PluginHandle,
}

/// Registry of discovered and compiled-in plugins.
///
/// # Invariants
/// - Plugin names are unique.
/// - Units keep discovery order; snapshots preserve it.
#[derive(Clone, Default)]
pub struct PluginRegistry {
    /// Plugins in discovery order.
    units: Vec<PluginUnit>,
    /// Enablement settings.
    settings: PluginSettings,
    /// Manifests excluded during discovery.
    issues: Vec<DiscoveryIssue>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(settings: PluginSettings) -> Self {
        Self {
            units: Vec::new(),
            settings,
            issues: Vec::new(),
        }
    }

    /// Discovers manifests in `dir`. A missing directory yields an empty registry.
    ///
    /// # Errors
    ///
    /// Returns [`PluginRegistryError::Io`] when the directory exists but cannot
    /// be listed.
    pub fn discover(dir: &Path, settings: PluginSettings) -> Result<Self, PluginRegistryError> {
        let mut registry = Self::new(settings);
        let listing = match fs::read_dir(dir) {
            Ok(listing) => listing,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(dir = %dir.display(), "plugin directory absent");
                return Ok(registry);
            }
            Err(err) => return Err(PluginRegistryError::Io(format!("{}: {err}", dir.display()))),
        };
        let mut manifests = Vec::new();
        for entry in listing {
            let entry = entry.map_err(|err| PluginRegistryError::Io(format!("{}: {err}", dir.display())))?;
            let path = entry.path();
            let is_manifest = path.extension().is_some_and(|extension| extension.eq_ignore_ascii_case("toml"));
            if is_manifest && path.is_file() {
                manifests.push(path);
            }
        }
        manifests.sort_by(|left, right| left.file_name().cmp(&right.file_name()));
        for path in manifests {
            if let Err(message) = registry.load_manifest(dir, &path) {
                warn!(path = %path.display(), %message, "plugin manifest excluded");
                registry.issues.push(DiscoveryIssue {
                    path,
                    message,
                });
            }
        }
        debug!(dir = %dir.display(), plugins = registry.units.len(), issues = registry.issues.len(), "plugins discovered");
        Ok(registry)
    }

    /// Loads one manifest into the registry.
    fn load_manifest(&mut self, dir: &Path, path: &Path) -> Result<(), String> {
        let name = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.trim().is_empty())
            .ok_or_else(|| "manifest file name is not a valid plugin name".to_string())?;
        let manifest = PluginManifest::load(path)?;
        let kind = PluginKind::parse(&manifest.kind).ok_or_else(|| format!("unknown plugin kind `{}`", manifest.kind))?;
        let handle = build_handler(kind, &manifest, dir).map_err(|err| err.to_string())?;
        self.insert(PluginUnit {
            name: PluginName::new(name),
            description: manifest.description,
            source: PluginSource::Manifest(path.to_path_buf()),
            handle,
        })
        .map_err(|err| err.to_string())
    }

    /// Adds a unit, rejecting duplicate names.
    fn insert(&mut self, unit: PluginUnit) -> Result<(), PluginRegistryError> {
        if self.units.iter().any(|existing| existing.name == unit.name) {
            return Err(PluginRegistryError::Duplicate(unit.name.to_string()));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Registers a compiled-in action plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginRegistryError::Duplicate`] when the name is taken.
    pub fn register_action(
        &mut self,
        name: impl Into<PluginName>,
        handler: Arc<dyn ActionPlugin>,
    ) -> Result<(), PluginRegistryError> {
        self.register(name.into(), PluginHandle::Action(handler))
    }

    /// Registers a compiled-in prompt plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginRegistryError::Duplicate`] when the name is taken.
    pub fn register_prompt(
        &mut self,
        name: impl Into<PluginName>,
        handler: Arc<dyn PromptPlugin>,
    ) -> Result<(), PluginRegistryError> {
        self.register(name.into(), PluginHandle::Prompt(handler))
    }

    /// Registers a compiled-in extension plugin.
    ///
    /// # Errors
    ///
    /// Returns [`PluginRegistryError::Duplicate`] when the name is taken.
    pub fn register_extension(
        &mut self,
        name: impl Into<PluginName>,
        handler: Arc<dyn ExtensionPlugin>,
    ) -> Result<(), PluginRegistryError> {
        self.register(name.into(), PluginHandle::Extension(handler))
    }

    /// Registers a compiled-in handle.
    fn register(&mut self, name: PluginName, handle: PluginHandle) -> Result<(), PluginRegistryError> {
        self.insert(PluginUnit {
            name,
            description: None,
            source: PluginSource::Compiled,
            handle,
        })
    }

    /// Returns the enablement settings.
    #[must_use]
    pub const fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    /// Returns every known plugin in discovery order.
    #[must_use]
    pub fn listings(&self) -> Vec<PluginListing> {
        self.units
            .iter()
            .map(|unit| PluginListing {
                name: unit.name.clone(),
                kind: unit.handle.kind(),
                enabled: self.settings.is_enabled(unit.name.as_str()),
                description: unit.description.clone(),
                source: unit.source.clone(),
            })
            .collect()
    }

    /// Returns configured plugin names with no registered plugin.
    #[must_use]
    pub fn missing(&self) -> Vec<String> {
        let known: BTreeSet<&str> = self.units.iter().map(|unit| unit.name.as_str()).collect();
        self.settings.enabled.keys().filter(|name| !known.contains(name.as_str())).cloned().collect()
    }

    /// Returns manifests excluded during discovery.
    #[must_use]
    pub fn issues(&self) -> &[DiscoveryIssue] {
        &self.issues
    }

    /// Builds the dispatch set for a run.
    #[must_use]
    pub fn plugin_set(&self) -> PluginSet {
        self.units.iter().fold(PluginSet::new(), |set, unit| {
            let enabled = self.settings.is_enabled(unit.name.as_str());
            let name = unit.name.clone();
            match &unit.handle {
                PluginHandle::Action(handler) => set.with_action(name, enabled, Arc::clone(handler)),
                PluginHandle::Prompt(handler) => set.with_prompt(name, enabled, Arc::clone(handler)),
                PluginHandle::Extension(handler) => set.with_extension(name, enabled, Arc::clone(handler)),
            }
        })
    }
}

impl PluginCatalog for PluginRegistry {
    fn snapshot(&self) -> Result<PluginSet, PluginError> {
        Ok(self.plugin_set())
    }
}
