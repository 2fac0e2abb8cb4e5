// crates/l10n-sync-core/src/runtime/plugins.rs
// ============================================================================
// Module: L10n Sync Plugin Dispatch
// Description: Immutable per-run plugin snapshot with typed dispatch per extension point.
// Purpose: Apply action, prompt, and extension plugins with deterministic policies.
// Dependencies: thiserror, tracing, crate::{core, interfaces}
// ============================================================================

//! ## Overview
//! A [`PluginSet`] is captured once when a run starts; enablement changes made
//! afterwards are only seen by the next run. Dispatch follows fixed policies:
//! - Action plugins run in discovery order and the first bypass wins.
//! - Prompt contributions are joined with newlines in discovery order.
//! - Extension plugins are composed as a pipeline; they may remove or skip
//!   entries but never introduce an entry they did not receive.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::core::EntryId;
use crate::core::PluginName;
use crate::core::TranslationEntry;
use crate::core::TranslationStatus;
use crate::interfaces::ActionContext;
use crate::interfaces::ActionOutcome;
use crate::interfaces::ActionPlugin;
use crate::interfaces::BypassValue;
use crate::interfaces::ExtensionPlugin;
use crate::interfaces::PluginDescriptor;
use crate::interfaces::PluginError;
use crate::interfaces::PluginKind;
use crate::interfaces::PromptContext;
use crate::interfaces::PromptPlugin;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// A plugin failed during dispatch; the dispatch call is aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} plugin {plugin} failed: {message}")]
pub struct PluginExecutionError {
    /// Failing plugin.
    pub plugin: PluginName,
    /// Extension point being dispatched.
    pub kind: PluginKind,
    /// Failure detail.
    pub message: String,
}

impl PluginExecutionError {
    /// Builds an execution error from a plugin error.
    fn from_plugin(plugin: &PluginName, kind: PluginKind, err: &PluginError) -> Self {
        Self {
            plugin: plugin.clone(),
            kind,
            message: err.to_string(),
        }
    }

    /// Builds an execution error for a contract violation.
    fn violation(plugin: &PluginName, kind: PluginKind, message: String) -> Self {
        Self {
            plugin: plugin.clone(),
            kind,
            message,
        }
    }
}

// ============================================================================
// SECTION: Plugin Set
// ============================================================================

/// Named plugin handler.
struct Registered<T: ?Sized> {
    /// Plugin name.
    name: PluginName,
    /// Shared handler.
    handler: Arc<T>,
}

impl<T: ?Sized> Clone for Registered<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Result of action dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionResult {
    /// True when a plugin bypassed translation.
    pub bypassed: bool,
    /// Plugin that bypassed, if any.
    pub plugin: Option<PluginName>,
    /// Values supplied by the bypassing plugin.
    pub payload: Vec<BypassValue>,
}

/// Immutable plugin snapshot for one run.
///
/// # Invariants
/// - Dispatch lists contain enabled plugins only, in discovery order.
/// - `descriptors` lists every known plugin, enabled or not.
#[derive(Clone, Default)]
pub struct PluginSet {
    /// Every known plugin in discovery order.
    descriptors: Vec<PluginDescriptor>,
    /// Enabled action plugins.
    actions: Vec<Registered<dyn ActionPlugin>>,
    /// Enabled prompt plugins.
    prompts: Vec<Registered<dyn PromptPlugin>>,
    /// Enabled extension plugins.
    extensions: Vec<Registered<dyn ExtensionPlugin>>,
}

impl PluginSet {
    /// Creates an empty plugin set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an action plugin.
    #[must_use]
    pub fn with_action(mut self, name: impl Into<PluginName>, enabled: bool, handler: Arc<dyn ActionPlugin>) -> Self {
        let name = name.into();
        self.push_descriptor(&name, PluginKind::Action, enabled);
        if enabled {
            self.actions.push(Registered { name, handler });
        }
        self
    }

    /// Adds a prompt plugin.
    #[must_use]
    pub fn with_prompt(mut self, name: impl Into<PluginName>, enabled: bool, handler: Arc<dyn PromptPlugin>) -> Self {
        let name = name.into();
        self.push_descriptor(&name, PluginKind::Prompt, enabled);
        if enabled {
            self.prompts.push(Registered { name, handler });
        }
        self
    }

    /// Adds an extension plugin.
    #[must_use]
    pub fn with_extension(
        mut self,
        name: impl Into<PluginName>,
        enabled: bool,
        handler: Arc<dyn ExtensionPlugin>,
    ) -> Self {
        let name = name.into();
        self.push_descriptor(&name, PluginKind::Extension, enabled);
        if enabled {
            self.extensions.push(Registered { name, handler });
        }
        self
    }

    /// Records a descriptor.
    fn push_descriptor(&mut self, name: &PluginName, kind: PluginKind, enabled: bool) {
        self.descriptors.push(PluginDescriptor {
            name: name.clone(),
            kind,
            enabled,
        });
    }

    /// Returns every known plugin in discovery order.
    #[must_use]
    pub fn descriptors(&self) -> &[PluginDescriptor] {
        &self.descriptors
    }

    /// Returns the number of enabled plugins of `kind`.
    #[must_use]
    pub fn enabled_count(&self, kind: PluginKind) -> usize {
        match kind {
            PluginKind::Action => self.actions.len(),
            PluginKind::Prompt => self.prompts.len(),
            PluginKind::Extension => self.extensions.len(),
        }
    }

    /// Runs action plugins until one bypasses.
    ///
    /// # Errors
    ///
    /// Returns [`PluginExecutionError`] when a plugin fails; later plugins are not run.
    pub fn dispatch_action(&self, ctx: &ActionContext<'_>) -> Result<ActionResult, PluginExecutionError> {
        for plugin in &self.actions {
            let outcome = plugin
                .handler
                .run(ctx)
                .map_err(|err| PluginExecutionError::from_plugin(&plugin.name, PluginKind::Action, &err))?;
            if let ActionOutcome::Bypass(payload) = outcome {
                debug!(plugin = %plugin.name, values = payload.len(), "action plugin bypassed translation");
                return Ok(ActionResult {
                    bypassed: true,
                    plugin: Some(plugin.name.clone()),
                    payload,
                });
            }
        }
        Ok(ActionResult::default())
    }

    /// Collects the prompt addendum.
    ///
    /// # Errors
    ///
    /// Returns [`PluginExecutionError`] when a plugin fails.
    pub fn dispatch_prompt(&self, ctx: &PromptContext<'_>) -> Result<String, PluginExecutionError> {
        let mut parts = Vec::with_capacity(self.prompts.len());
        for plugin in &self.prompts {
            let text = plugin
                .handler
                .contribute(ctx)
                .map_err(|err| PluginExecutionError::from_plugin(&plugin.name, PluginKind::Prompt, &err))?;
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
        Ok(parts.join("\n"))
    }

    /// Pipes entries through every extension plugin.
    ///
    /// Entries a plugin drops are kept as `Skipped`. The result is sorted by
    /// entry identity.
    ///
    /// # Errors
    ///
    /// Returns [`PluginExecutionError`] when a plugin fails, introduces an
    /// entry it did not receive, duplicates an entry, or makes an illegal
    /// status change.
    pub fn dispatch_extension(
        &self,
        entries: Vec<TranslationEntry>,
    ) -> Result<Vec<TranslationEntry>, PluginExecutionError> {
        let mut current = entries;
        for plugin in &self.extensions {
            let inputs: BTreeMap<EntryId, TranslationEntry> =
                current.iter().map(|entry| (entry.id(), entry.clone())).collect();
            let output = plugin
                .handler
                .process(current)
                .map_err(|err| PluginExecutionError::from_plugin(&plugin.name, PluginKind::Extension, &err))?;
            current = reconcile_extension_output(&plugin.name, inputs, output)?;
        }
        current.sort_by_key(TranslationEntry::id);
        Ok(current)
    }
}

/// Validates one extension's output against its input.
fn reconcile_extension_output(
    plugin: &PluginName,
    mut inputs: BTreeMap<EntryId, TranslationEntry>,
    output: Vec<TranslationEntry>,
) -> Result<Vec<TranslationEntry>, PluginExecutionError> {
    let mut seen = BTreeSet::new();
    let mut result = Vec::with_capacity(inputs.len());
    for entry in output {
        let id = entry.id();
        let Some(original) = inputs.remove(&id) else {
            let message = if seen.contains(&id) {
                format!("returned entry {id} twice")
            } else {
                format!("introduced entry {id} it did not receive")
            };
            return Err(PluginExecutionError::violation(plugin, PluginKind::Extension, message));
        };
        let allowed = entry.status == original.status
            || (entry.status == TranslationStatus::Skipped && original.status.can_transition(TranslationStatus::Skipped));
        if !allowed {
            return Err(PluginExecutionError::violation(
                plugin,
                PluginKind::Extension,
                format!("changed status of {id} from {} to {}", original.status, entry.status),
            ));
        }
        seen.insert(id);
        result.push(entry);
    }
    for (id, mut removed) in inputs {
        removed.mark_skipped().map_err(|err| {
            PluginExecutionError::violation(plugin, PluginKind::Extension, format!("cannot skip {id}: {err}"))
        })?;
        result.push(removed);
    }
    Ok(result)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Source of per-run plugin snapshots.
pub trait PluginCatalog: Send + Sync {
    /// Captures the plugin set for a new run.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError`] when the catalog cannot be read.
    fn snapshot(&self) -> Result<PluginSet, PluginError>;
}

impl PluginCatalog for PluginSet {
    fn snapshot(&self) -> Result<PluginSet, PluginError> {
        Ok(self.clone())
    }
}
