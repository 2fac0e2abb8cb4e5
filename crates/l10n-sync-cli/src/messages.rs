// crates/l10n-sync-cli/src/messages.rs
// ============================================================================
// Module: CLI Message Catalog
// Description: Keyed message templates and the `t!` formatting macro.
// Purpose: Keep every user-facing CLI string in one reviewable table.
// Dependencies: Standard library collections.
// ============================================================================

//! ## Overview
//! The CLI never formats user-facing text inline. Each message is a keyed
//! template with `{name}` placeholders, rendered through the [`t!`](crate::t)
//! macro.
//!
//! ## Invariants
//! - The catalog is built once and read-only thereafter.
//! - An unknown key renders as the key itself.
//! - Placeholders are substituted in argument order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Named placeholder value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Rendered value.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// Message templates by key.
const CATALOG: &[(&str, &str)] = &[
    ("config.load_failed", "failed to load config: {error}"),
    ("config.credentials_failed", "missing credentials: {error}"),
    ("config.validate.ok", "config ok: project {project}, {locales} target locales, model {model}"),
    ("run.setup_failed", "failed to set up collaborators: {error}"),
    ("run.event_log_failed", "failed to open event log {path}: {error}"),
    ("run.started", "run {run_id} started"),
    ("run.command_failed", "pipeline command rejected: {error}"),
    ("event.progress", "[{percent}%] {stage}: {message}"),
    ("event.estimate", "estimate: {entries} entries, {tokens} tokens on {model}, about ${cost}"),
    ("event.estimate.over_threshold", "(above the configured warning threshold)"),
    ("event.review", "review: {entries} entries written to report {report}"),
    ("event.deletion", "{count} backend keys are no longer referenced by source"),
    (
        "event.completed",
        "completed: {missing} missing, {translated} translated, {bypassed} from plugins, {skipped} skipped, \
         {uploaded} uploaded, {failed} rejected, {deleted} of {candidates} unused keys deleted",
    ),
    ("event.error", "error in {stage} ({kind}): {message}"),
    (
        "review.prompt",
        "Edit {path} if needed, then press Enter to upload (type `abort` to stop and keep the report).",
    ),
    ("review.left_in_place", "stopped before upload; the review report stays at {path}"),
    ("deletion.candidate", "  {name} ({platform}) \"{value}\""),
    ("deletion.prompt", "Delete which keys? (`all`, `none`, or comma-separated names; Enter deletes nothing)"),
    ("prompt.retry", "{error}; please answer again"),
    ("input.read_failed", "failed to read input: {error}"),
    ("plugins.discovery_failed", "failed to discover plugins: {error}"),
    ("plugins.none", "no plugins found in {dir}"),
    ("plugins.entry", "{name}\t{kind}\t{state}\t{source}"),
    ("plugins.description", "    {description}"),
    ("plugins.enabled", "enabled"),
    ("plugins.disabled", "disabled"),
    ("plugins.missing", "configured plugin not found: {name}"),
    ("plugins.issue", "plugin manifest excluded: {issue}"),
    ("estimate.failed", "failed to estimate: {error}"),
    (
        "estimate.scope",
        "{extracted} keys in source, {missing} missing entries across {locales} locales, {unused} unused backend keys",
    ),
    ("output.write_failed", "failed to write to {stream}: {error}"),
];

/// Returns the catalog map.
fn catalog() -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    CATALOG_MAP.get_or_init(|| CATALOG.iter().copied().collect())
}

// ============================================================================
// SECTION: Formatting
// ============================================================================

/// Renders `key` with `args` substituted.
#[must_use]
pub fn format_message(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog().get(key).copied().unwrap_or(key);
    if args.is_empty() {
        return template.to_string();
    }

    let mut result = template.to_string();
    for arg in args {
        let placeholder = format!("{{{}}}", arg.key);
        result = result.replace(&placeholder, &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a catalog message from a key and named arguments.
///
/// # Arguments
///
/// - `$key` must match a catalog entry.
/// - Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::messages::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::messages::format_message($key, args)
    }};
}

// ============================================================================
// SECTION: Tests
// ============================================================================
