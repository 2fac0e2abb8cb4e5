// crates/l10n-sync-cli/src/answers.rs
// ============================================================================
// Module: Checkpoint Answers
// Description: Parses operator answers at the review and deletion checkpoints.
// Purpose: Turn free-form terminal input into orchestrator commands.
// Dependencies: clap, l10n-sync-core, thiserror
// ============================================================================

//! ## Overview
//! The `run` command pauses twice. At the review checkpoint an empty line
//! uploads and `abort` leaves the report for later. At the deletion
//! checkpoint the operator answers `all`, `none`, or a comma-separated list
//! of key names.
//!
//! ## Invariants
//! - A named deletion answer is only approved when every name was offered.
//! - An empty deletion answer deletes nothing.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use clap::ValueEnum;
use l10n_sync_core::UnusedKeyCandidate;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Answer rejection; the prompt is repeated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnswerError {
    /// The answer matched no accepted form.
    #[error("unrecognized answer: {0}")]
    Unrecognized(String),
    /// A named key was not among the deletion candidates.
    #[error("not an unused key: {0}")]
    UnknownCandidate(String),
}

// ============================================================================
// SECTION: Review
// ============================================================================

/// Answer at the review checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAnswer {
    /// Merge the edited report and upload.
    Upload,
    /// Exit and leave the report in place.
    Abort,
}

impl ReviewAnswer {
    /// Parses one input line.
    ///
    /// # Errors
    ///
    /// Returns [`AnswerError::Unrecognized`] for anything but an empty line,
    /// `upload`/`yes`, or `abort`/`quit`.
    pub fn parse(input: &str) -> Result<Self, AnswerError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "y" | "yes" | "upload" => Ok(Self::Upload),
            "abort" | "a" | "q" | "quit" => Ok(Self::Abort),
            other => Err(AnswerError::Unrecognized(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Deletion
// ============================================================================

/// `--delete` policy for the deletion checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DeletePolicy {
    /// Never delete; skip the checkpoint.
    None,
    /// Delete every candidate without asking.
    All,
    /// Prompt for a decision.
    #[default]
    Ask,
}

impl DeletePolicy {
    /// Returns the answer implied by the policy, or `None` to prompt.
    #[must_use]
    pub const fn preset(self) -> Option<DeletionAnswer> {
        match self {
            Self::None => Some(DeletionAnswer::Nothing),
            Self::All => Some(DeletionAnswer::All),
            Self::Ask => None,
        }
    }
}

/// Answer at the deletion checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletionAnswer {
    /// Delete every candidate.
    All,
    /// Delete nothing.
    Nothing,
    /// Delete exactly these key names.
    Named(BTreeSet<String>),
}

impl DeletionAnswer {
    /// Parses one input line.
    #[must_use]
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Self::All;
        }
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Self::Nothing;
        }
        let names: BTreeSet<String> =
            trimmed.split(',').map(str::trim).filter(|name| !name.is_empty()).map(str::to_string).collect();
        if names.is_empty() { Self::Nothing } else { Self::Named(names) }
    }

    /// Resolves the answer against the offered candidates.
    ///
    /// # Errors
    ///
    /// Returns [`AnswerError::UnknownCandidate`] for the first name that was
    /// not offered.
    pub fn approved(&self, candidates: &[UnusedKeyCandidate]) -> Result<BTreeSet<String>, AnswerError> {
        let offered: BTreeSet<&str> = candidates.iter().map(|candidate| candidate.key.identifier.as_str()).collect();
        match self {
            Self::All => Ok(offered.into_iter().map(str::to_string).collect()),
            Self::Nothing => Ok(BTreeSet::new()),
            Self::Named(names) => {
                if let Some(unknown) = names.iter().find(|name| !offered.contains(name.as_str())) {
                    return Err(AnswerError::UnknownCandidate(unknown.clone()));
                }
                Ok(names.clone())
            }
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
