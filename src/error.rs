//! Error Types
//!
//! Every failure the tracker reports is a value, never a panic. Mutator
//! rejections (already completed, locked, blocked) are expected outcomes
//! and carry enough context for the caller to explain them.

use std::path::PathBuf;
use thiserror::Error;

use crate::quest::resolver::IntegrityViolation;

/// Errors raised while loading the quest catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(#[from] serde_json::Error),

    /// Quest IDs are global; the same ID under two NPCs makes prerequisites ambiguous.
    #[error("quest '{quest_id}' is defined by both '{first_npc}' and '{second_npc}'")]
    DuplicateQuest {
        quest_id: String,
        first_npc: String,
        second_npc: String,
    },

    #[error("failed to watch catalog: {0}")]
    Watch(#[from] notify::Error),
}

/// Errors raised by a progress storage backend
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("progress storage i/o error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("progress serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised by storage backends that refuse writes (read-only media, test doubles).
    #[error("progress storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised while loading the TOML configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Outcome of a rejected tracker query or mutation
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("quest '{quest_id}' is already completed for '{npc_id}'")]
    AlreadyCompleted { npc_id: String, quest_id: String },

    /// `missing` lists every unsatisfied prerequisite; `dangling` is the
    /// subset that does not exist in the catalog at all.
    #[error("quest '{quest_id}' is locked, missing prerequisites: {missing:?}")]
    PrerequisitesNotMet {
        quest_id: String,
        missing: Vec<String>,
        dangling: Vec<String>,
    },

    #[error("quest '{quest_id}' is blocked by '{completed_rival}' (exclusion group '{group_id}')")]
    ExclusivityBlocked {
        quest_id: String,
        group_id: String,
        completed_rival: String,
    },

    #[error("quest '{quest_id}' not found for npc '{npc_id}'")]
    QuestNotFound { npc_id: String, quest_id: String },

    #[error("npc '{0}' not found")]
    NpcNotFound(String),

    #[error("saved progress is inconsistent with the catalog ({} violation(s))", .0.len())]
    CatalogIntegrity(Vec<IntegrityViolation>),

    /// The in-memory change was applied; only the durable write failed.
    #[error("failed to persist progress: {0}")]
    Persistence(#[from] PersistenceError),
}
