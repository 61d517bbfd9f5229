//! Quest System Module
//!
//! Static NPC/quest catalog loaded from JSON, per-NPC completion progress,
//! and the rules that decide what the player can take on next.

pub mod catalog;
pub mod definition;
pub mod resolver;
pub mod rules;
pub mod state;
pub mod tracker;
pub mod watcher;

pub use catalog::{CatalogIssue, QuestCatalog};
pub use definition::{Npc, Quest};
pub use resolver::{
    ExclusivityBlock, IntegrityViolation, KappaProgress, NpcSummary, QuestStatus, QuestView,
    Resolver, ViolationReason,
};
pub use rules::{ExclusiveGroup, QuestRules, UnlockGate};
pub use state::{ProgressRecord, ProgressStore};
pub use tracker::{validate_completed_quests, MutationReport, QuestTracker, ValidationReport};
pub use watcher::{CatalogReloadEvent, CatalogWatcher};
