//! Quest progress tracker
//!
//! Tracks which quests a player has completed for each NPC, and derives
//! what is available, locked or blocked from a static quest catalog.

pub mod config;
pub mod error;
pub mod quest;
pub mod storage;

pub use config::TrackerConfig;
pub use error::{CatalogError, ConfigError, PersistenceError, TrackerError};
pub use quest::{QuestCatalog, QuestRules, QuestStatus, QuestTracker};
pub use storage::{JsonFileStorage, MemoryStorage, ProgressStorage};
