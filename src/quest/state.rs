//! Quest Progress State
//!
//! Tracks which quests the player has completed for each NPC. This is the
//! only mutable state in the tracker and the only thing that gets saved.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Completion record for a single NPC
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    /// Completed quest IDs in the order they were completed
    #[serde(default)]
    pub completed: Vec<String>,
    /// Advisory "focused" quest pointer; never authoritative
    #[serde(default)]
    pub current: Option<String>,
}

impl ProgressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a quest is completed
    pub fn is_completed(&self, quest_id: &str) -> bool {
        self.completed.iter().any(|id| id == quest_id)
    }

    /// Mark a quest as completed; returns false if it already was
    pub fn complete(&mut self, quest_id: &str) -> bool {
        if self.is_completed(quest_id) {
            return false;
        }
        self.completed.push(quest_id.to_string());
        if self.current.as_deref() == Some(quest_id) {
            self.current = None;
        }
        true
    }

    /// Remove a completion; returns false if it wasn't there
    pub fn uncomplete(&mut self, quest_id: &str) -> bool {
        let before = self.completed.len();
        self.completed.retain(|id| id != quest_id);
        self.completed.len() != before
    }

    /// Forget everything for this NPC
    pub fn reset(&mut self) {
        self.completed.clear();
        self.current = None;
    }

    /// Collapse repeated IDs, keeping the first occurrence. Returns how many were dropped.
    pub fn dedup(&mut self) -> usize {
        let before = self.completed.len();
        let mut seen = Vec::with_capacity(before);
        self.completed.retain(|id| {
            if seen.contains(id) {
                false
            } else {
                seen.push(id.clone());
                true
            }
        });
        before - self.completed.len()
    }
}

/// Progress for every NPC the player has touched, keyed by NPC id
///
/// Serializes to the saved-progress schema:
/// `{ "<npc>": { "completed": [...], "current": null } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressStore {
    records: BTreeMap<String, ProgressRecord>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an NPC's record, if one exists
    pub fn record(&self, npc_id: &str) -> Option<&ProgressRecord> {
        self.records.get(npc_id)
    }

    /// Get an NPC's record, creating an empty one on first access
    pub fn record_mut(&mut self, npc_id: &str) -> &mut ProgressRecord {
        self.records.entry(npc_id.to_string()).or_default()
    }

    /// Check if a record exists for the NPC
    pub fn has_record(&self, npc_id: &str) -> bool {
        self.records.contains_key(npc_id)
    }

    /// Check if the NPC has completed the quest
    pub fn is_completed_by(&self, npc_id: &str, quest_id: &str) -> bool {
        self.records
            .get(npc_id)
            .is_some_and(|r| r.is_completed(quest_id))
    }

    /// Check if any NPC's record lists the quest as completed
    pub fn is_completed_anywhere(&self, quest_id: &str) -> bool {
        self.records.values().any(|r| r.is_completed(quest_id))
    }

    /// Iterate records in NPC id order
    pub fn records(&self) -> impl Iterator<Item = (&str, &ProgressRecord)> {
        self.records.iter().map(|(id, r)| (id.as_str(), r))
    }

    /// Iterate records mutably in NPC id order
    pub fn records_mut(&mut self) -> impl Iterator<Item = (&str, &mut ProgressRecord)> {
        self.records.iter_mut().map(|(id, r)| (id.as_str(), r))
    }

    /// Total completions across all NPCs
    pub fn completed_count(&self) -> usize {
        self.records.values().map(|r| r.completed.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
