//! Static Quest Rules
//!
//! Mutual-exclusion groups (branching choices where only one quest may ever
//! be completed) and NPC unlock gates. Both are configured, not derived from
//! the catalog, and never change while the tracker runs.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::catalog::QuestCatalog;
use crate::error::ConfigError;

/// A set of quests of which at most one may be completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusiveGroup {
    pub id: String,
    pub quests: Vec<String>,
}

impl ExclusiveGroup {
    pub fn contains(&self, quest_id: &str) -> bool {
        self.quests.iter().any(|q| q == quest_id)
    }

    /// Members other than `quest_id`
    pub fn rivals_of<'a>(&'a self, quest_id: &'a str) -> impl Iterator<Item = &'a str> {
        self.quests
            .iter()
            .map(String::as_str)
            .filter(move |q| *q != quest_id)
    }
}

/// An NPC whose quest line opens only after another NPC's quest is completed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnlockGate {
    pub npc: String,
    pub required_npc: String,
    pub required_quest: String,
}

/// All static rules, validated and indexed
#[derive(Debug, Clone, Default)]
pub struct QuestRules {
    groups: Vec<ExclusiveGroup>,
    /// npc id -> gate
    gates: HashMap<String, UnlockGate>,
}

impl QuestRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and index configured groups and gates
    pub fn from_parts(
        groups: Vec<ExclusiveGroup>,
        gates: Vec<UnlockGate>,
    ) -> Result<Self, ConfigError> {
        let mut group_ids = HashSet::new();
        let mut deduped_groups = Vec::with_capacity(groups.len());

        for group in groups {
            if !group_ids.insert(group.id.clone()) {
                return Err(ConfigError::Invalid(format!(
                    "exclusive group '{}' is defined more than once",
                    group.id
                )));
            }

            let mut quests: Vec<String> = Vec::with_capacity(group.quests.len());
            for quest in group.quests {
                if !quests.contains(&quest) {
                    quests.push(quest);
                }
            }
            if quests.len() < 2 {
                return Err(ConfigError::Invalid(format!(
                    "exclusive group '{}' needs at least two distinct quests",
                    group.id
                )));
            }

            deduped_groups.push(ExclusiveGroup { id: group.id, quests });
        }

        let mut gate_index = HashMap::with_capacity(gates.len());
        for gate in gates {
            if gate_index.contains_key(&gate.npc) {
                return Err(ConfigError::Invalid(format!(
                    "npc '{}' has more than one unlock gate",
                    gate.npc
                )));
            }
            gate_index.insert(gate.npc.clone(), gate);
        }

        Ok(Self {
            groups: deduped_groups,
            gates: gate_index,
        })
    }

    pub fn groups(&self) -> &[ExclusiveGroup] {
        &self.groups
    }

    /// Groups the quest belongs to (usually zero or one)
    pub fn groups_containing<'a>(&'a self, quest_id: &'a str) -> impl Iterator<Item = &'a ExclusiveGroup> {
        self.groups.iter().filter(move |g| g.contains(quest_id))
    }

    /// Unlock gate for an NPC, if one is configured
    pub fn gate_for(&self, npc_id: &str) -> Option<&UnlockGate> {
        self.gates.get(npc_id)
    }

    pub fn gates(&self) -> impl Iterator<Item = &UnlockGate> {
        self.gates.values()
    }

    /// Warn about rules that point at NPCs or quests the catalog doesn't have
    pub fn audit(&self, catalog: &QuestCatalog) -> usize {
        let mut problems = 0;

        for group in &self.groups {
            for quest_id in &group.quests {
                if !catalog.contains_quest(quest_id) {
                    warn!(
                        "Exclusive group '{}' references non-existent quest '{}'",
                        group.id, quest_id
                    );
                    problems += 1;
                }
            }
        }

        for gate in self.gates.values() {
            if catalog.npc(&gate.npc).is_none() {
                warn!("Unlock gate references non-existent npc '{}'", gate.npc);
                problems += 1;
            }
            match catalog.owner_of(&gate.required_quest) {
                None => {
                    warn!(
                        "Unlock gate for '{}' requires non-existent quest '{}'",
                        gate.npc, gate.required_quest
                    );
                    problems += 1;
                }
                Some(owner) if owner.id != gate.required_npc => {
                    warn!(
                        "Unlock gate for '{}' expects '{}' from '{}', but '{}' owns it",
                        gate.npc, gate.required_quest, gate.required_npc, owner.id
                    );
                    problems += 1;
                }
                Some(_) => {}
            }
        }

        problems
    }
}
