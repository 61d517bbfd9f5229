//! Quest Catalog
//!
//! Loads and indexes the static NPC/quest catalog from its JSON file and
//! audits the prerequisite graph for data errors.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDateTime};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::definition::{Npc, Quest, RawCatalogFile, RawNpc};
use crate::error::CatalogError;

/// A data problem found in the prerequisite graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogIssue {
    /// Prerequisite ID that no NPC defines; the quest can never unlock
    DanglingPrerequisite {
        npc_id: String,
        quest_id: String,
        prerequisite: String,
    },
    /// Quest lists itself as a prerequisite
    SelfPrerequisite { npc_id: String, quest_id: String },
    /// Prerequisite chain that loops back on itself (first ID repeated at the end)
    Cycle { path: Vec<String> },
}

/// Read-only quest catalog for the lifetime of a tracker
#[derive(Debug, Clone, Default)]
pub struct QuestCatalog {
    version: Option<String>,
    last_updated: Option<NaiveDateTime>,
    /// NPCs in display order
    npcs: Vec<Npc>,
    /// NPC id -> position in `npcs`
    npc_index: HashMap<String, usize>,
    /// Quest id -> (NPC position, quest position)
    quest_index: HashMap<String, (usize, usize)>,
}

impl QuestCatalog {
    /// Load the catalog from a JSON file
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        info!("Loading quest catalog from {:?}", path);

        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let catalog = Self::from_json_str(&content)?;
        info!(
            "Loaded {} quests for {} npcs (catalog version {})",
            catalog.quest_count(),
            catalog.npcs.len(),
            catalog.version.as_deref().unwrap_or("unknown"),
        );

        for issue in catalog.audit() {
            warn!("Catalog issue: {:?}", issue);
        }

        Ok(catalog)
    }

    /// Parse the catalog from JSON text
    pub fn from_json_str(content: &str) -> Result<Self, CatalogError> {
        let raw: RawCatalogFile = serde_json::from_str(content)?;

        let mut npcs = Vec::with_capacity(raw.npcs.len());
        for (npc_id, value) in raw.npcs {
            let raw_npc: RawNpc = serde_json::from_value(value)?;
            let quests = raw_npc
                .quests
                .iter()
                .filter(|q| {
                    if q.id.is_empty() {
                        warn!("Skipping quest without id under npc '{}' ({:?})", npc_id, q.name);
                        false
                    } else {
                        true
                    }
                })
                .map(Quest::from_raw)
                .collect();

            npcs.push(Npc {
                name: raw_npc.name.unwrap_or_else(|| npc_id.clone()),
                id: npc_id,
                quests,
            });
        }

        let mut catalog = Self::from_npcs(npcs)?;
        catalog.version = raw.version.filter(|v| !v.is_empty());
        catalog.last_updated = raw.last_updated.as_deref().and_then(parse_timestamp);
        Ok(catalog)
    }

    /// Build a catalog from already-resolved NPCs, in display order
    pub fn from_npcs(npcs: Vec<Npc>) -> Result<Self, CatalogError> {
        let mut npc_index = HashMap::with_capacity(npcs.len());
        let mut quest_index: HashMap<String, (usize, usize)> = HashMap::new();

        for (npc_pos, npc) in npcs.iter().enumerate() {
            if npc_index.insert(npc.id.clone(), npc_pos).is_some() {
                warn!("Duplicate npc id '{}', later definition wins lookups", npc.id);
            }

            for (quest_pos, quest) in npc.quests.iter().enumerate() {
                if let Some(&(first_npc, _)) = quest_index.get(&quest.id) {
                    return Err(CatalogError::DuplicateQuest {
                        quest_id: quest.id.clone(),
                        first_npc: npcs[first_npc].id.clone(),
                        second_npc: npc.id.clone(),
                    });
                }
                quest_index.insert(quest.id.clone(), (npc_pos, quest_pos));
            }
        }

        Ok(Self {
            version: None,
            last_updated: None,
            npcs,
            npc_index,
            quest_index,
        })
    }

    /// Catalog data version, if the file declares one
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// When the catalog data was last regenerated
    pub fn last_updated(&self) -> Option<NaiveDateTime> {
        self.last_updated
    }

    /// All NPCs in display order
    pub fn npcs(&self) -> &[Npc] {
        &self.npcs
    }

    /// Get an NPC by ID
    pub fn npc(&self, npc_id: &str) -> Option<&Npc> {
        self.npc_index.get(npc_id).map(|&pos| &self.npcs[pos])
    }

    /// Get a quest by its global ID
    pub fn quest(&self, quest_id: &str) -> Option<&Quest> {
        self.quest_index
            .get(quest_id)
            .map(|&(npc_pos, quest_pos)| &self.npcs[npc_pos].quests[quest_pos])
    }

    /// NPC that hands out the quest
    pub fn owner_of(&self, quest_id: &str) -> Option<&Npc> {
        self.quest_index
            .get(quest_id)
            .map(|&(npc_pos, _)| &self.npcs[npc_pos])
    }

    /// Check if a quest exists anywhere in the catalog
    pub fn contains_quest(&self, quest_id: &str) -> bool {
        self.quest_index.contains_key(quest_id)
    }

    /// Get count of loaded quests
    pub fn quest_count(&self) -> usize {
        self.quest_index.len()
    }

    /// Iterate every quest with its owning NPC, in display order
    pub fn quests(&self) -> impl Iterator<Item = (&Npc, &Quest)> {
        self.npcs
            .iter()
            .flat_map(|npc| npc.quests.iter().map(move |q| (npc, q)))
    }

    /// Quests that list `quest_id` as a direct prerequisite
    pub fn dependents_of<'a>(&'a self, quest_id: &'a str) -> impl Iterator<Item = (&'a Npc, &'a Quest)> {
        self.quests().filter(move |(_, q)| q.requires(quest_id))
    }

    /// Check the prerequisite graph for references to unknown quests and cycles
    pub fn audit(&self) -> Vec<CatalogIssue> {
        let mut issues = Vec::new();

        for (npc, quest) in self.quests() {
            for prereq in &quest.prerequisites {
                if prereq == &quest.id {
                    issues.push(CatalogIssue::SelfPrerequisite {
                        npc_id: npc.id.clone(),
                        quest_id: quest.id.clone(),
                    });
                } else if !self.contains_quest(prereq) {
                    issues.push(CatalogIssue::DanglingPrerequisite {
                        npc_id: npc.id.clone(),
                        quest_id: quest.id.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
            }
        }

        let mut marks: HashMap<&str, Mark> = HashMap::new();
        let mut path = Vec::new();
        for (_, quest) in self.quests() {
            if !marks.contains_key(quest.id.as_str()) {
                self.find_cycles(&quest.id, &mut marks, &mut path, &mut issues);
            }
        }

        debug!("Catalog audit found {} issue(s)", issues.len());
        issues
    }

    /// Depth-first walk along prerequisite edges
    fn find_cycles<'a>(
        &'a self,
        quest_id: &'a str,
        marks: &mut HashMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
        issues: &mut Vec<CatalogIssue>,
    ) {
        let Some(quest) = self.quest(quest_id) else {
            return;
        };

        marks.insert(quest_id, Mark::Visiting);
        path.push(quest_id);

        for prereq in &quest.prerequisites {
            if prereq == quest_id || !self.contains_quest(prereq) {
                continue;
            }
            match marks.get(prereq.as_str()) {
                None => self.find_cycles(prereq, marks, path, issues),
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|id| *id == prereq.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|id| id.to_string()).collect();
                    cycle.push(prereq.clone());
                    issues.push(CatalogIssue::Cycle { path: cycle });
                }
                Some(Mark::Done) => {}
            }
        }

        path.pop();
        marks.insert(quest_id, Mark::Done);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Accepts RFC 3339 and the naive ISO-8601 form the catalog exporter writes
fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        Ok(dt) => Some(dt),
        Err(e) => {
            warn!("Ignoring unparseable catalog timestamp '{}': {}", raw, e);
            None
        }
    }
}
