//! Quest Definition Structures
//!
//! These structures are deserialized from the JSON quest catalog.

use serde::{Deserialize, Serialize};

/// Top-level catalog file as it appears on disk
#[derive(Debug, Clone, Deserialize)]
pub struct RawCatalogFile {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    /// NPC id -> NPC data. Parsed order-preserving so display order survives.
    #[serde(default)]
    pub npcs: serde_json::Map<String, serde_json::Value>,
}

/// Raw NPC data as it appears in the catalog
#[derive(Debug, Clone, Deserialize)]
pub struct RawNpc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub quests: Vec<RawQuest>,
}

/// Raw quest data as it appears in the catalog
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQuest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tier: Option<i32>,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    /// Older catalogs list cross-NPC prerequisites separately
    #[serde(default)]
    pub prerequisites_external: Vec<String>,
    #[serde(default)]
    pub wiki_url: String,
    #[serde(default)]
    pub kappa_required: bool,
}

// ============================================================================
// Resolved Catalog Structures (after parsing)
// ============================================================================

/// A fully resolved quest definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: String,
    pub name: String,
    /// Progression tier; `None` when the source data has no tier
    pub tier: Option<i32>,
    /// Global quest IDs that must be completed (by any NPC) first
    pub prerequisites: Vec<String>,
    /// Opaque key handed to the quest detail fetcher
    pub wiki_url: String,
    /// Required for the Kappa container
    pub kappa_required: bool,
}

impl Quest {
    /// Create a Quest from raw catalog data
    pub fn from_raw(raw: &RawQuest) -> Self {
        let mut prerequisites: Vec<String> = Vec::with_capacity(
            raw.prerequisites.len() + raw.prerequisites_external.len(),
        );
        for id in raw.prerequisites.iter().chain(&raw.prerequisites_external) {
            if !prerequisites.contains(id) {
                prerequisites.push(id.clone());
            }
        }

        let name = if raw.name.is_empty() {
            raw.id.clone()
        } else {
            raw.name.clone()
        };

        Self {
            id: raw.id.clone(),
            name,
            tier: raw.tier,
            prerequisites,
            wiki_url: raw.wiki_url.clone(),
            kappa_required: raw.kappa_required,
        }
    }

    /// Check if another quest must be completed before this one
    pub fn requires(&self, quest_id: &str) -> bool {
        self.prerequisites.iter().any(|p| p == quest_id)
    }

    /// Quests without prerequisites are available from the start
    pub fn is_starting_quest(&self) -> bool {
        self.prerequisites.is_empty()
    }
}

/// An NPC (trader) and the quests it hands out, in display order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Npc {
    pub id: String,
    pub name: String,
    pub quests: Vec<Quest>,
}

impl Npc {
    /// Get quest by ID
    pub fn get_quest(&self, quest_id: &str) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == quest_id)
    }

    /// Check if this NPC hands out the quest
    pub fn owns(&self, quest_id: &str) -> bool {
        self.get_quest(quest_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_quest() {
        let json = r#"{
            "id": "debut",
            "name": "Debut",
            "tier": 1,
            "prerequisites": [],
            "wikiUrl": "https://escapefromtarkov.fandom.com/wiki/Debut",
            "kappaRequired": true
        }"#;

        let raw: RawQuest = serde_json::from_str(json).unwrap();
        let quest = Quest::from_raw(&raw);

        assert_eq!(quest.id, "debut");
        assert_eq!(quest.tier, Some(1));
        assert!(quest.kappa_required);
        assert!(quest.is_starting_quest());
    }

    #[test]
    fn test_external_prerequisites_are_merged() {
        let json = r#"{
            "id": "shootout_picnic",
            "name": "Shootout Picnic",
            "tier": null,
            "prerequisites": ["checking", "debut"],
            "prerequisitesExternal": ["introduction", "debut"]
        }"#;

        let raw: RawQuest = serde_json::from_str(json).unwrap();
        let quest = Quest::from_raw(&raw);

        assert_eq!(quest.tier, None);
        assert_eq!(quest.prerequisites, vec!["checking", "debut", "introduction"]);
        assert!(quest.requires("introduction"));
        assert!(!quest.kappa_required);
    }

    #[test]
    fn test_quest_serializes_catalog_field_names() {
        let quest = Quest {
            id: "gunsmith_part_1".to_string(),
            name: "Gunsmith - Part 1".to_string(),
            tier: Some(3),
            prerequisites: vec!["introduction".to_string()],
            wiki_url: "https://example.invalid/Gunsmith".to_string(),
            kappa_required: false,
        };

        let value = serde_json::to_value(&quest).unwrap();
        assert_eq!(value["wikiUrl"], "https://example.invalid/Gunsmith");
        assert_eq!(value["kappaRequired"], false);
        assert_eq!(value["tier"], 3);
    }
}
