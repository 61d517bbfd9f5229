//! Quest Availability Resolver
//!
//! Pure classification of quests and NPCs from a catalog, the static rules,
//! and a progress snapshot. Nothing here is cached: every answer is derived
//! from the snapshot it is given, so callers simply build a new `Resolver`
//! after each mutation.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::catalog::QuestCatalog;
use super::definition::{Npc, Quest};
use super::rules::QuestRules;
use super::state::{ProgressRecord, ProgressStore};

/// Classification of a quest for the player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Completed by its owning NPC
    Completed,
    /// At least one prerequisite is not completed
    Locked,
    /// Prerequisites met and no exclusive rival completed
    Available,
    /// Prerequisites met, but a quest from the same exclusion group is completed
    Blocked,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::Completed => "completed",
            QuestStatus::Locked => "locked",
            QuestStatus::Available => "available",
            QuestStatus::Blocked => "blocked",
        }
    }
}

/// The completed rival that blocks a quest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExclusivityBlock {
    pub group_id: String,
    pub completed_rival: String,
}

/// One row of an NPC's quest list, ready for presentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestView {
    pub quest_id: String,
    pub name: String,
    pub tier: Option<i32>,
    pub status: QuestStatus,
    pub wiki_url: String,
    pub kappa_required: bool,
}

/// Counters shown next to an NPC
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcSummary {
    pub npc_id: String,
    pub completed_count: usize,
    pub available_count: usize,
    pub locked_count: usize,
    pub blocked_count: usize,
    pub total: usize,
    pub is_unlocked: bool,
}

/// Completed vs. total quests flagged `kappaRequired`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KappaProgress {
    pub completed: usize,
    pub total: usize,
}

/// Why a saved completion cannot stand against the current catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationReason {
    /// The quest is no longer in the catalog
    UnknownQuest,
    /// The quest exists but another NPC hands it out
    WrongNpc { owner: String },
    /// Prerequisites are not (transitively) backed by other completions
    UnmetPrerequisites { missing: Vec<String> },
    /// Another member of the exclusion group was kept instead
    ExclusivityConflict { group_id: String, kept: String },
}

/// A saved completion that validation removes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityViolation {
    pub npc_id: String,
    pub quest_id: String,
    pub reason: ViolationReason,
}

/// Borrowed view over catalog, rules and progress
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    catalog: &'a QuestCatalog,
    rules: &'a QuestRules,
    progress: &'a ProgressStore,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a QuestCatalog, rules: &'a QuestRules, progress: &'a ProgressStore) -> Self {
        Self {
            catalog,
            rules,
            progress,
        }
    }

    /// Classify a quest owned by `npc_id`
    pub fn classify(&self, quest: &Quest, npc_id: &str) -> QuestStatus {
        if self.progress.is_completed_by(npc_id, &quest.id) {
            return QuestStatus::Completed;
        }
        if !self.prerequisites_met(quest) {
            return QuestStatus::Locked;
        }
        if self.exclusivity_block(quest).is_some() {
            return QuestStatus::Blocked;
        }
        QuestStatus::Available
    }

    /// Classify a quest by ID; `None` if the NPC doesn't hand it out
    pub fn status_of(&self, npc_id: &str, quest_id: &str) -> Option<QuestStatus> {
        let quest = self.catalog.npc(npc_id)?.get_quest(quest_id)?;
        Some(self.classify(quest, npc_id))
    }

    /// A prerequisite counts only if it exists and any NPC has completed it
    pub fn is_prerequisite_satisfied(&self, quest_id: &str) -> bool {
        self.catalog.contains_quest(quest_id) && self.progress.is_completed_anywhere(quest_id)
    }

    pub fn prerequisites_met(&self, quest: &Quest) -> bool {
        quest
            .prerequisites
            .iter()
            .all(|p| self.is_prerequisite_satisfied(p))
    }

    /// Unsatisfied prerequisites, in catalog order
    pub fn missing_prerequisites<'q>(&self, quest: &'q Quest) -> Vec<&'q str> {
        quest
            .prerequisites
            .iter()
            .filter(|p| !self.is_prerequisite_satisfied(p))
            .map(String::as_str)
            .collect()
    }

    /// First completed rival across the quest's exclusion groups
    pub fn exclusivity_block(&self, quest: &Quest) -> Option<ExclusivityBlock> {
        self.rules.groups_containing(&quest.id).find_map(|group| {
            group
                .rivals_of(&quest.id)
                .find(|rival| self.progress.is_completed_anywhere(rival))
                .map(|rival| ExclusivityBlock {
                    group_id: group.id.clone(),
                    completed_rival: rival.to_string(),
                })
        })
    }

    /// The NPC's quest list with live statuses, in display order
    pub fn quest_views(&self, npc_id: &str) -> Vec<QuestView> {
        let Some(npc) = self.catalog.npc(npc_id) else {
            return Vec::new();
        };

        npc.quests
            .iter()
            .map(|quest| QuestView {
                quest_id: quest.id.clone(),
                name: quest.name.clone(),
                tier: quest.tier,
                status: self.classify(quest, &npc.id),
                wiki_url: quest.wiki_url.clone(),
                kappa_required: quest.kappa_required,
            })
            .collect()
    }

    /// First available quest in display order, falling back to the saved pointer
    pub fn current_quest(&self, npc_id: &str) -> Option<&'a Quest> {
        let npc = self.catalog.npc(npc_id)?;

        if let Some(quest) = npc
            .quests
            .iter()
            .find(|q| self.classify(q, npc_id) == QuestStatus::Available)
        {
            return Some(quest);
        }

        let pointer = self.progress.record(npc_id)?.current.as_deref()?;
        npc.get_quest(pointer)
            .filter(|q| !self.progress.is_completed_by(npc_id, &q.id))
    }

    /// Completed quest with the highest tier; later completions win ties
    pub fn last_completed_quest(&self, npc_id: &str) -> Option<&'a Quest> {
        let npc = self.catalog.npc(npc_id)?;
        let record = self.progress.record(npc_id)?;

        // Option<i32> orders None below every tier; max_by_key keeps the last maximum
        record
            .completed
            .iter()
            .filter_map(|id| npc.get_quest(id))
            .max_by_key(|q| q.tier)
    }

    /// Quest that follows the current one
    pub fn next_quest(&self, npc_id: &str) -> Option<&'a Quest> {
        let npc = self.catalog.npc(npc_id)?;
        let current = self.current_quest(npc_id)?;

        let direct = npc
            .quests
            .iter()
            .filter(|q| !self.progress.is_completed_by(npc_id, &q.id))
            .filter(|q| q.requires(&current.id))
            .min_by_key(|q| q.tier);
        if direct.is_some() {
            return direct;
        }

        npc.quests.iter().find(|q| {
            q.id != current.id
                && !self.progress.is_completed_by(npc_id, &q.id)
                && q.prerequisites
                    .iter()
                    .all(|p| p == &current.id || self.is_prerequisite_satisfied(p))
        })
    }

    /// NPCs without a gate are always unlocked
    pub fn is_unlocked(&self, npc_id: &str) -> bool {
        match self.rules.gate_for(npc_id) {
            None => true,
            Some(gate) => self
                .progress
                .is_completed_by(&gate.required_npc, &gate.required_quest),
        }
    }

    /// Unlock state of every catalog NPC
    pub fn unlock_states(&self) -> BTreeMap<String, bool> {
        self.catalog
            .npcs()
            .iter()
            .map(|npc| (npc.id.clone(), self.is_unlocked(&npc.id)))
            .collect()
    }

    pub fn npc_summary(&self, npc_id: &str) -> Option<NpcSummary> {
        let npc = self.catalog.npc(npc_id)?;
        Some(self.summarize(npc))
    }

    fn summarize(&self, npc: &Npc) -> NpcSummary {
        let mut summary = NpcSummary {
            npc_id: npc.id.clone(),
            completed_count: 0,
            available_count: 0,
            locked_count: 0,
            blocked_count: 0,
            total: npc.quests.len(),
            is_unlocked: self.is_unlocked(&npc.id),
        };

        for quest in &npc.quests {
            match self.classify(quest, &npc.id) {
                QuestStatus::Completed => summary.completed_count += 1,
                QuestStatus::Available => summary.available_count += 1,
                QuestStatus::Locked => summary.locked_count += 1,
                QuestStatus::Blocked => summary.blocked_count += 1,
            }
        }

        summary
    }

    pub fn kappa_progress(&self) -> KappaProgress {
        let mut progress = KappaProgress { completed: 0, total: 0 };
        for (npc, quest) in self.catalog.quests().filter(|(_, q)| q.kappa_required) {
            progress.total += 1;
            if self.progress.is_completed_by(&npc.id, &quest.id) {
                progress.completed += 1;
            }
        }
        progress
    }

    /// Saved completions that cannot stand against the catalog and rules
    ///
    /// Records are scanned in catalog NPC order (NPCs unknown to the catalog
    /// last), completions in insertion order. A completion survives only if
    /// its quest exists under that NPC and every prerequisite is itself a
    /// surviving completion; survivors are grown to a fixed point from the
    /// empty set, so chains resting on a removed quest fall with it and
    /// prerequisite cycles never ground themselves. Within an exclusion group
    /// the first member in scan order whose prerequisites hold is kept; the
    /// others are removed along with anything that rested on them.
    pub fn find_violations(&self) -> Vec<IntegrityViolation> {
        let mut entries: Vec<(&'a str, &'a str, Option<ViolationReason>)> = Vec::new();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();

        for (npc_id, record) in self.records_in_scan_order() {
            for quest_id in &record.completed {
                if !seen.insert((npc_id, quest_id.as_str())) {
                    continue;
                }
                let reason = match self.catalog.owner_of(quest_id) {
                    None => Some(ViolationReason::UnknownQuest),
                    Some(owner) if owner.id != npc_id => Some(ViolationReason::WrongNpc {
                        owner: owner.id.clone(),
                    }),
                    Some(_) => None,
                };
                entries.push((npc_id, quest_id.as_str(), reason));
            }
        }

        // Pick each group's keeper from grounding that ignores exclusivity,
        // then ground again with the other members removed.
        let candidates = self.ground(&entries, &HashSet::new());
        let mut kept: HashMap<&str, &str> = HashMap::new();
        for &(_, quest_id, _) in &entries {
            if !candidates.contains(quest_id) {
                continue;
            }
            for group in self.rules.groups_containing(quest_id) {
                kept.entry(group.id.as_str()).or_insert(quest_id);
            }
        }
        let excluded: HashSet<&str> = entries
            .iter()
            .map(|&(_, quest_id, _)| quest_id)
            .filter(|quest_id| {
                self.rules
                    .groups_containing(quest_id)
                    .any(|g| kept.get(g.id.as_str()).is_some_and(|k| k != quest_id))
            })
            .collect();
        let grounded = self.ground(&entries, &excluded);

        let mut violations = Vec::new();
        for (npc_id, quest_id, reason) in entries {
            let reason = match reason {
                Some(reason) => reason,
                None if grounded.contains(quest_id) => continue,
                None => self.ungrounded_reason(quest_id, &grounded, &excluded, &kept),
            };
            debug!("Completion '{}' under '{}' is invalid: {:?}", quest_id, npc_id, reason);
            violations.push(IntegrityViolation {
                npc_id: npc_id.to_string(),
                quest_id: quest_id.to_string(),
                reason,
            });
        }
        violations
    }

    /// Least fixed point of "every prerequisite is itself grounded"
    fn ground(
        &self,
        entries: &[(&'a str, &'a str, Option<ViolationReason>)],
        excluded: &HashSet<&str>,
    ) -> HashSet<&'a str> {
        let mut grounded: HashSet<&'a str> = HashSet::new();
        loop {
            let mut changed = false;
            for &(_, quest_id, ref reason) in entries {
                if reason.is_some() || excluded.contains(quest_id) || grounded.contains(quest_id) {
                    continue;
                }
                let Some(quest) = self.catalog.quest(quest_id) else {
                    continue;
                };
                if quest.prerequisites.iter().all(|p| grounded.contains(p.as_str())) {
                    grounded.insert(quest_id);
                    changed = true;
                }
            }
            if !changed {
                return grounded;
            }
        }
    }

    fn ungrounded_reason(
        &self,
        quest_id: &str,
        grounded: &HashSet<&str>,
        excluded: &HashSet<&str>,
        kept: &HashMap<&str, &str>,
    ) -> ViolationReason {
        if excluded.contains(quest_id) {
            let conflict = self.rules.groups_containing(quest_id).find_map(|g| {
                kept.get(g.id.as_str())
                    .filter(|k| **k != quest_id)
                    .map(|k| ViolationReason::ExclusivityConflict {
                        group_id: g.id.clone(),
                        kept: k.to_string(),
                    })
            });
            if let Some(conflict) = conflict {
                return conflict;
            }
        }

        let missing: Vec<String> = self
            .catalog
            .quest(quest_id)
            .map(|q| {
                q.prerequisites
                    .iter()
                    .filter(|p| !grounded.contains(p.as_str()))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        ViolationReason::UnmetPrerequisites { missing }
    }

    fn records_in_scan_order(&self) -> Vec<(&'a str, &'a ProgressRecord)> {
        let mut ordered: Vec<_> = self
            .catalog
            .npcs()
            .iter()
            .filter_map(|npc| self.progress.record(&npc.id).map(|r| (npc.id.as_str(), r)))
            .collect();
        ordered.extend(
            self.progress
                .records()
                .filter(|(id, _)| self.catalog.npc(id).is_none()),
        );
        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::rules::{ExclusiveGroup, UnlockGate};

    fn quest(id: &str, tier: Option<i32>, prerequisites: &[&str]) -> Quest {
        Quest {
            id: id.to_string(),
            name: id.to_string(),
            tier,
            prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
            wiki_url: format!("https://example.invalid/{}", id),
            kappa_required: false,
        }
    }

    fn npc(id: &str, quests: Vec<Quest>) -> Npc {
        Npc {
            id: id.to_string(),
            name: id.to_string(),
            quests,
        }
    }

    fn test_catalog() -> QuestCatalog {
        QuestCatalog::from_npcs(vec![
            npc(
                "prapor",
                vec![
                    quest("q1", Some(1), &[]),
                    quest("q2", Some(2), &["q1"]),
                    quest("q3", Some(3), &["q2", "introduction"]),
                ],
            ),
            npc(
                "mechanic",
                vec![
                    quest("introduction", Some(1), &[]),
                    quest("gunsmith", Some(2), &["introduction"]),
                ],
            ),
            npc(
                "therapist",
                vec![
                    quest("shortage", None, &["missing_quest"]),
                    quest("savior", Some(5), &[]),
                    quest("fallen", Some(5), &[]),
                ],
            ),
            npc("jaeger", vec![quest("acquaintance", Some(1), &[])]),
        ])
        .unwrap()
    }

    fn test_rules() -> QuestRules {
        QuestRules::from_parts(
            vec![ExclusiveGroup {
                id: "ending".to_string(),
                quests: vec!["savior".to_string(), "fallen".to_string()],
            }],
            vec![UnlockGate {
                npc: "jaeger".to_string(),
                required_npc: "mechanic".to_string(),
                required_quest: "introduction".to_string(),
            }],
        )
        .unwrap()
    }

    fn complete(progress: &mut ProgressStore, npc_id: &str, quest_id: &str) {
        progress.record_mut(npc_id).complete(quest_id);
    }

    #[test]
    fn test_starting_quest_available_and_dependent_locked() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("prapor", "q1"), Some(QuestStatus::Available));
        assert_eq!(resolver.status_of("prapor", "q2"), Some(QuestStatus::Locked));

        complete(&mut progress, "prapor", "q1");
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("prapor", "q1"), Some(QuestStatus::Completed));
        assert_eq!(resolver.status_of("prapor", "q2"), Some(QuestStatus::Available));
    }

    #[test]
    fn test_completed_only_under_owner() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();

        // A stray record under another NPC doesn't make the quest Completed
        complete(&mut progress, "skier", "q1");
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("prapor", "q1"), Some(QuestStatus::Available));
    }

    #[test]
    fn test_cross_npc_prerequisite() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();
        complete(&mut progress, "prapor", "q1");
        complete(&mut progress, "prapor", "q2");

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("prapor", "q3"), Some(QuestStatus::Locked));
        let q3 = catalog.quest("q3").unwrap();
        assert_eq!(resolver.missing_prerequisites(q3), vec!["introduction"]);

        complete(&mut progress, "mechanic", "introduction");
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("prapor", "q3"), Some(QuestStatus::Available));
    }

    #[test]
    fn test_dangling_prerequisite_never_satisfied() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();

        // Even a stale completion of the unknown ID doesn't satisfy it
        complete(&mut progress, "therapist", "missing_quest");
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("therapist", "shortage"), Some(QuestStatus::Locked));
    }

    #[test]
    fn test_exclusivity_blocks_rival() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("therapist", "fallen"), Some(QuestStatus::Available));

        complete(&mut progress, "therapist", "savior");
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.status_of("therapist", "savior"), Some(QuestStatus::Completed));
        assert_eq!(resolver.status_of("therapist", "fallen"), Some(QuestStatus::Blocked));

        let block = resolver.exclusivity_block(catalog.quest("fallen").unwrap()).unwrap();
        assert_eq!(block.group_id, "ending");
        assert_eq!(block.completed_rival, "savior");
    }

    #[test]
    fn test_unlock_gate() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert!(!resolver.is_unlocked("jaeger"));
        assert!(resolver.is_unlocked("prapor"));

        // Completed under the wrong NPC doesn't open the gate
        complete(&mut progress, "prapor", "introduction");
        assert!(!Resolver::new(&catalog, &rules, &progress).is_unlocked("jaeger"));

        complete(&mut progress, "mechanic", "introduction");
        assert!(Resolver::new(&catalog, &rules, &progress).is_unlocked("jaeger"));
    }

    #[test]
    fn test_current_last_and_next() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.current_quest("prapor").map(|q| q.id.as_str()), Some("q1"));
        assert_eq!(resolver.next_quest("prapor").map(|q| q.id.as_str()), Some("q2"));
        assert!(resolver.last_completed_quest("prapor").is_none());

        complete(&mut progress, "prapor", "q1");
        complete(&mut progress, "prapor", "q2");
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.last_completed_quest("prapor").map(|q| q.id.as_str()), Some("q2"));
        // q3 still waits on mechanic, so nothing is available; no pointer either
        assert!(resolver.current_quest("prapor").is_none());
        assert!(resolver.next_quest("prapor").is_none());

        progress.record_mut("prapor").current = Some("q3".to_string());
        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.current_quest("prapor").map(|q| q.id.as_str()), Some("q3"));
    }

    #[test]
    fn test_next_quest_prefers_cheapest_direct_dependent() {
        let catalog = QuestCatalog::from_npcs(vec![npc(
            "skier",
            vec![
                quest("supplier", Some(1), &[]),
                quest("stirrup", Some(4), &["supplier"]),
                quest("friend", Some(2), &["supplier"]),
                quest("unrelated", Some(1), &[]),
            ],
        )])
        .unwrap();
        let rules = QuestRules::new();
        let progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.current_quest("skier").map(|q| q.id.as_str()), Some("supplier"));
        assert_eq!(resolver.next_quest("skier").map(|q| q.id.as_str()), Some("friend"));
    }

    #[test]
    fn test_next_quest_falls_back_to_newly_available() {
        let catalog = QuestCatalog::from_npcs(vec![npc(
            "ragman",
            vec![
                quest("only_way", Some(1), &[]),
                quest("dressed", Some(2), &[]),
            ],
        )])
        .unwrap();
        let rules = QuestRules::new();
        let progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.next_quest("ragman").map(|q| q.id.as_str()), Some("dressed"));
    }

    #[test]
    fn test_last_completed_tie_goes_to_last_scanned() {
        let catalog = QuestCatalog::from_npcs(vec![npc(
            "peacekeeper",
            vec![
                quest("fishing", Some(3), &[]),
                quest("cargo", Some(3), &[]),
                quest("untiered", None, &[]),
            ],
        )])
        .unwrap();
        let rules = QuestRules::new();
        let mut progress = ProgressStore::new();
        complete(&mut progress, "peacekeeper", "untiered");
        complete(&mut progress, "peacekeeper", "fishing");
        complete(&mut progress, "peacekeeper", "cargo");

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(
            resolver.last_completed_quest("peacekeeper").map(|q| q.id.as_str()),
            Some("cargo")
        );
    }

    #[test]
    fn test_npc_summary_and_views() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();
        complete(&mut progress, "therapist", "fallen");

        let resolver = Resolver::new(&catalog, &rules, &progress);
        let summary = resolver.npc_summary("therapist").unwrap();
        assert_eq!(summary.completed_count, 1);
        assert_eq!(summary.available_count, 0);
        assert_eq!(summary.locked_count, 1);
        assert_eq!(summary.blocked_count, 1);
        assert_eq!(summary.total, 3);
        assert!(summary.is_unlocked);

        let statuses: Vec<QuestStatus> = resolver
            .quest_views("therapist")
            .into_iter()
            .map(|v| v.status)
            .collect();
        assert_eq!(
            statuses,
            vec![QuestStatus::Locked, QuestStatus::Blocked, QuestStatus::Completed]
        );
        assert!(resolver.npc_summary("nobody").is_none());
    }

    #[test]
    fn test_find_violations_transitive_and_cyclic() {
        let catalog = QuestCatalog::from_npcs(vec![npc(
            "fence",
            vec![
                quest("a", None, &[]),
                quest("b", None, &["a"]),
                quest("c", None, &["b"]),
                quest("x", None, &["y"]),
                quest("y", None, &["x"]),
            ],
        )])
        .unwrap();
        let rules = QuestRules::new();
        let mut progress = ProgressStore::new();
        for id in ["c", "b", "x", "y", "gone"] {
            complete(&mut progress, "fence", id);
        }

        let resolver = Resolver::new(&catalog, &rules, &progress);
        let violations = resolver.find_violations();
        let removed: Vec<&str> = violations.iter().map(|v| v.quest_id.as_str()).collect();
        assert_eq!(removed, vec!["c", "b", "x", "y", "gone"]);
        assert_eq!(
            violations[1].reason,
            ViolationReason::UnmetPrerequisites { missing: vec!["a".to_string()] }
        );
        assert_eq!(violations[4].reason, ViolationReason::UnknownQuest);
    }

    #[test]
    fn test_find_violations_exclusivity_and_wrong_npc() {
        let catalog = test_catalog();
        let rules = test_rules();
        let mut progress = ProgressStore::new();
        complete(&mut progress, "therapist", "savior");
        complete(&mut progress, "therapist", "fallen");
        complete(&mut progress, "prapor", "introduction");

        let resolver = Resolver::new(&catalog, &rules, &progress);
        let violations = resolver.find_violations();

        assert_eq!(violations.len(), 2);
        assert_eq!(
            violations[0].reason,
            ViolationReason::WrongNpc { owner: "mechanic".to_string() }
        );
        assert_eq!(violations[1].quest_id, "fallen");
        assert_eq!(
            violations[1].reason,
            ViolationReason::ExclusivityConflict {
                group_id: "ending".to_string(),
                kept: "savior".to_string(),
            }
        );
    }

    #[test]
    fn test_find_violations_keeps_first_member_in_scan_order() {
        let catalog = QuestCatalog::from_npcs(vec![npc(
            "therapist",
            vec![
                quest("x", None, &[]),
                quest("savior", Some(5), &["x"]),
                quest("fallen", Some(5), &[]),
                quest("after_fallen", Some(6), &["fallen"]),
            ],
        )])
        .unwrap();
        let rules = test_rules();
        let mut progress = ProgressStore::new();
        // savior's prerequisite is recorded after its rival
        for id in ["savior", "fallen", "x", "after_fallen"] {
            complete(&mut progress, "therapist", id);
        }

        let resolver = Resolver::new(&catalog, &rules, &progress);
        let violations = resolver.find_violations();

        let removed: Vec<&str> = violations.iter().map(|v| v.quest_id.as_str()).collect();
        assert_eq!(removed, vec!["fallen", "after_fallen"]);
        assert_eq!(
            violations[0].reason,
            ViolationReason::ExclusivityConflict {
                group_id: "ending".to_string(),
                kept: "savior".to_string(),
            }
        );
        assert_eq!(
            violations[1].reason,
            ViolationReason::UnmetPrerequisites { missing: vec!["fallen".to_string()] }
        );
    }

    #[test]
    fn test_next_quest_treats_missing_tier_as_cheapest() {
        let catalog = QuestCatalog::from_npcs(vec![npc(
            "skier",
            vec![
                quest("supplier", Some(1), &[]),
                quest("friend", Some(1), &["supplier"]),
                quest("untiered", None, &["supplier"]),
            ],
        )])
        .unwrap();
        let rules = QuestRules::new();
        let progress = ProgressStore::new();

        let resolver = Resolver::new(&catalog, &rules, &progress);
        assert_eq!(resolver.next_quest("skier").map(|q| q.id.as_str()), Some("untiered"));
    }
}
