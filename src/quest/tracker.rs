//! Quest Tracker
//!
//! Owns the catalog, the static rules, the progress store and its storage
//! backend. All mutations go through here: each one is checked against the
//! resolver, applied in memory, persisted, and followed by a re-evaluation
//! of NPC unlock gates.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::catalog::QuestCatalog;
use super::definition::Quest;
use super::resolver::{
    IntegrityViolation, KappaProgress, NpcSummary, QuestStatus, QuestView, Resolver,
};
use super::rules::QuestRules;
use super::state::ProgressStore;
use crate::error::{PersistenceError, TrackerError};
use crate::storage::ProgressStorage;

/// What a successful mutation changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MutationReport {
    /// False when the call was a no-op (undo of a quest that wasn't completed)
    pub changed: bool,
    /// NPCs whose quest line just opened
    pub unlocked: Vec<String>,
    /// NPCs whose gate closed again
    pub relocked: Vec<String>,
}

/// Result of reconciling saved progress against the catalog
#[derive(Debug, Default)]
pub struct ValidationReport {
    /// Completions that were removed
    pub violations: Vec<IntegrityViolation>,
    /// Set when the healed store could not be written back
    pub persist_error: Option<PersistenceError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty() && self.persist_error.is_none()
    }
}

/// Remove completions that the catalog no longer supports
///
/// Also collapses duplicate IDs and clears `current` pointers at quests the
/// NPC doesn't hand out. Returns the removed completions.
pub fn validate_completed_quests(
    catalog: &QuestCatalog,
    rules: &QuestRules,
    progress: &mut ProgressStore,
) -> Vec<IntegrityViolation> {
    let violations = Resolver::new(catalog, rules, progress).find_violations();

    for violation in &violations {
        warn!(
            "Removing completion '{}' from '{}': {:?}",
            violation.quest_id, violation.npc_id, violation.reason
        );
        progress
            .record_mut(&violation.npc_id)
            .uncomplete(&violation.quest_id);
    }

    for (npc_id, record) in progress.records_mut() {
        let dropped = record.dedup();
        if dropped > 0 {
            debug!("Collapsed {} duplicate completion(s) for '{}'", dropped, npc_id);
        }

        let stale_pointer = record
            .current
            .as_deref()
            .is_some_and(|id| !catalog.npc(npc_id).is_some_and(|npc| npc.owns(id)));
        if stale_pointer {
            debug!("Clearing stale current quest {:?} for '{}'", record.current, npc_id);
            record.current = None;
        }
    }

    violations
}

/// Single-user quest progress tracker
pub struct QuestTracker<S: ProgressStorage> {
    catalog: QuestCatalog,
    rules: QuestRules,
    progress: ProgressStore,
    storage: S,
    /// Unlock state last reported to the caller
    unlocks: BTreeMap<String, bool>,
}

impl<S: ProgressStorage> QuestTracker<S> {
    /// Create a tracker, loading any saved progress from `storage`
    ///
    /// Saved progress is taken as-is; call [`Self::validate_completed_quests`]
    /// next to reconcile it with the catalog.
    pub fn open(catalog: QuestCatalog, rules: QuestRules, storage: S) -> Result<Self, PersistenceError> {
        let progress = storage.load()?.unwrap_or_default();
        Ok(Self::with_progress(catalog, rules, progress, storage))
    }

    /// Create a tracker around an existing progress snapshot
    pub fn with_progress(catalog: QuestCatalog, rules: QuestRules, progress: ProgressStore, storage: S) -> Self {
        Self::audit_rules(&rules, &catalog);
        let unlocks = Resolver::new(&catalog, &rules, &progress).unlock_states();
        Self {
            catalog,
            rules,
            progress,
            storage,
            unlocks,
        }
    }

    /// Resolver over the current snapshot
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.catalog, &self.rules, &self.progress)
    }

    pub fn catalog(&self) -> &QuestCatalog {
        &self.catalog
    }

    pub fn rules(&self) -> &QuestRules {
        &self.rules
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn quest_status(&self, npc_id: &str, quest_id: &str) -> Result<QuestStatus, TrackerError> {
        self.resolver()
            .status_of(npc_id, quest_id)
            .ok_or_else(|| TrackerError::QuestNotFound {
                npc_id: npc_id.to_string(),
                quest_id: quest_id.to_string(),
            })
    }

    pub fn npc_summary(&self, npc_id: &str) -> Result<NpcSummary, TrackerError> {
        self.resolver()
            .npc_summary(npc_id)
            .ok_or_else(|| TrackerError::NpcNotFound(npc_id.to_string()))
    }

    pub fn quest_views(&self, npc_id: &str) -> Result<Vec<QuestView>, TrackerError> {
        self.require_npc(npc_id)?;
        Ok(self.resolver().quest_views(npc_id))
    }

    pub fn current_quest(&self, npc_id: &str) -> Option<&Quest> {
        self.resolver().current_quest(npc_id)
    }

    pub fn last_completed_quest(&self, npc_id: &str) -> Option<&Quest> {
        self.resolver().last_completed_quest(npc_id)
    }

    pub fn next_quest(&self, npc_id: &str) -> Option<&Quest> {
        self.resolver().next_quest(npc_id)
    }

    pub fn is_unlocked(&self, npc_id: &str) -> bool {
        self.resolver().is_unlocked(npc_id)
    }

    pub fn kappa_progress(&self) -> KappaProgress {
        self.resolver().kappa_progress()
    }

    /// Saved completions the catalog doesn't support, without removing them
    pub fn find_violations(&self) -> Vec<IntegrityViolation> {
        self.resolver().find_violations()
    }

    pub fn ensure_consistent(&self) -> Result<(), TrackerError> {
        let violations = self.find_violations();
        if violations.is_empty() {
            Ok(())
        } else {
            Err(TrackerError::CatalogIntegrity(violations))
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Make sure the NPC has a progress record (selecting it in the UI)
    pub fn select_npc(&mut self, npc_id: &str) -> Result<(), TrackerError> {
        self.require_npc(npc_id)?;
        if !self.progress.has_record(npc_id) {
            debug!("Creating progress record for '{}'", npc_id);
            self.progress.record_mut(npc_id);
        }
        Ok(())
    }

    /// Mark a quest completed for the NPC that hands it out
    pub fn complete_quest(&mut self, npc_id: &str, quest_id: &str) -> Result<MutationReport, TrackerError> {
        self.check_completable(npc_id, quest_id)?;

        self.progress.record_mut(npc_id).complete(quest_id);
        info!("Completed quest '{}' for '{}'", quest_id, npc_id);

        self.finish_mutation()
    }

    /// Remove a completion; downstream quests simply become locked again
    pub fn undo_complete_quest(&mut self, npc_id: &str, quest_id: &str) -> Result<MutationReport, TrackerError> {
        let removed = match self.progress.record(npc_id) {
            Some(record) if record.is_completed(quest_id) => {
                self.progress.record_mut(npc_id).uncomplete(quest_id)
            }
            _ => false,
        };

        if !removed {
            debug!("Undo of '{}' for '{}' is a no-op", quest_id, npc_id);
            return Ok(MutationReport::default());
        }

        info!("Undid quest '{}' for '{}'", quest_id, npc_id);
        self.finish_mutation()
    }

    /// Clear all progress for one NPC
    pub fn reset_npc_progress(&mut self, npc_id: &str) -> Result<MutationReport, TrackerError> {
        if self.catalog.npc(npc_id).is_none() && !self.progress.has_record(npc_id) {
            return Err(TrackerError::NpcNotFound(npc_id.to_string()));
        }

        self.progress.record_mut(npc_id).reset();
        info!("Reset progress for '{}'", npc_id);

        self.finish_mutation()
    }

    /// Point the advisory "current quest" at a quest of this NPC, or clear it
    pub fn set_current_quest(&mut self, npc_id: &str, quest_id: Option<&str>) -> Result<MutationReport, TrackerError> {
        if let Some(quest_id) = quest_id {
            let owned = self.catalog.npc(npc_id).is_some_and(|npc| npc.owns(quest_id));
            if !owned {
                return Err(TrackerError::QuestNotFound {
                    npc_id: npc_id.to_string(),
                    quest_id: quest_id.to_string(),
                });
            }
        } else {
            self.require_npc(npc_id)?;
        }

        self.progress.record_mut(npc_id).current = quest_id.map(str::to_string);
        self.persist()?;
        Ok(MutationReport {
            changed: true,
            ..MutationReport::default()
        })
    }

    /// Reconcile saved progress with the catalog, removing what it can't support
    pub fn validate_completed_quests(&mut self) -> ValidationReport {
        let before = self.progress.clone();
        let violations = validate_completed_quests(&self.catalog, &self.rules, &mut self.progress);
        let mut report = ValidationReport {
            violations,
            persist_error: None,
        };

        if self.progress == before {
            debug!("Saved progress is consistent with the catalog");
            return report;
        }

        let (latest, unlocked, relocked) = self.unlock_transitions();
        match self.persist() {
            Ok(()) => {
                if !unlocked.is_empty() || !relocked.is_empty() {
                    info!("Validation changed unlocks: opened {:?}, closed {:?}", unlocked, relocked);
                }
                self.unlocks = latest;
            }
            Err(e) => report.persist_error = Some(e),
        }
        report
    }

    /// Swap in a freshly loaded catalog and reconcile progress against it
    pub fn replace_catalog(&mut self, catalog: QuestCatalog) -> ValidationReport {
        info!(
            "Replacing quest catalog ({} -> {} quests)",
            self.catalog.quest_count(),
            catalog.quest_count()
        );
        self.catalog = catalog;
        Self::audit_rules(&self.rules, &self.catalog);

        let report = self.validate_completed_quests();

        // Track NPCs the new catalog added and forget removed ones; known
        // NPCs keep their snapshot so unreported transitions survive
        let latest = self.resolver().unlock_states();
        self.unlocks.retain(|npc_id, _| latest.contains_key(npc_id));
        for (npc_id, state) in latest {
            self.unlocks.entry(npc_id).or_insert(state);
        }
        report
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn require_npc(&self, npc_id: &str) -> Result<(), TrackerError> {
        match self.catalog.npc(npc_id) {
            Some(_) => Ok(()),
            None => Err(TrackerError::NpcNotFound(npc_id.to_string())),
        }
    }

    /// Reject the completion unless the quest is currently Available
    fn check_completable(&self, npc_id: &str, quest_id: &str) -> Result<(), TrackerError> {
        let quest = self
            .catalog
            .npc(npc_id)
            .and_then(|npc| npc.get_quest(quest_id))
            .ok_or_else(|| TrackerError::QuestNotFound {
                npc_id: npc_id.to_string(),
                quest_id: quest_id.to_string(),
            })?;

        let resolver = self.resolver();
        match resolver.classify(quest, npc_id) {
            QuestStatus::Available => Ok(()),
            QuestStatus::Completed => Err(TrackerError::AlreadyCompleted {
                npc_id: npc_id.to_string(),
                quest_id: quest_id.to_string(),
            }),
            QuestStatus::Locked => {
                let missing = resolver.missing_prerequisites(quest);
                let dangling: Vec<String> = missing
                    .iter()
                    .filter(|p| !self.catalog.contains_quest(p))
                    .map(|p| p.to_string())
                    .collect();
                if !dangling.is_empty() {
                    warn!(
                        "Quest '{}' can never unlock, prerequisites missing from catalog: {:?}",
                        quest_id, dangling
                    );
                }
                Err(TrackerError::PrerequisitesNotMet {
                    quest_id: quest_id.to_string(),
                    missing: missing.into_iter().map(str::to_string).collect(),
                    dangling,
                })
            }
            QuestStatus::Blocked => {
                let block = resolver.exclusivity_block(quest);
                let (group_id, completed_rival) = block
                    .map(|b| (b.group_id, b.completed_rival))
                    .unwrap_or_default();
                Err(TrackerError::ExclusivityBlocked {
                    quest_id: quest_id.to_string(),
                    group_id,
                    completed_rival,
                })
            }
        }
    }

    /// Persist, then report gate changes. State stays applied if the write
    /// fails; the gate snapshot does not, so the next successful mutation
    /// reports the transitions instead.
    fn finish_mutation(&mut self) -> Result<MutationReport, TrackerError> {
        let (latest, unlocked, relocked) = self.unlock_transitions();

        self.persist()?;

        self.unlocks = latest;
        for npc_id in &unlocked {
            info!("NPC '{}' unlocked", npc_id);
        }
        for npc_id in &relocked {
            info!("NPC '{}' locked again", npc_id);
        }

        Ok(MutationReport {
            changed: true,
            unlocked,
            relocked,
        })
    }

    /// Current unlock states and how they differ from the last committed snapshot
    fn unlock_transitions(&self) -> (BTreeMap<String, bool>, Vec<String>, Vec<String>) {
        let latest = self.resolver().unlock_states();
        let mut unlocked = Vec::new();
        let mut relocked = Vec::new();

        for (npc_id, &now) in &latest {
            let before = self.unlocks.get(npc_id).copied().unwrap_or(true);
            match (before, now) {
                (false, true) => unlocked.push(npc_id.clone()),
                (true, false) => relocked.push(npc_id.clone()),
                _ => {}
            }
        }

        (latest, unlocked, relocked)
    }

    fn audit_rules(rules: &QuestRules, catalog: &QuestCatalog) {
        let problems = rules.audit(catalog);
        if problems > 0 {
            warn!("{} quest rule reference(s) don't match the catalog", problems);
        }
    }

    fn persist(&self) -> Result<(), PersistenceError> {
        self.storage.save(&self.progress).inspect_err(|e| {
            error!("Failed to persist progress: {}", e);
        })
    }
}
