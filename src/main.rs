use std::process::ExitCode;

use tracing::{error, info, warn};

use quest_tracker::quest::{CatalogReloadEvent, CatalogWatcher, ValidationReport};
use quest_tracker::{JsonFileStorage, QuestCatalog, QuestTracker, TrackerConfig};

fn main() -> ExitCode {
    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let filter = match "quest_tracker=info".parse() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = TrackerConfig::load_from_env()?;
    let rules = config.rules()?;
    let catalog = QuestCatalog::load(&config.catalog_path)?;
    let storage = JsonFileStorage::new(&config.progress_path);

    let mut tracker = QuestTracker::open(catalog, rules, storage)?;
    log_validation(&tracker.validate_completed_quests());
    log_overview(&tracker);

    if !config.watch_catalog {
        return Ok(());
    }

    let watcher = CatalogWatcher::start(&config.catalog_path)?;
    while let Some(event) = watcher.recv() {
        match event {
            CatalogReloadEvent::Reloaded(catalog) => {
                log_validation(&tracker.replace_catalog(catalog));
                log_overview(&tracker);
            }
            CatalogReloadEvent::Failed(reason) => {
                warn!("Keeping previous catalog: {}", reason);
            }
        }
    }

    Ok(())
}

fn log_validation(report: &ValidationReport) {
    if !report.violations.is_empty() {
        warn!(
            "Removed {} completion(s) the catalog no longer supports",
            report.violations.len()
        );
    }
    if let Some(e) = &report.persist_error {
        error!("Validated progress could not be saved: {}", e);
    }
}

fn log_overview(tracker: &QuestTracker<JsonFileStorage>) {
    for npc in tracker.catalog().npcs() {
        let Ok(summary) = tracker.npc_summary(&npc.id) else {
            continue;
        };

        if !summary.is_unlocked {
            info!("{}: locked", npc.name);
            continue;
        }

        let current = tracker.current_quest(&npc.id).map(|q| q.name.as_str());
        let next = tracker.next_quest(&npc.id).map(|q| q.name.as_str());
        info!(
            "{}: {}/{} completed, {} available, {} locked, {} blocked | current: {} | next: {}",
            npc.name,
            summary.completed_count,
            summary.total,
            summary.available_count,
            summary.locked_count,
            summary.blocked_count,
            current.unwrap_or("-"),
            next.unwrap_or("-"),
        );
    }

    let kappa = tracker.kappa_progress();
    info!("Kappa progress: {}/{}", kappa.completed, kappa.total);
}
