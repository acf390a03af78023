//! Quest Save/Load
//!
//! Serializes quest and criteria status into the named-value store and
//! reconciles restored records against the authored definitions. Load never
//! trusts the save blindly: unknown quests and criteria are dropped, and the
//! single-in-progress invariant is re-enforced by coercion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::definition::QuestDef;
use super::manager::QuestManager;
use super::state::{CriteriaStatus, MainQuest, QuestStatus};
use crate::store::SaveStore;
use crate::world::WorldInterface;

/// Store key for the roster of accepted quests
pub const ACTIVE_QUESTS_KEY: &str = "quests/active";

/// Store key for one quest's record
pub fn quest_key(quest_name: &str) -> String {
    format!("quest/{}", quest_name)
}

/// Roster of accepted quests, in acceptance order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRecord {
    pub active_quest_names: Vec<String>,
    pub saved_at: DateTime<Utc>,
}

/// One quest's persisted state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestRecord {
    pub quest_name: String,
    pub status: QuestStatus,
    pub criteria: Vec<CriteriaRecord>,
    pub object_active_states: Vec<ObjectActiveRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CriteriaRecord {
    pub criteria_name: String,
    pub status: CriteriaStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectActiveRecord {
    pub criteria_name: String,
    pub is_active: bool,
}

/// Write the roster and one record per active quest into the store
pub(crate) fn save_state(
    manager: &QuestManager,
    store: &mut dyn SaveStore,
    world: &dyn WorldInterface,
) {
    let roster = SaveRecord {
        active_quest_names: manager.order.clone(),
        saved_at: Utc::now(),
    };
    match serde_json::to_string(&roster) {
        Ok(json) => store.save_value(ACTIVE_QUESTS_KEY, &json),
        Err(e) => {
            warn!("Failed to serialize quest roster: {}", e);
            return;
        }
    }

    let mut count = 0;
    for quest in manager.active_quests() {
        let record = QuestRecord {
            quest_name: quest.name.clone(),
            status: quest.status,
            criteria: quest
                .criteria
                .iter()
                .map(|c| CriteriaRecord {
                    criteria_name: c.name.clone(),
                    status: c.status,
                })
                .collect(),
            object_active_states: quest
                .criteria
                .iter()
                .filter_map(|c| {
                    c.object.as_ref().map(|object| ObjectActiveRecord {
                        criteria_name: c.name.clone(),
                        is_active: world.is_active(object),
                    })
                })
                .collect(),
        };

        match serde_json::to_string(&record) {
            Ok(json) => {
                store.save_value(&quest_key(&quest.name), &json);
                count += 1;
            }
            Err(e) => warn!("Failed to serialize quest '{}': {}", quest.name, e),
        }
    }

    info!("Saved {} quests", count);
}

/// Restore quest state from the store. A missing or malformed roster leaves
/// in-memory state untouched; per-quest failures keep that quest's current
/// in-memory state when it exists.
pub(crate) fn load_state(
    manager: &mut QuestManager,
    store: &dyn SaveStore,
    world: &mut dyn WorldInterface,
) {
    let Some(json) = store.load_value(ACTIVE_QUESTS_KEY) else {
        warn!("No quest save record found");
        return;
    };
    let roster: SaveRecord = match serde_json::from_str(&json) {
        Ok(r) => r,
        Err(e) => {
            warn!("Malformed quest roster in save: {}", e);
            return;
        }
    };

    let mut restored = std::collections::HashMap::new();
    let mut restored_order = Vec::new();

    for name in &roster.active_quest_names {
        let Some(def) = manager.registry().get(name) else {
            warn!("Save references unknown quest '{}'; skipping", name);
            continue;
        };

        let record: Option<QuestRecord> = store
            .load_value(&quest_key(name))
            .and_then(|json| match serde_json::from_str(&json) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Malformed record for quest '{}': {}", name, e);
                    None
                }
            });

        match record {
            Some(record) => {
                let quest = restore_quest(&def, &record, world);
                restored.insert(name.clone(), quest);
                restored_order.push(name.clone());
            }
            None => {
                // Fail safe: keep whatever this session already has
                if let Some(existing) = manager.active.remove(name) {
                    warn!("Keeping in-memory state for quest '{}'", name);
                    restored.insert(name.clone(), existing);
                    restored_order.push(name.clone());
                }
            }
        }
    }

    manager.active = restored;
    manager.order = restored_order;

    // Point the compass at the most recently accepted quest still underway
    let target = manager
        .active_quests()
        .filter(|q| q.status == QuestStatus::InProgress)
        .filter_map(|q| {
            q.first_in_progress()
                .and_then(|i| q.criteria[i].object.clone())
        })
        .last();
    match target {
        Some(object) => manager.compass.set_target(&object),
        None => manager.compass.clear(),
    }

    info!("Restored {} quests from save", manager.order.len());
}

/// Rebuild one quest from its record, reconciling against the authored
/// definition and coercing the single-in-progress invariant
fn restore_quest(def: &QuestDef, record: &QuestRecord, world: &mut dyn WorldInterface) -> MainQuest {
    let mut quest = MainQuest::from_def(def);
    quest.status = record.status;

    for cr in &record.criteria {
        match quest.criteria.iter_mut().find(|c| c.name == cr.criteria_name) {
            Some(c) => c.status = cr.status,
            None => warn!(
                "Save references unknown criterion '{}' of quest '{}'; dropped",
                cr.criteria_name, quest.name
            ),
        }
    }
    quest.sort_by_priority();

    // At most one criterion may survive as in-progress: first in priority
    // order wins, the rest are demoted
    let mut seen_in_progress = false;
    for c in &mut quest.criteria {
        if c.status == CriteriaStatus::InProgress {
            if seen_in_progress {
                warn!(
                    "Quest '{}': demoting duplicate in-progress criterion '{}'",
                    quest.name, c.name
                );
                c.status = CriteriaStatus::NotStarted;
            } else {
                seen_in_progress = true;
            }
        }
    }

    // An underway quest with no active criterion would stall; promote the
    // first incomplete one
    if quest.status == QuestStatus::InProgress && !seen_in_progress {
        if let Some(i) = quest.first_incomplete() {
            warn!(
                "Quest '{}' restored with no active criterion; promoting '{}'",
                quest.name, quest.criteria[i].name
            );
            quest.criteria[i].status = CriteriaStatus::InProgress;
        }
    }

    for oa in &record.object_active_states {
        match def.get_criterion(&oa.criteria_name).and_then(|c| c.object.as_ref()) {
            Some(object) => world.set_active(object, oa.is_active),
            None => debug!(
                "No world object to restore for criterion '{}' of quest '{}'",
                oa.criteria_name, quest.name
            ),
        }
    }

    quest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::events::EventBus;
    use crate::quest::test_support::{registry_with, EventRecorder, STUDY_QUEST_TOML};
    use crate::scheduler::Scheduler;
    use crate::store::{MemoryStore, SaveStore};
    use crate::world::{StageWorld, Vec3};

    /// Four-step quest for round-trip coverage
    const CELLAR_QUEST_TOML: &str = r#"
[quest]
name = "below_the_manor"
description = "Chart the cellar and bring back proof."

[[quest.criteria]]
name = "find_cellar_map"
type = "find"
priority = 0
object = "cellar_map"

[[quest.criteria]]
name = "reach_the_cellar"
type = "explore"
priority = 1
object = "cellar_arch"

[[quest.criteria]]
name = "open_the_strongbox"
type = "unlock_solve"
priority = 2
object = "strongbox"

[[quest.criteria]]
name = "deliver_the_ledger"
type = "deliver"
priority = 3
object = "ledger"
"#;

    fn stage_for_cellar() -> StageWorld {
        let mut world = StageWorld::new();
        for id in ["cellar_map", "cellar_arch", "strongbox", "ledger"] {
            world.place(id, "prop", Vec3::ZERO);
            world.set_active(id, false);
        }
        world
    }

    #[test]
    fn test_round_trip_preserves_statuses() {
        let registry = registry_with(&[CELLAR_QUEST_TOML]);
        let mut manager = QuestManager::new(registry.clone());
        let mut world = stage_for_cellar();
        let mut bus = EventBus::new();
        let _recorder = EventRecorder::subscribed(&mut bus);
        let mut scheduler = Scheduler::new();

        manager.accept_quest("below_the_manor", &mut world, &mut bus);
        manager.complete_quest("below_the_manor", &mut world, &mut bus, &mut scheduler);
        manager.complete_quest("below_the_manor", &mut world, &mut bus, &mut scheduler);

        let mut store = MemoryStore::new();
        manager.save_state(&mut store, &world);

        let mut fresh = QuestManager::new(registry);
        let mut fresh_world = stage_for_cellar();
        fresh.load_state(&store, &mut fresh_world);

        let quest = fresh.quest("below_the_manor").expect("quest restored");
        assert_eq!(quest.status, QuestStatus::InProgress);
        assert_eq!(quest.criteria[0].status, CriteriaStatus::Completed);
        assert_eq!(quest.criteria[1].status, CriteriaStatus::Completed);
        assert_eq!(quest.criteria[2].status, CriteriaStatus::InProgress);
        assert_eq!(quest.criteria[3].status, CriteriaStatus::NotStarted);
        assert_eq!(quest.in_progress_count(), 1);

        // Object activity and compass restored alongside status
        assert!(fresh_world.is_active("strongbox"));
        assert!(!fresh_world.is_active("ledger"));
        assert_eq!(fresh.compass().target(), Some("strongbox"));
    }

    #[test]
    fn test_duplicate_in_progress_criteria_are_coerced() {
        let registry = registry_with(&[STUDY_QUEST_TOML]);
        let mut manager = QuestManager::new(registry);
        let mut world = StageWorld::new();

        let roster = SaveRecord {
            active_quest_names: vec!["the_locked_study".to_string()],
            saved_at: Utc::now(),
        };
        // Corrupt: talk and escape both in progress
        let record = QuestRecord {
            quest_name: "the_locked_study".to_string(),
            status: QuestStatus::InProgress,
            criteria: vec![
                CriteriaRecord {
                    criteria_name: "find_brass_key".to_string(),
                    status: CriteriaStatus::Completed,
                },
                CriteriaRecord {
                    criteria_name: "ask_the_caretaker".to_string(),
                    status: CriteriaStatus::InProgress,
                },
                CriteriaRecord {
                    criteria_name: "slip_out_the_gate".to_string(),
                    status: CriteriaStatus::InProgress,
                },
            ],
            object_active_states: vec![],
        };

        let mut store = MemoryStore::new();
        store.save_value(ACTIVE_QUESTS_KEY, &serde_json::to_string(&roster).unwrap());
        store.save_value(
            &quest_key("the_locked_study"),
            &serde_json::to_string(&record).unwrap(),
        );

        manager.load_state(&store, &mut world);

        let quest = manager.quest("the_locked_study").unwrap();
        // First in priority order wins, the other is demoted
        assert_eq!(quest.criteria[1].status, CriteriaStatus::InProgress);
        assert_eq!(quest.criteria[2].status, CriteriaStatus::NotStarted);
        assert_eq!(quest.in_progress_count(), 1);
    }

    #[test]
    fn test_missing_save_leaves_state_untouched() {
        let registry = registry_with(&[STUDY_QUEST_TOML]);
        let mut manager = QuestManager::new(registry);
        let mut world = StageWorld::new();
        let mut bus = EventBus::new();
        manager.accept_quest("the_locked_study", &mut world, &mut bus);

        let store = MemoryStore::new();
        manager.load_state(&store, &mut world);

        let quest = manager.quest("the_locked_study").unwrap();
        assert_eq!(quest.status, QuestStatus::InProgress);
        assert_eq!(quest.criteria[0].status, CriteriaStatus::InProgress);
    }

    #[test]
    fn test_malformed_roster_leaves_state_untouched() {
        let registry = registry_with(&[STUDY_QUEST_TOML]);
        let mut manager = QuestManager::new(registry);
        let mut world = StageWorld::new();
        let mut bus = EventBus::new();
        manager.accept_quest("the_locked_study", &mut world, &mut bus);

        let mut store = MemoryStore::new();
        store.save_value(ACTIVE_QUESTS_KEY, "not json");
        manager.load_state(&store, &mut world);

        assert!(manager.quest("the_locked_study").is_some());
    }

    #[test]
    fn test_unknown_quests_and_criteria_are_dropped() {
        let registry = registry_with(&[STUDY_QUEST_TOML]);
        let mut manager = QuestManager::new(registry);
        let mut world = StageWorld::new();

        let roster = SaveRecord {
            active_quest_names: vec![
                "the_locked_study".to_string(),
                "quest_from_a_newer_build".to_string(),
            ],
            saved_at: Utc::now(),
        };
        let record = QuestRecord {
            quest_name: "the_locked_study".to_string(),
            status: QuestStatus::InProgress,
            criteria: vec![
                CriteriaRecord {
                    criteria_name: "find_brass_key".to_string(),
                    status: CriteriaStatus::InProgress,
                },
                CriteriaRecord {
                    criteria_name: "criterion_from_a_newer_build".to_string(),
                    status: CriteriaStatus::InProgress,
                },
            ],
            object_active_states: vec![],
        };

        let mut store = MemoryStore::new();
        store.save_value(ACTIVE_QUESTS_KEY, &serde_json::to_string(&roster).unwrap());
        store.save_value(
            &quest_key("the_locked_study"),
            &serde_json::to_string(&record).unwrap(),
        );

        manager.load_state(&store, &mut world);

        assert_eq!(manager.active_quests().count(), 1);
        let quest = manager.quest("the_locked_study").unwrap();
        assert_eq!(quest.criteria[0].status, CriteriaStatus::InProgress);
        assert_eq!(quest.in_progress_count(), 1);
    }

    #[test]
    fn test_restored_quest_with_no_active_criterion_is_promoted() {
        let registry = registry_with(&[STUDY_QUEST_TOML]);
        let mut manager = QuestManager::new(registry);
        let mut world = StageWorld::new();

        let roster = SaveRecord {
            active_quest_names: vec!["the_locked_study".to_string()],
            saved_at: Utc::now(),
        };
        let record = QuestRecord {
            quest_name: "the_locked_study".to_string(),
            status: QuestStatus::InProgress,
            criteria: vec![CriteriaRecord {
                criteria_name: "find_brass_key".to_string(),
                status: CriteriaStatus::Completed,
            }],
            object_active_states: vec![],
        };

        let mut store = MemoryStore::new();
        store.save_value(ACTIVE_QUESTS_KEY, &serde_json::to_string(&roster).unwrap());
        store.save_value(
            &quest_key("the_locked_study"),
            &serde_json::to_string(&record).unwrap(),
        );

        manager.load_state(&store, &mut world);

        let quest = manager.quest("the_locked_study").unwrap();
        assert_eq!(quest.criteria[1].status, CriteriaStatus::InProgress);
        assert_eq!(quest.in_progress_count(), 1);
    }
}
