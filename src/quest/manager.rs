//! Quest Manager
//!
//! Global quest orchestrator: owns the active-quests table, sequences
//! criteria by priority, detects completion, and redirects the compass.
//! Collaborators (world, event bus, scheduler) are passed into each
//! operation by the engine; there is no global state.
//!
//! Every preconditioned operation degrades to a logged no-op instead of
//! erroring: the failure modes here are content/configuration issues, not
//! logic errors, and the worst case is a quest that stalls until the
//! content is re-authored.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use super::definition::CriteriaType;
use super::events::{EventBus, QuestEvent};
use super::registry::QuestRegistry;
use super::save;
use super::state::{CriteriaStatus, MainQuest, QuestStatus};
use crate::scheduler::{DeferredAction, Scheduler};
use crate::store::SaveStore;
use crate::world::{Compass, WorldInterface};

pub struct QuestManager {
    registry: Arc<QuestRegistry>,
    /// Accepted quests, keyed by quest name
    pub(crate) active: HashMap<String, MainQuest>,
    /// Acceptance order, for deterministic iteration and saves
    pub(crate) order: Vec<String>,
    pub(crate) compass: Compass,
}

impl QuestManager {
    pub fn new(registry: Arc<QuestRegistry>) -> Self {
        Self {
            registry,
            active: HashMap::new(),
            order: Vec::new(),
            compass: Compass::new(),
        }
    }

    pub fn registry(&self) -> &Arc<QuestRegistry> {
        &self.registry
    }

    pub fn compass(&self) -> &Compass {
        &self.compass
    }

    /// Accepted quests in acceptance order
    pub fn active_quests(&self) -> impl Iterator<Item = &MainQuest> {
        self.order.iter().filter_map(|name| self.active.get(name))
    }

    pub fn quest(&self, quest_name: &str) -> Option<&MainQuest> {
        self.active.get(quest_name)
    }

    pub(crate) fn quest_mut(&mut self, quest_name: &str) -> Option<&mut MainQuest> {
        self.active.get_mut(quest_name)
    }

    /// Accept a quest: register it, start its lowest-priority criterion,
    /// activate that criterion's world object, and redirect the compass.
    /// A no-op (logged) for unknown names and already-accepted quests.
    pub fn accept_quest(
        &mut self,
        quest_name: &str,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
    ) {
        if self.active.contains_key(quest_name) {
            warn!("accept_quest: '{}' is already accepted", quest_name);
            return;
        }

        let Some(def) = self.registry.get(quest_name) else {
            warn!("accept_quest: unknown quest '{}'", quest_name);
            return;
        };

        let mut quest = MainQuest::from_def(&def);
        quest.sort_by_priority();
        quest.status = QuestStatus::InProgress;

        if let Some(first) = quest.first_incomplete() {
            quest.criteria[first].status = CriteriaStatus::InProgress;
            if let Some(object) = quest.criteria[first].object.clone() {
                world.set_active(&object, true);
                self.compass.set_target(&object);
            } else {
                debug!(
                    "accept_quest: criterion '{}' has no associated object",
                    quest.criteria[first].name
                );
            }
        }

        info!("Quest accepted: {}", quest_name);
        self.active.insert(quest_name.to_string(), quest);
        self.order.push(quest_name.to_string());
        bus.publish(&QuestEvent::QuestAccepted {
            quest_name: quest_name.to_string(),
        });
    }

    /// After `completed_index` finished, advance to the next not-started
    /// criterion in priority order: start it, activate its object, and
    /// redirect the compass. The completed criterion's object lingers for
    /// its type's deactivate delay before disappearing.
    pub fn set_next_active_criteria(
        &mut self,
        quest_name: &str,
        completed_index: usize,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        let Some(quest) = self.active.get_mut(quest_name) else {
            warn!("set_next_active_criteria: quest '{}' is not active", quest_name);
            return;
        };
        quest.sort_by_priority();

        let Some(completed) = quest.criteria.get(completed_index) else {
            warn!(
                "set_next_active_criteria: '{}' has no criterion at index {}",
                quest_name, completed_index
            );
            return;
        };
        if completed.status != CriteriaStatus::Completed {
            warn!(
                "set_next_active_criteria: criterion '{}' of '{}' is {}, not completed",
                completed.name,
                quest_name,
                completed.status.as_str()
            );
            return;
        }

        if let Some(object) = completed.object.clone() {
            let linger = completed.kind.deactivate_delay();
            if linger.is_zero() {
                world.set_active(&object, false);
            } else {
                scheduler.schedule_in(linger, DeferredAction::DeactivateObject { object });
            }
        }

        let Some(next) = quest
            .criteria
            .iter()
            .position(|c| c.status == CriteriaStatus::NotStarted)
        else {
            // Nothing left to start; complete_quest finalizes
            debug!("set_next_active_criteria: '{}' has no criterion left to start", quest_name);
            return;
        };

        quest.criteria[next].status = CriteriaStatus::InProgress;
        let criteria_name = quest.criteria[next].name.clone();
        if let Some(object) = quest.criteria[next].object.clone() {
            world.set_active(&object, true);
            self.compass.set_target(&object);
        } else {
            debug!("set_next_active_criteria: criterion '{}' has no associated object", criteria_name);
        }

        info!("Quest '{}': criterion '{}' started", quest_name, criteria_name);
        bus.publish(&QuestEvent::NextCriteriaStarted {
            quest_name: quest_name.to_string(),
            criteria_name,
        });
    }

    /// Mark the current in-progress criterion completed and advance; when
    /// every criterion is completed, finalize the quest. Designed to be
    /// called once per criterion-satisfaction event.
    pub fn complete_quest(
        &mut self,
        quest_name: &str,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        let current = {
            let Some(quest) = self.active.get_mut(quest_name) else {
                warn!("complete_quest: quest '{}' is not active", quest_name);
                return;
            };
            if quest.status != QuestStatus::InProgress {
                warn!(
                    "complete_quest: '{}' is {}, not in progress",
                    quest_name,
                    quest.status.as_str()
                );
                return;
            }
            quest.sort_by_priority();

            quest.first_in_progress().map(|i| {
                quest.criteria[i].status = CriteriaStatus::Completed;
                i
            })
        };

        if let Some(current) = current {
            self.set_next_active_criteria(quest_name, current, world, bus, scheduler);
        }

        let Some(quest) = self.active.get_mut(quest_name) else {
            return;
        };
        if quest.all_completed() {
            quest.status = QuestStatus::Completed;
            info!("Quest completed: {}", quest_name);
            self.compass.clear();
            bus.publish(&QuestEvent::QuestCompleted {
                quest_name: quest_name.to_string(),
            });
        }
    }

    /// Locate, among all active quests, the criterion matching a (type,
    /// world object) pair. Prefers an in-progress match; otherwise returns
    /// the first match in acceptance order so stale signals can be logged
    /// against it.
    pub(crate) fn find_criterion(
        &self,
        kind: CriteriaType,
        object_id: &str,
    ) -> Option<(String, usize, CriteriaStatus)> {
        let mut fallback = None;
        for name in &self.order {
            let Some(quest) = self.active.get(name) else {
                continue;
            };
            if let Some(index) = quest.match_criterion(kind, object_id) {
                let status = quest.criteria[index].status;
                if status == CriteriaStatus::InProgress {
                    return Some((name.clone(), index, status));
                }
                if fallback.is_none() {
                    fallback = Some((name.clone(), index, status));
                }
            }
        }
        fallback
    }

    /// Whether some active quest's in-progress criterion is bound to this
    /// object (used to guard delayed deactivation against re-activation)
    pub fn object_bound_to_in_progress(&self, object_id: &str) -> bool {
        self.active_quests().any(|quest| {
            quest.criteria.iter().any(|c| {
                c.status == CriteriaStatus::InProgress && c.object.as_deref() == Some(object_id)
            })
        })
    }

    /// Persist quest state into the save store
    pub fn save_state(&self, store: &mut dyn SaveStore, world: &dyn WorldInterface) {
        save::save_state(self, store, world);
    }

    /// Restore quest state from the save store, reconciling against the
    /// authored definitions
    pub fn load_state(&mut self, store: &dyn SaveStore, world: &mut dyn WorldInterface) {
        save::load_state(self, store, world);
    }
}
