//! Spawn Zones
//!
//! Per-area coordinators. A spawn zone receives "this quest object satisfied
//! its condition" signals from the sensing layer and routes them into the
//! quest state machine: it locates the matching criterion by (type, object
//! identity), guards that it is the currently active objective, marks it
//! completed, and asks the manager to advance or finalize.

use tracing::debug;

use super::definition::CriteriaType;
use super::events::EventBus;
use super::manager::QuestManager;
use super::state::CriteriaStatus;
use crate::scheduler::Scheduler;
use crate::world::WorldInterface;

pub struct SpawnZone {
    pub name: String,
    /// World object ids of the quest objects this zone supervises
    pub objects: Vec<String>,
}

impl SpawnZone {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            objects: Vec::new(),
        }
    }

    pub fn supervise(&mut self, object_id: &str) {
        if !self.objects.iter().any(|o| o == object_id) {
            self.objects.push(object_id.to_string());
        }
    }

    pub fn notify_find_complete(
        &self,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        self.notify_complete(CriteriaType::Find, object_id, manager, world, bus, scheduler);
    }

    pub fn notify_explore_complete(
        &self,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        self.notify_complete(CriteriaType::Explore, object_id, manager, world, bus, scheduler);
    }

    pub fn notify_escape_complete(
        &self,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        self.notify_complete(CriteriaType::Escape, object_id, manager, world, bus, scheduler);
    }

    pub fn notify_talk_complete(
        &self,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        self.notify_complete(CriteriaType::Talk, object_id, manager, world, bus, scheduler);
    }

    pub fn notify_unlock_solve_complete(
        &self,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        self.notify_complete(CriteriaType::UnlockSolve, object_id, manager, world, bus, scheduler);
    }

    pub fn notify_deliver_complete(
        &self,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        self.notify_complete(CriteriaType::Deliver, object_id, manager, world, bus, scheduler);
    }

    /// The core matching algorithm: bind a physical completion signal back
    /// to the correct abstract criterion, then drive the state machine.
    /// Signals for criteria that are not currently in progress (stale,
    /// duplicate, or premature) change nothing.
    pub fn notify_complete(
        &self,
        kind: CriteriaType,
        object_id: &str,
        manager: &mut QuestManager,
        world: &mut dyn WorldInterface,
        bus: &mut EventBus,
        scheduler: &mut Scheduler,
    ) {
        let Some((quest_name, index, status)) = manager.find_criterion(kind, object_id) else {
            debug!(
                "Zone '{}': no active quest has a {} criterion bound to '{}'",
                self.name,
                kind.as_str(),
                object_id
            );
            return;
        };

        if status != CriteriaStatus::InProgress {
            debug!(
                "Zone '{}': ignoring {} signal for '{}' ({} criterion is {})",
                self.name,
                kind.as_str(),
                object_id,
                quest_name,
                status.as_str()
            );
            return;
        }

        if let Some(quest) = manager.quest_mut(&quest_name) {
            quest.criteria[index].status = CriteriaStatus::Completed;
        }
        manager.set_next_active_criteria(&quest_name, index, world, bus, scheduler);

        let all_done = manager
            .quest(&quest_name)
            .map_or(false, |q| q.all_completed());
        if all_done {
            manager.complete_quest(&quest_name, world, bus, scheduler);
        }
    }

    /// A supervised object is visible exactly while some active quest's
    /// in-progress criterion is bound to it (used after load to restore
    /// the stage)
    pub fn sync_object_visibility(&self, manager: &QuestManager, world: &mut dyn WorldInterface) {
        for object_id in &self.objects {
            world.set_active(object_id, manager.object_bound_to_in_progress(object_id));
        }
    }
}
