//! Quest Engine
//!
//! The explicitly constructed context object that owns every quest subsystem
//! and drives them from the embedding game loop: one `tick()` per frame step,
//! plus the save/load hooks. Components never reach for globals; the engine
//! hands collaborators to each operation.

use std::collections::HashMap;
use std::sync::{mpsc, Arc};

use tracing::{debug, info, warn};

use crate::quest::events::{EventBus, QuestListener, SubscriberId};
use crate::quest::manager::QuestManager;
use crate::quest::object::QuestObject;
use crate::quest::registry::{HotReloadEvent, QuestRegistry};
use crate::quest::state::{CriteriaStatus, MainQuest};
use crate::quest::zone::SpawnZone;
use crate::scheduler::{DeferredAction, Scheduler};
use crate::store::SaveStore;
use crate::world::{Compass, WorldInterface};

pub struct QuestEngine {
    registry: Arc<QuestRegistry>,
    manager: QuestManager,
    zones: HashMap<String, SpawnZone>,
    objects: HashMap<String, QuestObject>,
    scheduler: Scheduler,
    bus: EventBus,
    world: Box<dyn WorldInterface>,
    store: Box<dyn SaveStore>,
    reload_rx: Option<mpsc::Receiver<HotReloadEvent>>,
}

impl QuestEngine {
    pub fn new(
        registry: Arc<QuestRegistry>,
        world: Box<dyn WorldInterface>,
        store: Box<dyn SaveStore>,
    ) -> Self {
        Self {
            manager: QuestManager::new(registry.clone()),
            registry,
            zones: HashMap::new(),
            objects: HashMap::new(),
            scheduler: Scheduler::new(),
            bus: EventBus::new(),
            world,
            store,
            reload_rx: None,
        }
    }

    pub fn add_zone(&mut self, zone: SpawnZone) {
        self.zones.insert(zone.name.clone(), zone);
    }

    /// Register a quest object and put it under its zone's supervision
    pub fn add_object(&mut self, object: QuestObject) {
        match self.zones.get_mut(&object.zone) {
            Some(zone) => zone.supervise(&object.id),
            None => warn!(
                "Quest object '{}' references unknown zone '{}'",
                object.id, object.zone
            ),
        }
        self.objects.insert(object.id.clone(), object);
    }

    /// Drop a quest object; any pending notification for it becomes a no-op
    pub fn remove_object(&mut self, object_id: &str) {
        if self.objects.remove(object_id).is_none() {
            debug!("remove_object: unknown quest object '{}'", object_id);
        }
    }

    pub fn accept_quest(&mut self, quest_name: &str) {
        self.manager
            .accept_quest(quest_name, self.world.as_mut(), &mut self.bus);
    }

    pub fn active_quests(&self) -> impl Iterator<Item = &MainQuest> {
        self.manager.active_quests()
    }

    pub fn manager(&self) -> &QuestManager {
        &self.manager
    }

    pub fn compass(&self) -> &Compass {
        self.manager.compass()
    }

    pub fn world(&self) -> &dyn WorldInterface {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> &mut dyn WorldInterface {
        self.world.as_mut()
    }

    pub fn subscribe(&mut self, listener: Box<dyn QuestListener>) -> SubscriberId {
        self.bus.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        self.bus.unsubscribe(id)
    }

    /// Watch the quest data directory and reload definitions when files
    /// change. Reload failures keep the previous definitions.
    pub fn enable_hot_reload(&mut self) {
        match self.registry.watch() {
            Ok(rx) => {
                info!("Quest hot-reload enabled");
                self.reload_rx = Some(rx);
            }
            Err(e) => warn!("Failed to start quest hot-reload: {}", e),
        }
    }

    fn poll_hot_reload(&mut self) {
        let Some(rx) = &self.reload_rx else {
            return;
        };
        let mut changed = false;
        while let Ok(HotReloadEvent::Changed(path)) = rx.try_recv() {
            info!("Quest hot-reload: {:?}", path);
            changed = true;
        }
        if changed {
            if let Err(e) = self.registry.load_all() {
                tracing::error!("Hot-reload failed: {}", e);
            }
        }
    }

    /// One frame step: poll hot-reload, let every sensor test its condition,
    /// then dispatch the deferred actions that came due this tick
    pub fn tick(&mut self) {
        self.poll_hot_reload();

        for object in self.objects.values_mut() {
            object.sense(self.world.as_ref(), &mut self.scheduler);
        }

        for action in self.scheduler.advance() {
            match action {
                DeferredAction::NotifyCriteria { zone, object, kind } => {
                    if !self.objects.contains_key(&object) {
                        warn!("Dropping notification for removed quest object '{}'", object);
                        continue;
                    }
                    let Some(zone_ref) = self.zones.get(&zone) else {
                        warn!("Dropping notification for unknown zone '{}'", zone);
                        continue;
                    };
                    zone_ref.notify_complete(
                        kind,
                        &object,
                        &mut self.manager,
                        self.world.as_mut(),
                        &mut self.bus,
                        &mut self.scheduler,
                    );
                }
                DeferredAction::DeactivateObject { object } => {
                    if self.manager.object_bound_to_in_progress(&object) {
                        debug!("Skipping delayed deactivation of '{}'; it is the active objective again", object);
                    } else {
                        self.world.set_active(&object, false);
                    }
                }
            }
        }
    }

    /// Save-game hook: persist quest state into the store
    pub fn save_game(&mut self) {
        self.manager.save_state(self.store.as_mut(), self.world.as_ref());
    }

    /// Load-game hook: restore quest state, discard in-flight continuations,
    /// re-derive sensor flags, and re-sync object visibility
    pub fn load_game(&mut self) {
        self.scheduler.clear();
        self.manager.load_state(self.store.as_ref(), self.world.as_mut());

        // A sensor whose criterion came back completed must not re-fire;
        // anything else may trigger again
        for object in self.objects.values_mut() {
            let status = self.manager.quest(&object.quest_name).and_then(|quest| {
                quest
                    .match_criterion(object.kind, &object.id)
                    .map(|i| quest.criteria[i].status)
            });
            object.found = matches!(status, Some(CriteriaStatus::Completed));
        }

        for zone in self.zones.values() {
            zone.sync_object_visibility(&self.manager, self.world.as_mut());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quest::definition::CriteriaType;
    use crate::quest::object::Condition;
    use crate::quest::state::QuestStatus;
    use crate::quest::test_support::{registry_with, EventRecorder, STUDY_QUEST_TOML};
    use crate::store::MemoryStore;
    use crate::world::{StageWorld, Vec3, PLAYER_TAG};

    const FIND_TICKS: usize = 40; // 2s at 50ms
    const TALK_TICKS: usize = 300; // 15s
    const ESCAPE_TICKS: usize = 60; // 3s

    fn build_engine() -> (QuestEngine, EventRecorder) {
        let registry = registry_with(&[STUDY_QUEST_TOML]);

        let mut world = StageWorld::new();
        world.place("hero", PLAYER_TAG, Vec3::new(100.0, 0.0, 0.0));
        world.place("brass_key", "prop", Vec3::new(1.0, 0.0, 0.0));
        world.place("caretaker", "npc", Vec3::new(5.0, 0.0, 0.0));
        world.place("front_gate", "area", Vec3::new(9.0, 0.0, 0.0));
        for id in ["brass_key", "caretaker", "front_gate"] {
            world.set_active(id, false);
        }

        let mut engine = QuestEngine::new(
            registry,
            Box::new(world),
            Box::new(MemoryStore::new()),
        );
        engine.add_zone(SpawnZone::new("manor_grounds"));
        engine.add_object(QuestObject::new(
            "brass_key",
            "the_locked_study",
            CriteriaType::Find,
            "manor_grounds",
            Condition::PanelOpened {
                panel: "desk_drawer".to_string(),
            },
        ));
        engine.add_object(QuestObject::new(
            "caretaker",
            "the_locked_study",
            CriteriaType::Talk,
            "manor_grounds",
            Condition::PlayerWithin {
                center: Vec3::new(5.0, 0.0, 0.0),
                radius: 2.0,
            },
        ));
        engine.add_object(QuestObject::new(
            "front_gate",
            "the_locked_study",
            CriteriaType::Escape,
            "manor_grounds",
            Condition::PlayerWithin {
                center: Vec3::new(9.0, 0.0, 0.0),
                radius: 2.0,
            },
        ));

        let recorder = EventRecorder::subscribed(&mut engine.bus);
        (engine, recorder)
    }

    /// Advance the engine, checking the single-active-objective invariant
    /// at every settle point
    fn run_ticks(engine: &mut QuestEngine, n: usize) {
        for _ in 0..n {
            engine.tick();
            for quest in engine.active_quests() {
                assert!(
                    quest.in_progress_count() <= 1,
                    "quest '{}' has more than one active criterion",
                    quest.name
                );
            }
        }
    }

    fn statuses(engine: &QuestEngine) -> Vec<CriteriaStatus> {
        engine
            .manager()
            .quest("the_locked_study")
            .unwrap()
            .criteria
            .iter()
            .map(|c| c.status)
            .collect()
    }

    #[test]
    fn test_full_quest_played_through_the_world() {
        let (mut engine, recorder) = build_engine();
        engine.accept_quest("the_locked_study");

        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted,
                CriteriaStatus::NotStarted
            ]
        );
        assert!(engine.world().is_active("brass_key"));
        assert_eq!(engine.compass().target(), Some("brass_key"));

        // The player opens the desk drawer and finds the key
        engine.world_mut().set_panel("desk_drawer", true);
        run_ticks(&mut engine, FIND_TICKS);
        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::Completed,
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted
            ]
        );
        assert_eq!(engine.compass().target(), Some("caretaker"));

        // The player walks over to the caretaker
        engine.world_mut().move_to("hero", Vec3::new(5.5, 0.0, 0.0));
        run_ticks(&mut engine, TALK_TICKS);
        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::Completed,
                CriteriaStatus::Completed,
                CriteriaStatus::InProgress
            ]
        );

        // Then slips out the front gate
        engine.world_mut().move_to("hero", Vec3::new(9.0, 0.0, 0.0));
        run_ticks(&mut engine, ESCAPE_TICKS);

        let quest = engine.manager().quest("the_locked_study").unwrap();
        assert_eq!(quest.status, QuestStatus::Completed);
        assert!(quest.all_completed());

        let events = recorder.event_types();
        assert_eq!(events.iter().filter(|e| **e == "quest_completed").count(), 1);
        assert_eq!(
            events.iter().filter(|e| **e == "next_criteria_started").count(),
            2
        );
    }

    #[test]
    fn test_inactive_sensor_does_not_fire_early() {
        let (mut engine, _recorder) = build_engine();
        engine.accept_quest("the_locked_study");

        // Hero loiters next to the caretaker while Talk is not yet active
        engine.world_mut().move_to("hero", Vec3::new(5.0, 0.0, 0.0));
        run_ticks(&mut engine, TALK_TICKS);

        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted,
                CriteriaStatus::NotStarted
            ]
        );
    }

    #[test]
    fn test_pending_notification_noops_after_object_removal() {
        let (mut engine, _recorder) = build_engine();
        engine.accept_quest("the_locked_study");

        engine.world_mut().set_panel("desk_drawer", true);
        run_ticks(&mut engine, 1); // condition sensed, notification queued
        engine.remove_object("brass_key");
        run_ticks(&mut engine, FIND_TICKS);

        // The signal was dropped, the criterion is still the active one
        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted,
                CriteriaStatus::NotStarted
            ]
        );
    }

    #[test]
    fn test_talk_object_lingers_then_disappears() {
        let (mut engine, _recorder) = build_engine();
        engine.accept_quest("the_locked_study");

        engine.world_mut().set_panel("desk_drawer", true);
        run_ticks(&mut engine, FIND_TICKS);
        engine.world_mut().move_to("hero", Vec3::new(5.5, 0.0, 0.0));
        run_ticks(&mut engine, TALK_TICKS);

        // Talk completed; the caretaker lingers for 30s before vanishing
        assert!(engine.world().is_active("caretaker"));
        run_ticks(&mut engine, 600);
        assert!(!engine.world().is_active("caretaker"));
    }

    #[test]
    fn test_save_load_round_trip_through_engine() {
        let (mut engine, _recorder) = build_engine();
        engine.accept_quest("the_locked_study");

        engine.world_mut().set_panel("desk_drawer", true);
        run_ticks(&mut engine, FIND_TICKS);
        engine.save_game();

        // Scramble live state, then restore
        engine.world_mut().set_panel("desk_drawer", false);
        engine.world_mut().set_active("caretaker", false);
        engine.load_game();

        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::Completed,
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted
            ]
        );
        assert!(engine.world().is_active("caretaker"));
        assert_eq!(engine.compass().target(), Some("caretaker"));

        // The found flag came back with the criterion: the key sensor must
        // not re-fire even though the drawer reopens
        engine.world_mut().set_panel("desk_drawer", true);
        run_ticks(&mut engine, FIND_TICKS + 1);
        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::Completed,
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted
            ]
        );
    }

    #[test]
    fn test_load_discards_inflight_continuations() {
        let (mut engine, _recorder) = build_engine();
        engine.accept_quest("the_locked_study");
        engine.save_game();

        // Key found but the notification is still in flight when the player
        // reloads an older save
        engine.world_mut().set_panel("desk_drawer", true);
        run_ticks(&mut engine, 1);
        engine.load_game();
        engine.world_mut().set_panel("desk_drawer", false);
        run_ticks(&mut engine, FIND_TICKS);

        // The stale continuation is gone; find is active again, unfired
        assert_eq!(
            statuses(&engine),
            vec![
                CriteriaStatus::InProgress,
                CriteriaStatus::NotStarted,
                CriteriaStatus::NotStarted
            ]
        );
    }
}
