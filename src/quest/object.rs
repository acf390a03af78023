//! Quest Objects (sensing layer)
//!
//! A quest object is the in-world sensor bound to one criterion. It polls a
//! raw world condition once per tick and, on first satisfaction, schedules a
//! single delayed notification to its spawn zone. The `found` flag is
//! monotonic within a session; only a save/load restore rewrites it.

use tracing::debug;

use super::definition::CriteriaType;
use crate::scheduler::{DeferredAction, Scheduler};
use crate::world::{Vec3, WorldInterface, PLAYER_TAG};

/// Smallest absolute difference between two angles, in degrees
fn angle_delta(a: f32, b: f32) -> f32 {
    let diff = (a - b).rem_euclid(360.0);
    diff.min(360.0 - diff)
}

/// A raw world condition a quest object watches
#[derive(Debug, Clone)]
pub enum Condition {
    /// The player entered a sphere (explore/escape/talk proximity)
    PlayerWithin { center: Vec3, radius: f32 },
    /// A tracked transform moved away from its origin (deliver, carried props)
    ObjectMoved {
        object: String,
        origin: Vec3,
        threshold: f32,
    },
    /// A UI panel opened (note inspection)
    PanelOpened { panel: String },
    /// A transform rotated away from its rest orientation (dials, valves)
    ObjectRotated {
        object: String,
        rest: Vec3,
        threshold_degrees: f32,
    },
}

impl Condition {
    pub fn satisfied(&self, world: &dyn WorldInterface) -> bool {
        match self {
            Condition::PlayerWithin { center, radius } => {
                !world.find_within_radius(*center, *radius, PLAYER_TAG).is_empty()
            }
            Condition::ObjectMoved {
                object,
                origin,
                threshold,
            } => match world.position_of(object) {
                Some(position) => position.distance(origin) > *threshold,
                None => false,
            },
            Condition::PanelOpened { panel } => world.is_panel_open(panel),
            Condition::ObjectRotated {
                object,
                rest,
                threshold_degrees,
            } => match world.rotation_of(object) {
                Some(rotation) => {
                    angle_delta(rotation.x, rest.x) > *threshold_degrees
                        || angle_delta(rotation.y, rest.y) > *threshold_degrees
                        || angle_delta(rotation.z, rest.z) > *threshold_degrees
                }
                None => false,
            },
        }
    }
}

/// In-world sensor bound to one criterion
pub struct QuestObject {
    /// World object id this sensor marks (the criterion's associated object)
    pub id: String,
    pub quest_name: String,
    pub kind: CriteriaType,
    /// Owning spawn zone
    pub zone: String,
    pub condition: Condition,
    /// Monotonic within a session; rewritten only by load restore
    pub found: bool,
}

impl QuestObject {
    pub fn new(
        id: &str,
        quest_name: &str,
        kind: CriteriaType,
        zone: &str,
        condition: Condition,
    ) -> Self {
        Self {
            id: id.to_string(),
            quest_name: quest_name.to_string(),
            kind,
            zone: zone.to_string(),
            condition,
            found: false,
        }
    }

    /// Poll the condition. Inactive objects do not sense; an already-found
    /// object never re-fires. On first satisfaction, queue the zone
    /// notification after the type's diegetic delay.
    pub fn sense(&mut self, world: &dyn WorldInterface, scheduler: &mut Scheduler) {
        if self.found || !world.is_active(&self.id) {
            return;
        }
        if !self.condition.satisfied(world) {
            return;
        }

        self.found = true;
        debug!(
            "Quest object '{}' satisfied its {} condition",
            self.id,
            self.kind.as_str()
        );
        scheduler.schedule_in(
            self.kind.notify_delay(),
            DeferredAction::NotifyCriteria {
                zone: self.zone.clone(),
                object: self.id.clone(),
                kind: self.kind,
            },
        );
    }
}
