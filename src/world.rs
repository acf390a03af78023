//! World Interface
//!
//! The quest core treats the game world as an external collaborator reached
//! through a narrow trait: activate/deactivate a presence, query transforms,
//! test proximity against tagged entities, read UI panel flags. `StageWorld`
//! is the in-memory implementation used by tests and headless simulation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Tag carried by the player entity, matched by proximity queries
pub const PLAYER_TAG: &str = "player";

/// World-space position or euler rotation (degrees)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Services the quest core needs from the surrounding game
pub trait WorldInterface {
    /// Enable/disable a world presence (visibility + interactivity)
    fn set_active(&mut self, object_id: &str, active: bool);

    fn is_active(&self, object_id: &str) -> bool;

    /// Ids of active entities with `tag` within `radius` of `center`
    fn find_within_radius(&self, center: Vec3, radius: f32, tag: &str) -> Vec<String>;

    /// Move an object to a new world-space position
    fn move_to(&mut self, object_id: &str, position: Vec3);

    /// Open or close a UI panel
    fn set_panel(&mut self, panel_id: &str, open: bool);

    fn position_of(&self, object_id: &str) -> Option<Vec3>;

    /// Euler rotation in degrees
    fn rotation_of(&self, object_id: &str) -> Option<Vec3>;

    /// Whether a UI panel (note inspection etc.) is currently open
    fn is_panel_open(&self, panel_id: &str) -> bool;
}

/// A single object on the stage
#[derive(Debug, Clone)]
pub struct StageObject {
    pub position: Vec3,
    /// Euler rotation in degrees
    pub rotation: Vec3,
    pub tag: String,
    pub active: bool,
}

/// In-memory world: enough of a stage for the quest core to play against
#[derive(Default)]
pub struct StageWorld {
    objects: HashMap<String, StageObject>,
    panels: HashMap<String, bool>,
}

impl StageWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object to the stage (active, identity rotation)
    pub fn place(&mut self, object_id: &str, tag: &str, position: Vec3) {
        self.objects.insert(
            object_id.to_string(),
            StageObject {
                position,
                rotation: Vec3::ZERO,
                tag: tag.to_string(),
                active: true,
            },
        );
    }

    pub fn rotate_to(&mut self, object_id: &str, rotation: Vec3) {
        if let Some(obj) = self.objects.get_mut(object_id) {
            obj.rotation = rotation;
        }
    }

    pub fn remove(&mut self, object_id: &str) {
        self.objects.remove(object_id);
    }
}

impl WorldInterface for StageWorld {
    fn set_active(&mut self, object_id: &str, active: bool) {
        match self.objects.get_mut(object_id) {
            Some(obj) => obj.active = active,
            None => debug!("set_active on unknown object '{}'", object_id),
        }
    }

    fn is_active(&self, object_id: &str) -> bool {
        self.objects.get(object_id).map_or(false, |o| o.active)
    }

    fn find_within_radius(&self, center: Vec3, radius: f32, tag: &str) -> Vec<String> {
        self.objects
            .iter()
            .filter(|(_, o)| o.active && o.tag == tag && o.position.distance(&center) <= radius)
            .map(|(id, _)| id.clone())
            .collect()
    }

    fn move_to(&mut self, object_id: &str, position: Vec3) {
        if let Some(obj) = self.objects.get_mut(object_id) {
            obj.position = position;
        }
    }

    fn set_panel(&mut self, panel_id: &str, open: bool) {
        self.panels.insert(panel_id.to_string(), open);
    }

    fn position_of(&self, object_id: &str) -> Option<Vec3> {
        self.objects.get(object_id).map(|o| o.position)
    }

    fn rotation_of(&self, object_id: &str) -> Option<Vec3> {
        self.objects.get(object_id).map(|o| o.rotation)
    }

    fn is_panel_open(&self, panel_id: &str) -> bool {
        self.panels.get(panel_id).copied().unwrap_or(false)
    }
}

/// The player-facing direction pointer, redirected on every quest advance
#[derive(Debug, Default)]
pub struct Compass {
    target: Option<String>,
}

impl Compass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target(&mut self, object_id: &str) {
        debug!("Compass target -> {}", object_id);
        self.target = Some(object_id.to_string());
    }

    pub fn clear(&mut self) {
        self.target = None;
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}
