//! Quest Engine
//!
//! Tick-driven quest criteria state machine for escape-room style games.
//! The embedding game constructs a [`QuestEngine`], registers spawn zones
//! and quest objects, accepts quests, and calls [`QuestEngine::tick`] once
//! per 50ms frame step. Quest definitions are authored in TOML and can be
//! hot-reloaded; progress persists through a pluggable save store.

pub mod engine;
pub mod quest;
pub mod scheduler;
pub mod store;
pub mod world;

pub use engine::QuestEngine;
pub use quest::{
    Condition, CriteriaStatus, CriteriaType, EventBus, MainQuest, QuestEvent, QuestListener,
    QuestManager, QuestObject, QuestRegistry, QuestStatus, SpawnZone,
};
pub use scheduler::{DeferredAction, Scheduler, TICK};
pub use store::{FileStore, MemoryStore, SaveStore};
pub use world::{Compass, StageWorld, Vec3, WorldInterface};
