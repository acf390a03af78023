//! Quest System Module
//!
//! Criteria-driven quest state machine with TOML-authored definitions.
//! Quests advance one criterion at a time in priority order; in-world
//! sensors report back through spawn zones, and progress survives
//! save/load.

pub mod definition;
pub mod events;
pub mod manager;
pub mod object;
pub mod registry;
pub mod save;
pub mod state;
pub mod zone;

#[cfg(test)]
pub(crate) mod test_support;

pub use definition::{CriteriaDef, CriteriaType, QuestDef};
pub use events::{EventBus, QuestEvent, QuestListener, SubscriberId};
pub use manager::QuestManager;
pub use object::{Condition, QuestObject};
pub use registry::{HotReloadEvent, QuestRegistry};
pub use state::{CriteriaStatus, MainQuest, QuestCriteria, QuestStatus};
pub use zone::SpawnZone;
