//! Quest Definition Structures
//!
//! These structures are deserialized from TOML quest files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A quest definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuestFile {
    pub quest: RawQuest,
}

/// Raw quest data as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawQuest {
    pub name: String,
    pub description: String,
    /// Quest criteria, in authoring order
    #[serde(default)]
    pub criteria: Vec<RawCriteria>,
}

/// Raw criterion as it appears in TOML
#[derive(Debug, Clone, Deserialize)]
pub struct RawCriteria {
    pub name: String,
    #[serde(rename = "type")]
    pub criteria_type: String,
    /// Ordering key; defaults to the authoring index when omitted
    pub priority: Option<i32>,
    /// World object this criterion is bound to
    pub object: Option<String>,
    /// Free-text context shown in the quest log
    #[serde(default)]
    pub hint: String,
    /// Conversation identifier (talk criteria)
    pub conversation: Option<String>,
}

// ============================================================================
// Resolved Quest Structures (after parsing)
// ============================================================================

/// Criterion types supported by the quest system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaType {
    /// Find an item or note
    Find,
    /// Reach an area
    Explore,
    /// Leave an area
    Escape,
    /// Talk to a character
    Talk,
    /// Solve a lock or mechanism
    UnlockSolve,
    /// Bring an object somewhere
    Deliver,
}

impl CriteriaType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "find" => Some(CriteriaType::Find),
            "explore" => Some(CriteriaType::Explore),
            "escape" => Some(CriteriaType::Escape),
            "talk" => Some(CriteriaType::Talk),
            "unlock_solve" | "unlock" | "solve" => Some(CriteriaType::UnlockSolve),
            "deliver" => Some(CriteriaType::Deliver),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CriteriaType::Find => "find",
            CriteriaType::Explore => "explore",
            CriteriaType::Escape => "escape",
            CriteriaType::Talk => "talk",
            CriteriaType::UnlockSolve => "unlock_solve",
            CriteriaType::Deliver => "deliver",
        }
    }

    /// Diegetic delay between a sensor's condition being satisfied and the
    /// spawn-zone notification (travel/reaction time)
    pub fn notify_delay(&self) -> Duration {
        match self {
            CriteriaType::Talk => Duration::from_secs(15),
            CriteriaType::Explore | CriteriaType::Escape => Duration::from_secs(3),
            CriteriaType::Find | CriteriaType::UnlockSolve | CriteriaType::Deliver => {
                Duration::from_secs(2)
            }
        }
    }

    /// In-world lingering before a completed criterion's object disappears
    pub fn deactivate_delay(&self) -> Duration {
        match self {
            CriteriaType::Talk => Duration::from_secs(30),
            CriteriaType::Explore | CriteriaType::Escape => Duration::from_secs(3),
            _ => Duration::ZERO,
        }
    }
}

/// A resolved quest criterion definition
#[derive(Debug, Clone)]
pub struct CriteriaDef {
    pub name: String,
    pub kind: CriteriaType,
    /// Lower priority starts earlier
    pub priority: i32,
    /// World object this criterion is bound to (may be absent)
    pub object: Option<String>,
    /// Free-text context shown in the quest log
    pub hint: String,
    /// Conversation identifier (talk criteria)
    pub conversation: Option<String>,
}

impl CriteriaDef {
    pub fn from_raw(raw: &RawCriteria, authoring_index: usize) -> Option<Self> {
        let kind = CriteriaType::from_str(&raw.criteria_type)?;
        Some(Self {
            name: raw.name.clone(),
            kind,
            priority: raw.priority.unwrap_or(authoring_index as i32),
            object: raw.object.clone(),
            hint: raw.hint.clone(),
            conversation: raw.conversation.clone(),
        })
    }
}

/// A fully resolved quest definition
#[derive(Debug, Clone)]
pub struct QuestDef {
    /// Unique quest key
    pub name: String,
    pub description: String,
    /// Criteria in authoring order
    pub criteria: Vec<CriteriaDef>,
}

impl QuestDef {
    /// Create a QuestDef from raw TOML data
    pub fn from_raw(raw: &RawQuest) -> Result<Self, String> {
        let criteria: Vec<CriteriaDef> = raw
            .criteria
            .iter()
            .enumerate()
            .map(|(i, c)| {
                CriteriaDef::from_raw(c, i).ok_or_else(|| {
                    format!(
                        "Invalid criteria type '{}' for criterion '{}' at index {}",
                        c.criteria_type, c.name, i
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        if criteria.is_empty() {
            return Err(format!("Quest '{}' has no criteria", raw.name));
        }

        for (i, c) in criteria.iter().enumerate() {
            if criteria[..i].iter().any(|other| other.name == c.name) {
                return Err(format!(
                    "Quest '{}' has duplicate criterion name '{}'",
                    raw.name, c.name
                ));
            }
            if criteria[..i].iter().any(|other| other.priority == c.priority) {
                tracing::warn!(
                    "Quest '{}': criterion '{}' shares priority {} with an earlier criterion",
                    raw.name,
                    c.name,
                    c.priority
                );
            }
        }

        Ok(Self {
            name: raw.name.clone(),
            description: raw.description.clone(),
            criteria,
        })
    }

    /// Get a criterion definition by name
    pub fn get_criterion(&self, name: &str) -> Option<&CriteriaDef> {
        self.criteria.iter().find(|c| c.name == name)
    }
}
