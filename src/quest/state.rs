//! Quest Runtime State
//!
//! Statuses and the in-memory quest/criteria state machine. Definitions stay
//! immutable in the registry; a `MainQuest` is instantiated from one when the
//! quest is accepted and is the only place status lives.

use serde::{Deserialize, Serialize};

use super::definition::{CriteriaType, QuestDef};

/// Status of a single criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriteriaStatus {
    /// Not yet reached in the quest's ordering
    NotStarted,
    /// The currently active objective
    InProgress,
    /// Satisfied; never regresses
    Completed,
}

impl CriteriaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CriteriaStatus::NotStarted => "not_started",
            CriteriaStatus::InProgress => "in_progress",
            CriteriaStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(CriteriaStatus::NotStarted),
            "in_progress" => Some(CriteriaStatus::InProgress),
            "completed" => Some(CriteriaStatus::Completed),
            _ => None,
        }
    }
}

/// Overall status of a quest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    /// Authored but not accepted
    NotStarted,
    /// Accepted; persists until every criterion is completed
    InProgress,
    /// Every criterion completed
    Completed,
}

impl QuestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestStatus::NotStarted => "not_started",
            QuestStatus::InProgress => "in_progress",
            QuestStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "not_started" => Some(QuestStatus::NotStarted),
            "in_progress" => Some(QuestStatus::InProgress),
            "completed" => Some(QuestStatus::Completed),
            _ => None,
        }
    }
}

/// A single trackable objective within a quest
#[derive(Debug, Clone)]
pub struct QuestCriteria {
    pub name: String,
    pub kind: CriteriaType,
    pub status: CriteriaStatus,
    /// Lower priority starts earlier; ties keep authoring order
    pub priority: i32,
    /// Associated world object (may be absent)
    pub object: Option<String>,
    /// Free-text context shown in the quest log
    pub hint: String,
    /// Conversation identifier (talk criteria)
    pub conversation: Option<String>,
}

impl QuestCriteria {
    /// Back to NotStarted (quest reset / load reconciliation only)
    pub fn reset(&mut self) {
        self.status = CriteriaStatus::NotStarted;
    }
}

/// An accepted quest: ordered criteria plus overall status
#[derive(Debug, Clone)]
pub struct MainQuest {
    /// Unique quest key
    pub name: String,
    pub description: String,
    pub criteria: Vec<QuestCriteria>,
    pub status: QuestStatus,
}

impl MainQuest {
    /// Instantiate runtime state from an authored definition
    pub fn from_def(def: &QuestDef) -> Self {
        let criteria = def
            .criteria
            .iter()
            .map(|c| QuestCriteria {
                name: c.name.clone(),
                kind: c.kind,
                status: CriteriaStatus::NotStarted,
                priority: c.priority,
                object: c.object.clone(),
                hint: c.hint.clone(),
                conversation: c.conversation.clone(),
            })
            .collect();

        Self {
            name: def.name.clone(),
            description: def.description.clone(),
            criteria,
            status: QuestStatus::NotStarted,
        }
    }

    /// Stable ascending sort by priority; ties keep authoring order.
    /// Called whenever status transitions are evaluated so "first
    /// not-completed" stays well-defined.
    pub fn sort_by_priority(&mut self) {
        self.criteria.sort_by_key(|c| c.priority);
    }

    /// Index of the lowest-priority criterion that is not yet completed
    pub fn first_incomplete(&self) -> Option<usize> {
        self.criteria
            .iter()
            .position(|c| c.status != CriteriaStatus::Completed)
    }

    /// Index of the first in-progress criterion in priority order
    pub fn first_in_progress(&self) -> Option<usize> {
        self.criteria
            .iter()
            .position(|c| c.status == CriteriaStatus::InProgress)
    }

    pub fn all_completed(&self) -> bool {
        self.criteria
            .iter()
            .all(|c| c.status == CriteriaStatus::Completed)
    }

    /// Index of the criterion matching a (type, world object) pair
    pub fn match_criterion(&self, kind: CriteriaType, object_id: &str) -> Option<usize> {
        self.criteria
            .iter()
            .position(|c| c.kind == kind && c.object.as_deref() == Some(object_id))
    }

    /// Get a criterion by name
    pub fn get_criterion(&self, name: &str) -> Option<&QuestCriteria> {
        self.criteria.iter().find(|c| c.name == name)
    }

    /// Count of in-progress criteria (invariant: never more than one)
    pub fn in_progress_count(&self) -> usize {
        self.criteria
            .iter()
            .filter(|c| c.status == CriteriaStatus::InProgress)
            .count()
    }

    /// Quest and all criteria back to NotStarted
    pub fn reset(&mut self) {
        self.status = QuestStatus::NotStarted;
        for c in &mut self.criteria {
            c.reset();
        }
    }
}
