//! Quest Lifecycle Events
//!
//! An explicit publish/subscribe channel consumed by the presentation layer
//! (quest log, case file, map, compass arrow). Subscribers are notified in
//! registration order and must unsubscribe on teardown.

/// Events fired by the quest manager
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuestEvent {
    /// A quest was accepted and its first criterion started
    QuestAccepted { quest_name: String },
    /// The next criterion of a quest became the active objective
    NextCriteriaStarted {
        quest_name: String,
        criteria_name: String,
    },
    /// Every criterion of a quest completed
    QuestCompleted { quest_name: String },
}

impl QuestEvent {
    /// Get the quest this event refers to
    pub fn quest_name(&self) -> &str {
        match self {
            QuestEvent::QuestAccepted { quest_name } => quest_name,
            QuestEvent::NextCriteriaStarted { quest_name, .. } => quest_name,
            QuestEvent::QuestCompleted { quest_name } => quest_name,
        }
    }

    /// Get event type as string (for logging/debugging)
    pub fn event_type(&self) -> &'static str {
        match self {
            QuestEvent::QuestAccepted { .. } => "quest_accepted",
            QuestEvent::NextCriteriaStarted { .. } => "next_criteria_started",
            QuestEvent::QuestCompleted { .. } => "quest_completed",
        }
    }
}

/// A consumer of quest lifecycle events
pub trait QuestListener {
    fn on_quest_event(&mut self, event: &QuestEvent);
}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

/// Ordered observer list for quest events
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Box<dyn QuestListener>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; listeners are notified in registration order
    pub fn subscribe(&mut self, listener: Box<dyn QuestListener>) -> SubscriberId {
        let id = SubscriberId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, listener));
        id
    }

    /// Remove a listener; returns false if the id was not registered
    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Deliver an event to every subscriber, in registration order
    pub fn publish(&mut self, event: &QuestEvent) {
        tracing::debug!("Quest event: {} ({})", event.event_type(), event.quest_name());
        for (_, listener) in &mut self.subscribers {
            listener.on_quest_event(event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
