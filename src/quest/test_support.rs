//! Shared fixtures for quest tests.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tempfile::TempDir;

use super::events::{EventBus, QuestEvent, QuestListener};
use super::registry::QuestRegistry;

/// Install the log subscriber for the test binary; `RUST_LOG` filters
/// output. Safe to call from every test, only the first call wins.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Scenario quest: find the key, ask the caretaker, slip out the gate.
pub const STUDY_QUEST_TOML: &str = r#"
[quest]
name = "the_locked_study"
description = "Get into the study and slip out before dawn."

[[quest.criteria]]
name = "find_brass_key"
type = "find"
priority = 0
object = "brass_key"
hint = "Search the desk drawers"

[[quest.criteria]]
name = "ask_the_caretaker"
type = "talk"
priority = 1
object = "caretaker"
conversation = "caretaker_intro"

[[quest.criteria]]
name = "slip_out_the_gate"
type = "escape"
priority = 2
object = "front_gate"
"#;

/// Build a registry preloaded with the given quest TOML sources.
pub fn registry_with(quest_tomls: &[&str]) -> Arc<QuestRegistry> {
    init_test_logging();
    let temp_dir = TempDir::new().unwrap();
    let quest_dir = temp_dir.path().join("quests");
    std::fs::create_dir_all(&quest_dir).unwrap();
    for (i, src) in quest_tomls.iter().enumerate() {
        std::fs::write(quest_dir.join(format!("quest_{}.toml", i)), src).unwrap();
    }

    let registry = QuestRegistry::new(temp_dir.path());
    registry.load_all().unwrap();
    assert_eq!(registry.count(), quest_tomls.len());
    Arc::new(registry)
}

struct RecordingListener {
    events: Rc<RefCell<Vec<QuestEvent>>>,
}

impl QuestListener for RecordingListener {
    fn on_quest_event(&mut self, event: &QuestEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

/// Captures every published quest event for assertions.
pub struct EventRecorder {
    events: Rc<RefCell<Vec<QuestEvent>>>,
}

impl EventRecorder {
    pub fn subscribed(bus: &mut EventBus) -> Self {
        let events = Rc::new(RefCell::new(Vec::new()));
        bus.subscribe(Box::new(RecordingListener {
            events: events.clone(),
        }));
        Self { events }
    }

    pub fn events(&self) -> Vec<QuestEvent> {
        self.events.borrow().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.borrow().iter().map(|e| e.event_type()).collect()
    }
}
