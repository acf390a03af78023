//! Cooperative Tick Scheduler
//!
//! A delay queue polled once per engine tick. Deferred actions carry ids
//! rather than references, so an action whose target has since been removed
//! dispatches as a logged no-op instead of erroring.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use crate::quest::definition::CriteriaType;

/// Fixed engine tick length
pub const TICK: Duration = Duration::from_millis(50);

/// Work scheduled for a later tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeferredAction {
    /// A quest object's condition was satisfied; notify its spawn zone
    NotifyCriteria {
        zone: String,
        object: String,
        kind: CriteriaType,
    },
    /// Remove a completed criterion's object from the world
    DeactivateObject { object: String },
}

#[derive(Debug)]
struct Pending {
    due: u64,
    seq: u64,
    action: DeferredAction,
}

// Ordering ignores the action: earliest due tick first, FIFO within a tick.
impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for Pending {}

impl PartialOrd for Pending {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Pending {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.due.cmp(&other.due).then(self.seq.cmp(&other.seq))
    }
}

/// Delay queue driven by [`Scheduler::advance`], one call per frame tick
#[derive(Default)]
pub struct Scheduler {
    now: u64,
    seq: u64,
    queue: BinaryHeap<Reverse<Pending>>,
}

/// Whole ticks covering `delay`, rounding up; at least one
pub fn ticks_in(delay: Duration) -> u64 {
    let tick_ms = TICK.as_millis();
    let delay_ms = delay.as_millis();
    (delay_ms.div_ceil(tick_ms).max(1)) as u64
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an action to run after `delay`
    pub fn schedule_in(&mut self, delay: Duration, action: DeferredAction) {
        let due = self.now + ticks_in(delay);
        let seq = self.seq;
        self.seq += 1;
        self.queue.push(Reverse(Pending { due, seq, action }));
    }

    /// Step one tick and drain every action that came due
    pub fn advance(&mut self) -> Vec<DeferredAction> {
        self.now += 1;
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|Reverse(head)| head.due <= self.now)
        {
            if let Some(Reverse(pending)) = self.queue.pop() {
                due.push(pending.action);
            }
        }
        due
    }

    /// Drop every pending action (load discards in-flight continuations)
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn now_ticks(&self) -> u64 {
        self.now
    }

    pub fn pending_count(&self) -> usize {
        self.queue.len()
    }
}
