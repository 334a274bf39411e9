use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

thread_local! {
    static STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0)
}

///
/// EventState
/// Ephemeral, in-memory counters for sequencer operations.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub models: BTreeMap<String, ModelCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            models: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Lifecycle entrypoints
    pub assign_calls: u64,
    pub insert_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub move_calls: u64,
    pub swap_calls: u64,

    // Sibling rows touched by bulk shifts
    pub rows_shifted_up: u64,
    pub rows_shifted_down: u64,

    // Assignment policy
    pub positions_assigned: u64,
    pub terminal_assignments: u64,
    pub locker_invocations: u64,
}

///
/// ModelCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct ModelCounters {
    pub insert_calls: u64,
    pub update_calls: u64,
    pub delete_calls: u64,
    pub move_calls: u64,
    pub swap_calls: u64,
    pub rows_shifted: u64,
    pub positions_assigned: u64,
    pub locker_invocations: u64,
}

pub(crate) fn with_state<T>(f: impl FnOnce(&EventState) -> T) -> T {
    STATE.with(|cell| f(&cell.borrow()))
}

pub(crate) fn with_state_mut<T>(f: impl FnOnce(&mut EventState) -> T) -> T {
    STATE.with(|cell| f(&mut cell.borrow_mut()))
}

/// Snapshot the current state.
#[must_use]
pub(crate) fn report() -> EventState {
    with_state(Clone::clone)
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|state| *state = EventState::default());
}
