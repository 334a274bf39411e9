//! Metrics sink boundary.
//!
//! This module is the only allowed bridge between sequencer logic and the
//! thread-local metrics state. Tests (and embedding hosts) can reroute
//! events through a scoped sink override.
use crate::{obs::metrics, scope::ShiftDirection};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug)]
pub enum ExecKind {
    Assign,
    Insert,
    Update,
    Delete,
    Move,
    Swap,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
        model_path: &'static str,
    },
    ExecFinish {
        kind: ExecKind,
        model_path: &'static str,
        rows_shifted: u64,
    },
    PositionAssigned {
        model_path: &'static str,
        terminal: bool,
    },
    LockerInvoked {
        model_path: &'static str,
    },
    ShiftApplied {
        model_path: &'static str,
        direction: ShiftDirection,
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind, model_path } => {
                metrics::with_state_mut(|m| {
                    match kind {
                        ExecKind::Assign => {
                            m.ops.assign_calls = m.ops.assign_calls.saturating_add(1);
                        }
                        ExecKind::Insert => {
                            m.ops.insert_calls = m.ops.insert_calls.saturating_add(1);
                        }
                        ExecKind::Update => {
                            m.ops.update_calls = m.ops.update_calls.saturating_add(1);
                        }
                        ExecKind::Delete => {
                            m.ops.delete_calls = m.ops.delete_calls.saturating_add(1);
                        }
                        ExecKind::Move => m.ops.move_calls = m.ops.move_calls.saturating_add(1),
                        ExecKind::Swap => m.ops.swap_calls = m.ops.swap_calls.saturating_add(1),
                    }

                    if !matches!(kind, ExecKind::Assign) {
                        let entry = m.models.entry(model_path.to_string()).or_default();
                        match kind {
                            ExecKind::Assign => {}
                            ExecKind::Insert => {
                                entry.insert_calls = entry.insert_calls.saturating_add(1);
                            }
                            ExecKind::Update => {
                                entry.update_calls = entry.update_calls.saturating_add(1);
                            }
                            ExecKind::Delete => {
                                entry.delete_calls = entry.delete_calls.saturating_add(1);
                            }
                            ExecKind::Move => {
                                entry.move_calls = entry.move_calls.saturating_add(1);
                            }
                            ExecKind::Swap => {
                                entry.swap_calls = entry.swap_calls.saturating_add(1);
                            }
                        }
                    }
                });
            }

            // Rows are accounted per ShiftApplied; the finish event exists
            // for external sinks pairing spans.
            MetricsEvent::ExecFinish { .. } => {}

            MetricsEvent::PositionAssigned {
                model_path,
                terminal,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.positions_assigned = m.ops.positions_assigned.saturating_add(1);
                    if terminal {
                        m.ops.terminal_assignments = m.ops.terminal_assignments.saturating_add(1);
                    }
                    let entry = m.models.entry(model_path.to_string()).or_default();
                    entry.positions_assigned = entry.positions_assigned.saturating_add(1);
                });
            }

            MetricsEvent::LockerInvoked { model_path } => {
                metrics::with_state_mut(|m| {
                    m.ops.locker_invocations = m.ops.locker_invocations.saturating_add(1);
                    let entry = m.models.entry(model_path.to_string()).or_default();
                    entry.locker_invocations = entry.locker_invocations.saturating_add(1);
                });
            }

            MetricsEvent::ShiftApplied {
                model_path,
                direction,
                rows,
            } => {
                metrics::with_state_mut(|m| {
                    match direction {
                        ShiftDirection::Up => {
                            m.ops.rows_shifted_up = m.ops.rows_shifted_up.saturating_add(rows);
                        }
                        ShiftDirection::Down => {
                            m.ops.rows_shifted_down = m.ops.rows_shifted_down.saturating_add(rows);
                        }
                    }
                    let entry = m.models.entry(model_path.to_string()).or_default();
                    entry.rows_shifted = entry.rows_shifted.saturating_add(rows);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    if let Some(sink) = sink {
        sink.record(event);
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state for endpoint/test plumbing.
#[must_use]
pub fn metrics_report() -> metrics::EventState {
    metrics::report()
}

/// Reset all metrics state and restart the window.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// The previous override is restored on all exits, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0.take();
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one lifecycle call.
/// Ensures finish accounting happens even on unwind.

pub(crate) struct Span {
    kind: ExecKind,
    model_path: &'static str,
    rows: u64,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, model_path: &'static str) -> Self {
        record(MetricsEvent::ExecStart { kind, model_path });

        Self {
            kind,
            model_path,
            rows: 0,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            model_path: self.model_path,
            rows_shifted: self.rows,
        });
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        panic::{AssertUnwindSafe, catch_unwind},
        sync::atomic::{AtomicUsize, Ordering},
    };

    #[derive(Default)]
    struct CountingSink {
        calls: AtomicUsize,
    }

    impl MetricsSink for CountingSink {
        fn record(&self, _: MetricsEvent) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn plain_event() -> MetricsEvent {
        MetricsEvent::LockerInvoked {
            model_path: "obs::tests::Row",
        }
    }

    #[test]
    fn with_metrics_sink_routes_and_restores_nested_overrides() {
        let outer = Rc::new(CountingSink::default());
        let inner = Rc::new(CountingSink::default());

        with_metrics_sink(outer.clone(), || {
            record(plain_event());
            assert_eq!(outer.calls.load(Ordering::SeqCst), 1);
            assert_eq!(inner.calls.load(Ordering::SeqCst), 0);

            with_metrics_sink(inner.clone(), || {
                record(plain_event());
            });

            // Inner override was restored to outer override.
            record(plain_event());
        });

        assert_eq!(outer.calls.load(Ordering::SeqCst), 2);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // Outer override was restored to previous (none).
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn with_metrics_sink_restores_override_on_panic() {
        let sink = Rc::new(CountingSink::default());

        let panicked = catch_unwind(AssertUnwindSafe(|| {
            with_metrics_sink(sink.clone(), || {
                record(plain_event());
                panic!("intentional panic for guard test");
            });
        }))
        .is_err();
        assert!(panicked);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 1);

        // Guard restored the slot after unwind.
        SINK_OVERRIDE.with(|cell| {
            assert!(cell.borrow().is_none());
        });
    }

    #[test]
    fn span_emits_start_and_finish_with_rows() {
        struct Capture(RefCell<Vec<MetricsEvent>>);

        impl MetricsSink for Capture {
            fn record(&self, event: MetricsEvent) {
                self.0.borrow_mut().push(event);
            }
        }

        let capture = Rc::new(Capture(RefCell::new(Vec::new())));
        with_metrics_sink(capture.clone(), || {
            let mut span = Span::new(ExecKind::Insert, "obs::tests::Row");
            span.set_rows(4);
        });

        let events = capture.0.borrow();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            MetricsEvent::ExecStart {
                kind: ExecKind::Insert,
                ..
            }
        ));
        assert!(matches!(
            events[1],
            MetricsEvent::ExecFinish {
                rows_shifted: 4,
                ..
            }
        ));
    }

    #[test]
    fn global_sink_accumulates_per_model_counters() {
        metrics_reset_all();

        record(MetricsEvent::ExecStart {
            kind: ExecKind::Insert,
            model_path: "obs::tests::Row",
        });
        record(MetricsEvent::ShiftApplied {
            model_path: "obs::tests::Row",
            direction: ShiftDirection::Up,
            rows: 3,
        });
        record(MetricsEvent::PositionAssigned {
            model_path: "obs::tests::Row",
            terminal: true,
        });

        let report = metrics_report();
        assert_eq!(report.ops.insert_calls, 1);
        assert_eq!(report.ops.rows_shifted_up, 3);
        assert_eq!(report.ops.terminal_assignments, 1);

        let entry = report
            .models
            .get("obs::tests::Row")
            .expect("model counters should be present");
        assert_eq!(entry.insert_calls, 1);
        assert_eq!(entry.rows_shifted, 3);
        assert_eq!(entry.positions_assigned, 1);
    }

    #[test]
    fn report_round_trips_through_json() {
        metrics_reset_all();
        record(plain_event());

        let report = metrics_report();
        let json = serde_json::to_string(&report).expect("report serializes");
        let back: metrics::EventState = serde_json::from_str(&json).expect("report deserializes");
        assert_eq!(back.ops.locker_invocations, report.ops.locker_invocations);
    }
}
