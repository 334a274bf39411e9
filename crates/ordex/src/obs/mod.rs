//! Observability boundary.
//!
//! Sequencer logic MUST NOT touch `obs::metrics` directly; all
//! instrumentation flows through `MetricsEvent` and `MetricsSink` in
//! [`sink`].

pub mod metrics;
pub mod sink;
