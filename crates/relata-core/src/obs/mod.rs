//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Statement execution, lock conflicts and relation loads report here as
//! events. Structured logs go through `tracing` at the call sites.

pub(crate) mod metrics;
pub(crate) mod sink;


// re-exports
pub use metrics::{EventOps, EventReport, TableCounters};
pub use sink::{ExecKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
