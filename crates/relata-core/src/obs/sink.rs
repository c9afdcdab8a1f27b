//! Metrics sink boundary.
//!
//! Engine code MUST NOT touch `obs::metrics` directly.
//! All instrumentation flows through `MetricsEvent` and `MetricsSink`.

use crate::obs::metrics;
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    /// Row-returning statement.
    Query,
    /// Write statement returning an affected-row count.
    Execute,
    /// Single-value statement.
    Scalar,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    ExecStart {
        kind: ExecKind,
    },
    ExecFinish {
        kind: ExecKind,
        rows: u64,
    },
    ExecFailed {
        kind: ExecKind,
    },
    ValidationFailure {
        table: &'static str,
    },
    LockConflict {
        table: &'static str,
    },
    RelationLoad {
        table: &'static str,
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
/// Default sink writing into thread-local metrics state.
/// Used whenever no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::ExecStart { kind } => {
                metrics::with_state_mut(|m| match kind {
                    ExecKind::Query => m.ops.query_calls = m.ops.query_calls.saturating_add(1),
                    ExecKind::Execute => {
                        m.ops.execute_calls = m.ops.execute_calls.saturating_add(1);
                    }
                    ExecKind::Scalar => {
                        m.ops.scalar_calls = m.ops.scalar_calls.saturating_add(1);
                    }
                });
            }

            MetricsEvent::ExecFinish { kind, rows } => {
                metrics::with_state_mut(|m| match kind {
                    ExecKind::Query => m.ops.rows_read = m.ops.rows_read.saturating_add(rows),
                    ExecKind::Execute => {
                        m.ops.rows_written = m.ops.rows_written.saturating_add(rows);
                    }
                    ExecKind::Scalar => {}
                });
            }

            MetricsEvent::ExecFailed { .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.storage_errors = m.ops.storage_errors.saturating_add(1);
                });
            }

            MetricsEvent::ValidationFailure { table } => {
                metrics::with_state_mut(|m| {
                    m.ops.validation_failures = m.ops.validation_failures.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.validation_failures = entry.validation_failures.saturating_add(1);
                });
            }

            MetricsEvent::LockConflict { table } => {
                metrics::with_state_mut(|m| {
                    m.ops.lock_conflicts = m.ops.lock_conflicts.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.lock_conflicts = entry.lock_conflicts.saturating_add(1);
                });
            }

            MetricsEvent::RelationLoad { table, rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.relation_loads = m.ops.relation_loads.saturating_add(1);
                    let entry = m.tables.entry(table.to_string()).or_default();
                    entry.relation_loads = entry.relation_loads.saturating_add(1);
                    entry.relation_rows = entry.relation_rows.saturating_add(rows);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
///
/// The previous sink is restored on every exit, including unwind.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard emitting start/finish events for one statement.
/// A span dropped without `finish` reports a failure.

pub(crate) struct Span {
    kind: ExecKind,
    finished: bool,
}

impl Span {
    #[must_use]
    pub(crate) fn new(kind: ExecKind) -> Self {
        record(MetricsEvent::ExecStart { kind });

        Self {
            kind,
            finished: false,
        }
    }

    pub(crate) fn finish(mut self, rows: u64) {
        record(MetricsEvent::ExecFinish {
            kind: self.kind,
            rows,
        });
        self.finished = true;
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.finished {
            record(MetricsEvent::ExecFailed { kind: self.kind });
        }
    }
}
