//! Metric observer registry
//!
//! Bridges the paint, largest-contentful-paint and layout-shift streams into
//! performance reports. Every delivery produces fresh reports built on top of
//! a newly read timing snapshot; nothing from an earlier report is reused.
//!
//! The registry exclusively owns the running layout-shift score. It only ever
//! grows, and is read solely to embed its value in outgoing reports.

use std::cell::Cell;
use std::rc::Rc;

use tracing::debug;

use crate::platform::{ObserverHost, TimingSource};
use crate::reporter::Reporter;
use crate::timing::derive_metrics;
use crate::types::{
    PerformanceEntry, PerformanceMetrics, ReportEnvelope, StreamKind, FIRST_CONTENTFUL_PAINT,
    FIRST_PAINT,
};

/// Running cumulative layout shift
#[derive(Debug, Default)]
pub struct LayoutShiftScore {
    total: Cell<f64>,
}

impl LayoutShiftScore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> f64 {
        self.total.get()
    }

    /// Add every shift not caused by recent input. Returns the new total.
    pub fn record(&self, entries: &[PerformanceEntry]) -> f64 {
        for entry in entries {
            if let PerformanceEntry::LayoutShift {
                value,
                had_recent_input: false,
            } = entry
            {
                if value.is_finite() && *value >= 0.0 {
                    self.total.set(self.total.get() + value);
                } else {
                    debug!("Ignoring malformed layout shift value {}", value);
                }
            }
        }
        self.total.get()
    }
}

/// Value of the largest-contentful-paint candidate in a batch.
///
/// Only the last entry matters. Its render time is used when set, its load
/// time otherwise (cross-origin images report a zero render time).
pub fn largest_paint_value(entries: &[PerformanceEntry]) -> Option<f64> {
    entries.iter().rev().find_map(|entry| match entry {
        PerformanceEntry::LargestContentfulPaint {
            render_time,
            load_time,
            ..
        } => Some(if *render_time > 0.0 { *render_time } else { *load_time }),
        _ => None,
    })
}

/// Shared state behind every stream callback
struct StreamState {
    reporter: Rc<Reporter>,
    timing: Rc<dyn TimingSource>,
    layout_shift: LayoutShiftScore,
}

impl StreamState {
    fn base_metrics(&self) -> PerformanceMetrics {
        self.timing
            .navigation_timing()
            .map(|t| derive_metrics(&t))
            .unwrap_or_default()
    }

    fn send(&self, metrics: PerformanceMetrics) {
        self.reporter.report(&ReportEnvelope::Performance(metrics));
    }

    fn on_paint(&self, entries: Vec<PerformanceEntry>) {
        for entry in entries {
            let PerformanceEntry::Paint { name, start_time } = entry else {
                continue;
            };
            let mut metrics = self.base_metrics();
            match name.as_str() {
                FIRST_PAINT => metrics.fp = Some(start_time),
                FIRST_CONTENTFUL_PAINT => metrics.fcp = Some(start_time),
                _ => continue,
            }
            debug!("Paint {} at {}ms", name, start_time);
            self.send(metrics);
        }
    }

    fn on_largest_paint(&self, entries: Vec<PerformanceEntry>) {
        if let Some(lcp) = largest_paint_value(&entries) {
            debug!("Largest contentful paint at {}ms", lcp);
            self.send(PerformanceMetrics {
                lcp: Some(lcp),
                ..self.base_metrics()
            });
        }
    }

    fn on_layout_shift(&self, entries: Vec<PerformanceEntry>) {
        let cls = self.layout_shift.record(&entries);
        debug!("Layout shift score {}", cls);
        self.send(PerformanceMetrics {
            cls: Some(cls),
            ..self.base_metrics()
        });
    }
}

pub struct MetricObserverRegistry {
    state: Rc<StreamState>,
}

impl MetricObserverRegistry {
    pub fn new(reporter: Rc<Reporter>, timing: Rc<dyn TimingSource>) -> Self {
        Self {
            state: Rc::new(StreamState {
                reporter,
                timing,
                layout_shift: LayoutShiftScore::new(),
            }),
        }
    }

    pub fn layout_shift_score(&self) -> f64 {
        self.state.layout_shift.current()
    }

    /// Subscribe to all three streams on `host`.
    ///
    /// Streams the host does not support are skipped. Returns the streams
    /// that were subscribed.
    pub fn register(&self, host: &dyn ObserverHost, buffered: bool) -> Vec<StreamKind> {
        let mut active = Vec::new();
        for kind in [
            StreamKind::Paint,
            StreamKind::LargestContentfulPaint,
            StreamKind::LayoutShift,
        ] {
            let state = self.state.clone();
            let on_batch: Box<dyn FnMut(Vec<PerformanceEntry>)> = match kind {
                StreamKind::Paint => Box::new(move |entries| state.on_paint(entries)),
                StreamKind::LargestContentfulPaint => {
                    Box::new(move |entries| state.on_largest_paint(entries))
                }
                StreamKind::LayoutShift => Box::new(move |entries| state.on_layout_shift(entries)),
            };
            match host.subscribe(kind, buffered, on_batch) {
                Ok(()) => active.push(kind),
                Err(e) => debug!("Skipping {} stream: {}", kind.entry_type(), e),
            }
        }
        active
    }
}
