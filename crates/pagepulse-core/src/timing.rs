//! Navigation timing snapshot reader
//!
//! Turns a [`NavigationTiming`] snapshot into the eight required
//! [`PerformanceMetrics`] durations. Callers read the snapshot only after the
//! load sequence has finished; earlier snapshots may hold unset (zero) marks
//! and produce negative durations, which are passed through untouched.

use crate::types::{NavigationTiming, PerformanceMetrics};

/// Derive the required page-load durations from a timing snapshot
pub fn derive_metrics(timing: &NavigationTiming) -> PerformanceMetrics {
    PerformanceMetrics {
        dns: timing.domain_lookup_end - timing.domain_lookup_start,
        tcp: timing.connect_end - timing.connect_start,
        ttfb: timing.response_start - timing.request_start,
        dom_parse: timing.dom_complete - timing.dom_interactive,
        resources: timing.load_event_start - timing.dom_content_loaded_event_end,
        dom_ready: timing.dom_content_loaded_event_end - timing.navigation_start,
        interactive: timing.dom_interactive - timing.navigation_start,
        load: timing.load_event_end - timing.navigation_start,
        ..Default::default()
    }
}
