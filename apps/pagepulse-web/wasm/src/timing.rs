//! Navigation timing from `performance.timing`

use pagepulse_core::{NavigationTiming, TimingSource};

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTiming;

impl TimingSource for BrowserTiming {
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        let performance = web_sys::window()?.performance()?;
        let t = performance.timing();
        Some(NavigationTiming {
            navigation_start: t.navigation_start(),
            domain_lookup_start: t.domain_lookup_start(),
            domain_lookup_end: t.domain_lookup_end(),
            connect_start: t.connect_start(),
            connect_end: t.connect_end(),
            request_start: t.request_start(),
            response_start: t.response_start(),
            dom_interactive: t.dom_interactive(),
            dom_content_loaded_event_end: t.dom_content_loaded_event_end(),
            dom_complete: t.dom_complete(),
            load_event_start: t.load_event_start(),
            load_event_end: t.load_event_end(),
        })
    }
}
