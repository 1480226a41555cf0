//! Error capture
//!
//! Installs three independent listeners and turns each qualifying event into
//! an [`ErrorRecord`] that goes straight to the reporter:
//!
//! - script errors, on the page `error` channel in capture phase
//! - resource load failures, on the same channel, filtered by target element
//! - unhandled promise rejections
//!
//! Both `error` listeners see every event on that channel, so a load failure
//! on a `<link>`, `<script>` or `<img>` produces one `js` record and one
//! `resource` record.

use std::rc::Rc;

use tracing::debug;

use crate::platform::{Clock, ElementTag, ErrorEvent, EventSource, EventTarget, RejectionEvent};
use crate::reporter::Reporter;
use crate::types::{ErrorKind, ErrorRecord, ReportEnvelope};

/// Message used when a script error carries none
pub const DEFAULT_SCRIPT_MESSAGE: &str = "Script error";

/// Message used when a rejection reason has no message
pub const DEFAULT_REJECTION_MESSAGE: &str = "Unhandled promise rejection";

impl ErrorRecord {
    /// Record for a script error. Unknown location falls back to the page URL
    /// at line and column 0.
    pub fn script(event: &ErrorEvent, page_url: &str, timestamp: u64) -> Self {
        Self {
            message: event
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_SCRIPT_MESSAGE.to_string()),
            filename: event
                .filename
                .clone()
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| page_url.to_string()),
            lineno: event.lineno.unwrap_or(0),
            colno: event.colno.unwrap_or(0),
            stack: event.stack.clone(),
            kind: ErrorKind::Script,
            timestamp,
        }
    }

    /// Record for a failed resource load, or `None` when the event target is
    /// not a stylesheet link, script or image element.
    pub fn resource(event: &ErrorEvent, timestamp: u64) -> Option<Self> {
        let EventTarget::Element { tag, url } = &event.target else {
            return None;
        };
        if matches!(tag, ElementTag::Other(_)) {
            return None;
        }
        let url = url.clone().unwrap_or_default();
        Some(Self {
            message: format!("Resource load error: {}", url),
            filename: url,
            lineno: 0,
            colno: 0,
            stack: None,
            kind: ErrorKind::Resource,
            timestamp,
        })
    }

    /// Record for an unhandled promise rejection
    pub fn rejection(event: &RejectionEvent, page_url: &str, timestamp: u64) -> Self {
        Self {
            message: event
                .message
                .clone()
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_REJECTION_MESSAGE.to_string()),
            filename: page_url.to_string(),
            lineno: 0,
            colno: 0,
            stack: event.stack.clone(),
            kind: ErrorKind::PromiseRejection,
            timestamp,
        }
    }
}

pub struct ErrorCapture {
    reporter: Rc<Reporter>,
    events: Rc<dyn EventSource>,
    clock: Rc<dyn Clock>,
}

impl ErrorCapture {
    pub fn new(reporter: Rc<Reporter>, events: Rc<dyn EventSource>, clock: Rc<dyn Clock>) -> Self {
        Self {
            reporter,
            events,
            clock,
        }
    }

    /// Install all three listeners. A listener the host cannot provide is
    /// skipped; returns how many were installed.
    pub fn install(&self) -> usize {
        let mut installed = 0;

        let (reporter, events, clock) = self.handles();
        let script = self.events.on_error(
            true,
            Box::new(move |event: &ErrorEvent| {
                let record = ErrorRecord::script(event, &events.page_url(), clock.now_ms());
                debug!("Captured script error: {}", record.message);
                reporter.report(&ReportEnvelope::Error(record));
            }),
        );
        installed += self.tally("script error", script);

        let (reporter, _, clock) = self.handles();
        let resource = self.events.on_error(
            true,
            Box::new(move |event: &ErrorEvent| {
                if let Some(record) = ErrorRecord::resource(event, clock.now_ms()) {
                    debug!("Captured resource error: {}", record.filename);
                    reporter.report(&ReportEnvelope::Error(record));
                }
            }),
        );
        installed += self.tally("resource error", resource);

        let (reporter, events, clock) = self.handles();
        let rejection = self
            .events
            .on_unhandled_rejection(Box::new(move |event: &RejectionEvent| {
                let record = ErrorRecord::rejection(event, &events.page_url(), clock.now_ms());
                debug!("Captured unhandled rejection: {}", record.message);
                reporter.report(&ReportEnvelope::Error(record));
            }));
        installed += self.tally("unhandled rejection", rejection);

        installed
    }

    fn handles(&self) -> (Rc<Reporter>, Rc<dyn EventSource>, Rc<dyn Clock>) {
        (self.reporter.clone(), self.events.clone(), self.clock.clone())
    }

    fn tally(&self, listener: &str, result: crate::error::Result<()>) -> usize {
        match result {
            Ok(()) => 1,
            Err(e) => {
                debug!("Skipping {} listener: {}", listener, e);
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FakeEventSource, FixedClock, RecordingTransport, TEST_ENDPOINT, TEST_NOW_MS, TEST_PAGE_URL,
    };
    use pretty_assertions::assert_eq;

    fn script_event() -> ErrorEvent {
        ErrorEvent {
            message: Some("Uncaught TypeError: a is undefined".to_string()),
            filename: Some("https://app.test/bundle.js".to_string()),
            lineno: Some(12),
            colno: Some(34),
            stack: Some("TypeError: a is undefined\n    at main".to_string()),
            target: EventTarget::Page,
        }
    }

    fn installed() -> (Rc<FakeEventSource>, Rc<RecordingTransport>) {
        let events = Rc::new(FakeEventSource::default());
        let transport = Rc::new(RecordingTransport::new());
        let reporter = Rc::new(Reporter::new(TEST_ENDPOINT, transport.clone()));
        let capture = ErrorCapture::new(reporter, events.clone(), Rc::new(FixedClock(TEST_NOW_MS)));
        assert_eq!(capture.install(), 3);
        (events, transport)
    }

    fn records(transport: &RecordingTransport) -> Vec<ErrorRecord> {
        transport
            .envelopes()
            .into_iter()
            .filter_map(|e| match e {
                ReportEnvelope::Error(r) => Some(r),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_script_record_fields() {
        let record = ErrorRecord::script(&script_event(), TEST_PAGE_URL, 7);
        assert_eq!(
            record,
            ErrorRecord {
                message: "Uncaught TypeError: a is undefined".to_string(),
                filename: "https://app.test/bundle.js".to_string(),
                lineno: 12,
                colno: 34,
                stack: Some("TypeError: a is undefined\n    at main".to_string()),
                kind: ErrorKind::Script,
                timestamp: 7,
            }
        );
    }

    #[test]
    fn test_script_record_fallbacks() {
        let event = ErrorEvent {
            message: None,
            filename: None,
            lineno: None,
            colno: None,
            stack: None,
            target: EventTarget::Page,
        };
        let record = ErrorRecord::script(&event, TEST_PAGE_URL, 7);
        assert_eq!(record.message, DEFAULT_SCRIPT_MESSAGE);
        assert_eq!(record.filename, TEST_PAGE_URL);
        assert_eq!((record.lineno, record.colno), (0, 0));
        assert_eq!(record.stack, None);
    }

    #[test]
    fn test_resource_record_for_qualifying_elements() {
        for (tag, url) in [
            (ElementTag::Link, "https://cdn.test/site.css"),
            (ElementTag::Script, "https://cdn.test/lib.js"),
            (ElementTag::Img, "https://cdn.test/logo.png"),
        ] {
            let record = ErrorRecord::resource(&ErrorEvent::resource_failure(tag, url), 1).unwrap();
            assert_eq!(record.message, format!("Resource load error: {}", url));
            assert_eq!(record.filename, url);
            assert_eq!(record.kind, ErrorKind::Resource);
        }
    }

    #[test]
    fn test_resource_record_ignores_other_targets() {
        let video = ErrorEvent::resource_failure(ElementTag::from_tag_name("video"), "a.mp4");
        assert!(ErrorRecord::resource(&video, 1).is_none());
        assert!(ErrorRecord::resource(&script_event(), 1).is_none());
    }

    #[test]
    fn test_rejection_record() {
        let with_reason = RejectionEvent {
            message: Some("fetch failed".to_string()),
            stack: Some("Error: fetch failed".to_string()),
        };
        let record = ErrorRecord::rejection(&with_reason, TEST_PAGE_URL, 9);
        assert_eq!(record.message, "fetch failed");
        assert_eq!(record.filename, TEST_PAGE_URL);
        assert_eq!(record.kind, ErrorKind::PromiseRejection);
        assert_eq!(record.stack.as_deref(), Some("Error: fetch failed"));

        let bare = ErrorRecord::rejection(&RejectionEvent::default(), TEST_PAGE_URL, 9);
        assert_eq!(bare.message, DEFAULT_REJECTION_MESSAGE);
        assert_eq!(bare.stack, None);
    }

    #[test]
    fn test_listeners_use_capture_phase() {
        let (events, _) = installed();
        assert_eq!(events.error_listener_phases(), vec![true, true]);
        assert_eq!(events.rejection_listener_count(), 1);
    }

    #[test]
    fn test_script_error_reported_once() {
        let (events, transport) = installed();
        events.fire_error(&script_event());

        let records = records(&transport);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::Script);
        assert_eq!(records[0].timestamp, TEST_NOW_MS);
    }

    #[test]
    fn test_resource_failure_reported_twice() {
        let (events, transport) = installed();
        events.fire_error(&ErrorEvent::resource_failure(
            ElementTag::Script,
            "https://cdn.test/lib.js",
        ));

        let kinds: Vec<_> = records(&transport).iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::Script, ErrorKind::Resource]);
    }

    #[test]
    fn test_rejection_reported_once() {
        let (events, transport) = installed();
        events.fire_rejection(&RejectionEvent::default());

        let records = records(&transport);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].kind, ErrorKind::PromiseRejection);
    }

    #[test]
    fn test_missing_rejection_listener_skipped() {
        let events = Rc::new(FakeEventSource::default().without_rejections());
        let reporter = Rc::new(Reporter::new(TEST_ENDPOINT, Rc::new(RecordingTransport::new())));
        let capture = ErrorCapture::new(reporter, events.clone(), Rc::new(FixedClock(0)));

        assert_eq!(capture.install(), 2);
        assert_eq!(events.error_listener_count(), 2);
    }
}
