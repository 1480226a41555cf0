//! Capability interfaces the monitor is written against
//!
//! The browser (or a test double) provides one implementation per trait.
//! Handles are `Rc`, so nothing built from a [`Platform`] can leave the thread
//! that runs the host event loop.

use std::rc::Rc;

use crate::error::Result;
use crate::types::{NavigationTiming, PerformanceEntry, StreamKind};

/// Callback receiving one delivered batch of observation entries
pub type BatchCallback = Box<dyn FnMut(Vec<PerformanceEntry>)>;

/// Callback receiving an `error` event
pub type ErrorHandler = Box<dyn FnMut(&ErrorEvent)>;

/// Callback receiving an unhandled promise rejection
pub type RejectionHandler = Box<dyn FnMut(&RejectionEvent)>;

/// Source of the navigation timing snapshot
pub trait TimingSource {
    /// Current snapshot, or `None` when the platform has no navigation timing
    fn navigation_timing(&self) -> Option<NavigationTiming>;
}

/// Subscription point for platform-buffered observation streams
pub trait ObserverHost {
    /// Register `on_batch` for every future delivery on `kind`.
    ///
    /// With `buffered` set, entries recorded before the call are replayed in
    /// the first delivery. Returns [`MonitorError::Unsupported`] when the
    /// stream does not exist on this platform.
    ///
    /// [`MonitorError::Unsupported`]: crate::error::MonitorError::Unsupported
    fn subscribe(&self, kind: StreamKind, buffered: bool, on_batch: BatchCallback) -> Result<()>;
}

/// Page-level event listeners
pub trait EventSource {
    /// Listen for `error` events on the page. `capture` selects capture phase.
    fn on_error(&self, capture: bool, handler: ErrorHandler) -> Result<()>;

    /// Listen for unhandled promise rejections
    fn on_unhandled_rejection(&self, handler: RejectionHandler) -> Result<()>;

    /// Run `handler` once the load event has fully completed.
    ///
    /// Implementations defer past the load handlers so `loadEventEnd` is set,
    /// and fire promptly when the page finished loading before the call.
    fn on_load_complete(&self, handler: Box<dyn FnOnce()>) -> Result<()>;

    /// URL of the current page
    fn page_url(&self) -> String;
}

/// An explicit HTTP request used when no beacon channel exists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub content_type: &'static str,
    pub body: String,
}

/// Outgoing channels for serialized reports
pub trait Transport {
    /// Whether the non-blocking, navigation-surviving channel exists
    fn supports_beacon(&self) -> bool;

    /// Queue `body` for delivery to `url` without waiting on the result
    fn send_beacon(&self, url: &str, body: &str) -> Result<()>;

    /// Issue `request` as a POST without waiting on the response
    fn post(&self, request: &HttpRequest) -> Result<()>;
}

/// Wall clock used to stamp captured errors
pub trait Clock {
    /// Milliseconds since the Unix epoch
    fn now_ms(&self) -> u64;
}

/// [`Clock`] backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Element kinds whose load failures count as resource errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementTag {
    /// `<link>`, resource URL from `href`
    Link,
    /// `<script>`, resource URL from `src`
    Script,
    /// `<img>`, resource URL from `src`
    Img,
    Other(String),
}

impl ElementTag {
    /// Map a DOM tag name (any case) to a tag
    pub fn from_tag_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "link" => ElementTag::Link,
            "script" => ElementTag::Script,
            "img" => ElementTag::Img,
            other => ElementTag::Other(other.to_string()),
        }
    }
}

/// Target an `error` event was dispatched at
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventTarget {
    /// The page itself (uncaught script errors)
    Page,
    /// A DOM element, with its `src`/`href` resource URL when it has one
    Element { tag: ElementTag, url: Option<String> },
}

/// Fields of an `error` event; anything the platform left unset is `None`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEvent {
    pub message: Option<String>,
    pub filename: Option<String>,
    pub lineno: Option<u32>,
    pub colno: Option<u32>,
    /// Stack of the attached error object, if it exposes one
    pub stack: Option<String>,
    pub target: EventTarget,
}

impl ErrorEvent {
    /// A load failure dispatched at an element, as the platform reports it
    pub fn resource_failure(tag: ElementTag, url: impl Into<String>) -> Self {
        Self {
            message: None,
            filename: None,
            lineno: None,
            colno: None,
            stack: None,
            target: EventTarget::Element {
                tag,
                url: Some(url.into()),
            },
        }
    }
}

/// Reason attached to an unhandled rejection
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RejectionEvent {
    /// `reason.message`, when the reason is an error-like object
    pub message: Option<String>,
    /// `reason.stack`, when present
    pub stack: Option<String>,
}

/// All capabilities the monitor needs from its host
#[derive(Clone)]
pub struct Platform {
    pub timing: Rc<dyn TimingSource>,
    pub observers: Rc<dyn ObserverHost>,
    pub events: Rc<dyn EventSource>,
    pub transport: Rc<dyn Transport>,
    pub clock: Rc<dyn Clock>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_from_name() {
        assert_eq!(ElementTag::from_tag_name("IMG"), ElementTag::Img);
        assert_eq!(ElementTag::from_tag_name("script"), ElementTag::Script);
        assert_eq!(ElementTag::from_tag_name("Link"), ElementTag::Link);
        assert_eq!(
            ElementTag::from_tag_name("VIDEO"),
            ElementTag::Other("video".to_string())
        );
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now_ms() > 1_577_836_800_000);
    }
}
