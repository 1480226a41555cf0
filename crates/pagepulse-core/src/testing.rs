//! Deterministic platform doubles
//!
//! Each double records what the monitor asked of it and lets a test drive
//! deliveries and events by hand, in order.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::{MonitorError, Result};
use crate::platform::{
    BatchCallback, Clock, ErrorEvent, ErrorHandler, EventSource, HttpRequest, ObserverHost,
    Platform, RejectionEvent, RejectionHandler, TimingSource, Transport,
};
use crate::types::{NavigationTiming, PerformanceEntry, ReportEnvelope, StreamKind};

pub const TEST_PAGE_URL: &str = "https://app.test/index.html";
pub const TEST_ENDPOINT: &str = "https://collector.test/report";
pub const TEST_NOW_MS: u64 = 1_700_000_000_000;

#[derive(Default)]
pub struct FakeTimingSource {
    timing: Cell<Option<NavigationTiming>>,
}

impl FakeTimingSource {
    pub fn new(timing: Option<NavigationTiming>) -> Self {
        Self {
            timing: Cell::new(timing),
        }
    }

    pub fn set(&self, timing: Option<NavigationTiming>) {
        self.timing.set(timing);
    }
}

impl TimingSource for FakeTimingSource {
    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.timing.get()
    }
}

#[derive(Default)]
pub struct FakeObserverHost {
    callbacks: RefCell<HashMap<StreamKind, Vec<BatchCallback>>>,
    subscriptions: RefCell<Vec<(StreamKind, bool)>>,
    unsupported: RefCell<HashSet<StreamKind>>,
}

impl FakeObserverHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make future subscriptions to `kind` fail as unsupported
    pub fn mark_unsupported(&self, kind: StreamKind) {
        self.unsupported.borrow_mut().insert(kind);
    }

    /// Deliver one batch to every subscriber of `kind`
    pub fn deliver(&self, kind: StreamKind, entries: Vec<PerformanceEntry>) {
        // Callbacks are taken out so a subscriber may re-enter the host
        let mut callbacks = self.callbacks.borrow_mut().remove(&kind).unwrap_or_default();
        for callback in callbacks.iter_mut() {
            callback(entries.clone());
        }
        let mut map = self.callbacks.borrow_mut();
        let slot = map.entry(kind).or_default();
        callbacks.append(slot);
        *slot = callbacks;
    }

    /// Every successful subscription with its `buffered` flag, in call order
    pub fn subscriptions(&self) -> Vec<(StreamKind, bool)> {
        self.subscriptions.borrow().clone()
    }

    pub fn subscriber_count(&self, kind: StreamKind) -> usize {
        self.callbacks.borrow().get(&kind).map_or(0, Vec::len)
    }
}

impl ObserverHost for FakeObserverHost {
    fn subscribe(&self, kind: StreamKind, buffered: bool, on_batch: BatchCallback) -> Result<()> {
        if self.unsupported.borrow().contains(&kind) {
            return Err(MonitorError::Unsupported(kind.entry_type().to_string()));
        }
        self.subscriptions.borrow_mut().push((kind, buffered));
        self.callbacks
            .borrow_mut()
            .entry(kind)
            .or_default()
            .push(on_batch);
        Ok(())
    }
}

pub struct FakeEventSource {
    page_url: String,
    error_handlers: RefCell<Vec<(bool, ErrorHandler)>>,
    rejection_handlers: RefCell<Vec<RejectionHandler>>,
    load_handlers: RefCell<Vec<Box<dyn FnOnce()>>>,
    rejections_supported: Cell<bool>,
}

impl FakeEventSource {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            error_handlers: RefCell::new(Vec::new()),
            rejection_handlers: RefCell::new(Vec::new()),
            load_handlers: RefCell::new(Vec::new()),
            rejections_supported: Cell::new(true),
        }
    }

    /// Make the rejection listener unavailable
    pub fn without_rejections(self) -> Self {
        self.rejections_supported.set(false);
        self
    }

    /// Dispatch an `error` event to every listener
    pub fn fire_error(&self, event: &ErrorEvent) {
        for (_, handler) in self.error_handlers.borrow_mut().iter_mut() {
            handler(event);
        }
    }

    pub fn fire_rejection(&self, event: &RejectionEvent) {
        for handler in self.rejection_handlers.borrow_mut().iter_mut() {
            handler(event);
        }
    }

    /// Run and drop every pending load-complete handler
    pub fn fire_load_complete(&self) {
        let handlers: Vec<_> = self.load_handlers.borrow_mut().drain(..).collect();
        for handler in handlers {
            handler();
        }
    }

    pub fn error_listener_count(&self) -> usize {
        self.error_handlers.borrow().len()
    }

    /// `capture` flag of each installed error listener
    pub fn error_listener_phases(&self) -> Vec<bool> {
        self.error_handlers.borrow().iter().map(|(c, _)| *c).collect()
    }

    pub fn rejection_listener_count(&self) -> usize {
        self.rejection_handlers.borrow().len()
    }

    pub fn pending_load_handlers(&self) -> usize {
        self.load_handlers.borrow().len()
    }
}

impl Default for FakeEventSource {
    fn default() -> Self {
        Self::new(TEST_PAGE_URL)
    }
}

impl EventSource for FakeEventSource {
    fn on_error(&self, capture: bool, handler: ErrorHandler) -> Result<()> {
        self.error_handlers.borrow_mut().push((capture, handler));
        Ok(())
    }

    fn on_unhandled_rejection(&self, handler: RejectionHandler) -> Result<()> {
        if !self.rejections_supported.get() {
            return Err(MonitorError::Unsupported("unhandledrejection".to_string()));
        }
        self.rejection_handlers.borrow_mut().push(handler);
        Ok(())
    }

    fn on_load_complete(&self, handler: Box<dyn FnOnce()>) -> Result<()> {
        self.load_handlers.borrow_mut().push(handler);
        Ok(())
    }

    fn page_url(&self) -> String {
        self.page_url.clone()
    }
}

/// One transmission seen by [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Beacon { url: String, body: String },
    Post(HttpRequest),
}

impl Sent {
    pub fn body(&self) -> &str {
        match self {
            Sent::Beacon { body, .. } => body,
            Sent::Post(request) => &request.body,
        }
    }
}

pub struct RecordingTransport {
    beacon: Cell<bool>,
    failing: Cell<bool>,
    sent: RefCell<Vec<Sent>>,
}

impl RecordingTransport {
    /// Transport with the beacon channel available
    pub fn new() -> Self {
        Self {
            beacon: Cell::new(true),
            failing: Cell::new(false),
            sent: RefCell::new(Vec::new()),
        }
    }

    /// Transport that only has the explicit request channel
    pub fn without_beacon() -> Self {
        let transport = Self::new();
        transport.beacon.set(false);
        transport
    }

    /// Make every send fail after it is recorded
    pub fn set_failing(&self, failing: bool) {
        self.failing.set(failing);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.borrow().clone()
    }

    /// Decode every recorded body as a report, skipping non-report payloads
    pub fn envelopes(&self) -> Vec<ReportEnvelope> {
        self.sent
            .borrow()
            .iter()
            .filter_map(|s| serde_json::from_str(s.body()).ok())
            .collect()
    }

    fn record(&self, sent: Sent) -> Result<()> {
        self.sent.borrow_mut().push(sent);
        if self.failing.get() {
            return Err(MonitorError::Transport("network unreachable".to_string()));
        }
        Ok(())
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for RecordingTransport {
    fn supports_beacon(&self) -> bool {
        self.beacon.get()
    }

    fn send_beacon(&self, url: &str, body: &str) -> Result<()> {
        self.record(Sent::Beacon {
            url: url.to_string(),
            body: body.to_string(),
        })
    }

    fn post(&self, request: &HttpRequest) -> Result<()> {
        self.record(Sent::Post(request.clone()))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub u64);

impl Clock for FixedClock {
    fn now_ms(&self) -> u64 {
        self.0
    }
}

/// The full set of doubles, kept alongside the [`Platform`] built from them
pub struct TestPlatform {
    pub timing: Rc<FakeTimingSource>,
    pub observers: Rc<FakeObserverHost>,
    pub events: Rc<FakeEventSource>,
    pub transport: Rc<RecordingTransport>,
    pub clock: Rc<FixedClock>,
}

impl TestPlatform {
    pub fn new(timing: Option<NavigationTiming>) -> Self {
        Self::with_transport(timing, RecordingTransport::new())
    }

    pub fn with_transport(timing: Option<NavigationTiming>, transport: RecordingTransport) -> Self {
        Self {
            timing: Rc::new(FakeTimingSource::new(timing)),
            observers: Rc::new(FakeObserverHost::new()),
            events: Rc::new(FakeEventSource::default()),
            transport: Rc::new(transport),
            clock: Rc::new(FixedClock(TEST_NOW_MS)),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            timing: self.timing.clone(),
            observers: self.observers.clone(),
            events: self.events.clone(),
            transport: self.transport.clone(),
            clock: self.clock.clone(),
        }
    }
}
