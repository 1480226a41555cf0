//! Monitor facade
//!
//! Owns the lifecycle. The first [`Monitor::init`] wires error capture and the
//! observer registry and arranges one whole-page timing report for when the
//! load sequence completes; later calls change nothing. There is no stop:
//! once monitoring, listeners and subscriptions live as long as the page.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, info};

use crate::capture::ErrorCapture;
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::observer::MetricObserverRegistry;
use crate::platform::{Platform, TimingSource};
use crate::reporter::{Channel, Reporter};
use crate::timing::derive_metrics;
use crate::types::ReportEnvelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Uninitialized,
    Monitoring,
}

pub struct Monitor {
    config: MonitorConfig,
    platform: Platform,
    reporter: Rc<Reporter>,
    observers: MetricObserverRegistry,
    state: Cell<MonitorState>,
}

impl Monitor {
    /// Build a monitor; fails only on an invalid configuration
    pub fn new(config: MonitorConfig, platform: Platform) -> Result<Self> {
        config.validate()?;
        let reporter = Rc::new(Reporter::new(
            config.endpoint.trim(),
            platform.transport.clone(),
        ));
        let observers = MetricObserverRegistry::new(reporter.clone(), platform.timing.clone());
        Ok(Self {
            config,
            platform,
            reporter,
            observers,
            state: Cell::new(MonitorState::Uninitialized),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn state(&self) -> MonitorState {
        self.state.get()
    }

    /// Start monitoring. Idempotent; returns the state after the call.
    pub fn init(&self) -> MonitorState {
        if self.state.get() == MonitorState::Monitoring {
            debug!("Monitor already running");
            return MonitorState::Monitoring;
        }
        self.state.set(MonitorState::Monitoring);

        if self.config.capture_errors {
            let capture = ErrorCapture::new(
                self.reporter.clone(),
                self.platform.events.clone(),
                self.platform.clock.clone(),
            );
            capture.install();
        }

        if self.config.observe_metrics {
            let active = self
                .observers
                .register(self.platform.observers.as_ref(), self.config.buffered_entries);
            debug!("Observing {} metric streams", active.len());
            self.schedule_load_report();
        }

        info!("Monitoring started, reporting to {}", self.reporter.endpoint());
        MonitorState::Monitoring
    }

    /// Submit a caller-built report
    pub fn report(&self, envelope: &ReportEnvelope) -> Option<Channel> {
        self.reporter.report(envelope)
    }

    /// Submit an already-serialized payload as-is
    pub fn report_raw(&self, body: String) -> Option<Channel> {
        self.reporter.send_raw(body)
    }

    /// Current cumulative layout shift
    pub fn layout_shift_score(&self) -> f64 {
        self.observers.layout_shift_score()
    }

    /// Reports handed to the transport so far
    pub fn reports_sent(&self) -> u64 {
        self.reporter.sent()
    }

    fn schedule_load_report(&self) {
        let reporter = self.reporter.clone();
        let timing: Rc<dyn TimingSource> = self.platform.timing.clone();
        let scheduled = self.platform.events.on_load_complete(Box::new(move || {
            match timing.navigation_timing() {
                Some(snapshot) => {
                    reporter.report(&ReportEnvelope::Performance(derive_metrics(&snapshot)));
                }
                None => debug!("Navigation timing unavailable, skipping load report"),
            }
        }));
        if let Err(e) = scheduled {
            debug!("Skipping load report: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MonitorError;
    use crate::testing::{TestPlatform, TEST_ENDPOINT};
    use crate::types::{NavigationTiming, StreamKind};

    fn timing() -> NavigationTiming {
        NavigationTiming {
            navigation_start: 0.0,
            load_event_end: 1200.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let t = TestPlatform::new(None);
        let err = Monitor::new(MonitorConfig::new(""), t.platform()).err().unwrap();
        assert!(matches!(err, MonitorError::InvalidConfig(_)));
    }

    #[test]
    fn test_relative_endpoint_reports_as_given() {
        for endpoint in ["collect", "api/report", "./r"] {
            let t = TestPlatform::new(None);
            let monitor = Monitor::new(MonitorConfig::new(endpoint), t.platform()).unwrap();
            monitor.init();
            t.events.fire_rejection(&crate::platform::RejectionEvent::default());

            match &t.transport.sent()[0] {
                crate::testing::Sent::Beacon { url, .. } => assert_eq!(url, endpoint),
                other => panic!("expected beacon, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_init_is_idempotent() {
        let t = TestPlatform::new(Some(timing()));
        let monitor = Monitor::new(MonitorConfig::new(TEST_ENDPOINT), t.platform()).unwrap();
        assert_eq!(monitor.state(), MonitorState::Uninitialized);

        assert_eq!(monitor.init(), MonitorState::Monitoring);
        assert_eq!(monitor.init(), MonitorState::Monitoring);

        assert_eq!(t.events.error_listener_count(), 2);
        assert_eq!(t.events.rejection_listener_count(), 1);
        assert_eq!(t.events.pending_load_handlers(), 1);
        assert_eq!(t.observers.subscriptions().len(), 3);
    }

    #[test]
    fn test_nothing_installed_before_init() {
        let t = TestPlatform::new(Some(timing()));
        let _monitor = Monitor::new(MonitorConfig::new(TEST_ENDPOINT), t.platform()).unwrap();

        assert_eq!(t.events.error_listener_count(), 0);
        assert!(t.observers.subscriptions().is_empty());
        assert!(t.transport.sent().is_empty());
    }

    #[test]
    fn test_load_report_sent_once_on_completion() {
        let t = TestPlatform::new(Some(timing()));
        let monitor = Monitor::new(MonitorConfig::new(TEST_ENDPOINT), t.platform()).unwrap();
        monitor.init();
        assert!(t.transport.sent().is_empty());

        t.events.fire_load_complete();
        t.events.fire_load_complete();

        let envelopes = t.transport.envelopes();
        assert_eq!(envelopes.len(), 1);
        match &envelopes[0] {
            ReportEnvelope::Performance(m) => {
                assert_eq!(m.load, 1200.0);
                assert!(m.lcp.is_none() && m.cls.is_none());
            }
            other => panic!("expected performance report, got {:?}", other),
        }
    }

    #[test]
    fn test_load_report_skipped_without_timing() {
        let t = TestPlatform::new(None);
        let monitor = Monitor::new(MonitorConfig::new(TEST_ENDPOINT), t.platform()).unwrap();
        monitor.init();
        t.events.fire_load_complete();
        assert!(t.transport.sent().is_empty());
    }

    #[test]
    fn test_feature_toggles() {
        let t = TestPlatform::new(Some(timing()));
        let config = MonitorConfig {
            capture_errors: false,
            buffered_entries: false,
            ..MonitorConfig::new(TEST_ENDPOINT)
        };
        let monitor = Monitor::new(config, t.platform()).unwrap();
        monitor.init();

        assert_eq!(t.events.error_listener_count(), 0);
        assert_eq!(t.events.rejection_listener_count(), 0);
        assert!(t.observers.subscriptions().iter().all(|(_, buffered)| !buffered));

        let t = TestPlatform::new(Some(timing()));
        let config = MonitorConfig {
            observe_metrics: false,
            ..MonitorConfig::new(TEST_ENDPOINT)
        };
        Monitor::new(config, t.platform()).unwrap().init();
        assert!(t.observers.subscriptions().is_empty());
        assert_eq!(t.events.pending_load_handlers(), 0);
        assert_eq!(t.events.error_listener_count(), 2);
    }

    #[test]
    fn test_layout_shift_score_exposed() {
        let t = TestPlatform::new(None);
        let monitor = Monitor::new(MonitorConfig::new(TEST_ENDPOINT), t.platform()).unwrap();
        monitor.init();
        t.observers.deliver(
            StreamKind::LayoutShift,
            vec![crate::types::PerformanceEntry::LayoutShift {
                value: 0.125,
                had_recent_input: false,
            }],
        );
        assert_eq!(monitor.layout_shift_score(), 0.125);
        assert_eq!(monitor.reports_sent(), 1);
    }
}
