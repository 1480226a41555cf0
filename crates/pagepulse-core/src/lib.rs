//! Page performance and error telemetry
//!
//! This crate holds the observation-and-reporting pipeline of an in-page
//! telemetry collector, written against injected platform capabilities so it
//! runs unchanged in the browser (see the `pagepulse-wasm` app) and under test.
//!
//! # Pipeline
//!
//! - [`timing`]: derives the eight page-load durations from a navigation
//!   timing snapshot
//! - [`observer`]: turns paint, largest-contentful-paint and layout-shift
//!   deliveries into reports, keeping the running layout-shift score
//! - [`capture`]: normalizes script, resource and rejection errors
//! - [`reporter`]: serializes and sends every report, fire-and-forget
//! - [`monitor`]: idempotent start-up and the final load-complete report
//!
//! # Example
//!
//! ```ignore
//! use pagepulse_core::testing::TestPlatform;
//! use pagepulse_core::{Monitor, MonitorConfig, MonitorState};
//!
//! # fn example() -> Result<(), pagepulse_core::MonitorError> {
//! let host = TestPlatform::new(None);
//! let monitor = Monitor::new(MonitorConfig::new("https://collector.test/r"), host.platform())?;
//! assert_eq!(monitor.init(), MonitorState::Monitoring);
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod config;
pub mod error;
pub mod monitor;
pub mod observer;
pub mod platform;
pub mod reporter;
pub mod timing;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use capture::ErrorCapture;
pub use config::MonitorConfig;
pub use error::MonitorError;
pub use monitor::{Monitor, MonitorState};
pub use observer::{LayoutShiftScore, MetricObserverRegistry};
pub use platform::{
    Clock, ElementTag, ErrorEvent, EventSource, EventTarget, HttpRequest, ObserverHost, Platform,
    RejectionEvent, SystemClock, TimingSource, Transport,
};
pub use reporter::{Channel, Reporter, JSON_CONTENT_TYPE};
pub use timing::derive_metrics;
pub use types::{
    ErrorKind, ErrorRecord, NavigationTiming, PerformanceEntry, PerformanceMetrics,
    ReportEnvelope, StreamKind,
};
