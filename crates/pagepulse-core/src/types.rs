//! Report payloads and the platform entries they are derived from
//!
//! Everything here is created when its triggering event fires, handed to the
//! [`Reporter`](crate::reporter::Reporter) once, and never mutated afterwards.
//! The serde attributes define the wire format:
//!
//! ```text
//! { "type": "performance", "data": { "dns": .., "domParse": .., "cls": .. } }
//! { "type": "error", "data": { "message": .., "lineno": .., "type": "js" } }
//! ```

use serde::{Deserialize, Serialize};

/// Paint entry name that carries First Paint
pub const FIRST_PAINT: &str = "first-paint";

/// Paint entry name that carries First Contentful Paint
pub const FIRST_CONTENTFUL_PAINT: &str = "first-contentful-paint";

/// One outgoing report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ReportEnvelope {
    Performance(PerformanceMetrics),
    Error(ErrorRecord),
}

impl From<PerformanceMetrics> for ReportEnvelope {
    fn from(metrics: PerformanceMetrics) -> Self {
        ReportEnvelope::Performance(metrics)
    }
}

impl From<ErrorRecord> for ReportEnvelope {
    fn from(record: ErrorRecord) -> Self {
        ReportEnvelope::Error(record)
    }
}

/// Page-load durations in milliseconds
///
/// The eight required fields come from a [`NavigationTiming`] snapshot. The
/// optional fields are filled by whichever observation stream produced the
/// report and are omitted from the payload when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    pub dns: f64,
    pub tcp: f64,
    pub ttfb: f64,
    pub dom_parse: f64,
    pub resources: f64,
    pub dom_ready: f64,
    pub interactive: f64,
    pub load: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fcp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lcp: Option<f64>,
    /// Never computed here; carried for reports built by the host page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fid: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cls: Option<f64>,
}

/// Source of a captured error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "js")]
    Script,
    #[serde(rename = "resource")]
    Resource,
    #[serde(rename = "promise")]
    PromiseRejection,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Script => "js",
            ErrorKind::Resource => "resource",
            ErrorKind::PromiseRejection => "promise",
        }
    }
}

/// A normalized runtime, resource or rejection error
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub filename: String,
    pub lineno: u32,
    pub colno: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    /// Capture time, epoch milliseconds
    pub timestamp: u64,
}

/// Point-in-time navigation timing marks
///
/// Values are the platform's timeline marks in milliseconds. Only differences
/// between marks are meaningful.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationTiming {
    pub navigation_start: f64,
    pub domain_lookup_start: f64,
    pub domain_lookup_end: f64,
    pub connect_start: f64,
    pub connect_end: f64,
    pub request_start: f64,
    pub response_start: f64,
    pub dom_interactive: f64,
    pub dom_content_loaded_event_end: f64,
    pub dom_complete: f64,
    pub load_event_start: f64,
    pub load_event_end: f64,
}

/// Observation stream a subscription is made against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Paint,
    LargestContentfulPaint,
    LayoutShift,
}

impl StreamKind {
    /// Entry type name the platform uses for this stream
    pub fn entry_type(&self) -> &'static str {
        match self {
            StreamKind::Paint => "paint",
            StreamKind::LargestContentfulPaint => "largest-contentful-paint",
            StreamKind::LayoutShift => "layout-shift",
        }
    }
}

/// A delivered observation entry, carrying only the fields its kind needs
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceEntry {
    Paint {
        name: String,
        start_time: f64,
    },
    LargestContentfulPaint {
        render_time: f64,
        load_time: f64,
        start_time: f64,
    },
    LayoutShift {
        value: f64,
        had_recent_input: bool,
    },
}

impl PerformanceEntry {
    pub fn kind(&self) -> StreamKind {
        match self {
            PerformanceEntry::Paint { .. } => StreamKind::Paint,
            PerformanceEntry::LargestContentfulPaint { .. } => StreamKind::LargestContentfulPaint,
            PerformanceEntry::LayoutShift { .. } => StreamKind::LayoutShift,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_performance_envelope_shape() {
        let metrics = PerformanceMetrics {
            dns: 12.0,
            dom_parse: 40.0,
            cls: Some(0.08),
            ..Default::default()
        };
        let value = serde_json::to_value(ReportEnvelope::from(metrics)).unwrap();

        assert_eq!(value["type"], "performance");
        assert_eq!(value["data"]["dns"], json!(12.0));
        assert_eq!(value["data"]["domParse"], json!(40.0));
        assert_eq!(value["data"]["cls"], json!(0.08));
        assert!(value["data"].get("fp").is_none());
        assert!(value["data"].get("lcp").is_none());
    }

    #[test]
    fn test_error_envelope_shape() {
        let record = ErrorRecord {
            message: "boom".to_string(),
            filename: "https://app.test/main.js".to_string(),
            lineno: 3,
            colno: 7,
            stack: None,
            kind: ErrorKind::PromiseRejection,
            timestamp: 1_700_000_000_000,
        };
        let value = serde_json::to_value(ReportEnvelope::from(record)).unwrap();

        assert_eq!(value["type"], "error");
        assert_eq!(value["data"]["type"], "promise");
        assert_eq!(value["data"]["lineno"], 3);
        assert_eq!(value["data"]["timestamp"], 1_700_000_000_000u64);
        assert!(value["data"].get("stack").is_none());
    }

    #[test]
    fn test_error_kind_wire_names() {
        assert_eq!(ErrorKind::Script.as_str(), "js");
        assert_eq!(ErrorKind::Resource.as_str(), "resource");
        assert_eq!(ErrorKind::PromiseRejection.as_str(), "promise");
        for kind in [ErrorKind::Script, ErrorKind::Resource, ErrorKind::PromiseRejection] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.as_str()));
        }
    }

    #[test]
    fn test_entry_kind() {
        let shift = PerformanceEntry::LayoutShift {
            value: 0.1,
            had_recent_input: false,
        };
        assert_eq!(shift.kind(), StreamKind::LayoutShift);
        assert_eq!(StreamKind::LargestContentfulPaint.entry_type(), "largest-contentful-paint");
    }
}
