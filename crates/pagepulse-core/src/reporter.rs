//! Report transmission
//!
//! The single fan-in point for every report. Sends are fire-and-forget: the
//! beacon channel is used when the platform has one, otherwise an explicit
//! JSON POST is issued. Nothing is awaited, retried or queued, and failures
//! are logged and dropped.

use std::cell::Cell;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::platform::{HttpRequest, Transport};
use crate::types::ReportEnvelope;

/// Content type of the explicit request channel
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Which channel carried a report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Beacon,
    Request,
}

pub struct Reporter {
    endpoint: String,
    transport: Rc<dyn Transport>,
    sent: Cell<u64>,
}

impl Reporter {
    pub fn new(endpoint: impl Into<String>, transport: Rc<dyn Transport>) -> Self {
        Self {
            endpoint: endpoint.into(),
            transport,
            sent: Cell::new(0),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Number of reports handed to a transport channel so far
    pub fn sent(&self) -> u64 {
        self.sent.get()
    }

    /// Serialize `envelope` and transmit it.
    ///
    /// Returns the channel used, or `None` when the report could not be
    /// serialized or handed off. Callers are free to ignore the result.
    pub fn report(&self, envelope: &ReportEnvelope) -> Option<Channel> {
        let body = match serde_json::to_string(envelope) {
            Ok(body) => body,
            Err(e) => {
                warn!("Dropping report, serialization failed: {}", e);
                return None;
            }
        };
        self.send_raw(body)
    }

    /// Transmit an already-serialized payload without inspecting it
    pub fn send_raw(&self, body: String) -> Option<Channel> {
        let (channel, result) = if self.transport.supports_beacon() {
            (
                Channel::Beacon,
                self.transport.send_beacon(&self.endpoint, &body),
            )
        } else {
            let request = HttpRequest {
                url: self.endpoint.clone(),
                content_type: JSON_CONTENT_TYPE,
                body,
            };
            (Channel::Request, self.transport.post(&request))
        };

        self.sent.set(self.sent.get() + 1);
        match result {
            Ok(()) => {
                debug!("Report sent via {:?}", channel);
                Some(channel)
            }
            Err(e) => {
                debug!("Report lost via {:?}: {}", channel, e);
                None
            }
        }
    }
}
