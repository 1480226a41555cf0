//! PagePulse - in-page performance and error telemetry
//!
//! Browser bindings for `pagepulse-core`. Each capability the monitor needs is
//! implemented on top of `web-sys`, and [`PagePulse`] is exported to the host
//! page:
//!
//! ```js
//! import init, { PagePulse } from "./pagepulse_wasm.js";
//!
//! await init();
//! const pulse = new PagePulse({ endpoint: "https://collector.example/r" });
//! pulse.init();
//! pulse.report({ type: "error", data: { message: "checkout failed" } });
//! ```

use std::rc::Rc;

use pagepulse_core::{Monitor, MonitorConfig, MonitorState, Platform};
use tracing::debug;
use wasm_bindgen::prelude::*;

pub mod clock;
pub mod console;
pub mod events;
pub mod observers;
pub mod timing;
pub mod transport;

pub use clock::BrowserClock;
pub use events::BrowserEvents;
pub use observers::BrowserObserverHost;
pub use timing::BrowserTiming;
pub use transport::BrowserTransport;

/// Describe a thrown JS value for an error message
pub(crate) fn js_error(context: &str, value: &JsValue) -> String {
    match value.as_string() {
        Some(s) => format!("{}: {}", context, s),
        None => format!("{}: {:?}", context, value),
    }
}

/// Capabilities backed by the current browsing context
pub fn browser_platform() -> Platform {
    Platform {
        timing: Rc::new(BrowserTiming),
        observers: Rc::new(BrowserObserverHost),
        events: Rc::new(BrowserEvents),
        transport: Rc::new(BrowserTransport),
        clock: Rc::new(BrowserClock),
    }
}

/// Accepts either an endpoint string or an options object
fn config_from_js(options: JsValue) -> Result<MonitorConfig, JsValue> {
    if let Some(endpoint) = options.as_string() {
        return Ok(MonitorConfig::new(endpoint));
    }
    serde_wasm_bindgen::from_value(options)
        .map_err(|e| JsValue::from_str(&format!("Invalid PagePulse options: {}", e)))
}

/// Page telemetry monitor exported to JavaScript
#[wasm_bindgen]
pub struct PagePulse {
    monitor: Monitor,
}

#[wasm_bindgen]
impl PagePulse {
    /// Create a monitor for `options` (endpoint URL or options object).
    /// Throws only when no endpoint is given. With `debug` set, diagnostics
    /// are written to the browser console.
    #[wasm_bindgen(constructor)]
    pub fn new(options: JsValue) -> Result<PagePulse, JsValue> {
        console_error_panic_hook::set_once();
        let config = config_from_js(options)?;
        if config.debug {
            console::install();
        }
        let monitor = Monitor::new(config, browser_platform())
            .map_err(|e| JsValue::from_str(&e.to_string()))?;
        Ok(Self { monitor })
    }

    /// Start monitoring. Safe to call more than once.
    #[wasm_bindgen]
    pub fn init(&self) -> bool {
        let before = self.monitor.state();
        let after = self.monitor.init();
        if before != after {
            debug!("Listening for page telemetry");
        }
        after == MonitorState::Monitoring
    }

    /// Send a caller-built report as-is. Returns false when the value could
    /// not be serialized or handed to a transport; never throws.
    #[wasm_bindgen]
    pub fn report(&self, report: JsValue) -> bool {
        let body = match js_sys::JSON::stringify(&report) {
            Ok(s) => match s.as_string() {
                Some(body) => body,
                // `undefined` and functions have no JSON form
                None => return false,
            },
            Err(e) => {
                debug!("Dropping manual report: {}", js_error("JSON.stringify", &e));
                return false;
            }
        };
        self.monitor.report_raw(body).is_some()
    }

    #[wasm_bindgen(js_name = isMonitoring)]
    pub fn is_monitoring(&self) -> bool {
        self.monitor.state() == MonitorState::Monitoring
    }

    /// Current cumulative layout shift score
    #[wasm_bindgen(js_name = layoutShiftScore)]
    pub fn layout_shift_score(&self) -> f64 {
        self.monitor.layout_shift_score()
    }

    /// Reports handed to a transport so far
    #[wasm_bindgen(js_name = reportsSent)]
    pub fn reports_sent(&self) -> f64 {
        self.monitor.reports_sent() as f64
    }
}
