//! Beacon and fetch transmission

use js_sys::Reflect;
use pagepulse_core::{HttpRequest, MonitorError, Transport};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode};

use crate::js_error;

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTransport;

impl Transport for BrowserTransport {
    fn supports_beacon(&self) -> bool {
        web_sys::window()
            .map(|w| Reflect::has(&w.navigator(), &"sendBeacon".into()).unwrap_or(false))
            .unwrap_or(false)
    }

    fn send_beacon(&self, url: &str, body: &str) -> Result<(), MonitorError> {
        let window =
            web_sys::window().ok_or_else(|| MonitorError::Unsupported("window".to_string()))?;
        let queued = window
            .navigator()
            .send_beacon_with_opt_str(url, Some(body))
            .map_err(|e| MonitorError::Transport(js_error("sendBeacon", &e)))?;
        if !queued {
            return Err(MonitorError::Transport(
                "sendBeacon refused the payload".to_string(),
            ));
        }
        Ok(())
    }

    fn post(&self, request: &HttpRequest) -> Result<(), MonitorError> {
        let window =
            web_sys::window().ok_or_else(|| MonitorError::Unsupported("window".to_string()))?;

        let opts = RequestInit::new();
        opts.set_method("POST");
        opts.set_mode(RequestMode::Cors);
        opts.set_body(&request.body.as_str().into());

        let js_request = Request::new_with_str_and_init(&request.url, &opts)
            .map_err(|e| MonitorError::Transport(js_error("Request", &e)))?;
        js_request
            .headers()
            .set("Content-Type", request.content_type)
            .map_err(|e| MonitorError::Transport(js_error("Content-Type", &e)))?;

        let pending = JsFuture::from(window.fetch_with_request(&js_request));
        // Awaited only to absorb a rejection, which would otherwise surface
        // as an unhandled rejection and be reported again
        wasm_bindgen_futures::spawn_local(async move {
            let _ = pending.await;
        });
        Ok(())
    }
}
