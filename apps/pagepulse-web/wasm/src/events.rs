//! Window event listeners for errors, rejections and page load

use js_sys::Reflect;
use pagepulse_core::platform::{ErrorHandler, RejectionHandler};
use tracing::debug;
use pagepulse_core::{
    ElementTag, ErrorEvent, EventSource, EventTarget, MonitorError, RejectionEvent,
};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{Element, Window};

use crate::js_error;

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserEvents;

fn window() -> Result<Window, MonitorError> {
    web_sys::window().ok_or_else(|| MonitorError::Unsupported("window".to_string()))
}

/// Own string property of a JS value, if it is a non-empty string
fn string_prop(target: &JsValue, key: &str) -> Option<String> {
    if target.is_undefined() || target.is_null() {
        return None;
    }
    Reflect::get(target, &key.into())
        .ok()
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty())
}

fn non_empty(s: String) -> Option<String> {
    (!s.is_empty()).then_some(s)
}

/// Property holding an element's resource URL
fn url_property(tag: &ElementTag) -> &'static str {
    match tag {
        ElementTag::Link => "href",
        _ => "src",
    }
}

fn read_target(event: &web_sys::Event) -> EventTarget {
    let Some(element) = event.target().and_then(|t| t.dyn_into::<Element>().ok()) else {
        return EventTarget::Page;
    };
    let tag = ElementTag::from_tag_name(&element.tag_name());
    let url = string_prop(&element, url_property(&tag));
    EventTarget::Element { tag, url }
}

fn read_error_event(event: &web_sys::Event) -> ErrorEvent {
    let target = read_target(event);
    match event.dyn_ref::<web_sys::ErrorEvent>() {
        Some(e) => ErrorEvent {
            message: non_empty(e.message()),
            filename: non_empty(e.filename()),
            lineno: Some(e.lineno()),
            colno: Some(e.colno()),
            stack: string_prop(&e.error(), "stack"),
            target,
        },
        // Resource failures arrive as plain events
        None => ErrorEvent {
            message: None,
            filename: None,
            lineno: None,
            colno: None,
            stack: None,
            target,
        },
    }
}

fn read_rejection(event: &web_sys::Event) -> RejectionEvent {
    let reason = event
        .dyn_ref::<web_sys::PromiseRejectionEvent>()
        .map(|e| e.reason())
        .unwrap_or(JsValue::UNDEFINED);
    RejectionEvent {
        message: string_prop(&reason, "message"),
        stack: string_prop(&reason, "stack"),
    }
}

/// Run `handler` on the next task, after the current load handlers finish
fn defer(window: &Window, handler: Box<dyn FnOnce()>) -> Result<(), MonitorError> {
    let callback = Closure::once_into_js(move || handler());
    window
        .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), 0)
        .map(|_| ())
        .map_err(|e| MonitorError::Unsupported(js_error("setTimeout", &e)))
}

impl EventSource for BrowserEvents {
    fn on_error(&self, capture: bool, mut handler: ErrorHandler) -> Result<(), MonitorError> {
        let window = window()?;
        let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
            handler(&read_error_event(&event));
        }) as Box<dyn FnMut(_)>);
        window
            .add_event_listener_with_callback_and_bool(
                "error",
                closure.as_ref().unchecked_ref(),
                capture,
            )
            .map_err(|e| MonitorError::Unsupported(js_error("error listener", &e)))?;
        closure.forget();
        Ok(())
    }

    fn on_unhandled_rejection(&self, mut handler: RejectionHandler) -> Result<(), MonitorError> {
        let window = window()?;
        if !Reflect::has(&window, &"onunhandledrejection".into()).unwrap_or(false) {
            return Err(MonitorError::Unsupported("unhandledrejection".to_string()));
        }
        let closure = Closure::wrap(Box::new(move |event: web_sys::Event| {
            handler(&read_rejection(&event));
        }) as Box<dyn FnMut(_)>);
        window
            .add_event_listener_with_callback("unhandledrejection", closure.as_ref().unchecked_ref())
            .map_err(|e| MonitorError::Unsupported(js_error("unhandledrejection listener", &e)))?;
        closure.forget();
        Ok(())
    }

    fn on_load_complete(&self, handler: Box<dyn FnOnce()>) -> Result<(), MonitorError> {
        let window = window()?;
        let loaded = window
            .document()
            .map(|d| d.ready_state() == "complete")
            .unwrap_or(false);
        if loaded {
            return defer(&window, handler);
        }

        let window_for_load = window.clone();
        let onload = Closure::once(Box::new(move |_event: web_sys::Event| {
            // loadEventEnd is only set once every load handler has returned
            if let Err(e) = defer(&window_for_load, handler) {
                debug!("Skipping load report: {}", e);
            }
        }) as Box<dyn FnOnce(_)>);
        window
            .add_event_listener_with_callback("load", onload.as_ref().unchecked_ref())
            .map_err(|e| MonitorError::Unsupported(js_error("load listener", &e)))?;
        onload.forget();
        Ok(())
    }

    fn page_url(&self) -> String {
        web_sys::window()
            .and_then(|w| w.location().href().ok())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_property_by_tag() {
        assert_eq!(url_property(&ElementTag::Link), "href");
        assert_eq!(url_property(&ElementTag::Script), "src");
        assert_eq!(url_property(&ElementTag::Img), "src");
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty(String::new()), None);
        assert_eq!(non_empty("x".to_string()), Some("x".to_string()));
    }
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[wasm_bindgen_test]
    fn test_image_failure_target() {
        let document = web_sys::window().unwrap().document().unwrap();
        let img = document.create_element("img").unwrap();
        img.set_attribute("src", "https://cdn.x/a.png").unwrap();
        let event = web_sys::Event::new("error").unwrap();
        img.dispatch_event(&event).unwrap();

        let error = read_error_event(&event);
        assert_eq!(error.message, None);
        assert_eq!(
            error.target,
            EventTarget::Element {
                tag: ElementTag::Img,
                url: Some("https://cdn.x/a.png".to_string()),
            }
        );
    }

    #[wasm_bindgen_test]
    fn test_rejection_without_reason() {
        let event = web_sys::Event::new("unhandledrejection").unwrap();
        assert_eq!(read_rejection(&event), RejectionEvent::default());
    }

    #[wasm_bindgen_test]
    fn test_page_url_present() {
        assert!(!BrowserEvents.page_url().is_empty());
    }
}
