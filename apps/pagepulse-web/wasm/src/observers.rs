//! `PerformanceObserver` subscriptions
//!
//! Entries are read field by field through `Reflect`, so layout-shift and
//! largest-contentful-paint entries need no dedicated bindings.

use js_sys::{Array, Function, Object, Reflect};
use pagepulse_core::platform::BatchCallback;
use pagepulse_core::{MonitorError, ObserverHost, PerformanceEntry, StreamKind};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::{PerformanceObserver, PerformanceObserverEntryList};

use crate::js_error;

#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserObserverHost;

impl ObserverHost for BrowserObserverHost {
    fn subscribe(
        &self,
        kind: StreamKind,
        buffered: bool,
        mut on_batch: BatchCallback,
    ) -> Result<(), MonitorError> {
        let entry_type = kind.entry_type();
        if !entry_type_supported(entry_type)? {
            return Err(MonitorError::Unsupported(entry_type.to_string()));
        }

        let callback = Closure::wrap(Box::new(
            move |list: PerformanceObserverEntryList, _observer: PerformanceObserver| {
                let entries = list
                    .get_entries()
                    .iter()
                    .filter_map(|entry| read_entry(kind, &entry))
                    .collect();
                on_batch(entries);
            },
        )
            as Box<dyn FnMut(PerformanceObserverEntryList, PerformanceObserver)>);

        let observer = PerformanceObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|e| MonitorError::Unsupported(js_error("PerformanceObserver", &e)))?;

        let options = Object::new();
        Reflect::set(&options, &"type".into(), &entry_type.into())
            .map_err(|e| MonitorError::Unsupported(js_error(entry_type, &e)))?;
        Reflect::set(&options, &"buffered".into(), &buffered.into())
            .map_err(|e| MonitorError::Unsupported(js_error(entry_type, &e)))?;

        let observe: Function = Reflect::get(&observer, &"observe".into())
            .and_then(|f| f.dyn_into())
            .map_err(|e| MonitorError::Unsupported(js_error(entry_type, &e)))?;
        observe
            .call1(&observer, &options)
            .map_err(|e| MonitorError::Unsupported(js_error(entry_type, &e)))?;

        // Observers live for the rest of the page
        callback.forget();
        Ok(())
    }
}

/// Whether the platform can observe `entry_type`.
///
/// Errors when `PerformanceObserver` itself is missing. Browsers predating
/// `supportedEntryTypes` are given the benefit of the doubt; `observe` fails
/// for them instead.
fn entry_type_supported(entry_type: &str) -> Result<bool, MonitorError> {
    let constructor = Reflect::get(&js_sys::global(), &"PerformanceObserver".into())
        .unwrap_or(JsValue::UNDEFINED);
    if constructor.is_undefined() || constructor.is_null() {
        return Err(MonitorError::Unsupported("PerformanceObserver".to_string()));
    }
    let supported = Reflect::get(&constructor, &"supportedEntryTypes".into())
        .ok()
        .and_then(|v| v.dyn_into::<Array>().ok());
    Ok(match supported {
        Some(types) => types.includes(&entry_type.into(), 0),
        None => true,
    })
}

fn number(entry: &JsValue, key: &str) -> f64 {
    Reflect::get(entry, &key.into())
        .ok()
        .and_then(|v| v.as_f64())
        .unwrap_or(0.0)
}

fn read_entry(kind: StreamKind, entry: &JsValue) -> Option<PerformanceEntry> {
    match kind {
        StreamKind::Paint => Some(PerformanceEntry::Paint {
            name: Reflect::get(entry, &"name".into()).ok()?.as_string()?,
            start_time: number(entry, "startTime"),
        }),
        StreamKind::LargestContentfulPaint => Some(PerformanceEntry::LargestContentfulPaint {
            render_time: number(entry, "renderTime"),
            load_time: number(entry, "loadTime"),
            start_time: number(entry, "startTime"),
        }),
        StreamKind::LayoutShift => Some(PerformanceEntry::LayoutShift {
            value: number(entry, "value"),
            had_recent_input: Reflect::get(entry, &"hadRecentInput".into())
                .ok()
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        }),
    }
}

#[cfg(test)]
#[cfg(target_arch = "wasm32")]
mod wasm_tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    fn object(pairs: &[(&str, JsValue)]) -> JsValue {
        let obj = Object::new();
        for (key, value) in pairs {
            Reflect::set(&obj, &(*key).into(), value).unwrap();
        }
        obj.into()
    }

    #[wasm_bindgen_test]
    fn test_read_layout_shift_entry() {
        let entry = object(&[("value", 0.25.into()), ("hadRecentInput", true.into())]);
        assert_eq!(
            read_entry(StreamKind::LayoutShift, &entry),
            Some(PerformanceEntry::LayoutShift {
                value: 0.25,
                had_recent_input: true,
            })
        );
    }

    #[wasm_bindgen_test]
    fn test_read_lcp_entry_without_render_time() {
        let entry = object(&[("loadTime", 830.0.into()), ("startTime", 830.0.into())]);
        assert_eq!(
            read_entry(StreamKind::LargestContentfulPaint, &entry),
            Some(PerformanceEntry::LargestContentfulPaint {
                render_time: 0.0,
                load_time: 830.0,
                start_time: 830.0,
            })
        );
    }

    #[wasm_bindgen_test]
    fn test_paint_entry_requires_name() {
        let entry = object(&[("startTime", 12.0.into())]);
        assert_eq!(read_entry(StreamKind::Paint, &entry), None);
    }

    #[wasm_bindgen_test]
    fn test_paint_stream_supported() {
        assert_eq!(entry_type_supported("paint").ok(), Some(true));
        assert_eq!(entry_type_supported("no-such-entry").ok(), Some(false));
    }
}
