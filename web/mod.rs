//! `web-sys` implementations of the platform traits and the `#[wasm_bindgen]` entry points
//! for the worker and page scripts.

use crate::*;

mod fetch;
mod page;
mod worker;

pub use fetch::*;
pub use page::*;
pub use worker::*;

pub use console_error_panic_hook::set_once as set_panic_hook;
use js_sys::Promise;
pub use wasm_bindgen::prelude::wasm_bindgen;
use wasm_bindgen::{closure::Closure, JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

impl From<JsValue> for Error {
    fn from(value: JsValue) -> Self {
        if let Some(text) = value.as_string() {
            return Error::Platform(text);
        }
        if let Some(error) = value.dyn_ref::<js_sys::Error>() {
            return Error::Platform(String::from(error.to_string()));
        }
        Error::Platform(format!("{value:?}"))
    }
}

impl From<Error> for JsValue {
    fn from(error: Error) -> Self {
        js_sys::Error::new(&error.to_string()).into()
    }
}

/// Awaits a JS promise
pub(crate) async fn resolve(promise: Promise) -> Result<JsValue> {
    Ok(JsFuture::from(promise).await?)
}

/// Serializes into a plain JS object through JSON
pub(crate) fn to_js<T: serde::Serialize>(value: &T) -> Result<JsValue> {
    Ok(js_sys::JSON::parse(&serde_json::to_string(value)?)?)
}

/// Reads a JS object back through JSON
pub(crate) fn from_js<T: serde::de::DeserializeOwned>(value: &JsValue) -> Result<T> {
    let text = js_sys::JSON::stringify(value)?
        .as_string()
        .ok_or_else(|| e!("value is not serializable"))?;
    Ok(serde_json::from_str(&text)?)
}

/// Adds an event listener that lives as long as the page or worker
pub(crate) fn listen<E: JsCast + 'static>(
    target: &web_sys::EventTarget,
    event: &str,
    handler: impl Fn(E) + 'static,
) -> Result {
    let closure = Closure::<dyn Fn(JsValue)>::new(move |event: JsValue| {
        handler(event.unchecked_into::<E>())
    });
    target.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())?;
    closure.forget();
    OK
}

/// Sends browser console output through tracing. Safe to call more than once.
pub fn init_tracing() {
    set_panic_hook();
    #[cfg(feature = "traces")]
    {
        use tracing_subscriber::fmt::{
            format::{FmtSpan, Pretty},
            time::UtcTime,
        };
        use tracing_subscriber::prelude::*;
        use tracing_web::{performance_layer, MakeWebConsoleWriter};

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false) // only partially supported across browsers
            .with_timer(UtcTime::rfc_3339())
            .with_writer(MakeWebConsoleWriter::new().with_pretty_level())
            .with_level(false)
            .with_span_events(FmtSpan::ACTIVE);
        let perf_layer = performance_layer().with_details_from_fields(Pretty::default());

        if tracing_subscriber::registry()
            .with(fmt_layer)
            .with(perf_layer)
            .try_init()
            .is_err()
        {
            debug!("tracing subscriber was already initialized");
        }
    }
}
