//! Bootstrap layer of installable web apps: a versioned-cache service worker, a page
//! loader that registers it and streams the app module, and host routes that feed both.
#![allow(clippy::new_without_default)]

mod config;
mod platform;
mod resources;
mod result;

pub mod page;
pub mod worker;

pub use config::*;
pub use platform::*;
pub use resources::*;
pub use result::*;

#[cfg(host)]
mod host;
#[cfg(host)]
pub use host::*;

#[cfg(wasm)]
mod web;
#[cfg(wasm)]
pub use web::*;

#[cfg(test)]
pub(crate) mod testing;

pub use async_trait::async_trait;
pub use axum::http::{self, header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use bytes::Bytes;
pub use futures::{
    executor::block_on,
    stream::{LocalBoxStream, StreamExt},
};
pub use serde_json::json;
pub use std::{cell::RefCell, rc::Rc};
pub use tracing::{debug, error, info, trace, warn};

/// Prefix of every cache name owned by the worker
pub const CACHE_PREFIX: &str = "app-";

/// Header carrying the app module size, preferred over the generic length header
pub const WASM_LENGTH_HEADER: &str = "x-app-wasm-length";

/// Versioned cache name like `app-v1`
pub fn cache_name(version: &str) -> String {
    format!("{CACHE_PREFIX}{version}")
}
