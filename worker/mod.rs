//! Service worker side: one versioned cache plus lifecycle and messaging handlers.
//!
//! Every handler is an async fn whose future the browser glue passes to
//! `event.waitUntil` or `event.respondWith`, so the event is extended until it resolves.

use crate::*;

mod lifecycle;
mod notifications;

pub use lifecycle::Fetched;
pub use notifications::{NOTIFICATION_TITLE, OPEN_WINDOW_URL};

/// Browser objects the worker talks to
#[derive(Clone)]
pub struct WorkerPlatform {
    pub caches: Rc<dyn CacheStorage>,
    pub clients: Rc<dyn Clients>,
    pub scope: Rc<dyn WorkerScope>,
}

pub struct AppWorker {
    version: String,
    cache_name: String,
    resources: Vec<String>,
    platform: WorkerPlatform,
}

impl AppWorker {
    pub fn new(config: WorkerConfig, platform: WorkerPlatform) -> Self {
        Self {
            cache_name: config.cache_name(),
            version: config.version,
            resources: config.resources,
            platform,
        }
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn cache_name(&self) -> &str {
        &self.cache_name
    }
}
