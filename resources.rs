use crate::*;
use std::collections::BTreeSet;

/// Resources every app serves and caches for offline mode
pub const BUILTIN_RESOURCES: [&str; 5] = [
    "/",
    "/app.css",
    "/app.js",
    "/manifest.webmanifest",
    "/web/app.wasm",
];

/// Url of a resource string, skipping loading attributes like `async`, `defer` and
/// `crossorigin[=mode]`. The url is lowercased.
pub fn resource_url(value: &str) -> Option<String> {
    value
        .split_whitespace()
        .map(str::to_lowercase)
        .filter(|elem| {
            !matches!(elem.as_str(), "async" | "defer" | "crossorigin")
                && !elem.starts_with("crossorigin=")
        })
        .last()
}

/// Deduplicated, sorted list of paths the worker caches on install
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResourceManifest(BTreeSet<String>);

impl ResourceManifest {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds resource strings, skipping the ones without url
    pub fn extend<I, S>(&mut self, resources: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.0
            .extend(resources.into_iter().filter_map(|r| resource_url(r.as_ref())));
    }

    /// Maps every entry through the resolver, keeping the set sorted
    pub fn resolve_with(self, resolve: impl Fn(&str) -> String) -> Self {
        Self(self.0.iter().map(|path| resolve(path)).collect())
    }

    pub fn into_paths(self) -> Vec<String> {
        self.0.into_iter().collect()
    }
}

pub(crate) fn is_remote(path: &str) -> bool {
    path.starts_with("https://") || path.starts_with("http://")
}
