use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const VERSION_KEY: &str = "APP_VERSION";
pub const STATIC_RESOURCES_URL_KEY: &str = "APP_STATIC_RESOURCES_URL";
pub const ROOT_PREFIX_KEY: &str = "APP_ROOT_PREFIX";
/// JSON array of urls that open inside the app window
pub const INTERNAL_URLS_KEY: &str = "APP_INTERNAL_URLS";

/// Variables passed from the host to the page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Environment(BTreeMap<String, String>);

impl Environment {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overwrites the reserved keys, user values with the same names are dropped
    pub fn with_reserved(
        mut self,
        version: &str,
        static_resources_url: &str,
        root_prefix: &str,
        internal_urls: &[String],
    ) -> Self {
        let internal_urls =
            serde_json::to_string(internal_urls).unwrap_or_else(|_| "[]".to_owned());
        self.set(VERSION_KEY, version);
        self.set(STATIC_RESOURCES_URL_KEY, static_resources_url);
        self.set(ROOT_PREFIX_KEY, root_prefix);
        self.set(INTERNAL_URLS_KEY, internal_urls);
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
