use crate::*;
use page::Environment;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Full description of the shell, usually read from a TOML file on the host
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    pub name: String,
    pub short_name: String,
    pub description: String,
    /// Set it for deployments, otherwise every restart yields a new version and clients update
    pub version: String,
    pub worker_url: String,
    /// 0 disables update polling
    pub auto_update_interval_ms: u64,
    /// Empty string disables push setup
    pub vapid_public_key: String,
    pub env: Environment,
    pub wasm_url: String,
    /// Static module size, takes priority over the response headers
    pub wasm_content_length: Option<u64>,
    /// Header consulted when the module response has no `x-app-wasm-length`
    pub wasm_length_header: String,
    /// Prefix (local dir or remote bucket) that `/web/` resources are served from
    pub static_prefix: String,
    pub icon: Icon,
    pub background_color: String,
    pub theme_color: String,
    pub styles: Vec<String>,
    pub fonts: Vec<String>,
    pub scripts: Vec<String>,
    pub cacheable_resources: Vec<String>,
    pub internal_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Icon {
    /// 192px square png
    pub default: String,
    /// 512px square png
    pub large: String,
    pub svg: String,
    pub apple_touch: String,
}

impl Default for Icon {
    fn default() -> Self {
        Self {
            default: "/web/icon.png".to_owned(),
            large: "/web/icon.png".to_owned(),
            svg: "/web/icon.svg".to_owned(),
            apple_touch: String::new(),
        }
    }
}

const DEFAULT_THEME_COLOR: &str = "#2d2c2c";

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            short_name: String::new(),
            description: String::new(),
            version: String::new(),
            worker_url: "/app-worker.js".to_owned(),
            auto_update_interval_ms: 0,
            vapid_public_key: String::new(),
            env: Environment::default(),
            wasm_url: "/web/app.wasm".to_owned(),
            wasm_content_length: None,
            wasm_length_header: header::CONTENT_LENGTH.as_str().to_owned(),
            static_prefix: String::new(),
            icon: Icon::default(),
            background_color: DEFAULT_THEME_COLOR.to_owned(),
            theme_color: DEFAULT_THEME_COLOR.to_owned(),
            styles: vec![],
            fonts: vec![],
            scripts: vec![],
            cacheable_resources: vec![],
            internal_urls: vec![],
        }
    }
}

impl ShellConfig {
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str::<Self>(source)?.init())
    }

    #[cfg(host)]
    pub fn load(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        use anyhow::Context;
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("reading shell config at {}", path.display()))?;
        Self::from_toml(&source).with_context(|| format!("parsing {}", path.display()))
    }

    /// Fills derived defaults: version, names and the apple touch icon
    pub fn init(mut self) -> Self {
        if self.version.is_empty() {
            self.version = generate_version();
            debug!(version = %self.version, "generated app version");
        }
        if self.name.is_empty() && self.short_name.is_empty() {
            self.name = "App PWA".to_owned();
        }
        if self.short_name.is_empty() {
            self.short_name = self.name.clone();
        }
        if self.name.is_empty() {
            self.name = self.short_name.clone();
        }
        if self.icon.apple_touch.is_empty() {
            self.icon.apple_touch = self.icon.default.clone();
        }
        self
    }

    /// Resolves `/web/` paths against the static prefix, remote urls stay as is
    pub fn resolve(&self, path: &str) -> String {
        if path.is_empty() || resources::is_remote(path) {
            return path.to_owned();
        }
        let path = if path.starts_with('/') {
            path.to_owned()
        } else {
            format!("/{path}")
        };
        let prefix = self.static_prefix.trim_end_matches('/');
        if prefix.is_empty() || !path.starts_with("/web/") {
            return path;
        }
        format!("{prefix}{path}")
    }

    pub fn etag(&self) -> String {
        format!("\"{}\"", self.version)
    }

    pub fn resource_manifest(&self) -> ResourceManifest {
        let mut manifest = ResourceManifest::new();
        manifest.extend(BUILTIN_RESOURCES);
        manifest.extend([&self.wasm_url]);
        manifest.extend([&self.icon.default, &self.icon.large, &self.icon.apple_touch]);
        manifest.extend(&self.styles);
        manifest.extend(&self.fonts);
        manifest.extend(&self.scripts);
        manifest.extend(&self.cacheable_resources);
        manifest.resolve_with(|path| self.resolve(path))
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            version: self.version.clone(),
            resources: self.resource_manifest().into_paths(),
        }
    }

    pub fn page_config(&self) -> PageConfig {
        let env = self.env.clone().with_reserved(
            &self.version,
            &self.resolve("/web"),
            &self.resolve("/"),
            &self.internal_urls,
        );
        PageConfig {
            worker_url: self.resolve(&self.worker_url),
            auto_update_interval_ms: self.auto_update_interval_ms,
            vapid_public_key: self.vapid_public_key.clone(),
            env,
            wasm_url: self.resolve(&self.wasm_url),
            wasm_content_length: self.wasm_content_length,
            wasm_length_header: self.wasm_length_header.to_lowercase(),
        }
    }
}

/// Hex digest of the current time, unique per host start
pub fn generate_version() -> String {
    let now = chrono::Utc::now().to_rfc3339();
    hex::encode(Sha256::digest(now.as_bytes()))
}

/// What the worker needs: its version and the resources to cache
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerConfig {
    pub version: String,
    pub resources: Vec<String>,
}

impl WorkerConfig {
    pub fn cache_name(&self) -> String {
        cache_name(&self.version)
    }
}

/// What the page bootstrap needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageConfig {
    pub worker_url: String,
    pub auto_update_interval_ms: u64,
    pub vapid_public_key: String,
    pub env: Environment,
    pub wasm_url: String,
    pub wasm_content_length: Option<u64>,
    pub wasm_length_header: String,
}

impl Default for PageConfig {
    fn default() -> Self {
        ShellConfig::default().init().page_config()
    }
}

impl PageConfig {
    pub fn auto_update_interval(&self) -> Option<std::time::Duration> {
        (self.auto_update_interval_ms != 0)
            .then(|| std::time::Duration::from_millis(self.auto_update_interval_ms))
    }

    pub fn push_enabled(&self) -> bool {
        !self.vapid_public_key.is_empty()
    }
}
