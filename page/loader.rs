use super::*;
use bytes::BytesMut;
use std::fmt;

/// Lowercase user agent fragments that identify crawlers
pub const CRAWLER_PATTERNS: [&str; 6] = ["bot", "googlebot", "crawler", "spider", "robot", "crawling"];

pub fn is_crawler(user_agent: &str) -> bool {
    let user_agent = user_agent.to_lowercase();
    CRAWLER_PATTERNS.iter().any(|p| user_agent.contains(p))
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Progress {
    Percent(f64),
    /// Used when the length is unknown, some proxies drop it while streaming
    Megabytes(f64),
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Progress::Percent(p) => write!(f, "Downloading {p:.2}%"),
            Progress::Megabytes(mb) => write!(f, "Downloading {mb:.2}MB"),
        }
    }
}

/// Chunks of the app module received so far
pub struct DownloadBuffer {
    chunks: Vec<Bytes>,
    received: u64,
    expected: Option<u64>,
}

impl DownloadBuffer {
    pub fn new(expected: Option<u64>) -> Self {
        Self {
            chunks: vec![],
            received: 0,
            expected: expected.filter(|len| *len != 0),
        }
    }

    pub fn push(&mut self, chunk: Bytes) -> Progress {
        self.received += chunk.len() as u64;
        self.chunks.push(chunk);
        self.progress()
    }

    pub fn progress(&self) -> Progress {
        match self.expected {
            Some(total) => Progress::Percent(self.received as f64 / total as f64 * 100.0),
            None => Progress::Megabytes(self.received as f64 / 1_000_000.0),
        }
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    /// Joins the chunks into one contiguous buffer
    pub fn into_bytes(mut self) -> Bytes {
        if self.chunks.len() == 1 {
            return self.chunks.remove(0);
        }
        let mut buf = BytesMut::with_capacity(self.received as usize);
        for chunk in self.chunks {
            buf.extend_from_slice(&chunk);
        }
        buf.freeze()
    }
}

fn header_length(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|len| *len != 0)
}

/// Size of the module: configured value, then the dedicated header, then the fallback header
pub fn expected_length(headers: &HeaderMap, config: &PageConfig) -> Option<u64> {
    config
        .wasm_content_length
        .filter(|len| *len != 0)
        .or_else(|| header_length(headers, WASM_LENGTH_HEADER))
        .or_else(|| header_length(headers, &config.wasm_length_header))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Crawler user agent, nothing fetched
    Skipped,
    Started,
    Failed(String),
}

/// Browser objects the loader talks to
#[derive(Clone)]
pub struct LoaderPlatform {
    pub network: Rc<dyn Network>,
    pub view: Rc<dyn LoaderView>,
    pub runtime: Rc<dyn ModuleRuntime>,
}

/// Streams the app module with progress in the loader label, then instantiates and starts it
pub struct WasmLoader {
    config: PageConfig,
    platform: LoaderPlatform,
}

impl WasmLoader {
    pub fn new(config: PageConfig, platform: LoaderPlatform) -> Self {
        Self { config, platform }
    }

    pub async fn run(&self, user_agent: &str) -> LoadOutcome {
        let view = &self.platform.view;
        if is_crawler(user_agent) {
            debug!(user_agent, "crawler detected, skipping app module");
            view.hide();
            return LoadOutcome::Skipped;
        }
        match self.load().await {
            Ok(()) => LoadOutcome::Started,
            Err(e) => {
                let message = e.to_string();
                view.mark_ready();
                view.set_label(&message);
                error!("loading wasm failed: {message}");
                LoadOutcome::Failed(message)
            }
        }
    }

    async fn load(&self) -> Result {
        let module = self.download().await?;
        let instance = self.platform.runtime.instantiate(module).await?;
        self.platform.view.mark_ready();
        instance.start()
    }

    async fn download(&self) -> Result<Bytes> {
        let url = &self.config.wasm_url;
        let mut response = self.platform.network.fetch_streaming(url).await?;
        if !response.status.is_success() {
            return Err(Error::BadStatus {
                url: url.clone(),
                status: response.status,
            });
        }
        let expected = expected_length(&response.headers, &self.config);
        debug!(?expected, "downloading app module");

        let mut buffer = DownloadBuffer::new(expected);
        while let Some(chunk) = response.body.next().await {
            let progress = buffer.push(chunk?);
            self.platform.view.set_label(&progress.to_string());
        }
        info!(bytes = buffer.received(), "app module downloaded");
        Ok(buffer.into_bytes())
    }
}
