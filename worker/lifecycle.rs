use super::*;

/// Outcome of [`AppWorker::fetch`]
#[derive(Debug)]
pub enum Fetched {
    Cached(Response),
    /// Not cached, the browser sends the original request as is
    Miss,
}

impl AppWorker {
    /// Caches every manifest resource and activates without waiting for old pages to close.
    /// A failed fetch fails the install and the previous worker stays in control.
    pub async fn install(&self) -> Result {
        info!("installing app worker {}", self.version);
        let cache = self.platform.caches.open(&self.cache_name).await?;
        cache.add_all(&self.resources).await?;
        self.platform.scope.skip_waiting().await
    }

    /// Deletes every cache that belongs to another version
    pub async fn activate(&self) -> Result {
        let caches = &self.platform.caches;
        for key in caches.keys().await? {
            if key != self.cache_name {
                debug!(cache = %key, "deleting stale cache");
                caches.delete(&key).await?;
            }
        }
        info!("app worker {} is activated", self.version);
        OK
    }

    /// Cache first. Only GET requests are looked up, a miss goes to the network untouched.
    pub async fn fetch(&self, request: &Request) -> Result<Fetched> {
        if request.method() != Method::GET {
            return Ok(Fetched::Miss);
        }
        match self.platform.caches.match_request(request).await? {
            Some(response) => {
                trace!(uri = %request.uri(), "served from cache");
                Ok(Fetched::Cached(response))
            }
            None => Ok(Fetched::Miss),
        }
    }

    /// Same-origin requests and remote manifest resources go through [`Self::fetch`],
    /// other cross-origin requests are left to the browser
    pub fn handles(&self, url: &str, origin: &str) -> bool {
        let same_origin = url
            .strip_prefix(origin)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'));
        same_origin || self.resources.iter().any(|resource| resource == url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    fn worker(
        version: &str,
        resources: &[&str],
        network: Rc<FakeNetwork>,
    ) -> (AppWorker, Rc<FakeCacheStorage>, Rc<FakeScope>) {
        let caches = FakeCacheStorage::new(network.clone());
        let scope = Rc::new(FakeScope::default());
        let config = WorkerConfig {
            version: version.to_owned(),
            resources: resources.iter().map(|r| r.to_string()).collect(),
        };
        let platform = WorkerPlatform {
            caches: caches.clone(),
            clients: Rc::new(FakeClients::default()),
            scope: scope.clone(),
        };
        (AppWorker::new(config, platform), caches, scope)
    }

    #[test]
    fn install_caches_manifest_and_skips_waiting() {
        let network = FakeNetwork::with_resources(&["/a.js", "/b.css", "/c.png"]);
        let (worker, caches, scope) = worker("v1", &["/a.js", "/b.css"], network);

        block_on(worker.install()).unwrap();

        assert_eq!(caches.names(), vec!["app-v1"]);
        assert_eq!(caches.entries("app-v1"), vec!["/a.js", "/b.css"]);
        assert!(scope.skipped_waiting.get());
    }

    #[test]
    fn install_fails_when_a_resource_is_missing() {
        let network = FakeNetwork::with_resources(&["/a.js"]);
        let (worker, caches, scope) = worker("v1", &["/a.js", "/missing.css"], network);

        let err = block_on(worker.install()).unwrap_err();

        assert!(matches!(err, Error::BadStatus { status, .. } if status == StatusCode::NOT_FOUND));
        assert!(caches.entries("app-v1").is_empty());
        assert!(!scope.skipped_waiting.get());
    }

    #[test]
    fn activate_keeps_only_current_version() {
        let network = FakeNetwork::with_resources(&[]);
        let (worker, caches, _) = worker("v3", &[], network);
        caches.seed("app-v1", &["/a.js"]);
        caches.seed("app-v2", &["/a.js"]);
        caches.seed("app-v3", &["/a.js"]);
        caches.seed("other", &[]);

        block_on(worker.activate()).unwrap();

        assert_eq!(caches.names(), vec!["app-v3"]);
    }

    #[test]
    fn fetch_serves_cached_resources() {
        let network = FakeNetwork::with_resources(&["/a.js", "/api/items"]);
        let (worker, _, _) = worker("v1", &["/a.js"], network.clone());
        block_on(worker.install()).unwrap();
        let fetched_on_install = network.request_count();

        let request = get_request("/a.js").unwrap();
        let Fetched::Cached(cached) = block_on(worker.fetch(&request)).unwrap() else {
            panic!("expected a cache hit");
        };
        assert_eq!(cached.body(), &Bytes::from("network /a.js"));
        assert_eq!(network.request_count(), fetched_on_install);
    }

    #[test]
    fn fetch_miss_leaves_the_request_to_the_browser() {
        let network = FakeNetwork::with_resources(&["/a.js", "/api/items"]);
        let (worker, _, _) = worker("v1", &["/a.js"], network.clone());
        block_on(worker.install()).unwrap();
        let fetched_on_install = network.request_count();

        let uncached = get_request("/api/items").unwrap();
        assert!(matches!(block_on(worker.fetch(&uncached)).unwrap(), Fetched::Miss));

        // a POST to a cached url still goes out with its body
        let post = http::Request::post("/a.js")
            .body(Bytes::from("payload"))
            .unwrap();
        assert!(matches!(block_on(worker.fetch(&post)).unwrap(), Fetched::Miss));

        assert_eq!(network.request_count(), fetched_on_install);
    }

    #[test]
    fn handles_own_origin_and_remote_resources() {
        let network = FakeNetwork::with_resources(&[]);
        let (worker, _, _) = worker("v1", &["/a.js", "https://cdn.todo.app/web/app.wasm"], network);
        let origin = "https://todo.app";

        assert!(worker.handles("https://todo.app/api/items", origin));
        assert!(worker.handles("https://cdn.todo.app/web/app.wasm", origin));
        assert!(!worker.handles("https://todo.app.evil.com/a.js", origin));
        assert!(!worker.handles("https://fonts.example/font.woff2", origin));
    }
}
