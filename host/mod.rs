use crate::*;

mod manifest;
pub use manifest::*;

mod subscriptions;
pub use subscriptions::*;

#[cfg(feature = "traces")]
mod traces;
#[cfg(feature = "traces")]
pub use traces::*;

use axum::{
    body::HttpBody,
    extract::{RawQuery, Request as HttpRequest, State},
    http::{uri::PathAndQuery, Uri},
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Response as HttpResponse},
    routing::{get, post},
    Json, Router,
};
use page::{SubscriptionStatus, SUBSCRIPTION_PATH};
use std::sync::Arc;

/// Host side state of the shell: its config and the subscriptions pages reported
#[derive(Clone)]
pub struct ShellHost {
    config: Arc<ShellConfig>,
    subscriptions: SubscriptionStore,
}

impl ShellHost {
    pub fn new(config: ShellConfig) -> Self {
        Self {
            config: Arc::new(config.init()),
            subscriptions: SubscriptionStore::default(),
        }
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn subscriptions(&self) -> &SubscriptionStore {
        &self.subscriptions
    }
}

/// Utility trait to serve the shell from a Router
pub trait AppShellRoutes {
    /// Adds manifest, config and subscription routes, and wraps everything into
    /// version ETags and module length headers
    fn app_shell(self, host: ShellHost) -> Self;
}

impl AppShellRoutes for Router {
    fn app_shell(self, host: ShellHost) -> Self {
        let shell = Router::new()
            .route("/manifest.webmanifest", get(web_manifest))
            .route("/app-shell.json", get(page_config))
            .route("/app-worker.json", get(worker_config))
            .route(SUBSCRIPTION_PATH, post(subscription))
            .with_state(host.clone());

        let routes = self
            .merge(shell)
            .layer(from_fn_with_state(host.clone(), wasm_length));

        // outer router so the version prefix is stripped before routing
        let router = Router::new()
            .fallback_service(routes)
            .layer(from_fn_with_state(host, versioned));

        #[cfg(feature = "traces")]
        let router = router.layer(trace_layer());

        router
    }
}

async fn web_manifest(State(host): State<ShellHost>) -> Result<HttpResponse> {
    let body = serde_json::to_vec(&WebManifest::from_config(&host.config))?;
    Ok((
        [(header::CONTENT_TYPE, "application/manifest+json")],
        body,
    )
        .into_response())
}

async fn page_config(State(host): State<ShellHost>) -> Json<PageConfig> {
    Json(host.config.page_config())
}

async fn worker_config(State(host): State<ShellHost>) -> Json<WorkerConfig> {
    Json(host.config.worker_config())
}

async fn subscription(
    State(host): State<ShellHost>,
    RawQuery(query): RawQuery,
    Json(subscription): Json<PushSubscription>,
) -> Result<StatusCode> {
    let Some(status) = query.as_deref().and_then(SubscriptionStatus::from_query) else {
        return Ok(StatusCode::BAD_REQUEST);
    };
    let unknown = host.subscriptions.upsert(subscription).await?;
    debug!(?status, unknown, "push subscription reported");
    Ok(match status {
        SubscriptionStatus::New => StatusCode::CREATED,
        SubscriptionStatus::Old => StatusCode::OK,
    })
}

async fn versioned(State(host): State<ShellHost>, mut req: HttpRequest, next: Next) -> HttpResponse {
    let etag = host.config.etag();
    let fresh = req
        .headers()
        .get(header::IF_NONE_MATCH)
        .is_some_and(|tag| tag.as_bytes() == etag.as_bytes());

    let mut response = if fresh {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        if let Some(uri) = strip_version_prefix(req.uri(), &host.config.version) {
            *req.uri_mut() = uri;
        }
        next.run(req).await
    };

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    if let Ok(etag) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, etag);
    }
    response
}

/// `/<version>/app.js` becomes `/app.js`, the query is kept
fn strip_version_prefix(uri: &Uri, version: &str) -> Option<Uri> {
    let path = uri.path().strip_prefix(&format!("/{version}"))?;
    if version.is_empty() || !path.starts_with('/') {
        return None;
    }
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_owned(),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

async fn wasm_length(State(host): State<ShellHost>, req: HttpRequest, next: Next) -> HttpResponse {
    let is_module = req.uri().path() == host.config.resolve(&host.config.wasm_url);
    let mut response = next.run(req).await;
    if !is_module || response.headers().contains_key(WASM_LENGTH_HEADER) {
        return response;
    }
    let length = response
        .body()
        .size_hint()
        .exact()
        .or_else(|| {
            response
                .headers()
                .get(header::CONTENT_LENGTH)?
                .to_str()
                .ok()?
                .parse()
                .ok()
        });
    if let Some(length) = length {
        response
            .headers_mut()
            .insert(WASM_LENGTH_HEADER, HeaderValue::from(length));
    }
    response
}
