use super::*;
use crate::worker::{AppWorker, Fetched, WorkerPlatform};
use js_sys::{Array, Reflect};
use std::future::Future;
use wasm_bindgen_futures::future_to_promise;
use web_sys::{
    ClientQueryOptions, ClientType, ExtendableEvent, ExtendableMessageEvent, FetchEvent,
    NotificationEvent, PushEvent, ServiceWorkerGlobalScope, WindowClient,
};

pub struct WebCacheStorage(web_sys::CacheStorage);

#[async_trait(?Send)]
impl CacheStorage for WebCacheStorage {
    async fn open(&self, name: &str) -> Result<Rc<dyn Cache>> {
        let cache = resolve(self.0.open(name)).await?;
        Ok(Rc::new(WebCache(cache.unchecked_into())))
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let keys = resolve(self.0.keys()).await?.unchecked_into::<Array>();
        Ok(keys.iter().filter_map(|key| key.as_string()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(resolve(self.0.delete(name)).await?.is_truthy())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        let request = fetch::into_websys_request(request)?;
        matched(self.0.match_with_request(&request)).await
    }
}

pub struct WebCache(web_sys::Cache);

#[async_trait(?Send)]
impl Cache for WebCache {
    async fn add_all(&self, urls: &[String]) -> Result {
        let urls = urls.iter().map(|url| JsValue::from_str(url)).collect::<Array>();
        resolve(self.0.add_all_with_str_sequence(&urls)).await?;
        OK
    }
}

async fn matched(promise: Promise) -> Result<Option<Response>> {
    let found = resolve(promise).await?;
    if found.is_undefined() {
        return Ok(None);
    }
    Ok(Some(fetch::from_websys_response(found.unchecked_into()).await?))
}

pub struct WebWorkerScope(ServiceWorkerGlobalScope);

#[async_trait(?Send)]
impl WorkerScope for WebWorkerScope {
    async fn skip_waiting(&self) -> Result {
        resolve(self.0.skip_waiting()?).await?;
        OK
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result {
        let options = to_js(options)?.unchecked_into::<web_sys::NotificationOptions>();
        let promise = self
            .0
            .registration()
            .show_notification_with_options(title, &options)?;
        resolve(promise).await?;
        OK
    }
}

pub struct WebClients(web_sys::Clients);

#[async_trait(?Send)]
impl Clients for WebClients {
    async fn match_all(&self, query: ClientQuery) -> Result<Vec<Rc<dyn Client>>> {
        let options = ClientQueryOptions::new();
        options.set_include_uncontrolled(query.include_uncontrolled);
        if query.windows_only {
            options.set_type(ClientType::Window);
        }
        let clients = resolve(self.0.match_all_with_options(&options))
            .await?
            .unchecked_into::<Array>();
        Ok(clients
            .iter()
            .map(|client| Rc::new(WebClient(client.unchecked_into())) as Rc<dyn Client>)
            .collect())
    }

    fn can_open_window(&self) -> bool {
        Reflect::has(&self.0, &"openWindow".into()).unwrap_or(false)
    }

    async fn open_window(&self, url: &str) -> Result<Option<Rc<dyn Client>>> {
        let client = resolve(self.0.open_window(url)).await?;
        if client.is_null() || client.is_undefined() {
            return Ok(None);
        }
        Ok(Some(Rc::new(WebClient(client.unchecked_into()))))
    }
}

pub struct WebClient(web_sys::Client);

#[async_trait(?Send)]
impl Client for WebClient {
    fn post_message(&self, message: &ClientMessage) -> Result {
        self.0.post_message(&to_js(message)?)?;
        OK
    }

    fn can_focus(&self) -> bool {
        self.0.dyn_ref::<WindowClient>().is_some()
    }

    async fn focus(&self) -> Result {
        let Some(window) = self.0.dyn_ref::<WindowClient>() else {
            let id = self.0.id();
            return Err(e!("client {id} is not a window"));
        };
        resolve(window.focus()?).await?;
        OK
    }
}

pub struct WebNotification(web_sys::Notification);

impl Notification for WebNotification {
    fn close(&self) {
        self.0.close()
    }
}

/// Extends the event until the handler settles, logging its failure
fn wait_until(
    event: &ExtendableEvent,
    name: &'static str,
    task: impl Future<Output = Result> + 'static,
) {
    let promise = future_to_promise(async move {
        task.await.map_err(|e| {
            error!("{name} failed: {e}");
            JsValue::from(e)
        })?;
        Ok(JsValue::UNDEFINED)
    });
    if let Err(e) = event.wait_until(&promise) {
        error!("{name}: waitUntil rejected: {}", Error::from(e));
    }
}

/// Builds the worker from its JSON config and registers its event listeners.
/// Must run during the worker script's first evaluation.
#[wasm_bindgen]
pub fn start_worker(config_json: &str) -> std::result::Result<(), JsValue> {
    init_tracing();
    let config: WorkerConfig = serde_json::from_str(config_json).map_err(Error::from)?;
    let scope = js_sys::global().unchecked_into::<ServiceWorkerGlobalScope>();
    let network = Rc::new(WebNetwork::new()?);
    let platform = WorkerPlatform {
        caches: Rc::new(WebCacheStorage(scope.caches()?)),
        clients: Rc::new(WebClients(scope.clients())),
        scope: Rc::new(WebWorkerScope(scope.clone())),
    };
    let worker = Rc::new(AppWorker::new(config, platform));
    let origin = scope.location().origin();
    debug!(version = worker.version(), "starting app worker");

    let w = worker.clone();
    listen(&scope, "install", move |event: ExtendableEvent| {
        let w = w.clone();
        wait_until(&event, "install", async move { w.install().await });
    })?;

    let w = worker.clone();
    listen(&scope, "activate", move |event: ExtendableEvent| {
        let w = w.clone();
        wait_until(&event, "activate", async move { w.activate().await });
    })?;

    let w = worker.clone();
    listen(&scope, "fetch", move |event: FetchEvent| {
        let request = event.request();
        if !w.handles(&request.url(), &origin) {
            return;
        }
        let w = w.clone();
        let network = network.clone();
        let promise = future_to_promise(async move {
            match w.fetch(&fetch::request_head(&request)?).await? {
                Fetched::Cached(response) => Ok(fetch::into_websys_response(response)?.into()),
                Fetched::Miss => Ok(network.send(&request).await?.into()),
            }
        });
        if let Err(e) = event.respond_with(&promise) {
            error!("respondWith rejected: {}", Error::from(e));
        }
    })?;

    let w = worker.clone();
    listen(&scope, "notificationclick", move |event: NotificationEvent| {
        let w = w.clone();
        let action = event.action();
        let notification = WebNotification(event.notification());
        wait_until(&event, "notificationclick", async move {
            w.notification_click(&action, &notification).await
        });
    })?;

    let w = worker.clone();
    listen(&scope, "push", move |event: PushEvent| {
        let Some(data) = event.data() else {
            return;
        };
        let w = w.clone();
        let payload = data.text();
        wait_until(&event, "push", async move { w.push(&payload).await });
    })?;

    let w = worker;
    listen(&scope, "message", move |event: ExtendableMessageEvent| {
        let text = match event.data().as_string() {
            Some(text) => text,
            None => js_sys::JSON::stringify(&event.data())
                .map(String::from)
                .unwrap_or_default(),
        };
        let w = w.clone();
        wait_until(&event, "message", async move { w.message(&text).await });
    })?;
    Ok(())
}
