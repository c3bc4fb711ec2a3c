//! In-memory platform used by unit tests

use crate::*;
use std::{
    cell::Cell,
    collections::{BTreeMap, HashMap},
    time::Duration,
};

fn url_of(request: &Request) -> String {
    request.uri().to_string()
}

#[derive(Default)]
pub struct FakeNetwork {
    pub resources: RefCell<HashMap<String, Bytes>>,
    pub requests: RefCell<Vec<(Method, String, Bytes)>>,
    pub streams: RefCell<HashMap<String, (HeaderMap, Vec<Bytes>)>>,
}

impl FakeNetwork {
    pub fn with_resources(paths: &[&str]) -> Rc<Self> {
        let network = Self::default();
        for path in paths {
            network
                .resources
                .borrow_mut()
                .insert(path.to_string(), Bytes::from(format!("network {path}")));
        }
        Rc::new(network)
    }

    pub fn stream(&self, url: &str, headers: &[(&str, &str)], chunks: &[usize]) {
        let mut map = HeaderMap::new();
        for (name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        let chunks = chunks.iter().map(|len| Bytes::from(vec![0u8; *len])).collect();
        self.streams.borrow_mut().insert(url.to_owned(), (map, chunks));
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[async_trait(?Send)]
impl Network for FakeNetwork {
    async fn fetch(&self, request: Request) -> Result<Response> {
        let url = url_of(&request);
        let (parts, body) = request.into_parts();
        self.requests
            .borrow_mut()
            .push((parts.method, url.clone(), body));
        match self.resources.borrow().get(&url) {
            Some(body) => Ok(http::Response::new(body.clone())),
            None => Ok(http::Response::builder()
                .status(StatusCode::NOT_FOUND)
                .body(Bytes::new())?),
        }
    }

    async fn fetch_streaming(&self, url: &str) -> Result<StreamingResponse> {
        self.requests
            .borrow_mut()
            .push((Method::GET, url.to_owned(), Bytes::new()));
        let Some((headers, chunks)) = self.streams.borrow().get(url).cloned() else {
            return Err(Error::Platform(format!("Failed to fetch {url}")));
        };
        Ok(StreamingResponse {
            status: StatusCode::OK,
            headers,
            body: futures::stream::iter(chunks.into_iter().map(Ok)).boxed_local(),
        })
    }
}

pub struct FakeCache {
    network: Rc<FakeNetwork>,
    entries: RefCell<BTreeMap<String, Bytes>>,
}

#[async_trait(?Send)]
impl Cache for FakeCache {
    async fn add_all(&self, urls: &[String]) -> Result {
        let mut fetched = vec![];
        for url in urls {
            let response = self.network.fetch(get_request(url)?).await?;
            if !response.status().is_success() {
                return Err(Error::BadStatus {
                    url: url.clone(),
                    status: response.status(),
                });
            }
            fetched.push((url.clone(), response.into_body()));
        }
        self.entries.borrow_mut().extend(fetched);
        OK
    }
}

impl FakeCache {
    fn lookup(&self, url: &str) -> Option<Response> {
        self.entries
            .borrow()
            .get(url)
            .map(|body| http::Response::new(body.clone()))
    }
}

pub struct FakeCacheStorage {
    pub network: Rc<FakeNetwork>,
    pub caches: RefCell<BTreeMap<String, Rc<FakeCache>>>,
}

impl FakeCacheStorage {
    pub fn new(network: Rc<FakeNetwork>) -> Rc<Self> {
        Rc::new(Self {
            network,
            caches: Default::default(),
        })
    }

    /// Creates a cache filled with the given entries, bypassing the network
    pub fn seed(&self, name: &str, paths: &[&str]) {
        let entries = paths
            .iter()
            .map(|p| (p.to_string(), Bytes::from(format!("cached {p}"))))
            .collect();
        self.caches.borrow_mut().insert(
            name.to_owned(),
            Rc::new(FakeCache {
                network: self.network.clone(),
                entries: RefCell::new(entries),
            }),
        );
    }

    pub fn names(&self) -> Vec<String> {
        self.caches.borrow().keys().cloned().collect()
    }

    pub fn entries(&self, name: &str) -> Vec<String> {
        self.caches
            .borrow()
            .get(name)
            .map(|c| c.entries.borrow().keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait(?Send)]
impl CacheStorage for FakeCacheStorage {
    async fn open(&self, name: &str) -> Result<Rc<dyn Cache>> {
        let cache = self
            .caches
            .borrow_mut()
            .entry(name.to_owned())
            .or_insert_with(|| {
                Rc::new(FakeCache {
                    network: self.network.clone(),
                    entries: Default::default(),
                })
            })
            .clone();
        Ok(cache as Rc<dyn Cache>)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.names())
    }

    async fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.caches.borrow_mut().remove(name).is_some())
    }

    async fn match_request(&self, request: &Request) -> Result<Option<Response>> {
        let url = url_of(request);
        Ok(self.caches.borrow().values().find_map(|cache| cache.lookup(&url)))
    }
}

#[derive(Default)]
pub struct FakeScope {
    pub skipped_waiting: Cell<bool>,
    pub notifications: RefCell<Vec<(String, NotificationOptions)>>,
}

#[async_trait(?Send)]
impl WorkerScope for FakeScope {
    async fn skip_waiting(&self) -> Result {
        self.skipped_waiting.set(true);
        OK
    }

    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result {
        self.notifications
            .borrow_mut()
            .push((title.to_owned(), options.clone()));
        OK
    }
}

pub struct FakeClient {
    pub focusable: bool,
    pub focused: Cell<bool>,
    pub messages: RefCell<Vec<ClientMessage>>,
}

impl FakeClient {
    pub fn new(focusable: bool) -> Rc<Self> {
        Rc::new(Self {
            focusable,
            focused: Cell::new(false),
            messages: Default::default(),
        })
    }
}

#[async_trait(?Send)]
impl Client for FakeClient {
    fn post_message(&self, message: &ClientMessage) -> Result {
        self.messages.borrow_mut().push(message.clone());
        OK
    }

    fn can_focus(&self) -> bool {
        self.focusable
    }

    async fn focus(&self) -> Result {
        self.focused.set(true);
        OK
    }
}

#[derive(Default)]
pub struct FakeClients {
    pub clients: RefCell<Vec<Rc<FakeClient>>>,
    pub can_open: bool,
    pub opened: RefCell<Vec<(String, Rc<FakeClient>)>>,
    pub last_query: Cell<Option<ClientQuery>>,
}

#[async_trait(?Send)]
impl Clients for FakeClients {
    async fn match_all(&self, query: ClientQuery) -> Result<Vec<Rc<dyn Client>>> {
        self.last_query.set(Some(query));
        Ok(self
            .clients
            .borrow()
            .iter()
            .map(|c| c.clone() as Rc<dyn Client>)
            .collect())
    }

    fn can_open_window(&self) -> bool {
        self.can_open
    }

    async fn open_window(&self, url: &str) -> Result<Option<Rc<dyn Client>>> {
        let client = FakeClient::new(true);
        self.opened.borrow_mut().push((url.to_owned(), client.clone()));
        Ok(Some(client as Rc<dyn Client>))
    }
}

#[derive(Default)]
pub struct FakeNotification {
    pub closed: Cell<bool>,
}

impl Notification for FakeNotification {
    fn close(&self) {
        self.closed.set(true);
    }
}

#[derive(Default)]
pub struct FakePushManager {
    pub existing: RefCell<Option<PushSubscription>>,
    pub fail_subscribe: bool,
    pub subscribed_with: RefCell<Option<SubscribeOptions>>,
}

#[async_trait(?Send)]
impl PushManager for FakePushManager {
    async fn get_subscription(&self) -> Result<Option<PushSubscription>> {
        Ok(self.existing.borrow().clone())
    }

    async fn subscribe(&self, options: SubscribeOptions) -> Result<PushSubscription> {
        if self.fail_subscribe {
            return Err(Error::Platform("NotAllowedError: permission denied".to_owned()));
        }
        *self.subscribed_with.borrow_mut() = Some(options);
        Ok(PushSubscription(json!({
            "endpoint": "https://push.example/new",
            "keys": {"p256dh": "key", "auth": "secret"}
        })))
    }
}

#[derive(Default)]
pub struct FakeRegistration {
    pub push: Rc<FakePushManager>,
    pub updates: Cell<usize>,
    pub state_callback: RefCell<Option<Box<dyn Fn(WorkerState)>>>,
}

impl FakeRegistration {
    pub fn transition(&self, state: WorkerState) {
        if let Some(callback) = self.state_callback.borrow().as_ref() {
            callback(state)
        }
    }
}

impl Registration for FakeRegistration {
    fn on_installing_state_change(&self, callback: Box<dyn Fn(WorkerState)>) {
        *self.state_callback.borrow_mut() = Some(callback);
    }

    fn update(&self) {
        self.updates.set(self.updates.get() + 1);
    }

    fn push_manager(&self) -> Rc<dyn PushManager> {
        self.push.clone()
    }
}

pub struct FakeContainer {
    pub supported: bool,
    pub fail_register: bool,
    pub controller: Cell<bool>,
    pub registration: Rc<FakeRegistration>,
    pub registered_url: RefCell<Option<String>>,
}

impl FakeContainer {
    pub fn new(registration: Rc<FakeRegistration>) -> Rc<Self> {
        Rc::new(Self {
            supported: true,
            fail_register: false,
            controller: Cell::new(false),
            registration,
            registered_url: Default::default(),
        })
    }

    pub fn failing(registration: Rc<FakeRegistration>) -> Rc<Self> {
        Rc::new(Self {
            supported: true,
            fail_register: true,
            controller: Cell::new(false),
            registration,
            registered_url: Default::default(),
        })
    }
}

#[async_trait(?Send)]
impl ServiceWorkerContainer for FakeContainer {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn register(&self, url: &str) -> Result<Rc<dyn Registration>> {
        if self.fail_register {
            return Err(Error::Platform("SecurityError: insecure context".to_owned()));
        }
        *self.registered_url.borrow_mut() = Some(url.to_owned());
        Ok(self.registration.clone() as Rc<dyn Registration>)
    }

    async fn ready(&self) -> Result<Rc<dyn Registration>> {
        Ok(self.registration.clone() as Rc<dyn Registration>)
    }

    fn has_controller(&self) -> bool {
        self.controller.get()
    }
}

#[derive(Default)]
pub struct FakeTimers {
    pub intervals: RefCell<Vec<(Duration, Box<dyn FnMut()>)>>,
}

impl FakeTimers {
    pub fn tick_all(&self) {
        for (_, tick) in self.intervals.borrow_mut().iter_mut() {
            tick()
        }
    }
}

impl Timers for FakeTimers {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> Result {
        self.intervals.borrow_mut().push((period, tick));
        OK
    }
}

pub struct FakePrompt {
    pub prompted: Cell<usize>,
    pub choice: String,
}

impl FakePrompt {
    pub fn new(choice: &str) -> Rc<Self> {
        Rc::new(Self {
            prompted: Cell::new(0),
            choice: choice.to_owned(),
        })
    }
}

#[async_trait(?Send)]
impl DeferredPrompt for FakePrompt {
    fn prompt(&self) -> Result {
        self.prompted.set(self.prompted.get() + 1);
        OK
    }

    async fn user_choice(&self) -> Result<String> {
        Ok(self.choice.clone())
    }
}

#[derive(Default)]
pub struct FakeDisplay {
    pub standalone: Cell<bool>,
}

impl DisplayMode for FakeDisplay {
    fn is_standalone(&self) -> bool {
        self.standalone.get()
    }
}

#[derive(Default)]
pub struct FakeBody {
    pub children: RefCell<Vec<String>>,
    pub observer: RefCell<Option<Rc<dyn Fn()>>>,
    pub disconnected: Rc<Cell<bool>>,
}

impl FakeBody {
    pub fn with_children(children: &[&str]) -> Rc<Self> {
        let body = Self::default();
        *body.children.borrow_mut() = children.iter().map(|c| c.to_string()).collect();
        Rc::new(body)
    }

    /// Appends a node and notifies the observer like the browser would
    pub fn inject(&self, child: &str) {
        self.children.borrow_mut().push(child.to_owned());
        let observer = self.observer.borrow().clone();
        if let (Some(observer), false) = (observer, self.disconnected.get()) {
            observer()
        }
    }
}

impl DocumentBody for FakeBody {
    fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    fn remove_last_child(&self) -> Result {
        self.children.borrow_mut().pop();
        OK
    }

    fn observe_child_list(&self, on_mutation: Box<dyn Fn()>) -> Result<Box<dyn FnOnce()>> {
        *self.observer.borrow_mut() = Some(Rc::from(on_mutation));
        self.disconnected.set(false);
        let disconnected = self.disconnected.clone();
        Ok(Box::new(move || disconnected.set(true)))
    }
}

#[derive(Default)]
pub struct FakeLoaderView {
    pub labels: RefCell<Vec<String>>,
    pub ready: Cell<bool>,
    pub hidden: Cell<bool>,
}

impl LoaderView for FakeLoaderView {
    fn set_label(&self, text: &str) {
        self.labels.borrow_mut().push(text.to_owned());
    }

    fn mark_ready(&self) {
        self.ready.set(true);
    }

    fn hide(&self) {
        self.hidden.set(true);
    }
}

#[derive(Default)]
pub struct FakeRuntime {
    pub fail_with: Option<String>,
    pub instantiated_len: Cell<Option<usize>>,
    pub started: Rc<Cell<bool>>,
}

struct FakeInstance(Rc<Cell<bool>>);

impl ModuleInstance for FakeInstance {
    fn start(self: Box<Self>) -> Result {
        self.0.set(true);
        OK
    }
}

#[async_trait(?Send)]
impl ModuleRuntime for FakeRuntime {
    async fn instantiate(&self, module: Bytes) -> Result<Box<dyn ModuleInstance>> {
        self.instantiated_len.set(Some(module.len()));
        if let Some(err) = &self.fail_with {
            return Err(Error::Instantiate(err.clone()));
        }
        Ok(Box::new(FakeInstance(self.started.clone())))
    }
}
