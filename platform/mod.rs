//! Seams between the shell logic and browser APIs. The `web` module implements them with
//! `web-sys`, tests implement them in memory.

use crate::*;
use std::time::Duration;

mod messages;
pub use messages::*;

pub type Request = http::Request<Bytes>;
pub type Response = http::Response<Bytes>;

/// Shorthand for a bodyless GET request
pub fn get_request(url: &str) -> Result<Request> {
    Ok(http::Request::get(url).body(Bytes::new())?)
}

/// Whether a response with this status may carry a body. The Fetch standard rejects
/// any body, even an empty one, on 101, 103, 204, 205 and 304.
pub fn body_allowed(status: StatusCode) -> bool {
    !matches!(status.as_u16(), 101 | 103 | 204 | 205 | 304)
}

/// Response whose body arrives chunk by chunk
pub struct StreamingResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: LocalBoxStream<'static, Result<Bytes>>,
}

#[async_trait(?Send)]
pub trait Network {
    async fn fetch(&self, request: Request) -> Result<Response>;
    async fn fetch_streaming(&self, url: &str) -> Result<StreamingResponse>;
}

// --- worker context ---

#[async_trait(?Send)]
pub trait CacheStorage {
    async fn open(&self, name: &str) -> Result<Rc<dyn Cache>>;
    async fn keys(&self) -> Result<Vec<String>>;
    async fn delete(&self, name: &str) -> Result<bool>;
    /// Looks the request up across every cache
    async fn match_request(&self, request: &Request) -> Result<Option<Response>>;
}

#[async_trait(?Send)]
pub trait Cache {
    /// Fetches and stores every url, fails as a whole if any of the fetches fails
    async fn add_all(&self, urls: &[String]) -> Result;
}

/// Global scope of the running worker
#[async_trait(?Send)]
pub trait WorkerScope {
    async fn skip_waiting(&self) -> Result;
    async fn show_notification(&self, title: &str, options: &NotificationOptions) -> Result;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientQuery {
    pub include_uncontrolled: bool,
    pub windows_only: bool,
}

#[async_trait(?Send)]
pub trait Clients {
    async fn match_all(&self, query: ClientQuery) -> Result<Vec<Rc<dyn Client>>>;
    fn can_open_window(&self) -> bool;
    /// Resolves once the new client is ready, `None` if the browser didn't give a handle
    async fn open_window(&self, url: &str) -> Result<Option<Rc<dyn Client>>>;
}

#[async_trait(?Send)]
pub trait Client {
    fn post_message(&self, message: &ClientMessage) -> Result;
    fn can_focus(&self) -> bool;
    async fn focus(&self) -> Result;
}

pub trait Notification {
    fn close(&self);
}

// --- page context ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[async_trait(?Send)]
pub trait ServiceWorkerContainer {
    fn is_supported(&self) -> bool;
    async fn register(&self, url: &str) -> Result<Rc<dyn Registration>>;
    async fn ready(&self) -> Result<Rc<dyn Registration>>;
    /// Whether some worker already controls the page
    fn has_controller(&self) -> bool;
}

pub trait Registration {
    /// Reports every state the newly installing worker moves through
    fn on_installing_state_change(&self, callback: Box<dyn Fn(WorkerState)>);
    /// Asks the browser to re-check the worker script, fire and forget
    fn update(&self);
    fn push_manager(&self) -> Rc<dyn PushManager>;
}

#[async_trait(?Send)]
pub trait PushManager {
    async fn get_subscription(&self) -> Result<Option<PushSubscription>>;
    async fn subscribe(&self, options: SubscribeOptions) -> Result<PushSubscription>;
}

pub trait Timers {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> Result;
}

/// Captured `beforeinstallprompt` event
#[async_trait(?Send)]
pub trait DeferredPrompt {
    fn prompt(&self) -> Result;
    /// Outcome chosen by the user, like `accepted` or `dismissed`
    async fn user_choice(&self) -> Result<String>;
}

pub trait DisplayMode {
    fn is_standalone(&self) -> bool;
}

pub trait DocumentBody {
    fn child_count(&self) -> usize;
    fn remove_last_child(&self) -> Result;
    /// Starts observing direct children, returns the disconnect callback
    fn observe_child_list(&self, on_mutation: Box<dyn Fn()>) -> Result<Box<dyn FnOnce()>>;
}

/// Loader element with its icon and label
pub trait LoaderView {
    fn set_label(&self, text: &str);
    fn mark_ready(&self);
    fn hide(&self);
}

#[async_trait(?Send)]
pub trait ModuleRuntime {
    async fn instantiate(&self, module: Bytes) -> Result<Box<dyn ModuleInstance>>;
}

pub trait ModuleInstance {
    fn start(self: Box<Self>) -> Result;
}
