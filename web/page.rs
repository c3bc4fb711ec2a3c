use super::*;
use crate::page::{LoaderPlatform, PagePlatform, PageSession, WasmLoader};
use js_sys::{Function, Object, Reflect, Uint8Array, WebAssembly};
use std::time::Duration;
use wasm_bindgen_futures::{future_to_promise, spawn_local};
use web_sys::{
    Document, Element, Event, HtmlElement, MutationObserver, MutationObserverInit,
    PushSubscriptionOptionsInit, ServiceWorkerRegistration, ServiceWorkerState, Window,
};

pub const LOADER_ID: &str = "app-wasm-loader";
pub const LOADER_ICON_ID: &str = "app-wasm-loader-icon";
pub const LOADER_LABEL_ID: &str = "app-wasm-loader-label";
pub const READY_ICON_CLASS: &str = "app-logo";

pub struct WebContainer(Option<web_sys::ServiceWorkerContainer>);

impl WebContainer {
    pub fn new(window: &Window) -> Self {
        let navigator = window.navigator();
        let supported = Reflect::has(&navigator, &"serviceWorker".into()).unwrap_or(false);
        Self(supported.then(|| navigator.service_worker()))
    }

    fn container(&self) -> Result<&web_sys::ServiceWorkerContainer> {
        self.0
            .as_ref()
            .ok_or_else(|| e!("service workers are not supported"))
    }
}

#[async_trait(?Send)]
impl ServiceWorkerContainer for WebContainer {
    fn is_supported(&self) -> bool {
        self.0.is_some()
    }

    async fn register(&self, url: &str) -> Result<Rc<dyn Registration>> {
        let registration = resolve(self.container()?.register(url)).await?;
        Ok(Rc::new(WebRegistration(registration.unchecked_into())))
    }

    async fn ready(&self) -> Result<Rc<dyn Registration>> {
        let registration = resolve(self.container()?.ready()?).await?;
        Ok(Rc::new(WebRegistration(registration.unchecked_into())))
    }

    fn has_controller(&self) -> bool {
        self.0
            .as_ref()
            .is_some_and(|container| container.controller().is_some())
    }
}

pub struct WebRegistration(ServiceWorkerRegistration);

fn worker_state(state: ServiceWorkerState) -> Option<WorkerState> {
    Some(match state {
        ServiceWorkerState::Parsed => WorkerState::Parsed,
        ServiceWorkerState::Installing => WorkerState::Installing,
        ServiceWorkerState::Installed => WorkerState::Installed,
        ServiceWorkerState::Activating => WorkerState::Activating,
        ServiceWorkerState::Activated => WorkerState::Activated,
        ServiceWorkerState::Redundant => WorkerState::Redundant,
        _ => return None,
    })
}

impl Registration for WebRegistration {
    fn on_installing_state_change(&self, callback: Box<dyn Fn(WorkerState)>) {
        let callback: Rc<dyn Fn(WorkerState)> = callback.into();
        let registration = self.0.clone();
        let watched = listen(&self.0, "updatefound", move |_: Event| {
            let Some(installing) = registration.installing() else {
                return;
            };
            let callback = callback.clone();
            let worker = installing.clone();
            let watched = listen(&installing, "statechange", move |_: Event| {
                if let Some(state) = worker_state(worker.state()) {
                    callback(state);
                }
            });
            if let Err(e) = watched {
                warn!("failed to watch installing worker: {e}");
            }
        });
        if let Err(e) = watched {
            warn!("failed to watch worker updates: {e}");
        }
    }

    fn update(&self) {
        let update = self.0.update();
        spawn_local(async move {
            let checked = match update {
                Ok(promise) => resolve(promise).await,
                Err(e) => Err(e.into()),
            };
            if let Err(e) = checked {
                warn!("worker update check failed: {e}");
            }
        });
    }

    fn push_manager(&self) -> Rc<dyn PushManager> {
        Rc::new(WebPushManager(self.0.clone()))
    }
}

pub struct WebPushManager(ServiceWorkerRegistration);

#[async_trait(?Send)]
impl PushManager for WebPushManager {
    async fn get_subscription(&self) -> Result<Option<PushSubscription>> {
        let subscription = resolve(self.0.push_manager()?.get_subscription()?).await?;
        if subscription.is_null() || subscription.is_undefined() {
            return Ok(None);
        }
        Ok(Some(from_js(&subscription)?))
    }

    async fn subscribe(&self, options: SubscribeOptions) -> Result<PushSubscription> {
        let init = Object::new();
        Reflect::set(&init, &"userVisibleOnly".into(), &options.user_visible_only.into())?;
        Reflect::set(
            &init,
            &"applicationServerKey".into(),
            &Uint8Array::from(&options.application_server_key[..]),
        )?;
        let init = init.unchecked_into::<PushSubscriptionOptionsInit>();
        let subscription = resolve(self.0.push_manager()?.subscribe_with_options(&init)?).await?;
        from_js(&subscription)
    }
}

pub struct WebTimers(Window);

impl Timers for WebTimers {
    fn set_interval(&self, period: Duration, tick: Box<dyn FnMut()>) -> Result {
        let closure = Closure::wrap(tick);
        let millis = i32::try_from(period.as_millis()).unwrap_or(i32::MAX);
        self.0
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis,
            )?;
        closure.forget();
        OK
    }
}

/// `beforeinstallprompt` event held for later
pub struct WebPrompt(Event);

#[async_trait(?Send)]
impl DeferredPrompt for WebPrompt {
    fn prompt(&self) -> Result {
        let prompt = Reflect::get(&self.0, &"prompt".into())?
            .dyn_into::<Function>()
            .map_err(|_| e!("install prompt event has no prompt()"))?;
        prompt.call0(&self.0)?;
        OK
    }

    async fn user_choice(&self) -> Result<String> {
        let choice = Reflect::get(&self.0, &"userChoice".into())?.unchecked_into::<Promise>();
        let choice = resolve(choice).await?;
        Reflect::get(&choice, &"outcome".into())?
            .as_string()
            .ok_or_else(|| e!("install prompt choice has no outcome"))
    }
}

pub struct WebDisplay(Window);

impl DisplayMode for WebDisplay {
    fn is_standalone(&self) -> bool {
        let standalone_media = matches!(
            self.0.match_media("(display-mode: standalone)"),
            Ok(Some(query)) if query.matches()
        );
        // iOS Safari only exposes navigator.standalone
        standalone_media
            || Reflect::get(&self.0.navigator(), &"standalone".into())
                .is_ok_and(|standalone| standalone.is_truthy())
    }
}

pub struct WebBody(HtmlElement);

impl DocumentBody for WebBody {
    fn child_count(&self) -> usize {
        self.0.children().length() as usize
    }

    fn remove_last_child(&self) -> Result {
        if let Some(last) = self.0.last_child() {
            self.0.remove_child(&last)?;
        }
        OK
    }

    fn observe_child_list(&self, on_mutation: Box<dyn Fn()>) -> Result<Box<dyn FnOnce()>> {
        let closure = Closure::wrap(on_mutation);
        let observer = MutationObserver::new(closure.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        observer.observe_with_options(&self.0, &init)?;
        Ok(Box::new(move || {
            observer.disconnect();
            drop(closure);
        }))
    }
}

/// Loader elements, missing ones are skipped
pub struct WebLoaderView {
    container: Option<Element>,
    icon: Option<Element>,
    label: Option<Element>,
}

impl WebLoaderView {
    pub fn new(document: &Document) -> Self {
        Self {
            container: document.get_element_by_id(LOADER_ID),
            icon: document.get_element_by_id(LOADER_ICON_ID),
            label: document.get_element_by_id(LOADER_LABEL_ID),
        }
    }
}

impl LoaderView for WebLoaderView {
    fn set_label(&self, text: &str) {
        if let Some(label) = &self.label {
            label.set_text_content(Some(text));
        }
    }

    fn mark_ready(&self) {
        if let Some(icon) = &self.icon {
            icon.set_class_name(READY_ICON_CLASS);
        }
    }

    fn hide(&self) {
        let container = self.container.as_ref();
        let Some(container) = container.and_then(|c| c.dyn_ref::<HtmlElement>()) else {
            return;
        };
        if let Err(e) = container.style().set_property("display", "none") {
            warn!("failed to hide the loader: {}", Error::from(e));
        }
    }
}

/// `WebAssembly.instantiate` with the given import object
pub struct WebRuntime {
    imports: Object,
}

#[async_trait(?Send)]
impl ModuleRuntime for WebRuntime {
    async fn instantiate(&self, module: Bytes) -> Result<Box<dyn ModuleInstance>> {
        let promise = WebAssembly::instantiate_buffer(&module, &self.imports);
        let result = resolve(promise)
            .await
            .map_err(|e| Error::Instantiate(e.to_string()))?;
        let instance = Reflect::get(&result, &"instance".into())?;
        Ok(Box::new(WebInstance(instance.unchecked_into())))
    }
}

pub struct WebInstance(WebAssembly::Instance);

/// Exports tried in order to start the app module
pub const START_EXPORTS: [&str; 2] = ["_start", "main"];

impl ModuleInstance for WebInstance {
    fn start(self: Box<Self>) -> Result {
        let exports = self.0.exports();
        for name in START_EXPORTS {
            if let Ok(start) = Reflect::get(&exports, &name.into())?.dyn_into::<Function>() {
                start.call0(&JsValue::UNDEFINED)?;
                return OK;
            }
        }
        Err(Error::Instantiate(format!(
            "app module exports none of {START_EXPORTS:?}"
        )))
    }
}

/// Handle returned to the page script
#[wasm_bindgen]
pub struct AppShell {
    session: Rc<PageSession>,
}

#[wasm_bindgen]
impl AppShell {
    pub fn is_installable(&self) -> bool {
        self.session.is_installable()
    }

    pub fn is_installed(&self) -> bool {
        self.session.is_installed()
    }

    /// Resolves to the user's choice, rejects when no prompt is held
    pub fn show_install_prompt(&self) -> Promise {
        let session = self.session.clone();
        future_to_promise(async move {
            let outcome = session.show_install_prompt().await?;
            Ok(outcome.into())
        })
    }

    pub fn getenv(&self, key: &str) -> Option<String> {
        self.session.getenv(key).map(str::to_owned)
    }

    /// Current push subscription as a plain object, `null` when there is none
    pub fn push_subscription(&self) -> std::result::Result<JsValue, JsValue> {
        match self.session.push_subscription() {
            Some(subscription) => Ok(to_js(&subscription)?),
            None => Ok(JsValue::NULL),
        }
    }

    pub fn set_on_update(&self, hook: Function) {
        self.session.on_update.set(js_hook(hook, "update"));
    }

    pub fn set_on_install_change(&self, hook: Function) {
        self.session
            .on_install_change
            .set(js_hook(hook, "install change"));
    }

    /// Removes nodes appended to the body from now on. Call it after the app mounted
    /// its own nodes.
    pub fn keep_body_clean(&self) -> std::result::Result<(), JsValue> {
        Ok(self.session.keep_body_clean()?)
    }

    /// Stops removing nodes appended to the body
    pub fn release_body(&self) {
        self.session.release_body()
    }
}

fn js_hook(hook: Function, name: &'static str) -> impl Fn() + 'static {
    move || {
        if let Err(e) = hook.call0(&JsValue::NULL) {
            error!("{name} hook failed: {}", Error::from(e));
        }
    }
}

/// Boots the page: registers the worker, sets up push, captures the install prompt
/// and streams the app module. The body is left alone until [`AppShell::keep_body_clean`].
/// `imports` is the import object the app module is instantiated with.
#[wasm_bindgen]
pub fn start_page(
    config_json: &str,
    imports: Option<Object>,
) -> std::result::Result<AppShell, JsValue> {
    init_tracing();
    let config: PageConfig = serde_json::from_str(config_json).map_err(Error::from)?;
    let window = web_sys::window().ok_or_else(|| e!("start_page needs a window"))?;
    let document = window
        .document()
        .ok_or_else(|| e!("start_page needs a document"))?;
    let network: Rc<dyn Network> = Rc::new(WebNetwork::new()?);

    let platform = PagePlatform {
        container: Rc::new(WebContainer::new(&window)),
        network: network.clone(),
        timers: Rc::new(WebTimers(window.clone())),
        display: Rc::new(WebDisplay(window.clone())),
        body: document
            .body()
            .map(|body| Rc::new(WebBody(body)) as Rc<dyn DocumentBody>),
    };
    let session = PageSession::new(config.clone(), platform);

    let captured = session.clone();
    listen(&window, "beforeinstallprompt", move |event: Event| {
        event.prevent_default();
        captured.capture_install_prompt(Rc::new(WebPrompt(event)));
    })?;
    let installed = session.clone();
    listen(&window, "appinstalled", move |_: Event| installed.app_installed())?;

    let started = session.clone();
    spawn_local(async move { started.start().await });

    let loader = WasmLoader::new(
        config,
        LoaderPlatform {
            network,
            view: Rc::new(WebLoaderView::new(&document)),
            runtime: Rc::new(WebRuntime {
                imports: imports.unwrap_or_else(Object::new),
            }),
        },
    );
    let user_agent = window.navigator().user_agent().unwrap_or_default();
    spawn_local(async move {
        loader.run(&user_agent).await;
    });

    Ok(AppShell { session })
}
