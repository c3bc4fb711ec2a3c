//! Page side: worker registration, push subscription, install prompt, body guard and the
//! streamed app module loader.

use crate::*;

mod body_guard;
pub mod env;
mod install;
mod loader;
mod push;
mod registration;

pub use body_guard::*;
pub use env::Environment;
pub use loader::*;
pub use push::*;
pub use registration::*;

/// Browser objects the page session talks to
#[derive(Clone)]
pub struct PagePlatform {
    pub container: Rc<dyn ServiceWorkerContainer>,
    pub network: Rc<dyn Network>,
    pub timers: Rc<dyn Timers>,
    pub display: Rc<dyn DisplayMode>,
    /// `None` when the document has no body
    pub body: Option<Rc<dyn DocumentBody>>,
}

/// User-overridable callback, a no-op until set
pub struct Hook(RefCell<Rc<dyn Fn()>>);

impl Hook {
    fn new() -> Rc<Self> {
        Rc::new(Self(RefCell::new(Rc::new(|| {}))))
    }

    pub fn set(&self, hook: impl Fn() + 'static) {
        *self.0.borrow_mut() = Rc::new(hook);
    }

    pub fn fire(&self) {
        // clone first so the hook may replace itself
        let hook = self.0.borrow().clone();
        hook()
    }
}

/// State of one loaded document: the deferred install prompt, the current push
/// subscription and the hooks apps override.
pub struct PageSession {
    config: PageConfig,
    platform: PagePlatform,
    deferred_prompt: RefCell<Option<Rc<dyn DeferredPrompt>>>,
    push_subscription: RefCell<Option<PushSubscription>>,
    body_guard: RefCell<Option<BodyGuard>>,
    /// Fires when a new worker got installed while an old one still controls the page
    pub on_update: Rc<Hook>,
    /// Fires when the app becomes installable or gets installed
    pub on_install_change: Rc<Hook>,
}

impl PageSession {
    pub fn new(config: PageConfig, platform: PagePlatform) -> Rc<Self> {
        Rc::new(Self {
            config,
            platform,
            deferred_prompt: RefCell::new(None),
            push_subscription: RefCell::new(None),
            body_guard: RefCell::new(None),
            on_update: Hook::new(),
            on_install_change: Hook::new(),
        })
    }

    pub fn config(&self) -> &PageConfig {
        &self.config
    }

    pub fn getenv(&self, key: &str) -> Option<&str> {
        self.config.env.get(key)
    }

    pub fn push_subscription(&self) -> Option<PushSubscription> {
        self.push_subscription.borrow().clone()
    }

    /// Removes nodes appended to the body from now on. Apps call it once their own
    /// nodes are mounted, calling it again takes the current children as the new baseline.
    pub fn keep_body_clean(&self) -> Result {
        let body = self
            .platform
            .body
            .clone()
            .ok_or_else(|| e!("document has no body to keep clean"))?;
        self.release_body();
        let guard = body_guard::keep_body_clean(body)?;
        *self.body_guard.borrow_mut() = Some(guard);
        OK
    }

    /// Stops removing nodes appended to the body
    pub fn release_body(&self) {
        if let Some(guard) = self.body_guard.borrow_mut().take() {
            guard.dispose();
        }
    }

    /// Registers the worker and sets up push concurrently, logging failures
    pub async fn start(&self) {
        if !self.platform.container.is_supported() {
            warn!("service workers are not supported, running without offline mode");
            return;
        }
        let registration = async {
            if let Err(e) = self.register_worker().await {
                error!("offline service worker registration failed: {e}");
            }
        };
        let push = async {
            if !self.config.push_enabled() {
                return;
            }
            if let Err(e) = self.setup_push().await {
                error!("push subscription setup failed: {e}");
            }
        };
        futures::join!(registration, push);
    }
}
