use super::*;

impl PageSession {
    /// Holds the browser's `beforeinstallprompt` event for a later [`Self::show_install_prompt`]
    pub fn capture_install_prompt(&self, prompt: Rc<dyn DeferredPrompt>) {
        *self.deferred_prompt.borrow_mut() = Some(prompt);
        self.on_install_change.fire();
    }

    /// Reacts to `appinstalled`
    pub fn app_installed(&self) {
        self.deferred_prompt.borrow_mut().take();
        self.on_install_change.fire();
    }

    pub fn is_installed(&self) -> bool {
        self.platform.display.is_standalone()
    }

    pub fn is_installable(&self) -> bool {
        !self.is_installed() && self.deferred_prompt.borrow().is_some()
    }

    /// Replays the deferred prompt and waits for the user's answer. The prompt can be shown
    /// once, so the reference is dropped whatever the outcome.
    pub async fn show_install_prompt(&self) -> Result<String> {
        let prompt = self
            .deferred_prompt
            .borrow()
            .clone()
            .ok_or(Error::NoDeferredPrompt)?;
        let choice = match prompt.prompt() {
            Ok(()) => prompt.user_choice().await,
            Err(e) => Err(e),
        };
        self.deferred_prompt.borrow_mut().take();
        let choice = choice?;
        debug!(outcome = %choice, "install prompt answered");
        Ok(choice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::tests::fixture;
    use crate::testing::*;
    use std::cell::Cell;

    #[test]
    fn installable_only_with_prompt_and_not_installed() {
        let f = fixture(PageConfig::default());
        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        f.session
            .on_install_change
            .set(move || counter.set(counter.get() + 1));

        assert!(!f.session.is_installable());
        f.session.capture_install_prompt(FakePrompt::new("accepted"));
        assert!(f.session.is_installable());
        assert_eq!(changes.get(), 1);

        f.display.standalone.set(true);
        assert!(f.session.is_installed());
        assert!(!f.session.is_installable());
    }

    #[test]
    fn prompt_is_single_use() {
        let f = fixture(PageConfig::default());
        let prompt = FakePrompt::new("dismissed");
        f.session.capture_install_prompt(prompt.clone());

        let choice = block_on(f.session.show_install_prompt()).unwrap();

        assert_eq!(choice, "dismissed");
        assert_eq!(prompt.prompted.get(), 1);
        assert!(!f.session.is_installable());
        assert!(matches!(
            block_on(f.session.show_install_prompt()),
            Err(Error::NoDeferredPrompt)
        ));
    }

    #[test]
    fn app_installed_clears_prompt() {
        let f = fixture(PageConfig::default());
        let changes = Rc::new(Cell::new(0));
        let counter = changes.clone();
        f.session
            .on_install_change
            .set(move || counter.set(counter.get() + 1));

        f.session.capture_install_prompt(FakePrompt::new("accepted"));
        f.session.app_installed();

        assert!(!f.session.is_installable());
        assert_eq!(changes.get(), 2);
    }
}
