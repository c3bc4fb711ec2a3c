use super::*;

/// A worker reaching `installed` is an update only when another one already controls the page
pub fn is_update(state: WorkerState, has_controller: bool) -> bool {
    state == WorkerState::Installed && has_controller
}

impl PageSession {
    /// Registers the worker script, watches for updates and schedules update polling
    pub async fn register_worker(&self) -> Result<Rc<dyn Registration>> {
        let container = self.platform.container.clone();
        let registration = container.register(&self.config.worker_url).await?;
        info!("registering app service worker");

        let on_update = self.on_update.clone();
        registration.on_installing_state_change(Box::new(move |state| {
            if is_update(state, container.has_controller()) {
                debug!("new app worker installed");
                on_update.fire();
            }
        }));

        if let Some(period) = self.config.auto_update_interval() {
            let polled = registration.clone();
            self.platform
                .timers
                .set_interval(period, Box::new(move || polled.update()))?;
        }
        Ok(registration)
    }
}
