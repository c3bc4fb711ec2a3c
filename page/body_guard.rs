use super::*;

/// Active body observation, [`BodyGuard::dispose`] stops it
pub struct BodyGuard {
    _body: Rc<dyn DocumentBody>,
    disconnect: Box<dyn FnOnce()>,
}

impl BodyGuard {
    pub fn dispose(self) {
        (self.disconnect)()
    }
}

/// Keeps the body's direct children at the count it has now: nodes appended later by
/// extensions or third-party scripts are removed from the end as soon as they show up.
pub fn keep_body_clean(body: Rc<dyn DocumentBody>) -> Result<BodyGuard> {
    let baseline = body.child_count();
    let observed = Rc::downgrade(&body);
    let disconnect = body.observe_child_list(Box::new(move || {
        if let Some(body) = observed.upgrade() {
            trim_children(&*body, baseline);
        }
    }))?;
    Ok(BodyGuard {
        _body: body,
        disconnect,
    })
}

fn trim_children(body: &dyn DocumentBody, baseline: usize) -> usize {
    let mut removed = 0;
    while body.child_count() > baseline {
        if let Err(e) = body.remove_last_child() {
            warn!("failed to remove injected body node: {e}");
            break;
        }
        removed += 1;
    }
    if removed > 0 {
        debug!(removed, "removed injected body nodes");
    }
    removed
}
