use sse::lifecycle::{CloseHook, SubscriptionRequest};

/// An accepted `GET /sse/events` request while its connection is being set up.
pub(crate) struct Subscription {
    pub(crate) user_key: String,
    close_hooks: Vec<CloseHook>,
}

impl Subscription {
    pub(crate) fn new(user_key: String) -> Self {
        Self {
            user_key,
            close_hooks: Vec::new(),
        }
    }

    /// Hand the close hooks to a guard that lives as long as the response body.
    pub(crate) fn into_close_guard(self) -> CloseGuard {
        CloseGuard {
            hooks: self.close_hooks,
        }
    }
}

impl SubscriptionRequest for Subscription {
    fn on_close(&mut self, hook: CloseHook) {
        self.close_hooks.push(hook);
    }
}

/// Runs the close hooks when dropped.
///
/// Axum drops the response body once the client goes away or the stream ends,
/// so whatever owns the body stream owns this guard.
pub(crate) struct CloseGuard {
    hooks: Vec<CloseHook>,
}

impl Drop for CloseGuard {
    fn drop(&mut self) {
        for hook in self.hooks.drain(..) {
            hook();
        }
    }
}
