//! Scoped control-plane session: logged in on creation, logged out on drop.

use std::ops::Deref;

use tracing::debug;

use crate::application::ports::PlatformSession;

/// Owns a logged-in session for the duration of one gateway call.
///
/// Every exit path of the call, early `?` returns included, drops the guard
/// and therefore logs out.
pub struct Session<S: PlatformSession> {
    inner: S,
    scope: String,
}

impl<S: PlatformSession> Session<S> {
    pub(crate) fn new(inner: S, scope: String) -> Self {
        debug!(scope = %scope, "control-plane session opened");
        Self { inner, scope }
    }
}

impl<S: PlatformSession> Deref for Session<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.inner
    }
}

impl<S: PlatformSession> Drop for Session<S> {
    fn drop(&mut self) {
        self.inner.logout();
        debug!(scope = %self.scope, "control-plane session closed");
    }
}
