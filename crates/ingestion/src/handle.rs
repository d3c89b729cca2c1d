//! Cross-thread control of a running session

use std::net::{Shutdown, TcpStream};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::SessionState;
use tracing::debug;

/// Shared handle to a [`StreamSession`](crate::StreamSession).
///
/// Cancelling closes the session's live socket, so a read blocked inside the
/// session returns immediately, and wakes a pending reconnect delay. The
/// session notices the flag at the top of its next loop iteration.
#[derive(Debug, Clone, Default)]
pub struct SessionHandle {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    wake: Condvar,
    socket: Mutex<Option<TcpStream>>,
    state: Mutex<SessionState>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the session to stop
    pub fn cancel(&self) {
        *lock(&self.inner.cancelled) = true;
        self.inner.wake.notify_all();

        if let Some(socket) = lock(&self.inner.socket).take() {
            debug!("closing socket for cancellation");
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *lock(&self.inner.cancelled)
    }

    /// Current lifecycle state of the session
    pub fn state(&self) -> SessionState {
        *lock(&self.inner.state)
    }

    pub(crate) fn set_state(&self, state: SessionState) {
        *lock(&self.inner.state) = state;
    }

    /// Register the live socket so `cancel` can close it
    pub(crate) fn attach(&self, stream: &TcpStream) -> std::io::Result<()> {
        let clone = stream.try_clone()?;
        let mut slot = lock(&self.inner.socket);
        // cancel() raced ahead of us and found an empty slot
        if self.is_cancelled() {
            let _ = clone.shutdown(Shutdown::Both);
            return Ok(());
        }
        *slot = Some(clone);
        Ok(())
    }

    pub(crate) fn detach(&self) {
        lock(&self.inner.socket).take();
    }

    /// Sleep up to `timeout`; returns true if cancelled meanwhile
    pub(crate) fn wait_cancelled(&self, timeout: Duration) -> bool {
        let guard = lock(&self.inner.cancelled);
        let (guard, _) = self
            .inner
            .wake
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }
}
