//! The cross-resource lock serialising multi-component sequences.
//!
//! Connection updates and deletes touch three components (the connection
//! and both endpoints). Two such sequences interleaving can restart an
//! endpoint another sequence just stopped, so they are serialised behind one
//! lock. The lock is injected, which lets tests observe acquisition order.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

#[cfg(any(test, feature = "test-utils"))]
use parking_lot::Mutex;

/// A mutual-exclusion domain for multi-component operations.
#[async_trait]
pub trait CrossResourceLock: Send + Sync {
    /// Wait for the lock. It is held until the guard is dropped.
    async fn acquire(&self, operation: &'static str) -> LockGuard;
}

/// Holds a [`CrossResourceLock`] until dropped.
pub struct LockGuard {
    on_release: Option<Box<dyn FnOnce() + Send>>,
    _held: Box<dyn Send>,
}

impl LockGuard {
    /// Wrap whatever keeps the lock held.
    #[must_use]
    pub fn new(held: impl Send + 'static) -> Self {
        Self {
            on_release: None,
            _held: Box::new(held),
        }
    }

    /// Run `callback` just before the lock is released.
    #[must_use]
    pub fn on_release(mut self, callback: impl FnOnce() + Send + 'static) -> Self {
        self.on_release = Some(Box::new(callback));
        self
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Some(callback) = self.on_release.take() {
            callback();
        }
    }
}

impl fmt::Debug for LockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockGuard").finish_non_exhaustive()
    }
}

/// A lock shared by everything in this process.
#[derive(Debug, Clone, Default)]
pub struct ProcessLock {
    inner: Arc<tokio::sync::Mutex<()>>,
}

impl ProcessLock {
    /// Create an unlocked lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CrossResourceLock for ProcessLock {
    async fn acquire(&self, operation: &'static str) -> LockGuard {
        let held = Arc::clone(&self.inner).lock_owned().await;
        tracing::trace!(operation, "Acquired cross-resource lock");
        LockGuard::new(held).on_release(move || {
            tracing::trace!(operation, "Released cross-resource lock");
        })
    }
}

/// A lock event observed by [`RecordingLock`].
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockEvent {
    /// The named operation acquired the lock.
    Acquired(&'static str),
    /// The named operation released the lock.
    Released(&'static str),
}

/// A [`ProcessLock`] that records acquire and release order.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Default)]
pub struct RecordingLock {
    inner: ProcessLock,
    events: Arc<Mutex<Vec<LockEvent>>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl RecordingLock {
    /// Create a recording lock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<LockEvent> {
        self.events.lock().clone()
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl CrossResourceLock for RecordingLock {
    async fn acquire(&self, operation: &'static str) -> LockGuard {
        let guard = self.inner.acquire(operation).await;
        self.events.lock().push(LockEvent::Acquired(operation));

        let events = Arc::clone(&self.events);
        LockGuard::new(guard).on_release(move || {
            events.lock().push(LockEvent::Released(operation));
        })
    }
}
