//! Guarded lazy handles with explicit teardown.
//!
//! A [`LazySlot`] holds one shared handle (a model client, the loaded index,
//! the assembled QA chain) and moves through
//! `Uninitialized → Ready → Invalidated → Ready`. Construction runs under a
//! `tokio::sync::Mutex`, so concurrent first callers build the handle once.
//! Callers receive an `Arc` clone: a request that started before
//! [`invalidate`](LazySlot::invalidate) finishes against the old handle.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::Result;

/// Observable state of a [`LazySlot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Never built.
    Uninitialized,
    /// Holding a live handle.
    Ready,
    /// Torn down; the next access rebuilds.
    Invalidated,
}

enum Slot<T: ?Sized> {
    Uninitialized,
    Ready(Arc<T>),
    Invalidated,
}

/// A lazily built, resettable shared handle.
pub struct LazySlot<T: ?Sized> {
    name: &'static str,
    slot: Mutex<Slot<T>>,
}

impl<T: ?Sized> LazySlot<T> {
    /// Create an empty slot. `name` is used in log events.
    pub fn new(name: &'static str) -> Self {
        Self { name, slot: Mutex::new(Slot::Uninitialized) }
    }

    /// Return the cached handle, building it with `init` if necessary.
    ///
    /// The lock is held while `init` runs. `init` must not access this same
    /// slot.
    ///
    /// # Errors
    ///
    /// Propagates the error from `init`; the slot keeps its previous state.
    pub async fn get_or_try_init<F, Fut>(&self, init: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Arc<T>>>,
    {
        let mut slot = self.slot.lock().await;
        if let Slot::Ready(value) = &*slot {
            return Ok(Arc::clone(value));
        }
        debug!(slot = self.name, "initializing");
        let value = init().await?;
        *slot = Slot::Ready(Arc::clone(&value));
        Ok(value)
    }

    /// Replace the cached handle unconditionally.
    pub async fn set(&self, value: Arc<T>) {
        *self.slot.lock().await = Slot::Ready(value);
    }

    /// Drop the cached handle. Idempotent.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        if matches!(*slot, Slot::Ready(_)) {
            debug!(slot = self.name, "invalidated");
            *slot = Slot::Invalidated;
        }
    }

    /// The current state.
    pub async fn state(&self) -> SlotState {
        match &*self.slot.lock().await {
            Slot::Uninitialized => SlotState::Uninitialized,
            Slot::Ready(_) => SlotState::Ready,
            Slot::Invalidated => SlotState::Invalidated,
        }
    }
}
