//! Pre/post change hooks
//!
//! Two observer lists owned by the ledger. The pre-change event is
//! cancellable: every subscriber is offered the event, then the cancellation
//! flag is read once. Post-change notification is informational only.
//! Subscriber lists are cloned out of their lock before dispatch, so no core
//! lock is held while subscriber code runs, and a panicking subscriber is
//! isolated from the mutation.

use crate::types::BalanceChange;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::error;

/// Cancellable event offered to pre-change subscribers
pub struct PreChangeEvent {
    /// The full change tuple with tentative balances
    pub change: BalanceChange,
    cancelled: AtomicBool,
}

impl PreChangeEvent {
    /// Wrap a change tuple
    pub fn new(change: BalanceChange) -> Self {
        Self {
            change,
            cancelled: AtomicBool::new(false),
        }
    }

    /// Request that the mutation be aborted
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether any subscriber requested cancellation
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Subscriber offered every mutation before it is applied
pub trait PreChangeHook: Send + Sync {
    /// Inspect the tentative change; call [`PreChangeEvent::cancel`] to abort
    fn on_pre_change(&self, event: &PreChangeEvent);
}

/// Subscriber notified after a mutation has been committed
pub trait PostChangeHook: Send + Sync {
    /// Receive the committed change tuple
    fn on_post_change(&self, change: &BalanceChange);
}

/// Observer lists for both hook kinds
#[derive(Default)]
pub struct HookBus {
    pre: RwLock<Vec<Arc<dyn PreChangeHook>>>,
    post: RwLock<Vec<Arc<dyn PostChangeHook>>>,
}

impl HookBus {
    /// Empty bus
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pre-change subscriber
    pub fn subscribe_pre(&self, hook: Arc<dyn PreChangeHook>) {
        match self.pre.write() {
            Ok(mut guard) => guard.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    /// Register a post-change subscriber
    pub fn subscribe_post(&self, hook: Arc<dyn PostChangeHook>) {
        match self.post.write() {
            Ok(mut guard) => guard.push(hook),
            Err(poisoned) => poisoned.into_inner().push(hook),
        }
    }

    /// Offer the change to every pre-change subscriber; true means cancelled
    pub fn dispatch_pre(&self, change: &BalanceChange) -> bool {
        let subscribers = match self.pre.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        if subscribers.is_empty() {
            return false;
        }

        let event = PreChangeEvent::new(change.clone());
        for hook in &subscribers {
            if catch_unwind(AssertUnwindSafe(|| hook.on_pre_change(&event))).is_err() {
                error!("pre-change subscriber panicked; skipping it");
            }
        }
        event.is_cancelled()
    }

    /// Notify every post-change subscriber of a committed change
    pub fn dispatch_post(&self, change: &BalanceChange) {
        let subscribers = match self.post.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        for hook in &subscribers {
            if catch_unwind(AssertUnwindSafe(|| hook.on_post_change(change))).is_err() {
                error!("post-change subscriber panicked; skipping it");
            }
        }
    }
}
