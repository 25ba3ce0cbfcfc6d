//! Cooperative cancellation.
//!
//! A running extraction holds a [`CancelToken`] and checks it between cycles.
//! Callers cancel by task identifier through a [`TaskRegistry`]. In-flight
//! waits are never interrupted.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Task identifier → cancellation token.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: Mutex<HashMap<String, CancelToken>>,
}

impl TaskRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for a new task. Re-registering an id replaces its token.
    pub fn register(&self, task_id: impl Into<String>) -> CancelToken {
        let token = CancelToken::new();
        self.lock().insert(task_id.into(), token.clone());
        token
    }

    /// Mark `task_id` cancelled. Returns `false` for unknown tasks.
    pub fn cancel(&self, task_id: &str) -> bool {
        match self.lock().get(task_id) {
            Some(token) => {
                token.cancel();
                debug!(task_id, "cancel: task marked cancelled");
                true
            }
            None => false,
        }
    }

    /// Forget a finished task.
    pub fn finish(&self, task_id: &str) {
        self.lock().remove(task_id);
    }

    #[must_use]
    pub fn is_running(&self, task_id: &str) -> bool {
        self.lock().contains_key(task_id)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CancelToken>> {
        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
