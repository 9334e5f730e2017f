//! Keyed debounce timers
//!
//! Each key holds at most one pending action. Scheduling on a key that
//! already has a timer cancels the old one, so a burst of edits collapses to
//! a single execution carrying the last call's payload. Keys are
//! independent; different keys may fire concurrently.
//!
//! Dropping the last `Debouncer` handle aborts every outstanding timer;
//! timer tasks hold only weak references and never keep the map alive.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

struct Entry {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    entries: Mutex<HashMap<String, Entry>>,
    generations: AtomicU64,
}

impl Drop for Inner {
    fn drop(&mut self) {
        for (_, entry) in lock(&self.entries).drain() {
            entry.handle.abort();
        }
    }
}

#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<Inner>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Cancel any pending timer for `key` and start a new one
    ///
    /// When the delay elapses the action runs exactly once and the pending
    /// slot is cleared (before the action, so the action may reschedule).
    pub fn schedule<F>(&self, key: &str, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.inner.generations.fetch_add(1, Ordering::Relaxed);
        let task_key = key.to_string();
        let weak = Arc::downgrade(&self.inner);

        let handle = tokio::spawn({
            let key = task_key.clone();
            async move {
                tokio::time::sleep(delay).await;
                // All handles dropped while we slept: teardown, do nothing
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                // Clear our own slot unless a newer schedule replaced it
                {
                    let mut map = lock(&inner.entries);
                    if map.get(&key).is_some_and(|e| e.generation == generation) {
                        map.remove(&key);
                    }
                }
                drop(inner);
                action.await;
            }
        });

        let mut map = lock(&self.inner.entries);
        if let Some(old) = map.insert(task_key, Entry { generation, handle }) {
            old.handle.abort();
        }
    }

    /// Abort the pending timer for `key` without running its action
    pub fn cancel(&self, key: &str) {
        if let Some(entry) = lock(&self.inner.entries).remove(key) {
            entry.handle.abort();
        }
    }

    /// Abort every pending timer; used on teardown
    pub fn cancel_all(&self) {
        let mut map = lock(&self.inner.entries);
        let count = map.len();
        for (_, entry) in map.drain() {
            entry.handle.abort();
        }
        if count > 0 {
            debug!(cancelled = count, "debounce timers cancelled");
        }
    }

    /// Number of timers currently pending
    pub fn pending(&self) -> usize {
        lock(&self.inner.entries).len()
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<'a>(entries: &'a Mutex<HashMap<String, Entry>>) -> MutexGuard<'a, HashMap<String, Entry>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
