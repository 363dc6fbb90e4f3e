use std::collections::HashSet;
use std::sync::{Mutex, PoisonError};
use tracing::warn;

#[derive(Debug, Default)]
struct Inner {
    seen: HashSet<String>,
    messages: Vec<String>,
}

/// Shared between all worlds of one run
#[derive(Debug, Default)]
pub struct Diagnostics {
    inner: Mutex<Inner>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always emit
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.lock().messages.push(message);
    }

    /// Emit only the first time `key` is seen this run
    pub fn warn_once(&self, key: &str, message: impl FnOnce() -> String) -> bool {
        let mut inner = self.lock();
        if !inner.seen.insert(key.to_string()) {
            return false;
        }
        let message = message();
        warn!("{}", message);
        inner.messages.push(message);
        true
    }

    /// Every message emitted so far, in order
    pub fn messages(&self) -> Vec<String> {
        self.lock().messages.clone()
    }

    pub fn count(&self) -> usize {
        self.lock().messages.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
