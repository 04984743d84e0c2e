//! Registry of inbound event names with scoped subscriptions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, instrument};

/// Names of inbound events someone is listening to.
///
/// Cheap to clone; all clones share one registry. Names are reference
/// counted so two subscriptions to the same name are independent.
#[derive(Debug, Clone, Default)]
pub struct Listeners {
    names: Arc<Mutex<HashMap<String, usize>>>,
}

impl Listeners {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, usize>> {
        self.names.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts listening for `name`. Listening stops when the guard drops.
    #[instrument(skip_all)]
    pub fn on(&self, name: impl Into<String>) -> Subscription {
        let name = name.into();
        *self.lock().entry(name.clone()).or_insert(0) += 1;
        debug!(name = %name, "Listener registered");
        Subscription {
            name,
            listeners: self.clone(),
        }
    }

    /// True while at least one subscription for `name` is alive.
    pub fn is_listening(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    /// Number of distinct names being listened to.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, name: &str) {
        let mut names = self.lock();
        if let Some(count) = names.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                names.remove(name);
                debug!(name, "Listener deregistered");
            }
        }
    }
}

/// Guard for one registered listener.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    listeners: Listeners,
}

impl Subscription {
    /// Event name this guard listens to.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.listeners.release(&self.name);
    }
}
