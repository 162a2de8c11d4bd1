//! Replicated key/value store contract.
//!
//! A replica exposes namespaces of JSON values. Every change to a namespace
//! is pushed to its listeners as the complete current key set; listeners
//! replace their view with it rather than merging. Writes merge the given keys
//! and reach other clients after an unspecified delay.

use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Weak};
use wunder_core::ReplicaError;

/// Full contents of a namespace, or a partial update to one.
pub type ReplicaSnapshot = BTreeMap<String, serde_json::Value>;

pub type SnapshotCallback = Box<dyn Fn(ReplicaSnapshot) + Send + Sync>;

pub trait ReplicaStore: Send + Sync {
    fn open(&self, namespace: &str) -> Result<Arc<dyn ReplicaHandle>, ReplicaError>;
}

/// An open namespace. Dropping the last reference detaches its listeners.
pub trait ReplicaHandle: Send + Sync {
    fn namespace(&self) -> &str;

    /// Receive the namespace contents now and after every change.
    fn on_snapshot(&self, callback: SnapshotCallback);

    /// Merge `partial` into the namespace; keys not named are left alone.
    fn update(&self, partial: ReplicaSnapshot) -> Result<(), ReplicaError>;
}

type Listener = Arc<dyn Fn(ReplicaSnapshot) + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    namespaces: BTreeMap<String, ReplicaSnapshot>,
    listeners: Vec<(u64, String, Listener)>,
    next_listener: u64,
    dirty: BTreeSet<String>,
    updates: Vec<(String, ReplicaSnapshot)>,
}

/// In-process replica.
///
/// Deliveries are queued and only happen on `flush`, which stands in for the
/// propagation delay of a real backend.
#[derive(Clone, Default)]
pub struct MemoryReplica {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryReplica {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver the current contents of every changed namespace to its
    /// listeners. Returns the number of callbacks made.
    pub fn flush(&self) -> usize {
        let deliveries: Vec<(Listener, ReplicaSnapshot)> = {
            let mut state = self.state.lock();
            let dirty = std::mem::take(&mut state.dirty);
            state
                .listeners
                .iter()
                .filter(|(_, namespace, _)| dirty.contains(namespace))
                .map(|(_, namespace, listener)| {
                    let contents = state.namespaces.get(namespace).cloned().unwrap_or_default();
                    (listener.clone(), contents)
                })
                .collect()
        };

        let count = deliveries.len();
        for (listener, snapshot) in deliveries {
            listener(snapshot);
        }
        count
    }

    /// Current contents of `namespace`.
    pub fn contents(&self, namespace: &str) -> ReplicaSnapshot {
        self.state
            .lock()
            .namespaces
            .get(namespace)
            .cloned()
            .unwrap_or_default()
    }

    /// Write on behalf of another client.
    pub fn set(&self, namespace: &str, key: &str, value: serde_json::Value) {
        let mut state = self.state.lock();
        state
            .namespaces
            .entry(namespace.to_string())
            .or_default()
            .insert(key.to_string(), value);
        state.dirty.insert(namespace.to_string());
    }

    /// Delete on behalf of another client. Returns whether the key existed.
    pub fn remove(&self, namespace: &str, key: &str) -> bool {
        let mut state = self.state.lock();
        let removed = state
            .namespaces
            .get_mut(namespace)
            .and_then(|contents| contents.remove(key))
            .is_some();
        if removed {
            state.dirty.insert(namespace.to_string());
        }
        removed
    }

    /// Every `update` made through a handle, oldest first.
    pub fn updates(&self) -> Vec<(String, ReplicaSnapshot)> {
        self.state.lock().updates.clone()
    }

    pub fn listener_count(&self, namespace: &str) -> usize {
        self.state
            .lock()
            .listeners
            .iter()
            .filter(|(_, ns, _)| ns == namespace)
            .count()
    }
}

impl ReplicaStore for MemoryReplica {
    fn open(&self, namespace: &str) -> Result<Arc<dyn ReplicaHandle>, ReplicaError> {
        Ok(Arc::new(MemoryHandle {
            state: Arc::downgrade(&self.state),
            namespace: namespace.to_string(),
            listeners: Mutex::new(Vec::new()),
        }))
    }
}

struct MemoryHandle {
    state: Weak<Mutex<MemoryState>>,
    namespace: String,
    listeners: Mutex<Vec<u64>>,
}

impl MemoryHandle {
    fn state(&self) -> Result<Arc<Mutex<MemoryState>>, ReplicaError> {
        self.state
            .upgrade()
            .ok_or_else(|| ReplicaError::Closed(self.namespace.clone()))
    }
}

impl ReplicaHandle for MemoryHandle {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn on_snapshot(&self, callback: SnapshotCallback) {
        let Ok(state) = self.state() else {
            return;
        };
        let mut state = state.lock();
        let id = state.next_listener;
        state.next_listener += 1;
        state
            .listeners
            .push((id, self.namespace.clone(), Arc::from(callback)));
        state.dirty.insert(self.namespace.clone());
        self.listeners.lock().push(id);
    }

    fn update(&self, partial: ReplicaSnapshot) -> Result<(), ReplicaError> {
        let state = self.state()?;
        let mut state = state.lock();
        state
            .namespaces
            .entry(self.namespace.clone())
            .or_default()
            .extend(partial.clone());
        state.updates.push((self.namespace.clone(), partial));
        state.dirty.insert(self.namespace.clone());
        Ok(())
    }
}

impl Drop for MemoryHandle {
    fn drop(&mut self) {
        let ids = std::mem::take(&mut *self.listeners.lock());
        if let Some(state) = self.state.upgrade() {
            state.lock().listeners.retain(|(id, _, _)| !ids.contains(id));
        }
    }
}
