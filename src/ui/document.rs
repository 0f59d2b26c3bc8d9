// Headless document model
// Element tree for containment checks and pointer-release listeners

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Identifier of an element in a `Document`
pub type NodeId = u64;

type Listener = Arc<dyn Fn(NodeId) + Send + Sync>;
type Listeners = DashMap<u64, Listener>;

/// A tree of elements that dispatches pointer-release events
pub struct Document {
    /// Child -> parent
    parents: DashMap<NodeId, NodeId>,
    next_node: AtomicU64,

    listeners: Arc<Listeners>,
    next_listener: AtomicU64,
}

impl Document {
    /// The root element every other node hangs off
    pub const ROOT: NodeId = 0;

    pub fn new() -> Self {
        Self {
            parents: DashMap::new(),
            next_node: AtomicU64::new(Self::ROOT + 1),
            listeners: Arc::new(DashMap::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    /// Append a new element under `parent`
    pub fn create_element(&self, parent: NodeId) -> NodeId {
        let id = self.next_node.fetch_add(1, Ordering::Relaxed);
        self.parents.insert(id, parent);
        id
    }

    /// True if `node` is `ancestor` or sits anywhere below it
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match self.parents.get(&current) {
                Some(parent) => current = *parent,
                None => return false,
            }
        }
    }

    /// Listen for pointer releases anywhere in the document
    /// The listener stays registered until the returned handle is dropped.
    pub fn on_pointer_up<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn(NodeId) + Send + Sync + 'static,
    {
        let id = self.next_listener.fetch_add(1, Ordering::Relaxed);
        self.listeners.insert(id, Arc::new(listener));

        ListenerHandle {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    /// Dispatch a pointer release on `target` to every listener
    pub fn pointer_up(&self, target: NodeId) {
        let listeners: Vec<Listener> = self
            .listeners
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        for listener in listeners {
            listener(target);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes its listener from the document when dropped
pub struct ListenerHandle {
    id: u64,
    listeners: Weak<Listeners>,
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            listeners.remove(&self.id);
        }
    }
}
