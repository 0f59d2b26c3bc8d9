// Collapse an expanded element when the pointer is released outside it

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use super::document::{Document, ListenerHandle, NodeId};

/// Mutable reference to one element, empty until attached
#[derive(Debug, Clone, Default)]
pub struct NodeRef(Arc<RwLock<Option<NodeId>>>);

impl NodeRef {
    pub fn attach(&self, node: NodeId) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = Some(node);
    }

    pub fn get(&self) -> Option<NodeId> {
        *self.0.read().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Expanded flag that drops back to false on an outside pointer release
///
/// Listening starts on `mount` and stops when the toggle is dropped.
pub struct ClickOutsideToggle {
    expanded: Arc<AtomicBool>,
    node: NodeRef,
    _listener: ListenerHandle,
}

impl ClickOutsideToggle {
    pub fn mount(document: &Arc<Document>) -> Self {
        let expanded = Arc::new(AtomicBool::new(false));
        let node = NodeRef::default();

        // Weak: the document owns this listener
        let listener = {
            let expanded = Arc::clone(&expanded);
            let node = node.clone();
            let weak = Arc::downgrade(document);

            document.on_pointer_up(move |target| {
                let (Some(doc), Some(own)) = (weak.upgrade(), node.get()) else {
                    return;
                };
                if !doc.contains(own, target) {
                    expanded.store(false, Ordering::SeqCst);
                }
            })
        };

        Self {
            expanded,
            node,
            _listener: listener,
        }
    }

    pub fn expanded(&self) -> bool {
        self.expanded.load(Ordering::SeqCst)
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.expanded.store(expanded, Ordering::SeqCst);
    }

    /// The reference to attach to the element being toggled
    pub fn node_ref(&self) -> &NodeRef {
        &self.node
    }
}
