//! Per-document analysis caches.
//!
//! Every engine memoizes per node, keyed by the structural `(document,
//! node)` identity. Caches are append-only for the lifetime of a document
//! version; a reparse invalidates the whole document at once, never
//! individual entries.

use rill_ast::{DocumentId, NodeRef};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use tracing::debug;

/// An append-only memo table keyed by node identity.
pub struct NodeCache<V: Clone> {
    map: RefCell<FxHashMap<NodeRef, V>>,
}

impl<V: Clone> NodeCache<V> {
    pub fn new() -> Self {
        Self {
            map: RefCell::new(FxHashMap::default()),
        }
    }

    pub fn get(&self, key: NodeRef) -> Option<V> {
        self.map.borrow().get(&key).cloned()
    }

    pub fn insert(&self, key: NodeRef, value: V) {
        self.map.borrow_mut().insert(key, value);
    }

    /// Drops every entry belonging to `document`. Called by the host when
    /// the document is reparsed.
    pub fn invalidate_document(&self, document: DocumentId) {
        let mut map = self.map.borrow_mut();
        let before = map.len();
        map.retain(|key, _| key.document != document);
        debug!(
            document = document.0,
            dropped = before - map.len(),
            "invalidated analysis cache"
        );
    }

    pub fn len(&self) -> usize {
        self.map.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.borrow().is_empty()
    }
}

impl<V: Clone> Default for NodeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
