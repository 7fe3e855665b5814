//! Per-document node arenas and the workspace of documents.
//!
//! Nodes are stored in a flat `Vec` per document and addressed by
//! [`NodeId`]; a [`NodeRef`] pairs a node with its owning [`DocumentId`] and
//! is the stable, structurally comparable identity every cache and analysis
//! keys on. Trees are immutable once a document is inserted; a reparse
//! replaces the whole document under the same id.

use crate::builtins::BuiltinRegistry;
use crate::node::{Node, NodeKind};
use rill_common::{Atom, Interner};
use std::sync::Arc;

/// Identity of a document within a [`Workspace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub u32);

impl DocumentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a node within its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Stable identity of a node across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    pub document: DocumentId,
    pub node: NodeId,
}

impl NodeRef {
    #[inline]
    pub fn new(document: DocumentId, node: NodeId) -> Self {
        Self { document, node }
    }
}

/// One parsed file: an arena of linked nodes rooted at a module declaration.
#[derive(Debug, Clone)]
pub struct Document {
    pub id: DocumentId,
    pub uri: Atom,
    /// Qualified package name, duplicated from the root module for cheap
    /// visibility checks.
    pub package: Atom,
    nodes: Vec<Node>,
    root: NodeId,
}

impl Document {
    pub(crate) fn new(id: DocumentId, uri: Atom, package: Atom, nodes: Vec<Node>, root: NodeId) -> Self {
        Self {
            id,
            uri,
            package,
            nodes,
            root,
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// The set of documents the analyses operate on, plus the builtins registry.
///
/// Document 0 is always the synthetic builtins document.
pub struct Workspace {
    interner: Arc<Interner>,
    documents: Vec<Document>,
    builtins: BuiltinRegistry,
}

impl Workspace {
    /// Creates a workspace containing only the builtins document.
    pub fn new() -> Self {
        let interner = Arc::new(Interner::new());
        let (document, builtins) = BuiltinRegistry::bootstrap(&interner);
        Self {
            interner,
            documents: vec![document],
            builtins,
        }
    }

    #[inline]
    pub fn interner(&self) -> &Arc<Interner> {
        &self.interner
    }

    #[inline]
    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    /// Interns `text` through the workspace interner.
    #[inline]
    pub fn atom(&self, text: &str) -> Atom {
        self.interner.intern(text)
    }

    /// The id the next inserted document will receive.
    #[inline]
    pub fn next_document_id(&self) -> DocumentId {
        DocumentId(self.documents.len() as u32)
    }

    /// Inserts a finished document. Its id must be the one handed out by
    /// [`next_document_id`](Self::next_document_id) at build time.
    pub fn insert(&mut self, document: Document) -> DocumentId {
        debug_assert_eq!(document.id, self.next_document_id());
        let id = document.id;
        self.documents.push(document);
        id
    }

    /// Replaces a document after a reparse. The caller is responsible for
    /// invalidating the per-document analysis caches.
    pub fn replace(&mut self, document: Document) {
        let slot = document.id.index();
        debug_assert!(slot < self.documents.len());
        debug_assert_ne!(document.id, self.builtins.document);
        self.documents[slot] = document;
    }

    #[inline]
    pub fn document(&self, id: DocumentId) -> &Document {
        &self.documents[id.index()]
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.documents.iter()
    }

    // -----------------------------------------------------------------------
    // Node access
    // -----------------------------------------------------------------------

    #[inline]
    pub fn node(&self, node: NodeRef) -> &Node {
        self.document(node.document).node(node.node)
    }

    #[inline]
    pub fn kind(&self, node: NodeRef) -> &NodeKind {
        &self.node(node).kind
    }

    /// Resolves a document-local [`NodeId`] against the document of `base`.
    #[inline]
    pub fn sibling(&self, base: NodeRef, node: NodeId) -> NodeRef {
        NodeRef::new(base.document, node)
    }

    pub fn parent(&self, node: NodeRef) -> Option<NodeRef> {
        self.node(node)
            .parent
            .map(|parent| NodeRef::new(node.document, parent))
    }

    /// Index of the node within the child list it was attached under.
    #[inline]
    pub fn container_index(&self, node: NodeRef) -> usize {
        self.node(node).container_index as usize
    }

    /// Ancestors of `node`, nearest first, excluding `node` itself.
    pub fn ancestors(&self, node: NodeRef) -> impl Iterator<Item = NodeRef> + '_ {
        std::iter::successors(self.parent(node), move |current| self.parent(*current))
    }

    /// The nearest strict ancestor matching `predicate`.
    pub fn enclosing(
        &self,
        node: NodeRef,
        predicate: impl Fn(&NodeKind) -> bool,
    ) -> Option<NodeRef> {
        self.ancestors(node).find(|it| predicate(self.kind(*it)))
    }

    /// `node` itself if it matches `predicate`, else the nearest ancestor.
    pub fn self_or_enclosing(
        &self,
        node: NodeRef,
        predicate: impl Fn(&NodeKind) -> bool,
    ) -> Option<NodeRef> {
        if predicate(self.kind(node)) {
            Some(node)
        } else {
            self.enclosing(node, predicate)
        }
    }

    /// `true` if `node` is `container` or lies somewhere below it.
    pub fn is_contained_in(&self, node: NodeRef, container: NodeRef) -> bool {
        node == container || self.ancestors(node).any(|it| it == container)
    }

    /// Depth-first traversal of the subtree rooted at `node`, including
    /// `node` itself, in source order.
    pub fn descendants(&self, node: NodeRef) -> Vec<NodeRef> {
        let mut out = Vec::new();
        let mut stack = vec![node.node];
        while let Some(current) = stack.pop() {
            let current_ref = NodeRef::new(node.document, current);
            out.push(current_ref);
            let mut children = Vec::new();
            self.kind(current_ref).for_each_child(|child| children.push(child));
            // Reverse so the stack pops children in source order.
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// The `BlockLambdaResult` assignees declared in a block lambda's body,
    /// in source order. These are the lambda's results.
    pub fn block_lambda_results(&self, lambda: NodeRef) -> Vec<NodeRef> {
        let NodeKind::BlockLambda(payload) = self.kind(lambda) else {
            return Vec::new();
        };
        self.descendants(self.sibling(lambda, payload.body))
            .into_iter()
            .filter(|it| matches!(self.kind(*it), NodeKind::BlockLambdaResult(_)))
            .collect()
    }

    /// The statements of the block containing `statement`, in source order.
    pub fn statements_of_containing_block(&self, statement: NodeRef) -> &[NodeId] {
        let Some(block) = self.self_or_enclosing(statement, |kind| matches!(kind, NodeKind::Block(_)))
        else {
            return &[];
        };
        match self.kind(block) {
            NodeKind::Block(it) => &it.statements,
            _ => &[],
        }
    }
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new()
    }
}
