//! The builtins registry.
//!
//! The core classes of the language live in a synthetic builtins document
//! that is always present as document 0 of a [`Workspace`](crate::Workspace).
//! The registry holds direct references to the well-known declarations so
//! the engines never look them up by name, and exposes the annotation
//! metadata (purity, deprecation) the host attaches to declarations.
//!
//! The registry is immutable after construction and passed explicitly to
//! every engine.

use crate::arena::{Document, DocumentId, NodeId, NodeRef};
use crate::build::DocumentBuilder;
use crate::node::{DeclFlags, NodeKind, PurityAnnotation};
use rill_common::Interner;
use std::sync::Arc;

/// References to the well-known builtin declarations.
#[derive(Debug, Clone)]
pub struct BuiltinRegistry {
    pub document: DocumentId,
    /// Root of the class hierarchy; every class eventually derives from it.
    pub any_class: NodeRef,
    pub boolean_class: NodeRef,
    /// Common superclass of `Int` and `Float`.
    pub number_class: NodeRef,
    pub int_class: NodeRef,
    pub float_class: NodeRef,
    pub string_class: NodeRef,
    /// The bottom type; no value inhabits it.
    pub nothing_class: NodeRef,
    pub list_class: NodeRef,
    /// Element type parameter of `List`.
    pub list_element: NodeRef,
    pub map_class: NodeRef,
    /// Key and value type parameters of `Map`.
    pub map_key: NodeRef,
    pub map_value: NodeRef,
}

impl BuiltinRegistry {
    /// Builds the builtins document and the registry pointing into it.
    /// Called once by [`Workspace::new`](crate::Workspace::new).
    pub(crate) fn bootstrap(interner: &Arc<Interner>) -> (Document, Self) {
        let document = DocumentId(0);
        let mut b = DocumentBuilder::new(document, interner, "builtin://rill/lang.rill", "rill.lang");

        let any = b.class("Any", DeclFlags::empty(), vec![], vec![], vec![], vec![]);
        let any_ref = b.node_ref(any);

        let derived = |b: &mut DocumentBuilder, name: &str| -> NodeId {
            let parent = b.named_type("Any", Some(any_ref), false);
            b.class(name, DeclFlags::empty(), vec![], vec![], vec![parent], vec![])
        };

        let boolean = derived(&mut b, "Boolean");
        let number = derived(&mut b, "Number");
        let number_ref = b.node_ref(number);

        let numeric = |b: &mut DocumentBuilder, name: &str| -> NodeId {
            let parent = b.named_type("Number", Some(number_ref), false);
            b.class(name, DeclFlags::empty(), vec![], vec![], vec![parent], vec![])
        };
        let int = numeric(&mut b, "Int");
        let float = numeric(&mut b, "Float");

        let string = derived(&mut b, "String");
        let nothing = derived(&mut b, "Nothing");

        let list_element = b.type_parameter("E");
        let list_parent = b.named_type("Any", Some(any_ref), false);
        let list = b.class(
            "List",
            DeclFlags::empty(),
            vec![list_element],
            vec![],
            vec![list_parent],
            vec![],
        );

        let map_key = b.type_parameter("K");
        let map_value = b.type_parameter("V");
        let map_parent = b.named_type("Any", Some(any_ref), false);
        let map = b.class(
            "Map",
            DeclFlags::empty(),
            vec![map_key, map_value],
            vec![],
            vec![map_parent],
            vec![],
        );

        let registry = Self {
            document,
            any_class: any_ref,
            boolean_class: b.node_ref(boolean),
            number_class: number_ref,
            int_class: b.node_ref(int),
            float_class: b.node_ref(float),
            string_class: b.node_ref(string),
            nothing_class: b.node_ref(nothing),
            list_class: b.node_ref(list),
            list_element: b.node_ref(list_element),
            map_class: b.node_ref(map),
            map_key: b.node_ref(map_key),
            map_value: b.node_ref(map_value),
        };

        let members = vec![any, boolean, number, int, float, string, nothing, list, map];
        (b.finish(members), registry)
    }

    /// `true` if `kind` is one of the well-known primitive value classes.
    pub fn is_primitive_class(&self, declaration: NodeRef) -> bool {
        declaration == self.boolean_class
            || declaration == self.int_class
            || declaration == self.float_class
            || declaration == self.string_class
    }

    // -----------------------------------------------------------------------
    // Annotation metadata
    // -----------------------------------------------------------------------

    /// The purity annotation of a declaration; only functions carry one.
    pub fn purity_annotation<'a>(&self, kind: &'a NodeKind) -> Option<&'a PurityAnnotation> {
        match kind {
            NodeKind::Function(it) => Some(&it.purity),
            _ => None,
        }
    }

    /// `true` if the declaration is marked as deprecated.
    pub fn is_deprecated(&self, kind: &NodeKind) -> bool {
        kind.flags().contains(DeclFlags::DEPRECATED)
    }
}
