//! Superclass chains.
//!
//! Only the first listed parent type of a class is followed; there is no
//! multiple inheritance. The walk is lazy and restartable, defends against
//! cyclic `sub` declarations with a visited set, and always ends at the
//! builtin root class unless the walk started there.

use crate::type_computer::TypeComputer;
use rill_ast::{NodeKind, NodeRef};
use rill_types::Type;
use rustc_hash::FxHashSet;

/// Walks class hierarchies on top of the type computer.
#[derive(Clone, Copy)]
pub struct ClassHierarchy<'a> {
    types: &'a TypeComputer,
}

impl<'a> ClassHierarchy<'a> {
    pub fn new(types: &'a TypeComputer) -> Self {
        Self { types }
    }

    /// The ancestors of `class`, nearest first.
    ///
    /// A malformed cycle among parent types yields a shorter-than-expected
    /// but finite sequence: the walk stops at the first repeated class. The
    /// root class `Any` is appended last unless `class` is `Any` itself or
    /// the chain already produced it.
    pub fn stream_super_classes(&self, class: NodeRef) -> impl Iterator<Item = NodeRef> + use<'a> {
        let this = *self;
        let any_class = self.types.builtins().any_class;
        let mut visited: FxHashSet<NodeRef> = FxHashSet::default();
        let mut current = this.parent_class(class);
        let mut chain_done = false;
        let mut any_done = false;

        std::iter::from_fn(move || {
            if !chain_done {
                if let Some(next) = current {
                    if visited.insert(next) {
                        current = this.parent_class(next);
                        return Some(next);
                    }
                }
                chain_done = true;
            }

            if !any_done {
                any_done = true;
                if class != any_class && !visited.contains(&any_class) {
                    return Some(any_class);
                }
            }

            None
        })
    }

    /// The direct parent class of `class`, or `None` for the root or when
    /// the first parent type does not resolve to a class.
    pub fn parent_class(&self, class: NodeRef) -> Option<NodeRef> {
        let workspace = self.types.workspace();
        let NodeKind::Class(declaration) = workspace.kind(class) else {
            return None;
        };
        let first_parent_type = *declaration.parent_types.first()?;
        let computed = self.types.compute_type(workspace.sibling(class, first_parent_type));
        match computed {
            Type::Class(parent) => Some(parent.declaration),
            _ => None,
        }
    }

    /// `true` if `superclass` appears in the superclass chain of `class`.
    pub fn is_subclass_of(&self, class: NodeRef, superclass: NodeRef) -> bool {
        class == superclass || self.stream_super_classes(class).any(|it| it == superclass)
    }
}
