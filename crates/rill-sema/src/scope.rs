//! Name resolution.
//!
//! A [`Scope`] is a chain of named-declaration layers: the inner layer is
//! consulted first and an outer layer is visible only as fallback. Lookup
//! returns the nearest-layer match; same-named candidates are never merged
//! across layers.
//!
//! [`ScopeProvider::get_scope`] computes the scope visible at a reference
//! position. It is total and side-effect-free: unresolvable receivers
//! yield an empty scope, never an error.

use crate::class_hierarchy::ClassHierarchy;
use crate::node_mapper::NodeMapper;
use crate::type_computer::TypeComputer;
use indexmap::IndexMap;
use rill_ast::node::{DeclFlags, MemberAccess};
use rill_ast::{BuiltinRegistry, DocumentId, NodeKind, NodeRef, Workspace};
use rill_common::Atom;
use rill_types::Type;
use std::sync::Arc;

/// A chain of named-declaration lookup layers.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    entries: IndexMap<Atom, NodeRef>,
    outer: Option<Box<Scope>>,
}

impl Scope {
    pub fn empty() -> Self {
        Self::default()
    }

    /// A new innermost layer in front of `outer`. An empty layer is
    /// skipped entirely.
    fn with_outer(entries: IndexMap<Atom, NodeRef>, outer: Scope) -> Self {
        if entries.is_empty() {
            return outer;
        }
        let outer = if outer.is_empty() {
            None
        } else {
            Some(Box::new(outer))
        };
        Self { entries, outer }
    }

    fn flat(entries: IndexMap<Atom, NodeRef>) -> Self {
        Self {
            entries,
            outer: None,
        }
    }

    /// Resolves `name` to the nearest-layer candidate.
    pub fn resolve(&self, name: &str) -> Option<NodeRef> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(found) = scope.entries.get(name) {
                return Some(*found);
            }
            current = scope.outer.as_deref();
        }
        None
    }

    /// All candidates, innermost layer first. Shadowed candidates of outer
    /// layers are included; [`resolve`](Self::resolve) picks the winner.
    pub fn iter(&self) -> impl Iterator<Item = (&Atom, NodeRef)> {
        let mut layers = Vec::new();
        let mut current = Some(self);
        while let Some(scope) = current {
            layers.push(&scope.entries);
            current = scope.outer.as_deref();
        }
        layers
            .into_iter()
            .flat_map(|entries| entries.iter().map(|(name, node)| (name, *node)))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.outer.as_deref().map(Scope::is_empty).unwrap_or(true)
    }
}

/// Computes the declarations visible at a reference position.
pub struct ScopeProvider {
    workspace: Arc<Workspace>,
    builtins: Arc<BuiltinRegistry>,
    types: Arc<TypeComputer>,
    mapper: Arc<NodeMapper>,
}

impl ScopeProvider {
    pub fn new(
        workspace: Arc<Workspace>,
        builtins: Arc<BuiltinRegistry>,
        types: Arc<TypeComputer>,
        mapper: Arc<NodeMapper>,
    ) -> Self {
        Self {
            workspace,
            builtins,
            types,
            mapper,
        }
    }

    /// The scope visible at `node`, dispatched on its reference context.
    pub fn get_scope(&self, node: NodeRef) -> Scope {
        match self.workspace.kind(node) {
            NodeKind::Reference(_) => match self.workspace.parent(node) {
                Some(parent) => match self.workspace.kind(parent) {
                    NodeKind::MemberAccess(access) if access.member == node.node => {
                        self.scope_for_member_access_member(parent, &access.clone())
                    }
                    _ => self.scope_for_direct_reference(node),
                },
                None => self.scope_for_direct_reference(node),
            },
            NodeKind::NamedType(_) => match self.workspace.parent(node) {
                Some(parent) => match self.workspace.kind(parent) {
                    NodeKind::MemberType(member_type) if member_type.member == node.node => {
                        self.scope_for_member_type_member(parent)
                    }
                    _ => self.scope_for_type_reference(node),
                },
                None => self.scope_for_type_reference(node),
            },
            NodeKind::Yield(_) => self.scope_for_yield_result(node),
            _ => Scope::empty(),
        }
    }

    // -----------------------------------------------------------------------
    // Member types
    // -----------------------------------------------------------------------

    fn scope_for_member_type_member(&self, member_type: NodeRef) -> Scope {
        let NodeKind::MemberType(payload) = self.workspace.kind(member_type) else {
            return Scope::empty();
        };
        let receiver = self.workspace.sibling(member_type, payload.receiver);
        let Some(declaration) = self.unique_referenced_declaration_for_type(receiver) else {
            return Scope::empty();
        };

        match self.workspace.kind(declaration) {
            NodeKind::Class(class) => {
                // Only nested named-type declarations are reachable here.
                let nested = class
                    .members
                    .iter()
                    .map(|member| self.workspace.sibling(declaration, *member))
                    .filter(|member| {
                        matches!(self.workspace.kind(*member), NodeKind::Class(_) | NodeKind::Enum(_))
                    });
                Scope::flat(self.layer_of(nested))
            }
            NodeKind::Enum(enum_decl) => {
                let variants = enum_decl
                    .variants
                    .iter()
                    .map(|variant| self.workspace.sibling(declaration, *variant))
                    .collect::<Vec<_>>();
                Scope::flat(self.layer_of(variants))
            }
            _ => Scope::empty(),
        }
    }

    /// The unique declaration a type node refers to, if any.
    fn unique_referenced_declaration_for_type(&self, node: NodeRef) -> Option<NodeRef> {
        match self.workspace.kind(node) {
            NodeKind::NamedType(named) => named.target,
            NodeKind::MemberType(member_type) => {
                let member = self.workspace.sibling(node, member_type.member);
                match self.workspace.kind(member) {
                    NodeKind::NamedType(named) => named.target,
                    _ => None,
                }
            }
            _ => None,
        }
    }

    // -----------------------------------------------------------------------
    // Member accesses
    // -----------------------------------------------------------------------

    fn scope_for_member_access_member(&self, member_access: NodeRef, payload: &MemberAccess) -> Scope {
        let receiver = self.workspace.sibling(member_access, payload.receiver);

        // Static access through the declaration itself.
        if let Some(declaration) = self.unique_referenced_declaration_for_expression(receiver) {
            match self.workspace.kind(declaration) {
                NodeKind::Class(_) => {
                    let mut scope = Scope::empty();
                    let superclasses: Vec<NodeRef> =
                        self.hierarchy().stream_super_classes(declaration).collect();
                    for superclass in superclasses.into_iter().rev() {
                        scope = Scope::with_outer(self.class_member_layer(superclass, true), scope);
                    }
                    return Scope::with_outer(self.class_member_layer(declaration, true), scope);
                }
                NodeKind::Enum(enum_decl) => {
                    let variants = enum_decl
                        .variants
                        .iter()
                        .map(|variant| self.workspace.sibling(declaration, *variant))
                        .collect::<Vec<_>>();
                    return Scope::flat(self.layer_of(variants));
                }
                _ => {}
            }
        }

        // Call results: a receiver call with exactly one result layers it
        // under the member scope; with several results they are the scope.
        let mut result_scope = Scope::empty();
        if matches!(self.workspace.kind(receiver), NodeKind::Call(_)) {
            let Some(callable) = self.mapper.call_to_callable(receiver) else {
                return Scope::empty();
            };
            let results = self.abstract_results(callable);
            if results.len() > 1 {
                return Scope::flat(self.layer_of(results));
            }
            if results.len() == 1 {
                result_scope = Scope::flat(self.layer_of(results));
            }
        }

        // Members of the receiver's type.
        match self.types.compute_type(receiver) {
            Type::Class(class) => {
                // A nullable receiver only reaches members through a
                // null-safe access.
                if class.nullable && !payload.null_safe {
                    return result_scope;
                }
                let mut scope = result_scope;
                let superclasses: Vec<NodeRef> =
                    self.hierarchy().stream_super_classes(class.declaration).collect();
                for superclass in superclasses.into_iter().rev() {
                    scope = Scope::with_outer(self.class_member_layer(superclass, false), scope);
                }
                Scope::with_outer(self.class_member_layer(class.declaration, false), scope)
            }
            Type::EnumVariant(variant) => {
                let parameters = self
                    .workspace
                    .kind(variant.declaration)
                    .parameters()
                    .iter()
                    .map(|parameter| self.workspace.sibling(variant.declaration, *parameter))
                    .collect::<Vec<_>>();
                Scope::flat(self.layer_of(parameters))
            }
            _ => result_scope,
        }
    }

    /// The unique declaration an expression refers to, if any.
    fn unique_referenced_declaration_for_expression(&self, node: NodeRef) -> Option<NodeRef> {
        match self.workspace.kind(node) {
            NodeKind::Reference(reference) => reference.target,
            NodeKind::MemberAccess(access) => {
                let member = self.workspace.sibling(node, access.member);
                match self.workspace.kind(member) {
                    NodeKind::Reference(reference) => reference.target,
                    _ => None,
                }
            }
            _ => None,
        }
    }

    /// The declared results of a callable, including block-lambda results.
    fn abstract_results(&self, callable: NodeRef) -> Vec<NodeRef> {
        match self.workspace.kind(callable) {
            NodeKind::BlockLambda(_) => self.workspace.block_lambda_results(callable),
            kind => kind
                .results()
                .iter()
                .map(|result| self.workspace.sibling(callable, *result))
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Direct references
    // -----------------------------------------------------------------------

    fn scope_for_direct_reference(&self, node: NodeRef) -> Scope {
        let global = self.global_scope(node.document);
        self.local_declarations(node, global)
    }

    /// Named types see type parameters of enclosing declarations over the
    /// global scope, but never value-level locals.
    fn scope_for_type_reference(&self, node: NodeRef) -> Scope {
        let mut layers: Vec<IndexMap<Atom, NodeRef>> = Vec::new();
        let mut current = self.workspace.parent(node);
        while let Some(ancestor) = current {
            let type_parameters = self
                .workspace
                .kind(ancestor)
                .type_parameters()
                .iter()
                .map(|tp| self.workspace.sibling(ancestor, *tp))
                .collect::<Vec<_>>();
            if !type_parameters.is_empty() {
                layers.push(self.layer_of(type_parameters));
            }
            current = self.workspace.parent(ancestor);
        }

        let mut scope = self.global_scope(node.document);
        for layer in layers.into_iter().rev() {
            scope = Scope::with_outer(layer, scope);
        }
        scope
    }

    /// Same-file globals over visibility-filtered other-file globals over
    /// builtins.
    fn global_scope(&self, document: DocumentId) -> Scope {
        let builtin_layer = self.module_member_layer(self.builtins.document, None);
        let mut scope = Scope::flat(builtin_layer);

        let package = self.workspace.document(document).package.clone();
        let mut externals: IndexMap<Atom, NodeRef> = IndexMap::default();
        for other in self.workspace.documents() {
            if other.id == document || other.id == self.builtins.document {
                continue;
            }
            externals.extend(self.module_member_layer(other.id, Some(&package)));
        }
        scope = Scope::with_outer(externals, scope);

        Scope::with_outer(self.module_member_layer(document, None), scope)
    }

    /// The referencable top-level members of a document's module.
    ///
    /// With `from_package` set, visibility filtering for a *foreign* file
    /// applies: private declarations are dropped, internal declarations
    /// only survive within the same package.
    fn module_member_layer(&self, document: DocumentId, from_package: Option<&Atom>) -> IndexMap<Atom, NodeRef> {
        let doc = self.workspace.document(document);
        let root = NodeRef::new(document, doc.root());
        let NodeKind::Module(module) = self.workspace.kind(root) else {
            return IndexMap::default();
        };

        let members = module
            .members
            .iter()
            .map(|member| self.workspace.sibling(root, *member))
            .filter(|member| {
                let kind = self.workspace.kind(*member);
                // Pipelines are entry points, not referencable values.
                if matches!(kind, NodeKind::Pipeline(_)) {
                    return false;
                }
                if let Some(package) = from_package {
                    let flags = kind.flags();
                    if flags.contains(DeclFlags::PRIVATE) {
                        return false;
                    }
                    if flags.contains(DeclFlags::INTERNAL) && doc.package != *package {
                        return false;
                    }
                }
                true
            })
            .collect::<Vec<_>>();
        self.layer_of(members)
    }

    /// Placeholders assigned before the reference, the containing
    /// callable's parameters, and recursively the scope of the enclosing
    /// lambda.
    fn local_declarations(&self, node: NodeRef, outer: Scope) -> Scope {
        let containing_callable = self.workspace.enclosing(node, |kind| {
            kind.is_callable() && !matches!(kind, NodeKind::CallableType(_))
        });

        let parameters: Vec<NodeRef> = containing_callable
            .map(|callable| {
                self.workspace
                    .kind(callable)
                    .parameters()
                    .iter()
                    .map(|parameter| self.workspace.sibling(callable, *parameter))
                    .collect()
            })
            .unwrap_or_default();

        // Placeholders up to the containing statement; invisible when the
        // statement lies outside the containing callable (the parameters
        // are closer then).
        let containing_statement = self.workspace.enclosing(node, |kind| kind.is_statement());
        let placeholders: Vec<NodeRef> = match containing_statement {
            Some(statement) => {
                let visible = match containing_callable {
                    Some(callable) => self.workspace.is_contained_in(statement, callable),
                    None => true,
                };
                if visible {
                    self.placeholders_up_to(statement)
                } else {
                    Vec::new()
                }
            }
            None => Vec::new(),
        };

        // Lambdas can be nested; their captured scope is the fallback.
        let outer = match containing_callable {
            Some(callable) if self.workspace.kind(callable).is_lambda() => {
                self.local_declarations(callable, outer)
            }
            _ => outer,
        };

        let scope = Scope::with_outer(self.layer_of(parameters), outer);
        Scope::with_outer(self.layer_of(placeholders), scope)
    }

    /// Placeholders of assignments that precede `statement` in its block,
    /// in source order. An assignment later in the block is invisible.
    fn placeholders_up_to(&self, statement: NodeRef) -> Vec<NodeRef> {
        let mut placeholders = Vec::new();
        for current in self.workspace.statements_of_containing_block(statement) {
            if *current == statement.node {
                break;
            }
            let current_ref = self.workspace.sibling(statement, *current);
            if let NodeKind::Assignment(assignment) = self.workspace.kind(current_ref) {
                for assignee in &assignment.assignees {
                    let assignee_ref = self.workspace.sibling(current_ref, *assignee);
                    if matches!(self.workspace.kind(assignee_ref), NodeKind::Placeholder(_)) {
                        placeholders.push(assignee_ref);
                    }
                }
            }
        }
        placeholders
    }

    // -----------------------------------------------------------------------
    // Yields
    // -----------------------------------------------------------------------

    /// A yield only sees the enclosing segment's declared results.
    fn scope_for_yield_result(&self, node: NodeRef) -> Scope {
        let Some(segment) = self
            .workspace
            .enclosing(node, |kind| matches!(kind, NodeKind::Segment(_)))
        else {
            return Scope::empty();
        };
        let results = self
            .workspace
            .kind(segment)
            .results()
            .iter()
            .map(|result| self.workspace.sibling(segment, *result))
            .collect::<Vec<_>>();
        Scope::flat(self.layer_of(results))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn hierarchy(&self) -> ClassHierarchy<'_> {
        ClassHierarchy::new(&self.types)
    }

    fn class_member_layer(&self, class: NodeRef, static_members: bool) -> IndexMap<Atom, NodeRef> {
        let NodeKind::Class(declaration) = self.workspace.kind(class) else {
            return IndexMap::default();
        };
        let members = declaration
            .members
            .iter()
            .map(|member| self.workspace.sibling(class, *member))
            .filter(|member| {
                self.workspace
                    .kind(*member)
                    .flags()
                    .contains(DeclFlags::STATIC)
                    == static_members
            })
            .collect::<Vec<_>>();
        self.layer_of(members)
    }

    fn layer_of(&self, nodes: impl IntoIterator<Item = NodeRef>) -> IndexMap<Atom, NodeRef> {
        let mut entries = IndexMap::default();
        for node in nodes {
            if let Some(name) = self.workspace.kind(node).name() {
                entries.insert(name.clone(), node);
            }
        }
        entries
    }
}
