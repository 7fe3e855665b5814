//! Declaration mapping.
//!
//! Pure helpers resolving the correspondences between use sites and
//! declarations: argument → parameter, assignee → produced value, call →
//! callable, and the reverse reference lookups. The type computer and the
//! scope engine both route through these helpers, so the rules are applied
//! in exactly one place.

use crate::type_computer::TypeComputer;
use once_cell::unsync::OnceCell;
use rill_ast::{NodeKind, NodeRef, Workspace};
use rill_types::Type;
use std::sync::{Arc, Weak};

/// What an assignee receives from its assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignedObject {
    /// The whole right-hand side expression.
    Expression(NodeRef),
    /// One result (or block-lambda result) of the called callable.
    Result(NodeRef),
}

/// Resolves correspondences between use sites and declarations.
pub struct NodeMapper {
    workspace: Arc<Workspace>,
    /// Back-link, set once by the service wiring.
    type_computer: OnceCell<Weak<TypeComputer>>,
}

impl NodeMapper {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self {
            workspace,
            type_computer: OnceCell::new(),
        }
    }

    /// Wires the type computer in after construction. Called once by
    /// `SemanticServices::new`.
    pub fn set_type_computer(&self, type_computer: &Arc<TypeComputer>) {
        let _ = self.type_computer.set(Arc::downgrade(type_computer));
    }

    fn types(&self) -> Option<Arc<TypeComputer>> {
        self.type_computer.get().and_then(Weak::upgrade)
    }

    /// The parameter the argument is assigned to, or `None` if there is no
    /// matching parameter.
    ///
    /// A positional argument that follows a named argument maps to nothing;
    /// positional matching is abandoned for such ill-formed calls.
    pub fn argument_to_parameter(&self, argument: NodeRef) -> Option<NodeRef> {
        let NodeKind::Argument(payload) = self.workspace.kind(argument) else {
            return None;
        };

        // Named argument.
        if let Some(parameter) = payload.parameter {
            return Some(parameter);
        }

        // Positional argument.
        let call = self
            .workspace
            .enclosing(argument, |kind| matches!(kind, NodeKind::Call(_)))?;
        let NodeKind::Call(call_payload) = self.workspace.kind(call) else {
            return None;
        };
        let position = self.workspace.container_index(argument);

        // A prior argument is named.
        for prior in call_payload.arguments.iter().take(position) {
            if let NodeKind::Argument(prior_payload) = self.workspace.kind(self.workspace.sibling(call, *prior)) {
                if prior_payload.parameter.is_some() {
                    return None;
                }
            }
        }

        // Find the parameter at the same position.
        let callable = self.call_to_callable(call)?;
        self.workspace
            .kind(callable)
            .parameters()
            .get(position)
            .map(|parameter| self.workspace.sibling(callable, *parameter))
    }

    /// The result or expression assigned to the given assignee, or `None`
    /// if nothing is assigned to it.
    pub fn assignee_to_assigned_object(&self, assignee: NodeRef) -> Option<AssignedObject> {
        if !self.workspace.kind(assignee).is_assignee() {
            return None;
        }
        let assignment = self
            .workspace
            .enclosing(assignee, |kind| matches!(kind, NodeKind::Assignment(_)))?;
        let NodeKind::Assignment(payload) = self.workspace.kind(assignment) else {
            return None;
        };

        let position = self.workspace.container_index(assignee);
        let expression = self.workspace.sibling(assignment, payload.expression);

        // If the right-hand side is not a call, only the first assignee
        // receives the whole expression.
        if !matches!(self.workspace.kind(expression), NodeKind::Call(_)) {
            return (position == 0).then_some(AssignedObject::Expression(expression));
        }

        let callable = self.call_to_callable(expression)?;
        match self.workspace.kind(callable) {
            // Instantiations produce a single value as well.
            NodeKind::Class(_) | NodeKind::EnumVariant(_) => {
                (position == 0).then_some(AssignedObject::Expression(expression))
            }
            NodeKind::ExpressionLambda(lambda) => {
                let result = self.workspace.sibling(callable, lambda.result);
                (position == 0).then_some(AssignedObject::Expression(result))
            }
            NodeKind::BlockLambda(_) => self
                .workspace
                .block_lambda_results(callable)
                .get(position)
                .copied()
                .map(AssignedObject::Result),
            // Otherwise each assignee receives the result at its position.
            kind => kind
                .results()
                .get(position)
                .map(|result| AssignedObject::Result(self.workspace.sibling(callable, *result))),
        }
    }

    /// The callable invoked by the given call, resolved through the
    /// receiver's computed type. `None` if no callable can be found.
    pub fn call_to_callable(&self, call: NodeRef) -> Option<NodeRef> {
        let NodeKind::Call(payload) = self.workspace.kind(call) else {
            return None;
        };
        let receiver = self.workspace.sibling(call, payload.receiver);
        let types = self.types()?;

        match types.compute_type(receiver) {
            Type::Callable(callable_type) => Some(callable_type.callable),
            Type::Static(static_type) => match &*static_type.instance {
                Type::Class(class) if self.workspace.kind(class.declaration).is_callable() => {
                    Some(class.declaration)
                }
                Type::EnumVariant(variant) => Some(variant.declaration),
                _ => None,
            },
            Type::EnumVariant(variant) => Some(variant.declaration),
            _ => None,
        }
    }

    /// All references within the containing callable that target the given
    /// parameter.
    pub fn parameter_to_references(&self, parameter: NodeRef) -> Vec<NodeRef> {
        let Some(callable) = self
            .workspace
            .enclosing(parameter, |kind| kind.is_callable())
        else {
            return Vec::new();
        };
        self.references_to(callable, parameter)
    }

    /// All references within the containing block that target the given
    /// placeholder.
    pub fn placeholder_to_references(&self, placeholder: NodeRef) -> Vec<NodeRef> {
        let Some(block) = self
            .workspace
            .enclosing(placeholder, |kind| matches!(kind, NodeKind::Block(_)))
        else {
            return Vec::new();
        };
        self.references_to(block, placeholder)
    }

    fn references_to(&self, root: NodeRef, target: NodeRef) -> Vec<NodeRef> {
        self.workspace
            .descendants(root)
            .into_iter()
            .filter(|node| match self.workspace.kind(*node) {
                NodeKind::Reference(reference) => reference.target == Some(target),
                _ => false,
            })
            .collect()
    }

    /// All yields within the containing segment that assign to the given
    /// result.
    pub fn result_to_yields(&self, result: NodeRef) -> Vec<NodeRef> {
        let Some(segment) = self
            .workspace
            .enclosing(result, |kind| matches!(kind, NodeKind::Segment(_)))
        else {
            return Vec::new();
        };
        self.workspace
            .descendants(segment)
            .into_iter()
            .filter(|node| match self.workspace.kind(*node) {
                NodeKind::Yield(yielded) => yielded.result == Some(result),
                _ => false,
            })
            .collect()
    }

    /// The type parameter the type argument is assigned to, or `None` if
    /// there is no matching type parameter.
    pub fn type_argument_to_type_parameter(&self, type_argument: NodeRef) -> Option<NodeRef> {
        let NodeKind::TypeArgument(payload) = self.workspace.kind(type_argument) else {
            return None;
        };

        // Named type argument.
        if let Some(type_parameter) = payload.type_parameter {
            return Some(type_parameter);
        }

        // Positional type argument: the container is either a named type
        // or a call with type arguments.
        let container = self.workspace.parent(type_argument)?;
        let position = self.workspace.container_index(type_argument);

        let (declaration, prior_named) = match self.workspace.kind(container) {
            NodeKind::NamedType(named) => (
                named.target,
                self.any_prior_named_type_argument(container, &named.type_arguments, position),
            ),
            NodeKind::Call(call) => {
                let callable = self.call_to_callable(container);
                (
                    callable,
                    self.any_prior_named_type_argument(container, &call.type_arguments, position),
                )
            }
            _ => return None,
        };

        if prior_named {
            return None;
        }

        let declaration = declaration?;
        self.workspace
            .kind(declaration)
            .type_parameters()
            .get(position)
            .map(|type_parameter| self.workspace.sibling(declaration, *type_parameter))
    }

    fn any_prior_named_type_argument(
        &self,
        container: NodeRef,
        type_arguments: &[rill_ast::NodeId],
        position: usize,
    ) -> bool {
        type_arguments.iter().take(position).any(|prior| {
            match self.workspace.kind(self.workspace.sibling(container, *prior)) {
                NodeKind::TypeArgument(payload) => payload.type_parameter.is_some(),
                _ => false,
            }
        })
    }
}
