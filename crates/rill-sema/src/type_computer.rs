//! Type inference.
//!
//! `compute_type` is total: every node of the supported grammar categories
//! yields a [`Type`], degrading to [`Type::Unknown`] for missing
//! information and [`Type::NotImplemented`] for categories the computer
//! does not handle, never failing. Results are memoized per node until the
//! owning document is invalidated; a re-entrant request for a node already
//! being computed yields [`Type::Unknown`] instead of recursing.

use crate::cache::NodeCache;
use crate::class_hierarchy::ClassHierarchy;
use crate::evaluator::PartialEvaluator;
use crate::node_mapper::{AssignedObject, NodeMapper};
use once_cell::unsync::OnceCell;
use rill_ast::node::{
    ClassDecl, InfixOperation, InfixOperator, NamedTypeNode, ParameterDecl, PrefixOperator,
};
use rill_ast::{BuiltinRegistry, DocumentId, NodeId, NodeKind, NodeRef, Workspace};
use rill_common::{DepthCounter, RecursionGuard, RecursionProfile};
use rill_types::{
    CallableType, ClassType, Constant, EnumType, EnumVariantType, LiteralType, NamedTupleEntry,
    NamedTupleType, StaticType, Type, TypeParameterSubstitutions, TypeParameterType, UnionType,
};
use std::cell::RefCell;
use std::sync::{Arc, Weak};
use tracing::trace;

/// Stack headroom for deeply nested expressions.
const STACK_RED_ZONE: usize = 32 * 1024;
const STACK_GROW_BY: usize = 1024 * 1024;

/// The type-inference engine.
pub struct TypeComputer {
    workspace: Arc<Workspace>,
    builtins: Arc<BuiltinRegistry>,
    mapper: Arc<NodeMapper>,
    /// Back-link, set once by the service wiring; used for literal types.
    evaluator: OnceCell<Weak<PartialEvaluator>>,
    cache: NodeCache<Type>,
    guard: RefCell<RecursionGuard<NodeRef>>,

    cached_any: OnceCell<Type>,
    cached_boolean: OnceCell<Type>,
    cached_int: OnceCell<Type>,
    cached_float: OnceCell<Type>,
    cached_string: OnceCell<Type>,
    cached_nothing: OnceCell<Type>,
    cached_nothing_or_null: OnceCell<Type>,
}

impl TypeComputer {
    pub fn new(
        workspace: Arc<Workspace>,
        builtins: Arc<BuiltinRegistry>,
        mapper: Arc<NodeMapper>,
        profile: RecursionProfile,
    ) -> Self {
        Self {
            workspace,
            builtins,
            mapper,
            evaluator: OnceCell::new(),
            cache: NodeCache::new(),
            guard: RefCell::new(RecursionGuard::with_profile(profile)),
            cached_any: OnceCell::new(),
            cached_boolean: OnceCell::new(),
            cached_int: OnceCell::new(),
            cached_float: OnceCell::new(),
            cached_string: OnceCell::new(),
            cached_nothing: OnceCell::new(),
            cached_nothing_or_null: OnceCell::new(),
        }
    }

    /// Wires the partial evaluator in after construction. Called once by
    /// `SemanticServices::new`.
    pub fn set_evaluator(&self, evaluator: &Arc<PartialEvaluator>) {
        let _ = self.evaluator.set(Arc::downgrade(evaluator));
    }

    #[inline]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[inline]
    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    fn hierarchy(&self) -> ClassHierarchy<'_> {
        ClassHierarchy::new(self)
    }

    fn evaluator(&self) -> Option<Arc<PartialEvaluator>> {
        self.evaluator.get().and_then(Weak::upgrade)
    }

    pub fn invalidate_document(&self, document: DocumentId) {
        self.cache.invalidate_document(document);
    }

    // -----------------------------------------------------------------------
    // Entry points
    // -----------------------------------------------------------------------

    /// The type of `node`, or [`Type::Unknown`] when `node` is absent.
    pub fn compute_type_opt(&self, node: Option<NodeRef>) -> Type {
        match node {
            Some(node) => self.compute_type(node),
            None => Type::Unknown,
        }
    }

    /// The type of `node`. Total; memoized per node.
    pub fn compute_type(&self, node: NodeRef) -> Type {
        if let Some(hit) = self.cache.get(node) {
            return hit;
        }

        if self.guard.borrow_mut().enter(node).is_denied() {
            trace!(?node, "type computation re-entered; yielding unknown");
            return Type::Unknown;
        }
        let result =
            stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_BY, || self.do_compute_type(node));
        {
            let mut guard = self.guard.borrow_mut();
            guard.leave(node);
            // The iteration budget bounds one outermost query, not the
            // lifetime of the engine.
            if guard.depth() == 0 {
                guard.reset();
            }
        }

        self.cache.insert(node, result.clone());
        result
    }

    fn do_compute_type(&self, node: NodeRef) -> Type {
        let kind = self.workspace.kind(node);
        if kind.is_assignee() {
            self.compute_type_of_assignee(node)
        } else if kind.is_declaration() {
            self.compute_type_of_declaration(node)
        } else if kind.is_expression() {
            self.compute_type_of_expression(node)
        } else if kind.is_type_node() || matches!(kind, NodeKind::TypeArgument(_)) {
            self.compute_type_of_type_node(node)
        } else {
            Type::NotImplemented
        }
    }

    // -----------------------------------------------------------------------
    // Assignees
    // -----------------------------------------------------------------------

    fn compute_type_of_assignee(&self, node: NodeRef) -> Type {
        match self.mapper.assignee_to_assigned_object(node) {
            Some(AssignedObject::Expression(expression)) => self.compute_type(expression),
            Some(AssignedObject::Result(result)) => self.compute_type(result),
            None => Type::Unknown,
        }
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    fn compute_type_of_declaration(&self, node: NodeRef) -> Type {
        match self.workspace.kind(node) {
            NodeKind::Class(declaration) => self.class_type_of(node, declaration, false),
            NodeKind::Enum(declaration) => {
                Type::Enum(EnumType::new(node, declaration.name.clone(), false))
            }
            NodeKind::EnumVariant(declaration) => {
                Type::EnumVariant(EnumVariantType::new(node, declaration.name.clone(), false))
            }
            NodeKind::Attribute(declaration) => {
                self.compute_type_opt(declaration.type_annotation.map(|it| self.workspace.sibling(node, it)))
            }
            NodeKind::Function(_) | NodeKind::Segment(_) | NodeKind::Pipeline(_) => {
                self.callable_type_of(node)
            }
            NodeKind::Parameter(declaration) => {
                self.compute_type_of_parameter(node, &declaration.clone())
            }
            NodeKind::Result(declaration) => {
                self.compute_type_opt(declaration.type_annotation.map(|it| self.workspace.sibling(node, it)))
            }
            NodeKind::TypeParameter(declaration) => {
                Type::TypeParameter(TypeParameterType::new(node, declaration.name.clone(), false))
            }
            _ => Type::NotImplemented,
        }
    }

    fn compute_type_of_parameter(&self, node: NodeRef, declaration: &ParameterDecl) -> Type {
        // Declared parameter type.
        if let Some(annotation) = declaration.type_annotation {
            let annotation_ref = self.workspace.sibling(node, annotation);
            let ty = self.compute_type(annotation_ref);
            // A directly-annotated callable type remembers which parameter
            // it belongs to, so closures passed for it can be typed.
            if matches!(self.workspace.kind(annotation_ref), NodeKind::CallableType(_)) {
                if let Type::Callable(mut callable) = ty {
                    callable.parameter = Some(node);
                    return Type::Callable(callable);
                }
                return Type::Unknown;
            }
            return ty;
        }

        // Inferred lambda parameter type: take the matching parameter of
        // the callable type the lambda is passed into.
        let Some(lambda) = self.workspace.parent(node).filter(|it| self.workspace.kind(*it).is_lambda())
        else {
            return Type::Unknown;
        };
        let index = self.workspace.container_index(node);

        let container_type = match self.workspace.parent(lambda) {
            Some(container) => match self.workspace.kind(container) {
                NodeKind::Argument(_) => self
                    .mapper
                    .argument_to_parameter(container)
                    .map(|parameter| self.compute_type(parameter)),
                NodeKind::Assignment(assignment) => {
                    let assignment = assignment.clone();
                    assignment
                        .assignees
                        .first()
                        .map(|assignee| self.workspace.sibling(container, *assignee))
                        .and_then(|assignee| match self.workspace.kind(assignee) {
                            NodeKind::Yield(it) => it.result,
                            _ => None,
                        })
                        .map(|result| self.compute_type(result))
                }
                _ => None,
            },
            None => None,
        };

        match container_type {
            Some(Type::Callable(callable)) => callable.parameter_type_by_index(index),
            _ => Type::Unknown,
        }
    }

    /// The `ClassType` of a class declaration: each own type parameter is
    /// mapped to itself, so uninstantiated generics stay visible.
    fn class_type_of(&self, node: NodeRef, declaration: &ClassDecl, nullable: bool) -> Type {
        let substitutions: TypeParameterSubstitutions = declaration
            .type_parameters
            .iter()
            .map(|tp| {
                let tp_ref = self.workspace.sibling(node, *tp);
                (tp_ref, self.compute_type(tp_ref))
            })
            .collect();
        Type::Class(ClassType::new(
            node,
            declaration.name.clone(),
            substitutions,
            nullable,
        ))
    }

    /// The `CallableType` of any callable declaration or lambda.
    fn callable_type_of(&self, callable: NodeRef) -> Type {
        let kind = self.workspace.kind(callable).clone();

        let input = NamedTupleType::new(
            kind.parameters()
                .iter()
                .map(|parameter| {
                    let parameter_ref = self.workspace.sibling(callable, *parameter);
                    let name = self
                        .workspace
                        .kind(parameter_ref)
                        .name()
                        .cloned()
                        .unwrap_or_else(|| self.workspace.atom(""));
                    NamedTupleEntry::new(Some(parameter_ref), name, self.compute_type(parameter_ref))
                })
                .collect(),
        );

        let output = match &kind {
            NodeKind::BlockLambda(_) => NamedTupleType::new(
                self.workspace
                    .block_lambda_results(callable)
                    .into_iter()
                    .map(|result| {
                        let name = self
                            .workspace
                            .kind(result)
                            .name()
                            .cloned()
                            .unwrap_or_else(|| self.workspace.atom(""));
                        NamedTupleEntry::new(Some(result), name, self.compute_type(result))
                    })
                    .collect(),
            ),
            NodeKind::ExpressionLambda(lambda) => {
                let result = self.workspace.sibling(callable, lambda.result);
                NamedTupleType::new(vec![NamedTupleEntry::new(
                    None,
                    self.workspace.atom("result"),
                    self.compute_type(result),
                )])
            }
            _ => NamedTupleType::new(
                kind.results()
                    .iter()
                    .map(|result| {
                        let result_ref = self.workspace.sibling(callable, *result);
                        let name = self
                            .workspace
                            .kind(result_ref)
                            .name()
                            .cloned()
                            .unwrap_or_else(|| self.workspace.atom(""));
                        NamedTupleEntry::new(Some(result_ref), name, self.compute_type(result_ref))
                    })
                    .collect(),
            ),
        };

        Type::Callable(CallableType::new(callable, None, input, output))
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn compute_type_of_expression(&self, node: NodeRef) -> Type {
        match self.workspace.kind(node).clone() {
            // Terminal cases
            NodeKind::BooleanLiteral(_) => self.boolean_type(),
            NodeKind::FloatLiteral(_) => self.float_type(),
            NodeKind::IntLiteral(_) => self.int_type(),
            NodeKind::NullLiteral => self.nothing_or_null_type(),
            NodeKind::StringLiteral(_) => self.string_type(),
            NodeKind::TemplateString(_) => self.string_type(),

            // Recursive cases
            NodeKind::Argument(argument) => self.compute_type(self.workspace.sibling(node, argument.value)),
            NodeKind::Parenthesized(inner) => {
                self.compute_type(self.workspace.sibling(node, inner.expression))
            }
            NodeKind::Reference(reference) => match reference.target {
                Some(target) => match self.workspace.kind(target) {
                    NodeKind::Class(_) | NodeKind::Enum(_) => {
                        let instance = self.compute_type(target);
                        match instance {
                            Type::Class(_) | Type::Enum(_) => Type::Static(StaticType::new(instance)),
                            other => other,
                        }
                    }
                    _ => self.compute_type(target),
                },
                None => Type::Unknown,
            },
            NodeKind::MemberAccess(access) => {
                let member_type = self.compute_type(self.workspace.sibling(node, access.member));
                let receiver_type = self.compute_type(self.workspace.sibling(node, access.receiver));
                if access.null_safe && receiver_type.is_explicitly_nullable() {
                    member_type.with_explicit_nullability(true)
                } else {
                    member_type
                }
            }
            NodeKind::Call(_) => self.compute_type_of_call(node),
            NodeKind::BlockLambda(_) | NodeKind::ExpressionLambda(_) => self.callable_type_of(node),
            NodeKind::InfixOperation(operation) => self.compute_type_of_infix_operation(node, &operation),
            NodeKind::PrefixOperation(operation) => {
                let operand_type = self.compute_type(self.workspace.sibling(node, operation.operand));
                match operation.operator {
                    PrefixOperator::Not => self.boolean_type(),
                    PrefixOperator::Negate => {
                        if operand_type == self.int_type() {
                            self.int_type()
                        } else {
                            self.float_type()
                        }
                    }
                }
            }
            NodeKind::ListLiteral(list) => {
                let element_types: Vec<Type> = list
                    .elements
                    .iter()
                    .map(|element| self.compute_type(self.workspace.sibling(node, *element)))
                    .collect();
                self.list_type(self.lowest_common_supertype(&element_types))
            }
            NodeKind::MapLiteral(map) => {
                let mut key_types = Vec::with_capacity(map.entries.len());
                let mut value_types = Vec::with_capacity(map.entries.len());
                for entry in &map.entries {
                    let entry_ref = self.workspace.sibling(node, *entry);
                    if let NodeKind::MapEntry(pair) = self.workspace.kind(entry_ref) {
                        key_types.push(self.compute_type(self.workspace.sibling(entry_ref, pair.key)));
                        value_types.push(self.compute_type(self.workspace.sibling(entry_ref, pair.value)));
                    }
                }
                self.map_type(
                    self.lowest_common_supertype(&key_types),
                    self.lowest_common_supertype(&value_types),
                )
            }
            NodeKind::MapEntry(_) => Type::NotImplemented,
            _ => Type::NotImplemented,
        }
    }

    fn compute_type_of_call(&self, node: NodeRef) -> Type {
        let NodeKind::Call(call) = self.workspace.kind(node).clone() else {
            return Type::NotImplemented;
        };
        let Some(callable) = self.mapper.call_to_callable(node) else {
            return Type::Unknown;
        };

        let result = match self.workspace.kind(callable) {
            NodeKind::Class(declaration) => {
                // Instantiation: start from the identity substitutions and
                // override with the call's type arguments.
                let declaration = declaration.clone();
                let base = self.class_type_of(callable, &declaration, false);
                let substitutions = self.substitutions_from_type_arguments(node, &call.type_arguments);
                base.substitute_type_parameters(&substitutions)
            }
            NodeKind::EnumVariant(declaration) => {
                Type::EnumVariant(EnumVariantType::new(callable, declaration.name.clone(), false))
            }
            _ => match self.compute_type(callable) {
                Type::Callable(callable_type) => {
                    if callable_type.output.len() == 1 {
                        callable_type.output.entries[0].ty.clone()
                    } else {
                        Type::NamedTuple(callable_type.output)
                    }
                }
                _ => Type::Unknown,
            },
        };

        // A call through an instance receiver sees the receiver's
        // substitutions, e.g. the result of `List<Int>.get`.
        let callee = self.workspace.sibling(node, call.receiver);
        if let NodeKind::MemberAccess(access) = self.workspace.kind(callee).clone() {
            if let Type::Class(receiver) =
                self.compute_type(self.workspace.sibling(callee, access.receiver))
            {
                if !receiver.substitutions.is_empty() {
                    return result.substitute_type_parameters(&receiver.substitutions);
                }
            }
        }

        result
    }

    fn substitutions_from_type_arguments(
        &self,
        call_or_type: NodeRef,
        type_arguments: &[NodeId],
    ) -> TypeParameterSubstitutions {
        let mut substitutions = TypeParameterSubstitutions::default();
        for type_argument in type_arguments {
            let type_argument_ref = self.workspace.sibling(call_or_type, *type_argument);
            if let Some(type_parameter) = self.mapper.type_argument_to_type_parameter(type_argument_ref) {
                substitutions.insert(type_parameter, self.compute_type(type_argument_ref));
            }
        }
        substitutions
    }

    fn compute_type_of_infix_operation(&self, node: NodeRef, operation: &InfixOperation) -> Type {
        match operation.operator {
            // Boolean, equality, and comparison operators
            InfixOperator::Or
            | InfixOperator::And
            | InfixOperator::Equals
            | InfixOperator::NotEquals
            | InfixOperator::IdenticalTo
            | InfixOperator::NotIdenticalTo
            | InfixOperator::LessThan
            | InfixOperator::LessThanOrEquals
            | InfixOperator::GreaterThanOrEquals
            | InfixOperator::GreaterThan => self.boolean_type(),

            // Arithmetic operators: Int only if both operands are Int
            InfixOperator::Plus | InfixOperator::Minus | InfixOperator::Times | InfixOperator::DividedBy => {
                let left = self.compute_type(self.workspace.sibling(node, operation.left));
                let right = self.compute_type(self.workspace.sibling(node, operation.right));
                if left == self.int_type() && right == self.int_type() {
                    self.int_type()
                } else {
                    self.float_type()
                }
            }

            InfixOperator::Elvis => {
                let left = self.compute_type(self.workspace.sibling(node, operation.left));
                if left.is_explicitly_nullable() {
                    let right = self.compute_type(self.workspace.sibling(node, operation.right));
                    self.lowest_common_supertype(&[left.with_explicit_nullability(false), right])
                } else {
                    // The right side can never be reached; its type is
                    // discarded.
                    left
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Type nodes
    // -----------------------------------------------------------------------

    fn compute_type_of_type_node(&self, node: NodeRef) -> Type {
        match self.workspace.kind(node).clone() {
            NodeKind::NamedType(named) => self.compute_type_of_named_type(node, &named),
            NodeKind::MemberType(member_type) => {
                self.compute_type(self.workspace.sibling(node, member_type.member))
            }
            NodeKind::CallableType(_) => self.callable_type_of(node),
            NodeKind::UnionType(union) => Type::Union(UnionType::new(
                union
                    .alternatives
                    .iter()
                    .map(|alternative| self.compute_type(self.workspace.sibling(node, *alternative)))
                    .collect(),
            )),
            NodeKind::LiteralType(literal) => {
                let Some(evaluator) = self.evaluator() else {
                    return Type::Unknown;
                };
                let mut constants = Vec::with_capacity(literal.constants.len());
                for constant in &literal.constants {
                    match evaluator.evaluate(self.workspace.sibling(node, *constant)) {
                        rill_types::EvaluatedNode::Constant(value) => constants.push(value),
                        _ => return Type::Unknown,
                    }
                }
                Type::Literal(LiteralType::new(constants))
            }
            NodeKind::TypeArgument(argument) => {
                self.compute_type(self.workspace.sibling(node, argument.value))
            }
            _ => Type::Unknown,
        }
    }

    fn compute_type_of_named_type(&self, node: NodeRef, named: &NamedTypeNode) -> Type {
        let Some(target) = named.target else {
            return Type::Unknown;
        };

        let base = self.compute_type(target);
        let with_arguments = match &base {
            Type::Class(_) if !named.type_arguments.is_empty() => {
                let substitutions = self.substitutions_from_type_arguments(node, &named.type_arguments);
                base.substitute_type_parameters(&substitutions)
            }
            _ => base,
        };
        with_arguments.with_explicit_nullability(named.nullable)
    }

    // -----------------------------------------------------------------------
    // Lowest common supertype
    // -----------------------------------------------------------------------

    /// The most specific type every input is substitutable for.
    ///
    /// Union members are flattened first; the result carries the combined
    /// nullability. The candidate starts at the first type and climbs the
    /// hierarchy until it covers every input, terminating at `Any`.
    pub fn lowest_common_supertype(&self, types: &[Type]) -> Type {
        if types.is_empty() {
            return self.nothing_type();
        }

        let mut flattened = Vec::with_capacity(types.len());
        for ty in types {
            match ty.unwrap() {
                Type::Union(union) => flattened.extend(union.possible_types),
                other => flattened.push(other),
            }
        }
        if flattened.is_empty() {
            return self.nothing_type();
        }
        if flattened
            .iter()
            .any(|ty| matches!(ty, Type::Unknown | Type::NotImplemented))
        {
            return Type::Unknown;
        }

        let nullable = flattened.iter().any(Type::is_explicitly_nullable);
        // The bottom type fits any candidate, so it never seeds the climb.
        let seed = flattened
            .iter()
            .find(|ty| !self.is_nothing_class(ty))
            .unwrap_or(&flattened[0]);
        let mut candidate = seed.with_explicit_nullability(nullable);
        let mut steps = DepthCounter::with_profile(RecursionProfile::SupertypeWalk);

        loop {
            if self.is_lowest_common_supertype(&candidate, &flattened) {
                return candidate;
            }
            if !steps.enter() {
                return self.any_type().with_explicit_nullability(nullable);
            }
            candidate = self.step_up(&candidate, nullable);
        }
    }

    fn is_lowest_common_supertype(&self, candidate: &Type, types: &[Type]) -> bool {
        if let Type::Class(class) = candidate {
            if class.declaration == self.builtins.any_class {
                return true;
            }
        }
        types.iter().all(|ty| self.is_substitutable(ty, candidate))
    }

    /// The next candidate above `candidate` in the hierarchy.
    fn step_up(&self, candidate: &Type, nullable: bool) -> Type {
        match candidate {
            Type::Class(class) => match self.hierarchy().stream_super_classes(class.declaration).next() {
                Some(superclass) => self
                    .compute_type(superclass)
                    .with_explicit_nullability(nullable),
                None => self.any_type().with_explicit_nullability(nullable),
            },
            Type::EnumVariant(variant) => {
                match self
                    .workspace
                    .enclosing(variant.declaration, |kind| matches!(kind, NodeKind::Enum(_)))
                {
                    Some(enum_decl) => self
                        .compute_type(enum_decl)
                        .with_explicit_nullability(nullable),
                    None => self.any_type().with_explicit_nullability(nullable),
                }
            }
            Type::Literal(literal) => match self.common_constant_class(&literal.constants) {
                Some(class) => self.compute_type(class).with_explicit_nullability(nullable),
                None => self.any_type().with_explicit_nullability(nullable),
            },
            _ => self.any_type().with_explicit_nullability(nullable),
        }
    }

    /// `true` if a value of type `sub` can stand in for `sup`.
    fn is_substitutable(&self, sub: &Type, sup: &Type) -> bool {
        if sub.is_explicitly_nullable() && !sup.is_explicitly_nullable() {
            return false;
        }
        let sub = sub.with_explicit_nullability(false);
        let sup = sup.with_explicit_nullability(false);
        if sub == sup {
            return true;
        }

        match (&sub, &sup) {
            // The bottom type fits anywhere.
            (Type::Class(a), _) if a.declaration == self.builtins.nothing_class => true,
            (_, Type::Class(b)) if b.declaration == self.builtins.any_class => true,
            (Type::Class(a), Type::Class(b)) => self.hierarchy().is_subclass_of(a.declaration, b.declaration),
            (Type::Literal(literal), Type::Class(b)) => literal.constants.iter().all(|constant| {
                match self.constant_class(constant) {
                    Some(class) => self.hierarchy().is_subclass_of(class, b.declaration),
                    None => false,
                }
            }),
            (Type::EnumVariant(variant), Type::Enum(e)) => {
                self.workspace
                    .enclosing(variant.declaration, |kind| matches!(kind, NodeKind::Enum(_)))
                    == Some(e.declaration)
            }
            _ => false,
        }
    }

    fn is_nothing_class(&self, ty: &Type) -> bool {
        matches!(ty, Type::Class(class) if class.declaration == self.builtins.nothing_class)
    }

    fn constant_class(&self, constant: &Constant) -> Option<NodeRef> {
        match constant {
            Constant::Boolean(_) => Some(self.builtins.boolean_class),
            Constant::Float(_) => Some(self.builtins.float_class),
            Constant::Int(_) => Some(self.builtins.int_class),
            Constant::String(_) => Some(self.builtins.string_class),
            Constant::Null => None,
        }
    }

    fn common_constant_class(&self, constants: &[Constant]) -> Option<NodeRef> {
        let mut classes = constants.iter().filter_map(|it| self.constant_class(it));
        let first = classes.next()?;
        classes.all(|it| it == first).then_some(first)
    }

    // -----------------------------------------------------------------------
    // Builtin types
    // -----------------------------------------------------------------------

    fn core_class_type(&self, class: NodeRef, nullable: bool) -> Type {
        match self.workspace.kind(class) {
            NodeKind::Class(declaration) => self.class_type_of(class, &declaration.clone(), nullable),
            _ => Type::Unknown,
        }
    }

    pub fn any_type(&self) -> Type {
        self.cached_any
            .get_or_init(|| self.core_class_type(self.builtins.any_class, false))
            .clone()
    }

    pub fn boolean_type(&self) -> Type {
        self.cached_boolean
            .get_or_init(|| self.core_class_type(self.builtins.boolean_class, false))
            .clone()
    }

    pub fn int_type(&self) -> Type {
        self.cached_int
            .get_or_init(|| self.core_class_type(self.builtins.int_class, false))
            .clone()
    }

    pub fn float_type(&self) -> Type {
        self.cached_float
            .get_or_init(|| self.core_class_type(self.builtins.float_class, false))
            .clone()
    }

    pub fn string_type(&self) -> Type {
        self.cached_string
            .get_or_init(|| self.core_class_type(self.builtins.string_class, false))
            .clone()
    }

    pub fn nothing_type(&self) -> Type {
        self.cached_nothing
            .get_or_init(|| self.core_class_type(self.builtins.nothing_class, false))
            .clone()
    }

    pub fn nothing_or_null_type(&self) -> Type {
        self.cached_nothing_or_null
            .get_or_init(|| self.core_class_type(self.builtins.nothing_class, true))
            .clone()
    }

    /// `List<element>`.
    pub fn list_type(&self, element: Type) -> Type {
        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(self.builtins.list_element, element);
        match self.workspace.kind(self.builtins.list_class) {
            NodeKind::Class(declaration) => Type::Class(ClassType::new(
                self.builtins.list_class,
                declaration.name.clone(),
                substitutions,
                false,
            )),
            _ => Type::Unknown,
        }
    }

    /// `Map<key, value>`.
    pub fn map_type(&self, key: Type, value: Type) -> Type {
        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(self.builtins.map_key, key);
        substitutions.insert(self.builtins.map_value, value);
        match self.workspace.kind(self.builtins.map_class) {
            NodeKind::Class(declaration) => Type::Class(ClassType::new(
                self.builtins.map_class,
                declaration.name.clone(),
                substitutions,
                false,
            )),
            _ => Type::Unknown,
        }
    }
}
