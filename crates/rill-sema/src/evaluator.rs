//! Partial evaluation.
//!
//! `evaluate` folds constant sub-expressions into [`EvaluatedNode`]s. It is
//! total: anything that cannot be folded statically becomes
//! [`EvaluatedNode::Unknown`]. Closures are captured eagerly at the point
//! their defining expression is evaluated and are only invoked when a call
//! whose callee folds to a closure is evaluated, by substituting the call
//! arguments for parameters and evaluating the body under that
//! environment.
//!
//! Self-referential constants are cut by an in-progress stack: revisiting a
//! node already being evaluated yields the unknown sentinel.

use crate::cache::NodeCache;
use crate::node_mapper::{AssignedObject, NodeMapper};
use rill_ast::node::{InfixOperator, PrefixOperator, TemplateSegment};
use rill_ast::{BuiltinRegistry, DocumentId, NodeKind, NodeRef, Workspace};
use rill_common::{RecursionGuard, RecursionProfile};
use rill_types::{
    BlockLambdaClosure, Constant, EvaluatedEnumVariant, EvaluatedList, EvaluatedMap,
    EvaluatedMapEntry, EvaluatedNamedTuple, EvaluatedNode, ExpressionLambdaClosure,
    ParameterSubstitutions, SegmentClosure,
};
use rill_types::value::EvaluatedTupleEntry;
use std::cell::RefCell;
use std::sync::Arc;
use tracing::trace;

const STACK_RED_ZONE: usize = 32 * 1024;
const STACK_GROW_BY: usize = 1024 * 1024;

/// The constant-folding engine.
pub struct PartialEvaluator {
    workspace: Arc<Workspace>,
    #[allow(dead_code)]
    builtins: Arc<BuiltinRegistry>,
    mapper: Arc<NodeMapper>,
    /// Memo of environment-independent evaluations only.
    cache: NodeCache<EvaluatedNode>,
    guard: RefCell<RecursionGuard<NodeRef>>,
}

impl PartialEvaluator {
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
            cache: NodeCache::new(),
            guard: RefCell::new(RecursionGuard::with_profile(profile)),
        }
    }

    pub fn invalidate_document(&self, document: DocumentId) {
        self.cache.invalidate_document(document);
    }

    /// Evaluates `node` with no parameter substitutions in scope.
    pub fn evaluate(&self, node: NodeRef) -> EvaluatedNode {
        self.evaluate_with(node, &ParameterSubstitutions::default())
    }

    /// Evaluates `node` under the given parameter substitutions.
    pub fn evaluate_with(&self, node: NodeRef, substitutions: &ParameterSubstitutions) -> EvaluatedNode {
        // Only environment-independent results are memoizable.
        let cacheable = substitutions.is_empty();
        if cacheable {
            if let Some(hit) = self.cache.get(node) {
                return hit;
            }
        }

        if self.guard.borrow_mut().enter(node).is_denied() {
            trace!(?node, "evaluation re-entered; yielding unknown");
            return EvaluatedNode::Unknown;
        }
        let result = stacker::maybe_grow(STACK_RED_ZONE, STACK_GROW_BY, || {
            self.do_evaluate(node, substitutions)
        });
        {
            let mut guard = self.guard.borrow_mut();
            guard.leave(node);
            // The iteration budget bounds one outermost evaluation, not
            // the lifetime of the engine.
            if guard.depth() == 0 {
                guard.reset();
            }
        }

        if cacheable {
            self.cache.insert(node, result.clone());
        }
        result
    }

    fn do_evaluate(&self, node: NodeRef, substitutions: &ParameterSubstitutions) -> EvaluatedNode {
        match self.workspace.kind(node).clone() {
            // Base cases
            NodeKind::BooleanLiteral(value) => Constant::Boolean(value).into(),
            NodeKind::FloatLiteral(value) => Constant::Float(value).into(),
            NodeKind::IntLiteral(value) => Constant::Int(value).into(),
            NodeKind::NullLiteral => Constant::Null.into(),
            NodeKind::StringLiteral(value) => Constant::String(value).into(),
            NodeKind::BlockLambda(_) => EvaluatedNode::BlockLambdaClosure(BlockLambdaClosure::new(
                node,
                substitutions.clone(),
            )),
            NodeKind::ExpressionLambda(_) => EvaluatedNode::ExpressionLambdaClosure(
                ExpressionLambdaClosure::new(node, substitutions.clone()),
            ),

            // Simple recursive cases
            NodeKind::Argument(argument) => {
                self.evaluate_with(self.workspace.sibling(node, argument.value), substitutions)
            }
            NodeKind::Parenthesized(inner) => {
                self.evaluate_with(self.workspace.sibling(node, inner.expression), substitutions)
            }
            NodeKind::ListLiteral(list) => EvaluatedNode::List(EvaluatedList::new(
                list.elements
                    .iter()
                    .map(|element| self.evaluate_with(self.workspace.sibling(node, *element), substitutions))
                    .collect(),
            )),
            NodeKind::MapLiteral(map) => EvaluatedNode::Map(EvaluatedMap::new(
                map.entries
                    .iter()
                    .filter_map(|entry| {
                        let entry_ref = self.workspace.sibling(node, *entry);
                        match self.workspace.kind(entry_ref) {
                            NodeKind::MapEntry(pair) => Some(EvaluatedMapEntry::new(
                                self.evaluate_with(self.workspace.sibling(entry_ref, pair.key), substitutions),
                                self.evaluate_with(self.workspace.sibling(entry_ref, pair.value), substitutions),
                            )),
                            _ => None,
                        }
                    })
                    .collect(),
            )),
            NodeKind::MapEntry(pair) => EvaluatedNode::MapEntry(EvaluatedMapEntry::new(
                self.evaluate_with(self.workspace.sibling(node, pair.key), substitutions),
                self.evaluate_with(self.workspace.sibling(node, pair.value), substitutions),
            )),

            // Complex recursive cases
            NodeKind::TemplateString(template) => self.evaluate_template_string(node, &template.segments, substitutions),
            NodeKind::InfixOperation(operation) => {
                let left = self.evaluate_with(self.workspace.sibling(node, operation.left), substitutions);
                self.evaluate_infix_operation(node, operation.operator, left, operation.right, substitutions)
            }
            NodeKind::PrefixOperation(operation) => {
                let operand =
                    self.evaluate_with(self.workspace.sibling(node, operation.operand), substitutions);
                self.evaluate_prefix_operation(operation.operator, operand)
            }
            NodeKind::Reference(reference) => self.evaluate_reference(reference.target, substitutions),
            NodeKind::MemberAccess(access) => self.evaluate_member_access(node, &access, substitutions),
            NodeKind::Call(_) => self.evaluate_call(node, substitutions),

            _ => EvaluatedNode::Unknown,
        }
    }

    // -----------------------------------------------------------------------
    // Template strings
    // -----------------------------------------------------------------------

    /// A template string is constant only if every interpolated segment
    /// evaluates to a constant; a single unknown segment poisons the whole
    /// template.
    fn evaluate_template_string(
        &self,
        node: NodeRef,
        segments: &[TemplateSegment],
        substitutions: &ParameterSubstitutions,
    ) -> EvaluatedNode {
        let mut text = String::new();
        for segment in segments {
            match segment {
                TemplateSegment::Text(literal) => text.push_str(literal),
                TemplateSegment::Interpolation(expression) => {
                    let value =
                        self.evaluate_with(self.workspace.sibling(node, *expression), substitutions);
                    match value.as_constant() {
                        Some(constant) => text.push_str(&constant.to_interpolation_string()),
                        None => {
                            trace!(?node, "template segment is not constant; poisoning template");
                            return EvaluatedNode::Unknown;
                        }
                    }
                }
            }
        }
        Constant::String(self.workspace.atom(&text)).into()
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    fn evaluate_prefix_operation(&self, operator: PrefixOperator, operand: EvaluatedNode) -> EvaluatedNode {
        match (operator, operand) {
            (PrefixOperator::Not, EvaluatedNode::Constant(Constant::Boolean(value))) => {
                Constant::Boolean(!value).into()
            }
            (PrefixOperator::Negate, EvaluatedNode::Constant(Constant::Int(value))) => value
                .checked_neg()
                .map(|negated| Constant::Int(negated).into())
                .unwrap_or(EvaluatedNode::Unknown),
            (PrefixOperator::Negate, EvaluatedNode::Constant(Constant::Float(value))) => {
                Constant::Float(-value).into()
            }
            _ => EvaluatedNode::Unknown,
        }
    }

    fn evaluate_infix_operation(
        &self,
        node: NodeRef,
        operator: InfixOperator,
        left: EvaluatedNode,
        right: rill_ast::NodeId,
        substitutions: &ParameterSubstitutions,
    ) -> EvaluatedNode {
        let right_ref = self.workspace.sibling(node, right);

        match operator {
            // Short-circuiting boolean operators.
            InfixOperator::Or => match left.as_constant() {
                Some(Constant::Boolean(true)) => Constant::Boolean(true).into(),
                Some(Constant::Boolean(false)) => {
                    match self.evaluate_with(right_ref, substitutions).as_constant() {
                        Some(Constant::Boolean(value)) => Constant::Boolean(*value).into(),
                        _ => EvaluatedNode::Unknown,
                    }
                }
                _ => EvaluatedNode::Unknown,
            },
            InfixOperator::And => match left.as_constant() {
                Some(Constant::Boolean(false)) => Constant::Boolean(false).into(),
                Some(Constant::Boolean(true)) => {
                    match self.evaluate_with(right_ref, substitutions).as_constant() {
                        Some(Constant::Boolean(value)) => Constant::Boolean(*value).into(),
                        _ => EvaluatedNode::Unknown,
                    }
                }
                _ => EvaluatedNode::Unknown,
            },

            // Null coalescing: the right side is only reached for null.
            InfixOperator::Elvis => match left {
                EvaluatedNode::Constant(Constant::Null) => self.evaluate_with(right_ref, substitutions),
                EvaluatedNode::Unknown => EvaluatedNode::Unknown,
                other => other,
            },

            // Equality. Every evaluated value is a value type, so identity
            // and structural equality coincide.
            InfixOperator::Equals | InfixOperator::IdenticalTo => {
                let right_value = self.evaluate_with(right_ref, substitutions);
                if left == EvaluatedNode::Unknown || right_value == EvaluatedNode::Unknown {
                    EvaluatedNode::Unknown
                } else {
                    Constant::Boolean(left == right_value).into()
                }
            }
            InfixOperator::NotEquals | InfixOperator::NotIdenticalTo => {
                let right_value = self.evaluate_with(right_ref, substitutions);
                if left == EvaluatedNode::Unknown || right_value == EvaluatedNode::Unknown {
                    EvaluatedNode::Unknown
                } else {
                    Constant::Boolean(left != right_value).into()
                }
            }

            // Comparisons and arithmetic on numbers.
            InfixOperator::LessThan
            | InfixOperator::LessThanOrEquals
            | InfixOperator::GreaterThanOrEquals
            | InfixOperator::GreaterThan
            | InfixOperator::Plus
            | InfixOperator::Minus
            | InfixOperator::Times
            | InfixOperator::DividedBy => {
                let right_value = self.evaluate_with(right_ref, substitutions);
                self.evaluate_numeric_operation(operator, &left, &right_value)
            }
        }
    }

    fn evaluate_numeric_operation(
        &self,
        operator: InfixOperator,
        left: &EvaluatedNode,
        right: &EvaluatedNode,
    ) -> EvaluatedNode {
        // Exact integer arithmetic when both operands are ints.
        if let (Some(Constant::Int(a)), Some(Constant::Int(b))) = (left.as_constant(), right.as_constant()) {
            let (a, b) = (*a, *b);
            return match operator {
                InfixOperator::LessThan => Constant::Boolean(a < b).into(),
                InfixOperator::LessThanOrEquals => Constant::Boolean(a <= b).into(),
                InfixOperator::GreaterThanOrEquals => Constant::Boolean(a >= b).into(),
                InfixOperator::GreaterThan => Constant::Boolean(a > b).into(),
                InfixOperator::Plus => int_or_unknown(a.checked_add(b)),
                InfixOperator::Minus => int_or_unknown(a.checked_sub(b)),
                InfixOperator::Times => int_or_unknown(a.checked_mul(b)),
                // Integer division by zero has no constant value.
                InfixOperator::DividedBy => int_or_unknown(a.checked_div(b)),
                _ => EvaluatedNode::Unknown,
            };
        }

        // Mixed or float arithmetic.
        let (Some(a), Some(b)) = (as_float(left), as_float(right)) else {
            return EvaluatedNode::Unknown;
        };
        match operator {
            InfixOperator::LessThan => Constant::Boolean(a < b).into(),
            InfixOperator::LessThanOrEquals => Constant::Boolean(a <= b).into(),
            InfixOperator::GreaterThanOrEquals => Constant::Boolean(a >= b).into(),
            InfixOperator::GreaterThan => Constant::Boolean(a > b).into(),
            InfixOperator::Plus => Constant::Float(a + b).into(),
            InfixOperator::Minus => Constant::Float(a - b).into(),
            InfixOperator::Times => Constant::Float(a * b).into(),
            InfixOperator::DividedBy => Constant::Float(a / b).into(),
            _ => EvaluatedNode::Unknown,
        }
    }

    // -----------------------------------------------------------------------
    // References and member accesses
    // -----------------------------------------------------------------------

    fn evaluate_reference(
        &self,
        target: Option<NodeRef>,
        substitutions: &ParameterSubstitutions,
    ) -> EvaluatedNode {
        let Some(target) = target else {
            return EvaluatedNode::Unknown;
        };
        match self.workspace.kind(target) {
            NodeKind::Placeholder(_) => self.evaluate_assignee(target, substitutions),
            NodeKind::Parameter(parameter) => {
                if let Some(bound) = substitutions.get(&target) {
                    return bound.clone();
                }
                match parameter.default_value {
                    Some(default) => {
                        self.evaluate_with(self.workspace.sibling(target, default), substitutions)
                    }
                    None => EvaluatedNode::Unknown,
                }
            }
            NodeKind::Segment(_) => EvaluatedNode::SegmentClosure(SegmentClosure::new(target)),
            NodeKind::EnumVariant(variant) => EvaluatedNode::EnumVariant(EvaluatedEnumVariant::new(
                target,
                variant.name.clone(),
                None,
            )),
            _ => EvaluatedNode::Unknown,
        }
    }

    fn evaluate_member_access(
        &self,
        node: NodeRef,
        access: &rill_ast::node::MemberAccess,
        substitutions: &ParameterSubstitutions,
    ) -> EvaluatedNode {
        let member = self.workspace.sibling(node, access.member);
        let target = match self.workspace.kind(member) {
            NodeKind::Reference(reference) => reference.target,
            _ => None,
        };

        // Enum variant access needs no receiver value.
        if let Some(target) = target {
            if let NodeKind::EnumVariant(variant) = self.workspace.kind(target) {
                return EvaluatedNode::EnumVariant(EvaluatedEnumVariant::new(
                    target,
                    variant.name.clone(),
                    None,
                ));
            }
        }

        let receiver = self.evaluate_with(self.workspace.sibling(node, access.receiver), substitutions);
        match (receiver, target) {
            (EvaluatedNode::Constant(Constant::Null), _) if access.null_safe => Constant::Null.into(),
            (EvaluatedNode::NamedTuple(tuple), Some(target)) => tuple.substitution_by_reference(target),
            _ => EvaluatedNode::Unknown,
        }
    }

    /// The value assigned to `assignee` (a placeholder, block-lambda
    /// result, or yield).
    fn evaluate_assignee(&self, assignee: NodeRef, substitutions: &ParameterSubstitutions) -> EvaluatedNode {
        match self.mapper.assignee_to_assigned_object(assignee) {
            Some(AssignedObject::Expression(expression)) => self.evaluate_with(expression, substitutions),
            Some(AssignedObject::Result(result)) => {
                let Some(assignment) = self
                    .workspace
                    .enclosing(assignee, |kind| matches!(kind, NodeKind::Assignment(_)))
                else {
                    return EvaluatedNode::Unknown;
                };
                let NodeKind::Assignment(payload) = self.workspace.kind(assignment) else {
                    return EvaluatedNode::Unknown;
                };
                let value = self.evaluate_with(
                    self.workspace.sibling(assignment, payload.expression),
                    substitutions,
                );
                match value {
                    EvaluatedNode::NamedTuple(tuple) => tuple.substitution_by_reference(result),
                    // Single-result calls fold to the bare value.
                    other if self.workspace.container_index(assignee) == 0 => other,
                    _ => EvaluatedNode::Unknown,
                }
            }
            None => EvaluatedNode::Unknown,
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    fn evaluate_call(&self, node: NodeRef, substitutions: &ParameterSubstitutions) -> EvaluatedNode {
        let NodeKind::Call(call) = self.workspace.kind(node).clone() else {
            return EvaluatedNode::Unknown;
        };
        let callee = self.evaluate_with(self.workspace.sibling(node, call.receiver), substitutions);

        match callee {
            EvaluatedNode::BlockLambdaClosure(closure) => {
                let environment =
                    self.bind_arguments(node, closure.lambda, &closure.substitutions, substitutions);
                let entries = self
                    .workspace
                    .block_lambda_results(closure.lambda)
                    .into_iter()
                    .map(|result| EvaluatedTupleEntry {
                        declaration: result,
                        name: self
                            .workspace
                            .kind(result)
                            .name()
                            .cloned()
                            .unwrap_or_else(|| self.workspace.atom("")),
                        value: self.evaluate_assignee(result, &environment),
                    })
                    .collect();
                EvaluatedNode::NamedTuple(EvaluatedNamedTuple::new(entries)).unwrap()
            }
            EvaluatedNode::ExpressionLambdaClosure(closure) => {
                let environment =
                    self.bind_arguments(node, closure.lambda, &closure.substitutions, substitutions);
                match self.workspace.kind(closure.lambda) {
                    NodeKind::ExpressionLambda(lambda) => self.evaluate_with(
                        self.workspace.sibling(closure.lambda, lambda.result),
                        &environment,
                    ),
                    _ => EvaluatedNode::Unknown,
                }
            }
            EvaluatedNode::SegmentClosure(closure) => {
                let environment =
                    self.bind_arguments(node, closure.segment, &closure.substitutions, substitutions);
                let NodeKind::Segment(segment) = self.workspace.kind(closure.segment).clone() else {
                    return EvaluatedNode::Unknown;
                };
                let entries = segment
                    .results
                    .iter()
                    .map(|result| {
                        let result_ref = self.workspace.sibling(closure.segment, *result);
                        let value = self
                            .mapper
                            .result_to_yields(result_ref)
                            .first()
                            .map(|yielded| self.evaluate_assignee(*yielded, &environment))
                            .unwrap_or(EvaluatedNode::Unknown);
                        EvaluatedTupleEntry {
                            declaration: result_ref,
                            name: self
                                .workspace
                                .kind(result_ref)
                                .name()
                                .cloned()
                                .unwrap_or_else(|| self.workspace.atom("")),
                            value,
                        }
                    })
                    .collect();
                EvaluatedNode::NamedTuple(EvaluatedNamedTuple::new(entries)).unwrap()
            }
            EvaluatedNode::EnumVariant(variant) if variant.args.is_none() => {
                let environment = self.bind_arguments(
                    node,
                    variant.variant,
                    &ParameterSubstitutions::default(),
                    substitutions,
                );
                EvaluatedNode::EnumVariant(EvaluatedEnumVariant::new(
                    variant.variant,
                    variant.name.clone(),
                    Some(environment),
                ))
            }
            _ => EvaluatedNode::Unknown,
        }
    }

    /// Builds the parameter environment for invoking `callable` from
    /// `call`: the captured substitutions, overridden by the evaluated call
    /// arguments, completed by parameter defaults.
    fn bind_arguments(
        &self,
        call: NodeRef,
        callable: NodeRef,
        captured: &ParameterSubstitutions,
        call_site_substitutions: &ParameterSubstitutions,
    ) -> ParameterSubstitutions {
        let mut environment = captured.clone();

        let NodeKind::Call(payload) = self.workspace.kind(call).clone() else {
            return environment;
        };
        for argument in &payload.arguments {
            let argument_ref = self.workspace.sibling(call, *argument);
            if let Some(parameter) = self.mapper.argument_to_parameter(argument_ref) {
                let NodeKind::Argument(argument_payload) = self.workspace.kind(argument_ref) else {
                    continue;
                };
                let value = self.evaluate_with(
                    self.workspace.sibling(argument_ref, argument_payload.value),
                    call_site_substitutions,
                );
                environment.insert(parameter, value);
            }
        }

        // Defaults for unbound parameters, evaluated in the callee's own
        // environment so earlier parameters are visible.
        for parameter in self.workspace.kind(callable).parameters().to_vec() {
            let parameter_ref = self.workspace.sibling(callable, parameter);
            if environment.contains_key(&parameter_ref) {
                continue;
            }
            if let NodeKind::Parameter(declaration) = self.workspace.kind(parameter_ref) {
                if let Some(default) = declaration.default_value {
                    let value =
                        self.evaluate_with(self.workspace.sibling(parameter_ref, default), &environment);
                    environment.insert(parameter_ref, value);
                }
            }
        }

        environment
    }
}

fn int_or_unknown(value: Option<i64>) -> EvaluatedNode {
    value
        .map(|it| Constant::Int(it).into())
        .unwrap_or(EvaluatedNode::Unknown)
}

fn as_float(value: &EvaluatedNode) -> Option<f64> {
    match value.as_constant() {
        Some(Constant::Int(it)) => Some(*it as f64),
        Some(Constant::Float(it)) => Some(*it),
        _ => None,
    }
}
