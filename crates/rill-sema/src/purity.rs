//! Call-graph construction and purity classification.
//!
//! The call graph is implicit: nodes are callable declarations, edges are
//! the statically visible calls in their bodies. A callee is resolved
//! through the declaration mapper, or through the partial evaluator when
//! the callee expression folds to a closure (an aliased lambda or
//! segment). Purity is a reachability fold over this graph; a cycle is cut
//! by treating a callable already on the traversal stack as
//! potentially-recursive, which is conservative but terminates.

use crate::cache::NodeCache;
use crate::evaluator::PartialEvaluator;
use crate::node_mapper::NodeMapper;
use rill_ast::node::{ImpuritySpec, PurityAnnotation};
use rill_ast::{BuiltinRegistry, DocumentId, NodeKind, NodeRef, Workspace};
use rill_common::{Atom, RecursionGuard, RecursionProfile};
use rill_types::{Constant, EvaluatedNode};
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

/// How a file path flowing into an impure operation is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathDescriptor {
    /// The path is a compile-time constant.
    Constant(Atom),
    /// The path comes from the named parameter and is unknown statically.
    Parameter(Atom),
}

impl fmt::Display for PathDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathDescriptor::Constant(path) => write!(f, "\"{path}\""),
            PathDescriptor::Parameter(parameter) => write!(f, "the value of parameter '{parameter}'"),
        }
    }
}

/// One reason a callable is not pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpurityReason {
    FileRead { path: PathDescriptor },
    FileWrite { path: PathDescriptor },
    /// The callable invokes one of its callable parameters, whose purity
    /// is unknown at the declaration site.
    PotentiallyImpureParameterCall { parameter: Atom },
    /// The callable reaches an impure callable.
    CallsImpureCallable { callee: Atom },
    /// A call target could not be resolved statically.
    UnknownCallable,
    /// The callable takes part in a call cycle; purity cannot be asserted.
    PotentiallyRecursiveCall,
    Other,
}

impl fmt::Display for ImpurityReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImpurityReason::FileRead { path } => write!(f, "reads from {path}"),
            ImpurityReason::FileWrite { path } => write!(f, "writes to {path}"),
            ImpurityReason::PotentiallyImpureParameterCall { parameter } => {
                write!(f, "calls the potentially impure parameter '{parameter}'")
            }
            ImpurityReason::CallsImpureCallable { callee } => {
                write!(f, "calls the impure callable '{callee}'")
            }
            ImpurityReason::UnknownCallable => f.write_str("calls an unresolvable callable"),
            ImpurityReason::PotentiallyRecursiveCall => f.write_str("is potentially recursive"),
            ImpurityReason::Other => f.write_str("performs another impure operation"),
        }
    }
}

/// The purity verdict for a callable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Purity {
    Pure,
    Impure(Vec<ImpurityReason>),
}

impl Purity {
    fn from_reasons(reasons: Vec<ImpurityReason>) -> Self {
        if reasons.is_empty() {
            Purity::Pure
        } else {
            Purity::Impure(reasons)
        }
    }

    pub fn is_pure(&self) -> bool {
        matches!(self, Purity::Pure)
    }

    pub fn reasons(&self) -> &[ImpurityReason] {
        match self {
            Purity::Pure => &[],
            Purity::Impure(reasons) => reasons,
        }
    }
}

/// Classifies callables as pure or impure with reasons.
pub struct PurityComputer {
    workspace: Arc<Workspace>,
    builtins: Arc<BuiltinRegistry>,
    mapper: Arc<NodeMapper>,
    evaluator: Arc<PartialEvaluator>,
    cache: NodeCache<Purity>,
    guard: RefCell<RecursionGuard<NodeRef>>,
}

impl PurityComputer {
    pub fn new(
        workspace: Arc<Workspace>,
        builtins: Arc<BuiltinRegistry>,
        mapper: Arc<NodeMapper>,
        evaluator: Arc<PartialEvaluator>,
        profile: RecursionProfile,
    ) -> Self {
        Self {
            workspace,
            builtins,
            mapper,
            evaluator,
            cache: NodeCache::new(),
            guard: RefCell::new(RecursionGuard::with_profile(profile)),
        }
    }

    pub fn invalidate_document(&self, document: DocumentId) {
        self.cache.invalidate_document(document);
    }

    /// `true` if the callable has no impurity reasons.
    pub fn is_pure(&self, callable: NodeRef) -> bool {
        self.purity(callable).is_pure()
    }

    /// The purity verdict for a callable. Total; memoized per callable.
    pub fn purity(&self, callable: NodeRef) -> Purity {
        if !self.workspace.kind(callable).is_callable() {
            return Purity::Pure;
        }
        if let Some(hit) = self.cache.get(callable) {
            return hit;
        }

        // A callable already on the traversal stack is part of a call
        // cycle; answer conservatively for this traversal without caching.
        if self.guard.borrow_mut().enter(callable).is_denied() {
            trace!(?callable, "call-graph cycle; answering potentially-recursive");
            return Purity::Impure(vec![ImpurityReason::PotentiallyRecursiveCall]);
        }
        let reasons = self.compute_reasons(callable);
        {
            let mut guard = self.guard.borrow_mut();
            guard.leave(callable);
            // The iteration budget bounds one outermost traversal, not the
            // lifetime of the engine.
            if guard.depth() == 0 {
                guard.reset();
            }
        }

        let verdict = Purity::from_reasons(reasons);
        self.cache.insert(callable, verdict.clone());
        verdict
    }

    /// The statically visible call targets of a callable's body, aliases
    /// resolved through the partial evaluator.
    pub fn callees(&self, callable: NodeRef) -> Vec<NodeRef> {
        self.body_calls(callable)
            .into_iter()
            .filter_map(|call| self.resolve_call_target(call))
            .collect()
    }

    fn compute_reasons(&self, callable: NodeRef) -> Vec<ImpurityReason> {
        match self.workspace.kind(callable) {
            // Functions are externally implemented; their effects are
            // declared, not inferred.
            NodeKind::Function(_) => {
                let annotation = self
                    .builtins
                    .purity_annotation(self.workspace.kind(callable))
                    .cloned()
                    .unwrap_or(PurityAnnotation::Pure);
                annotation_reasons(&annotation)
            }
            // Constructors allocate and nothing else.
            NodeKind::Class(_) | NodeKind::EnumVariant(_) | NodeKind::CallableType(_) => Vec::new(),
            NodeKind::Segment(_)
            | NodeKind::Pipeline(_)
            | NodeKind::BlockLambda(_)
            | NodeKind::ExpressionLambda(_) => {
                let mut reasons = Vec::new();
                for call in self.body_calls(callable) {
                    reasons.extend(self.reasons_for_call(call));
                }
                reasons
            }
            _ => Vec::new(),
        }
    }

    /// All call expressions in the callable's subtree, in source order.
    fn body_calls(&self, callable: NodeRef) -> Vec<NodeRef> {
        self.workspace
            .descendants(callable)
            .into_iter()
            .filter(|node| matches!(self.workspace.kind(*node), NodeKind::Call(_)))
            .collect()
    }

    fn reasons_for_call(&self, call: NodeRef) -> Vec<ImpurityReason> {
        let Some(target) = self.resolve_call_target(call) else {
            return vec![ImpurityReason::UnknownCallable];
        };

        // A call of a callable parameter cannot be resolved further; its
        // purity is whatever the caller passes in.
        if matches!(self.workspace.kind(target), NodeKind::CallableType(_)) {
            let parameter = self
                .workspace
                .enclosing(target, |kind| matches!(kind, NodeKind::Parameter(_)))
                .or_else(|| {
                    // The annotation node itself is the direct child.
                    self.workspace
                        .parent(target)
                        .filter(|p| matches!(self.workspace.kind(*p), NodeKind::Parameter(_)))
                });
            let name = parameter
                .and_then(|p| self.workspace.kind(p).name().cloned())
                .unwrap_or_else(|| self.workspace.atom("?"));
            return vec![ImpurityReason::PotentiallyImpureParameterCall { parameter: name }];
        }

        match self.purity(target) {
            Purity::Pure => Vec::new(),
            Purity::Impure(callee_reasons) => {
                let mut reasons = Vec::new();
                let mut transitive = false;

                for reason in callee_reasons {
                    match reason {
                        // Declared file operations surface at the call
                        // site, with parameterized paths folded to the
                        // actual argument where it is constant.
                        ImpurityReason::FileRead { path } => reasons.push(ImpurityReason::FileRead {
                            path: self.resolve_path(call, target, path),
                        }),
                        ImpurityReason::FileWrite { path } => reasons.push(ImpurityReason::FileWrite {
                            path: self.resolve_path(call, target, path),
                        }),
                        ImpurityReason::Other => reasons.push(ImpurityReason::Other),
                        ImpurityReason::PotentiallyImpureParameterCall { parameter } => {
                            // Resolve the callable argument bound to the
                            // parameter if it folds to a closure.
                            match self.resolve_parameter_call(call, target, &parameter) {
                                Some(resolved) => reasons.extend(resolved),
                                None => reasons
                                    .push(ImpurityReason::PotentiallyImpureParameterCall { parameter }),
                            }
                        }
                        _ => transitive = true,
                    }
                }

                if transitive {
                    let callee = self
                        .workspace
                        .kind(target)
                        .name()
                        .cloned()
                        .unwrap_or_else(|| self.workspace.atom("<lambda>"));
                    reasons.push(ImpurityReason::CallsImpureCallable { callee });
                }
                reasons
            }
        }
    }

    /// The call's target: the mapped callable, or the closure the callee
    /// expression folds to.
    fn resolve_call_target(&self, call: NodeRef) -> Option<NodeRef> {
        if let Some(target) = self.mapper.call_to_callable(call) {
            return Some(target);
        }
        let NodeKind::Call(payload) = self.workspace.kind(call) else {
            return None;
        };
        match self.evaluator.evaluate(self.workspace.sibling(call, payload.receiver)) {
            EvaluatedNode::BlockLambdaClosure(closure) => Some(closure.lambda),
            EvaluatedNode::ExpressionLambdaClosure(closure) => Some(closure.lambda),
            EvaluatedNode::SegmentClosure(closure) => Some(closure.segment),
            _ => None,
        }
    }

    /// Folds a parameterized path to the constant argument supplied at
    /// `call`, when there is one.
    fn resolve_path(&self, call: NodeRef, callee: NodeRef, path: PathDescriptor) -> PathDescriptor {
        let PathDescriptor::Parameter(parameter_name) = &path else {
            return path;
        };
        let Some(value) = self.argument_value_for(call, callee, parameter_name) else {
            return path;
        };
        match self.evaluator.evaluate(value) {
            EvaluatedNode::Constant(Constant::String(text)) => PathDescriptor::Constant(text),
            _ => path,
        }
    }

    /// When an impure function calls one of its callable parameters, see
    /// through the argument: a closure argument contributes its own
    /// reasons instead of the generic parameter-call reason.
    fn resolve_parameter_call(
        &self,
        call: NodeRef,
        callee: NodeRef,
        parameter_name: &Atom,
    ) -> Option<Vec<ImpurityReason>> {
        let value = self.argument_value_for(call, callee, parameter_name)?;
        let target = match self.evaluator.evaluate(value) {
            EvaluatedNode::BlockLambdaClosure(closure) => closure.lambda,
            EvaluatedNode::ExpressionLambdaClosure(closure) => closure.lambda,
            EvaluatedNode::SegmentClosure(closure) => closure.segment,
            _ => return None,
        };
        match self.purity(target) {
            Purity::Pure => Some(Vec::new()),
            Purity::Impure(_) => {
                let name = self
                    .workspace
                    .kind(target)
                    .name()
                    .cloned()
                    .unwrap_or_else(|| self.workspace.atom("<lambda>"));
                Some(vec![ImpurityReason::CallsImpureCallable { callee: name }])
            }
        }
    }

    /// The value expression of the argument bound to the named parameter
    /// of `callee` at `call` (or the parameter's default).
    fn argument_value_for(&self, call: NodeRef, callee: NodeRef, parameter_name: &Atom) -> Option<NodeRef> {
        let parameter = self
            .workspace
            .kind(callee)
            .parameters()
            .iter()
            .map(|p| self.workspace.sibling(callee, *p))
            .find(|p| self.workspace.kind(*p).name() == Some(parameter_name))?;

        let NodeKind::Call(payload) = self.workspace.kind(call) else {
            return None;
        };
        for argument in &payload.arguments {
            let argument_ref = self.workspace.sibling(call, *argument);
            if self.mapper.argument_to_parameter(argument_ref) == Some(parameter) {
                if let NodeKind::Argument(argument_payload) = self.workspace.kind(argument_ref) {
                    return Some(self.workspace.sibling(argument_ref, argument_payload.value));
                }
            }
        }

        match self.workspace.kind(parameter) {
            NodeKind::Parameter(declaration) => declaration
                .default_value
                .map(|default| self.workspace.sibling(parameter, default)),
            _ => None,
        }
    }
}

fn annotation_reasons(annotation: &PurityAnnotation) -> Vec<ImpurityReason> {
    match annotation {
        PurityAnnotation::Pure => Vec::new(),
        PurityAnnotation::Impure(specs) => specs
            .iter()
            .map(|spec| match spec {
                ImpuritySpec::FileReadFromConstantPath(path) => ImpurityReason::FileRead {
                    path: PathDescriptor::Constant(path.clone()),
                },
                ImpuritySpec::FileReadFromParameterizedPath(parameter) => ImpurityReason::FileRead {
                    path: PathDescriptor::Parameter(parameter.clone()),
                },
                ImpuritySpec::FileWriteToConstantPath(path) => ImpurityReason::FileWrite {
                    path: PathDescriptor::Constant(path.clone()),
                },
                ImpuritySpec::FileWriteToParameterizedPath(parameter) => ImpurityReason::FileWrite {
                    path: PathDescriptor::Parameter(parameter.clone()),
                },
                ImpuritySpec::PotentiallyImpureParameterCall(parameter) => {
                    ImpurityReason::PotentiallyImpureParameterCall {
                        parameter: parameter.clone(),
                    }
                }
                ImpuritySpec::Other => ImpurityReason::Other,
            })
            .collect(),
    }
}
