//! Expression validators built on the analyses.
//!
//! Validators consume sentinel results conservatively: a check that needs
//! a known type or a known constant simply does not fire when the engines
//! answer "unknown".

use crate::SemanticServices;
use rill_ast::node::InfixOperator;
use rill_ast::{NodeKind, NodeRef};
use rill_types::{Constant, EvaluatedNode};

pub const CODE_DIVISION_BY_ZERO: &str = "infix-operation/division-by-zero";

/// A finding attached to a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub code: &'static str,
    pub message: String,
    pub node: NodeRef,
}

/// Flags `a / b` when the divisor is the constant zero.
///
/// Fires only when the dividend is known to be numeric; a non-constant
/// divisor never fires.
pub fn division_divisor_must_not_be_zero(services: &SemanticServices, node: NodeRef) -> Option<Diagnostic> {
    let NodeKind::InfixOperation(operation) = services.workspace().kind(node) else {
        return None;
    };
    if operation.operator != InfixOperator::DividedBy {
        return None;
    }

    let types = services.types();
    let dividend_type = types.compute_type(services.workspace().sibling(node, operation.left));
    if dividend_type != types.int_type() && dividend_type != types.float_type() {
        return None;
    }

    let divisor = services
        .evaluator()
        .evaluate(services.workspace().sibling(node, operation.right));
    let is_zero = match divisor {
        EvaluatedNode::Constant(Constant::Int(value)) => value == 0,
        // Covers both 0.0 and -0.0.
        EvaluatedNode::Constant(Constant::Float(value)) => value == 0.0,
        _ => false,
    };

    is_zero.then(|| Diagnostic {
        code: CODE_DIVISION_BY_ZERO,
        message: "Division by zero.".to_string(),
        node,
    })
}
