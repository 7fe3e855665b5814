//! The result of partially evaluating a tree node.
//!
//! Values form a closed sum type: constants, closures, containers, and the
//! [`EvaluatedNode::Unknown`] sentinel. Closures are *captured*, never
//! executed: they hold the callable's body reference plus the parameter
//! substitutions in effect at the point of capture.

use indexmap::IndexMap;
use rill_ast::NodeRef;
use rill_common::Atom;
use std::fmt;

/// Mapping from parameter declarations to the values bound to them.
pub type ParameterSubstitutions = IndexMap<NodeRef, EvaluatedNode>;

/// The result of partially evaluating a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatedNode {
    Constant(Constant),
    BlockLambdaClosure(BlockLambdaClosure),
    ExpressionLambdaClosure(ExpressionLambdaClosure),
    SegmentClosure(SegmentClosure),
    EnumVariant(EvaluatedEnumVariant),
    List(EvaluatedList),
    Map(EvaluatedMap),
    MapEntry(EvaluatedMapEntry),
    NamedTuple(EvaluatedNamedTuple),
    /// The node could not be evaluated statically.
    Unknown,
}

impl EvaluatedNode {
    /// `true` only for constants and containers whose every element is
    /// itself fully evaluated. Closures are never fully evaluated.
    pub fn is_fully_evaluated(&self) -> bool {
        match self {
            EvaluatedNode::Constant(_) => true,
            EvaluatedNode::BlockLambdaClosure(_)
            | EvaluatedNode::ExpressionLambdaClosure(_)
            | EvaluatedNode::SegmentClosure(_) => false,
            EvaluatedNode::EnumVariant(it) => it.is_fully_evaluated(),
            EvaluatedNode::List(it) => it.elements.iter().all(EvaluatedNode::is_fully_evaluated),
            EvaluatedNode::Map(it) => it.entries.iter().all(EvaluatedMapEntry::is_fully_evaluated),
            EvaluatedNode::MapEntry(it) => it.is_fully_evaluated(),
            EvaluatedNode::NamedTuple(it) => {
                it.entries.iter().all(|entry| entry.value.is_fully_evaluated())
            }
            EvaluatedNode::Unknown => false,
        }
    }

    /// A named tuple with a single entry stands for that entry's value.
    pub fn unwrap(&self) -> EvaluatedNode {
        match self {
            EvaluatedNode::NamedTuple(it) if it.entries.len() == 1 => it.entries[0].value.clone(),
            _ => self.clone(),
        }
    }

    pub fn as_constant(&self) -> Option<&Constant> {
        match self {
            EvaluatedNode::Constant(it) => Some(it),
            _ => None,
        }
    }
}

impl fmt::Display for EvaluatedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatedNode::Constant(it) => fmt::Display::fmt(it, f),
            EvaluatedNode::BlockLambdaClosure(_) => f.write_str("$blockLambdaClosure"),
            EvaluatedNode::ExpressionLambdaClosure(_) => f.write_str("$expressionLambdaClosure"),
            EvaluatedNode::SegmentClosure(_) => f.write_str("$segmentClosure"),
            EvaluatedNode::EnumVariant(it) => fmt::Display::fmt(it, f),
            EvaluatedNode::List(it) => fmt::Display::fmt(it, f),
            EvaluatedNode::Map(it) => fmt::Display::fmt(it, f),
            EvaluatedNode::MapEntry(it) => fmt::Display::fmt(it, f),
            EvaluatedNode::NamedTuple(it) => fmt::Display::fmt(it, f),
            EvaluatedNode::Unknown => f.write_str("?"),
        }
    }
}

impl From<Constant> for EvaluatedNode {
    fn from(value: Constant) -> Self {
        EvaluatedNode::Constant(value)
    }
}

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A constant value. Constants of different kinds are never equal, so
/// `Int(1)` and `Float(1.0)` are distinct.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Boolean(bool),
    Float(f64),
    Int(i64),
    Null,
    String(Atom),
}

impl Constant {
    /// Rendering used inside template strings: like `Display`, but string
    /// constants appear without surrounding quotes.
    pub fn to_interpolation_string(&self) -> String {
        match self {
            Constant::String(value) => value.to_string(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Boolean(value) => write!(f, "{value}"),
            Constant::Float(value) => write!(f, "{value}"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Null => f.write_str("null"),
            Constant::String(value) => write!(f, "\"{value}\""),
        }
    }
}

// ---------------------------------------------------------------------------
// Closures
// ---------------------------------------------------------------------------

/// A block lambda captured at its point of definition.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockLambdaClosure {
    pub lambda: NodeRef,
    /// Parameter substitutions in effect when the closure was captured.
    pub substitutions: ParameterSubstitutions,
}

impl BlockLambdaClosure {
    pub fn new(lambda: NodeRef, substitutions: ParameterSubstitutions) -> Self {
        Self {
            lambda,
            substitutions,
        }
    }
}

/// An expression lambda captured at its point of definition.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionLambdaClosure {
    pub lambda: NodeRef,
    pub substitutions: ParameterSubstitutions,
}

impl ExpressionLambdaClosure {
    pub fn new(lambda: NodeRef, substitutions: ParameterSubstitutions) -> Self {
        Self {
            lambda,
            substitutions,
        }
    }
}

/// A segment referenced as a value.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentClosure {
    pub segment: NodeRef,
    /// Always empty today; segments are top-level and capture nothing.
    pub substitutions: ParameterSubstitutions,
}

impl SegmentClosure {
    pub fn new(segment: NodeRef) -> Self {
        Self {
            segment,
            substitutions: ParameterSubstitutions::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Containers
// ---------------------------------------------------------------------------

/// An enum variant, possibly instantiated with argument substitutions.
///
/// A variant that has not been invoked yet (`args` is `None`) is not fully
/// evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedEnumVariant {
    pub variant: NodeRef,
    pub name: Atom,
    pub args: Option<ParameterSubstitutions>,
}

impl EvaluatedEnumVariant {
    pub fn new(variant: NodeRef, name: Atom, args: Option<ParameterSubstitutions>) -> Self {
        Self {
            variant,
            name,
            args,
        }
    }

    fn is_fully_evaluated(&self) -> bool {
        match &self.args {
            Some(args) => args.values().all(EvaluatedNode::is_fully_evaluated),
            None => false,
        }
    }
}

impl fmt::Display for EvaluatedEnumVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An evaluated list literal.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluatedList {
    pub elements: Vec<EvaluatedNode>,
}

impl EvaluatedList {
    pub fn new(elements: Vec<EvaluatedNode>) -> Self {
        Self { elements }
    }

    /// The element at `index`, or [`EvaluatedNode::Unknown`] if the index
    /// is out of bounds.
    pub fn element_by_index(&self, index: usize) -> EvaluatedNode {
        self.elements.get(index).cloned().unwrap_or(EvaluatedNode::Unknown)
    }
}

impl fmt::Display for EvaluatedList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (index, element) in self.elements.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{element}")?;
        }
        write!(f, "]")
    }
}

/// An evaluated map literal. Entries keep their source order; lookups take
/// the *last* entry with an equal key, so later entries shadow earlier ones.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluatedMap {
    pub entries: Vec<EvaluatedMapEntry>,
}

impl EvaluatedMap {
    pub fn new(entries: Vec<EvaluatedMapEntry>) -> Self {
        Self { entries }
    }

    /// The value of the last entry whose key equals `key`, or
    /// [`EvaluatedNode::Unknown`] if no entry matches.
    pub fn last_value_for_key(&self, key: &EvaluatedNode) -> EvaluatedNode {
        self.entries
            .iter()
            .rev()
            .find(|entry| *entry.key == *key)
            .map(|entry| (*entry.value).clone())
            .unwrap_or(EvaluatedNode::Unknown)
    }
}

impl fmt::Display for EvaluatedMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        write!(f, "}}")
    }
}

/// One key-value pair of an [`EvaluatedMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedMapEntry {
    pub key: Box<EvaluatedNode>,
    pub value: Box<EvaluatedNode>,
}

impl EvaluatedMapEntry {
    pub fn new(key: EvaluatedNode, value: EvaluatedNode) -> Self {
        Self {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    fn is_fully_evaluated(&self) -> bool {
        self.key.is_fully_evaluated() && self.value.is_fully_evaluated()
    }
}

impl fmt::Display for EvaluatedMapEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.value)
    }
}

/// The evaluated results of a callable invocation, in declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EvaluatedNamedTuple {
    pub entries: Vec<EvaluatedTupleEntry>,
}

/// One result of an [`EvaluatedNamedTuple`].
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatedTupleEntry {
    /// The result or block-lambda-result declaration producing the value.
    pub declaration: NodeRef,
    pub name: Atom,
    pub value: EvaluatedNode,
}

impl EvaluatedNamedTuple {
    pub fn new(entries: Vec<EvaluatedTupleEntry>) -> Self {
        Self { entries }
    }

    /// The value produced for `declaration`, or [`EvaluatedNode::Unknown`].
    pub fn substitution_by_reference(&self, declaration: NodeRef) -> EvaluatedNode {
        self.entries
            .iter()
            .find(|entry| entry.declaration == declaration)
            .map(|entry| entry.value.clone())
            .unwrap_or(EvaluatedNode::Unknown)
    }

    /// The value at `index`, or [`EvaluatedNode::Unknown`] if out of bounds.
    pub fn substitution_by_index(&self, index: usize) -> EvaluatedNode {
        self.entries
            .get(index)
            .map(|entry| entry.value.clone())
            .unwrap_or(EvaluatedNode::Unknown)
    }
}

impl fmt::Display for EvaluatedNamedTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", entry.name, entry.value)?;
        }
        write!(f, ")")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rill_ast::{DocumentId, NodeId, NodeRef};
    use rill_common::Interner;

    fn node(id: u32) -> NodeRef {
        NodeRef::new(DocumentId(1), NodeId(id))
    }

    fn atom(text: &str) -> Atom {
        Interner::new().intern(text)
    }

    fn int(value: i64) -> EvaluatedNode {
        EvaluatedNode::Constant(Constant::Int(value))
    }

    fn null() -> EvaluatedNode {
        EvaluatedNode::Constant(Constant::Null)
    }

    // =======================================================================
    // Equality
    // =======================================================================

    #[test]
    fn constants_of_same_kind_compare_by_value() {
        assert_eq!(Constant::Boolean(true), Constant::Boolean(true));
        assert_ne!(Constant::Boolean(true), Constant::Boolean(false));
        assert_eq!(Constant::Int(1), Constant::Int(1));
        assert_ne!(Constant::Int(1), Constant::Int(2));
        assert_eq!(Constant::Float(1.5), Constant::Float(1.5));
        assert_ne!(Constant::Float(1.0), Constant::Float(2.0));
        assert_eq!(Constant::String(atom("foo")), Constant::String(atom("foo")));
        assert_ne!(Constant::String(atom("foo")), Constant::String(atom("bar")));
    }

    #[test]
    fn constants_of_different_kinds_are_never_equal() {
        assert_ne!(Constant::Int(1), Constant::Float(1.0));
        assert_ne!(Constant::Boolean(true), Constant::Null);
        assert_ne!(Constant::String(atom("1")), Constant::Int(1));
    }

    #[test]
    fn lists_compare_by_elements() {
        assert_eq!(
            EvaluatedList::new(vec![int(1)]),
            EvaluatedList::new(vec![int(1)])
        );
        assert_ne!(
            EvaluatedList::new(vec![int(1)]),
            EvaluatedList::new(vec![int(2)])
        );
    }

    #[test]
    fn closures_compare_by_body_and_captures() {
        let first = BlockLambdaClosure::new(node(1), ParameterSubstitutions::default());
        let same = BlockLambdaClosure::new(node(1), ParameterSubstitutions::default());
        let other = BlockLambdaClosure::new(node(2), ParameterSubstitutions::default());
        assert_eq!(first, same);
        assert_ne!(first, other);
    }

    #[test]
    fn unknown_equals_only_itself() {
        assert_eq!(EvaluatedNode::Unknown, EvaluatedNode::Unknown);
        assert_ne!(EvaluatedNode::Unknown, null());
    }

    // =======================================================================
    // Display
    // =======================================================================

    #[test]
    fn constant_display() {
        assert_eq!(Constant::Boolean(true).to_string(), "true");
        assert_eq!(Constant::Float(1.5).to_string(), "1.5");
        assert_eq!(Constant::Int(1).to_string(), "1");
        assert_eq!(Constant::Null.to_string(), "null");
        assert_eq!(Constant::String(atom("foo")).to_string(), "\"foo\"");
    }

    #[test]
    fn interpolation_string_drops_quotes() {
        assert_eq!(Constant::Boolean(true).to_interpolation_string(), "true");
        assert_eq!(Constant::Float(1.5).to_interpolation_string(), "1.5");
        assert_eq!(Constant::Int(1).to_interpolation_string(), "1");
        assert_eq!(Constant::Null.to_interpolation_string(), "null");
        assert_eq!(Constant::String(atom("foo")).to_interpolation_string(), "foo");
    }

    #[test]
    fn container_display() {
        assert_eq!(EvaluatedList::new(vec![]).to_string(), "[]");
        assert_eq!(EvaluatedList::new(vec![null()]).to_string(), "[null]");
        assert_eq!(EvaluatedMap::new(vec![]).to_string(), "{}");
        assert_eq!(
            EvaluatedMap::new(vec![EvaluatedMapEntry::new(null(), null())]).to_string(),
            "{null: null}"
        );
        assert_eq!(EvaluatedMapEntry::new(null(), null()).to_string(), "null: null");
        assert_eq!(EvaluatedNamedTuple::new(vec![]).to_string(), "()");
        assert_eq!(
            EvaluatedNamedTuple::new(vec![EvaluatedTupleEntry {
                declaration: node(1),
                name: atom("r"),
                value: int(1),
            }])
            .to_string(),
            "(r = 1)"
        );
        assert_eq!(EvaluatedNode::Unknown.to_string(), "?");
    }

    // =======================================================================
    // is_fully_evaluated
    // =======================================================================

    #[test]
    fn constants_are_fully_evaluated() {
        for constant in [
            Constant::Boolean(true),
            Constant::Float(1.0),
            Constant::Int(1),
            Constant::Null,
            Constant::String(atom("foo")),
        ] {
            assert!(EvaluatedNode::Constant(constant).is_fully_evaluated());
        }
    }

    #[test]
    fn closures_are_never_fully_evaluated() {
        let substitutions = ParameterSubstitutions::default();
        assert!(
            !EvaluatedNode::BlockLambdaClosure(BlockLambdaClosure::new(node(1), substitutions.clone()))
                .is_fully_evaluated()
        );
        assert!(
            !EvaluatedNode::ExpressionLambdaClosure(ExpressionLambdaClosure::new(node(1), substitutions))
                .is_fully_evaluated()
        );
        assert!(!EvaluatedNode::SegmentClosure(SegmentClosure::new(node(1))).is_fully_evaluated());
    }

    #[test]
    fn containers_require_fully_evaluated_elements() {
        assert!(EvaluatedNode::List(EvaluatedList::new(vec![null()])).is_fully_evaluated());
        assert!(
            !EvaluatedNode::List(EvaluatedList::new(vec![EvaluatedNode::Unknown])).is_fully_evaluated()
        );

        assert!(
            EvaluatedNode::Map(EvaluatedMap::new(vec![EvaluatedMapEntry::new(null(), null())]))
                .is_fully_evaluated()
        );
        assert!(!EvaluatedNode::Map(EvaluatedMap::new(vec![EvaluatedMapEntry::new(
            EvaluatedNode::Unknown,
            null(),
        )]))
        .is_fully_evaluated());
        assert!(!EvaluatedNode::Map(EvaluatedMap::new(vec![EvaluatedMapEntry::new(
            null(),
            EvaluatedNode::Unknown,
        )]))
        .is_fully_evaluated());
    }

    #[test]
    fn uninvoked_enum_variant_is_not_fully_evaluated() {
        let uninvoked = EvaluatedEnumVariant::new(node(1), atom("V"), None);
        assert!(!EvaluatedNode::EnumVariant(uninvoked).is_fully_evaluated());

        let invoked = EvaluatedEnumVariant::new(node(1), atom("V"), Some(ParameterSubstitutions::default()));
        assert!(EvaluatedNode::EnumVariant(invoked).is_fully_evaluated());
    }

    #[test]
    fn unknown_is_not_fully_evaluated() {
        assert!(!EvaluatedNode::Unknown.is_fully_evaluated());
    }

    // =======================================================================
    // Container lookups
    // =======================================================================

    #[test]
    fn list_lookup_by_index() {
        let list = EvaluatedList::new(vec![int(1), int(2)]);
        assert_eq!(list.element_by_index(0), int(1));
        assert_eq!(list.element_by_index(1), int(2));
        assert_eq!(list.element_by_index(2), EvaluatedNode::Unknown);
    }

    #[test]
    fn map_lookup_takes_last_matching_entry() {
        let map = EvaluatedMap::new(vec![
            EvaluatedMapEntry::new(int(1), int(10)),
            EvaluatedMapEntry::new(int(2), int(20)),
            EvaluatedMapEntry::new(int(1), int(30)),
        ]);
        assert_eq!(map.last_value_for_key(&int(1)), int(30));
        assert_eq!(map.last_value_for_key(&int(2)), int(20));
        assert_eq!(map.last_value_for_key(&int(3)), EvaluatedNode::Unknown);
    }

    #[test]
    fn named_tuple_lookups_and_unwrap() {
        let tuple = EvaluatedNamedTuple::new(vec![
            EvaluatedTupleEntry {
                declaration: node(1),
                name: atom("a"),
                value: int(1),
            },
            EvaluatedTupleEntry {
                declaration: node(2),
                name: atom("b"),
                value: int(2),
            },
        ]);
        assert_eq!(tuple.substitution_by_reference(node(2)), int(2));
        assert_eq!(tuple.substitution_by_reference(node(9)), EvaluatedNode::Unknown);
        assert_eq!(tuple.substitution_by_index(0), int(1));
        assert_eq!(tuple.substitution_by_index(5), EvaluatedNode::Unknown);

        let singleton = EvaluatedNode::NamedTuple(EvaluatedNamedTuple::new(vec![EvaluatedTupleEntry {
            declaration: node(1),
            name: atom("a"),
            value: int(7),
        }]));
        assert_eq!(singleton.unwrap(), int(7));

        let multi = EvaluatedNode::NamedTuple(tuple);
        assert_eq!(multi.unwrap(), multi);
    }
}
