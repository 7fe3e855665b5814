//! Type and evaluated-value models for the Rill semantic core.
//!
//! Two closed sum types, both immutable value models:
//!
//! - [`model::Type`]: the result of type inference, with the substitution
//!   algebra for generic type parameters
//! - [`value::EvaluatedNode`]: the result of partial evaluation — constants,
//!   containers, and unevaluated closures
//!
//! Every operation on them is pure and total; "no information" is a value
//! ([`Type::Unknown`], [`EvaluatedNode::Unknown`]), never an error.

pub mod model;
pub mod value;

pub use model::{
    CallableType, ClassType, EnumType, EnumVariantType, LiteralType, NamedTupleEntry,
    NamedTupleType, StaticType, Type, TypeParameterSubstitutions, TypeParameterType, UnionType,
};
pub use value::{
    BlockLambdaClosure, Constant, EvaluatedEnumVariant, EvaluatedList, EvaluatedMap,
    EvaluatedMapEntry, EvaluatedNamedTuple, EvaluatedNode, EvaluatedTupleEntry,
    ExpressionLambdaClosure, ParameterSubstitutions, SegmentClosure,
};
