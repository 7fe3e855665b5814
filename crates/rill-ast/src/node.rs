//! Node kinds and payloads of the Rill tree.
//!
//! The grammar categories form a closed sum type, [`NodeKind`]; every
//! analysis dispatches on it with exhaustive matches, so adding a category
//! fails to compile until each engine handles it.

use crate::arena::{NodeId, NodeRef};
use bitflags::bitflags;
use rill_common::Atom;
use smallvec::SmallVec;

/// One node of a document's arena: its kind payload plus tree links.
///
/// `parent` and `container_index` are maintained by the builder; a node
/// appears in exactly one child list of exactly one parent.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    /// Index of this node within the child list it was attached under
    /// (argument position, assignee position, member position, ...).
    pub container_index: u32,
}

bitflags! {
    /// Declaration modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DeclFlags: u8 {
        /// Class member that belongs to the class itself, not an instance.
        const STATIC = 1 << 0;
        /// Visible only within the declaring file.
        const PRIVATE = 1 << 1;
        /// Visible only within the declaring package.
        const INTERNAL = 1 << 2;
        /// Marked as deprecated for consumers.
        const DEPRECATED = 1 << 3;
    }
}

/// Purity annotation of a function declaration.
///
/// Functions are externally implemented, so their effect on the outside
/// world is declared, not inferred. Segments, pipelines, and lambdas carry
/// no annotation; their purity is inferred transitively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurityAnnotation {
    Pure,
    Impure(Vec<ImpuritySpec>),
}

/// One declared impure operation of a function.
///
/// Parameterized variants name the parameter whose argument supplies the
/// concrete path or callable at each call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImpuritySpec {
    FileReadFromConstantPath(Atom),
    FileReadFromParameterizedPath(Atom),
    FileWriteToConstantPath(Atom),
    FileWriteToParameterizedPath(Atom),
    PotentiallyImpureParameterCall(Atom),
    Other,
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Or,
    And,
    Equals,
    NotEquals,
    IdenticalTo,
    NotIdenticalTo,
    LessThan,
    LessThanOrEquals,
    GreaterThanOrEquals,
    GreaterThan,
    Plus,
    Minus,
    Times,
    DividedBy,
    /// Null coalescing (`?:`).
    Elvis,
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Not,
    Negate,
}

/// One segment of a template string: literal text or an interpolated
/// expression node.
#[derive(Debug, Clone)]
pub enum TemplateSegment {
    Text(Atom),
    Interpolation(NodeId),
}

// ---------------------------------------------------------------------------
// Declaration payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ModuleDecl {
    /// Qualified package name of the file.
    pub package: Atom,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Atom,
    pub flags: DeclFlags,
    pub type_parameters: SmallVec<[NodeId; 2]>,
    /// Constructor parameters.
    pub parameters: SmallVec<[NodeId; 4]>,
    /// Parent types; only the first is followed by the hierarchy walker.
    pub parent_types: SmallVec<[NodeId; 1]>,
    pub members: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct AttributeDecl {
    pub name: Atom,
    pub flags: DeclFlags,
    pub type_annotation: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: Atom,
    pub flags: DeclFlags,
    pub variants: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct EnumVariantDecl {
    pub name: Atom,
    pub parameters: SmallVec<[NodeId; 4]>,
}

#[derive(Debug, Clone)]
pub struct FunctionDecl {
    pub name: Atom,
    pub flags: DeclFlags,
    pub type_parameters: SmallVec<[NodeId; 2]>,
    pub parameters: SmallVec<[NodeId; 4]>,
    pub results: SmallVec<[NodeId; 2]>,
    pub purity: PurityAnnotation,
}

#[derive(Debug, Clone)]
pub struct SegmentDecl {
    pub name: Atom,
    pub flags: DeclFlags,
    pub parameters: SmallVec<[NodeId; 4]>,
    pub results: SmallVec<[NodeId; 2]>,
    /// A `Block` node.
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct PipelineDecl {
    pub name: Atom,
    pub flags: DeclFlags,
    /// A `Block` node.
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct ParameterDecl {
    pub name: Atom,
    pub type_annotation: Option<NodeId>,
    pub default_value: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct ResultDecl {
    pub name: Atom,
    pub type_annotation: Option<NodeId>,
}

#[derive(Debug, Clone)]
pub struct TypeParameterDecl {
    pub name: Atom,
}

// ---------------------------------------------------------------------------
// Statement and assignee payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Assignment {
    pub assignees: SmallVec<[NodeId; 2]>,
    pub expression: NodeId,
}

#[derive(Debug, Clone)]
pub struct ExpressionStatement {
    pub expression: NodeId,
}

#[derive(Debug, Clone)]
pub struct PlaceholderDecl {
    pub name: Atom,
}

#[derive(Debug, Clone)]
pub struct BlockLambdaResultDecl {
    pub name: Atom,
}

#[derive(Debug, Clone)]
pub struct YieldAssignee {
    /// Resolved link to a result of the enclosing segment.
    pub result: Option<NodeRef>,
}

// ---------------------------------------------------------------------------
// Expression payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct TemplateString {
    pub segments: Vec<TemplateSegment>,
}

#[derive(Debug, Clone)]
pub struct Reference {
    pub name: Atom,
    /// Resolved by the host's linker; the core only reads it.
    pub target: Option<NodeRef>,
}

#[derive(Debug, Clone)]
pub struct MemberAccess {
    pub receiver: NodeId,
    /// A `Reference` node.
    pub member: NodeId,
    pub null_safe: bool,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub receiver: NodeId,
    pub type_arguments: SmallVec<[NodeId; 1]>,
    pub arguments: SmallVec<[NodeId; 4]>,
}

#[derive(Debug, Clone)]
pub struct Argument {
    /// Resolved parameter link when the argument is named.
    pub parameter: Option<NodeRef>,
    pub value: NodeId,
}

#[derive(Debug, Clone)]
pub struct Parenthesized {
    pub expression: NodeId,
}

#[derive(Debug, Clone)]
pub struct InfixOperation {
    pub operator: InfixOperator,
    pub left: NodeId,
    pub right: NodeId,
}

#[derive(Debug, Clone)]
pub struct PrefixOperation {
    pub operator: PrefixOperator,
    pub operand: NodeId,
}

#[derive(Debug, Clone)]
pub struct BlockLambda {
    pub parameters: SmallVec<[NodeId; 4]>,
    /// A `Block` node; results are the `BlockLambdaResult` assignees inside.
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct ExpressionLambda {
    pub parameters: SmallVec<[NodeId; 4]>,
    pub result: NodeId,
}

#[derive(Debug, Clone)]
pub struct ListLiteral {
    pub elements: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MapLiteral {
    /// `MapEntry` nodes.
    pub entries: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MapEntry {
    pub key: NodeId,
    pub value: NodeId,
}

// ---------------------------------------------------------------------------
// Type node payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct NamedTypeNode {
    pub name: Atom,
    /// Resolved link to a class, enum, enum variant, or type parameter.
    pub target: Option<NodeRef>,
    pub type_arguments: SmallVec<[NodeId; 1]>,
    /// The `?` marker.
    pub nullable: bool,
}

#[derive(Debug, Clone)]
pub struct MemberTypeNode {
    pub receiver: NodeId,
    /// A `NamedType` node.
    pub member: NodeId,
}

#[derive(Debug, Clone)]
pub struct CallableTypeNode {
    pub parameters: SmallVec<[NodeId; 4]>,
    pub results: SmallVec<[NodeId; 2]>,
}

#[derive(Debug, Clone)]
pub struct UnionTypeNode {
    pub alternatives: SmallVec<[NodeId; 2]>,
}

#[derive(Debug, Clone)]
pub struct LiteralTypeNode {
    /// Literal expression nodes.
    pub constants: SmallVec<[NodeId; 2]>,
}

#[derive(Debug, Clone)]
pub struct TypeArgument {
    /// Resolved type-parameter link when the type argument is named.
    pub type_parameter: Option<NodeRef>,
    /// A type node.
    pub value: NodeId,
}

// ---------------------------------------------------------------------------
// NodeKind
// ---------------------------------------------------------------------------

/// The closed set of grammar categories.
#[derive(Debug, Clone)]
pub enum NodeKind {
    // Declarations
    Module(ModuleDecl),
    Class(ClassDecl),
    Attribute(AttributeDecl),
    Enum(EnumDecl),
    EnumVariant(EnumVariantDecl),
    Function(FunctionDecl),
    Segment(SegmentDecl),
    Pipeline(PipelineDecl),
    Parameter(ParameterDecl),
    Result(ResultDecl),
    TypeParameter(TypeParameterDecl),

    // Statements
    Block(Block),
    Assignment(Assignment),
    ExpressionStatement(ExpressionStatement),

    // Assignees
    Placeholder(PlaceholderDecl),
    BlockLambdaResult(BlockLambdaResultDecl),
    Wildcard,
    Yield(YieldAssignee),

    // Expressions
    BooleanLiteral(bool),
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(Atom),
    NullLiteral,
    TemplateString(TemplateString),
    Reference(Reference),
    MemberAccess(MemberAccess),
    Call(Call),
    Argument(Argument),
    Parenthesized(Parenthesized),
    InfixOperation(InfixOperation),
    PrefixOperation(PrefixOperation),
    BlockLambda(BlockLambda),
    ExpressionLambda(ExpressionLambda),
    ListLiteral(ListLiteral),
    MapLiteral(MapLiteral),
    MapEntry(MapEntry),

    // Type nodes
    NamedType(NamedTypeNode),
    MemberType(MemberTypeNode),
    CallableType(CallableTypeNode),
    UnionType(UnionTypeNode),
    LiteralType(LiteralTypeNode),
    TypeArgument(TypeArgument),
}

impl NodeKind {
    /// The declared name, for named declarations.
    pub fn name(&self) -> Option<&Atom> {
        match self {
            NodeKind::Class(it) => Some(&it.name),
            NodeKind::Attribute(it) => Some(&it.name),
            NodeKind::Enum(it) => Some(&it.name),
            NodeKind::EnumVariant(it) => Some(&it.name),
            NodeKind::Function(it) => Some(&it.name),
            NodeKind::Segment(it) => Some(&it.name),
            NodeKind::Pipeline(it) => Some(&it.name),
            NodeKind::Parameter(it) => Some(&it.name),
            NodeKind::Result(it) => Some(&it.name),
            NodeKind::TypeParameter(it) => Some(&it.name),
            NodeKind::Placeholder(it) => Some(&it.name),
            NodeKind::BlockLambdaResult(it) => Some(&it.name),
            _ => None,
        }
    }

    /// Declaration flags; empty for kinds that carry none.
    pub fn flags(&self) -> DeclFlags {
        match self {
            NodeKind::Class(it) => it.flags,
            NodeKind::Attribute(it) => it.flags,
            NodeKind::Enum(it) => it.flags,
            NodeKind::Function(it) => it.flags,
            NodeKind::Segment(it) => it.flags,
            NodeKind::Pipeline(it) => it.flags,
            _ => DeclFlags::empty(),
        }
    }

    /// Parameters of a callable kind; empty for anything else.
    pub fn parameters(&self) -> &[NodeId] {
        match self {
            NodeKind::Class(it) => &it.parameters,
            NodeKind::EnumVariant(it) => &it.parameters,
            NodeKind::Function(it) => &it.parameters,
            NodeKind::Segment(it) => &it.parameters,
            NodeKind::BlockLambda(it) => &it.parameters,
            NodeKind::ExpressionLambda(it) => &it.parameters,
            NodeKind::CallableType(it) => &it.parameters,
            _ => &[],
        }
    }

    /// Declared results of a callable kind; empty for anything else.
    ///
    /// Block lambdas declare results through assignees; use the workspace
    /// helper for those.
    pub fn results(&self) -> &[NodeId] {
        match self {
            NodeKind::Function(it) => &it.results,
            NodeKind::Segment(it) => &it.results,
            NodeKind::CallableType(it) => &it.results,
            _ => &[],
        }
    }

    /// Type parameters of a generic declaration; empty for anything else.
    pub fn type_parameters(&self) -> &[NodeId] {
        match self {
            NodeKind::Class(it) => &it.type_parameters,
            NodeKind::Function(it) => &it.type_parameters,
            _ => &[],
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            NodeKind::Class(_)
                | NodeKind::EnumVariant(_)
                | NodeKind::Function(_)
                | NodeKind::Segment(_)
                | NodeKind::Pipeline(_)
                | NodeKind::BlockLambda(_)
                | NodeKind::ExpressionLambda(_)
                | NodeKind::CallableType(_)
        )
    }

    pub fn is_lambda(&self) -> bool {
        matches!(self, NodeKind::BlockLambda(_) | NodeKind::ExpressionLambda(_))
    }

    pub fn is_statement(&self) -> bool {
        matches!(self, NodeKind::Assignment(_) | NodeKind::ExpressionStatement(_))
    }

    pub fn is_assignee(&self) -> bool {
        matches!(
            self,
            NodeKind::Placeholder(_)
                | NodeKind::BlockLambdaResult(_)
                | NodeKind::Wildcard
                | NodeKind::Yield(_)
        )
    }

    pub fn is_declaration(&self) -> bool {
        matches!(
            self,
            NodeKind::Module(_)
                | NodeKind::Class(_)
                | NodeKind::Attribute(_)
                | NodeKind::Enum(_)
                | NodeKind::EnumVariant(_)
                | NodeKind::Function(_)
                | NodeKind::Segment(_)
                | NodeKind::Pipeline(_)
                | NodeKind::Parameter(_)
                | NodeKind::Result(_)
                | NodeKind::TypeParameter(_)
        )
    }

    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            NodeKind::BooleanLiteral(_)
                | NodeKind::IntLiteral(_)
                | NodeKind::FloatLiteral(_)
                | NodeKind::StringLiteral(_)
                | NodeKind::NullLiteral
                | NodeKind::TemplateString(_)
                | NodeKind::Reference(_)
                | NodeKind::MemberAccess(_)
                | NodeKind::Call(_)
                | NodeKind::Argument(_)
                | NodeKind::Parenthesized(_)
                | NodeKind::InfixOperation(_)
                | NodeKind::PrefixOperation(_)
                | NodeKind::BlockLambda(_)
                | NodeKind::ExpressionLambda(_)
                | NodeKind::ListLiteral(_)
                | NodeKind::MapLiteral(_)
        )
    }

    pub fn is_type_node(&self) -> bool {
        matches!(
            self,
            NodeKind::NamedType(_)
                | NodeKind::MemberType(_)
                | NodeKind::CallableType(_)
                | NodeKind::UnionType(_)
                | NodeKind::LiteralType(_)
        )
    }

    /// Invokes `visit` for every direct child node, in source order.
    pub fn for_each_child(&self, mut visit: impl FnMut(NodeId)) {
        match self {
            NodeKind::Module(it) => it.members.iter().copied().for_each(&mut visit),
            NodeKind::Class(it) => {
                it.type_parameters.iter().copied().for_each(&mut visit);
                it.parameters.iter().copied().for_each(&mut visit);
                it.parent_types.iter().copied().for_each(&mut visit);
                it.members.iter().copied().for_each(&mut visit);
            }
            NodeKind::Attribute(it) => it.type_annotation.iter().copied().for_each(&mut visit),
            NodeKind::Enum(it) => it.variants.iter().copied().for_each(&mut visit),
            NodeKind::EnumVariant(it) => it.parameters.iter().copied().for_each(&mut visit),
            NodeKind::Function(it) => {
                it.type_parameters.iter().copied().for_each(&mut visit);
                it.parameters.iter().copied().for_each(&mut visit);
                it.results.iter().copied().for_each(&mut visit);
            }
            NodeKind::Segment(it) => {
                it.parameters.iter().copied().for_each(&mut visit);
                it.results.iter().copied().for_each(&mut visit);
                visit(it.body);
            }
            NodeKind::Pipeline(it) => visit(it.body),
            NodeKind::Parameter(it) => {
                it.type_annotation.iter().copied().for_each(&mut visit);
                it.default_value.iter().copied().for_each(&mut visit);
            }
            NodeKind::Result(it) => it.type_annotation.iter().copied().for_each(&mut visit),
            NodeKind::TypeParameter(_) => {}
            NodeKind::Block(it) => it.statements.iter().copied().for_each(&mut visit),
            NodeKind::Assignment(it) => {
                it.assignees.iter().copied().for_each(&mut visit);
                visit(it.expression);
            }
            NodeKind::ExpressionStatement(it) => visit(it.expression),
            NodeKind::Placeholder(_)
            | NodeKind::BlockLambdaResult(_)
            | NodeKind::Wildcard
            | NodeKind::Yield(_) => {}
            NodeKind::BooleanLiteral(_)
            | NodeKind::IntLiteral(_)
            | NodeKind::FloatLiteral(_)
            | NodeKind::StringLiteral(_)
            | NodeKind::NullLiteral => {}
            NodeKind::TemplateString(it) => {
                for segment in &it.segments {
                    if let TemplateSegment::Interpolation(expression) = segment {
                        visit(*expression);
                    }
                }
            }
            NodeKind::Reference(_) => {}
            NodeKind::MemberAccess(it) => {
                visit(it.receiver);
                visit(it.member);
            }
            NodeKind::Call(it) => {
                visit(it.receiver);
                it.type_arguments.iter().copied().for_each(&mut visit);
                it.arguments.iter().copied().for_each(&mut visit);
            }
            NodeKind::Argument(it) => visit(it.value),
            NodeKind::Parenthesized(it) => visit(it.expression),
            NodeKind::InfixOperation(it) => {
                visit(it.left);
                visit(it.right);
            }
            NodeKind::PrefixOperation(it) => visit(it.operand),
            NodeKind::BlockLambda(it) => {
                it.parameters.iter().copied().for_each(&mut visit);
                visit(it.body);
            }
            NodeKind::ExpressionLambda(it) => {
                it.parameters.iter().copied().for_each(&mut visit);
                visit(it.result);
            }
            NodeKind::ListLiteral(it) => it.elements.iter().copied().for_each(&mut visit),
            NodeKind::MapLiteral(it) => it.entries.iter().copied().for_each(&mut visit),
            NodeKind::MapEntry(it) => {
                visit(it.key);
                visit(it.value);
            }
            NodeKind::NamedType(it) => it.type_arguments.iter().copied().for_each(&mut visit),
            NodeKind::MemberType(it) => {
                visit(it.receiver);
                visit(it.member);
            }
            NodeKind::CallableType(it) => {
                it.parameters.iter().copied().for_each(&mut visit);
                it.results.iter().copied().for_each(&mut visit);
            }
            NodeKind::UnionType(it) => it.alternatives.iter().copied().for_each(&mut visit),
            NodeKind::LiteralType(it) => it.constants.iter().copied().for_each(&mut visit),
            NodeKind::TypeArgument(it) => visit(it.value),
        }
    }
}
