//! Construction of linked documents.
//!
//! [`DocumentBuilder`] is the only way trees come into existence: the host's
//! parser/linker uses it after reference resolution, and tests use it to
//! build fixtures directly. Children are created bottom-up; attaching them
//! to a parent records the parent link and the container-relative index, so
//! a node can belong to exactly one child list.

use crate::arena::{Document, DocumentId, NodeId, NodeRef};
use crate::node::*;
use rill_common::{Atom, Interner};
use smallvec::SmallVec;
use std::sync::Arc;

pub struct DocumentBuilder {
    document: DocumentId,
    interner: Arc<Interner>,
    uri: Atom,
    package: Atom,
    nodes: Vec<Node>,
}

impl DocumentBuilder {
    /// Starts a document with the given identity. Obtain the id from
    /// [`Workspace::next_document_id`](crate::Workspace::next_document_id).
    pub fn new(document: DocumentId, interner: &Arc<Interner>, uri: &str, package: &str) -> Self {
        Self {
            document,
            interner: Arc::clone(interner),
            uri: interner.intern(uri),
            package: interner.intern(package),
            nodes: Vec::new(),
        }
    }

    #[inline]
    pub fn document_id(&self) -> DocumentId {
        self.document
    }

    /// A workspace-wide reference to a node of this document.
    #[inline]
    pub fn node_ref(&self, node: NodeId) -> NodeRef {
        NodeRef::new(self.document, node)
    }

    #[inline]
    pub fn atom(&self, text: &str) -> Atom {
        self.interner.intern(text)
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            kind,
            parent: None,
            container_index: 0,
        });
        id
    }

    /// Records `parent` as the owner of every node in `children`, indexing
    /// them by their position within this list.
    fn attach(&mut self, parent: NodeId, children: &[NodeId]) {
        for (index, child) in children.iter().enumerate() {
            let node = &mut self.nodes[child.index()];
            debug_assert!(
                node.parent.is_none(),
                "node attached to two different containers"
            );
            node.parent = Some(parent);
            node.container_index = index as u32;
        }
    }

    fn attach_one(&mut self, parent: NodeId, child: Option<NodeId>) {
        if let Some(child) = child {
            self.attach(parent, &[child]);
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    pub fn bool_lit(&mut self, value: bool) -> NodeId {
        self.push(NodeKind::BooleanLiteral(value))
    }

    pub fn int_lit(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::IntLiteral(value))
    }

    pub fn float_lit(&mut self, value: f64) -> NodeId {
        self.push(NodeKind::FloatLiteral(value))
    }

    pub fn string_lit(&mut self, value: &str) -> NodeId {
        let value = self.atom(value);
        self.push(NodeKind::StringLiteral(value))
    }

    pub fn null_lit(&mut self) -> NodeId {
        self.push(NodeKind::NullLiteral)
    }

    pub fn template_string(&mut self, segments: Vec<TemplateSegment>) -> NodeId {
        let interpolations: Vec<NodeId> = segments
            .iter()
            .filter_map(|segment| match segment {
                TemplateSegment::Interpolation(expression) => Some(*expression),
                TemplateSegment::Text(_) => None,
            })
            .collect();
        let id = self.push(NodeKind::TemplateString(TemplateString { segments }));
        self.attach(id, &interpolations);
        id
    }

    pub fn reference(&mut self, name: &str, target: Option<NodeRef>) -> NodeId {
        let name = self.atom(name);
        self.push(NodeKind::Reference(Reference { name, target }))
    }

    pub fn member_access(&mut self, receiver: NodeId, member: NodeId, null_safe: bool) -> NodeId {
        let id = self.push(NodeKind::MemberAccess(MemberAccess {
            receiver,
            member,
            null_safe,
        }));
        self.attach(id, &[receiver]);
        self.attach(id, &[member]);
        id
    }

    pub fn call(&mut self, receiver: NodeId, type_arguments: Vec<NodeId>, arguments: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::Call(Call {
            receiver,
            type_arguments: SmallVec::from_vec(type_arguments.clone()),
            arguments: SmallVec::from_vec(arguments.clone()),
        }));
        self.attach(id, &[receiver]);
        self.attach(id, &type_arguments);
        self.attach(id, &arguments);
        id
    }

    pub fn argument(&mut self, value: NodeId) -> NodeId {
        let id = self.push(NodeKind::Argument(Argument {
            parameter: None,
            value,
        }));
        self.attach(id, &[value]);
        id
    }

    /// A named argument with its parameter link already resolved.
    pub fn named_argument(&mut self, parameter: NodeRef, value: NodeId) -> NodeId {
        let id = self.push(NodeKind::Argument(Argument {
            parameter: Some(parameter),
            value,
        }));
        self.attach(id, &[value]);
        id
    }

    pub fn parenthesized(&mut self, expression: NodeId) -> NodeId {
        let id = self.push(NodeKind::Parenthesized(Parenthesized { expression }));
        self.attach(id, &[expression]);
        id
    }

    pub fn infix(&mut self, operator: InfixOperator, left: NodeId, right: NodeId) -> NodeId {
        let id = self.push(NodeKind::InfixOperation(InfixOperation {
            operator,
            left,
            right,
        }));
        self.attach(id, &[left]);
        self.attach(id, &[right]);
        id
    }

    pub fn prefix(&mut self, operator: PrefixOperator, operand: NodeId) -> NodeId {
        let id = self.push(NodeKind::PrefixOperation(PrefixOperation { operator, operand }));
        self.attach(id, &[operand]);
        id
    }

    pub fn block_lambda(&mut self, parameters: Vec<NodeId>, body: NodeId) -> NodeId {
        let id = self.push(NodeKind::BlockLambda(BlockLambda {
            parameters: SmallVec::from_vec(parameters.clone()),
            body,
        }));
        self.attach(id, &parameters);
        self.attach(id, &[body]);
        id
    }

    pub fn expression_lambda(&mut self, parameters: Vec<NodeId>, result: NodeId) -> NodeId {
        let id = self.push(NodeKind::ExpressionLambda(ExpressionLambda {
            parameters: SmallVec::from_vec(parameters.clone()),
            result,
        }));
        self.attach(id, &parameters);
        self.attach(id, &[result]);
        id
    }

    pub fn list_literal(&mut self, elements: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::ListLiteral(ListLiteral {
            elements: elements.clone(),
        }));
        self.attach(id, &elements);
        id
    }

    pub fn map_literal(&mut self, entries: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::MapLiteral(MapLiteral {
            entries: entries.clone(),
        }));
        self.attach(id, &entries);
        id
    }

    pub fn map_entry(&mut self, key: NodeId, value: NodeId) -> NodeId {
        let id = self.push(NodeKind::MapEntry(MapEntry { key, value }));
        self.attach(id, &[key]);
        self.attach(id, &[value]);
        id
    }

    // -----------------------------------------------------------------------
    // Type nodes
    // -----------------------------------------------------------------------

    pub fn named_type(&mut self, name: &str, target: Option<NodeRef>, nullable: bool) -> NodeId {
        self.named_type_with_args(name, target, Vec::new(), nullable)
    }

    pub fn named_type_with_args(
        &mut self,
        name: &str,
        target: Option<NodeRef>,
        type_arguments: Vec<NodeId>,
        nullable: bool,
    ) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::NamedType(NamedTypeNode {
            name,
            target,
            type_arguments: SmallVec::from_vec(type_arguments.clone()),
            nullable,
        }));
        self.attach(id, &type_arguments);
        id
    }

    pub fn member_type(&mut self, receiver: NodeId, member: NodeId) -> NodeId {
        let id = self.push(NodeKind::MemberType(MemberTypeNode { receiver, member }));
        self.attach(id, &[receiver]);
        self.attach(id, &[member]);
        id
    }

    pub fn callable_type(&mut self, parameters: Vec<NodeId>, results: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::CallableType(CallableTypeNode {
            parameters: SmallVec::from_vec(parameters.clone()),
            results: SmallVec::from_vec(results.clone()),
        }));
        self.attach(id, &parameters);
        self.attach(id, &results);
        id
    }

    pub fn union_type(&mut self, alternatives: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::UnionType(UnionTypeNode {
            alternatives: SmallVec::from_vec(alternatives.clone()),
        }));
        self.attach(id, &alternatives);
        id
    }

    pub fn literal_type(&mut self, constants: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::LiteralType(LiteralTypeNode {
            constants: SmallVec::from_vec(constants.clone()),
        }));
        self.attach(id, &constants);
        id
    }

    pub fn type_argument(&mut self, value: NodeId) -> NodeId {
        let id = self.push(NodeKind::TypeArgument(TypeArgument {
            type_parameter: None,
            value,
        }));
        self.attach(id, &[value]);
        id
    }

    pub fn named_type_argument(&mut self, type_parameter: NodeRef, value: NodeId) -> NodeId {
        let id = self.push(NodeKind::TypeArgument(TypeArgument {
            type_parameter: Some(type_parameter),
            value,
        }));
        self.attach(id, &[value]);
        id
    }

    // -----------------------------------------------------------------------
    // Declarations
    // -----------------------------------------------------------------------

    pub fn parameter(
        &mut self,
        name: &str,
        type_annotation: Option<NodeId>,
        default_value: Option<NodeId>,
    ) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Parameter(ParameterDecl {
            name,
            type_annotation,
            default_value,
        }));
        self.attach_one(id, type_annotation);
        self.attach_one(id, default_value);
        id
    }

    pub fn result(&mut self, name: &str, type_annotation: Option<NodeId>) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Result(ResultDecl {
            name,
            type_annotation,
        }));
        self.attach_one(id, type_annotation);
        id
    }

    pub fn type_parameter(&mut self, name: &str) -> NodeId {
        let name = self.atom(name);
        self.push(NodeKind::TypeParameter(TypeParameterDecl { name }))
    }

    pub fn attribute(&mut self, name: &str, flags: DeclFlags, type_annotation: Option<NodeId>) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Attribute(AttributeDecl {
            name,
            flags,
            type_annotation,
        }));
        self.attach_one(id, type_annotation);
        id
    }

    pub fn class(
        &mut self,
        name: &str,
        flags: DeclFlags,
        type_parameters: Vec<NodeId>,
        parameters: Vec<NodeId>,
        parent_types: Vec<NodeId>,
        members: Vec<NodeId>,
    ) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Class(ClassDecl {
            name,
            flags,
            type_parameters: SmallVec::from_vec(type_parameters.clone()),
            parameters: SmallVec::from_vec(parameters.clone()),
            parent_types: SmallVec::from_vec(parent_types.clone()),
            members: members.clone(),
        }));
        self.attach(id, &type_parameters);
        self.attach(id, &parameters);
        self.attach(id, &parent_types);
        self.attach(id, &members);
        id
    }

    pub fn enum_decl(&mut self, name: &str, flags: DeclFlags, variants: Vec<NodeId>) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Enum(EnumDecl {
            name,
            flags,
            variants: variants.clone(),
        }));
        self.attach(id, &variants);
        id
    }

    pub fn enum_variant(&mut self, name: &str, parameters: Vec<NodeId>) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::EnumVariant(EnumVariantDecl {
            name,
            parameters: SmallVec::from_vec(parameters.clone()),
        }));
        self.attach(id, &parameters);
        id
    }

    pub fn function(
        &mut self,
        name: &str,
        flags: DeclFlags,
        type_parameters: Vec<NodeId>,
        parameters: Vec<NodeId>,
        results: Vec<NodeId>,
        purity: PurityAnnotation,
    ) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Function(FunctionDecl {
            name,
            flags,
            type_parameters: SmallVec::from_vec(type_parameters.clone()),
            parameters: SmallVec::from_vec(parameters.clone()),
            results: SmallVec::from_vec(results.clone()),
            purity,
        }));
        self.attach(id, &type_parameters);
        self.attach(id, &parameters);
        self.attach(id, &results);
        id
    }

    pub fn segment(
        &mut self,
        name: &str,
        flags: DeclFlags,
        parameters: Vec<NodeId>,
        results: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Segment(SegmentDecl {
            name,
            flags,
            parameters: SmallVec::from_vec(parameters.clone()),
            results: SmallVec::from_vec(results.clone()),
            body,
        }));
        self.attach(id, &parameters);
        self.attach(id, &results);
        self.attach(id, &[body]);
        id
    }

    pub fn pipeline(&mut self, name: &str, flags: DeclFlags, body: NodeId) -> NodeId {
        let name = self.atom(name);
        let id = self.push(NodeKind::Pipeline(PipelineDecl { name, flags, body }));
        self.attach(id, &[body]);
        id
    }

    // -----------------------------------------------------------------------
    // Statements and assignees
    // -----------------------------------------------------------------------

    pub fn block(&mut self, statements: Vec<NodeId>) -> NodeId {
        let id = self.push(NodeKind::Block(Block {
            statements: statements.clone(),
        }));
        self.attach(id, &statements);
        id
    }

    pub fn assignment(&mut self, assignees: Vec<NodeId>, expression: NodeId) -> NodeId {
        let id = self.push(NodeKind::Assignment(Assignment {
            assignees: SmallVec::from_vec(assignees.clone()),
            expression,
        }));
        self.attach(id, &assignees);
        self.attach(id, &[expression]);
        id
    }

    pub fn expression_statement(&mut self, expression: NodeId) -> NodeId {
        let id = self.push(NodeKind::ExpressionStatement(ExpressionStatement { expression }));
        self.attach(id, &[expression]);
        id
    }

    pub fn placeholder(&mut self, name: &str) -> NodeId {
        let name = self.atom(name);
        self.push(NodeKind::Placeholder(PlaceholderDecl { name }))
    }

    pub fn block_lambda_result(&mut self, name: &str) -> NodeId {
        let name = self.atom(name);
        self.push(NodeKind::BlockLambdaResult(BlockLambdaResultDecl { name }))
    }

    pub fn wildcard(&mut self) -> NodeId {
        self.push(NodeKind::Wildcard)
    }

    pub fn yield_to(&mut self, result: Option<NodeRef>) -> NodeId {
        self.push(NodeKind::Yield(YieldAssignee { result }))
    }

    // -----------------------------------------------------------------------
    // Late reference resolution
    // -----------------------------------------------------------------------
    //
    // Forward and cyclic links can only be resolved after their target
    // exists; the host's linker patches them in before finishing.

    pub fn resolve_reference(&mut self, reference: NodeId, target: NodeRef) {
        if let NodeKind::Reference(payload) = &mut self.nodes[reference.index()].kind {
            payload.target = Some(target);
        }
    }

    pub fn resolve_named_type(&mut self, named_type: NodeId, target: NodeRef) {
        if let NodeKind::NamedType(payload) = &mut self.nodes[named_type.index()].kind {
            payload.target = Some(target);
        }
    }

    pub fn resolve_yield(&mut self, yielded: NodeId, result: NodeRef) {
        if let NodeKind::Yield(payload) = &mut self.nodes[yielded.index()].kind {
            payload.result = Some(result);
        }
    }

    // -----------------------------------------------------------------------
    // Finishing
    // -----------------------------------------------------------------------

    /// Creates the root module with the given top-level members and seals
    /// the document.
    pub fn finish(mut self, members: Vec<NodeId>) -> Document {
        let package = self.package.clone();
        let root = self.push(NodeKind::Module(ModuleDecl {
            package,
            members: members.clone(),
        }));
        self.attach(root, &members);
        Document::new(self.document, self.uri, self.package, self.nodes, root)
    }
}
