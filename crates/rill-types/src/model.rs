//! The type of a tree node.
//!
//! Types are immutable values. Operations return new values; an empty
//! substitution map returns the receiver unchanged, which callers rely on
//! for cheap no-op detection.
//!
//! Nullability is *explicit* nullability: the `?` marker on a named type,
//! or a null constant inside a literal type or union. A type parameter may
//! additionally become nullable through a nullable upper bound, which this
//! model does not track.

use crate::value::Constant;
use indexmap::IndexMap;
use rill_ast::NodeRef;
use rill_common::Atom;
use std::fmt;

/// Mapping from type-parameter declarations to the types substituted for
/// them. Iteration order is the declaration order of the type parameters;
/// equality is key-by-key and ignores order.
pub type TypeParameterSubstitutions = IndexMap<NodeRef, Type>;

/// The type of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Callable(CallableType),
    Literal(LiteralType),
    NamedTuple(NamedTupleType),
    Class(ClassType),
    Enum(EnumType),
    EnumVariant(EnumVariantType),
    TypeParameter(TypeParameterType),
    Static(StaticType),
    Union(UnionType),
    /// Missing information (dangling reference, no annotation).
    Unknown,
    /// A grammar category the type computer does not handle yet.
    NotImplemented,
}

impl Type {
    /// Whether this type is explicitly marked as nullable.
    pub fn is_explicitly_nullable(&self) -> bool {
        match self {
            Type::Callable(_) | Type::NamedTuple(_) | Type::Static(_) => false,
            Type::Literal(it) => it.is_explicitly_nullable(),
            Type::Class(it) => it.nullable,
            Type::Enum(it) => it.nullable,
            Type::EnumVariant(it) => it.nullable,
            Type::TypeParameter(it) => it.nullable,
            Type::Union(it) => it.is_explicitly_nullable(),
            Type::Unknown | Type::NotImplemented => false,
        }
    }

    /// Returns a copy of this type with the given type parameters
    /// substituted. An empty map returns the receiver unchanged.
    pub fn substitute_type_parameters(&self, substitutions: &TypeParameterSubstitutions) -> Type {
        if substitutions.is_empty() {
            return self.clone();
        }

        match self {
            Type::Callable(it) => Type::Callable(CallableType {
                callable: it.callable,
                parameter: it.parameter,
                input: it.input.substitute_type_parameters(substitutions),
                output: it.output.substitute_type_parameters(substitutions),
            }),
            Type::Literal(_) => self.clone(),
            Type::NamedTuple(it) => Type::NamedTuple(it.substitute_type_parameters(substitutions)),
            Type::Class(it) => Type::Class(ClassType {
                declaration: it.declaration,
                name: it.name.clone(),
                substitutions: it
                    .substitutions
                    .iter()
                    .map(|(key, value)| (*key, value.substitute_type_parameters(substitutions)))
                    .collect(),
                nullable: it.nullable,
            }),
            Type::Enum(_) | Type::EnumVariant(_) => self.clone(),
            Type::TypeParameter(it) => match substitutions.get(&it.declaration) {
                None => self.clone(),
                Some(substitution) if it.nullable => substitution.with_explicit_nullability(true),
                Some(substitution) => substitution.clone(),
            },
            // Substitutions are only meaningful for instances of a
            // declaration, not for the declaration itself.
            Type::Static(_) => self.clone(),
            Type::Union(it) => Type::Union(UnionType {
                possible_types: it
                    .possible_types
                    .iter()
                    .map(|possible| possible.substitute_type_parameters(substitutions))
                    .collect(),
            }),
            Type::Unknown | Type::NotImplemented => self.clone(),
        }
    }

    /// Removes any unnecessary containers from the type. Idempotent.
    pub fn unwrap(&self) -> Type {
        match self {
            Type::Callable(it) => Type::Callable(CallableType {
                callable: it.callable,
                parameter: it.parameter,
                input: it.input.unwrap_entries(),
                output: it.output.unwrap_entries(),
            }),
            Type::Literal(_) => self.clone(),
            Type::NamedTuple(it) => {
                // A tuple with a single entry is that entry's type.
                if it.entries.len() == 1 {
                    it.entries[0].ty.unwrap()
                } else {
                    Type::NamedTuple(it.unwrap_entries())
                }
            }
            Type::Class(it) => Type::Class(ClassType {
                declaration: it.declaration,
                name: it.name.clone(),
                substitutions: it
                    .substitutions
                    .iter()
                    .map(|(key, value)| (*key, value.unwrap()))
                    .collect(),
                nullable: it.nullable,
            }),
            Type::Enum(_) | Type::EnumVariant(_) | Type::TypeParameter(_) | Type::Static(_) => {
                self.clone()
            }
            Type::Union(it) => {
                // Flatten nested unions.
                let mut flattened = Vec::with_capacity(it.possible_types.len());
                for possible in &it.possible_types {
                    match possible.unwrap() {
                        Type::Union(inner) => flattened.extend(inner.possible_types),
                        other => flattened.push(other),
                    }
                }

                // Remove the outer union if only one alternative remains.
                if flattened.len() == 1 {
                    flattened.pop().unwrap_or(Type::Unknown)
                } else {
                    Type::Union(UnionType {
                        possible_types: flattened,
                    })
                }
            }
            Type::Unknown | Type::NotImplemented => self.clone(),
        }
    }

    /// Returns a copy of this type with the given explicit nullability.
    pub fn with_explicit_nullability(&self, nullable: bool) -> Type {
        match self {
            Type::Callable(_) | Type::NamedTuple(_) | Type::Static(_) => {
                if nullable {
                    Type::Union(UnionType {
                        possible_types: vec![self.clone(), Type::Literal(LiteralType::null())],
                    })
                } else {
                    self.clone()
                }
            }
            Type::Literal(it) => Type::Literal(it.with_explicit_nullability(nullable)),
            Type::Class(it) => {
                if it.nullable == nullable {
                    self.clone()
                } else {
                    Type::Class(ClassType {
                        declaration: it.declaration,
                        name: it.name.clone(),
                        substitutions: it.substitutions.clone(),
                        nullable,
                    })
                }
            }
            Type::Enum(it) => {
                if it.nullable == nullable {
                    self.clone()
                } else {
                    Type::Enum(EnumType {
                        declaration: it.declaration,
                        name: it.name.clone(),
                        nullable,
                    })
                }
            }
            Type::EnumVariant(it) => {
                if it.nullable == nullable {
                    self.clone()
                } else {
                    Type::EnumVariant(EnumVariantType {
                        declaration: it.declaration,
                        name: it.name.clone(),
                        nullable,
                    })
                }
            }
            Type::TypeParameter(it) => {
                if it.nullable == nullable {
                    self.clone()
                } else {
                    Type::TypeParameter(TypeParameterType {
                        declaration: it.declaration,
                        name: it.name.clone(),
                        nullable,
                    })
                }
            }
            Type::Union(it) => it.with_explicit_nullability(nullable),
            Type::Unknown | Type::NotImplemented => self.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Callable(it) => fmt::Display::fmt(it, f),
            Type::Literal(it) => fmt::Display::fmt(it, f),
            Type::NamedTuple(it) => fmt::Display::fmt(it, f),
            Type::Class(it) => fmt::Display::fmt(it, f),
            Type::Enum(it) => fmt::Display::fmt(it, f),
            Type::EnumVariant(it) => fmt::Display::fmt(it, f),
            Type::TypeParameter(it) => fmt::Display::fmt(it, f),
            Type::Static(it) => fmt::Display::fmt(it, f),
            Type::Union(it) => fmt::Display::fmt(it, f),
            Type::Unknown => f.write_str("$unknown"),
            Type::NotImplemented => f.write_str("$notImplemented"),
        }
    }
}

// ---------------------------------------------------------------------------
// CallableType
// ---------------------------------------------------------------------------

/// The type of a callable: its input parameters and output results as named
/// tuples. Never nullable by itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CallableType {
    pub callable: NodeRef,
    /// The parameter this callable type annotates, if it is the declared
    /// type of a parameter.
    pub parameter: Option<NodeRef>,
    pub input: NamedTupleType,
    pub output: NamedTupleType,
}

impl CallableType {
    pub fn new(callable: NodeRef, parameter: Option<NodeRef>, input: NamedTupleType, output: NamedTupleType) -> Self {
        Self {
            callable,
            parameter,
            input,
            output,
        }
    }

    /// The type of the parameter at `index`, or [`Type::Unknown`] if the
    /// index is out of bounds.
    pub fn parameter_type_by_index(&self, index: usize) -> Type {
        self.input.type_of_entry_by_index(index)
    }
}

impl fmt::Display for CallableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (index, entry) in self.input.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        write!(f, ") -> {}", self.output)
    }
}

impl From<CallableType> for Type {
    fn from(value: CallableType) -> Self {
        Type::Callable(value)
    }
}

// ---------------------------------------------------------------------------
// LiteralType
// ---------------------------------------------------------------------------

/// An ordered sequence of constant values.
#[derive(Debug, Clone, PartialEq)]
pub struct LiteralType {
    pub constants: Vec<Constant>,
}

impl LiteralType {
    pub fn new(constants: Vec<Constant>) -> Self {
        Self { constants }
    }

    /// The type `literal<null>`.
    pub fn null() -> Self {
        Self {
            constants: vec![Constant::Null],
        }
    }

    pub fn is_explicitly_nullable(&self) -> bool {
        self.constants.iter().any(|it| *it == Constant::Null)
    }

    fn with_explicit_nullability(&self, nullable: bool) -> LiteralType {
        if self.is_explicitly_nullable() && !nullable {
            LiteralType {
                constants: self
                    .constants
                    .iter()
                    .filter(|it| **it != Constant::Null)
                    .cloned()
                    .collect(),
            }
        } else if !self.is_explicitly_nullable() && nullable {
            let mut constants = self.constants.clone();
            constants.push(Constant::Null);
            LiteralType { constants }
        } else {
            self.clone()
        }
    }
}

impl fmt::Display for LiteralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "literal<")?;
        for (index, constant) in self.constants.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{constant}")?;
        }
        write!(f, ">")
    }
}

impl From<LiteralType> for Type {
    fn from(value: LiteralType) -> Self {
        Type::Literal(value)
    }
}

// ---------------------------------------------------------------------------
// NamedTupleType
// ---------------------------------------------------------------------------

/// An ordered sequence of `(declaration, name, type)` entries; the input
/// and output shape of callables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NamedTupleType {
    pub entries: Vec<NamedTupleEntry>,
}

impl NamedTupleType {
    pub fn new(entries: Vec<NamedTupleEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The type of the entry at `index`, or [`Type::Unknown`] if the index
    /// is out of bounds.
    pub fn type_of_entry_by_index(&self, index: usize) -> Type {
        self.entries
            .get(index)
            .map(|entry| entry.ty.clone())
            .unwrap_or(Type::Unknown)
    }

    pub fn substitute_type_parameters(&self, substitutions: &TypeParameterSubstitutions) -> NamedTupleType {
        if substitutions.is_empty() {
            return self.clone();
        }
        NamedTupleType {
            entries: self
                .entries
                .iter()
                .map(|entry| NamedTupleEntry {
                    declaration: entry.declaration,
                    name: entry.name.clone(),
                    ty: entry.ty.substitute_type_parameters(substitutions),
                })
                .collect(),
        }
    }

    fn unwrap_entries(&self) -> NamedTupleType {
        NamedTupleType {
            entries: self
                .entries
                .iter()
                .map(|entry| NamedTupleEntry {
                    declaration: entry.declaration,
                    name: entry.name.clone(),
                    ty: entry.ty.unwrap(),
                })
                .collect(),
        }
    }
}

impl fmt::Display for NamedTupleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{entry}")?;
        }
        write!(f, ")")
    }
}

impl From<NamedTupleType> for Type {
    fn from(value: NamedTupleType) -> Self {
        Type::NamedTuple(value)
    }
}

/// One entry of a [`NamedTupleType`].
#[derive(Debug, Clone, PartialEq)]
pub struct NamedTupleEntry {
    pub declaration: Option<NodeRef>,
    pub name: Atom,
    pub ty: Type,
}

impl NamedTupleEntry {
    pub fn new(declaration: Option<NodeRef>, name: Atom, ty: Type) -> Self {
        Self {
            declaration,
            name,
            ty,
        }
    }
}

impl fmt::Display for NamedTupleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

// ---------------------------------------------------------------------------
// Named types
// ---------------------------------------------------------------------------

/// The type of a class instance, with its type-parameter substitutions.
///
/// Two class types are equal iff they wrap the same declaration, have the
/// same nullability, and their substitution maps agree key-by-key (size
/// must match; order does not).
#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub declaration: NodeRef,
    pub name: Atom,
    pub substitutions: TypeParameterSubstitutions,
    pub nullable: bool,
}

impl ClassType {
    pub fn new(declaration: NodeRef, name: Atom, substitutions: TypeParameterSubstitutions, nullable: bool) -> Self {
        Self {
            declaration,
            name,
            substitutions,
            nullable,
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.substitutions.is_empty() {
            write!(f, "<")?;
            for (index, value) in self.substitutions.values().enumerate() {
                if index > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{value}")?;
            }
            write!(f, ">")?;
        }
        if self.nullable {
            write!(f, "?")?;
        }
        Ok(())
    }
}

impl From<ClassType> for Type {
    fn from(value: ClassType) -> Self {
        Type::Class(value)
    }
}

/// The type of an enum instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub declaration: NodeRef,
    pub name: Atom,
    pub nullable: bool,
}

impl EnumType {
    pub fn new(declaration: NodeRef, name: Atom, nullable: bool) -> Self {
        Self {
            declaration,
            name,
            nullable,
        }
    }
}

impl fmt::Display for EnumType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, if self.nullable { "?" } else { "" })
    }
}

impl From<EnumType> for Type {
    fn from(value: EnumType) -> Self {
        Type::Enum(value)
    }
}

/// The type of an enum variant instance.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumVariantType {
    pub declaration: NodeRef,
    pub name: Atom,
    pub nullable: bool,
}

impl EnumVariantType {
    pub fn new(declaration: NodeRef, name: Atom, nullable: bool) -> Self {
        Self {
            declaration,
            name,
            nullable,
        }
    }
}

impl fmt::Display for EnumVariantType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, if self.nullable { "?" } else { "" })
    }
}

impl From<EnumVariantType> for Type {
    fn from(value: EnumVariantType) -> Self {
        Type::EnumVariant(value)
    }
}

/// The type of a reference to a generic type parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParameterType {
    pub declaration: NodeRef,
    pub name: Atom,
    pub nullable: bool,
}

impl TypeParameterType {
    pub fn new(declaration: NodeRef, name: Atom, nullable: bool) -> Self {
        Self {
            declaration,
            name,
            nullable,
        }
    }
}

impl fmt::Display for TypeParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, if self.nullable { "?" } else { "" })
    }
}

impl From<TypeParameterType> for Type {
    fn from(value: TypeParameterType) -> Self {
        Type::TypeParameter(value)
    }
}

// ---------------------------------------------------------------------------
// StaticType
// ---------------------------------------------------------------------------

/// A type that represents the class, enum, or enum variant declaration
/// itself instead of an instance of it.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticType {
    /// The named type of an instance of the declaration.
    pub instance: Box<Type>,
}

impl StaticType {
    pub fn new(instance: Type) -> Self {
        debug_assert!(
            matches!(
                instance,
                Type::Class(_) | Type::Enum(_) | Type::EnumVariant(_) | Type::TypeParameter(_)
            ),
            "static types wrap named types"
        );
        Self {
            instance: Box::new(instance),
        }
    }
}

impl fmt::Display for StaticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$type<{}>", self.instance)
    }
}

impl From<StaticType> for Type {
    fn from(value: StaticType) -> Self {
        Type::Static(value)
    }
}

// ---------------------------------------------------------------------------
// UnionType
// ---------------------------------------------------------------------------

/// An ordered sequence of possible types.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionType {
    pub possible_types: Vec<Type>,
}

impl UnionType {
    pub fn new(possible_types: Vec<Type>) -> Self {
        Self { possible_types }
    }

    pub fn is_explicitly_nullable(&self) -> bool {
        self.possible_types.iter().any(Type::is_explicitly_nullable)
    }

    fn with_explicit_nullability(&self, nullable: bool) -> Type {
        if self.is_explicitly_nullable() && !nullable {
            Type::Union(UnionType {
                possible_types: self
                    .possible_types
                    .iter()
                    .map(|it| it.with_explicit_nullability(false))
                    .collect(),
            })
        } else if !self.is_explicitly_nullable() && nullable {
            if self.possible_types.is_empty() {
                Type::Literal(LiteralType::null())
            } else {
                Type::Union(UnionType {
                    possible_types: self
                        .possible_types
                        .iter()
                        .map(|it| it.with_explicit_nullability(true))
                        .collect(),
                })
            }
        } else {
            Type::Union(self.clone())
        }
    }
}

impl fmt::Display for UnionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "union<")?;
        for (index, possible) in self.possible_types.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{possible}")?;
        }
        write!(f, ">")
    }
}

impl From<UnionType> for Type {
    fn from(value: UnionType) -> Self {
        Type::Union(value)
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

    fn decl(node: u32) -> NodeRef {
        NodeRef::new(DocumentId(1), NodeId(node))
    }

    fn atom(text: &str) -> Atom {
        Interner::new().intern(text)
    }

    fn class(node: u32, name: &str, nullable: bool) -> Type {
        Type::Class(ClassType::new(
            decl(node),
            atom(name),
            TypeParameterSubstitutions::default(),
            nullable,
        ))
    }

    fn type_parameter(node: u32, name: &str, nullable: bool) -> Type {
        Type::TypeParameter(TypeParameterType::new(decl(node), atom(name), nullable))
    }

    #[test]
    fn empty_substitution_is_identity() {
        let types = [
            class(1, "C", false),
            type_parameter(2, "T", false),
            Type::Union(UnionType::new(vec![class(1, "C", false)])),
            Type::Unknown,
            Type::NotImplemented,
        ];
        let empty = TypeParameterSubstitutions::default();
        for ty in types {
            assert_eq!(ty.substitute_type_parameters(&empty), ty);
        }
    }

    #[test]
    fn substituting_mapped_type_parameter_returns_mapped_type() {
        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(decl(2), class(1, "C", false));

        let result = type_parameter(2, "T", false).substitute_type_parameters(&substitutions);
        assert_eq!(result, class(1, "C", false));
    }

    #[test]
    fn substituting_nullable_type_parameter_propagates_nullability() {
        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(decl(2), class(1, "C", false));

        let result = type_parameter(2, "T", true).substitute_type_parameters(&substitutions);
        assert_eq!(result, class(1, "C", true));
    }

    #[test]
    fn substituting_unmapped_type_parameter_is_identity() {
        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(decl(99), class(1, "C", false));

        let ty = type_parameter(2, "T", false);
        assert_eq!(ty.substitute_type_parameters(&substitutions), ty);
    }

    #[test]
    fn substitution_reaches_class_type_arguments() {
        let mut inner = TypeParameterSubstitutions::default();
        inner.insert(decl(10), type_parameter(2, "T", false));
        let generic = Type::Class(ClassType::new(decl(1), atom("List"), inner, false));

        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(decl(2), class(3, "Int", false));

        let mut expected_inner = TypeParameterSubstitutions::default();
        expected_inner.insert(decl(10), class(3, "Int", false));
        let expected = Type::Class(ClassType::new(decl(1), atom("List"), expected_inner, false));

        assert_eq!(generic.substitute_type_parameters(&substitutions), expected);
    }

    #[test]
    fn unwrap_is_idempotent() {
        let nested = Type::Union(UnionType::new(vec![
            Type::Union(UnionType::new(vec![class(1, "A", false), class(2, "B", false)])),
            class(3, "C", false),
        ]));
        assert_eq!(nested.unwrap().unwrap(), nested.unwrap());
    }

    #[test]
    fn unwrap_flattens_nested_unions() {
        let nested = Type::Union(UnionType::new(vec![
            Type::Union(UnionType::new(vec![class(1, "X", false), class(2, "Y", false)])),
            class(3, "B", false),
        ]));
        assert_eq!(
            nested.unwrap(),
            Type::Union(UnionType::new(vec![
                class(1, "X", false),
                class(2, "Y", false),
                class(3, "B", false),
            ]))
        );
    }

    #[test]
    fn unwrap_collapses_singleton_union() {
        let singleton = Type::Union(UnionType::new(vec![class(1, "A", false)]));
        assert_eq!(singleton.unwrap(), class(1, "A", false));
    }

    #[test]
    fn unwrap_collapses_singleton_named_tuple() {
        let tuple = Type::NamedTuple(NamedTupleType::new(vec![NamedTupleEntry::new(
            Some(decl(5)),
            atom("r"),
            class(1, "A", false),
        )]));
        assert_eq!(tuple.unwrap(), class(1, "A", false));
    }

    #[test]
    fn literal_type_nullability_tracks_null_constant() {
        let with_null = LiteralType::new(vec![Constant::Int(1), Constant::Null]);
        assert!(with_null.is_explicitly_nullable());

        let without_null = LiteralType::new(vec![Constant::Int(1)]);
        assert!(!without_null.is_explicitly_nullable());
    }

    #[test]
    fn literal_type_nullability_update_adds_and_removes_null() {
        let plain = Type::Literal(LiteralType::new(vec![Constant::Int(1)]));
        let nullable = plain.with_explicit_nullability(true);
        assert_eq!(
            nullable,
            Type::Literal(LiteralType::new(vec![Constant::Int(1), Constant::Null]))
        );
        assert_eq!(nullable.with_explicit_nullability(false), plain);
    }

    #[test]
    fn class_type_equality_compares_substitution_maps() {
        let mut left_substitutions = TypeParameterSubstitutions::default();
        left_substitutions.insert(decl(10), class(3, "Int", false));
        let left = Type::Class(ClassType::new(decl(1), atom("List"), left_substitutions, false));

        let mut same = TypeParameterSubstitutions::default();
        same.insert(decl(10), class(3, "Int", false));
        assert_eq!(
            left,
            Type::Class(ClassType::new(decl(1), atom("List"), same, false))
        );

        let mut different_value = TypeParameterSubstitutions::default();
        different_value.insert(decl(10), class(4, "Float", false));
        assert_ne!(
            left,
            Type::Class(ClassType::new(decl(1), atom("List"), different_value, false))
        );

        assert_ne!(
            left,
            Type::Class(ClassType::new(
                decl(1),
                atom("List"),
                TypeParameterSubstitutions::default(),
                false,
            ))
        );
    }

    #[test]
    fn sentinels_equal_only_themselves() {
        assert_eq!(Type::Unknown, Type::Unknown);
        assert_eq!(Type::NotImplemented, Type::NotImplemented);
        assert_ne!(Type::Unknown, Type::NotImplemented);
        assert_ne!(Type::Unknown, class(1, "A", false));
    }

    #[test]
    fn nullable_callable_becomes_union_with_null_literal() {
        let callable = Type::Callable(CallableType::new(
            decl(1),
            None,
            NamedTupleType::default(),
            NamedTupleType::default(),
        ));
        let nullable = callable.with_explicit_nullability(true);
        assert_eq!(
            nullable,
            Type::Union(UnionType::new(vec![
                callable.clone(),
                Type::Literal(LiteralType::null()),
            ]))
        );
        // Already non-nullable: unchanged.
        assert_eq!(callable.with_explicit_nullability(false), callable);
    }

    #[test]
    fn empty_union_made_nullable_is_null_literal() {
        let empty = Type::Union(UnionType::new(vec![]));
        assert_eq!(
            empty.with_explicit_nullability(true),
            Type::Literal(LiteralType::null())
        );
    }

    #[test]
    fn display_formats() {
        assert_eq!(class(1, "C", true).to_string(), "C?");
        assert_eq!(
            Type::Literal(LiteralType::new(vec![Constant::Int(1), Constant::Null])).to_string(),
            "literal<1, null>"
        );
        assert_eq!(
            Type::Union(UnionType::new(vec![class(1, "A", false), class(2, "B", false)])).to_string(),
            "union<A, B>"
        );
        assert_eq!(Type::Unknown.to_string(), "$unknown");

        let mut substitutions = TypeParameterSubstitutions::default();
        substitutions.insert(decl(10), class(3, "Int", false));
        assert_eq!(
            Type::Class(ClassType::new(decl(1), atom("List"), substitutions, false)).to_string(),
            "List<Int>"
        );

        assert_eq!(
            Type::Static(StaticType::new(ClassType::new(
                decl(1),
                atom("C"),
                TypeParameterSubstitutions::default(),
                false,
            )
            .into()))
            .to_string(),
            "$type<C>"
        );
    }
}
