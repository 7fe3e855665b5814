//! Typed, linked syntax tree for the Rill semantic core.
//!
//! The semantic analyses never parse text. The host (parser, linker, or a
//! test fixture) hands them a tree of typed nodes with resolved
//! cross-references, built through [`build::DocumentBuilder`]. This crate
//! defines that tree:
//!
//! - [`node`]: the closed [`NodeKind`] sum type over every grammar category,
//!   declaration flags, and purity annotations
//! - [`arena`]: per-document node arenas ([`Document`], [`NodeId`]) and the
//!   [`Workspace`] of documents ([`DocumentId`], [`NodeRef`])
//! - [`builtins`]: the [`BuiltinRegistry`] exposing the well-known core
//!   classes (`Any`, `Boolean`, `Int`, `Float`, `String`, `Nothing`,
//!   `List`, `Map`)
//! - [`build`]: the host-facing API for constructing linked documents

pub mod arena;
pub mod build;
pub mod builtins;
pub mod node;

pub use arena::{Document, DocumentId, NodeId, NodeRef, Workspace};
pub use builtins::BuiltinRegistry;
pub use node::{
    DeclFlags, ImpuritySpec, InfixOperator, Node, NodeKind, PrefixOperator, PurityAnnotation,
    TemplateSegment,
};
