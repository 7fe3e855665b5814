//! Shared fixture helpers: tests build linked trees directly through the
//! document builder, the same way a host parser would after reference
//! resolution.

#![allow(dead_code)]

use rill_ast::build::DocumentBuilder;
use rill_ast::Workspace;
use rill_sema::SemanticServices;
use std::sync::Arc;

/// A builder for the next document of `workspace`.
pub fn builder(workspace: &Workspace, uri: &str, package: &str) -> DocumentBuilder {
    DocumentBuilder::new(workspace.next_document_id(), workspace.interner(), uri, package)
}

/// Wires the analyses over the finished workspace.
pub fn services(workspace: Workspace) -> SemanticServices {
    SemanticServices::new(Arc::new(workspace))
}
