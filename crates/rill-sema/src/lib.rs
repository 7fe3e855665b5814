//! Semantic analyses for Rill.
//!
//! The engines of the compiler front end's semantic core:
//!
//! - [`TypeComputer`]: type inference (`compute_type`)
//! - [`ClassHierarchy`]: superclass chains (`stream_super_classes`)
//! - [`PartialEvaluator`]: constant folding (`evaluate`)
//! - [`ScopeProvider`]: name resolution (`get_scope`)
//! - [`NodeMapper`]: declaration mapping (`argument_to_parameter`, ...)
//! - [`PurityComputer`]: call-graph purity classification (`purity`)
//!
//! [`SemanticServices`] wires them together over one [`Workspace`]. All
//! analyses are synchronous, single-threaded, pure tree traversals; every
//! result is memoized per `(document, node)` and invalidated wholesale per
//! document via [`SemanticServices::invalidate_document`] when the host
//! reparses a file.

pub mod cache;
pub mod class_hierarchy;
pub mod evaluator;
pub mod node_mapper;
pub mod purity;
pub mod scope;
pub mod type_computer;
pub mod validation;

pub use cache::NodeCache;
pub use class_hierarchy::ClassHierarchy;
pub use evaluator::PartialEvaluator;
pub use node_mapper::{AssignedObject, NodeMapper};
pub use purity::{ImpurityReason, PathDescriptor, Purity, PurityComputer};
pub use scope::{Scope, ScopeProvider};
pub use type_computer::TypeComputer;
pub use validation::{Diagnostic, division_divisor_must_not_be_zero};

use rill_ast::{BuiltinRegistry, DocumentId, Workspace};
use rill_common::RecursionProfile;
use std::sync::Arc;

/// Recursion limits per engine. The defaults are right for real trees;
/// tests shrink them to force the guards.
#[derive(Debug, Clone, Copy)]
pub struct SemanticSettings {
    pub type_inference: RecursionProfile,
    pub constant_evaluation: RecursionProfile,
    pub call_graph: RecursionProfile,
}

impl Default for SemanticSettings {
    fn default() -> Self {
        Self {
            type_inference: RecursionProfile::TypeInference,
            constant_evaluation: RecursionProfile::ConstantEvaluation,
            call_graph: RecursionProfile::CallGraph,
        }
    }
}

/// The wired set of analyses over one workspace.
///
/// Engines receive their collaborators explicitly at construction; the two
/// mutual dependencies (mapper → type computer, type computer → evaluator)
/// are one-shot back-links set here, so no engine ever re-enters itself
/// for the node it is currently working on.
pub struct SemanticServices {
    workspace: Arc<Workspace>,
    builtins: Arc<BuiltinRegistry>,
    mapper: Arc<NodeMapper>,
    type_computer: Arc<TypeComputer>,
    evaluator: Arc<PartialEvaluator>,
    scope_provider: Arc<ScopeProvider>,
    purity_computer: Arc<PurityComputer>,
}

impl SemanticServices {
    pub fn new(workspace: Arc<Workspace>) -> Self {
        Self::with_settings(workspace, SemanticSettings::default())
    }

    pub fn with_settings(workspace: Arc<Workspace>, settings: SemanticSettings) -> Self {
        let builtins = Arc::new(workspace.builtins().clone());

        let mapper = Arc::new(NodeMapper::new(Arc::clone(&workspace)));
        let type_computer = Arc::new(TypeComputer::new(
            Arc::clone(&workspace),
            Arc::clone(&builtins),
            Arc::clone(&mapper),
            settings.type_inference,
        ));
        mapper.set_type_computer(&type_computer);

        let evaluator = Arc::new(PartialEvaluator::new(
            Arc::clone(&workspace),
            Arc::clone(&builtins),
            Arc::clone(&mapper),
            settings.constant_evaluation,
        ));
        type_computer.set_evaluator(&evaluator);

        let scope_provider = Arc::new(ScopeProvider::new(
            Arc::clone(&workspace),
            Arc::clone(&builtins),
            Arc::clone(&type_computer),
            Arc::clone(&mapper),
        ));

        let purity_computer = Arc::new(PurityComputer::new(
            Arc::clone(&workspace),
            Arc::clone(&builtins),
            Arc::clone(&mapper),
            Arc::clone(&evaluator),
            settings.call_graph,
        ));

        Self {
            workspace,
            builtins,
            mapper,
            type_computer,
            evaluator,
            scope_provider,
            purity_computer,
        }
    }

    #[inline]
    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    #[inline]
    pub fn builtins(&self) -> &BuiltinRegistry {
        &self.builtins
    }

    #[inline]
    pub fn types(&self) -> &TypeComputer {
        &self.type_computer
    }

    pub fn class_hierarchy(&self) -> ClassHierarchy<'_> {
        ClassHierarchy::new(&self.type_computer)
    }

    #[inline]
    pub fn evaluator(&self) -> &PartialEvaluator {
        &self.evaluator
    }

    #[inline]
    pub fn scope_provider(&self) -> &ScopeProvider {
        &self.scope_provider
    }

    #[inline]
    pub fn node_mapper(&self) -> &NodeMapper {
        &self.mapper
    }

    #[inline]
    pub fn purity(&self) -> &PurityComputer {
        &self.purity_computer
    }

    /// Drops every memoized result for `document`. The host calls this
    /// after replacing the document's tree with a new parse.
    pub fn invalidate_document(&self, document: DocumentId) {
        self.type_computer.invalidate_document(document);
        self.evaluator.invalidate_document(document);
        self.purity_computer.invalidate_document(document);
    }
}
