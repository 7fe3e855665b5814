//! Common types and utilities for the Rill semantic core.
//!
//! This crate provides the foundations shared by every analysis:
//! - String interning (`Atom`, `Interner`)
//! - Recursion guards (`RecursionGuard`, `DepthCounter`, `RecursionProfile`)

// String interning for identifier deduplication
pub mod interner;
pub use interner::{Atom, Interner};

// Cycle detection and depth limiting for recursive analyses
pub mod recursion;
pub use recursion::{DepthCounter, RecursionGuard, RecursionProfile, RecursionResult};
