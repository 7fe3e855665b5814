//! String interning for identifier deduplication.
//!
//! Identifiers, package names, and string constants flow through every
//! analysis, so they are interned once and passed around as cheap [`Atom`]
//! handles. An `Atom` owns a shared pointer to the interned text: it can be
//! displayed and compared without a reference back to the [`Interner`], and
//! equality short-circuits on pointer identity before falling back to a
//! content comparison.
//!
//! The intern table is sharded (`DashMap`), so a single `Interner` can be
//! shared across analyses without external locking.

use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// An interned string.
///
/// Two atoms interned by the same [`Interner`] from equal text share the
/// same allocation. Equality first compares pointers, then content, so atoms
/// from different interners still compare correctly.
#[derive(Clone)]
pub struct Atom(Arc<str>);

impl Atom {
    /// The interned text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Atom {
    type Target = str;

    #[inline]
    fn deref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Atom {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Atom {}

impl PartialEq<str> for Atom {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Atom {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl std::hash::Hash for Atom {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl std::borrow::Borrow<str> for Atom {
    #[inline]
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Atom({:?})", &*self.0)
    }
}

/// A sharded string interner.
pub struct Interner {
    table: DashMap<Box<str>, Atom, FxBuildHasher>,
}

impl Interner {
    pub fn new() -> Self {
        Self {
            table: DashMap::with_hasher(FxBuildHasher),
        }
    }

    /// Interns `text`, returning the canonical [`Atom`] for it.
    pub fn intern(&self, text: &str) -> Atom {
        if let Some(existing) = self.table.get(text) {
            return existing.clone();
        }

        let atom = Atom(Arc::from(text));
        self.table
            .entry(Box::from(text))
            .or_insert_with(|| atom.clone())
            .clone()
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}
