//! Per-construction context passed down the call chain.
//!
//! Instead of process-wide state, every construction carries a
//! [`ConstructionContext`]. Nested constructions triggered by a blueprint see
//! the context of the construction that triggered them, so a suppression
//! scope covers the whole object graph and nothing outside it.

use crate::error::{LatheError, LatheResult};
use std::ops::{Deref, DerefMut};

/// State shared by one construction and everything it nests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstructionContext {
    persist_suppressed: bool,
    depth: usize,
}

impl ConstructionContext {
    /// A root context: persistence enabled, no nesting.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// True while constructions must skip the store.
    pub fn is_persist_suppressed(&self) -> bool {
        self.persist_suppressed
    }

    /// Number of constructions currently in progress on this chain.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Suppresses persistence until the guard drops, then restores the
    /// previous setting. Restoration also happens when unwinding.
    pub fn suppress_persistence(&mut self) -> SuppressionGuard<'_> {
        let prior = self.persist_suppressed;
        self.persist_suppressed = true;
        SuppressionGuard {
            context: self,
            prior,
        }
    }

    /// Enters one more level of nested construction.
    pub(crate) fn enter(&mut self, max_depth: usize) -> LatheResult<NestingGuard<'_>> {
        if self.depth >= max_depth {
            return Err(LatheError::DepthExceeded(max_depth));
        }
        self.depth += 1;
        Ok(NestingGuard { context: self })
    }
}

/// Runs `f` with persistence suppressed.
pub fn with_save_suppressed<T>(
    context: &mut ConstructionContext,
    f: impl FnOnce(&mut ConstructionContext) -> T,
) -> T {
    let mut guard = context.suppress_persistence();
    f(&mut guard)
}

/// Scope in which persistence is suppressed.
pub struct SuppressionGuard<'a> {
    context: &'a mut ConstructionContext,
    prior: bool,
}

impl Deref for SuppressionGuard<'_> {
    type Target = ConstructionContext;

    fn deref(&self) -> &ConstructionContext {
        self.context
    }
}

impl DerefMut for SuppressionGuard<'_> {
    fn deref_mut(&mut self) -> &mut ConstructionContext {
        self.context
    }
}

impl Drop for SuppressionGuard<'_> {
    fn drop(&mut self) {
        self.context.persist_suppressed = self.prior;
    }
}

/// One level of nested construction.
pub(crate) struct NestingGuard<'a> {
    context: &'a mut ConstructionContext,
}

impl Deref for NestingGuard<'_> {
    type Target = ConstructionContext;

    fn deref(&self) -> &ConstructionContext {
        self.context
    }
}

impl DerefMut for NestingGuard<'_> {
    fn deref_mut(&mut self) -> &mut ConstructionContext {
        self.context
    }
}

impl Drop for NestingGuard<'_> {
    fn drop(&mut self) {
        self.context.depth -= 1;
    }
}
