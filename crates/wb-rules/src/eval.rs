//! Evaluation context for guarded condition evaluation
//!
//! Cell reads enforce completeness only while a rule condition is being
//! evaluated. The nesting depth of such evaluations lives in an
//! [`EvalContext`] that the host passes into every condition call, and is
//! adjusted through a scope guard so it always returns to its previous value.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-cycle evaluation state handed to guarded conditions
#[derive(Debug, Default)]
pub struct EvalContext {
    depth: AtomicUsize,
}

impl EvalContext {
    /// Create a context with no guarded evaluation in progress
    pub fn new() -> Self {
        Self::default()
    }

    /// Current nesting depth of guarded evaluations
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// Whether reads must enforce completeness
    pub fn is_guarded(&self) -> bool {
        self.depth() > 0
    }

    /// Enter a guarded evaluation; the depth is restored when the guard drops
    pub fn enter(&self) -> GuardScope<'_> {
        self.depth.fetch_add(1, Ordering::SeqCst);
        GuardScope { ctx: self }
    }
}

/// Keeps an [`EvalContext`] guarded for as long as it lives
#[must_use = "the guard is released as soon as the scope is dropped"]
#[derive(Debug)]
pub struct GuardScope<'a> {
    ctx: &'a EvalContext,
}

impl Drop for GuardScope<'_> {
    fn drop(&mut self) {
        self.ctx.depth.fetch_sub(1, Ordering::SeqCst);
    }
}
