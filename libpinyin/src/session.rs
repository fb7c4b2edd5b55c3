//! Per-keystroke query sessions.
//!
//! A text field fires one query per keystroke, often faster than queries
//! finish. `KeystrokeSession` stamps each query with a generation number and
//! drops results whose keystroke has been superseded.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use suggest_core::Candidate;
use tracing::trace;

use crate::engine::Engine;

/// Generation number handed out per keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct KeystrokeSession {
    engine: Arc<Engine>,
    generation: Arc<AtomicU64>,
}

impl KeystrokeSession {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self {
            engine,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    /// Start a new keystroke; every earlier ticket becomes stale.
    pub fn begin(&self) -> Ticket {
        Ticket(self.generation.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// Invalidate every outstanding ticket, e.g. when the field loses focus.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.generation.load(Ordering::Acquire) == ticket.0
    }

    /// Run the query for an already issued ticket. `None` when a newer
    /// keystroke arrived before the result was ready.
    pub fn query_with(
        &self,
        ticket: Ticket,
        raw: &str,
        limit: usize,
        context: Option<&str>,
    ) -> Option<Vec<Candidate>> {
        if !self.is_current(ticket) {
            return None;
        }
        let out = self.engine.generate_candidates(raw, limit, context);
        if self.is_current(ticket) {
            Some(out)
        } else {
            trace!(input = raw, "superseded result dropped");
            None
        }
    }

    /// Begin a keystroke and query it.
    pub fn query(&self, raw: &str, limit: usize, context: Option<&str>) -> Option<Vec<Candidate>> {
        let ticket = self.begin();
        self.query_with(ticket, raw, limit, context)
    }
}
