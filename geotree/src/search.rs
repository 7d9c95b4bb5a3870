//! Visitor-driven range search.
//!
//! A search walks every node whose envelope intersects the query and hands
//! each intersecting entry to a [`SearchVisitor`]. The visitor can stop the
//! traversal at any point by returning [`ControlFlow::Break`]; this is the
//! only cancellation mechanism, so deadlines are enforced by wrapping the
//! visitor.

use std::ops::ControlFlow;

use crate::boundary::Envelope;
use crate::rtree::rtree_types::EntryId;

/// Receives the entries found by a search.
pub trait SearchVisitor {
    /// Called once per entry whose envelope intersects the query.
    fn visit(&mut self, id: EntryId, envelope: &Envelope) -> ControlFlow<()>;
}

impl<F> SearchVisitor for F
where
    F: FnMut(EntryId, &Envelope) -> ControlFlow<()>,
{
    fn visit(&mut self, id: EntryId, envelope: &Envelope) -> ControlFlow<()> {
        self(id, envelope)
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Every intersecting entry was visited
    Completed,
    /// The visitor stopped the traversal early
    Interrupted,
}

impl From<ControlFlow<()>> for SearchOutcome {
    fn from(flow: ControlFlow<()>) -> Self {
        match flow {
            ControlFlow::Continue(()) => SearchOutcome::Completed,
            ControlFlow::Break(()) => SearchOutcome::Interrupted,
        }
    }
}

/// Collects the ids of visited entries, optionally stopping after `limit`.
#[derive(Debug, Clone, Default)]
pub struct CollectVisitor {
    ids: Vec<EntryId>,
    limit: Option<usize>,
}

impl CollectVisitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stops the search once `limit` ids were collected.
    pub fn with_limit(limit: usize) -> Self {
        CollectVisitor {
            ids: Vec::new(),
            limit: Some(limit),
        }
    }

    pub fn ids(&self) -> &[EntryId] {
        &self.ids
    }

    pub fn into_ids(self) -> Vec<EntryId> {
        self.ids
    }
}

impl SearchVisitor for CollectVisitor {
    fn visit(&mut self, id: EntryId, _envelope: &Envelope) -> ControlFlow<()> {
        if self.limit.is_some_and(|limit| self.ids.len() >= limit) {
            return ControlFlow::Break(());
        }
        self.ids.push(id);
        if self.limit.is_some_and(|limit| self.ids.len() >= limit) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
