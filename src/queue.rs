// SPDX-License-Identifier: BSD-3-Clause
//! Output feed of newly confirmed points-to facts.

use crate::analysis::state::points_to_facts;
use crate::domain::PointsTo;
use crate::relation::{Relation, SchemaError};

/// Receives each batch of newly confirmed `VarPointsTo` tuples.
pub trait PointsToSink {
    fn accept(&mut self, batch: Relation);
}

impl PointsToSink for Vec<Relation> {
    fn accept(&mut self, batch: Relation) {
        self.push(batch);
    }
}

/// Append-only log of emitted batches, shared by any number of consumers.
#[derive(Clone, Debug, Default)]
pub struct PointsToQueue {
    batches: Vec<Relation>,
}

impl PointsToQueue {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn batches(&self) -> &[Relation] {
        &self.batches
    }

    /// Total number of tuples ever emitted.
    pub fn len(&self) -> usize {
        self.batches.iter().map(Relation::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.iter().all(Relation::is_empty)
    }

    /// A consumer that starts at the beginning of the queue.
    pub fn reader(&self) -> QueueReader {
        QueueReader::default()
    }
}

impl PointsToSink for PointsToQueue {
    fn accept(&mut self, batch: Relation) {
        self.batches.push(batch);
    }
}

/// One consumer's position in a [`PointsToQueue`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct QueueReader {
    next: usize,
}

impl QueueReader {
    /// Batches this reader has not seen yet.
    pub fn read<'q>(&mut self, queue: &'q PointsToQueue) -> &'q [Relation] {
        let fresh = queue.batches.get(self.next..).unwrap_or_default();
        self.next = queue.batches.len();
        fresh
    }

    /// Like [`QueueReader::read`], flattened into typed facts.
    pub fn read_facts(&mut self, queue: &PointsToQueue) -> Result<Vec<PointsTo>, SchemaError> {
        let mut facts = Vec::new();
        for batch in self.read(queue) {
            facts.extend(points_to_facts(batch)?);
        }
        Ok(facts)
    }
}
