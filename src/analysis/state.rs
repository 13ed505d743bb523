// SPDX-License-Identifier: BSD-3-Clause
//! Points-to state owned by one propagation run.

use crate::domain::{Context, Field, FieldPointsTo, HeapObject, PointsTo, Variable};
use crate::pag::{AllocReader, Pag};
use crate::queue::PointsToSink;
use crate::relation::{Relation, Schema, SchemaError};

/// `VarPointsTo`, `FieldPointsTo` and `Emitted`, plus the bookkeeping a run
/// needs between steps.
///
/// Both points-to relations only grow. `emitted` is always a subset of
/// `var_points_to` between steps.
#[derive(Clone, Debug)]
pub struct PointsToState {
    var_points_to: Relation,
    field_points_to: Relation,
    emitted: Relation,
    allocs: AllocReader,
    rejected_allocs: Relation,
    context_filter: Relation,
    steps: usize,
}

impl Default for PointsToState {
    fn default() -> Self {
        Self::new()
    }
}

impl PointsToState {
    pub fn new() -> Self {
        PointsToState {
            var_points_to: Relation::empty(Schema::var_points_to()),
            field_points_to: Relation::empty(Schema::field_points_to()),
            emitted: Relation::empty(Schema::var_points_to()),
            allocs: AllocReader::new(),
            rejected_allocs: Relation::empty(Schema::alloc()),
            context_filter: Relation::empty(Schema::context_filter()),
            steps: 0,
        }
    }

    #[inline]
    pub fn var_points_to(&self) -> &Relation {
        &self.var_points_to
    }

    #[inline]
    pub fn field_points_to(&self) -> &Relation {
        &self.field_points_to
    }

    #[inline]
    pub fn emitted(&self) -> &Relation {
        &self.emitted
    }

    /// The context filter computed by the most recent step.
    #[inline]
    pub fn context_filter(&self) -> &Relation {
        &self.context_filter
    }

    /// Number of completed steps.
    #[inline]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Whether the PAG holds allocation edges this state has not consumed.
    pub fn has_pending_allocs(&self, pag: &Pag) -> bool {
        self.allocs.has_pending(pag)
    }

    /// Allocation edges that failed the filter when last offered. They are
    /// offered again on every step until the filter lets them through.
    #[inline]
    pub fn rejected_allocs(&self) -> &Relation {
        &self.rejected_allocs
    }

    /// The allocation edges that arrived since the last read, together with
    /// the ones still waiting for a legal context pair.
    pub(crate) fn read_allocs(&mut self, pag: &Pag) -> Result<Relation, SchemaError> {
        let mut offered = self.allocs.read(pag);
        offered.union_into(&self.rejected_allocs)?;
        Ok(offered)
    }

    /// Keep the `offered` allocation edges that did not make it into
    /// `accepted` for the next step.
    pub(crate) fn keep_rejected_allocs(
        &mut self,
        offered: &Relation,
        accepted: &Relation,
    ) -> Result<(), SchemaError> {
        let rejected = offered.difference(accepted)?;
        if rejected != self.rejected_allocs {
            self.rejected_allocs = rejected;
        }
        Ok(())
    }

    pub(crate) fn fold_var(&mut self, facts: &Relation) -> Result<bool, SchemaError> {
        self.var_points_to.union_into(facts)
    }

    pub(crate) fn fold_field(&mut self, facts: &Relation) -> Result<bool, SchemaError> {
        self.field_points_to.union_into(facts)
    }

    /// Hand the tuples of `VarPointsTo` not reported yet to `sink`. Returns
    /// how many there were; nothing is sent when there are none.
    pub(crate) fn emit(&mut self, sink: &mut impl PointsToSink) -> Result<usize, SchemaError> {
        let fresh = self.var_points_to.difference(&self.emitted)?;
        if fresh.is_empty() {
            return Ok(0);
        }
        self.emitted.union_into(&fresh)?;
        let n = fresh.len();
        sink.accept(fresh);
        Ok(n)
    }

    pub(crate) fn finish_step(&mut self, context_filter: Relation) {
        // Keep the old storage when the filter did not change.
        if context_filter != self.context_filter {
            self.context_filter = context_filter;
        }
        self.steps += 1;
    }

    /// Every `VarPointsTo` fact, sorted.
    pub fn points_to(&self) -> Vec<PointsTo> {
        let mut facts = points_to_facts(&self.var_points_to).unwrap_or_default();
        facts.sort_unstable();
        facts
    }

    /// Every `FieldPointsTo` fact, sorted.
    pub fn field_points_to_facts(&self) -> Vec<FieldPointsTo> {
        let mut facts = field_points_to_facts(&self.field_points_to).unwrap_or_default();
        facts.sort_unstable();
        facts
    }

    /// Objects (with their contexts) `var` may point to in `ctx`.
    pub fn points_to_set(&self, ctx: Context, var: Variable) -> Vec<(Context, HeapObject)> {
        let mut objs: Vec<(Context, HeapObject)> = self
            .points_to()
            .into_iter()
            .filter(|pt| pt.var_ctx == ctx && pt.var == var)
            .map(|pt| (pt.obj_ctx, pt.obj))
            .collect();
        objs.dedup();
        objs
    }
}

/// Typed view of a relation holding `VarPointsTo`'s attributes.
pub fn points_to_facts(rel: &Relation) -> Result<Vec<PointsTo>, SchemaError> {
    Ok(rel
        .tuples_in(&Schema::var_points_to())?
        .map(|t| PointsTo {
            var_ctx: Context(t[0]),
            var: Variable(t[1]),
            obj_ctx: Context(t[2]),
            obj: HeapObject(t[3]),
        })
        .collect())
}

/// Typed view of a relation holding `FieldPointsTo`'s attributes.
pub fn field_points_to_facts(rel: &Relation) -> Result<Vec<FieldPointsTo>, SchemaError> {
    Ok(rel
        .tuples_in(&Schema::field_points_to())?
        .map(|t| FieldPointsTo {
            base_ctx: Context(t[0]),
            base: HeapObject(t[1]),
            field: Field(t[2]),
            obj_ctx: Context(t[3]),
            obj: HeapObject(t[4]),
        })
        .collect())
}
