// SPDX-License-Identifier: BSD-3-Clause
//! Fixpoint driver
//!
//! A step applies the rules in a fixed order (allocation, simple, store,
//! load), folding each rule's output into the state before the next rule
//! runs, and emits the new `VarPointsTo` tuples after the simple and load
//! rules. A step that derives nothing leaves the state untouched.

use tracing::{debug, info, trace_span};

use crate::analysis::{
    filter::{ContextFilter, Filter},
    rules,
    state::PointsToState,
    Error,
};
use crate::pag::Pag;
use crate::queue::PointsToSink;
use crate::relation::{Relation, Schema};

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Give up with [`Error::StepLimit`] after this many steps.
    pub max_steps: Option<usize>,
    /// Cap on the simple rule's saturation rounds, below the one implied by
    /// the size of the universe.
    pub saturation_limit: Option<u64>,
    /// Log every step at info rather than debug level.
    pub verbose: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Step {
    /// `VarPointsTo` did not change.
    Stable,
    Changed,
}

/// Every saturation round adds at least one new tuple, so saturation cannot
/// run longer than there are possible `VarPointsTo` tuples.
fn saturation_bound(pag: &Pag, opts: &Options) -> u64 {
    let bound = pag
        .universe()
        .capacity(Schema::var_points_to().attrs())
        .saturating_add(1);
    match opts.saturation_limit {
        Some(limit) => bound.min(limit),
        None => bound,
    }
}

/// One round of propagation.
///
/// Returns [`Step::Changed`] iff `VarPointsTo` grew. On error, whatever was
/// folded before the failing rule stays in `state`.
pub fn step(
    state: &mut PointsToState,
    pag: &Pag,
    transitions: &Relation,
    sink: &mut impl PointsToSink,
    opts: &Options,
) -> Result<Step, Error> {
    let span = trace_span!("step", n = state.steps());
    let _span = span.enter();

    let old = state.var_points_to().clone();
    let filter = Filter::new(
        ContextFilter::compute(pag.universe(), transitions)?,
        pag.types(),
    )?;

    let offered = state.read_allocs(pag)?;
    let derived = rules::propagate_alloc(&offered, &filter)?;
    state.keep_rejected_allocs(&offered, &derived)?;
    state.fold_var(&derived)?;

    let derived = rules::propagate_simple(
        state.var_points_to(),
        pag.simple(),
        &filter,
        saturation_bound(pag, opts),
    )?;
    state.fold_var(&derived)?;

    let mut emitted = emit(state, sink)?;

    let derived = rules::propagate_store(state.var_points_to(), pag.store())?;
    state.fold_field(&derived)?;

    let derived = rules::propagate_load(
        state.var_points_to(),
        state.field_points_to(),
        pag.load(),
        &filter,
    )?;
    state.fold_var(&derived)?;

    emitted += emit(state, sink)?;

    let changed = state.var_points_to() != &old;
    let n = state.steps();
    let pts = state.var_points_to().len();
    let fpts = state.field_points_to().len();
    if opts.verbose {
        info!("Major iteration {n}: {pts} var points-to, {fpts} field points-to, {emitted} emitted");
    } else {
        debug!("Major iteration {n}: {pts} var points-to, {fpts} field points-to, {emitted} emitted");
    }
    state.finish_step(filter.into_contexts());

    Ok(if changed { Step::Changed } else { Step::Stable })
}

fn emit(state: &mut PointsToState, sink: &mut impl PointsToSink) -> Result<usize, Error> {
    let span = trace_span!("emit");
    let _span = span.enter();
    Ok(state.emit(sink)?)
}

/// Step until stable. Returns the number of steps taken.
pub fn run(
    state: &mut PointsToState,
    pag: &Pag,
    transitions: &Relation,
    sink: &mut impl PointsToSink,
    opts: &Options,
) -> Result<usize, Error> {
    let mut steps = 0;
    loop {
        if let Some(max) = opts.max_steps {
            if steps >= max {
                return Err(Error::StepLimit { steps });
            }
        }
        steps += 1;
        if step(state, pag, transitions, sink, opts)? == Step::Stable {
            return Ok(steps);
        }
    }
}
