// SPDX-License-Identifier: BSD-3-Clause
//! Propagation rules
//!
//! Each rule is a pure function from the current points-to relations and the
//! PAG to the facts it derives. None of them modifies its inputs; the driver
//! folds their results into the state.
//!
//! Joins line up columns by attribute, so each rule first renames its
//! operands so that exactly the columns it means to match coincide.

use tracing::trace_span;

use crate::analysis::{filter::Filter, Error};
use crate::domain::{
    Attr, BASE_CTX, BASE_OBJ, BASE_VAR, DST, DST_CTX, FIELD, OBJ, OBJ_CTX, SRC, SRC_CTX, VAR,
    VAR_CTX,
};
use crate::relation::{Relation, SchemaError};

// Profiling machinery
#[inline]
#[allow(unused_variables)]
fn count(rule: &str, derived: &Relation) {
    #[cfg(feature = "count")]
    eprintln!("{} {}", rule, derived.len());
}

const AS_SRC: [(Attr, Attr); 2] = [(VAR_CTX, SRC_CTX), (VAR, SRC)];
const DST_AS_VAR: [(Attr, Attr); 2] = [(DST_CTX, VAR_CTX), (DST, VAR)];
const DST_AS_SRC: [(Attr, Attr); 2] = [(DST_CTX, SRC_CTX), (DST, SRC)];

/// `var = new obj`: the allocation edges that pass the filter.
pub fn propagate_alloc(new_allocs: &Relation, filter: &Filter) -> Result<Relation, SchemaError> {
    let span = trace_span!("alloc");
    let _span = span.enter();
    let derived = filter.restrict(new_allocs, VAR_CTX, VAR)?;
    count("alloc", &derived);
    Ok(derived)
}

/// `dst = src`, iterated until no new facts appear.
///
/// Facts only flow along simple edges here, so saturating them within one
/// step saves the outer loop most of its iterations on long assignment
/// chains. `bound` caps the number of saturation rounds.
pub fn propagate_simple(
    pt: &Relation,
    simple: &Relation,
    filter: &Filter,
    bound: u64,
) -> Result<Relation, Error> {
    let span = trace_span!("simple");
    let _span = span.enter();

    let step = |sources: &Relation| -> Result<Relation, SchemaError> {
        let flowed = simple.join(sources, &[SRC_CTX, SRC])?;
        filter.restrict(&flowed, DST_CTX, DST)
    };

    let mut frontier = step(&pt.rename(&AS_SRC)?)?;
    let mut delta = Relation::empty(frontier.schema().clone());
    let mut iterations = 0;
    loop {
        frontier.difference_into(&delta)?;
        if frontier.is_empty() {
            break;
        }
        iterations += 1;
        if iterations > bound {
            return Err(Error::NonTermination {
                rule: "simple",
                iterations,
                bound,
            });
        }
        delta.union_into(&frontier)?;
        frontier = step(&frontier.rename(&DST_AS_SRC)?)?;
    }
    count("simple", &delta);
    Ok(delta.rename(&DST_AS_VAR)?)
}

/// `dst.field = src`: every object `src` points to may be held in `field`
/// of every object `dst` points to.
///
/// Not filtered: the heap has no variable side to check.
pub fn propagate_store(pt: &Relation, store: &Relation) -> Result<Relation, SchemaError> {
    let span = trace_span!("store");
    let _span = span.enter();
    let stored = store.join(&pt.rename(&AS_SRC)?, &[SRC_CTX, SRC])?;
    let bases = pt.rename(&[
        (VAR_CTX, DST_CTX),
        (VAR, DST),
        (OBJ_CTX, BASE_CTX),
        (OBJ, BASE_OBJ),
    ])?;
    let derived = stored.join(&bases, &[DST_CTX, DST])?;
    count("store", &derived);
    Ok(derived)
}

/// `dst = base.field`: whatever `field` of an object `base` points to holds
/// may flow into `dst`.
pub fn propagate_load(
    pt: &Relation,
    field_pt: &Relation,
    load: &Relation,
    filter: &Filter,
) -> Result<Relation, SchemaError> {
    let span = trace_span!("load");
    let _span = span.enter();
    // The base variable's context and the base object's context would both
    // be (Context, Base); move the variable side to Src first.
    let loads = load.rename(&[(BASE_CTX, SRC_CTX), (BASE_VAR, SRC)])?;
    let bases = pt.rename(&[
        (VAR_CTX, SRC_CTX),
        (VAR, SRC),
        (OBJ_CTX, BASE_CTX),
        (OBJ, BASE_OBJ),
    ])?;
    let from_heap = loads.join(&bases, &[SRC_CTX, SRC])?;
    let loaded = from_heap.join(field_pt, &[BASE_CTX, BASE_OBJ, FIELD])?;
    let derived = filter.restrict(&loaded, DST_CTX, DST)?.rename(&DST_AS_VAR)?;
    count("load", &derived);
    Ok(derived)
}
