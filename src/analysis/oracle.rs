// SPDX-License-Identifier: BSD-3-Clause
//! Reference evaluation
//!
//! The same four rules, written as a Datalog program and evaluated directly
//! by `ascent`. Given a fixed set of context transitions, its result is the
//! least fixpoint the propagation engine must reach, so it serves to check
//! the engine's output.

use rustc_hash::FxHashSet;

#[cfg(not(feature = "par"))]
use ascent::ascent_run;
#[cfg(feature = "par")]
use ascent::ascent_run_par as ascent_run;

use tracing::trace_span;

use crate::analysis::filter::ContextFilter;
use crate::pag::Pag;
use crate::relation::{Relation, Schema, SchemaError};

/// Least fixpoint of the points-to rules.
#[derive(Clone, Debug)]
pub struct Fixpoint {
    pub var_points_to: Relation,
    pub field_points_to: Relation,
}

fn tuples<const N: usize>(rel: &Relation, order: Schema) -> Result<Vec<[u32; N]>, SchemaError> {
    Ok(rel
        .tuples_in(&order)?
        .map(|t| {
            let mut a = [0; N];
            a.copy_from_slice(&t);
            a
        })
        .collect())
}

#[allow(clippy::clone_on_copy)]
#[allow(clippy::just_underscores_and_digits)]
#[allow(clippy::let_unit_value)]
#[allow(clippy::type_complexity)]
#[allow(clippy::unused_unit)]
pub fn analysis(pag: &Pag, transitions: &Relation) -> Result<Fixpoint, SchemaError> {
    let span = trace_span!("oracle");
    let _span = span.enter();

    let legal_pairs = tuples::<2>(
        &ContextFilter::compute(pag.universe(), transitions)?,
        Schema::context_filter(),
    )?;
    let allocs = tuples::<4>(pag.alloc(), Schema::alloc())?;
    let simples = tuples::<4>(pag.simple(), Schema::simple())?;
    let stores = tuples::<5>(pag.store(), Schema::store())?;
    let loads = tuples::<5>(pag.load(), Schema::load())?;
    let types: Option<FxHashSet<(u32, u32)>> = match pag.types() {
        None => None,
        Some(t) => Some(
            tuples::<2>(t, Schema::type_filter())?
                .into_iter()
                .map(|[v, o]| (v, o))
                .collect(),
        ),
    };
    let compatible = |v: u32, o: u32| types.as_ref().map_or(true, |t| t.contains(&(v, o)));

    #[allow(clippy::redundant_clone)]
    #[allow(unused_variables)]
    let outs = ascent_run! {
        struct Outs;

        // ----------------------------------------------------------
        // Input

        relation legal(u32, u32);
        legal(vc, oc) <-- for &[vc, oc] in legal_pairs.iter();

        relation alloc_edge(u32, u32, u32, u32);
        alloc_edge(oc, o, vc, v) <-- for &[oc, o, vc, v] in allocs.iter();

        relation simple_edge(u32, u32, u32, u32);
        simple_edge(sc, s, dc, d) <-- for &[sc, s, dc, d] in simples.iter();

        relation store_edge(u32, u32, u32, u32, u32);
        store_edge(sc, s, dc, d, f) <-- for &[sc, s, dc, d, f] in stores.iter();

        relation load_edge(u32, u32, u32, u32, u32);
        load_edge(bc, b, f, dc, d) <-- for &[bc, b, f, dc, d] in loads.iter();

        // ----------------------------------------------------------
        // Rules

        relation var_points_to(u32, u32, u32, u32);
        relation field_points_to(u32, u32, u32, u32, u32);

        // v = new o
        var_points_to(vc, v, oc, o) <--
          alloc_edge(oc, o, vc, v),
          legal(vc, oc),
          if compatible(*v, *o);

        // d = s
        var_points_to(dc, d, oc, o) <--
          simple_edge(sc, s, dc, d),
          var_points_to(sc, s, oc, o),
          legal(dc, oc),
          if compatible(*d, *o);

        // d.f = s
        field_points_to(bc, bo, f, oc, o) <--
          store_edge(sc, s, dc, d, f),
          var_points_to(sc, s, oc, o),
          var_points_to(dc, d, bc, bo);

        // d = b.f
        var_points_to(dc, d, oc, o) <--
          load_edge(bc, b, f, dc, d),
          var_points_to(bc, b, boc, bo),
          field_points_to(boc, bo, f, oc, o),
          legal(dc, oc),
          if compatible(*d, *o);
    };

    Ok(Fixpoint {
        var_points_to: Relation::from_tuples(
            Schema::var_points_to(),
            outs.var_points_to.iter().map(|&(vc, v, oc, o)| [vc, v, oc, o]),
        )?,
        field_points_to: Relation::from_tuples(
            Schema::field_points_to(),
            outs.field_points_to
                .iter()
                .map(|&(bc, bo, f, oc, o)| [bc, bo, f, oc, o]),
        )?,
    })
}
