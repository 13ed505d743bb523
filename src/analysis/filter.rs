// SPDX-License-Identifier: BSD-3-Clause
//! Context and type filters
//!
//! Every fact derived for a variable must pass the context filter: the pair
//! (variable context, object context) has to be allowed by the context
//! transitions the host currently considers live. Hosts may additionally
//! supply declared-type compatibility of variables and objects.

use crate::domain::{Attr, Domain, Universe, OBJ_CTX, VAR, VAR_CTX};
use crate::relation::{Relation, Schema, SchemaError};

pub struct ContextFilter;

impl ContextFilter {
    /// Legal (variable context, object context) pairs: the transitions,
    /// joined against the universe of context pairs.
    pub fn compute(universe: &Universe, transitions: &Relation) -> Result<Relation, SchemaError> {
        Schema::context_filter().permutation(transitions.schema(), "context filter")?;
        // Joining with the product of both unary universes is the same as
        // joining with each of them.
        transitions
            .join(&Relation::universe(VAR_CTX, universe), &[])?
            .join(&Relation::universe(OBJ_CTX, universe), &[])
    }

    /// Transitions allowing every pair of known contexts.
    pub fn insensitive(universe: &Universe) -> Relation {
        let mut pairs = Relation::empty(Schema::context_filter());
        for var_ctx in universe.values(Domain::Context) {
            for obj_ctx in universe.values(Domain::Context) {
                pairs.push(&[var_ctx, obj_ctx]);
            }
        }
        pairs
    }
}

/// The filters in effect for one step.
#[derive(Clone, Debug)]
pub struct Filter {
    contexts: Relation,
    types: Option<Relation>,
}

impl Filter {
    pub fn new(contexts: Relation, types: Option<&Relation>) -> Result<Self, SchemaError> {
        Schema::context_filter().permutation(contexts.schema(), "filter")?;
        if let Some(t) = types {
            Schema::type_filter().permutation(t.schema(), "filter")?;
        }
        Ok(Filter {
            contexts,
            types: types.cloned(),
        })
    }

    #[inline]
    pub fn into_contexts(self) -> Relation {
        self.contexts
    }

    /// Keep the tuples of `rel` that pass the filters, where `ctx` and `var`
    /// are the attributes of `rel` holding the variable side of the fact.
    pub fn restrict(&self, rel: &Relation, ctx: Attr, var: Attr) -> Result<Relation, SchemaError> {
        let mut out = rel.join(&self.contexts.rename(&[(VAR_CTX, ctx)])?, &[])?;
        if let Some(types) = &self.types {
            out = out.join(&types.rename(&[(VAR, var)])?, &[])?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DST, DST_CTX, OBJ};

    #[test]
    fn compute_drops_unknown_contexts() {
        let mut universe = Universe::new();
        universe.register(Domain::Context, 1);
        let transitions = Relation::from_tuples(
            Schema::new([OBJ_CTX, VAR_CTX]).unwrap(),
            [[0u32, 1], [1, 1], [5, 0]],
        )
        .unwrap();
        let filter = ContextFilter::compute(&universe, &transitions).unwrap();
        assert_eq!(
            Relation::from_tuples(Schema::context_filter(), [[1u32, 0], [1, 1]]).unwrap(),
            filter
        );
    }

    #[test]
    fn compute_rejects_other_schemas() {
        let universe = Universe::new();
        let bogus = Relation::empty(Schema::type_filter());
        assert!(ContextFilter::compute(&universe, &bogus).is_err());
    }

    #[test]
    fn insensitive_is_all_pairs() {
        let mut universe = Universe::new();
        universe.register(Domain::Context, 2);
        assert_eq!(9, ContextFilter::insensitive(&universe).len());
    }

    #[test]
    fn restrict_renames_onto_variable_side() {
        let contexts = Relation::from_tuples(Schema::context_filter(), [[0u32, 0]]).unwrap();
        let types = Relation::from_tuples(Schema::type_filter(), [[2u32, 9]]).unwrap();
        let filter = Filter::new(contexts, Some(&types)).unwrap();
        let candidates = Relation::from_tuples(
            Schema::new([DST_CTX, DST, OBJ_CTX, OBJ]).unwrap(),
            [[0u32, 2, 0, 9], [0, 3, 0, 9], [1, 2, 0, 9]],
        )
        .unwrap();
        let out = filter.restrict(&candidates, DST_CTX, DST).unwrap();
        assert_eq!(1, out.len());
        assert!(out.contains(&[0, 2, 0, 9]));
    }
}
