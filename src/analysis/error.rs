// SPDX-License-Identifier: BSD-3-Clause
use crate::relation::SchemaError;

/// Fatal errors of a propagation step.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("{rule} rule still growing after {iterations} iterations (bound {bound})")]
    NonTermination {
        rule: &'static str,
        iterations: u64,
        bound: u64,
    },
    #[error("no fixpoint after {steps} steps")]
    StepLimit { steps: usize },
}
