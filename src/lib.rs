// SPDX-License-Identifier: BSD-3-Clause
//! Relational fixpoint propagation for context-sensitive, inclusion-based
//! points-to analysis.
//!
//! The host builds a [`Pag`] (pointer assignment graph) and supplies the
//! context transitions it considers live; [`propagate::step`] and
//! [`propagate::run`] grow a [`PointsToState`] towards the least fixpoint,
//! handing each batch of newly found `VarPointsTo` tuples to a
//! [`PointsToSink`] such as a [`PointsToQueue`].

pub mod analysis;
pub mod domain;
pub mod facts;
pub mod layers;
pub mod pag;
pub mod queue;
pub mod relation;

pub use analysis::{
    filter::{ContextFilter, Filter},
    oracle, propagate,
    propagate::{Options, Step},
    rules,
    state::PointsToState,
    Error,
};
pub use domain::{
    Attr, Context, Domain, Field, FieldPointsTo, HeapObject, PointsTo, Role, Universe, Variable,
};
pub use pag::{AllocReader, EdgeKind, Pag};
pub use queue::{PointsToQueue, PointsToSink, QueueReader};
pub use relation::{Relation, Schema, SchemaError};
