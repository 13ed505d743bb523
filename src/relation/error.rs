// SPDX-License-Identifier: BSD-3-Clause
use crate::domain::Attr;

use super::Schema;

/// Misuse of attributes in a relation operation.
///
/// These are programming errors in attribute bookkeeping, not data errors:
/// callers are expected to propagate them and abort.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("{op}: schemas {left} and {right} have different attributes")]
    Mismatch {
        op: &'static str,
        left: Schema,
        right: Schema,
    },
    #[error("{op}: schemas {left} and {right} share no attribute")]
    NoSharedAttributes {
        op: &'static str,
        left: Schema,
        right: Schema,
    },
    #[error("{op}: schemas {left} and {right} overlap")]
    Overlap {
        op: &'static str,
        left: Schema,
        right: Schema,
    },
    #[error("{op}: attribute {attr} is not in schema {schema}")]
    MissingAttribute {
        op: &'static str,
        attr: Attr,
        schema: Schema,
    },
    #[error("{op}: attribute {attr} would occur twice in {attrs:?}")]
    DuplicateAttribute {
        op: &'static str,
        attr: Attr,
        attrs: Vec<Attr>,
    },
    #[error("{op}: cannot rename {from} to {to}, domains differ")]
    DomainMismatch {
        op: &'static str,
        from: Attr,
        to: Attr,
    },
    #[error("{op}: tuple of arity {found} does not fit schema {schema}")]
    Arity {
        op: &'static str,
        found: usize,
        schema: Schema,
    },
}
