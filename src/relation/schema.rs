// SPDX-License-Identifier: BSD-3-Clause
use std::fmt;

use crate::domain::{
    Attr, BASE_CTX, BASE_OBJ, BASE_VAR, DST, DST_CTX, FIELD, OBJ, OBJ_CTX, SRC, SRC_CTX, VAR,
    VAR_CTX,
};

use super::SchemaError;

/// Ordered list of distinct attributes.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Schema(Vec<Attr>);

impl Schema {
    pub fn new(attrs: impl IntoIterator<Item = Attr>) -> Result<Self, SchemaError> {
        let attrs: Vec<Attr> = attrs.into_iter().collect();
        check_distinct("schema", &attrs)?;
        Ok(Schema(attrs))
    }

    /// Only for attribute lists that are distinct by construction.
    pub(crate) fn known(attrs: &[Attr]) -> Self {
        debug_assert!(check_distinct("schema", attrs).is_ok());
        Schema(attrs.to_vec())
    }

    #[inline]
    pub fn attrs(&self) -> &[Attr] {
        &self.0
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn position(&self, attr: Attr) -> Option<usize> {
        self.0.iter().position(|a| *a == attr)
    }

    #[inline]
    pub fn contains(&self, attr: Attr) -> bool {
        self.0.contains(&attr)
    }

    /// For each column of `self`, the position of the same attribute in
    /// `other`.
    pub(crate) fn permutation(
        &self,
        other: &Schema,
        op: &'static str,
    ) -> Result<Vec<usize>, SchemaError> {
        let mismatch = || SchemaError::Mismatch {
            op,
            left: self.clone(),
            right: other.clone(),
        };
        if self.arity() != other.arity() {
            return Err(mismatch());
        }
        self.0
            .iter()
            .map(|a| other.position(*a).ok_or_else(mismatch))
            .collect()
    }

    /// Positions of `attrs` in this schema.
    pub(crate) fn positions(
        &self,
        attrs: &[Attr],
        op: &'static str,
    ) -> Result<Vec<usize>, SchemaError> {
        attrs
            .iter()
            .map(|a| {
                self.position(*a).ok_or_else(|| SchemaError::MissingAttribute {
                    op,
                    attr: *a,
                    schema: self.clone(),
                })
            })
            .collect()
    }

    // ----------------------------------------------------------
    // Schemas of the propagator's relations

    pub fn var_points_to() -> Self {
        Self::known(&[VAR_CTX, VAR, OBJ_CTX, OBJ])
    }

    pub fn field_points_to() -> Self {
        Self::known(&[BASE_CTX, BASE_OBJ, FIELD, OBJ_CTX, OBJ])
    }

    pub fn alloc() -> Self {
        Self::known(&[OBJ_CTX, OBJ, VAR_CTX, VAR])
    }

    pub fn simple() -> Self {
        Self::known(&[SRC_CTX, SRC, DST_CTX, DST])
    }

    pub fn store() -> Self {
        Self::known(&[SRC_CTX, SRC, DST_CTX, DST, FIELD])
    }

    pub fn load() -> Self {
        Self::known(&[BASE_CTX, BASE_VAR, FIELD, DST_CTX, DST])
    }

    pub fn context_filter() -> Self {
        Self::known(&[VAR_CTX, OBJ_CTX])
    }

    pub fn type_filter() -> Self {
        Self::known(&[VAR, OBJ])
    }
}

pub(crate) fn check_distinct(op: &'static str, attrs: &[Attr]) -> Result<(), SchemaError> {
    for (i, a) in attrs.iter().enumerate() {
        if attrs[..i].contains(a) {
            return Err(SchemaError::DuplicateAttribute {
                op,
                attr: *a,
                attrs: attrs.to_vec(),
            });
        }
    }
    Ok(())
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, a) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{a}")?;
        }
        write!(f, ")")
    }
}
