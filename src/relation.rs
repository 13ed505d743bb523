// SPDX-License-Identifier: BSD-3-Clause
//! Finite relations over typed attributes.
//!
//! A [`Relation`] is a set of fixed-arity tuples of `u32` ids together with
//! a [`Schema`] naming what each column holds. Set operations (union,
//! difference, intersection, equality) align their operands by attribute, so
//! column order never matters; joins match columns by attribute, so callers
//! [`Relation::rename`] columns beforehand to line up exactly the columns they
//! mean to join on.
//!
//! The tuple set lives behind a [`triomphe::Arc`]: cloning a relation (e.g.
//! to snapshot it before a step) is a reference count bump, and the in-place
//! folds ([`Relation::union_into`], [`Relation::difference_into`]) only copy
//! when they actually change a shared set.

use std::borrow::Cow;
use std::fmt;

use either::Either;
use rustc_hash::{FxHashMap, FxHashSet};
use triomphe::Arc;

use crate::domain::{Attr, Universe};

mod error;
pub use error::*;
mod schema;
pub use schema::*;

type Tuple = Box<[u32]>;
type Tuples = FxHashSet<Tuple>;

#[derive(Clone, Debug)]
pub struct Relation {
    schema: Schema,
    tuples: Arc<Tuples>,
}

impl Relation {
    pub fn empty(schema: Schema) -> Self {
        Relation {
            schema,
            tuples: Arc::new(Tuples::default()),
        }
    }

    pub fn from_tuples<T: AsRef<[u32]>>(
        schema: Schema,
        tuples: impl IntoIterator<Item = T>,
    ) -> Result<Self, SchemaError> {
        let mut rel = Self::empty(schema);
        for t in tuples {
            rel.insert(t.as_ref())?;
        }
        Ok(rel)
    }

    /// Unary relation holding every value of `attr`'s domain.
    pub fn universe(attr: Attr, universe: &Universe) -> Self {
        let tuples = universe
            .values(attr.domain)
            .map(|v| vec![v].into_boxed_slice())
            .collect();
        Relation {
            schema: Schema::known(&[attr]),
            tuples: Arc::new(tuples),
        }
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    /// Tuple in this relation's column order.
    #[inline]
    pub fn contains(&self, tuple: &[u32]) -> bool {
        self.tuples.contains(tuple)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u32]> {
        self.tuples.iter().map(|t| &**t)
    }

    /// Tuples in lexicographic order, for deterministic output.
    pub fn sorted(&self) -> Vec<&[u32]> {
        let mut v: Vec<&[u32]> = self.iter().collect();
        v.sort_unstable();
        v
    }

    /// Whether both relations share the same tuple storage, i.e. neither was
    /// modified since one was cloned from the other.
    #[inline]
    pub fn shares_storage(&self, other: &Relation) -> bool {
        Arc::ptr_eq(&self.tuples, &other.tuples)
    }

    pub fn insert(&mut self, tuple: &[u32]) -> Result<bool, SchemaError> {
        if tuple.len() != self.schema.arity() {
            return Err(SchemaError::Arity {
                op: "insert",
                found: tuple.len(),
                schema: self.schema.clone(),
            });
        }
        if self.tuples.contains(tuple) {
            return Ok(false);
        }
        Ok(Arc::make_mut(&mut self.tuples).insert(tuple.into()))
    }

    /// Insert a tuple whose arity is known to match.
    pub(crate) fn push(&mut self, tuple: &[u32]) -> bool {
        debug_assert_eq!(tuple.len(), self.schema.arity());
        if self.tuples.contains(tuple) {
            return false;
        }
        Arc::make_mut(&mut self.tuples).insert(tuple.into())
    }

    /// Tuples of this relation with columns permuted into `order`, which must
    /// hold the same attributes.
    pub fn tuples_in<'a>(
        &'a self,
        order: &Schema,
    ) -> Result<impl Iterator<Item = Cow<'a, [u32]>> + 'a, SchemaError> {
        align(order, self, "tuples_in")
    }

    // ----------------------------------------------------------
    // Set operations

    pub fn union(&self, other: &Relation) -> Result<Relation, SchemaError> {
        let mut out = self.clone();
        out.union_into(other)?;
        Ok(out)
    }

    pub fn difference(&self, other: &Relation) -> Result<Relation, SchemaError> {
        let mut out = self.clone();
        out.difference_into(other)?;
        Ok(out)
    }

    pub fn intersect(&self, other: &Relation) -> Result<Relation, SchemaError> {
        let other = aligned_set(&self.schema, other, "intersect")?;
        let tuples = self
            .tuples
            .iter()
            .filter(|t| other.contains(*t))
            .cloned()
            .collect();
        Ok(Relation {
            schema: self.schema.clone(),
            tuples: Arc::new(tuples),
        })
    }

    /// In-place union. Returns whether `self` changed; when it didn't, its
    /// storage is left untouched.
    pub fn union_into(&mut self, other: &Relation) -> Result<bool, SchemaError> {
        let perm = self.schema.permutation(&other.schema, "union")?;
        if self.tuples.is_empty() && is_identity(&perm) {
            if other.is_empty() {
                return Ok(false);
            }
            self.tuples = other.tuples.clone();
            return Ok(true);
        }
        let fresh: Vec<Tuple> = align(&self.schema, other, "union")?
            .filter(|t| !self.tuples.contains(&**t))
            .map(|t| t.into_owned().into_boxed_slice())
            .collect();
        if fresh.is_empty() {
            return Ok(false);
        }
        Arc::make_mut(&mut self.tuples).extend(fresh);
        Ok(true)
    }

    /// In-place difference. Returns whether `self` changed.
    pub fn difference_into(&mut self, other: &Relation) -> Result<bool, SchemaError> {
        let other = aligned_set(&self.schema, other, "difference")?;
        if !self.tuples.iter().any(|t| other.contains(t)) {
            return Ok(false);
        }
        Arc::make_mut(&mut self.tuples).retain(|t| !other.contains(t));
        Ok(true)
    }

    // ----------------------------------------------------------
    // Attribute operations

    /// Relabel columns. Each pair is `(from, to)`; renaming keeps the domain
    /// and must leave the schema free of duplicates, so a target may only be
    /// an attribute that is absent or itself renamed away (swaps are fine).
    pub fn rename(&self, pairs: &[(Attr, Attr)]) -> Result<Relation, SchemaError> {
        let froms: Vec<Attr> = pairs.iter().map(|(from, _)| *from).collect();
        schema::check_distinct("rename", &froms)?;
        let positions = self.schema.positions(&froms, "rename")?;
        let mut attrs = self.schema.attrs().to_vec();
        for (&(from, to), pos) in pairs.iter().zip(positions) {
            if from.domain != to.domain {
                return Err(SchemaError::DomainMismatch {
                    op: "rename",
                    from,
                    to,
                });
            }
            attrs[pos] = to;
        }
        schema::check_distinct("rename", &attrs)?;
        Ok(Relation {
            schema: Schema::known(&attrs),
            tuples: self.tuples.clone(),
        })
    }

    /// Existentially quantify away the attributes in `eliminate`.
    pub fn project(&self, eliminate: &[Attr]) -> Result<Relation, SchemaError> {
        if eliminate.is_empty() {
            return Ok(self.clone());
        }
        self.schema.positions(eliminate, "project")?;
        let attrs = self.schema.attrs();
        let keep: Vec<usize> = (0..attrs.len())
            .filter(|i| !eliminate.contains(&attrs[*i]))
            .collect();
        let kept: Vec<Attr> = keep.iter().map(|i| attrs[*i]).collect();
        let tuples = self
            .iter()
            .map(|t| keep.iter().map(|i| t[*i]).collect::<Tuple>())
            .collect();
        Ok(Relation {
            schema: Schema::known(&kept),
            tuples: Arc::new(tuples),
        })
    }

    /// Natural join on the attributes `self` and `other` share, followed by
    /// projecting away `eliminate`.
    ///
    /// Result columns are `self`'s columns followed by `other`'s unshared
    /// ones, minus the eliminated attributes. When every attribute of `other`
    /// is shared this is a semi-join, i.e. `other` acts as a filter.
    pub fn join(&self, other: &Relation, eliminate: &[Attr]) -> Result<Relation, SchemaError> {
        let a = self.schema.attrs();
        let b = other.schema.attrs();
        let shared: Vec<Attr> = a
            .iter()
            .copied()
            .filter(|x| other.schema.contains(*x))
            .collect();
        if shared.is_empty() {
            return Err(SchemaError::NoSharedAttributes {
                op: "join",
                left: self.schema.clone(),
                right: other.schema.clone(),
            });
        }
        for e in eliminate {
            if !self.schema.contains(*e) && !other.schema.contains(*e) {
                let combined: Vec<Attr> = a
                    .iter()
                    .chain(b.iter().filter(|x| !self.schema.contains(**x)))
                    .copied()
                    .collect();
                return Err(SchemaError::MissingAttribute {
                    op: "join",
                    attr: *e,
                    schema: Schema::known(&combined),
                });
            }
        }

        let key_a = self.schema.positions(&shared, "join")?;
        let key_b = other.schema.positions(&shared, "join")?;
        let out_a: Vec<usize> = (0..a.len())
            .filter(|i| !eliminate.contains(&a[*i]))
            .collect();
        let out_b: Vec<usize> = (0..b.len())
            .filter(|i| !self.schema.contains(b[*i]) && !eliminate.contains(&b[*i]))
            .collect();
        let attrs: Vec<Attr> = out_a
            .iter()
            .map(|i| a[*i])
            .chain(out_b.iter().map(|i| b[*i]))
            .collect();
        let emit = |ta: &[u32], tb: &[u32]| -> Tuple {
            out_a
                .iter()
                .map(|i| ta[*i])
                .chain(out_b.iter().map(|i| tb[*i]))
                .collect()
        };

        let mut tuples = Tuples::default();
        let mut key: Vec<u32> = Vec::with_capacity(shared.len());
        if key_b.len() == b.len() {
            // Semi-join: `other` is a filter on `self`.
            let filter = aligned_set(&Schema::known(&shared), other, "join")?;
            for ta in self.iter() {
                key.clear();
                key.extend(key_a.iter().map(|i| ta[*i]));
                if filter.contains(key.as_slice()) {
                    tuples.insert(emit(ta, &[]));
                }
            }
        } else if other.len() <= self.len() {
            let index = index(other, &key_b);
            for ta in self.iter() {
                key.clear();
                key.extend(key_a.iter().map(|i| ta[*i]));
                if let Some(matches) = index.get(key.as_slice()) {
                    tuples.extend(matches.iter().map(|tb| emit(ta, *tb)));
                }
            }
        } else {
            let index = index(self, &key_a);
            for tb in other.iter() {
                key.clear();
                key.extend(key_b.iter().map(|i| tb[*i]));
                if let Some(matches) = index.get(key.as_slice()) {
                    tuples.extend(matches.iter().map(|ta| emit(*ta, tb)));
                }
            }
        }
        Ok(Relation {
            schema: Schema::known(&attrs),
            tuples: Arc::new(tuples),
        })
    }

    /// Cartesian product of relations with disjoint schemas.
    pub fn product(&self, other: &Relation) -> Result<Relation, SchemaError> {
        if other.schema.attrs().iter().any(|x| self.schema.contains(*x)) {
            return Err(SchemaError::Overlap {
                op: "product",
                left: self.schema.clone(),
                right: other.schema.clone(),
            });
        }
        let attrs: Vec<Attr> = self
            .schema
            .attrs()
            .iter()
            .chain(other.schema.attrs())
            .copied()
            .collect();
        let tuples = self
            .iter()
            .flat_map(|ta| {
                other
                    .iter()
                    .map(move |tb| ta.iter().chain(tb).copied().collect::<Tuple>())
            })
            .collect();
        Ok(Relation {
            schema: Schema::known(&attrs),
            tuples: Arc::new(tuples),
        })
    }
}

#[inline]
fn is_identity(perm: &[usize]) -> bool {
    perm.iter().enumerate().all(|(i, p)| i == *p)
}

/// `rel`'s tuples with columns permuted into `order`.
fn align<'a>(
    order: &Schema,
    rel: &'a Relation,
    op: &'static str,
) -> Result<impl Iterator<Item = Cow<'a, [u32]>> + 'a, SchemaError> {
    let perm = order.permutation(&rel.schema, op)?;
    Ok(if is_identity(&perm) {
        Either::Left(rel.iter().map(Cow::Borrowed))
    } else {
        Either::Right(
            rel.iter()
                .map(move |t| Cow::Owned(perm.iter().map(|p| t[*p]).collect())),
        )
    })
}

/// `rel`'s tuple set with columns permuted into `order`, borrowed when no
/// permutation is needed.
fn aligned_set<'a>(
    order: &Schema,
    rel: &'a Relation,
    op: &'static str,
) -> Result<Cow<'a, Tuples>, SchemaError> {
    let perm = order.permutation(&rel.schema, op)?;
    Ok(if is_identity(&perm) {
        Cow::Borrowed(&*rel.tuples)
    } else {
        Cow::Owned(
            rel.iter()
                .map(|t| perm.iter().map(|p| t[*p]).collect::<Tuple>())
                .collect(),
        )
    })
}

fn index<'a>(rel: &'a Relation, key: &[usize]) -> FxHashMap<Tuple, Vec<&'a [u32]>> {
    let mut index: FxHashMap<Tuple, Vec<&'a [u32]>> = FxHashMap::default();
    for t in rel.iter() {
        let k: Tuple = key.iter().map(|i| t[*i]).collect();
        index.entry(k).or_default().push(t);
    }
    index
}

/// Equal attribute sets and equal tuples after alignment.
impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        if self.shares_storage(other) && self.schema == other.schema {
            return true;
        }
        match aligned_set(&self.schema, other, "eq") {
            Ok(o) => self.len() == o.len() && self.tuples.iter().all(|t| o.contains(t)),
            Err(_) => false,
        }
    }
}

impl Eq for Relation {}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.schema)?;
        for t in self.sorted() {
            write!(f, "\n  {t:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Domain, BASE_CTX, BASE_OBJ, DST, DST_CTX, FIELD, OBJ, OBJ_CTX, SRC, SRC_CTX, VAR, VAR_CTX,
    };

    fn rel(attrs: &[Attr], tuples: &[&[u32]]) -> Relation {
        Relation::from_tuples(Schema::new(attrs.iter().copied()).unwrap(), tuples).unwrap()
    }

    #[test]
    fn set_operations_align_by_attribute() {
        let a = rel(&[VAR, OBJ], &[&[1, 10], &[2, 20]]);
        let b = rel(&[OBJ, VAR], &[&[20, 2], &[30, 3]]);
        let u = a.union(&b).unwrap();
        assert_eq!(u.schema(), a.schema());
        assert_eq!(3, u.len());
        assert!(u.contains(&[3, 30]));
        assert_eq!(rel(&[VAR, OBJ], &[&[1, 10]]), a.difference(&b).unwrap());
        assert_eq!(rel(&[OBJ, VAR], &[&[20, 2]]), a.intersect(&b).unwrap());
        assert!(a.intersect(&rel(&[VAR, OBJ], &[])).unwrap().is_empty());
    }

    #[test]
    fn union_is_commutative_and_idempotent() {
        let a = rel(&[VAR, OBJ], &[&[1, 10]]);
        let b = rel(&[OBJ, VAR], &[&[20, 2]]);
        assert_eq!(a.union(&b).unwrap(), b.union(&a).unwrap());
        assert_eq!(a, a.union(&a).unwrap());
    }

    #[test]
    fn set_operations_reject_different_attributes() {
        let a = rel(&[VAR, OBJ], &[]);
        let b = rel(&[VAR, OBJ_CTX], &[]);
        assert!(matches!(
            a.union(&b),
            Err(SchemaError::Mismatch { op: "union", .. })
        ));
        assert!(matches!(
            a.difference(&b),
            Err(SchemaError::Mismatch { .. })
        ));
        assert!(matches!(a.intersect(&b), Err(SchemaError::Mismatch { .. })));
        assert!(matches!(
            a.union(&rel(&[VAR], &[])),
            Err(SchemaError::Mismatch { .. })
        ));
    }

    #[test]
    fn insert_checks_arity() {
        let mut a = rel(&[VAR, OBJ], &[]);
        assert!(a.insert(&[1, 2]).unwrap());
        assert!(!a.insert(&[1, 2]).unwrap());
        assert!(matches!(
            a.insert(&[1]),
            Err(SchemaError::Arity { found: 1, .. })
        ));
    }

    #[test]
    fn schema_rejects_duplicates() {
        assert!(matches!(
            Schema::new([VAR, OBJ, VAR]),
            Err(SchemaError::DuplicateAttribute { attr, .. }) if attr == VAR
        ));
    }

    #[test]
    fn join_eliminates() {
        // simple(src_ctx, src, dst_ctx, dst) . pt(src_ctx, src, obj_ctx, obj)
        let simple = rel(&[SRC_CTX, SRC, DST_CTX, DST], &[&[0, 1, 0, 2], &[0, 2, 0, 3]]);
        let pt = rel(&[SRC_CTX, SRC, OBJ_CTX, OBJ], &[&[0, 1, 5, 7], &[0, 1, 5, 8]]);
        let out = simple.join(&pt, &[SRC_CTX, SRC]).unwrap();
        assert_eq!(
            rel(&[DST_CTX, DST, OBJ_CTX, OBJ], &[&[0, 2, 5, 7], &[0, 2, 5, 8]]),
            out
        );
        assert_eq!(&[DST_CTX, DST, OBJ_CTX, OBJ], out.schema().attrs());
        // Either side may be indexed.
        assert_eq!(out, pt.join(&simple, &[SRC_CTX, SRC]).unwrap());
    }

    #[test]
    fn join_keeps_shared_columns_unless_eliminated() {
        let a = rel(&[VAR, OBJ], &[&[1, 10], &[2, 20]]);
        let b = rel(&[OBJ, FIELD], &[&[10, 3], &[10, 4]]);
        let out = a.join(&b, &[]).unwrap();
        assert_eq!(&[VAR, OBJ, FIELD], out.schema().attrs());
        assert_eq!(2, out.len());
        assert!(out.contains(&[1, 10, 4]));
        let out = a.join(&b, &[OBJ, FIELD]).unwrap();
        assert_eq!(rel(&[VAR], &[&[1]]), out);
    }

    #[test]
    fn semi_join_filters() {
        let pt = rel(&[VAR_CTX, VAR, OBJ_CTX, OBJ], &[&[0, 1, 0, 7], &[1, 1, 0, 7]]);
        let filter = rel(&[OBJ_CTX, VAR_CTX], &[&[0, 1]]);
        let out = pt.join(&filter, &[]).unwrap();
        assert_eq!(pt.schema(), out.schema());
        assert_eq!(rel(&[VAR_CTX, VAR, OBJ_CTX, OBJ], &[&[1, 1, 0, 7]]), out);
    }

    #[test]
    fn join_rejects_unrelated_schemas() {
        let a = rel(&[VAR, OBJ], &[&[1, 2]]);
        let b = rel(&[VAR_CTX, OBJ_CTX], &[&[1, 2]]);
        assert!(matches!(
            a.join(&b, &[]),
            Err(SchemaError::NoSharedAttributes { .. })
        ));
        assert!(matches!(
            a.join(&rel(&[OBJ], &[]), &[FIELD]),
            Err(SchemaError::MissingAttribute { attr, .. }) if attr == FIELD
        ));
    }

    #[test]
    fn rename_relabels() {
        let a = rel(&[VAR_CTX, VAR, OBJ_CTX, OBJ], &[&[0, 1, 2, 3]]);
        let b = a.rename(&[(VAR_CTX, SRC_CTX), (VAR, SRC)]).unwrap();
        assert_eq!(&[SRC_CTX, SRC, OBJ_CTX, OBJ], b.schema().attrs());
        assert!(b.contains(&[0, 1, 2, 3]));
        assert!(b.shares_storage(&a));
        // Swapping two columns of the same domain is fine.
        let c = a.rename(&[(VAR_CTX, OBJ_CTX), (OBJ_CTX, VAR_CTX)]).unwrap();
        assert!(c.tuples_in(a.schema()).unwrap().any(|t| *t == [2, 1, 0, 3]));
    }

    #[test]
    fn rename_rejects_collisions() {
        let a = rel(&[VAR_CTX, VAR, OBJ_CTX, OBJ], &[]);
        assert!(matches!(
            a.rename(&[(VAR_CTX, OBJ_CTX)]),
            Err(SchemaError::DuplicateAttribute { attr, .. }) if attr == OBJ_CTX
        ));
        assert!(matches!(
            a.rename(&[(VAR_CTX, BASE_CTX), (OBJ_CTX, BASE_CTX)]),
            Err(SchemaError::DuplicateAttribute { .. })
        ));
        assert!(matches!(
            a.rename(&[(SRC, DST)]),
            Err(SchemaError::MissingAttribute { attr, .. }) if attr == SRC
        ));
        assert!(matches!(
            a.rename(&[(OBJ, VAR)]),
            Err(SchemaError::DomainMismatch { .. })
        ));
        assert!(matches!(
            a.rename(&[(VAR, SRC), (VAR, DST)]),
            Err(SchemaError::DuplicateAttribute { .. })
        ));
    }

    #[test]
    fn project_and_product() {
        let a = rel(&[VAR, OBJ], &[&[1, 10], &[1, 20]]);
        assert_eq!(rel(&[VAR], &[&[1]]), a.project(&[OBJ]).unwrap());
        assert!(matches!(
            a.project(&[FIELD]),
            Err(SchemaError::MissingAttribute { .. })
        ));
        let ctxs = rel(&[VAR_CTX], &[&[0], &[1]]);
        let p = a.product(&ctxs).unwrap();
        assert_eq!(4, p.len());
        assert_eq!(&[VAR, OBJ, VAR_CTX], p.schema().attrs());
        assert!(matches!(
            a.product(&a),
            Err(SchemaError::Overlap { .. })
        ));
    }

    #[test]
    fn folds_leave_storage_alone_when_unchanged() {
        let mut a = rel(&[BASE_CTX, BASE_OBJ], &[&[0, 1]]);
        let snapshot = a.clone();
        assert!(!a.union_into(&rel(&[BASE_OBJ, BASE_CTX], &[&[1, 0]])).unwrap());
        assert!(!a.difference_into(&rel(&[BASE_CTX, BASE_OBJ], &[&[5, 5]])).unwrap());
        assert!(a.shares_storage(&snapshot));
        assert!(a.union_into(&rel(&[BASE_CTX, BASE_OBJ], &[&[2, 2]])).unwrap());
        assert!(!a.shares_storage(&snapshot));
        assert_eq!(1, snapshot.len());
        assert!(a.difference_into(&snapshot).unwrap());
        assert_eq!(rel(&[BASE_CTX, BASE_OBJ], &[&[2, 2]]), a);
    }

    #[test]
    fn universe_relation() {
        let mut u = Universe::new();
        u.register(Domain::Context, 2);
        let r = Relation::universe(VAR_CTX, &u);
        assert_eq!(3, r.len());
        assert!(r.contains(&[2]));
    }

    #[test]
    fn equality_needs_same_attributes() {
        let a = rel(&[VAR], &[]);
        let b = rel(&[OBJ], &[]);
        assert_ne!(a, b);
    }
}
