// SPDX-License-Identifier: BSD-3-Clause
//! Pointer assignment graph
//!
//! The PAG is the engine's input: allocation, simple, store and load edges.
//! Edges are only ever appended; the engine reads them through `&Pag` and
//! never modifies them. Allocation edges are also kept in arrival order so
//! that an [`AllocReader`] can hand out exactly the allocations that arrived
//! since it last read.

use crate::domain::{Context, Domain, Field, HeapObject, Universe, Variable};
use crate::relation::{Relation, Schema, SchemaError};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum EdgeKind {
    Alloc,
    Simple,
    Store,
    Load,
}

impl EdgeKind {
    pub fn schema(self) -> Schema {
        match self {
            EdgeKind::Alloc => Schema::alloc(),
            EdgeKind::Simple => Schema::simple(),
            EdgeKind::Store => Schema::store(),
            EdgeKind::Load => Schema::load(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Pag {
    universe: Universe,
    alloc: Relation,
    alloc_log: Vec<[u32; 4]>,
    simple: Relation,
    store: Relation,
    load: Relation,
    types: Option<Relation>,
}

impl Default for Pag {
    fn default() -> Self {
        Self::new()
    }
}

impl Pag {
    pub fn new() -> Self {
        Pag {
            universe: Universe::new(),
            alloc: Relation::empty(Schema::alloc()),
            alloc_log: Vec::new(),
            simple: Relation::empty(Schema::simple()),
            store: Relation::empty(Schema::store()),
            load: Relation::empty(Schema::load()),
            types: None,
        }
    }

    #[inline]
    pub fn universe(&self) -> &Universe {
        &self.universe
    }

    /// Every allocation edge seen so far.
    #[inline]
    pub fn alloc(&self) -> &Relation {
        &self.alloc
    }

    #[inline]
    pub fn simple(&self) -> &Relation {
        &self.simple
    }

    #[inline]
    pub fn store(&self) -> &Relation {
        &self.store
    }

    #[inline]
    pub fn load(&self) -> &Relation {
        &self.load
    }

    /// Declared-type compatibility of variables and objects, if the host
    /// supplied any. Without it every object may flow into every variable.
    #[inline]
    pub fn types(&self) -> Option<&Relation> {
        self.types.as_ref()
    }

    /// `var = new obj`, in contexts `var_ctx` and `obj_ctx`.
    pub fn add_alloc(
        &mut self,
        obj_ctx: Context,
        obj: HeapObject,
        var_ctx: Context,
        var: Variable,
    ) -> bool {
        self.register_ctx(obj_ctx);
        self.register_ctx(var_ctx);
        self.universe.register(Domain::HeapObject, obj.0);
        self.universe.register(Domain::Variable, var.0);
        let tuple = [obj_ctx.0, obj.0, var_ctx.0, var.0];
        let added = self.alloc.push(&tuple);
        if added {
            self.alloc_log.push(tuple);
        }
        added
    }

    /// `dst = src`
    pub fn add_simple(
        &mut self,
        src_ctx: Context,
        src: Variable,
        dst_ctx: Context,
        dst: Variable,
    ) -> bool {
        self.register_ctx(src_ctx);
        self.register_ctx(dst_ctx);
        self.universe.register(Domain::Variable, src.0);
        self.universe.register(Domain::Variable, dst.0);
        self.simple.push(&[src_ctx.0, src.0, dst_ctx.0, dst.0])
    }

    /// `dst.field = src`
    pub fn add_store(
        &mut self,
        src_ctx: Context,
        src: Variable,
        dst_ctx: Context,
        dst: Variable,
        field: Field,
    ) -> bool {
        self.register_ctx(src_ctx);
        self.register_ctx(dst_ctx);
        self.universe.register(Domain::Variable, src.0);
        self.universe.register(Domain::Variable, dst.0);
        self.universe.register(Domain::Field, field.0);
        self.store
            .push(&[src_ctx.0, src.0, dst_ctx.0, dst.0, field.0])
    }

    /// `dst = base.field`
    pub fn add_load(
        &mut self,
        base_ctx: Context,
        base: Variable,
        field: Field,
        dst_ctx: Context,
        dst: Variable,
    ) -> bool {
        self.register_ctx(base_ctx);
        self.register_ctx(dst_ctx);
        self.universe.register(Domain::Variable, base.0);
        self.universe.register(Domain::Variable, dst.0);
        self.universe.register(Domain::Field, field.0);
        self.load
            .push(&[base_ctx.0, base.0, field.0, dst_ctx.0, dst.0])
    }

    /// Objects allocated as `obj` may be held by `var`. Once any type fact is
    /// added, only listed pairs pass the filter.
    pub fn add_type(&mut self, var: Variable, obj: HeapObject) -> bool {
        self.universe.register(Domain::Variable, var.0);
        self.universe.register(Domain::HeapObject, obj.0);
        self.types
            .get_or_insert_with(|| Relation::empty(Schema::type_filter()))
            .push(&[var.0, obj.0])
    }

    /// Append a whole relation of edges. Its attributes must be those of
    /// `kind`'s schema, in any order.
    pub fn extend(&mut self, kind: EdgeKind, edges: &Relation) -> Result<usize, SchemaError> {
        let schema = kind.schema();
        let mut added = 0;
        for t in edges.tuples_in(&schema)? {
            let fresh = match kind {
                EdgeKind::Alloc => self.add_alloc(
                    Context(t[0]),
                    HeapObject(t[1]),
                    Context(t[2]),
                    Variable(t[3]),
                ),
                EdgeKind::Simple => {
                    self.add_simple(Context(t[0]), Variable(t[1]), Context(t[2]), Variable(t[3]))
                }
                EdgeKind::Store => self.add_store(
                    Context(t[0]),
                    Variable(t[1]),
                    Context(t[2]),
                    Variable(t[3]),
                    Field(t[4]),
                ),
                EdgeKind::Load => self.add_load(
                    Context(t[0]),
                    Variable(t[1]),
                    Field(t[2]),
                    Context(t[3]),
                    Variable(t[4]),
                ),
            };
            if fresh {
                added += 1;
            }
        }
        Ok(added)
    }

    /// Make a context known without adding an edge, e.g. one only mentioned
    /// by the context-transition relation.
    #[inline]
    pub fn register_ctx(&mut self, ctx: Context) {
        self.universe.register(Domain::Context, ctx.0);
    }
}

/// Cursor over a [`Pag`]'s allocation edges.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct AllocReader {
    next: usize,
}

impl AllocReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocation edges appended since the previous read.
    pub fn read(&mut self, pag: &Pag) -> Relation {
        let mut fresh = Relation::empty(Schema::alloc());
        for t in pag.alloc_log.get(self.next..).unwrap_or_default() {
            fresh.push(t);
        }
        self.next = pag.alloc_log.len();
        fresh
    }

    /// Whether [`AllocReader::read`] would return anything.
    #[inline]
    pub fn has_pending(&self, pag: &Pag) -> bool {
        self.next < pag.alloc_log.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_sees_each_alloc_once() {
        let mut pag = Pag::new();
        let mut reader = AllocReader::new();
        assert!(reader.read(&pag).is_empty());
        assert!(pag.add_alloc(Context(0), HeapObject(0), Context(0), Variable(0)));
        assert!(!pag.add_alloc(Context(0), HeapObject(0), Context(0), Variable(0)));
        assert!(reader.has_pending(&pag));
        assert_eq!(1, reader.read(&pag).len());
        assert!(!reader.has_pending(&pag));
        assert!(reader.read(&pag).is_empty());
        pag.add_alloc(Context(1), HeapObject(1), Context(0), Variable(2));
        let fresh = reader.read(&pag);
        assert_eq!(1, fresh.len());
        assert!(fresh.contains(&[1, 1, 0, 2]));
        assert_eq!(2, pag.alloc().len());
    }

    #[test]
    fn edges_grow_the_universe() {
        let mut pag = Pag::new();
        pag.add_load(Context(2), Variable(1), Field(4), Context(0), Variable(7));
        assert_eq!(3, pag.universe().size(Domain::Context));
        assert_eq!(8, pag.universe().size(Domain::Variable));
        assert_eq!(5, pag.universe().size(Domain::Field));
        assert_eq!(0, pag.universe().size(Domain::HeapObject));
        assert!(pag.types().is_none());
    }

    #[test]
    fn extend_aligns_columns() {
        use crate::domain::{DST, DST_CTX, SRC, SRC_CTX};
        let edges = Relation::from_tuples(
            Schema::new([DST, DST_CTX, SRC, SRC_CTX]).unwrap(),
            [[2u32, 0, 1, 0]],
        )
        .unwrap();
        let mut pag = Pag::new();
        assert_eq!(1, pag.extend(EdgeKind::Simple, &edges).unwrap());
        assert!(pag.simple().contains(&[0, 1, 0, 2]));
        assert!(pag.extend(EdgeKind::Load, &edges).is_err());
    }
}
