// SPDX-License-Identifier: BSD-3-Clause
//! Facts files
//!
//! A facts file is JSON: either one batch or an array of batches. Each batch
//! lists edges by name; names are interned per domain in order of first
//! appearance. Contexts default to the empty name, so context-insensitive
//! inputs can leave them out entirely. Unknown keys are errors.
//!
//! ```json
//! [
//!   { "alloc": [{ "var": "p", "obj": "new A" }],
//!     "simple": [{ "src": "p", "dst": "q" }] },
//!   { "store": [{ "src": "p", "dst": "q", "field": "next" }],
//!     "load": [{ "base": "q", "field": "next", "dst": "r" }] }
//! ]
//! ```

use rustc_hash::FxHashMap;

use crate::analysis::{
    filter::ContextFilter,
    propagate::{self, Options},
    state::PointsToState,
    Error,
};
use crate::domain::{Context, Domain, Field, FieldPointsTo, HeapObject, PointsTo, Variable};
use crate::pag::Pag;
use crate::queue::PointsToQueue;
use crate::relation::{Relation, Schema};

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct AllocFact {
    pub var: String,
    pub obj: String,
    #[serde(default)]
    pub var_ctx: String,
    #[serde(default)]
    pub obj_ctx: String,
}

/// `dst = src`
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SimpleFact {
    pub src: String,
    pub dst: String,
    #[serde(default)]
    pub src_ctx: String,
    #[serde(default)]
    pub dst_ctx: String,
}

/// `dst.field = src`
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct StoreFact {
    pub src: String,
    pub dst: String,
    pub field: String,
    #[serde(default)]
    pub src_ctx: String,
    #[serde(default)]
    pub dst_ctx: String,
}

/// `dst = base.field`
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct LoadFact {
    pub base: String,
    pub field: String,
    pub dst: String,
    #[serde(default)]
    pub base_ctx: String,
    #[serde(default)]
    pub dst_ctx: String,
}

/// A variable context may hold objects from an object context.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TransitionFact {
    #[serde(default)]
    pub var_ctx: String,
    #[serde(default)]
    pub obj_ctx: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TypeFact {
    pub var: String,
    pub obj: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Batch {
    #[serde(default)]
    pub alloc: Vec<AllocFact>,
    #[serde(default)]
    pub simple: Vec<SimpleFact>,
    #[serde(default)]
    pub store: Vec<StoreFact>,
    #[serde(default)]
    pub load: Vec<LoadFact>,
    #[serde(default)]
    pub transitions: Vec<TransitionFact>,
    #[serde(default)]
    pub types: Vec<TypeFact>,
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(untagged)]
pub enum Facts {
    Batches(Vec<Batch>),
    Batch(Batch),
}

impl Facts {
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    pub fn batches(&self) -> &[Batch] {
        match self {
            Facts::Batches(bs) => bs,
            Facts::Batch(b) => std::slice::from_ref(b),
        }
    }
}

// ------------------------------------------------------------------
// Symbols

/// Per-domain name interning.
#[derive(Clone, Debug, Default)]
pub struct Symbols {
    ids: [FxHashMap<String, u32>; 4],
    names: [Vec<String>; 4],
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, domain: Domain, name: &str) -> u32 {
        let i = domain.index();
        if let Some(id) = self.ids[i].get(name) {
            return *id;
        }
        let id = u32::try_from(self.names[i].len()).unwrap_or(u32::MAX);
        self.ids[i].insert(name.to_string(), id);
        self.names[i].push(name.to_string());
        id
    }

    pub fn lookup(&self, domain: Domain, name: &str) -> Option<u32> {
        self.ids[domain.index()].get(name).copied()
    }

    pub fn name(&self, domain: Domain, id: u32) -> Option<&str> {
        self.names[domain.index()]
            .get(id as usize)
            .map(String::as_str)
    }

    pub fn len(&self, domain: Domain) -> usize {
        self.names[domain.index()].len()
    }

    pub fn var(&mut self, name: &str) -> Variable {
        Variable(self.intern(Domain::Variable, name))
    }

    pub fn obj(&mut self, name: &str) -> HeapObject {
        HeapObject(self.intern(Domain::HeapObject, name))
    }

    pub fn field(&mut self, name: &str) -> Field {
        Field(self.intern(Domain::Field, name))
    }

    pub fn ctx(&mut self, name: &str) -> Context {
        Context(self.intern(Domain::Context, name))
    }

    fn show(&self, domain: Domain, id: u32, ctx: Context) -> String {
        let name = self.name(domain, id).unwrap_or("?");
        match self.name(Domain::Context, ctx.0) {
            None | Some("") => name.to_string(),
            Some(c) => format!("{name}@{c}"),
        }
    }

    pub fn show_points_to(&self, pt: &PointsTo) -> String {
        format!(
            "{} --> {}",
            self.show(Domain::Variable, pt.var.0, pt.var_ctx),
            self.show(Domain::HeapObject, pt.obj.0, pt.obj_ctx)
        )
    }

    pub fn show_field_points_to(&self, fpt: &FieldPointsTo) -> String {
        format!(
            "{}.{} --> {}",
            self.show(Domain::HeapObject, fpt.base.0, fpt.base_ctx),
            self.name(Domain::Field, fpt.field.0).unwrap_or("?"),
            self.show(Domain::HeapObject, fpt.obj.0, fpt.obj_ctx)
        )
    }
}

// ------------------------------------------------------------------
// Loading and running

/// Everything a run over a facts file produces.
#[derive(Clone, Debug)]
pub struct Analysis {
    pub symbols: Symbols,
    pub pag: Pag,
    pub state: PointsToState,
    pub queue: PointsToQueue,
    transitions: Relation,
    sensitive: bool,
    /// Steps taken, over all batches.
    pub steps: usize,
}

impl Default for Analysis {
    fn default() -> Self {
        Self::new()
    }
}

impl Analysis {
    pub fn new() -> Self {
        Analysis {
            symbols: Symbols::new(),
            pag: Pag::new(),
            state: PointsToState::new(),
            queue: PointsToQueue::new(),
            transitions: Relation::empty(Schema::context_filter()),
            sensitive: false,
            steps: 0,
        }
    }

    /// The context transitions in effect: those supplied so far, or every
    /// pair of known contexts if none were.
    ///
    /// Once transitions are supplied they keep every pair the earlier,
    /// insensitive steps ran under, so the relation never shrinks.
    pub fn transitions(&self) -> Relation {
        if self.sensitive {
            self.transitions.clone()
        } else {
            ContextFilter::insensitive(self.pag.universe())
        }
    }

    /// Add a batch's edges to the PAG without propagating.
    pub fn load(&mut self, batch: &Batch) {
        let s = &mut self.symbols;
        let pag = &mut self.pag;
        for f in &batch.alloc {
            pag.add_alloc(s.ctx(&f.obj_ctx), s.obj(&f.obj), s.ctx(&f.var_ctx), s.var(&f.var));
        }
        for f in &batch.simple {
            pag.add_simple(s.ctx(&f.src_ctx), s.var(&f.src), s.ctx(&f.dst_ctx), s.var(&f.dst));
        }
        for f in &batch.store {
            pag.add_store(
                s.ctx(&f.src_ctx),
                s.var(&f.src),
                s.ctx(&f.dst_ctx),
                s.var(&f.dst),
                s.field(&f.field),
            );
        }
        for f in &batch.load {
            pag.add_load(
                s.ctx(&f.base_ctx),
                s.var(&f.base),
                s.field(&f.field),
                s.ctx(&f.dst_ctx),
                s.var(&f.dst),
            );
        }
        for f in &batch.types {
            pag.add_type(s.var(&f.var), s.obj(&f.obj));
        }
        if !self.sensitive && !batch.transitions.is_empty() {
            self.transitions = self.state.context_filter().clone();
            self.sensitive = true;
        }
        for f in &batch.transitions {
            let var_ctx = s.ctx(&f.var_ctx);
            let obj_ctx = s.ctx(&f.obj_ctx);
            pag.register_ctx(var_ctx);
            pag.register_ctx(obj_ctx);
            self.transitions.push(&[var_ctx.0, obj_ctx.0]);
        }
    }

    /// Load a batch and propagate to a fixpoint.
    pub fn run_batch(&mut self, batch: &Batch, opts: &Options) -> Result<usize, Error> {
        self.load(batch);
        let transitions = self.transitions();
        let steps = propagate::run(
            &mut self.state,
            &self.pag,
            &transitions,
            &mut self.queue,
            opts,
        )?;
        self.steps += steps;
        Ok(steps)
    }
}

/// Run every batch of `facts` in order, each to a fixpoint.
pub fn analyze(facts: &Facts, opts: &Options) -> Result<Analysis, Error> {
    let mut analysis = Analysis::new();
    for batch in facts.batches() {
        analysis.run_batch(batch, opts)?;
    }
    Ok(analysis)
}
