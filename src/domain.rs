// SPDX-License-Identifier: BSD-3-Clause
//! Attribute domains, roles, and the typed values stored in relations.
//!
//! Every column of a [`crate::Relation`] is an [`Attr`]: a [`Domain`] (what
//! kind of value lives in the column) paired with a [`Role`] (which logical
//! position the column plays in a rule). Two columns with the same domain but
//! different roles are different columns, e.g. the context of a variable
//! ([`VAR_CTX`]) and the context of the object it points to ([`OBJ_CTX`]).

use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Domain {
    Variable,
    HeapObject,
    Field,
    Context,
}

impl Domain {
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Domain::Variable => 0,
            Domain::HeapObject => 1,
            Domain::Field => 2,
            Domain::Context => 3,
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Variable => write!(f, "var"),
            Domain::HeapObject => write!(f, "obj"),
            Domain::Field => write!(f, "fld"),
            Domain::Context => write!(f, "ctx"),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Role {
    Var,
    Obj,
    Src,
    Dst,
    Base,
    Field,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Var => write!(f, "var"),
            Role::Obj => write!(f, "obj"),
            Role::Src => write!(f, "src"),
            Role::Dst => write!(f, "dst"),
            Role::Base => write!(f, "base"),
            Role::Field => write!(f, "field"),
        }
    }
}

/// A relation column: a domain in a role.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Attr {
    pub domain: Domain,
    pub role: Role,
}

impl Attr {
    #[inline]
    pub const fn new(domain: Domain, role: Role) -> Self {
        Attr { domain, role }
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.domain, self.role)
    }
}

pub const VAR_CTX: Attr = Attr::new(Domain::Context, Role::Var);
pub const VAR: Attr = Attr::new(Domain::Variable, Role::Var);
pub const OBJ_CTX: Attr = Attr::new(Domain::Context, Role::Obj);
pub const OBJ: Attr = Attr::new(Domain::HeapObject, Role::Obj);
pub const SRC_CTX: Attr = Attr::new(Domain::Context, Role::Src);
pub const SRC: Attr = Attr::new(Domain::Variable, Role::Src);
pub const DST_CTX: Attr = Attr::new(Domain::Context, Role::Dst);
pub const DST: Attr = Attr::new(Domain::Variable, Role::Dst);
pub const BASE_CTX: Attr = Attr::new(Domain::Context, Role::Base);
/// The base *variable* of a load.
pub const BASE_VAR: Attr = Attr::new(Domain::Variable, Role::Base);
/// The base *object* of a field points-to fact.
pub const BASE_OBJ: Attr = Attr::new(Domain::HeapObject, Role::Base);
pub const FIELD: Attr = Attr::new(Domain::Field, Role::Field);

// ------------------------------------------------------------------
// Values

macro_rules! id {
    ($name:ident, $domain:expr, $prefix:literal) => {
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            Eq,
            Hash,
            Ord,
            PartialEq,
            PartialOrd,
            serde::Deserialize,
            serde::Serialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            pub const DOMAIN: Domain = $domain;

            #[inline]
            pub fn index(self) -> u32 {
                self.0
            }
        }

        impl From<u32> for $name {
            #[inline]
            fn from(i: u32) -> Self {
                $name(i)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

id!(Variable, Domain::Variable, "v");
id!(HeapObject, Domain::HeapObject, "o");
id!(Field, Domain::Field, "f");
id!(Context, Domain::Context, "c");

/// One `VarPointsTo` tuple.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct PointsTo {
    pub var_ctx: Context,
    pub var: Variable,
    pub obj_ctx: Context,
    pub obj: HeapObject,
}

impl fmt::Display for PointsTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} --> {}@{}",
            self.var, self.var_ctx, self.obj, self.obj_ctx
        )
    }
}

/// One `FieldPointsTo` tuple.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FieldPointsTo {
    pub base_ctx: Context,
    pub base: HeapObject,
    pub field: Field,
    pub obj_ctx: Context,
    pub obj: HeapObject,
}

impl fmt::Display for FieldPointsTo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}.{} --> {}@{}",
            self.base, self.base_ctx, self.field, self.obj, self.obj_ctx
        )
    }
}

// ------------------------------------------------------------------
// Universe

/// Number of known values in each domain.
///
/// Values are dense ids, so a domain's universe is `0..size`. The universe
/// only grows; it bounds the size of any relation over these domains.
/// Sizes are `u64` so that every `u32` id, `u32::MAX` included, fits below
/// its domain's size.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Universe {
    sizes: [u64; 4],
}

impl Universe {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn size(&self, domain: Domain) -> u64 {
        self.sizes[domain.index()]
    }

    /// Every value of `domain`, in increasing order.
    pub fn values(&self, domain: Domain) -> impl Iterator<Item = u32> {
        let size = self.size(domain);
        (0..=u32::MAX).take_while(move |v| u64::from(*v) < size)
    }

    /// Make sure `value` is part of the universe of `domain`.
    #[inline]
    pub fn register(&mut self, domain: Domain, value: u32) {
        let size = &mut self.sizes[domain.index()];
        let value = u64::from(value);
        if value >= *size {
            *size = value + 1;
        }
    }

    /// Number of distinct tuples a relation over `attrs` could hold.
    pub fn capacity<'a>(&self, attrs: impl IntoIterator<Item = &'a Attr>) -> u64 {
        attrs
            .into_iter()
            .fold(1u64, |acc, a| acc.saturating_mul(self.size(a.domain)))
    }
}
