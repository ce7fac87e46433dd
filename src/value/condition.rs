//! Condition objects for the exception system.
//!
//! A condition describes an exceptional situation and is dispatched on by
//! type. Types form a lattice rooted at `condition`; a type may have several
//! parents (`io-read-error` is both an `io-error` and a `read-error`). The
//! base lattice is fixed; hosts may extend it through
//! [`ConditionTypes::define_subtype`]. Conditions are immutable after
//! construction.
//!
//! Every base type carries a stable tag symbol (`arith/div-by-zero`,
//! `number/parse`, `io/system`, ...) that survives renames of the type
//! itself; dispatchers and tests match on the tag.

use crate::value::Value;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::fmt;
use std::rc::Rc;

/// Identity of a condition type in the lattice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

pub const CONDITION: TypeId = TypeId(0);
pub const SERIOUS: TypeId = TypeId(1);
pub const ERROR: TypeId = TypeId(2);
pub const MESSAGE: TypeId = TypeId(3);
pub const IO_ERROR: TypeId = TypeId(4);
pub const READ_ERROR: TypeId = TypeId(5);
pub const PORT_ERROR: TypeId = TypeId(6);
pub const IO_READ_ERROR: TypeId = TypeId(7);
pub const SYSTEM_ERROR: TypeId = TypeId(8);
pub const ARITHMETIC_ERROR: TypeId = TypeId(9);
pub const DIV_BY_ZERO: TypeId = TypeId(10);
pub const OVERFLOW: TypeId = TypeId(11);
pub const DOMAIN: TypeId = TypeId(12);
pub const NUMBER_PARSE: TypeId = TypeId(13);
pub const IMPL_LIMIT: TypeId = TypeId(14);

/// Stable condition tags (see the external-interface contract).
pub mod tags {
    pub const IO_READ: &str = "io/read";
    pub const IO_PORT: &str = "io/port";
    pub const IO_SYSTEM: &str = "io/system";
    pub const ARITH_DIV_BY_ZERO: &str = "arith/div-by-zero";
    pub const ARITH_OVERFLOW: &str = "arith/overflow";
    pub const ARITH_DOMAIN: &str = "arith/domain";
    pub const NUMBER_PARSE: &str = "number/parse";
    pub const NUMBER_IMPL_LIMIT: &str = "number/impl-limit";
}

/// Base lattice: (name, parents, tag)
const BASE_TYPES: &[(&str, &[TypeId], &str)] = &[
    ("condition", &[], "condition"),
    ("serious", &[CONDITION], "serious"),
    ("error", &[SERIOUS, MESSAGE], "error"),
    ("message", &[CONDITION], "message"),
    ("io-error", &[ERROR], "io"),
    ("read-error", &[ERROR], tags::IO_READ),
    ("port-error", &[IO_ERROR], tags::IO_PORT),
    ("io-read-error", &[IO_ERROR, READ_ERROR], tags::IO_READ),
    ("system-error", &[IO_ERROR], tags::IO_SYSTEM),
    ("arithmetic-error", &[ERROR], "arith"),
    ("div-by-zero-error", &[ARITHMETIC_ERROR], tags::ARITH_DIV_BY_ZERO),
    ("overflow-error", &[ARITHMETIC_ERROR], tags::ARITH_OVERFLOW),
    ("domain-error", &[ARITHMETIC_ERROR], tags::ARITH_DOMAIN),
    ("number-parse-error", &[ERROR], tags::NUMBER_PARSE),
    ("impl-limit-error", &[ERROR], tags::NUMBER_IMPL_LIMIT),
];

struct TypeEntry {
    name: Rc<str>,
    parents: SmallVec<[TypeId; 2]>,
    tag: Rc<str>,
}

/// Per-VM registry of condition types. Seeded with the base lattice;
/// read-mostly after startup.
pub struct ConditionTypes {
    entries: Vec<TypeEntry>,
    by_name: FxHashMap<Rc<str>, TypeId>,
}

impl ConditionTypes {
    pub fn bootstrap() -> Self {
        let mut reg = ConditionTypes {
            entries: Vec::with_capacity(BASE_TYPES.len()),
            by_name: FxHashMap::default(),
        };
        for (name, parents, tag) in BASE_TYPES {
            let id = TypeId(reg.entries.len() as u32);
            let name: Rc<str> = Rc::from(*name);
            reg.entries.push(TypeEntry {
                name: name.clone(),
                parents: SmallVec::from_slice(parents),
                tag: Rc::from(*tag),
            });
            reg.by_name.insert(name, id);
        }
        reg
    }

    /// Register a user condition type under one or more parents.
    pub fn define_subtype(&mut self, name: &str, parents: &[TypeId]) -> TypeId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = TypeId(self.entries.len() as u32);
        let name: Rc<str> = Rc::from(name);
        self.entries.push(TypeEntry {
            name: name.clone(),
            parents: SmallVec::from_slice(parents),
            tag: name.clone(),
        });
        self.by_name.insert(name, id);
        id
    }

    pub fn name(&self, id: TypeId) -> Option<&str> {
        self.entries.get(id.0 as usize).map(|e| e.name.as_ref())
    }

    pub fn tag(&self, id: TypeId) -> Option<&str> {
        self.entries.get(id.0 as usize).map(|e| e.tag.as_ref())
    }

    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// True when `child` is `parent` or reaches it through any parent chain.
    pub fn is_subtype(&self, child: TypeId, parent: TypeId) -> bool {
        if child == parent {
            return true;
        }
        let Some(entry) = self.entries.get(child.0 as usize) else {
            return false;
        };
        entry.parents.iter().any(|&p| self.is_subtype(p, parent))
    }
}

/// A simple condition: one type, a message, optional irritants, and the
/// errno slot for system errors.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCondition {
    pub ctype: TypeId,
    pub tag: Rc<str>,
    pub message: String,
    pub irritants: Vec<Value>,
    pub errno: Option<i32>,
}

/// A condition value: simple, or a compound set of simple conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Simple(Rc<SimpleCondition>),
    Compound(Vec<Rc<SimpleCondition>>),
}

impl Condition {
    fn simple(ctype: TypeId, tag: &str, message: impl Into<String>) -> Condition {
        Condition::Simple(Rc::new(SimpleCondition {
            ctype,
            tag: Rc::from(tag),
            message: message.into(),
            irritants: Vec::new(),
            errno: None,
        }))
    }

    // Named constructors

    pub fn error(msg: impl Into<String>) -> Condition {
        Condition::simple(ERROR, "error", msg)
    }

    pub fn div_by_zero(msg: impl Into<String>) -> Condition {
        Condition::simple(DIV_BY_ZERO, tags::ARITH_DIV_BY_ZERO, msg)
    }

    pub fn overflow(msg: impl Into<String>) -> Condition {
        Condition::simple(OVERFLOW, tags::ARITH_OVERFLOW, msg)
    }

    pub fn domain(msg: impl Into<String>) -> Condition {
        Condition::simple(DOMAIN, tags::ARITH_DOMAIN, msg)
    }

    pub fn number_parse(msg: impl Into<String>) -> Condition {
        Condition::simple(NUMBER_PARSE, tags::NUMBER_PARSE, msg)
    }

    pub fn impl_limit(msg: impl Into<String>) -> Condition {
        Condition::simple(IMPL_LIMIT, tags::NUMBER_IMPL_LIMIT, msg)
    }

    pub fn io_read(msg: impl Into<String>) -> Condition {
        Condition::simple(IO_READ_ERROR, tags::IO_READ, msg)
    }

    pub fn io_port(msg: impl Into<String>) -> Condition {
        Condition::simple(PORT_ERROR, tags::IO_PORT, msg)
    }

    pub fn system_error(msg: impl Into<String>, errno: i32) -> Condition {
        Condition::Simple(Rc::new(SimpleCondition {
            ctype: SYSTEM_ERROR,
            tag: Rc::from(tags::IO_SYSTEM),
            message: msg.into(),
            irritants: Vec::new(),
            errno: Some(errno),
        }))
    }

    /// Construct for a user-defined type registered in a `ConditionTypes`.
    pub fn of_type(ctype: TypeId, tag: &str, msg: impl Into<String>) -> Condition {
        Condition::simple(ctype, tag, msg)
    }

    /// Attach an irritant value (builder pattern).
    pub fn with_irritant(self, v: Value) -> Condition {
        match self {
            Condition::Simple(c) => {
                let mut c = (*c).clone();
                c.irritants.push(v);
                Condition::Simple(Rc::new(c))
            }
            compound => compound,
        }
    }

    /// Combine conditions into a compound, flattening nested compounds.
    pub fn make_compound(parts: Vec<Condition>) -> Condition {
        let mut members: Vec<Rc<SimpleCondition>> = Vec::new();
        for p in parts {
            match p {
                Condition::Simple(c) => members.push(c),
                Condition::Compound(cs) => members.extend(cs),
            }
        }
        match members.len() {
            0 => Condition::error("empty compound condition"),
            1 => Condition::Simple(members.pop().expect("length checked")),
            _ => Condition::Compound(members),
        }
    }

    fn members(&self) -> &[Rc<SimpleCondition>] {
        match self {
            Condition::Simple(c) => std::slice::from_ref(c),
            Condition::Compound(cs) => cs,
        }
    }

    /// True iff any member is a subtype of `ty`.
    pub fn has_type(&self, ty: TypeId, types: &ConditionTypes) -> bool {
        self.members().iter().any(|c| types.is_subtype(c.ctype, ty))
    }

    /// First member that is a subtype of `ty`.
    pub fn extract(&self, ty: TypeId, types: &ConditionTypes) -> Option<Rc<SimpleCondition>> {
        self.members()
            .iter()
            .find(|c| types.is_subtype(c.ctype, ty))
            .cloned()
    }

    /// Stable tag of the first member.
    pub fn tag(&self) -> &str {
        &self.members()[0].tag
    }

    pub fn message(&self) -> &str {
        &self.members()[0].message
    }

    pub fn errno(&self) -> Option<i32> {
        self.members().iter().find_map(|c| c.errno)
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = &self.members()[0];
        write!(f, "{}: {}", first.tag, first.message)?;
        if let Some(e) = first.errno {
            write!(f, " (errno {})", e)?;
        }
        Ok(())
    }
}
