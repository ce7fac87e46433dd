//! Scheme symbols.
//!
//! Two occurrences of one spelling intern to the same dense id, so symbol
//! identity is an integer compare. Fresh symbols (the gensym primitive)
//! also live in the table but no spelling maps back to them: they answer
//! to a printed name yet are eq only to themselves. The table is owned by
//! the VM context and is append-only; an entry, once made, never changes.

use crate::value::SymbolId;
use rustc_hash::FxHashMap;
use std::rc::Rc;

struct Entry {
    spelling: Rc<str>,
    interned: bool,
}

pub struct SymbolTable {
    entries: Vec<Entry>,
    by_spelling: FxHashMap<Rc<str>, SymbolId>,
    fresh_serial: u32,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            entries: Vec::new(),
            by_spelling: FxHashMap::default(),
            fresh_serial: 0,
        }
    }

    fn push(&mut self, spelling: Rc<str>, interned: bool) -> SymbolId {
        let id = SymbolId(self.entries.len() as u32);
        self.entries.push(Entry { spelling, interned });
        id
    }

    /// Map a spelling to its symbol, creating the entry on first sight.
    pub fn intern(&mut self, spelling: &str) -> SymbolId {
        if let Some(&id) = self.by_spelling.get(spelling) {
            return id;
        }
        let spelling: Rc<str> = Rc::from(spelling);
        let id = self.push(spelling.clone(), true);
        self.by_spelling.insert(spelling, id);
        id
    }

    /// Mint an uninterned symbol. The serial keeps printed names apart,
    /// but even a colliding spelling stays a distinct symbol.
    pub fn fresh(&mut self, prefix: &str) -> SymbolId {
        self.fresh_serial += 1;
        let spelling: Rc<str> = Rc::from(format!("{}%{}", prefix, self.fresh_serial));
        self.push(spelling, false)
    }

    /// Spelling of a symbol, interned or fresh.
    pub fn spelling(&self, id: SymbolId) -> Option<&str> {
        self.entries.get(id.0 as usize).map(|e| e.spelling.as_ref())
    }

    /// Find an already-interned spelling; fresh symbols are not findable.
    pub fn lookup(&self, spelling: &str) -> Option<SymbolId> {
        self.by_spelling.get(spelling).copied()
    }

    pub fn is_interned(&self, id: SymbolId) -> bool {
        self.entries
            .get(id.0 as usize)
            .map(|e| e.interned)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
