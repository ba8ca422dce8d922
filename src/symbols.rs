//! Symbol table: the fixed set of reel symbols and their payout multipliers.

use once_cell::sync::Lazy;

use crate::error::{SlotError, SlotResult};

pub type SymbolId = u8;

/// Reference rule set, indexed by symbol id.
const MULTIPLIERS: [f64; 5] = [0.25, 0.55, 1.0, 3.0, 5.0];

static SYMBOL_TABLE: Lazy<SymbolTable> = Lazy::new(|| SymbolTable {
    symbols: MULTIPLIERS
        .iter()
        .enumerate()
        .map(|(id, &multiplier)| Symbol {
            id: id as SymbolId,
            multiplier,
        })
        .collect(),
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Symbol {
    pub id: SymbolId,
    pub multiplier: f64,
}

#[derive(Debug)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn get(&self, id: SymbolId) -> SlotResult<Symbol> {
        self.symbols
            .iter()
            .find(|s| s.id == id)
            .copied()
            .ok_or(SlotError::UnknownSymbol(id))
    }

    pub fn contains(&self, id: SymbolId) -> bool {
        self.symbols.iter().any(|s| s.id == id)
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.symbols.iter().map(|s| s.id)
    }
}

/// Process-wide symbol table, built on first use.
pub fn symbol_table() -> &'static SymbolTable {
    &SYMBOL_TABLE
}

pub fn multiplier_of(id: SymbolId) -> SlotResult<f64> {
    symbol_table().get(id).map(|s| s.multiplier)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
