//! Interned strings.
//!
//! A [`SymbolTable`] hands out [`Symbol`]s: reference-counted string slices
//! that compare by identity. Interning the same text twice in one table
//! yields the same allocation, so equality is a pointer comparison.
//!
//! Two flavors exist. A case-folding table maps `Body` and `BODY` to the same
//! symbol (used for canonical tag and attribute names). A case-preserving
//! table keeps every spelling distinct (used to echo names back verbatim).

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::rc::Rc;

/// An interned string. Cheap to clone; equality is identity.
#[derive(Clone)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// The interned text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A symbol that belongs to no table.
    ///
    /// Used for names built from static keyword spellings. Two detached
    /// symbols are equal only if they are clones of each other.
    #[must_use]
    pub fn detached(text: &str) -> Self {
        Self(Rc::from(text))
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).cast::<u8>().hash(state);
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A per-parse string interner.
///
/// The table never shrinks until [`SymbolTable::clear`]. Symbols handed out
/// before a clear stay valid (they own their text) but are no longer equal
/// to symbols interned afterwards.
#[derive(Debug, Default)]
pub struct SymbolTable {
    case_fold: bool,
    symbols: HashSet<Rc<str>>,
    bytes: usize,
}

impl SymbolTable {
    /// A table in which `Body` and `body` intern to the same symbol.
    #[must_use]
    pub fn case_folded() -> Self {
        Self {
            case_fold: true,
            ..Self::default()
        }
    }

    /// A table that keeps every spelling distinct.
    #[must_use]
    pub fn case_preserving() -> Self {
        Self::default()
    }

    /// Intern `text`, returning the table's canonical symbol for it.
    ///
    /// For a case-folded table the symbol holds the ASCII-lowercased text.
    pub fn intern(&mut self, text: &str) -> Symbol {
        let folded;
        let key = if self.case_fold && text.bytes().any(|b| b.is_ascii_uppercase()) {
            folded = text.to_ascii_lowercase();
            folded.as_str()
        } else {
            text
        };
        if let Some(existing) = self.symbols.get(key) {
            return Symbol(Rc::clone(existing));
        }
        let symbol: Rc<str> = Rc::from(key);
        self.bytes += key.len();
        let _ = self.symbols.insert(Rc::clone(&symbol));
        Symbol(symbol)
    }

    /// Whether `text` (folded, for a case-folded table) has been interned.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        if self.case_fold {
            self.symbols.contains(text.to_ascii_lowercase().as_str())
        } else {
            self.symbols.contains(text)
        }
    }

    /// Number of distinct symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether no symbol has been interned since the last clear.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Total bytes of interned text.
    #[must_use]
    pub const fn bytes_allocated(&self) -> usize {
        self.bytes
    }

    /// Forget every symbol.
    pub fn clear(&mut self) {
        self.symbols.clear();
        self.bytes = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_identity() {
        let mut table = SymbolTable::case_preserving();
        let a = table.intern("href");
        let b = table.intern("href");
        let c = table.intern("HREF");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(table.len(), 2);
        assert_eq!(table.bytes_allocated(), 8);
    }

    #[test]
    fn test_case_folded_table() {
        let mut table = SymbolTable::case_folded();
        let a = table.intern("Body");
        let b = table.intern("BODY");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "body");
        assert!(table.contains("bOdY"));
    }

    #[test]
    fn test_clear_forgets_symbols() {
        let mut table = SymbolTable::case_preserving();
        let before = table.intern("x");
        table.clear();
        assert!(table.is_empty());
        let after = table.intern("x");
        assert_ne!(before, after);
        assert_eq!(&*before, "x");
    }
}
