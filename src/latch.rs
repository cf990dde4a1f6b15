//! Latch expressions: the conditions that gate a native implementation.
//!
//! A latch is written as comma-separated clauses, each a dot-separated marker
//! path (`navigator.camera.getPicture, platform.files`). It holds when every
//! clause holds; a clause holds when each marker along its path is present and
//! truthy. Evaluation is pure and never fails: a missing or falsy segment ends
//! the walk for that clause and the whole expression is unsatisfied.

use crate::environment::{Marker, MarkerPath};
use std::fmt;

const CLAUSE_SEPARATOR: char = ',';

/// Parsed latch expression.
///
/// Parsing happens once at registration; the original text is kept for
/// logging and probing.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LatchExpr {
    source: String,
    clauses: Vec<MarkerPath>,
}

impl LatchExpr {
    /// Parse an expression. Clauses that are empty after trimming are
    /// dropped, so an empty or all-whitespace source is vacuously satisfied.
    pub fn parse(source: &str) -> Self {
        let clauses = source
            .split(CLAUSE_SEPARATOR)
            .map(str::trim)
            .filter(|clause| !clause.is_empty())
            .map(MarkerPath::parse)
            .collect();
        Self {
            source: source.trim().to_string(),
            clauses,
        }
    }

    /// The latch with no clauses; always satisfied.
    pub fn always() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn clauses(&self) -> &[MarkerPath] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// AND of every clause against `root`, stopping at the first failure.
    pub fn is_satisfied(&self, root: &Marker) -> bool {
        self.clauses.iter().all(|clause| clause_holds(clause, root))
    }
}

impl From<&str> for LatchExpr {
    fn from(source: &str) -> Self {
        LatchExpr::parse(source)
    }
}

impl From<String> for LatchExpr {
    fn from(source: String) -> Self {
        LatchExpr::parse(&source)
    }
}

impl fmt::Display for LatchExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse `expression` and evaluate it against `root` in one step.
pub fn satisfied(expression: &str, root: &Marker) -> bool {
    LatchExpr::parse(expression).is_satisfied(root)
}

fn clause_holds(clause: &MarkerPath, root: &Marker) -> bool {
    let mut current = root;
    for segment in clause.segments() {
        if segment.is_empty() {
            return false;
        }
        match current.child(segment) {
            Some(next) if next.is_truthy() => current = next,
            _ => return false,
        }
    }
    true
}
