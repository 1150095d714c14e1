use serde::{Deserialize, Serialize};
use std::fmt;

/// Package-size unit of a purchased item.
///
/// The OCR parser only ever produces `G` and `Pcs`; `Ml` is part of the
/// serialized format because downstream pantry logic consumes all three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    G,
    Ml,
    Pcs,
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::G => write!(f, "g"),
            Unit::Ml => write!(f, "ml"),
            Unit::Pcs => write!(f, "pcs"),
        }
    }
}

impl std::str::FromStr for Unit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "g" => Ok(Unit::G),
            "ml" => Ok(Unit::Ml),
            "pcs" => Ok(Unit::Pcs),
            other => Err(format!("Unknown unit: '{other}'")),
        }
    }
}

/// One purchase line-item recovered from a receipt.
///
/// Invariants (enforced by the assembler, never re-checked downstream):
/// `name` is non-empty and trimmed with no residual quantity substring,
/// `unit_value > 0`, `count >= 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedItem {
    pub name: String,
    /// How many of this item were ordered (from an `x N` suffix).
    pub count: f64,
    /// Package size in `unit` — e.g. 500.0 for a 500 g pack.
    pub unit_value: f64,
    pub unit: Unit,
}

impl ExtractedItem {
    pub fn new(name: impl Into<String>, count: f64, unit_value: f64, unit: Unit) -> Self {
        Self { name: name.into(), count, unit_value, unit }
    }
}
