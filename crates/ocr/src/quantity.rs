//! Quantity/unit resolution from noisy OCR fragments.
//!
//! Package quantities come out of OCR with systematic character misreads
//! (`|`/`l` for `1`, `o` for `0`, `s` for `5` or `3`, `q` for `g`). Those are
//! corrected by a declarative substitution table before any pattern matching,
//! so new locale-specific misreads can be added without touching the parser.

use larder_core::Unit;

use crate::re;

/// OCR confusion corrections, applied in order to the lowercased fragment.
///
/// Order is load-bearing: `s00` → `500` must run before the catch-all
/// `s` → `3`, and the word forms must be normalized before the `s` fallback
/// mangles them ("pcs" becomes "pc3", which the piece pattern still accepts
/// via its "pc" alternative).
const CONFUSIONS: &[(&str, &str)] = &[
    ("|", "1"),
    ("l", "1"),
    ("o", "0"),
    (" (", "("),
    ("pieces", "pcs"),
    ("piece", "pc"),
    ("s00", "500"),
    ("s", "3"),
    ("q", "g"),
];

re!(re_count_suffix, r"x\s*(\d+)");
// Separator must be a real dash: a whitespace-only separator would swallow
// split single weights ("200 9g") before the max-digit-run tie-break runs.
re!(re_weight_range, r"(\d+)\s*[-–]\s*(\d+)\s*g");
re!(re_weight_g, r"(\d+)[\s\d]*g");
re!(re_weight_kg, r"(\d+(?:\.\d+)?)\s*kg");
re!(re_piece_count, r"(\d+)\s*(pcs|pc|item|pieces|piece)");
re!(re_digit_run, r"\d+");

/// A resolved package quantity. `count` ("how many of this item") and
/// `unit_value`/`unit` ("how big is one package") are independent axes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParsedQuantity {
    pub unit_value: f64,
    pub unit: Unit,
    pub count: f64,
}

impl ParsedQuantity {
    fn new(unit_value: f64, unit: Unit, count: f64) -> Self {
        Self { unit_value, unit, count }
    }
}

/// Resolve a quantity/unit from a text fragment suspected to encode one.
///
/// Matching priority: `x N` count multiplier, weight range (mean), single
/// gram weight (max digit run wins when OCR split the number), kilograms
/// (converted to grams), piece count, then a `1 pcs` default.
pub fn parse_quantity(fragment: &str) -> ParsedQuantity {
    if fragment.is_empty() {
        return ParsedQuantity::new(1.0, Unit::Pcs, 1.0);
    }

    let mut q = fragment.to_lowercase();
    for (from, to) in CONFUSIONS {
        q = q.replace(from, to);
    }

    // "200gx1", "Piece x 1" — the multiplier rides along with every branch.
    let count = re_count_suffix()
        .captures(&q)
        .and_then(|c| c[1].parse::<f64>().ok())
        .unwrap_or(1.0);

    // Weight range "300–400 g" resolves to the mean.
    if let Some(c) = re_weight_range().captures(&q) {
        let (low, high): (f64, f64) = match (c[1].parse(), c[2].parse()) {
            (Ok(a), Ok(b)) => (a, b),
            _ => return ParsedQuantity::new(1.0, Unit::Pcs, count),
        };
        return ParsedQuantity::new((low + high) / 2.0, Unit::G, count);
    }

    // Single gram weight. OCR sometimes splits one number into fragments
    // ("200 9g"): of all digit runs before the unit letter, the maximum is
    // the true value, not the run adjacent to the "g".
    if let Some(c) = re_weight_g().captures(&q) {
        let mut value: f64 = c[1].parse().unwrap_or(1.0);
        if let Some(g_pos) = q.find('g') {
            let before_unit = &q[..g_pos];
            if let Some(max) = re_digit_run()
                .find_iter(before_unit)
                .filter_map(|m| m.as_str().parse::<f64>().ok())
                .fold(None::<f64>, |acc, n| Some(acc.map_or(n, |a| a.max(n))))
            {
                value = max;
            }
        }
        return ParsedQuantity::new(value, Unit::G, count);
    }

    if let Some(c) = re_weight_kg().captures(&q) {
        if let Ok(kg) = c[1].parse::<f64>() {
            return ParsedQuantity::new(kg * 1000.0, Unit::G, count);
        }
    }

    if let Some(c) = re_piece_count().captures(&q) {
        if let Ok(n) = c[1].parse::<f64>() {
            return ParsedQuantity::new(n, Unit::Pcs, count);
        }
    }

    ParsedQuantity::new(1.0, Unit::Pcs, count)
}
