//! Item assembly from an OCR line sequence.
//!
//! There is no tabular structure to anchor on: the scanner walks the lines
//! top to bottom, accumulates plausible name fragments, and terminates each
//! candidate at the first quantity anchor found within a bounded lookahead.
//! Candidates that never find an anchor are emitted only when the assembled
//! name is long and alphabetic enough to rule out pure noise.

use larder_core::{ExtractedItem, Unit};

use crate::clean::{clean_ocr_noise, is_mostly_garbage, strip_trailing_parentheticals};
use crate::quantity::parse_quantity;
use crate::re;

/// How many subsequent lines to scan for a quantity anchor.
pub const LOOKAHEAD_WINDOW: usize = 15;
/// Accumulated-fragment threshold for the early-stop guard.
pub const NAME_FRAGMENT_GUARD: usize = 4;
/// Lines shorter than this are skipped outright.
const MIN_LINE_LEN: usize = 2;
/// A cleaned fragment must reach this length to join a name; a finished name
/// must exceed it to be emitted.
const MIN_NAME_LEN: usize = 3;
/// A name-only fallback item needs a name longer than this, containing a
/// contiguous alphabetic run of at least 10 letters (see `re_alpha_run`).
const FALLBACK_MIN_NAME_LEN: usize = 20;

/// Receipt chrome that must never seed an item name: headers, footers,
/// billing and summary strings common to delivery-order screenshots.
const CHROME_PHRASES: &[&str] = &[
    "item details", "delivered", "ordered on", "billing",
    "total", "image", "delivered to", "payment", "items count",
    "savings", "discount", "summary", "delivered at", "delivered on",
    "items in this order", "how were your ordered", "bill details", "mrp",
];

/// Complimentary non-food line items (cutlery, containers, packaging) that
/// are not pantry-relevant.
const NON_FOOD_KEYWORDS: &[&str] = &[
    "wooden", "plate", "spoon", "fork", "knife", "bowl", "container", "box",
    "bag", "napkin", "tissue", "straw", "cup", "glass", "mug", "utensil",
    "cutlery", "tray", "basket", "wrapper", "packaging", "lid", "cover",
    "stand", "holder", "rack", "mat", "coaster", "bottle opener", "corkscrew",
    "toothpick", "chopstick", "ladle", "spatula", "tong", "peeler", "grater",
    "sieve", "strainer", "funnel", "measuring", "timer", "thermometer",
];

// Quantity anchor: weight+unit, count multiplier, or "Piece x N", tolerant of
// the digit/letter confusions the quantity parser corrects ('|', 'l', 's').
re!(re_qty_anchor,
    r"(?i)([\d|ls\?]+(?:\.\d+)?\s*(?:g|kg|pcs|pc|item|items)|x\s*[\d|l]|[\d|l]\s*x|piece\s*x\s*[\d|l])");
re!(re_alpha_run, r"[A-Za-z]{10,}");

/// Whether a line matches the receipt-chrome blacklist.
fn is_chrome_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    CHROME_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Whether an assembled item name names tableware/packaging rather than food.
pub fn is_non_food_item(name: &str) -> bool {
    let lower = name.to_lowercase();
    NON_FOOD_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

fn finish_name(parts: &[String]) -> String {
    strip_trailing_parentheticals(&clean_ocr_noise(&parts.join(" ")))
}

/// Parse raw OCR text into item records.
///
/// Scans top to bottom; each surviving line seeds a candidate whose name
/// accumulates until a quantity anchor appears within [`LOOKAHEAD_WINDOW`]
/// lines. Anchorless candidates fall back to a name-only `1 pcs` item when
/// the name is substantial enough. Non-food items are filtered at the end.
pub fn assemble_items(ocr_text: &str) -> Vec<ExtractedItem> {
    let lines: Vec<&str> = ocr_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let mut items: Vec<ExtractedItem> = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];

        // Skip chrome, prices and noise before spending a candidate on them.
        if line.chars().count() < MIN_LINE_LEN
            || is_chrome_line(line)
            || is_mostly_garbage(line)
        {
            i += 1;
            continue;
        }

        let candidate = clean_ocr_noise(line);
        if candidate.chars().count() < MIN_NAME_LEN {
            i += 1;
            continue;
        }
        let mut name_parts = vec![candidate];

        let mut found_qty = false;
        let mut j = i + 1;
        let window_end = (i + LOOKAHEAD_WINDOW).min(lines.len());

        while j < window_end {
            let next_line = lines[j];

            if re_qty_anchor().is_match(next_line) {
                let parsed = parse_quantity(next_line);
                let full_name = finish_name(&name_parts);
                if full_name.chars().count() > MIN_NAME_LEN {
                    // A degenerate "0 pcs"/"0g" anchor must not leak a
                    // non-positive package size downstream.
                    let unit_value = if parsed.unit_value > 0.0 {
                        parsed.unit_value
                    } else {
                        1.0
                    };
                    items.push(ExtractedItem::new(
                        full_name,
                        parsed.count,
                        unit_value,
                        parsed.unit,
                    ));
                    found_qty = true;
                    i = j + 1;
                }
                break;
            }

            let is_noise = is_mostly_garbage(next_line);
            let cleaned_next = clean_ocr_noise(next_line);
            if !is_noise && cleaned_next.chars().count() >= MIN_NAME_LEN {
                // Early stop: with several fragments banked, an
                // uppercase-starting line after garbage is more likely the
                // next item's name than a continuation of this one.
                let starts_upper = cleaned_next
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_uppercase());
                if name_parts.len() >= NAME_FRAGMENT_GUARD
                    && starts_upper
                    && lines[i + 1..j].iter().any(|l| is_mostly_garbage(l))
                {
                    break;
                }
                name_parts.push(cleaned_next);
            }

            j += 1;
        }

        if !found_qty {
            let full_name = finish_name(&name_parts);
            if full_name.chars().count() > FALLBACK_MIN_NAME_LEN
                && re_alpha_run().is_match(&full_name)
            {
                items.push(ExtractedItem::new(full_name, 1.0, 1.0, Unit::Pcs));
            }
            i = j;
        }
    }

    items.retain(|item| !is_non_food_item(&item.name));
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(lines: &[&str]) -> String {
        lines.join("\n")
    }

    // ── happy path ────────────────────────────────────────────────────────────

    #[test]
    fn name_then_anchor_emits_item() {
        let items = assemble_items(&joined(&["Amul Butter", "500 g x 1"]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Amul Butter");
        assert_eq!(items[0].count, 1.0);
        assert_eq!(items[0].unit_value, 500.0);
        assert_eq!(items[0].unit, Unit::G);
    }

    #[test]
    fn multi_line_name_joins_fragments() {
        let items = assemble_items(&joined(&[
            "Aashirvaad Select",
            "Sharbati Atta",
            "5 kg",
        ]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Aashirvaad Select Sharbati Atta");
        assert_eq!(items[0].unit_value, 5000.0);
        assert_eq!(items[0].unit, Unit::G);
    }

    #[test]
    fn multiple_items_in_sequence() {
        let items = assemble_items(&joined(&[
            "Amul Butter",
            "500g",
            "Tata Salt",
            "1 kg",
        ]));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Amul Butter");
        assert_eq!(items[1].name, "Tata Salt");
        assert_eq!(items[1].unit_value, 1000.0);
    }

    // ── end-to-end shape from the synthetic receipt ───────────────────────────

    #[test]
    fn synthetic_receipt_emits_anchored_item_and_rejects_short_fallback() {
        let items = assemble_items(&joined(&[
            "Amul Butter",
            "500 g x 1",
            "Lays Chips",
            "Total: 120",
        ]));
        // "Amul Butter" is anchored; "Lays Chips" never finds an anchor and
        // its assembled name is too short for the name-only fallback.
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Amul Butter");
        assert_eq!(items[0].count, 1.0);
        assert_eq!(items[0].unit_value, 500.0);
        assert_eq!(items[0].unit, Unit::G);
    }

    // ── chrome and garbage skipping ───────────────────────────────────────────

    #[test]
    fn chrome_lines_never_seed_items() {
        let items = assemble_items(&joined(&[
            "Item Details",
            "Delivered to Home",
            "Bill Details",
            "295",
        ]));
        assert!(items.is_empty());
    }

    #[test]
    fn price_lines_are_skipped() {
        let items = assemble_items(&joined(&["120", "34500", "Amul Butter", "500g"]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Amul Butter");
    }

    #[test]
    fn garbage_between_name_and_anchor_is_ignored() {
        let items = assemble_items(&joined(&[
            "Fortune Sunflower Oil",
            "295",
            "—–—–",
            "1 kg",
        ]));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Fortune Sunflower Oil");
        assert_eq!(items[0].unit_value, 1000.0);
    }

    // ── name-only fallback ────────────────────────────────────────────────────

    #[test]
    fn long_anchorless_name_falls_back_to_one_piece() {
        // Long name with a >=10-letter word ("Traditional") and no anchor.
        let items = assemble_items("Paryushan Traditional Khakhra Assortment");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit, Unit::Pcs);
        assert_eq!(items[0].unit_value, 1.0);
        assert_eq!(items[0].count, 1.0);
    }

    #[test]
    fn long_name_without_long_alpha_word_is_dropped() {
        // Longer than the fallback length, but no contiguous 10-letter run.
        assert!(assemble_items("Haldiram Bhujia Family Pack Special").is_empty());
    }

    #[test]
    fn short_anchorless_name_is_dropped() {
        assert!(assemble_items("Lays Chips").is_empty());
    }

    #[test]
    fn long_name_without_alpha_run_is_dropped() {
        // Longer than the fallback length but every word is short: no
        // 10-character alphabetic run, so it reads as assembled noise.
        assert!(assemble_items("ab cd ef gh ij kl mn op qr st").is_empty());
    }

    // ── early-stop guard ──────────────────────────────────────────────────────

    #[test]
    fn early_stop_does_not_trigger_without_intervening_garbage() {
        // Five clean fragments, no garbage lines in between: the guard must
        // stay quiet and all fragments join one name.
        let items = assemble_items(&joined(&[
            "Kelloggs Corn",
            "Flakes Original",
            "Breakfast Cereal",
            "Family Pack",
            "Extra Crunchy",
            "500g",
        ]));
        assert_eq!(items.len(), 1);
        assert!(items[0].name.contains("Extra Crunchy"), "name: {}", items[0].name);
    }

    #[test]
    fn early_stop_halts_accumulation_after_garbage() {
        // Four fragments banked, then a garbage line, then an
        // uppercase-starting line: accumulation stops before it, the banked
        // fragments become a fallback item, and the new line starts its own.
        let items = assemble_items(&joined(&[
            "Paryushan Traditional",
            "Khakhra Assortment",
            "Handcrafted Delights",
            "Premium Selection",
            "295",
            "Tata Salt",
            "1 kg",
        ]));
        assert_eq!(items.len(), 2);
        assert!(!items[0].name.contains("Tata"), "name: {}", items[0].name);
        assert_eq!(items[0].unit, Unit::Pcs);
        assert_eq!(items[1].name, "Tata Salt");
        assert_eq!(items[1].unit_value, 1000.0);
    }

    // ── non-food filter ───────────────────────────────────────────────────────

    #[test]
    fn non_food_items_filtered_even_with_anchor() {
        let items = assemble_items(&joined(&["Wooden Spoon Set", "2 pcs"]));
        assert!(items.is_empty());
    }

    #[test]
    fn non_food_keyword_matches() {
        assert!(is_non_food_item("wooden spoon"));
        assert!(is_non_food_item("Plastic Container Large"));
        assert!(!is_non_food_item("Butter Chicken Gravy"));
    }

    // ── invariants ────────────────────────────────────────────────────────────

    #[test]
    fn all_emitted_items_have_positive_unit_value() {
        let items = assemble_items(&joined(&[
            "Amul Butter",
            "0 pcs",
            "Haldiram Bhujia Family Pack Special",
            "Tata Salt",
            "500g",
        ]));
        for item in &items {
            assert!(item.unit_value > 0.0, "bad item: {item:?}");
            assert!(item.count >= 1.0);
        }
    }

    #[test]
    fn empty_text_yields_no_items() {
        assert!(assemble_items("").is_empty());
        assert!(assemble_items("\n\n\n").is_empty());
    }
}
