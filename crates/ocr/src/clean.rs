//! Noise cleaning for OCR-recovered name fragments.
//!
//! Receipt screenshots OCR into text littered with recurring junk: leading
//! symbol runs, garbage prefix tokens (often garbage stacked on garbage), and
//! a small set of stubborn mid-string fragments. Leading junk is stripped to
//! a fixed point because removing one layer frequently exposes another;
//! embedded and trailing junk does not recurse and is stripped once.

use regex::Regex;
use std::sync::OnceLock;

use crate::re;

/// Minimum alphabetic characters before a line can be a name fragment.
pub const MIN_ALPHA_CHARS: usize = 2;
/// Minimum ratio of alphabetic characters to total length for a name fragment.
pub const ALPHA_DENSITY_MIN: f64 = 0.18;

/// Garbage tokens that show up at the start of OCR'd names. These recurse:
/// stripping one often exposes the next, hence the fixed-point loop.
const NOISE_PREFIXES: &[&str] = &[
    "foe", "of", "is", "is-", "r=", "gx1", "gx", "the", "at",
    "sinn", "petted", "oad", "way", "sey", "wd", "wz", "unit",
    "tet", "laa", "pe", "pont", "wi", "gt", "tia",
];

/// Stubborn fragments removed wherever they occur as whole words, one pass.
const NOISE_FRAGMENTS: &[&str] = &[
    "Hil", "SS", "0288", "Sil", "SINN", "oad", "way", "sey",
    "wd", "wz", "lk pt", "carat", "rd", "unit", "TET", "laa",
    "PE", "PONT", "Wi", "gt", "Tia",
];

re!(re_leading_junk, r#"^[—_ .&+–\-=*“"'(>»^~`|\\©®™\d?]+"#);
re!(re_trailing_junk, r#"[—_ .&+–\-=*“"'(>»^~`|\\©®™\d]+$"#);
re!(re_paren_suffix, r"\s*(?:\([^)]*\)\s*)+$");

fn prefix_patterns() -> &'static [Regex] {
    static P: OnceLock<Vec<Regex>> = OnceLock::new();
    P.get_or_init(|| {
        NOISE_PREFIXES
            .iter()
            .map(|p| {
                Regex::new(&format!(r"(?i)^{}(\s+|$)", regex::escape(p)))
                    .expect("invalid regex")
            })
            .collect()
    })
}

fn fragment_patterns() -> &'static [Regex] {
    static P: OnceLock<Vec<Regex>> = OnceLock::new();
    P.get_or_init(|| {
        NOISE_FRAGMENTS
            .iter()
            .map(|f| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(f)))
                    .expect("invalid regex")
            })
            .collect()
    })
}

/// Strip OCR artifacts from a candidate item name.
///
/// Phase 1 re-applies leading-junk and prefix stripping until the string
/// stops changing (every substitution only removes characters, so the loop
/// terminates). Phase 2 removes known fragments anywhere as whole words and
/// strips trailing junk once.
pub fn clean_ocr_noise(text: &str) -> String {
    let mut text = text.trim().to_string();

    loop {
        let before = text.clone();
        text = re_leading_junk().replace(&text, "").trim().to_string();
        for re in prefix_patterns() {
            text = re.replace(&text, "").trim().to_string();
        }
        if text == before {
            break;
        }
    }

    for re in fragment_patterns() {
        text = re.replace_all(&text, "").trim().to_string();
    }

    re_trailing_junk().replace(&text, "").trim().to_string()
}

/// Remove any trailing run of parenthesised annotations, e.g.
/// `"Toor Dal (500 g) (Unpolished)"` → `"Toor Dal"`.
pub fn strip_trailing_parentheticals(name: &str) -> String {
    re_paren_suffix().replace(name, "").trim().to_string()
}

/// Whether a line is likely OCR noise or a pure price/ID line rather than a
/// name fragment. A density heuristic, not exact-match: short all-caps brand
/// fragments must survive while number-heavy lines are rejected.
pub fn is_mostly_garbage(text: &str) -> bool {
    let alnum_count = text.chars().filter(|c| c.is_ascii_alphanumeric()).count();
    if alnum_count == 0 {
        return true;
    }

    // Pure numeric lines are prices or IDs, not item names.
    let digit_count = text.chars().filter(|c| c.is_ascii_digit()).count();
    if digit_count == alnum_count {
        return true;
    }

    let letters = text.chars().filter(|c| c.is_ascii_alphabetic()).count();
    if letters < MIN_ALPHA_CHARS {
        return true;
    }

    (letters as f64) < (text.chars().count() as f64) * ALPHA_DENSITY_MIN
}
