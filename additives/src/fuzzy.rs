//! Approximate name comparison tolerant of OCR slips (0/O, 1/I, 5/S).

use crate::normalize::{normalize, ocr_fold};

/// Fraction of the reference length tolerated as edits (floored, minimum 1).
pub const MAX_EDIT_RATIO: f64 = 0.15;

/// Edit budget for a normalized reference of `len` characters.
pub fn edit_budget(len: usize) -> usize {
    ((len as f64 * MAX_EDIT_RATIO).floor() as usize).max(1)
}

/// True when `candidate` is within the edit budget of `name`.
///
/// Only the candidate is OCR-folded; the reference name is compared as
/// normalized. `looks_like("E102", "E1O2")` holds, the reverse need not.
pub fn looks_like(name: &str, candidate: &str) -> bool {
    let base = normalize(name);
    let adjusted = ocr_fold(&normalize(candidate));
    strsim::levenshtein(&base, &adjusted) <= edit_budget(base.chars().count())
}
