//! Text normalization shared by the tokenizer, the registry indices and the
//! fuzzy comparator.
//!
//! Policy:
//! - NFKC compose, then drop zero-width spaces.
//! - Unicode upper-casing.
//! - NFKD decompose and drop combining diacritical marks (U+0300..=U+036F).
//! - Collapse whitespace runs to one space and trim.
//!
//! Keep this logic single-sourced: index keys and lookup keys must agree.

use unicode_normalization::UnicodeNormalization;

/// Normalize ingredient text for matching. Idempotent.
pub fn normalize(input: &str) -> String {
    let composed: String = input
        .nfkc()
        .filter(|ch| *ch != '\u{200B}')
        .flat_map(char::to_uppercase)
        .collect();

    let stripped: String = composed
        .nfkd()
        .filter(|ch| !('\u{0300}'..='\u{036F}').contains(ch))
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// OCR confusion fold applied to the candidate side of a fuzzy comparison.
pub fn ocr_fold(normalized: &str) -> String {
    normalized
        .chars()
        .map(|ch| match ch {
            'O' => '0',
            'I' => '1',
            'S' => '5',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_diacritics_and_collapses_whitespace() {
        assert_eq!(normalize("  Cáñdy   E 1 2 0  "), "CANDY E 1 2 0");
    }

    #[test]
    fn drops_zero_width_space() {
        assert_eq!(normalize("Tartra\u{200B}zine"), "TARTRAZINE");
    }

    #[test]
    fn folds_compatibility_forms() {
        // full-width digits and ligatures
        assert_eq!(normalize("Ｅ１０２"), "E102");
        assert_eq!(normalize("ﬂavour"), "FLAVOUR");
    }

    #[test]
    fn is_idempotent() {
        for s in [
            "",
            "   ",
            "Crème brûlée, E 0102\t(colour)",
            "Straße \u{200B} ﬁne",
            "ǅemal İstanbul",
            "MAY CONTAIN: nuts\\soy",
        ] {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn ocr_fold_maps_letters_to_digits() {
        assert_eq!(ocr_fold("E1O2"), "E102");
        assert_eq!(ocr_fold("SOI"), "501");
    }
}
