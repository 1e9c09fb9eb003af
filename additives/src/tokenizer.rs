//! Ingredient-declaration tokenizer.
//!
//! Splits label text into segments on `(`, `)`, `,` and `\`, strips leading
//! list phrases ("INGREDIENTS:", "CONTAINS:", "MAY CONTAIN:"), and emits one
//! token per E-code / INS-number occurrence, or a single name token for a
//! segment without codes.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::normalize::normalize;

pub const E_CODE_CONFIDENCE: f64 = 0.95;
pub const INS_CODE_CONFIDENCE: f64 = 0.90;
pub const NAME_CONFIDENCE: f64 = 0.6;

/// Functional-category words; any that occur in a segment become hints.
pub const FUNCTION_WORDS: &[&str] = &[
    "COLOUR",
    "COLOR",
    "PRESERVATIVE",
    "ANTIOXIDANT",
    "STABILISER",
    "STABILIZER",
    "THICKENER",
    "EMULSIFIER",
    "ACIDITY REGULATOR",
    "FLAVOUR",
    "FLAVOR",
    "SWEETENER",
    "RAISING AGENT",
];

static LEADING_KEYWORDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^(?:INGREDIENTS?|CONTAINS|MAY CONTAIN)[: ]+",
        r"^CONTAINS[: ]+",
        r"^INGREDIENTS?[: ]+",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static leading-keyword pattern"))
    .collect()
});

// ASCII word boundaries and digits: a code glued to CJK text still matches,
// and non-ASCII digits never reach a canonical code.
static E_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?-u:\b)E\s*0*([0-9]{3})([A-Z])?(?-u:\b)").expect("static E-code pattern")
});

static INS_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?-u:\b)INS\s*0*([0-9]{3})([A-Z])?(?-u:\b)").expect("static INS pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    Code,
    Name,
    /// Unstructured text. Never produced by [`parse_ingredients`]; lookups do
    /// not report tokens of this kind as unresolved.
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Segment text the token was found in (normalized).
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical: Option<String>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    #[serde(default)]
    pub hints: Vec<String>,
    pub confidence: f64,
}

impl Token {
    pub fn name(raw: impl Into<String>) -> Self {
        Token {
            raw: raw.into(),
            canonical: None,
            kind: TokenKind::Name,
            hints: Vec::new(),
            confidence: NAME_CONFIDENCE,
        }
    }
}

fn function_hints(segment: &str) -> Vec<String> {
    FUNCTION_WORDS
        .iter()
        .filter(|w| segment.contains(*w))
        .map(|w| w.to_string())
        .collect()
}

fn strip_leading_keywords(segment: &str) -> String {
    let mut cleaned = segment.trim().to_string();
    for re in LEADING_KEYWORDS.iter() {
        let next = re.replace(&cleaned, "").trim().to_string();
        cleaned = next;
    }
    cleaned
}

fn canonical_from(caps: &regex::Captures<'_>) -> String {
    let digits = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let suffix = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_uppercase())
        .unwrap_or_default();
    format!("E{digits}{suffix}")
}

/// Canonical `E<digits><suffix>` form of a single code string, if it is one.
/// Accepts both E-code and INS spellings.
pub fn canonical_code(text: &str) -> Option<String> {
    let normalized = normalize(text);
    E_CODE
        .captures(&normalized)
        .or_else(|| INS_CODE.captures(&normalized))
        .filter(|caps| caps.get(0).map(|m| m.as_str().len()) == Some(normalized.len()))
        .map(|caps| canonical_from(&caps))
}

/// Tokenize raw ingredient text.
pub fn parse_ingredients(text: &str) -> Vec<Token> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let normalized = normalize(text);
    let mut tokens = Vec::new();

    let segments = normalized
        .split(['(', ')', ',', '\\'])
        .map(strip_leading_keywords)
        .filter(|s| !s.is_empty());

    for segment in segments {
        let hints = function_hints(&segment);
        let mut matched = false;

        for caps in E_CODE.captures_iter(&segment) {
            tokens.push(Token {
                raw: segment.clone(),
                canonical: Some(canonical_from(&caps)),
                kind: TokenKind::Code,
                hints: hints.clone(),
                confidence: E_CODE_CONFIDENCE,
            });
            matched = true;
        }

        for caps in INS_CODE.captures_iter(&segment) {
            tokens.push(Token {
                raw: segment.clone(),
                canonical: Some(canonical_from(&caps)),
                kind: TokenKind::Code,
                hints: hints.clone(),
                confidence: INS_CODE_CONFIDENCE,
            });
            matched = true;
        }

        if !matched {
            tokens.push(Token {
                raw: segment,
                canonical: None,
                kind: TokenKind::Name,
                hints,
                confidence: NAME_CONFIDENCE,
            });
        }
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonicals(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().filter_map(|t| t.canonical.as_deref()).collect()
    }

    #[test]
    fn empty_input_yields_no_tokens() {
        assert!(parse_ingredients("").is_empty());
        assert!(parse_ingredients("   \n\t").is_empty());
    }

    #[test]
    fn leading_zeros_and_spaces_collapse_to_one_code() {
        for raw in ["E102", "E 102", "E0102", "E 0102", "e 00102", "E  102"] {
            let tokens = parse_ingredients(raw);
            assert_eq!(tokens.len(), 1, "{raw}");
            assert_eq!(tokens[0].canonical.as_deref(), Some("E102"), "{raw}");
            assert_eq!(tokens[0].kind, TokenKind::Code);
        }
    }

    #[test]
    fn letter_suffix_is_kept() {
        let tokens = parse_ingredients("Paprika extract (E160c)");
        assert_eq!(canonicals(&tokens), vec!["E160C"]);
    }

    #[test]
    fn ins_numbers_map_onto_e_codes() {
        let tokens = parse_ingredients("Preservative: INS 220 (Sodium Sulfite)");
        assert_eq!(tokens[0].canonical.as_deref(), Some("E220"));
        assert_eq!(tokens[0].confidence, INS_CODE_CONFIDENCE);
        assert!(tokens[0].hints.contains(&"PRESERVATIVE".to_string()));
        // the bracketed name becomes its own segment
        assert_eq!(tokens[1].kind, TokenKind::Name);
        assert_eq!(tokens[1].raw, "SODIUM SULFITE");
    }

    #[test]
    fn detects_codes_alongside_names() {
        let tokens =
            parse_ingredients("Sugar, Tartrazine (E102), Allura Red E129, Citric Acid (E330)");
        let codes = canonicals(&tokens);
        for c in ["E102", "E129", "E330"] {
            assert!(codes.contains(&c), "missing {c}");
        }
    }

    #[test]
    fn one_segment_can_emit_several_code_tokens() {
        let tokens = parse_ingredients("Contains E102 and E330");
        assert_eq!(tokens.len(), 2);
        assert_eq!(canonicals(&tokens), vec!["E102", "E330"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Code));
        assert!(tokens.iter().all(|t| t.raw == "E102 AND E330"));
    }

    #[test]
    fn code_segments_never_emit_name_tokens() {
        let tokens = parse_ingredients("colour E150d INS 160");
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Code));
        assert_eq!(canonicals(&tokens), vec!["E150D", "E160"]);
        assert!(tokens.iter().all(|t| t.hints == vec!["COLOUR".to_string()]));
    }

    #[test]
    fn strips_list_introductions() {
        let tokens = parse_ingredients("Ingredients: sugar, Carmine, water\\ MAY CONTAIN: milk");
        let raws: Vec<&str> = tokens.iter().map(|t| t.raw.as_str()).collect();
        assert_eq!(raws, vec!["SUGAR", "CARMINE", "WATER", "MILK"]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::Name));
        assert!(tokens.iter().all(|t| t.confidence == NAME_CONFIDENCE));
    }

    #[test]
    fn empty_segments_are_dropped() {
        let tokens = parse_ingredients("(), ,Ingredients:, salt");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].raw, "SALT");
    }

    #[test]
    fn codes_adjacent_to_cjk_text_are_detected() {
        let tokens = parse_ingredients("着色料E102");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Code);
        assert_eq!(tokens[0].canonical.as_deref(), Some("E102"));

        let tokens = parse_ingredients("E330酸味料");
        assert_eq!(canonicals(&tokens), vec!["E330"]);
    }

    #[test]
    fn non_ascii_digits_are_not_codes() {
        let tokens = parse_ingredients("E١٠٢");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Name);
        assert_eq!(tokens[0].canonical, None);
        assert_eq!(canonical_code("INS ١٠٢"), None);
    }

    #[test]
    fn canonical_code_accepts_whole_codes_only() {
        assert_eq!(canonical_code("e 0102").as_deref(), Some("E102"));
        assert_eq!(canonical_code("INS 330").as_deref(), Some("E330"));
        assert_eq!(canonical_code("Tartrazine E102"), None);
        assert_eq!(canonical_code("carmine"), None);
    }
}
