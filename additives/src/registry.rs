use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::PackError;
use crate::fuzzy::looks_like;
use crate::normalize::normalize;
use crate::tokenizer::{canonical_code, Token, TokenKind};
use crate::types::{AdditivePack, AdditiveRecord, RegionCode};

const CODE_BONUS: f64 = 0.05;
const ALIAS_BONUS: f64 = 0.10;
const FUZZY_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Code,
    Alias,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupOptions {
    #[serde(default)]
    pub allow_fuzzy: bool,
}

impl LookupOptions {
    pub fn fuzzy() -> Self {
        Self { allow_fuzzy: true }
    }
}

/// One token resolved to one additive.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupMatch {
    pub record: Arc<AdditiveRecord>,
    pub matched_alias: String,
    pub method: MatchMethod,
    pub token: Token,
    pub confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LookupResult {
    pub matches: Vec<LookupMatch>,
    pub unresolved: Vec<Token>,
}

/// Read-only index over an additive pack.
///
/// Built once; every method takes `&self`, so a registry can be shared across
/// threads behind an `Arc` without locking.
#[derive(Debug, Clone)]
pub struct AdditiveRegistry {
    version: String,
    checksum: String,
    generated_at: String,
    records: Vec<Arc<AdditiveRecord>>,
    code_index: HashMap<String, usize>,
    // normalized alias -> record position, plus registration order for fuzzy scans
    alias_index: HashMap<String, usize>,
    alias_order: Vec<String>,
}

impl AdditiveRegistry {
    pub fn from_json(json: &str) -> Result<Self, PackError> {
        let pack: AdditivePack = serde_json::from_str(json)?;
        Self::from_pack(pack)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self, PackError> {
        let pack: AdditivePack = serde_json::from_value(value)?;
        Self::from_pack(pack)
    }

    /// Validate the pack and build both indices.
    ///
    /// Record names are registered first, in pack order, first registration
    /// winning. Entries of the flat `alias_index` fill only keys still free,
    /// so declared names always take precedence.
    pub fn from_pack(pack: AdditivePack) -> Result<Self, PackError> {
        if pack.version.trim().is_empty() {
            return Err(PackError::MissingVersion);
        }

        let mut code_index = HashMap::with_capacity(pack.additives.len());
        let mut records = Vec::with_capacity(pack.additives.len());
        for (pos, record) in pack.additives.into_iter().enumerate() {
            if record.code.trim().is_empty() {
                return Err(PackError::EmptyCode(pos));
            }
            if code_index.insert(record.code.clone(), pos).is_some() {
                return Err(PackError::DuplicateCode(record.code));
            }
            records.push(Arc::new(record));
        }

        let mut registry = Self {
            version: pack.version,
            checksum: pack.checksum,
            generated_at: pack.generated_at,
            records,
            code_index,
            alias_index: HashMap::new(),
            alias_order: Vec::new(),
        };

        for pos in 0..registry.records.len() {
            let names = registry.records[pos].names.clone();
            for name in names {
                registry.register_alias(normalize(&name), pos);
            }
        }

        for (alias, code) in &pack.alias_index {
            let pos = *registry
                .code_index
                .get(code)
                .ok_or_else(|| PackError::UnknownAliasTarget {
                    alias: alias.clone(),
                    code: code.clone(),
                })?;
            registry.register_alias(normalize(alias), pos);
        }

        Ok(registry)
    }

    fn register_alias(&mut self, key: String, pos: usize) {
        if key.is_empty() || self.alias_index.contains_key(&key) {
            return;
        }
        self.alias_index.insert(key.clone(), pos);
        self.alias_order.push(key);
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn generated_at(&self) -> &str {
        &self.generated_at
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn alias_count(&self) -> usize {
        self.alias_order.len()
    }

    /// Records in pack order.
    pub fn records(&self) -> impl Iterator<Item = &AdditiveRecord> {
        self.records.iter().map(|r| r.as_ref())
    }

    /// Region codes that appear in any record's region rules, sorted.
    pub fn list_regions(&self) -> Vec<RegionCode> {
        self.records
            .iter()
            .flat_map(|r| r.region_rules.keys().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Find a record by code; accepts loose spellings such as "e 0102" or "INS 102".
    pub fn find_by_code(&self, code: &str) -> Option<&AdditiveRecord> {
        let key = normalize(code);
        self.code_index
            .get(&key)
            .or_else(|| canonical_code(&key).and_then(|c| self.code_index.get(&c)))
            .map(|&pos| self.records[pos].as_ref())
    }

    /// Record registered under a normalized alias, if any.
    pub fn find_by_alias(&self, alias: &str) -> Option<&AdditiveRecord> {
        self.alias_index
            .get(&normalize(alias))
            .map(|&pos| self.records[pos].as_ref())
    }

    fn matched(
        &self,
        pos: usize,
        alias: String,
        method: MatchMethod,
        token: &Token,
        confidence: f64,
    ) -> LookupMatch {
        LookupMatch {
            record: Arc::clone(&self.records[pos]),
            matched_alias: alias,
            method,
            token: token.clone(),
            confidence,
        }
    }

    /// Resolve a token: exact code, then exact alias, then (if allowed) the
    /// first alias in registration order that [`looks_like`] the token text.
    pub fn match_token(&self, token: &Token, options: LookupOptions) -> Option<LookupMatch> {
        if let Some(canonical) = token.canonical.as_deref() {
            if let Some(&pos) = self.code_index.get(canonical) {
                let confidence = (token.confidence + CODE_BONUS).min(1.0);
                return Some(self.matched(
                    pos,
                    canonical.to_string(),
                    MatchMethod::Code,
                    token,
                    confidence,
                ));
            }
        }

        let normalized_raw = normalize(&token.raw);
        if let Some(&pos) = self.alias_index.get(&normalized_raw) {
            let confidence = (token.confidence + ALIAS_BONUS).min(1.0);
            return Some(self.matched(
                pos,
                normalized_raw,
                MatchMethod::Alias,
                token,
                confidence,
            ));
        }

        if options.allow_fuzzy {
            let hit = self
                .alias_order
                .iter()
                .find(|alias| looks_like(alias, &normalized_raw));
            if let Some(alias) = hit {
                let pos = self.alias_index[alias];
                let confidence = (token.confidence * FUZZY_FACTOR).min(1.0);
                return Some(self.matched(
                    pos,
                    alias.clone(),
                    MatchMethod::Fuzzy,
                    token,
                    confidence,
                ));
            }
        }

        None
    }

    /// Resolve every token, keeping one match per additive code (the most
    /// confident; ties keep the earlier one) in first-seen order.
    pub fn lookup(&self, tokens: &[Token], options: LookupOptions) -> LookupResult {
        let mut matches: Vec<LookupMatch> = Vec::new();
        let mut by_code: HashMap<String, usize> = HashMap::new();
        let mut unresolved = Vec::new();

        for token in tokens {
            match self.match_token(token, options) {
                Some(found) => match by_code.get(&found.record.code) {
                    Some(&slot) => {
                        if matches[slot].confidence < found.confidence {
                            matches[slot] = found;
                        }
                    }
                    None => {
                        by_code.insert(found.record.code.clone(), matches.len());
                        matches.push(found);
                    }
                },
                None if token.kind != TokenKind::Other => unresolved.push(token.clone()),
                None => {}
            }
        }

        LookupResult { matches, unresolved }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DietaryFlags, EvidenceLevel, SourceFlags};
    use std::collections::BTreeMap;

    fn record(code: &str, names: &[&str]) -> AdditiveRecord {
        AdditiveRecord {
            code: code.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            class: "Colour".into(),
            evidence_level: EvidenceLevel::Consensus,
            plain_summary: String::new(),
            dietary: DietaryFlags::default(),
            source: SourceFlags::default(),
            population_cautions: vec![],
            region_rules: BTreeMap::new(),
            references: vec![],
        }
    }

    fn pack(additives: Vec<AdditiveRecord>, aliases: &[(&str, &str)]) -> AdditivePack {
        AdditivePack {
            version: "test".into(),
            checksum: String::new(),
            generated_at: "2025-01-01T00:00:00Z".into(),
            additives,
            alias_index: aliases
                .iter()
                .map(|(a, c)| (a.to_string(), c.to_string()))
                .collect(),
        }
    }

    fn single(code: &str, names: &[&str]) -> AdditiveRegistry {
        AdditiveRegistry::from_pack(pack(vec![record(code, names)], &[])).unwrap()
    }

    #[test]
    fn shared_name_resolves_to_first_registered_record() {
        let reg = AdditiveRegistry::from_pack(pack(
            vec![record("E160A", &["Carotene"]), record("E160B", &["carotene", "Annatto"])],
            &[],
        ))
        .unwrap();
        assert_eq!(reg.find_by_alias("CAROTENE").unwrap().code, "E160A");
        assert_eq!(reg.find_by_alias("annatto").unwrap().code, "E160B");
    }

    #[test]
    fn declared_names_beat_flat_aliases() {
        let reg = AdditiveRegistry::from_pack(pack(
            vec![record("E120", &["Carmine"]), record("E124", &["Ponceau 4R"])],
            &[("CARMINE", "E124"), ("COCHINEAL RED A", "E124")],
        ))
        .unwrap();
        assert_eq!(reg.find_by_alias("carmine").unwrap().code, "E120");
        assert_eq!(reg.find_by_alias("cochineal red a").unwrap().code, "E124");
    }

    #[test]
    fn rejects_invalid_packs() {
        let twice = vec![record("E100", &[]), record("E100", &[])];
        let dup = AdditiveRegistry::from_pack(pack(twice, &[]));
        assert!(matches!(dup, Err(PackError::DuplicateCode(c)) if c == "E100"));

        let dangling =
            AdditiveRegistry::from_pack(pack(vec![record("E100", &[])], &[("X", "E999")]));
        assert!(matches!(dangling, Err(PackError::UnknownAliasTarget { .. })));

        let mut unversioned = pack(vec![], &[]);
        unversioned.version = " ".into();
        assert!(matches!(
            AdditiveRegistry::from_pack(unversioned),
            Err(PackError::MissingVersion)
        ));

        assert!(matches!(
            AdditiveRegistry::from_json("{\"version\": 3}"),
            Err(PackError::Parse(_))
        ));
    }

    #[test]
    fn tiers_apply_in_order_with_confidence_adjustments() {
        let reg = single("E102", &["Tartrazine", "E102"]);

        let code_tok = Token {
            raw: "TARTRAZINE E102".into(),
            canonical: Some("E102".into()),
            kind: TokenKind::Code,
            hints: vec![],
            confidence: 0.9,
        };
        let m = reg.match_token(&code_tok, LookupOptions::default()).unwrap();
        assert_eq!(m.method, MatchMethod::Code);
        assert_eq!(m.matched_alias, "E102");
        assert!((m.confidence - 0.95).abs() < 1e-9);

        let m = reg
            .match_token(&Token::name("tartrazine"), LookupOptions::default())
            .unwrap();
        assert_eq!(m.method, MatchMethod::Alias);
        assert_eq!(m.matched_alias, "TARTRAZINE");
        assert!((m.confidence - 0.7).abs() < 1e-9);

        let slip = Token::name("TARTRAZlNE");
        assert!(reg.match_token(&slip, LookupOptions::default()).is_none());
        let m = reg.match_token(&slip, LookupOptions::fuzzy()).unwrap();
        assert_eq!(m.method, MatchMethod::Fuzzy);
        assert!((m.confidence - 0.48).abs() < 1e-9);
    }

    #[test]
    fn fuzzy_takes_first_alias_in_registration_order() {
        // both aliases are one edit from "BETA"; the earlier record wins
        let reg = AdditiveRegistry::from_pack(pack(
            vec![record("E001", &["BETB"]), record("E002", &["BETC"])],
            &[],
        ))
        .unwrap();
        let m = reg.match_token(&Token::name("BETA"), LookupOptions::fuzzy()).unwrap();
        assert_eq!(m.record.code, "E001");
        assert_eq!(m.matched_alias, "BETB");
    }

    #[test]
    fn unknown_canonical_falls_through_to_alias_tier() {
        let reg = single("E330", &["E999 BLEND"]);
        let tok = Token {
            raw: "E999 BLEND".into(),
            canonical: Some("E999".into()),
            kind: TokenKind::Code,
            hints: vec![],
            confidence: 0.95,
        };
        let m = reg.match_token(&tok, LookupOptions::default()).unwrap();
        assert_eq!(m.method, MatchMethod::Alias);
        assert_eq!(m.record.code, "E330");
    }

    #[test]
    fn lookup_keeps_most_confident_match_per_code() {
        let reg = single("E102", &["Tartrazine"]);
        let tokens = vec![
            Token::name("Tartrazine"),
            Token {
                raw: "E102".into(),
                canonical: Some("E102".into()),
                kind: TokenKind::Code,
                hints: vec!["COLOUR".into()],
                confidence: 0.95,
            },
            Token::name("tartrazine"),
        ];
        let result = reg.lookup(&tokens, LookupOptions::default());
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].method, MatchMethod::Code);
        assert_eq!(result.matches[0].token.hints, vec!["COLOUR".to_string()]);
        assert!(result.unresolved.is_empty());
    }

    #[test]
    fn equal_confidence_does_not_replace_earlier_match() {
        let reg = single("E120", &["Carmine", "Cochineal"]);
        let tokens = vec![Token::name("Carmine"), Token::name("Cochineal")];
        let result = reg.lookup(&tokens, LookupOptions::default());
        assert_eq!(result.matches.len(), 1);
        assert_eq!(result.matches[0].matched_alias, "CARMINE");
    }

    #[test]
    fn unresolved_skips_unstructured_tokens() {
        let reg = single("E102", &["Tartrazine"]);
        let mut other = Token::name("best before end");
        other.kind = TokenKind::Other;
        let result = reg.lookup(&[Token::name("sugar"), other], LookupOptions::default());
        assert!(result.matches.is_empty());
        assert_eq!(result.unresolved.len(), 1);
        assert_eq!(result.unresolved[0].raw, "sugar");
    }

    #[test]
    fn find_by_code_accepts_loose_spellings() {
        let reg = AdditiveRegistry::from_pack(pack(vec![record("E102", &[])], &[])).unwrap();
        assert!(reg.find_by_code("e102").is_some());
        assert!(reg.find_by_code("E 0102").is_some());
        assert!(reg.find_by_code("INS 102").is_some());
        assert!(reg.find_by_code("E103").is_none());
    }
}
