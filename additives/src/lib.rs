// Public modules so nutriscan-core and the CLIs can use them
pub mod assets;
pub mod checksum;
pub mod error;
pub mod fuzzy;
pub mod normalize;
pub mod registry;
pub mod risk;
pub mod tokenizer;
pub mod types;

pub use assets::{sample_pack_json, sample_registry, write_sample_pack};
pub use checksum::{canonical_checksum, stamp_checksum, verify_checksum};
pub use error::PackError;
pub use fuzzy::looks_like;
pub use normalize::normalize;
pub use registry::{AdditiveRegistry, LookupMatch, LookupOptions, LookupResult, MatchMethod};
pub use risk::{
    evaluate_match, run_risk_engine, AdditiveRiskItem, RiskBadge, RiskEngineResult,
    SensitivityPrefs, UserPreferences,
};
pub use tokenizer::{parse_ingredients, Token, TokenKind};
pub use types::{
    AdditivePack, AdditiveRecord, Diet, DietaryFlags, RegionCode, RegionRule, RuleKind,
};

/// --- One-shot API: pack JSON + label text -> risk result ---
pub fn assess_label(
    pack_json: &str,
    label_text: &str,
    prefs: &UserPreferences,
    options: LookupOptions,
) -> Result<RiskEngineResult, PackError> {
    let registry = AdditiveRegistry::from_json(pack_json)?;
    let tokens = parse_ingredients(label_text);
    let lookup = registry.lookup(&tokens, options);
    Ok(run_risk_engine(&lookup.matches, prefs))
}
