use serde::{Deserialize, Serialize};

use crate::registry::{LookupMatch, MatchMethod};
use crate::types::{
    AdditiveRecord, CautionSeverity, Diet, DietaryFlags, PopulationCondition, Reference,
    RegionCode, RuleBase, RuleKind,
};

// ----------------- Preferences -----------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensitivityPrefs {
    #[serde(default)]
    pub pku: bool,
    #[serde(default)]
    pub sulfites: bool,
    #[serde(default)]
    pub caffeine: bool,
    #[serde(default)]
    pub aspartame: bool,
    #[serde(default)]
    pub shellfish: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPreferences {
    #[serde(default = "default_region")]
    pub region: RegionCode,
    #[serde(default)]
    pub diet: DietaryFlags,
    #[serde(default)]
    pub sensitivities: SensitivityPrefs,
    #[serde(default)]
    pub child_mode: bool,
}

fn default_region() -> RegionCode {
    RegionCode::Eu
}

impl UserPreferences {
    pub fn new(region: RegionCode) -> Self {
        Self {
            region,
            diet: DietaryFlags::default(),
            sensitivities: SensitivityPrefs::default(),
            child_mode: false,
        }
    }

    /// Whether a population condition applies to this consumer.
    pub fn has_condition(&self, condition: PopulationCondition) -> bool {
        match condition {
            PopulationCondition::Child => self.child_mode,
            PopulationCondition::Pku => self.sensitivities.pku,
            PopulationCondition::Sulfites => self.sensitivities.sulfites,
            PopulationCondition::Caffeine => self.sensitivities.caffeine,
            PopulationCondition::Aspartame => self.sensitivities.aspartame,
            PopulationCondition::Shellfish => self.sensitivities.shellfish,
        }
    }
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self::new(RegionCode::Eu)
    }
}

// ----------------- Result -----------------

/// Ordered so that `max` escalates: GREEN < YELLOW < RED.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskBadge {
    Green,
    Yellow,
    Red,
}

impl From<CautionSeverity> for RiskBadge {
    fn from(severity: CautionSeverity) -> Self {
        match severity {
            CautionSeverity::Red => RiskBadge::Red,
            CautionSeverity::Yellow => RiskBadge::Yellow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditiveRiskItem {
    pub code: String,
    pub name: String,
    pub badge: RiskBadge,
    pub plain_summary: String,
    pub matched_alias: String,
    pub method: MatchMethod,
    pub confidence: f64,
    pub hints: Vec<String>,
    pub reasons: Vec<String>,
    pub rule_ids: Vec<String>,
    pub references: Vec<Reference>,
    pub audiences: Vec<String>,
    pub dietary: DietaryFlags,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskEngineResult {
    pub region: RegionCode,
    pub flagged_count: usize,
    pub caution_count: usize,
    pub neutral_count: usize,
    pub items: Vec<AdditiveRiskItem>,
}

// ----------------- Helpers -----------------

pub const DIETARY_REFERENCE_ID: &str = "DIETARY_FLAGS";

fn dietary_reference() -> Reference {
    Reference {
        id: DIETARY_REFERENCE_ID.into(),
        label: "Dietary flags from pack".into(),
        url: String::new(),
    }
}

fn push_unique<T: PartialEq>(dst: &mut Vec<T>, value: T) {
    if !dst.contains(&value) {
        dst.push(value);
    }
}

/// Accumulates one record's evaluation. Every collection keeps first-seen order.
struct Assessment<'a> {
    record: &'a AdditiveRecord,
    badge: RiskBadge,
    reasons: Vec<String>,
    rule_ids: Vec<String>,
    references: Vec<Reference>,
    audiences: Vec<String>,
}

impl<'a> Assessment<'a> {
    fn new(record: &'a AdditiveRecord) -> Self {
        Self {
            record,
            badge: RiskBadge::Green,
            reasons: Vec::new(),
            rule_ids: Vec::new(),
            references: Vec::new(),
            audiences: Vec::new(),
        }
    }

    fn escalate(&mut self, next: RiskBadge) {
        self.badge = self.badge.max(next);
    }

    fn reason(&mut self, text: &str) {
        push_unique(&mut self.reasons, text.to_string());
    }

    fn audience(&mut self, label: &str) {
        push_unique(&mut self.audiences, label.to_string());
    }

    /// Record the rule id, merge its audience, and pull the references it
    /// names from the record. Unknown reference ids are skipped.
    fn note_rule(&mut self, base: &RuleBase) {
        push_unique(&mut self.rule_ids, base.id.clone());
        for label in base.audience.iter().flatten() {
            self.audience(label);
        }
        for id in &base.reference_ids {
            if let Some(reference) = self.record.reference(id) {
                push_unique(&mut self.references, reference.clone());
            }
        }
    }
}

// ----------------- Core -----------------

/// Classify one matched additive for one consumer.
pub fn evaluate_match(found: &LookupMatch, prefs: &UserPreferences) -> AdditiveRiskItem {
    let record = found.record.as_ref();
    let mut acc = Assessment::new(record);
    let mut covered_diets: Vec<Diet> = Vec::new();

    // Pass 1: region rules
    for rule in record.rules_for(prefs.region) {
        acc.note_rule(&rule.base);

        match &rule.kind {
            RuleKind::RegulatoryWarning => {
                acc.reason(&rule.base.summary);
                acc.escalate(RiskBadge::Red);
            }
            RuleKind::PopulationCaution { condition, severity } => {
                if prefs.has_condition(*condition) {
                    acc.reason(&rule.base.summary);
                    acc.escalate((*severity).into());
                }
            }
            RuleKind::DietConflict { diet } => {
                push_unique(&mut covered_diets, *diet);
                if prefs.diet.get(*diet) {
                    acc.reason(&rule.base.summary);
                    acc.audience(diet.title());
                    acc.escalate(RiskBadge::Yellow);
                }
            }
            RuleKind::EvidenceAnnotation => {
                acc.reason(&rule.base.summary);
                acc.escalate(RiskBadge::Yellow);
            }
            RuleKind::RegionApproval { .. } => {
                acc.reason(&rule.base.summary);
            }
            RuleKind::Unrecognized => {}
        }
    }

    // Pass 2: region-agnostic population cautions
    for caution in &record.population_cautions {
        if prefs.has_condition(caution.condition) {
            acc.note_rule(&caution.base);
            acc.reason(&caution.base.summary);
            acc.escalate(caution.severity.into());
        }
    }

    // Pass 3: generic dietary fallback for diets no explicit rule covered
    let mut diet_flagged = false;
    for diet in Diet::ALL {
        if prefs.diet.get(diet) && !record.dietary.get(diet) && !covered_diets.contains(&diet) {
            acc.reason(&format!("Not suitable for {} preference.", diet.as_str()));
            push_unique(&mut acc.rule_ids, format!("dietary-{}", diet.as_str()));
            acc.audience(diet.title());
            acc.escalate(RiskBadge::Yellow);
            diet_flagged = true;
        }
    }
    if diet_flagged {
        push_unique(&mut acc.references, dietary_reference());
    }

    AdditiveRiskItem {
        code: record.code.clone(),
        name: record.display_name().to_string(),
        badge: acc.badge,
        plain_summary: record.plain_summary.clone(),
        matched_alias: found.matched_alias.clone(),
        method: found.method,
        confidence: found.confidence,
        hints: found.token.hints.clone(),
        reasons: acc.reasons,
        rule_ids: acc.rule_ids,
        references: acc.references,
        audiences: acc.audiences,
        dietary: record.dietary,
    }
}

/// Classify every match independently and tally badges.
pub fn run_risk_engine(matches: &[LookupMatch], prefs: &UserPreferences) -> RiskEngineResult {
    let items: Vec<AdditiveRiskItem> = matches.iter().map(|m| evaluate_match(m, prefs)).collect();

    let mut flagged_count = 0;
    let mut caution_count = 0;
    let mut neutral_count = 0;
    for item in &items {
        match item.badge {
            RiskBadge::Red => flagged_count += 1,
            RiskBadge::Yellow => caution_count += 1,
            RiskBadge::Green => neutral_count += 1,
        }
    }

    RiskEngineResult {
        region: prefs.region,
        flagged_count,
        caution_count,
        neutral_count,
        items,
    }
}
