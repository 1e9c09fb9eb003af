use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegionCode {
    #[serde(rename = "EU")]
    Eu,
    #[serde(rename = "US")]
    Us,
}

impl RegionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegionCode::Eu => "EU",
            RegionCode::Us => "US",
        }
    }
}

impl fmt::Display for RegionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RegionCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EU" => Ok(RegionCode::Eu),
            "US" => Ok(RegionCode::Us),
            other => Err(format!("unknown region code {other:?} (expected EU or US)")),
        }
    }
}

/// Diet keys, in the order the classifier walks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Diet {
    Vegan,
    Vegetarian,
    Kosher,
    Halal,
}

impl Diet {
    pub const ALL: [Diet; 4] = [Diet::Vegan, Diet::Vegetarian, Diet::Kosher, Diet::Halal];

    pub fn as_str(&self) -> &'static str {
        match self {
            Diet::Vegan => "vegan",
            Diet::Vegetarian => "vegetarian",
            Diet::Kosher => "kosher",
            Diet::Halal => "halal",
        }
    }

    /// "vegan" -> "Vegan"; used as an audience label.
    pub fn title(&self) -> &'static str {
        match self {
            Diet::Vegan => "Vegan",
            Diet::Vegetarian => "Vegetarian",
            Diet::Kosher => "Kosher",
            Diet::Halal => "Halal",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DietaryFlags {
    #[serde(default)]
    pub vegan: bool,
    #[serde(default)]
    pub vegetarian: bool,
    #[serde(default)]
    pub kosher: bool,
    #[serde(default)]
    pub halal: bool,
}

impl DietaryFlags {
    pub fn get(&self, diet: Diet) -> bool {
        match diet {
            Diet::Vegan => self.vegan,
            Diet::Vegetarian => self.vegetarian,
            Diet::Kosher => self.kosher,
            Diet::Halal => self.halal,
        }
    }

    pub fn set(&mut self, diet: Diet, value: bool) {
        match diet {
            Diet::Vegan => self.vegan = value,
            Diet::Vegetarian => self.vegetarian = value,
            Diet::Kosher => self.kosher = value,
            Diet::Halal => self.halal = value,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFlags {
    #[serde(default)]
    pub animal: bool,
    #[serde(default)]
    pub insect: bool,
    #[serde(default)]
    pub plant: bool,
    #[serde(default)]
    pub synthetic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvidenceLevel {
    Regulatory,
    Consensus,
    Limited,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopulationCondition {
    Child,
    Pku,
    Sulfites,
    Caffeine,
    Aspartame,
    Shellfish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CautionSeverity {
    Red,
    Yellow,
}

/// Fields shared by every rule variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleBase {
    pub id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<Vec<String>>,
    #[serde(rename = "referenceIds", default)]
    pub reference_ids: Vec<String>,
}

/// A region-scoped rule. The `type` tag in the pack selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionRule {
    #[serde(flatten)]
    pub base: RuleBase,
    #[serde(flatten)]
    pub kind: RuleKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleKind {
    RegulatoryWarning,
    RegionApproval {
        approved: bool,
    },
    PopulationCaution {
        condition: PopulationCondition,
        severity: CautionSeverity,
    },
    DietConflict {
        diet: Diet,
    },
    EvidenceAnnotation,
    /// Tag not known to this build. Kept so newer packs still load; the
    /// classifier dispatches it explicitly as a no-op.
    #[serde(other)]
    Unrecognized,
}

/// Region-agnostic caution stored on the record itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopulationCautionRule {
    #[serde(flatten)]
    pub base: RuleBase,
    pub condition: PopulationCondition,
    pub severity: CautionSeverity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditiveRecord {
    pub code: String,
    #[serde(default)]
    pub names: Vec<String>,
    pub class: String,
    pub evidence_level: EvidenceLevel,
    pub plain_summary: String,
    pub dietary: DietaryFlags,
    pub source: SourceFlags,
    #[serde(default)]
    pub population_cautions: Vec<PopulationCautionRule>,
    #[serde(default)]
    pub region_rules: BTreeMap<RegionCode, Vec<RegionRule>>,
    #[serde(default)]
    pub references: Vec<Reference>,
}

impl AdditiveRecord {
    /// First declared name, else the code.
    pub fn display_name(&self) -> &str {
        self.names.first().map(String::as_str).unwrap_or(&self.code)
    }

    pub fn rules_for(&self, region: RegionCode) -> &[RegionRule] {
        self.region_rules
            .get(&region)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reference(&self, id: &str) -> Option<&Reference> {
        self.references.iter().find(|r| r.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdditivePack {
    pub version: String,
    #[serde(default)]
    pub checksum: String,
    pub generated_at: String,
    pub additives: Vec<AdditiveRecord>,
    #[serde(default)]
    pub alias_index: BTreeMap<String, String>,
}
