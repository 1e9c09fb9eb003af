//! services/scanner.rs
//! The scan pipeline: label text -> tokens -> registry lookup -> risk result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use additives::{
    AdditiveRegistry, LookupOptions, LookupResult, RiskEngineResult, Token, UserPreferences,
    parse_ingredients, run_risk_engine, sample_registry,
};
use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Serialize;

use crate::config::{CoreConfig, LookupConfig};
use crate::services::loader::PackLoader;
use crate::utils::logbook::emit_event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub allow_fuzzy: bool,
    pub max_tokens: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        LookupConfig::default().into()
    }
}

impl From<LookupConfig> for ScanOptions {
    fn from(cfg: LookupConfig) -> Self {
        Self {
            allow_fuzzy: cfg.allow_fuzzy,
            max_tokens: cfg.max_tokens,
        }
    }
}

impl ScanOptions {
    fn lookup(&self) -> LookupOptions {
        LookupOptions {
            allow_fuzzy: self.allow_fuzzy,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub pack_version: String,
    pub tokens: Vec<Token>,
    /// Tokens dropped past `max_tokens`.
    pub truncated: usize,
    pub lookup: LookupResult,
    pub risk: RiskEngineResult,
}

#[derive(Debug, Clone)]
pub struct Scanner {
    registry: Arc<AdditiveRegistry>,
    options: ScanOptions,
    logbook: Option<PathBuf>,
}

impl Scanner {
    pub fn new(registry: Arc<AdditiveRegistry>, options: ScanOptions) -> Self {
        Self {
            registry,
            options,
            logbook: None,
        }
    }

    /// Load the configured pack and wire the logbook if it is enabled.
    pub fn from_config(cfg: &CoreConfig) -> Result<Self> {
        let loader = PackLoader::new(cfg.pack.clone());
        let (registry, report) = loader.load()?;
        let mut scanner = Self::new(Arc::new(registry), cfg.lookup.clone().into());
        if cfg.logbook.enabled {
            let data = serde_json::to_value(&report)?;
            record_event(&cfg.logbook.path, "pack_loaded", data);
            scanner = scanner.with_logbook(&cfg.logbook.path);
        }
        Ok(scanner)
    }

    pub fn with_logbook(mut self, path: &Path) -> Self {
        self.logbook = Some(path.to_path_buf());
        self
    }

    pub fn with_options(mut self, options: ScanOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &AdditiveRegistry {
        &self.registry
    }

    pub fn options(&self) -> ScanOptions {
        self.options
    }

    pub fn scan(&self, text: &str, prefs: &UserPreferences) -> Result<ScanReport> {
        let mut tokens = parse_ingredients(text);
        let mut truncated = 0;
        if tokens.len() > self.options.max_tokens {
            truncated = tokens.len() - self.options.max_tokens;
            tracing::warn!(
                total = tokens.len(),
                max_tokens = self.options.max_tokens,
                "label produced too many tokens; dropping the tail"
            );
            tokens.truncate(self.options.max_tokens);
        }

        let lookup = self.registry.lookup(&tokens, self.options.lookup());
        let risk = run_risk_engine(&lookup.matches, prefs);
        tracing::debug!(
            tokens = tokens.len(),
            matches = lookup.matches.len(),
            unresolved = lookup.unresolved.len(),
            flagged = risk.flagged_count,
            "scan complete"
        );

        let report = ScanReport {
            pack_version: self.registry.version().to_string(),
            tokens,
            truncated,
            lookup,
            risk,
        };
        if let Some(path) = &self.logbook {
            record_event(path, "scan", scan_summary(&report));
        }
        Ok(report)
    }
}

// Logbook writes never fail a load or a scan.
fn record_event(path: &Path, event: &str, data: serde_json::Value) {
    if let Err(e) = emit_event(path, event, data) {
        tracing::warn!(path = %path.display(), event, "logbook write failed: {e:#}");
    }
}

fn scan_summary(report: &ScanReport) -> serde_json::Value {
    serde_json::json!({
        "pack_version": report.pack_version,
        "region": report.risk.region,
        "tokens": report.tokens.len(),
        "truncated": report.truncated,
        "matches": report.lookup.matches.len(),
        "unresolved": report.lookup.unresolved.len(),
        "flagged": report.risk.flagged_count,
        "caution": report.risk.caution_count,
        "neutral": report.risk.neutral_count,
    })
}

static SAMPLE: OnceCell<Scanner> = OnceCell::new();

/// Process-wide scanner over the embedded sample pack, built on first use.
pub fn sample_scanner() -> Result<&'static Scanner> {
    SAMPLE.get_or_try_init(|| {
        let registry = sample_registry().context("embedded sample pack")?;
        Ok(Scanner::new(Arc::new(registry), ScanOptions::default()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use additives::{RegionCode, RiskBadge};

    #[test]
    fn sample_scanner_is_shared() {
        let a = sample_scanner().unwrap() as *const Scanner;
        let b = sample_scanner().unwrap() as *const Scanner;
        assert_eq!(a, b);
    }

    #[test]
    fn scan_runs_the_full_pipeline() {
        let scanner = sample_scanner().unwrap();
        let report = scanner
            .scan("Sugar, Tartrazine (E102)", &UserPreferences::new(RegionCode::Eu))
            .unwrap();
        assert_eq!(report.tokens.len(), 3);
        // the name and the code resolve to the same additive
        assert_eq!(report.lookup.matches.len(), 1);
        assert_eq!(report.lookup.unresolved.len(), 1);
        assert_eq!(report.risk.items.len(), 1);
        assert_eq!(report.risk.items[0].badge, RiskBadge::Red);
        assert_eq!(report.truncated, 0);
    }

    #[test]
    fn tokens_past_the_cap_are_dropped() {
        let scanner = sample_scanner()
            .unwrap()
            .clone()
            .with_options(ScanOptions {
                allow_fuzzy: false,
                max_tokens: 1,
            });
        let report = scanner
            .scan("E330, E102", &UserPreferences::new(RegionCode::Eu))
            .unwrap();
        assert_eq!(report.tokens.len(), 1);
        assert_eq!(report.truncated, 1);
        assert_eq!(report.risk.items.len(), 1);
        assert_eq!(report.risk.items[0].code, "E330");
    }

    #[test]
    fn unwritable_logbook_does_not_fail_the_scan() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();
        let path = blocker.join("scans.jsonl");

        let scanner = sample_scanner().unwrap().clone().with_logbook(&path);
        let report = scanner
            .scan("E102", &UserPreferences::new(RegionCode::Eu))
            .unwrap();
        assert_eq!(report.risk.items.len(), 1);
        assert_eq!(report.risk.items[0].badge, RiskBadge::Red);
        assert!(!path.exists());
    }
}
