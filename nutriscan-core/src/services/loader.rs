//! services/loader.rs
//! Resolve the pack from the `etl/output` convention, check its integrity, and
//! build the registry. Any failure is fatal: no partial or empty registry.

use std::fs;
use std::path::{Path, PathBuf};

use additives::{AdditiveRegistry, verify_checksum};
use anyhow::{Context, Result, ensure};
use serde_json::Value;

use crate::config::PackConfig;
use crate::services::signature::{PackMeta, verify_with_any};

/// Summary of a successful load, suitable for logging.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LoadReport {
    pub payload_path: PathBuf,
    pub version: String,
    pub checksum: String,
    pub additives: usize,
    pub aliases: usize,
    pub checksum_verified: bool,
    pub signature_verified: bool,
}

#[derive(Debug, Clone)]
pub struct PackLoader {
    config: PackConfig,
}

impl PackLoader {
    pub fn new(config: PackConfig) -> Self {
        Self { config }
    }

    pub fn payload_path(&self) -> PathBuf {
        self.config.payload_path()
    }

    pub fn meta_path(&self) -> PathBuf {
        self.config.meta_path()
    }

    pub fn load(&self) -> Result<(AdditiveRegistry, LoadReport)> {
        let payload_path = self.payload_path();
        let payload = read_json(&payload_path)?;

        let mut checksum_verified = false;
        if self.config.verify_checksum {
            verify_checksum(&payload)
                .with_context(|| format!("verifying checksum of {}", payload_path.display()))?;
            checksum_verified = true;
        }

        let mut signature_verified = false;
        if self.config.require_signature {
            let meta_path = self.meta_path();
            let meta: PackMeta = serde_json::from_value(read_json(&meta_path)?)
                .with_context(|| format!("parsing pack meta {}", meta_path.display()))?;
            let checksum = payload
                .get("checksum")
                .and_then(Value::as_str)
                .unwrap_or_default();
            verify_with_any(&meta, checksum, &self.config.trusted_keys)
                .with_context(|| format!("verifying signature in {}", meta_path.display()))?;
            signature_verified = true;
        }

        let registry = AdditiveRegistry::from_value(payload)
            .with_context(|| format!("building registry from {}", payload_path.display()))?;
        ensure!(!registry.is_empty(), "pack {} contains no additives", payload_path.display());

        let report = LoadReport {
            payload_path,
            version: registry.version().to_string(),
            checksum: registry.checksum().to_string(),
            additives: registry.len(),
            aliases: registry.alias_count(),
            checksum_verified,
            signature_verified,
        };
        tracing::info!(
            version = %report.version,
            additives = report.additives,
            checksum_verified,
            signature_verified,
            "additive pack loaded"
        );
        Ok((registry, report))
    }
}

/// Load `<root>/etl/output/payload.json` with default settings.
pub fn load_pack_from_root(root: &Path) -> Result<AdditiveRegistry> {
    let config = PackConfig {
        output_dir: root.join("etl").join("output"),
        ..PackConfig::default()
    };
    PackLoader::new(config).load().map(|(registry, _)| registry)
}

pub(crate) fn read_json(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse JSON {}", path.display()))
}
