use additives::UserPreferences;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "nutriscan.toml";
pub const PACK_DIR_ENV: &str = "NS_PACK_OUTPUT_DIR";

#[derive(Debug, Clone, Deserialize)]
pub struct CoreConfig {
    #[serde(default)]
    pub pack: PackConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub logbook: LogbookConfig,
}

impl CoreConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(CONFIG_FILE);
        let mut cfg = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            Self::from_toml(&text)
                .with_context(|| format!("parsing config file {}", path.display()))?
        } else {
            tracing::info!(
                "No config file found at {}. Using CoreConfig::default().",
                path.display()
            );
            CoreConfig::default()
        };
        if let Some(dir) = std::env::var_os(PACK_DIR_ENV) {
            tracing::debug!(?dir, "pack output dir overridden by {PACK_DIR_ENV}");
            cfg.pack.output_dir = PathBuf::from(dir);
        }
        cfg.resolve_paths(root);
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str::<CoreConfig>(text)?)
    }

    fn resolve_paths(&mut self, root: &Path) {
        self.pack.output_dir = absolutize(root, &self.pack.output_dir);
        self.logbook.path = absolutize(root, &self.logbook.path);
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pack: PackConfig::default(),
            lookup: LookupConfig::default(),
            preferences: UserPreferences::default(),
            logbook: LogbookConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PackConfig {
    #[serde(default = "PackConfig::default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default = "PackConfig::default_payload_file")]
    pub payload_file: String,
    #[serde(default = "PackConfig::default_meta_file")]
    pub meta_file: String,
    #[serde(default = "PackConfig::default_true")]
    pub verify_checksum: bool,
    #[serde(default)]
    pub require_signature: bool,
    /// Hex-encoded Ed25519 public keys accepted for pack signatures.
    #[serde(default)]
    pub trusted_keys: Vec<String>,
}

impl PackConfig {
    fn default_output_dir() -> PathBuf {
        PathBuf::from("etl/output")
    }

    fn default_payload_file() -> String {
        "payload.json".to_string()
    }

    fn default_meta_file() -> String {
        "meta.json".to_string()
    }

    fn default_true() -> bool {
        true
    }

    pub fn payload_path(&self) -> PathBuf {
        self.output_dir.join(&self.payload_file)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.output_dir.join(&self.meta_file)
    }
}

impl Default for PackConfig {
    fn default() -> Self {
        Self {
            output_dir: Self::default_output_dir(),
            payload_file: Self::default_payload_file(),
            meta_file: Self::default_meta_file(),
            verify_checksum: true,
            require_signature: false,
            trusted_keys: vec![],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LookupConfig {
    #[serde(default)]
    pub allow_fuzzy: bool,
    /// Upper bound on tokens per scan; keeps the fuzzy tier's linear scan bounded.
    #[serde(default = "LookupConfig::default_max_tokens")]
    pub max_tokens: usize,
}

impl LookupConfig {
    fn default_max_tokens() -> usize {
        256
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            allow_fuzzy: false,
            max_tokens: Self::default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogbookConfig {
    #[serde(default = "LogbookConfig::default_enabled")]
    pub enabled: bool,
    #[serde(default = "LogbookConfig::default_path")]
    pub path: PathBuf,
}

impl LogbookConfig {
    fn default_enabled() -> bool {
        true
    }

    fn default_path() -> PathBuf {
        PathBuf::from("logbook/scans.jsonl")
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            path: Self::default_path(),
        }
    }
}

fn absolutize(root: &Path, value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        root.join(value)
    }
}
