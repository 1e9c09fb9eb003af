use anyhow::{Context, Result};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::PackError;
use crate::registry::AdditiveRegistry;

/// === Embedded sample pack ===
pub const SAMPLE_PACK_NAME: &str = "payload.json";
pub const SAMPLE_PACK_JSON: &str = include_str!("../assets/sample_pack.json");

/// Seven-additive pack (E102, E120, E129, E220, E330, E904, E951) with EU/US rules.
pub fn sample_pack_json() -> &'static str {
    SAMPLE_PACK_JSON
}

pub fn sample_registry() -> Result<AdditiveRegistry, PackError> {
    AdditiveRegistry::from_json(SAMPLE_PACK_JSON)
}

/// Seed the sample pack as `<dir>/payload.json` unless a payload already exists.
/// Returns the path when a file was written.
pub fn write_sample_pack(dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("create_dir_all({:?})", dir))?;

    let path = dir.join(SAMPLE_PACK_NAME);
    if path.exists() {
        return Ok(None);
    }
    fs::write(&path, SAMPLE_PACK_JSON).with_context(|| format!("write {:?}", path))?;
    Ok(Some(path))
}
