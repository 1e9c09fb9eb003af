//! services/signature.rs
//! Pack metadata (`meta.json`) and Ed25519 signatures over the pack checksum.
//!
//! The signed message is the raw 32 bytes of the hex-decoded SHA-256 checksum,
//! so a signature stays valid for any byte-identical payload regardless of
//! how `meta.json` is formatted.

use std::collections::BTreeSet;

use anyhow::{Context, Result, anyhow, ensure};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Contents of `meta.json`, published next to `payload.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackMeta {
    pub version: String,
    pub regions: Vec<String>,
    pub checksum: String,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub diff_from: Option<String>,
}

impl PackMeta {
    /// Build unsigned metadata from a payload whose checksum already verified.
    pub fn derive(payload: &Value, checksum: &str) -> Result<Self> {
        let version = payload
            .get("version")
            .and_then(Value::as_str)
            .ok_or_else(|| anyhow!("payload has no version"))?
            .to_string();

        let mut regions = BTreeSet::new();
        for additive in payload
            .get("additives")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(rules) = additive.get("region_rules").and_then(Value::as_object) {
                regions.extend(rules.keys().map(|k| k.to_uppercase()));
            }
        }

        Ok(Self {
            version,
            regions: regions.into_iter().collect(),
            checksum: checksum.to_string(),
            signature: None,
            diff_from: None,
        })
    }
}

fn key_bytes(hex_key: &str, what: &str) -> Result<[u8; 32]> {
    let raw = hex::decode(hex_key.trim().trim_start_matches("ed25519:"))
        .with_context(|| format!("{what} must be hex encoded"))?;
    raw.try_into()
        .map_err(|_| anyhow!("Ed25519 {what}s must be 32 bytes"))
}

fn checksum_message(checksum: &str) -> Result<Vec<u8>> {
    hex::decode(checksum).context("checksum must be hex encoded")
}

/// Sign `checksum` with a hex secret key; returns the hex signature.
pub fn sign_checksum(sk_hex: &str, checksum: &str) -> Result<String> {
    let sk = SigningKey::from_bytes(&key_bytes(sk_hex, "private key")?);
    let sig: Signature = sk.sign(&checksum_message(checksum)?);
    Ok(hex::encode(sig.to_bytes()))
}

/// Hex public key for a hex secret key.
pub fn public_key_hex(sk_hex: &str) -> Result<String> {
    let sk = SigningKey::from_bytes(&key_bytes(sk_hex, "private key")?);
    Ok(hex::encode(sk.verifying_key().to_bytes()))
}

/// Verify `meta` against the payload checksum and a hex public key.
pub fn verify_meta(meta: &PackMeta, payload_checksum: &str, pk_hex: &str) -> Result<()> {
    ensure!(!payload_checksum.is_empty(), "checksum missing");
    let signature_hex = meta
        .signature
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow!("signature missing"))?;
    ensure!(
        meta.checksum.eq_ignore_ascii_case(payload_checksum),
        "checksum mismatch between payload and meta"
    );

    let vk = VerifyingKey::from_bytes(&key_bytes(pk_hex, "public key")?)
        .map_err(|e| anyhow!("invalid public key: {e}"))?;
    let sig_bytes = hex::decode(signature_hex).context("signature must be hex encoded")?;
    let sig = Signature::from_slice(&sig_bytes).map_err(|e| anyhow!("malformed signature: {e}"))?;
    vk.verify(&checksum_message(payload_checksum)?, &sig)
        .map_err(|_| anyhow!("signature verification failed"))
}

/// Accept the pack if any trusted key verifies it.
pub fn verify_with_any(meta: &PackMeta, payload_checksum: &str, trusted: &[String]) -> Result<()> {
    ensure!(!trusted.is_empty(), "no trusted keys configured");
    let mut last_err = None;
    for key in trusted {
        match verify_meta(meta, payload_checksum, key) {
            Ok(()) => return Ok(()),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("signature verification failed")))
}
