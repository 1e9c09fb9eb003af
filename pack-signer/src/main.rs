use std::fs;
use std::path::{Path, PathBuf};

use additives::{canonical_checksum, stamp_checksum, verify_checksum};
use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use nutriscan_core::services::signature::{public_key_hex, sign_checksum, verify_meta, PackMeta};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pack-signer", about = "Derive, sign and verify NutriScan pack metadata")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Write an unsigned meta.json for a payload whose checksum verifies
    Meta {
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
        /// Version this pack was diffed against, if any
        #[arg(long)]
        diff_from: Option<String>,
    },
    /// Sign the pack checksum and store the signature in meta.json
    Sign {
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
        #[arg(long, value_name = "FILE")]
        meta: PathBuf,
        /// Ed25519 secret key hex (optionally prefixed "ed25519:")
        #[arg(long)]
        sk_hex: String,
    },
    /// Verify payload checksum and meta.json signature against a public key
    Verify {
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
        #[arg(long, value_name = "FILE")]
        meta: PathBuf,
        #[arg(long)]
        pk_hex: String,
    },
    /// Print the canonical checksum of a payload
    Checksum {
        #[arg(long, value_name = "FILE")]
        payload: PathBuf,
        /// Rewrite the payload with the computed checksum stamped in
        #[arg(long)]
        stamp: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Meta { payload, out, diff_from } => cmd_meta(&payload, &out, diff_from),
        Cmd::Sign { payload, meta, sk_hex } => cmd_sign(&payload, &meta, &sk_hex),
        Cmd::Verify { payload, meta, pk_hex } => cmd_verify(&payload, &meta, &pk_hex),
        Cmd::Checksum { payload, stamp } => cmd_checksum(&payload, stamp),
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).with_context(|| format!("read {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("parse {:?}", path))
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).with_context(|| format!("mkdir -p {:?}", parent))?;
    }
    fs::write(path, serde_json::to_vec_pretty(value)?).with_context(|| format!("write {:?}", path))
}

fn verified_payload(path: &Path) -> Result<(Value, String)> {
    let payload = read_json(path)?;
    let checksum =
        verify_checksum(&payload).with_context(|| format!("checksum of {:?}", path))?;
    Ok((payload, checksum))
}

fn read_meta(path: &Path) -> Result<PackMeta> {
    serde_json::from_value(read_json(path)?).with_context(|| format!("meta shape in {:?}", path))
}

fn cmd_meta(payload_path: &Path, out: &Path, diff_from: Option<String>) -> Result<()> {
    let (payload, checksum) = verified_payload(payload_path)?;
    let mut meta = PackMeta::derive(&payload, &checksum)?;
    meta.diff_from = diff_from;
    write_json(out, &meta)?;
    tracing::info!(version = %meta.version, regions = ?meta.regions, "wrote {:?}", out);
    println!("{}", serde_json::to_string_pretty(&meta)?);
    Ok(())
}

fn cmd_sign(payload_path: &Path, meta_path: &Path, sk_hex: &str) -> Result<()> {
    let (_, checksum) = verified_payload(payload_path)?;
    let mut meta = read_meta(meta_path)?;
    ensure!(
        meta.checksum.eq_ignore_ascii_case(&checksum),
        "meta checksum {} does not match payload checksum {}",
        meta.checksum,
        checksum
    );
    meta.signature = Some(sign_checksum(sk_hex, &checksum)?);
    write_json(meta_path, &meta)?;
    let public_key = public_key_hex(sk_hex)?;
    tracing::info!(version = %meta.version, %public_key, "signed pack");
    let signed = json!({ "version": meta.version, "checksum": checksum, "public_key": public_key });
    println!("{signed}");
    Ok(())
}

fn cmd_verify(payload_path: &Path, meta_path: &Path, pk_hex: &str) -> Result<()> {
    let (_, checksum) = verified_payload(payload_path)?;
    let meta = read_meta(meta_path)?;
    verify_meta(&meta, &checksum, pk_hex)?;
    println!("{}", json!({ "version": meta.version, "checksum": checksum, "verified": true }));
    Ok(())
}

fn cmd_checksum(payload_path: &Path, stamp: bool) -> Result<()> {
    let mut payload = read_json(payload_path)?;
    let checksum = if stamp {
        let checksum = stamp_checksum(&mut payload)?;
        write_json(payload_path, &payload)?;
        tracing::info!("stamped checksum into {:?}", payload_path);
        checksum
    } else {
        canonical_checksum(&payload)?
    };
    println!("{checksum}");
    Ok(())
}
