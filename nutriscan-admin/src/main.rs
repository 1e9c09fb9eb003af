use std::path::PathBuf;

use additives::{write_sample_pack, AdditiveRecord, RegionCode, UserPreferences};
use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use nutriscan_core::{sample_scanner, CoreConfig, PackLoader, ScanOptions, Scanner};
use serde::Serialize;
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "nutriscan-admin",
    about = "Scan ingredient labels and inspect NutriScan additive packs"
)]
struct Cli {
    /// Project root holding nutriscan.toml and etl/output
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Tokenize label text, resolve additives and classify them
    Scan(ScanArgs),
    /// Print one additive record by code (loose spellings accepted)
    Show { code: String },
    /// List the regions the pack carries rules for
    Regions,
    /// Print pack version, checksum and counts
    Info,
    /// Seed the embedded sample pack into the configured output directory
    InitSample,
}

#[derive(Args)]
struct ScanArgs {
    #[arg(long)]
    text: String,
    /// EU or US; defaults to the configured preference
    #[arg(long)]
    region: Option<String>,
    #[arg(long)]
    vegan: bool,
    #[arg(long)]
    vegetarian: bool,
    #[arg(long)]
    kosher: bool,
    #[arg(long)]
    halal: bool,
    #[arg(long)]
    pku: bool,
    #[arg(long)]
    sulfites: bool,
    #[arg(long)]
    caffeine: bool,
    #[arg(long)]
    aspartame: bool,
    #[arg(long)]
    shellfish: bool,
    #[arg(long)]
    child: bool,
    /// Enable the fuzzy alias tier
    #[arg(long)]
    fuzzy: bool,
    /// Use the embedded sample pack instead of etl/output
    #[arg(long)]
    sample: bool,
}

impl ScanArgs {
    /// Command-line flags only switch preferences on; config values stay otherwise.
    fn apply(&self, mut prefs: UserPreferences) -> Result<UserPreferences> {
        if let Some(region) = &self.region {
            prefs.region = region.parse::<RegionCode>().map_err(|e| anyhow!(e))?;
        }
        prefs.diet.vegan |= self.vegan;
        prefs.diet.vegetarian |= self.vegetarian;
        prefs.diet.kosher |= self.kosher;
        prefs.diet.halal |= self.halal;
        prefs.sensitivities.pku |= self.pku;
        prefs.sensitivities.sulfites |= self.sulfites;
        prefs.sensitivities.caffeine |= self.caffeine;
        prefs.sensitivities.aspartame |= self.aspartame;
        prefs.sensitivities.shellfish |= self.shellfish;
        prefs.child_mode |= self.child;
        Ok(prefs)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = CoreConfig::load(&cli.root)
        .with_context(|| format!("loading config under {}", cli.root.display()))?;
    match cli.cmd {
        Cmd::Scan(args) => scan(&cfg, &args),
        Cmd::Show { code } => show(&cfg, &code),
        Cmd::Regions => regions(&cfg),
        Cmd::Info => info(&cfg),
        Cmd::InitSample => init_sample(&cfg),
    }
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn scan(cfg: &CoreConfig, args: &ScanArgs) -> Result<()> {
    let prefs = args.apply(cfg.preferences)?;
    let mut options = ScanOptions::from(cfg.lookup.clone());
    options.allow_fuzzy |= args.fuzzy;

    let scanner = if args.sample {
        sample_scanner()?.clone().with_options(options)
    } else {
        Scanner::from_config(cfg)?.with_options(options)
    };
    let report = scanner.scan(&args.text, &prefs)?;
    print_json(&report)
}

fn load(cfg: &CoreConfig) -> Result<additives::AdditiveRegistry> {
    PackLoader::new(cfg.pack.clone())
        .load()
        .map(|(registry, _)| registry)
}

fn show(cfg: &CoreConfig, code: &str) -> Result<()> {
    let registry = load(cfg)?;
    let record: &AdditiveRecord = registry
        .find_by_code(code)
        .ok_or_else(|| anyhow!("no additive with code {code:?} in pack {}", registry.version()))?;
    print_json(record)
}

fn regions(cfg: &CoreConfig) -> Result<()> {
    let registry = load(cfg)?;
    print_json(&registry.list_regions())
}

fn info(cfg: &CoreConfig) -> Result<()> {
    let (_, report) = PackLoader::new(cfg.pack.clone()).load()?;
    print_json(&report)
}

fn init_sample(cfg: &CoreConfig) -> Result<()> {
    let written = write_sample_pack(&cfg.pack.output_dir)?;
    match &written {
        Some(path) => tracing::info!("seeded sample pack at {}", path.display()),
        None => tracing::info!("payload already present in {}", cfg.pack.output_dir.display()),
    }
    print_json(&json!({
        "output_dir": cfg.pack.output_dir,
        "written": written.is_some(),
    }))
}
