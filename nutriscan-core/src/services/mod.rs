// src/services/mod.rs

pub mod loader;     // etl/output convention + integrity checks
pub mod scanner;    // text -> tokens -> lookup -> risk
pub mod signature;  // meta.json + Ed25519

// Public API
pub use loader::{LoadReport, PackLoader, load_pack_from_root};
pub use scanner::{ScanOptions, ScanReport, Scanner};
pub use signature::PackMeta;
