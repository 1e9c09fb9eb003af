// nutriscan-core/src/lib.rs

pub mod config;
pub mod services;
pub mod utils;

pub use config::CoreConfig;
pub use services::{
    LoadReport, PackLoader, PackMeta, ScanOptions, ScanReport, Scanner, load_pack_from_root,
};
pub use services::scanner::sample_scanner;
