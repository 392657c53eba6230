//
// lib.rs
// Mri-Stats-rs
//
// Exposes the region statistics engine and re-exports the CLI entry point for both binary and library consumers.
//
// Thales Matheus Mendonça Santos - October 2026

// Engine stages, leaves first, followed by I/O and CLI glue.
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod groups;
pub mod json;
pub mod lookup_table;
pub mod metadata;
pub mod models;
pub mod report;
pub mod resolver;
pub mod stats;
pub mod volume;

pub use cli::{run as run_cli, Cli, Commands};
pub use config::StatsConfig;
pub use engine::generate_report;
pub use error::StatsError;
pub use lookup_table::{LookupEntry, LookupTable};
pub use models::{Report, StatRecord};
pub use resolver::{resolve_groups, GroupSpec};
pub use volume::{Affine, Segmentation, Volume};
