#![doc = include_str!("../README.md")]

pub mod analysis;
pub mod cleanup;
pub mod cli;
pub mod loader;
pub mod record;
pub mod repair;
pub mod report;
pub mod smart_reader;
pub mod sniff;
pub mod source;
pub mod stats;
pub mod summary;

pub use analysis::{
    AnalysisError, analyze, analyze_batch, process_upload, process_upload_batch, validate,
};
pub use record::{InfoValue, VariantKind, VariantRecord};
pub use report::{AnalysisReport, TsTvRatio, ValidationResult};
pub use stats::RawDistributions;
pub use summary::{Stats, SummaryStats, summarize};
