//! Analysis results and their JSON projections.

use std::{collections::BTreeMap, path::Path};

use serde::Serialize;

use crate::{
    loader::LoadOutcome,
    record::VariantKind,
    sniff::FormatKind,
    stats::RawDistributions,
    summary::{SummaryStats, summarize},
};

/// Transition/transversion ratio; undefined when there are no transversions.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TsTvRatio {
    Defined(f64),
    Undefined,
}

impl TsTvRatio {
    pub fn from_counts(transitions: u64, transversions: u64) -> Self {
        if transversions == 0 {
            Self::Undefined
        } else {
            Self::Defined(transitions as f64 / transversions as f64)
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(ratio) => Some(*ratio),
            Self::Undefined => None,
        }
    }
}

/// Immutable result of one analysis run.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisReport {
    raw: RawDistributions,
    pub ts_tv_ratio: TsTvRatio,
    pub quality: SummaryStats,
    pub depth: SummaryStats,
    pub allele_frequency: SummaryStats,
    pub hwe: SummaryStats,
    pub inbreeding_coefficient: SummaryStats,
}

impl AnalysisReport {
    pub fn from_raw(raw: RawDistributions) -> Self {
        Self {
            ts_tv_ratio: TsTvRatio::from_counts(raw.transitions, raw.transversions),
            quality: summarize(&raw.qualities),
            depth: summarize(&raw.depths),
            allele_frequency: summarize(&raw.allele_frequencies),
            hwe: summarize(&raw.hwe),
            inbreeding_coefficient: summarize(&raw.inbreeding_coefficients),
            raw,
        }
    }

    pub fn raw(&self) -> &RawDistributions {
        &self.raw
    }

    pub fn record_count(&self) -> u64 {
        self.raw.record_count()
    }

    pub fn is_empty(&self) -> bool {
        self.record_count() == 0
    }

    pub fn chromosomes(&self) -> &BTreeMap<String, u64> {
        &self.raw.chromosomes
    }

    pub fn variant_types(&self) -> &BTreeMap<VariantKind, u64> {
        &self.raw.variant_types
    }

    pub fn consequences(&self) -> &BTreeMap<String, u64> {
        &self.raw.consequences
    }

    /// Serializable view. Raw sequences are only included on request since
    /// they grow with the input.
    pub fn payload(&self, include_raw: bool) -> ReportPayload<'_> {
        ReportPayload {
            record_count: self.record_count(),
            chromosomes: &self.raw.chromosomes,
            variant_types: &self.raw.variant_types,
            transitions: self.raw.transitions,
            transversions: self.raw.transversions,
            ts_tv_ratio: self.ts_tv_ratio,
            quality_stats: self.quality,
            depth_stats: self.depth,
            af_stats: self.allele_frequency,
            hwe_stats: self.hwe,
            inbreeding_stats: self.inbreeding_coefficient,
            consequences: &self.raw.consequences,
            distributions: include_raw.then_some(&self.raw),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ReportPayload<'a> {
    pub record_count: u64,
    pub chromosomes: &'a BTreeMap<String, u64>,
    pub variant_types: &'a BTreeMap<VariantKind, u64>,
    pub transitions: u64,
    pub transversions: u64,
    pub ts_tv_ratio: TsTvRatio,
    pub quality_stats: SummaryStats,
    pub depth_stats: SummaryStats,
    pub af_stats: SummaryStats,
    pub hwe_stats: SummaryStats,
    pub inbreeding_stats: SummaryStats,
    pub consequences: &'a BTreeMap<String, u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distributions: Option<&'a RawDistributions>,
}

/// Pre-flight validation payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
}

impl From<&LoadOutcome> for ValidationResult {
    fn from(outcome: &LoadOutcome) -> Self {
        Self {
            valid: outcome.is_usable(),
            error: outcome.error.clone(),
        }
    }
}

/// Complete report of one run, as written by the command line tool.
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub version: &'static str,
    /// RFC 3339
    pub timestamp: String,
    pub input: InputInfo,
    pub analysis: ReportPayload<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputInfo {
    pub path: String,
    pub analyzed_path: String,
    pub kind: FormatKind,
    pub compressed: bool,
    pub repaired: bool,
}

impl InputInfo {
    pub fn new(path: &Path, outcome: &LoadOutcome) -> Self {
        let (kind, compressed) = outcome
            .sniffed
            .map(|s| (s.kind, s.compressed))
            .unwrap_or((FormatKind::Unknown, false));
        Self {
            path: path.display().to_string(),
            analyzed_path: outcome.path.display().to_string(),
            kind,
            compressed,
            repaired: outcome.repaired,
        }
    }
}

impl<'a> RunReport<'a> {
    pub fn new(input: InputInfo, report: &'a AnalysisReport, include_raw: bool) -> Self {
        let timestamp = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            version: env!("CARGO_PKG_VERSION"),
            timestamp,
            input,
            analysis: report.payload(include_raw),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json)?;
        tracing::info!("Wrote run report to {}", path.display());
        Ok(())
    }
}
