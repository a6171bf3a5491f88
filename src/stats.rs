//! Single-pass aggregation of raw distributions over a record stream.

use std::{
    collections::BTreeMap,
    io,
    sync::atomic::{AtomicBool, Ordering},
};

use serde::Serialize;
use thiserror::Error;

use crate::{
    record::{VariantKind, VariantRecord},
    source::VariantSource,
};

pub const DEPTH_KEY: &str = "DP";
pub const HWE_KEY: &str = "HWE";
pub const INBREEDING_KEY: &str = "InbreedingCoeff";
pub const CONSEQUENCE_KEY: &str = "CSQ";

/// Raw accumulator owned by exactly one analysis run.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RawDistributions {
    pub chromosomes: BTreeMap<String, u64>,
    pub variant_types: BTreeMap<VariantKind, u64>,
    pub qualities: Vec<f64>,
    pub depths: Vec<f64>,
    pub allele_frequencies: Vec<f64>,
    pub transitions: u64,
    pub transversions: u64,
    pub hwe: Vec<f64>,
    pub inbreeding_coefficients: Vec<f64>,
    pub consequences: BTreeMap<String, u64>,
}

impl RawDistributions {
    /// Fold one record into the accumulator.
    pub fn observe(&mut self, record: &VariantRecord) {
        *self
            .chromosomes
            .entry(record.chromosome.clone())
            .or_insert(0) += 1;
        *self.variant_types.entry(record.kind).or_insert(0) += 1;

        push_finite(&mut self.qualities, record.quality);
        push_finite(&mut self.depths, record.info_f64(DEPTH_KEY));
        push_finite(&mut self.allele_frequencies, record.alt_allele_frequency);

        if record.kind == VariantKind::Snp
            && let Some(alt) = record.first_called_alternate()
        {
            if is_transition(&record.reference, alt) {
                self.transitions += 1;
            } else {
                self.transversions += 1;
            }
        }

        push_finite(&mut self.hwe, record.info_f64(HWE_KEY));
        push_finite(&mut self.inbreeding_coefficients, record.info_f64(INBREEDING_KEY));

        if let Some(annotation) = record.info.get(CONSEQUENCE_KEY) {
            for entry in annotation.text_entries() {
                match entry.split('|').nth(1) {
                    Some(label) if !label.is_empty() => {
                        *self.consequences.entry(label.to_string()).or_insert(0) += 1;
                    }
                    _ => {
                        tracing::debug!(
                            chromosome = %record.chromosome,
                            position = record.position,
                            entry = %entry,
                            "consequence annotation without a label"
                        );
                    }
                }
            }
        }
    }

    pub fn record_count(&self) -> u64 {
        self.chromosomes.values().sum()
    }
}

// NaN and infinities are treated as missing.
fn push_finite(values: &mut Vec<f64>, value: Option<f64>) {
    if let Some(value) = value.filter(|v| v.is_finite()) {
        values.push(value);
    }
}

/// Purine<->purine (A/G) or pyrimidine<->pyrimidine (C/T) substitution.
/// Everything else, including bases outside ACGT, is a transversion.
pub fn is_transition(reference: &str, alternate: &str) -> bool {
    let reference = reference.to_ascii_uppercase();
    let alternate = alternate.to_ascii_uppercase();
    let purine = |b: &str| matches!(b, "A" | "G");
    let pyrimidine = |b: &str| matches!(b, "C" | "T");
    (purine(&reference) && purine(&alternate)) || (pyrimidine(&reference) && pyrimidine(&alternate))
}

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("record stream failed after {records_read} records: {source}")]
    Read {
        records_read: u64,
        #[source]
        source: io::Error,
    },
    #[error("aggregation cancelled after {records_read} records")]
    Cancelled { records_read: u64 },
}

/// Consume `source` to the end. On failure the partial accumulator is dropped.
pub fn aggregate<S>(source: &mut S) -> Result<RawDistributions, AggregateError>
where
    S: VariantSource + ?Sized,
{
    aggregate_until(source, None)
}

/// Like [`aggregate`], checking `cancel` between records.
pub fn aggregate_until<S>(
    source: &mut S,
    cancel: Option<&AtomicBool>,
) -> Result<RawDistributions, AggregateError>
where
    S: VariantSource + ?Sized,
{
    let mut raw = RawDistributions::default();
    let mut records_read = 0u64;

    while let Some(result) = source.next_variant() {
        if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
            return Err(AggregateError::Cancelled { records_read });
        }

        let record = result.map_err(|source| AggregateError::Read {
            records_read,
            source,
        })?;
        raw.observe(&record);
        records_read += 1;

        if records_read % 1_000_000 == 0 {
            tracing::info!(records_read, "aggregating records");
        }
    }

    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::InfoValue;

    fn snp(reference: &str, alternate: &str) -> VariantRecord {
        VariantRecord::new("1", 100, reference, vec![alternate.to_string()])
    }

    #[test]
    fn transition_classes() {
        assert!(is_transition("A", "G"));
        assert!(is_transition("c", "t"));
        assert!(!is_transition("A", "C"));
        assert!(!is_transition("G", "T"));
        assert!(!is_transition("A", "N"));
    }

    #[test]
    fn observe_counts_ts_tv_for_snps_only() {
        let mut raw = RawDistributions::default();
        raw.observe(&snp("A", "G"));
        raw.observe(&snp("A", "C"));
        raw.observe(&VariantRecord::new("1", 5, "A", vec!["AT".into()]));
        assert_eq!(raw.transitions, 1);
        assert_eq!(raw.transversions, 1);
        assert_eq!(raw.variant_types[&VariantKind::Snp], 2);
        assert_eq!(raw.variant_types[&VariantKind::Indel], 1);
        assert_eq!(raw.chromosomes["1"], 3);
    }

    #[test]
    fn consequence_entries_each_count() {
        let record = snp("A", "G").with_info(
            CONSEQUENCE_KEY,
            InfoValue::Text("x|missense_variant|y,x|synonymous_variant|z".into()),
        );
        let mut raw = RawDistributions::default();
        raw.observe(&record);
        assert_eq!(raw.consequences["missense_variant"], 1);
        assert_eq!(raw.consequences["synonymous_variant"], 1);
    }

    #[test]
    fn present_zero_values_are_kept() {
        let record = snp("A", "G")
            .with_quality(0.0)
            .with_info(DEPTH_KEY, InfoValue::Integer(0))
            .with_info(HWE_KEY, InfoValue::Float(0.0))
            .with_alt_allele_frequency(0.0);
        let mut raw = RawDistributions::default();
        raw.observe(&record);
        assert_eq!(raw.qualities, vec![0.0]);
        assert_eq!(raw.depths, vec![0.0]);
        assert_eq!(raw.hwe, vec![0.0]);
        assert_eq!(raw.allele_frequencies, vec![0.0]);
        assert!(raw.inbreeding_coefficients.is_empty());
    }

    #[test]
    fn non_finite_values_are_missing() {
        let record = snp("A", "G")
            .with_quality(f64::NAN)
            .with_info(DEPTH_KEY, InfoValue::Text("inf".into()))
            .with_info(HWE_KEY, InfoValue::Text("nan".into()))
            .with_info(INBREEDING_KEY, InfoValue::Float(f64::NEG_INFINITY))
            .with_alt_allele_frequency(f64::NAN);
        let finite = snp("C", "T")
            .with_quality(10.0)
            .with_info(DEPTH_KEY, InfoValue::Integer(7))
            .with_info(HWE_KEY, InfoValue::Float(0.5));

        let mut raw = RawDistributions::default();
        raw.observe(&record);
        raw.observe(&finite);

        assert_eq!(raw.qualities, vec![10.0]);
        assert_eq!(raw.depths, vec![7.0]);
        assert_eq!(raw.hwe, vec![0.5]);
        assert!(raw.inbreeding_coefficients.is_empty());
        assert!(raw.allele_frequencies.is_empty());
        assert_eq!(raw.record_count(), 2);
    }

    #[test]
    fn spanning_deletion_is_skipped_for_ts_tv() {
        let record = VariantRecord::new("1", 100, "A", vec!["*".into(), "G".into()]);
        assert_eq!(record.kind, VariantKind::Snp);

        let mut raw = RawDistributions::default();
        raw.observe(&record);
        assert_eq!(raw.transitions, 1);
        assert_eq!(raw.transversions, 0);
    }

    #[test]
    fn cancellation_discards_partial_results() {
        let flag = AtomicBool::new(true);
        let mut source = vec![snp("A", "G")]
            .into_iter()
            .map(Ok::<_, std::io::Error>);
        let err = aggregate_until(&mut source, Some(&flag)).unwrap_err();
        assert!(matches!(err, AggregateError::Cancelled { records_read: 0 }));
    }
}
