//! Lazy, forward-only record streams over VCF and BCF inputs.
//!
//! Decoding is delegated to noodles; every decoded `RecordBuf` is projected
//! into a [`VariantRecord`] so downstream code never sees decoder types.

use std::{
    fs::File,
    io::{self, BufRead, BufReader, Read},
    path::Path,
};

use indexmap::IndexMap;
use noodles::{
    bcf,
    vcf::{
        self,
        variant::{
            record::samples::keys::key,
            record_buf::{
                RecordBuf,
                info::field::{Value as InfoFieldValue, value::Array},
                samples::sample::Value as SampleValue,
            },
        },
    },
};

use crate::{
    record::{InfoValue, VariantKind, VariantRecord},
    smart_reader,
    sniff::FormatKind,
};

const ALLELE_FREQUENCY_KEY: &str = "AF";
const SVTYPE_KEY: &str = "SVTYPE";

/// A source of variant records, consumed once from front to back.
pub trait VariantSource {
    fn next_variant(&mut self) -> Option<io::Result<VariantRecord>>;
}

impl<I> VariantSource for I
where
    I: Iterator<Item = io::Result<VariantRecord>>,
{
    fn next_variant(&mut self) -> Option<io::Result<VariantRecord>> {
        self.next()
    }
}

/// Open `path` as a record stream of the given kind. Unknown inputs are
/// tried as tabular text.
pub fn open_source(path: &Path, kind: FormatKind) -> io::Result<Box<dyn VariantSource>> {
    match kind {
        FormatKind::Binary => Ok(Box::new(BcfSource::open(path)?)),
        FormatKind::Tabular | FormatKind::Unknown => {
            let (reader, _) = smart_reader::open_text(path)?;
            Ok(Box::new(VcfSource::new(vcf::io::Reader::new(reader))?))
        }
    }
}

/// Tabular-text adapter. The header is parsed on construction.
pub struct VcfSource<R> {
    reader: vcf::io::Reader<R>,
    header: vcf::Header,
    record: RecordBuf,
    finished: bool,
}

impl<R> VcfSource<R>
where
    R: BufRead,
{
    pub fn new(mut reader: vcf::io::Reader<R>) -> io::Result<Self> {
        let header = reader.read_header()?;
        Ok(Self {
            reader,
            header,
            record: RecordBuf::default(),
            finished: false,
        })
    }

    pub fn header(&self) -> &vcf::Header {
        &self.header
    }
}

impl<R> Iterator for VcfSource<R>
where
    R: BufRead,
{
    type Item = io::Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_record_buf(&self.header, &mut self.record) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => Some(project_record(&self.record)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Binary container adapter.
pub struct BcfSource {
    reader: bcf::io::Reader<Box<dyn Read>>,
    header: vcf::Header,
    record: RecordBuf,
    finished: bool,
}

impl BcfSource {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let mut reader = bcf::io::reader::Builder::default().build_from_reader(BufReader::new(file))?;
        let header = reader.read_header()?;
        Ok(Self {
            reader,
            header,
            record: RecordBuf::default(),
            finished: false,
        })
    }

    pub fn header(&self) -> &vcf::Header {
        &self.header
    }
}

impl Iterator for BcfSource {
    type Item = io::Result<VariantRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.reader.read_record_buf(&self.header, &mut self.record) {
            Ok(0) => {
                self.finished = true;
                None
            }
            Ok(_) => Some(project_record(&self.record)),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

fn project_record(record: &RecordBuf) -> io::Result<VariantRecord> {
    let position = record
        .variant_start()
        .map(|p| usize::from(p) as u64)
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "record has no position"))?;

    let reference = record.reference_bases().to_string();
    if reference.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "empty reference allele at {}:{position}",
                record.reference_sequence_name()
            ),
        ));
    }

    let alternates: Vec<String> = record.alternate_bases().as_ref().to_vec();

    let fields: &IndexMap<String, Option<InfoFieldValue>> = record.info().as_ref();
    let info = fields
        .iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .map(|v| (name.clone(), project_info_value(v)))
        })
        .collect::<std::collections::HashMap<_, _>>();

    let kind = VariantKind::classify(&reference, &alternates, fields.contains_key(SVTYPE_KEY));

    let alt_allele_frequency = genotype_allele_frequency(record).or_else(|| {
        info.get(ALLELE_FREQUENCY_KEY)
            .and_then(InfoValue::as_f64)
            .filter(|f| (0.0..=1.0).contains(f))
    });

    Ok(VariantRecord {
        chromosome: record.reference_sequence_name().to_string(),
        position,
        reference,
        alternates,
        quality: record.quality_score().map(f64::from),
        info,
        kind,
        alt_allele_frequency,
    })
}

fn project_info_value(value: &InfoFieldValue) -> InfoValue {
    match value {
        InfoFieldValue::Integer(n) => InfoValue::Integer(i64::from(*n)),
        InfoFieldValue::Float(x) => InfoValue::Float(f64::from(*x)),
        InfoFieldValue::Flag => InfoValue::Flag,
        InfoFieldValue::Character(c) => InfoValue::Text(c.to_string()),
        InfoFieldValue::String(s) => InfoValue::Text(s.clone()),
        InfoFieldValue::Array(array) => InfoValue::List(match array {
            Array::Integer(values) => values
                .iter()
                .flatten()
                .map(|n| InfoValue::Integer(i64::from(*n)))
                .collect(),
            Array::Float(values) => values
                .iter()
                .flatten()
                .map(|x| InfoValue::Float(f64::from(*x)))
                .collect(),
            Array::Character(values) => values
                .iter()
                .flatten()
                .map(|c| InfoValue::Text(c.to_string()))
                .collect(),
            Array::String(values) => values
                .iter()
                .flatten()
                .map(|s| InfoValue::Text(s.clone()))
                .collect(),
        }),
    }
}

/// Fraction of called alleles that are non-reference, across all samples.
fn genotype_allele_frequency(record: &RecordBuf) -> Option<f64> {
    let mut called = 0u64;
    let mut alternate = 0u64;

    for sample in record.samples().values() {
        match sample.get(key::GENOTYPE) {
            Some(Some(SampleValue::Genotype(genotype))) => {
                for allele in genotype.as_ref() {
                    if let Some(index) = allele.position() {
                        called += 1;
                        if index > 0 {
                            alternate += 1;
                        }
                    }
                }
            }
            Some(Some(SampleValue::String(gt))) => {
                for index in parse_gt_indices(gt).into_iter().flatten() {
                    called += 1;
                    if index > 0 {
                        alternate += 1;
                    }
                }
            }
            _ => {}
        }
    }

    (called > 0).then(|| alternate as f64 / called as f64)
}

/// Allele indices of a textual genotype such as `0/1` or `1|.`.
fn parse_gt_indices(gt: &str) -> Vec<Option<usize>> {
    gt.split(['/', '|'])
        .map(|allele| allele.trim().parse().ok())
        .collect()
}
