use std::{collections::HashMap, fmt};

use serde::Serialize;

/// Coarse classification of a variant site.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariantKind {
    Snp,
    Indel,
    Mnp,
    Sv,
    Other,
}

impl VariantKind {
    /// Classify a site from its alleles. `has_svtype` is true when the INFO
    /// column carries an `SVTYPE` key.
    pub fn classify(reference: &str, alternates: &[String], has_svtype: bool) -> Self {
        if has_svtype || alternates.iter().any(|alt| is_symbolic(alt)) {
            return Self::Sv;
        }

        let called: Vec<&str> = alternates
            .iter()
            .map(String::as_str)
            .filter(|alt| is_called(alt))
            .collect();

        if called.is_empty() || reference.is_empty() {
            return Self::Other;
        }

        if reference.len() == 1 && called.iter().all(|alt| alt.len() == 1) {
            Self::Snp
        } else if called.iter().any(|alt| alt.len() != reference.len()) {
            Self::Indel
        } else {
            Self::Mnp
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Snp => "snp",
            Self::Indel => "indel",
            Self::Mnp => "mnp",
            Self::Sv => "sv",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for VariantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// False for missing (`.`) and spanning-deletion (`*`) alleles.
pub fn is_called(allele: &str) -> bool {
    !matches!(allele, "." | "*" | "")
}

// Symbolic (`<DEL>`) and breakend (`G]17:198982]`) alleles.
fn is_symbolic(allele: &str) -> bool {
    allele.starts_with('<') || allele.contains('[') || allele.contains(']')
}

/// A single INFO value, decoupled from the decoder that produced it.
#[derive(Clone, Debug, PartialEq)]
pub enum InfoValue {
    Integer(i64),
    Float(f64),
    Text(String),
    Flag,
    List(Vec<InfoValue>),
}

impl InfoValue {
    /// Numeric reading of the value. Lists yield their first element and text
    /// is parsed, since keys missing from the header decode as strings.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(n) => Some(*n as f64),
            Self::Float(x) => Some(*x),
            Self::Text(s) => s.trim().parse().ok(),
            Self::Flag => None,
            Self::List(values) => values.first().and_then(InfoValue::as_f64),
        }
    }

    /// Textual entries of the value. A comma-joined scalar string and a
    /// decoded list give the same entries.
    pub fn text_entries(&self) -> Vec<String> {
        match self {
            Self::Text(s) => s.split(',').map(str::to_string).collect(),
            Self::List(values) => values.iter().flat_map(InfoValue::text_entries).collect(),
            Self::Integer(n) => vec![n.to_string()],
            Self::Float(x) => vec![x.to_string()],
            Self::Flag => Vec::new(),
        }
    }
}

/// One variant site as consumed by the statistics aggregator.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantRecord {
    pub chromosome: String,
    /// 1-based.
    pub position: u64,
    pub reference: String,
    pub alternates: Vec<String>,
    pub quality: Option<f64>,
    pub info: HashMap<String, InfoValue>,
    pub kind: VariantKind,
    pub alt_allele_frequency: Option<f64>,
}

impl VariantRecord {
    /// Build a record, deriving `kind` from the alleles and `SVTYPE`.
    pub fn new(
        chromosome: impl Into<String>,
        position: u64,
        reference: impl Into<String>,
        alternates: Vec<String>,
    ) -> Self {
        let reference = reference.into();
        let kind = VariantKind::classify(&reference, &alternates, false);
        Self {
            chromosome: chromosome.into(),
            position,
            reference,
            alternates,
            quality: None,
            info: HashMap::new(),
            kind,
            alt_allele_frequency: None,
        }
    }

    pub fn with_quality(mut self, quality: f64) -> Self {
        self.quality = Some(quality);
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: InfoValue) -> Self {
        let key = key.into();
        if key == "SVTYPE" {
            self.kind = VariantKind::Sv;
        }
        self.info.insert(key, value);
        self
    }

    pub fn with_alt_allele_frequency(mut self, frequency: f64) -> Self {
        self.alt_allele_frequency = Some(frequency);
        self
    }

    /// First alternate that is neither missing nor a spanning deletion.
    pub fn first_called_alternate(&self) -> Option<&str> {
        self.alternates.iter().map(String::as_str).find(|alt| is_called(alt))
    }

    pub fn info_f64(&self, key: &str) -> Option<f64> {
        self.info.get(key).and_then(InfoValue::as_f64)
    }
}
