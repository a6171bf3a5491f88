//! Cheap format classification from a file name and its first line.

use std::{
    fmt,
    io::{self, BufRead, Read},
    path::Path,
};

use serde::Serialize;

use crate::smart_reader;

const TABULAR_MAGIC: &[u8] = b"##fileformat=";
const BINARY_MAGIC: &[u8] = b"BCF";
const BINARY_MAJOR_VERSION: u8 = 2;

// Upper bound on the single line of lookahead.
const MAX_LOOKAHEAD: u64 = 64 * 1024;

const ALLOWED_UPLOAD_SUFFIXES: &[&str] = &[".vcf", ".vcf.gz", ".bcf"];

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatKind {
    Tabular,
    Binary,
    Unknown,
}

impl fmt::Display for FormatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Tabular => "tabular",
            Self::Binary => "binary",
            Self::Unknown => "unknown",
        })
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub struct Sniffed {
    pub compressed: bool,
    pub kind: FormatKind,
}

impl Sniffed {
    const fn new(compressed: bool, kind: FormatKind) -> Self {
        Self { compressed, kind }
    }
}

/// Classify `path`. A recognised suffix wins; otherwise the first line is
/// inspected after peeling any gzip layer. Opens its own handle, so callers
/// can re-read the file from the start.
pub fn sniff(path: &Path) -> io::Result<Sniffed> {
    if let Some(sniffed) = from_extension(path) {
        return Ok(sniffed);
    }

    let (reader, compressed) = smart_reader::open_text(path)?;
    let mut first_line = Vec::new();
    reader
        .take(MAX_LOOKAHEAD)
        .read_until(b'\n', &mut first_line)?;

    let kind = from_magic(&first_line);
    tracing::debug!(path = %path.display(), compressed, %kind, "sniffed input by content");
    Ok(Sniffed::new(compressed, kind))
}

fn from_extension(path: &Path) -> Option<Sniffed> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();

    if name.ends_with(".vcf") {
        Some(Sniffed::new(false, FormatKind::Tabular))
    } else if name.ends_with(".vcf.gz") || name.ends_with(".vcf.bgz") {
        Some(Sniffed::new(true, FormatKind::Tabular))
    } else if name.ends_with(".bcf") {
        // BCF is BGZF-compressed by convention.
        Some(Sniffed::new(true, FormatKind::Binary))
    } else {
        None
    }
}

fn from_magic(head: &[u8]) -> FormatKind {
    if head.starts_with(TABULAR_MAGIC) {
        FormatKind::Tabular
    } else if head.starts_with(BINARY_MAGIC)
        && head
            .get(BINARY_MAGIC.len())
            .is_none_or(|&major| major == BINARY_MAJOR_VERSION)
    {
        FormatKind::Binary
    } else {
        FormatKind::Unknown
    }
}

/// Whether an uploaded file name carries one of the accepted suffixes.
pub fn is_allowed_upload(name: &str) -> bool {
    let name = name.to_ascii_lowercase();
    ALLOWED_UPLOAD_SUFFIXES
        .iter()
        .any(|suffix| name.len() > suffix.len() && name.ends_with(suffix))
}
