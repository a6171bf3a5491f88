//! Best-effort rewrite of whitespace-mangled VCF text into strict form.
//!
//! Only two malformation classes are handled: space-delimited columns (in the
//! `#CHROM` line or in data lines) and spaces around the `=` of a `##key=value`
//! meta line. Lines that need no rewrite are copied byte for byte.

use std::{
    ffi::OsString,
    io::{self, BufRead, BufWriter, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use thiserror::Error;

use crate::smart_reader;

const COLUMN_HEADER_PREFIX: &str = "#CHROM";
const META_PREFIX: &str = "##";
const REPAIRED_SUFFIX: &str = ".fixed";

#[derive(Debug, Error)]
pub enum RepairError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write repaired copy {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Per-class counts of rewritten lines.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RepairSummary {
    pub lines: u64,
    pub column_headers: u64,
    pub meta_headers: u64,
    pub data_lines: u64,
}

impl RepairSummary {
    pub fn rewritten(&self) -> u64 {
        self.column_headers + self.meta_headers + self.data_lines
    }
}

/// Which rule rewrote a line.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LineClass {
    ColumnHeader,
    MetaHeader,
    Data,
}

/// Sibling path the repaired copy of `path` is written to.
pub fn repaired_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(REPAIRED_SUFFIX);
    PathBuf::from(name)
}

/// Rewrite a single line (without its terminator). `None` means the line is
/// already well formed and must be copied unchanged.
pub fn repair_line(line: &str) -> Option<(LineClass, String)> {
    if line.starts_with(COLUMN_HEADER_PREFIX) {
        let fixed = join_tabs(line);
        (fixed != line).then_some((LineClass::ColumnHeader, fixed))
    } else if let Some(rest) = line.strip_prefix(META_PREFIX) {
        let (key, value) = rest.split_once('=')?;
        let tight_key = key.trim();
        let tight_value = value.trim_start();
        if tight_key.is_empty() || tight_key.contains(char::is_whitespace) {
            return None;
        }
        (tight_key.len() != key.len() || tight_value.len() != value.len()).then(|| {
            (
                LineClass::MetaHeader,
                format!("{META_PREFIX}{tight_key}={tight_value}"),
            )
        })
    } else if line.starts_with('#') {
        None
    } else if line.contains(' ') && !line.contains('\t') {
        Some((LineClass::Data, join_tabs(line)))
    } else {
        None
    }
}

fn join_tabs(line: &str) -> String {
    line.split_whitespace().collect::<Vec<_>>().join("\t")
}

/// Stream `reader` into `writer`, repairing line by line.
pub fn repair_stream<R, W>(mut reader: R, mut writer: W) -> io::Result<RepairSummary>
where
    R: BufRead,
    W: Write,
{
    let mut summary = RepairSummary::default();
    let mut buf = String::new();

    loop {
        buf.clear();
        if reader.read_line(&mut buf)? == 0 {
            break;
        }
        summary.lines += 1;

        let content = buf.trim_end_matches(['\n', '\r']);
        match repair_line(content) {
            Some((class, fixed)) => {
                tracing::debug!(line = summary.lines, ?class, "rewrote line");
                match class {
                    LineClass::ColumnHeader => summary.column_headers += 1,
                    LineClass::MetaHeader => summary.meta_headers += 1,
                    LineClass::Data => summary.data_lines += 1,
                }
                writer.write_all(fixed.as_bytes())?;
                writer.write_all(b"\n")?;
            }
            None => writer.write_all(buf.as_bytes())?,
        }
    }

    writer.flush()?;
    Ok(summary)
}

/// Write a repaired copy of `path` to [`repaired_path`]. The original is never
/// modified, and the output only appears once it has been fully written.
pub fn repair_file(path: &Path) -> Result<(PathBuf, RepairSummary), RepairError> {
    let target = repaired_path(path);
    let read_err = |source| RepairError::Read {
        path: path.to_path_buf(),
        source,
    };
    let write_err = |source| RepairError::Write {
        path: target.clone(),
        source,
    };

    let (reader, compressed) = smart_reader::open_text(path).map_err(read_err)?;
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staging = NamedTempFile::new_in(dir).map_err(write_err)?;

    let summary = repair_stream(reader, BufWriter::new(staging.as_file_mut())).map_err(|e| {
        if e.kind() == io::ErrorKind::InvalidData {
            read_err(e)
        } else {
            write_err(e)
        }
    })?;

    staging.persist(&target).map_err(|e| write_err(e.error))?;

    tracing::info!(
        source = %path.display(),
        repaired = %target.display(),
        compressed,
        lines = summary.lines,
        rewritten = summary.rewritten(),
        "wrote repaired copy"
    );

    Ok((target, summary))
}
