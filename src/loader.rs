//! Open-or-repair front door for variant files.

use std::{
    io,
    path::{Path, PathBuf},
};

use crate::{
    repair,
    sniff::{self, FormatKind, Sniffed},
    source,
};

/// Result of [`load`]: the path to read records from, and a diagnostic when
/// neither the input nor its repaired copy could be opened.
#[derive(Clone, Debug, PartialEq)]
pub struct LoadOutcome {
    pub path: PathBuf,
    pub error: Option<String>,
    pub sniffed: Option<Sniffed>,
    pub repaired: bool,
}

impl LoadOutcome {
    fn usable(path: &Path, sniffed: Sniffed, repaired: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            error: None,
            sniffed: Some(sniffed),
            repaired,
        }
    }

    fn failed(path: &Path, sniffed: Option<Sniffed>, error: String) -> Self {
        Self {
            path: path.to_path_buf(),
            error: Some(error),
            sniffed,
            repaired: false,
        }
    }

    pub fn is_usable(&self) -> bool {
        self.error.is_none()
    }
}

/// Open `path` with the record reader; on failure write a repaired copy and
/// try that once. Failures are returned as data, never as `Err`.
pub fn load(path: &Path) -> LoadOutcome {
    let sniffed = match sniff::sniff(path) {
        Ok(sniffed) => sniffed,
        Err(e) => {
            return LoadOutcome::failed(path, None, format!("failed to read {}: {e}", path.display()));
        }
    };

    let first = match probe(path, sniffed.kind) {
        Ok(()) => return LoadOutcome::usable(path, sniffed, false),
        Err(e) => e,
    };

    if sniffed.kind == FormatKind::Binary {
        return LoadOutcome::failed(
            path,
            Some(sniffed),
            format!(
                "failed to open {} as a binary variant file: {first}; binary inputs cannot be repaired",
                path.display()
            ),
        );
    }

    tracing::warn!(path = %path.display(), error = %first, "validation failed, attempting repair");

    let repaired = match repair::repair_file(path) {
        Ok((repaired, _)) => repaired,
        Err(e) => {
            return LoadOutcome::failed(
                path,
                Some(sniffed),
                format!("failed to open {}: {first}; repair failed: {e}", path.display()),
            );
        }
    };

    match probe(&repaired, FormatKind::Tabular) {
        Ok(()) => {
            tracing::info!(repaired = %repaired.display(), "repaired copy is readable");
            LoadOutcome::usable(
                &repaired,
                Sniffed {
                    compressed: false,
                    kind: FormatKind::Tabular,
                },
                true,
            )
        }
        Err(second) => LoadOutcome::failed(
            path,
            Some(sniffed),
            format!(
                "validation failed after repair attempt: failed to open {}: {first}; repaired copy {} is still unreadable: {second}",
                path.display(),
                repaired.display()
            ),
        ),
    }
}

/// Parse the header and the first record, if any.
fn probe(path: &Path, kind: FormatKind) -> io::Result<()> {
    let mut records = source::open_source(path, kind)?;
    match records.next_variant() {
        Some(Err(e)) => Err(e),
        _ => Ok(()),
    }
}
