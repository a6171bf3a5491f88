use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

// Nested gzip beyond this depth is treated as opaque data.
const MAX_LAYERS: usize = 4;

/// Opens a text input and transparently peels off GZIP/BGZF layers.
///
/// Returns the decoded stream and whether any compression layer was removed.
pub fn open_text(path: &Path) -> io::Result<(Box<dyn BufRead + Send>, bool)> {
    let file = File::open(path)?;
    peel(Box::new(BufReader::new(file)))
}

/// Peel compression from an already-open stream.
pub fn peel(mut reader: Box<dyn BufRead + Send>) -> io::Result<(Box<dyn BufRead + Send>, bool)> {
    let mut layers = 0;

    while layers < MAX_LAYERS && is_gzip(reader.as_mut())? {
        tracing::debug!(layer = layers, "detected GZIP/BGZF layer");
        // MultiGzDecoder covers BGZF and concatenated members.
        reader = Box::new(BufReader::new(MultiGzDecoder::new(reader)));
        layers += 1;
    }

    Ok((reader, layers > 0))
}

fn is_gzip(reader: &mut dyn BufRead) -> io::Result<bool> {
    let buf = reader.fill_buf()?;
    Ok(buf.len() >= GZIP_MAGIC.len() && buf[..GZIP_MAGIC.len()] == GZIP_MAGIC)
}
