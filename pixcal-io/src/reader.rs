//! Source chunk readers.
//!
//! A chunk file is a JSON array of chunks, each holding a contiguous block
//! of source events with their packets, raw hits and per-event t0:
//!
//! ```json
//! [{"source_start": 0,
//!   "events": [{"packets": [{"packet_type": 0, "dataword": 128, "io_group": 1,
//!                            "io_channel": 1, "chip_id": 11, "channel_id": 3}, null],
//!               "raw_hits": [{"id": 0, "ts_pps": 1500}, null]}],
//!   "t0": [{"ts": 1000.0}]}]
//! ```

use crate::{Error, Result};
use pixcal_core::SourceChunk;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Reads source chunks from a JSON file.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed, or if chunk
/// source ranges overflow or overlap.
pub fn read_chunks_json<P: AsRef<Path>>(path: P) -> Result<Vec<SourceChunk>> {
    let file = File::open(path.as_ref())?;
    let chunks = read_chunks(BufReader::new(file))?;
    log::debug!(
        "read {} chunks from {}",
        chunks.len(),
        path.as_ref().display()
    );
    Ok(chunks)
}

/// Parses source chunks from a JSON string.
///
/// # Errors
/// Returns an error if the JSON is malformed or chunk source ranges
/// overflow or overlap.
pub fn parse_chunks_json(json: &str) -> Result<Vec<SourceChunk>> {
    let chunks: Vec<SourceChunk> = serde_json::from_str(json)?;
    check_source_ranges(&chunks)?;
    Ok(chunks)
}

fn read_chunks<R: Read>(reader: R) -> Result<Vec<SourceChunk>> {
    let chunks: Vec<SourceChunk> = serde_json::from_reader(reader)?;
    check_source_ranges(&chunks)?;
    Ok(chunks)
}

fn check_source_ranges(chunks: &[SourceChunk]) -> Result<()> {
    let mut ranges = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let range = chunk
            .checked_source_slice()
            .map_err(|e| Error::InvalidFormat(e.to_string()))?;
        if !range.is_empty() {
            ranges.push(range);
        }
    }
    ranges.sort_by_key(|r| r.start);
    for pair in ranges.windows(2) {
        if pair[1].start < pair[0].end {
            return Err(Error::InvalidFormat(format!(
                "source ranges {:?} and {:?} overlap",
                pair[0], pair[1]
            )));
        }
    }
    Ok(())
}
