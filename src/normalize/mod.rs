// src/normalize/mod.rs
use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};
use std::{
    fs::File,
    io::{Read, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};

pub mod schema;

pub use schema::{HeaderMap, CANONICAL_HEADERS};

/// Outcome of one normalizer pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeSummary {
    /// Data rows written (header excluded)
    pub rows: u64,
    /// Canonical columns found in the source header
    pub resolved: Vec<&'static str>,
    /// Canonical columns absent from the source; emitted as empty cells
    pub missing: Vec<&'static str>,
}

/// Rewrite `src` into the ten-column canonical layout at `dst`.
#[tracing::instrument(level = "info", skip_all, fields(src = %src.as_ref().display(), dst = %dst.as_ref().display()))]
pub fn normalize_file<P: AsRef<Path>, Q: AsRef<Path>>(src: P, dst: Q) -> Result<NormalizeSummary> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    let fin = File::open(src).map_err(|e| Error::io(src, e))?;
    let fout = File::create(dst).map_err(|e| Error::io(dst, e))?;

    let summary = normalize(fin, fout, src, dst)?;
    info!(rows = summary.rows, missing = summary.missing.len(), "normalized");
    Ok(summary)
}

/// Reader/writer form of [`normalize_file`]; `src`/`dst` only label errors.
pub fn normalize<R: Read, W: Write>(
    input: R,
    output: W,
    src: &Path,
    dst: &Path,
) -> Result<NormalizeSummary> {
    let src_err = |e: csv::Error| Error::io(PathBuf::from(src), e);
    let dst_err = |e: csv::Error| Error::io(PathBuf::from(dst), e);

    // flexible: short rows read as missing cells instead of failing
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(output);

    let headers = rdr.headers().map_err(src_err)?.clone();
    debug!(columns = headers.len(), "source header parsed");

    let map = HeaderMap::new(headers.iter());
    let indices = map.canonical_indices();

    let mut resolved = Vec::new();
    let mut missing = Vec::new();
    for (name, idx) in CANONICAL_HEADERS.iter().zip(indices.iter()) {
        match idx {
            Some(_) => resolved.push(*name),
            None => missing.push(*name),
        }
    }
    if !missing.is_empty() {
        warn!(?missing, "canonical columns absent from source; writing empty cells");
    }

    wtr.write_record(CANONICAL_HEADERS).map_err(dst_err)?;

    let mut record = StringRecord::new();
    let mut rows = 0u64;
    while rdr.read_record(&mut record).map_err(src_err)? {
        let out = indices.map(|idx| idx.and_then(|i| record.get(i)).unwrap_or(""));
        wtr.write_record(out).map_err(dst_err)?;
        rows += 1;
    }

    wtr.flush().map_err(|e| Error::io(dst, e))?;

    Ok(NormalizeSummary {
        rows,
        resolved,
        missing,
    })
}
