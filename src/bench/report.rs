use chrono::{DateTime, Utc};
use csv::{Terminator, WriterBuilder};
use glob::glob;
use prettytable::{format, Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::debug;

use crate::bench::queries::{Category, QueryMode};
use crate::error::{Error, Result};

pub const TIMINGS_CSV: &str = "timings.csv";
pub const TIMINGS_TXT: &str = "timings.txt";
pub const TIMINGS_JSON: &str = "timings.json";
pub const RUN_MANIFEST: &str = "run.json";

const TIMING_HEADERS: [&str; 5] = ["query", "category", "mode", "ms", "rows"];

/// One row of the run summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub query: String,
    pub category: Category,
    pub mode: QueryMode,
    /// Wall-clock milliseconds, rounded to two decimals
    pub ms: f64,
    pub rows: u64,
}

impl TimingRecord {
    pub fn new(
        query: impl Into<String>,
        category: Category,
        mode: QueryMode,
        elapsed_ms: f64,
        rows: u64,
    ) -> Self {
        Self {
            query: query.into(),
            category,
            mode,
            ms: round2(elapsed_ms),
            rows,
        }
    }

    fn cells(&self) -> [String; 5] {
        [
            self.query.clone(),
            self.category.to_string(),
            self.mode.to_string(),
            format!("{:.2}", self.ms),
            self.rows.to_string(),
        ]
    }
}

pub fn round2(ms: f64) -> f64 {
    (ms * 100.0).round() / 100.0
}

/// Written last; its presence marks a run that finished every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub tag: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub db_host: String,
    pub db_name: String,
    /// `column -> has full-text index`, as probed during the run
    pub fulltext_columns: BTreeMap<String, bool>,
    pub queries: usize,
}

/// Write `headers` then `rows` as CSV at `path`.
pub fn write_csv<H, R, C>(path: &Path, headers: &[H], rows: R) -> Result<()>
where
    H: AsRef<str>,
    R: IntoIterator<Item = C>,
    C: IntoIterator,
    C::Item: AsRef<[u8]>,
{
    let mut buf = Vec::new();
    {
        let mut wtr = WriterBuilder::new()
            .terminator(Terminator::CRLF)
            .flexible(true)
            .from_writer(&mut buf);
        if !headers.is_empty() {
            wtr.write_record(headers.iter().map(|h| h.as_ref()))
                .map_err(|e| Error::io(path, e))?;
        }
        for row in rows {
            wtr.write_record(row).map_err(|e| Error::io(path, e))?;
        }
        wtr.flush().map_err(|e| Error::io(path, e))?;
    }
    fs::write(path, buf).map_err(|e| Error::io(path, e))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", file_name))
}

/// Write `bytes` to the dot-prefixed sibling of `path` and return that path.
fn stage(path: &Path, bytes: &[u8]) -> Result<PathBuf> {
    let tmp_path = tmp_path_for(path);
    let mut tmp = fs::File::create(&tmp_path).map_err(|e| Error::io(&tmp_path, e))?;
    tmp.write_all(bytes).map_err(|e| Error::io(&tmp_path, e))?;
    tmp.sync_all().map_err(|e| Error::io(&tmp_path, e))?;
    Ok(tmp_path)
}

/// Write to a dot-prefixed sibling and rename over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = stage(path, bytes)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        Error::io(path, e)
    })
}

/// Stage every file, then rename them in order. On any failure the staged
/// and already-renamed files are removed, so either all of `files` exist
/// afterwards or none do.
fn write_all_or_nothing(files: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut staged = Vec::with_capacity(files.len());
    for (path, bytes) in files {
        match stage(path, bytes) {
            Ok(tmp) => staged.push(tmp),
            Err(e) => {
                for tmp in &staged {
                    let _ = fs::remove_file(tmp);
                }
                let _ = fs::remove_file(tmp_path_for(path));
                return Err(e);
            }
        }
    }

    for (i, ((path, _), tmp)) in files.iter().zip(&staged).enumerate() {
        if let Err(e) = fs::rename(tmp, path) {
            for (done, _) in &files[..i] {
                let _ = fs::remove_file(done);
            }
            for pending in &staged[i..] {
                let _ = fs::remove_file(pending);
            }
            return Err(Error::io(path, e));
        }
    }
    Ok(())
}

pub fn render_csv(records: &[TimingRecord]) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new()
        .terminator(Terminator::CRLF)
        .from_writer(Vec::new());
    let to_err = |e: csv::Error| Error::io(TIMINGS_CSV, e);
    wtr.write_record(TIMING_HEADERS).map_err(to_err)?;
    for r in records {
        wtr.write_record(r.cells()).map_err(to_err)?;
    }
    wtr.into_inner()
        .map_err(|e| Error::io(TIMINGS_CSV, e.into_error()))
}

pub fn render_table(records: &[TimingRecord]) -> String {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);
    table.set_titles(Row::new(
        TIMING_HEADERS.iter().map(|h| Cell::new(h)).collect(),
    ));
    for r in records {
        let [query, category, mode, ms, rows] = r.cells();
        table.add_row(Row::new(vec![
            Cell::new(&query),
            Cell::new(&category),
            Cell::new(&mode),
            Cell::new(&ms).style_spec("r"),
            Cell::new(&rows).style_spec("r"),
        ]));
    }
    table.to_string()
}

pub fn render_json(records: &[TimingRecord]) -> Result<Vec<u8>> {
    let mut out = serde_json::to_vec_pretty(records)
        .map_err(|e| Error::io(TIMINGS_JSON, std::io::Error::other(e)))?;
    out.push(b'\n');
    Ok(out)
}

/// Write `timings.csv`, `timings.txt` and `timings.json` under `dir`.
/// All three carry the same records in the same order.
pub fn write_timings(dir: &Path, records: &[TimingRecord]) -> Result<()> {
    write_all_or_nothing(&[
        (dir.join(TIMINGS_CSV), render_csv(records)?),
        (dir.join(TIMINGS_TXT), render_table(records).into_bytes()),
        (dir.join(TIMINGS_JSON), render_json(records)?),
    ])?;
    debug!(dir = %dir.display(), records = records.len(), "timings written");
    Ok(())
}

pub fn write_manifest(dir: &Path, manifest: &RunManifest) -> Result<()> {
    let path = dir.join(RUN_MANIFEST);
    let mut out = serde_json::to_vec_pretty(manifest)
        .map_err(|e| Error::io(&path, std::io::Error::other(e)))?;
    out.push(b'\n');
    write_atomic(&path, &out)
}

/// Remove what an earlier run of the same tag wrote into `dir`: samples,
/// plans, timings and the manifest. A rerun in another mode must not leave
/// the old mode's files next to its own, and an aborted rerun must not look
/// finished.
pub fn clear_previous_run(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    for pattern in ["*.csv", "timings.*", RUN_MANIFEST] {
        let full = format!("{}/{}", glob::Pattern::escape(&dir.to_string_lossy()), pattern);
        let paths = glob(&full).map_err(|e| {
            Error::io(dir, std::io::Error::new(std::io::ErrorKind::InvalidInput, e))
        })?;
        for path in paths.filter_map(|p| p.ok()).filter(|p| p.is_file()) {
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            debug!(path = %path.display(), "removed output of an earlier run");
            removed.push(path);
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_records() -> Vec<TimingRecord> {
        vec![
            TimingRecord::new(
                "Q1_counts_per_borough_30d",
                Category::Scalar,
                QueryMode::Plain,
                12.3456,
                5,
            ),
            TimingRecord::new("FT1_noise", Category::FullText, QueryMode::Like, 0.004, 1),
        ]
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.3456), 12.35);
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2(7.0), 7.0);
    }

    #[test]
    fn test_three_forms_agree() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let records = sample_records();
        write_timings(dir.path(), &records)?;

        // csv
        let mut rdr = csv::Reader::from_path(dir.path().join(TIMINGS_CSV))?;
        assert_eq!(rdr.headers()?, TIMING_HEADERS.to_vec());
        let csv_rows: Vec<csv::StringRecord> = rdr.records().collect::<std::result::Result<_, _>>()?;
        assert_eq!(csv_rows.len(), 2);
        assert_eq!(
            csv_rows[0],
            vec!["Q1_counts_per_borough_30d", "scalar", "plain", "12.35", "5"]
        );
        assert_eq!(csv_rows[1], vec!["FT1_noise", "fulltext", "like", "0.00", "1"]);

        // json
        let json: Vec<TimingRecord> =
            serde_json::from_slice(&fs::read(dir.path().join(TIMINGS_JSON))?)?;
        assert_eq!(json, records);

        // txt: same order, same values
        let txt = fs::read_to_string(dir.path().join(TIMINGS_TXT))?;
        let q1 = txt.find("Q1_counts_per_borough_30d").unwrap();
        let ft1 = txt.find("FT1_noise").unwrap();
        assert!(q1 < ft1);
        assert!(txt.contains("12.35"));
        assert!(txt.contains("like"));

        // no temp files left behind
        let leftovers = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }

    #[test]
    fn test_write_csv_with_header() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("explain_Q1.csv");
        let rows = vec![vec!["1".to_string(), "SIMPLE".to_string(), "".to_string()]];
        write_csv(&path, &["id", "select_type", "key"], &rows)?;
        assert_eq!(
            fs::read_to_string(&path)?,
            "id,select_type,key\r\n1,SIMPLE,\r\n"
        );
        Ok(())
    }

    #[test]
    fn test_clear_previous_run() -> anyhow::Result<()> {
        let dir = tempdir()?;
        write_timings(dir.path(), &sample_records())?;
        fs::write(dir.path().join(RUN_MANIFEST), "{}")?;
        fs::write(dir.path().join("FT1_noise_fulltext.csv"), "x")?;
        fs::write(dir.path().join("explain_FT1_noise_fulltext.csv"), "x")?;
        fs::write(dir.path().join("notes.md"), "kept")?;

        let removed = clear_previous_run(dir.path())?;
        assert_eq!(removed.len(), 6);
        for f in [
            TIMINGS_CSV,
            TIMINGS_TXT,
            TIMINGS_JSON,
            RUN_MANIFEST,
            "FT1_noise_fulltext.csv",
            "explain_FT1_noise_fulltext.csv",
        ] {
            assert!(!dir.path().join(f).exists(), "{f} should be removed");
        }
        assert!(dir.path().join("notes.md").exists());
        Ok(())
    }

    #[test]
    fn test_failed_timings_write_leaves_nothing() -> anyhow::Result<()> {
        let dir = tempdir()?;
        // a non-empty directory where timings.json should go makes its rename fail
        fs::create_dir(dir.path().join(TIMINGS_JSON))?;
        fs::write(dir.path().join(TIMINGS_JSON).join("blocker"), "x")?;

        let err = write_timings(dir.path(), &sample_records()).unwrap_err();
        match err {
            Error::Io { path, .. } => assert!(path.ends_with(TIMINGS_JSON)),
            other => panic!("unexpected error: {other}"),
        }

        assert!(!dir.path().join(TIMINGS_CSV).exists());
        assert!(!dir.path().join(TIMINGS_TXT).exists());
        let leftovers = fs::read_dir(dir.path())?
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
        Ok(())
    }
}
