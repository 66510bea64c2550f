// src/bench/mod.rs
use chrono::Utc;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{info, warn};

use crate::error::{Error, Result};

pub mod config;
pub mod mysql_session;
pub mod queries;
pub mod report;
pub mod session;

pub use config::{DbConfig, RunConfig};
pub use mysql_session::MySqlSession;
pub use queries::{battery, Category, QueryDef, QueryKind, QueryMode};
pub use report::{RunManifest, TimingRecord};
pub use session::{ResultSet, SqlSession};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub out_dir: PathBuf,
    pub timings: Vec<TimingRecord>,
    pub manifest: RunManifest,
}

/// Runs the fixed query battery over one session and writes the evidence
/// into `<results_root>/<tag>/`.
pub struct BenchmarkRunner<S: SqlSession> {
    session: S,
    run: RunConfig,
    db: DbConfig,
    /// Probe results, keyed by column
    fulltext: BTreeMap<String, bool>,
}

impl<S: SqlSession> BenchmarkRunner<S> {
    pub fn new(session: S, run: RunConfig, db: DbConfig) -> Self {
        Self {
            session,
            run,
            db,
            fulltext: BTreeMap::new(),
        }
    }

    /// Run `queries` in order. Any failure aborts the run before the timings
    /// files are written. The session is dropped when this returns.
    #[tracing::instrument(level = "info", skip_all, fields(tag = %self.run.tag))]
    pub fn run<'q, I>(mut self, queries: I) -> Result<RunSummary>
    where
        I: IntoIterator<Item = &'q QueryDef>,
    {
        let started_at = Utc::now();
        let out_dir = self.run.out_dir();
        fs::create_dir_all(&out_dir).map_err(|e| Error::io(&out_dir, e))?;

        let stale = report::clear_previous_run(&out_dir)?;
        if !stale.is_empty() {
            warn!(count = stale.len(), "removed output of an earlier run");
        }

        let mut timings = Vec::new();
        for q in queries {
            timings.push(self.run_one(q, &out_dir)?);
        }

        report::write_timings(&out_dir, &timings)?;
        let manifest = RunManifest {
            tag: self.run.tag.clone(),
            started_at,
            finished_at: Utc::now(),
            db_host: self.db.host.clone(),
            db_name: self.db.database.clone(),
            fulltext_columns: self.fulltext.clone(),
            queries: timings.len(),
        };
        report::write_manifest(&out_dir, &manifest)?;

        info!(queries = timings.len(), dir = %out_dir.display(), "run complete");
        Ok(RunSummary {
            out_dir,
            timings,
            manifest,
        })
    }

    /// Pick the execution mode, probing the column once per run.
    fn mode_for(&mut self, q: &QueryDef) -> Result<QueryMode> {
        let column = match q.kind {
            QueryKind::Scalar { .. } => return Ok(QueryMode::Plain),
            QueryKind::FullText { column, .. } => column,
        };
        let indexed = match self.fulltext.get(column) {
            Some(&indexed) => indexed,
            None => {
                let indexed = self
                    .session
                    .has_fulltext_index(queries::TABLE, column)
                    .map_err(|e| relabel(e, q.name))?;
                info!(column, indexed, "probed full-text index");
                self.fulltext.insert(column.to_string(), indexed);
                indexed
            }
        };
        Ok(if indexed {
            QueryMode::FullText
        } else {
            QueryMode::Like
        })
    }

    #[tracing::instrument(level = "debug", skip_all, fields(query = q.name))]
    fn run_one(&mut self, q: &QueryDef, out_dir: &Path) -> Result<TimingRecord> {
        let mode = self.mode_for(q)?;
        let sql = q.sql(mode);
        let artifact = q.artifact_name(mode);

        let start = Instant::now();
        let result = self.session.fetch(sql).map_err(|e| relabel(e, q.name))?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        report::write_csv(
            &out_dir.join(format!("{}.csv", artifact)),
            result.columns.as_slice(),
            result.rows.iter().take(self.run.sample_limit),
        )?;

        let plan = self
            .session
            .fetch(&format!("EXPLAIN {}", sql))
            .map_err(|e| relabel(e, q.name))?;
        report::write_csv(
            &out_dir.join(format!("explain_{}.csv", artifact)),
            plan.columns.as_slice(),
            &plan.rows,
        )?;

        let record =
            TimingRecord::new(q.name, q.category(), mode, elapsed_ms, result.len() as u64);
        info!(
            query = q.name,
            mode = %mode,
            ms = record.ms,
            rows = record.rows,
            "query timed"
        );
        Ok(record)
    }
}

/// Attach the battery name to query failures.
fn relabel(err: Error, name: &str) -> Error {
    match err {
        Error::Query { message, .. } => Error::query(name, message),
        other => other,
    }
}
