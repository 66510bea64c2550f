use anyhow::{Context, Result};
use clap::{Args, Parser};
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use nyc311bench::bench::{
    battery,
    config::{
        DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PASS, DEFAULT_DB_PORT, DEFAULT_DB_USER,
        DEFAULT_RESULTS_DIR, DEFAULT_SAMPLE_LIMIT,
    },
    BenchmarkRunner, DbConfig, MySqlSession, RunConfig,
};

#[derive(Parser)]
#[command(
    name = "run_timings",
    about = "Time the 311 query battery and capture samples and EXPLAIN plans"
)]
struct Cli {
    /// Label for this run, e.g. "baseline" or "indexed"
    #[arg(long, env = "TAG")]
    tag: String,

    /// Parent directory of the per-tag output directories
    #[arg(long, default_value = DEFAULT_RESULTS_DIR)]
    results_dir: PathBuf,

    /// Result rows kept per sample file
    #[arg(long, default_value_t = DEFAULT_SAMPLE_LIMIT)]
    sample_rows: usize,

    #[command(flatten)]
    db: DbArgs,
}

#[derive(Args)]
struct DbArgs {
    #[arg(long, env = "DB_HOST", default_value = DEFAULT_DB_HOST)]
    host: String,

    #[arg(long, env = "DB_PORT", default_value_t = DEFAULT_DB_PORT)]
    port: u16,

    #[arg(long, env = "DB_NAME", default_value = DEFAULT_DB_NAME)]
    database: String,

    #[arg(long, env = "DB_USER", default_value = DEFAULT_DB_USER)]
    user: String,

    #[arg(long, env = "DB_PASS", default_value = DEFAULT_DB_PASS, hide_env_values = true)]
    password: String,
}

impl From<DbArgs> for DbConfig {
    fn from(a: DbArgs) -> Self {
        DbConfig {
            host: a.host,
            port: a.port,
            database: a.database,
            user: a.user,
            password: a.password,
        }
    }
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let run = RunConfig::new(cli.tag)?
        .with_results_root(cli.results_dir)
        .with_sample_limit(cli.sample_rows);
    let db = DbConfig::from(cli.db);
    tracing::info!(?db, tag = %run.tag, "starting benchmark run");

    let session = MySqlSession::connect(&db)
        .with_context(|| format!("connecting to {}:{}/{}", db.host, db.port, db.database))?;

    let summary = BenchmarkRunner::new(session, run, db)
        .run(battery())
        .context("benchmark run aborted; no timings written")?;

    println!("Done. Results in {}", summary.out_dir.display());
    Ok(())
}
