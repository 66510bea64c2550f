use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};

use nyc311bench::normalize::normalize_file;

#[derive(Parser)]
#[command(
    name = "normalize_csv",
    about = "Rewrite a 311 complaints CSV into the canonical ten-column layout"
)]
struct Cli {
    /// Source CSV
    #[arg(long = "in", value_name = "PATH")]
    input: PathBuf,

    /// Destination CSV (overwritten)
    #[arg(long = "out", value_name = "PATH")]
    output: PathBuf,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let summary = normalize_file(&cli.input, &cli.output).with_context(|| {
        format!(
            "normalizing {} -> {}",
            cli.input.display(),
            cli.output.display()
        )
    })?;

    println!(
        "Wrote {} rows to {} ({} of 10 columns found)",
        summary.rows,
        cli.output.display(),
        summary.resolved.len()
    );
    Ok(())
}
