use aircrash::{
    acquire::{extract_archive, locate_raw_csv},
    config::Config,
    loader::Loader,
    report::{build_figures, write_figures, write_table_parquet},
    CrashTable,
};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(author, version, about = "Clean the aviation accident dataset and build chart data")]
struct Cli {
    /// YAML config; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Unpack the downloaded archive into the raw data directory.
    Extract {
        #[arg(long)]
        archive: PathBuf,
    },
    /// Load and clean the raw CSV, then write the table as Parquet.
    Clean {
        #[arg(long)]
        raw: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Load and clean the raw CSV, then write every chart dataset.
    Report {
        #[arg(long)]
        raw: Option<PathBuf>,
    },
    /// Print the first rows as JSON lines.
    Inspect {
        #[arg(long)]
        raw: Option<PathBuf>,
        #[arg(long, default_value_t = 5)]
        head: usize,
        /// Show the file as read instead of the cleaned table.
        #[arg(long)]
        raw_table: bool,
    },
}

fn raw_path(cfg: &Config, given: Option<PathBuf>) -> Result<PathBuf> {
    match given {
        Some(p) => Ok(p),
        None => locate_raw_csv(&cfg.paths.raw_data),
    }
}

fn load_clean(cfg: &Config, raw: &Path) -> Result<CrashTable> {
    let table = Loader::new(raw, cfg.cleaning.clone())
        .load_clean()
        .with_context(|| format!("cleaning {}", raw.display()))?;
    table.check_invariants()?;
    Ok(table)
}

fn inspect(cfg: &Config, raw: &Path, head: usize, raw_table: bool) -> Result<()> {
    let loader = Loader::new(raw, cfg.cleaning.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if raw_table {
        let batch = loader.load_raw()?;
        let rows = batch.slice(0, head.min(batch.num_rows()));
        let mut writer = arrow::json::LineDelimitedWriter::new(&mut out);
        writer.write(&rows)?;
        writer.finish()?;
    } else {
        let table = loader.load_clean()?;
        for record in table.records()?.into_iter().take(head) {
            writeln!(out, "{}", serde_json::to_string(&record)?)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Command::Extract { archive } => {
            let path = extract_archive(&archive, &cfg.paths.raw_data)?;
            info!(dataset = %path.display(), "raw data ready");
        }
        Command::Clean { raw, out } => {
            let raw = raw_path(&cfg, raw)?;
            let table = load_clean(&cfg, &raw)?;
            let out = out.unwrap_or_else(|| cfg.paths.clean_file());
            let bytes = write_table_parquet(table.batch(), &out)?;
            info!(
                rows = table.num_rows(),
                bytes,
                out = %out.display(),
                "wrote cleaned table"
            );
        }
        Command::Report { raw } => {
            let raw = raw_path(&cfg, raw)?;
            let table = load_clean(&cfg, &raw)?;
            let figs = build_figures(&table)?;
            write_figures(&figs, &cfg.paths.figures)?;
        }
        Command::Inspect {
            raw,
            head,
            raw_table,
        } => {
            let raw = raw_path(&cfg, raw)?;
            inspect(&cfg, &raw, head, raw_table)?;
        }
    }
    Ok(())
}
