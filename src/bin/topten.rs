use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use topten_rs::config::{ConfigOverrides, JobOverrides, TableOverrides};
use topten_rs::{RocksTable, TopKJob, TopTenConfig};

#[derive(Parser)]
#[command(version, about = "Bounded top-K over partitioned records")]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Rank every record under INPUT and write the top K to the table
    Run {
        /// File or directory of newline-delimited records
        input: PathBuf,
        #[arg(short, long)]
        config: Option<String>,
        #[arg(short, long)]
        k: Option<usize>,
        #[arg(long)]
        table: Option<PathBuf>,
        #[arg(long)]
        parallelism: Option<usize>,
        #[arg(long)]
        split_size: Option<u64>,
        /// Clear the output family before writing
        #[arg(long, default_value_t = false)]
        truncate: bool,
    },
    /// Print the rows currently stored in the table
    Show {
        #[arg(short, long)]
        config: Option<String>,
        #[arg(long)]
        table: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Run {
            input,
            config,
            k,
            table,
            parallelism,
            split_size,
            truncate,
        } => {
            let overrides = ConfigOverrides {
                job: Some(JobOverrides {
                    top_k: k,
                    parallelism,
                    split_size_bytes: split_size,
                }),
                table: Some(TableOverrides {
                    path: table,
                    truncate: truncate.then_some(true),
                }),
            };
            let config = TopTenConfig::load(config.as_deref(), overrides)?;
            let mut sink = RocksTable::open_with_options(
                &config.table.path,
                [config.table.family.clone()],
                &config.storage,
            )
            .with_context(|| format!("opening table at {}", config.table.path.display()))?;

            let job = TopKJob::from_config(&config);
            let report = job.run_path(&input, &mut sink)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Cmd::Show { config, table } => {
            let overrides = ConfigOverrides {
                job: None,
                table: Some(TableOverrides {
                    path: table,
                    truncate: None,
                }),
            };
            let config = TopTenConfig::load(config.as_deref(), overrides)?;
            let sink = RocksTable::open_with_options(
                &config.table.path,
                [config.table.family.clone()],
                &config.storage,
            )
            .with_context(|| format!("opening table at {}", config.table.path.display()))?;

            let mut rows: Vec<BTreeMap<String, String>> = sink
                .scan(&config.table.family)?
                .into_iter()
                .map(|(_, cells)| {
                    cells
                        .into_iter()
                        .map(|(qualifier, value)| {
                            (qualifier, String::from_utf8_lossy(&value).into_owned())
                        })
                        .collect()
                })
                .collect();
            let score_column = &config.table.score_column;
            let score_of = |row: &BTreeMap<String, String>| {
                row.get(score_column)
                    .and_then(|s| s.parse::<i64>().ok())
                    .unwrap_or(i64::MIN)
            };
            rows.sort_by_key(|row| std::cmp::Reverse(score_of(row)));
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
