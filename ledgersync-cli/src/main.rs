use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use ledgersync_core::{EngineConfig, EntityRole};
use ledgersync_engine::{plan_writes, prepare, run, Approver, AutoApprove, RunCache, RunReport};
use ledgersync_ingest::CsvStore;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod prompt;

#[derive(Parser, Debug)]
#[command(
    name = "ledgersync",
    version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("LEDGERSYNC_BUILD_SHA"), ")"),
    about = "Reconcile bank movements against bookkeeping ledgers"
)]
struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Match bank movements, review the proposed changes and write them back
    Reconcile {
        /// Directory holding one <sheet>.csv per ledger
        #[arg(long)]
        data: PathBuf,

        /// Config file (default: <data>/ledgersync.toml)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the entity role from the config
        #[arg(long, value_enum)]
        role: Option<RoleArg>,

        /// Approve everything without prompting
        #[arg(long)]
        yes: bool,

        /// Stop after the proposals; nothing is written
        #[arg(long)]
        dry_run: bool,

        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,

        /// CSV field delimiter
        #[arg(long, default_value_t = ';')]
        delimiter: char,
    },

    /// Write the default configuration
    InitConfig {
        #[arg(long, default_value = ".")]
        data: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    ShowConfig {
        #[arg(long, default_value = ".")]
        data: PathBuf,

        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RoleArg {
    Parent,
    Operating,
}

impl From<RoleArg> for EntityRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::Parent => EntityRole::Parent,
            RoleArg::Operating => EntityRole::Operating,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    match cli.command {
        Command::Reconcile {
            data,
            config,
            role,
            yes,
            dry_run,
            report,
            delimiter,
        } => {
            let path = config::config_path(&data, config.as_deref());
            let mut cfg = config::load_config(&path)?;
            if let Some(role) = role {
                cfg.role = role.into();
            }
            let opts = ReconcileOpts {
                yes,
                dry_run,
                report,
                delimiter,
            };
            reconcile(&data, &cfg, &opts)?;
        }

        Command::InitConfig { data, config, force } => {
            let path = config::config_path(&data, config.as_deref());
            config::init_config(&path, force)?;
        }

        Command::ShowConfig { data, config } => {
            let path = config::config_path(&data, config.as_deref());
            let cfg = config::load_config(&path)?;
            let source = if path.exists() {
                path.display().to_string()
            } else {
                "built-in defaults".to_string()
            };
            println!("# {}\n", source);
            print!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
        }
    }

    Ok(())
}

/// Logs go to stderr so prompts and results on stdout stay readable.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

struct ReconcileOpts {
    yes: bool,
    dry_run: bool,
    report: Option<PathBuf>,
    delimiter: char,
}

fn reconcile(data: &Path, cfg: &EngineConfig, opts: &ReconcileOpts) -> Result<()> {
    if !data.is_dir() {
        bail!("data directory not found: {}", data.display());
    }
    if !opts.delimiter.is_ascii() {
        bail!("delimiter must be a single ASCII character");
    }
    let mut store = CsvStore::new(data).with_delimiter(opts.delimiter as u8);
    let mut cache = RunCache::new();

    let report = if opts.dry_run {
        dry_run(&store, cfg, &mut cache)?
    } else {
        let mut approver: Box<dyn Approver> = if opts.yes {
            Box::new(AutoApprove)
        } else {
            Box::new(prompt::StdinApprover)
        };
        run(&mut store, cfg, &mut cache, approver.as_mut())
            .with_context(|| format!("reconciling {}", data.display()))?
    };

    println!("\n{}", report);

    if let Some(path) = &opts.report {
        let json = serde_json::to_string_pretty(&report).context("serialize report")?;
        fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    if report.has_failures() {
        bail!(
            "{} writes failed; rows written before the failure were kept",
            report.failed_writes.len()
        );
    }
    Ok(())
}

fn dry_run(store: &CsvStore, cfg: &EngineConfig, cache: &mut RunCache) -> Result<RunReport> {
    let prepared = prepare(store, cfg, cache).context("reading ledgers")?;

    for review in prepared.reviews.iter().filter(|r| !r.changes.is_empty()) {
        println!("{} (row {}):", review.key, review.row_number);
        for change in &review.changes {
            println!("  {}", change.description);
        }
    }

    let every_key: BTreeSet<String> = prepared.reconciliation.assignments.keys().cloned().collect();
    let plan = plan_writes(
        &prepared.snapshot,
        cfg,
        &prepared.reconciliation.assignments,
        &prepared.reviews,
        &every_key,
    );
    println!(
        "\nDry run: {} cells would be written if everything were approved",
        plan.cells.len()
    );

    Ok(RunReport::new(&prepared, None, None))
}
