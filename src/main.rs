// Allow panic/unwrap/expect in tests (denied globally via Cargo.toml lints)
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic_in_result_fn,
        clippy::unwrap_in_result,
        clippy::indexing_slicing
    )
)]

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::{Path, PathBuf};
use tf_exporter::config::{load_config, ExportConfig, ExportFormat, DEFAULT_CONFIG_FILE};
use tf_exporter::export::run_export;
use tf_exporter::graph::{format_cycle, CycleValidator, TypeGraph};
use tf_exporter::logging::{init_logging, log_file_path, parse_rotation, LogConfig};
use tf_exporter::registry::{Registry, SnapshotRegistry};
use tf_exporter::utils::format_display_path;
use tokio::sync::watch;
use tracing::{info, warn};

/// tf-exporter - rebuild re-appliable declarative configuration from live resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable JSON log format (for log aggregation)
    #[arg(long, global = true, env = "TF_EXPORTER_LOG_JSON", default_value = "false")]
    log_json: bool,

    /// Log rotation period: daily, hourly, or never
    #[arg(long, global = true, env = "TF_EXPORTER_LOG_ROTATION", default_value = "daily")]
    log_rotation: String,

    /// Custom log directory (default: ~/.tf-exporter/logs)
    #[arg(long, global = true, env = "TF_EXPORTER_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export the selected resources into configuration files
    Export(ExportArgs),
    /// Check the reference catalog for cycles that are not allow-listed
    Validate(SnapshotArgs),
    /// List the registered resource types
    Types(SnapshotArgs),
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// Snapshot directory with catalog.toml and instances/
    #[arg(long, env = "TF_EXPORTER_SNAPSHOT")]
    snapshot: PathBuf,
}

#[derive(Args, Debug)]
struct ExportArgs {
    #[command(flatten)]
    source: SnapshotArgs,

    /// Export config file (default: ./tf-exporter.toml)
    #[arg(long, short, env = "TF_EXPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Output format: json or json_hcl
    #[arg(long)]
    format: Option<ExportFormat>,

    /// Resource type to export, optionally `type::label_regex` (repeatable)
    #[arg(long = "type", value_name = "TYPE")]
    resource_types: Vec<String>,

    /// Resource type or `type::label_regex` to leave out (repeatable)
    #[arg(long = "exclude", value_name = "TYPE")]
    exclude_filter_resources: Vec<String>,

    /// Also write terraform.tfstate
    #[arg(long)]
    include_state: bool,

    /// One file per resource type
    #[arg(long)]
    split_files: bool,

    /// Skip resource types that cannot be read instead of failing
    #[arg(long)]
    log_permission_errors: bool,

    /// Pull in instances referenced by exported ones
    #[arg(long)]
    include_dependencies: bool,

    /// Export even when cycles are not allow-listed
    #[arg(long)]
    ignore_cyclic_dependencies: bool,
}

impl ExportArgs {
    /// Flags given on the command line win over the config file.
    fn apply(&self, config: &mut ExportConfig) {
        if let Some(output) = &self.output {
            config.directory.clone_from(output);
        }
        if let Some(format) = self.format {
            config.export_format = format;
        }
        if !self.resource_types.is_empty() {
            config.resource_types.clone_from(&self.resource_types);
        }
        if !self.exclude_filter_resources.is_empty() {
            config
                .exclude_filter_resources
                .clone_from(&self.exclude_filter_resources);
        }
        config.include_state_file |= self.include_state;
        config.split_files_by_resource |= self.split_files;
        config.log_permission_errors |= self.log_permission_errors;
        config.include_dependencies |= self.include_dependencies;
        config.ignore_cyclic_dependencies |= self.ignore_cyclic_dependencies;
    }
}

async fn open_snapshot(path: &Path) -> Result<SnapshotRegistry> {
    SnapshotRegistry::open(path)
        .await
        .wrap_err_with(|| {
            format!(
                "Failed to open snapshot {}",
                format_display_path(&path.to_string_lossy())
            )
        })
}

/// Flip the cancel flag on Ctrl-C.
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling export");
            let _ = cancel_tx.send(true);
        }
    });
    cancel_rx
}

async fn export(args: &ExportArgs) -> Result<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    let mut config = load_config(&config_path).await?;
    args.apply(&mut config);

    let registry = open_snapshot(&args.source.snapshot).await?;
    info!(
        "Exporting from {} into {}",
        format_display_path(&args.source.snapshot.to_string_lossy()),
        format_display_path(&config.directory.to_string_lossy())
    );

    let report = run_export(&registry, &config, cancel_on_ctrl_c()).await?;
    print!("{report}");
    Ok(())
}

async fn validate(args: &SnapshotArgs) -> Result<()> {
    let registry = open_snapshot(&args.snapshot).await?;
    let catalog = registry.catalog();
    let report =
        CycleValidator::from_catalog(&catalog).classify(&TypeGraph::from_catalog(&catalog));

    for cycle in &report.tolerated {
        println!("allowed  {}", format_cycle(cycle));
    }
    for cycle in &report.fatal {
        println!("FATAL    {}", format_cycle(cycle));
    }
    if report.is_clean() {
        println!(
            "{} resource type(s), no cycles outside the allow-list",
            catalog.types().count()
        );
        Ok(())
    } else {
        Err(eyre!(
            "{} cycle(s) are not on the allow-list",
            report.fatal.len()
        ))
    }
}

async fn types(args: &SnapshotArgs) -> Result<()> {
    let registry = open_snapshot(&args.snapshot).await?;
    let catalog = registry.catalog();
    for (resource_type, spec) in catalog.iter() {
        println!("{resource_type}\t{} reference(s)", spec.references.len());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install color-eyre error hooks for colored error output
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_config = LogConfig {
        log_dir: cli
            .log_dir
            .clone()
            .unwrap_or_else(LogConfig::default_log_dir),
        json_format: cli.log_json,
        rotation: parse_rotation(&cli.log_rotation),
        ..LogConfig::default()
    };
    let log_dir = log_config.log_dir.clone();
    if let Err(e) = init_logging(log_config) {
        eprintln!();
        eprintln!("Error: Failed to initialize logging: {e}");
        eprintln!("Log directory: {}", format_display_path(&log_dir.to_string_lossy()));
        eprintln!();
        return Err(e);
    }

    let result = match &cli.command {
        Command::Export(args) => export(args).await,
        Command::Validate(args) => validate(args).await,
        Command::Types(args) => types(args).await,
    };

    if result.is_err() {
        if let Some(path) = log_file_path() {
            eprintln!("Logs: {}", format_display_path(&path.to_string_lossy()));
        }
    }
    result
}
