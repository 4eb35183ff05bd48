use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simplelog::{Config, TermLogger, TerminalMode, ColorChoice};

use hdfs_shipper::cli::{Args, Commands, DestinationOpts, SourceOpts, TreeOpts};
use hdfs_shipper::cloud::memory::MemoryObjectStore;
use hdfs_shipper::cloud::s3::S3ObjectStore;
use hdfs_shipper::cloud::ObjectStore;
use hdfs_shipper::config::{load_config, ShipperConfig, SourceKind};
use hdfs_shipper::namespace::local::LocalNamespace;
use hdfs_shipper::namespace::webhdfs::WebHdfsNamespace;
use hdfs_shipper::namespace::Namespace;
use hdfs_shipper::naming::SystemClock;
use hdfs_shipper::transfer::{MissingDatePolicy, TransferPipeline};

fn main() -> Result<()> {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    initialize_logging(args.verbose)?;

    match &args.command {
        Commands::InitConfig { path } => {
            info!("Creating default configuration file at {}", path.display());
            ShipperConfig::create_default_config_file(path)?;
            info!("Configuration created successfully");
            Ok(())
        },
        Commands::Transfer { tree, date_naming } => {
            let config = load_tree_config(args.config.as_deref(), tree, Some(*date_naming))?;
            run_tree(&config, tree, config.transfer.date_naming)
        },
        Commands::Migrate { tree } => {
            let config = load_tree_config(args.config.as_deref(), tree, None)?;
            run_tree(&config, tree, true)
        },
        Commands::PutString { dest_prefix, text, file, destination } => {
            let mut config = load_config(args.config.as_deref())?;
            apply_destination_overrides(&mut config, destination);
            let text = read_text(text.as_deref(), file.as_deref())?;
            run_put_string(&config, destination.dry_run, dest_prefix, &text)
        },
    }
}

/// Initialize logging with the specified verbosity level
fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    TermLogger::init(
        log_level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    ).context("Failed to initialize logger")?;
    Ok(())
}

/// Load configuration and apply the tree subcommand's flags on top
fn load_tree_config(config_path: Option<&Path>, tree: &TreeOpts, date_naming: Option<bool>) -> Result<ShipperConfig> {
    let mut config = load_config(config_path)?;

    apply_source_overrides(&mut config, &tree.source);
    apply_destination_overrides(&mut config, &tree.destination);

    if let Some(compress) = tree.compression() {
        config.transfer.compress = compress;
    }
    if date_naming == Some(true) {
        config.transfer.date_naming = true;
    }
    if tree.skip_missing_dates {
        config.transfer.missing_date = MissingDatePolicy::Skip;
    }

    config.validate()?;
    Ok(config)
}

fn apply_source_overrides(config: &mut ShipperConfig, opts: &SourceOpts) {
    if let Some(kind) = opts.source_kind {
        config.source.kind = kind.into();
    }
    if opts.webhdfs_url.is_some() {
        config.source.url = opts.webhdfs_url.clone();
    }
    if opts.hdfs_user.is_some() {
        config.source.user = opts.hdfs_user.clone();
    }
    if opts.source_root.is_some() {
        config.source.root = opts.source_root.clone();
    }
}

fn apply_destination_overrides(config: &mut ShipperConfig, opts: &DestinationOpts) {
    let overrides = [
        (&mut config.destination.bucket, &opts.bucket),
        (&mut config.destination.region, &opts.region),
        (&mut config.destination.profile, &opts.profile),
        (&mut config.destination.endpoint, &opts.endpoint),
        (&mut config.transfer.temp_dir, &opts.temp_dir),
    ];
    for (target, value) in overrides {
        if value.is_some() {
            *target = value.clone();
        }
    }
}

fn build_namespace(config: &ShipperConfig) -> Result<Box<dyn Namespace>> {
    match config.source.kind {
        SourceKind::Local => {
            let root = config.source.root.as_deref().unwrap_or("/");
            info!("Reading from local filesystem rooted at {}", root);
            Ok(Box::new(LocalNamespace::new(root)))
        },
        SourceKind::WebHdfs => {
            let url = config.source.url
                .as_deref()
                .ok_or_else(|| anyhow!("source.url is required for webhdfs"))?;
            info!("Reading from WebHDFS at {}", url);
            let namespace = WebHdfsNamespace::new(url, config.source.user.as_deref(), config.request_timeout())?;
            Ok(Box::new(namespace))
        }
    }
}

/// Real S3 store, or a memory store when `dry_run` is set
fn build_store(config: &ShipperConfig, dry_run: Option<&Arc<MemoryObjectStore>>) -> Result<Box<dyn ObjectStore>> {
    if let Some(memory) = dry_run {
        warn!("Dry run: objects are kept in memory and nothing is sent to S3");
        return Ok(Box::new(Arc::clone(memory)));
    }

    let store = S3ObjectStore::new(
        config.destination.region.as_deref(),
        config.destination.endpoint.as_deref(),
        config.destination.profile.as_deref(),
        config.request_timeout(),
    )?;
    Ok(Box::new(store))
}

fn require_bucket(config: &ShipperConfig) -> Result<String> {
    config.destination.bucket
        .clone()
        .ok_or_else(|| anyhow!("No bucket given; pass --bucket or set destination.bucket"))
}

fn prepare_temp_dir(config: &ShipperConfig) -> Result<PathBuf> {
    let temp_dir = config.temp_dir();
    fs::create_dir_all(&temp_dir)
        .context(format!("Failed to create temp directory {}", temp_dir.display()))?;
    Ok(temp_dir)
}

fn run_tree(config: &ShipperConfig, tree: &TreeOpts, date_naming: bool) -> Result<()> {
    let bucket = require_bucket(config)?;
    prepare_temp_dir(config)?;

    let dry_run = tree.destination.dry_run.then(|| Arc::new(MemoryObjectStore::new()));
    let pipeline = TransferPipeline::new(
        build_namespace(config)?,
        build_store(config, dry_run.as_ref())?,
        Arc::new(SystemClock),
        config.transfer_options(),
    );

    info!("Shipping {} to s3://{}/{} (compress: {}, date naming: {})",
          tree.source_prefix, bucket, tree.dest_prefix, config.transfer.compress, date_naming);

    let result = pipeline.transfer_tree(
        &tree.source_prefix,
        &tree.dest_prefix,
        &bucket,
        config.transfer.compress,
        date_naming,
    );

    if let Some(memory) = &dry_run {
        report_dry_run(memory, &bucket);
    }

    match result {
        Ok(count) => {
            info!("Transfer completed successfully: {} file(s) shipped", count);
            Ok(())
        },
        Err(e) => {
            error!("{} file(s) were uploaded before the failure and were left in place", e.completed);
            Err(e.into())
        }
    }
}

fn run_put_string(config: &ShipperConfig, dry_run: bool, dest_prefix: &str, text: &str) -> Result<()> {
    let bucket = require_bucket(config)?;
    prepare_temp_dir(config)?;

    let dry_run = dry_run.then(|| Arc::new(MemoryObjectStore::new()));
    let pipeline = TransferPipeline::new(
        LocalNamespace::default(),
        build_store(config, dry_run.as_ref())?,
        Arc::new(SystemClock),
        config.transfer_options(),
    );

    let key = pipeline.write_string_as_compressed_object(text, dest_prefix, &bucket)?;

    if let Some(memory) = &dry_run {
        report_dry_run(memory, &bucket);
    }
    info!("Uploaded text to s3://{}/{}", bucket, key);
    Ok(())
}

fn read_text(text: Option<&str>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (Some(text), _) => Ok(text.to_string()),
        (None, Some(path)) => fs::read_to_string(path)
            .context(format!("Failed to read text from {}", path.display())),
        (None, None) => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read text from stdin")?;
            Ok(buffer)
        }
    }
}

fn report_dry_run(memory: &MemoryObjectStore, bucket: &str) {
    let keys = memory.keys(bucket);
    info!("Dry run would have uploaded {} object(s):", keys.len());
    for key in keys {
        let size = memory.get(bucket, &key).map(|body| body.len()).unwrap_or(0);
        info!("  s3://{}/{} ({} bytes)", bucket, key, size);
    }
}
