use clap::{Parser, Subcommand, Args as ClapArgs, ValueEnum};
use std::path::PathBuf;

use crate::config::SourceKind;
use crate::constants::DEFAULT_CONFIG_NAME;

/// Command-line arguments for hdfs-shipper.
///
/// Every subcommand reads its defaults from the YAML config (see
/// `init-config`); flags given here override the file.
#[derive(Parser, Debug)]
#[clap(name = "hdfs-shipper", about = "Ship HDFS directory trees to object storage")]
pub struct Args {
    /// Verbose logging
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Path to configuration YAML file
    #[clap(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommands
    #[clap(subcommand)]
    pub command: Commands,
}

/// Source namespace selectable on the command line
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
pub enum SourceKindArg {
    /// Local filesystem
    Local,
    /// WebHDFS REST API
    #[value(name = "webhdfs")]
    WebHdfs,
}

impl From<SourceKindArg> for SourceKind {
    fn from(kind: SourceKindArg) -> Self {
        match kind {
            SourceKindArg::Local => SourceKind::Local,
            SourceKindArg::WebHdfs => SourceKind::WebHdfs,
        }
    }
}

/// Overrides for the `source` config section
#[derive(ClapArgs, Debug, Default)]
pub struct SourceOpts {
    /// Where files are read from (local, webhdfs)
    #[clap(long)]
    pub source_kind: Option<SourceKindArg>,

    /// WebHDFS base URL, e.g. http://namenode:9870
    #[clap(long)]
    pub webhdfs_url: Option<String>,

    /// HDFS user name sent with WebHDFS requests
    #[clap(long)]
    pub hdfs_user: Option<String>,

    /// Root directory for the local source
    #[clap(long)]
    pub source_root: Option<String>,
}

/// Overrides for the `destination` config section
#[derive(ClapArgs, Debug, Default)]
pub struct DestinationOpts {
    /// Destination bucket
    #[clap(short, long)]
    pub bucket: Option<String>,

    /// AWS region
    #[clap(long)]
    pub region: Option<String>,

    /// AWS profile
    #[clap(long)]
    pub profile: Option<String>,

    /// Custom endpoint for S3-compatible services
    #[clap(long)]
    pub endpoint: Option<String>,

    /// Directory for compressed temp files
    #[clap(long)]
    pub temp_dir: Option<String>,

    /// Upload into memory and log the keys instead of contacting S3
    #[clap(long)]
    pub dry_run: bool,
}

/// Options for the transfer and migrate subcommands.
#[derive(ClapArgs, Debug)]
pub struct TreeOpts {
    /// Source directory, must end with `/`
    pub source_prefix: String,

    /// Destination key prefix, must end with `/`
    pub dest_prefix: String,

    /// Gzip each file before upload
    #[clap(long, conflicts_with = "no_compress")]
    pub compress: bool,

    /// Upload files as they are
    #[clap(long)]
    pub no_compress: bool,

    /// Skip files without an hourly date segment instead of aborting
    #[clap(long)]
    pub skip_missing_dates: bool,

    #[clap(flatten)]
    pub source: SourceOpts,

    #[clap(flatten)]
    pub destination: DestinationOpts,
}

impl TreeOpts {
    /// Compression as requested on the command line, if at all
    pub fn compression(&self) -> Option<bool> {
        if self.compress {
            Some(true)
        } else if self.no_compress {
            Some(false)
        } else {
            None
        }
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ship every file under a source prefix
    Transfer {
        #[clap(flatten)]
        tree: TreeOpts,

        /// Name objects by the hourly date in their source path
        #[clap(long)]
        date_naming: bool,
    },

    /// Ship a tree of hourly partitions, naming objects by date
    Migrate {
        #[clap(flatten)]
        tree: TreeOpts,
    },

    /// Upload a string as a gzip object under today's date folder
    PutString {
        /// Destination key prefix, must end with `/`
        dest_prefix: String,

        /// Text to upload
        #[clap(long, conflicts_with = "file")]
        text: Option<String>,

        /// Read the text from a file (stdin when neither is given)
        #[clap(long)]
        file: Option<PathBuf>,

        #[clap(flatten)]
        destination: DestinationOpts,
    },

    /// Create a default configuration file
    InitConfig {
        /// Path to output configuration file
        #[clap(default_value = DEFAULT_CONFIG_NAME)]
        path: PathBuf,
    },
}
