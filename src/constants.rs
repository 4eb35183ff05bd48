//! Global constants for hdfs-shipper.
//!
//! This module centralizes all hardcoded values to improve maintainability
//! and make configuration changes easier.

// Memory and buffer size constants
/// Buffer used when streaming a source file into a gzip sink (64KB)
pub const STREAMING_BUFFER_SIZE: usize = 64 * 1024;

/// Application-level write buffer in front of the gzip encoder (64KB)
pub const SINK_BUFFER_SIZE: usize = 64 * 1024;

// Cloud storage constants
/// S3 upload chunk size (8MB, S3 minimum is 5MB)
pub const S3_UPLOAD_CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// S3 minimum part size for multipart uploads (5MB)
pub const S3_MIN_PART_SIZE: usize = 5 * 1024 * 1024;

/// S3 maximum parts per upload
pub const S3_MAX_PARTS: usize = 10000;

// Timeout constants
/// Default timeout for a single remote call in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 300;

// Naming constants
/// Path separator used by both the source namespace and object keys
pub const PATH_SEPARATOR: char = '/';

/// Suffix appended to compressed temp artifacts and object names
pub const GZIP_SUFFIX: &str = ".gz";

/// Grammar for `<label>/hourly/<year>/<month>/<day>` segments in source paths
pub const HOURLY_DATE_PATTERN: &str = r"([a-zA-Z0-9]+)/hourly/(20\d{2})/(\d{1,2})/(\d{1,2})(?:/|$)";

/// WebHDFS REST root
pub const WEBHDFS_API_ROOT: &str = "/webhdfs/v1";

// Default file names
pub const DEFAULT_CONFIG_NAME: &str = "hdfs-shipper.yaml";
