//! Local file utilities for the transfer pipeline.
//!
//! ## Components
//!
//! - **Compression**: gzip sink over a local temp file, plus in-memory helpers
//! - **Temp artifacts**: guards that remove staged files exactly once
//!
//! ### Compressing a string into a temp file
//!
//! ```no_run
//! use hdfs_shipper::utils::compress::GzipSink;
//! use std::path::Path;
//!
//! # fn example() -> hdfs_shipper::error::Result<()> {
//! let mut sink = GzipSink::create(Path::new("/tmp/report.gz"))?;
//! sink.write_str("rows=42\n")?;
//! sink.close()?;
//! # Ok(())
//! # }
//! ```

/// Gzip sink and in-memory gzip helpers
pub mod compress;

/// Temp artifact guards
pub mod temp;
