//! Destination key derivation.
//!
//! Two schemes are supported:
//!
//! - **timestamp**: `<dest_prefix><millis><base_name>`
//! - **date extraction**: `<dest_prefix><label>/<yyyymmdd>/<millis><base_name>`,
//!   where `label` and the date come from a `<label>/hourly/<year>/<month>/<day>`
//!   segment of the source path.
//!
//! Milliseconds come from an injected [`Clock`], so two files named within the
//! same millisecond get the same timestamp. That window is accepted.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::constants::HOURLY_DATE_PATTERN;
use crate::error::{require_trailing_separator, Result, TransferError};

lazy_static! {
    static ref HOURLY_DATE_RE: Regex =
        Regex::new(HOURLY_DATE_PATTERN).expect("hourly date pattern is a valid regex");
}

/// Time source used for key and temp-file naming.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Calendar date used for date folders.
    fn today(&self) -> NaiveDate;
}

/// Wall clock. Date folders follow the host's local calendar date.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock frozen at one instant, for deterministic naming. Its date is the
/// UTC date of that instant, independent of the host time zone.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    millis: i64,
}

impl FixedClock {
    pub fn new(millis: i64) -> Self {
        FixedClock { millis }
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.millis
    }

    fn today(&self) -> NaiveDate {
        chrono::DateTime::from_timestamp_millis(self.millis)
            .map(|dt| dt.date_naive())
            .unwrap_or_default()
    }
}

/// Date segment parsed out of a source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateStamp {
    pub label: String,
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl DateStamp {
    /// `yyyymmdd` token used as the destination folder.
    pub fn token(&self) -> String {
        format!("{:04}{:02}{:02}", self.year, self.month, self.day)
    }
}

/// Find the `<label>/hourly/<year>/<month>/<day>` segment in `path`.
///
/// Returns `None` when the path has no such segment. That is a policy outcome
/// for the caller, not a failure.
pub fn extract_date_stamp(path: &str) -> Option<DateStamp> {
    let caps = HOURLY_DATE_RE.captures(path)?;
    Some(DateStamp {
        label: caps[1].to_string(),
        year: caps[2].parse().ok()?,
        month: caps[3].parse().ok()?,
        day: caps[4].parse().ok()?,
    })
}

/// Derives destination keys under a fixed destination prefix.
#[derive(Clone)]
pub struct PathNamer {
    dest_prefix: String,
    clock: Arc<dyn Clock>,
}

impl PathNamer {
    /// Create a namer. `dest_prefix` must end with `/`.
    pub fn new(dest_prefix: &str, clock: Arc<dyn Clock>) -> Result<Self> {
        require_trailing_separator("destination", dest_prefix)?;
        Ok(PathNamer {
            dest_prefix: dest_prefix.to_string(),
            clock,
        })
    }

    pub fn dest_prefix(&self) -> &str {
        &self.dest_prefix
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Derive the key for `base_name`, read from `source_path`.
    ///
    /// In date mode a path without an hourly segment is
    /// [`TransferError::NoDateMatch`].
    pub fn derive_key(&self, source_path: &str, base_name: &str, use_date_extraction: bool) -> Result<String> {
        let millis = self.clock.now_millis();

        let key = if use_date_extraction {
            let stamp = extract_date_stamp(source_path)
                .ok_or_else(|| TransferError::NoDateMatch { path: source_path.to_string() })?;
            format!("{}{}/{}/{}{}", self.dest_prefix, stamp.label, stamp.token(), millis, base_name)
        } else {
            format!("{}{}{}", self.dest_prefix, millis, base_name)
        };

        debug!("Derived key {} for {}", key, source_path);
        Ok(key)
    }

    /// Key under today's `yyyymmdd` folder: `<dest_prefix><yyyymmdd>/<millis><base_name>`.
    pub fn date_folder_key(&self, millis: i64, base_name: &str) -> String {
        format!(
            "{}{}/{}{}",
            self.dest_prefix,
            self.clock.today().format("%Y%m%d"),
            millis,
            base_name
        )
    }
}

impl std::fmt::Debug for PathNamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PathNamer")
            .field("dest_prefix", &self.dest_prefix)
            .finish_non_exhaustive()
    }
}
