use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};

/// One row of a directory listing, as returned by a source namespace.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EntryMetadata {
    pub name: String,
    pub is_directory: bool,
    pub size: Option<u64>,
    pub modified: Option<DateTime<Utc>>,
}

impl EntryMetadata {
    pub fn file(name: &str, size: u64) -> Self {
        EntryMetadata {
            name: name.to_string(),
            is_directory: false,
            size: Some(size),
            modified: None,
        }
    }

    pub fn directory(name: &str) -> Self {
        EntryMetadata {
            name: name.to_string(),
            is_directory: true,
            size: None,
            modified: None,
        }
    }
}

/// A file found by the tree walker, tagged with the prefix of its parent directory.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileEntry {
    pub directory_prefix: String,
    pub name: String,
    pub is_directory: bool,
    pub size_hint: Option<u64>,
    pub mod_time: Option<DateTime<Utc>>,
}

impl FileEntry {
    pub fn from_listing(directory_prefix: &str, meta: EntryMetadata) -> Self {
        FileEntry {
            directory_prefix: directory_prefix.to_string(),
            name: meta.name,
            is_directory: meta.is_directory,
            size_hint: meta.size,
            mod_time: meta.modified,
        }
    }

    /// Full namespace path of the file.
    pub fn full_path(&self) -> String {
        format!("{}{}", self.directory_prefix, self.name)
    }
}
