use std::io::Read;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use serde::Deserialize;

use crate::constants::WEBHDFS_API_ROOT;
use crate::models::EntryMetadata;
use crate::namespace::Namespace;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListStatusResponse {
    file_statuses: FileStatuses,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct FileStatuses {
    #[serde(default)]
    file_status: Vec<FileStatus>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileStatus {
    path_suffix: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    length: u64,
    #[serde(default)]
    modification_time: i64,
}

impl From<FileStatus> for EntryMetadata {
    fn from(status: FileStatus) -> Self {
        let is_directory = status.kind == "DIRECTORY";
        EntryMetadata {
            name: status.path_suffix,
            is_directory,
            size: if is_directory { None } else { Some(status.length) },
            modified: DateTime::<Utc>::from_timestamp_millis(status.modification_time),
        }
    }
}

/// HDFS namespace reached through the WebHDFS REST API.
///
/// `OPEN` requests are redirected by the namenode to a datanode; the
/// redirect is followed and the response body is streamed, never buffered.
pub struct WebHdfsNamespace {
    client: Client,
    base_url: Url,
    user: Option<String>,
}

impl WebHdfsNamespace {
    /// Create a namespace for a namenode such as `http://namenode:9870`.
    pub fn new(base_url: &str, user: Option<&str>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .context(format!("Invalid WebHDFS URL: {}", base_url))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create WebHDFS HTTP client")?;

        Ok(WebHdfsNamespace {
            client,
            base_url,
            user: user.map(str::to_string),
        })
    }

    fn operation_url(&self, path: &str, op: &str) -> Url {
        let mut url = self.base_url.clone();
        url.set_path(&format!("{}/{}", WEBHDFS_API_ROOT, path.trim_start_matches('/')));
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("op", op);
            if let Some(user) = &self.user {
                query.append_pair("user.name", user);
            }
        }
        url
    }

    fn get(&self, path: &str, op: &str) -> Result<Response> {
        let url = self.operation_url(path, op);
        debug!("WebHDFS {} {}", op, url);

        let response = self.client.get(url.clone()).send()
            .context(format!("WebHDFS request failed: {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(anyhow!("WebHDFS {} on {} returned {}: {}", op, path, status, body.trim()));
        }

        Ok(response)
    }
}

impl Namespace for WebHdfsNamespace {
    fn list_directory(&self, path: &str) -> Result<Vec<EntryMetadata>> {
        let response = self.get(path, "LISTSTATUS")?;
        let listing: ListStatusResponse = serde_json::from_reader(response)
            .context(format!("Failed to parse LISTSTATUS response for {}", path))?;

        Ok(listing.file_statuses.file_status.into_iter().map(EntryMetadata::from).collect())
    }

    fn open_read(&self, path: &str) -> Result<Box<dyn Read + Send>> {
        let response = self.get(path, "OPEN")?;
        Ok(Box::new(response))
    }
}
