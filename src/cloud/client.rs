use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, warn};
use rusoto_core::{HttpClient, Region};
use rusoto_credential::{DefaultCredentialsProvider, ProfileProvider};
use rusoto_s3::S3Client;

/// Resolve the region, honouring a custom endpoint for S3-compatible services
pub fn resolve_region(region_name: Option<&str>, endpoint: Option<&str>) -> Region {
    if let Some(endpoint) = endpoint {
        return Region::Custom {
            name: region_name.unwrap_or("us-east-1").to_string(),
            endpoint: endpoint.to_string(),
        };
    }

    match region_name {
        Some(name) => {
            match name.parse::<Region>() {
                Ok(r) => r,
                Err(_) => {
                    warn!("Invalid region '{}', using default", name);
                    Region::default()
                }
            }
        },
        None => Region::default(),
    }
}

/// Create an S3 client with the specified region, endpoint and profile
pub fn create_s3_client(
    region_name: Option<&str>,
    endpoint: Option<&str>,
    profile: Option<&str>,
) -> Result<Arc<S3Client>> {
    let region = resolve_region(region_name, endpoint);
    debug!("Using S3 region {:?}", region);

    let http_client = HttpClient::new().context("Failed to create HTTP client")?;

    // Create S3 client with profile if specified
    let s3_client = if let Some(profile_name) = profile {
        match ProfileProvider::new() {
            Ok(mut provider) => {
                provider.set_profile(profile_name);
                S3Client::new_with(http_client, provider, region)
            },
            Err(e) => {
                warn!("Failed to create AWS profile provider: {}, using default", e);
                let provider = DefaultCredentialsProvider::new()
                    .context("Failed to create default AWS credentials provider")?;
                S3Client::new_with(http_client, provider, region)
            }
        }
    } else {
        let provider = DefaultCredentialsProvider::new()
            .context("Failed to create default AWS credentials provider")?;
        S3Client::new_with(http_client, provider, region)
    };

    Ok(Arc::new(s3_client))
}
