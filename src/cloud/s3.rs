use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use log::{debug, info, warn};
use rusoto_core::ByteStream;
use rusoto_s3::{
    PutObjectRequest, S3Client, S3,
    CreateMultipartUploadRequest, UploadPartRequest, CompleteMultipartUploadRequest,
    CompletedPart, CompletedMultipartUpload, AbortMultipartUploadRequest
};
use tokio::runtime::Runtime;

use crate::cloud::client::create_s3_client;
use crate::cloud::ObjectStore;
use crate::constants::{S3_MAX_PARTS, S3_UPLOAD_CHUNK_SIZE as UPLOAD_CHUNK_SIZE};

/// Blocking S3 object store.
///
/// The rusoto client is async; every request is driven to completion on an
/// owned current-thread runtime and bounded by `request_timeout`.
///
/// Bodies that fit in one upload chunk are sent with a single `PutObject`.
/// Longer bodies are streamed as multipart parts of one chunk each, so memory
/// use stays at one chunk no matter how large the source file is. A failed
/// part aborts the multipart upload.
pub struct S3ObjectStore {
    client: Arc<S3Client>,
    runtime: Runtime,
    request_timeout: Duration,
    chunk_size: usize,
}

impl S3ObjectStore {
    /// Create a store for the given region, optional custom endpoint and profile.
    pub fn new(
        region_name: Option<&str>,
        endpoint: Option<&str>,
        profile: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime")?;

        // The rusoto HTTP connector must be built inside a runtime context
        let client = {
            let _guard = runtime.enter();
            create_s3_client(region_name, endpoint, profile)?
        };

        Ok(S3ObjectStore {
            client,
            runtime,
            request_timeout,
            chunk_size: UPLOAD_CHUNK_SIZE,
        })
    }

    /// Drive one S3 request to completion within the request timeout
    fn run<T, E, F>(&self, operation: &str, request: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let timeout = self.request_timeout;
        self.runtime
            .block_on(async move { tokio::time::timeout(timeout, request).await })
            .map_err(|_| anyhow!("{} timed out after {:?}", operation, timeout))?
            .context(format!("{} failed", operation))
    }

    fn put_single(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        let request = PutObjectRequest {
            bucket: bucket.to_string(),
            key: key.to_string(),
            content_length: Some(body.len() as i64),
            body: Some(ByteStream::from(body)),
            ..Default::default()
        };

        self.run("PutObject", self.client.put_object(request))?;
        Ok(())
    }

    fn put_multipart(&self, bucket: &str, key: &str, first_part: Vec<u8>, body: &mut dyn Read) -> Result<()> {
        let create_result = self.run(
            "CreateMultipartUpload",
            self.client.create_multipart_upload(CreateMultipartUploadRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                ..Default::default()
            }),
        )?;

        let upload_id = create_result.upload_id
            .ok_or_else(|| anyhow!("No upload ID returned from S3"))?;

        debug!("Started multipart upload with ID: {} for {}", upload_id, key);

        match self.upload_parts(bucket, key, &upload_id, first_part, body) {
            Ok(parts) => {
                let complete_request = CompleteMultipartUploadRequest {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    upload_id: upload_id.clone(),
                    multipart_upload: Some(CompletedMultipartUpload {
                        parts: Some(parts),
                    }),
                    ..Default::default()
                };

                self.run("CompleteMultipartUpload", self.client.complete_multipart_upload(complete_request))?;
                debug!("Completed multipart upload for {}", key);
                Ok(())
            },
            Err(e) => {
                let abort_request = AbortMultipartUploadRequest {
                    bucket: bucket.to_string(),
                    key: key.to_string(),
                    upload_id,
                    ..Default::default()
                };
                if let Err(abort_err) = self.run("AbortMultipartUpload", self.client.abort_multipart_upload(abort_request)) {
                    warn!("Failed to abort multipart upload for {}: {}", key, abort_err);
                }
                Err(e)
            }
        }
    }

    fn upload_parts(
        &self,
        bucket: &str,
        key: &str,
        upload_id: &str,
        first_part: Vec<u8>,
        body: &mut dyn Read,
    ) -> Result<Vec<CompletedPart>> {
        let mut completed_parts = Vec::new();
        let mut parts = PartReader::new(body, first_part, self.chunk_size, S3_MAX_PARTS);

        while let Some((part_number, part)) = parts.next_part()? {
            let part_size = part.len();
            let request = UploadPartRequest {
                bucket: bucket.to_string(),
                key: key.to_string(),
                upload_id: upload_id.to_string(),
                part_number,
                content_length: Some(part_size as i64),
                body: Some(ByteStream::from(part)),
                ..Default::default()
            };

            let output = self.run(&format!("UploadPart {}", part_number), self.client.upload_part(request))?;
            let e_tag = output.e_tag
                .ok_or_else(|| anyhow!("No ETag in upload part response"))?;

            completed_parts.push(CompletedPart {
                e_tag: Some(e_tag),
                part_number: Some(part_number),
            });
            debug!("Uploaded part {} ({} bytes) of {}", part_number, part_size, key);
        }

        Ok(completed_parts)
    }
}

/// How a body is sent, decided from its first chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadMethod {
    Single,
    Multipart,
}

impl UploadMethod {
    /// A first chunk shorter than a full chunk means the whole body is in hand
    fn for_first_chunk(first_chunk_len: usize, chunk_size: usize) -> Self {
        if first_chunk_len < chunk_size {
            UploadMethod::Single
        } else {
            UploadMethod::Multipart
        }
    }
}

/// Cuts a body into numbered multipart parts of `chunk_size` bytes.
///
/// Part numbers start at 1. A body that needs more than `max_parts` parts is
/// an error, so the caller can abort the upload.
struct PartReader<'a> {
    body: &'a mut dyn Read,
    pending: Option<Vec<u8>>,
    chunk_size: usize,
    next_number: usize,
    max_parts: usize,
}

impl<'a> PartReader<'a> {
    fn new(body: &'a mut dyn Read, first_part: Vec<u8>, chunk_size: usize, max_parts: usize) -> Self {
        PartReader {
            body,
            pending: Some(first_part),
            chunk_size,
            next_number: 1,
            max_parts,
        }
    }

    fn next_part(&mut self) -> Result<Option<(i64, Vec<u8>)>> {
        let part = match self.pending.take() {
            Some(part) => part,
            None => read_chunk(&mut *self.body, self.chunk_size).context("Failed to read upload body")?,
        };
        if part.is_empty() {
            return Ok(None);
        }
        if self.next_number > self.max_parts {
            return Err(anyhow!("Object needs more than {} parts", self.max_parts));
        }

        let number = self.next_number;
        self.next_number += 1;
        Ok(Some((number as i64, part)))
    }
}

impl ObjectStore for S3ObjectStore {
    fn put_object(&self, bucket: &str, key: &str, body: &mut dyn Read, size_hint: Option<u64>) -> Result<()> {
        let start_time = Instant::now();
        debug!("Starting upload to s3://{}/{} (size hint {:?})", bucket, key, size_hint);

        let first_part = read_chunk(body, self.chunk_size).context("Failed to read upload body")?;

        let (result, method) = match UploadMethod::for_first_chunk(first_part.len(), self.chunk_size) {
            UploadMethod::Single => (self.put_single(bucket, key, first_part), "single request"),
            UploadMethod::Multipart => (self.put_multipart(bucket, key, first_part, body), "multipart"),
        };

        match result {
            Ok(()) => {
                info!("Uploaded s3://{}/{} ({}) in {:?}", bucket, key, method, start_time.elapsed());
                Ok(())
            },
            Err(e) => {
                warn!("Failed to upload s3://{}/{}: {}", bucket, key, e);
                Err(e)
            }
        }
    }
}

/// Read up to `limit` bytes, stopping early only at end of stream
fn read_chunk(body: &mut dyn Read, limit: usize) -> std::io::Result<Vec<u8>> {
    let mut chunk = Vec::with_capacity(limit.min(1024 * 1024));
    (&mut *body).take(limit as u64).read_to_end(&mut chunk)?;
    Ok(chunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_chunk_splits_stream() {
        let data: Vec<u8> = (0..25u8).collect();
        let mut body: &[u8] = &data;

        let first = read_chunk(&mut body, 10).unwrap();
        let second = read_chunk(&mut body, 10).unwrap();
        let third = read_chunk(&mut body, 10).unwrap();
        let fourth = read_chunk(&mut body, 10).unwrap();

        assert_eq!(first, (0..10u8).collect::<Vec<_>>());
        assert_eq!(second.len(), 10);
        assert_eq!(third, (20..25u8).collect::<Vec<_>>());
        assert!(fourth.is_empty());
    }

    #[test]
    fn test_read_chunk_empty_body() {
        let mut body: &[u8] = &[];
        assert!(read_chunk(&mut body, UPLOAD_CHUNK_SIZE).unwrap().is_empty());
    }

    fn collect_parts(data: &[u8], chunk_size: usize, max_parts: usize) -> Result<Vec<(i64, usize)>> {
        let mut body: &[u8] = data;
        let first = read_chunk(&mut body, chunk_size).unwrap();
        let mut parts = PartReader::new(&mut body, first, chunk_size, max_parts);

        let mut sizes = Vec::new();
        while let Some((number, part)) = parts.next_part()? {
            sizes.push((number, part.len()));
        }
        Ok(sizes)
    }

    #[test]
    fn test_upload_method_for_first_chunk() {
        assert_eq!(UploadMethod::for_first_chunk(0, UPLOAD_CHUNK_SIZE), UploadMethod::Single);
        assert_eq!(UploadMethod::for_first_chunk(UPLOAD_CHUNK_SIZE - 1, UPLOAD_CHUNK_SIZE), UploadMethod::Single);
        assert_eq!(UploadMethod::for_first_chunk(UPLOAD_CHUNK_SIZE, UPLOAD_CHUNK_SIZE), UploadMethod::Multipart);
    }

    #[test]
    fn test_parts_are_numbered_from_one() {
        let data = vec![7u8; 25];
        assert_eq!(collect_parts(&data, 10, S3_MAX_PARTS).unwrap(), vec![(1, 10), (2, 10), (3, 5)]);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_tail_part() {
        let data = vec![7u8; 30];
        assert_eq!(collect_parts(&data, 10, S3_MAX_PARTS).unwrap(), vec![(1, 10), (2, 10), (3, 10)]);
    }

    #[test]
    fn test_part_limit_is_enforced() {
        let data = vec![7u8; 30];
        assert!(collect_parts(&data, 10, 3).is_ok());

        let err = collect_parts(&data, 10, 2).unwrap_err();
        assert!(err.to_string().contains("more than 2 parts"));
    }

    #[test]
    fn test_part_reader_reports_body_read_failure() {
        struct FailingBody;
        impl Read for FailingBody {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "temp file vanished"))
            }
        }

        let mut body = FailingBody;
        let mut parts = PartReader::new(&mut body, vec![1u8; 10], 10, S3_MAX_PARTS);

        assert_eq!(parts.next_part().unwrap().map(|(n, p)| (n, p.len())), Some((1, 10)));
        assert!(parts.next_part().is_err());
    }

    #[test]
    fn test_store_creation_with_custom_endpoint() {
        let store = S3ObjectStore::new(
            Some("us-east-1"),
            Some("http://localhost:9000"),
            None,
            Duration::from_secs(5),
        ).unwrap();
        assert_eq!(store.request_timeout, Duration::from_secs(5));
        assert_eq!(store.chunk_size, UPLOAD_CHUNK_SIZE);
    }
}
