//! Object retrieval from remote storage.
//!
//! [`ObjectStore`] is the seam between the pipeline and the storage SDK.
//! [`fetch_object`] sits on top of it and only hands out bodies that can be
//! consumed as a single-pass stream.

use crate::error::ExtractError;
use crate::types::ObjectRef;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use bytes::Bytes;
use std::pin::Pin;
use tokio::io::AsyncRead;
use tracing::{debug, info};

/// Single-pass byte stream positioned at the start of an object's content.
pub type ObjectStream = Pin<Box<dyn AsyncRead + Send>>;

/// Body returned by a storage backend.
pub enum ObjectBody {
    /// Streaming body, read incrementally
    Stream(ObjectStream),

    /// Fully buffered body with no streaming capability
    Buffered(Bytes),
}

impl std::fmt::Debug for ObjectBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectBody::Stream(_) => f.write_str("Stream(..)"),
            ObjectBody::Buffered(bytes) => write!(f, "Buffered({} bytes)", bytes.len()),
        }
    }
}

/// Raw answer of a storage backend to an object request.
#[derive(Debug, Default)]
pub struct ObjectResponse {
    /// Object content, if the backend sent any
    pub body: Option<ObjectBody>,

    /// Advertised content length in bytes
    pub content_length: Option<u64>,
}

/// Storage backend able to retrieve an object by bucket and key.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Issue the retrieval request.
    ///
    /// Transport and authorization failures must be reported as
    /// [`ExtractError::Transport`].
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectResponse, ExtractError>;
}

/// Fetch an object as a readable stream.
///
/// # Errors
///
/// - [`ExtractError::ObjectUnreadable`] when the backend answered without a
///   body, or with a body that cannot be streamed
/// - [`ExtractError::Transport`] from the backend, unmodified
pub async fn fetch_object<S>(store: &S, object: &ObjectRef) -> Result<ObjectStream, ExtractError>
where
    S: ObjectStore + ?Sized,
{
    debug!(bucket = %object.bucket, key = %object.key, "requesting object");
    let response = store.get_object(&object.bucket, &object.key).await?;

    match response.body {
        Some(ObjectBody::Stream(stream)) => {
            info!(
                object = %object,
                content_length = ?response.content_length,
                "streaming object"
            );
            Ok(stream)
        }
        Some(ObjectBody::Buffered(_)) | None => Err(ExtractError::ObjectUnreadable {
            bucket: object.bucket.clone(),
            key: object.key.clone(),
        }),
    }
}

/// [`ObjectStore`] backed by Amazon S3.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS environment (region, credentials
    /// chain, endpoint overrides).
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<ObjectResponse, ExtractError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(Box::new(aws_sdk_s3::Error::from(e))))?;

        let content_length = output.content_length().and_then(|len| u64::try_from(len).ok());
        let stream: ObjectStream = Box::pin(output.body.into_async_read());

        Ok(ObjectResponse {
            body: Some(ObjectBody::Stream(stream)),
            content_length,
        })
    }
}
