//! Object storage interface for STOFS output (S3 compatible).
//!
//! The source bucket is public, so requests are sent unsigned by default.
//! Object bodies are never fetched here: libnetcdf reads them through
//! [`ObjectStorage::object_url`] with HTTP range requests.

use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::env;
use std::sync::Arc;
use tracing::{debug, instrument};

use mesh_common::{MeshError, MeshResult};

/// Public bucket holding STOFS-2D-Global output.
pub const DEFAULT_BUCKET: &str = "noaa-gestofs-pds";

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// Custom S3 endpoint URL (path-style). `None` means AWS.
    pub endpoint: Option<String>,
    /// Bucket name
    pub bucket: String,
    /// AWS region
    pub region: String,
    /// Send unsigned requests (public buckets)
    pub anonymous: bool,
    /// Allow HTTP (for a local S3 stand-in)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            bucket: DEFAULT_BUCKET.to_string(),
            region: "us-east-1".to_string(),
            anonymous: true,
            allow_http: false,
        }
    }
}

impl ObjectStorageConfig {
    /// Defaults for `bucket`, overridable through `S3_ENDPOINT`, `S3_REGION`,
    /// `S3_ANONYMOUS` and `S3_ALLOW_HTTP`.
    pub fn from_env(bucket: impl Into<String>) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: env::var("S3_ENDPOINT").ok().filter(|e| !e.is_empty()),
            bucket: bucket.into(),
            region: env::var("S3_REGION").unwrap_or(defaults.region),
            anonymous: env::var("S3_ANONYMOUS")
                .map(|v| v != "false")
                .unwrap_or(defaults.anonymous),
            allow_http: env::var("S3_ALLOW_HTTP")
                .map(|v| v == "true")
                .unwrap_or(defaults.allow_http),
        }
    }

    /// HTTP base URL objects of the bucket are served from.
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), self.bucket),
            None => format!("https://{}.s3.amazonaws.com", self.bucket),
        }
    }
}

/// Metadata returned by a HEAD request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: usize,
}

/// Object storage client for STOFS source data.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    base_url: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> MeshResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_skip_signature(config.anonymous);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder.build().map_err(|e| {
            MeshError::source_unavailable(
                config.bucket.as_str(),
                format!("Failed to create S3 client: {}", e),
            )
        })?;

        Ok(Self::with_store(Arc::new(store), config))
    }

    /// Wrap an existing store (any `ObjectStore` implementation).
    pub fn with_store(store: Arc<dyn ObjectStore>, config: &ObjectStorageConfig) -> Self {
        Self {
            store,
            bucket: config.bucket.clone(),
            base_url: config.base_url(),
        }
    }

    /// HEAD an object; a missing object is `SourceUnavailable`.
    pub async fn head(&self, key: &str) -> MeshResult<ObjectInfo> {
        self.probe(key)
            .await?
            .ok_or_else(|| MeshError::source_unavailable(key, "object not found"))
    }

    /// Check if an object exists.
    pub async fn exists(&self, key: &str) -> MeshResult<bool> {
        Ok(self.probe(key).await?.is_some())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket, key = %key))]
    async fn probe(&self, key: &str) -> MeshResult<Option<ObjectInfo>> {
        let location = Path::from(key);

        match self.store.head(&location).await {
            Ok(meta) => {
                debug!(size = meta.size, "Object found");
                Ok(Some(ObjectInfo {
                    key: key.to_string(),
                    size: meta.size,
                }))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(MeshError::source_unavailable(
                key,
                format!("Failed to check object: {}", e),
            )),
        }
    }

    /// HTTP URL of an object.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;

    fn memory_storage() -> (Arc<InMemory>, ObjectStorage) {
        let memory = Arc::new(InMemory::new());
        let storage = ObjectStorage::with_store(memory.clone(), &ObjectStorageConfig::default());
        (memory, storage)
    }

    #[test]
    fn test_object_url() {
        let (_, storage) = memory_storage();
        assert_eq!(
            storage.object_url("stofs_2d_glo.20240516/stofs_2d_glo.t00z.fields.cwl.nc"),
            "https://noaa-gestofs-pds.s3.amazonaws.com/stofs_2d_glo.20240516/stofs_2d_glo.t00z.fields.cwl.nc"
        );
    }

    #[test]
    fn test_custom_endpoint_is_path_style() {
        let config = ObjectStorageConfig {
            endpoint: Some("http://localhost:9000/".to_string()),
            bucket: "stofs".to_string(),
            ..Default::default()
        };
        assert_eq!(config.base_url(), "http://localhost:9000/stofs");
    }

    #[tokio::test]
    async fn test_head_existing_and_missing() {
        let (memory, storage) = memory_storage();
        memory
            .put(
                &Path::from("run/a.nc"),
                bytes::Bytes::from_static(b"CDF\x01").into(),
            )
            .await
            .unwrap();

        let info = storage.head("run/a.nc").await.unwrap();
        assert_eq!(info.size, 4);
        assert!(storage.exists("run/a.nc").await.unwrap());

        assert!(!storage.exists("run/b.nc").await.unwrap());
        assert!(matches!(
            storage.head("run/b.nc").await,
            Err(MeshError::SourceUnavailable { .. })
        ));
    }
}
