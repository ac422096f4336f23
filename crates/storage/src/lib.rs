//! Storage access for STOFS source objects.
//!
//! Provides:
//! - Object storage (S3, anonymous access to the public NOAA bucket) for
//!   existence probes
//! - HTTP URLs that libnetcdf opens with byte-range requests

pub mod object_store;

pub use self::object_store::{ObjectInfo, ObjectStorage, ObjectStorageConfig, DEFAULT_BUCKET};
