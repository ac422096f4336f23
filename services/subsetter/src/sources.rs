//! Dataset sources backing the subsetter: the public S3 bucket or a local mirror.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use mesh_common::{DatasetSource, MeshError, MeshResult, RawDataset, VariableFilter};
use netcdf_parser::{byte_range_url, NetcdfReader};
use storage::ObjectStorage;

/// Reads objects straight from S3 with HTTP range requests.
///
/// `open` blocks; call it from a blocking thread, never from an async task.
pub struct S3DatasetSource {
    storage: Arc<ObjectStorage>,
    runtime: Handle,
}

impl S3DatasetSource {
    pub fn new(storage: Arc<ObjectStorage>, runtime: Handle) -> Self {
        Self { storage, runtime }
    }
}

impl DatasetSource for S3DatasetSource {
    fn open(&self, key: &str, filter: &VariableFilter) -> MeshResult<RawDataset> {
        // libnetcdf reports a missing remote object as a generic open error,
        // so existence is settled with a HEAD first.
        let info = self.runtime.block_on(self.storage.head(key))?;
        let url = byte_range_url(&self.storage.object_url(key));
        debug!(key = %key, size = info.size, url = %url, "Opening remote dataset");
        NetcdfReader::open_path(&url, filter)
    }
}

/// Reads objects from a directory laid out like the bucket.
pub struct LocalDatasetSource {
    root: PathBuf,
}

impl LocalDatasetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl DatasetSource for LocalDatasetSource {
    fn open(&self, key: &str, filter: &VariableFilter) -> MeshResult<RawDataset> {
        let path = self.root.join(key);
        if !path.is_file() {
            return Err(MeshError::source_unavailable(
                key,
                format!("{} does not exist", path.display()),
            ));
        }
        NetcdfReader::open_path(&path, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_missing_object_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = LocalDatasetSource::new(dir.path());
        let err = source
            .open("stofs_2d_glo.20240516/missing.nc", &VariableFilter::All)
            .unwrap_err();
        assert!(matches!(err, MeshError::SourceUnavailable { .. }));
    }
}
