//! Common test fixtures for mesh subsetting tests.

use std::collections::HashMap;
use std::sync::Mutex;

use mesh_common::{
    DatasetSource, MeshError, MeshParts, MeshResult, NormalizedMesh, RawDataset, Values, Variable,
    VariableFilter,
};

/// Common bounding regions as `(x_min, x_max, y_min, y_max)`.
pub mod regions {
    /// Guam and the Northern Mariana Islands.
    pub const GUAM: (f64, f64, f64, f64) = (144.5, 145.9, 13.1, 15.5);

    /// Chuuk lagoon.
    pub const CHUUK: (f64, f64, f64, f64) = (151.3, 152.2, 6.8, 7.8);

    /// Region string as passed on the command line.
    pub const GUAM_AND_CHUUK: &str = "(144.5, 145.9, 13.1, 15.5)(151.3, 152.2, 6.8, 7.8)";

    /// Inverted x bounds.
    pub const INVERTED: (f64, f64, f64, f64) = (10.0, 0.0, 0.0, 10.0);
}

/// Four nodes of a 10x10 square split into two triangles, plus a stray node
/// at `(20, 20)` that no element references.
///
/// Carries a node field `depth` equal to the node id.
pub fn square_with_stray_node() -> NormalizedMesh {
    let mut parts = MeshParts {
        nodes: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [20.0, 20.0]],
        elements: vec![[0, 1, 2], [0, 2, 3]],
        ..Default::default()
    };
    parts.node_fields.insert(
        "depth".to_string(),
        Variable::vector("node", Values::F64(vec![0.0, 1.0, 2.0, 3.0, 4.0])),
    );
    NormalizedMesh::from_parts(parts).expect("fixture mesh is valid")
}

/// In-memory [`DatasetSource`] keyed by object key.
///
/// Applies the variable filter like a real reader would and records every
/// request so tests can check what was fetched.
#[derive(Default)]
pub struct MemorySource {
    datasets: HashMap<String, RawDataset>,
    requests: Mutex<Vec<(String, VariableFilter)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dataset(mut self, key: impl Into<String>, dataset: RawDataset) -> Self {
        self.datasets.insert(key.into(), dataset);
        self
    }

    /// Keys and filters requested so far, in call order.
    pub fn requests(&self) -> Vec<(String, VariableFilter)> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl DatasetSource for MemorySource {
    fn open(&self, key: &str, filter: &VariableFilter) -> MeshResult<RawDataset> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((key.to_string(), filter.clone()));
        }

        let mut dataset = self
            .datasets
            .get(key)
            .cloned()
            .ok_or_else(|| MeshError::source_unavailable(key, "no such object"))?;
        dataset.variables.retain(|name, _| filter.admits(name));
        Ok(dataset)
    }
}
