//! Common types shared across the STOFS subsetting crates.

pub mod dataset;
pub mod error;
pub mod key;
pub mod mesh;
pub mod region;
pub mod source;

pub use dataset::{AttrValue, Attributes, Dimension, RawDataset, Values, Variable};
pub use error::{MeshError, MeshResult};
pub use key::{DatasetKey, KeyError, DEFAULT_COMPANION_FILE};
pub use mesh::{MeshLayout, MeshParts, NormalizedMesh, TRIANGLE_VERTICES};
pub use region::{BoundingRegion, RegionParseError};
pub use source::{DatasetSource, VariableFilter};
