//! Normalization and regional subsetting of unstructured triangle meshes.
//!
//! A raw dataset is first turned into a [`NormalizedMesh`](mesh_common::NormalizedMesh)
//! by [`MeshNormalizer`], borrowing connectivity from a companion dataset
//! when needed. [`MeshSubsetEngine`] then cuts that mesh down to one or more
//! bounding regions. Both stages are synchronous and free of I/O apart from
//! the companion fetch, which goes through a [`CompanionResolver`].

pub mod normalize;
pub mod select;
pub mod subset;

pub use normalize::{CompanionResolver, ConventionResolver, MeshNormalizer, MeshSchema};
pub use select::{restrict_variable, take_along_axis};
pub use subset::{MeshSubsetEngine, Selection, SubsetStats};
