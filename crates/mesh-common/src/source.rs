//! Seam between the mesh core and whatever fetches source objects.

use crate::dataset::RawDataset;
use crate::error::MeshResult;

/// Which variables a reader should materialize.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VariableFilter {
    /// Read every variable.
    #[default]
    All,
    /// Read everything except these names.
    Drop(Vec<String>),
    /// Read only these names (dimensions are still reported in full).
    Keep(Vec<String>),
}

impl VariableFilter {
    pub fn drop<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Drop(names.into_iter().map(Into::into).collect())
    }

    pub fn keep<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Keep(names.into_iter().map(Into::into).collect())
    }

    /// Whether a variable with this name should be read.
    pub fn admits(&self, name: &str) -> bool {
        match self {
            VariableFilter::All => true,
            VariableFilter::Drop(names) => !names.iter().any(|n| n == name),
            VariableFilter::Keep(names) => names.iter().any(|n| n == name),
        }
    }
}

/// Opens a source object as a [`RawDataset`].
///
/// Implementations fail with `SourceUnavailable` when the object is missing
/// or unreachable and with `MalformedSource` when it cannot be parsed.
/// Variables rejected by `filter` are never materialized.
pub trait DatasetSource: Send + Sync {
    fn open(&self, key: &str, filter: &VariableFilter) -> MeshResult<RawDataset>;
}

impl<S: DatasetSource + ?Sized> DatasetSource for &S {
    fn open(&self, key: &str, filter: &VariableFilter) -> MeshResult<RawDataset> {
        (**self).open(key, filter)
    }
}

impl<S: DatasetSource + ?Sized> DatasetSource for std::sync::Arc<S> {
    fn open(&self, key: &str, filter: &VariableFilter) -> MeshResult<RawDataset> {
        (**self).open(key, filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_admits() {
        assert!(VariableFilter::All.admits("zeta"));

        let drop = VariableFilter::drop(["nvel"]);
        assert!(!drop.admits("nvel"));
        assert!(drop.admits("zeta"));

        let keep = VariableFilter::keep(["element"]);
        assert!(keep.admits("element"));
        assert!(!keep.admits("zeta"));
    }
}
