//! Atomic NetCDF output.

use std::ops::Range;
use std::path::Path;

use chrono::Utc;
use netcdf::AttributeValue;
use tracing::{debug, instrument};

use mesh_common::{
    AttrValue, Attributes, MeshError, MeshResult, NormalizedMesh, RawDataset, Values,
};

use crate::error::NetCdfResult;
use crate::silence_hdf5_errors;

/// Attributes that libnetcdf requires to match the variable's type.
const TYPED_ATTRIBUTES: [&str; 2] = ["_FillValue", "missing_value"];

/// Writes meshes and datasets as NetCDF-4 files.
#[derive(Debug, Clone, Default)]
pub struct NetcdfWriter {
    history: Option<String>,
}

impl NetcdfWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a timestamped line to the global `history` attribute.
    pub fn with_history(mut self, note: impl Into<String>) -> Self {
        self.history = Some(note.into());
        self
    }

    /// Persist `mesh` at `path`, replacing any existing file.
    pub fn write(&self, mesh: &NormalizedMesh, path: impl AsRef<Path>) -> MeshResult<()> {
        let path = path.as_ref();
        let dataset = mesh
            .to_raw_dataset()
            .map_err(|e| MeshError::write_failure(path, e))?;
        self.write_dataset(&dataset, path)
    }

    /// Persist `dataset` at `path`, replacing any existing file.
    ///
    /// The file is written next to the target and renamed into place, so on
    /// failure nothing is left behind and an existing target is untouched.
    /// The destination directory must already exist.
    #[instrument(skip(self, dataset), fields(path = %path.as_ref().display()))]
    pub fn write_dataset(&self, dataset: &RawDataset, path: impl AsRef<Path>) -> MeshResult<()> {
        let path = path.as_ref();
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if !parent.is_dir() {
            return Err(MeshError::write_failure(
                path,
                format!("directory {} does not exist", parent.display()),
            ));
        }

        let temp = tempfile::Builder::new()
            .prefix(".partial-")
            .suffix(".nc")
            .tempfile_in(parent)
            .map_err(|e| MeshError::write_failure(path, e))?
            .into_temp_path();

        let mut attributes = dataset.attributes.clone();
        if let Some(note) = &self.history {
            append_history(&mut attributes, note);
        }

        write_file(dataset, &attributes, &temp).map_err(|e| MeshError::write_failure(path, e))?;
        temp.persist(path).map_err(|e| MeshError::write_failure(path, e.error))?;

        debug!(variables = dataset.variables.len(), "Wrote dataset");
        Ok(())
    }
}

fn append_history(attributes: &mut Attributes, note: &str) {
    let line = format!("{}: {}", Utc::now().format("%Y-%m-%dT%H:%M:%SZ"), note);
    let history = match attributes.get("history").and_then(AttrValue::as_str) {
        Some(previous) if !previous.is_empty() => format!("{}\n{}", previous, line),
        _ => line,
    };
    attributes.insert("history".to_string(), AttrValue::Text(history));
}

/// Define one variable, set its attributes and write its data.
macro_rules! write_variable {
    ($file:expr, $name:expr, $dims:expr, $var:expr, $ty:ty, $data:expr) => {{
        let data: &[$ty] = $data;
        let mut nc_var = $file.add_variable::<$ty>($name, $dims)?;
        for (attr, value) in &$var.attributes {
            nc_var.put_attribute(attr, attribute_for(attr, value, &$var.values))?;
        }
        // Zero-length dimensions leave nothing to store.
        if $var.shape.is_empty() {
            nc_var.put_values(data, ..)?;
        } else if !data.is_empty() {
            // Explicit extents so unlimited dimensions grow to fit.
            let extents: Vec<Range<usize>> = $var.shape.iter().map(|&n| 0..n).collect();
            nc_var.put_values(data, extents)?;
        }
    }};
}

fn write_file(dataset: &RawDataset, attributes: &Attributes, path: &Path) -> NetCdfResult<()> {
    silence_hdf5_errors();

    let mut file = netcdf::create(path)?;

    for (name, dim) in &dataset.dimensions {
        if dim.unlimited {
            file.add_unlimited_dimension(name)?;
        } else {
            // A zero length here makes libnetcdf declare the dimension unlimited.
            file.add_dimension(name, dim.len)?;
        }
    }

    for (name, value) in attributes {
        file.add_attribute(name, to_attribute_value(value))?;
    }

    for (name, var) in &dataset.variables {
        let dims: Vec<&str> = var.dims.iter().map(String::as_str).collect();
        match &var.values {
            Values::F32(data) => write_variable!(file, name, &dims, var, f32, data),
            Values::F64(data) => write_variable!(file, name, &dims, var, f64, data),
            Values::I32(data) => write_variable!(file, name, &dims, var, i32, data),
        }
    }

    Ok(())
}

/// Convert an attribute, casting fill values to the variable's type.
fn attribute_for(name: &str, value: &AttrValue, values: &Values) -> AttributeValue {
    if TYPED_ATTRIBUTES.contains(&name) {
        let scalar = match value {
            AttrValue::Float(v) => Some(*v),
            AttrValue::Int(v) => Some(*v as f64),
            _ => None,
        };
        if let Some(v) = scalar {
            return match values {
                Values::F32(_) => AttributeValue::Float(v as f32),
                Values::F64(_) => AttributeValue::Double(v),
                Values::I32(_) => AttributeValue::Int(v as i32),
            };
        }
    }
    to_attribute_value(value)
}

fn to_attribute_value(value: &AttrValue) -> AttributeValue {
    match value {
        AttrValue::Text(s) => AttributeValue::Str(s.clone()),
        AttrValue::Float(v) => AttributeValue::Double(*v),
        AttrValue::Int(v) => match i32::try_from(*v) {
            Ok(v) => AttributeValue::Int(v),
            Err(_) => AttributeValue::Longlong(*v),
        },
        AttrValue::Floats(v) => AttributeValue::Doubles(v.clone()),
        AttrValue::Ints(v) => match v.iter().map(|&x| i32::try_from(x)).collect() {
            Ok(ints) => AttributeValue::Ints(ints),
            Err(_) => AttributeValue::Longlongs(v.clone()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_common::{MeshLayout, MeshParts};

    #[test]
    fn test_fill_value_follows_variable_type() {
        let fill = AttrValue::Float(-99999.0);
        assert!(matches!(
            attribute_for("_FillValue", &fill, &Values::F32(vec![])),
            AttributeValue::Float(v) if v == -99999.0
        ));
        assert!(matches!(
            attribute_for("_FillValue", &fill, &Values::I32(vec![])),
            AttributeValue::Int(-99999)
        ));
        assert!(matches!(
            attribute_for("scale_factor", &fill, &Values::F32(vec![])),
            AttributeValue::Double(v) if v == -99999.0
        ));
    }

    #[test]
    fn test_large_ints_widen() {
        assert!(matches!(
            to_attribute_value(&AttrValue::Int(1)),
            AttributeValue::Int(1)
        ));
        assert!(matches!(
            to_attribute_value(&AttrValue::Int(1 << 40)),
            AttributeValue::Longlong(v) if v == 1 << 40
        ));
    }

    #[test]
    fn test_append_history() {
        let mut attributes = Attributes::new();
        attributes.insert("history".to_string(), "created".into());
        append_history(&mut attributes, "subset");

        let history = attributes["history"].as_str().unwrap();
        assert!(history.starts_with("created\n"));
        assert!(history.ends_with(": subset"));
    }

    #[test]
    fn test_unrepresentable_connectivity_is_write_failure() {
        let mesh = NormalizedMesh::from_parts(MeshParts {
            nodes: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            elements: vec![[0, 1, 2]],
            layout: MeshLayout {
                start_index: i64::from(i32::MAX),
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.nc");
        let result = NetcdfWriter::new().write(&mesh, &path);
        assert!(matches!(result, Err(MeshError::WriteFailure { .. })));
        assert!(!path.exists());
    }
}
