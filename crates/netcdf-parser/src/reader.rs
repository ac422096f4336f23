//! Reading NetCDF locations into raw datasets.

use std::fs::File;
use std::path::Path;

use netcdf::types::{FloatType, IntType, NcVariableType};
use netcdf::AttributeValue;
use tracing::{debug, instrument, warn};

use mesh_common::{
    AttrValue, Attributes, Dimension, MeshResult, RawDataset, Values, Variable, VariableFilter,
};

use crate::error::{NetCdfError, NetCdfResult};
use crate::silence_hdf5_errors;

/// URL libnetcdf opens with HTTP byte-range requests.
pub fn byte_range_url(http_url: &str) -> String {
    if http_url.ends_with("#mode=bytes") {
        http_url.to_string()
    } else {
        format!("{}#mode=bytes", http_url)
    }
}

fn is_remote(location: &Path) -> bool {
    location
        .to_str()
        .map_or(false, |s| s.starts_with("http://") || s.starts_with("https://"))
}

/// Opens NetCDF locations with libnetcdf.
pub struct NetcdfReader;

impl NetcdfReader {
    /// Read dimensions, global attributes and every admitted variable.
    ///
    /// Variables of types with no [`Values`] counterpart (strings, chars,
    /// 64-bit integers, compound types) are skipped with a warning.
    #[instrument(skip_all, fields(location = %location.as_ref().display()))]
    pub fn open_path(
        location: impl AsRef<Path>,
        filter: &VariableFilter,
    ) -> MeshResult<RawDataset> {
        let location = location.as_ref();
        read_dataset(location, filter).map_err(|e| e.into_read_error(location.display()))
    }
}

fn read_dataset(location: &Path, filter: &VariableFilter) -> NetCdfResult<RawDataset> {
    silence_hdf5_errors();

    // libnetcdf reports a missing or unreadable local file with a bare status
    // code, so local paths are checked through the filesystem first.
    if !is_remote(location) {
        File::open(location)?;
    }
    let file = netcdf::open(location)?;
    let mut dataset = RawDataset::new();

    for dim in file.dimensions() {
        dataset.dimensions.insert(
            dim.name(),
            Dimension {
                len: dim.len(),
                unlimited: dim.is_unlimited(),
            },
        );
    }
    dataset.attributes = read_attributes(file.attributes());

    for var in file.variables() {
        let name = var.name();
        if !filter.admits(&name) {
            debug!(variable = %name, "Skipping filtered variable");
            continue;
        }
        match read_variable(&var)? {
            Some(variable) => {
                debug!(
                    variable = %name,
                    dims = ?variable.dims,
                    dtype = variable.values.type_name(),
                    "Read variable"
                );
                dataset.variables.insert(name, variable);
            }
            None => warn!(variable = %name, "Skipping variable of unsupported type"),
        }
    }

    debug!(
        dimensions = dataset.dimensions.len(),
        variables = dataset.variables.len(),
        "Read dataset"
    );
    Ok(dataset)
}

fn read_variable(var: &netcdf::Variable) -> NetCdfResult<Option<Variable>> {
    let dims: Vec<String> = var.dimensions().iter().map(|d| d.name()).collect();
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();

    let values = match var.vartype() {
        NcVariableType::Float(FloatType::F32) => Values::F32(var.get_values::<f32, _>(..)?),
        NcVariableType::Float(FloatType::F64) => Values::F64(var.get_values::<f64, _>(..)?),
        NcVariableType::Int(
            IntType::I8 | IntType::U8 | IntType::I16 | IntType::U16 | IntType::I32,
        ) => Values::I32(var.get_values::<i32, _>(..)?),
        _ => return Ok(None),
    };

    let attributes = read_attributes(var.attributes());
    Variable::new(dims, shape, values, attributes)
        .map(Some)
        .map_err(|e| NetCdfError::InvalidFormat(format!("variable '{}': {}", var.name(), e)))
}

fn read_attributes<'a>(attrs: impl Iterator<Item = netcdf::Attribute<'a>>) -> Attributes {
    let mut out = Attributes::new();
    for attr in attrs {
        let name = attr.name().to_string();
        match attr.value() {
            Ok(value) => match convert_attribute(value) {
                Some(value) => {
                    out.insert(name, value);
                }
                None => debug!(attribute = %name, "Skipping attribute of unsupported type"),
            },
            Err(e) => warn!(attribute = %name, error = %e, "Failed to read attribute"),
        }
    }
    out
}

fn convert_attribute(value: AttributeValue) -> Option<AttrValue> {
    let converted = match value {
        AttributeValue::Str(s) => AttrValue::Text(s),
        AttributeValue::Strs(s) => AttrValue::Text(s.join("\n")),
        AttributeValue::Double(v) => AttrValue::Float(v),
        AttributeValue::Float(v) => AttrValue::Float(v as f64),
        AttributeValue::Doubles(v) => AttrValue::Floats(v),
        AttributeValue::Floats(v) => AttrValue::Floats(v.into_iter().map(f64::from).collect()),
        AttributeValue::Schar(v) => AttrValue::Int(v.into()),
        AttributeValue::Uchar(v) => AttrValue::Int(v.into()),
        AttributeValue::Short(v) => AttrValue::Int(v.into()),
        AttributeValue::Ushort(v) => AttrValue::Int(v.into()),
        AttributeValue::Int(v) => AttrValue::Int(v.into()),
        AttributeValue::Uint(v) => AttrValue::Int(v.into()),
        AttributeValue::Longlong(v) => AttrValue::Int(v),
        AttributeValue::Shorts(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Ints(v) => AttrValue::Ints(v.into_iter().map(i64::from).collect()),
        AttributeValue::Longlongs(v) => AttrValue::Ints(v),
        _ => return None,
    };
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mesh_common::MeshError;

    #[test]
    fn test_byte_range_url() {
        assert_eq!(
            byte_range_url("https://noaa-gestofs-pds.s3.amazonaws.com/a.nc"),
            "https://noaa-gestofs-pds.s3.amazonaws.com/a.nc#mode=bytes"
        );
        assert_eq!(byte_range_url("http://x/a.nc#mode=bytes"), "http://x/a.nc#mode=bytes");
    }

    #[test]
    fn test_convert_attribute() {
        assert_eq!(
            convert_attribute(AttributeValue::Float(-99999.0)),
            Some(AttrValue::Float(-99999.0))
        );
        assert_eq!(
            convert_attribute(AttributeValue::Short(1)),
            Some(AttrValue::Int(1))
        );
        assert_eq!(
            convert_attribute(AttributeValue::Str("m".to_string())),
            Some(AttrValue::Text("m".to_string()))
        );
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote(Path::new("https://b.s3.amazonaws.com/a.nc#mode=bytes")));
        assert!(!is_remote(Path::new("/data/a.nc")));
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let result = NetcdfReader::open_path("/nonexistent/a.nc", &VariableFilter::All);
        assert!(matches!(result, Err(MeshError::SourceUnavailable { .. })));
    }

    #[test]
    fn test_non_netcdf_file_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.nc");
        std::fs::write(&path, b"not a netcdf file").unwrap();

        let result = NetcdfReader::open_path(&path, &VariableFilter::All);
        assert!(matches!(result, Err(MeshError::MalformedSource(_))));
    }
}
