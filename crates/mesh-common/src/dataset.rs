//! Raw dataset model: named dimensions, typed variables and attributes.
//!
//! This is what a reader yields before normalization. Variables keep their
//! dimension labels so downstream code can locate the node or element axis
//! by name instead of by position.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// A single attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    Text(String),
    Float(f64),
    Int(i64),
    Floats(Vec<f64>),
    Ints(Vec<i64>),
}

impl AttrValue {
    /// Numeric scalar view, if the attribute holds one number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            AttrValue::Ints(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        AttrValue::Float(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        AttrValue::Int(v)
    }
}

/// Ordered attribute map. Ordering keeps written files reproducible.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Typed, row-major variable storage.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
}

impl Values {
    pub fn len(&self) -> usize {
        match self {
            Values::F32(v) => v.len(),
            Values::F64(v) => v.len(),
            Values::I32(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// NetCDF type name, used in log fields and error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Values::F32(_) => "float",
            Values::F64(_) => "double",
            Values::I32(_) => "int",
        }
    }

    /// Widen to f64 (coordinates may be stored as float or double).
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Values::F32(v) => v.iter().map(|&x| x as f64).collect(),
            Values::F64(v) => v.clone(),
            Values::I32(v) => v.iter().map(|&x| x as f64).collect(),
        }
    }

    /// Integer view for index arrays. Fails on non-integral values.
    pub fn to_i64(&self) -> Option<Vec<i64>> {
        match self {
            Values::I32(v) => Some(v.iter().map(|&x| x as i64).collect()),
            Values::F64(v) => v
                .iter()
                .map(|&x| (x.fract() == 0.0).then_some(x as i64))
                .collect(),
            Values::F32(v) => v
                .iter()
                .map(|&x| (x.fract() == 0.0).then_some(x as i64))
                .collect(),
        }
    }
}

/// A named dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub len: usize,
    pub unlimited: bool,
}

impl Dimension {
    pub fn fixed(len: usize) -> Self {
        Self {
            len,
            unlimited: false,
        }
    }
}

/// A variable with labelled dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub shape: Vec<usize>,
    pub values: Values,
    pub attributes: Attributes,
}

impl Variable {
    /// Build a variable, checking that the shape matches the value count.
    pub fn new(
        dims: Vec<String>,
        shape: Vec<usize>,
        values: Values,
        attributes: Attributes,
    ) -> MeshResult<Self> {
        if dims.len() != shape.len() {
            return Err(MeshError::malformed(format!(
                "variable has {} dimension names but a rank {} shape",
                dims.len(),
                shape.len()
            )));
        }
        let expected: usize = shape.iter().product();
        if expected != values.len() {
            return Err(MeshError::malformed(format!(
                "shape {:?} needs {} values, found {}",
                shape,
                expected,
                values.len()
            )));
        }
        Ok(Self {
            dims,
            shape,
            values,
            attributes,
        })
    }

    /// Convenience constructor for a 1-D variable.
    pub fn vector(dim: &str, values: Values) -> Self {
        Self {
            dims: vec![dim.to_string()],
            shape: vec![values.len()],
            values,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.to_string(), value.into());
        self
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Position of the named dimension, if present.
    pub fn axis_of(&self, dim: &str) -> Option<usize> {
        self.dims.iter().position(|d| d == dim)
    }

    /// Length along the named dimension, if present.
    pub fn len_along(&self, dim: &str) -> Option<usize> {
        self.axis_of(dim).map(|axis| self.shape[axis])
    }
}

/// Everything a reader produced from one source object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawDataset {
    pub dimensions: BTreeMap<String, Dimension>,
    pub variables: BTreeMap<String, Variable>,
    pub attributes: Attributes,
}

impl RawDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.get(name)
    }

    pub fn dimension_len(&self, name: &str) -> Option<usize> {
        self.dimensions.get(name).map(|d| d.len)
    }

    /// Insert a variable, registering any dimension it introduces.
    pub fn insert_variable(&mut self, name: &str, variable: Variable) {
        for (dim, &len) in variable.dims.iter().zip(&variable.shape) {
            self.dimensions
                .entry(dim.clone())
                .or_insert_with(|| Dimension::fixed(len));
        }
        self.variables.insert(name.to_string(), variable);
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }
}
