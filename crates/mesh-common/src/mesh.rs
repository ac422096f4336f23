//! The normalized unstructured triangular mesh.

use std::collections::BTreeMap;

use crate::dataset::{AttrValue, Attributes, Dimension, RawDataset, Values, Variable};
use crate::error::{MeshError, MeshResult};
use crate::region::BoundingRegion;

/// Number of vertices per element. Only pure triangle meshes are supported.
pub const TRIANGLE_VERTICES: usize = 3;

/// Names and per-variable metadata needed to persist a mesh the way it was read.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshLayout {
    pub node_dim: String,
    pub element_dim: String,
    pub vertex_dim: String,
    pub x_name: String,
    pub y_name: String,
    pub x_attributes: Attributes,
    pub y_attributes: Attributes,
    pub connectivity_name: String,
    pub connectivity_attributes: Attributes,
    /// Base of the stored connectivity indices (ADCIRC files are 1-based).
    pub start_index: i64,
}

impl Default for MeshLayout {
    fn default() -> Self {
        Self {
            node_dim: "node".to_string(),
            element_dim: "nele".to_string(),
            vertex_dim: "nvertex".to_string(),
            x_name: "x".to_string(),
            y_name: "y".to_string(),
            x_attributes: Attributes::new(),
            y_attributes: Attributes::new(),
            connectivity_name: "element".to_string(),
            connectivity_attributes: Attributes::new(),
            start_index: 0,
        }
    }
}

/// Public building blocks of a [`NormalizedMesh`].
///
/// Construct one of these and pass it to [`NormalizedMesh::from_parts`],
/// which checks the mesh invariants.
#[derive(Debug, Clone, Default)]
pub struct MeshParts {
    pub nodes: Vec<[f64; 2]>,
    pub elements: Vec<[usize; TRIANGLE_VERTICES]>,
    pub node_fields: BTreeMap<String, Variable>,
    pub element_fields: BTreeMap<String, Variable>,
    pub global_fields: BTreeMap<String, Variable>,
    pub extra_dimensions: BTreeMap<String, Dimension>,
    pub attributes: Attributes,
    pub layout: MeshLayout,
}

/// A self-consistent triangle mesh with its node, element and global fields.
///
/// Immutable once built. Operations such as subsetting return a new mesh, so a
/// single instance can be shared read-only between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMesh {
    nodes: Vec<[f64; 2]>,
    elements: Vec<[usize; TRIANGLE_VERTICES]>,
    node_fields: BTreeMap<String, Variable>,
    element_fields: BTreeMap<String, Variable>,
    global_fields: BTreeMap<String, Variable>,
    extra_dimensions: BTreeMap<String, Dimension>,
    attributes: Attributes,
    layout: MeshLayout,
}

impl NormalizedMesh {
    /// Assemble a mesh, rejecting parts that break the connectivity or
    /// field-length invariants.
    pub fn from_parts(parts: MeshParts) -> MeshResult<Self> {
        let mesh = Self {
            nodes: parts.nodes,
            elements: parts.elements,
            node_fields: parts.node_fields,
            element_fields: parts.element_fields,
            global_fields: parts.global_fields,
            extra_dimensions: parts.extra_dimensions,
            attributes: parts.attributes,
            layout: parts.layout,
        };
        mesh.validate()?;
        Ok(mesh)
    }

    pub fn nodes(&self) -> &[[f64; 2]] {
        &self.nodes
    }

    pub fn elements(&self) -> &[[usize; TRIANGLE_VERTICES]] {
        &self.elements
    }

    pub fn node_fields(&self) -> &BTreeMap<String, Variable> {
        &self.node_fields
    }

    pub fn element_fields(&self) -> &BTreeMap<String, Variable> {
        &self.element_fields
    }

    pub fn global_fields(&self) -> &BTreeMap<String, Variable> {
        &self.global_fields
    }

    pub fn extra_dimensions(&self) -> &BTreeMap<String, Dimension> {
        &self.extra_dimensions
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn layout(&self) -> &MeshLayout {
        &self.layout
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    pub fn vertex_count(&self) -> usize {
        TRIANGLE_VERTICES
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.elements.is_empty()
    }

    /// Look up a field by name in any of the three field maps.
    pub fn field(&self, name: &str) -> Option<&Variable> {
        self.node_fields
            .get(name)
            .or_else(|| self.element_fields.get(name))
            .or_else(|| self.global_fields.get(name))
    }

    /// Bounding box of all nodes, `None` for an empty mesh.
    pub fn envelope(&self) -> Option<BoundingRegion> {
        BoundingRegion::envelope(self.nodes.iter().copied())
    }

    /// Check the mesh invariants.
    pub fn validate(&self) -> MeshResult<()> {
        let n = self.nodes.len();
        let e = self.elements.len();

        if let Some((id, tri)) = self
            .elements
            .iter()
            .enumerate()
            .find(|(_, tri)| tri.iter().any(|&v| v >= n))
        {
            return Err(MeshError::malformed(format!(
                "element {} references {:?} but the mesh has {} nodes",
                id, tri, n
            )));
        }

        for (name, field) in &self.node_fields {
            match field.len_along(&self.layout.node_dim) {
                Some(len) if len == n => {}
                other => {
                    return Err(MeshError::malformed(format!(
                        "node field '{}' has {:?} entries along '{}', expected {}",
                        name, other, self.layout.node_dim, n
                    )))
                }
            }
        }

        for (name, field) in &self.element_fields {
            match field.len_along(&self.layout.element_dim) {
                Some(len) if len == e => {}
                other => {
                    return Err(MeshError::malformed(format!(
                        "element field '{}' has {:?} entries along '{}', expected {}",
                        name, other, self.layout.element_dim, e
                    )))
                }
            }
        }

        Ok(())
    }

    /// Flatten back into named dimensions and variables for persistence.
    ///
    /// Coordinates and connectivity are emitted under their original names;
    /// connectivity is shifted back to the stored index base. Fails when a
    /// shifted index does not fit the 32-bit connectivity variable.
    pub fn to_raw_dataset(&self) -> MeshResult<RawDataset> {
        let layout = &self.layout;
        let mut ds = RawDataset::new();

        ds.dimensions.insert(
            layout.node_dim.clone(),
            Dimension::fixed(self.node_count()),
        );
        ds.dimensions.insert(
            layout.element_dim.clone(),
            Dimension::fixed(self.element_count()),
        );
        ds.dimensions
            .insert(layout.vertex_dim.clone(), Dimension::fixed(TRIANGLE_VERTICES));
        for (name, dim) in &self.extra_dimensions {
            ds.dimensions.entry(name.clone()).or_insert(*dim);
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = self.nodes.iter().map(|[x, y]| (*x, *y)).unzip();
        let mut x = Variable::vector(&layout.node_dim, Values::F64(xs));
        x.attributes = layout.x_attributes.clone();
        let mut y = Variable::vector(&layout.node_dim, Values::F64(ys));
        y.attributes = layout.y_attributes.clone();
        ds.variables.insert(layout.x_name.clone(), x);
        ds.variables.insert(layout.y_name.clone(), y);

        let base = layout.start_index;
        let flat = self
            .elements
            .iter()
            .flatten()
            .map(|&v| {
                i64::try_from(v)
                    .ok()
                    .and_then(|v| v.checked_add(base))
                    .and_then(|stored| i32::try_from(stored).ok())
                    .ok_or_else(|| {
                        MeshError::malformed(format!(
                            "node index {} with start_index {} does not fit a 32-bit connectivity variable",
                            v, base
                        ))
                    })
            })
            .collect::<MeshResult<Vec<i32>>>()?;
        let mut connectivity_attributes = layout.connectivity_attributes.clone();
        if base != 0 {
            connectivity_attributes.insert("start_index".to_string(), AttrValue::Int(base));
        }
        ds.variables.insert(
            layout.connectivity_name.clone(),
            Variable {
                dims: vec![layout.element_dim.clone(), layout.vertex_dim.clone()],
                shape: vec![self.element_count(), TRIANGLE_VERTICES],
                values: Values::I32(flat),
                attributes: connectivity_attributes,
            },
        );

        for (name, field) in self
            .node_fields
            .iter()
            .chain(&self.element_fields)
            .chain(&self.global_fields)
        {
            ds.variables.insert(name.clone(), field.clone());
        }

        ds.attributes = self.attributes.clone();
        Ok(ds)
    }
}
