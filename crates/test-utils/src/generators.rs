//! Synthetic mesh generators.
//!
//! Values are derived from node and element ids so a test can tell, after a
//! subset, exactly which original entity every surviving value came from.

use mesh_common::{
    AttrValue, Attributes, Dimension, MeshLayout, MeshParts, NormalizedMesh, RawDataset, Values,
    Variable,
};

/// Number of time steps carried by generated meshes.
pub const GRID_TIME_STEPS: usize = 3;

/// Value of `depth` at a node.
pub fn depth_at(node: usize) -> f64 {
    100.0 + node as f64
}

/// Value of `zeta` at a node and time step.
pub fn zeta_at(step: usize, node: usize) -> f32 {
    (step * 1000 + node) as f32
}

/// Id of the node at column `col`, row `row` of a `cols` x `rows` cell grid.
pub fn grid_node_id(cols: usize, col: usize, row: usize) -> usize {
    row * (cols + 1) + col
}

/// Creates a structured triangulation of a `cols` x `rows` cell grid.
///
/// Nodes sit on integer coordinates `(col, row)` for `col` in `0..=cols` and
/// `row` in `0..=rows`. Each cell is split into two triangles along its
/// lower-left to upper-right diagonal. The mesh carries:
///
/// - `depth` on `[node]` (f64, see [`depth_at`])
/// - `zeta` on `[time, node]` (f32, see [`zeta_at`])
/// - `element_code` on `[nele]` (i32, the element id)
/// - `time` on `[time]` (global, f64 seconds)
///
/// Connectivity is stored 1-based, as in ADCIRC output.
///
/// # Example
///
/// ```
/// use test_utils::grid_mesh;
///
/// let mesh = grid_mesh(2, 1);
/// assert_eq!(mesh.node_count(), 6);
/// assert_eq!(mesh.element_count(), 4);
/// ```
pub fn grid_mesh(cols: usize, rows: usize) -> NormalizedMesh {
    let mut nodes = Vec::with_capacity((cols + 1) * (rows + 1));
    for row in 0..=rows {
        for col in 0..=cols {
            nodes.push([col as f64, row as f64]);
        }
    }

    let mut elements = Vec::with_capacity(2 * cols * rows);
    for row in 0..rows {
        for col in 0..cols {
            let ll = grid_node_id(cols, col, row);
            let lr = grid_node_id(cols, col + 1, row);
            let ur = grid_node_id(cols, col + 1, row + 1);
            let ul = grid_node_id(cols, col, row + 1);
            elements.push([ll, lr, ur]);
            elements.push([ll, ur, ul]);
        }
    }

    let n = nodes.len();
    let e = elements.len();

    let mut parts = MeshParts {
        nodes,
        elements,
        layout: adcirc_layout(),
        ..Default::default()
    };

    parts.node_fields.insert(
        "depth".to_string(),
        Variable::vector("node", Values::F64((0..n).map(depth_at).collect()))
            .with_attribute("units", "m"),
    );
    let zeta = (0..GRID_TIME_STEPS)
        .flat_map(|t| (0..n).map(move |i| zeta_at(t, i)))
        .collect();
    parts.node_fields.insert(
        "zeta".to_string(),
        Variable {
            dims: vec!["time".to_string(), "node".to_string()],
            shape: vec![GRID_TIME_STEPS, n],
            values: Values::F32(zeta),
            attributes: Attributes::from([
                ("units".to_string(), AttrValue::from("m")),
                ("_FillValue".to_string(), AttrValue::Float(-99999.0)),
            ]),
        },
    );
    parts.element_fields.insert(
        "element_code".to_string(),
        Variable::vector("nele", Values::I32((0..e as i32).collect())),
    );
    parts.global_fields.insert(
        "time".to_string(),
        Variable::vector(
            "time",
            Values::F64((0..GRID_TIME_STEPS).map(|t| t as f64 * 3600.0).collect()),
        )
        .with_attribute("units", "seconds since 2024-05-16 00:00:00"),
    );
    parts.extra_dimensions.insert(
        "time".to_string(),
        Dimension {
            len: GRID_TIME_STEPS,
            unlimited: true,
        },
    );
    parts.attributes.insert("model".to_string(), "ADCIRC".into());
    parts
        .attributes
        .insert("title".to_string(), "synthetic grid".into());

    NormalizedMesh::from_parts(parts).expect("generated grid mesh is valid")
}

/// The raw dataset a reader would produce for [`grid_mesh`].
pub fn grid_dataset(cols: usize, rows: usize) -> RawDataset {
    grid_mesh(cols, rows)
        .to_raw_dataset()
        .expect("generated grid mesh fits 32-bit connectivity")
}

/// A primary/companion pair shaped like STOFS `fields.htp` / `fields.cwl`.
///
/// The primary has coordinates and node fields but no connectivity and no
/// element dimensions. The companion has coordinates, connectivity and its
/// own `zeta`.
pub fn stofs_pair(cols: usize, rows: usize) -> (RawDataset, RawDataset) {
    let full = grid_dataset(cols, rows);

    let mut primary = full.clone();
    primary.variables.remove("element");
    primary.variables.remove("element_code");
    primary.dimensions.remove("nele");
    primary.dimensions.remove("nvertex");

    let mut companion = full;
    companion.variables.remove("depth");
    companion.variables.remove("element_code");

    (primary, companion)
}

fn adcirc_layout() -> MeshLayout {
    MeshLayout {
        x_attributes: Attributes::from([
            ("long_name".to_string(), AttrValue::from("longitude")),
            ("units".to_string(), AttrValue::from("degrees_east")),
        ]),
        y_attributes: Attributes::from([
            ("long_name".to_string(), AttrValue::from("latitude")),
            ("units".to_string(), AttrValue::from("degrees_north")),
        ]),
        connectivity_attributes: Attributes::from([(
            "long_name".to_string(),
            AttrValue::from("element"),
        )]),
        start_index: 1,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_mesh_counts() {
        let mesh = grid_mesh(3, 2);
        assert_eq!(mesh.node_count(), 12);
        assert_eq!(mesh.element_count(), 12);
        assert_eq!(mesh.nodes()[grid_node_id(3, 3, 2)], [3.0, 2.0]);
    }

    #[test]
    fn test_grid_dataset_is_one_based() {
        let ds = grid_dataset(1, 1);
        let element = ds.variable("element").unwrap();
        assert_eq!(element.values, Values::I32(vec![1, 2, 4, 1, 4, 3]));
        assert!(ds.dimensions["time"].unlimited);
    }

    #[test]
    fn test_stofs_pair_split() {
        let (primary, companion) = stofs_pair(2, 2);
        assert!(!primary.has_variable("element"));
        assert!(primary.has_variable("zeta"));
        assert_eq!(primary.dimension_len("nele"), None);
        assert!(companion.has_variable("element"));
        assert_eq!(companion.dimension_len("node"), Some(9));
    }
}
