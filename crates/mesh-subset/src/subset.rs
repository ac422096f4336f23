//! Spatial subsetting of a normalized mesh against a bounding region.
//!
//! Selection keeps exactly the triangles whose three nodes lie inside the
//! region (boundary inclusive) and the nodes those triangles reference.
//! Triangles straddling the boundary are dropped, never clipped, so no nodes
//! are synthesized. Surviving nodes and elements are renumbered contiguously
//! in their original relative order, which makes the output a pure function
//! of the input mesh and the region.

use std::collections::BTreeMap;

use rayon::prelude::*;
use tracing::{debug, instrument};

use mesh_common::{
    BoundingRegion, MeshError, MeshParts, MeshResult, NormalizedMesh, Variable,
    TRIANGLE_VERTICES,
};

use crate::select::restrict_variable;

/// Node and element counts before and after a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetStats {
    pub nodes_in: usize,
    pub elements_in: usize,
    pub nodes_inside_region: usize,
    pub nodes_out: usize,
    pub elements_out: usize,
}

/// Retained original ids, in output order.
///
/// Only [`MeshSubsetEngine::select`] builds one, so every kept element's
/// vertices are among the kept nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    nodes: Vec<usize>,
    elements: Vec<usize>,
    /// Original node id -> new node id.
    old_to_new: Vec<Option<usize>>,
    nodes_inside_region: usize,
}

impl Selection {
    /// Original ids of the kept nodes.
    pub fn nodes(&self) -> &[usize] {
        &self.nodes
    }

    /// Original ids of the kept elements.
    pub fn elements(&self) -> &[usize] {
        &self.elements
    }

    pub fn new_node_id(&self, old: usize) -> Option<usize> {
        self.old_to_new.get(old).copied().flatten()
    }

    /// Number of nodes of the source mesh this selection was made from.
    pub fn source_node_count(&self) -> usize {
        self.old_to_new.len()
    }
}

/// Computes self-contained sub-meshes. Stateless; the input mesh is only read.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshSubsetEngine;

impl MeshSubsetEngine {
    pub fn new() -> Self {
        Self
    }

    /// Work out which nodes and elements survive, without building the mesh.
    pub fn select(&self, mesh: &NormalizedMesh, region: &BoundingRegion) -> MeshResult<Selection> {
        region.validate()?;

        let inside: Vec<bool> = mesh
            .nodes()
            .iter()
            .map(|&[x, y]| region.contains(x, y))
            .collect();
        let nodes_inside_region = inside.iter().filter(|&&b| b).count();

        let elements: Vec<usize> = mesh
            .elements()
            .iter()
            .enumerate()
            .filter(|(_, tri)| tri.iter().all(|&v| inside[v]))
            .map(|(id, _)| id)
            .collect();

        // Inside nodes that no kept triangle uses are pruned.
        let mut referenced = vec![false; mesh.node_count()];
        for &id in &elements {
            for &v in &mesh.elements()[id] {
                referenced[v] = true;
            }
        }

        let mut old_to_new = vec![None; mesh.node_count()];
        let mut nodes = Vec::new();
        for (old, &is_referenced) in referenced.iter().enumerate() {
            if is_referenced {
                old_to_new[old] = Some(nodes.len());
                nodes.push(old);
            }
        }

        Ok(Selection {
            nodes,
            elements,
            old_to_new,
            nodes_inside_region,
        })
    }

    /// Restrict `mesh` to `region`, returning a new independent mesh.
    ///
    /// A region that misses the mesh yields an empty (but valid) mesh.
    /// Fails with `InvalidRegion` for inverted or non-finite bounds.
    #[instrument(skip(self, mesh), fields(region = %region))]
    pub fn subset(
        &self,
        mesh: &NormalizedMesh,
        region: &BoundingRegion,
    ) -> MeshResult<NormalizedMesh> {
        let selection = self.select(mesh, region)?;
        let (out, stats) = self.apply(mesh, &selection)?;

        debug!(
            nodes_in = stats.nodes_in,
            elements_in = stats.elements_in,
            nodes_inside_region = stats.nodes_inside_region,
            nodes_out = stats.nodes_out,
            elements_out = stats.elements_out,
            "Subset mesh"
        );
        Ok(out)
    }

    /// Subset the same mesh against several regions in parallel.
    ///
    /// Results are returned in the order of `regions`; each is independent.
    pub fn subset_many(
        &self,
        mesh: &NormalizedMesh,
        regions: &[BoundingRegion],
    ) -> Vec<MeshResult<NormalizedMesh>> {
        regions
            .par_iter()
            .map(|region| self.subset(mesh, region))
            .collect()
    }

    /// Build the output mesh for a selection.
    ///
    /// Fails with `MalformedSource` when `selection` was not made from `mesh`.
    pub fn apply(
        &self,
        mesh: &NormalizedMesh,
        selection: &Selection,
    ) -> MeshResult<(NormalizedMesh, SubsetStats)> {
        if selection.source_node_count() != mesh.node_count() {
            return Err(MeshError::malformed(format!(
                "selection was made from a mesh with {} nodes, this mesh has {}",
                selection.source_node_count(),
                mesh.node_count()
            )));
        }
        let layout = mesh.layout().clone();

        let nodes = selection
            .nodes
            .iter()
            .map(|&old| {
                mesh.nodes().get(old).copied().ok_or_else(|| {
                    MeshError::malformed(format!("selected node {} is not in the mesh", old))
                })
            })
            .collect::<MeshResult<Vec<[f64; 2]>>>()?;

        let elements = selection
            .elements
            .iter()
            .map(|&id| {
                let tri = mesh.elements().get(id).ok_or_else(|| {
                    MeshError::malformed(format!("selected element {} is not in the mesh", id))
                })?;
                let mut out = [0usize; TRIANGLE_VERTICES];
                for (slot, &old) in out.iter_mut().zip(tri) {
                    *slot = selection.new_node_id(old).ok_or_else(|| {
                        MeshError::malformed(format!(
                            "element {} uses node {} which is not selected",
                            id, old
                        ))
                    })?;
                }
                Ok(out)
            })
            .collect::<MeshResult<Vec<_>>>()?;

        let node_fields = restrict_all(mesh.node_fields(), &layout.node_dim, &selection.nodes);
        let element_fields =
            restrict_all(mesh.element_fields(), &layout.element_dim, &selection.elements);

        let stats = SubsetStats {
            nodes_in: mesh.node_count(),
            elements_in: mesh.element_count(),
            nodes_inside_region: selection.nodes_inside_region,
            nodes_out: nodes.len(),
            elements_out: elements.len(),
        };

        let out = NormalizedMesh::from_parts(MeshParts {
            nodes,
            elements,
            node_fields,
            element_fields,
            global_fields: mesh.global_fields().clone(),
            extra_dimensions: mesh.extra_dimensions().clone(),
            attributes: mesh.attributes().clone(),
            layout,
        })?;
        Ok((out, stats))
    }
}

fn restrict_all(
    fields: &BTreeMap<String, Variable>,
    dim: &str,
    indices: &[usize],
) -> BTreeMap<String, Variable> {
    fields
        .iter()
        .map(|(name, var)| (name.clone(), restrict_variable(var, dim, indices)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_triangles() -> NormalizedMesh {
        NormalizedMesh::from_parts(MeshParts {
            nodes: vec![[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [20.0, 20.0]],
            elements: vec![[0, 1, 2], [0, 2, 3]],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_select_prunes_unreferenced_inside_nodes() {
        let mesh = NormalizedMesh::from_parts(MeshParts {
            nodes: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [5.0, 5.0]],
            elements: vec![[0, 1, 2], [1, 3, 4]],
            ..Default::default()
        })
        .unwrap();

        // Node 3 is inside but only used by the straddling triangle.
        let region = BoundingRegion::new(0.0, 1.0, 0.0, 1.0);
        let selection = MeshSubsetEngine::new().select(&mesh, &region).unwrap();
        assert_eq!(selection.elements(), &[0]);
        assert_eq!(selection.nodes(), &[0, 1, 2]);
        assert_eq!(selection.new_node_id(3), None);
        assert_eq!(selection.new_node_id(2), Some(2));
    }

    #[test]
    fn test_select_keeps_original_order() {
        let mesh = two_triangles();
        let region = BoundingRegion::new(0.0, 10.0, 0.0, 10.0);
        let selection = MeshSubsetEngine::new().select(&mesh, &region).unwrap();
        assert_eq!(selection.elements(), &[0, 1]);
        assert_eq!(selection.nodes(), &[0, 1, 2, 3]);
        assert_eq!(selection.new_node_id(4), None);
    }

    #[test]
    fn test_stats() {
        let mesh = two_triangles();
        let engine = MeshSubsetEngine::new();
        let selection = engine
            .select(&mesh, &BoundingRegion::new(-1.0, 10.0, -1.0, 10.0))
            .unwrap();
        let (_, stats) = engine.apply(&mesh, &selection).unwrap();
        assert_eq!(
            stats,
            SubsetStats {
                nodes_in: 5,
                elements_in: 2,
                nodes_inside_region: 4,
                nodes_out: 4,
                elements_out: 2,
            }
        );
    }

    #[test]
    fn test_apply_rejects_element_with_unselected_node() {
        let mesh = NormalizedMesh::from_parts(MeshParts {
            nodes: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0], [5.0, 5.0]],
            elements: vec![[0, 1, 2], [1, 3, 4]],
            ..Default::default()
        })
        .unwrap();
        let engine = MeshSubsetEngine::new();
        let mut selection = engine
            .select(&mesh, &BoundingRegion::new(0.0, 1.0, 0.0, 1.0))
            .unwrap();
        assert_eq!(selection.elements(), &[0]);

        // Element 1 uses nodes 3 and 4, neither of which was kept.
        selection.elements.push(1);
        assert!(matches!(
            engine.apply(&mesh, &selection),
            Err(MeshError::MalformedSource(_))
        ));

        selection.elements.push(7);
        assert!(engine.apply(&mesh, &selection).is_err());
    }

    #[test]
    fn test_apply_rejects_selection_from_other_mesh() {
        let engine = MeshSubsetEngine::new();
        let other = NormalizedMesh::from_parts(MeshParts {
            nodes: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
            elements: vec![[0, 1, 2]],
            ..Default::default()
        })
        .unwrap();
        let selection = engine
            .select(&two_triangles(), &BoundingRegion::new(0.0, 10.0, 0.0, 10.0))
            .unwrap();

        assert!(matches!(
            engine.apply(&other, &selection),
            Err(MeshError::MalformedSource(_))
        ));
    }
}
