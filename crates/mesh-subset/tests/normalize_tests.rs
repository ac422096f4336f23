//! Tests for MeshNormalizer and companion connectivity resolution.

use mesh_common::{
    AttrValue, DatasetKey, MeshError, RawDataset, Values, Variable, VariableFilter,
};
use mesh_subset::{CompanionResolver, ConventionResolver, MeshNormalizer, MeshSchema};
use test_utils::{grid_dataset, grid_mesh, stofs_pair, MemorySource};

fn htp_key() -> DatasetKey {
    DatasetKey::new("stofs_2d_glo", "20240516", "00", "fields.htp").unwrap()
}

fn cwl_key() -> DatasetKey {
    htp_key().with_file("fields.cwl")
}

/// Resolver that must never be consulted.
struct NoCompanion;

impl CompanionResolver for NoCompanion {
    fn resolve_companion(&self, primary: &DatasetKey) -> mesh_common::MeshResult<RawDataset> {
        panic!("companion requested for {}", primary);
    }
}

// ============================================================================
// Self-contained datasets
// ============================================================================

#[test]
fn test_dataset_with_connectivity_skips_companion() {
    let mesh = MeshNormalizer::default()
        .normalize(grid_dataset(2, 2), &cwl_key(), &NoCompanion)
        .unwrap();
    assert_eq!(mesh, grid_mesh(2, 2));
}

#[test]
fn test_fields_are_classified_by_dimension() {
    let mesh = MeshNormalizer::default()
        .normalize_standalone(grid_dataset(2, 2))
        .unwrap();

    assert!(mesh.node_fields().contains_key("zeta"));
    assert!(mesh.node_fields().contains_key("depth"));
    assert!(mesh.element_fields().contains_key("element_code"));
    assert!(mesh.global_fields().contains_key("time"));
    // Coordinates and connectivity are structural, not fields.
    assert!(mesh.field("x").is_none());
    assert!(mesh.field("element").is_none());
    assert!(mesh.extra_dimensions().contains_key("time"));
    assert!(!mesh.extra_dimensions().contains_key("node"));
}

#[test]
fn test_round_trip_through_raw_dataset() {
    let raw = grid_dataset(3, 1);
    let mesh = MeshNormalizer::default()
        .normalize_standalone(raw.clone())
        .unwrap();
    assert_eq!(mesh.to_raw_dataset().unwrap(), raw);
}

#[test]
fn test_custom_schema_names() {
    let mut ds = RawDataset::new();
    ds.insert_variable("lon", Variable::vector("nodes", Values::F32(vec![0.0, 1.0, 0.0])));
    ds.insert_variable("lat", Variable::vector("nodes", Values::F32(vec![0.0, 0.0, 1.0])));
    ds.insert_variable(
        "tri",
        Variable::new(
            vec!["cells".into(), "corners".into()],
            vec![1, 3],
            Values::I32(vec![0, 1, 2]),
            Default::default(),
        )
        .unwrap(),
    );

    let normalizer = MeshNormalizer::new(MeshSchema {
        x_var: "lon".to_string(),
        y_var: "lat".to_string(),
        connectivity_var: "tri".to_string(),
    });
    let mesh = normalizer.normalize_standalone(ds).unwrap();
    assert_eq!(mesh.layout().node_dim, "nodes");
    assert_eq!(mesh.layout().element_dim, "cells");
    assert_eq!(mesh.nodes(), &[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]);
}

#[test]
fn test_missing_coordinates_are_malformed() {
    let mut ds = grid_dataset(1, 1);
    ds.variables.remove("y");
    let result = MeshNormalizer::default().normalize_standalone(ds);
    assert!(matches!(result, Err(MeshError::MalformedSource(_))));
}

#[test]
fn test_non_integer_connectivity_is_malformed() {
    let mut ds = grid_dataset(1, 1);
    let element = ds.variables.get_mut("element").unwrap();
    element.values = Values::F64(vec![1.0, 2.0, 4.5, 1.0, 4.0, 3.0]);
    let result = MeshNormalizer::default().normalize_standalone(ds);
    assert!(matches!(result, Err(MeshError::MalformedSource(_))));
}

#[test]
fn test_zero_based_connectivity_without_start_index() {
    let mut ds = grid_dataset(1, 1);
    let element = ds.variables.get_mut("element").unwrap();
    element.attributes.remove("start_index");
    element.values = Values::I32(vec![0, 1, 3, 0, 3, 2]);

    let mesh = MeshNormalizer::default().normalize_standalone(ds).unwrap();
    assert_eq!(mesh.elements(), &[[0, 1, 3], [0, 3, 2]]);
    assert_eq!(mesh.layout().start_index, 0);
}

// ============================================================================
// Companion merge
// ============================================================================

#[test]
fn test_companion_supplies_connectivity() {
    let (primary, companion) = stofs_pair(2, 1);
    let source = MemorySource::new().with_dataset(cwl_key().object_key(), companion);
    let resolver = ConventionResolver::new(&source);

    let mesh = MeshNormalizer::default()
        .normalize(primary.clone(), &htp_key(), &resolver)
        .unwrap();

    let reference = grid_mesh(2, 1);
    assert_eq!(mesh.elements(), reference.elements());
    assert_eq!(mesh.element_count(), 4);
    assert_eq!(mesh.nodes(), reference.nodes());
    assert_eq!(mesh.layout().start_index, 1);
    // Node fields come from the primary, not the companion.
    assert_eq!(mesh.field("depth"), primary.variable("depth"));
    assert!(mesh.element_fields().is_empty());
}

#[test]
fn test_companion_is_fetched_with_connectivity_only() {
    let (primary, companion) = stofs_pair(1, 1);
    let source = MemorySource::new().with_dataset(cwl_key().object_key(), companion);
    let resolver = ConventionResolver::new(&source);

    MeshNormalizer::default()
        .normalize(primary, &htp_key(), &resolver)
        .unwrap();

    assert_eq!(
        source.requests(),
        vec![(
            "stofs_2d_glo.20240516/stofs_2d_glo.t00z.fields.cwl.nc".to_string(),
            VariableFilter::keep(["element"])
        )]
    );
}

#[test]
fn test_companion_node_count_mismatch() {
    let (primary, _) = stofs_pair(2, 2);
    let (_, smaller_companion) = stofs_pair(1, 1);
    let source = MemorySource::new().with_dataset(cwl_key().object_key(), smaller_companion);

    let result = MeshNormalizer::default().normalize(
        primary,
        &htp_key(),
        &ConventionResolver::new(&source),
    );
    assert!(matches!(result, Err(MeshError::MalformedSource(_))));
}

#[test]
fn test_companion_without_connectivity() {
    let (primary, mut companion) = stofs_pair(1, 1);
    companion.variables.remove("element");
    let source = MemorySource::new().with_dataset(cwl_key().object_key(), companion);

    let result = MeshNormalizer::default().normalize(
        primary,
        &htp_key(),
        &ConventionResolver::new(&source),
    );
    assert!(matches!(result, Err(MeshError::MalformedSource(_))));
}

#[test]
fn test_missing_companion_is_source_unavailable() {
    let (primary, _) = stofs_pair(1, 1);
    let source = MemorySource::new();

    let result = MeshNormalizer::default().normalize(
        primary,
        &htp_key(),
        &ConventionResolver::new(&source),
    );
    assert!(matches!(result, Err(MeshError::SourceUnavailable { .. })));
}

#[test]
fn test_companion_file_is_not_its_own_companion() {
    let (primary, _) = stofs_pair(1, 1);
    let source = MemorySource::new();

    let result = MeshNormalizer::default().normalize(
        primary,
        &cwl_key(),
        &ConventionResolver::new(&source),
    );
    assert!(matches!(result, Err(MeshError::MalformedSource(_))));
    assert!(source.requests().is_empty());
}

#[test]
fn test_custom_companion_file() {
    let (primary, companion) = stofs_pair(1, 1);
    let mesh_key = htp_key().with_file("mesh");
    let source = MemorySource::new().with_dataset(mesh_key.object_key(), companion);
    let resolver = ConventionResolver::new(&source).with_companion_file("mesh");

    assert_eq!(resolver.companion_key(&htp_key()), mesh_key);
    let mesh = MeshNormalizer::default()
        .normalize(primary, &htp_key(), &resolver)
        .unwrap();
    assert_eq!(mesh.element_count(), 2);
    assert_eq!(
        mesh.layout().connectivity_attributes.get("long_name"),
        Some(&AttrValue::from("element"))
    );
}
