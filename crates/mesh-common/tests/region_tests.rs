//! Tests for BoundingRegion parsing, validation and containment.

use mesh_common::{BoundingRegion, MeshError, RegionParseError};
use test_utils::assert_approx_eq;

// ============================================================================
// parse_list tests
// ============================================================================

#[test]
fn test_parse_single_region() {
    let regions = BoundingRegion::parse_list("(-70, -60, 40, 50)").unwrap();
    assert_eq!(regions, vec![BoundingRegion::new(-70.0, -60.0, 40.0, 50.0)]);
}

#[test]
fn test_parse_regions_with_spacing() {
    let regions =
        BoundingRegion::parse_list("  (144.5,145.9,13.1,15.5) ( 151.3 , 152.2 , 6.8 , 7.8 ) ")
            .unwrap();
    assert_eq!(regions.len(), 2);
    assert_approx_eq!(regions[1].x_min, 151.3, 1e-12);
    assert_approx_eq!(regions[1].y_max, 7.8, 1e-12);
}

#[test]
fn test_parse_scientific_notation() {
    let regions = BoundingRegion::parse_list("(1e-3, 2e1, -1.5e0, 0)").unwrap();
    assert_eq!(regions[0], BoundingRegion::new(0.001, 20.0, -1.5, 0.0));
}

#[test]
fn test_parse_missing_parentheses() {
    let result = BoundingRegion::parse_list("0, 10, 0, 10");
    assert!(matches!(result, Err(RegionParseError::InvalidFormat(_))));
}

#[test]
fn test_parse_empty_string() {
    let result = BoundingRegion::parse_list("");
    assert!(matches!(result, Err(RegionParseError::InvalidFormat(_))));
}

#[test]
fn test_parse_empty_parentheses() {
    let result = BoundingRegion::parse_list("()");
    assert!(matches!(result, Err(RegionParseError::WrongArity { count: 1, .. })));
}

#[test]
fn test_parse_too_few_values() {
    let result = BoundingRegion::parse_list("(0, 10, 0)");
    assert!(matches!(result, Err(RegionParseError::WrongArity { count: 3, .. })));
}

#[test]
fn test_parse_invalid_number() {
    let result = BoundingRegion::parse_list("(0, ten, 0, 10)");
    assert_eq!(result, Err(RegionParseError::InvalidNumber("ten".to_string())));
}

#[test]
fn test_parse_text_between_regions() {
    let result = BoundingRegion::parse_list("(0, 1, 0, 1) and (2, 3, 2, 3)");
    assert!(matches!(result, Err(RegionParseError::InvalidFormat(_))));
}

// ============================================================================
// validate tests
// ============================================================================

#[test]
fn test_validate_accepts_ordered_bounds() {
    assert!(BoundingRegion::new(-70.0, -60.0, 40.0, 50.0).validate().is_ok());
}

#[test]
fn test_validate_accepts_equal_bounds() {
    assert!(BoundingRegion::new(5.0, 5.0, 5.0, 5.0).validate().is_ok());
}

#[test]
fn test_validate_rejects_inverted_y() {
    let result = BoundingRegion::new(0.0, 10.0, 10.0, 0.0).validate();
    assert!(matches!(result, Err(MeshError::InvalidRegion(_))));
}

#[test]
fn test_validate_rejects_nan() {
    let result = BoundingRegion::new(f64::NAN, 10.0, 0.0, 10.0).validate();
    assert!(matches!(result, Err(MeshError::InvalidRegion(_))));
}

#[test]
fn test_validate_rejects_infinite() {
    let result = BoundingRegion::new(0.0, f64::INFINITY, 0.0, 10.0).validate();
    assert!(matches!(result, Err(MeshError::InvalidRegion(_))));
}

// ============================================================================
// Containment tests
// ============================================================================

#[test]
fn test_contains_inside() {
    let region = BoundingRegion::new(0.0, 10.0, 0.0, 10.0);
    assert!(region.contains(5.0, 5.0));
}

#[test]
fn test_contains_on_edges() {
    let region = BoundingRegion::new(0.0, 10.0, 0.0, 10.0);
    assert!(region.contains(0.0, 5.0));
    assert!(region.contains(10.0, 5.0));
    assert!(region.contains(5.0, 0.0));
    assert!(region.contains(5.0, 10.0));
}

#[test]
fn test_contains_corners() {
    let region = BoundingRegion::new(0.0, 10.0, 0.0, 10.0);
    assert!(region.contains(0.0, 0.0));
    assert!(region.contains(10.0, 0.0));
    assert!(region.contains(0.0, 10.0));
    assert!(region.contains(10.0, 10.0));
}

#[test]
fn test_contains_outside() {
    let region = BoundingRegion::new(0.0, 10.0, 0.0, 10.0);
    assert!(!region.contains(-0.001, 5.0));
    assert!(!region.contains(10.001, 5.0));
    assert!(!region.contains(5.0, -0.001));
    assert!(!region.contains(5.0, 10.001));
}

#[test]
fn test_zero_area_region_contains_its_point() {
    let region = BoundingRegion::new(5.0, 5.0, 5.0, 5.0);
    assert!(region.contains(5.0, 5.0));
    assert!(!region.contains(5.0, 5.000001));
}

#[test]
fn test_contains_region() {
    let outer = BoundingRegion::new(-10.0, 10.0, -10.0, 10.0);
    let inner = BoundingRegion::new(-5.0, 5.0, -5.0, 5.0);
    assert!(outer.contains_region(&inner));
    assert!(!inner.contains_region(&outer));
    assert!(outer.contains_region(&outer));
}

#[test]
fn test_width_height() {
    let region = BoundingRegion::new(144.5, 145.9, 13.1, 15.5);
    assert!((region.width() - 1.4).abs() < 1e-9);
    assert!((region.height() - 2.4).abs() < 1e-9);
}

#[test]
fn test_display() {
    let region = BoundingRegion::new(-70.0, -60.0, 40.0, 50.0);
    assert_eq!(region.to_string(), "(-70, -60, 40, 50)");
}
