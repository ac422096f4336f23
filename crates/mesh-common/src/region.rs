//! Bounding region types and operations.

use serde::{Deserialize, Serialize};

use crate::error::{MeshError, MeshResult};

/// An axis-aligned box in the mesh's native coordinates.
///
/// STOFS meshes store longitude/latitude in degrees. No reprojection is
/// performed, so the region must use the same longitude convention as the
/// mesh (-180..180 for the global STOFS grid).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl BoundingRegion {
    /// Create a region from `(x_min, x_max, y_min, y_max)`.
    ///
    /// The bounds are not checked here; call [`BoundingRegion::validate`]
    /// before using the region for selection.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Reject degenerate or non-finite regions.
    ///
    /// Equal bounds are valid (a zero-area box still selects nodes that sit
    /// exactly on it).
    pub fn validate(&self) -> MeshResult<()> {
        let bounds = [self.x_min, self.x_max, self.y_min, self.y_max];
        if bounds.iter().any(|b| !b.is_finite()) {
            return Err(MeshError::InvalidRegion(format!(
                "{} has a non-finite bound",
                self
            )));
        }
        if self.x_min > self.x_max {
            return Err(MeshError::InvalidRegion(format!(
                "{}: x_min {} is greater than x_max {}",
                self, self.x_min, self.x_max
            )));
        }
        if self.y_min > self.y_max {
            return Err(MeshError::InvalidRegion(format!(
                "{}: y_min {} is greater than y_max {}",
                self, self.y_min, self.y_max
            )));
        }
        Ok(())
    }

    /// Width of the region in coordinate units.
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// Height of the region in coordinate units.
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Inclusive containment test: points on any of the four edges are inside.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Check whether `other` lies entirely within this region.
    pub fn contains_region(&self, other: &BoundingRegion) -> bool {
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }

    /// Smallest region covering every point, or `None` for an empty iterator.
    pub fn envelope<I>(points: I) -> Option<BoundingRegion>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let [x0, y0] = iter.next()?;
        let mut env = BoundingRegion::new(x0, x0, y0, y0);
        for [x, y] in iter {
            env.x_min = env.x_min.min(x);
            env.x_max = env.x_max.max(x);
            env.y_min = env.y_min.min(y);
            env.y_max = env.y_max.max(y);
        }
        Some(env)
    }

    /// Parse a list of regions: `"(x_min, x_max, y_min, y_max)(x_min, x_max, y_min, y_max)"`.
    ///
    /// Whitespace between and inside the tuples is ignored.
    pub fn parse_list(s: &str) -> Result<Vec<BoundingRegion>, RegionParseError> {
        let trimmed = s.trim();
        if !trimmed.starts_with('(') || !trimmed.ends_with(')') {
            return Err(RegionParseError::InvalidFormat(s.to_string()));
        }

        let mut regions = Vec::new();
        for chunk in trimmed.split(')') {
            let chunk = chunk.trim();
            if chunk.is_empty() {
                continue;
            }
            let body = chunk
                .strip_prefix('(')
                .ok_or_else(|| RegionParseError::InvalidFormat(chunk.to_string()))?;
            regions.push(Self::parse_tuple(body)?);
        }

        if regions.is_empty() {
            return Err(RegionParseError::InvalidFormat(s.to_string()));
        }
        Ok(regions)
    }

    fn parse_tuple(body: &str) -> Result<BoundingRegion, RegionParseError> {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            return Err(RegionParseError::WrongArity {
                region: body.to_string(),
                count: parts.len(),
            });
        }

        let mut values = [0.0f64; 4];
        for (slot, part) in values.iter_mut().zip(&parts) {
            *slot = part
                .parse()
                .map_err(|_| RegionParseError::InvalidNumber(part.to_string()))?;
        }
        Ok(BoundingRegion::new(values[0], values[1], values[2], values[3]))
    }
}

impl std::fmt::Display for BoundingRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RegionParseError {
    #[error("Invalid region list: {0}. Expected '(x_min, x_max, y_min, y_max)(...)'")]
    InvalidFormat(String),

    #[error("Region '{region}' has {count} values, expected 4")]
    WrongArity { region: String, count: usize },

    #[error("Invalid number in region: {0}")]
    InvalidNumber(String),
}
