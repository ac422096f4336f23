//! Assembling a [`NormalizedMesh`] from one or two raw datasets.
//!
//! STOFS-2D-Global writes triangle connectivity only into the `fields.cwl`
//! file of each cycle. The other field files (`fields.htp`, `fields.swl`)
//! share its node ordering, so their mesh is completed by borrowing the
//! connectivity of that companion file.

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use mesh_common::{
    Attributes, DatasetKey, DatasetSource, MeshError, MeshLayout, MeshParts, MeshResult,
    NormalizedMesh, RawDataset, Variable, VariableFilter, DEFAULT_COMPANION_FILE,
    TRIANGLE_VERTICES,
};

/// Variable names the normalizer looks for. Defaults follow ADCIRC output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshSchema {
    pub x_var: String,
    pub y_var: String,
    pub connectivity_var: String,
}

impl Default for MeshSchema {
    fn default() -> Self {
        Self {
            x_var: "x".to_string(),
            y_var: "y".to_string(),
            connectivity_var: "element".to_string(),
        }
    }
}

/// Locates and fetches the dataset that carries connectivity for `primary`.
pub trait CompanionResolver {
    fn resolve_companion(&self, primary: &DatasetKey) -> MeshResult<RawDataset>;
}

/// Resolves the companion by swapping the file variant in the primary key.
pub struct ConventionResolver<S> {
    source: S,
    companion_file: String,
    connectivity_var: String,
}

impl<S: DatasetSource> ConventionResolver<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            companion_file: DEFAULT_COMPANION_FILE.to_string(),
            connectivity_var: MeshSchema::default().connectivity_var,
        }
    }

    pub fn with_companion_file(mut self, file: impl Into<String>) -> Self {
        self.companion_file = file.into();
        self
    }

    pub fn with_connectivity_var(mut self, name: impl Into<String>) -> Self {
        self.connectivity_var = name.into();
        self
    }

    /// Key the companion is fetched from.
    pub fn companion_key(&self, primary: &DatasetKey) -> DatasetKey {
        primary.with_file(&self.companion_file)
    }
}

impl<S: DatasetSource> CompanionResolver for ConventionResolver<S> {
    fn resolve_companion(&self, primary: &DatasetKey) -> MeshResult<RawDataset> {
        let key = self.companion_key(primary);
        if key == *primary {
            return Err(MeshError::malformed(format!(
                "{} lacks '{}' and is its own companion",
                primary, self.connectivity_var
            )));
        }
        debug!(companion = %key, "Fetching companion dataset");
        // Only connectivity is borrowed; the companion's fields are never read.
        self.source.open(
            &key.object_key(),
            &VariableFilter::keep([self.connectivity_var.as_str()]),
        )
    }
}

/// Builds normalized meshes from raw datasets.
#[derive(Debug, Clone, Default)]
pub struct MeshNormalizer {
    schema: MeshSchema,
}

impl MeshNormalizer {
    pub fn new(schema: MeshSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &MeshSchema {
        &self.schema
    }

    /// Normalize `primary`, fetching connectivity from its companion when the
    /// primary does not carry it.
    ///
    /// Companion connectivity is taken index-for-index: both files must list
    /// nodes in the same order. Only the node counts are cross-checked.
    #[instrument(skip_all, fields(key = %key))]
    pub fn normalize(
        &self,
        primary: RawDataset,
        key: &DatasetKey,
        resolver: &dyn CompanionResolver,
    ) -> MeshResult<NormalizedMesh> {
        if primary.has_variable(&self.schema.connectivity_var) {
            debug!("Connectivity present in primary dataset");
            return self.assemble(primary, None);
        }

        info!(
            connectivity = %self.schema.connectivity_var,
            "Connectivity missing from primary dataset, borrowing from companion"
        );
        let companion = resolver.resolve_companion(key)?;
        self.assemble(primary, Some(companion))
    }

    /// Normalize a dataset that must carry its own connectivity.
    pub fn normalize_standalone(&self, primary: RawDataset) -> MeshResult<NormalizedMesh> {
        self.assemble(primary, None)
    }

    fn assemble(
        &self,
        mut primary: RawDataset,
        companion: Option<RawDataset>,
    ) -> MeshResult<NormalizedMesh> {
        let schema = &self.schema;

        let x = take_variable(&mut primary, &schema.x_var)?;
        let y = take_variable(&mut primary, &schema.y_var)?;
        let node_dim = coordinate_dimension(&schema.x_var, &x, &schema.y_var, &y)?;
        let node_count = x.shape[0];

        let connectivity = match companion {
            None => primary
                .variables
                .remove(&schema.connectivity_var)
                .ok_or_else(|| {
                    MeshError::malformed(format!(
                        "dataset has no connectivity variable '{}'",
                        schema.connectivity_var
                    ))
                })?,
            Some(mut companion) => {
                let companion_nodes = companion.dimension_len(&node_dim).ok_or_else(|| {
                    MeshError::malformed(format!(
                        "companion dataset does not declare node dimension '{}'",
                        node_dim
                    ))
                })?;
                if companion_nodes != node_count {
                    return Err(MeshError::malformed(format!(
                        "companion has {} nodes but primary has {}",
                        companion_nodes, node_count
                    )));
                }
                companion
                    .variables
                    .remove(&schema.connectivity_var)
                    .ok_or_else(|| {
                        MeshError::malformed(format!(
                            "neither primary nor companion exposes '{}'",
                            schema.connectivity_var
                        ))
                    })?
            }
        };

        let (element_dim, vertex_dim) =
            connectivity_dimensions(&schema.connectivity_var, &connectivity)?;
        let start_index = connectivity
            .attributes
            .get("start_index")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        let elements = decode_connectivity(&connectivity, start_index, node_count)?;

        let nodes: Vec<[f64; 2]> = x
            .values
            .to_f64()
            .into_iter()
            .zip(y.values.to_f64())
            .map(|(x, y)| [x, y])
            .collect();

        let mut node_fields = BTreeMap::new();
        let mut element_fields = BTreeMap::new();
        let mut global_fields = BTreeMap::new();
        for (name, var) in std::mem::take(&mut primary.variables) {
            if var.axis_of(&node_dim).is_some() {
                node_fields.insert(name, var);
            } else if var.axis_of(&element_dim).is_some() {
                element_fields.insert(name, var);
            } else {
                global_fields.insert(name, var);
            }
        }

        let extra_dimensions = primary
            .dimensions
            .into_iter()
            .filter(|(name, _)| *name != node_dim && *name != element_dim && *name != vertex_dim)
            .collect();

        let mut connectivity_attributes: Attributes = connectivity.attributes;
        connectivity_attributes.remove("start_index");

        debug!(
            nodes = nodes.len(),
            elements = elements.len(),
            node_fields = node_fields.len(),
            element_fields = element_fields.len(),
            global_fields = global_fields.len(),
            "Assembled normalized mesh"
        );

        NormalizedMesh::from_parts(MeshParts {
            nodes,
            elements,
            node_fields,
            element_fields,
            global_fields,
            extra_dimensions,
            attributes: primary.attributes,
            layout: MeshLayout {
                node_dim,
                element_dim,
                vertex_dim,
                x_name: schema.x_var.clone(),
                y_name: schema.y_var.clone(),
                x_attributes: x.attributes,
                y_attributes: y.attributes,
                connectivity_name: schema.connectivity_var.clone(),
                connectivity_attributes,
                start_index,
            },
        })
    }
}

fn take_variable(ds: &mut RawDataset, name: &str) -> MeshResult<Variable> {
    ds.variables
        .remove(name)
        .ok_or_else(|| MeshError::malformed(format!("missing coordinate variable '{}'", name)))
}

/// Both coordinates must be 1-D over the same dimension.
fn coordinate_dimension(
    x_name: &str,
    x: &Variable,
    y_name: &str,
    y: &Variable,
) -> MeshResult<String> {
    if x.rank() != 1 || y.rank() != 1 {
        return Err(MeshError::malformed(format!(
            "coordinates '{}' and '{}' must be 1-D, found ranks {} and {}",
            x_name,
            y_name,
            x.rank(),
            y.rank()
        )));
    }
    if x.dims[0] != y.dims[0] || x.shape[0] != y.shape[0] {
        return Err(MeshError::malformed(format!(
            "coordinates disagree: '{}' is {}[{}], '{}' is {}[{}]",
            x_name, x.dims[0], x.shape[0], y_name, y.dims[0], y.shape[0]
        )));
    }
    Ok(x.dims[0].clone())
}

fn connectivity_dimensions(name: &str, var: &Variable) -> MeshResult<(String, String)> {
    if var.rank() != 2 {
        return Err(MeshError::malformed(format!(
            "connectivity '{}' must be 2-D, found rank {}",
            name,
            var.rank()
        )));
    }
    if var.shape[1] != TRIANGLE_VERTICES {
        return Err(MeshError::malformed(format!(
            "connectivity '{}' has {} vertices per element; only triangles are supported",
            name, var.shape[1]
        )));
    }
    Ok((var.dims[0].clone(), var.dims[1].clone()))
}

/// Convert stored connectivity to zero-based node ids, checking their range.
fn decode_connectivity(
    var: &Variable,
    start_index: i64,
    node_count: usize,
) -> MeshResult<Vec<[usize; TRIANGLE_VERTICES]>> {
    let raw = var
        .values
        .to_i64()
        .ok_or_else(|| MeshError::malformed("connectivity holds non-integer values"))?;

    raw.chunks_exact(TRIANGLE_VERTICES)
        .enumerate()
        .map(|(element, tri)| {
            let mut out = [0usize; TRIANGLE_VERTICES];
            for (slot, &stored) in out.iter_mut().zip(tri) {
                let id = stored - start_index;
                if id < 0 || id as usize >= node_count {
                    return Err(MeshError::malformed(format!(
                        "element {} references node {} (start_index {}), mesh has {} nodes",
                        element, stored, start_index, node_count
                    )));
                }
                *slot = id as usize;
            }
            Ok(out)
        })
        .collect()
}
