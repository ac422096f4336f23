//! Batch driver: every (date, cycle, file) item is fetched once, normalized
//! once and then cut against every configured region.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use tracing::{error, info, instrument, warn};

use mesh_common::{
    BoundingRegion, DatasetKey, DatasetSource, MeshError, MeshResult, NormalizedMesh,
    VariableFilter,
};
use mesh_subset::{ConventionResolver, MeshNormalizer, MeshSubsetEngine};
use netcdf_parser::NetcdfWriter;

use crate::config::SubsetterConfig;

/// Outcome counts for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub items: usize,
    /// Output files written.
    pub written: usize,
    /// Failed items plus failed (item, region) pairs.
    pub failed: usize,
}

impl BatchSummary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    fn add(&mut self, report: ItemReport) {
        self.items += 1;
        self.written += report.written;
        self.failed += report.failed;
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ItemReport {
    written: usize,
    failed: usize,
}

pub struct SubsetPipeline {
    config: Arc<SubsetterConfig>,
    source: Arc<dyn DatasetSource>,
}

impl SubsetPipeline {
    pub fn new(config: SubsetterConfig, source: Arc<dyn DatasetSource>) -> Self {
        Self {
            config: Arc::new(config),
            source,
        }
    }

    /// Process every item, at most `jobs` at a time.
    ///
    /// Failures are logged and counted; they never stop the batch.
    pub async fn run(&self) -> Result<BatchSummary> {
        let keys = self.config.dataset_keys()?;
        info!(
            items = keys.len(),
            regions = self.config.regions.len(),
            jobs = self.config.jobs,
            "Starting subset batch"
        );

        let reports: Vec<ItemReport> = stream::iter(keys)
            .map(|key| {
                let config = self.config.clone();
                let source = self.source.clone();
                async move {
                    let label = key.to_string();
                    let task = tokio::task::spawn_blocking(move || {
                        process_item(&config, source.as_ref(), &key)
                    });
                    match task.await {
                        Ok(report) => report,
                        Err(e) => {
                            error!(key = %label, error = %e, "Subset task panicked");
                            ItemReport {
                                written: 0,
                                failed: 1,
                            }
                        }
                    }
                }
            })
            .buffer_unordered(self.config.jobs)
            .collect()
            .await;

        let mut summary = BatchSummary::default();
        for report in reports {
            summary.add(report);
        }

        info!(
            items = summary.items,
            written = summary.written,
            failed = summary.failed,
            "Subset batch complete"
        );
        Ok(summary)
    }
}

/// Fetch, normalize, subset and write one item. Blocks.
#[instrument(skip_all, fields(date = %key.date, cycle = %key.cycle, file = %key.file))]
fn process_item(
    config: &SubsetterConfig,
    source: &dyn DatasetSource,
    key: &DatasetKey,
) -> ItemReport {
    let start = Instant::now();

    let mesh = match load_mesh(config, source, key) {
        Ok(mesh) => mesh,
        Err(e) => {
            error!(kind = e.kind(), error = %e, "Failed to load dataset");
            return ItemReport {
                written: 0,
                failed: 1,
            };
        }
    };
    info!(
        nodes = mesh.node_count(),
        elements = mesh.element_count(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Loaded mesh"
    );

    let regions: Vec<BoundingRegion> = config.regions.iter().map(|r| r.region).collect();
    let subsets = MeshSubsetEngine::new().subset_many(&mesh, &regions);

    let mut report = ItemReport::default();
    for (named, subset) in config.regions.iter().zip(subsets) {
        let written = subset.and_then(|sub| {
            if sub.is_empty() {
                warn!(region = %named.name, "Region does not overlap the mesh");
            }
            let path = config.output_path(&named.name, key);
            write_output(&sub, &path, &named.name, &named.region)?;
            Ok((path, sub.node_count(), sub.element_count()))
        });

        match written {
            Ok((path, nodes, elements)) => {
                info!(
                    region = %named.name,
                    path = %path.display(),
                    nodes,
                    elements,
                    "Wrote subset"
                );
                report.written += 1;
            }
            Err(e) => {
                error!(region = %named.name, kind = e.kind(), error = %e, "Failed to subset region");
                report.failed += 1;
            }
        }
    }

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Item complete");
    report
}

fn load_mesh(
    config: &SubsetterConfig,
    source: &dyn DatasetSource,
    key: &DatasetKey,
) -> MeshResult<NormalizedMesh> {
    let filter = VariableFilter::drop(config.drop_variables.iter().cloned());
    let raw = source.open(&key.object_key(), &filter)?;

    let resolver = ConventionResolver::new(source).with_companion_file(&config.companion_file);
    MeshNormalizer::default().normalize(raw, key, &resolver)
}

fn write_output(
    mesh: &NormalizedMesh,
    path: &Path,
    name: &str,
    region: &BoundingRegion,
) -> MeshResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| MeshError::write_failure(path, e))?;
    }
    NetcdfWriter::new()
        .with_history(format!("subset to region {} {}", name, region))
        .write(mesh, path)
}
