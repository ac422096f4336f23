//! Subsetter configuration.
//!
//! Values come from an optional YAML file and from the command line; a value
//! given on the command line replaces the one from the file.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use mesh_common::{BoundingRegion, DatasetKey, DEFAULT_COMPANION_FILE};
use storage::{ObjectStorageConfig, DEFAULT_BUCKET};

/// Model name used in STOFS-2D-Global object keys.
pub const DEFAULT_MODEL: &str = "stofs_2d_glo";

/// Variables skipped when reading source datasets.
pub const DEFAULT_DROP_VARIABLES: [&str; 1] = ["nvel"];

/// One configuration layer. Every field is optional so layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigLayer {
    pub bucket_name: Option<String>,
    pub model_name: Option<String>,
    pub prefix: Option<String>,
    pub dates: Option<Vec<String>>,
    pub cycles: Option<Vec<String>>,
    pub stofs_files: Option<Vec<String>>,
    /// Region list in the `"(x0, x1, y0, y1)(...)"` form.
    pub regions: Option<String>,
    pub region_names: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub companion_file: Option<String>,
    pub drop_variables: Option<Vec<String>>,
    pub local_root: Option<PathBuf>,
    pub jobs: Option<usize>,
}

impl ConfigLayer {
    /// Load a layer from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Fill fields missing here from `base`.
    pub fn over(self, base: ConfigLayer) -> ConfigLayer {
        ConfigLayer {
            bucket_name: self.bucket_name.or(base.bucket_name),
            model_name: self.model_name.or(base.model_name),
            prefix: self.prefix.or(base.prefix),
            dates: self.dates.or(base.dates),
            cycles: self.cycles.or(base.cycles),
            stofs_files: self.stofs_files.or(base.stofs_files),
            regions: self.regions.or(base.regions),
            region_names: self.region_names.or(base.region_names),
            output_dir: self.output_dir.or(base.output_dir),
            companion_file: self.companion_file.or(base.companion_file),
            drop_variables: self.drop_variables.or(base.drop_variables),
            local_root: self.local_root.or(base.local_root),
            jobs: self.jobs.or(base.jobs),
        }
    }
}

/// A bounding region and the directory name its outputs go under.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedRegion {
    pub name: String,
    pub region: BoundingRegion,
}

/// Fully resolved and validated configuration.
#[derive(Debug, Clone)]
pub struct SubsetterConfig {
    pub storage: ObjectStorageConfig,
    pub model: String,
    pub prefix: Option<String>,
    pub dates: Vec<String>,
    pub cycles: Vec<String>,
    pub files: Vec<String>,
    pub regions: Vec<NamedRegion>,
    pub output_dir: PathBuf,
    pub companion_file: String,
    pub drop_variables: Vec<String>,
    /// Read from this local mirror instead of S3.
    pub local_root: Option<PathBuf>,
    pub jobs: usize,
}

impl SubsetterConfig {
    /// Apply defaults to a merged layer and validate it.
    pub fn resolve(layer: ConfigLayer) -> Result<Self> {
        let bucket = layer
            .bucket_name
            .unwrap_or_else(|| DEFAULT_BUCKET.to_string());

        let dates = required(layer.dates, "dates")?;
        let cycles = required(layer.cycles, "cycles")?;
        let files = required(layer.stofs_files, "stofs_files")?;
        let region_names = required(layer.region_names, "region_names")?;
        let region_list = layer
            .regions
            .filter(|r| !r.trim().is_empty())
            .context("Missing required setting: regions")?;

        let parsed = BoundingRegion::parse_list(&region_list)
            .with_context(|| format!("Invalid regions '{}'", region_list))?;

        let config = Self {
            storage: ObjectStorageConfig::from_env(bucket),
            model: layer.model_name.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            prefix: layer.prefix,
            dates,
            cycles,
            files,
            regions: pair_regions(region_names, parsed)?,
            output_dir: layer.output_dir.unwrap_or_else(|| PathBuf::from(".")),
            companion_file: layer
                .companion_file
                .unwrap_or_else(|| DEFAULT_COMPANION_FILE.to_string()),
            drop_variables: layer.drop_variables.unwrap_or_else(|| {
                DEFAULT_DROP_VARIABLES
                    .iter()
                    .map(|s| s.to_string())
                    .collect()
            }),
            local_root: layer.local_root,
            jobs: layer.jobs.unwrap_or(2),
        };
        config.validate()?;
        Ok(config)
    }

    /// Check everything that can be checked before touching the network.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            bail!("jobs must be > 0");
        }
        for region in &self.regions {
            region
                .region
                .validate()
                .with_context(|| format!("Region '{}'", region.name))?;
        }
        if self.companion_file.is_empty() || self.companion_file.contains('/') {
            bail!("Invalid companion file '{}'", self.companion_file);
        }
        self.dataset_keys()?;
        Ok(())
    }

    /// Every (date, cycle, file) combination, in argument order.
    pub fn dataset_keys(&self) -> Result<Vec<DatasetKey>> {
        let mut keys = Vec::with_capacity(self.dates.len() * self.cycles.len() * self.files.len());
        for date in &self.dates {
            for cycle in &self.cycles {
                for file in &self.files {
                    let key = DatasetKey::new(&self.model, date, cycle, file)?
                        .with_prefix(self.prefix.clone());
                    keys.push(key);
                }
            }
        }
        Ok(keys)
    }

    /// `{output_dir}/{region}/{date}/{model}.t{cycle}z.{file}.nc`
    pub fn output_path(&self, region: &str, key: &DatasetKey) -> PathBuf {
        self.output_dir
            .join(region)
            .join(&key.date)
            .join(key.file_name())
    }
}

fn required(values: Option<Vec<String>>, name: &str) -> Result<Vec<String>> {
    match values {
        Some(values) if !values.is_empty() => Ok(values),
        _ => bail!("Missing required setting: {}", name),
    }
}

fn pair_regions(names: Vec<String>, regions: Vec<BoundingRegion>) -> Result<Vec<NamedRegion>> {
    if names.len() != regions.len() {
        bail!(
            "{} region names given for {} regions",
            names.len(),
            regions.len()
        );
    }

    let mut seen = HashSet::new();
    for name in &names {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            bail!("Invalid region name '{}'", name);
        }
        if !seen.insert(name.as_str()) {
            bail!("Duplicate region name '{}'", name);
        }
    }

    Ok(names
        .into_iter()
        .zip(regions)
        .map(|(name, region)| NamedRegion { name, region })
        .collect())
}
