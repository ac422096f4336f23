//! Object key conventions for STOFS-2D-Global output.
//!
//! Keys look like `[{prefix}/]{model}.{date}/{model}.t{cycle}z.{file}.nc`,
//! e.g. `stofs_2d_glo.20240516/stofs_2d_glo.t00z.fields.cwl.nc`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Connectivity-bearing file of each cycle; the other field files omit it.
pub const DEFAULT_COMPANION_FILE: &str = "fields.cwl";

/// Identifies one source object: model run plus file variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetKey {
    pub prefix: Option<String>,
    pub model: String,
    pub date: String,
    pub cycle: String,
    pub file: String,
}

impl DatasetKey {
    /// Build a key, checking the date (`YYYYMMDD`) and cycle (`HH`) formats.
    pub fn new(
        model: impl Into<String>,
        date: impl Into<String>,
        cycle: impl Into<String>,
        file: impl Into<String>,
    ) -> Result<Self, KeyError> {
        let key = Self {
            prefix: None,
            model: model.into(),
            date: date.into(),
            cycle: cycle.into(),
            file: file.into(),
        };
        key.check()?;
        Ok(key)
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        self.prefix = prefix
            .map(|p| p.trim_matches('/').to_string())
            .filter(|p| !p.is_empty());
        self
    }

    /// Same run, different file variant. Used to locate the companion dataset.
    pub fn with_file(&self, file: &str) -> Self {
        Self {
            file: file.to_string(),
            ..self.clone()
        }
    }

    /// Directory segment: `{model}.{date}`.
    pub fn run_directory(&self) -> String {
        format!("{}.{}", self.model, self.date)
    }

    /// File name: `{model}.t{cycle}z.{file}.nc`.
    pub fn file_name(&self) -> String {
        format!("{}.t{}z.{}.nc", self.model, self.cycle, self.file)
    }

    /// Full object key inside the bucket.
    pub fn object_key(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}/{}", prefix, self.run_directory(), self.file_name()),
            None => format!("{}/{}", self.run_directory(), self.file_name()),
        }
    }

    fn check(&self) -> Result<(), KeyError> {
        if self.model.is_empty() || self.model.contains('/') {
            return Err(KeyError::InvalidModel(self.model.clone()));
        }
        if self.date.len() != 8 || NaiveDate::parse_from_str(&self.date, "%Y%m%d").is_err() {
            return Err(KeyError::InvalidDate(self.date.clone()));
        }
        let cycle_ok = self.cycle.len() == 2
            && self
                .cycle
                .parse::<u8>()
                .map(|hour| hour < 24)
                .unwrap_or(false);
        if !cycle_ok {
            return Err(KeyError::InvalidCycle(self.cycle.clone()));
        }
        if self.file.is_empty() || self.file.contains('/') {
            return Err(KeyError::InvalidFile(self.file.clone()));
        }
        Ok(())
    }
}

impl std::fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.object_key())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KeyError {
    #[error("Invalid model name: '{0}'")]
    InvalidModel(String),

    #[error("Invalid date '{0}', expected YYYYMMDD")]
    InvalidDate(String),

    #[error("Invalid cycle '{0}', expected a two-digit hour (00-23)")]
    InvalidCycle(String),

    #[error("Invalid file variant: '{0}'")]
    InvalidFile(String),
}
