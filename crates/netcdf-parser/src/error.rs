//! Error types for NetCDF reading and writing.

use std::fmt::Display;

use mesh_common::MeshError;
use thiserror::Error;

/// Result type for NetCDF parser operations.
pub type NetCdfResult<T> = Result<T, NetCdfError>;

/// Error types for NetCDF parsing.
#[derive(Error, Debug)]
pub enum NetCdfError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by libnetcdf
    #[error("NetCDF error: {0}")]
    Library(#[from] netcdf::Error),

    /// Missing required variable or dimension
    #[error("Missing required data: {0}")]
    MissingData(String),

    /// Invalid data format
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),
}

/// libnetcdf status codes meaning the location could not be reached, as
/// opposed to being reached and failing to parse. Positive codes are system
/// `errno` values (ENOENT, EACCES, ...).
const UNREACHABLE_CODES: [i32; 8] = [
    -66, // NC_EDAP
    -67, // NC_ECURL
    -68, // NC_EIO
    -70, // NC_EDAPSVC
    -74, // NC_EDAPURL
    -77, // NC_EACCESS
    -78, // NC_EAUTH
    -90, // NC_ENOTFOUND
];

impl NetCdfError {
    /// Whether the failure means the location could not be reached.
    pub fn is_unreachable(&self) -> bool {
        match self {
            NetCdfError::IoError(_) => true,
            NetCdfError::Library(netcdf::Error::Netcdf(code)) => {
                *code > 0 || UNREACHABLE_CODES.contains(code)
            }
            _ => false,
        }
    }

    /// Classify a read failure at `location`.
    ///
    /// Unreachable locations become `SourceUnavailable`; everything else
    /// means the object was reached but is not a usable dataset.
    pub fn into_read_error(self, location: impl Display) -> MeshError {
        if self.is_unreachable() {
            MeshError::source_unavailable(location.to_string(), self)
        } else {
            MeshError::malformed(format!("{}: {}", location, self))
        }
    }
}
