//! NetCDF input and output for unstructured mesh datasets.
//!
//! [`NetcdfReader`] materializes a NetCDF location into a
//! [`RawDataset`](mesh_common::RawDataset). Locations are local paths or
//! HTTP(S) URLs; with the `#mode=bytes` suffix (see [`byte_range_url`])
//! libnetcdf reads the header first and then fetches each variable with its
//! own range requests, so variables rejected by the filter are never
//! downloaded.
//!
//! [`NetcdfWriter`] persists a [`NormalizedMesh`](mesh_common::NormalizedMesh)
//! atomically: a partially written file is never visible at the target path.
//!
//! # System requirements
//!
//! libnetcdf built with HDF5 and byte-range support (`libnetcdf-dev`,
//! `libhdf5-dev`).

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{NetCdfError, NetCdfResult};
pub use reader::{byte_range_url, NetcdfReader};
pub use writer::NetcdfWriter;

use std::sync::Once;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when probing attributes
/// that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// This function disables that output by calling H5Eset_auto2 with null handlers.
/// It only needs to be called once per process, but is safe to call multiple times.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}
