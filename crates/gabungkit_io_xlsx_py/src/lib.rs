use std::path::PathBuf;

use gabungkit_io_xlsx::conf::{C_FILENAME_COMBINED_DEFAULT, derive_default_merge_options};
use gabungkit_io_xlsx::merge::{combine_workbook_buffers, combine_workbook_files};
use gabungkit_io_xlsx::spec::{CombineXlsxError, EnumWorkbookSource};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyBytes;

fn derive_py_error(err: CombineXlsxError) -> PyErr {
    match err {
        CombineXlsxError::WriteFailed { .. } => PyRuntimeError::new_err(err.to_string()),
        _ => PyValueError::new_err(err.to_string()),
    }
}

/// Combine uploaded workbook buffers into one workbook.
///
/// `sources` is a list of `(display_name, bytes)` pairs in upload order.
/// Returns `(combined_bytes, warnings)`.
#[pyfunction]
fn combine_buffers(
    py: Python<'_>,
    sources: Vec<(String, Vec<u8>)>,
) -> PyResult<(Py<PyBytes>, Vec<String>)> {
    let l_sources: Vec<EnumWorkbookSource> = sources
        .into_iter()
        .map(|(name, bytes)| EnumWorkbookSource::Buffer { name, bytes })
        .collect();

    let cfg_options = derive_default_merge_options();
    let (v_bytes, report) =
        combine_workbook_buffers(&l_sources, &cfg_options).map_err(derive_py_error)?;

    Ok((PyBytes::new(py, &v_bytes).unbind(), report.warnings))
}

/// Combine staged workbook files into one workbook at `file_out`.
///
/// Returns `(output_path, warnings)`. Input files are left untouched; the
/// caller owns staging-directory cleanup.
#[pyfunction]
fn combine_files(paths: Vec<PathBuf>, file_out: PathBuf) -> PyResult<(String, Vec<String>)> {
    let cfg_options = derive_default_merge_options();
    let (path_out, report) =
        combine_workbook_files(&paths, &file_out, &cfg_options).map_err(derive_py_error)?;

    Ok((path_out.display().to_string(), report.warnings))
}

#[pymodule]
fn _gabungkit_io_xlsx_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add("DEFAULT_OUTPUT_FILENAME", C_FILENAME_COMBINED_DEFAULT)?;
    m.add_function(wrap_pyfunction!(combine_buffers, m)?)?;
    m.add_function(wrap_pyfunction!(combine_files, m)?)?;
    Ok(())
}
