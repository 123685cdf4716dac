//! `gabungkit_io_xlsx` v1:
//! Rust-side XLSX sheet-combine kernel.
//!
//! Reads N workbooks, groups their sheets by name, normalizes identifier
//! columns to text, drops artifact columns, concatenates same-named sheets
//! and serializes everything back into a single workbook.
//!
//! - `conf`   : constants and default presets
//! - `spec`   : specs/models/options
//! - `util`   : pure helper functions
//! - `reader` : workbook ingestion kernel
//! - `merge`  : grouping and concatenation core
//! - `writer` : pure-Rust writer kernel
pub mod conf;
pub mod merge;
pub mod reader;
pub mod spec;
pub mod util;
pub mod writer;

pub use conf::{
    C_COLUMN_NOMOR_AJU, C_COLUMN_NOMOR_IDENTITAS, C_COLUMN_SOURCE_NAME,
    C_FILENAME_COMBINED_DEFAULT, C_SHEET_ENTITAS, N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX,
    N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
pub use merge::{combine_sheet_tables, combine_workbook_buffers, combine_workbook_files};
pub use reader::{read_source_tables, read_workbook_from_bytes, read_workbook_from_path};
pub use spec::{
    CombineXlsxError, EnumAutofitColumnsRule, EnumColumnTransform, EnumSheetNamePredicate,
    EnumWorkbookSource, SpecAutofitCellsPolicy, SpecCellFormat, SpecColumnNormalizationRule,
    SpecCombineReport, SpecCombinedSheet, SpecCombinedTable, SpecMergeOptions,
};
pub use util::{
    apply_normalization_rules, concat_tables_rowwise, derive_unique_column_labels,
    drop_artifact_columns, sanitize_sheet_name,
};
pub use writer::XlsxWriter;
