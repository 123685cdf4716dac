//! Sheet grouping, normalization and concatenation core.
//!
//! One combine call reads every sheet of every source, applies the
//! identifier-column rule table, drops artifact columns, groups sheets by
//! name in first-seen order and concatenates each group into one output
//! sheet. Any unreadable source aborts the whole merge; no partial output
//! is ever produced.

use std::path::{Path, PathBuf};

use polars::prelude::DataFrame;

use crate::conf::derive_default_xlsx_formats;
use crate::reader::read_source_tables;
use crate::spec::{
    CombineXlsxError, EnumWorkbookSource, SpecCombineReport, SpecCombinedTable, SpecMergeOptions,
};
use crate::util::{apply_normalization_rules, concat_tables_rowwise, drop_artifact_columns};
use crate::writer::XlsxWriter;

////////////////////////////////////////////////////////////////////////////////
// #region SheetGrouping

struct SpecSheetGroup {
    sheet_name: String,
    l_tables: Vec<DataFrame>,
}

fn collect_sheet_groups(
    sources: &[EnumWorkbookSource],
    options: &SpecMergeOptions,
) -> Result<Vec<SpecSheetGroup>, CombineXlsxError> {
    let mut l_groups: Vec<SpecSheetGroup> = Vec::new();

    for source in sources {
        let wrap_source_error = |message: String| CombineXlsxError::UnreadableSource {
            source: source.identifier(),
            message,
        };

        let l_tables = read_source_tables(source).map_err(wrap_source_error)?;
        for (c_sheet_name, df) in l_tables {
            let df = apply_normalization_rules(df, &c_sheet_name, &options.rules)
                .map_err(wrap_source_error)?;
            let df =
                drop_artifact_columns(df, &options.columns_artifact).map_err(wrap_source_error)?;

            match l_groups
                .iter_mut()
                .find(|group| group.sheet_name == c_sheet_name)
            {
                Some(group) => group.l_tables.push(df),
                None => l_groups.push(SpecSheetGroup {
                    sheet_name: c_sheet_name,
                    l_tables: vec![df],
                }),
            }
        }
    }

    Ok(l_groups)
}

fn combine_collected_groups(
    l_groups: Vec<SpecSheetGroup>,
) -> Result<Vec<SpecCombinedTable>, CombineXlsxError> {
    if l_groups.is_empty() {
        return Err(CombineXlsxError::NothingToCombine);
    }

    let mut l_combined = Vec::with_capacity(l_groups.len());
    for group in l_groups {
        let num_tables = group.l_tables.len();
        let df_combined = concat_tables_rowwise(&group.l_tables)
            .map_err(|message| CombineXlsxError::WriteFailed { message })?;

        l_combined.push(SpecCombinedTable {
            sheet_name: group.sheet_name,
            table: df_combined,
            num_tables,
        });
    }

    Ok(l_combined)
}

/// Combine every sheet of every source into one table per sheet name.
///
/// Group order is the order in which each distinct sheet name was first
/// seen across all sources; rows keep source order within each group.
pub fn combine_sheet_tables(
    sources: &[EnumWorkbookSource],
    options: &SpecMergeOptions,
) -> Result<Vec<SpecCombinedTable>, CombineXlsxError> {
    if sources.is_empty() {
        return Err(CombineXlsxError::NoInputFiles);
    }

    combine_collected_groups(collect_sheet_groups(sources, options)?)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TransportEntryPoints

fn write_combined_workbook(
    l_combined: &[SpecCombinedTable],
    options: &SpecMergeOptions,
) -> Result<(XlsxWriter, SpecCombineReport), CombineXlsxError> {
    let dict_fmts = derive_default_xlsx_formats();
    let fmt_text = dict_fmts
        .get("text")
        .cloned()
        .ok_or_else(|| CombineXlsxError::WriteFailed {
            message: "Missing default format: text".to_string(),
        })?;
    let fmt_header = dict_fmts
        .get("header")
        .cloned()
        .ok_or_else(|| CombineXlsxError::WriteFailed {
            message: "Missing default format: header".to_string(),
        })?;

    let mut writer = XlsxWriter::new(fmt_text, fmt_header, options.policy_autofit.clone());
    let mut report = SpecCombineReport::default();

    for combined in l_combined {
        writer
            .write_sheet(
                &combined.table,
                &combined.sheet_name,
                combined.num_tables,
                &mut report,
            )
            .map_err(|message| CombineXlsxError::WriteFailed { message })?;
    }

    Ok((writer, report))
}

/// Combine in-memory workbook sources into serialized workbook bytes.
pub fn combine_workbook_buffers(
    sources: &[EnumWorkbookSource],
    options: &SpecMergeOptions,
) -> Result<(Vec<u8>, SpecCombineReport), CombineXlsxError> {
    let l_combined = combine_sheet_tables(sources, options)?;
    let (mut writer, report) = write_combined_workbook(&l_combined, options)?;

    let v_bytes = writer
        .save_to_buffer()
        .map_err(|message| CombineXlsxError::WriteFailed { message })?;

    Ok((v_bytes, report))
}

/// Combine on-disk workbook files into one workbook at `path_file_out`.
///
/// Input files are never deleted or mutated; staging cleanup belongs to the
/// caller.
pub fn combine_workbook_files(
    l_paths: &[PathBuf],
    path_file_out: &Path,
    options: &SpecMergeOptions,
) -> Result<(PathBuf, SpecCombineReport), CombineXlsxError> {
    let l_sources: Vec<EnumWorkbookSource> = l_paths
        .iter()
        .map(|path| EnumWorkbookSource::File { path: path.clone() })
        .collect();

    let l_combined = combine_sheet_tables(&l_sources, options)?;
    let (mut writer, report) = write_combined_workbook(&l_combined, options)?;

    writer
        .save_to_file(path_file_out)
        .map_err(|message| CombineXlsxError::WriteFailed { message })?;

    Ok((path_file_out.to_path_buf(), report))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
