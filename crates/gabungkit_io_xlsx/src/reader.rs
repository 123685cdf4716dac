//! Workbook ingestion kernel that reads every sheet as text-or-missing.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Range, Reader, Xlsx, open_workbook_auto};
use polars::prelude::{Column, DataFrame};

use crate::spec::EnumWorkbookSource;
use crate::util::derive_unique_column_labels;

////////////////////////////////////////////////////////////////////////////////
// #region CellIngestion

/// Render one workbook cell as text; empty cells stay missing.
///
/// No type inference is performed: numbers, booleans and dates all become
/// their plain text rendering.
pub fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::Empty => None,
        Data::String(val) => Some(val.clone()),
        Data::Float(val) => Some(format!("{val}")),
        Data::Int(val) => Some(format!("{val}")),
        Data::Bool(val) => Some(if *val { "True" } else { "False" }.to_string()),
        Data::DateTime(val) => Some(match val.as_datetime() {
            Some(timestamp) => timestamp.to_string(),
            None => val.as_f64().to_string(),
        }),
        Data::DateTimeIso(val) => Some(val.clone()),
        Data::DurationIso(val) => Some(val.clone()),
        Data::Error(val) => Some(val.to_string()),
    }
}

/// Convert one sheet's used range into an all-text dataframe.
///
/// The first row of the used range is the header row; a sheet with an empty
/// used range yields an empty dataframe.
pub fn derive_table_from_range(range: &Range<Data>) -> Result<DataFrame, String> {
    let mut rows = range.rows();
    let Some(row_header) = rows.next() else {
        return Ok(DataFrame::empty());
    };

    let l_labels_raw: Vec<Option<String>> = row_header.iter().map(cell_text).collect();
    let l_labels = derive_unique_column_labels(&l_labels_raw);
    let n_width = l_labels.len();

    let mut l_values_by_col: Vec<Vec<Option<String>>> = vec![Vec::new(); n_width];
    for row in rows {
        for (n_idx_col, l_values) in l_values_by_col.iter_mut().enumerate() {
            l_values.push(row.get(n_idx_col).and_then(cell_text));
        }
    }

    let l_cols: Vec<Column> = l_labels
        .into_iter()
        .zip(l_values_by_col)
        .map(|(c_label, l_values)| Column::new(c_label.as_str().into(), l_values))
        .collect();

    DataFrame::new(l_cols).map_err(|err| format!("Failed to build sheet table: {err}"))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region WorkbookIngestion

fn collect_workbook_tables<RS, R>(workbook: &mut R) -> Result<Vec<(String, DataFrame)>, String>
where
    RS: Read + Seek,
    R: Reader<RS>,
    R::Error: std::fmt::Display,
{
    let l_sheet_names = workbook.sheet_names();

    let mut l_tables = Vec::with_capacity(l_sheet_names.len());
    for c_sheet_name in l_sheet_names {
        let range = workbook
            .worksheet_range(&c_sheet_name)
            .map_err(|err| format!("Failed to read sheet {c_sheet_name:?}: {err}"))?;
        l_tables.push((c_sheet_name, derive_table_from_range(&range)?));
    }

    Ok(l_tables)
}

/// Read every sheet of an on-disk workbook, in native sheet order.
pub fn read_workbook_from_path(path: &Path) -> Result<Vec<(String, DataFrame)>, String> {
    let mut workbook =
        open_workbook_auto(path).map_err(|err| format!("Failed to open workbook: {err}"))?;
    collect_workbook_tables(&mut workbook)
}

/// Read every sheet of an in-memory workbook, in native sheet order.
pub fn read_workbook_from_bytes(bytes: &[u8]) -> Result<Vec<(String, DataFrame)>, String> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).map_err(|err| format!("Failed to open workbook: {err}"))?;
    collect_workbook_tables(&mut workbook)
}

/// Read every sheet of one workbook source.
pub fn read_source_tables(
    source: &EnumWorkbookSource,
) -> Result<Vec<(String, DataFrame)>, String> {
    match source {
        EnumWorkbookSource::Buffer { bytes, .. } => read_workbook_from_bytes(bytes),
        EnumWorkbookSource::File { path } => read_workbook_from_path(path),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::derive_text_from_any_value;
    use rust_xlsxwriter::Workbook;

    fn cell(df: &DataFrame, column: &str, row: usize) -> Option<String> {
        derive_text_from_any_value(df.column(column).unwrap().get(row).unwrap())
    }

    #[test]
    fn test_read_workbook_reads_every_cell_as_text() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Data").unwrap();
        sheet.write_string(0, 0, "NOMOR AJU").unwrap();
        sheet.write_string(0, 1, "JUMLAH").unwrap();
        sheet.write_string(0, 2, "AKTIF").unwrap();
        sheet.write_string(1, 0, "00123").unwrap();
        sheet.write_number(1, 1, 7.0).unwrap();
        sheet.write_boolean(1, 2, true).unwrap();
        sheet.write_number(2, 1, 2.5).unwrap();
        let v_bytes = workbook.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        assert_eq!(l_tables.len(), 1);

        let (c_sheet_name, df) = &l_tables[0];
        assert_eq!(c_sheet_name, "Data");
        assert_eq!(df.get_column_names_str(), vec!["NOMOR AJU", "JUMLAH", "AKTIF"]);
        assert_eq!(df.height(), 2);

        assert_eq!(cell(df, "NOMOR AJU", 0), Some("00123".to_string()));
        assert_eq!(cell(df, "JUMLAH", 0), Some("7".to_string()));
        assert_eq!(cell(df, "AKTIF", 0), Some("True".to_string()));

        // Cells absent in the source stay missing, never a sentinel text.
        assert_eq!(cell(df, "NOMOR AJU", 1), None);
        assert_eq!(cell(df, "JUMLAH", 1), Some("2.5".to_string()));
        assert_eq!(cell(df, "AKTIF", 1), None);
    }

    #[test]
    fn test_read_workbook_mangles_blank_and_duplicate_headers() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "KODE").unwrap();
        sheet.write_string(0, 2, "KODE").unwrap();
        sheet.write_string(1, 0, "a").unwrap();
        sheet.write_string(1, 1, "b").unwrap();
        sheet.write_string(1, 2, "c").unwrap();
        let v_bytes = workbook.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        let (_, df) = &l_tables[0];

        assert_eq!(df.get_column_names_str(), vec!["KODE", "Unnamed: 1", "KODE.1"]);
        assert_eq!(cell(df, "Unnamed: 1", 0), Some("b".to_string()));
    }

    #[test]
    fn test_read_workbook_keeps_native_sheet_order() {
        let mut workbook = Workbook::new();
        for c_name in ["Zeta", "Alpha", "Mid"] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(c_name).unwrap();
            sheet.write_string(0, 0, "COL").unwrap();
        }
        let v_bytes = workbook.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        let l_names: Vec<&str> = l_tables.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(l_names, vec!["Zeta", "Alpha", "Mid"]);
    }

    #[test]
    fn test_read_workbook_yields_empty_table_for_empty_sheet() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.set_name("Kosong").unwrap();
        let v_bytes = workbook.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        let (c_sheet_name, df) = &l_tables[0];
        assert_eq!(c_sheet_name, "Kosong");
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 0);
    }

    #[test]
    fn test_read_workbook_rejects_invalid_bytes() {
        let c_msg = read_workbook_from_bytes(b"not a workbook").unwrap_err();
        assert!(c_msg.contains("Failed to open workbook"));
    }
}
