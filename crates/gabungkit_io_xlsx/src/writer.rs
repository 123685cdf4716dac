//! XLSX writer kernel that serializes combined tables into workbook output.

use std::collections::BTreeSet;
use std::path::Path;

use polars::prelude::DataFrame;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, XlsxError};

use crate::conf::N_LEN_EXCEL_SHEET_NAME_MAX;
use crate::spec::{
    EnumAutofitColumnsRule, SpecAutofitCellsPolicy, SpecCellFormat, SpecCombineReport,
    SpecCombinedSheet,
};
use crate::util::{
    derive_text_from_any_value, sanitize_sheet_name, validate_sheet_dimensions,
    validate_unique_columns,
};

/// Stateful workbook writer.
pub struct XlsxWriter {
    workbook: Workbook,
    fmt_text: SpecCellFormat,
    fmt_header: SpecCellFormat,
    policy_autofit: SpecAutofitCellsPolicy,
    set_sheet_names_existing: BTreeSet<String>,
    if_finished: bool,
}

impl XlsxWriter {
    /// Create a writer with format presets and autofit policy.
    ///
    /// The workbook is buffered in memory until one of the save calls.
    pub fn new(
        fmt_text: SpecCellFormat,
        fmt_header: SpecCellFormat,
        policy_autofit: SpecAutofitCellsPolicy,
    ) -> Self {
        Self {
            workbook: Workbook::new(),
            fmt_text,
            fmt_header,
            policy_autofit,
            set_sheet_names_existing: BTreeSet::new(),
            if_finished: false,
        }
    }

    /// Write one all-text sheet: header row, then data rows.
    ///
    /// Text values are written as text, missing values as blank cells. The
    /// sheet name is sanitized and disambiguated; renames are reported as
    /// warnings, and per-sheet statistics are appended to `report`.
    pub fn write_sheet(
        &mut self,
        df_data: &DataFrame,
        sheet_name: &str,
        num_tables: usize,
        report: &mut SpecCombineReport,
    ) -> Result<(), String> {
        if self.if_finished {
            return Err("Cannot write after save.".to_string());
        }

        let l_colnames_df: Vec<String> = df_data
            .get_column_names_str()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        validate_unique_columns(&l_colnames_df)?;

        let n_width_df = l_colnames_df.len();
        let n_height_df = df_data.height();
        let n_rows_header = usize::from(n_width_df > 0);
        validate_sheet_dimensions(n_height_df + n_rows_header, n_width_df)?;

        let c_sheet_name_sanitized = sanitize_sheet_name(sheet_name, "_");
        if c_sheet_name_sanitized != sheet_name {
            report.warn(format!(
                "Sheet name {sheet_name:?} adjusted to {c_sheet_name_sanitized:?}."
            ));
        }
        let c_sheet_name_unique = self.derive_unique_sheet_name(&c_sheet_name_sanitized);
        if c_sheet_name_unique != c_sheet_name_sanitized {
            report.warn(format!(
                "Sheet name {c_sheet_name_sanitized:?} already used; renamed to {c_sheet_name_unique:?}."
            ));
        }

        let fmt_text = derive_rust_xlsx_format(&self.fmt_text);
        let fmt_header = derive_rust_xlsx_format(&self.fmt_header);

        let if_autofit_columns = n_width_df > 0
            && !matches!(
                self.policy_autofit.rule_columns,
                EnumAutofitColumnsRule::None
            );
        let mut l_width_by_col_header = vec![0usize; n_width_df];
        let mut l_width_by_col_body = vec![0usize; n_width_df];

        let worksheet = self.workbook.add_worksheet();
        worksheet
            .set_name(&c_sheet_name_unique)
            .map_err(derive_xlsx_error_text)?;

        for (n_idx_col, c_colname) in l_colnames_df.iter().enumerate() {
            if if_autofit_columns {
                l_width_by_col_header[n_idx_col] = estimate_unicode_string_width(c_colname);
            }
            worksheet
                .write_string_with_format(0, cast_col_num(n_idx_col)?, c_colname, &fmt_header)
                .map_err(derive_xlsx_error_text)?;
        }

        let l_cols = df_data.get_columns();
        for n_idx_row in 0..n_height_df {
            for (n_idx_col, col) in l_cols.iter().enumerate() {
                let value = col
                    .get(n_idx_row)
                    .map_err(|err| format!("Failed to access cell value: {err}"))?;
                let value_text = derive_text_from_any_value(value);

                if if_autofit_columns && let Some(text) = &value_text {
                    l_width_by_col_body[n_idx_col] = usize::max(
                        l_width_by_col_body[n_idx_col],
                        estimate_unicode_string_width(text),
                    );
                }

                match value_text {
                    Some(text) => {
                        worksheet
                            .write_string_with_format(
                                cast_row_num(n_rows_header + n_idx_row)?,
                                cast_col_num(n_idx_col)?,
                                &text,
                                &fmt_text,
                            )
                            .map_err(derive_xlsx_error_text)?;
                    }
                    None => {
                        worksheet
                            .write_blank(
                                cast_row_num(n_rows_header + n_idx_row)?,
                                cast_col_num(n_idx_col)?,
                                &fmt_text,
                            )
                            .map_err(derive_xlsx_error_text)?;
                    }
                }
            }
        }

        if n_rows_header > 0 {
            worksheet
                .set_freeze_panes(cast_row_num(n_rows_header)?, 0)
                .map_err(derive_xlsx_error_text)?;
        }

        if if_autofit_columns {
            let n_min = usize::max(1, self.policy_autofit.width_cell_min);
            let n_max = usize::min(
                255,
                usize::max(n_min, self.policy_autofit.width_cell_max),
            );
            let n_pad = self.policy_autofit.width_cell_padding;

            for n_idx_col in 0..n_width_df {
                let n_width_recorded = match self.policy_autofit.rule_columns {
                    EnumAutofitColumnsRule::Header | EnumAutofitColumnsRule::None => {
                        l_width_by_col_header[n_idx_col]
                    }
                    EnumAutofitColumnsRule::Body => l_width_by_col_body[n_idx_col],
                    EnumAutofitColumnsRule::All => usize::max(
                        l_width_by_col_header[n_idx_col],
                        l_width_by_col_body[n_idx_col],
                    ),
                };
                let n_width_final = usize::min(n_max, usize::max(n_min, n_width_recorded + n_pad));
                worksheet
                    .set_column_width(cast_col_num(n_idx_col)?, n_width_final as f64)
                    .map_err(derive_xlsx_error_text)?;
            }
        }

        report.sheets.push(SpecCombinedSheet {
            sheet_name: c_sheet_name_unique,
            height: n_height_df,
            width: n_width_df,
            num_tables,
        });

        Ok(())
    }

    /// Finish the workbook and return its serialized bytes.
    pub fn save_to_buffer(&mut self) -> Result<Vec<u8>, String> {
        self.if_finished = true;
        self.workbook
            .save_to_buffer()
            .map_err(derive_xlsx_error_text)
    }

    /// Finish the workbook and write it to disk.
    pub fn save_to_file(&mut self, path: &Path) -> Result<(), String> {
        self.if_finished = true;
        self.workbook.save(path).map_err(derive_xlsx_error_text)
    }

    fn derive_unique_sheet_name(&mut self, name: &str) -> String {
        if !self.set_sheet_names_existing.contains(name) {
            self.set_sheet_names_existing.insert(name.to_string());
            return name.to_string();
        }

        let base_name: String = name
            .chars()
            .take(usize::max(1, N_LEN_EXCEL_SHEET_NAME_MAX - 3))
            .collect();

        let mut n_idx = 2usize;
        loop {
            let candidate: String = format!("{base_name}__{n_idx}")
                .chars()
                .take(N_LEN_EXCEL_SHEET_NAME_MAX)
                .collect();
            if !self.set_sheet_names_existing.contains(&candidate) {
                self.set_sheet_names_existing.insert(candidate.clone());
                return candidate;
            }
            n_idx += 1;
        }
    }
}

fn estimate_unicode_string_width(s: &str) -> usize {
    let n_ascii = s.chars().filter(|chr| chr.is_ascii()).count();
    let n_non_ascii = s.chars().count().saturating_sub(n_ascii);
    n_ascii + (n_non_ascii as f64 * 1.6).round() as usize
}

fn derive_rust_xlsx_format(spec: &SpecCellFormat) -> Format {
    let mut format = Format::new();

    if let Some(val) = &spec.font_name {
        format = format.set_font_name(val.clone());
    }
    if let Some(val) = spec.font_size {
        format = format.set_font_size(val as f64);
    }
    if spec.bold.unwrap_or(false) {
        format = format.set_bold();
    }

    if let Some(val) = &spec.align
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }
    if let Some(val) = &spec.valign
        && let Some(align) = derive_format_align(val)
    {
        format = format.set_align(align);
    }

    if let Some(val) = &spec.bg_color {
        format = format.set_background_color(val.as_str());
    }
    if let Some(val) = &spec.font_color {
        format = format.set_font_color(val.as_str());
    }

    if let Some(val) = spec.border {
        format = format.set_border(derive_format_border(val));
    }

    if spec.text_wrap.unwrap_or(false) {
        format = format.set_text_wrap();
    }

    format
}

fn derive_format_border(border: i64) -> FormatBorder {
    match border {
        0 => FormatBorder::None,
        1 => FormatBorder::Thin,
        2 => FormatBorder::Medium,
        3 => FormatBorder::Dashed,
        4 => FormatBorder::Dotted,
        5 => FormatBorder::Thick,
        6 => FormatBorder::Double,
        7 => FormatBorder::Hair,
        _ => FormatBorder::None,
    }
}

fn derive_format_align(align: &str) -> Option<FormatAlign> {
    let value = align.trim().to_ascii_lowercase();
    match value.as_str() {
        "general" => Some(FormatAlign::General),
        "left" => Some(FormatAlign::Left),
        "center" => Some(FormatAlign::Center),
        "right" => Some(FormatAlign::Right),
        "justify" => Some(FormatAlign::Justify),
        "top" => Some(FormatAlign::Top),
        "bottom" => Some(FormatAlign::Bottom),
        "vcenter" | "vertical_center" => Some(FormatAlign::VerticalCenter),
        _ => None,
    }
}

fn cast_row_num(value: usize) -> Result<u32, String> {
    u32::try_from(value).map_err(|_| format!("row index overflow: {value}"))
}

fn cast_col_num(value: usize) -> Result<u16, String> {
    u16::try_from(value).map_err(|_| format!("column index overflow: {value}"))
}

fn derive_xlsx_error_text(err: XlsxError) -> String {
    format!("xlsx write error: {err}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conf::derive_default_xlsx_formats;
    use crate::reader::read_workbook_from_bytes;
    use crate::util::derive_text_from_any_value;
    use polars::prelude::Column;

    fn create_writer() -> XlsxWriter {
        let dict_fmts = derive_default_xlsx_formats();
        XlsxWriter::new(
            dict_fmts["text"].clone(),
            dict_fmts["header"].clone(),
            SpecAutofitCellsPolicy::default(),
        )
    }

    fn text_column(name: &str, values: &[Option<&str>]) -> Column {
        let l_values: Vec<Option<String>> = values
            .iter()
            .map(|val| val.map(ToString::to_string))
            .collect();
        Column::new(name.into(), l_values)
    }

    #[test]
    fn test_write_sheet_round_trips_text_and_missing_cells() {
        let df = DataFrame::new(vec![
            text_column("NOMOR AJU", &[Some("00123"), None]),
            text_column("NAMA", &[Some("Ann"), Some("Bob")]),
        ])
        .unwrap();

        let mut writer = create_writer();
        let mut report = SpecCombineReport::default();
        writer.write_sheet(&df, "Dokumen", 1, &mut report).unwrap();
        let v_bytes = writer.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        let (c_sheet_name, df_read) = &l_tables[0];
        assert_eq!(c_sheet_name, "Dokumen");
        assert_eq!(df_read.get_column_names_str(), vec!["NOMOR AJU", "NAMA"]);

        let cell = |column: &str, row: usize| {
            derive_text_from_any_value(df_read.column(column).unwrap().get(row).unwrap())
        };
        assert_eq!(cell("NOMOR AJU", 0), Some("00123".to_string()));
        assert_eq!(cell("NOMOR AJU", 1), None);
        assert_eq!(cell("NAMA", 1), Some("Bob".to_string()));
    }

    #[test]
    fn test_write_sheet_sanitizes_and_disambiguates_sheet_names() {
        let df = DataFrame::new(vec![text_column("COL", &[Some("x")])]).unwrap();

        let mut writer = create_writer();
        let mut report = SpecCombineReport::default();
        writer.write_sheet(&df, "Data: 2024", 1, &mut report).unwrap();
        writer.write_sheet(&df, "Data_ 2024", 1, &mut report).unwrap();
        let v_bytes = writer.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        let l_names: Vec<&str> = l_tables.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(l_names, vec!["Data_ 2024", "Data_ 2024__2"]);

        assert_eq!(report.sheets.len(), 2);
        assert_eq!(report.sheets[1].sheet_name, "Data_ 2024__2");
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_write_sheet_records_statistics() {
        let df = DataFrame::new(vec![
            text_column("A", &[Some("1"), Some("2"), None]),
            text_column("B", &[None, None, None]),
        ])
        .unwrap();

        let mut writer = create_writer();
        let mut report = SpecCombineReport::default();
        writer.write_sheet(&df, "Stat", 3, &mut report).unwrap();

        assert_eq!(
            report.sheets,
            vec![SpecCombinedSheet {
                sheet_name: "Stat".to_string(),
                height: 3,
                width: 2,
                num_tables: 3,
            }]
        );
    }

    #[test]
    fn test_write_sheet_accepts_empty_table() {
        let mut writer = create_writer();
        let mut report = SpecCombineReport::default();
        writer
            .write_sheet(&DataFrame::empty(), "Kosong", 1, &mut report)
            .unwrap();
        let v_bytes = writer.save_to_buffer().unwrap();

        let l_tables = read_workbook_from_bytes(&v_bytes).unwrap();
        let (c_sheet_name, df_read) = &l_tables[0];
        assert_eq!(c_sheet_name, "Kosong");
        assert_eq!(df_read.width(), 0);
    }

    #[test]
    fn test_write_sheet_after_save_is_rejected() {
        let df = DataFrame::new(vec![text_column("COL", &[Some("x")])]).unwrap();

        let mut writer = create_writer();
        let mut report = SpecCombineReport::default();
        writer.write_sheet(&df, "Data", 1, &mut report).unwrap();
        writer.save_to_buffer().unwrap();

        let c_msg = writer
            .write_sheet(&df, "Late", 1, &mut report)
            .unwrap_err();
        assert!(c_msg.contains("after save"));
    }
}
