//! XLSX constants and default preset factories.

use std::collections::BTreeMap;

use crate::spec::{
    EnumColumnTransform, EnumSheetNamePredicate, SpecCellFormat, SpecColumnNormalizationRule,
    SpecMergeOptions,
};

/// Excel worksheet maximum row count.
pub const N_NROWS_EXCEL_MAX: usize = 1_048_576;
/// Excel worksheet maximum column count.
pub const N_NCOLS_EXCEL_MAX: usize = 16_384;
/// Excel sheet name maximum length.
pub const N_LEN_EXCEL_SHEET_NAME_MAX: usize = 31;
/// Characters not allowed in sheet names.
pub const TUP_EXCEL_ILLEGAL: [&str; 7] = ["*", ":", "?", "/", "\\", "[", "]"];

/// Customs declaration number column, text-preserved in every sheet.
pub const C_COLUMN_NOMOR_AJU: &str = "NOMOR AJU";
/// Identity number column, text-preserved in the entity sheet only.
pub const C_COLUMN_NOMOR_IDENTITAS: &str = "NOMOR IDENTITAS";
/// Entity sheet name key (matched after trimming and case-folding).
pub const C_SHEET_ENTITAS: &str = "entitas";
/// Artifact column injected by upstream export tools, always dropped.
pub const C_COLUMN_SOURCE_NAME: &str = "Source.Name";
/// Default file name offered to callers for the combined workbook.
pub const C_FILENAME_COMBINED_DEFAULT: &str = "Combined_Data.xlsx";

/// Build the ordered identifier-column normalization rule table.
///
/// Rules are applied to every ingested sheet in list order; new identifier
/// columns are added here, never in the merge loop.
pub fn derive_default_normalization_rules() -> Vec<SpecColumnNormalizationRule> {
    vec![
        SpecColumnNormalizationRule {
            rule_sheet: EnumSheetNamePredicate::Any,
            column_name: C_COLUMN_NOMOR_AJU.to_string(),
            transform: EnumColumnTransform::PlainText,
        },
        SpecColumnNormalizationRule {
            rule_sheet: EnumSheetNamePredicate::EqualsTrimmedFolded(C_SHEET_ENTITAS.to_string()),
            column_name: C_COLUMN_NOMOR_IDENTITAS.to_string(),
            transform: EnumColumnTransform::PlainText,
        },
    ]
}

/// Build the list of artifact columns removed before concatenation.
pub fn derive_default_artifact_columns() -> Vec<String> {
    vec![C_COLUMN_SOURCE_NAME.to_string()]
}

/// Build default named format presets used by [`crate::writer::XlsxWriter`].
pub fn derive_default_xlsx_formats() -> BTreeMap<String, SpecCellFormat> {
    let cfg_base_fmt_spec = SpecCellFormat {
        font_name: Some("Times New Roman".to_string()),
        font_size: Some(11),
        border: Some(1),
        align: Some("left".to_string()),
        valign: Some("vcenter".to_string()),
        ..Default::default()
    };

    let mut dict_fmt = BTreeMap::new();
    dict_fmt.insert("text".to_string(), cfg_base_fmt_spec.clone());
    dict_fmt.insert(
        "header".to_string(),
        cfg_base_fmt_spec.with_(SpecCellFormat {
            bold: Some(true),
            align: Some("center".to_string()),
            ..Default::default()
        }),
    );

    dict_fmt
}

/// Build default merge options (rule table, artifact columns, autofit).
pub fn derive_default_merge_options() -> SpecMergeOptions {
    SpecMergeOptions {
        rules: derive_default_normalization_rules(),
        columns_artifact: derive_default_artifact_columns(),
        policy_autofit: Default::default(),
    }
}
