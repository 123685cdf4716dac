//! Stateless helper utilities used by the merge kernel.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::{AnyValue, Column, DataFrame, DataType, NamedFrom, Series};

use crate::conf::{
    N_LEN_EXCEL_SHEET_NAME_MAX, N_NCOLS_EXCEL_MAX, N_NROWS_EXCEL_MAX, TUP_EXCEL_ILLEGAL,
};
use crate::spec::{EnumColumnTransform, SpecColumnNormalizationRule};

////////////////////////////////////////////////////////////////////////////////
// #region CellTextConversion

/// Render one cell value as plain text; `Null` stays missing.
pub fn derive_text_from_any_value(value: AnyValue<'_>) -> Option<String> {
    match value {
        AnyValue::Null => None,
        AnyValue::String(val) => Some(val.to_string()),
        AnyValue::StringOwned(val) => Some(val.to_string()),
        AnyValue::Boolean(val) => Some(if val { "True" } else { "False" }.to_string()),
        AnyValue::UInt8(val) => Some(val.to_string()),
        AnyValue::UInt16(val) => Some(val.to_string()),
        AnyValue::UInt32(val) => Some(val.to_string()),
        AnyValue::UInt64(val) => Some(val.to_string()),
        AnyValue::Int8(val) => Some(val.to_string()),
        AnyValue::Int16(val) => Some(val.to_string()),
        AnyValue::Int32(val) => Some(val.to_string()),
        AnyValue::Int64(val) => Some(val.to_string()),
        AnyValue::Int128(val) => Some(val.to_string()),
        AnyValue::Float32(val) => Some((val as f64).to_string()),
        AnyValue::Float64(val) => Some(val.to_string()),
        _ => Some(value.to_string()),
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ColumnLabels

/// Validate that `columns` has no duplicated names.
pub fn validate_unique_columns(columns: &[String]) -> Result<(), String> {
    if columns.len() == columns.iter().collect::<BTreeSet<_>>().len() {
        return Ok(());
    }

    let mut dict_pos: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
    for (n_idx, c_name) in columns.iter().enumerate() {
        dict_pos.entry(c_name).or_default().push(n_idx);
    }

    let c_msg = dict_pos
        .iter()
        .filter_map(|(c_name, l_pos)| {
            if l_pos.len() > 1 {
                Some(format!(
                    "{c_name:?} x{} at indices {:?}",
                    l_pos.len(),
                    l_pos
                ))
            } else {
                None
            }
        })
        .collect::<Vec<_>>()
        .join("; ");

    Err(format!("Duplicate column names detected: {c_msg}"))
}

/// Resolve raw header cells to unique column labels.
///
/// Blank header cells become `Unnamed: {idx}`; repeated labels get `.1`,
/// `.2`, ... suffixes in column order.
pub fn derive_unique_column_labels(labels_raw: &[Option<String>]) -> Vec<String> {
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut l_labels = Vec::with_capacity(labels_raw.len());

    for (n_idx, label_raw) in labels_raw.iter().enumerate() {
        let c_base = match label_raw {
            Some(text) if !text.trim().is_empty() => text.clone(),
            _ => format!("Unnamed: {n_idx}"),
        };

        let c_label = if set_seen.contains(&c_base) {
            let mut n_suffix = 1usize;
            loop {
                let c_candidate = format!("{c_base}.{n_suffix}");
                if !set_seen.contains(&c_candidate) {
                    break c_candidate;
                }
                n_suffix += 1;
            }
        } else {
            c_base
        };

        set_seen.insert(c_label.clone());
        l_labels.push(c_label);
    }

    l_labels
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableNormalization

/// Apply the identifier-column rule table to one ingested sheet table.
pub fn apply_normalization_rules(
    mut df: DataFrame,
    sheet_name: &str,
    rules: &[SpecColumnNormalizationRule],
) -> Result<DataFrame, String> {
    for rule in rules {
        if !rule.rule_sheet.matches(sheet_name) {
            continue;
        }

        let if_has_column = df
            .get_column_names_str()
            .iter()
            .any(|c_name| *c_name == rule.column_name);
        if !if_has_column {
            continue;
        }

        let l_values = {
            let col = df
                .column(&rule.column_name)
                .map_err(|err| format!("Failed to access column {:?}: {err}", rule.column_name))?;
            let mut l_values = Vec::with_capacity(col.len());
            for n_idx_row in 0..col.len() {
                let value = col
                    .get(n_idx_row)
                    .map_err(|err| format!("Failed to read cell value: {err}"))?;
                l_values.push(match rule.transform {
                    EnumColumnTransform::PlainText => derive_text_from_any_value(value),
                });
            }
            l_values
        };

        df.replace(
            &rule.column_name,
            Series::new(rule.column_name.as_str().into(), l_values),
        )
        .map_err(|err| format!("Failed to rewrite column {:?}: {err}", rule.column_name))?;
    }

    Ok(df)
}

/// Remove artifact columns from one ingested sheet table when present.
pub fn drop_artifact_columns(
    mut df: DataFrame,
    columns_artifact: &[String],
) -> Result<DataFrame, String> {
    for c_name in columns_artifact {
        let if_has_column = df
            .get_column_names_str()
            .iter()
            .any(|c_existing| *c_existing == *c_name);
        if !if_has_column {
            continue;
        }

        df = df
            .drop(c_name)
            .map_err(|err| format!("Failed to drop column {c_name:?}: {err}"))?;
    }

    Ok(df)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region TableConcatenation

/// Union of all member column labels, in first-seen order.
pub fn derive_union_column_labels(l_tables: &[DataFrame]) -> Vec<String> {
    let mut set_seen: BTreeSet<String> = BTreeSet::new();
    let mut l_columns_union = Vec::new();

    for df in l_tables {
        for c_name in df.get_column_names_str() {
            if set_seen.insert(c_name.to_string()) {
                l_columns_union.push(c_name.to_string());
            }
        }
    }

    l_columns_union
}

/// Reindex one table to the given column order, null-filling absent columns.
pub fn align_table_to_columns(df: &DataFrame, columns: &[String]) -> Result<DataFrame, String> {
    let n_height = df.height();

    let mut l_cols = Vec::with_capacity(columns.len());
    for c_name in columns {
        match df.column(c_name) {
            Ok(col) => l_cols.push(col.clone()),
            Err(_) => l_cols.push(Column::full_null(
                c_name.as_str().into(),
                n_height,
                &DataType::String,
            )),
        }
    }

    DataFrame::new(l_cols).map_err(|err| format!("Failed to align table columns: {err}"))
}

/// Concatenate member tables in order over the union of their columns.
///
/// Rows keep concatenation order; no sorting, dedup or filtering is applied.
pub fn concat_tables_rowwise(l_tables: &[DataFrame]) -> Result<DataFrame, String> {
    let l_columns_union = derive_union_column_labels(l_tables);

    let mut df_combined: Option<DataFrame> = None;
    for df in l_tables {
        let df_aligned = align_table_to_columns(df, &l_columns_union)?;
        df_combined = Some(match df_combined {
            None => df_aligned,
            Some(df_acc) => df_acc
                .vstack(&df_aligned)
                .map_err(|err| format!("Failed to concatenate sheet tables: {err}"))?,
        });
    }

    Ok(df_combined.unwrap_or_else(DataFrame::empty))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SheetNormalization

/// Replace invalid chars and trim to valid Excel sheet name.
pub fn sanitize_sheet_name(name: &str, replace_to: &str) -> String {
    let mut c_name = name.to_string();
    for c_illegal in TUP_EXCEL_ILLEGAL {
        c_name = c_name.replace(c_illegal, replace_to);
    }
    c_name = c_name.trim().to_string();
    if c_name.is_empty() {
        c_name = "Sheet".to_string();
    }

    c_name.chars().take(N_LEN_EXCEL_SHEET_NAME_MAX).collect()
}

/// Validate one output sheet (header included) against Excel hard limits.
pub fn validate_sheet_dimensions(
    n_rows_total: usize,
    n_cols_total: usize,
) -> Result<(), String> {
    if n_rows_total > N_NROWS_EXCEL_MAX {
        return Err(format!(
            "Sheet overflows the Excel row limit: {n_rows_total} > {N_NROWS_EXCEL_MAX}."
        ));
    }
    if n_cols_total > N_NCOLS_EXCEL_MAX {
        return Err(format!(
            "Sheet overflows the Excel column limit: {n_cols_total} > {N_NCOLS_EXCEL_MAX}."
        ));
    }
    Ok(())
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
