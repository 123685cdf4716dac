//! Shared merge specification models.

use std::fmt;
use std::path::PathBuf;

use polars::prelude::DataFrame;

////////////////////////////////////////////////////////////////////////////////
// #region CellFormatSpecification

/// Cell format specification for the all-text write pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct SpecCellFormat {
    /// Font family name.
    pub font_name: Option<String>,
    /// Font size in points.
    pub font_size: Option<i64>,
    /// Bold style.
    pub bold: Option<bool>,

    /// Horizontal alignment.
    pub align: Option<String>,
    /// Vertical alignment.
    pub valign: Option<String>,
    /// Border style for all sides.
    pub border: Option<i64>,
    /// Text wrap.
    pub text_wrap: Option<bool>,

    /// Background fill color.
    pub bg_color: Option<String>,
    /// Font color.
    pub font_color: Option<String>,
}

impl SpecCellFormat {
    /// Return a new format by overlaying `patch` onto `self`.
    pub fn with_(&self, patch: SpecCellFormat) -> SpecCellFormat {
        self.merge(&patch)
    }

    /// Merge two formats with right-side non-`None` overwrite semantics.
    pub fn merge(&self, other: &SpecCellFormat) -> SpecCellFormat {
        SpecCellFormat {
            font_name: other.font_name.clone().or_else(|| self.font_name.clone()),
            font_size: other.font_size.or(self.font_size),
            bold: other.bold.or(self.bold),
            align: other.align.clone().or_else(|| self.align.clone()),
            valign: other.valign.clone().or_else(|| self.valign.clone()),
            border: other.border.or(self.border),
            text_wrap: other.text_wrap.or(self.text_wrap),
            bg_color: other.bg_color.clone().or_else(|| self.bg_color.clone()),
            font_color: other.font_color.clone().or_else(|| self.font_color.clone()),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NormalizationRules

/// Sheet-name predicate deciding whether a rule applies to a sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumSheetNamePredicate {
    /// Rule applies to every sheet.
    Any,
    /// Rule applies when the trimmed, case-folded sheet name equals the key.
    EqualsTrimmedFolded(String),
}

impl EnumSheetNamePredicate {
    /// Evaluate the predicate against a raw sheet name.
    pub fn matches(&self, sheet_name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::EqualsTrimmedFolded(key) => sheet_name.trim().to_lowercase() == *key,
        }
    }
}

/// Per-column value transform applied during ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumColumnTransform {
    /// Rewrite present values to plain text form; missing values stay missing.
    PlainText,
}

/// One `(sheet predicate, column name, transform)` normalization rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnNormalizationRule {
    /// Sheets the rule applies to.
    pub rule_sheet: EnumSheetNamePredicate,
    /// Exact column name selected by the rule.
    pub column_name: String,
    /// Transform applied to each cell of the selected column.
    pub transform: EnumColumnTransform,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region MergeOptions

/// Autofit rule for column width inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnumAutofitColumnsRule {
    /// Disable autofit.
    None,
    /// Infer width from header cells only (default).
    #[default]
    Header,
    /// Infer width from body cells only.
    Body,
    /// Infer width from both header and body cells.
    All,
}

/// Autofit policy for per-sheet write calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecAutofitCellsPolicy {
    /// Autofit width inference rule.
    pub rule_columns: EnumAutofitColumnsRule,
    /// Minimum final width.
    pub width_cell_min: usize,
    /// Maximum final width.
    pub width_cell_max: usize,
    /// Width padding added after inference.
    pub width_cell_padding: usize,
}

impl Default for SpecAutofitCellsPolicy {
    fn default() -> Self {
        Self {
            rule_columns: EnumAutofitColumnsRule::Header,
            width_cell_min: 8,
            width_cell_max: 60,
            width_cell_padding: 2,
        }
    }
}

/// Options controlling ingestion normalization and output formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecMergeOptions {
    /// Ordered identifier-column normalization rules.
    pub rules: Vec<SpecColumnNormalizationRule>,
    /// Columns removed from every sheet before concatenation.
    pub columns_artifact: Vec<String>,
    /// Column autofit policy for the output workbook.
    pub policy_autofit: SpecAutofitCellsPolicy,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region SourcesAndResults

/// One workbook source consumed exactly once by a combine call.
#[derive(Debug, Clone)]
pub enum EnumWorkbookSource {
    /// In-memory workbook bytes with a caller-supplied display name.
    Buffer {
        /// Display name used in error reporting (typically the upload name).
        name: String,
        /// Raw workbook bytes.
        bytes: Vec<u8>,
    },
    /// Workbook staged on disk.
    File {
        /// Path to the workbook file.
        path: PathBuf,
    },
}

impl EnumWorkbookSource {
    /// User-facing identifier for error reporting.
    pub fn identifier(&self) -> String {
        match self {
            Self::Buffer { name, .. } => name.clone(),
            Self::File { path } => path.display().to_string(),
        }
    }
}

/// One combined output table with its group bookkeeping.
#[derive(Debug, Clone)]
pub struct SpecCombinedTable {
    /// Group key: the shared input sheet name.
    pub sheet_name: String,
    /// Concatenated table for the group.
    pub table: DataFrame,
    /// Number of input tables concatenated into this group.
    pub num_tables: usize,
}

/// Per-output-sheet statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecCombinedSheet {
    /// Actual sheet name written to the workbook.
    pub sheet_name: String,
    /// Data row count (header excluded).
    pub height: usize,
    /// Column count.
    pub width: usize,
    /// Number of input tables concatenated into the sheet.
    pub num_tables: usize,
}

/// Per-combine call report.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SpecCombineReport {
    /// Sheets written to the combined workbook, in output order.
    pub sheets: Vec<SpecCombinedSheet>,
    /// Non-fatal warnings.
    pub warnings: Vec<String>,
}

impl SpecCombineReport {
    /// Add a warning message.
    pub fn warn(&mut self, msg: impl AsRef<str>) {
        self.warnings.push(msg.as_ref().to_string());
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// "Combine call failed" errors; every failure aborts the whole merge.
#[derive(Debug)]
pub enum CombineXlsxError {
    /// Zero sources supplied.
    NoInputFiles,
    /// A source could not be parsed as a valid workbook.
    UnreadableSource {
        /// Identifier of the offending source.
        source: String,
        /// Underlying cause text.
        message: String,
    },
    /// Every source parsed but contributed zero sheets.
    NothingToCombine,
    /// Serialization of the output workbook failed.
    WriteFailed {
        /// Underlying cause text.
        message: String,
    },
}

impl fmt::Display for CombineXlsxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoInputFiles => write!(f, "No Excel files were supplied."),
            Self::UnreadableSource { source, message } => {
                write!(f, "Failed to read file {source}: {message}")
            }
            Self::NothingToCombine => write!(f, "No sheet data could be combined."),
            Self::WriteFailed { message } => {
                write!(f, "Failed to write the combined workbook: {message}")
            }
        }
    }
}

impl std::error::Error for CombineXlsxError {}

// #endregion
////////////////////////////////////////////////////////////////////////////////
