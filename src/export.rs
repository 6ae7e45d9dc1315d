//! Dataset documentation workbook.
//!
//! Four introspection queries, one sheet each, written all-or-nothing: the workbook goes to
//! a temporary file beside the target and is only renamed into place once every sheet is
//! ready. Dropping an uncommitted [`AtomicOutput`] removes the partial file.

use crate::data::datatable::{DataTable, DataValue};
use crate::error::{PbiError, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use std::fs::File;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentationSheet {
    Columns,
    Tables,
    Measures,
    Relations,
}

impl DocumentationSheet {
    /// Sheet order in the workbook.
    pub const ALL: [DocumentationSheet; 4] = [
        DocumentationSheet::Columns,
        DocumentationSheet::Tables,
        DocumentationSheet::Measures,
        DocumentationSheet::Relations,
    ];

    pub fn sheet_name(&self) -> &'static str {
        match self {
            DocumentationSheet::Columns => "columns",
            DocumentationSheet::Tables => "tables",
            DocumentationSheet::Measures => "measures",
            DocumentationSheet::Relations => "relations",
        }
    }

    /// DAX query listing this part of the model's metadata.
    pub fn query(&self) -> &'static str {
        match self {
            DocumentationSheet::Columns => "EVALUATE INFO.COLUMNS()",
            DocumentationSheet::Tables => "EVALUATE INFO.TABLES()",
            DocumentationSheet::Measures => "EVALUATE INFO.MEASURES()",
            DocumentationSheet::Relations => "EVALUATE INFO.RELATIONSHIPS()",
        }
    }
}

pub fn documentation_file_name(dataset_id: &str) -> String {
    format!("Documentation_{}.xlsx", dataset_id)
}

/// Temporary file that becomes `target` on [`commit`](AtomicOutput::commit) and vanishes
/// otherwise.
pub struct AtomicOutput {
    temp: NamedTempFile,
    target: PathBuf,
}

impl AtomicOutput {
    /// Reserve `dir/file_name`. Fails right away if `dir` is missing or read-only.
    pub fn create(dir: &Path, file_name: &str) -> Result<Self> {
        let temp = tempfile::Builder::new()
            .prefix(&format!(".{}.", file_name))
            .suffix(".partial")
            .tempfile_in(dir)?;
        debug!(target: "export", "Staging {} at {}", file_name, temp.path().display());
        Ok(Self {
            temp,
            target: dir.join(file_name),
        })
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn file_mut(&mut self) -> &mut File {
        self.temp.as_file_mut()
    }

    pub fn commit(self) -> Result<PathBuf> {
        self.temp.as_file().sync_all()?;
        self.temp
            .persist(&self.target)
            .map_err(|e| PbiError::Io(e.error))?;
        Ok(self.target)
    }
}

/// Build a workbook with one sheet per table, in the given order.
pub fn build_workbook(tables: &[DataTable]) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for table in tables {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&table.name)?;
        write_table(sheet, table, &header_format)?;
    }

    Ok(workbook)
}

fn write_table(
    sheet: &mut Worksheet,
    table: &DataTable,
    header: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col_idx, column) in table.columns.iter().enumerate() {
        let col = col_num(col_idx)?;
        sheet.write_string_with_format(0, col, &column.name, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row = u32::try_from(row_idx + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
        for (col_idx, value) in row.values.iter().enumerate() {
            let col = col_num(col_idx)?;
            match value {
                DataValue::String(s) => {
                    let text = clip_to_cell(s);
                    if text.len() < s.len() {
                        warn!(
                            target: "export",
                            "Sheet {}: clipped cell {}:{} from {} to {} characters",
                            table.name,
                            excel_row,
                            col,
                            s.chars().count(),
                            MAX_CELL_CHARS
                        );
                    }
                    sheet.write_string(excel_row, col, text)?;
                }
                DataValue::Integer(i) => {
                    sheet.write_number(excel_row, col, *i as f64)?;
                }
                DataValue::Float(f) => {
                    sheet.write_number(excel_row, col, *f)?;
                }
                DataValue::Boolean(b) => {
                    sheet.write_boolean(excel_row, col, *b)?;
                }
                DataValue::Null => {}
            }
        }
    }

    Ok(())
}

/// Excel's per-cell character limit.
pub const MAX_CELL_CHARS: usize = 32_767;

/// Longest prefix of `s` that fits in one cell.
fn clip_to_cell(s: &str) -> &str {
    match s.char_indices().nth(MAX_CELL_CHARS) {
        Some((end, _)) => &s[..end],
        None => s,
    }
}

fn col_num(idx: usize) -> std::result::Result<u16, XlsxError> {
    u16::try_from(idx).map_err(|_| XlsxError::RowColumnLimitError)
}

/// Write `tables` into `output` and promote it to its final name.
pub fn write_documentation(mut output: AtomicOutput, tables: &[DataTable]) -> Result<PathBuf> {
    let mut workbook = build_workbook(tables)?;
    workbook.save_to_writer(output.file_mut())?;
    output.commit()
}
