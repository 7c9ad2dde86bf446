use rust_xlsxwriter::{Format, Workbook};

use crate::dataset::{CellValue, Dataset};
use crate::error::{DashboardError, Result};

/// Export format of the filtered project table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xlsx,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Result<ExportFormat> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xlsx" => Ok(ExportFormat::Xlsx),
            other => Err(DashboardError::UnsupportedFormat(format!(
                "unknown export format: {}",
                other
            ))),
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
        }
    }
}

/// Serialises a dataset in the requested format
pub fn export(dataset: &Dataset, format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(dataset).map(String::into_bytes),
        ExportFormat::Xlsx => to_xlsx(dataset),
    }
}

/// Convert a dataset to CSV
///
/// The header row holds the column names; cells are written with their
/// display labels, so the output decodes back to the same table.
///
/// # Examples
/// ```
/// use pmo_dashboard::dataset::{CellValue, Dataset};
/// use pmo_dashboard::downloader::to_csv;
///
/// let ds = Dataset::new(
///     vec!["Nome do Projeto".to_string()],
///     vec![vec![CellValue::Text("Alpha, fase 1".to_string())]],
/// );
/// assert_eq!(to_csv(&ds).unwrap(), "Nome do Projeto\n\"Alpha, fase 1\"\n");
/// ```
pub fn to_csv(dataset: &Dataset) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&dataset.columns)?;
    for row in &dataset.rows {
        writer.write_record(row.iter().map(CellValue::label))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| DashboardError::Export(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| DashboardError::Export(e.to_string()))
}

/// Convert a dataset to XLSX with a bold header row
///
/// Numbers and booleans keep their type; dates and text are written as text.
pub fn to_xlsx(dataset: &Dataset) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (c, name) in dataset.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, c as u16, name, &bold)?;
    }

    for (r, row) in dataset.rows.iter().enumerate() {
        let r = (r + 1) as u32;
        for (c, cell) in row.iter().enumerate() {
            let c = c as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Int(i) => {
                    worksheet.write_number(r, c, *i as f64)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(r, c, *f)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean(r, c, *b)?;
                }
                CellValue::Text(_) | CellValue::DateTime(_) => {
                    worksheet.write_string(r, c, &cell.label())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
