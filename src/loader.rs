use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use calamine::{Data, DataType, Reader, open_workbook_auto_from_rs};
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;

use crate::dataset::{CellValue, Dataset};
use crate::error::{DashboardError, Result};

/// Decode strategy selected from an upload's filename
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    /// Delimited text with the given field separator
    Delimited(u8),
    /// Spreadsheet workbook (xlsx, xlsm, xlsb, xls, ods)
    Workbook,
}

impl FileKind {
    /// Picks the decoder for a filename by its (case-insensitive) suffix
    ///
    /// # Examples
    /// ```
    /// use pmo_dashboard::loader::FileKind;
    ///
    /// assert_eq!(FileKind::from_filename("projetos.CSV").unwrap(), FileKind::Delimited(b','));
    /// assert_eq!(FileKind::from_filename("projetos.xlsx").unwrap(), FileKind::Workbook);
    /// assert!(FileKind::from_filename("projetos.pdf").is_err());
    /// ```
    pub fn from_filename(filename: &str) -> Result<FileKind> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());

        match extension.as_deref() {
            Some("csv") => Ok(FileKind::Delimited(b',')),
            Some("tsv") | Some("tab") => Ok(FileKind::Delimited(b'\t')),
            Some("xlsx") | Some("xlsm") | Some("xlsb") | Some("xls") | Some("ods") => {
                Ok(FileKind::Workbook)
            }
            Some(ext) => Err(DashboardError::UnsupportedFormat(format!(
                "unsupported file extension: {}",
                ext
            ))),
            None => Err(DashboardError::UnsupportedFormat(format!(
                "file has no extension: {}",
                filename
            ))),
        }
    }
}

/// Extracts the raw bytes of a browser upload
///
/// Uploads arrive as `<content-type>,<base64 payload>`, e.g.
/// `data:text/csv;base64,Tm9tZS...`. Everything after the first comma is
/// base64-decoded.
pub fn parse_data_url(contents: &str) -> Result<Vec<u8>> {
    let (_content_type, payload) = contents.split_once(',').ok_or_else(|| {
        DashboardError::MalformedUpload("expected '<content-type>,<base64>'".to_string())
    })?;
    Ok(STANDARD.decode(payload.trim())?)
}

/// Decodes a browser upload (data URL plus filename) into a dataset
///
/// # Arguments
/// * `contents` - The upload payload in `<content-type>,<base64>` form
/// * `filename` - Original filename, used to select the decoder
///
/// # Examples
/// ```
/// use pmo_dashboard::loader::decode_upload;
///
/// // "Nome do Projeto\nAlpha\n"
/// let ds = decode_upload("data:text/csv;base64,Tm9tZSBkbyBQcm9qZXRvCkFscGhhCg==", "p.csv").unwrap();
/// assert_eq!(ds.columns, vec!["Nome do Projeto"]);
/// assert_eq!(ds.len(), 1);
/// ```
pub fn decode_upload(contents: &str, filename: &str) -> Result<Dataset> {
    let bytes = parse_data_url(contents)?;
    decode_bytes(&bytes, filename)
}

/// Decodes raw file bytes into a dataset, choosing the decoder by filename
pub fn decode_bytes(bytes: &[u8], filename: &str) -> Result<Dataset> {
    match FileKind::from_filename(filename)? {
        FileKind::Delimited(delimiter) => from_delimited(bytes, delimiter),
        FileKind::Workbook => from_workbook(bytes),
    }
}

/// Load a dataset from a file on disk
///
/// # Examples
/// ```no_run
/// use pmo_dashboard::loader::load_dataset;
///
/// match load_dataset("projetos.xlsx") {
///     Ok(ds) => println!("Loaded {} projects", ds.len()),
///     Err(e) => eprintln!("Error loading file: {}", e),
/// }
/// ```
pub fn load_dataset(filepath: impl AsRef<Path>) -> Result<Dataset> {
    let path = filepath.as_ref();
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    let bytes = std::fs::read(path)?;
    decode_bytes(&bytes, filename)
}

/// Decode UTF-8 delimited text whose first record is the header
pub fn from_delimited(bytes: &[u8], delimiter: u8) -> Result<Dataset> {
    let text = std::str::from_utf8(bytes)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() {
        return Err(DashboardError::EmptyFile("no header row".to_string()));
    }
    let columns = header_names(headers.iter().map(|h| h.trim().to_string()));

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(CellValue::infer).collect());
    }

    Ok(Dataset::new(columns, rows))
}

/// Decode the first worksheet of a workbook held in memory
pub fn from_workbook(bytes: &[u8]) -> Result<Dataset> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DashboardError::EmptyFile("no sheets found in workbook".to_string()))??;

    let mut sheet_rows = range.rows();
    let header = sheet_rows
        .next()
        .ok_or_else(|| DashboardError::EmptyFile("first sheet is empty".to_string()))?;

    let columns = header_names(header.iter().map(|cell| match cell {
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }));

    let rows = sheet_rows
        .map(|row| row.iter().map(workbook_cell).collect())
        .collect();

    Ok(Dataset::new(columns, rows))
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) if s.trim().is_empty() => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) if f.is_nan() => CellValue::Empty,
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => CellValue::Int(*f as i64),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => cell
            .as_datetime()
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(cell.to_string())),
        other => CellValue::Text(other.to_string()),
    }
}

/// Names blank headers `Unnamed: <index>` and suffixes repeats with `.1`, `.2`, ...
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (index, name) in raw.enumerate() {
        let base = if name.is_empty() {
            format!("Unnamed: {}", index)
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut suffix = 1;
        while names.contains(&candidate) {
            candidate = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        names.push(candidate);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;
    use chrono::NaiveDate;
    use rust_xlsxwriter::{Format, Workbook};

    const CSV: &str = "Nome do Projeto,Departamento,Gerente do Projeto,Status de Prazo\n\
                       Alpha,TI,Ana,No prazo\n\
                       Beta,RH,Bruno,Atrasado\n\
                       \"Gamma, fase 2\",TI,Ana,\n";

    fn data_url(bytes: &[u8]) -> String {
        format!("data:application/octet-stream;base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn file_kind_by_suffix() {
        assert_eq!(FileKind::from_filename("a.tsv").unwrap(), FileKind::Delimited(b'\t'));
        assert_eq!(FileKind::from_filename("dir.v2/a.XLS").unwrap(), FileKind::Workbook);
        assert_eq!(FileKind::from_filename("a.ods").unwrap(), FileKind::Workbook);
        assert!(matches!(
            FileKind::from_filename("README"),
            Err(DashboardError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn data_url_requires_comma() {
        assert!(matches!(
            parse_data_url("data:text/csv;base64"),
            Err(DashboardError::MalformedUpload(_))
        ));
        assert!(matches!(
            parse_data_url("data:text/csv;base64,@@@"),
            Err(DashboardError::Base64(_))
        ));
        assert_eq!(parse_data_url("data:text/plain;base64,aGk=").unwrap(), b"hi");
    }

    #[test]
    fn csv_upload_decodes_quoted_fields_and_blanks() {
        let ds = decode_upload(&data_url(CSV.as_bytes()), "projetos.csv").unwrap();
        assert_eq!(ds.columns.len(), 4);
        assert_eq!(ds.len(), 3);
        assert_eq!(ds.rows[2][0], CellValue::Text("Gamma, fase 2".to_string()));
        assert_eq!(ds.rows[2][3], CellValue::Empty);
    }

    #[test]
    fn csv_strips_bom_and_pads_ragged_rows() {
        let bytes = "\u{feff}a,b\n1\n2,x,extra\n".as_bytes();
        let ds = from_delimited(bytes, b',').unwrap();
        assert_eq!(ds.columns, vec!["a", "b"]);
        assert_eq!(ds.rows[0], vec![CellValue::Int(1), CellValue::Empty]);
        assert_eq!(ds.rows[1], vec![CellValue::Int(2), CellValue::Text("x".to_string())]);
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let ds = decode_bytes(b"a\tb\nx y\t3.5\n", "dados.tsv").unwrap();
        assert_eq!(ds.rows[0][0], CellValue::Text("x y".to_string()));
        assert_eq!(ds.rows[0][1], CellValue::Float(3.5));
    }

    #[test]
    fn empty_csv_is_rejected() {
        assert!(matches!(
            decode_bytes(b"", "vazio.csv"),
            Err(DashboardError::EmptyFile(_))
        ));
    }

    #[test]
    fn invalid_utf8_csv_is_rejected() {
        assert!(matches!(
            decode_bytes(&[0x4e, 0xff, 0xfe, b'\n'], "latin.csv"),
            Err(DashboardError::Utf8(_))
        ));
    }

    #[test]
    fn blank_and_repeated_headers_are_named() {
        let ds = from_delimited(b"a,,a,a\n1,2,3,4\n", b',').unwrap();
        assert_eq!(ds.columns, vec!["a", "Unnamed: 1", "a.1", "a.2"]);
    }

    #[test]
    fn xlsx_upload_decodes_first_sheet() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Nome do Projeto").unwrap();
        sheet.write_string(0, 1, "Horas").unwrap();
        sheet.write_string(0, 2, "Ativo").unwrap();
        sheet.write_string(1, 0, "Alpha").unwrap();
        sheet.write_number(1, 1, 40.0).unwrap();
        sheet.write_boolean(1, 2, true).unwrap();
        sheet.write_string(2, 0, "Beta").unwrap();
        sheet.write_number(2, 1, 12.5).unwrap();
        workbook.add_worksheet().write_string(0, 0, "ignored").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let ds = decode_upload(&data_url(&bytes), "Projetos.XLSX").unwrap();
        assert_eq!(ds.columns, vec!["Nome do Projeto", "Horas", "Ativo"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0][0], CellValue::Text("Alpha".to_string()));
        assert_eq!(ds.rows[0][1], CellValue::Int(40));
        assert_eq!(ds.rows[0][2], CellValue::Bool(true));
        assert_eq!(ds.rows[1][1], CellValue::Float(12.5));
        assert_eq!(ds.rows[1][2], CellValue::Empty);
    }

    #[test]
    fn workbook_dates_become_datetimes() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let date = Format::new().set_num_format("yyyy-mm-dd");
        let stamp = Format::new().set_num_format("yyyy-mm-dd hh:mm");
        sheet.write_string(0, 0, "Início").unwrap();
        // 45352 is 2024-03-01 in the 1900 date system
        sheet.write_number_with_format(1, 0, 45352.0, &date).unwrap();
        sheet.write_number_with_format(2, 0, 45352.5, &stamp).unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let ds = decode_bytes(&bytes, "datas.xlsx").unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            ds.rows[0][0],
            CellValue::DateTime(day.and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(
            ds.rows[1][0],
            CellValue::DateTime(day.and_hms_opt(12, 0, 0).unwrap())
        );
        assert_eq!(ds.rows[0][0].label(), "2024-03-01");
    }

    #[test]
    fn blank_workbook_header_is_unnamed() {
        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Nome do Projeto").unwrap();
        sheet.write_string(0, 2, "Status de Prazo").unwrap();
        sheet.write_string(1, 0, "Alpha").unwrap();
        sheet.write_string(1, 1, "sem título").unwrap();
        sheet.write_string(1, 2, "No prazo").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let ds = decode_bytes(&bytes, "projetos.xlsx").unwrap();
        assert_eq!(ds.columns, vec!["Nome do Projeto", "Unnamed: 1", "Status de Prazo"]);
        assert_eq!(ds.rows[0][1], CellValue::Text("sem título".to_string()));
    }

    #[test]
    fn empty_first_sheet_is_rejected() {
        let mut workbook = Workbook::new();
        workbook.add_worksheet();
        workbook
            .add_worksheet()
            .write_string(0, 0, "Nome do Projeto")
            .unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        assert!(matches!(
            decode_bytes(&bytes, "projetos.xlsx"),
            Err(DashboardError::EmptyFile(_))
        ));
    }

    #[test]
    fn workbook_cell_mapping() {
        assert_eq!(
            workbook_cell(&Data::Error(CellErrorType::Div0)),
            CellValue::Text("#DIV/0!".to_string())
        );
        assert_eq!(workbook_cell(&Data::String("  ".to_string())), CellValue::Empty);
        assert_eq!(workbook_cell(&Data::Float(f64::NAN)), CellValue::Empty);
        assert_eq!(workbook_cell(&Data::Float(7.0)), CellValue::Int(7));
        assert_eq!(
            workbook_cell(&Data::DateTimeIso("2024-03-01T08:30:00".to_string())),
            CellValue::DateTime(
                NaiveDate::from_ymd_opt(2024, 3, 1)
                    .unwrap()
                    .and_hms_opt(8, 30, 0)
                    .unwrap()
            )
        );
    }

    #[test]
    fn garbage_workbook_is_a_workbook_error() {
        assert!(matches!(
            decode_bytes(b"definitely not a zip", "projetos.xlsx"),
            Err(DashboardError::Workbook(_))
        ));
    }

    #[test]
    fn load_dataset_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projetos.csv");
        std::fs::write(&path, CSV).unwrap();
        let ds = load_dataset(&path).unwrap();
        assert_eq!(ds.len(), 3);
    }
}
