use thiserror::Error;

/// Errors produced while decoding, filtering, charting or exporting project data
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The upload payload is not of the form `<content-type>,<base64>`
    #[error("malformed upload payload: {0}")]
    MalformedUpload(String),

    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("file contains no data: {0}")]
    EmptyFile(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("workbook error: {0}")]
    Workbook(String),

    /// A column the dashboard reads is absent from the uploaded data
    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("unknown chart: {0}")]
    UnknownChart(String),

    #[error("chart {0} cannot be rendered as an image")]
    NotRenderable(String),

    #[error("render error: {0}")]
    Render(String),

    #[error("export error: {0}")]
    Export(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DashboardError {
    /// Whether the error was caused by the caller's input rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(
            self,
            DashboardError::Render(_) | DashboardError::Export(_) | DashboardError::Io(_)
        )
    }
}

impl From<calamine::Error> for DashboardError {
    fn from(err: calamine::Error) -> Self {
        DashboardError::Workbook(err.to_string())
    }
}

impl From<rust_xlsxwriter::XlsxError> for DashboardError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        DashboardError::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
