use chrono::{DateTime, Local};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

use crate::dataset::Dataset;
use crate::error::Result;
use crate::filter::{DropdownOption, FilterOptions, FilterSelection, filter_dataset, filter_options};
use crate::graph::{DashboardFigures, build_dashboard};
use crate::loader;
use crate::schema::ColumnSchema;

/// Status line shown when an upload cannot be decoded
pub const UPLOAD_FAILED_MESSAGE: &str = "Falha ao processar o arquivo.";

pub fn upload_success_message(filename: &str) -> String {
    format!("Arquivo {} carregado com sucesso.", filename)
}

/// Result of an upload: fresh dropdown options plus a status line
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct UploadOutcome {
    pub project_options: Vec<DropdownOption>,
    pub department_options: Vec<DropdownOption>,
    pub manager_options: Vec<DropdownOption>,
    pub message: String,
}

impl UploadOutcome {
    fn loaded(options: FilterOptions, filename: &str) -> Self {
        Self {
            project_options: options.project,
            department_options: options.department,
            manager_options: options.manager,
            message: upload_success_message(filename),
        }
    }

    fn failed() -> Self {
        Self {
            message: UPLOAD_FAILED_MESSAGE.to_string(),
            ..Self::default()
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.message != UPLOAD_FAILED_MESSAGE
    }
}

/// A successfully decoded upload
#[derive(Clone, Debug)]
pub struct LoadedUpload {
    pub filename: String,
    pub dataset: Arc<Dataset>,
    pub loaded_at: DateTime<Local>,
}

#[derive(Clone, Debug, Default)]
enum UploadState {
    #[default]
    Empty,
    Failed {
        filename: String,
    },
    Loaded(LoadedUpload),
}

/// The dashboard's reactive state: whatever file was uploaded last
///
/// Every upload replaces the previous one, successful or not. Figures are
/// recomputed from the cached dataset on each filter change.
#[derive(Debug, Default)]
pub struct DashboardSession {
    schema: ColumnSchema,
    state: UploadState,
}

impl DashboardSession {
    pub fn new(schema: ColumnSchema) -> Self {
        Self {
            schema,
            state: UploadState::Empty,
        }
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    /// Handles a browser upload in `<content-type>,<base64>` form
    pub fn on_upload_data_url(&mut self, filename: &str, contents: &str) -> UploadOutcome {
        let decoded = loader::decode_upload(contents, filename);
        self.accept(filename, decoded)
    }

    /// Handles an upload whose raw bytes are already available
    pub fn on_upload(&mut self, filename: &str, bytes: &[u8]) -> UploadOutcome {
        let decoded = loader::decode_bytes(bytes, filename);
        self.accept(filename, decoded)
    }

    fn accept(&mut self, filename: &str, decoded: Result<Dataset>) -> UploadOutcome {
        let loaded = decoded.and_then(|dataset| {
            let options = filter_options(&dataset, &self.schema)?;
            Ok((dataset, options))
        });

        match loaded {
            Ok((dataset, options)) => {
                info!(
                    "Loaded {} ({} rows, {} columns)",
                    filename,
                    dataset.len(),
                    dataset.columns.len()
                );
                self.state = UploadState::Loaded(LoadedUpload {
                    filename: filename.to_string(),
                    dataset: Arc::new(dataset),
                    loaded_at: Local::now(),
                });
                UploadOutcome::loaded(options, filename)
            }
            Err(e) => {
                warn!("Failed to process upload {}: {}", filename, e);
                self.state = UploadState::Failed {
                    filename: filename.to_string(),
                };
                UploadOutcome::failed()
            }
        }
    }

    /// Recomputes the seven artifacts for a filter selection
    ///
    /// Returns `Ok(None)` when there is nothing to update: no file uploaded
    /// yet, or the last upload failed to decode.
    pub fn on_filters_changed(
        &self,
        selection: &FilterSelection,
    ) -> Result<Option<DashboardFigures>> {
        let Some(dataset) = self.current_dataset() else {
            return Ok(None);
        };
        refresh(&dataset, selection, &self.schema).map(Some)
    }

    pub fn current(&self) -> Option<&LoadedUpload> {
        match &self.state {
            UploadState::Loaded(upload) => Some(upload),
            _ => None,
        }
    }

    pub fn current_dataset(&self) -> Option<Arc<Dataset>> {
        self.current().map(|upload| Arc::clone(&upload.dataset))
    }

    /// Filename of the last upload that failed, if the last upload failed
    pub fn failed_upload(&self) -> Option<&str> {
        match &self.state {
            UploadState::Failed { filename } => Some(filename.as_str()),
            _ => None,
        }
    }
}

/// Filters a dataset and builds the dashboard for it
///
/// Free function so callers can release the session lock before the work.
pub fn refresh(
    dataset: &Dataset,
    selection: &FilterSelection,
    schema: &ColumnSchema,
) -> Result<DashboardFigures> {
    let filtered = filter_dataset(dataset, selection, schema)?;
    info!(
        "Refreshing dashboard: {} of {} rows match {:?}",
        filtered.len(),
        dataset.len(),
        selection
    );
    build_dashboard(&filtered, schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Selection;
    use crate::graph::ChartId;

    const PROJECTS: &str = "\
Nome do Projeto,Departamento,Gerente do Projeto,Status de Prazo,Status de Trabalho,Status de Custo
Alpha,TI,Ana,Atrasado,Em andamento,Dentro do orçamento
Beta,RH,Bruno,No prazo,Concluído,Dentro do orçamento
Gamma,TI,Ana,Atrasado,Em andamento,Acima do orçamento
Delta,Financeiro,Carla,No prazo,Não iniciado,Dentro do orçamento
";

    fn loaded_session() -> DashboardSession {
        let mut session = DashboardSession::default();
        let outcome = session.on_upload("projetos.csv", PROJECTS.as_bytes());
        assert!(outcome.is_loaded());
        session
    }

    #[test]
    fn upload_returns_options_and_success_message() {
        let mut session = DashboardSession::default();
        let outcome = session.on_upload("projetos.csv", PROJECTS.as_bytes());

        assert_eq!(outcome.message, "Arquivo projetos.csv carregado com sucesso.");
        assert_eq!(outcome.project_options.len(), 5);
        assert_eq!(outcome.project_options[0].value, "Todos");
        assert_eq!(
            outcome
                .department_options
                .iter()
                .map(|o| o.label.as_str())
                .collect::<Vec<_>>(),
            vec!["Todos", "TI", "RH", "Financeiro"]
        );
        assert_eq!(outcome.manager_options.len(), 4);
        assert_eq!(session.current().unwrap().filename, "projetos.csv");
    }

    #[test]
    fn nothing_to_update_before_upload() {
        let session = DashboardSession::default();
        assert!(session
            .on_filters_changed(&FilterSelection::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn failed_upload_clears_options_and_suppresses_updates() {
        let mut session = loaded_session();
        let outcome = session.on_upload("relatorio.pdf", b"%PDF-1.4");

        assert_eq!(outcome.message, UPLOAD_FAILED_MESSAGE);
        assert!(outcome.project_options.is_empty());
        assert!(outcome.department_options.is_empty());
        assert!(outcome.manager_options.is_empty());
        assert_eq!(session.failed_upload(), Some("relatorio.pdf"));
        assert!(session
            .on_filters_changed(&FilterSelection::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn upload_missing_filter_column_fails() {
        let mut session = DashboardSession::default();
        let outcome = session.on_upload("parcial.csv", b"Nome do Projeto,Departamento\nAlpha,TI\n");
        assert!(!outcome.is_loaded());
        assert!(session.current().is_none());
    }

    #[test]
    fn data_url_upload_is_decoded() {
        let mut session = DashboardSession::default();
        // "Nome do Projeto,Departamento,Gerente do Projeto\nAlpha,TI,Ana\n"
        let contents = "data:text/csv;base64,Tm9tZSBkbyBQcm9qZXRvLERlcGFydGFtZW50byxHZXJlbnRlIGRvIFByb2pldG8KQWxwaGEsVEksQW5hCg==";
        let outcome = session.on_upload_data_url("p.csv", contents);
        assert!(outcome.is_loaded(), "{}", outcome.message);
        assert_eq!(outcome.manager_options[1].value, "Ana");
    }

    #[test]
    fn filters_recompute_all_artifacts() {
        let session = loaded_session();

        let all = session
            .on_filters_changed(&FilterSelection::default())
            .unwrap()
            .unwrap();
        assert_eq!(all.get(ChartId::ScheduleBar).series().unwrap().1, [2, 2]);

        let ti = FilterSelection {
            department: Selection::Value("TI".to_string()),
            ..FilterSelection::default()
        };
        let figures = session.on_filters_changed(&ti).unwrap().unwrap();
        let (labels, counts) = figures.get(ChartId::SchedulePie).series().unwrap();
        assert_eq!(labels, ["Atrasado"]);
        assert_eq!(counts, [2]);
        let (labels, counts) = figures.get(ChartId::CostBar).series().unwrap();
        assert_eq!(labels, ["Dentro do orçamento", "Acima do orçamento"]);
        assert_eq!(counts, [1, 1]);
    }

    #[test]
    fn refresh_on_shared_dataset_matches_session_update() {
        let session = loaded_session();
        let selection = FilterSelection {
            manager: Selection::Value("Ana".to_string()),
            ..FilterSelection::default()
        };
        let dataset = session.current_dataset().unwrap();
        drop(session);

        let figures = refresh(&dataset, &selection, &ColumnSchema::default()).unwrap();
        let expected = loaded_session().on_filters_changed(&selection).unwrap().unwrap();
        assert_eq!(figures, expected);
        assert_eq!(figures.get(ChartId::WorkBar).series().unwrap().1, [2]);
    }

    #[test]
    fn stale_selection_yields_empty_charts() {
        let session = loaded_session();
        let selection = FilterSelection {
            project: Selection::Value("Projeto antigo".to_string()),
            ..FilterSelection::default()
        };
        let figures = session.on_filters_changed(&selection).unwrap().unwrap();
        assert!(figures.get(ChartId::WorkBar).series().unwrap().0.is_empty());
    }

    #[test]
    fn new_upload_replaces_dataset() {
        let mut session = loaded_session();
        let first = session.current_dataset().unwrap();
        session.on_upload("outro.csv", PROJECTS.lines().take(2).collect::<Vec<_>>().join("\n").as_bytes());
        let second = session.current_dataset().unwrap();

        assert_eq!(first.len(), 4);
        assert_eq!(second.len(), 1);
    }
}
