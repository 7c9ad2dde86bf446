use serde::{Deserialize, Serialize};

/// Names of the columns the dashboard reads from an uploaded file
///
/// The defaults are the headers of the project-management record format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnSchema {
    pub project: String,
    pub department: String,
    pub manager: String,
    pub schedule_status: String,
    pub work_status: String,
    pub cost_status: String,
}

impl Default for ColumnSchema {
    fn default() -> Self {
        Self {
            project: "Nome do Projeto".to_string(),
            department: "Departamento".to_string(),
            manager: "Gerente do Projeto".to_string(),
            schedule_status: "Status de Prazo".to_string(),
            work_status: "Status de Trabalho".to_string(),
            cost_status: "Status de Custo".to_string(),
        }
    }
}

impl ColumnSchema {
    pub fn filter_column(&self, field: FilterField) -> &str {
        match field {
            FilterField::Project => &self.project,
            FilterField::Department => &self.department,
            FilterField::Manager => &self.manager,
        }
    }

    pub fn status_column(&self, kind: StatusKind) -> &str {
        match kind {
            StatusKind::Schedule => &self.schedule_status,
            StatusKind::Work => &self.work_status,
            StatusKind::Cost => &self.cost_status,
        }
    }
}

/// The three categorical columns a user can filter on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterField {
    Project,
    Department,
    Manager,
}

impl FilterField {
    /// Application order of the filter predicates
    pub const ALL: [FilterField; 3] = [
        FilterField::Project,
        FilterField::Department,
        FilterField::Manager,
    ];
}

/// The three status columns whose distributions are charted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Schedule,
    Work,
    Cost,
}

impl StatusKind {
    pub const ALL: [StatusKind; 3] = [StatusKind::Schedule, StatusKind::Work, StatusKind::Cost];

    /// Bar chart title: the status column itself
    pub fn bar_title(self, schema: &ColumnSchema) -> String {
        schema.status_column(self).to_string()
    }

    pub fn pie_title(self, schema: &ColumnSchema) -> String {
        format!("Distribuição do {}", schema.status_column(self))
    }
}
