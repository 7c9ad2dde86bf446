use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::dataset::{CellValue, Dataset, ValueCounts};
use crate::error::{DashboardError, Result};
use crate::schema::{ColumnSchema, StatusKind};

/// Title of the project table figure
pub const TABLE_TITLE: &str = "Tabela de Projetos";

const BAR_X_TITLE: &str = "Status";
const BAR_Y_TITLE: &str = "Quantidade";
const BAR_LEGEND_TITLE: &str = "Legenda";
const TABLE_HEADER_FILL: &str = "paleturquoise";
const TABLE_CELL_FILL: &str = "lavender";

/// A chart or table in the Plotly figure JSON layout
///
/// Any Plotly-compatible front-end can render these directly.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

/// One data series of a figure
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Bar {
        x: Vec<String>,
        y: Vec<usize>,
        name: String,
    },
    Pie {
        labels: Vec<String>,
        values: Vec<usize>,
        name: String,
    },
    Table {
        header: TableHeader,
        cells: TableCells,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableHeader {
    pub values: Vec<String>,
    pub fill_color: String,
    pub align: String,
}

/// Table body, column-major: `values[c]` holds every cell of column `c`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCells {
    pub values: Vec<Vec<CellValue>>,
    pub fill_color: String,
    pub align: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

impl Title {
    fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Axis {
    pub title: Title,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Layout {
    pub title: Title,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<Axis>,
}

impl Layout {
    fn titled(text: impl Into<String>) -> Self {
        Self {
            title: Title::new(text),
            xaxis: None,
            yaxis: None,
            legend: None,
        }
    }
}

impl Figure {
    pub fn title(&self) -> &str {
        &self.layout.title.text
    }

    /// Category labels and counts of a bar or pie figure
    pub fn series(&self) -> Option<(&[String], &[usize])> {
        match self.data.first()? {
            Trace::Bar { x, y, .. } => Some((x.as_slice(), y.as_slice())),
            Trace::Pie { labels, values, .. } => Some((labels.as_slice(), values.as_slice())),
            Trace::Table { .. } => None,
        }
    }
}

/// Bar chart of one status distribution
///
/// # Arguments
/// * `kind` - Which status column the counts came from
/// * `counts` - The distribution, one bar per label in order
/// * `schema` - Column names, used for the title
pub fn bar_figure(kind: StatusKind, counts: &ValueCounts, schema: &ColumnSchema) -> Figure {
    let name = kind.bar_title(schema);
    Figure {
        data: vec![Trace::Bar {
            x: counts.labels(),
            y: counts.counts(),
            name: name.clone(),
        }],
        layout: Layout {
            title: Title::new(name),
            xaxis: Some(Axis {
                title: Title::new(BAR_X_TITLE),
            }),
            yaxis: Some(Axis {
                title: Title::new(BAR_Y_TITLE),
            }),
            legend: Some(Axis {
                title: Title::new(BAR_LEGEND_TITLE),
            }),
        },
    }
}

/// Pie chart of one status distribution
pub fn pie_figure(kind: StatusKind, counts: &ValueCounts, schema: &ColumnSchema) -> Figure {
    Figure {
        data: vec![Trace::Pie {
            labels: counts.labels(),
            values: counts.counts(),
            name: kind.bar_title(schema),
        }],
        layout: Layout::titled(kind.pie_title(schema)),
    }
}

/// Table of every column and row of the dataset
///
/// # Examples
/// ```
/// use pmo_dashboard::dataset::{CellValue, Dataset};
/// use pmo_dashboard::graph::{TABLE_TITLE, table_figure};
///
/// let ds = Dataset::new(
///     vec!["Nome do Projeto".to_string()],
///     vec![vec![CellValue::Text("Alpha".to_string())]],
/// );
/// let figure = table_figure(&ds);
/// assert_eq!(figure.title(), TABLE_TITLE);
/// assert!(figure.series().is_none());
/// ```
pub fn table_figure(dataset: &Dataset) -> Figure {
    let values: Vec<Vec<CellValue>> = (0..dataset.columns.len())
        .map(|c| dataset.rows.iter().map(|row| row[c].clone()).collect())
        .collect();

    Figure {
        data: vec![Trace::Table {
            header: TableHeader {
                values: dataset.columns.clone(),
                fill_color: TABLE_HEADER_FILL.to_string(),
                align: "left".to_string(),
            },
            cells: TableCells {
                values,
                fill_color: TABLE_CELL_FILL.to_string(),
                align: "left".to_string(),
            },
        }],
        layout: Layout::titled(TABLE_TITLE),
    }
}

/// Identifier of each of the seven dashboard artifacts
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChartId {
    ScheduleBar,
    WorkBar,
    CostBar,
    ProjectTable,
    SchedulePie,
    WorkPie,
    CostPie,
}

impl ChartId {
    pub const ALL: [ChartId; 7] = [
        ChartId::ScheduleBar,
        ChartId::WorkBar,
        ChartId::CostBar,
        ChartId::ProjectTable,
        ChartId::SchedulePie,
        ChartId::WorkPie,
        ChartId::CostPie,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ChartId::ScheduleBar => "status-de-prazo",
            ChartId::WorkBar => "status-de-trabalho",
            ChartId::CostBar => "status-de-custo",
            ChartId::ProjectTable => "project-table",
            ChartId::SchedulePie => "status-prazo-pie",
            ChartId::WorkPie => "status-trabalho-pie",
            ChartId::CostPie => "status-custo-pie",
        }
    }

    /// The status column charted, or `None` for the table
    pub fn status(self) -> Option<StatusKind> {
        match self {
            ChartId::ScheduleBar | ChartId::SchedulePie => Some(StatusKind::Schedule),
            ChartId::WorkBar | ChartId::WorkPie => Some(StatusKind::Work),
            ChartId::CostBar | ChartId::CostPie => Some(StatusKind::Cost),
            ChartId::ProjectTable => None,
        }
    }

    pub fn is_pie(self) -> bool {
        matches!(self, ChartId::SchedulePie | ChartId::WorkPie | ChartId::CostPie)
    }
}

impl fmt::Display for ChartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartId {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        ChartId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| DashboardError::UnknownChart(s.to_string()))
    }
}

/// The seven artifacts recomputed on every upload or filter change
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DashboardFigures {
    #[serde(rename = "status-de-prazo")]
    pub schedule_bar: Figure,
    #[serde(rename = "status-de-trabalho")]
    pub work_bar: Figure,
    #[serde(rename = "status-de-custo")]
    pub cost_bar: Figure,
    #[serde(rename = "project-table")]
    pub project_table: Figure,
    #[serde(rename = "status-prazo-pie")]
    pub schedule_pie: Figure,
    #[serde(rename = "status-trabalho-pie")]
    pub work_pie: Figure,
    #[serde(rename = "status-custo-pie")]
    pub cost_pie: Figure,
}

impl DashboardFigures {
    pub fn get(&self, id: ChartId) -> &Figure {
        match id {
            ChartId::ScheduleBar => &self.schedule_bar,
            ChartId::WorkBar => &self.work_bar,
            ChartId::CostBar => &self.cost_bar,
            ChartId::ProjectTable => &self.project_table,
            ChartId::SchedulePie => &self.schedule_pie,
            ChartId::WorkPie => &self.work_pie,
            ChartId::CostPie => &self.cost_pie,
        }
    }
}

/// Builds all seven artifacts from an already filtered dataset
///
/// Each status column is counted once and shared by its bar and pie chart.
///
/// # Arguments
/// * `filtered` - Output of `filter_dataset` for the current selection
/// * `schema` - Names of the three status columns
///
/// # Returns
/// * The seven figures, or `MissingColumn` if any status column is absent
///
/// # Examples
/// ```
/// use pmo_dashboard::dataset::{CellValue, Dataset};
/// use pmo_dashboard::graph::{ChartId, build_dashboard};
/// use pmo_dashboard::schema::ColumnSchema;
///
/// let text = |s: &str| CellValue::Text(s.to_string());
/// let ds = Dataset::new(
///     vec![
///         "Status de Prazo".to_string(),
///         "Status de Trabalho".to_string(),
///         "Status de Custo".to_string(),
///     ],
///     vec![vec![text("No prazo"), text("Concluído"), text("Dentro do orçamento")]],
/// );
/// let figures = build_dashboard(&ds, &ColumnSchema::default()).unwrap();
/// let (labels, counts) = figures.get(ChartId::CostPie).series().unwrap();
/// assert_eq!(labels, ["Dentro do orçamento"]);
/// assert_eq!(counts, [1]);
/// ```
pub fn build_dashboard(filtered: &Dataset, schema: &ColumnSchema) -> Result<DashboardFigures> {
    let schedule = filtered.value_counts(schema.status_column(StatusKind::Schedule))?;
    let work = filtered.value_counts(schema.status_column(StatusKind::Work))?;
    let cost = filtered.value_counts(schema.status_column(StatusKind::Cost))?;

    Ok(DashboardFigures {
        schedule_bar: bar_figure(StatusKind::Schedule, &schedule, schema),
        work_bar: bar_figure(StatusKind::Work, &work, schema),
        cost_bar: bar_figure(StatusKind::Cost, &cost, schema),
        project_table: table_figure(filtered),
        schedule_pie: pie_figure(StatusKind::Schedule, &schedule, schema),
        work_pie: pie_figure(StatusKind::Work, &work, schema),
        cost_pie: pie_figure(StatusKind::Cost, &cost, schema),
    })
}
