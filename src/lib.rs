/*!
# PMO Project Dashboard

A browser-based dashboard for project-management records, built in Rust.

## Overview

A user uploads a spreadsheet of projects (project name, department, manager and
schedule/work/cost status). The dashboard shows three bar charts, three pie
charts and a table, filterable by project, department and manager. Every
upload or filter change recomputes all seven artifacts.

## Architecture

### Frontend Layer
- A single embedded HTML page with the upload widget, three filter dropdowns
  and Plotly placeholders for the seven artifacts
- Figures arrive as Plotly-compatible JSON and are drawn client-side

### Backend Layer
- **Technologies**: Rust, axum
- **Core Components**:
  - File Decoder - CSV/TSV text or spreadsheet workbooks, chosen by suffix
  - Filter Engine - exact-match filtering on project, department and manager
  - Chart/Table Builder - status frequency counts packaged as seven figures
  - Dashboard Session - holds the last upload and answers filter changes

## Modules

- **dataset**: decoded table and value counting
- **schema**: the column names the dashboard reads
- **loader**: upload decoding (data URLs, CSV, XLSX/XLS/ODS)
- **filter**: filter selections and dropdown options
- **graph**: Plotly figure model and the seven dashboard artifacts
- **render**: SVG/PNG chart images with plotters
- **downloader**: CSV and XLSX export of the filtered table
- **dashboard**: the reactive session
- **config**: environment-driven settings
- **app**: routing and handlers (`web` feature)

## REST API Endpoints

- `POST /api/upload` - Multipart upload (field `file`)
- `POST /api/upload/data-url` - JSON `{ filename, contents }` upload
- `GET /api/dashboard` - The seven figures for `?project=&department=&manager=`
- `GET /api/charts/{id}` - One chart as SVG or PNG
- `GET /api/export` - Filtered table as CSV or XLSX
- `GET /api/session` - What is currently loaded
*/

pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod downloader;
pub mod error;
pub mod filter;
pub mod graph;
pub mod loader;
pub mod render;
pub mod schema;

#[cfg(feature = "web")]
pub mod app;

pub use dashboard::{DashboardSession, UploadOutcome};
pub use dataset::{CellValue, Dataset, ValueCounts};
pub use error::{DashboardError, Result};
pub use filter::{FilterSelection, Selection};
pub use graph::{ChartId, DashboardFigures, Figure};
pub use schema::ColumnSchema;
