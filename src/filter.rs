use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::schema::{ColumnSchema, FilterField};

/// Dropdown value meaning "no restriction on this column"
pub const ALL: &str = "Todos";

/// A single dropdown choice
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Value(String),
}

impl Selection {
    /// Missing, blank and `Todos` selections all mean no restriction
    pub fn from_raw(raw: Option<&str>) -> Selection {
        match raw {
            None => Selection::All,
            Some(value) if value.is_empty() || value == ALL => Selection::All,
            Some(value) => Selection::Value(value.to_string()),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Selection::All => None,
            Selection::Value(value) => Some(value.as_str()),
        }
    }
}

/// The three filter dropdowns as sent by the page
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub project: Option<String>,
    pub department: Option<String>,
    pub manager: Option<String>,
}

/// Current selection of the project, department and manager dropdowns
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub project: Selection,
    pub department: Selection,
    pub manager: Selection,
}

impl FilterSelection {
    pub fn get(&self, field: FilterField) -> &Selection {
        match field {
            FilterField::Project => &self.project,
            FilterField::Department => &self.department,
            FilterField::Manager => &self.manager,
        }
    }
}

impl From<&FilterQuery> for FilterSelection {
    fn from(query: &FilterQuery) -> Self {
        Self {
            project: Selection::from_raw(query.project.as_deref()),
            department: Selection::from_raw(query.department.as_deref()),
            manager: Selection::from_raw(query.manager.as_deref()),
        }
    }
}

/// Keeps the rows matching every selected category exactly
///
/// Predicates are applied in the order project, department, manager. An `All`
/// selection does not touch its column, so the column may be absent. The input
/// is left unmodified.
///
/// # Arguments
/// * `dataset` - The uploaded table
/// * `selection` - Current value of the three dropdowns
/// * `schema` - Names of the project, department and manager columns
///
/// # Returns
/// * A new dataset with the same columns and the matching rows, or
///   `MissingColumn` when a value is selected for an absent column
///
/// # Examples
/// ```
/// use pmo_dashboard::dataset::{CellValue, Dataset};
/// use pmo_dashboard::filter::{FilterSelection, Selection, filter_dataset};
/// use pmo_dashboard::schema::ColumnSchema;
///
/// let ds = Dataset::new(
///     vec!["Departamento".to_string()],
///     vec![
///         vec![CellValue::Text("TI".to_string())],
///         vec![CellValue::Text("RH".to_string())],
///     ],
/// );
/// let selection = FilterSelection {
///     department: Selection::from_raw(Some("RH")),
///     ..FilterSelection::default()
/// };
/// let filtered = filter_dataset(&ds, &selection, &ColumnSchema::default()).unwrap();
/// assert_eq!(filtered.len(), 1);
/// ```
pub fn filter_dataset(
    dataset: &Dataset,
    selection: &FilterSelection,
    schema: &ColumnSchema,
) -> Result<Dataset> {
    let mut filtered = dataset.clone();
    for field in FilterField::ALL {
        let Some(wanted) = selection.get(field).value() else {
            continue;
        };
        let index = filtered.column_index(schema.filter_column(field))?;
        filtered = filtered.retain_rows(|row| row[index].label() == wanted);
    }
    Ok(filtered)
}

/// One entry of a dropdown's option list
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

impl DropdownOption {
    fn new(value: &str) -> Self {
        Self {
            label: value.to_string(),
            value: value.to_string(),
        }
    }
}

/// Option lists for the three filter dropdowns
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub project: Vec<DropdownOption>,
    pub department: Vec<DropdownOption>,
    pub manager: Vec<DropdownOption>,
}

/// Builds the dropdown options: `Todos` followed by each distinct value in
/// order of first appearance
///
/// # Errors
/// * `MissingColumn` if the project, department or manager column is absent
pub fn filter_options(dataset: &Dataset, schema: &ColumnSchema) -> Result<FilterOptions> {
    let options_for = |field: FilterField| -> Result<Vec<DropdownOption>> {
        let mut options = vec![DropdownOption::new(ALL)];
        options.extend(
            dataset
                .unique_values(schema.filter_column(field))?
                .iter()
                .map(|value| DropdownOption::new(value)),
        );
        Ok(options)
    };

    Ok(FilterOptions {
        project: options_for(FilterField::Project)?,
        department: options_for(FilterField::Department)?,
        manager: options_for(FilterField::Manager)?,
    })
}
