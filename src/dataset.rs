use chrono::{NaiveDateTime, Timelike};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::error::{DashboardError, Result};

/// A single decoded cell of an uploaded table
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Infers the type of a raw text field
    ///
    /// Blank fields are empty, then integers, floats and booleans are tried in
    /// that order. Anything else stays text, including `inf`; `NaN` is a
    /// missing value.
    ///
    /// # Examples
    /// ```
    /// use pmo_dashboard::dataset::CellValue;
    ///
    /// assert_eq!(CellValue::infer(" 42 "), CellValue::Int(42));
    /// assert_eq!(CellValue::infer("No prazo"), CellValue::Text("No prazo".to_string()));
    /// assert_eq!(CellValue::infer(""), CellValue::Empty);
    /// ```
    pub fn infer(raw: &str) -> CellValue {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return CellValue::Int(i);
        }
        if let Ok(f) = trimmed.parse::<f64>() {
            if f.is_nan() {
                return CellValue::Empty;
            }
            if f.is_finite() {
                return CellValue::Float(f);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return CellValue::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return CellValue::Bool(false);
        }
        CellValue::Text(trimmed.to_string())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// Display string used for chart categories, dropdown options and filter matching
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => Ok(()),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{}", v)
                }
            }
            CellValue::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            CellValue::DateTime(dt) => {
                if dt.num_seconds_from_midnight() == 0 {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CellValue::Empty => serializer.serialize_none(),
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Int(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::DateTime(_) => serializer.serialize_str(&self.label()),
        }
    }
}

/// Frequency of each distinct label in a column
///
/// Ordered by count descending; labels with equal counts keep the order in
/// which they first appear in the column.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValueCounts {
    entries: Vec<(String, usize)>,
}

impl ValueCounts {
    pub fn labels(&self) -> Vec<String> {
        self.entries.iter().map(|(label, _)| label.clone()).collect()
    }

    pub fn counts(&self) -> Vec<usize> {
        self.entries.iter().map(|(_, count)| *count).collect()
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, count)| count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A decoded table: a header row of column names and rows of cells
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl Dataset {
    /// Creates a dataset, padding short rows with empty cells and dropping extras
    ///
    /// # Arguments
    /// * `columns` - Header names, in display order
    /// * `rows` - Cell rows; each is resized to `columns.len()`
    ///
    /// # Examples
    /// ```
    /// use pmo_dashboard::dataset::{CellValue, Dataset};
    ///
    /// let ds = Dataset::new(
    ///     vec!["Nome do Projeto".to_string(), "Departamento".to_string()],
    ///     vec![vec![CellValue::Text("Alpha".to_string())]],
    /// );
    /// assert_eq!(ds.rows[0][1], CellValue::Empty);
    /// ```
    pub fn new(columns: Vec<String>, rows: Vec<Vec<CellValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, CellValue::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name, or `MissingColumn`
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DashboardError::MissingColumn(name.to_string()))
    }

    /// Iterates over the cells of one column, top to bottom
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &CellValue> + '_> {
        let index = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[index]))
    }

    /// Distinct non-empty labels of a column in order of first appearance
    pub fn unique_values(&self, name: &str) -> Result<Vec<String>> {
        let mut seen = Vec::new();
        for cell in self.column(name)? {
            if cell.is_empty() {
                continue;
            }
            let label = cell.label();
            if !seen.contains(&label) {
                seen.push(label);
            }
        }
        Ok(seen)
    }

    /// Counts how often each distinct label occurs in a column
    ///
    /// Empty cells are skipped. The result is ordered by count, highest
    /// first; equal counts keep first-appearance order.
    ///
    /// # Arguments
    /// * `name` - Column to count
    ///
    /// # Returns
    /// * The ordered counts, or `MissingColumn` if the column is absent
    ///
    /// # Examples
    /// ```
    /// use pmo_dashboard::dataset::{CellValue, Dataset};
    ///
    /// let ds = Dataset::new(
    ///     vec!["Status de Prazo".to_string()],
    ///     ["No prazo", "Atrasado", "Atrasado", ""]
    ///         .iter()
    ///         .map(|s| vec![CellValue::infer(s)])
    ///         .collect(),
    /// );
    /// let counts = ds.value_counts("Status de Prazo").unwrap();
    /// assert_eq!(counts.labels(), vec!["Atrasado", "No prazo"]);
    /// assert_eq!(counts.counts(), vec![2, 1]);
    /// assert_eq!(counts.total(), 3);
    /// ```
    pub fn value_counts(&self, name: &str) -> Result<ValueCounts> {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, usize> = HashMap::new();

        for cell in self.column(name)? {
            if cell.is_empty() {
                continue;
            }
            let label = cell.label();
            let count = counts.entry(label.clone()).or_insert(0);
            if *count == 0 {
                order.push(label);
            }
            *count += 1;
        }

        let mut entries: Vec<(String, usize)> = order
            .into_iter()
            .map(|label| {
                let count = counts[&label];
                (label, count)
            })
            .collect();
        // stable sort keeps first-appearance order for ties
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(ValueCounts { entries })
    }

    /// Returns a new dataset with the same columns and only the matching rows
    ///
    /// # Arguments
    /// * `predicate` - Called once per row, in order; `true` keeps the row
    pub fn retain_rows<F>(&self, mut predicate: F) -> Dataset
    where
        F: FnMut(&[CellValue]) -> bool,
    {
        Dataset {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| predicate(row))
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn statuses(values: &[&str]) -> Dataset {
        Dataset::new(
            vec!["Status".to_string()],
            values
                .iter()
                .map(|v| vec![CellValue::infer(v)])
                .collect(),
        )
    }

    #[test]
    fn infer_types_fields() {
        assert_eq!(CellValue::infer(""), CellValue::Empty);
        assert_eq!(CellValue::infer("   "), CellValue::Empty);
        assert_eq!(CellValue::infer("42"), CellValue::Int(42));
        assert_eq!(CellValue::infer("-3.5"), CellValue::Float(-3.5));
        assert_eq!(CellValue::infer("TRUE"), CellValue::Bool(true));
        assert_eq!(CellValue::infer(" No prazo "), text("No prazo"));
    }

    #[test]
    fn infer_keeps_non_finite_numbers_as_text() {
        assert_eq!(CellValue::infer("inf"), text("inf"));
        assert_eq!(CellValue::infer("-Infinity"), text("-Infinity"));
        assert_eq!(CellValue::infer("NaN"), CellValue::Empty);

        let json = serde_json::to_value(CellValue::infer("inf")).unwrap();
        assert_eq!(json, serde_json::json!("inf"));
    }

    #[test]
    fn labels_match_table_display() {
        assert_eq!(CellValue::Float(3.0).label(), "3");
        assert_eq!(CellValue::Float(2.25).label(), "2.25");
        assert_eq!(CellValue::Bool(false).label(), "False");
        assert_eq!(CellValue::Empty.label(), "");

        let midnight = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::DateTime(midnight).label(), "2024-03-01");
        let afternoon = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(14, 30, 5)
            .unwrap();
        assert_eq!(CellValue::DateTime(afternoon).label(), "2024-03-01 14:30:05");
    }

    #[test]
    fn new_pads_and_truncates_rows() {
        let ds = Dataset::new(
            vec!["a".into(), "b".into()],
            vec![vec![text("x")], vec![text("1"), text("2"), text("3")]],
        );
        assert_eq!(ds.rows[0], vec![text("x"), CellValue::Empty]);
        assert_eq!(ds.rows[1], vec![text("1"), text("2")]);
    }

    #[test]
    fn value_counts_orders_by_count_then_first_appearance() {
        let ds = statuses(&["Atrasado", "No prazo", "Adiantado", "No prazo", "Atrasado", "", "Crítico"]);
        let counts = ds.value_counts("Status").unwrap();

        assert_eq!(
            counts.labels(),
            vec!["Atrasado", "No prazo", "Adiantado", "Crítico"]
        );
        assert_eq!(counts.counts(), vec![2, 2, 1, 1]);
        assert_eq!(counts.total(), 6);
    }

    #[test]
    fn value_counts_of_empty_column_is_empty() {
        let ds = statuses(&["", ""]);
        assert!(ds.value_counts("Status").unwrap().is_empty());
    }

    #[test]
    fn unique_values_skip_empty_cells() {
        let ds = statuses(&["B", "", "A", "B", "C"]);
        assert_eq!(ds.unique_values("Status").unwrap(), vec!["B", "A", "C"]);
    }

    #[test]
    fn missing_column_is_reported_by_name() {
        let ds = statuses(&["A"]);
        match ds.value_counts("Status de Custo") {
            Err(DashboardError::MissingColumn(name)) => assert_eq!(name, "Status de Custo"),
            other => panic!("expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn retain_rows_keeps_columns_and_order() {
        let ds = statuses(&["A", "B", "A"]);
        let only_a = ds.retain_rows(|row| row[0] == text("A"));
        assert_eq!(only_a.columns, ds.columns);
        assert_eq!(only_a.len(), 2);
        // source untouched
        assert_eq!(ds.len(), 3);
    }

    #[test]
    fn serializes_cells_as_scalars() {
        let ds = Dataset::new(
            vec!["n".into(), "t".into(), "e".into()],
            vec![vec![CellValue::Int(1), text("x"), CellValue::Empty]],
        );
        let json = serde_json::to_value(&ds).unwrap();
        assert_eq!(json["rows"][0], serde_json::json!([1, "x", null]));
    }
}
