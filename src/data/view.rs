//! Aggregated View Module
//! Date-indexed, integer-valued table handed to charts and table display.

use chrono::NaiveDate;

/// One named column of an aggregated view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewColumn {
    pub name: String,
    pub values: Vec<i64>,
}

/// Table indexed by ascending date with one integer column per series.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregatedView {
    pub index: Vec<NaiveDate>,
    pub columns: Vec<ViewColumn>,
}

impl AggregatedView {
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[cfg(test)]
    pub fn column(&self, name: &str) -> Option<&ViewColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Values of every column on the given row.
    pub fn row(&self, i: usize) -> Vec<i64> {
        self.columns.iter().map(|c| c.values[i]).collect()
    }

    /// Sum of all columns on each row.
    pub fn row_totals(&self) -> Vec<i64> {
        (0..self.index.len())
            .map(|i| self.columns.iter().map(|c| c.values[i]).sum())
            .collect()
    }
}
