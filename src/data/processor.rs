//! Data Processor Module
//! Filters the canonical table and reshapes it into an aggregated view.

use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::table::{
    date_values, string_values, CapacityTable, RegionColumn, DATE_COLUMN, UNIT_COLUMN,
};
use super::view::{AggregatedView, ViewColumn};

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Choose at least one variable.")]
    NoVariablesSelected,
}

/// Aggregation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataMode {
    /// One variable, one series per unit
    #[default]
    PerUnit,
    /// Several variables summed across units
    Totals,
}

/// Aggregation request with its selected variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Aggregation {
    PerUnit { variable: String },
    Totals { variables: Vec<String> },
}

/// Handles filtering and reshaping operations.
pub struct DataProcessor;

impl DataProcessor {
    /// Keep rows dated within `[start, end]`, preserving order.
    pub fn filter_by_date(
        table: &CapacityTable,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<CapacityTable, ProcessorError> {
        let mask: BooleanChunked = table
            .dates()?
            .into_iter()
            .map(|d| Some(d.is_some_and(|d| start <= d && d <= end)))
            .collect();
        let filtered = table.frame().filter(&mask)?;
        log::debug!(
            "Date filter {}..={} kept {}/{} rows",
            start,
            end,
            filtered.height(),
            table.height()
        );
        Ok(CapacityTable::from_frame(filtered))
    }

    /// Keep rows whose region column equals `value`.
    pub fn filter_by_region(
        table: &CapacityTable,
        column: RegionColumn,
        value: &str,
    ) -> Result<CapacityTable, ProcessorError> {
        let filtered = table
            .frame()
            .clone()
            .lazy()
            .filter(col(column.name()).eq(lit(value)))
            .collect()?;
        Ok(CapacityTable::from_frame(filtered))
    }

    pub fn aggregate(
        table: &CapacityTable,
        aggregation: &Aggregation,
    ) -> Result<AggregatedView, ProcessorError> {
        match aggregation {
            Aggregation::PerUnit { variable } => Self::pivot_by_unit(table, variable),
            Aggregation::Totals { variables } => Self::sum_by_date(table, variables),
        }
    }

    /// Sum `variable` per (date, unit) and pivot units into columns.
    ///
    /// Output columns are the distinct units in name order; a unit with no
    /// rows on some date reads 0 there.
    pub fn pivot_by_unit(
        table: &CapacityTable,
        variable: &str,
    ) -> Result<AggregatedView, ProcessorError> {
        let grouped = table
            .frame()
            .clone()
            .lazy()
            .group_by([col(DATE_COLUMN), col(UNIT_COLUMN)])
            .agg([col(variable).cast(DataType::Float64).sum()])
            .collect()?;

        let dates = date_values(grouped.column(DATE_COLUMN)?)?;
        let units = string_values(grouped.column(UNIT_COLUMN)?)?;
        let sums = grouped.column(variable)?.f64()?;

        let mut cells: BTreeMap<NaiveDate, BTreeMap<String, f64>> = BTreeMap::new();
        let mut unit_names: BTreeSet<String> = BTreeSet::new();

        for ((date, unit), sum) in dates.into_iter().zip(units).zip(sums.into_iter()) {
            // Rows without a date or unit cannot be placed in the grid
            let (Some(date), Some(unit)) = (date, unit) else {
                continue;
            };
            unit_names.insert(unit.clone());
            cells
                .entry(date)
                .or_default()
                .insert(unit, sum.unwrap_or(0.0));
        }

        let index: Vec<NaiveDate> = cells.keys().copied().collect();
        let columns = unit_names
            .into_iter()
            .map(|unit| {
                let values = cells
                    .values()
                    .map(|row| row.get(&unit).copied().map(to_count).unwrap_or(0))
                    .collect();
                ViewColumn { name: unit, values }
            })
            .collect();

        Ok(AggregatedView { index, columns })
    }

    /// Sum each variable per date across every unit and region.
    pub fn sum_by_date(
        table: &CapacityTable,
        variables: &[String],
    ) -> Result<AggregatedView, ProcessorError> {
        if variables.is_empty() {
            return Err(ProcessorError::NoVariablesSelected);
        }

        let aggs: Vec<Expr> = variables
            .iter()
            .map(|v| col(v.as_str()).cast(DataType::Float64).sum())
            .collect();
        let grouped = table
            .frame()
            .clone()
            .lazy()
            .group_by([col(DATE_COLUMN)])
            .agg(aggs)
            .collect()?;

        let dates = date_values(grouped.column(DATE_COLUMN)?)?;
        let mut rows: BTreeMap<NaiveDate, usize> = BTreeMap::new();
        for (i, date) in dates.into_iter().enumerate() {
            if let Some(date) = date {
                rows.insert(date, i);
            }
        }

        let mut columns = Vec::with_capacity(variables.len());
        for variable in variables {
            let sums = grouped.column(variable)?.f64()?;
            let values = rows
                .values()
                .map(|&i| sums.get(i).map(to_count).unwrap_or(0))
                .collect();
            columns.push(ViewColumn {
                name: variable.clone(),
                values,
            });
        }

        Ok(AggregatedView {
            index: rows.into_keys().collect(),
            columns,
        })
    }
}

/// Integer cast applied to every aggregated cell.
fn to_count(value: f64) -> i64 {
    if value.is_nan() {
        0
    } else {
        value as i64
    }
}
