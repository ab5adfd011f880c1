//! Dashboard pipeline
//!
//! Every interaction recomputes the whole pipeline from the current
//! parameters: load (cached) → region filter → date filter → aggregate →
//! chart. Nothing is diffed or kept between runs except the loader cache.

use chrono::NaiveDate;
use thiserror::Error;

use crate::charts::{Chart, ChartKind};
use crate::data::{
    AggregatedView, Aggregation, CapacityTable, DataProcessor, LoaderError, ProcessorError,
    RegionColumn,
};
#[cfg(test)]
use crate::data::{DataLoader, LoadRequest};

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Loader(#[from] LoaderError),
    #[error(transparent)]
    Processor(#[from] ProcessorError),
}

/// Parameters applied to an already loaded table.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewRequest {
    /// Region restriction; `None` when grouping is off.
    pub region: Option<(RegionColumn, String)>,
    /// Inclusive date interval; `None` keeps every date.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub aggregation: Aggregation,
    pub chart_kind: ChartKind,
    pub stacked: bool,
}

impl ViewRequest {
    /// Bounds for the date-range selector: the dates left after the region
    /// filter.
    pub fn date_bounds(
        &self,
        table: &CapacityTable,
    ) -> Result<Option<(NaiveDate, NaiveDate)>, DashboardError> {
        let table = self.apply_region(table)?;
        Ok(table.date_range().map_err(ProcessorError::from)?)
    }

    fn apply_region(&self, table: &CapacityTable) -> Result<CapacityTable, ProcessorError> {
        match &self.region {
            Some((column, value)) => DataProcessor::filter_by_region(table, *column, value),
            None => Ok(table.clone()),
        }
    }
}

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardParams {
    pub load: LoadRequest,
    pub view: ViewRequest,
}

/// Everything the UI displays for one run.
#[derive(Debug, Clone)]
pub struct DashboardOutput {
    /// Rows that survived the filters, for raw display.
    pub table: CapacityTable,
    pub view: AggregatedView,
    pub chart: Chart,
}

/// Filter, aggregate and chart a loaded table.
pub fn build(table: &CapacityTable, request: &ViewRequest) -> Result<DashboardOutput, DashboardError> {
    let mut filtered = request.apply_region(table)?;
    if let Some((start, end)) = request.date_range {
        filtered = DataProcessor::filter_by_date(&filtered, start, end)?;
    }

    let view = DataProcessor::aggregate(&filtered, &request.aggregation)?;
    log::debug!(
        "Aggregated {} rows into {} dates x {} series",
        filtered.height(),
        view.index.len(),
        view.columns.len()
    );
    let chart = Chart::from_view(&view, request.chart_kind, request.stacked);

    Ok(DashboardOutput {
        table: filtered,
        view,
        chart,
    })
}

/// Full run: load the snapshot (through the loader cache), then build.
/// The GUI splits these two steps to keep loading off the UI thread.
#[cfg(test)]
pub fn run(loader: &mut DataLoader, params: &DashboardParams) -> Result<DashboardOutput, DashboardError> {
    let table = loader.load(&params.load)?;
    build(&table, &params.view)
}
