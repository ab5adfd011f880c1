//! Data module - snapshot loading, filtering and aggregation

mod cache;
mod loader;
mod processor;
mod source;
mod table;
mod view;

pub use cache::BoundedCache;
pub use loader::{DataLoader, LoadRequest, LoaderError};
pub use processor::{Aggregation, DataMode, DataProcessor, ProcessorError};
pub use source::Source;
pub use table::{CapacityTable, RegionColumn};
pub use view::{AggregatedView, ViewColumn};
