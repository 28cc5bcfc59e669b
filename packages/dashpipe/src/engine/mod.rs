pub mod aggregate;
pub mod chart;
pub mod dashboard;
pub mod eval;
pub mod operators;
pub mod types;
pub mod view;

pub use aggregate::{AggregateSnapshot, Distribution, GroupKey, GroupMetric, Metric};
pub use chart::{
    lookup_region, Chart, ChartKind, ColorRamp, RampStep, RegionShade, Series, SeriesData,
};
pub use dashboard::{ChartSource, Dashboard};
pub use operators::{filter, paginate, sort, FilterSpec, Page, SortDirection, SortSpec};
pub use types::{FastMap, Fields, Record, RecordId, Schema, SchemaError, Value};
pub use view::{derive, DeriveOptions, DerivedView, ViewState};
