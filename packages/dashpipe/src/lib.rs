pub mod config;
pub mod engine;
pub mod importer;
pub mod session;
pub mod store;

// Re-export commonly used types for convenience
pub use config::{load_config, DashboardConfig};
pub use engine::types::{
    Field, FieldKind, Fields, Record, RecordId, Schema, SchemaError, Value, ASSESSMENT_SCHEMA,
    CASE_SCHEMA,
};
pub use engine::{
    derive, lookup_region, AggregateSnapshot, Chart, ChartKind, ColorRamp, DeriveOptions, DerivedView,
    FilterSpec, Metric, Page, RegionShade, SortDirection, SortSpec, ViewState,
};
pub use importer::{import_header, parse_delimited, ImportBatch, ImportOptions};
pub use session::{ImportReport, Session, SessionError};
pub use store::{JsonFileStore, MemoryStore, RecordStore, StoreError};
