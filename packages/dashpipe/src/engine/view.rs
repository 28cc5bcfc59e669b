use crate::engine::aggregate::AggregateSnapshot;
use crate::engine::chart::{Chart, ColorRamp, RegionShade};
use crate::engine::dashboard::Dashboard;
use crate::engine::operators::{
    filter, next_page, paginate, prev_page, sort, FilterSpec, Page, SortDirection, SortSpec,
};
use crate::engine::types::{Record, Schema, SchemaError};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::num::NonZeroUsize;
use tracing::debug;

pub const DEFAULT_PAGE_SIZE: NonZeroUsize = match NonZeroUsize::new(10) {
    Some(n) => n,
    None => unreachable!(),
};
pub const DEFAULT_TOP_N: usize = 5;

/// User-controlled parameters of one collection's table view.
///
/// Field names are kept as given and only validated against a schema when
/// a view is derived. Every filter or sort change returns to page 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub filter_field: SmolStr,
    pub filter_value: String,
    pub name_filter: String,
    pub exact_field: SmolStr,
    pub exact_value: String,
    pub sort_key: Option<SmolStr>,
    pub sort_direction: SortDirection,
    pub current_page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            filter_field: SmolStr::default(),
            filter_value: String::new(),
            name_filter: String::new(),
            exact_field: SmolStr::default(),
            exact_value: String::new(),
            sort_key: None,
            sort_direction: SortDirection::Unsorted,
            current_page: 1,
        }
    }
}

impl ViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_filter(&mut self, field: &str, value: &str) {
        self.filter_field = SmolStr::new(field);
        self.filter_value = value.to_string();
        self.current_page = 1;
    }

    pub fn set_name_filter(&mut self, value: &str) {
        self.name_filter = value.to_string();
        self.current_page = 1;
    }

    pub fn set_exact_filter(&mut self, field: &str, value: &str) {
        self.exact_field = SmolStr::new(field);
        self.exact_value = value.to_string();
        self.current_page = 1;
    }

    pub fn clear_filters(&mut self) {
        self.filter_field = SmolStr::default();
        self.filter_value.clear();
        self.name_filter.clear();
        self.exact_field = SmolStr::default();
        self.exact_value.clear();
        self.current_page = 1;
    }

    /// Same key while ascending flips to descending; anything else sorts
    /// ascending on `key`.
    pub fn toggle_sort(&mut self, key: &str) {
        let direction = match (&self.sort_key, self.sort_direction) {
            (Some(current), SortDirection::Ascending) if current == key => SortDirection::Descending,
            _ => SortDirection::Ascending,
        };
        self.set_sort(key, direction);
    }

    pub fn set_sort(&mut self, key: &str, direction: SortDirection) {
        self.sort_key = Some(SmolStr::new(key));
        self.sort_direction = direction;
        self.current_page = 1;
    }

    pub fn next_page(&mut self, total_pages: usize) {
        self.current_page = next_page(self.current_page, total_pages);
    }

    pub fn prev_page(&mut self) {
        self.current_page = prev_page(self.current_page);
    }

    pub fn filter_spec(&self, schema: &'static Schema) -> Result<FilterSpec, SchemaError> {
        FilterSpec::field_contains(schema, &self.filter_field, &self.filter_value)?
            .and_name_contains(schema, &self.name_filter)?
            .and_equals(schema, &self.exact_field, &self.exact_value)
    }

    pub fn sort_spec(&self, schema: &'static Schema) -> Result<SortSpec, SchemaError> {
        match &self.sort_key {
            Some(key) => SortSpec::by(schema, key, self.sort_direction),
            None => Ok(SortSpec::unsorted()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeriveOptions {
    pub page_size: NonZeroUsize,
    pub top_n: usize,
    pub color_ramp: ColorRamp,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            top_n: DEFAULT_TOP_N,
            color_ramp: ColorRamp::default(),
        }
    }
}

/// Everything a presentation layer needs for one render.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedView<'a> {
    pub page: Page<&'a Record>,
    /// Number of records passing the filter.
    pub matched: usize,
    pub aggregates: AggregateSnapshot,
    pub charts: Vec<Chart>,
    pub leaders: Vec<&'a Record>,
    pub regions: Vec<RegionShade>,
    /// Hash of the visible row ids in page order.
    pub page_hash: String,
}

/// Derive the visible page, summary and charts of `records` under `view`.
///
/// Pure: the same inputs always produce the same output and `records` is
/// never modified. Fails only when the view names a field `schema` does not
/// have.
pub fn derive<'a>(
    schema: &'static Schema,
    records: &'a [Record],
    view: &ViewState,
    options: &DeriveOptions,
) -> Result<DerivedView<'a>, SchemaError> {
    let dashboard = Dashboard::for_schema(schema)?;
    let filter_spec = view.filter_spec(schema)?;
    let sort_spec = view.sort_spec(schema)?;

    let matched = filter(records, &filter_spec);
    let ordered = sort(matched, &sort_spec);
    let page = paginate(&ordered, options.page_size, view.current_page);
    debug!(
        collection = schema.collection,
        total = records.len(),
        matched = ordered.len(),
        page = page.page,
        total_pages = page.total_pages,
        "derived view"
    );

    Ok(DerivedView {
        page_hash: page_hash(&page.rows),
        matched: ordered.len(),
        aggregates: dashboard.snapshot(schema, records)?,
        charts: dashboard.charts(schema, records, &ordered)?,
        leaders: dashboard.leaders(schema, records, options.top_n)?,
        regions: dashboard.regions(schema, records, &options.color_ramp)?,
        page,
    })
}

pub fn page_hash(rows: &[&Record]) -> String {
    let mut hasher = blake3::Hasher::new();
    for row in rows {
        hasher.update(row.id.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize().to_hex().to_string()
}
