//! One collection materialized in memory plus its view state.
//!
//! The session is the only place where the pipeline meets a store. A
//! mutation is mirrored into the in-memory collection only after the store
//! acknowledged it, so a failing store never leaves the session out of
//! step with what was persisted.

use crate::engine::aggregate::AggregateSnapshot;
use crate::engine::chart::Chart;
use crate::engine::operators::{filter, total_pages, Page};
use crate::engine::types::{Fields, Record, RecordId, Schema, SchemaError};
use crate::engine::view::{derive, DeriveOptions, DerivedView, ViewState};
use crate::importer::{parse_delimited, ImportOptions};
use crate::store::{RecordStore, StoreError};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Outcome of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub ok: bool,
    pub created: usize,
    /// Rows rejected while parsing.
    pub dropped: usize,
    /// Rows the store refused.
    pub failed: usize,
    pub message: Option<String>,
}

#[derive(Debug)]
pub struct Session {
    schema: &'static Schema,
    records: Vec<Record>,
    view: ViewState,
    options: DeriveOptions,
}

impl Session {
    pub fn new(schema: &'static Schema, options: DeriveOptions) -> Self {
        Self {
            schema,
            records: Vec::new(),
            view: ViewState::new(),
            options,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut ViewState {
        &mut self.view
    }

    pub fn options(&self) -> &DeriveOptions {
        &self.options
    }

    /// Replace the collection with the store's, normalizing every record
    /// (legacy fallbacks, numeric coercion) on the way in.
    #[instrument(skip(self, store), fields(collection = self.schema.collection))]
    pub fn load(&mut self, store: &dyn RecordStore) -> Result<usize, StoreError> {
        let loaded = store.load_all(self.schema.collection)?;
        self.records = loaded
            .into_iter()
            .map(|r| Record::new(r.id, self.schema.normalize(r.fields)))
            .collect();
        info!(count = self.records.len(), "loaded collection");
        Ok(self.records.len())
    }

    #[instrument(skip(self, store, fields), fields(collection = self.schema.collection))]
    pub fn create(
        &mut self,
        store: &mut dyn RecordStore,
        fields: Fields,
    ) -> Result<RecordId, SessionError> {
        let fields = self.schema.normalize(fields);
        let id = store
            .create(self.schema.collection, fields.clone())
            .inspect_err(|e| warn!("create failed: {}", e))?;
        self.records.push(Record::new(id.clone(), fields));
        Ok(id)
    }

    /// Create from raw form input, coercing each value by its field kind.
    pub fn create_from_input(
        &mut self,
        store: &mut dyn RecordStore,
        input: &[(&str, &str)],
    ) -> Result<RecordId, SessionError> {
        let fields = self.schema.coerce_input(input.iter().copied())?;
        self.create(store, fields)
    }

    #[instrument(skip(self, store, partial), fields(collection = self.schema.collection))]
    pub fn update(
        &mut self,
        store: &mut dyn RecordStore,
        id: &str,
        partial: Fields,
    ) -> Result<(), SessionError> {
        let partial = self.schema.normalize(partial);
        store
            .update(self.schema.collection, id, &partial)
            .inspect_err(|e| warn!("update failed: {}", e))?;
        match self.records.iter().position(|r| r.id == id) {
            Some(i) => self.records[i].merge(&partial),
            None => {
                warn!(id, "updated record was not loaded, reloading collection");
                self.load(&*store)?;
            }
        }
        Ok(())
    }

    pub fn update_from_input(
        &mut self,
        store: &mut dyn RecordStore,
        id: &str,
        input: &[(&str, &str)],
    ) -> Result<(), SessionError> {
        let partial = self.schema.coerce_input(input.iter().copied())?;
        self.update(store, id, partial)
    }

    #[instrument(skip(self, store), fields(collection = self.schema.collection))]
    pub fn delete(&mut self, store: &mut dyn RecordStore, id: &str) -> Result<(), SessionError> {
        store
            .delete(self.schema.collection, id)
            .inspect_err(|e| warn!("delete failed: {}", e))?;
        self.records.retain(|r| r.id != id);
        Ok(())
    }

    /// Parse `text` and hand every accepted row to the store in one batch.
    /// A refused batch is reported, not returned as an error.
    #[instrument(skip(self, store, text), fields(collection = self.schema.collection))]
    pub fn import(
        &mut self,
        store: &mut dyn RecordStore,
        text: &str,
        options: ImportOptions,
    ) -> ImportReport {
        let batch = parse_delimited(self.schema, text, options);
        let mut report = ImportReport {
            dropped: batch.dropped.len(),
            ..ImportReport::default()
        };
        let rows = batch.records;
        let attempted = rows.len();

        if attempted > 0 {
            let before = self.records.len();
            match store.create_many(self.schema.collection, rows.clone()) {
                Ok(ids) => {
                    report.created = ids.len();
                    self.records
                        .extend(ids.into_iter().zip(rows).map(|(id, fields)| Record::new(id, fields)));
                }
                Err(e) => {
                    warn!("import batch not stored: {}", e);
                    report.message = Some(e.to_string());
                    // A non-atomic store may have kept a prefix of the batch.
                    if let Err(e) = self.load(&*store) {
                        warn!("reload after failed import: {}", e);
                    }
                    report.created = self.records.len().saturating_sub(before).min(attempted);
                    report.failed = attempted - report.created;
                }
            }
        }

        report.ok = report.failed == 0;
        info!(
            created = report.created,
            dropped = report.dropped,
            failed = report.failed,
            "import finished"
        );
        report
    }

    /// Number of pages under the current filter.
    pub fn total_pages(&self) -> Result<usize, SchemaError> {
        let spec = self.view.filter_spec(self.schema)?;
        let matched = filter(&self.records, &spec).len();
        Ok(total_pages(matched, self.options.page_size))
    }

    pub fn next_page(&mut self) -> Result<usize, SchemaError> {
        let total = self.total_pages()?;
        self.view.next_page(total);
        debug!(page = self.view.current_page, total, "next page");
        Ok(self.view.current_page)
    }

    pub fn prev_page(&mut self) -> usize {
        self.view.prev_page();
        self.view.current_page
    }

    pub fn derive(&self) -> Result<DerivedView<'_>, SchemaError> {
        derive(self.schema, &self.records, &self.view, &self.options)
    }

    pub fn render_page(&self) -> Result<Page<&Record>, SchemaError> {
        Ok(self.derive()?.page)
    }

    pub fn render_aggregates(&self) -> Result<AggregateSnapshot, SchemaError> {
        Ok(self.derive()?.aggregates)
    }

    pub fn render_charts(&self) -> Result<Vec<Chart>, SchemaError> {
        Ok(self.derive()?.charts)
    }
}
