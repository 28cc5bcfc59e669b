//! Bulk import from delimited text.
//!
//! Rows map fixed column positions to field names (see
//! [`Schema::import_columns`]). Rows that are too short or whose typed
//! columns do not parse are dropped, never partially imported.

use crate::engine::types::{Fields, Schema, SchemaError};
use smol_str::SmolStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportOptions {
    pub delimiter: char,
    /// Drop the first line.
    pub has_header: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            has_header: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropReason {
    TooFewColumns { found: usize, required: usize },
    Coercion(SchemaError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    /// 1-based line number in the input.
    pub line: usize,
    pub reason: DropReason,
}

/// Candidate records ready to be sent to a store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportBatch {
    pub records: Vec<Fields>,
    pub dropped: Vec<DroppedRow>,
}

pub fn parse_delimited(schema: &'static Schema, text: &str, options: ImportOptions) -> ImportBatch {
    let mut batch = ImportBatch::default();
    let skip = usize::from(options.has_header);

    for (idx, line) in text.split('\n').enumerate().skip(skip) {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let cols: Vec<&str> = line.split(options.delimiter).map(str::trim).collect();
        if cols.len() < schema.import_min_columns {
            batch.dropped.push(DroppedRow {
                line: line_no,
                reason: DropReason::TooFewColumns {
                    found: cols.len(),
                    required: schema.import_min_columns,
                },
            });
            continue;
        }

        let pairs = schema.import_columns.iter().copied().zip(cols.iter().copied());
        match schema.coerce_input(pairs) {
            Ok(fields) => batch.records.push(fields),
            Err(e) => {
                warn!(line = line_no, error = %e, "dropping import row");
                batch.dropped.push(DroppedRow {
                    line: line_no,
                    reason: DropReason::Coercion(e),
                });
            }
        }
    }

    debug!(
        collection = schema.collection,
        accepted = batch.records.len(),
        dropped = batch.dropped.len(),
        "parsed import"
    );
    batch
}

/// Field name of each column, in import order. Handy for headers.
pub fn import_header(schema: &Schema) -> Vec<SmolStr> {
    schema.import_columns.iter().map(|c| SmolStr::new(*c)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Value, ASSESSMENT_SCHEMA, CASE_SCHEMA};

    #[test]
    fn test_header_dropped_and_columns_mapped() {
        let text = "location,cases,deaths,date,regions\nIligan, 12 ,1,2024-01-05,Region X\n";
        let batch = parse_delimited(&CASE_SCHEMA, text, ImportOptions::default());
        assert_eq!(batch.records.len(), 1);
        let row = &batch.records[0];
        assert_eq!(row["location"], Value::Text("Iligan".into()));
        assert_eq!(row["cases"], Value::Integer(12));
        assert_eq!(row["regions"], Value::Text("Region X".into()));
        // blank lines are skipped, not dropped
        assert!(batch.dropped.is_empty());
    }

    #[test]
    fn test_short_rows_dropped() {
        let text = "h\nIligan,12,1\nCebu,3,0,2024-02-01,Region VII";
        let batch = parse_delimited(&CASE_SCHEMA, text, ImportOptions::default());
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.dropped[0].line, 2);
        assert_eq!(
            batch.dropped[0].reason,
            DropReason::TooFewColumns { found: 3, required: 5 }
        );
    }

    #[test]
    fn test_unparseable_numbers_dropped() {
        let text = "h\nIligan,many,1,2024-01-05,Region X";
        let batch = parse_delimited(&CASE_SCHEMA, text, ImportOptions::default());
        assert!(batch.records.is_empty());
        assert!(matches!(batch.dropped[0].reason, DropReason::Coercion(_)));
    }

    #[test]
    fn test_assessment_last_name_first() {
        let text = "respondent,first,age,sex,ethnic,ap,desc,iq,school,ses,habit,nat\n\
                    Nemeno,Jason,10,Male,Iliganon,95,Outstanding,High,Public,On poverty line,Excellent,92";
        let batch = parse_delimited(&ASSESSMENT_SCHEMA, text, ImportOptions::default());
        assert_eq!(batch.records.len(), 1);
        let row = &batch.records[0];
        assert_eq!(row["lastName"], Value::Text("Nemeno".into()));
        assert_eq!(row["firstName"], Value::Text("Jason".into()));
        assert_eq!(row["natResults"], Value::Decimal(92.0));
        assert_eq!(row["socioEconomicStatus"], Value::Category("On poverty line".into()));
    }

    #[test]
    fn test_no_header_option() {
        let text = "Iligan,12,1,2024-01-05,Region X";
        let options = ImportOptions {
            has_header: false,
            ..ImportOptions::default()
        };
        assert_eq!(parse_delimited(&CASE_SCHEMA, text, options).records.len(), 1);
        assert_eq!(import_header(&CASE_SCHEMA)[0], "location");
    }
}
