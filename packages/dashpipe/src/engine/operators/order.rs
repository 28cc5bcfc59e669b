use crate::engine::eval::compare_records;
use crate::engine::types::{Field, Record, Schema, SchemaError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Keep input order.
    #[default]
    Unsorted,
    Ascending,
    Descending,
}

/// A validated sort key. Without a key, or with `Unsorted`, input order is
/// kept.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SortSpec {
    pub key: Option<Field>,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(
        schema: &'static Schema,
        key: &str,
        direction: SortDirection,
    ) -> Result<Self, SchemaError> {
        Ok(Self {
            key: Some(schema.field(key)?),
            direction,
        })
    }
}

/// Stable sort on one field. Ties keep their input order in both
/// directions, so descending is the comparator reversed rather than the
/// ascending output reversed.
pub fn sort<'a, I>(records: I, spec: &SortSpec) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut rows: Vec<&'a Record> = records.into_iter().collect();
    let Some(field) = spec.key else {
        return rows;
    };

    match spec.direction {
        SortDirection::Unsorted => {}
        SortDirection::Ascending => rows.sort_by(|a, b| compare_records(a, b, field.name)),
        SortDirection::Descending => {
            rows.sort_by(|a, b| compare_records(a, b, field.name).reverse())
        }
    }
    rows
}
