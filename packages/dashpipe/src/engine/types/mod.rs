mod record;
mod schema;
mod value;

pub use record::{Fields, Record, RecordId};
pub use schema::{
    Field, FieldDef, FieldKind, LegacyFallback, Schema, SchemaError, ACADEMIC_DESCRIPTION_LABELS,
    ASSESSMENT_SCHEMA, CASE_SCHEMA, IQ_LABELS, SCHOOL_TYPE_LABELS, SEX_LABELS,
    SOCIO_ECONOMIC_LABELS, STUDY_HABIT_LABELS,
};
pub use value::{Value, DATE_FORMAT};

use rustc_hash::FxHasher;
use std::hash::BuildHasherDefault;

pub type FastMap<K, V> = std::collections::HashMap<K, V, BuildHasherDefault<FxHasher>>;
