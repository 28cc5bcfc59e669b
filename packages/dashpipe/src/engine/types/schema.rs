//! Closed field schemas for the two record collections.
//!
//! Filters, sorts and aggregations name fields dynamically, so every field
//! name coming from the outside is validated here first. Coercion of raw
//! (string-typed) input into typed values also lives here, at the boundary.

use super::record::Fields;
use super::value::{Value, DATE_FORMAT};
use chrono::NaiveDate;
use smol_str::SmolStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Text,
    Integer,
    Decimal,
    Date,
    /// Enumerated category with its canonical label order.
    Category(&'static [&'static str]),
}

#[derive(Debug, PartialEq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// A validated field reference. Only obtainable through [`Schema::field`].
pub type Field = &'static FieldDef;

/// Older records stored `field` under `legacy` instead.
#[derive(Debug)]
pub struct LegacyFallback {
    pub field: &'static str,
    pub legacy: &'static str,
}

#[derive(Debug)]
pub struct Schema {
    pub collection: &'static str,
    pub fields: &'static [FieldDef],
    /// Field name for each column position of a bulk-import row.
    pub import_columns: &'static [&'static str],
    pub import_min_columns: usize,
    pub legacy_fallbacks: &'static [LegacyFallback],
    /// Fields joined (space-separated) by the "name contains" filter.
    pub name_fields: &'static [&'static str],
    /// Field naming the region a record belongs to, for map shading.
    pub region_field: Option<&'static str>,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("unknown field '{field}' for collection '{collection}'")]
    UnknownField { collection: String, field: String },

    #[error("unknown collection '{0}'")]
    UnknownCollection(String),

    #[error("field '{field}' expects {expected}, got '{raw}'")]
    Coercion {
        field: String,
        expected: &'static str,
        raw: String,
    },

    #[error("field '{0}' is not numeric")]
    NotNumeric(String),

    #[error("collection '{0}' has no name fields")]
    NoNameFields(String),
}

pub const SEX_LABELS: &[&str] = &["Male", "Female"];
pub const ACADEMIC_DESCRIPTION_LABELS: &[&str] = &[
    "Excellent",
    "Outstanding",
    "Very Satisfactory",
    "Satisfactory",
    "Fairly Satisfactory",
    "Did not meet expectations",
];
pub const IQ_LABELS: &[&str] = &["High", "Average", "Low"];
pub const SCHOOL_TYPE_LABELS: &[&str] = &["Public", "Private"];
pub const SOCIO_ECONOMIC_LABELS: &[&str] = &[
    "Above poverty line",
    "On poverty line",
    "Below poverty line",
];
pub const STUDY_HABIT_LABELS: &[&str] = &["Excellent", "Good", "Poor"];

pub static CASE_SCHEMA: Schema = Schema {
    collection: "dengueData",
    fields: &[
        FieldDef { name: "location", kind: FieldKind::Text },
        FieldDef { name: "cases", kind: FieldKind::Integer },
        FieldDef { name: "deaths", kind: FieldKind::Integer },
        FieldDef { name: "date", kind: FieldKind::Date },
        FieldDef { name: "regions", kind: FieldKind::Text },
    ],
    import_columns: &["location", "cases", "deaths", "date", "regions"],
    import_min_columns: 5,
    legacy_fallbacks: &[],
    name_fields: &[],
    region_field: Some("regions"),
};

pub static ASSESSMENT_SCHEMA: Schema = Schema {
    collection: "studentData",
    fields: &[
        FieldDef { name: "firstName", kind: FieldKind::Text },
        FieldDef { name: "lastName", kind: FieldKind::Text },
        FieldDef { name: "age", kind: FieldKind::Integer },
        FieldDef { name: "sex", kind: FieldKind::Category(SEX_LABELS) },
        FieldDef { name: "ethnic", kind: FieldKind::Text },
        FieldDef { name: "academicPerformance", kind: FieldKind::Decimal },
        FieldDef {
            name: "academicDescription",
            kind: FieldKind::Category(ACADEMIC_DESCRIPTION_LABELS),
        },
        FieldDef { name: "iq", kind: FieldKind::Category(IQ_LABELS) },
        FieldDef { name: "typeOfSchool", kind: FieldKind::Category(SCHOOL_TYPE_LABELS) },
        FieldDef {
            name: "socioEconomicStatus",
            kind: FieldKind::Category(SOCIO_ECONOMIC_LABELS),
        },
        FieldDef { name: "studyHabit", kind: FieldKind::Category(STUDY_HABIT_LABELS) },
        FieldDef { name: "natResults", kind: FieldKind::Decimal },
    ],
    // The export this mapping was written for puts the respondent (last
    // name) first and the first name second.
    import_columns: &[
        "lastName",
        "firstName",
        "age",
        "sex",
        "ethnic",
        "academicPerformance",
        "academicDescription",
        "iq",
        "typeOfSchool",
        "socioEconomicStatus",
        "studyHabit",
        "natResults",
    ],
    import_min_columns: 12,
    legacy_fallbacks: &[LegacyFallback { field: "lastName", legacy: "respondent" }],
    name_fields: &["firstName", "lastName"],
    region_field: None,
};

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer | FieldKind::Decimal)
    }

    fn expected(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "an integer",
            FieldKind::Decimal => "a number",
            FieldKind::Date => "a YYYY-MM-DD date",
            FieldKind::Category(_) => "a category",
        }
    }

    /// Strict coercion of raw form/import input. Returns `None` when the
    /// input does not fit the kind.
    pub fn coerce(&self, raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        match self {
            FieldKind::Text => Some(Value::Text(SmolStr::new(raw))),
            FieldKind::Category(_) => Some(Value::Category(SmolStr::new(trimmed))),
            FieldKind::Integer => {
                if let Ok(i) = trimmed.parse::<i64>() {
                    return Some(Value::Integer(i));
                }
                let d = trimmed.parse::<f64>().ok().filter(|d| d.is_finite())?;
                // i64::MAX as f64 rounds up to 2^63, which is already out of range
                let in_range = d >= i64::MIN as f64 && d < i64::MAX as f64;
                (d.fract() == 0.0 && in_range).then(|| Value::Integer(d as i64))
            }
            FieldKind::Decimal => trimmed
                .parse::<f64>()
                .ok()
                .filter(|d| d.is_finite())
                .map(Value::Decimal),
            FieldKind::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .map(Value::Date),
        }
    }

    /// Lenient normalization of a value read back from the store. Values
    /// that cannot be coerced are kept as they are.
    pub fn normalize(&self, value: Value) -> Value {
        match (self, value) {
            (_, Value::Null) => Value::Null,
            (FieldKind::Integer, Value::Decimal(d)) if d.fract() == 0.0 => Value::Integer(d as i64),
            (FieldKind::Decimal, Value::Integer(i)) => Value::Decimal(i as f64),
            (FieldKind::Category(_), Value::Text(s)) => Value::Category(s),
            (FieldKind::Text, Value::Category(s)) => Value::Text(s),
            (FieldKind::Integer | FieldKind::Decimal | FieldKind::Date, Value::Text(s)) => {
                self.coerce(&s).unwrap_or(Value::Text(s))
            }
            (_, other) => other,
        }
    }
}

impl Schema {
    pub fn by_collection(name: &str) -> Result<&'static Schema, SchemaError> {
        [&CASE_SCHEMA, &ASSESSMENT_SCHEMA]
            .into_iter()
            .find(|s| s.collection.eq_ignore_ascii_case(name))
            .ok_or_else(|| SchemaError::UnknownCollection(name.to_string()))
    }

    /// Validate a field name against this schema's closed field list.
    pub fn field(&'static self, name: &str) -> Result<Field, SchemaError> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SchemaError::UnknownField {
                collection: self.collection.to_string(),
                field: name.to_string(),
            })
    }

    /// Like [`Schema::field`] but additionally requires a numeric kind.
    pub fn numeric_field(&'static self, name: &str) -> Result<Field, SchemaError> {
        let field = self.field(name)?;
        if field.kind.is_numeric() {
            Ok(field)
        } else {
            Err(SchemaError::NotNumeric(name.to_string()))
        }
    }

    /// Coerce one raw input value for `name`.
    pub fn coerce(&'static self, name: &str, raw: &str) -> Result<Value, SchemaError> {
        let field = self.field(name)?;
        field.kind.coerce(raw).ok_or_else(|| SchemaError::Coercion {
            field: name.to_string(),
            expected: field.kind.expected(),
            raw: raw.to_string(),
        })
    }

    /// Turn raw `(field, text)` form input into typed fields.
    pub fn coerce_input<'a>(
        &'static self,
        input: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Fields, SchemaError> {
        input
            .into_iter()
            .map(|(name, raw)| Ok((SmolStr::new(name), self.coerce(name, raw)?)))
            .collect()
    }

    /// Apply legacy fallbacks and type normalization to a record as read
    /// from the store. Fields outside the schema are carried along untouched.
    pub fn normalize(&self, mut fields: Fields) -> Fields {
        for fallback in self.legacy_fallbacks {
            let missing = fields
                .get(fallback.field)
                .map_or(true, |v| v.to_text().is_empty());
            if !missing {
                continue;
            }
            if let Some(legacy) = fields.get(fallback.legacy).filter(|v| !v.to_text().is_empty()) {
                let legacy = legacy.clone();
                fields.insert(SmolStr::new(fallback.field), legacy);
            }
        }

        for def in self.fields {
            if let Some(value) = fields.get_mut(def.name) {
                *value = def.kind.normalize(std::mem::take(value));
            }
        }
        fields
    }
}
