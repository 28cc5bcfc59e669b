use crate::engine::eval::contains_folded;
use crate::engine::types::{Field, Record, Schema, SchemaError};
use smallvec::SmallVec;
use smol_str::SmolStr;

/// One filter condition over a record. Needles are stored lower-cased.
#[derive(Debug, Clone, PartialEq)]
pub enum Clause {
    /// Field text contains the needle, case-insensitive.
    Contains { field: Field, needle: SmolStr },
    /// The space-joined concatenation of several fields contains the needle.
    JoinedContains {
        fields: SmallVec<[Field; 2]>,
        needle: SmolStr,
    },
    /// Field text equals the value exactly (e.g. age `"10"`).
    Equals { field: Field, value: SmolStr },
}

impl Clause {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Clause::Contains { field, needle } => contains_folded(record.value(field.name), needle),
            Clause::JoinedContains { fields, needle } => {
                let joined = fields
                    .iter()
                    .map(|f| record.text(f.name))
                    .collect::<Vec<_>>()
                    .join(" ");
                joined.to_lowercase().contains(needle.as_str())
            }
            Clause::Equals { field, value } => record.text(field.name) == value.as_str(),
        }
    }
}

/// A conjunction of clauses. An empty spec matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    clauses: SmallVec<[Clause; 3]>,
}

impl FilterSpec {
    /// The no-op filter.
    pub fn all() -> Self {
        Self::default()
    }

    /// Generic field filter. An empty field name or an empty needle yields
    /// the no-op filter; any other field name must exist in `schema`.
    pub fn field_contains(
        schema: &'static Schema,
        field: &str,
        needle: &str,
    ) -> Result<Self, SchemaError> {
        Self::all().and_contains(schema, field, needle)
    }

    pub fn and_contains(
        mut self,
        schema: &'static Schema,
        field: &str,
        needle: &str,
    ) -> Result<Self, SchemaError> {
        if field.is_empty() || needle.is_empty() {
            return Ok(self);
        }
        let field = schema.field(field)?;
        self.clauses.push(Clause::Contains {
            field,
            needle: SmolStr::new(needle.to_lowercase()),
        });
        Ok(self)
    }

    /// "Name contains" over the schema's name fields. Empty needles are
    /// ignored.
    pub fn and_name_contains(
        mut self,
        schema: &'static Schema,
        needle: &str,
    ) -> Result<Self, SchemaError> {
        if needle.is_empty() {
            return Ok(self);
        }
        if schema.name_fields.is_empty() {
            return Err(SchemaError::NoNameFields(schema.collection.to_string()));
        }
        let fields = schema
            .name_fields
            .iter()
            .map(|name| schema.field(name))
            .collect::<Result<SmallVec<[Field; 2]>, _>>()?;
        self.clauses.push(Clause::JoinedContains {
            fields,
            needle: SmolStr::new(needle.to_lowercase()),
        });
        Ok(self)
    }

    /// Exact match on the text rendering of `field`. Empty values are
    /// ignored.
    pub fn and_equals(
        mut self,
        schema: &'static Schema,
        field: &str,
        value: &str,
    ) -> Result<Self, SchemaError> {
        if field.is_empty() || value.is_empty() {
            return Ok(self);
        }
        let field = schema.field(field)?;
        self.clauses.push(Clause::Equals {
            field,
            value: SmolStr::new(value),
        });
        Ok(self)
    }

    pub fn is_noop(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    #[inline]
    pub fn matches(&self, record: &Record) -> bool {
        self.clauses.iter().all(|c| c.matches(record))
    }
}

/// Order-preserving filter. Never touches the records themselves.
pub fn filter<'a, I>(records: I, spec: &FilterSpec) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    if spec.is_noop() {
        return records.into_iter().collect();
    }
    records.into_iter().filter(|r| spec.matches(r)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Fields, Value, ASSESSMENT_SCHEMA, CASE_SCHEMA};

    fn student(id: &str, first: &str, last: &str, age: i64) -> Record {
        let mut fields = Fields::default();
        fields.insert("firstName".into(), Value::Text(first.into()));
        fields.insert("lastName".into(), Value::Text(last.into()));
        fields.insert("age".into(), Value::Integer(age));
        Record::new(id, fields)
    }

    fn students() -> Vec<Record> {
        vec![
            student("s1", "Jason", "Nemeno", 10),
            student("s2", "Andrew", "Nemeno", 11),
            student("s3", "Maria", "Santos", 10),
        ]
    }

    fn ids(rows: &[&Record]) -> Vec<String> {
        rows.iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_empty_field_or_needle_is_noop() {
        let data = students();
        assert!(FilterSpec::field_contains(&ASSESSMENT_SCHEMA, "", "x").unwrap().is_noop());
        assert!(FilterSpec::field_contains(&ASSESSMENT_SCHEMA, "lastName", "").unwrap().is_noop());
        let all = filter(&data, &FilterSpec::all());
        assert_eq!(ids(&all), vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_unknown_field_fails_fast() {
        let err = FilterSpec::field_contains(&CASE_SCHEMA, "lastName", "x").unwrap_err();
        assert!(matches!(err, SchemaError::UnknownField { .. }));
    }

    #[test]
    fn test_case_insensitive_substring() {
        let data = students();
        let spec = FilterSpec::field_contains(&ASSESSMENT_SCHEMA, "lastName", "NEM").unwrap();
        assert_eq!(ids(&filter(&data, &spec)), vec!["s1", "s2"]);
    }

    #[test]
    fn test_numeric_field_matches_as_text() {
        let data = students();
        let spec = FilterSpec::field_contains(&ASSESSMENT_SCHEMA, "age", "1").unwrap();
        assert_eq!(ids(&filter(&data, &spec)), vec!["s1", "s2", "s3"]);
    }

    #[test]
    fn test_name_filter_spans_both_parts() {
        let data = students();
        let spec = FilterSpec::all()
            .and_name_contains(&ASSESSMENT_SCHEMA, "jason nem")
            .unwrap();
        assert_eq!(ids(&filter(&data, &spec)), vec!["s1"]);
    }

    #[test]
    fn test_name_filter_needs_name_fields() {
        let err = FilterSpec::all().and_name_contains(&CASE_SCHEMA, "x").unwrap_err();
        assert_eq!(err, SchemaError::NoNameFields("dengueData".into()));
    }

    #[test]
    fn test_composite_filters_are_anded() {
        let data = students();
        let spec = FilterSpec::field_contains(&ASSESSMENT_SCHEMA, "lastName", "nemeno")
            .unwrap()
            .and_equals(&ASSESSMENT_SCHEMA, "age", "10")
            .unwrap();
        assert_eq!(ids(&filter(&data, &spec)), vec!["s1"]);
    }

    #[test]
    fn test_exact_is_not_substring() {
        let data = students();
        let spec = FilterSpec::all().and_equals(&ASSESSMENT_SCHEMA, "age", "1").unwrap();
        assert!(filter(&data, &spec).is_empty());
    }

    #[test]
    fn test_missing_field_does_not_match() {
        let mut data = students();
        data.push(Record::new("s4", Fields::default()));
        let spec = FilterSpec::field_contains(&ASSESSMENT_SCHEMA, "lastName", "a").unwrap();
        assert_eq!(ids(&filter(&data, &spec)), vec!["s3"]);
    }
}
