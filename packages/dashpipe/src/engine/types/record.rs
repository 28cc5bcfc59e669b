use super::value::Value;
use indexmap::IndexMap;
use serde::Serialize;
use smol_str::SmolStr;
use std::borrow::Cow;

/// Store-assigned record identifier. Opaque to the pipeline.
pub type RecordId = SmolStr;

/// Field name -> value, in insertion order.
pub type Fields = IndexMap<SmolStr, Value>;

static ABSENT: Value = Value::Null;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, fields: Fields) -> Self {
        Self { id: id.into(), fields }
    }

    /// Field access that never fails: missing fields are `None`.
    #[inline]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Like [`Record::get`] but yields `Value::Null` for missing fields.
    #[inline]
    pub fn value(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&ABSENT)
    }

    pub fn text(&self, field: &str) -> Cow<'_, str> {
        self.value(field).to_text()
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.value(field).as_f64()
    }

    /// Merge a partial update into this record. The id never changes.
    pub fn merge(&mut self, partial: &Fields) {
        for (name, value) in partial {
            self.fields.insert(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        let mut fields = Fields::default();
        fields.insert("location".into(), Value::Text("Iligan".into()));
        fields.insert("cases".into(), Value::Integer(12));
        Record::new("rec1", fields)
    }

    #[test]
    fn test_missing_field_is_absent() {
        let r = record();
        assert!(r.get("regions").is_none());
        assert!(r.value("regions").is_null());
        assert_eq!(r.text("regions"), "");
        assert_eq!(r.number("regions"), None);
    }

    #[test]
    fn test_accessors() {
        let r = record();
        assert_eq!(r.text("location"), "Iligan");
        assert_eq!(r.number("cases"), Some(12.0));
        assert_eq!(r.number("location"), None);
    }

    #[test]
    fn test_merge_keeps_id_and_order() {
        let mut r = record();
        let mut partial = Fields::default();
        partial.insert("cases".into(), Value::Integer(20));
        partial.insert("regions".into(), Value::Text("Region X".into()));
        r.merge(&partial);

        assert_eq!(r.id, "rec1");
        assert_eq!(r.number("cases"), Some(20.0));
        let names: Vec<&str> = r.fields.keys().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["location", "cases", "regions"]);
    }

    #[test]
    fn test_serializes_flat() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json, serde_json::json!({"id": "rec1", "location": "Iligan", "cases": 12}));
    }
}
