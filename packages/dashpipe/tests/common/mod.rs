//! Shared builders for dashpipe integration tests.
//!
//! Records are written as JSON (the way a store hands them back) and run
//! through the schema's normalization, so tests see exactly what a loaded
//! session would.

#![allow(dead_code)]

use dashpipe::{Fields, Record, Schema, Value, ASSESSMENT_SCHEMA, CASE_SCHEMA};
use serde_json::{json, Value as JsonValue};
use smol_str::SmolStr;
use ulid::Ulid;

/// Generate a unique ID using ULID (matches store id format)
pub fn generate_id() -> String {
    Ulid::new().to_string()
}

/// Turn a JSON object into normalized record fields.
pub fn fields_from_json(schema: &'static Schema, value: JsonValue) -> Fields {
    let JsonValue::Object(map) = value else {
        panic!("expected a JSON object, got {value}");
    };
    let raw: Fields = map
        .into_iter()
        .map(|(k, v)| (SmolStr::new(k), Value::from(v)))
        .collect();
    schema.normalize(raw)
}

pub fn record(schema: &'static Schema, id: &str, value: JsonValue) -> Record {
    Record::new(id, fields_from_json(schema, value))
}

/// Create a case record (location, cases, deaths, date, region)
pub fn make_case(id: &str, location: &str, cases: i64, deaths: i64, date: &str, region: &str) -> Record {
    record(
        &CASE_SCHEMA,
        id,
        json!({
            "location": location,
            "cases": cases,
            "deaths": deaths,
            "date": date,
            "regions": region,
        }),
    )
}

/// Create a student record with the fields most tests care about
pub fn make_student(id: &str, first: &str, last: &str, age: i64, performance: f64, nat: f64) -> Record {
    record(
        &ASSESSMENT_SCHEMA,
        id,
        json!({
            "firstName": first,
            "lastName": last,
            "age": age,
            "sex": if id.len() % 2 == 0 { "Female" } else { "Male" },
            "ethnic": "Iliganon",
            "academicPerformance": performance,
            "academicDescription": "Satisfactory",
            "iq": "Average",
            "typeOfSchool": "Public",
            "socioEconomicStatus": "On poverty line",
            "studyHabit": "Good",
            "natResults": nat,
        }),
    )
}

/// `n` case records cycling through a handful of locations and regions.
pub fn case_fixture(n: usize) -> Vec<Record> {
    const LOCATIONS: &[(&str, &str)] = &[
        ("Iligan", "Region X"),
        ("Cagayan de Oro", "Region X"),
        ("Butuan", "Caraga"),
        ("Davao", "Region XI"),
        ("Cebu", "Region VII"),
    ];
    (0..n)
        .map(|i| {
            let (location, region) = LOCATIONS[i % LOCATIONS.len()];
            make_case(
                &format!("case{i:04}"),
                location,
                (i as i64 * 37) % 250,
                (i as i64 * 7) % 5,
                &format!("2024-{:02}-{:02}", (i % 12) + 1, (i % 28) + 1),
                region,
            )
        })
        .collect()
}

pub fn ids(rows: &[&Record]) -> Vec<String> {
    rows.iter().map(|r| r.id.to_string()).collect()
}
