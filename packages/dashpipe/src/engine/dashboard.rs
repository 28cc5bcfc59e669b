//! The fixed dashboards of the two collections: which figures and which
//! charts each one shows, built from the generic aggregation and chart
//! primitives.

use crate::engine::aggregate::{self, AggregateSnapshot, Metric};
use crate::engine::chart::{self, Chart, ChartKind, ColorRamp, RegionShade};
use crate::engine::types::{
    Record, Schema, SchemaError, ACADEMIC_DESCRIPTION_LABELS, SOCIO_ECONOMIC_LABELS,
    STUDY_HABIT_LABELS,
};

/// Which records a dashboard's charts are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartSource {
    /// The whole collection, ignoring the table filter.
    Full,
    /// Only the records passing the current filter, in table order.
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Cases,
    Assessments,
}

impl Dashboard {
    pub fn for_schema(schema: &Schema) -> Result<Self, SchemaError> {
        match schema.collection {
            "dengueData" => Ok(Dashboard::Cases),
            "studentData" => Ok(Dashboard::Assessments),
            other => Err(SchemaError::UnknownCollection(other.to_string())),
        }
    }

    pub fn chart_source(self) -> ChartSource {
        match self {
            Dashboard::Cases => ChartSource::Filtered,
            Dashboard::Assessments => ChartSource::Full,
        }
    }

    /// Summary cards, always over the full collection.
    pub fn snapshot(
        self,
        schema: &'static Schema,
        records: &[Record],
    ) -> Result<AggregateSnapshot, SchemaError> {
        let snap = match self {
            Dashboard::Cases => AggregateSnapshot::default()
                .with("total_entries", Metric::Count(aggregate::count(records)))
                .with(
                    "total_cases",
                    Metric::Scalar(aggregate::sum(records, schema.numeric_field("cases")?)),
                )
                .with(
                    "total_deaths",
                    Metric::Scalar(aggregate::sum(records, schema.numeric_field("deaths")?)),
                ),
            Dashboard::Assessments => {
                let sex = schema.field("sex")?;
                AggregateSnapshot::default()
                    .with("total_students", Metric::Count(aggregate::count(records)))
                    .with("female", Metric::Count(aggregate::count_where(records, sex, "Female")))
                    .with("male", Metric::Count(aggregate::count_where(records, sex, "Male")))
                    .with(
                        "average_academic_performance",
                        Metric::Scalar(aggregate::mean(
                            records,
                            schema.numeric_field("academicPerformance")?,
                        )),
                    )
                    .with(
                        "academic_description",
                        Metric::Distribution(aggregate::histogram(
                            records,
                            schema.field("academicDescription")?,
                            ACADEMIC_DESCRIPTION_LABELS,
                        )),
                    )
                    .with(
                        "socio_economic_status",
                        Metric::Distribution(aggregate::histogram(
                            records,
                            schema.field("socioEconomicStatus")?,
                            SOCIO_ECONOMIC_LABELS,
                        )),
                    )
            }
        };
        Ok(snap)
    }

    /// Chart set for this dashboard. `full` is the collection in store
    /// order, `filtered` the filtered (and sorted) table rows; which one is
    /// drawn follows [`Dashboard::chart_source`].
    pub fn charts(
        self,
        schema: &'static Schema,
        full: &[Record],
        filtered: &[&Record],
    ) -> Result<Vec<Chart>, SchemaError> {
        match self {
            Dashboard::Cases => case_charts(schema, filtered.iter().copied()),
            Dashboard::Assessments => assessment_charts(schema, full),
        }
    }

    /// Highest-ranked records, for dashboards that show a leaderboard.
    pub fn leaders<'a>(
        self,
        schema: &'static Schema,
        records: &'a [Record],
        n: usize,
    ) -> Result<Vec<&'a Record>, SchemaError> {
        match self {
            Dashboard::Cases => Ok(Vec::new()),
            Dashboard::Assessments => Ok(aggregate::top_n(
                records,
                schema.numeric_field("natResults")?,
                n,
            )),
        }
    }

    /// Map shading by region, for dashboards whose schema carries regions.
    pub fn regions(
        self,
        schema: &'static Schema,
        records: &[Record],
        ramp: &ColorRamp,
    ) -> Result<Vec<RegionShade>, SchemaError> {
        match (self, schema.region_field) {
            (Dashboard::Cases, Some(region)) => Ok(chart::region_shading(
                records,
                schema.field(region)?,
                schema.numeric_field("cases")?,
                &[schema.numeric_field("deaths")?],
                ramp,
            )),
            _ => Ok(Vec::new()),
        }
    }
}

fn case_charts<'a, I>(schema: &'static Schema, rows: I) -> Result<Vec<Chart>, SchemaError>
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let location = schema.field("location")?;
    let date = schema.field("date")?;
    let cases = schema.numeric_field("cases")?;
    let deaths = schema.numeric_field("deaths")?;
    let both = [("Cases", cases), ("Deaths", deaths)];

    Ok(vec![
        chart::per_record_series(
            "Cases and deaths by location",
            ChartKind::Bar,
            rows.clone(),
            location,
            &both,
        ),
        chart::per_record_series("Cases and deaths over time", ChartKind::Line, rows.clone(), date, &both),
        chart::scatter("Cases vs deaths", "Cases vs Deaths", rows.clone(), cases, deaths),
        chart::heatmap("Dengue cases heatmap", rows, date, location, cases),
    ])
}

fn assessment_charts(schema: &'static Schema, records: &[Record]) -> Result<Vec<Chart>, SchemaError> {
    let academic = schema.numeric_field("academicPerformance")?;
    let nat = schema.numeric_field("natResults")?;
    let age = schema.numeric_field("age")?;
    let iq = schema.field("iq")?;
    let habit = schema.field("studyHabit")?;

    let by_iq = chart::category_values(
        "Academic performance by IQ level",
        records,
        iq,
        schema.field("typeOfSchool")?,
        academic,
        "Type of School",
    )
    .absorb(chart::category_values(
        "",
        records,
        iq,
        schema.field("socioEconomicStatus")?,
        academic,
        "Socio-Economic Status",
    ))
    .absorb(chart::category_values("", records, iq, habit, academic, "Study Habit"));

    let descriptions = aggregate::histogram(
        records,
        schema.field("academicDescription")?,
        ACADEMIC_DESCRIPTION_LABELS,
    );
    let ethnic = aggregate::value_counts(records, schema.field("ethnic")?);

    Ok(vec![
        chart::scatter(
            "NAT results vs academic performance",
            "NAT Results vs Academic Performance",
            records,
            academic,
            nat,
        ),
        by_iq,
        chart::category_counts(
            "Academic performance categories",
            ChartKind::Doughnut,
            "Distribution of Academic Performance Categories",
            &descriptions,
        ),
        chart::group_means(
            "Study habits",
            ChartKind::Radar,
            records,
            habit,
            &[("Academic Performance", academic), ("NAT Results", nat)],
            STUDY_HABIT_LABELS,
        ),
        chart::category_counts("Ethnic distribution", ChartKind::Pie, "Ethnic Categories", &ethnic),
        chart::per_record_histogram("NAT results", "NAT Results", records, nat),
        chart::per_record_histogram("Academic performance", "Academic Performance", records, academic),
        chart::per_record_histogram("Age", "Age", records, age),
        chart::grouped_values(
            "NAT results by study habit",
            records,
            habit,
            nat,
            STUDY_HABIT_LABELS,
            "NAT Results",
        ),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::{Fields, Value, ASSESSMENT_SCHEMA, CASE_SCHEMA};
    use smol_str::SmolStr;

    fn rec(id: &str, pairs: &[(&str, Value)]) -> Record {
        let fields: Fields = pairs
            .iter()
            .map(|(k, v)| (SmolStr::new(*k), v.clone()))
            .collect();
        Record::new(id, fields)
    }

    #[test]
    fn test_for_schema() {
        assert_eq!(Dashboard::for_schema(&CASE_SCHEMA).unwrap(), Dashboard::Cases);
        assert_eq!(Dashboard::for_schema(&ASSESSMENT_SCHEMA).unwrap(), Dashboard::Assessments);
        assert_eq!(Dashboard::Cases.chart_source(), ChartSource::Filtered);
    }

    #[test]
    fn test_case_snapshot_totals() {
        let data = vec![
            rec("a", &[("cases", Value::Integer(10)), ("deaths", Value::Integer(1))]),
            rec("b", &[("cases", Value::Integer(5)), ("deaths", Value::Integer(0))]),
        ];
        let snap = Dashboard::Cases.snapshot(&CASE_SCHEMA, &data).unwrap();
        assert_eq!(snap.get("total_entries").and_then(Metric::as_count), Some(2));
        assert_eq!(snap.get("total_cases").and_then(Metric::as_scalar), Some(15.0));
        assert_eq!(snap.get("total_deaths").and_then(Metric::as_scalar), Some(1.0));
    }

    #[test]
    fn test_assessment_snapshot_counts() {
        let data = vec![
            rec(
                "a",
                &[
                    ("sex", Value::Category("Female".into())),
                    ("academicPerformance", Value::Decimal(90.0)),
                    ("academicDescription", Value::Category("Outstanding".into())),
                ],
            ),
            rec(
                "b",
                &[
                    ("sex", Value::Category("Male".into())),
                    ("academicPerformance", Value::Decimal(80.0)),
                ],
            ),
        ];
        let snap = Dashboard::Assessments.snapshot(&ASSESSMENT_SCHEMA, &data).unwrap();
        assert_eq!(snap.get("female").and_then(Metric::as_count), Some(1));
        assert_eq!(snap.get("male").and_then(Metric::as_count), Some(1));
        assert_eq!(
            snap.get("average_academic_performance").and_then(Metric::as_scalar),
            Some(85.0)
        );
        let desc = snap
            .get("academic_description")
            .and_then(Metric::as_distribution)
            .unwrap();
        assert_eq!(desc.len(), 6);
        assert_eq!(desc["Outstanding"], 1);
        assert_eq!(desc["Did not meet expectations"], 0);
    }

    #[test]
    fn test_empty_collections_render() {
        let empty: Vec<Record> = Vec::new();
        let charts = Dashboard::Assessments
            .charts(&ASSESSMENT_SCHEMA, &empty, &[])
            .unwrap();
        assert_eq!(charts.len(), 9);
        let charts = Dashboard::Cases.charts(&CASE_SCHEMA, &empty, &[]).unwrap();
        assert_eq!(charts.len(), 4);
        assert!(charts.iter().all(|c| c.category_labels.is_empty()));
    }

    #[test]
    fn test_leaders_only_for_assessments() {
        let data = vec![
            rec("a", &[("natResults", Value::Decimal(70.0))]),
            rec("b", &[("natResults", Value::Decimal(99.0))]),
        ];
        let top = Dashboard::Assessments.leaders(&ASSESSMENT_SCHEMA, &data, 5).unwrap();
        assert_eq!(top[0].id, "b");
        assert!(Dashboard::Cases.leaders(&CASE_SCHEMA, &data, 5).unwrap().is_empty());
    }
}
