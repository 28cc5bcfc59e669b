//! Aggregation over whole collections.
//!
//! Everything here is a pure fold over `&Record`s. Group keys are the text
//! rendering of the group field; records whose group field is absent or
//! empty do not form a group.

use crate::engine::types::{Field, Record};
use indexmap::IndexMap;
use serde::Serialize;
use smallvec::SmallVec;
use smol_str::SmolStr;
use std::cmp::Ordering;

/// Label -> count, in caller or discovery order.
pub type Distribution = IndexMap<SmolStr, usize>;

/// Group label -> metric value.
pub type Groups = IndexMap<SmolStr, f64>;

/// Per-group totals of several fields, in the order the fields were given.
pub type GroupTotals = IndexMap<SmolStr, SmallVec<[f64; 4]>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupMetric {
    Mean,
    Sum,
    Count,
}

/// How group keys are derived from the group field's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GroupKey {
    #[default]
    Exact,
    /// Trimmed and upper-cased, so `" Region x"` and `"REGION X"` merge.
    Normalized,
}

impl GroupKey {
    pub fn apply(self, raw: &str) -> SmolStr {
        match self {
            GroupKey::Exact => SmolStr::new(raw),
            GroupKey::Normalized => SmolStr::new(raw.trim().to_uppercase()),
        }
    }
}

fn group_label(record: &Record, field: Field) -> Option<SmolStr> {
    let text = record.text(field.name);
    (!text.is_empty()).then(|| SmolStr::new(text))
}

#[inline]
fn number_or_zero(record: &Record, field: Field) -> f64 {
    record.number(field.name).unwrap_or(0.0)
}

pub fn count<'a, I>(records: I) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().count()
}

/// Records whose `field` renders exactly as `value`.
pub fn count_where<'a, I>(records: I, field: Field, value: &str) -> usize
where
    I: IntoIterator<Item = &'a Record>,
{
    records
        .into_iter()
        .filter(|r| r.text(field.name) == value)
        .count()
}

/// Non-numeric and absent values contribute 0.
pub fn sum<'a, I>(records: I, field: Field) -> f64
where
    I: IntoIterator<Item = &'a Record>,
{
    records.into_iter().map(|r| number_or_zero(r, field)).sum()
}

/// Sum divided by the number of records. An empty input yields 0.
pub fn mean<'a, I>(records: I, field: Field) -> f64
where
    I: IntoIterator<Item = &'a Record>,
{
    let (total, n) = records
        .into_iter()
        .fold((0.0, 0usize), |(t, n), r| (t + number_or_zero(r, field), n + 1));
    if n == 0 {
        0.0
    } else {
        total / n as f64
    }
}

/// Count occurrences of each label. Output follows `labels` exactly; labels
/// no record carries are reported as 0 and values outside `labels` are
/// ignored.
pub fn histogram<'a, I>(records: I, field: Field, labels: &[&str]) -> Distribution
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut out: Distribution = labels.iter().map(|l| (SmolStr::new(*l), 0)).collect();
    for record in records {
        if let Some(slot) = out.get_mut(&*record.text(field.name)) {
            *slot += 1;
        }
    }
    out
}

/// Count occurrences of every value, in discovery order.
pub fn value_counts<'a, I>(records: I, field: Field) -> Distribution
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut out = Distribution::default();
    for label in records.into_iter().filter_map(|r| group_label(r, field)) {
        *out.entry(label).or_insert(0) += 1;
    }
    out
}

/// Distinct values of `field` in order of first appearance.
pub fn distinct<'a, I>(records: I, field: Field) -> Vec<SmolStr>
where
    I: IntoIterator<Item = &'a Record>,
{
    value_counts(records, field).into_keys().collect()
}

#[derive(Default, Clone, Copy)]
struct Acc {
    total: f64,
    n: usize,
}

impl Acc {
    fn finish(self, metric: GroupMetric) -> f64 {
        match metric {
            GroupMetric::Sum => self.total,
            GroupMetric::Count => self.n as f64,
            GroupMetric::Mean if self.n == 0 => 0.0,
            GroupMetric::Mean => self.total / self.n as f64,
        }
    }
}

/// Fold `metric_field` into per-group accumulators. With `open` unseen
/// groups are added; otherwise only the preset groups are filled.
fn accumulate<'a, I>(
    records: I,
    group: Field,
    metric_field: Field,
    acc: &mut IndexMap<SmolStr, Acc>,
    open: bool,
) where
    I: IntoIterator<Item = &'a Record>,
{
    for record in records {
        let Some(label) = group_label(record, group) else {
            continue;
        };
        let slot = if open {
            acc.entry(label).or_default()
        } else {
            match acc.get_mut(label.as_str()) {
                Some(slot) => slot,
                None => continue,
            }
        };
        slot.total += number_or_zero(record, metric_field);
        slot.n += 1;
    }
}

/// Group by `group` and reduce `metric_field` per group, in discovery order.
pub fn group_by<'a, I>(records: I, group: Field, metric_field: Field, metric: GroupMetric) -> Groups
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut acc = IndexMap::new();
    accumulate(records, group, metric_field, &mut acc, true);
    acc.into_iter().map(|(k, a)| (k, a.finish(metric))).collect()
}

/// Like [`group_by`] over a fixed label list. Empty groups yield 0 and
/// records outside the labels are ignored.
pub fn group_by_labels<'a, I>(
    records: I,
    group: Field,
    metric_field: Field,
    metric: GroupMetric,
    labels: &[&str],
) -> Groups
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut acc: IndexMap<SmolStr, Acc> =
        labels.iter().map(|l| (SmolStr::new(*l), Acc::default())).collect();
    accumulate(records, group, metric_field, &mut acc, false);
    acc.into_iter().map(|(k, a)| (k, a.finish(metric))).collect()
}

/// Totals of several numeric fields per group, in discovery order of the
/// (possibly normalized) group key.
pub fn group_sums<'a, I>(records: I, group: Field, fields: &[Field], key: GroupKey) -> GroupTotals
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut out = GroupTotals::default();
    for record in records {
        let Some(label) = group_label(record, group) else {
            continue;
        };
        let label = key.apply(&label);
        if label.is_empty() {
            continue;
        }
        let totals = out
            .entry(label)
            .or_insert_with(|| SmallVec::from_elem(0.0, fields.len()));
        for (slot, field) in totals.iter_mut().zip(fields) {
            *slot += number_or_zero(record, *field);
        }
    }
    out
}

/// Counts for each `(a, b)` combination actually present, in discovery order.
pub fn cross_tab<'a, I>(records: I, a: Field, b: Field) -> IndexMap<(SmolStr, SmolStr), usize>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut out = IndexMap::new();
    for record in records {
        if let (Some(ka), Some(kb)) = (group_label(record, a), group_label(record, b)) {
            *out.entry((ka, kb)).or_insert(0) += 1;
        }
    }
    out
}

/// The `n` records with the largest `field`, largest first. Ties keep their
/// input order. Non-numeric values count as absent and rank last.
pub fn top_n<'a, I>(records: I, field: Field, n: usize) -> Vec<&'a Record>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut rows: Vec<&'a Record> = records.into_iter().collect();
    rows.sort_by(|a, b| match (a.number(field.name), b.number(field.name)) {
        (Some(x), Some(y)) => y.total_cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.truncate(n);
    rows
}

/// One named figure in an [`AggregateSnapshot`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Metric {
    Count(usize),
    Scalar(f64),
    Distribution(Distribution),
}

impl Metric {
    pub fn as_count(&self) -> Option<usize> {
        match self {
            Metric::Count(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Metric::Scalar(v) => Some(*v),
            Metric::Count(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn as_distribution(&self) -> Option<&Distribution> {
        match self {
            Metric::Distribution(d) => Some(d),
            _ => None,
        }
    }
}

/// Ordered summary figures of one collection. Rebuilt on every derive.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregateSnapshot {
    metrics: IndexMap<SmolStr, Metric>,
}

impl AggregateSnapshot {
    pub fn with(mut self, name: &str, metric: Metric) -> Self {
        self.metrics.insert(SmolStr::new(name), metric);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Metric> {
        self.metrics.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, &Metric)> {
        self.metrics.iter()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

#[cfg(test)]
mod aggregate_tests {
    use super::*;
    use crate::engine::types::{Fields, Value, ASSESSMENT_SCHEMA, CASE_SCHEMA, STUDY_HABIT_LABELS};

    fn rec(id: &str, pairs: &[(&str, Value)]) -> Record {
        let fields: Fields = pairs
            .iter()
            .map(|(k, v)| (SmolStr::new(*k), v.clone()))
            .collect();
        Record::new(id, fields)
    }

    fn habit(id: &str, habit: &str, nat: f64) -> Record {
        rec(
            id,
            &[
                ("studyHabit", Value::Category(habit.into())),
                ("natResults", Value::Decimal(nat)),
            ],
        )
    }

    fn field(name: &str) -> Field {
        ASSESSMENT_SCHEMA.field(name).unwrap()
    }

    #[test]
    fn test_mean_guards_empty() {
        let empty: Vec<Record> = Vec::new();
        assert_eq!(mean(&empty, field("natResults")), 0.0);

        let data = vec![habit("a", "Good", 10.0), habit("b", "Good", 20.0)];
        assert_eq!(mean(&data, field("natResults")), 15.0);
    }

    #[test]
    fn test_sum_treats_absent_as_zero() {
        let data = vec![habit("a", "Good", 10.0), rec("b", &[])];
        assert_eq!(sum(&data, field("natResults")), 10.0);
        assert_eq!(mean(&data, field("natResults")), 5.0);
    }

    #[test]
    fn test_histogram_keeps_label_order_and_zeros() {
        let data = vec![habit("a", "Poor", 1.0), habit("b", "Poor", 1.0), habit("c", "Meh", 1.0)];
        let h = histogram(&data, field("studyHabit"), STUDY_HABIT_LABELS);
        let pairs: Vec<(&str, usize)> = h.iter().map(|(k, v)| (k.as_str(), *v)).collect();
        assert_eq!(pairs, vec![("Excellent", 0), ("Good", 0), ("Poor", 2)]);
    }

    #[test]
    fn test_distinct_discovery_order() {
        let data = vec![
            rec("a", &[("ethnic", Value::Text("Maranao".into()))]),
            rec("b", &[("ethnic", Value::Text("Iliganon".into()))]),
            rec("c", &[("ethnic", Value::Text("Maranao".into()))]),
            rec("d", &[]),
        ];
        assert_eq!(distinct(&data, field("ethnic")), vec!["Maranao", "Iliganon"]);
    }

    #[test]
    fn test_group_by_metrics() {
        let data = vec![
            habit("a", "Good", 80.0),
            habit("b", "Poor", 60.0),
            habit("c", "Good", 90.0),
        ];
        let means = group_by(&data, field("studyHabit"), field("natResults"), GroupMetric::Mean);
        assert_eq!(means.keys().collect::<Vec<_>>(), vec!["Good", "Poor"]);
        assert_eq!(means["Good"], 85.0);

        let sums = group_by(&data, field("studyHabit"), field("natResults"), GroupMetric::Sum);
        assert_eq!(sums["Good"], 170.0);

        let counts = group_by(&data, field("studyHabit"), field("natResults"), GroupMetric::Count);
        assert_eq!(counts["Good"], 2.0);
    }

    #[test]
    fn test_group_by_labels_empty_group_is_zero() {
        let data = vec![habit("a", "Good", 80.0), habit("b", "Other", 10.0)];
        let means = group_by_labels(
            &data,
            field("studyHabit"),
            field("natResults"),
            GroupMetric::Mean,
            STUDY_HABIT_LABELS,
        );
        let values: Vec<f64> = means.values().copied().collect();
        assert_eq!(values, vec![0.0, 80.0, 0.0]);
    }

    #[test]
    fn test_group_sums_normalized_keys_merge() {
        let region = |id: &str, name: &str, cases: i64, deaths: i64| {
            rec(
                id,
                &[
                    ("regions", Value::Text(name.into())),
                    ("cases", Value::Integer(cases)),
                    ("deaths", Value::Integer(deaths)),
                ],
            )
        };
        let data = vec![
            region("a", "Region X", 100, 1),
            region("b", " REGION X ", 50, 2),
            region("c", "Caraga", 5, 0),
        ];
        let fields = [
            CASE_SCHEMA.field("cases").unwrap(),
            CASE_SCHEMA.field("deaths").unwrap(),
        ];
        let regions = CASE_SCHEMA.field("regions").unwrap();

        let merged = group_sums(&data, regions, &fields, GroupKey::Normalized);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["REGION X"].as_slice(), &[150.0, 3.0]);

        let exact = group_sums(&data, regions, &fields, GroupKey::Exact);
        assert_eq!(exact.len(), 3);
    }

    #[test]
    fn test_cross_tab_only_present_combinations() {
        let data = vec![
            rec("a", &[("sex", Value::Category("Male".into())), ("iq", Value::Category("High".into()))]),
            rec("b", &[("sex", Value::Category("Female".into())), ("iq", Value::Category("High".into()))]),
            rec("c", &[("sex", Value::Category("Male".into())), ("iq", Value::Category("High".into()))]),
        ];
        let tab = cross_tab(&data, field("sex"), field("iq"));
        assert_eq!(tab.len(), 2);
        assert_eq!(tab[&(SmolStr::new("Male"), SmolStr::new("High"))], 2);
    }

    #[test]
    fn test_top_n_ties_in_input_order() {
        let data = vec![
            habit("a", "Good", 80.0),
            habit("b", "Good", 95.0),
            habit("c", "Good", 80.0),
            habit("d", "Good", 70.0),
        ];
        let top = top_n(&data, field("natResults"), 3);
        let ids: Vec<&str> = top.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
        // input untouched
        assert_eq!(data[0].id, "a");
    }

    #[test]
    fn test_top_n_ranks_non_numeric_last() {
        let data = vec![
            habit("s1", "Good", 95.0),
            rec("legacy", &[("natResults", Value::Text("n/a".into()))]),
            rec("blank", &[]),
            habit("s2", "Poor", 80.0),
        ];
        let top = top_n(&data, field("natResults"), 2);
        let ids: Vec<&str> = top.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);

        let all = top_n(&data, field("natResults"), 10);
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2", "legacy", "blank"]);
    }

    #[test]
    fn test_count_where_exact() {
        let data = vec![
            rec("a", &[("sex", Value::Category("Female".into()))]),
            rec("b", &[("sex", Value::Category("Male".into()))]),
        ];
        assert_eq!(count_where(&data, field("sex"), "Female"), 1);
        assert_eq!(count(&data), 2);
    }

    #[test]
    fn test_snapshot_serializes_in_order() {
        let snap = AggregateSnapshot::default()
            .with("total", Metric::Count(3))
            .with("mean", Metric::Scalar(1.5));
        let json = serde_json::to_string(&snap).unwrap();
        assert_eq!(
            json,
            r#"{"total":{"kind":"count","value":3},"mean":{"kind":"scalar","value":1.5}}"#
        );
        assert_eq!(snap.get("total").and_then(Metric::as_count), Some(3));
    }
}
