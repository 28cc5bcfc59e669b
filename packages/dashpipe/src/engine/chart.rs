//! Chart-ready projections.
//!
//! A [`Chart`] is a renderer-agnostic set of category labels plus series.
//! Every projection here is pure and deterministic; style hints are
//! cosmetic and come from a fixed palette by series index.

use crate::engine::aggregate::{
    self, distinct, group_by_labels, group_sums, Distribution, GroupKey, GroupMetric,
};
use crate::engine::types::{Field, Record};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    StackedBar,
    Line,
    Pie,
    Doughnut,
    Radar,
    Scatter,
    Heatmap,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SeriesData {
    Values(Vec<f64>),
    Points(Vec<Point>),
}

impl SeriesData {
    pub fn len(&self) -> usize {
        match self {
            SeriesData::Values(v) => v.len(),
            SeriesData::Points(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn values(&self) -> Option<&[f64]> {
        match self {
            SeriesData::Values(v) => Some(v),
            SeriesData::Points(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StyleHints {
    pub color: &'static str,
    pub fill: &'static str,
}

const PALETTE: &[(&str, &str)] = &[
    ("rgb(75, 192, 192)", "rgba(75, 192, 192, 0.6)"),
    ("rgb(255, 99, 132)", "rgba(255, 99, 132, 0.6)"),
    ("rgb(54, 162, 235)", "rgba(54, 162, 235, 0.6)"),
    ("rgb(255, 206, 86)", "rgba(255, 206, 86, 0.6)"),
    ("rgb(153, 102, 255)", "rgba(153, 102, 255, 0.6)"),
    ("rgb(255, 159, 64)", "rgba(255, 159, 64, 0.6)"),
    ("rgb(201, 203, 207)", "rgba(201, 203, 207, 0.6)"),
];

impl StyleHints {
    pub fn for_index(i: usize) -> Self {
        let (color, fill) = PALETTE[i % PALETTE.len()];
        Self { color, fill }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub label: SmolStr,
    pub data: SeriesData,
    pub style: StyleHints,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Chart {
    pub title: SmolStr,
    pub kind: ChartKind,
    pub category_labels: Vec<SmolStr>,
    pub series: Vec<Series>,
}

impl Chart {
    pub fn new(title: &str, kind: ChartKind, category_labels: Vec<SmolStr>) -> Self {
        Self {
            title: SmolStr::new(title),
            kind,
            category_labels,
            series: Vec::new(),
        }
    }

    /// Append a series, styled by its position.
    pub fn push_series(&mut self, label: &str, data: SeriesData) {
        let style = StyleHints::for_index(self.series.len());
        self.series.push(Series {
            label: SmolStr::new(label),
            data,
            style,
        });
    }

    pub fn with_series(mut self, label: &str, data: SeriesData) -> Self {
        self.push_series(label, data);
        self
    }

    /// Append all series of `other`, restyled to continue this chart's palette.
    pub fn absorb(mut self, other: Chart) -> Self {
        for s in other.series {
            self.push_series(&s.label, s.data);
        }
        self
    }

    pub fn series(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.label == label)
    }
}

#[inline]
fn number_or_zero(record: &Record, field: Field) -> f64 {
    record.number(field.name).unwrap_or(0.0)
}

/// One point per record; absent coordinates plot at 0.
pub fn scatter<'a, I>(title: &str, label: &str, records: I, x: Field, y: Field) -> Chart
where
    I: IntoIterator<Item = &'a Record>,
{
    let points = records
        .into_iter()
        .map(|r| Point {
            x: number_or_zero(r, x),
            y: number_or_zero(r, y),
        })
        .collect();
    Chart::new(title, ChartKind::Scatter, Vec::new()).with_series(label, SeriesData::Points(points))
}

/// Bar, pie or doughnut over a count distribution, label order kept.
pub fn category_counts(title: &str, kind: ChartKind, label: &str, counts: &Distribution) -> Chart {
    let labels = counts.keys().cloned().collect();
    let values = counts.values().map(|&n| n as f64).collect();
    Chart::new(title, kind, labels).with_series(label, SeriesData::Values(values))
}

/// Per-group means of several metrics over fixed labels, one series per
/// metric. Empty groups plot at 0.
pub fn group_means<'a, I>(
    title: &str,
    kind: ChartKind,
    records: I,
    group: Field,
    metrics: &[(&str, Field)],
    labels: &[&str],
) -> Chart
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let mut chart = Chart::new(title, kind, labels.iter().map(|l| SmolStr::new(*l)).collect());
    for (label, field) in metrics {
        let means = group_by_labels(records.clone(), group, *field, GroupMetric::Mean, labels);
        chart.push_series(label, SeriesData::Values(means.into_values().collect()));
    }
    chart
}

/// One bin per record, labelled `Bin 1..=n`, holding that record's value.
pub fn per_record_histogram<'a, I>(title: &str, label: &str, records: I, field: Field) -> Chart
where
    I: IntoIterator<Item = &'a Record>,
{
    let values: Vec<f64> = records.into_iter().map(|r| number_or_zero(r, field)).collect();
    let labels = (1..=values.len()).map(|i| SmolStr::new(format!("Bin {i}"))).collect();
    Chart::new(title, ChartKind::Bar, labels).with_series(label, SeriesData::Values(values))
}

/// One category per record, labelled by `label_field`, one series per
/// value field.
pub fn per_record_series<'a, I>(
    title: &str,
    kind: ChartKind,
    records: I,
    label_field: Field,
    values: &[(&str, Field)],
) -> Chart
where
    I: IntoIterator<Item = &'a Record>,
{
    let rows: Vec<&Record> = records.into_iter().collect();
    let labels = rows
        .iter()
        .map(|r| SmolStr::new(r.text(label_field.name)))
        .collect();
    let mut chart = Chart::new(title, kind, labels);
    for (label, field) in values {
        let data = rows.iter().map(|r| number_or_zero(r, *field)).collect();
        chart.push_series(label, SeriesData::Values(data));
    }
    chart
}

/// Grouped counts: categories are the distinct values of `x`, one series
/// per distinct value of `series_field`.
pub fn cross_tab_series<'a, I>(title: &str, records: I, x: Field, series_field: Field) -> Chart
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let xs = distinct(records.clone(), x);
    let groups = distinct(records.clone(), series_field);
    let tab = aggregate::cross_tab(records, x, series_field);

    let mut chart = Chart::new(title, ChartKind::Bar, xs.clone());
    for g in &groups {
        let data = xs
            .iter()
            .map(|xv| tab.get(&(xv.clone(), g.clone())).copied().unwrap_or(0) as f64)
            .collect();
        chart.push_series(g, SeriesData::Values(data));
    }
    chart
}

/// One series per label of `group`, holding the raw `value` of every record
/// in that group, labelled `"{prefix} ({label})"`.
pub fn grouped_values<'a, I>(
    title: &str,
    records: I,
    group: Field,
    value: Field,
    labels: &[&str],
    prefix: &str,
) -> Chart
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let mut chart = Chart::new(
        title,
        ChartKind::StackedBar,
        labels.iter().map(|l| SmolStr::new(*l)).collect(),
    );
    for label in labels {
        let data = records
            .clone()
            .into_iter()
            .filter(|r| r.text(group.name) == *label)
            .map(|r| number_or_zero(r, value))
            .collect();
        chart.push_series(&format!("{prefix} ({label})"), SeriesData::Values(data));
    }
    chart
}

/// Categories are the distinct values of `x`; one series per distinct value
/// of `series_field`, labelled `"{prefix}: {value}"`, holding the `value`
/// of every matching record walked category by category.
pub fn category_values<'a, I>(
    title: &str,
    records: I,
    x: Field,
    series_field: Field,
    value: Field,
    prefix: &str,
) -> Chart
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let xs = distinct(records.clone(), x);
    let groups = distinct(records.clone(), series_field);
    let mut chart = Chart::new(title, ChartKind::Bar, xs.clone());
    for g in &groups {
        let mut data = Vec::new();
        for xv in &xs {
            data.extend(
                records
                    .clone()
                    .into_iter()
                    .filter(|r| r.text(x.name) == xv.as_str() && r.text(series_field.name) == g.as_str())
                    .map(|r| number_or_zero(r, value)),
            );
        }
        chart.push_series(&format!("{prefix}: {g}"), SeriesData::Values(data));
    }
    chart
}

/// Matrix of distinct `rows` x distinct `cols`. A cell holds the `value` of
/// the first record matching both, or 0. One series per row, categories are
/// the columns.
pub fn heatmap<'a, I>(title: &str, records: I, rows: Field, cols: Field, value: Field) -> Chart
where
    I: IntoIterator<Item = &'a Record> + Clone,
{
    let row_keys = distinct(records.clone(), rows);
    let col_keys = distinct(records.clone(), cols);
    let mut chart = Chart::new(title, ChartKind::Heatmap, col_keys.clone());
    for rk in &row_keys {
        let data = col_keys
            .iter()
            .map(|ck| {
                records
                    .clone()
                    .into_iter()
                    .find(|r| r.text(rows.name) == rk.as_str() && r.text(cols.name) == ck.as_str())
                    .map_or(0.0, |r| number_or_zero(r, value))
            })
            .collect();
        chart.push_series(rk, SeriesData::Values(data));
    }
    chart
}

/// A shade threshold: values strictly above `above` get `color`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RampStep {
    pub above: f64,
    pub color: SmolStr,
}

/// Threshold color ramp, checked from the highest step down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorRamp {
    pub steps: Vec<RampStep>,
    pub fallback: SmolStr,
}

impl Default for ColorRamp {
    fn default() -> Self {
        let step = |above: f64, color: &str| RampStep {
            above,
            color: SmolStr::new(color),
        };
        Self {
            steps: vec![
                step(5000.0, "#800026"),
                step(1000.0, "#BD0026"),
                step(500.0, "#E31A1C"),
                step(100.0, "#FC4E2A"),
                step(50.0, "#FD8D3C"),
                step(10.0, "#FEB24C"),
                step(0.0, "#FED976"),
            ],
            fallback: SmolStr::new("#FFEDA0"),
        }
    }
}

impl ColorRamp {
    pub fn color_for(&self, value: f64) -> &str {
        self.steps
            .iter()
            .filter(|s| value > s.above)
            .max_by(|a, b| a.above.total_cmp(&b.above))
            .map_or(self.fallback.as_str(), |s| s.color.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionShade {
    pub region: SmolStr,
    /// Totals of the shaded field followed by any extra fields.
    pub totals: SmallVec<[f64; 4]>,
    pub color: SmolStr,
}

impl RegionShade {
    pub fn value(&self) -> f64 {
        self.totals.first().copied().unwrap_or(0.0)
    }
}

/// Per-region totals keyed by the normalized (trimmed, upper-cased) region
/// name, colored by the total of `value`.
pub fn region_shading<'a, I>(
    records: I,
    region: Field,
    value: Field,
    extra: &[Field],
    ramp: &ColorRamp,
) -> Vec<RegionShade>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut fields: SmallVec<[Field; 4]> = SmallVec::new();
    fields.push(value);
    fields.extend_from_slice(extra);

    group_sums(records, region, &fields, GroupKey::Normalized)
        .into_iter()
        .map(|(name, totals)| {
            let color = SmolStr::new(ramp.color_for(totals.first().copied().unwrap_or(0.0)));
            RegionShade {
                region: name,
                totals,
                color,
            }
        })
        .collect()
}

/// Shade for a region name as a map feature spells it.
pub fn lookup_region<'s>(shades: &'s [RegionShade], name: &str) -> Option<&'s RegionShade> {
    let key = GroupKey::Normalized.apply(name);
    shades.iter().find(|s| s.region == key)
}
