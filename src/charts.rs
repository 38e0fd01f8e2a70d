//! Chart series prepared from a record table. Everything here is plain
//! data; drawing lives in the binary's `ui::plot`.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::data::model::{ApprovalStatus, RecordTable, TransformerModel};
use crate::metrics::quantile;

/// Which chart the central panel shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChartKind {
    #[default]
    EfficiencyOverTime,
    LossesVsTemperature,
    ModelDistribution,
    ApprovalByModel,
    EfficiencyHistogram,
    MonthlyTrend,
    PowerVsLosses,
    TemperatureByModel,
}

impl ChartKind {
    pub const ALL: [ChartKind; 8] = [
        ChartKind::EfficiencyOverTime,
        ChartKind::LossesVsTemperature,
        ChartKind::ModelDistribution,
        ChartKind::ApprovalByModel,
        ChartKind::EfficiencyHistogram,
        ChartKind::MonthlyTrend,
        ChartKind::PowerVsLosses,
        ChartKind::TemperatureByModel,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            ChartKind::EfficiencyOverTime => "Efficiency over time",
            ChartKind::LossesVsTemperature => "Losses vs temperature rise",
            ChartKind::ModelDistribution => "Tests by model",
            ChartKind::ApprovalByModel => "Approval rate by model",
            ChartKind::EfficiencyHistogram => "Efficiency distribution",
            ChartKind::MonthlyTrend => "Monthly trend",
            ChartKind::PowerVsLosses => "Rated power vs losses",
            ChartKind::TemperatureByModel => "Temperature rise by model",
        }
    }
}

/// Days since the Unix epoch, the x unit of every time axis.
pub fn day_number(date: NaiveDate) -> f64 {
    (date - NaiveDate::default()).num_days() as f64
}

/// Inverse of [`day_number`], for axis labels.
pub fn date_from_day_number(x: f64) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(chrono::Duration::days(x.round() as i64))
}

// ---------------------------------------------------------------------------
// Scatter / line series
// ---------------------------------------------------------------------------

/// `(day, efficiency)` per model, each series sorted by date.
pub fn efficiency_over_time(table: &RecordTable) -> BTreeMap<TransformerModel, Vec<[f64; 2]>> {
    let mut series: BTreeMap<TransformerModel, Vec<[f64; 2]>> = BTreeMap::new();
    for r in table.records() {
        series
            .entry(r.model)
            .or_default()
            .push([day_number(r.test_date), r.efficiency_pct]);
    }
    for points in series.values_mut() {
        points.sort_by(|a, b| a[0].total_cmp(&b[0]));
    }
    series
}

/// `(temperature rise, losses)` per approval status.
pub fn losses_vs_temperature(table: &RecordTable) -> BTreeMap<ApprovalStatus, Vec<[f64; 2]>> {
    let mut series: BTreeMap<ApprovalStatus, Vec<[f64; 2]>> = BTreeMap::new();
    for r in table.records() {
        series
            .entry(r.status)
            .or_default()
            .push([r.temperature_rise_c, r.total_losses_kw]);
    }
    series
}

/// `(rated power, losses)` per model. `None` when the table has no
/// rated-power column.
pub fn power_vs_losses(table: &RecordTable) -> Option<BTreeMap<TransformerModel, Vec<[f64; 2]>>> {
    if !table.schema().rated_power {
        return None;
    }
    let mut series: BTreeMap<TransformerModel, Vec<[f64; 2]>> = BTreeMap::new();
    for r in table.records() {
        if let Some(power) = r.rated_power_mva {
            series
                .entry(r.model)
                .or_default()
                .push([power, r.total_losses_kw]);
        }
    }
    Some(series)
}

// ---------------------------------------------------------------------------
// Categorical bars
// ---------------------------------------------------------------------------

pub fn model_distribution(table: &RecordTable) -> BTreeMap<TransformerModel, usize> {
    let mut counts = BTreeMap::new();
    for r in table.records() {
        *counts.entry(r.model).or_insert(0) += 1;
    }
    counts
}

/// Percent of approved tests per model present in the table.
pub fn approval_by_model(table: &RecordTable) -> BTreeMap<TransformerModel, f64> {
    let mut tally: BTreeMap<TransformerModel, (usize, usize)> = BTreeMap::new();
    for r in table.records() {
        let entry = tally.entry(r.model).or_insert((0, 0));
        entry.1 += 1;
        if r.status == ApprovalStatus::Approved {
            entry.0 += 1;
        }
    }
    tally
        .into_iter()
        .map(|(model, (approved, total))| (model, approved as f64 / total as f64 * 100.0))
        .collect()
}

// ---------------------------------------------------------------------------
// Box plot
// ---------------------------------------------------------------------------

/// Five-number summary of one box. Whiskers reach the furthest value within
/// 1.5 × IQR of the box; anything beyond is an outlier.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl BoxSummary {
    /// `None` for no values.
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let q1 = quantile(values, 0.25);
        let median = quantile(values, 0.5);
        let q3 = quantile(values, 0.75);
        let reach = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - reach, q3 + reach);

        let inside = values.iter().copied().filter(|v| (low_fence..=high_fence).contains(v));
        let lower_whisker = inside.clone().fold(f64::INFINITY, f64::min);
        let upper_whisker = inside.fold(f64::NEG_INFINITY, f64::max);
        let mut outliers: Vec<f64> = values
            .iter()
            .copied()
            .filter(|v| !(low_fence..=high_fence).contains(v))
            .collect();
        outliers.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            q1,
            median,
            q3,
            lower_whisker,
            upper_whisker,
            outliers,
        })
    }
}

/// Temperature rise distribution per model present in the table.
pub fn temperature_by_model(table: &RecordTable) -> BTreeMap<TransformerModel, BoxSummary> {
    let mut values: BTreeMap<TransformerModel, Vec<f64>> = BTreeMap::new();
    for r in table.records() {
        values.entry(r.model).or_default().push(r.temperature_rise_c);
    }
    values
        .into_iter()
        .filter_map(|(model, temps)| BoxSummary::of(&temps).map(|b| (model, b)))
        .collect()
}

// ---------------------------------------------------------------------------
// Histogram
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    pub fn width(&self) -> f64 {
        self.end - self.start
    }
}

/// Equal-width efficiency bins over the observed range. The last bin is
/// closed so the maximum is counted.
pub fn efficiency_histogram(table: &RecordTable, bins: usize) -> Vec<HistogramBin> {
    let values: Vec<f64> = table.records().iter().map(|r| r.efficiency_pct).collect();
    histogram(&values, bins)
}

fn histogram(values: &[f64], bins: usize) -> Vec<HistogramBin> {
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    // A single distinct value still gets a bin of unit width.
    let (min, max) = if max > min { (min, max) } else { (min - 0.5, max + 0.5) };
    let width = (max - min) / bins as f64;

    let mut out: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            start: min + width * i as f64,
            end: min + width * (i + 1) as f64,
            count: 0,
        })
        .collect();
    for v in values {
        let i = (((v - min) / width).floor() as usize).min(bins - 1);
        out[i].count += 1;
    }
    out
}

// ---------------------------------------------------------------------------
// Monthly trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyPoint {
    /// First day of the month.
    pub month: NaiveDate,
    pub tests: usize,
    pub mean_efficiency: f64,
    pub approval_rate: f64,
}

/// Per calendar month, oldest first.
pub fn monthly_trend(table: &RecordTable) -> Vec<MonthlyPoint> {
    let mut months: BTreeMap<NaiveDate, (usize, f64, usize)> = BTreeMap::new();
    for r in table.records() {
        let Some(month) = r.test_date.with_day(1) else {
            continue;
        };
        let entry = months.entry(month).or_insert((0, 0.0, 0));
        entry.0 += 1;
        entry.1 += r.efficiency_pct;
        if r.status == ApprovalStatus::Approved {
            entry.2 += 1;
        }
    }
    months
        .into_iter()
        .map(|(month, (tests, efficiency_sum, approved))| MonthlyPoint {
            month,
            tests,
            mean_efficiency: efficiency_sum / tests as f64,
            approval_rate: approved as f64 / tests as f64 * 100.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::record;
    use crate::data::model::{TableSchema, TestRecord};

    fn dated(id: &str, y: i32, m: u32, d: u32, efficiency: f64) -> TestRecord {
        let mut r = record(id, efficiency, 50.0, 10.0);
        r.test_date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        r
    }

    #[test]
    fn day_numbers_round_trip() {
        let d = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(date_from_day_number(day_number(d)), Some(d));
        assert_eq!(day_number(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1.0);
    }

    #[test]
    fn efficiency_series_are_sorted_by_date() {
        let table = RecordTable::from_records(vec![
            dated("a", 2025, 3, 1, 99.0),
            dated("b", 2025, 1, 1, 98.5),
        ])
        .unwrap();
        let series = efficiency_over_time(&table);
        let points = &series[&TransformerModel::Tsea1000];
        assert!(points[0][0] < points[1][0]);
        assert_eq!(points[0][1], 98.5);
    }

    #[test]
    fn approval_rate_per_model() {
        let mut rejected = record("b", 99.0, 50.0, 10.0);
        rejected.status = ApprovalStatus::Rejected;
        let mut other = record("c", 99.0, 50.0, 10.0);
        other.model = TransformerModel::Tsea5000;
        let table = RecordTable::from_records(vec![record("a", 99.0, 50.0, 10.0), rejected, other]).unwrap();
        let rates = approval_by_model(&table);
        assert_eq!(rates[&TransformerModel::Tsea1000], 50.0);
        assert_eq!(rates[&TransformerModel::Tsea5000], 100.0);
        assert_eq!(model_distribution(&table)[&TransformerModel::Tsea1000], 2);
    }

    #[test]
    fn temperature_boxes_split_outliers_from_whiskers() {
        let mut rows: Vec<TestRecord> = [40.0, 50.0, 52.0, 54.0, 56.0, 90.0]
            .iter()
            .enumerate()
            .map(|(i, t)| record(&format!("a{i}"), 99.0, *t, 10.0))
            .collect();
        let mut other = record("b", 99.0, 61.0, 10.0);
        other.model = TransformerModel::Tsea2500;
        rows.push(other);
        let boxes = temperature_by_model(&RecordTable::from_records(rows).unwrap());

        let b = &boxes[&TransformerModel::Tsea1000];
        assert_eq!((b.q1, b.median, b.q3), (50.5, 53.0, 55.5));
        assert_eq!((b.lower_whisker, b.upper_whisker), (50.0, 56.0));
        assert_eq!(b.outliers, vec![40.0, 90.0]);

        let single = &boxes[&TransformerModel::Tsea2500];
        assert_eq!((single.q1, single.q3, single.upper_whisker), (61.0, 61.0, 61.0));
        assert!(single.outliers.is_empty());
        assert!(!boxes.contains_key(&TransformerModel::Tsea5000));
        assert!(BoxSummary::of(&[]).is_none());
    }

    #[test]
    fn histogram_counts_every_value() {
        let values = [98.0, 98.5, 99.0, 99.5, 99.9];
        let bins = histogram(&values, 4);
        assert_eq!(bins.len(), 4);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), values.len());
        assert_eq!(bins[3].count, 2);
        assert_eq!(bins[0].start, 98.0);
    }

    #[test]
    fn histogram_of_one_value() {
        let bins = histogram(&[99.0, 99.0], 3);
        assert_eq!(bins.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(histogram(&[], 3).is_empty());
    }

    #[test]
    fn monthly_trend_groups_by_calendar_month() {
        let mut rejected = dated("c", 2025, 2, 3, 99.0);
        rejected.status = ApprovalStatus::Rejected;
        let table = RecordTable::from_records(vec![
            dated("a", 2025, 1, 5, 99.0),
            dated("b", 2025, 1, 20, 98.0),
            rejected,
        ])
        .unwrap();
        let trend = monthly_trend(&table);
        assert_eq!(trend.len(), 2);
        assert_eq!(trend[0].month, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(trend[0].tests, 2);
        assert_eq!(trend[0].mean_efficiency, 98.5);
        assert_eq!(trend[1].approval_rate, 0.0);
    }

    #[test]
    fn power_chart_needs_the_power_column() {
        let table =
            RecordTable::with_schema(vec![record("a", 99.0, 50.0, 10.0)], TableSchema::default()).unwrap();
        assert!(power_vs_losses(&table).is_none());
        let full = RecordTable::from_records(vec![record("a", 99.0, 50.0, 10.0)]).unwrap();
        assert_eq!(power_vs_losses(&full).unwrap()[&TransformerModel::Tsea1000], vec![[5.0, 10.0]]);
    }
}
