//! Scalar and grouped statistics over a (filtered) record table.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::config::{AlertConfig, KpiConfig, Thresholds};
use crate::data::model::{ApprovalStatus, Category, RecordTable, TestType, TransformerModel};

// ---------------------------------------------------------------------------
// Basic metrics
// ---------------------------------------------------------------------------

/// The five headline metrics compared between periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BasicMetric {
    TotalTests,
    MeanEfficiency,
    ApprovalRate,
    MeanTemperature,
    MeanLosses,
}

impl BasicMetric {
    pub const ALL: [BasicMetric; 5] = [
        BasicMetric::TotalTests,
        BasicMetric::MeanEfficiency,
        BasicMetric::ApprovalRate,
        BasicMetric::MeanTemperature,
        BasicMetric::MeanLosses,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            BasicMetric::TotalTests => "total_tests",
            BasicMetric::MeanEfficiency => "mean_efficiency",
            BasicMetric::ApprovalRate => "approval_rate",
            BasicMetric::MeanTemperature => "mean_temperature",
            BasicMetric::MeanLosses => "mean_losses",
        }
    }

    pub fn value(&self, m: &BasicMetrics) -> f64 {
        match self {
            BasicMetric::TotalTests => m.total_tests as f64,
            BasicMetric::MeanEfficiency => m.mean_efficiency,
            BasicMetric::ApprovalRate => m.approval_rate,
            BasicMetric::MeanTemperature => m.mean_temperature,
            BasicMetric::MeanLosses => m.mean_losses,
        }
    }
}

impl fmt::Display for BasicMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Headline metrics. All zero for an empty table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicMetrics {
    pub total_tests: usize,
    pub mean_efficiency: f64,
    /// Share of approved records, in percent.
    pub approval_rate: f64,
    pub mean_temperature: f64,
    pub mean_losses: f64,
    /// Only when the table carries a rated-power column.
    pub mean_rated_power: Option<f64>,
    /// Only when the table carries an excitation-current column.
    pub mean_excitation_current: Option<f64>,
}

pub fn basic_metrics(table: &RecordTable) -> BasicMetrics {
    if table.is_empty() {
        return BasicMetrics::default();
    }
    let records = table.records();
    let schema = table.schema();
    let approved = records
        .iter()
        .filter(|r| r.status == ApprovalStatus::Approved)
        .count();

    BasicMetrics {
        total_tests: records.len(),
        mean_efficiency: mean(records.iter().map(|r| r.efficiency_pct)),
        approval_rate: approved as f64 / records.len() as f64 * 100.0,
        mean_temperature: mean(records.iter().map(|r| r.temperature_rise_c)),
        mean_losses: mean(records.iter().map(|r| r.total_losses_kw)),
        mean_rated_power: schema
            .rated_power
            .then(|| mean(records.iter().filter_map(|r| r.rated_power_mva))),
        mean_excitation_current: schema
            .excitation_current
            .then(|| mean(records.iter().filter_map(|r| r.excitation_current_a))),
    }
}

// ---------------------------------------------------------------------------
// Advanced metrics
// ---------------------------------------------------------------------------

/// Dispersion of one numeric column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Spread {
    /// Sample standard deviation; NaN for a single row.
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EfficiencyStats {
    pub spread: Spread,
    pub q25: f64,
    pub q75: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvancedMetrics {
    pub efficiency: EfficiencyStats,
    pub temperature: Spread,
    pub losses: Spread,
    pub tests_by_model: BTreeMap<TransformerModel, usize>,
    pub tests_by_type: BTreeMap<TestType, usize>,
    /// Rows with temperature rise above the maximum.
    pub out_of_spec_temperature: usize,
    /// Rows with efficiency below the minimum.
    pub out_of_spec_efficiency: usize,
    /// Rows with losses above the maximum.
    pub out_of_spec_losses: usize,
}

impl AdvancedMetrics {
    /// Sum of the three buckets. A row violating several thresholds is
    /// counted once per violation.
    pub fn out_of_spec_total(&self) -> usize {
        self.out_of_spec_temperature + self.out_of_spec_efficiency + self.out_of_spec_losses
    }
}

/// `None` for an empty table.
pub fn advanced_metrics(table: &RecordTable, thresholds: &Thresholds) -> Option<AdvancedMetrics> {
    if table.is_empty() {
        return None;
    }
    let records = table.records();
    let efficiency: Vec<f64> = records.iter().map(|r| r.efficiency_pct).collect();
    let temperature: Vec<f64> = records.iter().map(|r| r.temperature_rise_c).collect();
    let losses: Vec<f64> = records.iter().map(|r| r.total_losses_kw).collect();

    let mut tests_by_model = BTreeMap::new();
    let mut tests_by_type = BTreeMap::new();
    for r in records {
        *tests_by_model.entry(r.model).or_insert(0) += 1;
        *tests_by_type.entry(r.test_type).or_insert(0) += 1;
    }

    Some(AdvancedMetrics {
        efficiency: EfficiencyStats {
            spread: spread(&efficiency),
            q25: quantile(&efficiency, 0.25),
            q75: quantile(&efficiency, 0.75),
        },
        temperature: spread(&temperature),
        losses: spread(&losses),
        tests_by_model,
        tests_by_type,
        out_of_spec_temperature: records.iter().filter(|r| r.temperature_out_of_spec(thresholds)).count(),
        out_of_spec_efficiency: records.iter().filter(|r| r.efficiency_out_of_spec(thresholds)).count(),
        out_of_spec_losses: records.iter().filter(|r| r.losses_out_of_spec(thresholds)).count(),
    })
}

// ---------------------------------------------------------------------------
// Derived figures
// ---------------------------------------------------------------------------

/// Percent change of each basic metric against `previous`. A metric whose
/// previous value is exactly zero is left out.
pub fn compare(current: &BasicMetrics, previous: &BasicMetrics) -> BTreeMap<BasicMetric, f64> {
    BasicMetric::ALL
        .into_iter()
        .filter_map(|metric| {
            let before = metric.value(previous);
            if before == 0.0 {
                return None;
            }
            let now = metric.value(current);
            Some((metric, (now - before) / before * 100.0))
        })
        .collect()
}

/// `(total - out_of_spec_total) / max(total, 1) * 100`.
///
/// Multi-violation rows are subtracted more than once, so the result can
/// drop below zero on small tables.
pub fn conformance_rate(total: usize, advanced: Option<&AdvancedMetrics>) -> f64 {
    let out_of_spec = advanced.map_or(0, AdvancedMetrics::out_of_spec_total) as f64;
    (total as f64 - out_of_spec) / total.max(1) as f64 * 100.0
}

/// Counts per efficiency band and approval rate per model.
pub fn custom_kpis(table: &RecordTable, config: &KpiConfig) -> BTreeMap<String, f64> {
    let mut kpis = BTreeMap::new();
    if table.is_empty() {
        return kpis;
    }
    let records = table.records();

    for band in &config.efficiency_bands {
        let count = records
            .iter()
            .filter(|r| r.efficiency_pct >= band.min && r.efficiency_pct < band.max)
            .count();
        kpis.insert(format!("efficiency_{}", band.label), count as f64);
    }

    if config.conformance_by_model {
        for model in TransformerModel::ALL {
            let of_model: Vec<_> = records.iter().filter(|r| r.model == *model).collect();
            if of_model.is_empty() {
                continue;
            }
            let approved = of_model
                .iter()
                .filter(|r| r.status == ApprovalStatus::Approved)
                .count();
            kpis.insert(
                format!("conformance_{}", model.label()),
                approved as f64 / of_model.len() as f64 * 100.0,
            );
        }
    }
    kpis
}

/// Banner messages for an unhealthy table.
pub fn quality_alerts(table: &RecordTable, alerts: &AlertConfig) -> Vec<String> {
    if table.is_empty() {
        return Vec::new();
    }
    let basic = basic_metrics(table);
    let mut out = Vec::new();
    if basic.approval_rate < alerts.min_approval_rate {
        out.push(format!("Low approval rate: {:.1}%", basic.approval_rate));
    }
    if basic.mean_efficiency < alerts.min_mean_efficiency {
        out.push(format!("Low mean efficiency: {:.2}%", basic.mean_efficiency));
    }
    let hot = table
        .records()
        .iter()
        .filter(|r| r.temperature_rise_c > alerts.high_temperature)
        .count();
    if hot > 0 {
        out.push(format!(
            "{hot} tests with high temperature rise (>{}°C)",
            alerts.high_temperature
        ));
    }
    out
}

// ---------------------------------------------------------------------------
// Headline cards
// ---------------------------------------------------------------------------

/// One KPI card. `delta` is the margin to the relevant limit or target,
/// signed so that positive means healthy.
#[derive(Debug, Clone, PartialEq)]
pub struct KpiCard {
    pub title: &'static str,
    pub value: String,
    pub delta: Option<f64>,
}

pub fn kpi_cards(
    basic: &BasicMetrics,
    advanced: Option<&AdvancedMetrics>,
    thresholds: &Thresholds,
    kpi: &KpiConfig,
) -> Vec<KpiCard> {
    let card = |title, value, delta| KpiCard { title, value, delta };
    let conformance = conformance_rate(basic.total_tests, advanced);

    let mut cards = vec![
        card("Total tests", format_number(basic.total_tests as f64, 0, ""), None),
        card(
            "Mean efficiency",
            format!("{:.2}%", basic.mean_efficiency),
            Some(basic.mean_efficiency - thresholds.efficiency_min),
        ),
        card(
            "Approval rate",
            format!("{:.1}%", basic.approval_rate),
            Some(basic.approval_rate - kpi.approval_target),
        ),
        card(
            "Mean temperature rise",
            format!("{:.1}°C", basic.mean_temperature),
            Some(thresholds.temperature_max - basic.mean_temperature),
        ),
        card(
            "Mean losses",
            format!("{:.2} kW", basic.mean_losses),
            Some(thresholds.losses_max - basic.mean_losses),
        ),
    ];
    if let Some(power) = basic.mean_rated_power {
        cards.push(card("Mean rated power", format!("{power:.1} MVA"), None));
    }
    if let Some(current) = basic.mean_excitation_current {
        cards.push(card("Mean excitation current", format!("{current:.2} A"), None));
    }
    cards.push(card(
        "Conformance",
        format!("{conformance:.1}%"),
        Some(conformance - kpi.conformance_target),
    ));
    cards
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

/// Markdown summary of the headline and quality figures.
pub fn summary_report(table: &RecordTable, thresholds: &Thresholds) -> String {
    let basic = basic_metrics(table);
    let Some(advanced) = advanced_metrics(table, thresholds) else {
        return "No data available for the report.".to_string();
    };

    let mut report = String::new();
    let _ = writeln!(report, "## Summary Report\n");
    let _ = writeln!(report, "### General Metrics");
    let _ = writeln!(report, "- **Total tests:** {}", basic.total_tests);
    let _ = writeln!(report, "- **Mean efficiency:** {:.2}%", basic.mean_efficiency);
    let _ = writeln!(report, "- **Approval rate:** {:.1}%", basic.approval_rate);
    let _ = writeln!(report, "- **Mean temperature rise:** {:.1}°C", basic.mean_temperature);
    let _ = writeln!(report, "- **Mean losses:** {:.2} kW\n", basic.mean_losses);
    let _ = writeln!(report, "### Quality Analysis");
    let _ = writeln!(report, "- **Out of spec (temperature):** {}", advanced.out_of_spec_temperature);
    let _ = writeln!(report, "- **Out of spec (efficiency):** {}", advanced.out_of_spec_efficiency);
    let _ = writeln!(report, "- **Out of spec (losses):** {}\n", advanced.out_of_spec_losses);
    let _ = writeln!(report, "### Distribution by Model");
    for (model, count) in &advanced.tests_by_model {
        let share = *count as f64 / basic.total_tests as f64 * 100.0;
        let _ = writeln!(report, "- **{model}:** {count} tests ({share:.1}%)");
    }
    report
}

/// `describe()`-style statistics rendered as a fixed-width text table:
/// count/mean/std/min/quartiles/max for numeric columns and
/// count/unique/top/freq for categorical ones.
pub fn statistical_summary(table: &RecordTable) -> String {
    let records = table.records();
    let schema = table.schema();
    let mut out = String::new();

    let mut numeric: Vec<(&str, Vec<f64>)> = vec![
        ("efficiency_pct", records.iter().map(|r| r.efficiency_pct).collect()),
        ("temperature_rise_c", records.iter().map(|r| r.temperature_rise_c).collect()),
        ("total_losses_kw", records.iter().map(|r| r.total_losses_kw).collect()),
    ];
    if schema.primary_voltage {
        numeric.push(("primary_voltage_kv", records.iter().filter_map(|r| r.primary_voltage_kv).collect()));
    }
    if schema.secondary_voltage {
        numeric.push(("secondary_voltage_kv", records.iter().filter_map(|r| r.secondary_voltage_kv).collect()));
    }
    if schema.rated_power {
        numeric.push(("rated_power_mva", records.iter().filter_map(|r| r.rated_power_mva).collect()));
    }
    if schema.excitation_current {
        numeric.push(("excitation_current_a", records.iter().filter_map(|r| r.excitation_current_a).collect()));
    }

    let _ = writeln!(
        out,
        "{:<22}{:>8}{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}{:>10}",
        "", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
    );
    for (name, values) in &numeric {
        if values.is_empty() {
            let _ = writeln!(out, "{name:<22}{:>8}", 0);
            continue;
        }
        let s = spread(values);
        let _ = writeln!(
            out,
            "{:<22}{:>8}{:>10.3}{:>10.3}{:>10.3}{:>10.3}{:>10.3}{:>10.3}{:>10.3}",
            name,
            values.len(),
            mean(values.iter().copied()),
            s.std,
            s.min,
            quantile(values, 0.25),
            quantile(values, 0.5),
            quantile(values, 0.75),
            s.max
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "{:<22}{:>8}{:>8}  {:<20}{:>6}", "", "count", "unique", "top", "freq");
    categorical_row(&mut out, "transformer_id", records.iter().map(|r| r.id.clone()));
    categorical_row(&mut out, "model", records.iter().map(|r| r.model.to_string()));
    categorical_row(&mut out, "test_type", records.iter().map(|r| r.test_type.to_string()));
    categorical_row(&mut out, "approval_status", records.iter().map(|r| r.status.to_string()));
    categorical_row(
        &mut out,
        "test_date",
        records.iter().map(|r| r.test_date.format("%Y-%m-%d").to_string()),
    );
    out
}

fn categorical_row(out: &mut String, name: &str, values: impl Iterator<Item = String>) {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0;
    for v in values {
        *counts.entry(v).or_insert(0) += 1;
        total += 1;
    }
    // Ties resolve to the smallest value.
    let top = counts
        .iter()
        .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(v, n)| (v.as_str(), *n));
    let (top, freq) = top.unwrap_or(("", 0));
    let _ = writeln!(out, "{name:<22}{total:>8}{:>8}  {top:<20}{freq:>6}", counts.len());
}

// ---------------------------------------------------------------------------
// Numeric helpers
// ---------------------------------------------------------------------------

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn spread(values: &[f64]) -> Spread {
    let n = values.len();
    let m = mean(values.iter().copied());
    let std = if n < 2 {
        f64::NAN
    } else {
        let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    };
    Spread {
        std,
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

/// Quantile with linear interpolation between order statistics, using the
/// same two-sided interpolation as NumPy so results agree to the last bit.
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    let t = pos - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    let diff = b - a;
    if t >= 0.5 {
        b - diff * (1.0 - t)
    } else {
        a + diff * t
    }
}

/// Format with K/M suffixes for large magnitudes; `N/A` for NaN.
pub fn format_number(value: f64, decimals: usize, suffix: &str) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    if value.abs() >= 1_000_000.0 {
        format!("{:.*}M{suffix}", decimals, value / 1_000_000.0)
    } else if value.abs() >= 1_000.0 {
        format!("{:.*}K{suffix}", decimals, value / 1_000.0)
    } else {
        format!("{value:.decimals$}{suffix}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::record;
    use crate::data::model::{TableSchema, TestRecord};

    fn table(records: Vec<TestRecord>) -> RecordTable {
        RecordTable::from_records(records).unwrap()
    }

    #[test]
    fn empty_table_gives_zero_metrics() {
        let empty = RecordTable::default();
        let m = basic_metrics(&empty);
        assert_eq!(m, BasicMetrics::default());
        assert_eq!(m.total_tests, 0);
        assert_eq!(m.mean_efficiency, 0.0);
        assert_eq!(m.approval_rate, 0.0);
        assert!(advanced_metrics(&empty, &Thresholds::default()).is_none());
        assert!(custom_kpis(&empty, &KpiConfig::default()).is_empty());
    }

    #[test]
    fn basic_metrics_means_and_approval_rate() {
        let mut rejected = record("c", 99.0, 60.0, 20.0);
        rejected.status = ApprovalStatus::Rejected;
        let t = table(vec![record("a", 99.0, 50.0, 10.0), record("b", 98.0, 55.0, 15.0), rejected]);
        let m = basic_metrics(&t);
        assert_eq!(m.total_tests, 3);
        assert!((m.mean_efficiency - 98.666_666_666_666_67).abs() < 1e-9);
        assert!((m.approval_rate - 66.666_666_666_666_67).abs() < 1e-9);
        assert_eq!(m.mean_temperature, 55.0);
        assert_eq!(m.mean_losses, 15.0);
        assert_eq!(m.mean_rated_power, Some(5.0));
        assert_eq!(m.mean_excitation_current, Some(1.25));
    }

    #[test]
    fn optional_means_follow_the_schema() {
        let t = RecordTable::with_schema(vec![record("a", 99.0, 50.0, 10.0)], TableSchema::default()).unwrap();
        let m = basic_metrics(&t);
        assert_eq!(m.mean_rated_power, None);
        assert_eq!(m.mean_excitation_current, None);
    }

    #[test]
    fn efficiency_out_of_spec_scenario() {
        let t = table(vec![
            record("a", 99.5, 50.0, 10.0),
            record("b", 97.0, 50.0, 10.0),
            record("c", 99.0, 50.0, 10.0),
        ]);
        let thresholds = Thresholds::default();
        let adv = advanced_metrics(&t, &thresholds).unwrap();
        assert_eq!(adv.out_of_spec_efficiency, 1);
        assert_eq!(adv.out_of_spec_temperature, 0);
        assert_eq!(adv.out_of_spec_losses, 0);
        assert_eq!(
            crate::data::model::derive_status(&t.records()[1], &thresholds),
            ApprovalStatus::Rejected
        );
    }

    #[test]
    fn out_of_spec_buckets_are_independent() {
        let t = table(vec![record("a", 97.0, 70.0, 40.0), record("b", 99.0, 50.0, 10.0)]);
        let adv = advanced_metrics(&t, &Thresholds::default()).unwrap();
        assert_eq!(adv.out_of_spec_total(), 3);
        // Two rows, three violations: conformance goes negative.
        assert_eq!(conformance_rate(2, Some(&adv)), -50.0);
    }

    #[test]
    fn out_of_spec_counts_grow_as_thresholds_tighten() {
        let t = table(
            (0..20)
                .map(|i| {
                    let f = i as f64;
                    record(&format!("r{i}"), 97.0 + f * 0.15, 40.0 + f * 1.5, 5.0 + f * 1.4)
                })
                .collect(),
        );
        let mut last = (0, 0, 0);
        for step in 0..10 {
            let s = step as f64;
            let thresholds = Thresholds {
                efficiency_min: 97.0 + s * 0.3,
                temperature_max: 70.0 - s * 3.0,
                losses_max: 35.0 - s * 3.0,
            };
            let adv = advanced_metrics(&t, &thresholds).unwrap();
            let now = (adv.out_of_spec_efficiency, adv.out_of_spec_temperature, adv.out_of_spec_losses);
            assert!(now.0 >= last.0 && now.1 >= last.1 && now.2 >= last.2);
            last = now;
        }
    }

    #[test]
    fn grouped_counts_cover_present_categories_only() {
        let mut b = record("b", 99.0, 50.0, 10.0);
        b.model = TransformerModel::Tsea7500;
        b.test_type = TestType::Special;
        let t = table(vec![record("a", 99.0, 50.0, 10.0), b, record("c", 99.0, 50.0, 10.0)]);
        let adv = advanced_metrics(&t, &Thresholds::default()).unwrap();
        assert_eq!(adv.tests_by_model.len(), 2);
        assert_eq!(adv.tests_by_model[&TransformerModel::Tsea1000], 2);
        assert_eq!(adv.tests_by_type[&TestType::Special], 1);
    }

    #[test]
    fn spread_uses_sample_std() {
        let s = spread(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((s.std - 2.138_089_935_299_395).abs() < 1e-12);
        assert_eq!(s.min, 2.0);
        assert_eq!(s.max, 9.0);
        assert!(spread(&[1.0]).std.is_nan());
    }

    #[test]
    fn quantiles_interpolate_linearly() {
        let v = [99.5, 97.0, 99.0, 98.0];
        // sorted: 97.0, 98.0, 99.0, 99.5
        assert_eq!(quantile(&v, 0.25), 97.75);
        assert_eq!(quantile(&v, 0.75), 99.125);
        assert_eq!(quantile(&v, 0.0), 97.0);
        assert_eq!(quantile(&v, 1.0), 99.5);
        assert_eq!(quantile(&[42.0], 0.75), 42.0);
    }

    #[test]
    fn compare_skips_zero_baselines() {
        let current = BasicMetrics {
            total_tests: 100,
            ..BasicMetrics::default()
        };
        let previous = BasicMetrics::default();
        let diff = compare(&current, &previous);
        assert!(!diff.contains_key(&BasicMetric::TotalTests));
        assert!(diff.is_empty());
    }

    #[test]
    fn compare_reports_percent_change() {
        let previous = BasicMetrics {
            total_tests: 80,
            mean_efficiency: 99.0,
            approval_rate: 90.0,
            mean_temperature: 50.0,
            mean_losses: 10.0,
            ..BasicMetrics::default()
        };
        let current = BasicMetrics {
            total_tests: 100,
            mean_efficiency: 99.0,
            approval_rate: 81.0,
            mean_temperature: 55.0,
            mean_losses: 0.0,
            ..BasicMetrics::default()
        };
        let diff = compare(&current, &previous);
        assert_eq!(diff[&BasicMetric::TotalTests], 25.0);
        assert_eq!(diff[&BasicMetric::MeanEfficiency], 0.0);
        assert!((diff[&BasicMetric::ApprovalRate] + 10.0).abs() < 1e-9);
        assert!((diff[&BasicMetric::MeanTemperature] - 10.0).abs() < 1e-9);
        assert_eq!(diff[&BasicMetric::MeanLosses], -100.0);
    }

    #[test]
    fn conformance_of_empty_table_is_zero() {
        assert_eq!(conformance_rate(0, None), 0.0);
    }

    #[test]
    fn custom_kpis_bands_and_models() {
        let mut rejected = record("c", 98.7, 50.0, 10.0);
        rejected.status = ApprovalStatus::Rejected;
        let t = table(vec![record("a", 98.2, 50.0, 10.0), record("b", 99.5, 50.0, 10.0), rejected]);
        let kpis = custom_kpis(&t, &KpiConfig::default());
        assert_eq!(kpis["efficiency_low"], 1.0);
        assert_eq!(kpis["efficiency_mid"], 1.0);
        assert_eq!(kpis["efficiency_high"], 1.0);
        assert!((kpis["conformance_TSEA-1000"] - 66.666_666_666_666_67).abs() < 1e-9);
        assert!(!kpis.contains_key("conformance_TSEA-2500"));
    }

    #[test]
    fn alerts_fire_on_low_approval_and_heat() {
        let mut hot = record("b", 99.0, 64.0, 10.0);
        hot.status = ApprovalStatus::Rejected;
        let t = table(vec![record("a", 97.9, 50.0, 10.0), hot]);
        let alerts = quality_alerts(&t, &AlertConfig::default());
        assert_eq!(alerts.len(), 3);
        assert!(alerts[0].starts_with("Low approval rate"));
        assert!(alerts[2].starts_with("1 tests"));
    }

    #[test]
    fn summary_report_lists_models() {
        let t = table(vec![record("a", 99.0, 50.0, 10.0)]);
        let report = summary_report(&t, &Thresholds::default());
        assert!(report.contains("- **TSEA-1000:** 1 tests (100.0%)"));
        assert_eq!(
            summary_report(&RecordTable::default(), &Thresholds::default()),
            "No data available for the report."
        );
    }

    #[test]
    fn statistical_summary_has_numeric_and_categorical_rows() {
        let t = table(vec![record("a", 99.0, 50.0, 10.0), record("b", 98.0, 52.0, 12.0)]);
        let text = statistical_summary(&t);
        assert!(text.contains("efficiency_pct"));
        assert!(text.contains("rated_power_mva"));
        assert!(text.lines().any(|l| l.starts_with("model") && l.contains("TSEA-1000")));
    }

    #[test]
    fn kpi_cards_report_margins() {
        let t = table(vec![record("a", 99.0, 50.0, 10.0), record("b", 99.0, 60.0, 20.0)]);
        let thresholds = Thresholds::default();
        let basic = basic_metrics(&t);
        let adv = advanced_metrics(&t, &thresholds);
        let cards = kpi_cards(&basic, adv.as_ref(), &thresholds, &KpiConfig::default());
        assert_eq!(cards.len(), 8);
        assert_eq!(cards[0].value, "2");
        assert_eq!(cards[2].delta, Some(10.0));
        assert_eq!(cards[3].delta, Some(10.0));
        assert_eq!(cards.last().unwrap().value, "100.0%");
        assert_eq!(cards.last().unwrap().delta, Some(5.0));
    }

    #[test]
    fn number_formatting() {
        assert_eq!(format_number(1_500_000.0, 1, ""), "1.5M");
        assert_eq!(format_number(2_500.0, 2, " kW"), "2.50K kW");
        assert_eq!(format_number(12.346, 2, "%"), "12.35%");
        assert_eq!(format_number(f64::NAN, 2, ""), "N/A");
    }
}
