use anyhow::{Context, Result};
use chrono::{Duration, NaiveDate};
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::model::{
    derive_status, ApprovalStatus, Category, RecordTable, TableSchema, TestRecord, TestType,
    TransformerModel, PRIMARY_VOLTAGES_KV, RATED_POWERS_MVA, SECONDARY_VOLTAGES_KV,
};
use crate::config::Thresholds;

const MODEL_WEIGHTS: [f64; 6] = [0.25, 0.20, 0.20, 0.15, 0.10, 0.10];
const TEST_TYPE_WEIGHTS: [f64; 5] = [0.50, 0.20, 0.15, 0.10, 0.05];
const STATUS_WEIGHTS: [f64; 2] = [0.92, 0.08];

/// Length of the generated date window, ending at the anchor date.
const DATE_WINDOW_DAYS: i64 = 730;

// ---------------------------------------------------------------------------
// Synthetic record generator
// ---------------------------------------------------------------------------

/// Seeded generator of plausible transformer test records.
///
/// The same `(seed, anchor)` pair always produces the same table.
pub struct RecordGenerator {
    rng: StdRng,
    anchor: NaiveDate,
    thresholds: Thresholds,
    models: WeightedIndex<f64>,
    test_types: WeightedIndex<f64>,
    statuses: WeightedIndex<f64>,
}

impl RecordGenerator {
    pub fn new(seed: u64, anchor: NaiveDate, thresholds: Thresholds) -> Result<Self> {
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            anchor,
            thresholds,
            models: WeightedIndex::new(MODEL_WEIGHTS).context("model weights")?,
            test_types: WeightedIndex::new(TEST_TYPE_WEIGHTS).context("test type weights")?,
            statuses: WeightedIndex::new(STATUS_WEIGHTS).context("status weights")?,
        })
    }

    /// Generate `n` records with ids `TR-1000`, `TR-1001`, ...
    pub fn generate(&mut self, n: usize) -> Result<RecordTable> {
        let records: Vec<TestRecord> = (0..n).map(|i| self.next_record(i)).collect();
        let table = RecordTable::with_schema(records, TableSchema::full())?;
        log::info!("Generated {} synthetic test records", table.len());
        Ok(table)
    }

    fn next_record(&mut self, index: usize) -> TestRecord {
        let model = TransformerModel::ALL[self.models.sample(&mut self.rng)];
        let days_back = self.rng.gen_range(0..DATE_WINDOW_DAYS);
        let test_date = self.anchor - Duration::days(DATE_WINDOW_DAYS) + Duration::days(days_back);
        let test_type = TestType::ALL[self.test_types.sample(&mut self.rng)];

        let efficiency = round_to(self.gauss(99.2, 0.3).clamp(98.0, 99.9), 2);
        let temperature = round_to(self.gauss(55.0, 5.0).clamp(40.0, 70.0), 1);
        let losses = round_to(self.gauss(2.5, 0.4).exp().clamp(3.0, 35.0), 2);
        let status = ApprovalStatus::ALL[self.statuses.sample(&mut self.rng)];

        let primary = self.pick(&PRIMARY_VOLTAGES_KV);
        let secondary = self.pick(&SECONDARY_VOLTAGES_KV);
        let rated_power = self.pick(&RATED_POWERS_MVA);
        let excitation = round_to(self.rng.gen_range(0.5..3.0), 2);

        let mut record = TestRecord {
            id: format!("TR-{:04}", 1000 + index),
            model,
            test_date,
            test_type,
            efficiency_pct: efficiency,
            temperature_rise_c: temperature,
            total_losses_kw: losses,
            status,
            primary_voltage_kv: Some(primary),
            secondary_voltage_kv: Some(secondary),
            rated_power_mva: Some(rated_power),
            excitation_current_a: Some(excitation),
        };
        self.correlate(&mut record);
        record
    }

    /// Couple power, losses and temperature, then re-derive the status from
    /// the final numbers.
    fn correlate(&mut self, record: &mut TestRecord) {
        if record.rated_power_mva.is_some_and(|p| p > 10.0) {
            record.total_losses_kw *= 1.5;
        }
        let heating = record.total_losses_kw * 0.8 + self.gauss(0.0, 2.0);
        record.temperature_rise_c = (record.temperature_rise_c + heating).clamp(40.0, 70.0);
        record.status = derive_status(record, &self.thresholds);
    }

    fn pick(&mut self, catalog: &[f64]) -> f64 {
        catalog[self.rng.gen_range(0..catalog.len())]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.rng.gen::<f64>().max(1e-15);
        let u2 = self.rng.gen::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Generate `n` records for `seed` with the date window ending at `anchor`.
pub fn generate(n: usize, seed: u64, anchor: NaiveDate, thresholds: Thresholds) -> Result<RecordTable> {
    RecordGenerator::new(seed, anchor, thresholds)?.generate(n)
}
