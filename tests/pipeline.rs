use std::collections::BTreeSet;

use chrono::NaiveDate;

use transformer_dashboard::config::{DashboardConfig, Thresholds};
use transformer_dashboard::data::filter::{self, FilterSpec, FilterUniverse, ValueRange};
use transformer_dashboard::data::generator;
use transformer_dashboard::data::model::{ApprovalStatus, RecordTable, TestType};
use transformer_dashboard::error::{FilterError, SelectionDimension};
use transformer_dashboard::metrics;
use transformer_dashboard::session::SessionContext;

fn sample() -> RecordTable {
    let anchor = NaiveDate::from_ymd_opt(2025, 6, 29).unwrap();
    generator::generate(500, 42, anchor, Thresholds::default()).unwrap()
}

/// `sub` is an order-preserving subsequence of `table`.
fn is_subsequence(sub: &RecordTable, table: &RecordTable) -> bool {
    let mut source = table.records().iter();
    sub.records().iter().all(|r| source.any(|s| s == r))
}

#[test]
fn full_universe_spec_returns_the_table() {
    let table = sample();
    let universe = FilterUniverse::from_table(&table).unwrap();
    let spec = FilterSpec::full(&universe);
    assert_eq!(filter::validate(&spec), Ok(()));
    assert_eq!(filter::apply(&table, &spec), table);
    assert_eq!(filter::describe(&spec, &universe), filter::NO_FILTER_SUMMARY);
}

#[test]
fn narrowed_specs_yield_ordered_subsequences() {
    let table = sample();
    let universe = FilterUniverse::from_table(&table).unwrap();

    let mut specs = Vec::new();
    let mut by_status = FilterSpec::full(&universe);
    by_status.statuses = BTreeSet::from([ApprovalStatus::Rejected]);
    specs.push(by_status);

    let mut by_type = FilterSpec::full(&universe);
    by_type.test_types = Some(BTreeSet::from([TestType::Routine, TestType::Special]));
    by_type.efficiency = Some(ValueRange::new(99.0, 99.9));
    specs.push(by_type);

    let mut by_period = FilterSpec::full(&universe);
    by_period.period = Some(vec![
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
    ]);
    specs.push(by_period);

    for spec in &specs {
        let subset = filter::apply(&table, spec);
        assert!(is_subsequence(&subset, &table));
        assert!(subset.records().iter().all(|r| spec.matches(r)));
        assert_eq!(filter::apply(&table, spec), subset);
        assert_ne!(filter::describe(spec, &universe), filter::NO_FILTER_SUMMARY);
    }
}

#[test]
fn validation_errors_name_the_dimension() {
    let table = sample();
    let universe = FilterUniverse::from_table(&table).unwrap();

    let mut spec = FilterSpec::full(&universe);
    spec.statuses.clear();
    assert_eq!(
        filter::validate(&spec),
        Err(FilterError::EmptySelection(SelectionDimension::Status))
    );

    let mut spec = FilterSpec::full(&universe);
    spec.period = Some(vec![universe.first_date]);
    assert_eq!(
        filter::validate(&spec),
        Err(FilterError::IncompleteRange { endpoints: 1 })
    );
}

#[test]
fn generated_data_is_reproducible_and_consistent() {
    let a = sample();
    let b = sample();
    assert_eq!(a, b);

    let thresholds = Thresholds::default();
    let basic = metrics::basic_metrics(&a);
    let advanced = metrics::advanced_metrics(&a, &thresholds).unwrap();
    assert_eq!(basic.total_tests, 500);
    assert_eq!(advanced.tests_by_model.values().sum::<usize>(), 500);
    assert_eq!(advanced.tests_by_type.values().sum::<usize>(), 500);
    // Generated efficiency never drops below the clip floor.
    assert_eq!(advanced.out_of_spec_efficiency, 0);
    assert!(advanced.efficiency.q25 <= advanced.efficiency.q75);
    assert!((0.0..=100.0).contains(&basic.approval_rate));
}

#[test]
fn session_keeps_last_valid_view() {
    let table = sample();
    let universe = FilterUniverse::from_table(&table).unwrap();
    let mut session = SessionContext::new();

    let mut rejected_only = FilterSpec::full(&universe);
    rejected_only.statuses = BTreeSet::from([ApprovalStatus::Rejected]);
    let view = session.apply_filters(&table, &rejected_only).unwrap();
    assert!(view.records().iter().all(|r| r.status == ApprovalStatus::Rejected));

    let mut broken = rejected_only.clone();
    broken.models.clear();
    assert!(session.apply_filters(&table, &broken).is_err());
    assert_eq!(session.active_filters(), Some(&rejected_only));
}

#[test]
fn default_config_matches_generator_thresholds() {
    let config = DashboardConfig::default();
    assert_eq!(config.thresholds, Thresholds::default());
    assert_eq!(config.data.records, 500);
    assert_eq!(config.data.seed, 42);
}

#[test]
fn example_config_spells_out_the_defaults() {
    let config =
        DashboardConfig::from_toml_str(include_str!("../dashboard.example.toml")).unwrap();
    assert_eq!(config, DashboardConfig::default());
}
