use std::collections::BTreeSet;

use chrono::{Duration, NaiveDate};

use super::model::{ApprovalStatus, Category, PowerRating, RecordTable, TestRecord, TestType, TransformerModel};
use crate::error::{FilterError, SelectionDimension};

/// Returned by [`describe`] when no dimension narrows the table.
pub const NO_FILTER_SUMMARY: &str = "All data is shown (no filter applied)";

// ---------------------------------------------------------------------------
// Filter predicate types
// ---------------------------------------------------------------------------

/// Closed numeric interval `[min, max]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Smallest range covering all values. `None` for an empty iterator.
    pub fn spanning(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        values.into_iter().fold(None, |acc, v| match acc {
            None => Some(Self::new(v, v)),
            Some(r) => Some(Self::new(r.min.min(v), r.max.max(v))),
        })
    }

    fn narrower_than(&self, full: &ValueRange) -> bool {
        self.min > full.min || self.max < full.max
    }
}

/// The user's constraint set.
///
/// * `models` / `statuses` are always active and must be non-empty.
/// * `None` or an empty set on the other dimensions means "no constraint".
/// * `period` holds whatever endpoints the date picker produced; only a
///   pair is a valid interval.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub models: BTreeSet<TransformerModel>,
    pub statuses: BTreeSet<ApprovalStatus>,
    pub test_types: Option<BTreeSet<TestType>>,
    pub period: Option<Vec<NaiveDate>>,
    pub efficiency: Option<ValueRange>,
    pub temperature: Option<ValueRange>,
    pub losses: Option<ValueRange>,
    pub rated_powers: Option<BTreeSet<PowerRating>>,
}

/// Full value set of every filterable dimension in the unfiltered table.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterUniverse {
    pub models: BTreeSet<TransformerModel>,
    pub statuses: BTreeSet<ApprovalStatus>,
    pub test_types: BTreeSet<TestType>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub efficiency: ValueRange,
    pub temperature: ValueRange,
    pub losses: ValueRange,
    /// Empty when the table has no rated-power column.
    pub rated_powers: BTreeSet<PowerRating>,
}

impl FilterUniverse {
    /// `None` for an empty table.
    pub fn from_table(table: &RecordTable) -> Option<Self> {
        let records = table.records();
        let (first_date, last_date) = table.date_span()?;
        Some(Self {
            models: records.iter().map(|r| r.model).collect(),
            statuses: records.iter().map(|r| r.status).collect(),
            test_types: records.iter().map(|r| r.test_type).collect(),
            first_date,
            last_date,
            efficiency: ValueRange::spanning(records.iter().map(|r| r.efficiency_pct))?,
            temperature: ValueRange::spanning(records.iter().map(|r| r.temperature_rise_c))?,
            losses: ValueRange::spanning(records.iter().map(|r| r.total_losses_kw))?,
            rated_powers: if table.schema().rated_power {
                records.iter().filter_map(|r| r.rated_power()).collect()
            } else {
                BTreeSet::new()
            },
        })
    }
}

impl FilterSpec {
    /// A spec selecting everything in `universe` (the initial widget state).
    pub fn full(universe: &FilterUniverse) -> Self {
        Self {
            models: universe.models.clone(),
            statuses: universe.statuses.clone(),
            test_types: Some(universe.test_types.clone()),
            period: Some(vec![universe.first_date, universe.last_date]),
            efficiency: Some(universe.efficiency),
            temperature: Some(universe.temperature),
            losses: Some(universe.losses),
            rated_powers: if universe.rated_powers.is_empty() {
                None
            } else {
                Some(universe.rated_powers.clone())
            },
        }
    }

    /// The date interval, if exactly two endpoints were chosen.
    pub fn date_interval(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self.period.as_deref() {
            Some([start, end]) => Some((*start, *end)),
            _ => None,
        }
    }

    /// Whether `record` satisfies every active dimension.
    pub fn matches(&self, record: &TestRecord) -> bool {
        if !allows(Some(&self.models), &record.model) {
            return false;
        }
        if !allows(Some(&self.statuses), &record.status) {
            return false;
        }
        if !allows(self.test_types.as_ref(), &record.test_type) {
            return false;
        }
        if let Some((start, end)) = self.date_interval() {
            if record.test_date < start || record.test_date > end {
                return false;
            }
        }
        let in_range = |range: &Option<ValueRange>, v: f64| range.map_or(true, |r| r.contains(v));
        if !in_range(&self.efficiency, record.efficiency_pct)
            || !in_range(&self.temperature, record.temperature_rise_c)
            || !in_range(&self.losses, record.total_losses_kw)
        {
            return false;
        }
        match &self.rated_powers {
            Some(selected) if !selected.is_empty() => record
                .rated_power()
                .is_some_and(|p| selected.contains(&p)),
            _ => true,
        }
    }
}

/// An absent or empty set places no constraint.
fn allows<T: Ord>(selected: Option<&BTreeSet<T>>, value: &T) -> bool {
    match selected {
        Some(set) if !set.is_empty() => set.contains(value),
        _ => true,
    }
}

// ---------------------------------------------------------------------------
// Filter engine
// ---------------------------------------------------------------------------

/// Check a spec before it is applied.
pub fn validate(spec: &FilterSpec) -> Result<(), FilterError> {
    if let Some(endpoints) = &spec.period {
        if endpoints.len() != 2 {
            return Err(FilterError::IncompleteRange {
                endpoints: endpoints.len(),
            });
        }
    }
    if spec.models.is_empty() {
        return Err(FilterError::EmptySelection(SelectionDimension::Model));
    }
    if spec.statuses.is_empty() {
        return Err(FilterError::EmptySelection(SelectionDimension::Status));
    }
    Ok(())
}

/// Return indices of records that pass all active filters, in table order.
pub fn filtered_indices(table: &RecordTable, spec: &FilterSpec) -> Vec<usize> {
    table
        .records()
        .iter()
        .enumerate()
        .filter(|(_, r)| spec.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// The subset of `table` passing `spec`. Source order is kept and the
/// source table is left untouched.
pub fn apply(table: &RecordTable, spec: &FilterSpec) -> RecordTable {
    let indices = filtered_indices(table, spec);
    log::debug!("Filter kept {} of {} records", indices.len(), table.len());
    table.select(&indices)
}

/// One-line summary of the dimensions that actually narrow `universe`.
pub fn describe(spec: &FilterSpec, universe: &FilterUniverse) -> String {
    let mut parts = Vec::new();

    if restricts(&spec.models, &universe.models) {
        parts.push(format!("Models: {}", join(&spec.models)));
    }
    if restricts(&spec.statuses, &universe.statuses) {
        parts.push(format!("Status: {}", join(&spec.statuses)));
    }
    if let Some(types) = &spec.test_types {
        if restricts(types, &universe.test_types) {
            parts.push(format!("Test types: {}", join(types)));
        }
    }
    if let Some((start, end)) = spec.date_interval() {
        if start > universe.first_date || end < universe.last_date {
            parts.push(format!(
                "Period: {} to {}",
                start.format("%Y-%m-%d"),
                end.format("%Y-%m-%d")
            ));
        }
    }
    let ranges = [
        ("Efficiency", "%", spec.efficiency, universe.efficiency),
        ("Temperature rise", "°C", spec.temperature, universe.temperature),
        ("Losses", "kW", spec.losses, universe.losses),
    ];
    for (name, unit, range, full) in ranges {
        if let Some(r) = range.filter(|r| r.narrower_than(&full)) {
            parts.push(format!("{name}: {:.2}–{:.2} {unit}", r.min, r.max));
        }
    }
    if let Some(powers) = &spec.rated_powers {
        if restricts(powers, &universe.rated_powers) {
            parts.push(format!("Rated power: {}", join(powers)));
        }
    }

    if parts.is_empty() {
        NO_FILTER_SUMMARY.to_string()
    } else {
        format!("Filters applied: {}", parts.join(" | "))
    }
}

/// A non-empty selection that leaves out at least one value of the universe.
fn restricts<T: Ord>(selected: &BTreeSet<T>, all: &BTreeSet<T>) -> bool {
    !selected.is_empty() && all.iter().any(|v| !selected.contains(v))
}

fn join<T: std::fmt::Display>(values: &BTreeSet<T>) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// ---------------------------------------------------------------------------
// Quick filters
// ---------------------------------------------------------------------------

/// One-click presets applied before the detailed filters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum QuickFilter {
    #[default]
    All,
    ApprovedOnly,
    RejectedOnly,
    LastMonth,
}

impl QuickFilter {
    pub const ALL: [QuickFilter; 4] = [
        QuickFilter::All,
        QuickFilter::ApprovedOnly,
        QuickFilter::RejectedOnly,
        QuickFilter::LastMonth,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QuickFilter::All => "All data",
            QuickFilter::ApprovedOnly => "Approved only",
            QuickFilter::RejectedOnly => "Rejected only",
            QuickFilter::LastMonth => "Last 30 days",
        }
    }

    /// Apply the preset; `today` anchors [`QuickFilter::LastMonth`].
    pub fn apply(&self, table: &RecordTable, today: NaiveDate) -> RecordTable {
        let keep: Box<dyn Fn(&TestRecord) -> bool> = match self {
            QuickFilter::All => return table.clone(),
            QuickFilter::ApprovedOnly => Box::new(|r: &TestRecord| r.status == ApprovalStatus::Approved),
            QuickFilter::RejectedOnly => Box::new(|r: &TestRecord| r.status == ApprovalStatus::Rejected),
            QuickFilter::LastMonth => {
                let cutoff = today - Duration::days(30);
                Box::new(move |r: &TestRecord| r.test_date >= cutoff)
            }
        };
        let indices: Vec<usize> = table
            .records()
            .iter()
            .enumerate()
            .filter(|(_, r)| keep(r))
            .map(|(i, _)| i)
            .collect();
        table.select(&indices)
    }
}

/// Every category value of `C`, for "select all" buttons.
pub fn all_of<C: Category>() -> BTreeSet<C> {
    C::ALL.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::fixtures::record;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> RecordTable {
        let mut a = record("TR-1", 99.5, 50.0, 10.0);
        a.model = TransformerModel::Tsea1000;
        a.test_date = date(2025, 1, 10);
        let mut b = record("TR-2", 98.4, 62.0, 20.0);
        b.model = TransformerModel::Tsea2500;
        b.test_date = date(2025, 2, 10);
        b.test_type = TestType::Type;
        b.rated_power_mva = Some(15.0);
        let mut c = record("TR-3", 99.0, 58.0, 14.0);
        c.model = TransformerModel::Tsea1000;
        c.status = ApprovalStatus::Rejected;
        c.test_date = date(2025, 3, 10);
        let mut d = record("TR-4", 98.9, 45.0, 8.0);
        d.model = TransformerModel::Tsea5000;
        d.test_date = date(2025, 4, 10);
        d.test_type = TestType::Special;
        RecordTable::from_records(vec![a, b, c, d]).unwrap()
    }

    fn ids(t: &RecordTable) -> Vec<&str> {
        t.records().iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn full_universe_spec_is_identity() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let spec = FilterSpec::full(&universe);
        assert_eq!(apply(&t, &spec), t);
        assert_eq!(describe(&spec, &universe), NO_FILTER_SUMMARY);
    }

    #[test]
    fn dimensions_combine_with_and_and_keep_order() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        spec.models = [TransformerModel::Tsea1000, TransformerModel::Tsea5000].into();
        spec.statuses = [ApprovalStatus::Approved].into();
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-1", "TR-4"]);

        spec.period = Some(vec![date(2025, 3, 1), date(2025, 4, 30)]);
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-4"]);
    }

    #[test]
    fn degenerate_range_keeps_exact_matches() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        spec.efficiency = Some(ValueRange::new(99.0, 99.0));
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-3"]);
    }

    #[test]
    fn period_endpoints_are_inclusive() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        spec.period = Some(vec![date(2025, 4, 10), date(2025, 5, 1)]);
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-4"]);

        spec.period = Some(vec![date(2025, 2, 10), date(2025, 3, 10)]);
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-2", "TR-3"]);

        spec.period = Some(vec![date(2025, 4, 10), date(2025, 4, 10)]);
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-4"]);
    }

    #[test]
    fn absent_and_empty_optional_dimensions_do_not_constrain() {
        let t = table();
        let spec = FilterSpec {
            models: all_of(),
            statuses: all_of(),
            test_types: Some(BTreeSet::new()),
            rated_powers: Some(BTreeSet::new()),
            ..FilterSpec::default()
        };
        assert_eq!(apply(&t, &spec).len(), 4);
    }

    #[test]
    fn rated_power_selection_filters_membership() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        spec.rated_powers = Some([PowerRating(15.0)].into());
        assert_eq!(ids(&apply(&t, &spec)), vec!["TR-2"]);
        assert_eq!(
            describe(&spec, &universe),
            "Filters applied: Rated power: 15 MVA"
        );
    }

    #[test]
    fn validate_requires_models_and_statuses() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        assert_eq!(validate(&spec), Ok(()));

        spec.models.clear();
        assert_eq!(
            validate(&spec),
            Err(FilterError::EmptySelection(SelectionDimension::Model))
        );

        spec.models = all_of();
        spec.statuses.clear();
        assert_eq!(
            validate(&spec),
            Err(FilterError::EmptySelection(SelectionDimension::Status))
        );
    }

    #[test]
    fn validate_requires_two_period_endpoints() {
        let mut spec = FilterSpec {
            models: all_of(),
            statuses: all_of(),
            ..FilterSpec::default()
        };
        for endpoints in [0usize, 1, 3] {
            spec.period = Some(vec![date(2025, 1, 1); endpoints]);
            assert_eq!(
                validate(&spec),
                Err(FilterError::IncompleteRange { endpoints })
            );
        }
        spec.period = None;
        assert_eq!(validate(&spec), Ok(()));
    }

    #[test]
    fn describe_reports_only_restricting_dimensions() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        spec.statuses = [ApprovalStatus::Rejected].into();
        spec.period = Some(vec![date(2025, 2, 1), date(2025, 4, 10)]);
        spec.losses = Some(ValueRange::new(9.0, 20.0));
        assert_eq!(
            describe(&spec, &universe),
            "Filters applied: Status: Rejected | Period: 2025-02-01 to 2025-04-10 | Losses: 9.00–20.00 kW"
        );
    }

    #[test]
    fn selecting_values_outside_the_universe_is_not_a_restriction() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut spec = FilterSpec::full(&universe);
        spec.models = all_of();
        assert_eq!(describe(&spec, &universe), NO_FILTER_SUMMARY);
    }

    #[test]
    fn quick_filters() {
        let t = table();
        assert_eq!(QuickFilter::All.apply(&t, date(2025, 5, 1)), t);
        assert_eq!(
            ids(&QuickFilter::RejectedOnly.apply(&t, date(2025, 5, 1))),
            vec!["TR-3"]
        );
        assert_eq!(
            ids(&QuickFilter::ApprovedOnly.apply(&t, date(2025, 5, 1))),
            vec!["TR-1", "TR-2", "TR-4"]
        );
        assert_eq!(
            ids(&QuickFilter::LastMonth.apply(&t, date(2025, 5, 1))),
            vec!["TR-4"]
        );
    }
}
