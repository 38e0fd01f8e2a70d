use std::collections::VecDeque;

use chrono::{DateTime, Local};

use crate::data::filter::{self, FilterSpec};
use crate::data::model::RecordTable;
use crate::error::FilterError;

pub const FILTER_HISTORY_LIMIT: usize = 10;
pub const ACTION_LOG_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    pub at: DateTime<Local>,
    pub spec: FilterSpec,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActionEntry {
    pub at: DateTime<Local>,
    pub action: String,
    pub details: String,
}

/// Everything one dashboard session remembers between frames.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub started_at: DateTime<Local>,
    active: Option<FilterSpec>,
    history: VecDeque<HistoryEntry>,
    actions: VecDeque<ActionEntry>,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext {
    pub fn new() -> Self {
        Self {
            started_at: Local::now(),
            active: None,
            history: VecDeque::with_capacity(FILTER_HISTORY_LIMIT),
            actions: VecDeque::with_capacity(ACTION_LOG_LIMIT),
        }
    }

    /// Validate `spec` and filter `table` with it. On success the spec
    /// becomes active and is pushed to the history; on failure the previous
    /// spec stays active and the error is returned.
    pub fn apply_filters(&mut self, table: &RecordTable, spec: &FilterSpec) -> Result<RecordTable, FilterError> {
        if let Err(err) = filter::validate(spec) {
            log::warn!("Filter rejected: {err}");
            self.log_action("filter_rejected", err.to_string());
            return Err(err);
        }
        let subset = filter::apply(table, spec);
        log::info!("Filters applied: {} of {} records", subset.len(), table.len());

        if self.active.as_ref() != Some(spec) {
            push_capped(
                &mut self.history,
                HistoryEntry {
                    at: Local::now(),
                    spec: spec.clone(),
                },
                FILTER_HISTORY_LIMIT,
            );
            self.log_action("filters_applied", format!("{} records", subset.len()));
        }
        self.active = Some(spec.clone());
        Ok(subset)
    }

    pub fn log_action(&mut self, action: impl Into<String>, details: impl Into<String>) {
        push_capped(
            &mut self.actions,
            ActionEntry {
                at: Local::now(),
                action: action.into(),
                details: details.into(),
            },
            ACTION_LOG_LIMIT,
        );
    }

    /// The last spec that passed validation.
    pub fn active_filters(&self) -> Option<&FilterSpec> {
        self.active.as_ref()
    }

    /// Oldest first.
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    /// Oldest first.
    pub fn actions(&self) -> impl DoubleEndedIterator<Item = &ActionEntry> {
        self.actions.iter()
    }

    /// Forget the active spec, e.g. after a new dataset is loaded.
    pub fn reset_filters(&mut self) {
        self.active = None;
    }
}

fn push_capped<T>(queue: &mut VecDeque<T>, item: T, limit: usize) {
    if queue.len() == limit {
        queue.pop_front();
    }
    queue.push_back(item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::{FilterUniverse, ValueRange};
    use crate::data::model::fixtures::record;

    fn table() -> RecordTable {
        RecordTable::from_records(vec![
            record("a", 99.0, 50.0, 10.0),
            record("b", 98.2, 55.0, 12.0),
            record("c", 99.6, 45.0, 8.0),
        ])
        .unwrap()
    }

    #[test]
    fn invalid_spec_keeps_previous_filters() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let good = FilterSpec::full(&universe);
        let mut session = SessionContext::new();
        assert_eq!(session.apply_filters(&t, &good).unwrap().len(), 3);

        let mut bad = good.clone();
        bad.models.clear();
        assert!(session.apply_filters(&t, &bad).is_err());
        assert_eq!(session.active_filters(), Some(&good));
        assert_eq!(session.actions().last().unwrap().action, "filter_rejected");
    }

    #[test]
    fn history_is_capped_and_deduplicated() {
        let t = table();
        let universe = FilterUniverse::from_table(&t).unwrap();
        let mut session = SessionContext::new();
        for i in 0..15 {
            let mut spec = FilterSpec::full(&universe);
            spec.efficiency = Some(ValueRange::new(98.0 + i as f64 * 0.01, 100.0));
            session.apply_filters(&t, &spec).unwrap();
            session.apply_filters(&t, &spec).unwrap();
        }
        assert_eq!(session.history().count(), FILTER_HISTORY_LIMIT);
        let newest = session.history().next_back().unwrap();
        assert_eq!(newest.spec.efficiency.unwrap().min, 98.0 + 14.0 * 0.01);
    }

    #[test]
    fn action_log_is_capped() {
        let mut session = SessionContext::new();
        for i in 0..60 {
            session.log_action("export", format!("{i}"));
        }
        assert_eq!(session.actions().count(), ACTION_LOG_LIMIT);
        assert_eq!(session.actions().next().unwrap().details, "10");
    }
}
