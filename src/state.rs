use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::charts::ChartKind;
use crate::config::DashboardConfig;
use crate::data::filter::{self, FilterSpec, FilterUniverse, QuickFilter};
use crate::data::loader::LoadedTable;
use crate::data::model::{Category, Column, PowerRating, RecordTable, TestRecord};
use crate::error::{ColumnIssue, FilterError};
use crate::narrative::{self, Narrative, NarrativeError, NarrativeService};
use crate::session::SessionContext;

/// Table rows shown when no limit is chosen.
pub const DEFAULT_ROW_LIMIT: usize = 50;
pub const ROW_LIMITS: [usize; 4] = [10, 25, 50, 100];

// ---------------------------------------------------------------------------
// Sub-states
// ---------------------------------------------------------------------------

/// Where the current dataset came from, and what the loader had to say.
#[derive(Debug, Clone, PartialEq)]
pub struct DataReport {
    pub source: String,
    pub records: usize,
    /// Columns in the source, including ones the dashboard ignores.
    pub columns: usize,
    pub period: Option<(NaiveDate, NaiveDate)>,
    pub warnings: Vec<ColumnIssue>,
}

/// Sorting and paging of the data table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TableView {
    pub sort_by: Column,
    pub descending: bool,
    /// `None` shows every row.
    pub row_limit: Option<usize>,
}

impl Default for TableView {
    fn default() -> Self {
        Self {
            sort_by: Column::TestDate,
            descending: true,
            row_limit: Some(DEFAULT_ROW_LIMIT),
        }
    }
}

impl TableView {
    /// Clicking the active column flips the direction.
    pub fn sort_on(&mut self, column: Column) {
        if self.sort_by == column {
            self.descending = !self.descending;
        } else {
            self.sort_by = column;
            self.descending = true;
        }
    }

    /// Row order for `table` under this view, already truncated.
    pub fn ordered_rows<'a>(&self, table: &'a RecordTable) -> Vec<&'a TestRecord> {
        let mut rows: Vec<&TestRecord> = table.records().iter().collect();
        rows.sort_by(|a, b| {
            let ord = compare_by(a, b, self.sort_by);
            if self.descending {
                ord.reverse()
            } else {
                ord
            }
        });
        if let Some(limit) = self.row_limit {
            rows.truncate(limit);
        }
        rows
    }
}

fn compare_by(a: &TestRecord, b: &TestRecord, column: Column) -> std::cmp::Ordering {
    match column {
        Column::Id => a.id.cmp(&b.id),
        Column::Model => a.model.cmp(&b.model),
        Column::TestDate => a.test_date.cmp(&b.test_date),
        Column::TestType => a.test_type.cmp(&b.test_type),
        Column::Status => a.status.cmp(&b.status),
        Column::Efficiency => a.efficiency_pct.total_cmp(&b.efficiency_pct),
        Column::TemperatureRise => a.temperature_rise_c.total_cmp(&b.temperature_rise_c),
        Column::TotalLosses => a.total_losses_kw.total_cmp(&b.total_losses_kw),
        optional => {
            let key = |r: &TestRecord| r.optional_value(optional).unwrap_or(f64::NEG_INFINITY);
            key(a).total_cmp(&key(b))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrativeRequest {
    Diagnosis(String),
    ExecutiveSummary,
}

/// A narrative request runs in two frames: the first one after the request
/// only arms it so the spinner gets drawn, the next one makes the blocking
/// call.
#[derive(Debug, Clone, Default)]
pub struct NarrativeState {
    pending: Option<NarrativeRequest>,
    armed: bool,
    pub diagnosis_id: Option<String>,
    pub output: Option<Narrative>,
}

impl NarrativeState {
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub config: DashboardConfig,

    /// The unfiltered table (None until data is generated or loaded).
    pub dataset: Option<RecordTable>,

    /// Full value sets of the unfiltered table.
    pub universe: Option<FilterUniverse>,

    /// Filter widgets edit this spec; it only takes effect once valid.
    pub draft: FilterSpec,

    pub quick_filter: QuickFilter,

    /// Rows passing the quick filter and the last valid spec.
    pub view: RecordTable,

    /// Why the draft was not applied.
    pub filter_error: Option<FilterError>,

    pub report: Option<DataReport>,
    pub session: SessionContext,
    pub narrative: NarrativeState,
    pub table_view: TableView,
    pub chart: ChartKind,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            dataset: None,
            universe: None,
            draft: FilterSpec::default(),
            quick_filter: QuickFilter::All,
            view: RecordTable::default(),
            filter_error: None,
            report: None,
            session: SessionContext::new(),
            narrative: NarrativeState::default(),
            table_view: TableView::default(),
            chart: ChartKind::default(),
            status_message: None,
        }
    }

    /// Ingest a newly loaded table and reset every filter to the full
    /// universe. An empty table is kept so the UI can say so.
    pub fn set_dataset(&mut self, loaded: LoadedTable, source: impl Into<String>) {
        let source = source.into();
        self.report = Some(DataReport {
            source: source.clone(),
            records: loaded.table.len(),
            columns: loaded.source_columns,
            period: loaded.period(),
            warnings: loaded.warnings,
        });
        self.universe = FilterUniverse::from_table(&loaded.table);
        self.draft = self
            .universe
            .as_ref()
            .map(FilterSpec::full)
            .unwrap_or_default();
        self.quick_filter = QuickFilter::All;
        self.view = loaded.table.clone();
        self.dataset = Some(loaded.table);
        self.filter_error = None;
        self.status_message = None;
        self.narrative = NarrativeState::default();
        self.session.reset_filters();
        self.session
            .log_action("data_loaded", format!("{} records from {source}", self.view.len()));
        self.refilter();
    }

    /// Recompute `view` after a filter change. An invalid draft leaves the
    /// previous view in place.
    pub fn refilter(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        if self.universe.is_none() {
            return;
        }
        let base = self.quick_filter.apply(dataset, self.config.data.anchor());
        match self.session.apply_filters(&base, &self.draft) {
            Ok(subset) => {
                self.view = subset;
                self.filter_error = None;
            }
            Err(err) => self.filter_error = Some(err),
        }
    }

    pub fn set_quick_filter(&mut self, quick: QuickFilter) {
        if self.quick_filter != quick {
            self.quick_filter = quick;
            self.session.log_action("quick_filter", quick.label());
            self.refilter();
        }
    }

    /// Put every widget back to the full universe.
    pub fn clear_filters(&mut self) {
        if let Some(universe) = &self.universe {
            self.draft = FilterSpec::full(universe);
        }
        self.quick_filter = QuickFilter::All;
        self.session.log_action("filters_cleared", "");
        self.refilter();
    }

    /// Summary line of what currently narrows the view.
    pub fn filter_summary(&self) -> String {
        match (&self.universe, self.session.active_filters()) {
            (Some(universe), Some(active)) => filter::describe(active, universe),
            _ => filter::NO_FILTER_SUMMARY.to_string(),
        }
    }

    pub fn toggle<C: Category>(set: &mut BTreeSet<C>, value: C) {
        if !set.remove(&value) {
            set.insert(value);
        }
    }

    pub fn toggle_power(&mut self, power: PowerRating) {
        let selected = self.draft.rated_powers.get_or_insert_with(BTreeSet::new);
        if !selected.remove(&power) {
            selected.insert(power);
        }
        self.refilter();
    }

    // ---- Narrative ----

    pub fn request_narrative(&mut self, request: NarrativeRequest) {
        if self.narrative.is_busy() {
            return;
        }
        self.narrative.pending = Some(request);
        self.narrative.armed = false;
        self.narrative.output = None;
    }

    /// Advance a pending request by one frame. Returns true while another
    /// frame is needed.
    pub fn step_narrative(&mut self, service: Result<&dyn NarrativeService, &NarrativeError>) -> bool {
        let Some(request) = self.narrative.pending.clone() else {
            return false;
        };
        if !self.narrative.armed {
            self.narrative.armed = true;
            return true;
        }

        let output = match &request {
            NarrativeRequest::Diagnosis(id) => match self.view.get(id) {
                Some(record) => narrative::diagnose_record(service, record, &self.config.thresholds),
                None => Narrative {
                    text: String::new(),
                    error: Some(format!("record {id} is not in the current view")),
                },
            },
            NarrativeRequest::ExecutiveSummary => narrative::executive_summary(service, &self.view),
        };
        let what = match &request {
            NarrativeRequest::Diagnosis(id) => format!("diagnosis {id}"),
            NarrativeRequest::ExecutiveSummary => "executive summary".to_string(),
        };
        let outcome = if output.error.is_some() { "failed" } else { "ok" };
        self.session.log_action("narrative", format!("{what}: {outcome}"));

        self.narrative.output = Some(output);
        self.narrative.pending = None;
        self.narrative.armed = false;
        false
    }
}
