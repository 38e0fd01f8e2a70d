use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context;
use eframe::egui::{self, Color32, DragValue, RichText, ScrollArea, Ui};
use egui_extras::DatePickerButton;

use transformer_dashboard::data::export;
use transformer_dashboard::data::filter::{self, QuickFilter, ValueRange};
use transformer_dashboard::data::generator;
use transformer_dashboard::data::loader::{self, LoadedTable};
use transformer_dashboard::data::model::{Category, Column};
use transformer_dashboard::error::DashboardError;
use transformer_dashboard::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Filters");
    ui.separator();

    let Some(universe) = state.universe.clone() else {
        ui.label("No dataset loaded.");
        return;
    };

    let mut changed = false;

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            if ui.button("Clear all filters").clicked() {
                state.clear_filters();
            }
            ui.separator();

            // ---- Categorical filters ----
            changed |= category_filter(ui, "Models", &universe.models, &mut state.draft.models);
            changed |= category_filter(ui, "Status", &universe.statuses, &mut state.draft.statuses);
            let types = state.draft.test_types.get_or_insert_with(BTreeSet::new);
            changed |= category_filter(ui, "Test types", &universe.test_types, types);
            ui.separator();

            // ---- Period ----
            ui.strong("Period");
            let (mut start, mut end) = state
                .draft
                .date_interval()
                .unwrap_or((universe.first_date, universe.last_date));
            let mut period_changed = false;
            egui::Grid::new("period_grid").num_columns(2).show(ui, |ui: &mut Ui| {
                ui.label("From");
                period_changed |= ui
                    .add(DatePickerButton::new(&mut start).id_salt("period_start"))
                    .changed();
                ui.end_row();
                ui.label("To");
                period_changed |= ui
                    .add(DatePickerButton::new(&mut end).id_salt("period_end"))
                    .changed();
                ui.end_row();
            });
            if ui.small_button("Whole period").clicked() {
                start = universe.first_date;
                end = universe.last_date;
                period_changed = true;
            }
            if period_changed {
                state.draft.period = Some(vec![start, end]);
                changed = true;
            }
            ui.separator();

            // ---- Numeric ranges ----
            changed |= range_filter(ui, "Efficiency (%)", universe.efficiency, &mut state.draft.efficiency, 0.01);
            changed |= range_filter(
                ui,
                "Temperature rise (°C)",
                universe.temperature,
                &mut state.draft.temperature,
                0.1,
            );
            changed |= range_filter(ui, "Losses (kW)", universe.losses, &mut state.draft.losses, 0.1);

            // ---- Rated power ----
            if !universe.rated_powers.is_empty() {
                ui.separator();
                let selected = state.draft.rated_powers.clone().unwrap_or_default();
                let mut clicked = None;
                egui::CollapsingHeader::new(
                    RichText::new(format!(
                        "Rated power  ({}/{})",
                        selected.len(),
                        universe.rated_powers.len()
                    ))
                    .strong(),
                )
                .id_salt("rated_power")
                .show(ui, |ui: &mut Ui| {
                    for power in &universe.rated_powers {
                        let mut checked = selected.contains(power);
                        if ui.checkbox(&mut checked, power.to_string()).changed() {
                            clicked = Some(*power);
                        }
                    }
                });
                if let Some(power) = clicked {
                    state.toggle_power(power);
                }
            }

            if let Some(err) = &state.filter_error {
                ui.separator();
                ui.label(RichText::new(format!("⚠ {err}")).color(Color32::RED));
                ui.label("The previous selection is still shown.");
            }

            ui.separator();
            session_history(ui, state);
        });

    if changed {
        state.refilter();
    }
}

/// Checkbox list with All / None buttons. Returns whether the selection
/// changed.
fn category_filter<C: Category>(
    ui: &mut Ui,
    title: &str,
    all: &BTreeSet<C>,
    selected: &mut BTreeSet<C>,
) -> bool {
    let mut changed = false;
    let chosen = all.iter().filter(|v| selected.contains(v)).count();
    let header = format!("{title}  ({chosen}/{})", all.len());

    egui::CollapsingHeader::new(RichText::new(header).strong())
        .id_salt(title)
        .default_open(true)
        .show(ui, |ui: &mut Ui| {
            ui.horizontal(|ui: &mut Ui| {
                if ui.small_button("All").clicked() {
                    *selected = filter::all_of();
                    changed = true;
                }
                if ui.small_button("None").clicked() {
                    selected.clear();
                    changed = true;
                }
            });
            for value in all {
                let mut checked = selected.contains(value);
                if ui.checkbox(&mut checked, value.label()).changed() {
                    AppState::toggle(selected, *value);
                    changed = true;
                }
            }
        });
    changed
}

/// Min / max editors bounded by the full range of the column.
fn range_filter(
    ui: &mut Ui,
    title: &str,
    full: ValueRange,
    range: &mut Option<ValueRange>,
    speed: f64,
) -> bool {
    let mut r = range.unwrap_or(full);
    let mut changed = false;
    ui.strong(title);
    ui.horizontal(|ui: &mut Ui| {
        changed |= ui
            .add(DragValue::new(&mut r.min).speed(speed).range(full.min..=r.max))
            .changed();
        ui.label("to");
        changed |= ui
            .add(DragValue::new(&mut r.max).speed(speed).range(r.min..=full.max))
            .changed();
    });
    if changed {
        *range = Some(r);
    }
    changed
}

fn session_history(ui: &mut Ui, state: &AppState) {
    ui.collapsing("Filter history", |ui: &mut Ui| {
        let Some(universe) = &state.universe else {
            return;
        };
        for entry in state.session.history().rev() {
            ui.label(RichText::new(entry.at.format("%H:%M:%S").to_string()).weak());
            ui.label(filter::describe(&entry.spec, universe));
        }
    });
    ui.collapsing("Action log", |ui: &mut Ui| {
        ui.label(format!(
            "Session started {}",
            state.session.started_at.format("%Y-%m-%d %H:%M")
        ));
        for entry in state.session.actions().rev() {
            ui.label(format!(
                "{}  {}  {}",
                entry.at.format("%H:%M:%S"),
                entry.action,
                entry.details
            ));
        }
    });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    let busy = state.narrative.is_busy();
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            ui.separator();
            let has_rows = !state.view.is_empty();
            ui.add_enabled_ui(has_rows, |ui: &mut Ui| {
                for format in ExportFormat::ALL {
                    if ui.button(format.menu_label()).clicked() {
                        export_dialog(state, format);
                        ui.close_menu();
                    }
                }
            });
            ui.separator();
            if ui.button("Regenerate sample data").clicked() {
                regenerate(state);
                ui.close_menu();
            }
        });

        ui.separator();

        ui.add_enabled_ui(!busy && state.dataset.is_some(), |ui: &mut Ui| {
            for quick in QuickFilter::ALL {
                if ui
                    .selectable_label(state.quick_filter == quick, quick.label())
                    .clicked()
                {
                    state.set_quick_filter(quick);
                }
            }
        });

        ui.separator();

        if let Some(ds) = &state.dataset {
            ui.label(format!(
                "{} records loaded, {} shown",
                ds.len(),
                state.view.len()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            let color = if msg.starts_with("Error") {
                Color32::RED
            } else {
                ui.visuals().text_color()
            };
            ui.label(RichText::new(msg).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// Data sources
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Open transformer test data")
        .add_filter("Supported files", &["csv", "xlsx", "xls", "ods", "json", "parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .add_filter("Spreadsheet", &["xlsx", "xls", "ods"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .pick_file();

    if let Some(path) = file {
        load_path(state, &path);
    }
}

/// Load a file into the state. On failure the current dataset stays.
pub fn load_path(state: &mut AppState, path: &Path) {
    match loader::load_file(path, &state.config.thresholds) {
        Ok(loaded) if loaded.table.is_empty() => {
            state.status_message = Some(format!("Error: {}", DashboardError::EmptyTable));
        }
        Ok(loaded) => state.set_dataset(loaded, path.display().to_string()),
        Err(e) => {
            log::error!("Failed to load {}: {e:#}", path.display());
            let message = match e.downcast_ref::<DashboardError>() {
                Some(DashboardError::SchemaViolation(issues)) => issues
                    .iter()
                    .map(|i| i.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
                _ => format!("{e:#}"),
            };
            state.status_message = Some(format!("Error: {message}"));
            state.session.log_action("load_failed", path.display().to_string());
        }
    }
}

/// Replace the dataset with freshly generated sample records.
pub fn regenerate(state: &mut AppState) {
    let data = &state.config.data;
    let generated = generator::generate(data.records, data.seed, data.anchor(), state.config.thresholds);
    match generated {
        Ok(table) => {
            let source = format!("sample data (seed {})", data.seed);
            let loaded = LoadedTable {
                table,
                warnings: Vec::new(),
                source_columns: Column::ALL.len(),
            };
            state.set_dataset(loaded, source);
        }
        Err(e) => {
            log::error!("Failed to generate sample data: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum ExportFormat {
    Csv,
    Xlsx,
    Parquet,
}

impl ExportFormat {
    const ALL: [ExportFormat; 3] = [ExportFormat::Csv, ExportFormat::Xlsx, ExportFormat::Parquet];

    fn menu_label(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "Export CSV…",
            ExportFormat::Xlsx => "Export Excel…",
            ExportFormat::Parquet => "Export Parquet…",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Parquet => "parquet",
        }
    }
}

fn export_dialog(state: &mut AppState, format: ExportFormat) {
    let names = &state.config.export;
    let file_name = match format {
        ExportFormat::Csv => names.csv_file_name.clone(),
        ExportFormat::Xlsx => names.xlsx_file_name.clone(),
        ExportFormat::Parquet => Path::new(&names.csv_file_name)
            .with_extension("parquet")
            .display()
            .to_string(),
    };
    let Some(path) = rfd::FileDialog::new()
        .set_file_name(file_name)
        .add_filter(format.extension(), &[format.extension()])
        .save_file()
    else {
        return;
    };

    let bytes = match format {
        ExportFormat::Csv => export::to_csv_bytes(&state.view),
        ExportFormat::Xlsx => export::to_xlsx_bytes(&state.view, &state.config.export.sheet_name),
        ExportFormat::Parquet => export::to_parquet_bytes(&state.view),
    };
    let written = bytes.and_then(|b| {
        std::fs::write(&path, b).with_context(|| format!("writing {}", path.display()))
    });

    match written {
        Ok(()) => {
            log::info!("Exported {} records to {}", state.view.len(), path.display());
            state.session.log_action(
                "export",
                format!("{} records as {}", state.view.len(), format.extension()),
            );
            state.status_message = Some(format!("Exported {} records", state.view.len()));
        }
        Err(e) => {
            log::error!("Export failed: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
