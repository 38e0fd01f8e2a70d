use eframe::egui::{self, Color32, ComboBox, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use transformer_dashboard::charts::ChartKind;
use transformer_dashboard::data::export::cell_text;
use transformer_dashboard::data::model::{Category, Column, RecordTable};
use transformer_dashboard::metrics::{self, AdvancedMetrics, BasicMetric, BasicMetrics};
use transformer_dashboard::state::{AppState, NarrativeRequest, ROW_LIMITS};

use crate::color::{delta_color, status_color, CategoryColors};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render the dashboard body for the current view.
pub fn dashboard(ui: &mut Ui, state: &mut AppState, models: &CategoryColors) {
    let Some(all_records) = state.dataset.as_ref().map(metrics::basic_metrics) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open a file or regenerate sample data  (File menu)");
        });
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.heading("Transformer Test Dashboard");
            data_report(ui, state);
            ui.label(RichText::new(state.filter_summary()).italics());
            ui.separator();

            if state.view.is_empty() {
                ui.label(RichText::new("No records match the current filters.").strong());
                return;
            }

            let basic = metrics::basic_metrics(&state.view);
            let advanced = metrics::advanced_metrics(&state.view, &state.config.thresholds);

            for alert in metrics::quality_alerts(&state.view, &state.config.alerts) {
                ui.label(RichText::new(format!("⚠ {alert}")).color(Color32::from_rgb(0xe6, 0x9a, 0x00)));
            }

            kpi_cards(ui, state, &basic, advanced.as_ref());
            ui.separator();

            if let Some(advanced) = &advanced {
                ui.collapsing("Detailed statistics", |ui: &mut Ui| {
                    detailed_statistics(ui, advanced);
                    ui.add_space(6.0);
                    change_vs_dataset(ui, &basic, &all_records);
                });
            }
            ui.collapsing("Summary report", |ui: &mut Ui| {
                ui.label(metrics::summary_report(&state.view, &state.config.thresholds));
            });
            ui.collapsing("Custom KPIs", |ui: &mut Ui| {
                egui::Grid::new("custom_kpis").striped(true).show(ui, |ui: &mut Ui| {
                    for (name, value) in metrics::custom_kpis(&state.view, &state.config.kpi) {
                        ui.label(name);
                        ui.label(metrics::format_number(value, 1, ""));
                        ui.end_row();
                    }
                });
            });
            ui.collapsing("Statistical description", |ui: &mut Ui| {
                ui.label(RichText::new(metrics::statistical_summary(&state.view)).monospace());
            });
            ui.separator();

            charts_section(ui, state, models);
            ui.separator();

            data_table(ui, state);
            ui.separator();

            narrative_section(ui, state);
        });
}

fn data_report(ui: &mut Ui, state: &AppState) {
    let Some(report) = &state.report else {
        return;
    };
    let period = report
        .period
        .map(|(a, b)| format!("{} to {}", a.format("%Y-%m-%d"), b.format("%Y-%m-%d")))
        .unwrap_or_else(|| "no dates".to_string());
    ui.label(format!(
        "{} · {} records · {} columns · {period}",
        report.source, report.records, report.columns
    ));
    for warning in &report.warnings {
        ui.label(RichText::new(format!("⚠ {warning}")).color(Color32::YELLOW));
    }
}

fn kpi_cards(ui: &mut Ui, state: &AppState, basic: &BasicMetrics, advanced: Option<&AdvancedMetrics>) {
    let cards = metrics::kpi_cards(basic, advanced, &state.config.thresholds, &state.config.kpi);
    ui.horizontal_wrapped(|ui: &mut Ui| {
        for card in cards {
            egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
                ui.set_min_width(140.0);
                ui.vertical(|ui: &mut Ui| {
                    ui.label(RichText::new(card.title).small());
                    ui.label(RichText::new(&card.value).size(20.0).strong());
                    if let Some(delta) = card.delta {
                        ui.label(RichText::new(format!("{delta:+.2}")).color(delta_color(delta)));
                    }
                });
            });
        }
    });
}

fn detailed_statistics(ui: &mut Ui, advanced: &AdvancedMetrics) {
    let e = &advanced.efficiency;
    egui::Grid::new("detailed_stats").num_columns(2).striped(true).show(ui, |ui: &mut Ui| {
        let mut row = |label: &str, value: String| {
            ui.label(label);
            ui.label(value);
            ui.end_row();
        };
        row("Efficiency std / min / max", format!("{:.3} / {:.2} / {:.2}", e.spread.std, e.spread.min, e.spread.max));
        row("Efficiency Q25 / Q75", format!("{:.2} / {:.2}", e.q25, e.q75));
        let t = &advanced.temperature;
        row("Temperature std / min / max", format!("{:.2} / {:.1} / {:.1}", t.std, t.min, t.max));
        let l = &advanced.losses;
        row("Losses std / min / max", format!("{:.2} / {:.2} / {:.2}", l.std, l.min, l.max));
        row("Out of spec (temperature)", advanced.out_of_spec_temperature.to_string());
        row("Out of spec (efficiency)", advanced.out_of_spec_efficiency.to_string());
        row("Out of spec (losses)", advanced.out_of_spec_losses.to_string());
        for (test_type, count) in &advanced.tests_by_type {
            row(test_type.label(), count.to_string());
        }
    });
}

fn change_vs_dataset(ui: &mut Ui, view: &BasicMetrics, dataset: &BasicMetrics) {
    ui.strong("Change vs. all loaded records");
    let changes = metrics::compare(view, dataset);
    egui::Grid::new("change_vs_dataset").num_columns(2).show(ui, |ui: &mut Ui| {
        for metric in BasicMetric::ALL {
            ui.label(metric.key());
            match changes.get(&metric) {
                Some(change) => ui.label(format!("{change:+.1}%")),
                None => ui.label("–"),
            };
            ui.end_row();
        }
    });
}

fn charts_section(ui: &mut Ui, state: &mut AppState, models: &CategoryColors) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Charts");
        ComboBox::from_id_salt("chart_kind")
            .selected_text(state.chart.title())
            .show_ui(ui, |ui: &mut Ui| {
                for kind in ChartKind::ALL {
                    ui.selectable_value(&mut state.chart, kind, kind.title());
                }
            });
    });
    plot::chart(ui, state.chart, &state.view, &state.config.thresholds, models);
}

// ---------------------------------------------------------------------------
// Data table
// ---------------------------------------------------------------------------

fn data_table(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.heading("Records");
        let current = match state.table_view.row_limit {
            Some(n) => n.to_string(),
            None => "All".to_string(),
        };
        ComboBox::from_id_salt("row_limit")
            .selected_text(format!("Rows: {current}"))
            .show_ui(ui, |ui: &mut Ui| {
                for n in ROW_LIMITS {
                    ui.selectable_value(&mut state.table_view.row_limit, Some(n), n.to_string());
                }
                ui.selectable_value(&mut state.table_view.row_limit, None, "All");
            });
    });

    let view: &RecordTable = &state.view;
    let columns = view.schema().columns();
    let rows = state.table_view.ordered_rows(view);
    let sort = state.table_view;
    let mut sort_clicked = None;
    let mut picked = None;

    ui.push_id("records_table", |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .max_scroll_height(420.0)
            .columns(TableColumn::auto().resizable(true), columns.len())
            .header(22.0, |mut header| {
                for column in &columns {
                    header.col(|ui: &mut Ui| {
                        let arrow = match (sort.sort_by == *column, sort.descending) {
                            (true, true) => " ⏷",
                            (true, false) => " ⏶",
                            _ => "",
                        };
                        if ui.button(format!("{}{arrow}", column.title())).clicked() {
                            sort_clicked = Some(*column);
                        }
                    });
                }
            })
            .body(|body| {
                body.rows(18.0, rows.len(), |mut row| {
                    let record = rows[row.index()];
                    for column in &columns {
                        row.col(|ui: &mut Ui| match column {
                            Column::Id => {
                                if ui.link(&record.id).clicked() {
                                    picked = Some(record.id.clone());
                                }
                            }
                            Column::Status => {
                                ui.label(RichText::new(record.status.label()).color(status_color(record.status)));
                            }
                            other => {
                                ui.label(cell_text(record, *other));
                            }
                        });
                    }
                });
            });
    });

    if rows.len() < view.len() {
        ui.label(format!("Showing {} of {} records.", rows.len(), view.len()));
    }
    if let Some(column) = sort_clicked {
        state.table_view.sort_on(column);
    }
    if let Some(id) = picked {
        state.narrative.diagnosis_id = Some(id);
    }
}

// ---------------------------------------------------------------------------
// Narrative
// ---------------------------------------------------------------------------

fn narrative_section(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Narrative reports");
    let busy = state.narrative.is_busy();

    ui.add_enabled_ui(!busy, |ui: &mut Ui| {
        ui.horizontal(|ui: &mut Ui| {
            if ui.button("Executive summary").clicked() {
                state.request_narrative(NarrativeRequest::ExecutiveSummary);
            }
            ui.separator();

            let selected = state.narrative.diagnosis_id.clone().unwrap_or_default();
            ComboBox::from_id_salt("diagnosis_id")
                .selected_text(if selected.is_empty() { "Pick a record" } else { selected.as_str() })
                .show_ui(ui, |ui: &mut Ui| {
                    for record in state.view.records() {
                        if ui.selectable_label(record.id == selected, &record.id).clicked() {
                            state.narrative.diagnosis_id = Some(record.id.clone());
                        }
                    }
                });
            let can_diagnose = state.narrative.diagnosis_id.is_some();
            if ui.add_enabled(can_diagnose, egui::Button::new("Diagnose")).clicked() {
                if let Some(id) = state.narrative.diagnosis_id.clone() {
                    state.request_narrative(NarrativeRequest::Diagnosis(id));
                }
            }
        });
    });

    if busy {
        ui.horizontal(|ui: &mut Ui| {
            ui.spinner();
            ui.label("Generating report…");
        });
    }

    if let Some(output) = &state.narrative.output {
        match &output.error {
            Some(err) => {
                ui.label(RichText::new(format!("Narrative unavailable: {err}")).color(Color32::RED));
            }
            None => {
                ui.label(&output.text);
            }
        }
    }
}
