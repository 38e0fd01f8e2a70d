use eframe::egui::{Color32, Stroke, Ui};
use egui_plot::{
    Bar, BarChart, BoxElem, BoxPlot, BoxSpread, GridMark, HLine, Legend, Line, LineStyle, Plot, PlotPoints, Points,
};

use transformer_dashboard::charts::{self, ChartKind};
use transformer_dashboard::config::Thresholds;
use transformer_dashboard::data::model::{Category, RecordTable};

use crate::color::{status_color, CategoryColors};

const CHART_HEIGHT: f32 = 340.0;
const HISTOGRAM_BINS: usize = 20;

// ---------------------------------------------------------------------------
// Chart dispatcher (central panel)
// ---------------------------------------------------------------------------

/// Render `kind` for the current view.
pub fn chart(ui: &mut Ui, kind: ChartKind, table: &RecordTable, thresholds: &Thresholds, models: &CategoryColors) {
    if table.is_empty() {
        ui.label("No records to plot.");
        return;
    }
    match kind {
        ChartKind::EfficiencyOverTime => efficiency_over_time(ui, table, thresholds, models),
        ChartKind::LossesVsTemperature => losses_vs_temperature(ui, table, thresholds),
        ChartKind::ModelDistribution => model_distribution(ui, table, models),
        ChartKind::ApprovalByModel => approval_by_model(ui, table, models),
        ChartKind::EfficiencyHistogram => efficiency_histogram(ui, table, thresholds),
        ChartKind::MonthlyTrend => monthly_trend(ui, table),
        ChartKind::PowerVsLosses => power_vs_losses(ui, table, models),
        ChartKind::TemperatureByModel => temperature_by_model(ui, table, thresholds, models),
    }
}

fn date_axis(mark: GridMark, _range: &std::ops::RangeInclusive<f64>) -> String {
    charts::date_from_day_number(mark.value)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

/// X axis showing category labels at integer positions.
fn category_axis(labels: Vec<String>) -> impl Fn(GridMark, &std::ops::RangeInclusive<f64>) -> String {
    move |mark, _range| {
        let i = mark.value.round();
        if (mark.value - i).abs() > 1e-6 || i < 0.0 {
            return String::new();
        }
        labels.get(i as usize).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Individual charts
// ---------------------------------------------------------------------------

fn efficiency_over_time(ui: &mut Ui, table: &RecordTable, thresholds: &Thresholds, models: &CategoryColors) {
    let series = charts::efficiency_over_time(table);
    Plot::new("efficiency_over_time")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_formatter(date_axis)
        .y_axis_label("Efficiency (%)")
        .show(ui, |plot_ui| {
            for (model, points) in series {
                let color = models.color_for(model);
                plot_ui.line(Line::new(PlotPoints::from(points.clone())).name(model.label()).color(color).width(1.0));
                plot_ui.points(Points::new(PlotPoints::from(points)).name(model.label()).color(color).radius(2.5));
            }
            plot_ui.hline(
                HLine::new(thresholds.efficiency_min)
                    .name("Minimum efficiency")
                    .color(Color32::RED),
            );
        });
}

fn losses_vs_temperature(ui: &mut Ui, table: &RecordTable, thresholds: &Thresholds) {
    let series = charts::losses_vs_temperature(table);
    Plot::new("losses_vs_temperature")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Temperature rise (°C)")
        .y_axis_label("Losses (kW)")
        .show(ui, |plot_ui| {
            for (status, points) in series {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(status.label())
                        .color(status_color(status))
                        .radius(3.0),
                );
            }
            plot_ui.hline(HLine::new(thresholds.losses_max).name("Maximum losses").color(Color32::RED));
        });
}

fn model_distribution(ui: &mut Ui, table: &RecordTable, models: &CategoryColors) {
    let counts = charts::model_distribution(table);
    let labels: Vec<String> = counts.keys().map(|m| m.label().to_string()).collect();
    let bars: Vec<Bar> = counts
        .iter()
        .enumerate()
        .map(|(i, (model, count))| {
            Bar::new(i as f64, *count as f64)
                .name(model.label())
                .fill(models.color_for(*model))
        })
        .collect();
    Plot::new("model_distribution")
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(labels))
        .y_axis_label("Tests")
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).name("Tests")));
}

fn approval_by_model(ui: &mut Ui, table: &RecordTable, models: &CategoryColors) {
    let rates = charts::approval_by_model(table);
    let labels: Vec<String> = rates.keys().map(|m| m.label().to_string()).collect();
    let bars: Vec<Bar> = rates
        .iter()
        .enumerate()
        .map(|(i, (model, rate))| {
            Bar::new(i as f64, *rate)
                .name(model.label())
                .fill(models.color_for(*model))
        })
        .collect();
    Plot::new("approval_by_model")
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(labels))
        .y_axis_label("Approval rate (%)")
        .include_y(100.0)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).name("Approval rate")));
}

fn temperature_by_model(ui: &mut Ui, table: &RecordTable, thresholds: &Thresholds, models: &CategoryColors) {
    let boxes = charts::temperature_by_model(table);
    let labels: Vec<String> = boxes.keys().map(|m| m.label().to_string()).collect();
    let mut elems = Vec::with_capacity(boxes.len());
    let mut outliers: Vec<[f64; 2]> = Vec::new();
    for (i, (model, summary)) in boxes.iter().enumerate() {
        let x = i as f64;
        let spread = BoxSpread::new(
            summary.lower_whisker,
            summary.q1,
            summary.median,
            summary.q3,
            summary.upper_whisker,
        );
        elems.push(
            BoxElem::new(x, spread)
                .name(model.label())
                .fill(models.color_for(*model).gamma_multiply(0.5))
                .stroke(Stroke::new(1.5, models.color_for(*model)))
                .box_width(0.6),
        );
        outliers.extend(summary.outliers.iter().map(|v| [x, *v]));
    }
    let max = thresholds.temperature_max;
    Plot::new("temperature_by_model")
        .height(CHART_HEIGHT)
        .x_axis_formatter(category_axis(labels))
        .y_axis_label("Temperature rise (°C)")
        .show(ui, |plot_ui| {
            plot_ui.box_plot(BoxPlot::new(elems).name("Temperature rise"));
            plot_ui.points(Points::new(PlotPoints::from(outliers)).name("Outliers").radius(2.5));
            plot_ui.hline(
                HLine::new(max)
                    .name("Maximum temperature")
                    .color(Color32::RED)
                    .style(LineStyle::dashed_loose()),
            );
        });
}

fn efficiency_histogram(ui: &mut Ui, table: &RecordTable, thresholds: &Thresholds) {
    let bins = charts::efficiency_histogram(table, HISTOGRAM_BINS);
    let bars: Vec<Bar> = bins
        .iter()
        .map(|b| Bar::new(b.center(), b.count as f64).width(b.width()))
        .collect();
    let min = thresholds.efficiency_min;
    Plot::new("efficiency_histogram")
        .height(CHART_HEIGHT)
        .x_axis_label("Efficiency (%)")
        .y_axis_label("Tests")
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).name("Tests").color(Color32::LIGHT_BLUE));
            plot_ui.vline(egui_plot::VLine::new(min).name("Minimum efficiency").color(Color32::RED));
        });
}

fn monthly_trend(ui: &mut Ui, table: &RecordTable) {
    let trend = charts::monthly_trend(table);
    let tests: Vec<Bar> = trend
        .iter()
        .map(|p| Bar::new(charts::day_number(p.month), p.tests as f64).width(20.0))
        .collect();
    let approval: Vec<[f64; 2]> = trend
        .iter()
        .map(|p| [charts::day_number(p.month), p.approval_rate])
        .collect();

    ui.label("Tests per month");
    Plot::new("monthly_tests")
        .height(CHART_HEIGHT / 2.0)
        .x_axis_formatter(date_axis)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(tests).name("Tests")));
    ui.label("Approval rate per month (%)");
    Plot::new("monthly_approval")
        .height(CHART_HEIGHT / 2.0)
        .x_axis_formatter(date_axis)
        .include_y(100.0)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(PlotPoints::from(approval)).name("Approval rate").width(2.0));
        });
}

fn power_vs_losses(ui: &mut Ui, table: &RecordTable, models: &CategoryColors) {
    let Some(series) = charts::power_vs_losses(table) else {
        ui.label("The loaded table has no rated-power column.");
        return;
    };
    Plot::new("power_vs_losses")
        .height(CHART_HEIGHT)
        .legend(Legend::default())
        .x_axis_label("Rated power (MVA)")
        .y_axis_label("Losses (kW)")
        .show(ui, |plot_ui| {
            for (model, points) in series {
                plot_ui.points(
                    Points::new(PlotPoints::from(points))
                        .name(model.label())
                        .color(models.color_for(model))
                        .radius(3.0),
                );
            }
        });
}
