use std::path::PathBuf;

use eframe::egui;

use transformer_dashboard::config::DashboardConfig;
use transformer_dashboard::data::model::TransformerModel;
use transformer_dashboard::narrative::{GeminiClient, NarrativeError, NarrativeService};
use transformer_dashboard::state::AppState;

use crate::color::CategoryColors;
use crate::ui::{panels, views};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct DashboardApp {
    state: AppState,
    narrative: Result<GeminiClient, NarrativeError>,
    models: CategoryColors,
}

impl DashboardApp {
    pub fn new(config: DashboardConfig, data: Option<PathBuf>) -> Self {
        let narrative = GeminiClient::from_config(&config.narrative);
        if let Err(err) = &narrative {
            log::warn!("{err}; narrative reports are disabled");
        }

        let mut state = AppState::new(config);
        match data {
            Some(path) => panels::load_path(&mut state, &path),
            None => panels::regenerate(&mut state),
        }

        Self {
            state,
            narrative,
            models: CategoryColors::of::<TransformerModel>(),
        }
    }
}

impl eframe::App for DashboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Pending narrative request ----
        let service = self
            .narrative
            .as_ref()
            .map(|client| client as &dyn NarrativeService);
        if self.state.step_narrative(service) {
            ctx.request_repaint();
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: filters ----
        let busy = self.state.narrative.is_busy();
        egui::SidePanel::left("filter_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                ui.add_enabled_ui(!busy, |ui| {
                    panels::side_panel(ui, &mut self.state);
                });
            });

        // ---- Central panel: dashboard ----
        egui::CentralPanel::default().show(ctx, |ui| {
            views::dashboard(ui, &mut self.state, &self.models);
        });

        if self.state.narrative.is_busy() {
            ctx.request_repaint();
        }
    }
}
