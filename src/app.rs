use eframe::egui;

use tentackle::config::Config;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TenTackleApp {
    pub state: AppState,
}

impl TenTackleApp {
    pub fn new(config: Config) -> Self {
        Self {
            state: AppState::new(config),
        }
    }
}

impl eframe::App for TenTackleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        panels::shortcuts(ctx, &mut self.state);

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Bottom panel: statistics ----
        egui::TopBottomPanel::bottom("analysis_panel")
            .resizable(true)
            .default_height(170.0)
            .show(ctx, |ui| {
                panels::analysis_table(ui, &self.state);
            });

        // ---- Left side panel: selection ----
        egui::SidePanel::left("selection_panel")
            .default_width(280.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::stress_strain_plot(ui, &self.state);
        });
    }
}
