use eframe::egui;

use crate::state::AppState;
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct AstroCubeApp {
    pub state: AppState,
}

impl AstroCubeApp {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl eframe::App for AstroCubeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // ---- Top panel: cube identity ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &self.state);
        });

        // ---- Bottom panel: channel slider and status line ----
        egui::TopBottomPanel::bottom("channel_bar").show(ctx, |ui| {
            plot::channel_slider(ui, &mut self.state);
            ui.separator();
            panels::status_bar(ui, &self.state);
        });

        // ---- Left side panel: settings ----
        egui::SidePanel::left("settings_panel")
            .default_width(260.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: channel image ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::cube_plot(ui, &mut self.state);
        });
    }
}
