use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use astrocube::config::ColorRange;
use astrocube::AngleFormat;

use crate::state::{AppState, DisplayMode};

// ---------------------------------------------------------------------------
// Left side panel – cube summary and settings
// ---------------------------------------------------------------------------

fn format_combo(ui: &mut Ui, id: &str, label: &str, value: &mut AngleFormat) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        egui::ComboBox::from_id_salt(id)
            .selected_text(value.name())
            .show_ui(ui, |ui: &mut Ui| {
                for format in AngleFormat::ALL {
                    ui.selectable_value(value, format, format.name());
                }
            });
    });
}

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Cube");
    ui.separator();

    let Some(cube) = state.cube.as_ref() else {
        ui.label("No cube loaded.");
        return;
    };
    let summary = cube.describe();
    let cards: Vec<(String, String)> = cube
        .header()
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    let has_noise = cube.noise_dev().is_some();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            ui.label(summary);

            egui::CollapsingHeader::new(RichText::new("Header").strong())
                .default_open(false)
                .show(ui, |ui: &mut Ui| {
                    egui::Grid::new("header_cards")
                        .striped(true)
                        .show(ui, |ui: &mut Ui| {
                            for (key, value) in &cards {
                                ui.monospace(key);
                                ui.label(value);
                                ui.end_row();
                            }
                        });
                });
            ui.separator();

            // ---- Coordinate formats ----
            ui.strong("Coordinates");
            format_combo(ui, "ra_format", "RA", &mut state.config.ra_format);
            format_combo(ui, "dec_format", "DEC", &mut state.config.dec_format);
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Decimals");
                ui.add(egui::DragValue::new(&mut state.config.decimals).range(0..=6));
            });
            ui.separator();

            // ---- Noise ----
            ui.strong("Noise");
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Iterations");
                ui.add(egui::DragValue::new(&mut state.config.noise_iterations).range(1..=20));
            });
            ui.horizontal(|ui: &mut Ui| {
                ui.label("Threshold (σ)");
                ui.add(
                    egui::DragValue::new(&mut state.config.signal_threshold)
                        .speed(0.1)
                        .range(0.5..=20.0),
                );
            });
            if ui.button("Recompute noise").clicked() {
                state.recompute_noise();
            }
            ui.separator();

            // ---- Display ----
            ui.strong("Display");
            let mut mode = state.display_mode;
            ui.radio_value(&mut mode, DisplayMode::Intensity, "Intensity");
            ui.add_enabled_ui(has_noise, |ui: &mut Ui| {
                ui.radio_value(&mut mode, DisplayMode::SignalToNoise, "Signal / noise");
            });
            if mode != state.display_mode {
                state.set_display_mode(mode);
            }

            let mut range = state.config.color_range;
            ui.radio_value(&mut range, ColorRange::ZeroToMax, "Range 0 … max");
            ui.radio_value(&mut range, ColorRange::MinToMax, "Range min … max");
            if range != state.config.color_range {
                state.config.color_range = range;
                state.rebuild_color_scale();
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top bar: file and cube identity, plus any error.
pub fn top_bar(ui: &mut Ui, state: &AppState) {
    ui.horizontal(|ui: &mut Ui| {
        if let Some(name) = &state.file_name {
            ui.strong(name);
            ui.separator();
        }
        if let Some(cube) = &state.cube {
            let (nx, ny, nz) = cube.shape();
            ui.label(format!(
                "{} – {}  ({nx} × {ny} × {nz})",
                cube.object_name(),
                cube.line_name()
            ));
        }
        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Status bar
// ---------------------------------------------------------------------------

pub fn status_bar(ui: &mut Ui, state: &AppState) {
    match state.status_line() {
        Some(line) => ui.monospace(line),
        None => ui.label(""),
    };
}
