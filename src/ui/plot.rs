use eframe::egui::{self, Color32, TextureOptions, Ui, Vec2};
use egui_plot::{GridMark, HLine, Plot, PlotImage, PlotPoint, VLine};

use astrocube::AngleFormat;

use crate::state::{AppState, CursorAxis};

// ---------------------------------------------------------------------------
// Channel image (central panel)
// ---------------------------------------------------------------------------

const CROSSHAIR: Color32 = Color32::from_rgb(255, 90, 60);

/// Upload the current channel if the texture is stale.
fn refresh_texture(ui: &Ui, state: &mut AppState) {
    if !state.needs_redraw && state.texture.is_some() {
        return;
    }
    let (Some(plane), Some(scale)) = (state.displayed_plane(), state.color_scale.as_ref()) else {
        return;
    };
    let image = scale.render(plane.view());
    match state.texture.as_mut() {
        Some(texture) => texture.set(image, TextureOptions::NEAREST),
        None => {
            state.texture = Some(ui.ctx().load_texture("channel", image, TextureOptions::NEAREST));
        }
    }
    state.needs_redraw = false;
}

/// Render the current channel with a crosshair at the cursor.
///
/// Pixel `(x, y)` is centred on plot coordinate `(x, y)`. Clicking or
/// dragging moves the cursor; hovering updates the status line.
pub fn cube_plot(ui: &mut Ui, state: &mut AppState) {
    let Some(cube) = state.cube.as_ref() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("No cube loaded  (astrocube-view <cube.fits>)");
        });
        return;
    };
    let (nx, ny, _) = cube.shape();
    let wcs = cube.frame().clone();
    let z = state.cursor.z as f64;
    let centre = ((nx as f64 - 1.0) / 2.0, (ny as f64 - 1.0) / 2.0);

    refresh_texture(ui, state);
    let Some(texture_id) = state.texture.as_ref().map(|t| t.id()) else {
        return;
    };

    let ra_wcs = wcs.clone();
    let dec_wcs = wcs;
    let (cx, cy) = (state.cursor.x as f64, state.cursor.y as f64);

    let response = Plot::new("cube_plot")
        .data_aspect(1.0)
        .x_axis_label("α")
        .y_axis_label("δ")
        .x_axis_formatter(move |mark: GridMark, _range| {
            let sky = ra_wcs.pixel_to_sky(mark.value, centre.1, z);
            if sky.ra_deg.is_finite() {
                AngleFormat::Hms.format(sky.ra_deg, 0)
            } else {
                String::new()
            }
        })
        .y_axis_formatter(move |mark: GridMark, _range| {
            let sky = dec_wcs.pixel_to_sky(centre.0, mark.value, z);
            if sky.dec_deg.is_finite() {
                AngleFormat::Deg.format(sky.dec_deg, 2)
            } else {
                String::new()
            }
        })
        .show_grid(false)
        .allow_drag(false)
        .allow_boxed_zoom(true)
        .allow_scroll(true)
        .allow_zoom(true)
        .show(ui, |plot_ui| {
            plot_ui.image(PlotImage::new(
                texture_id,
                PlotPoint::new(centre.0, centre.1),
                Vec2::new(nx as f32, ny as f32),
            ));
            plot_ui.vline(VLine::new(cx).color(CROSSHAIR).width(1.0));
            plot_ui.hline(HLine::new(cy).color(CROSSHAIR).width(1.0));
            plot_ui.pointer_coordinate()
        });

    let pixel = response.inner.and_then(|p| {
        let (x, y) = (p.x.round(), p.y.round());
        let inside = x >= 0.0 && y >= 0.0 && x < nx as f64 && y < ny as f64;
        inside.then_some((x as usize, y as usize))
    });
    state.hover = if response.response.hovered() { pixel } else { None };

    let plot_response = &response.response;
    if plot_response.clicked() || plot_response.dragged() {
        if let Some((x, y)) = pixel {
            state.cursor.set_index(CursorAxis::X, x as i64);
            state.cursor.set_index(CursorAxis::Y, y as i64);
        }
    }
}

// ---------------------------------------------------------------------------
// Channel slider (bottom panel)
// ---------------------------------------------------------------------------

/// Channel slider labelled with the velocity of the first, middle and last
/// channel.
pub fn channel_slider(ui: &mut Ui, state: &mut AppState) {
    let Some(cube) = state.cube.as_ref() else {
        return;
    };
    let nz = cube.shape().2;
    let last = nz.saturating_sub(1);
    let marks: Vec<(usize, f64)> = [0, nz / 2, last]
        .into_iter()
        .map(|z| (z, cube.velocity_at(z, Some(0))))
        .collect();

    let mut z = state.cursor.z;
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Channel");
        let width = ui.available_width() - 80.0;
        ui.spacing_mut().slider_width = width.max(100.0);
        if ui
            .add(egui::Slider::new(&mut z, 0..=last))
            .changed()
        {
            state.set_channel(z as i64);
        }
    });
    ui.horizontal(|ui: &mut Ui| {
        for (channel, velocity) in marks {
            ui.label(format!("{channel}: {velocity:.0} km/s"));
            ui.separator();
        }
    });
}
