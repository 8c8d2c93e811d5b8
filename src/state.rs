use std::path::Path;

use anyhow::{Context, Result};
use astrocube::config::ViewerConfig;
use astrocube::{CubeError, DataCube, HduSelector};
use eframe::egui::TextureHandle;
use ndarray::{s, Array2, Array3};

use crate::color::ColorScale;

// ---------------------------------------------------------------------------
// Cursor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorAxis {
    X,
    Y,
    Z,
}

/// Selected voxel, always inside the cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub x: usize,
    pub y: usize,
    pub z: usize,
    shape: (usize, usize, usize),
}

impl Cursor {
    /// Cursor at the spatial centre of the first channel.
    pub fn new(shape: (usize, usize, usize)) -> Self {
        // Same index as `set_fraction(axis, 0.5)`: round((n - 1) / 2) == n / 2.
        Self {
            x: shape.0 / 2,
            y: shape.1 / 2,
            z: 0,
            shape,
        }
    }

    pub fn len(&self, axis: CursorAxis) -> usize {
        match axis {
            CursorAxis::X => self.shape.0,
            CursorAxis::Y => self.shape.1,
            CursorAxis::Z => self.shape.2,
        }
    }

    pub fn get(&self, axis: CursorAxis) -> usize {
        match axis {
            CursorAxis::X => self.x,
            CursorAxis::Y => self.y,
            CursorAxis::Z => self.z,
        }
    }

    fn slot(&mut self, axis: CursorAxis) -> &mut usize {
        match axis {
            CursorAxis::X => &mut self.x,
            CursorAxis::Y => &mut self.y,
            CursorAxis::Z => &mut self.z,
        }
    }

    /// Move to fractional position `f ∈ [0, 1]` along `axis`:
    /// `round((n - 1) · f)`.
    pub fn set_fraction(&mut self, axis: CursorAxis, f: f64) -> Result<(), CubeError> {
        if !(0.0..=1.0).contains(&f) {
            return Err(CubeError::Argument(format!(
                "fraction {f} is outside [0, 1]"
            )));
        }
        let n = self.len(axis);
        *self.slot(axis) = ((n.saturating_sub(1)) as f64 * f).round() as usize;
        Ok(())
    }

    /// Move to absolute index `i` along `axis`, wrapping around so that
    /// negative indices count from the end.
    pub fn set_index(&mut self, axis: CursorAxis, i: i64) {
        let n = self.len(axis).max(1) as i64;
        *self.slot(axis) = i.rem_euclid(n) as usize;
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    Intensity,
    SignalToNoise,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded cube (None if loading failed).
    pub cube: Option<DataCube>,

    /// File name shown in the top bar.
    pub file_name: Option<String>,

    pub config: ViewerConfig,

    pub cursor: Cursor,

    /// Pixel under the mouse pointer, if it is over the image.
    pub hover: Option<(usize, usize)>,

    pub display_mode: DisplayMode,

    /// Cached `data / noise_dev` for the S/N display mode.
    snr: Option<Array3<f64>>,

    /// Colour scale of the current display mode.
    pub color_scale: Option<ColorScale>,

    /// Texture of the displayed channel.
    pub texture: Option<TextureHandle>,

    /// The texture no longer matches the channel or colour scale.
    pub needs_redraw: bool,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            cube: None,
            file_name: None,
            config,
            cursor: Cursor::new((1, 1, 1)),
            hover: None,
            display_mode: DisplayMode::Intensity,
            snr: None,
            color_scale: None,
            texture: None,
            needs_redraw: true,
            status_message: None,
        }
    }

    /// Load a cube from disk and make it current.
    pub fn load_cube(&mut self, path: &Path, hdu: &HduSelector) -> Result<()> {
        let cube = DataCube::open(path, hdu, false)
            .with_context(|| format!("loading {}", path.display()))?;
        self.file_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        self.set_cube(cube);
        if self.config.compute_noise {
            self.recompute_noise();
        }
        Ok(())
    }

    /// Ingest a cube, reset the cursor and colour scale.
    pub fn set_cube(&mut self, cube: DataCube) {
        log::info!("{}", cube.describe());
        self.cursor = Cursor::new(cube.shape());
        self.hover = None;
        self.display_mode = DisplayMode::Intensity;
        self.snr = None;
        self.cube = Some(cube);
        self.status_message = None;
        self.rebuild_color_scale();
    }

    /// Re-estimate noise with the configured parameters.
    pub fn recompute_noise(&mut self) {
        let params = self.config.noise_params();
        let Some(cube) = self.cube.as_mut() else {
            return;
        };
        match cube.recompute_noise(&params, None) {
            Ok(()) => {
                self.snr = cube.signal_to_noise();
                self.status_message = None;
                self.rebuild_color_scale();
            }
            Err(e) => {
                log::error!("Noise estimation failed: {e}");
                self.status_message = Some(format!("Error: {e}"));
            }
        }
    }

    pub fn set_display_mode(&mut self, mode: DisplayMode) {
        if mode == DisplayMode::SignalToNoise && self.snr.is_none() {
            self.status_message = Some("Noise has not been estimated yet".to_string());
            return;
        }
        self.display_mode = mode;
        self.rebuild_color_scale();
    }

    /// The cube shown by the current display mode.
    pub fn displayed(&self) -> Option<&Array3<f64>> {
        match self.display_mode {
            DisplayMode::Intensity => self.cube.as_ref().map(DataCube::data),
            DisplayMode::SignalToNoise => self.snr.as_ref(),
        }
    }

    /// Channel `z` of the displayed cube.
    pub fn displayed_plane(&self) -> Option<Array2<f64>> {
        let z = self.cursor.z;
        self.displayed().map(|cube| cube.slice(s![.., .., z]).to_owned())
    }

    pub fn rebuild_color_scale(&mut self) {
        self.color_scale = self
            .displayed()
            .map(|data| ColorScale::from_data(data, self.config.color_range));
        self.needs_redraw = true;
    }

    pub fn set_channel(&mut self, z: i64) {
        self.cursor.set_index(CursorAxis::Z, z);
        self.needs_redraw = true;
    }

    /// `"{value}  α: {ra},  δ: {dec},  v: {vel}  ({x}, {y}, {z})"` for the
    /// hovered pixel, or the cursor when nothing is hovered.
    pub fn status_line(&self) -> Option<String> {
        let cube = self.cube.as_ref()?;
        let (x, y) = self.hover.unwrap_or((self.cursor.x, self.cursor.y));
        let z = self.cursor.z;
        let value = self
            .displayed()
            .and_then(|data| data.get([x, y, z]).copied())?;
        let text = cube.pixel_coords_as(
            x,
            y,
            z,
            self.config.ra_format,
            self.config.dec_format,
            self.config.decimals,
        );
        Some(format!(
            "{value:.4}  α: {},  δ: {},  v: {}  ({x}, {y}, {z})",
            text.ra, text.dec, text.vel
        ))
    }
}
