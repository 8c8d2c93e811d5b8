use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::coords::AngleFormat;
use crate::data::noise::NoiseParams;

// ---------------------------------------------------------------------------
// Viewer configuration
// ---------------------------------------------------------------------------

/// Intensity range mapped onto the colour scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorRange {
    /// `[0, nanmax]` over the whole cube.
    ZeroToMax,
    /// `[nanmin, nanmax]` over the whole cube.
    MinToMax,
}

/// Viewer settings, read from an optional JSON file.
///
/// Every field has a default, so a partial file is fine:
///
/// ```json
/// { "ra_format": "deg", "decimals": 3 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub ra_format: AngleFormat,
    pub dec_format: AngleFormat,
    pub decimals: usize,
    pub noise_iterations: usize,
    pub signal_threshold: f64,
    /// Estimate noise while loading the cube.
    pub compute_noise: bool,
    pub color_range: ColorRange,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let noise = NoiseParams::default();
        Self {
            ra_format: AngleFormat::Hms,
            dec_format: AngleFormat::Dms,
            decimals: 2,
            noise_iterations: noise.iterations,
            signal_threshold: noise.signal_threshold,
            compute_noise: true,
            color_range: ColorRange::ZeroToMax,
        }
    }
}

impl ViewerConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: ViewerConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        log::info!("Loaded viewer config from {}", path.display());
        Ok(config)
    }

    pub fn noise_params(&self) -> NoiseParams {
        NoiseParams {
            iterations: self.noise_iterations,
            signal_threshold: self.signal_threshold,
            ..NoiseParams::default()
        }
    }
}
