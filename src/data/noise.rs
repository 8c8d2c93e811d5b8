//! Robust noise estimation for spectral-line cubes.
//!
//! The per-pixel noise σ is estimated with the median absolute deviation
//! (MAD) along the spectral axis, scaled to a standard deviation. Bright
//! signal inflates the MAD, so the estimate is refined by sigma-clipping:
//! voxels brighter than `signal_threshold × σ` are excluded and σ is
//! recomputed from what remains.

use ndarray::{Array2, Array3, ArrayView1, ArrayView3, Axis, Zip};

use super::error::{CubeError, Result};

/// Scales a MAD into a consistent estimator of σ for normal data (1 / 0.6745).
pub const MAD_SCALE: f64 = 1.4826;

// ---------------------------------------------------------------------------
// NaN-aware statistics
// ---------------------------------------------------------------------------

/// Median of the non-NaN values; NaN when there are none.
pub fn nan_median(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut valid: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if valid.is_empty() {
        return f64::NAN;
    }
    valid.sort_by(f64::total_cmp);

    let mid = valid.len() / 2;
    if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    }
}

/// `median(|v - median(v)|) × MAD_SCALE`, ignoring NaNs.
pub fn mad_std(values: ArrayView1<'_, f64>) -> f64 {
    let center = nan_median(values.iter().copied());
    if center.is_nan() {
        return f64::NAN;
    }
    nan_median(values.iter().map(|v| (v - center).abs())) * MAD_SCALE
}

/// Mean of the non-NaN values; NaN when there are none.
pub fn nan_mean<'a>(values: impl IntoIterator<Item = &'a f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// `(min, max)` of the non-NaN values; `None` when there are none.
pub fn nan_range<'a>(values: impl IntoIterator<Item = &'a f64>) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |range, &v| match range {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Per-spatial-pixel MAD σ, collapsing the spectral (last) axis.
pub fn mad_along_spectral(data: ArrayView3<'_, f64>) -> Array2<f64> {
    data.map_axis(Axis(2), mad_std)
}

// ---------------------------------------------------------------------------
// Iterative estimate
// ---------------------------------------------------------------------------

/// Parameters of one noise estimation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseParams {
    /// Total number of estimates, including the seed estimate. Must be ≥ 1.
    pub iterations: usize,
    /// Voxels above `signal_threshold × σ` are treated as signal and clipped.
    pub signal_threshold: f64,
    /// Model a per-channel noise profile. Not implemented; always rejected.
    pub spectral_variation: bool,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            iterations: 3,
            signal_threshold: 4.0,
            spectral_variation: false,
        }
    }
}

/// Result of [`estimate`].
#[derive(Debug, Clone, PartialEq)]
pub struct NoiseEstimate {
    /// Per-voxel σ, same shape as the cube (flat along the spectral axis).
    pub dev: Array3<f64>,
    /// Latest per-spatial-pixel σ.
    pub dev_xy: Array2<f64>,
}

/// Estimate the noise σ of `data` (`[x, y, z]`, NaN-capable).
///
/// `seed`, when given, replaces the cube for the first estimate only: it
/// must share the cube's spatial shape but may cover any subset of
/// channels (typically a signal-free range). It is never modified.
///
/// All arguments are validated before any computation, so a failed call
/// produces nothing.
pub fn estimate(
    data: ArrayView3<'_, f64>,
    params: &NoiseParams,
    seed: Option<ArrayView3<'_, f64>>,
) -> Result<NoiseEstimate> {
    if params.iterations == 0 {
        return Err(CubeError::Argument(
            "noise estimation needs at least one iteration".into(),
        ));
    }
    if params.signal_threshold.is_nan() {
        return Err(CubeError::Argument("signal threshold is NaN".into()));
    }
    if params.spectral_variation {
        return Err(CubeError::UnsupportedFeature(
            "spectrally varying noise has not been implemented",
        ));
    }
    let (nx, ny, nz) = data.dim();
    if let Some(seed) = &seed {
        let (sx, sy, _) = seed.dim();
        if (sx, sy) != (nx, ny) {
            return Err(CubeError::input_shape((nx, ny), (sx, sy)));
        }
    }

    let mut dev_xy = match seed {
        Some(seed) => mad_along_spectral(seed),
        None => mad_along_spectral(data),
    };
    log::debug!("Seed noise estimate: mean σ = {:.6}", nan_mean(dev_xy.iter()));

    if params.iterations > 1 {
        // Clipped voxels accumulate across iterations in this private copy.
        let mut working = data.to_owned();
        for iteration in 1..params.iterations {
            dev_xy = refine(&mut working, &dev_xy, params.signal_threshold);
            log::debug!(
                "Noise iteration {iteration}: mean σ = {:.6}",
                nan_mean(dev_xy.iter())
            );
        }
    }

    let dev = Array3::from_shape_fn((nx, ny, nz), |(x, y, _)| dev_xy[[x, y]]);
    Ok(NoiseEstimate { dev, dev_xy })
}

/// One clipping step: mask voxels above `threshold × σ` in `working`, then
/// return the σ recomputed from the surviving voxels.
fn refine(working: &mut Array3<f64>, dev_xy: &Array2<f64>, threshold: f64) -> Array2<f64> {
    Zip::from(working.lanes_mut(Axis(2)))
        .and(dev_xy)
        .for_each(|mut spectrum, &sigma| {
            let limit = threshold * sigma;
            spectrum.mapv_inplace(|v| if v > limit { f64::NAN } else { v });
        });
    mad_along_spectral(working.view())
}
