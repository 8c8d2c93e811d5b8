use ndarray::{Array3, ArrayD, Ix3};

use super::error::{CubeError, Result};
use super::wcs::{AxisRoles, NAXES};

/// Storage-array axes `[ra, dec, spec]` for the given roles.
///
/// Roles are file-axis numbers (`NAXIS1` → 0) while storage arrays put the
/// slowest-varying axis first, so file axis `k` is storage axis `2 - k`.
pub fn storage_permutation(roles: &AxisRoles) -> Result<[usize; NAXES]> {
    let file_axes = roles.as_array();
    let mut seen = [false; NAXES];
    for &axis in &file_axes {
        if axis >= NAXES || seen[axis] {
            return Err(CubeError::Configuration(format!(
                "axis roles {file_axes:?} are not a permutation of 0..{NAXES}"
            )));
        }
        seen[axis] = true;
    }
    Ok(file_axes.map(|axis| NAXES - 1 - axis))
}

/// Reorder raw storage-order data into canonical `[ra, dec, vel]` order.
///
/// Pure transposition: values are never touched, resampled or dropped.
/// The result is a standard-layout copy, so spectra along the last axis
/// are contiguous.
pub fn normalize(raw: ArrayD<f64>, roles: &AxisRoles) -> Result<Array3<f64>> {
    let permutation = storage_permutation(roles)?;
    let ndim = raw.ndim();
    let raw = raw.into_dimensionality::<Ix3>().map_err(|_| {
        CubeError::format(format!("data has {ndim} axes, a cube needs exactly {NAXES}"))
    })?;

    let canonical = raw.permuted_axes(permutation);
    log::debug!(
        "Normalised storage axes {permutation:?} to canonical shape {:?}",
        canonical.dim()
    );
    Ok(canonical.as_standard_layout().into_owned())
}
