use std::fmt;
use std::path::Path;

use ndarray::{Array2, Array3, ArrayView3, Zip};

use super::axes::normalize;
use super::coords::{AngleFormat, FormattedCoords, SkyCoord};
use super::error::{CubeError, Result};
use super::header::{validate_required, Header};
use super::loader::{load_file, CubeSource, HduSelector};
use super::noise::{self, nan_mean, nan_range, NoiseEstimate, NoiseParams};
use super::wcs::{Wcs, NAXES};

// ---------------------------------------------------------------------------
// DataCube
// ---------------------------------------------------------------------------

/// A spectral-line map: intensity indexed as `[ra, dec, vel]`, plus the
/// metadata and transform needed to put sky coordinates on every voxel.
///
/// The array is always in canonical order regardless of how the file stored
/// its axes. Noise is optional and only changes through
/// [`DataCube::recompute_noise`].
#[derive(Debug, Clone)]
pub struct DataCube {
    data: Array3<f64>,
    object_name: String,
    line_name: String,
    header: Header,
    wcs: Wcs,
    noise: Option<NoiseEstimate>,
}

impl DataCube {
    /// Load a cube from a FITS file.
    pub fn open(path: impl AsRef<Path>, hdu: &HduSelector, compute_noise: bool) -> Result<Self> {
        let source = load_file(path.as_ref(), hdu)?;
        Self::from_source(source, compute_noise)
    }

    /// Build a cube from an already-loaded header and storage-order array.
    ///
    /// Order of checks: required header fields, array dimensionality, axis
    /// roles and WCS, then the array shape (no empty axis, agreement with
    /// `NAXISn` where declared). Noise is
    /// estimated with [`NoiseParams::default`] when `compute_noise` is set.
    pub fn from_source(source: CubeSource, compute_noise: bool) -> Result<Self> {
        let CubeSource { header, data } = source;

        let identity = validate_required(&header)?;
        if data.ndim() != NAXES {
            return Err(CubeError::format(format!(
                "data has {} axes, a cube needs exactly {NAXES}",
                data.ndim()
            )));
        }

        let wcs = Wcs::from_header(&header)?;
        let roles = wcs.roles();
        let data = normalize(data, &roles)?;

        let declared = roles
            .as_array()
            .map(|axis| header.get_i64(&format!("NAXIS{}", axis + 1)));
        let (nx, ny, nz) = data.dim();
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(CubeError::format(format!(
                "cube has an empty axis: shape {:?}",
                (nx, ny, nz)
            )));
        }
        for (length, actual) in declared.iter().zip([nx, ny, nz]) {
            if let Some(n) = length {
                if *n != actual as i64 {
                    return Err(CubeError::format(format!(
                        "header declares axis lengths {declared:?} but data is {:?}",
                        (nx, ny, nz)
                    )));
                }
            }
        }

        let mut cube = Self {
            data,
            object_name: identity.object_name,
            line_name: identity.line_name,
            header,
            wcs,
            noise: None,
        };
        if compute_noise {
            cube.recompute_noise(&NoiseParams::default(), None)?;
        }

        log::info!(
            "{} map of {} ready: shape {:?}, noise {}",
            cube.line_name,
            cube.object_name,
            cube.shape(),
            if cube.noise.is_some() { "estimated" } else { "skipped" }
        );
        Ok(cube)
    }

    /// Re-run the noise estimator and replace the stored estimate.
    ///
    /// On error the previous estimate (if any) is left untouched.
    pub fn recompute_noise(
        &mut self,
        params: &NoiseParams,
        seed: Option<ArrayView3<'_, f64>>,
    ) -> Result<()> {
        let estimate = noise::estimate(self.data.view(), params, seed)?;
        self.noise = Some(estimate);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// `(nx, ny, nz)` in canonical order.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn object_name(&self) -> &str {
        &self.object_name
    }

    pub fn line_name(&self) -> &str {
        &self.line_name
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The cube's world coordinate system.
    pub fn frame(&self) -> &Wcs {
        &self.wcs
    }

    pub fn noise_dev(&self) -> Option<&Array3<f64>> {
        self.noise.as_ref().map(|n| &n.dev)
    }

    pub fn noise_dev_xy(&self) -> Option<&Array2<f64>> {
        self.noise.as_ref().map(|n| &n.dev_xy)
    }

    /// Intensity at a voxel, `None` when out of range.
    pub fn value_at(&self, x: usize, y: usize, z: usize) -> Option<f64> {
        self.data.get([x, y, z]).copied()
    }

    /// `data / noise_dev`, or `None` before noise has been estimated.
    pub fn signal_to_noise(&self) -> Option<Array3<f64>> {
        let dev = self.noise_dev()?;
        Some(Zip::from(&self.data).and(dev).map_collect(|v, sigma| v / sigma))
    }

    // -----------------------------------------------------------------------
    // Coordinate queries
    // -----------------------------------------------------------------------

    /// Sky coordinates of a voxel: RA/DEC in degrees, velocity in km/s.
    pub fn pixel_coords(&self, x: usize, y: usize, z: usize) -> SkyCoord {
        SkyCoord::from_world(self.wcs.pixel_to_sky(x as f64, y as f64, z as f64))
    }

    /// [`DataCube::pixel_coords`] rendered as text. Format names are `deg`,
    /// `hms` or `dms`; anything else is an [`CubeError::Argument`].
    pub fn pixel_coords_formatted(
        &self,
        x: usize,
        y: usize,
        z: usize,
        ra_format: &str,
        dec_format: &str,
        decimals: usize,
    ) -> Result<FormattedCoords> {
        let ra: AngleFormat = ra_format.parse()?;
        let dec: AngleFormat = dec_format.parse()?;
        Ok(self.pixel_coords_as(x, y, z, ra, dec, decimals))
    }

    pub fn pixel_coords_as(
        &self,
        x: usize,
        y: usize,
        z: usize,
        ra: AngleFormat,
        dec: AngleFormat,
        decimals: usize,
    ) -> FormattedCoords {
        self.pixel_coords(x, y, z).format(ra, dec, decimals)
    }

    /// Velocity (km/s) of channel `z` at spatial pixel `(0, 0)`, rounded to
    /// `decimals` places when given.
    pub fn velocity_at(&self, z: usize, decimals: Option<u32>) -> f64 {
        let velocity = self.pixel_coords(0, 0, z).vel_km_s;
        match decimals {
            Some(places) => {
                let factor = 10f64.powi(places.min(15) as i32);
                (velocity * factor).round() / factor
            }
            None => velocity,
        }
    }

    /// One-line summary of identity, shape, intensity range and noise.
    pub fn describe(&self) -> String {
        let range = match nan_range(self.data.iter()) {
            Some((lo, hi)) => format!("{lo:.4} to {hi:.4}"),
            None => "undefined (all values are NaN)".to_string(),
        };
        let noise = match self.noise_dev() {
            Some(dev) => format!("{:.4}", nan_mean(dev.iter())),
            None => "not computed".to_string(),
        };
        format!(
            "DataCube {} spectral line map of {}. Data shape is {:?} with intensity on the range {}. Mean noise deviation is {}.",
            self.line_name,
            self.object_name,
            self.shape(),
            range,
            noise
        )
    }
}

impl fmt::Display for DataCube {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, ArrayD, IxDyn};

    const NX: usize = 4;
    const NY: usize = 3;
    const NZ: usize = 6;

    fn header() -> Header {
        Header::new()
            .with("OBJECT", "Orion KL")
            .with("LINENAME", "CO(1-0)")
            .with("NAXIS", 3)
            .with("NAXIS1", NX as i64)
            .with("NAXIS2", NY as i64)
            .with("NAXIS3", NZ as i64)
            .with("CTYPE1", "RA---TAN")
            .with("CTYPE2", "DEC--TAN")
            .with("CTYPE3", "VELO-LSR")
            .with("CRPIX1", 2.0)
            .with("CRPIX2", 2.0)
            .with("CRPIX3", 1.0)
            .with("CRVAL1", 83.8)
            .with("CRVAL2", -5.4)
            .with("CRVAL3", -5000.0)
            .with("CDELT1", -0.002)
            .with("CDELT2", 0.002)
            .with("CDELT3", 1234.5)
    }

    fn without(header: &Header, keys: &[&str]) -> Header {
        let mut kept = Header::new();
        for (key, value) in header.iter().filter(|(key, _)| !keys.contains(key)) {
            kept.insert(key, value.clone());
        }
        kept
    }

    /// Storage-order data `[z, y, x]` with value `x + 10y + 100z`.
    fn storage_data() -> ArrayD<f64> {
        ArrayD::from_shape_fn(IxDyn(&[NZ, NY, NX]), |idx| {
            (idx[2] + 10 * idx[1] + 100 * idx[0]) as f64
        })
    }

    fn cube(compute_noise: bool) -> DataCube {
        DataCube::from_source(CubeSource::new(header(), storage_data()), compute_noise).unwrap()
    }

    #[test]
    fn data_is_in_canonical_order() {
        let cube = cube(false);
        assert_eq!(cube.shape(), (NX, NY, NZ));
        assert_eq!(cube.data()[[3, 1, 5]], 3.0 + 10.0 + 500.0);
        assert_eq!(cube.value_at(3, 1, 5), Some(513.0));
        assert_eq!(cube.value_at(NX, 0, 0), None);
        assert_eq!(cube.object_name(), "Orion KL");
        assert_eq!(cube.line_name(), "CO(1-0)");
    }

    #[test]
    fn missing_line_name_fails_before_wcs() {
        let header = without(&header().with("CTYPE1", "GLON-CAR"), &["LINENAME"]);
        let err = DataCube::from_source(CubeSource::new(header, storage_data()), false).unwrap_err();
        match err {
            CubeError::Format(problems) => assert!(problems[0].contains("LINENAME")),
            other => panic!("expected Format error, got {other:?}"),
        }
    }

    #[test]
    fn four_axis_header_is_format_error() {
        let header = header().with("NAXIS", 4).with("NAXIS4", 1);
        let data = storage_data().into_shape_with_order(IxDyn(&[1, NZ, NY, NX])).unwrap();
        let err = DataCube::from_source(CubeSource::new(header, data), false).unwrap_err();
        assert!(matches!(err, CubeError::Format(_)));
    }

    #[test]
    fn data_not_matching_naxis_is_format_error() {
        let header = header().with("NAXIS1", 5);
        let err = DataCube::from_source(CubeSource::new(header, storage_data()), false).unwrap_err();
        assert!(matches!(err, CubeError::Format(_)));
    }

    #[test]
    fn empty_spectral_axis_is_format_error() {
        let header = without(&header(), &["NAXIS1", "NAXIS2", "NAXIS3"]);
        let data = ArrayD::zeros(IxDyn(&[0, NY, NX]));
        let err = DataCube::from_source(CubeSource::new(header, data), false).unwrap_err();
        assert!(matches!(err, CubeError::Format(_)));
        assert!(err.to_string().contains("empty axis"), "{err}");
    }

    #[test]
    fn galactic_cube_is_configuration_error() {
        let header = header().with("CTYPE1", "GLON-TAN").with("CTYPE2", "GLAT-TAN");
        let err = DataCube::from_source(CubeSource::new(header, storage_data()), false).unwrap_err();
        assert!(matches!(err, CubeError::Configuration(_)));
    }

    #[test]
    fn reference_pixel_coordinates() {
        let cube = cube(false);
        // CRPIX (2, 2, 1) is zero-based (1, 1, 0).
        let coord = cube.pixel_coords(1, 1, 0);
        assert!((coord.ra_deg - 83.8).abs() < 1e-9);
        assert!((coord.dec_deg + 5.4).abs() < 1e-9);
        assert!((coord.vel_km_s + 5.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_at_rounds_on_request() {
        let cube = cube(false);
        let exact = cube.velocity_at(1, None);
        assert!((exact - cube.pixel_coords(0, 0, 1).vel_km_s).abs() < 1e-12);
        assert!((exact + 3.7655).abs() < 1e-9);
        assert!((cube.velocity_at(1, Some(1)) + 3.8).abs() < 1e-12);
        assert!((cube.velocity_at(3, Some(0)) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn formatted_coordinates() {
        let cube = cube(false);
        let text = cube.pixel_coords_formatted(1, 1, 0, "deg", "dms", 2).unwrap();
        assert_eq!(text.ra, "83.80°");
        assert_eq!(text.dec, "-5° 24' 0.00''");
        assert_eq!(text.vel, "-5.00 km/s");

        let err = cube.pixel_coords_formatted(0, 0, 0, "hms", "furlongs", 2).unwrap_err();
        assert!(matches!(err, CubeError::Argument(_)));
    }

    #[test]
    fn describe_reports_missing_noise() {
        let cube = cube(false);
        let text = cube.describe();
        assert!(text.starts_with("DataCube CO(1-0) spectral line map of Orion KL."));
        assert!(text.contains("(4, 3, 6)"));
        assert!(text.contains("0.0000 to 523.0000"));
        assert!(text.ends_with("Mean noise deviation is not computed."));
        assert_eq!(cube.to_string(), text);
        assert!(cube.noise_dev().is_none());
        assert!(cube.signal_to_noise().is_none());
    }

    #[test]
    fn noise_is_computed_at_load_when_requested() {
        let cube = cube(true);
        let dev = cube.noise_dev().unwrap();
        assert_eq!(dev.dim(), cube.shape());
        assert_eq!(cube.noise_dev_xy().unwrap().dim(), (NX, NY));
        // Each spectrum is a ramp with step 100, so σ is identical everywhere.
        let first = dev[[0, 0, 0]];
        assert!(dev.iter().all(|v| (v - first).abs() < 1e-9));
        assert!(!cube.describe().contains("not computed"));
    }

    #[test]
    fn recompute_noise_replaces_estimate() {
        let mut cube = cube(true);
        let seed = cube.data().slice(s![.., .., ..2]).to_owned();
        let params = NoiseParams {
            iterations: 1,
            ..NoiseParams::default()
        };
        cube.recompute_noise(&params, Some(seed.view())).unwrap();
        // Two channels 100 apart: MAD = 50.
        let sigma = cube.noise_dev_xy().unwrap()[[0, 0]];
        assert!((sigma - 50.0 * noise::MAD_SCALE).abs() < 1e-9);

        let snr = cube.signal_to_noise().unwrap();
        assert!((snr[[2, 1, 3]] - cube.data()[[2, 1, 3]] / sigma).abs() < 1e-12);
    }

    #[test]
    fn failed_recompute_keeps_previous_estimate() {
        let mut cube = cube(true);
        let before = cube.noise_dev_xy().unwrap().clone();

        let wrong = Array3::<f64>::zeros((NX + 1, NY, 2));
        let err = cube
            .recompute_noise(&NoiseParams::default(), Some(wrong.view()))
            .unwrap_err();
        assert!(matches!(err, CubeError::InputShape { .. }));

        let spectral = NoiseParams {
            spectral_variation: true,
            ..NoiseParams::default()
        };
        let err = cube.recompute_noise(&spectral, None).unwrap_err();
        assert!(matches!(err, CubeError::UnsupportedFeature(_)));

        assert_eq!(cube.noise_dev_xy().unwrap(), &before);
    }
}
