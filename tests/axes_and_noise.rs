use astrocube::data::noise::nan_mean;
use astrocube::{CubeError, CubeSource, DataCube, Header, NoiseParams};
use ndarray::{s, ArrayD, IxDyn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

fn base_header() -> Header {
    Header::new()
        .with("OBJECT", "IC 342")
        .with("LINENAME", "CO(2-1)")
        .with("NAXIS", 3)
}

#[test]
fn velocity_first_file_is_reordered() {
    let (nx, ny, nz) = (4, 3, 6);
    // NAXIS1 = velocity, NAXIS2 = RA, NAXIS3 = DEC.
    let header = base_header()
        .with("NAXIS1", nz as i64)
        .with("NAXIS2", nx as i64)
        .with("NAXIS3", ny as i64)
        .with("CTYPE1", "VRAD")
        .with("CUNIT1", "km/s")
        .with("CTYPE2", "RA---CAR")
        .with("CTYPE3", "DEC--CAR")
        .with("CRPIX1", 1.0)
        .with("CRPIX2", 1.0)
        .with("CRPIX3", 1.0)
        .with("CRVAL1", 30.0)
        .with("CRVAL2", 180.0)
        .with("CRVAL3", 0.0)
        .with("CDELT1", 2.0)
        .with("CDELT2", -0.1)
        .with("CDELT3", 0.1);
    // Storage order is [NAXIS3, NAXIS2, NAXIS1] = [dec, ra, vel].
    let data = ArrayD::from_shape_fn(IxDyn(&[ny, nx, nz]), |idx| {
        (100 * idx[1] + 10 * idx[0] + idx[2]) as f64
    });

    let cube = DataCube::from_source(CubeSource::new(header, data), false).unwrap();
    assert_eq!(cube.shape(), (nx, ny, nz));
    for ((x, y, z), value) in cube.data().indexed_iter() {
        assert_eq!(*value, (100 * x + 10 * y + z) as f64);
    }

    let coord = cube.pixel_coords(2, 1, 3);
    assert!((coord.ra_deg - 179.8).abs() < 1e-9, "ra {}", coord.ra_deg);
    assert!((coord.dec_deg - 0.1).abs() < 1e-9, "dec {}", coord.dec_deg);
    assert!((coord.vel_km_s - 36.0).abs() < 1e-9, "vel {}", coord.vel_km_s);
    assert_eq!(cube.frame().roles().spec, 0);
}

#[test]
fn frequency_axis_reports_radio_velocity() {
    let rest = 115.2712018e9;
    let header = base_header()
        .with("NAXIS1", 2)
        .with("NAXIS2", 2)
        .with("NAXIS3", 3)
        .with("CTYPE1", "RA---SIN")
        .with("CTYPE2", "DEC--SIN")
        .with("CTYPE3", "FREQ")
        .with("CRPIX1", 1.0)
        .with("CRPIX2", 1.0)
        .with("CRPIX3", 2.0)
        .with("CRVAL1", 56.7)
        .with("CRVAL2", 68.1)
        .with("CRVAL3", rest)
        .with("CDELT1", -0.001)
        .with("CDELT2", 0.001)
        .with("CDELT3", 1.0e6)
        .with("RESTFRQ", rest);
    let data = ArrayD::zeros(IxDyn(&[3, 2, 2]));
    let cube = DataCube::from_source(CubeSource::new(header, data), false).unwrap();

    assert!(cube.velocity_at(1, None).abs() < 1e-9);
    // Higher frequency → approaching → negative velocity.
    assert!(cube.velocity_at(2, None) < 0.0);
    assert!(cube.velocity_at(0, None) > 0.0);
}

#[test]
fn galactic_cube_is_rejected() {
    let header = base_header()
        .with("NAXIS1", 2)
        .with("NAXIS2", 2)
        .with("NAXIS3", 2)
        .with("CTYPE1", "GLON-CAR")
        .with("CTYPE2", "GLAT-CAR")
        .with("CTYPE3", "VELO-LSR");
    let data = ArrayD::zeros(IxDyn(&[2, 2, 2]));
    let err = DataCube::from_source(CubeSource::new(header, data), true).unwrap_err();
    assert!(matches!(err, CubeError::Configuration(_)));
}

/// 6 × 6 × 100 cube of N(0, 0.5) with a bright line in the centre.
fn line_cube() -> DataCube {
    let (nx, ny, nz) = (6usize, 6usize, 100usize);
    let mut rng = StdRng::seed_from_u64(2024);
    let normal = Normal::new(0.0, 0.5).unwrap();
    let mut data = ArrayD::from_shape_simple_fn(IxDyn(&[nz, ny, nx]), || normal.sample(&mut rng));
    // Storage order: [z, y, x].
    data.slice_mut(s![40..60, 1..5, 1..5]).mapv_inplace(|v| v + 20.0);

    let header = base_header()
        .with("NAXIS1", nx as i64)
        .with("NAXIS2", ny as i64)
        .with("NAXIS3", nz as i64)
        .with("CTYPE1", "RA---TAN")
        .with("CTYPE2", "DEC--TAN")
        .with("CTYPE3", "VELO-LSR")
        .with("CRPIX1", 3.0)
        .with("CRPIX2", 3.0)
        .with("CRPIX3", 50.0)
        .with("CRVAL1", 56.7)
        .with("CRVAL2", 68.1)
        .with("CRVAL3", 31000.0)
        .with("CDELT1", -0.002)
        .with("CDELT2", 0.002)
        .with("CDELT3", 2600.0);
    DataCube::from_source(CubeSource::new(header, data), true).unwrap()
}

#[test]
fn clipped_noise_ignores_the_line() {
    let cube = line_cube();
    let dev_xy = cube.noise_dev_xy().unwrap();
    let mean = nan_mean(dev_xy.iter());
    assert!((mean - 0.5).abs() < 0.05, "mean σ {mean}");
    for sigma in dev_xy.iter() {
        assert!((sigma - 0.5).abs() < 0.3, "σ {sigma}");
    }

    let snr = cube.signal_to_noise().unwrap();
    assert!(snr[[2, 2, 50]] > 10.0);
}

#[test]
fn quiet_seed_matches_clipped_estimate() {
    let mut cube = line_cube();
    let quiet = cube.data().slice(s![.., .., ..30]).to_owned();
    let params = NoiseParams {
        iterations: 1,
        ..NoiseParams::default()
    };
    cube.recompute_noise(&params, Some(quiet.view())).unwrap();
    let mean = nan_mean(cube.noise_dev_xy().unwrap().iter());
    assert!((mean - 0.5).abs() < 0.07, "mean σ {mean}");

    let wrong = quiet.slice(s![..3, .., ..]).to_owned();
    let err = cube.recompute_noise(&params, Some(wrong.view())).unwrap_err();
    assert!(matches!(err, CubeError::InputShape { .. }));
}
