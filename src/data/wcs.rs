//! Pixel → world coordinate transform for spectral-line cubes.
//!
//! The RA/DEC pair is handed to the `wcs` crate (FITS WCS Papers I and II:
//! `PCi_j`/`CDELTi`, `CDi_j` or legacy `CROTA2`, every projection it
//! implements, `LONPOLE`/`LATPOLE`). The spectral axis is linear, in
//! velocity or frequency units, and reported as velocity in m/s.
//!
//! Pixel coordinates are zero-based (pixel 0 is FITS pixel 1) and given in
//! *file axis order* (`NAXIS1` first).

use std::sync::Arc;

use wcs::{ImgXY, WCSParams, WCS};

use super::error::{CubeError, Result};
use super::header::Header;

/// Number of axes a cube carries.
pub const NAXES: usize = 3;

/// Speed of light in m/s, for frequency → radio velocity.
const SPEED_OF_LIGHT: f64 = 299_792_458.0;

// ---------------------------------------------------------------------------
// Axis classification
// ---------------------------------------------------------------------------

/// Zero-based file-axis numbers (`NAXIS1` → 0) of the three cube roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRoles {
    pub ra: usize,
    pub dec: usize,
    pub spec: usize,
}

impl AxisRoles {
    /// Roles as `[ra, dec, spec]`.
    pub fn as_array(&self) -> [usize; NAXES] {
        [self.ra, self.dec, self.spec]
    }
}

#[derive(Debug, Clone, PartialEq)]
enum AxisKind {
    Longitude(String),
    Latitude(String),
    Spectral(String),
    Other,
}

/// Split a `CTYPEi` value into coordinate type and algorithm code,
/// e.g. `"RA---TAN"` → `("RA", "TAN")`, `"VELO-LSR"` → `("VELO", "LSR")`.
fn split_ctype(ctype: &str) -> (String, String) {
    let ctype = ctype.trim().to_ascii_uppercase();
    match (ctype.get(..4), ctype.get(4..)) {
        (Some(head), Some(tail)) => (
            head.trim_end_matches('-').to_string(),
            tail.trim_start_matches('-').trim().to_string(),
        ),
        _ => (ctype.trim_end_matches('-').to_string(), String::new()),
    }
}

const SPECTRAL_TYPES: &[&str] = &[
    "FREQ", "ENER", "WAVN", "VRAD", "WAVE", "VOPT", "ZOPT", "AWAV", "VELO", "BETA", "FELO",
];

fn axis_kind(coord_type: &str) -> AxisKind {
    let is_pair_code = |suffix: &str| coord_type.len() == 4 && coord_type.ends_with(suffix);
    match coord_type {
        "RA" => AxisKind::Longitude(coord_type.to_string()),
        "DEC" => AxisKind::Latitude(coord_type.to_string()),
        t if t.ends_with("LON") || is_pair_code("LN") => AxisKind::Longitude(t.to_string()),
        t if t.ends_with("LAT") || is_pair_code("LT") => AxisKind::Latitude(t.to_string()),
        t if SPECTRAL_TYPES.contains(&t) => AxisKind::Spectral(t.to_string()),
        _ => AxisKind::Other,
    }
}

fn ctype(header: &Header, axis: usize) -> String {
    header
        .get_str(&format!("CTYPE{}", axis + 1))
        .unwrap_or("")
        .to_string()
}

fn assign(slot: &mut Option<usize>, axis: usize, role: &str) -> Result<()> {
    match slot {
        Some(previous) => Err(CubeError::Configuration(format!(
            "axes {} and {} are both {role} axes",
            *previous + 1,
            axis + 1
        ))),
        None => {
            *slot = Some(axis);
            Ok(())
        }
    }
}

/// Determine which file axis is right ascension, declination and spectral.
///
/// Only equatorial maps are supported: a longitude axis that is not `RA`
/// or a latitude axis that is not `DEC` is a configuration error.
pub fn classify_axes(header: &Header) -> Result<AxisRoles> {
    let mut ra = None;
    let mut dec = None;
    let mut spec = None;

    for axis in 0..NAXES {
        let (coord_type, _) = split_ctype(&ctype(header, axis));
        match axis_kind(&coord_type) {
            AxisKind::Longitude(t) if t == "RA" => assign(&mut ra, axis, "right ascension")?,
            AxisKind::Latitude(t) if t == "DEC" => assign(&mut dec, axis, "declination")?,
            AxisKind::Longitude(t) => {
                return Err(CubeError::Configuration(format!(
                    "longitude axis {} is {t}, only right ascension (RA) is supported",
                    axis + 1
                )))
            }
            AxisKind::Latitude(t) => {
                return Err(CubeError::Configuration(format!(
                    "latitude axis {} is {t}, only declination (DEC) is supported",
                    axis + 1
                )))
            }
            AxisKind::Spectral(_) => assign(&mut spec, axis, "spectral")?,
            AxisKind::Other => {}
        }
    }

    let missing = |role: &str| {
        CubeError::Configuration(format!("no {role} axis among CTYPE1..CTYPE{NAXES}"))
    };
    let roles = AxisRoles {
        ra: ra.ok_or_else(|| missing("right ascension"))?,
        dec: dec.ok_or_else(|| missing("declination"))?,
        spec: spec.ok_or_else(|| missing("spectral"))?,
    };
    log::debug!("Axis roles (file order): {roles:?}");
    Ok(roles)
}

// ---------------------------------------------------------------------------
// Celestial part
// ---------------------------------------------------------------------------

/// Upper-cased `CTYPEi` of a celestial axis, checked to carry the
/// `XXXX-PPP` projection suffix the WCS library reads.
fn celestial_ctype(header: &Header, axis: usize) -> Result<String> {
    let value = ctype(header, axis).trim().to_ascii_uppercase();
    let (_, algorithm) = split_ctype(&value);
    if value.len() < 8 || !value.is_ascii() || algorithm.is_empty() {
        return Err(CubeError::Configuration(format!(
            "CTYPE{} '{value}' has no celestial projection code",
            axis + 1
        )));
    }
    Ok(value)
}

/// Reference value of `stem` on `axis`, falling back to `default` with a
/// warning when the keyword is absent.
fn reference(header: &Header, stem: &str, axis: usize, default: f64) -> f64 {
    let key = format!("{stem}{}", axis + 1);
    header.get_f64(&key).unwrap_or_else(|| {
        log::warn!("{key} missing, assuming {default}");
        default
    })
}

/// Two-axis WCS parameters for the RA/DEC pair, RA first.
///
/// Spectral cross terms of `PCi_j`/`CDi_j` are dropped: the celestial and
/// spectral parts are treated as separable.
fn celestial_params(header: &Header, roles: &AxisRoles) -> Result<WCSParams> {
    let (lng, lat) = (roles.ra, roles.dec);
    let lng_ctype = celestial_ctype(header, lng)?;
    let lat_ctype = celestial_ctype(header, lat)?;
    let (_, lng_algo) = split_ctype(&lng_ctype);
    let (_, lat_algo) = split_ctype(&lat_ctype);
    if lng_algo != lat_algo {
        return Err(CubeError::Configuration(format!(
            "RA and DEC use different projections ({lng_algo} vs {lat_algo})"
        )));
    }

    let card = |stem: &str, axis: usize| header.get_f64(&format!("{stem}{}", axis + 1));
    let element =
        |stem: &str, i: usize, j: usize| header.get_f64(&format!("{stem}{}_{}", i + 1, j + 1));
    let length = |axis: usize| {
        header
            .get_i64(&format!("NAXIS{}", axis + 1))
            .filter(|n| *n > 0)
            .unwrap_or(1)
    };

    Ok(WCSParams {
        naxis: Some(2),
        ctype1: lng_ctype,
        ctype2: Some(lat_ctype),
        naxis1: length(lng),
        naxis2: length(lat),
        crpix1: Some(reference(header, "CRPIX", lng, 0.0)),
        crpix2: Some(reference(header, "CRPIX", lat, 0.0)),
        crval1: Some(reference(header, "CRVAL", lng, 0.0)),
        crval2: Some(reference(header, "CRVAL", lat, 0.0)),
        cdelt1: card("CDELT", lng),
        cdelt2: card("CDELT", lat),
        crota2: card("CROTA", lat),
        pc1_1: element("PC", lng, lng),
        pc1_2: element("PC", lng, lat),
        pc2_1: element("PC", lat, lng),
        pc2_2: element("PC", lat, lat),
        cd1_1: element("CD", lng, lng),
        cd1_2: element("CD", lng, lat),
        cd2_1: element("CD", lat, lng),
        cd2_2: element("CD", lat, lat),
        lonpole: header.get_f64("LONPOLE"),
        latpole: header.get_f64("LATPOLE"),
        ..empty_params()
    })
}

/// `WCSParams` with every optional card unset (the type has no `Default`).
fn empty_params() -> WCSParams {
    serde_json::from_value(serde_json::json!({ "NAXIS1": 1, "NAXIS2": 1, "CTYPE1": "" }))
        .expect("optional WCS cards default to None")
}

// ---------------------------------------------------------------------------
// Spectral axis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum SpectralUnit {
    /// Linear velocity axis; factor converts header units to m/s.
    Velocity { to_m_per_s: f64 },
    /// Linear frequency axis converted to radio velocity.
    Frequency { to_hz: f64, rest_hz: f64 },
}

impl SpectralUnit {
    fn from_header(header: &Header, axis: usize) -> Result<Self> {
        let (coord_type, _) = split_ctype(&ctype(header, axis));
        let unit = header
            .get_str(&format!("CUNIT{}", axis + 1))
            .unwrap_or("")
            .trim()
            .to_ascii_uppercase();

        match coord_type.as_str() {
            "VELO" | "VRAD" | "VOPT" | "FELO" => {
                let to_m_per_s = match unit.as_str() {
                    "" | "M/S" | "M S-1" | "M.S-1" => 1.0,
                    "KM/S" | "KM S-1" | "KM.S-1" => 1000.0,
                    other => {
                        return Err(CubeError::Configuration(format!(
                            "unsupported velocity unit '{other}'"
                        )))
                    }
                };
                Ok(SpectralUnit::Velocity { to_m_per_s })
            }
            "FREQ" => {
                let to_hz = match unit.as_str() {
                    "" | "HZ" => 1.0,
                    "KHZ" => 1e3,
                    "MHZ" => 1e6,
                    "GHZ" => 1e9,
                    other => {
                        return Err(CubeError::Configuration(format!(
                            "unsupported frequency unit '{other}'"
                        )))
                    }
                };
                let rest_hz = header
                    .get_f64("RESTFRQ")
                    .or_else(|| header.get_f64("RESTFREQ"))
                    .filter(|f| *f > 0.0)
                    .ok_or_else(|| {
                        CubeError::Configuration(
                            "frequency axis without RESTFRQ cannot be expressed as velocity".into(),
                        )
                    })?;
                Ok(SpectralUnit::Frequency { to_hz, rest_hz })
            }
            other => Err(CubeError::Configuration(format!(
                "spectral axis type {other} cannot be expressed as velocity"
            ))),
        }
    }

    fn to_m_per_s(self, world: f64) -> f64 {
        match self {
            SpectralUnit::Velocity { to_m_per_s } => world * to_m_per_s,
            SpectralUnit::Frequency { to_hz, rest_hz } => {
                SPEED_OF_LIGHT * (1.0 - world * to_hz / rest_hz)
            }
        }
    }
}

/// Linear spectral axis: `CRVAL + scale · (pixel + 1 - CRPIX)`, then
/// converted to m/s.
#[derive(Debug, Clone, Copy, PartialEq)]
struct SpectralAxis {
    crpix: f64,
    crval: f64,
    /// `CDi_i`, or `CDELTi · PCi_i`.
    scale: f64,
    unit: SpectralUnit,
}

impl SpectralAxis {
    fn from_header(header: &Header, axis: usize) -> Result<Self> {
        let diagonal = |stem: &str| header.get_f64(&format!("{stem}{0}_{0}", axis + 1));
        let scale = diagonal("CD").unwrap_or_else(|| {
            header
                .get_f64(&format!("CDELT{}", axis + 1))
                .unwrap_or(1.0)
                * diagonal("PC").unwrap_or(1.0)
        });
        Ok(Self {
            crpix: reference(header, "CRPIX", axis, 0.0),
            crval: reference(header, "CRVAL", axis, 0.0),
            scale,
            unit: SpectralUnit::from_header(header, axis)?,
        })
    }

    /// Zero-based pixel → velocity in m/s.
    fn velocity(&self, pixel: f64) -> f64 {
        self.unit
            .to_m_per_s(self.crval + self.scale * (pixel + 1.0 - self.crpix))
    }
}

// ---------------------------------------------------------------------------
// Wcs
// ---------------------------------------------------------------------------

/// Sky position of one voxel as produced by the transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub vel_m_per_s: f64,
}

/// World coordinate system of one cube.
///
/// RA/DEC go through the `wcs` crate; the spectral axis is linear and
/// handled here. Celestial values are left in the header's own equatorial
/// frame (no `RADESYS`/`EQUINOX` conversion).
#[derive(Debug, Clone)]
pub struct Wcs {
    roles: AxisRoles,
    celestial: Arc<WCS>,
    spectral: SpectralAxis,
}

impl Wcs {
    /// Build the transform from header keywords, classifying axes first.
    pub fn from_header(header: &Header) -> Result<Self> {
        let roles = classify_axes(header)?;
        let params = celestial_params(header, &roles)?;
        let celestial = WCS::new(&params).map_err(|e| {
            CubeError::Configuration(format!(
                "celestial WCS for {} could not be built: {e}",
                params.ctype1
            ))
        })?;
        let spectral = SpectralAxis::from_header(header, roles.spec)?;

        log::debug!("WCS: celestial {celestial:?}, spectral {spectral:?}");
        Ok(Self {
            roles,
            celestial: Arc::new(celestial),
            spectral,
        })
    }

    pub fn roles(&self) -> AxisRoles {
        self.roles
    }

    /// Transform a zero-based pixel in file axis order into world values in
    /// file axis order: RA/DEC in degrees, the spectral value in m/s.
    ///
    /// RA/DEC are NaN where the pixel falls outside the projection's domain.
    pub fn pixel_to_world(&self, pixel: [f64; NAXES]) -> [f64; NAXES] {
        let AxisRoles { ra, dec, spec } = self.roles;
        // The library works in one-based FITS pixels.
        let position = ImgXY::new(pixel[ra] + 1.0, pixel[dec] + 1.0);
        let (alpha, delta) = match self.celestial.unproj(&position) {
            Some(lonlat) => (
                lonlat.lon().to_degrees().rem_euclid(360.0),
                lonlat.lat().to_degrees(),
            ),
            None => (f64::NAN, f64::NAN),
        };

        let mut world = [0.0; NAXES];
        world[ra] = alpha;
        world[dec] = delta;
        world[spec] = self.spectral.velocity(pixel[spec]);
        world
    }

    /// Transform a canonical `(x, y, z)` = (RA, DEC, VEL) pixel.
    ///
    /// The pixel is reordered into file axis order, transformed once, and
    /// the result read back by role.
    pub fn pixel_to_sky(&self, x: f64, y: f64, z: f64) -> WorldCoord {
        let mut raw = [0.0; NAXES];
        raw[self.roles.ra] = x;
        raw[self.roles.dec] = y;
        raw[self.roles.spec] = z;
        let world = self.pixel_to_world(raw);
        WorldCoord {
            ra_deg: world[self.roles.ra],
            dec_deg: world[self.roles.dec],
            vel_m_per_s: world[self.roles.spec],
        }
    }
}
