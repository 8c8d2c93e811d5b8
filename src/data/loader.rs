use std::fmt;
use std::path::Path;
use std::str::FromStr;

use fitrs::{Fits, FitsData, FitsDataArray, Hdu};
use ndarray::{ArrayD, IxDyn};

use super::error::{CubeError, Result};
use super::header::{validate_required, Header, HeaderValue};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Raw cube input: header metadata plus pixel data in storage order.
///
/// Storage order means the slowest-varying axis comes first, so a FITS cube
/// with `NAXIS1 = nx`, `NAXIS2 = ny`, `NAXIS3 = nz` has shape `[nz, ny, nx]`.
#[derive(Debug, Clone)]
pub struct CubeSource {
    pub header: Header,
    pub data: ArrayD<f64>,
}

impl CubeSource {
    pub fn new(header: Header, data: ArrayD<f64>) -> Self {
        Self { header, data }
    }
}

/// Which HDU of a FITS file holds the cube.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HduSelector {
    /// Zero-based HDU position; 0 is the primary HDU.
    Index(usize),
    /// HDU whose `EXTNAME` matches (case-insensitive).
    Name(String),
}

impl Default for HduSelector {
    fn default() -> Self {
        HduSelector::Index(0)
    }
}

impl FromStr for HduSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().parse::<usize>() {
            Ok(index) => HduSelector::Index(index),
            Err(_) => HduSelector::Name(s.trim().to_string()),
        })
    }
}

impl fmt::Display for HduSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HduSelector::Index(i) => write!(f, "HDU #{i}"),
            HduSelector::Name(name) => write!(f, "HDU '{name}'"),
        }
    }
}

/// Load a cube source from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.fits` / `.fit` / `.fts` – FITS image HDU with `NAXIS = 3`
pub fn load_file(path: &Path, hdu: &HduSelector) -> Result<CubeSource> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "fits" | "fit" | "fts" => load_fits(path, hdu),
        other => Err(CubeError::format(format!(
            "unsupported file extension: .{other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// FITS loader
// ---------------------------------------------------------------------------

/// Keywords copied from the FITS header regardless of axis count.
const GLOBAL_KEYWORDS: &[&str] = &[
    "SIMPLE", "XTENSION", "EXTNAME", "BITPIX", "NAXIS", "OBJECT", "LINENAME", "BUNIT", "BSCALE",
    "BZERO", "BLANK", "TELESCOP", "INSTRUME", "DATE-OBS", "EQUINOX", "EPOCH", "RADESYS",
    "SPECSYS", "RESTFRQ", "RESTFREQ", "LONPOLE", "LATPOLE", "BMAJ", "BMIN", "BPA",
];

/// Per-axis keyword stems, suffixed with the 1-based axis number.
const AXIS_KEYWORDS: &[&str] = &["NAXIS", "CTYPE", "CRPIX", "CRVAL", "CDELT", "CUNIT", "CROTA"];

fn load_fits(path: &Path, selector: &HduSelector) -> Result<CubeSource> {
    let fits = Fits::open(path).map_err(|source| CubeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let hdu = select_hdu(&fits, selector)
        .ok_or_else(|| CubeError::format(format!("{selector} not found in {}", path.display())))?;

    let header = read_header(&hdu);
    // Fail on metadata before touching the pixel data.
    validate_required(&header)?;

    let data = read_pixels(&hdu, &header)?;
    log::info!(
        "Loaded {} from {} with storage shape {:?}",
        selector,
        path.display(),
        data.shape()
    );
    Ok(CubeSource { header, data })
}

fn select_hdu(fits: &Fits, selector: &HduSelector) -> Option<Hdu> {
    match selector {
        HduSelector::Index(index) => fits.iter().nth(*index),
        HduSelector::Name(name) => fits.iter().find(|hdu| {
            matches!(
                hdu.value("EXTNAME"),
                Some(fitrs::HeaderValue::CharacterString(extname))
                    if extname.trim().eq_ignore_ascii_case(name)
            )
        }),
    }
}

fn convert_value(value: &fitrs::HeaderValue) -> HeaderValue {
    match value {
        fitrs::HeaderValue::CharacterString(s) => HeaderValue::String(s.trim_end().to_string()),
        fitrs::HeaderValue::Logical(b) => HeaderValue::Bool(*b),
        fitrs::HeaderValue::IntegerNumber(n) => HeaderValue::Integer(i64::from(*n)),
        fitrs::HeaderValue::RealFloatingNumber(v) => HeaderValue::Float(*v),
        _ => HeaderValue::Null,
    }
}

/// Copy the keywords the cube core understands into a [`Header`].
fn read_header(hdu: &Hdu) -> Header {
    fn copy(hdu: &Hdu, header: &mut Header, key: &str) {
        if let Some(value) = hdu.value(key) {
            header.insert(key, convert_value(value));
        }
    }

    let mut header = Header::new();
    for &key in GLOBAL_KEYWORDS {
        copy(hdu, &mut header, key);
    }

    let naxis = match hdu.value("NAXIS") {
        Some(fitrs::HeaderValue::IntegerNumber(n)) => (*n).max(0) as usize,
        _ => 0,
    };
    for axis in 1..=naxis {
        for stem in AXIS_KEYWORDS {
            copy(hdu, &mut header, &format!("{stem}{axis}"));
        }
        for other in 1..=naxis {
            copy(hdu, &mut header, &format!("PC{axis}_{other}"));
            copy(hdu, &mut header, &format!("CD{axis}_{other}"));
        }
    }
    header
}

/// Storage-order shape `[NAXISn, ..., NAXIS1]` declared by the header.
fn storage_shape(header: &Header) -> Result<Vec<usize>> {
    let naxis = header.get_i64("NAXIS").unwrap_or(0).max(0) as usize;
    let mut shape = Vec::with_capacity(naxis);
    let mut problems = Vec::new();
    for axis in (1..=naxis).rev() {
        let key = format!("NAXIS{axis}");
        match header.get_i64(&key) {
            Some(n) if n > 0 => shape.push(n as usize),
            Some(n) => problems.push(format!("{key} is {n}, expected a positive length")),
            None => problems.push(format!("missing required keyword {key}")),
        }
    }
    if problems.is_empty() {
        Ok(shape)
    } else {
        Err(CubeError::Format(problems))
    }
}

/// BITPIX values the FITS reader can decode. Anything else aborts inside it.
const SUPPORTED_BITPIX: &[i64] = &[8, 16, 32, -32, -64];

fn check_bitpix(header: &Header) -> Result<i64> {
    match header.get_i64("BITPIX") {
        Some(bitpix) if SUPPORTED_BITPIX.contains(&bitpix) => Ok(bitpix),
        Some(bitpix) => Err(CubeError::format(format!(
            "BITPIX {bitpix} is not supported (expected one of {SUPPORTED_BITPIX:?})"
        ))),
        None => Err(CubeError::format("missing required keyword BITPIX")),
    }
}

fn read_pixels(hdu: &Hdu, header: &Header) -> Result<ArrayD<f64>> {
    let shape = storage_shape(header)?;
    let bitpix = check_bitpix(header)?;

    // Integer data is stored scaled: physical = BZERO + BSCALE * raw.
    let scale = header.get_f64("BSCALE").unwrap_or(1.0);
    let zero = header.get_f64("BZERO").unwrap_or(0.0);
    let blank = header.get_i64("BLANK");
    let physical = |raw: f64| zero + scale * raw;

    let values: Vec<f64> = match hdu.read_data() {
        FitsData::FloatingPoint32(FitsDataArray { data, .. }) => {
            data.iter().map(|&v| f64::from(v)).collect()
        }
        FitsData::FloatingPoint64(FitsDataArray { data, .. }) => data.clone(),
        FitsData::IntegersI32(FitsDataArray { data, .. }) => data
            .iter()
            .map(|v| match *v {
                Some(n) if blank != Some(i64::from(n)) => physical(f64::from(n)),
                _ => f64::NAN,
            })
            .collect(),
        FitsData::Characters(FitsDataArray { data, .. }) => data
            .iter()
            .map(|&c| {
                let raw = u32::from(c);
                if blank == Some(i64::from(raw)) {
                    f64::NAN
                } else {
                    physical(f64::from(raw))
                }
            })
            .collect(),
        _ => {
            return Err(CubeError::format(format!(
                "BITPIX {bitpix} pixel data could not be decoded"
            )))
        }
    };

    let expected: usize = shape.iter().product();
    if values.len() != expected {
        return Err(CubeError::format(format!(
            "header declares {expected} pixels but the data unit holds {}",
            values.len()
        )));
    }

    ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| CubeError::format(format!("pixel data does not fit declared shape: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_parses_index_or_name() {
        assert_eq!("2".parse::<HduSelector>().unwrap(), HduSelector::Index(2));
        assert_eq!(
            " CUBE ".parse::<HduSelector>().unwrap(),
            HduSelector::Name("CUBE".to_string())
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("cube.hdf5"), &HduSelector::default()).unwrap_err();
        assert!(matches!(err, CubeError::Format(_)));
        assert!(err.to_string().contains(".hdf5"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_file(
            Path::new("/nonexistent/astrocube/cube.fits"),
            &HduSelector::default(),
        )
        .unwrap_err();
        assert!(matches!(err, CubeError::Io { .. }));
    }

    #[test]
    fn storage_shape_reverses_fits_axes() {
        let header = Header::new()
            .with("NAXIS", 3)
            .with("NAXIS1", 4)
            .with("NAXIS2", 5)
            .with("NAXIS3", 6);
        assert_eq!(storage_shape(&header).unwrap(), vec![6, 5, 4]);
    }

    #[test]
    fn bitpix_is_checked_before_decoding() {
        let header = Header::new().with("BITPIX", 16);
        assert_eq!(check_bitpix(&header).unwrap(), 16);

        let err = check_bitpix(&Header::new().with("BITPIX", 64)).unwrap_err();
        assert!(matches!(err, CubeError::Format(_)));
        assert!(err.to_string().contains("BITPIX 64"));

        let Err(CubeError::Format(problems)) = check_bitpix(&Header::new()) else {
            panic!("expected Format error");
        };
        assert_eq!(problems, vec!["missing required keyword BITPIX".to_string()]);
    }

    #[test]
    fn storage_shape_reports_missing_lengths() {
        let header = Header::new().with("NAXIS", 3).with("NAXIS1", 4);
        let Err(CubeError::Format(problems)) = storage_shape(&header) else {
            panic!("expected Format error");
        };
        assert_eq!(problems.len(), 2);
    }
}
