//! Spectral-line data cubes from FITS files.
//!
//! [`DataCube`] loads a three-axis cube, reorders it to `[ra, dec, vel]`,
//! maps pixels to sky coordinates and estimates the per-pixel noise with a
//! sigma-clipped median absolute deviation.
//!
//! ```no_run
//! use astrocube::{DataCube, HduSelector};
//!
//! let cube = DataCube::open("ngc2403.fits", &HduSelector::default(), true)?;
//! println!("{cube}");
//! let text = cube.pixel_coords_formatted(10, 20, 5, "hms", "dms", 2)?;
//! println!("{} {} {}", text.ra, text.dec, text.vel);
//! # Ok::<(), astrocube::CubeError>(())
//! ```

pub mod config;
pub mod data;

pub use data::coords::{AngleFormat, FormattedCoords, SkyCoord};
pub use data::cube::DataCube;
pub use data::error::{CubeError, Result};
pub use data::header::{Header, HeaderValue};
pub use data::loader::{CubeSource, HduSelector};
pub use data::noise::{NoiseEstimate, NoiseParams};
pub use data::wcs::{AxisRoles, Wcs};
