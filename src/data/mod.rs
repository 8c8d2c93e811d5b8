/// Data layer: cube loading, coordinates and noise.
///
/// Architecture:
/// ```text
///      .fits
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  FITS HDU → CubeSource (header + storage-order array)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐      ┌──────────┐
///   │  header   │ ──▶ │   wcs     │  required fields, axis roles, pixel → sky
///   └──────────┘      └──────────┘
///        │                  │
///        ▼                  ▼
///   ┌──────────┐      ┌──────────┐
///   │  axes     │      │  coords   │  canonical [ra, dec, vel] / text formats
///   └──────────┘      └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  noise    │  sigma-clipped MAD per spatial pixel
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  cube     │  DataCube: owns data, metadata, WCS and noise
///   └──────────┘
/// ```

pub mod axes;
pub mod coords;
pub mod cube;
pub mod error;
pub mod header;
pub mod loader;
pub mod noise;
pub mod wcs;
