use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::CubeError;
use super::wcs::WorldCoord;

// ---------------------------------------------------------------------------
// AngleFormat
// ---------------------------------------------------------------------------

/// How an angle is rendered for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleFormat {
    /// Decimal degrees: `83.63°`
    Deg,
    /// Hours, minutes, seconds: `5h 34m 31.97s`
    Hms,
    /// Degrees, arcminutes, arcseconds: `22° 0' 52.20''`
    Dms,
}

impl AngleFormat {
    pub const ALL: [AngleFormat; 3] = [AngleFormat::Deg, AngleFormat::Hms, AngleFormat::Dms];

    pub fn name(self) -> &'static str {
        match self {
            AngleFormat::Deg => "deg",
            AngleFormat::Hms => "hms",
            AngleFormat::Dms => "dms",
        }
    }

    /// Render `degrees` in this format with `decimals` places on the last
    /// component.
    pub fn format(self, degrees: f64, decimals: usize) -> String {
        match self {
            AngleFormat::Deg => {
                let factor = 10f64.powi(decimals.min(15) as i32);
                let rounded = (degrees * factor).round() / factor;
                let degrees = if rounded >= 360.0 { rounded - 360.0 } else { rounded };
                format!("{degrees:.decimals$}°")
            }
            AngleFormat::Hms => {
                let s = deg_to_hms(degrees).rounded(decimals).wrapped(24);
                format!(
                    "{}{}h {}m {:.*}s",
                    s.sign(),
                    s.whole,
                    s.minutes,
                    decimals,
                    s.seconds
                )
            }
            AngleFormat::Dms => {
                let s = deg_to_dms(degrees).rounded(decimals).wrapped(360);
                format!(
                    "{}{}° {}' {:.*}''",
                    s.sign(),
                    s.whole,
                    s.minutes,
                    decimals,
                    s.seconds
                )
            }
        }
    }
}

impl fmt::Display for AngleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AngleFormat {
    type Err = CubeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deg" | "degree" | "degrees" => Ok(AngleFormat::Deg),
            "hms" => Ok(AngleFormat::Hms),
            "dms" => Ok(AngleFormat::Dms),
            other => Err(CubeError::Argument(format!(
                "unknown angle format '{other}' (expected deg, hms or dms)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Sexagesimal conversion
// ---------------------------------------------------------------------------

/// A signed `(whole, minutes, seconds)` triple.
///
/// Components are truncated toward zero on the absolute value; the sign is
/// carried once for the whole triple, so -0.5° is `-(0, 30, 0)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sexagesimal {
    pub negative: bool,
    pub whole: u32,
    pub minutes: u32,
    pub seconds: f64,
}

impl Sexagesimal {
    fn split(value: f64) -> Self {
        let negative = value < 0.0;
        let abs = value.abs();
        let whole = abs.trunc();
        let rem_minutes = (abs - whole) * 60.0;
        let minutes = rem_minutes.trunc();
        let seconds = (rem_minutes - minutes) * 60.0;
        Self {
            negative,
            whole: whole as u32,
            minutes: minutes as u32,
            seconds,
        }
    }

    /// Round seconds to `decimals` places, carrying into minutes and the
    /// whole component so `59.999` never prints as `60`.
    pub fn rounded(mut self, decimals: usize) -> Self {
        let factor = 10f64.powi(decimals.min(15) as i32);
        self.seconds = (self.seconds * factor).round() / factor;
        if self.seconds >= 60.0 {
            self.seconds -= 60.0;
            self.minutes += 1;
        }
        if self.minutes >= 60 {
            self.minutes -= 60;
            self.whole += 1;
        }
        self
    }

    pub fn sign(&self) -> &'static str {
        if self.negative {
            "-"
        } else {
            ""
        }
    }

    /// Fold a whole component that reached a full turn (24h or 360°) back
    /// to zero, as rounding 359.9999° up would otherwise print `360°`.
    pub fn wrapped(mut self, full_turn: u32) -> Self {
        self.whole %= full_turn;
        self
    }
}

/// Degrees → hours, minutes, seconds (`hours = degrees / 15`).
pub fn deg_to_hms(degrees: f64) -> Sexagesimal {
    Sexagesimal::split(degrees / 15.0)
}

/// Degrees → degrees, arcminutes, arcseconds.
pub fn deg_to_dms(degrees: f64) -> Sexagesimal {
    Sexagesimal::split(degrees)
}

/// Velocity in km/s with a fixed unit label.
pub fn format_velocity(km_s: f64, decimals: usize) -> String {
    format!("{km_s:.decimals$} km/s")
}

// ---------------------------------------------------------------------------
// SkyCoord
// ---------------------------------------------------------------------------

/// Sky position of a voxel in display units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkyCoord {
    pub ra_deg: f64,
    pub dec_deg: f64,
    pub vel_km_s: f64,
}

impl SkyCoord {
    pub fn from_world(world: WorldCoord) -> Self {
        Self {
            ra_deg: world.ra_deg,
            dec_deg: world.dec_deg,
            vel_km_s: world.vel_m_per_s / 1000.0,
        }
    }

    pub fn format(&self, ra: AngleFormat, dec: AngleFormat, decimals: usize) -> FormattedCoords {
        FormattedCoords {
            ra: ra.format(self.ra_deg, decimals),
            dec: dec.format(self.dec_deg, decimals),
            vel: format_velocity(self.vel_km_s, decimals),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedCoords {
    pub ra: String,
    pub dec: String,
    pub vel: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ra_in_hours_and_degrees() {
        assert_eq!(AngleFormat::Hms.format(83.633212, 0), "5h 34m 32s");
        assert_eq!(AngleFormat::Deg.format(83.633212, 2), "83.63°");
        assert_eq!(AngleFormat::Hms.format(83.633212, 2), "5h 34m 31.97s");
    }

    #[test]
    fn hours_are_degrees_over_fifteen() {
        let s = deg_to_hms(180.0);
        assert_eq!((s.whole, s.minutes), (12, 0));
        assert!(s.seconds.abs() < 1e-9);
    }

    #[test]
    fn negative_declination_keeps_sign_once() {
        assert_eq!(AngleFormat::Dms.format(-12.5, 2), "-12° 30' 0.00''");
        assert_eq!(AngleFormat::Dms.format(-0.5, 2), "-0° 30' 0.00''");
        assert_eq!(AngleFormat::Dms.format(12.5, 2), "12° 30' 0.00''");

        let s = deg_to_dms(-12.5);
        assert!(s.negative);
        assert_eq!((s.whole, s.minutes), (12, 30));
    }

    #[test]
    fn whole_components_truncate() {
        // 22.0145° = 22° 0' 52.2''
        let s = deg_to_dms(22.0145);
        assert_eq!((s.whole, s.minutes), (22, 0));
        assert!((s.seconds - 52.2).abs() < 1e-6);
        assert_eq!(AngleFormat::Dms.format(22.0145, 1), "22° 0' 52.2''");
    }

    #[test]
    fn rounding_carries_into_minutes_and_whole() {
        // 29° 59' 59.999''
        let degrees = 29.0 + 59.0 / 60.0 + 59.999 / 3600.0;
        assert_eq!(AngleFormat::Dms.format(degrees, 1), "30° 0' 0.0''");
        assert_eq!(AngleFormat::Dms.format(-degrees, 0), "-30° 0' 0''");
    }

    #[test]
    fn right_ascension_near_full_turn_wraps_to_zero() {
        let ra = 360.0 - 1e-7;
        assert_eq!(AngleFormat::Hms.format(ra, 0), "0h 0m 0s");
        assert_eq!(AngleFormat::Dms.format(ra, 2), "0° 0' 0.00''");
        assert_eq!(AngleFormat::Deg.format(ra, 2), "0.00°");
        assert_eq!(AngleFormat::Hms.format(359.0, 0), "23h 56m 0s");
    }

    #[test]
    fn format_names_parse_case_insensitively() {
        assert_eq!("HMS".parse::<AngleFormat>().unwrap(), AngleFormat::Hms);
        assert_eq!(" deg ".parse::<AngleFormat>().unwrap(), AngleFormat::Deg);
        assert!(matches!(
            "radians".parse::<AngleFormat>(),
            Err(CubeError::Argument(_))
        ));
    }

    #[test]
    fn sky_coord_converts_velocity_to_km_s() {
        let coord = SkyCoord::from_world(WorldCoord {
            ra_deg: 83.633212,
            dec_deg: -12.5,
            vel_m_per_s: -5000.0,
        });
        assert_eq!(coord.vel_km_s, -5.0);

        let text = coord.format(AngleFormat::Hms, AngleFormat::Dms, 2);
        assert_eq!(text.ra, "5h 34m 31.97s");
        assert_eq!(text.dec, "-12° 30' 0.00''");
        assert_eq!(text.vel, "-5.00 km/s");
    }
}
