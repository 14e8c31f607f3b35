//! Colormap definitions.
//!
//! A [`Colormap`] is one of three explicit kinds (a named ramp, a list of
//! colors spread evenly over `[0, 1]`, or a raw `N x 4` table in `0..=255`)
//! plus [`Colormap::Auto`], which picks a named ramp depending on whether the
//! data is displayed around a center value.
//!
//! The named ramps are piecewise-linear approximations of the matplotlib and
//! seaborn maps of the same name.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SurfaceError};

/// An RGBA color with components in `[0, 1]`.
pub type Rgba = [f64; 4];

/// Built-in color ramps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedRamp {
    /// Black through red and yellow to white.
    Hot,
    /// Black to white.
    Gray,
    /// Perceptually uniform purple-green-yellow.
    Viridis,
    /// Sequential dark-purple to cream (default for non-centered data).
    Rocket,
    /// Divergent light-blue, black, orange (default for centered data).
    Icefire,
    /// Divergent blue-white-red.
    Coolwarm,
}

/// Stops for channels that are not piecewise linear in a simpler form.
/// Each entry is `(position, [r, g, b])` with 8-bit channels.
const VIRIDIS: &[(f64, [u8; 3])] = &[
    (0.0, [68, 1, 84]),
    (0.1, [72, 36, 117]),
    (0.2, [65, 68, 135]),
    (0.3, [53, 95, 141]),
    (0.4, [42, 120, 142]),
    (0.5, [33, 145, 140]),
    (0.6, [34, 168, 132]),
    (0.7, [68, 191, 112]),
    (0.8, [122, 209, 81]),
    (0.9, [189, 223, 38]),
    (1.0, [253, 231, 37]),
];

const ROCKET: &[(f64, [u8; 3])] = &[
    (0.0, [3, 5, 26]),
    (0.1, [40, 18, 54]),
    (0.2, [76, 29, 75]),
    (0.3, [113, 31, 87]),
    (0.4, [152, 28, 91]),
    (0.5, [189, 24, 86]),
    (0.6, [222, 46, 68]),
    (0.7, [240, 89, 62]),
    (0.8, [244, 136, 96]),
    (0.9, [246, 180, 143]),
    (1.0, [250, 235, 221]),
];

const ICEFIRE: &[(f64, [u8; 3])] = &[
    (0.0, [189, 231, 219]),
    (0.125, [108, 174, 215]),
    (0.25, [63, 113, 210]),
    (0.375, [61, 62, 132]),
    (0.5, [32, 30, 33]),
    (0.625, [118, 36, 64]),
    (0.75, [190, 48, 48]),
    (0.875, [238, 113, 50]),
    (1.0, [255, 237, 160]),
];

const COOLWARM: &[(f64, [u8; 3])] = &[
    (0.0, [59, 76, 192]),
    (0.25, [141, 176, 254]),
    (0.5, [221, 221, 221]),
    (0.75, [244, 152, 122]),
    (1.0, [180, 4, 38]),
];

// matplotlib's "hot" is piecewise linear with breakpoints at 0.365 and 0.746.
const HOT: &[(f64, [f64; 3])] = &[
    (0.0, [0.0416, 0.0, 0.0]),
    (0.365079, [1.0, 0.0, 0.0]),
    (0.746032, [1.0, 1.0, 0.0]),
    (1.0, [1.0, 1.0, 1.0]),
];

impl NamedRamp {
    /// All built-in ramps.
    pub fn all() -> &'static [NamedRamp] {
        &[
            NamedRamp::Hot,
            NamedRamp::Gray,
            NamedRamp::Viridis,
            NamedRamp::Rocket,
            NamedRamp::Icefire,
            NamedRamp::Coolwarm,
        ]
    }

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            NamedRamp::Hot => "hot",
            NamedRamp::Gray => "gray",
            NamedRamp::Viridis => "viridis",
            NamedRamp::Rocket => "rocket",
            NamedRamp::Icefire => "icefire",
            NamedRamp::Coolwarm => "coolwarm",
        }
    }

    /// Whether the ramp is designed around a neutral midpoint.
    pub fn is_divergent(&self) -> bool {
        matches!(self, NamedRamp::Icefire | NamedRamp::Coolwarm)
    }

    /// Opaque color at `t` in `[0, 1]`.
    pub fn sample(&self, t: f64) -> Rgba {
        let t = clamp_unit(t);
        let [r, g, b] = match self {
            NamedRamp::Gray => [t, t, t],
            NamedRamp::Hot => interpolate_stops(HOT, t),
            NamedRamp::Viridis => interpolate_u8_stops(VIRIDIS, t),
            NamedRamp::Rocket => interpolate_u8_stops(ROCKET, t),
            NamedRamp::Icefire => interpolate_u8_stops(ICEFIRE, t),
            NamedRamp::Coolwarm => interpolate_u8_stops(COOLWARM, t),
        };
        [r, g, b, 1.0]
    }
}

impl fmt::Display for NamedRamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NamedRamp {
    type Err = SurfaceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hot" | "afmhot" => Ok(NamedRamp::Hot),
            "gray" | "grey" | "grays" | "greys" => Ok(NamedRamp::Gray),
            "viridis" => Ok(NamedRamp::Viridis),
            "rocket" => Ok(NamedRamp::Rocket),
            "icefire" => Ok(NamedRamp::Icefire),
            "coolwarm" => Ok(NamedRamp::Coolwarm),
            _ => Err(SurfaceError::UnknownColormap {
                name: s.to_string(),
            }),
        }
    }
}

/// Colormap identity used to build a lookup table.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Colormap {
    /// `icefire` for centered data, `rocket` otherwise.
    #[default]
    Auto,
    /// A built-in ramp, optionally reversed.
    Named {
        /// The ramp.
        ramp: NamedRamp,
        /// Sample the ramp from 1 to 0.
        reversed: bool,
    },
    /// Two or more colors spread evenly over `[0, 1]`.
    Colors(Vec<Rgba>),
    /// Raw `N x 4` RGBA table with values in `0..=255`, rows spread evenly
    /// over `[0, 1]`.
    Table(Vec<[f64; 4]>),
}

impl Colormap {
    /// A named ramp in its natural direction.
    pub fn named(ramp: NamedRamp) -> Self {
        Colormap::Named {
            ramp,
            reversed: false,
        }
    }

    /// A ramp through the given colors.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::InvalidParameter`] with fewer than two colors or a
    /// component outside `[0, 1]`.
    pub fn from_colors(colors: Vec<Rgba>) -> Result<Self> {
        if colors.len() < 2 {
            return Err(SurfaceError::invalid_param(
                "colormap",
                format!("{} colors", colors.len()),
                "a color list needs at least 2 colors",
            ));
        }
        for c in &colors {
            if c.iter().any(|v| !(0.0..=1.0).contains(v)) {
                return Err(SurfaceError::invalid_param(
                    "colormap",
                    format!("{:?}", c),
                    "color components must be in [0, 1]",
                ));
            }
        }
        Ok(Colormap::Colors(colors))
    }

    /// Parse a list of color strings (see [`parse_color`]).
    pub fn from_color_specs<S: AsRef<str>>(specs: &[S]) -> Result<Self> {
        let colors = specs
            .iter()
            .map(|s| parse_color(s.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_colors(colors)
    }

    /// A raw lookup table with RGBA values in `0..=255`.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::InvalidParameter`] with fewer than two rows or a
    /// value outside `0..=255`.
    pub fn from_table(rows: Vec<[f64; 4]>) -> Result<Self> {
        if rows.len() < 2 {
            return Err(SurfaceError::invalid_param(
                "colormap",
                format!("{} rows", rows.len()),
                "a lookup table needs at least 2 rows",
            ));
        }
        for row in &rows {
            if row.iter().any(|v| !(0.0..=255.0).contains(v)) {
                return Err(SurfaceError::invalid_param(
                    "colormap",
                    format!("{:?}", row),
                    "table values must be in [0, 255]",
                ));
            }
        }
        Ok(Colormap::Table(rows))
    }

    /// Replace [`Colormap::Auto`] by the ramp it stands for.
    pub fn resolve(&self, centered: bool) -> Colormap {
        match self {
            Colormap::Auto if centered => Colormap::named(NamedRamp::Icefire),
            Colormap::Auto => Colormap::named(NamedRamp::Rocket),
            other => other.clone(),
        }
    }

    /// Color at `t` in `[0, 1]`. `Auto` samples its non-centered ramp.
    pub fn sample(&self, t: f64) -> Rgba {
        let t = clamp_unit(t);
        match self {
            Colormap::Auto => NamedRamp::Rocket.sample(t),
            Colormap::Named { ramp, reversed } => {
                ramp.sample(if *reversed { 1.0 - t } else { t })
            }
            Colormap::Colors(colors) => interpolate_even(colors, t, 1.0),
            Colormap::Table(rows) => interpolate_even(rows, t, 255.0),
        }
    }
}

impl FromStr for Colormap {
    type Err = SurfaceError;

    /// Parses `auto` or a ramp name, with an optional `_r` suffix to reverse it.
    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Colormap::Auto);
        }
        let lower = s.to_ascii_lowercase();
        let (name, reversed) = match lower.strip_suffix("_r") {
            Some(base) => (base, true),
            None => (lower.as_str(), false),
        };
        let ramp = name.parse::<NamedRamp>().map_err(|_| SurfaceError::UnknownColormap {
            name: s.to_string(),
        })?;
        Ok(Colormap::Named { ramp, reversed })
    }
}

/// Parse a color from `#rgb`, `#rrggbb`, `#rrggbbaa` or a basic color name.
///
/// ```
/// use sulcus::color::parse_color;
///
/// assert_eq!(parse_color("#ff0000").unwrap(), [1.0, 0.0, 0.0, 1.0]);
/// assert_eq!(parse_color("white").unwrap(), [1.0, 1.0, 1.0, 1.0]);
/// assert!(parse_color("#12").is_err());
/// ```
pub fn parse_color(spec: &str) -> Result<Rgba> {
    let invalid = || SurfaceError::InvalidColor {
        spec: spec.to_string(),
    };
    let s = spec.trim();

    if let Some(hex) = s.strip_prefix('#') {
        if !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |digits: &str| -> Result<f64> {
            let v = u8::from_str_radix(digits, 16).map_err(|_| invalid())?;
            Ok(v as f64 / 255.0)
        };
        return match hex.len() {
            3 => {
                let mut rgba = [1.0; 4];
                for (i, c) in hex.chars().enumerate() {
                    let doubled: String = [c, c].iter().collect();
                    rgba[i] = channel(&doubled)?;
                }
                Ok(rgba)
            }
            6 | 8 => {
                let mut rgba = [1.0; 4];
                for i in 0..hex.len() / 2 {
                    rgba[i] = channel(&hex[2 * i..2 * i + 2])?;
                }
                Ok(rgba)
            }
            _ => Err(invalid()),
        };
    }

    let rgb = match s.to_ascii_lowercase().as_str() {
        "black" | "k" => [0.0, 0.0, 0.0],
        "white" | "w" => [1.0, 1.0, 1.0],
        "red" | "r" => [1.0, 0.0, 0.0],
        "green" | "g" => [0.0, 0.5, 0.0],
        "blue" | "b" => [0.0, 0.0, 1.0],
        "yellow" | "y" => [1.0, 1.0, 0.0],
        "cyan" | "c" => [0.0, 1.0, 1.0],
        "magenta" | "m" => [1.0, 0.0, 1.0],
        "gray" | "grey" => [0.5, 0.5, 0.5],
        "orange" => [1.0, 0.647, 0.0],
        _ => return Err(invalid()),
    };
    Ok([rgb[0], rgb[1], rgb[2], 1.0])
}

#[inline]
fn clamp_unit(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

fn interpolate_stops(stops: &[(f64, [f64; 3])], t: f64) -> [f64; 3] {
    let upper = stops.iter().position(|&(p, _)| p >= t).unwrap_or(stops.len() - 1);
    if upper == 0 {
        return stops[0].1;
    }
    let (p0, c0) = stops[upper - 1];
    let (p1, c1) = stops[upper];
    let f = (t - p0) / (p1 - p0);
    [
        c0[0] + f * (c1[0] - c0[0]),
        c0[1] + f * (c1[1] - c0[1]),
        c0[2] + f * (c1[2] - c0[2]),
    ]
}

fn interpolate_u8_stops(stops: &[(f64, [u8; 3])], t: f64) -> [f64; 3] {
    let upper = stops.iter().position(|&(p, _)| p >= t).unwrap_or(stops.len() - 1);
    let to_unit = |c: [u8; 3]| [c[0] as f64 / 255.0, c[1] as f64 / 255.0, c[2] as f64 / 255.0];
    if upper == 0 {
        return to_unit(stops[0].1);
    }
    let (p0, c0) = stops[upper - 1];
    let (p1, c1) = stops[upper];
    let (c0, c1) = (to_unit(c0), to_unit(c1));
    let f = (t - p0) / (p1 - p0);
    [
        c0[0] + f * (c1[0] - c0[0]),
        c0[1] + f * (c1[1] - c0[1]),
        c0[2] + f * (c1[2] - c0[2]),
    ]
}

/// Linear interpolation through evenly spaced entries, each divided by `scale`.
fn interpolate_even(entries: &[[f64; 4]], t: f64, scale: f64) -> Rgba {
    let last = entries.len() - 1;
    let pos = t * last as f64;
    let i = (pos.floor() as usize).min(last);
    if i == last {
        return entries[last].map(|v| v / scale);
    }
    let f = pos - i as f64;
    let (a, b) = (entries[i], entries[i + 1]);
    [
        (a[0] + f * (b[0] - a[0])) / scale,
        (a[1] + f * (b[1] - a[1])) / scale,
        (a[2] + f * (b[2] - a[2])) / scale,
        (a[3] + f * (b[3] - a[3])) / scale,
    ]
}
