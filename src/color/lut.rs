//! Color lookup tables with fmin/fmid/fmax limits.
//!
//! A [`ColorLookupTable`] is built once from a [`Colormap`] and a set of
//! limits, then evaluated on scalars already normalized into `[0, 1]`.
//!
//! **Sequential** tables (no center) place `fmin` at 0 and `fmax` at 1; the
//! normalized position of `fmid` receives the middle color of the ramp.
//!
//! **Divergent** tables (with a center) span `[-fmax, fmax]` around 0.5.
//! Deviations of `fmin`, `fmid` and `fmax` map to the ramp's center color, its
//! quarter points and its ends, symmetrically on both sides. Everything
//! closer to the center than `fmin` gets the center color.
//!
//! With `transparent`, opacity ramps linearly from 0 at `fmin` to full at
//! `fmid` (mirrored for divergent tables).

use rayon::prelude::*;

use crate::error::{check_limits, Result, SurfaceError};

use super::colormap::{Colormap, Rgba};

/// Number of entries in a lookup table.
pub const LUT_SIZE: usize = 256;

/// Parameters of a lookup table.
#[derive(Debug, Clone, PartialEq)]
pub struct LutParams {
    /// Colormap identity.
    pub colormap: Colormap,
    /// Overall opacity in `[0, 1]`.
    pub alpha: f64,
    /// Low end of the colormap.
    pub fmin: f64,
    /// Middle of the colormap.
    pub fmid: f64,
    /// High end of the colormap.
    pub fmax: f64,
    /// Center of a divergent colormap.
    pub center: Option<f64>,
    /// Fade opacity in between `fmin` and `fmid`.
    pub transparent: bool,
}

impl LutParams {
    /// Parameters with the given limits, automatic colormap and full opacity.
    pub fn new(fmin: f64, fmid: f64, fmax: f64) -> Self {
        Self {
            colormap: Colormap::Auto,
            alpha: 1.0,
            fmin,
            fmid,
            fmax,
            center: None,
            transparent: false,
        }
    }

    /// Set the colormap.
    pub fn with_colormap(mut self, colormap: Colormap) -> Self {
        self.colormap = colormap;
        self
    }

    /// Set the overall opacity.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Use a divergent layout around `center`.
    pub fn with_center(mut self, center: f64) -> Self {
        self.center = Some(center);
        self
    }

    /// Fade opacity between `fmin` and `fmid`.
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }
}

/// A continuous map from normalized scalars in `[0, 1]` to RGBA.
///
/// Tables are immutable; changing any parameter means building a new one.
///
/// # Example
///
/// ```
/// use sulcus::color::{ColorLookupTable, Colormap, LutParams, NamedRamp};
///
/// let params = LutParams::new(0.0, 50.0, 100.0).with_colormap(Colormap::named(NamedRamp::Hot));
/// let lut = ColorLookupTable::new(params).unwrap();
///
/// // Values beyond fmax saturate to the top of the ramp.
/// let x = lut.normalize(150.0);
/// assert_eq!(x, 1.0);
/// assert_eq!(lut.evaluate(x), [1.0, 1.0, 1.0, 1.0]);
/// ```
#[derive(Debug, Clone)]
pub struct ColorLookupTable {
    table: Vec<Rgba>,
    params: LutParams,
    scale: f64,
    offset: f64,
}

impl ColorLookupTable {
    /// Build a table.
    ///
    /// # Errors
    ///
    /// - [`SurfaceError::RangeOrder`] unless `fmin < fmid < fmax`.
    /// - [`SurfaceError::InvalidParameter`] if `alpha` is outside `[0, 1]`,
    ///   or if `fmin` is negative for a divergent table (limits are
    ///   deviations from the center there).
    pub fn new(params: LutParams) -> Result<Self> {
        check_limits(params.fmin, params.fmid, params.fmax)?;
        if !(0.0..=1.0).contains(&params.alpha) {
            return Err(SurfaceError::invalid_param(
                "alpha",
                params.alpha,
                "must be in [0, 1]",
            ));
        }
        if params.center.is_some() && params.fmin < 0.0 {
            return Err(SurfaceError::invalid_param(
                "fmin",
                params.fmin,
                "must be >= 0 when a center is given",
            ));
        }

        let colormap = params.colormap.resolve(params.center.is_some());
        let (scale, offset) = affine_scale(params.fmin, params.fmax, params.center);

        let table = (0..LUT_SIZE)
            .map(|i| {
                let x = i as f64 / (LUT_SIZE - 1) as f64;
                let (t, fade) = if params.center.is_some() {
                    divergent_position(x, &params)
                } else {
                    sequential_position(x, &params)
                };
                let mut rgba = colormap.sample(t);
                let fade = if params.transparent { fade } else { 1.0 };
                rgba[3] *= params.alpha * fade;
                rgba
            })
            .collect();

        Ok(Self {
            table,
            params: LutParams { colormap, ..params },
            scale,
            offset,
        })
    }

    /// Build a new table with some limits replaced.
    ///
    /// Everything else (colormap, alpha, center, transparency) is kept.
    pub fn with_limits(
        &self,
        fmin: Option<f64>,
        fmid: Option<f64>,
        fmax: Option<f64>,
    ) -> Result<Self> {
        let params = LutParams {
            fmin: fmin.unwrap_or(self.params.fmin),
            fmid: fmid.unwrap_or(self.params.fmid),
            fmax: fmax.unwrap_or(self.params.fmax),
            ..self.params.clone()
        };
        Self::new(params)
    }

    /// The parameters the table was built from, with `Auto` resolved.
    #[inline]
    pub fn params(&self) -> &LutParams {
        &self.params
    }

    /// The raw table entries, from normalized 0 to 1.
    #[inline]
    pub fn entries(&self) -> &[Rgba] {
        &self.table
    }

    /// `(k, b)` of the affine rescale `k * value + b` used by [`normalize`](Self::normalize).
    #[inline]
    pub fn scale(&self) -> (f64, f64) {
        (self.scale, self.offset)
    }

    /// Rescale a raw value into `[0, 1]`, clipping out-of-range values.
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        (self.scale * value + self.offset).clamp(0.0, 1.0)
    }

    /// Color of a normalized value.
    ///
    /// Inputs are clamped to `[0, 1]` (`NaN` counts as 0) and interpolated
    /// linearly between neighboring table entries.
    pub fn evaluate(&self, x: f64) -> Rgba {
        let x = if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) };
        let last = LUT_SIZE - 1;
        let pos = x * last as f64;
        let i = pos.floor() as usize;
        if i >= last {
            return self.table[last];
        }
        let f = pos - i as f64;
        let (a, b) = (self.table[i], self.table[i + 1]);
        [
            a[0] + f * (b[0] - a[0]),
            a[1] + f * (b[1] - a[1]),
            a[2] + f * (b[2] - a[2]),
            a[3] + f * (b[3] - a[3]),
        ]
    }

    /// Evaluate a slice of normalized values.
    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<Rgba> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Evaluate a slice of normalized values on the rayon pool.
    pub fn par_evaluate_many(&self, xs: &[f64]) -> Vec<Rgba> {
        xs.par_iter().map(|&x| self.evaluate(x)).collect()
    }

    /// Evenly spaced `(raw value, color)` ticks over the display range, for
    /// drawing a colorbar.
    pub fn colorbar(&self, n: usize) -> Vec<(f64, Rgba)> {
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![(self.denormalize(0.0), self.evaluate(0.0))];
        }
        (0..n)
            .map(|i| {
                let x = i as f64 / (n - 1) as f64;
                (self.denormalize(x), self.evaluate(x))
            })
            .collect()
    }

    fn denormalize(&self, x: f64) -> f64 {
        (x - self.offset) / self.scale
    }
}

/// Convert a `[0, 1]` color to 8-bit channels.
pub fn to_rgba8(color: Rgba) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// `(k, b)` such that `k * fmax + b = 1` and `k * dt_min + b = 0`, where
/// `dt_min` is `fmin`, or `-fmax` when a center is given.
fn affine_scale(fmin: f64, fmax: f64, center: Option<f64>) -> (f64, f64) {
    let dt_min = if center.is_some() { -fmax } else { fmin };
    let k = 1.0 / (fmax - dt_min);
    let b = 1.0 - k * fmax;
    (k, b)
}

/// Ramp position and opacity fade of a sequential table entry.
fn sequential_position(x: f64, p: &LutParams) -> (f64, f64) {
    let m = (p.fmid - p.fmin) / (p.fmax - p.fmin);
    if x <= m {
        (0.5 * x / m, x / m)
    } else {
        (0.5 + 0.5 * (x - m) / (1.0 - m), 1.0)
    }
}

/// Ramp position and opacity fade of a divergent table entry.
fn divergent_position(x: f64, p: &LutParams) -> (f64, f64) {
    // Deviation from the center as a fraction of fmax.
    let d = ((x - 0.5).abs() * 2.0).min(1.0);
    let lo = p.fmin / p.fmax;
    let mid = p.fmid / p.fmax;
    let (u, fade) = if d <= lo {
        (0.0, 0.0)
    } else if d <= mid {
        let f = (d - lo) / (mid - lo);
        (0.5 * f, f)
    } else {
        (0.5 + 0.5 * (d - mid) / (1.0 - mid), 1.0)
    };
    let t = if x < 0.5 { 0.5 - 0.5 * u } else { 0.5 + 0.5 * u };
    (t, fade)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::NamedRamp;

    fn close(a: Rgba, b: Rgba) -> bool {
        a.iter().zip(&b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    fn gray(fmin: f64, fmid: f64, fmax: f64) -> LutParams {
        LutParams::new(fmin, fmid, fmax).with_colormap(Colormap::named(NamedRamp::Gray))
    }

    #[test]
    fn test_range_order_error() {
        let err = ColorLookupTable::new(LutParams::new(2.0, 1.0, 3.0)).unwrap_err();
        assert!(err.is_range_order());
        assert!(err.to_string().contains("2 >= 1"));
        assert!(ColorLookupTable::new(LutParams::new(0.0, 1.0, 1.0)).is_err());
    }

    #[test]
    fn test_extremes() {
        let lut = ColorLookupTable::new(gray(0.0, 0.5, 1.0)).unwrap();
        assert_eq!(lut.evaluate(0.0), [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(lut.evaluate(1.0), [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(lut.evaluate(7.0), lut.evaluate(1.0));
        assert_eq!(lut.evaluate(-3.0), lut.evaluate(0.0));
    }

    #[test]
    fn test_evaluate_is_idempotent() {
        let lut = ColorLookupTable::new(LutParams::new(-1.0, 0.2, 4.0)).unwrap();
        for i in 0..=20 {
            let x = i as f64 / 20.0;
            assert_eq!(lut.evaluate(x), lut.evaluate(x));
        }
    }

    #[test]
    fn test_fmid_maps_to_ramp_middle() {
        // fmid sits at 1/4 of the range but takes the middle gray.
        let lut = ColorLookupTable::new(gray(0.0, 25.0, 100.0)).unwrap();
        let x = lut.normalize(25.0);
        assert!((x - 0.25).abs() < 1e-12);
        // 0.25 falls between table entries; the table is linear on each side of fmid.
        let c = lut.evaluate(x);
        assert!((c[0] - 0.5).abs() < 0.01, "{:?}", c);
    }

    #[test]
    fn test_normalize_sequential() {
        let lut = ColorLookupTable::new(LutParams::new(0.0, 50.0, 100.0)).unwrap();
        assert_eq!(lut.normalize(150.0), 1.0);
        assert_eq!(lut.normalize(-10.0), 0.0);
        assert!((lut.normalize(25.0) - 0.25).abs() < 1e-12);
        let (k, b) = lut.scale();
        assert!((k - 0.01).abs() < 1e-15);
        assert!(b.abs() < 1e-12);
    }

    #[test]
    fn test_normalize_divergent() {
        let lut = ColorLookupTable::new(LutParams::new(0.0, 3.0, 6.0).with_center(0.0)).unwrap();
        let (k, b) = lut.scale();
        assert!((k - 1.0 / 12.0).abs() < 1e-15);
        assert!((b - 0.5).abs() < 1e-15);
        assert!((lut.normalize(-4.0) - 1.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_divergent_symmetry() {
        let lut = ColorLookupTable::new(
            LutParams::new(1.0, 3.0, 6.0)
                .with_center(0.0)
                .with_colormap(Colormap::named(NamedRamp::Gray)),
        )
        .unwrap();
        // Center band uses the ramp's middle color.
        let mid = lut.evaluate(0.5);
        assert!(close(mid, [0.5, 0.5, 0.5, 1.0]));
        // Ends reach the ramp's ends.
        assert!(close(lut.evaluate(0.0), [0.0, 0.0, 0.0, 1.0]));
        assert!(close(lut.evaluate(1.0), [1.0, 1.0, 1.0, 1.0]));
        // Mirror entries sum to white for a gray ramp.
        let entries = lut.entries();
        for i in 0..LUT_SIZE {
            let s = entries[i][0] + entries[LUT_SIZE - 1 - i][0];
            assert!((s - 1.0).abs() < 1e-9, "entry {i}: {s}");
        }
    }

    #[test]
    fn test_divergent_rejects_negative_fmin() {
        let err = ColorLookupTable::new(LutParams::new(-1.0, 0.5, 1.0).with_center(0.0)).unwrap_err();
        assert!(matches!(err, SurfaceError::InvalidParameter { name: "fmin", .. }));
    }

    #[test]
    fn test_alpha_scales_opacity() {
        let lut = ColorLookupTable::new(gray(0.0, 0.5, 1.0).with_alpha(0.25)).unwrap();
        assert!(lut.entries().iter().all(|c| (c[3] - 0.25).abs() < 1e-12));
        assert!(ColorLookupTable::new(gray(0.0, 0.5, 1.0).with_alpha(1.5)).is_err());
    }

    #[test]
    fn test_transparent_fade() {
        let lut = ColorLookupTable::new(gray(0.0, 0.5, 1.0).with_transparent(true)).unwrap();
        assert_eq!(lut.evaluate(0.0)[3], 0.0);
        assert!((lut.evaluate(0.25)[3] - 0.5).abs() < 0.01);
        assert_eq!(lut.evaluate(0.75)[3], 1.0);

        let lut = ColorLookupTable::new(
            gray(1.0, 3.0, 6.0).with_center(0.0).with_transparent(true),
        )
        .unwrap();
        assert_eq!(lut.evaluate(0.5)[3], 0.0);
        assert_eq!(lut.evaluate(0.0)[3], 1.0);
        assert_eq!(lut.evaluate(1.0)[3], 1.0);
    }

    #[test]
    fn test_auto_resolves() {
        let lut = ColorLookupTable::new(LutParams::new(0.0, 1.0, 2.0).with_center(0.0)).unwrap();
        assert_eq!(lut.params().colormap, Colormap::named(NamedRamp::Icefire));
        let lut = ColorLookupTable::new(LutParams::new(0.0, 1.0, 2.0)).unwrap();
        assert_eq!(lut.params().colormap, Colormap::named(NamedRamp::Rocket));
    }

    #[test]
    fn test_with_limits_rebuilds() {
        let lut = ColorLookupTable::new(gray(0.0, 0.5, 1.0)).unwrap();
        let wider = lut.with_limits(None, Some(2.0), Some(4.0)).unwrap();
        assert_eq!(wider.params().fmax, 4.0);
        assert_eq!(wider.params().fmin, 0.0);
        assert_eq!(lut.params().fmax, 1.0);
        assert!(lut.with_limits(Some(3.0), None, None).is_err());
    }

    #[test]
    fn test_colorbar() {
        let lut = ColorLookupTable::new(gray(10.0, 15.0, 20.0)).unwrap();
        let ticks = lut.colorbar(3);
        assert_eq!(ticks.len(), 3);
        assert!((ticks[0].0 - 10.0).abs() < 1e-9);
        assert!((ticks[1].0 - 15.0).abs() < 1e-9);
        assert!((ticks[2].0 - 20.0).abs() < 1e-9);
        assert!(lut.colorbar(0).is_empty());
    }

    #[test]
    fn test_to_rgba8() {
        assert_eq!(to_rgba8([1.0, 0.0, 0.5, 1.0]), [255, 0, 128, 255]);
        assert_eq!(to_rgba8([2.0, -1.0, 0.0, 0.0]), [255, 0, 0, 0]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let lut = ColorLookupTable::new(LutParams::new(0.0, 1.0, 3.0)).unwrap();
        let xs: Vec<f64> = (0..500).map(|i| i as f64 / 499.0).collect();
        assert_eq!(lut.evaluate_many(&xs), lut.par_evaluate_many(&xs));
    }
}
