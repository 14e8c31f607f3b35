//! Mapping scalar fields to per-vertex colors.
//!
//! [`map_scalars`] turns a (possibly partial) scalar field into one RGBA color
//! per vertex:
//!
//! 1. Resolve the colormap limits, defaulting missing ones from the data.
//! 2. Validate `fmin < fmid < fmax`.
//! 3. If the field covers only some vertices, smooth it onto the whole mesh.
//! 4. Rescale with `k * value + b`, clip to `[0, 1]` and evaluate the lookup table.
//!
//! [`map_time_course`] does the same for a `vertices x time` matrix after
//! selecting one time sample.
//!
//! # Example
//!
//! ```
//! use sulcus::mesh::AdjacencyGraph;
//! use sulcus::overlay::{map_scalars, OverlayOptions};
//!
//! let faces = [[0, 2, 1], [0, 1, 3], [1, 2, 3], [2, 0, 3]];
//! let adj = AdjacencyGraph::from_faces(&faces, 4).unwrap();
//!
//! // Data on two of four vertices, one smoothing step.
//! let options = OverlayOptions::default().with_smoothing_steps(1);
//! let overlay = map_scalars(&adj, &[0.0, 10.0], Some(&[0, 1]), &options).unwrap();
//!
//! assert_eq!(overlay.values(), &[0.0, 10.0, 5.0, 5.0]);
//! assert_eq!(overlay.limits(), (0.0, 5.0, 10.0));
//! assert_eq!(overlay.colors().len(), 4);
//! ```

use std::sync::Arc;

use nalgebra::DMatrix;

use crate::algo::SmoothingOperator;
use crate::color::{to_rgba8, ColorLookupTable, Colormap, LutParams, NamedRamp, Rgba};
use crate::error::{check_limits, Result, SurfaceError};
use crate::mesh::AdjacencyGraph;
use crate::surface::Surface;

/// Something scalar data can be smoothed over.
///
/// [`Surface`] reuses operators from its cache; a bare [`AdjacencyGraph`]
/// builds a fresh one on every call.
pub trait SmoothingTarget {
    /// Number of mesh vertices.
    fn num_vertices(&self) -> usize;

    /// Operator smoothing data on `known_vertices` over the mesh.
    fn smoothing_operator(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
    ) -> Result<Arc<SmoothingOperator>>;
}

impl SmoothingTarget for Surface {
    fn num_vertices(&self) -> usize {
        Surface::num_vertices(self)
    }

    fn smoothing_operator(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
    ) -> Result<Arc<SmoothingOperator>> {
        Surface::smoothing_operator(self, known_vertices, steps)
    }
}

impl SmoothingTarget for AdjacencyGraph {
    fn num_vertices(&self) -> usize {
        AdjacencyGraph::num_vertices(self)
    }

    fn smoothing_operator(
        &self,
        known_vertices: &[usize],
        steps: Option<usize>,
    ) -> Result<Arc<SmoothingOperator>> {
        SmoothingOperator::build(known_vertices, self, steps).map(Arc::new)
    }
}

/// Options for [`map_scalars`] and [`map_time_course`].
///
/// Every limit left as `None` is derived from the data.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayOptions {
    /// Colormap; `Auto` picks a divergent ramp when `center` is set.
    pub colormap: Colormap,

    /// Overall opacity in `[0, 1]`.
    pub alpha: f64,

    /// Low colormap limit. Defaults to the data minimum, or 0 with a center.
    pub fmin: Option<f64>,

    /// Middle colormap limit. Defaults to `(fmin + fmax) / 2`.
    pub fmid: Option<f64>,

    /// High colormap limit. Defaults to the data maximum, or the largest
    /// deviation from the center.
    pub fmax: Option<f64>,

    /// Display the data as deviations around this value.
    pub center: Option<f64>,

    /// Smoothing steps for partial fields. Defaults to `None`, which smooths
    /// until every vertex reachable from the data has a value.
    pub smoothing_steps: Option<usize>,

    /// Hide vertices whose value (or deviation from the center) is below this.
    pub threshold: Option<f64>,

    /// Fade opacity between `fmin` and `fmid`.
    pub transparent: bool,

    /// Time sample to display from a time course.
    pub time_index: Option<usize>,

    /// Display the time sample closest to this time. Ignored when
    /// `time_index` is set.
    pub initial_time: Option<f64>,

    /// Use the rayon pool for smoothing and color evaluation.
    pub parallel: bool,
}

impl Default for OverlayOptions {
    fn default() -> Self {
        Self {
            colormap: Colormap::Auto,
            alpha: 1.0,
            fmin: None,
            fmid: None,
            fmax: None,
            center: None,
            smoothing_steps: None,
            threshold: None,
            transparent: false,
            time_index: None,
            initial_time: None,
            parallel: false,
        }
    }
}

impl OverlayOptions {
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

    /// Set the low limit.
    pub fn with_fmin(mut self, fmin: f64) -> Self {
        self.fmin = Some(fmin);
        self
    }

    /// Set the middle limit.
    pub fn with_fmid(mut self, fmid: f64) -> Self {
        self.fmid = Some(fmid);
        self
    }

    /// Set the high limit.
    pub fn with_fmax(mut self, fmax: f64) -> Self {
        self.fmax = Some(fmax);
        self
    }

    /// Set all three limits.
    pub fn with_limits(self, fmin: f64, fmid: f64, fmax: f64) -> Self {
        self.with_fmin(fmin).with_fmid(fmid).with_fmax(fmax)
    }

    /// Display deviations around `center`.
    pub fn with_center(mut self, center: f64) -> Self {
        self.center = Some(center);
        self
    }

    /// Use a fixed number of smoothing steps.
    pub fn with_smoothing_steps(mut self, steps: usize) -> Self {
        self.smoothing_steps = Some(steps);
        self
    }

    /// Smooth until every vertex has a value.
    pub fn with_full_coverage(mut self) -> Self {
        self.smoothing_steps = None;
        self
    }

    /// Hide vertices below `threshold`.
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    /// Fade opacity between `fmin` and `fmid`.
    pub fn with_transparent(mut self, transparent: bool) -> Self {
        self.transparent = transparent;
        self
    }

    /// Display the given time sample.
    pub fn with_time_index(mut self, index: usize) -> Self {
        self.time_index = Some(index);
        self
    }

    /// Display the time sample closest to `time`.
    pub fn with_initial_time(mut self, time: f64) -> Self {
        self.initial_time = Some(time);
        self
    }

    /// Enable or disable parallel evaluation.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Resolve `(fmin, fmid, fmax)` against the given data samples and
    /// validate their order.
    ///
    /// ```
    /// use sulcus::overlay::OverlayOptions;
    ///
    /// let options = OverlayOptions::default().with_center(0.0);
    /// assert_eq!(options.resolve_limits([-4.0, 2.0, 6.0]).unwrap(), (0.0, 3.0, 6.0));
    ///
    /// let options = OverlayOptions::default();
    /// assert_eq!(options.resolve_limits(Vec::new()).unwrap(), (0.0, 0.5, 1.0));
    /// ```
    pub fn resolve_limits<I>(&self, samples: I) -> Result<(f64, f64, f64)>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut iter = samples.into_iter().peekable();
        let empty = iter.peek().is_none();

        let (fmin, fmax) = match self.center {
            None => {
                let (lo, hi) = if empty {
                    (0.0, 1.0)
                } else {
                    iter.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                        (lo.min(v), hi.max(v))
                    })
                };
                (self.fmin.unwrap_or(lo), self.fmax.unwrap_or(hi))
            }
            Some(center) => {
                let dev = if empty {
                    1.0
                } else {
                    iter.fold(0.0f64, |acc, v| acc.max((center - v).abs()))
                };
                (self.fmin.unwrap_or(0.0), self.fmax.unwrap_or(dev))
            }
        };
        let fmid = self.fmid.unwrap_or((fmin + fmax) / 2.0);

        check_limits(fmin, fmid, fmax)?;
        Ok((fmin, fmid, fmax))
    }

    fn lut_params(&self, (fmin, fmid, fmax): (f64, f64, f64)) -> LutParams {
        LutParams {
            colormap: self.colormap.clone(),
            alpha: self.alpha,
            fmin,
            fmid,
            fmax,
            center: self.center,
            transparent: self.transparent,
        }
    }
}

/// Colors for one display request, with everything needed to recolor it.
#[derive(Debug, Clone)]
pub struct Overlay {
    colors: Vec<Rgba>,
    lut: ColorLookupTable,
    scale: f64,
    offset: f64,
    values: Vec<f64>,
    normalized: Vec<f64>,
    operator: Option<Arc<SmoothingOperator>>,
    threshold: Option<(f64, Option<f64>)>,
    time_index: Option<usize>,
    parallel: bool,
}

impl Overlay {
    /// One RGBA color per vertex.
    #[inline]
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Colors as 8-bit channels.
    pub fn colors_rgba8(&self) -> Vec<[u8; 4]> {
        self.colors.iter().map(|&c| to_rgba8(c)).collect()
    }

    /// The lookup table the colors came from.
    #[inline]
    pub fn lut(&self) -> &ColorLookupTable {
        &self.lut
    }

    /// `(k, b)` of the rescale `k * value + b`.
    #[inline]
    pub fn scale(&self) -> (f64, f64) {
        (self.scale, self.offset)
    }

    /// Current `(fmin, fmid, fmax)`.
    pub fn limits(&self) -> (f64, f64, f64) {
        let p = self.lut.params();
        (p.fmin, p.fmid, p.fmax)
    }

    /// Per-vertex values after smoothing.
    #[inline]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Per-vertex values rescaled into `[0, 1]`.
    #[inline]
    pub fn normalized(&self) -> &[f64] {
        &self.normalized
    }

    /// The smoothing operator, if the field did not cover the mesh.
    pub fn operator(&self) -> Option<&Arc<SmoothingOperator>> {
        self.operator.as_ref()
    }

    /// The displayed time sample of a time course.
    #[inline]
    pub fn time_index(&self) -> Option<usize> {
        self.time_index
    }

    /// Rebuild the lookup table with some limits replaced and recolor.
    ///
    /// The rescale `(k, b)` computed from the original limits is kept, so
    /// only the colors assigned along `[0, 1]` change.
    ///
    /// # Errors
    ///
    /// [`SurfaceError::RangeOrder`] if the new limits are out of order; the
    /// overlay is left unchanged.
    pub fn update_lut(
        &mut self,
        fmin: Option<f64>,
        fmid: Option<f64>,
        fmax: Option<f64>,
    ) -> Result<()> {
        let lut = self.lut.with_limits(fmin, fmid, fmax)?;
        self.colors = colorize(&self.values, &self.normalized, &lut, self.threshold, self.parallel);
        self.lut = lut;
        tracing::debug!(limits = ?self.limits(), "lookup table updated");
        Ok(())
    }
}

/// Map a scalar field to per-vertex colors.
///
/// `values` either covers every vertex of `target`, or covers the vertices
/// listed in `vertices` and is smoothed onto the rest of the mesh.
///
/// A full-length field passed with `vertices` in order `0..n` is used as is.
/// Any other full-length `vertices` array is a permutation: it goes through a
/// `V x V` smoothing operator (cached on a [`Surface`]) and must not repeat
/// an index.
///
/// # Errors
///
/// - [`SurfaceError::RangeOrder`] if the resolved limits are out of order;
///   checked before any other work.
/// - [`SurfaceError::MissingIndex`] if `values` is shorter than the mesh and
///   `vertices` is `None`.
/// - [`SurfaceError::LengthMismatch`] if `values` is longer than the mesh or
///   `vertices` does not match it in length.
/// - Anything [`SmoothingOperator::build`] or [`ColorLookupTable::new`]
///   reports.
pub fn map_scalars<T>(
    target: &T,
    values: &[f64],
    vertices: Option<&[usize]>,
    options: &OverlayOptions,
) -> Result<Overlay>
where
    T: SmoothingTarget + ?Sized,
{
    let limits = options.resolve_limits(values.iter().copied())?;
    map_resolved(target, values, vertices, options, limits, None)
}

/// Map one time sample of a `vertices x time` matrix to per-vertex colors.
///
/// The sample is `options.time_index`, else the entry of `times` closest to
/// `options.initial_time`, else the first. Default limits are computed over
/// the whole matrix so they do not change between samples.
///
/// # Errors
///
/// Everything [`map_scalars`] reports, plus
/// [`SurfaceError::InvalidParameter`] for an empty time axis, an
/// out-of-range `time_index`, or `initial_time` without `times`, and
/// [`SurfaceError::LengthMismatch`] if `times` does not match the columns.
pub fn map_time_course<T>(
    target: &T,
    data: &DMatrix<f64>,
    times: Option<&[f64]>,
    vertices: Option<&[usize]>,
    options: &OverlayOptions,
) -> Result<Overlay>
where
    T: SmoothingTarget + ?Sized,
{
    let limits = options.resolve_limits(data.iter().copied())?;
    let index = select_time(data.ncols(), times, options)?;
    let column: Vec<f64> = data.column(index).iter().copied().collect();
    map_resolved(target, &column, vertices, options, limits, Some(index))
}

/// Colors for the simple activation overlay.
///
/// Values are shifted to a minimum of 0, divided by half their maximum and
/// clipped at 1, then mapped through `hot`. Opacity is the mean of the RGB
/// channels plus 0.5, capped at 1.
pub fn legacy_activation_colors(values: &[f64]) -> Vec<Rgba> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let shifted: Vec<f64> = values.iter().map(|&v| v - min).collect();
    let half = shifted.iter().copied().fold(0.0f64, f64::max) / 2.0;

    shifted
        .iter()
        .map(|&v| {
            let t = if half > 0.0 { (v / half).min(1.0) } else { 0.0 };
            let [r, g, b, _] = NamedRamp::Hot.sample(t);
            let a = ((r + g + b) / 3.0 + 0.5).min(1.0);
            [r, g, b, a]
        })
        .collect()
}

fn is_identity(idx: &[usize]) -> bool {
    idx.iter().enumerate().all(|(i, &v)| i == v)
}

fn map_resolved<T>(
    target: &T,
    values: &[f64],
    vertices: Option<&[usize]>,
    options: &OverlayOptions,
    limits: (f64, f64, f64),
    time_index: Option<usize>,
) -> Result<Overlay>
where
    T: SmoothingTarget + ?Sized,
{
    let vertex_count = target.num_vertices();
    let len = values.len();

    if len > vertex_count {
        return Err(SurfaceError::LengthMismatch {
            what: "data",
            expected: vertex_count,
            actual: len,
        });
    }
    if let Some(idx) = vertices {
        if idx.len() != len {
            return Err(SurfaceError::LengthMismatch {
                what: "vertices",
                expected: len,
                actual: idx.len(),
            });
        }
    }

    let (smoothed, operator) = match vertices {
        None if len < vertex_count => {
            return Err(SurfaceError::MissingIndex { len, vertex_count });
        }
        None => (values.to_vec(), None),
        Some(idx) if len == vertex_count && is_identity(idx) => (values.to_vec(), None),
        Some(idx) => {
            let op = target.smoothing_operator(idx, options.smoothing_steps)?;
            let smoothed = if options.parallel {
                op.par_apply(values)?
            } else {
                op.apply(values)?
            };
            (smoothed, Some(op))
        }
    };

    let lut = ColorLookupTable::new(options.lut_params(limits))?;
    let (scale, offset) = lut.scale();
    let normalized: Vec<f64> = smoothed
        .iter()
        .map(|&v| (scale * v + offset).clamp(0.0, 1.0))
        .collect();

    let threshold = options.threshold.map(|t| (t, options.center));
    let colors = colorize(&smoothed, &normalized, &lut, threshold, options.parallel);

    tracing::debug!(
        vertices = vertex_count,
        known = len,
        ?limits,
        k = scale,
        b = offset,
        smoothed = operator.is_some(),
        "scalar field mapped"
    );

    Ok(Overlay {
        colors,
        lut,
        scale,
        offset,
        values: smoothed,
        normalized,
        operator,
        threshold,
        time_index,
        parallel: options.parallel,
    })
}

/// Evaluate the table and hide sub-threshold vertices.
///
/// `threshold` is `(threshold, center)`; with a center the deviation from it
/// is compared instead of the value.
fn colorize(
    values: &[f64],
    normalized: &[f64],
    lut: &ColorLookupTable,
    threshold: Option<(f64, Option<f64>)>,
    parallel: bool,
) -> Vec<Rgba> {
    let mut colors = if parallel {
        lut.par_evaluate_many(normalized)
    } else {
        lut.evaluate_many(normalized)
    };

    if let Some((threshold, center)) = threshold {
        for (color, &v) in colors.iter_mut().zip(values) {
            let magnitude = match center {
                Some(c) => (v - c).abs(),
                None => v,
            };
            if magnitude < threshold {
                color[3] = 0.0;
            }
        }
    }
    colors
}

fn select_time(num_times: usize, times: Option<&[f64]>, options: &OverlayOptions) -> Result<usize> {
    if num_times == 0 {
        return Err(SurfaceError::invalid_param(
            "data",
            "0 time samples",
            "a time course needs at least one time sample",
        ));
    }
    if let Some(t) = times {
        if t.len() != num_times {
            return Err(SurfaceError::LengthMismatch {
                what: "times",
                expected: num_times,
                actual: t.len(),
            });
        }
    }

    if let Some(index) = options.time_index {
        if index >= num_times {
            return Err(SurfaceError::invalid_param(
                "time_index",
                index,
                "must be smaller than the number of time samples",
            ));
        }
        return Ok(index);
    }

    match (options.initial_time, times) {
        (None, _) => Ok(0),
        (Some(time), None) => Err(SurfaceError::invalid_param(
            "initial_time",
            time,
            "requires the time axis",
        )),
        (Some(time), Some(t)) => {
            let nearest = t
                .iter()
                .enumerate()
                .map(|(i, &ti)| ((ti - time).abs(), i))
                .min_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)))
                .map(|(_, i)| i)
                .unwrap_or(0);
            Ok(nearest)
        }
    }
}
