//! The public entry point: validates input, runs the three passes in order,
//! and reads the resulting ring back out into flat output arrays.
//!
//! Ported from the teacher's `fit_poly_single` driver function, generalized
//! to runtime dimensions and the single (non-cyclic) curve case — see
//! `DESIGN.md` for why cyclic curves and the multi-polygon threaded
//! `fit_poly_list` entry point are out of scope here.

use crate::error::FitError;
use crate::knot::KnotRing;
use crate::passes;
use crate::vector;

/// Runtime knobs mapped 1:1 onto the teacher corpus's compile-time
/// `USE_KNOT_REFIT` / `USE_KNOT_REFIT_REMOVE` / `USE_CORNER_DETECT` switches,
/// plus the `use_optimize_exhaustive` parameter `fit_poly_single` already
/// took at runtime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitConfig {
    /// Samples may deviate from their fitted cubic by up to this distance.
    pub error_threshold: f64,
    /// Knots whose neighbor tangents diverge by more than this angle (in
    /// radians) become corners instead of being smoothed through. Set to
    /// `PI` (or above) to disable corner detection outright.
    pub corner_angle: f64,
    pub use_refit: bool,
    pub use_refit_remove: bool,
    pub use_corner_detect: bool,
    pub use_optimize_exhaustive: bool,
    /// Widens the error bound used when judging whether a corner candidate's
    /// split point sits close enough to the line it replaces.
    pub corner_scale: f64,
}

impl Default for FitConfig {
    fn default() -> Self {
        FitConfig {
            error_threshold: 1.0,
            corner_angle: std::f64::consts::PI,
            use_refit: true,
            use_refit_remove: true,
            use_corner_detect: false,
            use_optimize_exhaustive: false,
            corner_scale: 2.0,
        }
    }
}

/// The fitted curve: one triple `(handle_in, anchor, handle_out)` per output
/// knot, each a `dims`-length vector, plus the bookkeeping arrays tying
/// output knots back to the input.
#[derive(Debug, Clone)]
pub struct FitOutput<T> {
    pub cubics: Vec<[Vec<T>; 3]>,
    /// `orig_index[i]` is the input sample index the `i`th output knot's
    /// anchor was drawn from.
    pub orig_index: Vec<u32>,
    /// Positions within the output sequence that are corners. Always
    /// includes `0` and `cubics.len() - 1`.
    pub corner_index: Vec<u32>,
}

fn validate(points: &[f64], points_len: u32, dims: u32, config: &FitConfig) -> Result<(), FitError> {
    if points_len == 0 {
        return Err(FitError::EmptyInput);
    }
    if dims == 0 {
        return Err(FitError::ZeroDimensions);
    }
    if config.error_threshold < 0.0 {
        return Err(FitError::NegativeErrorThreshold(config.error_threshold));
    }
    let expected = points_len as usize * dims as usize;
    if points.len() != expected {
        return Err(FitError::PointsLengthMismatch { expected, actual: points.len() });
    }
    Ok(())
}

/// Fits a cubic Bézier approximation to an open (non-cyclic) N-dimensional
/// polyline.
///
/// `points` is `points_len` samples of `dims` components each, laid out
/// sample-major (`points[i * dims + j]`).
pub fn fit_incremental(
    points: &[f64],
    points_len: u32,
    dims: u32,
    config: &FitConfig,
) -> Result<FitOutput<f64>, FitError> {
    validate(points, points_len, dims, config)?;

    let points_len = points_len as usize;
    let dims = dims as usize;

    log::trace!("fit_incremental: {points_len} points, {dims} dims, error_threshold={}", config.error_threshold);

    let mut ring = KnotRing::new_open(points, points_len, dims);

    let error_max_sq = vector::sq(config.error_threshold);
    let use_corner = config.use_corner_detect && config.corner_angle < std::f64::consts::PI;

    // The initial pass runs at half the error threshold when corner
    // detection follows: the corner pass's own segment fits are allowed the
    // full threshold, so starting tighter leaves it enough slack to still
    // land within bounds after a corner knot's span is carved out of an
    // already-simplified segment.
    let initial_error_max_sq = if use_corner { vector::sq(config.error_threshold / 2.0) } else { error_max_sq };
    passes::simplify_remove(&mut ring, initial_error_max_sq);
    log::debug!("after remove pass: {} live knots", ring.live_count);

    if use_corner {
        debug_assert!(ring.knots.iter().all(|k| k.heap_entry.is_none()));

        passes::simplify_corners(
            &mut ring,
            error_max_sq,
            vector::sq(config.error_threshold * config.corner_scale),
            config.corner_angle,
        );
        log::debug!("after corner pass: {} live knots", ring.live_count);

        passes::simplify_remove(&mut ring, error_max_sq);
        log::debug!("after post-corner remove pass: {} live knots", ring.live_count);
    }

    debug_assert!(ring.live_count >= 2 || points_len < 2);

    if config.use_refit && points_len >= 2 {
        passes::simplify_refit(&mut ring, error_max_sq, config.use_optimize_exhaustive, config.use_refit_remove);
        log::debug!("after refit pass: {} live knots", ring.live_count);
    }

    Ok(emit(&ring))
}

fn emit(ring: &KnotRing) -> FitOutput<f64> {
    let mut cubics = Vec::with_capacity(ring.live_count);
    let mut orig_index = Vec::with_capacity(ring.live_count);
    let mut corner_index = Vec::new();

    let first = ring.first_live();
    let mut cursor = Some(first);
    let mut position: u32 = 0;

    while let Some(ix) = cursor {
        let k = ring.get(ix);
        let anchor = ring.points[k.point_index].clone();
        let h_in = vector::fused_madd(&anchor, &k.tan[0], k.handles[0]);
        let h_out = vector::fused_madd(&anchor, &k.tan[1], k.handles[1]);

        cubics.push([h_in, anchor, h_out]);
        orig_index.push(k.point_index as u32);
        if k.is_corner || k.prev.is_none() || k.next.is_none() {
            corner_index.push(position);
        }

        position += 1;
        cursor = k.next;
    }

    FitOutput { cubics, orig_index, corner_index }
}

/// Single-precision entry point: widens `points` to `f64`, fits, then
/// narrows the result back down. `spec.md` §6 names this variant
/// specifically so float-based callers don't have to widen/narrow by hand.
pub fn fit_incremental_f32(
    points: &[f32],
    points_len: u32,
    dims: u32,
    config: &FitConfig,
) -> Result<FitOutput<f32>, FitError> {
    let widened: Vec<f64> = points.iter().map(|&x| x as f64).collect();
    let out = fit_incremental(&widened, points_len, dims, config)?;

    let cubics = out
        .cubics
        .into_iter()
        .map(|[h_in, anchor, h_out]| {
            [
                h_in.into_iter().map(|x| x as f32).collect(),
                anchor.into_iter().map(|x| x as f32).collect(),
                h_out.into_iter().map(|x| x as f32).collect(),
            ]
        })
        .collect();

    Ok(FitOutput { cubics, orig_index: out.orig_index, corner_index: out.corner_index })
}
