//! Single-segment cubic Bézier least-squares fit.
//!
//! `spec.md` §1 treats this as an external collaborator supplied to the
//! incremental engine: a pure function `fit_single(points, tan_l, tan_r) ->
//! (h_l, h_r, err_sq)`. It is implemented here (the crate has nowhere else
//! to source it from) but deliberately kept self-contained — the three
//! passes in `crate::passes` call it only through [`fit_single`] and never
//! reach into its internals. Ported from the teacher crate's
//! `curve_fit_nd::curve_fit_single`, generalized from its fixed 2D `DVec2`
//! to runtime-dimension `&[f64]` vectors.

use crate::vector;

#[derive(Clone)]
struct Cubic {
    p0: Vec<f64>,
    p1: Vec<f64>,
    p2: Vec<f64>,
    p3: Vec<f64>,
}

fn cubic_solve_fallback(points: &[Vec<f64>], tan_l: &[f64], tan_r: &[f64]) -> Cubic {
    let p0 = &points[0];
    let p3 = &points[points.len() - 1];
    let alpha = vector::len_between(p0, p3) / 3.0;

    Cubic {
        p0: p0.clone(),
        p1: vector::fused_msub(p0, tan_l, alpha),
        p2: vector::fused_madd(p3, tan_r, alpha),
        p3: p3.clone(),
    }
}

mod bezier {
    pub fn b1(u: f64) -> f64 {
        let tmp = 1.0 - u;
        3.0 * u * tmp * tmp
    }
    pub fn b2(u: f64) -> f64 {
        3.0 * u * u * (1.0 - u)
    }
    pub fn b0_plus_b1(u: f64) -> f64 {
        let tmp = 1.0 - u;
        tmp * tmp * (1.0 + 2.0 * u)
    }
    pub fn b2_plus_b3(u: f64) -> f64 {
        u * u * (3.0 - 2.0 * u)
    }
}

fn cubic_solve_least_square(
    points: &[Vec<f64>],
    tan_l: &[f64],
    tan_r: &[f64],
    u_prime: &[f64],
) -> Option<Cubic> {
    let p0 = &points[0];
    let p3 = &points[points.len() - 1];
    let dims = p0.len();

    let mut x = [0.0_f64; 2];
    let mut c = [[0.0_f64; 2]; 2];

    for (pt, &u) in points.iter().zip(u_prime) {
        let a0 = vector::mul_scalar(tan_l, bezier::b1(u));
        let a1 = vector::mul_scalar(tan_r, bezier::b2(u));

        let b0_plus_b1 = bezier::b0_plus_b1(u);
        let b2_plus_b3 = bezier::b2_plus_b3(u);

        for j in 0..dims {
            let tmp = (pt[j] - (p0[j] * b0_plus_b1)) + (p3[j] * b2_plus_b3);

            x[0] += a0[j] * tmp;
            x[1] += a1[j] * tmp;

            c[0][0] += a0[j] * a0[j];
            c[0][1] += a0[j] * a1[j];
            c[1][1] += a1[j] * a1[j];
        }
    }
    c[1][0] = c[0][1];

    let det_c0_c1 = {
        let tmp = c[0][0] * c[1][1] - c[0][1] * c[1][0];
        if !vector::is_almost_zero(tmp) {
            tmp
        } else {
            c[0][0] * c[1][1] * 10e-12
        }
    };
    let det_c_0x = x[1] * c[0][0] - x[0] * c[0][1];
    let det_x_c1 = x[0] * c[1][1] - x[1] * c[0][1];

    // may still divide-by-zero; the finite checks below catch NaN results.
    let alpha_l = det_x_c1 / det_c0_c1;
    let alpha_r = det_c_0x / det_c0_c1;

    if !(alpha_l >= 0.0) || !(alpha_r >= 0.0) {
        return None;
    }

    Some(Cubic {
        p0: p0.clone(),
        p1: vector::fused_msub(p0, tan_l, alpha_l),
        p2: vector::fused_madd(p3, tan_r, alpha_r),
        p3: p3.clone(),
    })
}

mod cubic_solve_circle {
    use crate::vector;

    /// The angle (in radians, divided by the arc-length separation) swept by
    /// the two tangents around an imaginary circle through both endpoints.
    fn circumference_factor(tan_l: &[f64], tan_r: &[f64]) -> f64 {
        let dot = vector::dot(tan_l, tan_r);
        let len_tangent = if dot < 0.0 {
            vector::len_between(tan_l, tan_r)
        } else {
            vector::len_negated_between(tan_l, tan_r)
        };
        if len_tangent > f64::EPSILON {
            let angle = (-dot.abs()).max(-1.0).acos();
            let factor = angle / len_tangent;
            debug_assert!(factor < (std::f64::consts::PI / 2.0) + (f64::EPSILON * 10.0));
            factor
        } else {
            std::f64::consts::PI / 2.0
        }
    }

    /// Scale factor for the handle length assuming both endpoints lie on a
    /// perfect circle; `None` when the tangents are aligned (no information).
    fn circle_tangent_factor(tan_l: &[f64], tan_r: &[f64]) -> Option<f64> {
        let eps = 1e-8;
        let tan_dot = vector::dot(tan_l, tan_r);
        if tan_dot > 1.0 - eps {
            None
        } else if tan_dot < -1.0 + eps {
            Some(0.5)
        } else {
            let angle = tan_dot.acos() / 2.0;
            let angle_sin = angle.sin();
            let angle_cos = angle.cos();
            Some(((1.0 - angle_cos) / (angle_sin * 2.0)) / angle_sin)
        }
    }

    fn cubic_scale(
        v_l: &[f64],
        v_r: &[f64],
        tan_l: &[f64],
        tan_r: &[f64],
        coords_length: f64,
    ) -> Option<f64> {
        let len_circle_factor = circle_tangent_factor(tan_l, tan_r)?;

        let len_direct = vector::len_between(v_l, v_r);
        let len_circle_handle = len_direct * (len_circle_factor / 0.75);
        let len_circle = len_direct * circumference_factor(tan_l, tan_r);
        let mut scale_handle = coords_length / len_circle;

        scale_handle = ((scale_handle - 1.0) * 1.75) + 1.0;
        scale_handle *= len_circle_handle;

        scale_handle.is_finite().then_some(scale_handle)
    }

    pub fn calc(
        points: &[Vec<f64>],
        tan_l: &[f64],
        tan_r: &[f64],
        points_coords_length: f64,
    ) -> Option<super::Cubic> {
        let p0 = &points[0];
        let p3 = &points[points.len() - 1];
        let alpha = cubic_scale(p0, p3, tan_l, tan_r, points_coords_length)?;

        Some(super::Cubic {
            p0: p0.clone(),
            p1: vector::fused_msub(p0, tan_l, alpha),
            p2: vector::fused_madd(p3, tan_r, alpha),
            p3: p3.clone(),
        })
    }
}

mod cubic_solve_offset {
    use crate::vector;

    pub fn calc(points: &[Vec<f64>], tan_l: &[f64], tan_r: &[f64]) -> Option<super::Cubic> {
        let p0 = &points[0];
        let p3 = &points[points.len() - 1];

        let dir_unit = vector::normalized_diff(p3, p0);
        let a0 = vector::normalized(&vector::project_onto_plane_normalized(tan_l, &dir_unit));
        let a1 = vector::negated(&vector::normalized(&vector::project_onto_plane_normalized(
            tan_r, &dir_unit,
        )));

        let div_l = vector::dot(tan_l, &a0).abs();
        let div_r = vector::dot(tan_r, &a1).abs();
        if div_l < f64::EPSILON || div_r < f64::EPSILON {
            return None;
        }

        let mut dist0 = 0.0_f64;
        let mut dist1 = 0.0_f64;
        for pt in &points[1..points.len() - 1] {
            let diff = vector::sub(p0, pt);
            dist0 = dist0.max(vector::dot(&vector::project_onto(&diff, &a0), &a0));
            dist1 = dist1.max(vector::dot(&vector::project_onto(&diff, &a1), &a1));
        }

        let alpha_l = (dist0 / 0.75) / div_l;
        let alpha_r = (dist1 / 0.75) / div_r;
        if !(alpha_l >= 0.0) || !(alpha_r >= 0.0) {
            return None;
        }

        Some(super::Cubic {
            p0: p0.clone(),
            p1: vector::fused_msub(p0, tan_l, alpha_l),
            p2: vector::fused_madd(p3, tan_r, alpha_r),
            p3: p3.clone(),
        })
    }
}

fn cubic_calc_point(cubic: &Cubic, t: f64) -> Vec<f64> {
    let s = 1.0 - t;
    let dims = cubic.p0.len();
    let mut out = vec![0.0; dims];
    for j in 0..dims {
        let p01 = (cubic.p0[j] * s) + (cubic.p1[j] * t);
        let p12 = (cubic.p1[j] * s) + (cubic.p2[j] * t);
        let p23 = (cubic.p2[j] * s) + (cubic.p3[j] * t);
        out[j] = (((p01 * s) + (p12 * t)) * s) + (((p12 * s) + (p23 * t)) * t);
    }
    out
}

fn cubic_calc_speed(cubic: &Cubic, t: f64) -> Vec<f64> {
    let s = 1.0 - t;
    let dims = cubic.p0.len();
    let mut out = vec![0.0; dims];
    for j in 0..dims {
        out[j] = 3.0
            * ((cubic.p1[j] - cubic.p0[j]) * s * s
                + 2.0 * (cubic.p2[j] - cubic.p0[j]) * s * t
                + (cubic.p3[j] - cubic.p2[j]) * t * t);
    }
    out
}

fn cubic_calc_acceleration(cubic: &Cubic, t: f64) -> Vec<f64> {
    let s = 1.0 - t;
    let dims = cubic.p0.len();
    let mut out = vec![0.0; dims];
    for j in 0..dims {
        out[j] = 6.0
            * ((cubic.p2[j] - 2.0 * cubic.p1[j] + cubic.p0[j]) * s
                + (cubic.p3[j] - 2.0 * cubic.p2[j] + cubic.p1[j]) * t);
    }
    out
}

/// One Newton-Raphson step refining the parameter `u` at which `cubic` is
/// closest to `p`. May return `NaN`; callers must check.
fn cubic_find_root(cubic: &Cubic, p: &[f64], u: f64) -> f64 {
    let q0_u = vector::sub(&cubic_calc_point(cubic, u), p);
    let q1_u = cubic_calc_speed(cubic, u);
    let q2_u = cubic_calc_acceleration(cubic, u);

    u - vector::dot(&q0_u, &q1_u) / (vector::dot(&q1_u, &q1_u) + vector::dot(&q0_u, &q2_u))
}

fn cubic_reparameterize(cubic: &Cubic, points: &[Vec<f64>], u_prime_src: &[f64]) -> Option<Vec<f64>> {
    debug_assert_eq!(points.len(), u_prime_src.len());

    let mut u_prime_dst: Vec<f64> = Vec::with_capacity(points.len());
    for (u_src, pt) in u_prime_src.iter().zip(points) {
        let u_dst = cubic_find_root(cubic, pt, *u_src);
        if !u_dst.is_finite() {
            return None;
        }
        u_prime_dst.push(u_dst);
    }

    u_prime_dst.sort_by(|a, b| a.partial_cmp(b).unwrap());

    if u_prime_dst[0] < 0.0 || u_prime_dst[u_prime_dst.len() - 1] > 1.0 {
        return None;
    }

    Some(u_prime_dst)
}

/// Arc-length parameterization `u[i] in [0, 1]` of `points`, plus the total
/// chord length, derived from the cached consecutive-sample distances.
fn points_calc_coord_length(points: &[Vec<f64>], points_length_cache: &[f64]) -> (Vec<f64>, f64) {
    let mut u: Vec<f64> = Vec::with_capacity(points.len());
    u.push(0.0);

    let mut l_prev = 0.0;
    for l in points_length_cache.iter().skip(1) {
        let l_curr = l + l_prev;
        u.push(l_curr);
        l_prev = l_curr;
    }

    debug_assert_eq!(u.len(), points.len());

    let w = u[u.len() - 1];
    for u_step in &mut u[1..] {
        *u_step /= w;
    }

    (u, w)
}

#[derive(Clone, Copy)]
struct FitError {
    max_sq: f64,
    index: usize,
}

fn cubic_calc_error(cubic: &Cubic, points: &[Vec<f64>], u: &[f64]) -> FitError {
    let mut error_max_sq = -1.0_f64;
    let mut error_index = 1;

    for (index, (pt_real, u_step)) in points[1..points.len() - 1]
        .iter()
        .zip(&u[1..u.len() - 1])
        .enumerate()
    {
        let pt_eval = cubic_calc_point(cubic, *u_step);
        let err_sq = vector::squared_len_between(pt_real, &pt_eval);
        if err_sq > error_max_sq {
            error_max_sq = err_sq;
            error_index = index + 1;
        }
    }

    debug_assert!(error_max_sq != -1.0);
    FitError { max_sq: error_max_sq, index: error_index }
}

fn cubic_calc_error_limit(
    cubic: &Cubic,
    points: &[Vec<f64>],
    u: &[f64],
    error_max_sq_limit: f64,
) -> Option<FitError> {
    let mut error_max_sq = -1.0_f64;
    let mut error_index = 1;

    for (index, (pt_real, u_step)) in points[1..points.len() - 1]
        .iter()
        .zip(&u[1..u.len() - 1])
        .enumerate()
    {
        let pt_eval = cubic_calc_point(cubic, *u_step);
        let err_sq = vector::squared_len_between(pt_real, &pt_eval);
        if err_sq > error_max_sq {
            if err_sq > error_max_sq_limit {
                return None;
            }
            error_max_sq = err_sq;
            error_index = index + 1;
        }
    }

    debug_assert!(error_max_sq != -1.0);
    Some(FitError { max_sq: error_max_sq, index: error_index })
}

fn fit_cubic_to_points(
    points: &[Vec<f64>],
    points_length_cache: &[f64],
    tan_l: &[f64],
    tan_r: &[f64],
) -> (Cubic, FitError) {
    const ITERATION_MAX: usize = 4;
    assert!(points.len() > 2);

    let cubic_fallback = cubic_solve_fallback(points, tan_l, tan_r);
    let (mut u, points_length) = points_calc_coord_length(points, points_length_cache);
    let error_fallback = cubic_calc_error(&cubic_fallback, points, &u);
    let mut error_best = error_fallback;
    let mut cubic_best = cubic_fallback.clone();

    if let Some(cubic_test) = cubic_solve_circle::calc(points, tan_l, tan_r, points_length) {
        if let Some(error_test) = cubic_calc_error_limit(&cubic_test, points, &u, error_best.max_sq) {
            cubic_best = cubic_test;
            error_best = error_test;
        }
    }

    if let Some(cubic_test) = cubic_solve_offset::calc(points, tan_l, tan_r) {
        if let Some(error_test) = cubic_calc_error_limit(&cubic_test, points, &u, error_best.max_sq) {
            cubic_best = cubic_test;
            error_best = error_test;
        }
    }

    {
        let (mut cubic_least_square, mut error_least_square) =
            match cubic_solve_least_square(points, tan_l, tan_r, &u) {
                Some(cubic_test) => {
                    let error_test = cubic_calc_error(&cubic_test, points, &u);
                    if error_best.max_sq > error_test.max_sq {
                        cubic_best = cubic_test.clone();
                        error_best = error_test;
                    }
                    (cubic_test, error_test)
                }
                None => (cubic_fallback, error_fallback),
            };

        for _ in 0..ITERATION_MAX {
            let Some(u_prime) = cubic_reparameterize(&cubic_least_square, points, &u) else {
                break;
            };

            match cubic_solve_least_square(points, tan_l, tan_r, &u_prime) {
                Some(cubic_test) => {
                    let error_test = cubic_calc_error(&cubic_test, points, &u_prime);
                    if error_least_square.max_sq > error_test.max_sq {
                        error_least_square = error_test;
                        cubic_least_square = cubic_test;
                    }
                    u = u_prime;
                }
                None => break,
            }
        }

        if error_best.max_sq > error_least_square.max_sq {
            error_best = error_least_square;
            cubic_best = cubic_least_square;
        }
    }

    (cubic_best, error_best)
}

/// Fits a single cubic segment to `points` (at least 2, inclusive of both
/// endpoints), given the unit incoming/outgoing tangents at each end.
///
/// Returns the squared fit error (and the index, within `points`, of the
/// worst-fitting interior sample), plus the two handle *points* (not
/// lengths — callers recover a scalar length via `dot(tan, handle - anchor)`
/// per `spec.md` §4.4).
pub fn fit_single(
    points: &[Vec<f64>],
    points_length_cache: &[f64],
    tan_l: &[f64],
    tan_r: &[f64],
) -> ((f64, usize), Vec<f64>, Vec<f64>) {
    if points.len() == 2 {
        // No points between; fall back to a 1/3 handle length with no error.
        let handle_len = points_length_cache[1] / 3.0;
        let h_l = vector::fused_msub(&points[0], tan_l, handle_len);
        let h_r = vector::fused_madd(&points[1], tan_r, handle_len);
        return ((0.0, 0), h_l, h_r);
    }

    let (cubic, fit_error) = fit_cubic_to_points(points, points_length_cache, tan_l, tan_r);
    ((fit_error.max_sq, fit_error.index), cubic.p1, cubic.p2)
}
