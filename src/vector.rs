//! N-dimensional vector arithmetic shared by every pass.
//!
//! Every function here is a pure operation over `&[f64]` slices of runtime
//! length `D`; none allocate beyond what the caller hands them. This mirrors
//! the teacher crate's `vec2::DVec2` methods one-for-one, generalized from a
//! fixed 2-component struct to a runtime-length slice, since the fitter must
//! work over samples of arbitrary dimension.

const EPS: f64 = 1e-8;

#[inline]
#[must_use]
pub fn sq(a: f64) -> f64 {
    a * a
}

/// Checks whether a value is within `EPS` of zero.
#[inline]
#[must_use]
pub fn is_almost_zero(val: f64) -> bool {
    val.abs() < EPS
}

/// Checks whether every component is finite.
#[must_use]
pub fn is_finite(v: &[f64]) -> bool {
    v.iter().all(|f| f.is_finite())
}

#[must_use]
pub fn zero(d: usize) -> Vec<f64> {
    vec![0.0; d]
}

pub fn zero_in_place(v: &mut [f64]) {
    v.iter_mut().for_each(|x| *x = 0.0);
}

pub fn copy_into(dst: &mut [f64], src: &[f64]) {
    dst.copy_from_slice(src);
}

#[must_use]
pub fn negated(v: &[f64]) -> Vec<f64> {
    v.iter().map(|x| -x).collect()
}

#[must_use]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[must_use]
pub fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

#[must_use]
pub fn sub(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y).collect()
}

/// `dst = a + b * s` (fused multiply-add), written into a fresh vector.
#[must_use]
pub fn fused_madd(a: &[f64], b: &[f64], s: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y * s).collect()
}

/// `a - b * s`.
#[must_use]
pub fn fused_msub(a: &[f64], b: &[f64], s: f64) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x - y * s).collect()
}

#[must_use]
pub fn mul_scalar(v: &[f64], f: f64) -> Vec<f64> {
    v.iter().map(|x| x * f).collect()
}

pub fn imul_scalar(v: &mut [f64], f: f64) {
    v.iter_mut().for_each(|x| *x *= f);
}

#[must_use]
pub fn squared_len(v: &[f64]) -> f64 {
    v.iter().map(|x| sq(*x)).sum()
}

#[must_use]
pub fn squared_len_between(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| sq(x - y)).sum()
}

#[must_use]
pub fn len_between(a: &[f64], b: &[f64]) -> f64 {
    squared_len_between(a, b).sqrt()
}

/// Squared length of `a + b` (avoids negating a copy of `b` first).
#[must_use]
pub fn squared_len_negated_between(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| sq(x + y)).sum()
}

#[must_use]
pub fn len_negated_between(a: &[f64], b: &[f64]) -> f64 {
    squared_len_negated_between(a, b).sqrt()
}

/// Normalizes `v` in place, returning its original length.
/// Leaves `v` untouched (a zero vector) when the length is zero.
pub fn normalize_in_place(v: &mut [f64]) -> f64 {
    let mut d = squared_len(v);
    if d != 0.0 {
        d = d.sqrt();
        if d != 0.0 {
            imul_scalar(v, 1.0 / d);
        }
    }
    d
}

#[must_use]
pub fn normalized(v: &[f64]) -> Vec<f64> {
    let mut out = v.to_vec();
    normalize_in_place(&mut out);
    out
}

/// `(a - b).normalized()`.
#[must_use]
pub fn normalized_diff(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut v = sub(a, b);
    normalize_in_place(&mut v);
    v
}

/// `(a - b).normalized()` together with the original (pre-normalize) length.
#[must_use]
pub fn normalized_diff_with_len(a: &[f64], b: &[f64]) -> (Vec<f64>, f64) {
    let mut v = sub(a, b);
    let d = normalize_in_place(&mut v);
    (v, d)
}

/// Projects `p` onto a (assumed already normalized) direction `dir`.
#[must_use]
pub fn project_onto(p: &[f64], dir: &[f64]) -> Vec<f64> {
    mul_scalar(dir, dot(p, dir))
}

/// The component of `v` orthogonal to the (assumed normalized) plane normal `n`.
#[must_use]
pub fn project_onto_plane_normalized(v: &[f64], n: &[f64]) -> Vec<f64> {
    sub(v, &project_onto(v, n))
}
