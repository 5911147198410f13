//! The three heap-driven simplification passes: remove, corner, refit.
//!
//! Ported from the teacher crate's `curve_fit_nd::curve_fit_from_polys`
//! (`refine_remove`, `refine_corner`, `refine_refit` submodules), adapted to
//! the [`crate::knot::KnotRing`] arena and [`crate::heap::MinHeap`] rather
//! than the teacher's raw-index `Vec<Knot>` and shared `knots_handle` table.

mod corner;
mod refit;
mod remove;

pub use corner::simplify_corners;
pub use refit::simplify_refit;
pub use remove::simplify_remove;

use crate::fit_single::fit_single;
use crate::knot::{KnotIx, KnotRing};
use crate::vector;

/// Fits the single segment spanning the live arc from `l` to `r` (inclusive,
/// no wraparound — curves here are always open chains) and converts the
/// solver's handle *points* into the signed scalar lengths along `tan_l` /
/// `tan_r` that a [`crate::knot::Knot`] stores.
///
/// Returns `(error_sq, handle_l, handle_r)`.
fn curve_error_value(
    ring: &KnotRing,
    l: KnotIx,
    r: KnotIx,
    tan_l: &[f64],
    tan_r: &[f64],
) -> (f64, f64, f64) {
    let (err_sq, _index, h_l, h_r) = curve_error_value_and_index(ring, l, r, tan_l, tan_r);
    (err_sq, h_l, h_r)
}

/// As [`curve_error_value`] but also returns the absolute point index of the
/// interior sample with the worst fit — the natural split candidate for a
/// refit.
fn curve_error_value_and_index(
    ring: &KnotRing,
    l: KnotIx,
    r: KnotIx,
    tan_l: &[f64],
    tan_r: &[f64],
) -> (f64, usize, f64, f64) {
    let pi_l = ring.get(l).point_index;
    let pi_r = ring.get(r).point_index;
    debug_assert!(pi_l < pi_r);

    let points = &ring.points[pi_l..=pi_r];
    let lengths = &ring.points_length_cache[pi_l..=pi_r];

    let ((err_sq, err_index_rel), h_l_point, h_r_point) = fit_single(points, lengths, tan_l, tan_r);

    let h_l = vector::dot(tan_l, &vector::sub(&h_l_point, &ring.points[pi_l]));
    let h_r = vector::dot(tan_r, &vector::sub(&h_r_point, &ring.points[pi_r]));

    (err_sq, pi_l + err_index_rel, h_l, h_r)
}

/// Replaces a knot's pending heap candidacy in one step: clears any stale
/// entry, then reinserts only if `predicate` still holds. Mirrors the
/// teacher's `MinHeap::insert_or_update`, which this crate's heap does not
/// implement directly since every pass here needs slightly different
/// "should this stay a candidate" logic around the insert.
fn replace_candidacy<TData: Copy>(
    ring: &mut KnotRing,
    heap: &mut crate::heap::MinHeap<TData>,
    knot: KnotIx,
    new_entry: Option<(f64, TData)>,
) {
    if let Some(old) = ring.get_mut(knot).heap_entry.take() {
        heap.remove(old);
    }
    if let Some((priority, data)) = new_entry {
        let handle = heap.insert(priority, data);
        ring.get_mut(knot).heap_entry = Some(handle);
    }
}
