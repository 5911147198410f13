//! The corner pass: resurrect a previously-removed knot as a sharp corner
//! when the angle between its neighbors' tangents exceeds `corner_angle`.
//!
//! Ported from the teacher's `refine_corner` submodule. The teacher builds
//! its candidate heap from a single initial scan and then drains it without
//! re-validating a candidate's cached neighbor indices against the ring's
//! current links — so popping one corner can silently invalidate a second,
//! still-queued candidate that shares a boundary knot with it, corrupting
//! the resulting ring. This version re-checks live adjacency at apply time
//! and discards any candidate the ring has since moved past, rather than
//! trusting the snapshot taken when the candidate was queued.

use super::{curve_error_value, replace_candidacy};
use crate::heap::MinHeap;
use crate::knot::{KnotIx, KnotRing};
use crate::vector;

#[derive(Copy, Clone)]
struct CornerState {
    split: KnotIx,
    prev: KnotIx,
    next: KnotIx,
    /// `prev`'s own outgoing handle, from fitting `prev..split`.
    handle_prev_outer: f64,
    /// `split`'s incoming handle, from fitting `prev..split`.
    handle_split_in: f64,
    /// `split`'s outgoing handle, from fitting `split..next`.
    handle_split_out: f64,
    /// `next`'s own incoming handle, from fitting `split..next`.
    handle_next_outer: f64,
    error_prev: f64,
    error_next: f64,
}

fn find_split_point(ring: &KnotRing, prev: KnotIx, next: KnotIx, plane_no: &[f64]) -> Option<KnotIx> {
    let mut best: Option<KnotIx> = None;
    let mut best_dist = f64::MIN;
    for i in (prev.0 + 1)..next.0 {
        let ix = KnotIx(i);
        let dist = vector::dot(plane_no, &ring.points[ring.get(ix).point_index]);
        if dist > best_dist {
            best_dist = dist;
            best = Some(ix);
        }
    }
    best
}

fn recalculate(
    ring: &mut KnotRing,
    heap: &mut MinHeap<CornerState>,
    split: KnotIx,
    prev: KnotIx,
    next: KnotIx,
    error_max_sq: f64,
) {
    let tan_prev = ring.get(prev).tan[1].clone();
    let tan_next = ring.get(next).tan[0].clone();

    let (error_prev, handle_prev_outer, handle_split_in) =
        curve_error_value(ring, prev, split, &tan_prev, &tan_prev);
    let entry = if error_prev < error_max_sq {
        let (error_next, handle_split_out, handle_next_outer) =
            curve_error_value(ring, split, next, &tan_next, &tan_next);
        (error_next < error_max_sq).then_some((
            error_prev.max(error_next),
            CornerState {
                split,
                prev,
                next,
                handle_prev_outer,
                handle_split_in,
                handle_split_out,
                handle_next_outer,
                error_prev,
                error_next,
            },
        ))
    } else {
        None
    };

    replace_candidacy(ring, heap, split, entry);
}

/// Tests whether the live adjacent pair `(prev, next)` diverges past
/// `corner_angle_cos` and, if so, locates and validates a split candidate
/// between them, queuing it on success. Shared by the initial full-ring
/// scan and by re-evaluation of the pairs a just-accepted corner creates.
fn try_queue_candidate(
    ring: &mut KnotRing,
    heap: &mut MinHeap<CornerState>,
    prev: KnotIx,
    next: KnotIx,
    error_max_sq: f64,
    error_sq_collapse_max: f64,
    corner_angle_cos: f64,
) {
    if ring.get(prev).is_removed || ring.get(next).is_removed {
        return;
    }
    if !ring.get(prev).can_remove || !ring.get(next).can_remove {
        return;
    }
    if ring.get(prev).next != Some(next) || ring.get(next).prev != Some(prev) {
        return;
    }

    let tan_prev = ring.get(prev).tan[1].clone();
    let tan_next = ring.get(next).tan[0].clone();
    if vector::dot(&tan_prev, &tan_next) >= corner_angle_cos {
        return;
    }

    let plane_no = vector::sub(&tan_next, &tan_prev);
    let Some(split) = find_split_point(ring, prev, next, &plane_no) else { return };

    let co_prev = ring.points[ring.get(prev).point_index].clone();
    let co_next = ring.points[ring.get(next).point_index].clone();
    let co_split = ring.points[ring.get(split).point_index].clone();

    let proj_ref_prev = vector::project_onto(&co_prev, &tan_prev);
    let proj_split_prev = vector::project_onto(&co_split, &tan_prev);
    if vector::squared_len_between(&proj_ref_prev, &proj_split_prev) >= error_sq_collapse_max {
        return;
    }

    let proj_ref_next = vector::project_onto(&co_next, &tan_next);
    let proj_split_next = vector::project_onto(&co_split, &tan_next);
    if vector::squared_len_between(&proj_ref_next, &proj_split_next) >= error_sq_collapse_max {
        return;
    }

    recalculate(ring, heap, split, prev, next, error_max_sq);
}

/// Runs the corner pass to completion, mutating `ring` in place.
///
/// `error_sq_collapse_max` bounds how far the split point may sit from the
/// line it's replacing, separately from `error_max_sq`'s bound on the two
/// new segments' own fit error (`spec.md`'s `corner_scale` widens this).
pub fn simplify_corners(ring: &mut KnotRing, error_max_sq: f64, error_sq_collapse_max: f64, corner_angle: f64) {
    let corner_angle_cos = corner_angle.cos();
    let mut heap: MinHeap<CornerState> = MinHeap::with_capacity(0);

    for i in 0..ring.knots.len() {
        let prev = KnotIx(i);
        if ring.get(prev).is_removed || !ring.get(prev).can_remove {
            continue;
        }
        let Some(next) = ring.get(prev).next else { continue };
        try_queue_candidate(ring, &mut heap, prev, next, error_max_sq, error_sq_collapse_max, corner_angle_cos);
    }

    while let Some(c) = heap.pop_min() {
        ring.get_mut(c.split).heap_entry = None;

        // Guard against the stale-adjacency case described above: only
        // apply this candidate if `prev`/`next` are still exactly the live
        // neighbors they were when the candidate was queued.
        if ring.get(c.prev).next != Some(c.next) || ring.get(c.next).prev != Some(c.prev) {
            continue;
        }
        if ring.get(c.prev).is_removed || ring.get(c.next).is_removed || !ring.get(c.split).is_removed {
            continue;
        }

        let tan_prev = ring.get(c.prev).tan[1].clone();
        let tan_next = ring.get(c.next).tan[0].clone();

        {
            let k_prev = ring.get_mut(c.prev);
            k_prev.next = Some(c.split);
            k_prev.handles[1] = c.handle_prev_outer;
            k_prev.error_sq[1] = c.error_prev;
        }
        {
            let k_next = ring.get_mut(c.next);
            k_next.prev = Some(c.split);
            k_next.handles[0] = c.handle_next_outer;
            k_next.error_sq[0] = c.error_next;
        }
        {
            let k_split = ring.get_mut(c.split);
            k_split.is_removed = false;
            k_split.is_corner = true;
            k_split.prev = Some(c.prev);
            k_split.next = Some(c.next);
            k_split.tan[0] = tan_prev;
            k_split.tan[1] = tan_next;
            k_split.handles[0] = c.handle_split_in;
            k_split.handles[1] = c.handle_split_out;
            k_split.error_sq[0] = c.error_prev;
            k_split.error_sq[1] = c.error_next;
        }

        ring.live_count += 1;

        // The corner split introduces two new adjacent pairs where only one
        // existed before; re-derive them from the live ring rather than
        // reusing any payload's cached adjacency (spec.md §9's
        // stale-adjacency note) and see whether either now has a corner of
        // its own to detect.
        try_queue_candidate(ring, &mut heap, c.prev, c.split, error_max_sq, error_sq_collapse_max, corner_angle_cos);
        try_queue_candidate(ring, &mut heap, c.split, c.next, error_max_sq, error_sq_collapse_max, corner_angle_cos);
    }
}
