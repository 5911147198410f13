//! The refit pass: for each interior knot, test whether re-targeting its
//! segment's worst-fit sample (or, in exhaustive mode, every candidate
//! sample) as a new split knot improves on simply removing it outright.
//!
//! Ported from the teacher's `refine_refit` submodule.

use super::{curve_error_value, curve_error_value_and_index, replace_candidacy};
use crate::heap::MinHeap;
use crate::knot::{KnotIx, KnotRing};

#[derive(Copy, Clone)]
enum RefitAction {
    /// Drop this knot entirely, same as the remove pass would.
    Remove { handle_prev: f64, handle_next: f64 },
    /// Re-target this knot's segment at a different sample.
    Retarget {
        at: KnotIx,
        handle_prev_outer: f64,
        handle_retarget_in: f64,
        handle_retarget_out: f64,
        handle_next_outer: f64,
        error_prev: f64,
        error_next: f64,
    },
}

#[derive(Copy, Clone)]
struct RefitState {
    knot: KnotIx,
    action: RefitAction,
    /// The max of the two (or one) segment errors, cached for the `prev`
    /// knot's `error_sq[1]` bookkeeping on apply.
    error_prev_side: f64,
}

fn pair_if_within(
    ring: &KnotRing,
    l: KnotIx,
    r: KnotIx,
    tan_l: &[f64],
    tan_r: &[f64],
    limit_sq: f64,
) -> Option<(f64, f64, f64)> {
    let (error_sq, h_l, h_r) = curve_error_value(ring, l, r, tan_l, tan_r);
    (error_sq < limit_sq).then_some((error_sq, h_l, h_r))
}

fn recalculate(
    ring: &mut KnotRing,
    heap: &mut MinHeap<RefitState>,
    knot: KnotIx,
    error_max_sq: f64,
    use_optimize_exhaustive: bool,
    use_refit_remove: bool,
) {
    debug_assert!(ring.get(knot).can_remove);

    let k_prev = ring.get(knot).prev.expect("refit candidate has a live prev");
    let k_next = ring.get(knot).next.expect("refit candidate has a live next");

    let tan_l = ring.get(k_prev).tan[1].clone();
    let tan_r = ring.get(k_next).tan[0].clone();

    let (fit_error_max_sq, fit_error_index, handle_prev, handle_next) =
        curve_error_value_and_index(ring, k_prev, k_next, &tan_l, &tan_r);

    if use_refit_remove && fit_error_max_sq < error_max_sq {
        // Removing outright beats any possible retarget; weight so the
        // heap prefers the candidate with the most slack below threshold.
        replace_candidacy(
            ring,
            heap,
            knot,
            Some((
                fit_error_max_sq - error_max_sq,
                RefitState {
                    knot,
                    action: RefitAction::Remove { handle_prev, handle_next },
                    error_prev_side: fit_error_max_sq,
                },
            )),
        );
        return;
    }

    let retarget_point_index = fit_error_index;

    if !use_optimize_exhaustive && retarget_point_index == ring.get(knot).point_index {
        replace_candidacy(ring, heap, knot, None);
        return;
    }

    let cost_sq_src_max = ring.get(knot).error_sq[0].max(ring.get(knot).error_sq[1]);

    // (knot, handle_prev_outer, handle_retarget_in, handle_retarget_out, handle_next_outer, error_l, error_r)
    let mut best: Option<(KnotIx, f64, f64, f64, f64, f64, f64)> = None;

    if use_optimize_exhaustive {
        let mut cost_sq_best = cost_sq_src_max;
        for i in (k_prev.0 + 1)..k_next.0 {
            let test = KnotIx(i);
            if test == knot {
                continue;
            }
            if let Some((error_l, handle_prev_outer, handle_in)) =
                pair_if_within(ring, k_prev, test, &tan_l, &tan_l, cost_sq_best)
            {
                if let Some((error_r, handle_out, handle_next_outer)) =
                    pair_if_within(ring, test, k_next, &tan_r, &tan_r, cost_sq_best)
                {
                    cost_sq_best = error_l.max(error_r);
                    best = Some((test, handle_prev_outer, handle_in, handle_out, handle_next_outer, error_l, error_r));
                }
            }
        }
    } else {
        // Point indices and knot indices coincide 1:1 in this arena (one
        // knot per input sample, never reordered).
        let test = KnotIx(retarget_point_index);
        if let Some((error_l, handle_prev_outer, handle_in)) =
            pair_if_within(ring, k_prev, test, &tan_l, &tan_l, cost_sq_src_max)
        {
            if let Some((error_r, handle_out, handle_next_outer)) =
                pair_if_within(ring, test, k_next, &tan_r, &tan_r, cost_sq_src_max)
            {
                best = Some((test, handle_prev_outer, handle_in, handle_out, handle_next_outer, error_l, error_r));
            }
        }
    }

    match best {
        Some((at, handle_prev_outer, handle_retarget_in, handle_retarget_out, handle_next_outer, error_l, error_r)) => {
            let error_max = error_l.max(error_r);
            debug_assert!(error_max < cost_sq_src_max);
            replace_candidacy(
                ring,
                heap,
                knot,
                Some((
                    cost_sq_src_max - error_max,
                    RefitState {
                        knot,
                        action: RefitAction::Retarget {
                            at,
                            handle_prev_outer,
                            handle_retarget_in,
                            handle_retarget_out,
                            handle_next_outer,
                            error_prev: error_l,
                            error_next: error_r,
                        },
                        error_prev_side: error_l,
                    },
                )),
            );
        }
        None => replace_candidacy(ring, heap, knot, None),
    }
}

/// Runs the refit pass to completion, mutating `ring` in place.
///
/// When `use_optimize_exhaustive` is set, every interior sample between a
/// knot's neighbors is tried as a retarget site instead of only the
/// worst-fitting one; much slower, offered for callers that want the best
/// possible result rather than a fast one.
pub fn simplify_refit(
    ring: &mut KnotRing,
    error_max_sq: f64,
    use_optimize_exhaustive: bool,
    use_refit_remove: bool,
) {
    let mut heap: MinHeap<RefitState> = MinHeap::with_capacity(ring.live_count);

    for i in 0..ring.knots.len() {
        let knot = KnotIx(i);
        let k = ring.get(knot);
        if k.can_remove && !k.is_removed && !k.is_corner {
            recalculate(ring, &mut heap, knot, error_max_sq, use_optimize_exhaustive, use_refit_remove);
        }
    }

    while let Some(r) = heap.pop_min() {
        ring.get_mut(r.knot).heap_entry = None;

        let k_prev = ring.get(r.knot).prev.unwrap();
        let k_next = ring.get(r.knot).next.unwrap();

        match r.action {
            RefitAction::Remove { handle_prev, handle_next } => {
                ring.get_mut(k_prev).handles[1] = handle_prev;
                ring.get_mut(k_next).handles[0] = handle_next;
                ring.get_mut(k_prev).error_sq[1] = r.error_prev_side;
                ring.get_mut(k_next).error_sq[0] = r.error_prev_side;

                if ring.live_count <= 2 {
                    continue;
                }

                {
                    let k = ring.get_mut(r.knot);
                    k.is_removed = true;
                    k.prev = None;
                    k.next = None;
                }
                ring.get_mut(k_next).prev = Some(k_prev);
                ring.get_mut(k_prev).next = Some(k_next);
                ring.live_count -= 1;
            }
            RefitAction::Retarget {
                at,
                handle_prev_outer,
                handle_retarget_in,
                handle_retarget_out,
                handle_next_outer,
                error_prev,
                error_next,
            } => {
                ring.get_mut(k_prev).handles[1] = handle_prev_outer;
                ring.get_mut(k_next).handles[0] = handle_next_outer;
                ring.get_mut(k_prev).error_sq[1] = error_prev;
                ring.get_mut(k_next).error_sq[0] = error_next;

                if ring.live_count <= 2 {
                    continue;
                }

                {
                    let k = ring.get_mut(r.knot);
                    k.is_removed = true;
                    k.prev = None;
                    k.next = None;
                }

                ring.get_mut(k_next).prev = Some(at);
                ring.get_mut(k_prev).next = Some(at);

                {
                    let k_at = ring.get_mut(at);
                    k_at.prev = Some(k_prev);
                    k_at.next = Some(k_next);
                    k_at.handles[0] = handle_retarget_in;
                    k_at.handles[1] = handle_retarget_out;
                    k_at.error_sq[0] = error_prev;
                    k_at.error_sq[1] = error_next;
                    k_at.is_removed = false;
                }
            }
        }

        for k_iter in [k_prev, k_next] {
            let k = ring.get(k_iter);
            if k.can_remove && !k.is_corner && k.prev.is_some() && k.next.is_some() {
                recalculate(ring, &mut heap, k_iter, error_max_sq, use_optimize_exhaustive, use_refit_remove);
            }
        }
    }
}
