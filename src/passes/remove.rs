//! The remove pass: greedily collapse knots whose segment, once they're
//! gone, would still fit within `error_max_sq`.
//!
//! Ported from the teacher's `refine_remove` submodule.

use super::{curve_error_value, replace_candidacy};
use crate::heap::MinHeap;
use crate::knot::{KnotIx, KnotRing};

#[derive(Copy, Clone)]
struct RemoveState {
    knot: KnotIx,
    /// New handle for the knot to the left, on its outgoing (`tan[1]`) side.
    handle_prev: f64,
    /// New handle for the knot to the right, on its incoming (`tan[0]`) side.
    handle_next: f64,
}

fn recalculate(ring: &mut KnotRing, heap: &mut MinHeap<RemoveState>, knot: KnotIx, error_max_sq: f64) {
    debug_assert!(ring.get(knot).can_remove);

    let k_prev = ring.get(knot).prev.expect("removable knot always has a live prev");
    let k_next = ring.get(knot).next.expect("removable knot always has a live next");

    let tan_l = ring.get(k_prev).tan[1].clone();
    let tan_r = ring.get(k_next).tan[0].clone();
    let (error_sq, handle_prev, handle_next) = curve_error_value(ring, k_prev, k_next, &tan_l, &tan_r);

    let entry = (error_sq < error_max_sq).then_some((
        error_sq,
        RemoveState { knot, handle_prev, handle_next },
    ));
    replace_candidacy(ring, heap, knot, entry);
}

/// Runs the remove pass to completion, mutating `ring` in place.
///
/// This is always the first pass: it is cheap relative to refit and clears
/// out the bulk of the redundant knots before the more expensive passes run.
pub fn simplify_remove(ring: &mut KnotRing, error_max_sq: f64) {
    let mut heap: MinHeap<RemoveState> = MinHeap::with_capacity(ring.knots.len());

    for i in 0..ring.knots.len() {
        let knot = KnotIx(i);
        let k = ring.get(knot);
        if k.can_remove && !k.is_removed && !k.is_corner {
            recalculate(ring, &mut heap, knot, error_max_sq);
        }
    }

    while let Some((error_sq, r)) = heap.pop_min_with_value() {
        ring.get_mut(r.knot).heap_entry = None;

        if ring.live_count <= 2 {
            continue;
        }

        let k_prev = ring.get(r.knot).prev.unwrap();
        let k_next = ring.get(r.knot).next.unwrap();

        {
            let k = ring.get_mut(r.knot);
            k.is_removed = true;
            k.prev = None;
            k.next = None;
        }

        debug_assert!(error_sq <= error_max_sq);

        ring.get_mut(k_prev).handles[1] = r.handle_prev;
        ring.get_mut(k_next).handles[0] = r.handle_next;
        ring.get_mut(k_prev).error_sq[1] = error_sq;
        ring.get_mut(k_next).error_sq[0] = error_sq;

        ring.get_mut(k_next).prev = Some(k_prev);
        ring.get_mut(k_prev).next = Some(k_next);

        ring.live_count -= 1;

        for k_iter in [k_prev, k_next] {
            let k = ring.get(k_iter);
            if k.can_remove && !k.is_corner && k.prev.is_some() && k.next.is_some() {
                recalculate(ring, &mut heap, k_iter, error_max_sq);
            }
        }
    }
}
