//! The knot ring: an arena-backed doubly-linked list of knots.
//!
//! The original C keeps `prev`/`next` as raw pointers into a single knot
//! array; per `spec.md` §9 this is re-architected as `Option<KnotIx>` indices
//! into an arena `Vec<Knot>`, removing the aliasing concerns of the pointer
//! version without changing the algorithm. Likewise tangents, shared via a
//! single contiguous buffer in the original (with corner detection
//! re-pointing a tangent slot at a *different* knot's slice), are instead two
//! owned `Vec<f64>` per knot; corner creation copies values rather than
//! re-aliasing.

use crate::heap::NodeHandle;
use crate::vector;

/// Index of a knot within a [`KnotRing`]'s arena. Stable for the knot's
/// lifetime even after it is unlinked (`is_removed = true`); only reused
/// implicitly in the sense that a removed knot's slot may later be re-linked
/// back into the ring by the corner pass.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct KnotIx(pub usize);

pub struct Knot {
    /// Which sample supplies this knot's position.
    pub point_index: usize,

    pub prev: Option<KnotIx>,
    pub next: Option<KnotIx>,

    /// `false` for the two endpoints of an open curve.
    pub can_remove: bool,
    pub is_removed: bool,
    pub is_corner: bool,

    /// Handle lengths, signed, along `tan[0]` (incoming) / `tan[1]` (outgoing).
    pub handles: [f64; 2],

    /// Incoming / outgoing unit tangents. Equal for a smooth knot.
    pub tan: [Vec<f64>; 2],

    /// Last-known squared error of the segment incident on this side.
    pub error_sq: [f64; 2],

    /// Back-reference to this knot's entry in the active pass's heap.
    pub heap_entry: Option<NodeHandle>,
}

impl Knot {
    #[must_use]
    pub fn is_live(&self) -> bool {
        !self.is_removed
    }
}

/// Owns the knot arena plus the immutable per-curve caches every pass reads.
pub struct KnotRing {
    pub knots: Vec<Knot>,
    pub live_count: usize,
    pub dims: usize,
    /// The input samples, one owned vector per point, indexed by
    /// `Knot::point_index`. Never mutated once built.
    pub points: Vec<Vec<f64>>,
    /// `points_length_cache[i]` = distance from sample `i - 1` to sample `i`
    /// (`points_length_cache[0] == 0.0`).
    pub points_length_cache: Vec<f64>,
}

impl KnotRing {
    /// Builds the initial open-chain ring over `points_len` samples of
    /// `dims` dimensions each, with tangents estimated per `spec.md` §4.3.
    ///
    /// `points` must have length `points_len * dims`.
    pub fn new_open(points: &[f64], points_len: usize, dims: usize) -> KnotRing {
        debug_assert_eq!(points.len(), points_len * dims);

        let at = |i: usize| -> &[f64] { &points[i * dims..(i + 1) * dims] };

        let mut knots: Vec<Knot> = Vec::with_capacity(points_len);
        for i in 0..points_len {
            knots.push(Knot {
                point_index: i,
                prev: if i > 0 { Some(KnotIx(i - 1)) } else { None },
                next: if i + 1 < points_len { Some(KnotIx(i + 1)) } else { None },
                can_remove: i != 0 && i != points_len - 1,
                is_removed: false,
                is_corner: false,
                handles: [0.0, 0.0],
                tan: [vector::zero(dims), vector::zero(dims)],
                error_sq: [0.0, 0.0],
                heap_entry: None,
            });
        }

        let owned_points: Vec<Vec<f64>> = (0..points_len).map(|i| at(i).to_vec()).collect();
        let mut points_length_cache = vec![0.0_f64; points_len];

        if points_len < 2 {
            return KnotRing {
                knots,
                live_count: points_len,
                dims,
                points: owned_points,
                points_length_cache,
            };
        }

        // Tangent at i is unit(unit(p[i-1]-p[i]) + unit(p[i]-p[i+1])); at an
        // endpoint the missing side contributes a zero vector (spec.md §4.3).
        for i in 0..points_len {
            let a = if i > 0 {
                let mut v = vector::sub(at(i - 1), at(i));
                vector::normalize_in_place(&mut v);
                v
            } else {
                vector::zero(dims)
            };
            let b = if i + 1 < points_len {
                let mut v = vector::sub(at(i), at(i + 1));
                vector::normalize_in_place(&mut v);
                v
            } else {
                vector::zero(dims)
            };

            let mut t = vector::add(&a, &b);
            let t_len = vector::normalize_in_place(&mut t);
            if t_len == 0.0 {
                log::warn!("knot {i}: initial tangent degenerate (neighbors cancel)");
            }

            knots[i].tan[0] = t.clone();
            knots[i].tan[1] = t;

            if i > 0 {
                points_length_cache[i] = vector::len_between(at(i - 1), at(i));
            }
        }

        // Seed handle lengths at 1/3 of the adjacent segment length, matching
        // the teacher's initial cubic guess before any fit has run.
        for i in 0..points_len {
            let len_prev = if i > 0 { points_length_cache[i] } else { 0.0 };
            let len_next = if i + 1 < points_len { points_length_cache[i + 1] } else { 0.0 };
            knots[i].handles[0] = len_prev / 3.0;
            knots[i].handles[1] = len_next / -3.0;
        }

        KnotRing {
            knots,
            live_count: points_len,
            dims,
            points: owned_points,
            points_length_cache,
        }
    }

    #[must_use]
    pub fn get(&self, ix: KnotIx) -> &Knot {
        &self.knots[ix.0]
    }

    #[must_use]
    pub fn get_mut(&mut self, ix: KnotIx) -> &mut Knot {
        &mut self.knots[ix.0]
    }

    /// Returns the index of the first live knot (the open curve's start).
    #[must_use]
    pub fn first_live(&self) -> KnotIx {
        let ix = self
            .knots
            .iter()
            .position(|k| k.is_live())
            .expect("a curve with points_len > 0 always has a live knot");
        KnotIx(ix)
    }
}
