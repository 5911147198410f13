//! An indexed binary min-heap.
//!
//! This differs from `std::collections::BinaryHeap` in that any entry can be
//! removed out of heap order via a stable [`NodeHandle`], which is what lets
//! a pass invalidate a knot's pending candidacy when an adjacent removal or
//! insertion changes its fit error. Ported from the teacher crate's
//! `min_heap` module (declared in `lib.rs` but not present in the retrieved
//! pack; reconstructed here from the identical module in the sibling
//! `raster-retrace` example the teacher is descended from) and adapted to
//! carry an `f64` priority directly rather than a generic `PartialOrd` key,
//! since every pass in this crate keys on squared error.

const INVALID: usize = usize::MAX;

/// Opaque handle into the heap's node pool. Invalidated by `pop_min`/`remove`.
#[derive(PartialEq, Eq, Debug, Copy, Clone)]
pub struct NodeHandle(usize);

impl NodeHandle {
    pub const INVALID: NodeHandle = NodeHandle(INVALID);

    #[must_use]
    pub fn is_valid(self) -> bool {
        self.0 != INVALID
    }
}

struct Node<TData: Copy> {
    value: f64,
    user_data: TData,
    /// Index into `MinHeap.tree_index`; doubles as a free-list link when unused.
    index: usize,
}

pub struct MinHeap<TData: Copy> {
    /// Index into `node`, ordered as a binary heap.
    tree_index: Vec<usize>,
    /// Node storage; unused slots are chained through `free`.
    node: Vec<Node<TData>>,
    free: usize,
}

#[inline]
fn bin_parent(i: usize) -> usize {
    (i - 1) >> 1
}

#[inline]
fn bin_left(i: usize) -> usize {
    (i << 1) + 1
}

#[inline]
fn bin_right(i: usize) -> usize {
    (i << 1) + 2
}

impl<TData: Copy> Default for MinHeap<TData> {
    fn default() -> Self {
        Self::new()
    }
}

impl<TData: Copy> MinHeap<TData> {
    #[must_use]
    pub fn new() -> Self {
        MinHeap {
            tree_index: Vec::new(),
            node: Vec::new(),
            free: INVALID,
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        MinHeap {
            tree_index: Vec::with_capacity(capacity),
            node: Vec::with_capacity(capacity),
            free: INVALID,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree_index.is_empty()
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.tree_index.len()
    }

    /// The smallest value currently in the heap, if any.
    #[must_use]
    pub fn peek_value(&self) -> Option<f64> {
        self.tree_index.first().map(|&n| self.node[n].value)
    }

    fn tree(&self, i: usize) -> &Node<TData> {
        &self.node[self.tree_index[i]]
    }

    fn heap_compare(&self, i: usize, j: usize) -> bool {
        self.tree(i).value < self.tree(j).value
    }

    fn heap_swap(&mut self, i: usize, j: usize) {
        self.tree_index.swap(i, j);
        let i_node = self.tree_index[i];
        let j_node = self.tree_index[j];
        let t = self.node[i_node].index;
        self.node[i_node].index = self.node[j_node].index;
        self.node[j_node].index = t;
    }

    fn heap_down(&mut self, mut i: usize) {
        let size = self.tree_index.len();
        loop {
            let l = bin_left(i);
            let r = bin_right(i);

            let mut smallest = if l < size && self.heap_compare(l, i) { l } else { i };
            if r < size && self.heap_compare(r, smallest) {
                smallest = r;
            }
            if smallest == i {
                break;
            }
            self.heap_swap(i, smallest);
            i = smallest;
        }
    }

    fn heap_up(&mut self, mut i: usize) {
        while i > 0 {
            let p = bin_parent(i);
            if self.heap_compare(p, i) {
                break;
            }
            self.heap_swap(p, i);
            i = p;
        }
    }

    fn node_take(&mut self, node_data: Node<TData>) -> NodeHandle {
        if self.free == INVALID {
            let handle = self.node.len();
            self.node.push(node_data);
            NodeHandle(handle)
        } else {
            let handle = self.free;
            let node = &mut self.node[handle];
            self.free = node.index;
            *node = node_data;
            NodeHandle(handle)
        }
    }

    fn node_drop(&mut self, free_node: usize) -> TData {
        let node = &mut self.node[free_node];
        let user_data = node.user_data;
        node.index = self.free;
        self.free = free_node;
        user_data
    }

    /// Inserts `user_data` keyed on `value`, returning a handle stable until
    /// the entry is popped or removed.
    pub fn insert(&mut self, value: f64, user_data: TData) -> NodeHandle {
        let handle = self.node_take(Node {
            user_data,
            value,
            index: self.tree_index.len(),
        });
        self.tree_index.push(handle.0);
        let index = self.tree_index.len() - 1;
        self.heap_up(index);
        handle
    }

    /// Removes and returns the minimum entry's payload.
    pub fn pop_min(&mut self) -> Option<TData> {
        self.pop_min_with_value().map(|(_, data)| data)
    }

    /// Removes and returns the minimum entry's `(value, payload)`.
    pub fn pop_min_with_value(&mut self) -> Option<(f64, TData)> {
        if self.tree_index.is_empty() {
            return None;
        }

        let free_node = self.tree_index[0];
        let tree_index_len = self.tree_index.len() - 1;
        if tree_index_len != 0 {
            self.heap_swap(0, tree_index_len);
            self.tree_index.pop();
            self.heap_down(0);
        } else {
            self.tree_index.pop();
        }

        Some((self.node[free_node].value, self.node_drop(free_node)))
    }

    /// Removes an arbitrary entry by handle: bubble it to the root, then pop.
    pub fn remove(&mut self, handle: NodeHandle) {
        debug_assert!(!self.tree_index.is_empty());
        let mut i = self.node[handle.0].index;
        while i > 0 {
            let p = bin_parent(i);
            self.heap_swap(p, i);
            i = p;
        }
        self.pop_min();
    }
}
