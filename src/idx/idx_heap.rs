use std::fmt::{Debug, Formatter};

use rand::Rng;

use super::Idx;

/// Binary max-heap over key newtypes with an external priority order.
///
/// The order is supplied per call as `before(a, b)` ("a ranks above b"),
/// so the heap itself stores no priorities and the caller can key it off
/// whatever activity table is current. Positions are tracked per key,
/// which makes `contains` and targeted sift operations O(1)/O(log n).
pub struct IdxHeap<K: Idx> {
    heap: Vec<K>,
    index: Vec<i32>, // position in `heap`, or -1
}

impl<K: Idx> IdxHeap<K> {
    pub const fn new() -> Self {
        Self {
            heap: Vec::new(),
            index: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, k: &K) -> bool {
        k.idx() < self.index.len() && self.index[k.idx()] >= 0
    }

    pub fn clear(&mut self) {
        for &k in &self.heap {
            self.index[k.idx()] = -1;
        }
        self.heap.clear();
    }

    pub fn peek(&self) -> Option<&K> {
        self.heap.first()
    }

    /// A uniformly random element, for randomized branching.
    pub fn random_element<R: Rng>(&self, rng: &mut R) -> Option<&K> {
        if self.heap.is_empty() {
            None
        } else {
            Some(&self.heap[rng.gen_range(0..self.heap.len())])
        }
    }

    pub fn insert_by<F>(&mut self, k: K, before: F)
    where
        F: Fn(&K, &K) -> bool,
    {
        if self.contains(&k) {
            return;
        }
        if k.idx() >= self.index.len() {
            self.index.resize(k.idx() + 1, -1);
        }
        self.index[k.idx()] = self.heap.len() as i32;
        self.heap.push(k);
        self.sift_up(self.heap.len() - 1, &before);
    }

    pub fn remove_top_by<F>(&mut self, before: F) -> Option<K>
    where
        F: Fn(&K, &K) -> bool,
    {
        if self.heap.is_empty() {
            return None;
        }
        let top = self.heap.swap_remove(0);
        self.index[top.idx()] = -1;
        if !self.heap.is_empty() {
            self.index[self.heap[0].idx()] = 0;
            self.sift_down(0, &before);
        }
        Some(top)
    }

    /// Re-seat `k` after its priority rose.
    pub fn raise_by<F>(&mut self, k: K, before: F)
    where
        F: Fn(&K, &K) -> bool,
    {
        debug_assert!(self.contains(&k));
        self.sift_up(self.index[k.idx()] as usize, &before);
    }

    /// Re-seat `k` after its priority fell.
    pub fn lower_by<F>(&mut self, k: K, before: F)
    where
        F: Fn(&K, &K) -> bool,
    {
        debug_assert!(self.contains(&k));
        self.sift_down(self.index[k.idx()] as usize, &before);
    }

    /// Re-seat `k` after an arbitrary priority change.
    pub fn update_by<F>(&mut self, k: K, before: F)
    where
        F: Fn(&K, &K) -> bool,
    {
        debug_assert!(self.contains(&k));
        let pos = self.index[k.idx()] as usize;
        self.sift_up(pos, &before);
        self.sift_down(self.index[k.idx()] as usize, &before);
    }

    /// Replace the content wholesale and heapify.
    pub fn build_by<F>(&mut self, keys: Vec<K>, before: F)
    where
        F: Fn(&K, &K) -> bool,
    {
        self.clear();
        self.heap = keys;
        for (pos, k) in self.heap.iter().enumerate() {
            if k.idx() >= self.index.len() {
                self.index.resize(k.idx() + 1, -1);
            }
            self.index[k.idx()] = pos as i32;
        }
        for pos in (0..self.heap.len() / 2).rev() {
            self.sift_down(pos, &before);
        }
    }

    fn sift_up<F>(&mut self, mut pos: usize, before: &F)
    where
        F: Fn(&K, &K) -> bool,
    {
        let k = self.heap[pos];
        while pos > 0 {
            let parent = (pos - 1) >> 1;
            if !before(&k, &self.heap[parent]) {
                break;
            }
            self.heap[pos] = self.heap[parent];
            self.index[self.heap[pos].idx()] = pos as i32;
            pos = parent;
        }
        self.heap[pos] = k;
        self.index[k.idx()] = pos as i32;
    }

    fn sift_down<F>(&mut self, mut pos: usize, before: &F)
    where
        F: Fn(&K, &K) -> bool,
    {
        let k = self.heap[pos];
        loop {
            let left = 2 * pos + 1;
            if left >= self.heap.len() {
                break;
            }
            let right = left + 1;
            let child = if right < self.heap.len() && before(&self.heap[right], &self.heap[left]) {
                right
            } else {
                left
            };
            if !before(&self.heap[child], &k) {
                break;
            }
            self.heap[pos] = self.heap[child];
            self.index[self.heap[pos].idx()] = pos as i32;
            pos = child;
        }
        self.heap[pos] = k;
        self.index[k.idx()] = pos as i32;
    }
}

impl<K: Idx> Default for IdxHeap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Idx + Debug> Debug for IdxHeap<K> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.heap.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::var::Var;

    #[test]
    fn heap_order() {
        let act = [1.0, 5.0, 3.0, 4.0, 2.0];
        let before = |a: &Var, b: &Var| act[a.index()] > act[b.index()];
        let mut heap: IdxHeap<Var> = IdxHeap::new();
        for i in 0..5 {
            heap.insert_by(Var::new(i), before);
        }
        let mut popped = Vec::new();
        while let Some(v) = heap.remove_top_by(before) {
            popped.push(v.index());
        }
        assert_eq!(popped, vec![1, 3, 2, 4, 0]);
    }
}
