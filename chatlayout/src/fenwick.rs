use alloc::vec::Vec;
use core::cmp;

/// Prefix sums over per-item advances (height + effective spacing-after).
///
/// The layout resolves spacing rules up front, so the tree only sees opaque `u64` values.
#[derive(Clone, Debug)]
pub(crate) struct Fenwick {
    tree: Vec<u64>, // 1-indexed
    total: u64,
    max_bit: usize,
}

impl Fenwick {
    pub(crate) fn new() -> Self {
        Self {
            tree: alloc::vec![0],
            total: 0,
            max_bit: 0,
        }
    }

    pub(crate) fn from_values(values: &[u64]) -> Self {
        let n = values.len();
        let mut tree = alloc::vec![0u64; n + 1];
        let mut total = 0u64;
        for i in 1..=n {
            let v = values[i - 1];
            total = total.saturating_add(v);
            tree[i] = tree[i].saturating_add(v);
            let j = i + lsb(i);
            if j <= n {
                tree[j] = tree[j].saturating_add(tree[i]);
            }
        }
        Self {
            tree,
            total,
            max_bit: highest_power_of_two_leq(n),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.tree.len() - 1
    }

    pub(crate) fn add(&mut self, index: usize, delta: i64) {
        let n = self.len();
        if index >= n || delta == 0 {
            return;
        }
        if delta > 0 {
            self.total = self.total.saturating_add(delta as u64);
        } else {
            self.total = self.total.saturating_sub(delta.unsigned_abs());
        }
        let mut i = index + 1;
        while i <= n {
            let cur = self.tree[i] as i128;
            let next = cur + delta as i128;
            debug_assert!(
                next >= 0,
                "Fenwick underflow (idx={i}, cur={cur}, delta={delta})"
            );
            self.tree[i] = next.clamp(0, u64::MAX as i128) as u64;
            i += lsb(i);
        }
    }

    pub(crate) fn prefix_sum(&self, count: usize) -> u64 {
        let mut i = cmp::min(count, self.len());
        let mut sum = 0u64;
        while i > 0 {
            sum = sum.saturating_add(self.tree[i]);
            i &= i - 1;
        }
        sum
    }

    pub(crate) fn total(&self) -> u64 {
        self.total
    }

    /// Returns the number of items whose prefix sum is <= `target`.
    ///
    /// Maps a scroll-axis offset to the index of the item containing it (clamped by the
    /// caller).
    pub(crate) fn lower_bound(&self, mut target: u64) -> usize {
        let n = self.len();
        if n == 0 {
            return 0;
        }

        let mut idx = 0usize;
        let mut bit = self.max_bit;
        while bit != 0 {
            let next = idx + bit;
            if next <= n && self.tree[next] <= target {
                target -= self.tree[next];
                idx = next;
            }
            bit >>= 1;
        }
        idx
    }
}

fn lsb(i: usize) -> usize {
    i & i.wrapping_neg()
}

fn highest_power_of_two_leq(n: usize) -> usize {
    if n == 0 {
        return 0;
    }
    let mut p = 1usize;
    while p <= n / 2 {
        p <<= 1;
    }
    p
}
