use alloc::vec::Vec;
use core::cmp;

use crate::fenwick::Fenwick;
use crate::key::{KeyMap, StableKey};
use crate::snapshot::{Snapshot, SnapshotError};
use crate::types::{
    Alignment, Frame, IndexPath, Insets, ItemKey, ItemKind, Size, Viewport,
};

/// Viewport geometry and spacing rules the layout is computed against.
///
/// Changing the metrics invalidates every derived frame; changing content only shifts the
/// affected suffix (see [`LayoutEngine::apply_measurement`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutMetrics {
    pub viewport: Viewport,
    pub insets: Insets,
    /// Base spacing between consecutive items; per-item `spacing_before` overrides it.
    pub spacing: u32,
    /// When set, a zero-height item contributes no spacing before the following item.
    pub collapse_zero_height_spacing: bool,
}

impl LayoutMetrics {
    pub fn new(viewport: Viewport) -> Self {
        Self {
            viewport,
            insets: Insets::default(),
            spacing: 0,
            collapse_zero_height_spacing: false,
        }
    }

    pub fn with_insets(mut self, insets: Insets) -> Self {
        self.insets = insets;
        self
    }

    pub fn with_spacing(mut self, spacing: u32) -> Self {
        self.spacing = spacing;
        self
    }

    pub fn with_collapse_zero_height_spacing(mut self, collapse: bool) -> Self {
        self.collapse_zero_height_spacing = collapse;
        self
    }

    /// Width available to laid-out items (viewport minus horizontal insets).
    pub fn content_width(&self) -> u32 {
        self.viewport
            .width
            .saturating_sub(self.insets.leading)
            .saturating_sub(self.insets.trailing)
    }
}

/// A computed per-item frame plus the carried-through metadata the host needs to render
/// without recomputation. Derived, fully recomputable; never independently mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayoutAttributes<K = ItemKey> {
    pub key: K,
    pub path: IndexPath,
    pub kind: ItemKind,
    pub alignment: Alignment,
    pub frame: Frame,
}

/// Computes and caches item frames for the committed snapshot.
///
/// The engine keeps a flat view of the snapshot (layout order), per-item heights seeded
/// from the sizing descriptors and refined by keyed measurements, and a Fenwick tree of
/// per-item advances for O(log n) offset queries and point updates.
#[derive(Clone, Debug)]
pub struct LayoutEngine<K = ItemKey> {
    metrics: LayoutMetrics,
    snapshot: Snapshot<K>,

    paths: Vec<IndexPath>,
    heights: Vec<u32>,
    measured: Vec<bool>,
    spacing_before: Vec<u32>, // resolved override-or-base, index 0 unused
    advances: Fenwick,
    index_of: KeyMap<K, usize>,

    measured_heights: KeyMap<K, u32>,
}

impl<K: StableKey + Clone> LayoutEngine<K> {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            snapshot: Snapshot::empty(),
            paths: Vec::new(),
            heights: Vec::new(),
            measured: Vec::new(),
            spacing_before: Vec::new(),
            advances: Fenwick::new(),
            index_of: KeyMap::new(),
            measured_heights: KeyMap::new(),
        }
    }

    pub fn with_snapshot(
        metrics: LayoutMetrics,
        snapshot: Snapshot<K>,
    ) -> Result<Self, SnapshotError> {
        let mut engine = Self::new(metrics);
        engine.commit(snapshot)?;
        Ok(engine)
    }

    pub fn metrics(&self) -> &LayoutMetrics {
        &self.metrics
    }

    /// Replaces the viewport metrics and relays out everything.
    pub fn set_metrics(&mut self, metrics: LayoutMetrics) {
        if self.metrics == metrics {
            return;
        }
        self.metrics = metrics;
        self.rebuild();
    }

    pub fn snapshot(&self) -> &Snapshot<K> {
        &self.snapshot
    }

    /// Swaps in a new committed snapshot and relays out everything.
    ///
    /// Measured heights are keyed by item identity, so measurements survive reorders,
    /// prepends, and section restructuring across commits.
    pub fn commit(&mut self, snapshot: Snapshot<K>) -> Result<(), SnapshotError> {
        snapshot.validate()?;
        self.snapshot = snapshot;
        self.rebuild();
        Ok(())
    }

    fn rebuild(&mut self) {
        let count = self.snapshot.item_count();
        ldebug!(
            count,
            cached = self.measured_heights.len(),
            "LayoutEngine::rebuild"
        );
        self.paths.clear();
        self.heights.clear();
        self.measured.clear();
        self.spacing_before.clear();
        self.index_of.clear();
        self.paths.reserve_exact(count);
        self.heights.reserve_exact(count);
        self.measured.reserve_exact(count);
        self.spacing_before.reserve_exact(count);

        for (s, section) in self.snapshot.sections.iter().enumerate() {
            for (i, item) in section.items.iter().enumerate() {
                let flat = self.paths.len();
                self.paths.push(IndexPath::new(s, i));
                self.index_of.insert(item.key.clone(), flat);
                if let Some(&h) = self.measured_heights.get(&item.key) {
                    self.heights.push(h);
                    self.measured.push(true);
                } else {
                    self.heights.push(item.height.value());
                    self.measured.push(false);
                }
                self.spacing_before
                    .push(item.spacing_before.unwrap_or(self.metrics.spacing));
            }
        }

        let values: Vec<u64> = (0..count).map(|i| self.advance_for(i)).collect();
        self.advances = Fenwick::from_values(&values);
    }

    /// Per-item advance: own height plus the spacing separating it from the next item.
    fn advance_for(&self, index: usize) -> u64 {
        let height = self.heights[index] as u64;
        if index + 1 >= self.heights.len() {
            return height;
        }
        if self.metrics.collapse_zero_height_spacing && self.heights[index] == 0 {
            return height;
        }
        height.saturating_add(self.spacing_before[index + 1] as u64)
    }

    pub fn item_count(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Records a measured height for an item, keyed by identity.
    ///
    /// Only the item's own advance changes; every following offset shifts by the returned
    /// delta through the prefix sums, without a top-down relayout. Returns 0 when the
    /// measurement matches the current height. A key with no laid-out item is cached for
    /// the next commit.
    pub fn apply_measurement(&mut self, key: &K, height: u32) -> i64 {
        self.measured_heights.insert(key.clone(), height);
        let Some(&flat) = self.index_of.get(key) else {
            return 0;
        };
        let old_advance = self.advance_for(flat) as i64;
        let cur = self.heights[flat];
        self.heights[flat] = height;
        self.measured[flat] = true;
        if cur == height {
            return 0;
        }
        let delta = self.advance_for(flat) as i64 - old_advance;
        ltrace!(flat, height, delta, "apply_measurement");
        self.advances.add(flat, delta);
        delta
    }

    /// Applies a batch of measurements; returns the accumulated content delta.
    pub fn apply_measurements<'a>(
        &mut self,
        measurements: impl IntoIterator<Item = (&'a K, u32)>,
    ) -> i64
    where
        K: 'a,
    {
        let mut total = 0i64;
        for (key, height) in measurements {
            total += self.apply_measurement(key, height);
        }
        total
    }

    pub fn is_measured(&self, key: &K) -> bool {
        self.index_of
            .get(key)
            .is_some_and(|&flat| self.measured[flat])
    }

    /// Drops every cached measurement and falls back to the sizing estimates.
    pub fn reset_measurements(&mut self) {
        self.measured_heights.clear();
        self.rebuild();
    }

    pub fn measurement_cache_len(&self) -> usize {
        self.measured_heights.len()
    }

    pub fn content_size(&self) -> Size {
        Size {
            width: self.metrics.viewport.width,
            height: (self.metrics.insets.top as u64)
                .saturating_add(self.advances.total())
                .saturating_add(self.metrics.insets.bottom as u64),
        }
    }

    pub fn max_scroll_offset(&self) -> u64 {
        self.content_size()
            .height
            .saturating_sub(self.metrics.viewport.height as u64)
    }

    pub fn clamp_scroll_offset(&self, offset: u64) -> u64 {
        offset.min(self.max_scroll_offset())
    }

    /// Unfilled viewport space below the content, when the content is shorter than the
    /// viewport. Hosts use this to keep short conversations pinned to the bottom.
    pub fn bottom_slack(&self) -> u64 {
        (self.metrics.viewport.height as u64).saturating_sub(self.content_size().height)
    }

    pub fn flat_index_of(&self, key: &K) -> Option<usize> {
        self.index_of.get(key).copied()
    }

    pub fn path_at(&self, flat: usize) -> Option<IndexPath> {
        self.paths.get(flat).copied()
    }

    pub fn key_at(&self, flat: usize) -> Option<&K> {
        let path = self.paths.get(flat)?;
        Some(&self.snapshot.sections[path.section].items[path.item].key)
    }

    pub fn item_top(&self, flat: usize) -> Option<u64> {
        (flat < self.paths.len()).then(|| {
            (self.metrics.insets.top as u64).saturating_add(self.advances.prefix_sum(flat))
        })
    }

    pub fn item_height(&self, flat: usize) -> Option<u32> {
        self.heights.get(flat).copied()
    }

    pub fn item_frame(&self, flat: usize) -> Option<Frame> {
        let y = self.item_top(flat)?;
        Some(self.frame_at(flat, y))
    }

    fn frame_at(&self, flat: usize, y: u64) -> Frame {
        let path = self.paths[flat];
        let item = &self.snapshot.sections[path.section].items[path.item];
        let content_width = self.metrics.content_width();
        let leading = self.metrics.insets.leading;
        let width = match item.alignment {
            Alignment::FullWidth => content_width,
            _ => cmp::min(item.width.unwrap_or(content_width), content_width),
        };
        let x = match item.alignment {
            Alignment::FullWidth | Alignment::Leading => leading,
            Alignment::Trailing => leading.saturating_add(content_width - width),
            Alignment::Center => leading.saturating_add((content_width - width) / 2),
        };
        Frame {
            x,
            y,
            width,
            height: self.heights[flat],
        }
    }

    /// Maps a scroll-axis offset to the flat index of the item containing it (clamped to
    /// the last item).
    pub fn index_at_offset(&self, offset: u64) -> Option<usize> {
        let count = self.paths.len();
        if count == 0 {
            return None;
        }
        let top = self.metrics.insets.top as u64;
        if offset < top {
            return Some(0);
        }
        let consumed = self.advances.lower_bound(offset - top);
        Some(consumed.min(count - 1))
    }

    /// The half-open flat-index range visible at `scroll_offset`.
    pub fn visible_range(&self, scroll_offset: u64) -> (usize, usize) {
        let count = self.paths.len();
        let view = self.metrics.viewport.height as u64;
        if count == 0 || view == 0 {
            return (0, 0);
        }

        let total = self.content_size().height;
        let offset = scroll_offset.min(self.max_scroll_offset());
        if offset >= total {
            return (count, count);
        }
        let end_inclusive = offset.saturating_add(view).saturating_sub(1);

        let start = self.index_at_offset(offset).unwrap_or(count);
        let end = self
            .index_at_offset(cmp::max(end_inclusive, offset))
            .map(|i| i + 1)
            .unwrap_or(count);
        (start.min(count), end.min(count))
    }

    /// Visits every item's layout attributes in order, walking offsets incrementally.
    pub fn for_each_attributes(&self, f: impl FnMut(LayoutAttributes<K>)) {
        self.for_each_attributes_range(0, self.paths.len(), f);
    }

    /// Visits only the attributes of items visible at `scroll_offset` ("isolated"
    /// processing).
    pub fn for_each_attributes_in(&self, scroll_offset: u64, f: impl FnMut(LayoutAttributes<K>)) {
        let (start, end) = self.visible_range(scroll_offset);
        self.for_each_attributes_range(start, end, f);
    }

    fn for_each_attributes_range(
        &self,
        start: usize,
        end: usize,
        mut f: impl FnMut(LayoutAttributes<K>),
    ) {
        let end = cmp::min(end, self.paths.len());
        if start >= end {
            return;
        }
        let mut y = (self.metrics.insets.top as u64).saturating_add(self.advances.prefix_sum(start));
        for flat in start..end {
            let path = self.paths[flat];
            let item = &self.snapshot.sections[path.section].items[path.item];
            f(LayoutAttributes {
                key: item.key.clone(),
                path,
                kind: item.kind,
                alignment: item.alignment,
                frame: self.frame_at(flat, y),
            });
            y = y.saturating_add(self.advance_for(flat));
        }
    }

    /// Collects every item's attributes (clears `out` first).
    pub fn collect_attributes(&self, out: &mut Vec<LayoutAttributes<K>>) {
        out.clear();
        self.for_each_attributes(|a| out.push(a));
    }

    /// Collects the attributes visible at `scroll_offset` (clears `out` first).
    pub fn collect_attributes_in(&self, scroll_offset: u64, out: &mut Vec<LayoutAttributes<K>>) {
        out.clear();
        self.for_each_attributes_in(scroll_offset, |a| out.push(a));
    }

    /// Convenience wrapper around [`Self::collect_attributes`].
    pub fn attributes(&self) -> Vec<LayoutAttributes<K>> {
        let mut out = Vec::new();
        self.collect_attributes(&mut out);
        out
    }

    /// Convenience wrapper around [`Self::collect_attributes_in`].
    pub fn attributes_in(&self, scroll_offset: u64) -> Vec<LayoutAttributes<K>> {
        let mut out = Vec::new();
        self.collect_attributes_in(scroll_offset, &mut out);
        out
    }
}
