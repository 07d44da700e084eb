use alloc::vec::Vec;
use core::fmt;

use chatlayout::{Edge, ItemKind, LayoutEngine};

use crate::ListKey;

/// How many siblings to remember as fallbacks when the anchored item itself is deleted.
const FALLBACK_DEPTH: usize = 16;

/// A scroll anchor that preserves visual position across a content mutation.
///
/// Captured against the committed layout before a commit, restored against the new layout
/// after it. Valid only for that one mutation cycle.
#[derive(Clone, PartialEq, Eq)]
pub struct ScrollAnchor<K> {
    pub key: K,
    pub kind: ItemKind,
    /// Which viewport edge the item is pinned to.
    pub edge: Edge,
    /// Signed distance from the viewport's `edge` to the same edge of the item
    /// (`item_edge - viewport_edge`).
    pub distance: i64,
    /// Nearest siblings in the fallback direction (previous items for a bottom anchor,
    /// next items for a top anchor), nearest first.
    pub fallback: Vec<K>,
}

impl<K: fmt::Debug> fmt::Debug for ScrollAnchor<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScrollAnchor")
            .field("key", &self.key)
            .field("edge", &self.edge)
            .field("distance", &self.distance)
            .field("fallback_len", &self.fallback.len())
            .finish()
    }
}

/// Which edge the viewport should stay pinned to across mutations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnchorPolicy {
    /// Keep the content pinned to the bottom of the visible area (chat-style). Also forces
    /// a bottom anchor whenever the content is shorter than the viewport, so short
    /// conversations don't float away from the input bar.
    pub stick_to_bottom: bool,
}

impl AnchorPolicy {
    pub fn stick_to_bottom() -> Self {
        Self {
            stick_to_bottom: true,
        }
    }
}

/// The offset correction computed by [`restore_anchor`]. The host must apply `delta` to
/// its scroll position atomically with the frame update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnchorRestore {
    /// The new (clamped) scroll offset.
    pub offset: u64,
    /// `offset` minus the pre-mutation scroll offset.
    pub delta: i64,
}

/// Captures the anchor for the item currently defining the policy's edge of the visible
/// region.
///
/// Returns `None` when there is nothing laid out to anchor to.
pub fn capture_anchor<K: ListKey + Clone>(
    engine: &LayoutEngine<K>,
    scroll_offset: u64,
    policy: AnchorPolicy,
) -> Option<ScrollAnchor<K>> {
    if engine.is_empty() {
        return None;
    }
    let view = engine.metrics().viewport.height as u64;

    if policy.stick_to_bottom {
        let viewport_bottom = scroll_offset.saturating_add(view);
        let probe = viewport_bottom.saturating_sub(1);
        let flat = engine.index_at_offset(probe)?;
        let top = engine.item_top(flat)?;
        let bottom = top.saturating_add(engine.item_height(flat)? as u64);
        Some(ScrollAnchor {
            key: engine.key_at(flat)?.clone(),
            kind: item_kind(engine, flat),
            edge: Edge::Bottom,
            distance: bottom as i64 - viewport_bottom as i64,
            fallback: fallback_keys(engine, flat, Edge::Bottom),
        })
    } else {
        let flat = engine.index_at_offset(scroll_offset)?;
        let top = engine.item_top(flat)?;
        Some(ScrollAnchor {
            key: engine.key_at(flat)?.clone(),
            kind: item_kind(engine, flat),
            edge: Edge::Top,
            distance: top as i64 - scroll_offset as i64,
            fallback: fallback_keys(engine, flat, Edge::Top),
        })
    }
}

/// Re-pins a previously captured anchor against the new layout.
///
/// When the anchored identity no longer exists, the nearest surviving sibling from the
/// captured fallback chain takes its place; when nothing survives, the viewport falls back
/// to the bottom of the content. A lost anchor is recovered here, never surfaced.
pub fn restore_anchor<K: ListKey + Clone>(
    engine: &LayoutEngine<K>,
    anchor: &ScrollAnchor<K>,
    old_offset: u64,
    policy: AnchorPolicy,
) -> AnchorRestore {
    let view = engine.metrics().viewport.height as u64;

    // Content shorter than the viewport: the bottom edge wins regardless of the capture.
    if policy.stick_to_bottom && engine.content_size().height <= view {
        return resolved(engine, 0, old_offset);
    }

    let flat = core::iter::once(&anchor.key)
        .chain(anchor.fallback.iter())
        .find_map(|key| engine.flat_index_of(key));
    let Some(flat) = flat else {
        ltrace_lost(anchor);
        return resolved(engine, engine.max_scroll_offset(), old_offset);
    };

    let top = engine.item_top(flat).unwrap_or(0);
    let height = engine.item_height(flat).unwrap_or(0) as u64;
    let target = match anchor.edge {
        Edge::Top => top as i64 - anchor.distance,
        Edge::Bottom => {
            let bottom = top.saturating_add(height);
            bottom as i64 - anchor.distance - view as i64
        }
    };
    resolved(engine, target.max(0) as u64, old_offset)
}

/// The default correction when there was nothing to anchor (e.g. the old snapshot was
/// empty): bottom of content under a bottom-stick policy, clamped old offset otherwise.
pub fn restore_default<K: ListKey + Clone>(
    engine: &LayoutEngine<K>,
    old_offset: u64,
    policy: AnchorPolicy,
) -> AnchorRestore {
    let target = if policy.stick_to_bottom {
        engine.max_scroll_offset()
    } else {
        old_offset
    };
    resolved(engine, target, old_offset)
}

fn resolved<K: ListKey + Clone>(
    engine: &LayoutEngine<K>,
    target: u64,
    old_offset: u64,
) -> AnchorRestore {
    let offset = engine.clamp_scroll_offset(target);
    AnchorRestore {
        offset,
        delta: offset as i64 - old_offset as i64,
    }
}

fn item_kind<K: ListKey + Clone>(engine: &LayoutEngine<K>, flat: usize) -> ItemKind {
    engine
        .path_at(flat)
        .and_then(|path| engine.snapshot().item_at(path))
        .map(|item| item.kind)
        .unwrap_or(ItemKind::Cell)
}

fn fallback_keys<K: ListKey + Clone>(
    engine: &LayoutEngine<K>,
    flat: usize,
    edge: Edge,
) -> Vec<K> {
    let mut keys = Vec::new();
    match edge {
        // Bottom anchors fall back upward through earlier siblings.
        Edge::Bottom => {
            let start = flat.saturating_sub(FALLBACK_DEPTH);
            for i in (start..flat).rev() {
                if let Some(key) = engine.key_at(i) {
                    keys.push(key.clone());
                }
            }
        }
        // Top anchors fall back downward through later siblings.
        Edge::Top => {
            let end = core::cmp::min(flat + 1 + FALLBACK_DEPTH, engine.item_count());
            for i in (flat + 1)..end {
                if let Some(key) = engine.key_at(i) {
                    keys.push(key.clone());
                }
            }
        }
    }
    keys
}

#[cfg(feature = "tracing")]
fn ltrace_lost<K>(anchor: &ScrollAnchor<K>) {
    tracing::trace!(
        target: "chatlayout",
        edge = ?anchor.edge,
        "anchor lost; falling back to bottom of content"
    );
}

#[cfg(not(feature = "tracing"))]
fn ltrace_lost<K>(_anchor: &ScrollAnchor<K>) {}
