use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;

use chatlayout::{
    ChangeSet, ItemKey, LayoutAttributes, LayoutEngine, LayoutMetrics, Size, Snapshot,
    SnapshotError, diff,
};

use crate::anchor::{AnchorPolicy, capture_anchor, restore_anchor, restore_default};
use crate::ListKey;

/// The commit state machine. At most one structural update is in flight at a time;
/// requests arriving while not `Idle` are queued in submission order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommitState {
    #[default]
    Idle,
    /// An incremental change-set is being applied with animation.
    ApplyingAnimated,
    /// An incremental change-set restricted to visible items is being applied.
    ApplyingIsolated,
    /// The incremental path was discarded; a full relayout with explicit anchor
    /// restoration is being applied instead.
    Interrupted,
}

/// One content mutation submitted by the host.
#[derive(Clone, Debug)]
pub struct UpdateRequest<K = ItemKey> {
    pub snapshot: Snapshot<K>,
    pub animated: bool,
    /// Restrict the returned attributes to currently visible items.
    pub isolated: bool,
}

impl<K> UpdateRequest<K> {
    pub fn new(snapshot: Snapshot<K>) -> Self {
        Self {
            snapshot,
            animated: true,
            isolated: false,
        }
    }

    pub fn with_animated(mut self, animated: bool) -> Self {
        self.animated = animated;
        self
    }

    pub fn with_isolated(mut self, isolated: bool) -> Self {
        self.isolated = isolated;
        self
    }
}

/// Everything the host needs to apply one committed update: the edit script, the final
/// frames, the new content size, and the offset correction to apply atomically with them.
#[derive(Clone, Debug)]
pub struct UpdateOutcome<K = ItemKey> {
    pub generation: u64,
    pub changes: ChangeSet<K>,
    pub attributes: Vec<LayoutAttributes<K>>,
    pub content_size: Size,
    pub offset_delta: i64,
    pub animated: bool,
    /// The change-set was too structurally complex to animate; this outcome is a full
    /// reload with an explicit anchor restoration.
    pub interrupted: bool,
}

/// Fired once a submitted update's visual effects are fully applied. The argument is the
/// finished generation.
pub type CompletionCallback = Arc<dyn Fn(u64) + Send + Sync>;

/// A framework-neutral controller implementing the core-to-host commit protocol.
///
/// It owns the committed snapshot (via the [`LayoutEngine`]), serializes mutation
/// requests through the [`CommitState`] machine, and pairs every commit with a scroll
/// anchor capture/restore so the viewport stays visually pinned.
///
/// Hosts drive it with:
/// - `submit_update` whenever upstream content changes
/// - `complete_update` once the returned outcome's visual effects have been applied
/// - `on_scroll` / `set_viewport` as UI events arrive
#[derive(Clone)]
pub struct Controller<K = ItemKey> {
    engine: LayoutEngine<K>,
    policy: AnchorPolicy,
    /// Any section insertion forces the interrupted full-reload path. Kept as a policy
    /// knob; tune per deployment if animated section insertions turn out to be safe.
    interrupt_on_section_insert: bool,
    state: CommitState,
    queue: VecDeque<UpdateRequest<K>>,
    attached: bool,
    scroll_offset: u64,
    generation: u64,
    on_complete: Option<CompletionCallback>,
}

impl<K: fmt::Debug> fmt::Debug for Controller<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("attached", &self.attached)
            .field("scroll_offset", &self.scroll_offset)
            .field("generation", &self.generation)
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl<K: ListKey + Clone> Controller<K> {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            engine: LayoutEngine::new(metrics),
            policy: AnchorPolicy::default(),
            interrupt_on_section_insert: true,
            state: CommitState::Idle,
            queue: VecDeque::new(),
            attached: false,
            scroll_offset: 0,
            generation: 0,
            on_complete: None,
        }
    }

    pub fn with_policy(mut self, policy: AnchorPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_interrupt_on_section_insert(mut self, interrupt: bool) -> Self {
        self.interrupt_on_section_insert = interrupt;
        self
    }

    pub fn set_on_complete(
        &mut self,
        on_complete: Option<impl Fn(u64) + Send + Sync + 'static>,
    ) {
        self.on_complete = on_complete.map(|f| Arc::new(f) as _);
    }

    pub fn engine(&self) -> &LayoutEngine<K> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LayoutEngine<K> {
        &mut self.engine
    }

    pub fn policy(&self) -> AnchorPolicy {
        self.policy
    }

    pub fn state(&self) -> CommitState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CommitState::Idle
    }

    pub fn pending_updates(&self) -> usize {
        self.queue.len()
    }

    pub fn scroll_offset(&self) -> u64 {
        self.scroll_offset
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Attaches to a rendering surface and lays out whatever content was stored while
    /// detached. Returns the initial full outcome.
    pub fn attach(&mut self) -> UpdateOutcome<K> {
        self.attached = true;
        self.generation += 1;
        let restore = restore_default(&self.engine, self.scroll_offset, self.policy);
        self.scroll_offset = restore.offset;
        UpdateOutcome {
            generation: self.generation,
            changes: ChangeSet::new(),
            attributes: self.engine.attributes(),
            content_size: self.engine.content_size(),
            offset_delta: restore.delta,
            animated: false,
            interrupted: false,
        }
    }

    pub fn detach(&mut self) {
        self.attached = false;
    }

    /// Call this when the UI reports a scroll offset change (e.g. user wheel/drag).
    pub fn on_scroll(&mut self, offset: u64) {
        self.scroll_offset = self.engine.clamp_scroll_offset(offset);
    }

    /// Applies new viewport metrics, relays out everything, and re-clamps the offset.
    pub fn set_metrics(&mut self, metrics: LayoutMetrics) {
        self.engine.set_metrics(metrics);
        self.scroll_offset = self.engine.clamp_scroll_offset(self.scroll_offset);
    }

    /// Submits a new content snapshot.
    ///
    /// - Detached: the snapshot is validated and adopted synchronously with no layout
    ///   pass; it is picked up on the next `attach`. Returns `Ok(None)`.
    /// - Busy (state is not `Idle`): the request is queued FIFO and re-attempted from
    ///   `complete_update`. Returns `Ok(None)`.
    /// - Otherwise the update runs now and its outcome is returned.
    pub fn submit_update(
        &mut self,
        request: UpdateRequest<K>,
    ) -> Result<Option<UpdateOutcome<K>>, SnapshotError> {
        if !self.attached {
            self.engine.commit(request.snapshot)?;
            return Ok(None);
        }
        if self.state != CommitState::Idle {
            self.queue.push_back(request);
            return Ok(None);
        }
        self.perform(request).map(Some)
    }

    /// Signals that the last outcome's visual effects are fully applied.
    ///
    /// Returns to `Idle`, fires the completion callback, and re-evaluates the queue in
    /// submission order: if a queued request produced visual work, its outcome is
    /// returned (and the controller is busy again until the next `complete_update`).
    pub fn complete_update(&mut self) -> Result<Option<UpdateOutcome<K>>, SnapshotError> {
        if self.state == CommitState::Idle {
            return Ok(None);
        }
        self.state = CommitState::Idle;
        if let Some(cb) = &self.on_complete {
            cb(self.generation);
        }
        while let Some(next) = self.queue.pop_front() {
            let outcome = self.perform(next)?;
            if self.state != CommitState::Idle {
                return Ok(Some(outcome));
            }
            // Empty change-set: completed immediately, keep draining.
        }
        Ok(None)
    }

    /// Records a measured item height.
    ///
    /// When the resized item lies above the current scroll offset, the offset is adjusted
    /// by the content delta so the visible region does not jump. Returns the adjustment
    /// applied (0 when none was needed).
    pub fn apply_measurement(&mut self, key: &K, height: u32) -> i64 {
        let top = self
            .engine
            .flat_index_of(key)
            .and_then(|flat| self.engine.item_top(flat));
        let delta = self.engine.apply_measurement(key, height);
        if delta == 0 {
            return 0;
        }
        let adjust = top.is_some_and(|top| top < self.scroll_offset);
        if !adjust {
            return 0;
        }
        if delta > 0 {
            self.scroll_offset = self.scroll_offset.saturating_add(delta as u64);
        } else {
            self.scroll_offset = self.scroll_offset.saturating_sub(delta.unsigned_abs());
        }
        delta
    }

    fn perform(&mut self, request: UpdateRequest<K>) -> Result<UpdateOutcome<K>, SnapshotError> {
        let changes = diff(self.engine.snapshot(), &request.snapshot)?;
        self.generation += 1;
        let generation = self.generation;

        if changes.is_empty() {
            // No visual work; completion is immediate and the state machine never leaves
            // Idle.
            if let Some(cb) = &self.on_complete {
                cb(generation);
            }
            return Ok(UpdateOutcome {
                generation,
                changes,
                attributes: Vec::new(),
                content_size: self.engine.content_size(),
                offset_delta: 0,
                animated: false,
                interrupted: false,
            });
        }

        let interrupted =
            self.interrupt_on_section_insert && !changes.section_inserts.is_empty();
        #[cfg(feature = "tracing")]
        if interrupted {
            tracing::info!(
                target: "chatlayout",
                generation,
                section_inserts = changes.section_inserts.len(),
                "interrupting animated update; applying as full reload"
            );
        }

        let anchor = capture_anchor(&self.engine, self.scroll_offset, self.policy);
        self.engine.commit(request.snapshot)?;
        let restore = match &anchor {
            Some(anchor) => {
                restore_anchor(&self.engine, anchor, self.scroll_offset, self.policy)
            }
            None => restore_default(&self.engine, self.scroll_offset, self.policy),
        };
        self.scroll_offset = restore.offset;

        let attributes = if request.isolated && !interrupted {
            self.engine.attributes_in(self.scroll_offset)
        } else {
            self.engine.attributes()
        };

        self.state = if interrupted {
            CommitState::Interrupted
        } else if request.isolated {
            CommitState::ApplyingIsolated
        } else {
            CommitState::ApplyingAnimated
        };

        Ok(UpdateOutcome {
            generation,
            changes,
            attributes,
            content_size: self.engine.content_size(),
            offset_delta: restore.delta,
            animated: request.animated && !interrupted,
            interrupted,
        })
    }
}
