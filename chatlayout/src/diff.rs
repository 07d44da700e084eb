use alloc::vec::Vec;

use crate::key::{KeyMap, StableKey};
use crate::snapshot::{Item, Section, Snapshot, SnapshotError};
use crate::types::IndexPath;

/// Replaces the item value at a source-space path.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemReload<K> {
    pub at: IndexPath,
    pub item: Item<K>,
}

/// Inserts an item at a target-space path. Carries the item so the edit script is
/// self-contained.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemInsert<K> {
    pub at: IndexPath,
    pub item: Item<K>,
}

/// Inserts a whole section (with its items) at a target-space index.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionInsert<K> {
    pub at: usize,
    pub section: Section<K>,
}

/// Moves an item from a source-space path to a target-space path. Cross-section moves are
/// legal as long as the destination section persists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ItemMove {
    pub from: IndexPath,
    pub to: IndexPath,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SectionMove {
    pub from: usize,
    pub to: usize,
}

/// A staged edit script between two snapshots.
///
/// Index spaces: reloads, deletes, and move sources are source-space; inserts and move
/// destinations are target-space. Stage order is reload → delete (descending) → insert
/// (ascending, with moved elements re-inserted carrying their captured values), so indices
/// within a stage stay valid without renumbering from prior stages.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeSet<K> {
    pub reloads: Vec<ItemReload<K>>,
    pub item_deletes: Vec<IndexPath>,
    pub section_deletes: Vec<usize>,
    pub item_inserts: Vec<ItemInsert<K>>,
    pub section_inserts: Vec<SectionInsert<K>>,
    pub item_moves: Vec<ItemMove>,
    pub section_moves: Vec<SectionMove>,
}

impl<K> Default for ChangeSet<K> {
    fn default() -> Self {
        Self {
            reloads: Vec::new(),
            item_deletes: Vec::new(),
            section_deletes: Vec::new(),
            item_inserts: Vec::new(),
            section_inserts: Vec::new(),
            item_moves: Vec::new(),
            section_moves: Vec::new(),
        }
    }
}

impl<K> ChangeSet<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when applying this change-set requires no visual work.
    pub fn is_empty(&self) -> bool {
        self.reloads.is_empty()
            && self.item_deletes.is_empty()
            && self.section_deletes.is_empty()
            && self.item_inserts.is_empty()
            && self.section_inserts.is_empty()
            && self.item_moves.is_empty()
            && self.section_moves.is_empty()
    }

    pub fn op_count(&self) -> usize {
        self.reloads.len()
            + self.item_deletes.len()
            + self.section_deletes.len()
            + self.item_inserts.len()
            + self.section_inserts.len()
            + self.item_moves.len()
            + self.section_moves.len()
    }
}

impl<K: Clone> ChangeSet<K> {
    /// Applies the stages in order to `source`, yielding the snapshot the change-set was
    /// diffed against.
    ///
    /// The indices in a change-set are only meaningful against the snapshot it was
    /// computed from; applying it to anything else is a logic error.
    pub fn apply(&self, source: &Snapshot<K>) -> Snapshot<K> {
        let mut work = source.clone();

        // Stage 1: reloads, in place at source paths.
        for reload in &self.reloads {
            work.sections[reload.at.section].items[reload.at.item] = reload.item.clone();
        }

        // Stage 2: removals, descending so earlier indices stay valid. Moved elements are
        // captured here (carrying any stage-1 reload) and re-inserted in stage 3.
        let mut moved_items: Vec<Option<Item<K>>> = Vec::new();
        moved_items.resize_with(self.item_moves.len(), || None);
        let mut item_removals: Vec<(IndexPath, Option<usize>)> = self
            .item_deletes
            .iter()
            .map(|&p| (p, None))
            .chain(
                self.item_moves
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (m.from, Some(i))),
            )
            .collect();
        item_removals.sort_by(|a, b| b.0.cmp(&a.0));
        for (path, slot) in item_removals {
            let item = work.sections[path.section].items.remove(path.item);
            if let Some(i) = slot {
                moved_items[i] = Some(item);
            }
        }

        let mut moved_sections: Vec<Option<Section<K>>> = Vec::new();
        moved_sections.resize_with(self.section_moves.len(), || None);
        let mut section_removals: Vec<(usize, Option<usize>)> = self
            .section_deletes
            .iter()
            .map(|&s| (s, None))
            .chain(
                self.section_moves
                    .iter()
                    .enumerate()
                    .map(|(i, m)| (m.from, Some(i))),
            )
            .collect();
        section_removals.sort_by(|a, b| b.0.cmp(&a.0));
        for (index, slot) in section_removals {
            let section = work.sections.remove(index);
            if let Some(i) = slot {
                moved_sections[i] = Some(section);
            }
        }

        // Stage 3: insertions, ascending in target space. Sections first so item paths can
        // land inside freshly inserted or moved sections.
        let mut section_insertions: Vec<(usize, Section<K>)> = self
            .section_inserts
            .iter()
            .map(|ins| (ins.at, ins.section.clone()))
            .collect();
        for (m, captured) in self.section_moves.iter().zip(moved_sections) {
            debug_assert!(captured.is_some(), "section move captured no value");
            if let Some(section) = captured {
                section_insertions.push((m.to, section));
            }
        }
        section_insertions.sort_by_key(|(at, _)| *at);
        for (at, section) in section_insertions {
            work.sections.insert(at, section);
        }

        let mut item_insertions: Vec<(IndexPath, Item<K>)> = self
            .item_inserts
            .iter()
            .map(|ins| (ins.at, ins.item.clone()))
            .collect();
        for (m, captured) in self.item_moves.iter().zip(moved_items) {
            debug_assert!(captured.is_some(), "item move captured no value");
            if let Some(item) = captured {
                item_insertions.push((m.to, item));
            }
        }
        item_insertions.sort_by_key(|(at, _)| *at);
        for (at, item) in item_insertions {
            work.sections[at.section].items.insert(at.item, item);
        }

        work
    }
}

/// Computes a deterministic, identity-matched edit script turning `source` into `target`.
///
/// Matching rules:
/// - elements present in both snapshots (by key) are matched; source-only elements are
///   deletions, target-only elements are insertions;
/// - matched sections whose relative order among matched sections changed become section
///   moves — a persisting section is never flattened into delete-all + insert-all;
/// - matched items that changed section, or whose relative order among the keys shared
///   with their section changed, become item moves;
/// - matched items whose value differs become reloads (recorded at the source path; a
///   reload composes with a move when both apply).
///
/// Pure function of two valid snapshots; `diff(a, a)` is empty.
pub fn diff<K: StableKey + Clone>(
    source: &Snapshot<K>,
    target: &Snapshot<K>,
) -> Result<ChangeSet<K>, SnapshotError> {
    source.validate()?;
    target.validate()?;

    let mut cs = ChangeSet::new();

    let mut src_sec_idx = KeyMap::<&K, usize>::new();
    for (s, section) in source.sections.iter().enumerate() {
        src_sec_idx.insert(&section.key, s);
    }
    let mut tgt_sec_idx = KeyMap::<&K, usize>::new();
    for (t, section) in target.sections.iter().enumerate() {
        tgt_sec_idx.insert(&section.key, t);
    }

    let sec_deleted: Vec<bool> = source
        .sections
        .iter()
        .map(|s| !tgt_sec_idx.contains_key(&s.key))
        .collect();
    let sec_inserted: Vec<bool> = target
        .sections
        .iter()
        .map(|s| !src_sec_idx.contains_key(&s.key))
        .collect();
    let src_to_tgt_sec: Vec<Option<usize>> = source
        .sections
        .iter()
        .map(|s| tgt_sec_idx.get(&s.key).copied())
        .collect();

    for (s, &deleted) in sec_deleted.iter().enumerate() {
        if deleted {
            cs.section_deletes.push(s);
        }
    }
    for (t, &inserted) in sec_inserted.iter().enumerate() {
        if inserted {
            cs.section_inserts.push(SectionInsert {
                at: t,
                section: target.sections[t].clone(),
            });
        }
    }

    // Flatten: persisting sections that changed relative order become single section
    // moves. Rank each matched section by its position among matched sections in the
    // source, then scan the target order; a rank below the running maximum is out of
    // place.
    let mut sec_rank = KeyMap::<&K, usize>::new();
    let mut next_rank = 0usize;
    for (s, section) in source.sections.iter().enumerate() {
        if !sec_deleted[s] {
            sec_rank.insert(&section.key, next_rank);
            next_rank += 1;
        }
    }
    let mut max_rank: Option<usize> = None;
    for (t, section) in target.sections.iter().enumerate() {
        let Some(&r) = sec_rank.get(&section.key) else {
            continue;
        };
        match max_rank {
            Some(max) if r < max => {
                let from = src_sec_idx[&section.key];
                cs.section_moves.push(SectionMove { from, to: t });
            }
            _ => max_rank = Some(r),
        }
    }

    let mut src_items = KeyMap::<&K, IndexPath>::new();
    for (s, section) in source.sections.iter().enumerate() {
        for (i, item) in section.items.iter().enumerate() {
            src_items.insert(&item.key, IndexPath::new(s, i));
        }
    }
    let mut tgt_items = KeyMap::<&K, IndexPath>::new();
    for (t, section) in target.sections.iter().enumerate() {
        for (i, item) in section.items.iter().enumerate() {
            tgt_items.insert(&item.key, IndexPath::new(t, i));
        }
    }

    // Within-section reorders, per matched section pair. Same greedy rank scan as for
    // sections, restricted to the keys that stay in the pair.
    let mut moved_within = KeyMap::<&K, ()>::new();
    for (s, section) in source.sections.iter().enumerate() {
        let Some(t) = src_to_tgt_sec[s] else {
            continue;
        };
        let mut item_rank = KeyMap::<&K, usize>::new();
        let mut next_rank = 0usize;
        for item in &section.items {
            let stays = tgt_items
                .get(&item.key)
                .is_some_and(|path| path.section == t);
            if stays {
                item_rank.insert(&item.key, next_rank);
                next_rank += 1;
            }
        }
        let mut max_rank: Option<usize> = None;
        for item in &target.sections[t].items {
            let Some(&r) = item_rank.get(&item.key) else {
                continue;
            };
            match max_rank {
                Some(max) if r < max => {
                    moved_within.insert(&item.key, ());
                }
                _ => max_rank = Some(r),
            }
        }
    }

    // Deletions: source items whose key vanished, unless the whole section goes with
    // them.
    for (s, section) in source.sections.iter().enumerate() {
        if sec_deleted[s] {
            continue;
        }
        for (i, item) in section.items.iter().enumerate() {
            if !tgt_items.contains_key(&item.key) {
                cs.item_deletes.push(IndexPath::new(s, i));
            }
        }
    }

    // Insertions, moves, and reloads, in target order.
    for (t, section) in target.sections.iter().enumerate() {
        for (i, item) in section.items.iter().enumerate() {
            let tp = IndexPath::new(t, i);
            let Some(&sp) = src_items.get(&item.key) else {
                if !sec_inserted[t] {
                    cs.item_inserts.push(ItemInsert {
                        at: tp,
                        item: item.clone(),
                    });
                }
                continue;
            };

            if sec_inserted[t] {
                // The carried section insert already contains this item; only the source
                // copy needs to go away.
                if !sec_deleted[sp.section] {
                    cs.item_deletes.push(sp);
                }
                continue;
            }

            let moved = match src_to_tgt_sec[sp.section] {
                Some(matched) if matched == t => moved_within.contains_key(&item.key),
                // Different persisting section, or extraction out of a dying one.
                _ => true,
            };
            if moved {
                cs.item_moves.push(ItemMove { from: sp, to: tp });
            }

            let changed = source.item_at(sp).is_some_and(|src_item| src_item != item);
            if changed {
                cs.reloads.push(ItemReload {
                    at: sp,
                    item: item.clone(),
                });
            }
        }
    }

    cs.item_deletes.sort_unstable();

    ldebug!(
        ops = cs.op_count(),
        section_inserts = cs.section_inserts.len(),
        section_deletes = cs.section_deletes.len(),
        section_moves = cs.section_moves.len(),
        "diff"
    );

    Ok(cs)
}
