use crate::*;

use alloc::vec::Vec;

#[derive(Clone, Copy, Debug)]
struct Lcg(u64);

impl Lcg {
    fn new(seed: u64) -> Self {
        Self(seed)
    }

    fn next_u64(&mut self) -> u64 {
        // Deterministic, dependency-free PRNG for tests.
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0
    }

    fn gen_range_u64(&mut self, start: u64, end_exclusive: u64) -> u64 {
        debug_assert!(start < end_exclusive);
        let span = end_exclusive - start;
        start + (self.next_u64() % span)
    }

    fn gen_range_usize(&mut self, start: usize, end_exclusive: usize) -> usize {
        self.gen_range_u64(start as u64, end_exclusive as u64) as usize
    }

    fn gen_range_u32(&mut self, start: u32, end_exclusive: u32) -> u32 {
        self.gen_range_u64(start as u64, end_exclusive as u64) as u32
    }

    fn gen_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

fn cell(key: u64, height: u32) -> Item {
    Item::cell(key, Sizing::Fixed(height))
}

fn section(key: u64, items: impl IntoIterator<Item = Item>) -> Section {
    Section::new(key).with_items(items)
}

fn single_section(items: impl IntoIterator<Item = Item>) -> Snapshot {
    Snapshot::new([section(100, items)])
}

/// Mirrors the engine's vertical math: per-item advance is height plus the spacing
/// separating it from the next item.
fn expected_tops(heights: &[u32], spacing: u32, top_inset: u32, collapse: bool) -> Vec<u64> {
    let mut tops = Vec::with_capacity(heights.len());
    let mut y = top_inset as u64;
    for (i, &h) in heights.iter().enumerate() {
        tops.push(y);
        y += h as u64;
        if i + 1 < heights.len() && !(collapse && h == 0) {
            y += spacing as u64;
        }
    }
    tops
}

fn expected_total_height(
    heights: &[u32],
    spacing: u32,
    insets: Insets,
    collapse: bool,
) -> u64 {
    let mut total = insets.top as u64 + insets.bottom as u64;
    for (i, &h) in heights.iter().enumerate() {
        total += h as u64;
        if i + 1 < heights.len() && !(collapse && h == 0) {
            total += spacing as u64;
        }
    }
    total
}

// --- diff ---

#[test]
fn diff_of_identical_snapshots_is_empty() {
    let a = single_section([cell(1, 20), cell(2, 30), cell(3, 40)]);
    let cs = diff(&a, &a.clone()).unwrap();
    assert!(cs.is_empty());
    assert_eq!(cs.apply(&a), a);
}

#[test]
fn diff_delete_middle_and_append() {
    let a = single_section([cell(1, 20), cell(2, 30), cell(3, 40)]);
    let b = single_section([cell(1, 20), cell(3, 40), cell(4, 25)]);

    let cs = diff(&a, &b).unwrap();
    assert_eq!(cs.item_deletes, alloc::vec![IndexPath::new(0, 1)]);
    assert_eq!(cs.item_inserts.len(), 1);
    assert_eq!(cs.item_inserts[0].at, IndexPath::new(0, 2));
    assert_eq!(cs.item_inserts[0].item.key, 4);
    assert!(cs.item_moves.is_empty());
    assert!(cs.reloads.is_empty());
    assert!(cs.section_deletes.is_empty());
    assert!(cs.section_inserts.is_empty());
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_value_change_in_place_is_reload() {
    let a = single_section([cell(1, 20), cell(2, 30)]);
    let b = single_section([cell(1, 20), cell(2, 44)]);

    let cs = diff(&a, &b).unwrap();
    assert_eq!(cs.reloads.len(), 1);
    assert_eq!(cs.reloads[0].at, IndexPath::new(0, 1));
    assert_eq!(cs.reloads[0].item.height, Sizing::Fixed(44));
    assert!(cs.item_moves.is_empty());
    assert!(cs.item_deletes.is_empty());
    assert!(cs.item_inserts.is_empty());
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_reorder_within_section_is_moves_not_churn() {
    let a = single_section([cell(1, 10), cell(2, 10), cell(3, 10)]);
    let b = single_section([cell(3, 10), cell(1, 10), cell(2, 10)]);

    let cs = diff(&a, &b).unwrap();
    assert!(cs.item_deletes.is_empty());
    assert!(cs.item_inserts.is_empty());
    assert!(cs.reloads.is_empty());
    assert!(!cs.item_moves.is_empty());
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_flattens_persisting_section_reorder_into_section_moves() {
    let a = Snapshot::new([
        section(10, [cell(1, 10), cell(2, 10)]),
        section(20, [cell(3, 10)]),
    ]);
    let b = Snapshot::new([
        section(20, [cell(3, 10)]),
        section(10, [cell(1, 10), cell(2, 10)]),
    ]);

    let cs = diff(&a, &b).unwrap();
    assert_eq!(cs.section_moves.len(), 1);
    assert!(cs.section_deletes.is_empty());
    assert!(cs.section_inserts.is_empty());
    // Items ride along with their section; no per-item churn.
    assert!(cs.item_moves.is_empty());
    assert!(cs.item_deletes.is_empty());
    assert!(cs.item_inserts.is_empty());
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_cross_section_move() {
    let a = Snapshot::new([
        section(10, [cell(1, 10), cell(2, 10)]),
        section(20, [cell(3, 10)]),
    ]);
    let b = Snapshot::new([
        section(10, [cell(2, 10)]),
        section(20, [cell(3, 10), cell(1, 10)]),
    ]);

    let cs = diff(&a, &b).unwrap();
    assert_eq!(
        cs.item_moves,
        alloc::vec![ItemMove {
            from: IndexPath::new(0, 0),
            to: IndexPath::new(1, 1),
        }]
    );
    assert!(cs.item_deletes.is_empty());
    assert!(cs.item_inserts.is_empty());
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_section_insert_carries_matched_items_once() {
    // Item 2 migrates into a brand-new section: the carried section insert brings it in,
    // and only the old copy is deleted.
    let a = Snapshot::new([section(10, [cell(1, 10), cell(2, 10)])]);
    let b = Snapshot::new([
        section(10, [cell(1, 10)]),
        section(30, [cell(2, 10), cell(9, 10)]),
    ]);

    let cs = diff(&a, &b).unwrap();
    assert_eq!(cs.section_inserts.len(), 1);
    assert_eq!(cs.item_deletes, alloc::vec![IndexPath::new(0, 1)]);
    assert!(cs.item_moves.is_empty());
    assert!(cs.item_inserts.is_empty());
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_move_out_of_deleted_section() {
    let a = Snapshot::new([
        section(10, [cell(1, 10)]),
        section(20, [cell(2, 10), cell(3, 10)]),
    ]);
    let b = Snapshot::new([section(10, [cell(1, 10), cell(3, 10)])]);

    let cs = diff(&a, &b).unwrap();
    assert_eq!(cs.section_deletes, alloc::vec![1]);
    assert_eq!(
        cs.item_moves,
        alloc::vec![ItemMove {
            from: IndexPath::new(1, 1),
            to: IndexPath::new(0, 1),
        }]
    );
    assert_eq!(cs.apply(&a), b);
}

#[test]
fn diff_rejects_duplicate_item_keys() {
    let bad = single_section([cell(1, 10), cell(1, 10)]);
    let good = single_section([cell(1, 10)]);
    assert_eq!(
        diff(&bad, &good),
        Err(SnapshotError::DuplicateItemKey {
            section: 0,
            item: 1
        })
    );
    assert_eq!(
        diff(&good, &bad),
        Err(SnapshotError::DuplicateItemKey {
            section: 0,
            item: 1
        })
    );
}

#[test]
fn diff_rejects_duplicate_section_keys() {
    let bad = Snapshot::new([section(10, [cell(1, 10)]), section(10, [cell(2, 10)])]);
    assert_eq!(
        diff(&bad, &bad),
        Err(SnapshotError::DuplicateSectionKey { section: 1 })
    );
}

fn random_snapshot(rng: &mut Lcg, next_key: &mut u64) -> Snapshot {
    let section_count = rng.gen_range_usize(1, 5);
    let mut sections = Vec::new();
    for _ in 0..section_count {
        let key = *next_key;
        *next_key += 1;
        let item_count = rng.gen_range_usize(0, 7);
        let mut items = Vec::new();
        for _ in 0..item_count {
            let item_key = *next_key;
            *next_key += 1;
            items.push(cell(item_key, rng.gen_range_u32(0, 60)));
        }
        sections.push(section(key, items));
    }
    Snapshot::new(sections)
}

fn random_mutation(rng: &mut Lcg, base: &Snapshot, next_key: &mut u64) -> Snapshot {
    let mut b = base.clone();

    // Drop some items and sections.
    for section in &mut b.sections {
        section.items.retain(|_| rng.gen_range_u64(0, 4) != 0);
    }
    if b.sections.len() > 1 && rng.gen_bool() {
        let victim = rng.gen_range_usize(0, b.sections.len());
        b.sections.remove(victim);
    }

    // Change some values in place.
    for section in &mut b.sections {
        for item in &mut section.items {
            if rng.gen_range_u64(0, 5) == 0 {
                item.height = Sizing::Fixed(rng.gen_range_u32(0, 60));
            }
        }
    }

    // Shuffle sections and items with a few random swaps.
    for _ in 0..rng.gen_range_usize(0, 3) {
        if b.sections.len() >= 2 {
            let x = rng.gen_range_usize(0, b.sections.len());
            let y = rng.gen_range_usize(0, b.sections.len());
            b.sections.swap(x, y);
        }
    }
    for section in &mut b.sections {
        if section.items.len() >= 2 && rng.gen_bool() {
            let x = rng.gen_range_usize(0, section.items.len());
            let y = rng.gen_range_usize(0, section.items.len());
            section.items.swap(x, y);
        }
    }

    // Move an item across sections.
    if b.sections.len() >= 2 && rng.gen_bool() {
        let from = rng.gen_range_usize(0, b.sections.len());
        let to = rng.gen_range_usize(0, b.sections.len());
        if from != to && !b.sections[from].items.is_empty() {
            let idx = rng.gen_range_usize(0, b.sections[from].items.len());
            let item = b.sections[from].items.remove(idx);
            let at = rng.gen_range_usize(0, b.sections[to].items.len() + 1);
            b.sections[to].items.insert(at, item);
        }
    }

    // Fresh insertions: items and occasionally a whole section.
    for section in &mut b.sections {
        if rng.gen_range_u64(0, 3) == 0 {
            let item_key = *next_key;
            *next_key += 1;
            let at = rng.gen_range_usize(0, section.items.len() + 1);
            section
                .items
                .insert(at, cell(item_key, rng.gen_range_u32(0, 60)));
        }
    }
    if rng.gen_range_u64(0, 3) == 0 {
        let fresh = random_snapshot(rng, next_key).sections.remove(0);
        let at = rng.gen_range_usize(0, b.sections.len() + 1);
        b.sections.insert(at, fresh);
    }

    b
}

#[test]
fn diff_round_trip_law_randomized() {
    let mut rng = Lcg::new(0x5eed);
    for _ in 0..250 {
        let mut next_key = 1u64;
        let a = random_snapshot(&mut rng, &mut next_key);
        let b = random_mutation(&mut rng, &a, &mut next_key);

        let cs = diff(&a, &b).unwrap();
        assert_eq!(cs.apply(&a), b, "round-trip failed for {a:?} -> {b:?}");

        // And the no-op laws on both endpoints.
        assert!(diff(&a, &a).unwrap().is_empty());
        assert!(diff(&b, &b).unwrap().is_empty());
    }
}

// --- layout ---

fn metrics(width: u32, height: u32) -> LayoutMetrics {
    LayoutMetrics::new(Viewport::new(width, height))
}

#[test]
fn content_size_matches_oracle() {
    let heights = [20u32, 30, 40];
    let insets = Insets {
        top: 10,
        bottom: 5,
        leading: 0,
        trailing: 0,
    };
    let m = metrics(320, 100).with_insets(insets).with_spacing(2);
    let snapshot = single_section(heights.iter().enumerate().map(|(i, &h)| cell(i as u64 + 1, h)));
    let engine = LayoutEngine::with_snapshot(m, snapshot).unwrap();

    assert_eq!(
        engine.content_size(),
        Size {
            width: 320,
            height: expected_total_height(&heights, 2, insets, false),
        }
    );

    let tops = expected_tops(&heights, 2, insets.top, false);
    for (i, &top) in tops.iter().enumerate() {
        assert_eq!(engine.item_top(i), Some(top));
    }
}

#[test]
fn deleted_middle_item_new_total_includes_spacing() {
    // Snapshot B from the delete-and-append scenario: heights 20, 40, 25 with spacing 2.
    let m = metrics(320, 100).with_spacing(2);
    let b = single_section([cell(1, 20), cell(3, 40), cell(4, 25)]);
    let engine = LayoutEngine::with_snapshot(m, b).unwrap();
    assert_eq!(engine.content_size().height, 20 + 40 + 25 + 2 * 2);
}

#[test]
fn alignment_controls_horizontal_placement() {
    let insets = Insets {
        top: 0,
        bottom: 0,
        leading: 5,
        trailing: 7,
    };
    let m = metrics(100, 100).with_insets(insets);
    let snapshot = single_section([
        cell(1, 10),
        cell(2, 10).with_alignment(Alignment::Leading).with_width(20),
        cell(3, 10).with_alignment(Alignment::Trailing).with_width(20),
        cell(4, 10).with_alignment(Alignment::Center).with_width(20),
    ]);
    let engine = LayoutEngine::with_snapshot(m, snapshot).unwrap();

    let content_width = 100 - 5 - 7;
    let frames: Vec<Frame> = engine.attributes().iter().map(|a| a.frame).collect();
    assert_eq!((frames[0].x, frames[0].width), (5, content_width));
    assert_eq!((frames[1].x, frames[1].width), (5, 20));
    assert_eq!((frames[2].x, frames[2].width), (5 + content_width - 20, 20));
    assert_eq!(
        (frames[3].x, frames[3].width),
        (5 + (content_width - 20) / 2, 20)
    );
}

#[test]
fn zero_height_items_can_collapse_their_spacing() {
    let heights = [10u32, 0, 20];
    fn snapshot(heights: &[u32]) -> Snapshot {
        single_section(heights.iter().enumerate().map(|(i, &h)| cell(i as u64 + 1, h)))
    }

    let collapsed = LayoutEngine::with_snapshot(
        metrics(100, 100)
            .with_spacing(10)
            .with_collapse_zero_height_spacing(true),
        snapshot(&heights),
    )
    .unwrap();
    assert_eq!(collapsed.item_top(1), Some(20));
    assert_eq!(collapsed.item_top(2), Some(20));
    assert_eq!(
        collapsed.content_size().height,
        expected_total_height(&heights, 10, Insets::default(), true)
    );

    let kept = LayoutEngine::with_snapshot(
        metrics(100, 100).with_spacing(10),
        snapshot(&heights),
    )
    .unwrap();
    assert_eq!(kept.item_top(2), Some(30));
    assert_eq!(
        kept.content_size().height,
        expected_total_height(&heights, 10, Insets::default(), false)
    );
}

#[test]
fn spacing_before_override_wins_over_base_spacing() {
    let m = metrics(100, 100).with_spacing(4);
    let snapshot = single_section([
        cell(1, 10),
        cell(2, 10).with_spacing_before(20),
        cell(3, 10),
    ]);
    let engine = LayoutEngine::with_snapshot(m, snapshot).unwrap();
    assert_eq!(engine.item_top(0), Some(0));
    assert_eq!(engine.item_top(1), Some(30));
    assert_eq!(engine.item_top(2), Some(44));
}

#[test]
fn measurement_shifts_suffix_by_delta() {
    let m = metrics(100, 100);
    let snapshot = single_section([
        Item::cell(1, Sizing::Estimated(10)),
        Item::cell(2, Sizing::Estimated(10)),
        Item::cell(3, Sizing::Estimated(10)),
    ]);
    let mut engine = LayoutEngine::with_snapshot(m, snapshot).unwrap();
    let before = engine.content_size().height;

    let delta = engine.apply_measurement(&2, 35);
    assert_eq!(delta, 25);
    assert_eq!(engine.content_size().height, before + 25);
    assert_eq!(engine.item_top(1), Some(10));
    assert_eq!(engine.item_top(2), Some(45));
    assert!(engine.is_measured(&2));
    assert!(!engine.is_measured(&1));

    // Re-measuring to the same height is a no-op.
    assert_eq!(engine.apply_measurement(&2, 35), 0);
}

#[test]
fn measurements_follow_keys_across_commits() {
    let m = metrics(100, 100);
    let a = single_section([Item::cell(1, Sizing::Estimated(10)), Item::cell(2, Sizing::Estimated(10))]);
    let mut engine = LayoutEngine::with_snapshot(m, a).unwrap();
    engine.apply_measurement(&2, 50);

    // Reorder: the measured height must follow key 2 to its new position.
    let b = single_section([Item::cell(2, Sizing::Estimated(10)), Item::cell(1, Sizing::Estimated(10))]);
    engine.commit(b).unwrap();
    assert_eq!(engine.item_height(0), Some(50));
    assert_eq!(engine.item_height(1), Some(10));
    assert_eq!(engine.measurement_cache_len(), 1);
}

#[test]
fn measurement_for_unknown_key_is_cached_for_next_commit() {
    let m = metrics(100, 100);
    let mut engine = LayoutEngine::with_snapshot(m, single_section([cell(1, 10)])).unwrap();
    assert_eq!(engine.apply_measurement(&7, 33), 0);

    engine
        .commit(single_section([cell(1, 10), Item::cell(7, Sizing::Estimated(5))]))
        .unwrap();
    assert_eq!(engine.item_height(1), Some(33));
}

#[test]
fn visible_range_and_isolated_attributes() {
    let m = metrics(100, 100);
    let snapshot = single_section((0..100).map(|i| cell(i + 1, 10)));
    let engine = LayoutEngine::with_snapshot(m, snapshot).unwrap();

    assert_eq!(engine.visible_range(250), (25, 35));
    let visible = engine.attributes_in(250);
    assert_eq!(visible.len(), 10);
    assert_eq!(visible[0].frame.y, 250);
    assert_eq!(visible[0].path, IndexPath::new(0, 25));

    let all = engine.attributes();
    assert_eq!(all.len(), 100);
    assert_eq!(all[99].frame.y, 990);
}

#[test]
fn index_at_offset_respects_top_inset() {
    let insets = Insets {
        top: 15,
        bottom: 0,
        leading: 0,
        trailing: 0,
    };
    let m = metrics(100, 50).with_insets(insets);
    let engine =
        LayoutEngine::with_snapshot(m, single_section([cell(1, 10), cell(2, 10)])).unwrap();
    assert_eq!(engine.index_at_offset(0), Some(0));
    assert_eq!(engine.index_at_offset(14), Some(0));
    assert_eq!(engine.index_at_offset(26), Some(1));
}

#[test]
fn incremental_measurement_matches_full_relayout() {
    let mut rng = Lcg::new(0xfeed);
    for _ in 0..50 {
        let mut next_key = 1u64;
        let snapshot = random_snapshot(&mut rng, &mut next_key);
        let m = metrics(200, 100).with_spacing(rng.gen_range_u32(0, 5));

        let mut incremental = LayoutEngine::with_snapshot(m, snapshot.clone()).unwrap();
        let mut reference = LayoutEngine::with_snapshot(m, snapshot.clone()).unwrap();

        let count = incremental.item_count();
        for _ in 0..4 {
            if count == 0 {
                break;
            }
            let flat = rng.gen_range_usize(0, count);
            let key = *incremental.key_at(flat).unwrap();
            let height = rng.gen_range_u32(0, 80);
            incremental.apply_measurement(&key, height);
            reference.apply_measurement(&key, height);
        }
        // Force the reference down the full-rebuild path.
        reference.commit(snapshot).unwrap();

        assert_eq!(incremental.content_size(), reference.content_size());
        assert_eq!(incremental.attributes(), reference.attributes());
    }
}

#[test]
fn empty_snapshot_has_only_insets() {
    let insets = Insets::all(8);
    let m = metrics(100, 50).with_insets(insets);
    let engine = LayoutEngine::<u64>::with_snapshot(m, Snapshot::empty()).unwrap();
    assert_eq!(engine.content_size().height, 16);
    assert_eq!(engine.index_at_offset(0), None);
    assert!(engine.attributes().is_empty());
    assert_eq!(engine.visible_range(0), (0, 0));
}
