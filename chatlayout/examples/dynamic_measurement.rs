// Example: estimated sizing refined by keyed measurements.
use chatlayout::{
    Item, LayoutEngine, LayoutMetrics, Section, Sizing, Snapshot, Viewport,
};

fn main() {
    let snapshot = Snapshot::new([Section::new(0)
        .with_items((1..=50).map(|k| Item::cell(k, Sizing::Estimated(24))))]);
    let metrics = LayoutMetrics::new(Viewport::new(320, 200)).with_spacing(4);
    let mut engine = LayoutEngine::with_snapshot(metrics, snapshot.clone()).unwrap();

    println!("estimated total={}", engine.content_size().height);

    // Hosts report real heights as cells render; only the suffix shifts.
    let delta = engine.apply_measurement(&3, 90);
    println!("measure(3 -> 90): delta={delta} total={}", engine.content_size().height);

    let (start, end) = engine.visible_range(300);
    println!("visible at 300: {start}..{end}");

    // Measurements are keyed by identity, so they survive a reorder.
    let mut reversed = snapshot;
    reversed.sections[0].items.reverse();
    engine.commit(reversed).unwrap();
    let flat = engine.flat_index_of(&3).unwrap();
    println!(
        "after reverse: key 3 at flat={flat} height={:?}",
        engine.item_height(flat)
    );
}
