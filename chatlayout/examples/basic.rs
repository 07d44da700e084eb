// Example: snapshots, diffing, and frame queries.
use chatlayout::{
    Item, LayoutEngine, LayoutMetrics, Section, Sizing, Snapshot, Viewport, diff,
};

fn main() {
    let before = Snapshot::new([Section::new(0).with_items([
        Item::cell(1, Sizing::Fixed(20)),
        Item::cell(2, Sizing::Fixed(30)),
        Item::cell(3, Sizing::Fixed(40)),
    ])]);
    let after = Snapshot::new([Section::new(0).with_items([
        Item::cell(1, Sizing::Fixed(20)),
        Item::cell(3, Sizing::Fixed(40)),
        Item::cell(4, Sizing::Fixed(25)),
    ])]);

    let changes = diff(&before, &after).unwrap();
    println!("deletes={:?}", changes.item_deletes);
    println!(
        "inserts={:?}",
        changes
            .item_inserts
            .iter()
            .map(|i| (i.at, i.item.key))
            .collect::<Vec<_>>()
    );
    assert_eq!(changes.apply(&before), after);

    let metrics = LayoutMetrics::new(Viewport::new(320, 100)).with_spacing(2);
    let engine = LayoutEngine::with_snapshot(metrics, after).unwrap();
    println!("content_size={:?}", engine.content_size());
    for attr in engine.attributes() {
        println!("key={} frame={:?}", attr.key, attr.frame);
    }
}
