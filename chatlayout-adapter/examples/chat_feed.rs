// Example: a chat feed that stays pinned to the bottom while history loads above.
use chatlayout::{Item, LayoutMetrics, Section, Sizing, Snapshot, Viewport};
use chatlayout_adapter::{AnchorPolicy, Controller, UpdateRequest};

fn feed(keys: impl IntoIterator<Item = u64>) -> Snapshot {
    Snapshot::new([Section::new(0)
        .with_items(keys.into_iter().map(|k| Item::cell(k, Sizing::Fixed(20))))])
}

fn main() {
    let metrics = LayoutMetrics::new(Viewport::new(320, 100));
    let mut ctrl = Controller::new(metrics).with_policy(AnchorPolicy::stick_to_bottom());

    ctrl.submit_update(UpdateRequest::new(feed(1..=10))).unwrap();
    let initial = ctrl.attach();
    println!(
        "attach: offset={} items={}",
        ctrl.scroll_offset(),
        initial.attributes.len()
    );

    // Older history arrives above the viewport; the anchor keeps the view steady.
    let outcome = ctrl
        .submit_update(UpdateRequest::new(feed((100..110).chain(1..=10))))
        .unwrap()
        .unwrap();
    println!(
        "prepend: inserts={} offset={} delta={}",
        outcome.changes.item_inserts.len(),
        ctrl.scroll_offset(),
        outcome.offset_delta
    );
    ctrl.complete_update().unwrap();

    // A new message lands while the previous animation is still running: it queues.
    ctrl.submit_update(UpdateRequest::new(feed((100..110).chain(1..=11))))
        .unwrap()
        .unwrap();
    ctrl.submit_update(UpdateRequest::new(feed((100..110).chain(1..=12))))
        .unwrap();
    println!("pending={}", ctrl.pending_updates());
    while let Some(next) = ctrl.complete_update().unwrap() {
        println!("drained generation={}", next.generation);
    }
    println!("idle={} items={}", ctrl.is_idle(), ctrl.engine().snapshot().item_count());
}
