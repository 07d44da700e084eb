//! A headless incremental layout and diff engine for chat-style scrolling lists.
//!
//! For host-side workflows (scroll anchoring, batch commit coordination), see the
//! `chatlayout-adapter` crate.
//!
//! This crate focuses on the core algorithms needed to keep a mutating message list laid
//! out at interactive frame rates: identity-matched diffing between content snapshots,
//! prefix sums over item advances, fast offset → item lookup, and incremental
//! re-measurement that shifts subsequent offsets by a delta instead of relaying out from
//! the top.
//!
//! It is UI-agnostic. A GUI/TUI layer is expected to provide:
//! - viewport geometry (width/height, insets)
//! - scroll offsets
//! - content snapshots and (optionally) measured item heights
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

#[macro_use]
mod macros;

mod diff;
mod fenwick;
mod key;
mod layout;
mod snapshot;
mod types;

#[cfg(test)]
mod tests;

pub use diff::{
    ChangeSet, ItemInsert, ItemMove, ItemReload, SectionInsert, SectionMove, diff,
};
pub use layout::{LayoutAttributes, LayoutEngine, LayoutMetrics};
pub use snapshot::{Item, Section, Snapshot, SnapshotError};
pub use types::{
    Alignment, Edge, Frame, IndexPath, Insets, ItemKey, ItemKind, Size, Sizing, Viewport,
};

#[doc(hidden)]
pub use key::StableKey;
