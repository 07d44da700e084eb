//! Host-side workflows for the `chatlayout` crate.
//!
//! The `chatlayout` crate is UI-agnostic and focuses on the core math and state. This
//! crate provides the small, framework-neutral pieces a host adapter needs on top:
//!
//! - Scroll anchoring (keep the viewport pinned to an item identity across mutations,
//!   including the "stick to bottom while messages arrive" policy)
//! - A batch commit coordinator that serializes concurrent update requests and decides
//!   animate-vs-interrupt per change-set
//!
//! This crate is intentionally framework-agnostic (no UIKit/AppKit/ratatui bindings).
#![cfg_attr(not(feature = "std"), no_std)]
#![forbid(unsafe_code)]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod anchor;
mod coordinator;
mod key;


pub use anchor::{AnchorPolicy, AnchorRestore, ScrollAnchor, capture_anchor, restore_anchor};
pub use coordinator::{
    CommitState, CompletionCallback, Controller, UpdateOutcome, UpdateRequest,
};
pub use key::ListKey;
