#[cfg(not(feature = "std"))]
use alloc::collections::BTreeMap;
#[cfg(feature = "std")]
use std::collections::HashMap;

#[cfg(feature = "std")]
pub(crate) type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub(crate) type KeyMap<K, V> = BTreeMap<K, V>;

#[cfg(feature = "std")]
#[doc(hidden)]
pub trait StableKey: core::hash::Hash + Eq {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq> StableKey for K {}

#[cfg(not(feature = "std"))]
#[doc(hidden)]
pub trait StableKey: Ord {}
#[cfg(not(feature = "std"))]
impl<K: Ord> StableKey for K {}
