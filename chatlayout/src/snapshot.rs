use alloc::vec::Vec;

use crate::key::{KeyMap, StableKey};
use crate::types::{Alignment, IndexPath, ItemKey, ItemKind, Sizing};

/// A malformed snapshot was handed to the engine.
///
/// This is a caller contract violation, not a transient condition: the engine refuses to
/// diff or commit a snapshot with ambiguous identities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SnapshotError {
    #[error("duplicate section key at section {section}")]
    DuplicateSectionKey { section: usize },
    #[error("duplicate item key at section {section}, item {item}")]
    DuplicateItemKey { section: usize, item: usize },
}

/// One element of a section: a header, cell, or footer.
///
/// Items are value types: they are immutable once committed and replaced wholesale on
/// update. Value equality (ignoring nothing — the whole record) drives reload detection
/// in [`crate::diff`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item<K = ItemKey> {
    pub key: K,
    pub kind: ItemKind,
    pub height: Sizing,
    /// Fixed box width for `Leading`/`Trailing`/`Center` placement. Ignored by
    /// `FullWidth`; `None` stretches to the content width.
    pub width: Option<u32>,
    pub alignment: Alignment,
    /// Overrides the layout's base spacing between the previous item and this one.
    pub spacing_before: Option<u32>,
}

impl<K> Item<K> {
    pub fn cell(key: K, height: Sizing) -> Self {
        Self::new(key, ItemKind::Cell, height)
    }

    pub fn header(key: K, height: Sizing) -> Self {
        Self::new(key, ItemKind::Header, height)
    }

    pub fn footer(key: K, height: Sizing) -> Self {
        Self::new(key, ItemKind::Footer, height)
    }

    pub fn new(key: K, kind: ItemKind, height: Sizing) -> Self {
        Self {
            key,
            kind,
            height,
            width: None,
            alignment: Alignment::FullWidth,
            spacing_before: None,
        }
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_spacing_before(mut self, spacing: u32) -> Self {
        self.spacing_before = Some(spacing);
        self
    }
}

/// An ordered run of items sharing a stable section identity.
///
/// Headers and footers are ordered items carrying their kind: a header (if any) is the
/// first item, a footer the last. The kind is metadata for the host and layout; the diff
/// treats every item uniformly by key.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Section<K = ItemKey> {
    pub key: K,
    pub items: Vec<Item<K>>,
}

impl<K> Section<K> {
    pub fn new(key: K) -> Self {
        Self {
            key,
            items: Vec::new(),
        }
    }

    pub fn with_items(mut self, items: impl IntoIterator<Item = Item<K>>) -> Self {
        self.items.extend(items);
        self
    }

    /// Inserts a header item at the front of the section.
    pub fn with_header(mut self, item: Item<K>) -> Self {
        self.items.insert(0, item);
        self
    }

    /// Appends a footer item at the end of the section.
    pub fn with_footer(mut self, item: Item<K>) -> Self {
        self.items.push(item);
        self
    }

    pub fn header(&self) -> Option<&Item<K>> {
        self.items.first().filter(|i| i.kind == ItemKind::Header)
    }

    pub fn footer(&self) -> Option<&Item<K>> {
        self.items.last().filter(|i| i.kind == ItemKind::Footer)
    }
}

/// An immutable content snapshot: the ordered sections the layout is built from.
///
/// Exactly one snapshot is committed at any time (see `chatlayout-adapter`'s controller);
/// the engine never mutates a snapshot in place.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot<K = ItemKey> {
    pub sections: Vec<Section<K>>,
}

impl<K> Default for Snapshot<K> {
    fn default() -> Self {
        Self {
            sections: Vec::new(),
        }
    }
}

impl<K> Snapshot<K> {
    pub fn new(sections: impl IntoIterator<Item = Section<K>>) -> Self {
        Self {
            sections: sections.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn item_at(&self, path: IndexPath) -> Option<&Item<K>> {
        self.sections.get(path.section)?.items.get(path.item)
    }

    /// Visits every item in layout order (sections top to bottom, items in section order).
    pub fn for_each_item(&self, mut f: impl FnMut(IndexPath, &Item<K>)) {
        for (s, section) in self.sections.iter().enumerate() {
            for (i, item) in section.items.iter().enumerate() {
                f(IndexPath::new(s, i), item);
            }
        }
    }
}

impl<K: StableKey + Clone> Snapshot<K> {
    /// Checks the identity preconditions: section keys unique, item keys unique across the
    /// whole snapshot (cross-section moves need global identity).
    pub fn validate(&self) -> Result<(), SnapshotError> {
        let mut section_keys = KeyMap::<&K, ()>::new();
        let mut item_keys = KeyMap::<&K, ()>::new();
        for (s, section) in self.sections.iter().enumerate() {
            if section_keys.insert(&section.key, ()).is_some() {
                return Err(SnapshotError::DuplicateSectionKey { section: s });
            }
            for (i, item) in section.items.iter().enumerate() {
                if item_keys.insert(&item.key, ()).is_some() {
                    return Err(SnapshotError::DuplicateItemKey {
                        section: s,
                        item: i,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn path_of(&self, key: &K) -> Option<IndexPath> {
        for (s, section) in self.sections.iter().enumerate() {
            for (i, item) in section.items.iter().enumerate() {
                if item.key == *key {
                    return Some(IndexPath::new(s, i));
                }
            }
        }
        None
    }
}
