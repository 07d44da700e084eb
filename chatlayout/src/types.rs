/// The role an item plays inside its section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemKind {
    Header,
    Cell,
    Footer,
}

/// Horizontal placement of an item inside the content width.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Alignment {
    Leading,
    Trailing,
    Center,
    /// Stretches to the content width minus leading/trailing insets.
    FullWidth,
}

/// A viewport edge used for scroll anchoring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Edge {
    Top,
    Bottom,
}

/// An item's height descriptor.
///
/// `Estimated` heights are used until a real measurement arrives via
/// [`crate::LayoutEngine::apply_measurement`]; measured heights are cached by item key and
/// survive reorders and snapshot commits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Sizing {
    Fixed(u32),
    Estimated(u32),
}

impl Sizing {
    pub fn value(self) -> u32 {
        match self {
            Self::Fixed(v) | Self::Estimated(v) => v,
        }
    }

    pub fn is_estimate(self) -> bool {
        matches!(self, Self::Estimated(_))
    }
}

/// A (section, item) position inside a snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IndexPath {
    pub section: usize,
    pub item: usize,
}

impl IndexPath {
    pub fn new(section: usize, item: usize) -> Self {
        Self { section, item }
    }
}

/// A laid-out item rectangle.
///
/// `y` is the offset in the scroll axis (includes the top inset); `x` is measured from the
/// viewport's leading edge.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Frame {
    pub x: u32,
    pub y: u64,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn bottom(&self) -> u64 {
        self.y.saturating_add(self.height as u64)
    }
}

/// Total laid-out content size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u64,
}

/// Insets between the viewport edges and the laid-out content.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Insets {
    pub top: u32,
    pub bottom: u32,
    pub leading: u32,
    pub trailing: u32,
}

impl Insets {
    pub fn all(v: u32) -> Self {
        Self {
            top: v,
            bottom: v,
            leading: v,
            trailing: v,
        }
    }
}

/// The scrollable surface geometry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub type ItemKey = u64;
