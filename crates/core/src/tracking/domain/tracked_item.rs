use std::fmt;

use crate::shared::bounding_box::BoundingBox;

/// Stable identity assigned by the tracker. Never reused within a run.
pub type ItemId = u64;

/// Alert lifecycle of one tracked item.
///
/// `Unobserved → Carried → Alerted` or `Carried → Resolved`. The last two
/// are terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AlertState {
    #[default]
    Unobserved,
    Carried,
    Alerted,
    Resolved,
}

impl AlertState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertState::Alerted | AlertState::Resolved)
    }
}

impl fmt::Display for AlertState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AlertState::Unobserved => "unobserved",
            AlertState::Carried => "carried",
            AlertState::Alerted => "alerted",
            AlertState::Resolved => "resolved",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackedItem {
    pub id: ItemId,
    /// Box from the most recent matched detection.
    pub bbox: BoundingBox,
    pub frames_since_seen: usize,
    pub state: AlertState,
}

impl TrackedItem {
    pub fn new(id: ItemId, bbox: BoundingBox) -> Self {
        Self {
            id,
            bbox,
            frames_since_seen: 0,
            state: AlertState::Unobserved,
        }
    }

    pub fn seen_this_frame(&self) -> bool {
        self.frames_since_seen == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_item_starts_unobserved_and_seen() {
        let item = TrackedItem::new(7, BoundingBox::from_corners(0.0, 0.0, 1.0, 1.0));
        assert_eq!(item.state, AlertState::Unobserved);
        assert!(item.seen_this_frame());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!AlertState::Unobserved.is_terminal());
        assert!(!AlertState::Carried.is_terminal());
        assert!(AlertState::Alerted.is_terminal());
        assert!(AlertState::Resolved.is_terminal());
    }
}
