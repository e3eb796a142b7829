use std::fmt;

use crate::shared::bounding_box::{contains, BoundingBox};
use crate::shared::constants::LOSS_FRAMES;
use crate::tracking::domain::tracked_item::{AlertState, ItemId, TrackedItem};

/// Why a carried item raised an alert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertReason {
    /// Still detected, but no longer inside any person or cart.
    LeftHand,
    /// Stopped being detected while carried.
    Vanished,
}

impl fmt::Display for AlertReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertReason::LeftHand => f.write_str("left the hand outside any cart"),
            AlertReason::Vanished => f.write_str("disappeared while carried"),
        }
    }
}

/// Emitted exactly once per identity, on its `Carried → Alerted` edge.
#[derive(Clone, Debug, PartialEq)]
pub struct AlertEvent {
    pub item_id: ItemId,
    pub frame_index: usize,
    /// Last known position of the item.
    pub bbox: BoundingBox,
    pub reason: AlertReason,
}

/// Person and cart boxes of the current frame.
#[derive(Clone, Copy, Debug)]
pub struct Scene<'a> {
    pub humans: &'a [BoundingBox],
    pub carts: &'a [BoundingBox],
}

impl Scene<'_> {
    fn in_human(&self, item: &BoundingBox) -> bool {
        self.humans.iter().any(|h| contains(h, item))
    }

    fn in_cart(&self, item: &BoundingBox) -> bool {
        self.carts.iter().any(|c| contains(c, item))
    }
}

/// Drives every tracked item through its alert lifecycle.
///
/// The per-item state lives on [`TrackedItem`]; this type holds the
/// transition rules and the running alert count. `Alerted` is terminal,
/// so an identity can only ever produce one event.
pub struct AlertStateMachine {
    loss_frames: usize,
    alerts_fired: usize,
}

impl AlertStateMachine {
    /// `loss_frames`: consecutive unseen frames after which a carried item
    /// counts as vanished. Clamped to at least 1.
    pub fn new(loss_frames: usize) -> Self {
        Self {
            loss_frames: loss_frames.max(1),
            alerts_fired: 0,
        }
    }

    pub fn alerts_fired(&self) -> usize {
        self.alerts_fired
    }

    /// Advances live items, returning the alerts raised this frame.
    pub fn advance<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a mut TrackedItem>,
        scene: &Scene<'_>,
        frame_index: usize,
    ) -> Vec<AlertEvent> {
        items
            .into_iter()
            .filter_map(|item| self.step(item, scene, frame_index, false))
            .collect()
    }

    /// Final transition for items the tracker dropped this frame. A carried
    /// item that leaves the scene for good counts as vanished.
    pub fn retire<'a>(
        &mut self,
        items: impl IntoIterator<Item = &'a mut TrackedItem>,
        scene: &Scene<'_>,
        frame_index: usize,
    ) -> Vec<AlertEvent> {
        items
            .into_iter()
            .filter_map(|item| self.step(item, scene, frame_index, true))
            .collect()
    }

    fn step(
        &mut self,
        item: &mut TrackedItem,
        scene: &Scene<'_>,
        frame_index: usize,
        evicted: bool,
    ) -> Option<AlertEvent> {
        let (next, reason) = self.transition(item, scene, evicted);
        if next != item.state {
            log::debug!("Item {}: {} -> {}", item.id, item.state, next);
            item.state = next;
        }
        let reason = reason?;
        self.alerts_fired += 1;
        Some(AlertEvent {
            item_id: item.id,
            frame_index,
            bbox: item.bbox,
            reason,
        })
    }

    fn transition(
        &self,
        item: &TrackedItem,
        scene: &Scene<'_>,
        evicted: bool,
    ) -> (AlertState, Option<AlertReason>) {
        match item.state {
            AlertState::Alerted | AlertState::Resolved => (item.state, None),
            AlertState::Unobserved => {
                if !evicted && item.seen_this_frame() && scene.in_human(&item.bbox) {
                    (AlertState::Carried, None)
                } else {
                    (AlertState::Unobserved, None)
                }
            }
            AlertState::Carried if !item.seen_this_frame() => {
                if evicted || item.frames_since_seen >= self.loss_frames {
                    (AlertState::Alerted, Some(AlertReason::Vanished))
                } else {
                    (AlertState::Carried, None)
                }
            }
            AlertState::Carried => {
                if scene.in_cart(&item.bbox) {
                    (AlertState::Resolved, None)
                } else if scene.in_human(&item.bbox) {
                    (AlertState::Carried, None)
                } else {
                    (AlertState::Alerted, Some(AlertReason::LeftHand))
                }
            }
        }
    }
}

impl Default for AlertStateMachine {
    fn default() -> Self {
        Self::new(LOSS_FRAMES)
    }
}
