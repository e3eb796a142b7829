//! Greedy IoU tracker giving item detections a persistent identity.
//!
//! Detections carry no identity of their own, so continuity comes purely
//! from geometry: each frame's boxes are matched against the live
//! identities by descending IoU. Unmatched detections open new identities,
//! and identities unmatched for longer than the grace window are evicted.
use std::collections::HashSet;

use crate::shared::bounding_box::{iou, BoundingBox};
use crate::shared::constants::{MATCH_IOU_THRESHOLD, TRACKER_GRACE_FRAMES};

use super::tracked_item::{ItemId, TrackedItem};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackerConfig {
    pub match_iou_threshold: f64,
    pub grace_frames: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            match_iou_threshold: MATCH_IOU_THRESHOLD,
            grace_frames: TRACKER_GRACE_FRAMES,
        }
    }
}

/// Outcome of one [`IdentityTracker::update`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackerUpdate {
    /// `(identity, detection index)` for every detection this frame,
    /// including the ones that opened a new identity.
    pub assignments: Vec<(ItemId, usize)>,
    /// Identities dropped this frame, in their final state.
    pub evicted: Vec<TrackedItem>,
}

impl TrackerUpdate {
    pub fn id_for_detection(&self, det_index: usize) -> Option<ItemId> {
        self.assignments
            .iter()
            .find(|(_, di)| *di == det_index)
            .map(|(id, _)| *id)
    }
}

pub struct IdentityTracker {
    items: Vec<TrackedItem>,
    next_id: ItemId,
    config: TrackerConfig,
}

impl IdentityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            items: Vec::new(),
            next_id: 1,
            config,
        }
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn update(&mut self, detections: &[BoundingBox]) -> TrackerUpdate {
        let num_existing = self.items.len();
        let matches = greedy_match(&self.items, detections, self.config.match_iou_threshold);

        let mut matched_items = HashSet::new();
        let mut matched_dets = HashSet::new();
        let mut assignments = Vec::with_capacity(detections.len());
        for (ti, di) in matches {
            let item = &mut self.items[ti];
            item.bbox = detections[di];
            item.frames_since_seen = 0;
            matched_items.insert(ti);
            matched_dets.insert(di);
            assignments.push((item.id, di));
        }

        for (di, bbox) in detections.iter().enumerate() {
            if !matched_dets.contains(&di) {
                let id = self.spawn(*bbox);
                assignments.push((id, di));
            }
        }

        for (ti, item) in self.items.iter_mut().take(num_existing).enumerate() {
            if !matched_items.contains(&ti) {
                item.frames_since_seen += 1;
            }
        }

        TrackerUpdate {
            assignments,
            evicted: self.evict_stale(),
        }
    }

    /// Live identities in creation order.
    pub fn items(&self) -> &[TrackedItem] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [TrackedItem] {
        &mut self.items
    }

    pub fn get(&self, id: ItemId) -> Option<&TrackedItem> {
        self.items.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn spawn(&mut self, bbox: BoundingBox) -> ItemId {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(TrackedItem::new(id, bbox));
        id
    }

    fn evict_stale(&mut self) -> Vec<TrackedItem> {
        let grace = self.config.grace_frames;
        let (stale, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.items)
            .into_iter()
            .partition(|t| t.frames_since_seen > grace);
        self.items = live;
        for item in &stale {
            log::debug!(
                "Evicting item {} ({}) after {} unseen frames",
                item.id,
                item.state,
                item.frames_since_seen
            );
        }
        stale
    }
}

/// Greedy IoU matching: pairs sorted by descending IoU, each track/detection
/// used at most once. Pairs below `thresh` never match.
fn greedy_match(
    items: &[TrackedItem],
    detections: &[BoundingBox],
    thresh: f64,
) -> Vec<(usize, usize)> {
    let mut pairs: Vec<(usize, usize, f64)> = Vec::new();
    for (ti, item) in items.iter().enumerate() {
        for (di, det) in detections.iter().enumerate() {
            let score = iou(&item.bbox, det);
            if score >= thresh && score > 0.0 {
                pairs.push((ti, di, score));
            }
        }
    }
    // Stable sort: ties keep (track, detection) order.
    pairs.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut used_items = HashSet::new();
    let mut used_dets = HashSet::new();
    let mut matches = Vec::new();

    for (ti, di, _) in pairs {
        if !used_items.contains(&ti) && !used_dets.contains(&di) {
            used_items.insert(ti);
            used_dets.insert(di);
            matches.push((ti, di));
        }
    }
    matches
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::domain::tracked_item::AlertState;

    fn bbox(x1: f64, y1: f64, x2: f64, y2: f64) -> BoundingBox {
        BoundingBox::from_corners(x1, y1, x2, y2)
    }

    fn tracker(grace_frames: usize) -> IdentityTracker {
        IdentityTracker::new(TrackerConfig {
            grace_frames,
            ..TrackerConfig::default()
        })
    }

    #[test]
    fn test_identity_stable_under_small_motion() {
        let mut t = tracker(10);
        let u1 = t.update(&[bbox(10.0, 10.0, 30.0, 30.0)]);
        let id = u1.id_for_detection(0).unwrap();

        let u2 = t.update(&[bbox(12.0, 11.0, 31.0, 29.0)]);
        assert_eq!(u2.id_for_detection(0), Some(id));
        assert_eq!(t.len(), 1);
        assert_eq!(t.get(id).unwrap().bbox, bbox(12.0, 11.0, 31.0, 29.0));
    }

    #[test]
    fn test_new_detections_get_distinct_ids() {
        let mut t = tracker(10);
        let u = t.update(&[bbox(0.0, 0.0, 50.0, 50.0), bbox(100.0, 100.0, 150.0, 150.0)]);
        let a = u.id_for_detection(0).unwrap();
        let b = u.id_for_detection(1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_unmatched_detection_gets_fresh_id() {
        let mut t = tracker(10);
        let first = t.update(&[bbox(0.0, 0.0, 20.0, 20.0)]).id_for_detection(0).unwrap();

        // Far away: IoU 0, so this cannot continue the first identity.
        let u = t.update(&[bbox(0.0, 0.0, 20.0, 20.0), bbox(200.0, 200.0, 220.0, 220.0)]);
        let second = u.id_for_detection(1).unwrap();
        assert_ne!(first, second);
        assert_eq!(u.id_for_detection(0), Some(first));
        assert!(t.items().iter().all(|i| i.state == AlertState::Unobserved));
    }

    #[test]
    fn test_low_overlap_below_threshold_spawns_new_identity() {
        let mut t = tracker(10);
        let first = t.update(&[bbox(0.0, 0.0, 10.0, 10.0)]).id_for_detection(0).unwrap();
        // IoU 25/175 ≈ 0.14 < 0.3
        let u = t.update(&[bbox(5.0, 5.0, 15.0, 15.0)]);
        assert_ne!(u.id_for_detection(0), Some(first));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_greedy_prefers_highest_iou() {
        let mut t = tracker(10);
        let u1 = t.update(&[bbox(0.0, 0.0, 20.0, 20.0), bbox(30.0, 0.0, 50.0, 20.0)]);
        let left = u1.id_for_detection(0).unwrap();
        let right = u1.id_for_detection(1).unwrap();

        // Detections listed in swapped order and nudged.
        let u2 = t.update(&[bbox(31.0, 0.0, 51.0, 20.0), bbox(1.0, 0.0, 21.0, 20.0)]);
        assert_eq!(u2.id_for_detection(0), Some(right));
        assert_eq!(u2.id_for_detection(1), Some(left));
    }

    #[test]
    fn test_each_identity_consumed_once() {
        let mut t = tracker(10);
        let id = t.update(&[bbox(0.0, 0.0, 20.0, 20.0)]).id_for_detection(0).unwrap();

        // Two detections both overlap the single identity; only the better one keeps it.
        let u = t.update(&[bbox(2.0, 2.0, 22.0, 22.0), bbox(0.0, 0.0, 20.0, 21.0)]);
        assert_eq!(u.id_for_detection(1), Some(id));
        assert_ne!(u.id_for_detection(0), Some(id));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_unmatched_items_age() {
        let mut t = tracker(10);
        let id = t.update(&[bbox(0.0, 0.0, 20.0, 20.0)]).id_for_detection(0).unwrap();
        t.update(&[]);
        t.update(&[]);
        assert_eq!(t.get(id).unwrap().frames_since_seen, 2);

        t.update(&[bbox(1.0, 1.0, 21.0, 21.0)]);
        assert_eq!(t.get(id).unwrap().frames_since_seen, 0);
    }

    #[test]
    fn test_survives_within_grace_window() {
        let mut t = tracker(3);
        let id = t.update(&[bbox(10.0, 10.0, 60.0, 60.0)]).id_for_detection(0).unwrap();
        for _ in 0..3 {
            assert!(t.update(&[]).evicted.is_empty());
        }
        let u = t.update(&[bbox(12.0, 12.0, 62.0, 62.0)]);
        assert_eq!(u.id_for_detection(0), Some(id));
    }

    #[test]
    fn test_eviction_after_grace_window_without_revival() {
        let mut t = tracker(10);
        let id = t.update(&[bbox(10.0, 10.0, 30.0, 30.0)]).id_for_detection(0).unwrap();

        for _ in 0..10 {
            assert!(t.update(&[]).evicted.is_empty());
        }
        let u = t.update(&[]);
        assert_eq!(u.evicted.len(), 1);
        assert_eq!(u.evicted[0].id, id);
        assert_eq!(u.evicted[0].frames_since_seen, 11);
        assert!(t.is_empty());

        let u = t.update(&[bbox(10.0, 10.0, 30.0, 30.0)]);
        let revived = u.id_for_detection(0).unwrap();
        assert_ne!(revived, id);
        assert!(revived > id);
    }

    #[test]
    fn test_zero_grace_evicts_on_first_miss() {
        let mut t = tracker(0);
        t.update(&[bbox(0.0, 0.0, 10.0, 10.0)]);
        assert_eq!(t.update(&[]).evicted.len(), 1);
    }

    #[test]
    fn test_ids_are_monotonic() {
        let mut t = tracker(0);
        let mut last = 0;
        for i in 0..5 {
            let offset = i as f64 * 100.0;
            let u = t.update(&[bbox(offset, 0.0, offset + 10.0, 10.0)]);
            let id = u.id_for_detection(0).unwrap();
            assert!(id > last);
            last = id;
        }
    }

    #[test]
    fn test_empty_frame_on_empty_tracker() {
        let mut t = tracker(10);
        assert_eq!(t.update(&[]), TrackerUpdate::default());
    }
}
