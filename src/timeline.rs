//! # Position Timeline
//!
//! The dense position array produced by the pose tracker, and the table of
//! identity names for its slots.
//!
//! The array is indexed by `(frame, node, axis, slot)`, the layout of a
//! tracker export once transposed: every frame holds, for every body node,
//! the x and y coordinate of every identity slot. Missing data is NaN.
//!
//! ## Example
//!
//! ```rust
//! use track_stitcher::{PositionTimeline, TrackPoint};
//!
//! let mut timeline = PositionTimeline::empty(3, 1, 2);
//! timeline.set_point(1, 0, 1, TrackPoint::new(4.0, 2.0));
//!
//! assert_eq!(timeline.point(1, 0, 1), Some(TrackPoint::new(4.0, 2.0)));
//! assert_eq!(timeline.point(0, 0, 1), None);
//! ```

use std::collections::HashMap;
use std::ops::RangeInclusive;

use crate::error::{Result, StitchError};
use crate::TrackPoint;

// =============================================================================
// Position Timeline
// =============================================================================

/// Dense `frame × node × axis × slot` array of coordinates.
#[derive(Debug, Clone)]
pub struct PositionTimeline {
    frame_count: usize,
    node_count: usize,
    slot_count: usize,
    data: Vec<f64>,
}

/// Missing entries compare equal to each other.
impl PartialEq for PositionTimeline {
    fn eq(&self, other: &Self) -> bool {
        self.frame_count == other.frame_count
            && self.node_count == other.node_count
            && self.slot_count == other.slot_count
            && self.data.len() == other.data.len()
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan()))
    }
}

impl PositionTimeline {
    /// Wrap flat data laid out as `[frame][node][axis][slot]`.
    ///
    /// Returns an error if the length does not equal
    /// `frame_count * node_count * 2 * slot_count`.
    pub fn new(
        frame_count: usize,
        node_count: usize,
        slot_count: usize,
        data: Vec<f64>,
    ) -> Result<Self> {
        let expected = frame_count * node_count * 2 * slot_count;
        if data.len() != expected {
            return Err(StitchError::InvalidShape {
                frames: frame_count,
                nodes: node_count,
                slots: slot_count,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            frame_count,
            node_count,
            slot_count,
            data,
        })
    }

    /// A timeline where every position is missing.
    pub fn empty(frame_count: usize, node_count: usize, slot_count: usize) -> Self {
        Self {
            frame_count,
            node_count,
            slot_count,
            data: vec![f64::NAN; frame_count * node_count * 2 * slot_count],
        }
    }

    /// Build a single-node timeline from per-slot tracks.
    ///
    /// `tracks[slot][frame]` is the position of that slot in that frame, or
    /// `None` when the tracker lost it. Every track must have `frame_count`
    /// entries.
    pub fn from_tracks(frame_count: usize, tracks: &[Vec<Option<TrackPoint>>]) -> Result<Self> {
        let mut timeline = Self::empty(frame_count, 1, tracks.len());
        for (slot, track) in tracks.iter().enumerate() {
            if track.len() != frame_count {
                return Err(StitchError::InvalidShape {
                    frames: frame_count,
                    nodes: 1,
                    slots: tracks.len(),
                    expected: frame_count,
                    actual: track.len(),
                });
            }
            for (frame, point) in track.iter().enumerate() {
                if let Some(point) = point {
                    timeline.set_point(frame, 0, slot, *point);
                }
            }
        }
        Ok(timeline)
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn slot_count(&self) -> usize {
        self.slot_count
    }

    /// Index of the final frame, or `None` for an empty timeline.
    pub fn last_frame(&self) -> Option<usize> {
        self.frame_count.checked_sub(1)
    }

    fn offset(&self, frame: usize, node: usize, axis: usize, slot: usize) -> usize {
        ((frame * self.node_count + node) * 2 + axis) * self.slot_count + slot
    }

    fn in_bounds(&self, frame: usize, node: usize, slot: usize) -> bool {
        frame < self.frame_count && node < self.node_count && slot < self.slot_count
    }

    /// Raw coordinate value (NaN when missing or out of range).
    pub fn value(&self, frame: usize, node: usize, axis: usize, slot: usize) -> f64 {
        if axis > 1 || !self.in_bounds(frame, node, slot) {
            return f64::NAN;
        }
        self.data[self.offset(frame, node, axis, slot)]
    }

    /// Position of a node, or `None` if either coordinate is missing.
    pub fn point(&self, frame: usize, node: usize, slot: usize) -> Option<TrackPoint> {
        let point = TrackPoint::new(
            self.value(frame, node, 0, slot),
            self.value(frame, node, 1, slot),
        );
        point.is_valid().then_some(point)
    }

    /// Set the position of a node.
    ///
    /// # Panics
    ///
    /// Panics if frame, node or slot is out of range.
    pub fn set_point(&mut self, frame: usize, node: usize, slot: usize, point: TrackPoint) {
        assert!(
            self.in_bounds(frame, node, slot),
            "position ({frame}, {node}, {slot}) outside timeline of {}x{}x{}",
            self.frame_count,
            self.node_count,
            self.slot_count
        );
        let x = self.offset(frame, node, 0, slot);
        let y = self.offset(frame, node, 1, slot);
        self.data[x] = point.x;
        self.data[y] = point.y;
    }

    /// Valid positions of one node of one slot within a frame range.
    ///
    /// The range is clipped to the timeline; missing frames are skipped.
    pub fn points_in(
        &self,
        slot: usize,
        node: usize,
        frames: RangeInclusive<usize>,
    ) -> impl Iterator<Item = (usize, TrackPoint)> + '_ {
        let last = self.last_frame().unwrap_or(0);
        let start = *frames.start();
        let end = (*frames.end()).min(last);
        let empty = self.frame_count == 0 || start > end;
        let range = if empty { 1..=0 } else { start..=end };
        range.filter_map(move |frame| self.point(frame, node, slot).map(|p| (frame, p)))
    }
}

// =============================================================================
// Identity Table
// =============================================================================

/// Human-readable names of the identity slots, in slot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IdentityTable {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl IdentityTable {
    /// Create a table from slot names. Names must be unique.
    pub fn new(names: Vec<String>) -> Result<Self> {
        let mut index = HashMap::with_capacity(names.len());
        for (slot, name) in names.iter().enumerate() {
            if index.insert(name.clone(), slot).is_some() {
                return Err(StitchError::DuplicateIdentity { name: name.clone() });
            }
        }
        Ok(Self { names, index })
    }

    /// Tracker-style names `track_0`, `track_1`, ...
    pub fn numbered(count: usize) -> Self {
        let names: Vec<String> = (0..count).map(|i| format!("track_{i}")).collect();
        let index = names
            .iter()
            .enumerate()
            .map(|(slot, name)| (name.clone(), slot))
            .collect();
        Self { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, slot: usize) -> Option<&str> {
        self.names.get(slot).map(String::as_str)
    }

    pub fn slot_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> {
        self.names.iter().enumerate().map(|(slot, n)| (slot, n.as_str()))
    }
}

// =============================================================================
// Tests
// =============================================================================
