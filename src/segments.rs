//! Segment registry.
//!
//! Derives, for every identity slot, the first and last frame in which its
//! reference node has a valid position, and sorts the resulting segments
//! into complete tracks, broken tracks and orphans.

use std::collections::HashMap;

use log::warn;

use crate::error::{Result, StitchError};
use crate::timeline::{IdentityTable, PositionTimeline};
use crate::TrackSpan;

/// The valid frame interval of one identity slot.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Segment {
    pub slot: usize,
    pub name: String,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl Segment {
    pub fn span(&self) -> TrackSpan {
        TrackSpan::new(self.name.clone(), self.start_frame, self.end_frame)
    }
}

/// First and last frame where the slot's reference node is fully valid.
///
/// Returns `None` if the slot has no valid frame at all.
pub fn derive_segment(
    slot: usize,
    timeline: &PositionTimeline,
    reference_node: usize,
) -> Option<(usize, usize)> {
    let frames = 0..timeline.frame_count();
    let valid = |frame: &usize| timeline.point(*frame, reference_node, slot).is_some();

    let start = frames.clone().find(valid)?;
    let end = frames.rev().find(valid)?;
    Some((start, end))
}

/// Tracks grouped by how they relate to the recording's first and last frame.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackPartition {
    /// Start at frame zero and reach the last frame
    pub complete: Vec<Segment>,
    /// Start at frame zero but end early (stitch roots)
    pub broken: Vec<Segment>,
    /// Start after frame zero (stitch candidates)
    pub orphans: Vec<Segment>,
}

/// Segments of every identity slot with at least one valid frame.
#[derive(Debug, Clone, Default)]
pub struct SegmentRegistry {
    segments: Vec<Segment>,
    by_name: HashMap<String, usize>,
    missing: Vec<StitchError>,
}

impl SegmentRegistry {
    /// Derive a segment for every slot of the timeline.
    ///
    /// Slots without any valid frame are left out and reported through
    /// [`missing`](Self::missing). Fails only if the identity table does not
    /// have one name per slot.
    pub fn build(
        timeline: &PositionTimeline,
        names: &IdentityTable,
        reference_node: usize,
    ) -> Result<Self> {
        if names.len() != timeline.slot_count() {
            return Err(StitchError::IdentityCountMismatch {
                names: names.len(),
                slots: timeline.slot_count(),
            });
        }

        let mut registry = Self::default();
        for (slot, name) in names.iter() {
            match derive_segment(slot, timeline, reference_node) {
                Some((start_frame, end_frame)) => {
                    registry.by_name.insert(name.to_string(), registry.segments.len());
                    registry.segments.push(Segment {
                        slot,
                        name: name.to_string(),
                        start_frame,
                        end_frame,
                    });
                }
                None => {
                    warn!("Identity slot {} ({}) has no valid frame, excluded", slot, name);
                    registry.missing.push(StitchError::MissingSegmentData {
                        slot,
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(registry)
    }

    /// Segments in ascending slot order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn get(&self, name: &str) -> Option<&Segment> {
        self.by_name.get(name).map(|&i| &self.segments[i])
    }

    /// Slots excluded because they never had a valid frame.
    pub fn missing(&self) -> &[StitchError] {
        &self.missing
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Split segments into complete, broken and orphan tracks.
    pub fn partition(&self, frame_count: usize) -> TrackPartition {
        let mut partition = TrackPartition::default();
        for segment in &self.segments {
            if segment.start_frame != 0 {
                partition.orphans.push(segment.clone());
            } else if crate::completion::is_complete(segment.end_frame, frame_count) {
                partition.complete.push(segment.clone());
            } else {
                partition.broken.push(segment.clone());
            }
        }
        partition
    }
}
