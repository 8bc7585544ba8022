//! # Track Stitcher
//!
//! Reconnects fragmented multi-animal tracking output into continuous
//! identity trajectories.
//!
//! Pose trackers lose individuals: an animal tracked from the first frame
//! disappears mid-recording and reappears later under a fresh identity slot.
//! This library finds, for every track that ends early, the orphan segment
//! that most plausibly continues it, and fuses segments into chains until
//! they reach the end of the recording.
//!
//! This library provides:
//! - Segment extraction from a dense position timeline
//! - Greedy continuation matching with spatial, temporal and local-consistency checks
//! - An iterative stitch engine that grows chains to a fixed point
//! - Travelled-distance reports for complete tracks and stitched chains
//!
//! ## Features
//!
//! - **`parallel`** - Score roots of a pass in parallel with rayon
//! - **`serde`** - Serialize configuration and results
//! - **`synthetic`** - Seeded generator of fragmented timelines
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use track_stitcher::{reconnect_tracks, IdentityTable, PositionTimeline, StitchConfig, TrackPoint};
//!
//! // Ten frames, one body node, two identity slots.
//! // "a" is lost after frame 4, "b" appears at frame 6.
//! let mut timeline = PositionTimeline::empty(10, 1, 2);
//! for frame in 0..=4 {
//!     timeline.set_point(frame, 0, 0, TrackPoint::new(frame as f64, 0.0));
//! }
//! for frame in 6..10 {
//!     timeline.set_point(frame, 0, 1, TrackPoint::new(frame as f64, 0.0));
//! }
//!
//! let names = IdentityTable::new(vec!["a".to_string(), "b".to_string()]).unwrap();
//! let report = reconnect_tracks(&timeline, &names, &StitchConfig::default()).unwrap();
//!
//! assert_eq!(report.stitch.completed, vec!["a_b".to_string()]);
//! ```

use geo::{Distance, Euclidean, Point};
use log::info;

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, StitchError};

// Dense position array and identity names
pub mod timeline;
pub use timeline::{IdentityTable, PositionTimeline};

// Segment registry (first/last valid frame per identity slot)
pub mod segments;
pub use segments::{derive_segment, Segment, SegmentRegistry, TrackPartition};

// Candidate matching (scoring of possible continuations)
pub mod matcher;
pub use matcher::{CandidateIndex, CandidateMatcher, CandidatePool, Continuation, MatchOutcome};

// Chain bookkeeping and composite names
pub mod chain;
pub use chain::{composite_name, ChainBuilder, TrackChain, CHAIN_SEPARATOR};

// Completion detection
pub mod completion;
pub use completion::{is_complete, Completion, CompletionDetector};

// Iterative stitch engine
pub mod stitch;
pub use stitch::{RootReport, RootState, StitchEngine, StitchResult};

// Travelled distance per track and chain
pub mod distance;
pub use distance::{chain_distance, track_distance, DistanceReport};

#[cfg(feature = "synthetic")]
pub mod synthetic;

// ============================================================================
// Core Types
// ============================================================================

/// A 2D position of a tracked body node.
///
/// # Example
/// ```
/// use track_stitcher::TrackPoint;
/// let a = TrackPoint::new(0.0, 0.0);
/// let b = TrackPoint::new(3.0, 4.0);
/// assert_eq!(a.distance_to(&b), 5.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
}

impl TrackPoint {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Check that neither coordinate is missing.
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Euclidean distance to another point, in timeline units (usually pixels).
    pub fn distance_to(&self, other: &TrackPoint) -> f64 {
        Euclidean::distance(Point::new(self.x, self.y), Point::new(other.x, other.y))
    }
}

/// A named frame interval: a raw segment or a growing chain.
///
/// Roots and candidates in the stitch engine are both spans. For a root the
/// name is the chain's composite name and `end_frame` moves forward as
/// segments are fused onto it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackSpan {
    pub name: String,
    pub start_frame: usize,
    pub end_frame: usize,
}

impl TrackSpan {
    pub fn new(name: impl Into<String>, start_frame: usize, end_frame: usize) -> Self {
        Self {
            name: name.into(),
            start_frame,
            end_frame,
        }
    }

    /// Number of frames covered, inclusive of both ends.
    pub fn frame_len(&self) -> usize {
        self.end_frame.saturating_sub(self.start_frame) + 1
    }
}

/// A committed match between a root and the candidate that continues it.
///
/// Produced once per pairing and never modified afterwards.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    /// Composite name of the root chain at the time of the match
    pub root_name: String,
    pub root_start: usize,
    /// End frame of the root before it was extended
    pub root_end: usize,
    pub candidate_name: String,
    pub candidate_start: usize,
    pub candidate_end: usize,
    /// Temporal gap used for scoring (negative = overlap)
    pub frame_diff: i64,
    /// Distance between the root's last point and the candidate's first point
    pub spatial_distance: f64,
    /// Suitability score (`frame_diff + spatial_distance`, lower is better)
    pub score: f64,
}

/// Configuration for track reconnection.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StitchConfig {
    /// Maximum temporal gap in frames between a root's end and a candidate's start.
    /// Overlaps down to half this window are tolerated.
    /// Default: 100 frames
    pub frame_window: usize,

    /// Maximum distance between a root's last point and a candidate's first point.
    /// Default: 2000.0 (timeline units)
    pub distance_threshold: f64,

    /// Half-width in frames of the window around a candidate's start that is
    /// searched for a point agreeing with the root, and the distance such a
    /// point must be within.
    /// Default: 90
    pub consistency_radius: usize,

    /// How far below zero the frame offset sweep starts.
    /// Default: 10 frames
    pub overlap_allowance: usize,

    /// Body node whose position represents an individual.
    /// Default: 0
    pub reference_node: usize,

    /// Optional hard bound on stitch passes. The engine always reaches a fixed
    /// point within `candidates` passes; this is for callers that want less.
    /// Default: None
    pub max_passes: Option<usize>,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            frame_window: 100,
            distance_threshold: 2000.0,
            consistency_radius: 90,
            overlap_allowance: 10,
            reference_node: 0,
            max_passes: None,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Everything produced by one reconnection run.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReconnectionReport {
    /// Segments split into complete tracks, broken tracks and orphans
    pub partition: TrackPartition,
    /// Connections, chains and completion state from the stitch engine
    pub stitch: StitchResult,
    /// Travelled distance for complete tracks and every chain
    pub distances: DistanceReport,
    /// Identity slots that had no valid frame at all
    pub missing: Vec<StitchError>,
}

/// Run the full reconnection pipeline over a loaded timeline.
///
/// Derives a segment for every identity slot, treats tracks that start at
/// frame zero but end early as roots and everything starting later as
/// candidates, stitches, and computes travelled distances.
///
/// Fails only when the identity table does not fit the timeline.
pub fn reconnect_tracks(
    timeline: &PositionTimeline,
    names: &IdentityTable,
    config: &StitchConfig,
) -> Result<ReconnectionReport> {
    let registry = SegmentRegistry::build(timeline, names, config.reference_node)?;
    let partition = registry.partition(timeline.frame_count());

    info!(
        "Reconnecting {} slots: {} complete, {} broken, {} orphans, {} empty",
        timeline.slot_count(),
        partition.complete.len(),
        partition.broken.len(),
        partition.orphans.len(),
        registry.missing().len()
    );

    let roots: Vec<TrackSpan> = partition.broken.iter().map(Segment::span).collect();
    let candidates: Vec<TrackSpan> = partition.orphans.iter().map(Segment::span).collect();

    let engine = StitchEngine::new(timeline, names, config);
    let stitch = engine.run(roots, candidates);

    let distances = DistanceReport::build(
        timeline,
        &registry,
        &partition.complete,
        &stitch.chains,
        config.reference_node,
    );

    Ok(ReconnectionReport {
        partition,
        stitch,
        distances,
        missing: registry.missing().to_vec(),
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_point_validation() {
        assert!(TrackPoint::new(1.0, 2.0).is_valid());
        assert!(!TrackPoint::new(f64::NAN, 2.0).is_valid());
        assert!(!TrackPoint::new(1.0, f64::NAN).is_valid());
    }

    #[test]
    fn test_distance_to() {
        let a = TrackPoint::new(10.0, 10.0);
        let b = TrackPoint::new(10.0, 11.0);
        assert!((a.distance_to(&b) - 1.0).abs() < 1e-12);
        assert_eq!(a.distance_to(&a), 0.0);
    }

    #[test]
    fn test_span_frame_len() {
        assert_eq!(TrackSpan::new("a", 3, 3).frame_len(), 1);
        assert_eq!(TrackSpan::new("a", 0, 9).frame_len(), 10);
    }

    #[test]
    fn test_default_config() {
        let config = StitchConfig::default();
        assert_eq!(config.frame_window, 100);
        assert_eq!(config.distance_threshold, 2000.0);
        assert_eq!(config.consistency_radius, 90);
        assert!(config.max_passes.is_none());
    }

    #[test]
    fn test_reconnect_two_fragments() {
        let mut timeline = PositionTimeline::empty(20, 1, 2);
        for frame in 0..10 {
            timeline.set_point(frame, 0, 0, TrackPoint::new(100.0 + frame as f64, 50.0));
        }
        for frame in 12..20 {
            timeline.set_point(frame, 0, 1, TrackPoint::new(100.0 + frame as f64, 50.0));
        }
        let names = IdentityTable::numbered(2);

        let report = reconnect_tracks(&timeline, &names, &StitchConfig::default()).unwrap();

        assert_eq!(report.partition.broken.len(), 1);
        assert_eq!(report.partition.orphans.len(), 1);
        assert_eq!(report.stitch.connections.len(), 1);
        assert_eq!(report.stitch.completed, vec!["track_0_track_1".to_string()]);
        assert!(report.stitch.still_broken.is_empty());
        assert!(report.missing.is_empty());
    }

    #[test]
    fn test_reconnect_rejects_mismatched_names() {
        let timeline = PositionTimeline::empty(5, 1, 3);
        let names = IdentityTable::numbered(2);
        let result = reconnect_tracks(&timeline, &names, &StitchConfig::default());
        assert!(matches!(
            result,
            Err(StitchError::IdentityCountMismatch { names: 2, slots: 3 })
        ));
    }
}
