//! # Travelled Distance
//!
//! Distance covered by complete tracks and by stitched chains.
//!
//! A track's distance sums the steps between consecutive frames where both
//! positions are present; gaps inside a segment contribute nothing. A chain
//! adds up its segments and the jump across every junction, from the end
//! point of one segment to the start point of the next.

use std::fmt;

use crate::chain::TrackChain;
use crate::segments::{Segment, SegmentRegistry};
use crate::timeline::PositionTimeline;

/// Distance travelled by one slot between two frames (inclusive).
pub fn track_distance(
    timeline: &PositionTimeline,
    slot: usize,
    reference_node: usize,
    start_frame: usize,
    end_frame: usize,
) -> f64 {
    if end_frame <= start_frame {
        return 0.0;
    }
    (start_frame..end_frame)
        .filter_map(|frame| {
            let a = timeline.point(frame, reference_node, slot)?;
            let b = timeline.point(frame + 1, reference_node, slot)?;
            Some(a.distance_to(&b))
        })
        .sum()
}

/// Distance travelled along a chain, junction jumps included.
///
/// Segments missing from the registry are skipped.
pub fn chain_distance(
    timeline: &PositionTimeline,
    registry: &SegmentRegistry,
    chain: &TrackChain,
    reference_node: usize,
) -> f64 {
    let segments: Vec<&Segment> = chain
        .segments
        .iter()
        .filter_map(|name| registry.get(name))
        .collect();

    let within: f64 = segments
        .iter()
        .map(|s| track_distance(timeline, s.slot, reference_node, s.start_frame, s.end_frame))
        .sum();

    let junctions: f64 = segments
        .windows(2)
        .filter_map(|pair| {
            let end = timeline.point(pair[0].end_frame, reference_node, pair[0].slot)?;
            let start = timeline.point(pair[1].start_frame, reference_node, pair[1].slot)?;
            Some(end.distance_to(&start))
        })
        .sum();

    within + junctions
}

/// Travelled distance per track name, in report order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceReport {
    pub entries: Vec<(String, f64)>,
}

impl DistanceReport {
    /// Complete tracks first (slot order), then every chain (root order)
    /// under its composite name.
    pub fn build(
        timeline: &PositionTimeline,
        registry: &SegmentRegistry,
        complete: &[Segment],
        chains: &[TrackChain],
        reference_node: usize,
    ) -> Self {
        let mut entries = Vec::with_capacity(complete.len() + chains.len());
        for segment in complete {
            let distance = track_distance(
                timeline,
                segment.slot,
                reference_node,
                segment.start_frame,
                segment.end_frame,
            );
            entries.push((segment.name.clone(), distance));
        }
        for chain in chains {
            let distance = chain_distance(timeline, registry, chain, reference_node);
            entries.push((chain.name(), distance));
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, d)| d)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum over all entries.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, d)| d).sum()
    }
}

/// One `name: distance` line per entry.
impl fmt::Display for DistanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, distance) in &self.entries {
            writeln!(f, "{}: {}", name, distance)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::IdentityTable;
    use crate::TrackPoint;

    #[test]
    fn test_track_distance_skips_gaps() {
        let mut timeline = PositionTimeline::empty(6, 1, 1);
        timeline.set_point(0, 0, 0, TrackPoint::new(0.0, 0.0));
        timeline.set_point(1, 0, 0, TrackPoint::new(3.0, 4.0));
        // frame 2 missing
        timeline.set_point(3, 0, 0, TrackPoint::new(100.0, 100.0));
        timeline.set_point(4, 0, 0, TrackPoint::new(100.0, 101.0));

        assert!((track_distance(&timeline, 0, 0, 0, 5) - 6.0).abs() < 1e-12);
        assert_eq!(track_distance(&timeline, 0, 0, 3, 3), 0.0);
    }

    #[test]
    fn test_chain_distance_includes_junction() {
        let mut timeline = PositionTimeline::empty(10, 1, 2);
        for frame in 0..5 {
            timeline.set_point(frame, 0, 0, TrackPoint::new(frame as f64, 0.0));
        }
        for frame in 6..10 {
            timeline.set_point(frame, 0, 1, TrackPoint::new(frame as f64, 0.0));
        }
        let names = IdentityTable::numbered(2);
        let registry = SegmentRegistry::build(&timeline, &names, 0).unwrap();

        let mut chain = TrackChain::new("track_0");
        chain.segments.push("track_1".to_string());

        // 4 + 3 within segments, 2 across the junction (4 -> 6)
        let distance = chain_distance(&timeline, &registry, &chain, 0);
        assert!((distance - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_report_display() {
        let report = DistanceReport {
            entries: vec![("track_0".to_string(), 12.5), ("track_1_track_4".to_string(), 3.0)],
        };
        assert_eq!(report.to_string(), "track_0: 12.5\ntrack_1_track_4: 3\n");
        assert_eq!(report.get("track_0"), Some(12.5));
        assert_eq!(report.total(), 15.5);
    }
}
