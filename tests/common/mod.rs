//! Shared fixtures for integration tests.

#![allow(dead_code)]

use track_stitcher::{IdentityTable, PositionTimeline, TrackPoint};

/// A fragmented timeline with known identities.
pub struct Fragmented {
    pub timeline: PositionTimeline,
    pub names: IdentityTable,
    /// Per individual: its segment names in time order
    pub truth: Vec<Vec<String>>,
    /// Slots of decoy segments that belong to nobody
    pub decoys: Vec<String>,
}

/// Position of individual `i` at `frame`: walking right along its own lane.
pub fn lane_point(i: usize, frame: usize, lane_spacing: f64) -> TrackPoint {
    let x = frame as f64 * 0.8;
    let y = i as f64 * lane_spacing + 2.0 * (frame as f64 * 0.1).sin();
    TrackPoint::new(x, y)
}

/// Individuals walking along parallel lanes, each visible only in the given
/// frame ranges. Slots are numbered piece by piece (all first pieces, then
/// all second pieces, ...), followed by decoys held at a fixed point.
pub fn lanes(
    frame_count: usize,
    lane_spacing: f64,
    pieces: &[Vec<(usize, usize)>],
    decoys: &[(usize, usize, TrackPoint)],
) -> Fragmented {
    let max_pieces = pieces.iter().map(Vec::len).max().unwrap_or(0);
    let mut assignment: Vec<(usize, usize, usize)> = Vec::new(); // (individual, start, end)
    for k in 0..max_pieces {
        for (i, ranges) in pieces.iter().enumerate() {
            if let Some(&(start, end)) = ranges.get(k) {
                assignment.push((i, start, end));
            }
        }
    }

    let slot_count = assignment.len() + decoys.len();
    let names = IdentityTable::numbered(slot_count);
    let mut timeline = PositionTimeline::empty(frame_count, 1, slot_count);
    let mut truth = vec![Vec::new(); pieces.len()];

    for (slot, &(i, start, end)) in assignment.iter().enumerate() {
        for frame in start..=end {
            timeline.set_point(frame, 0, slot, lane_point(i, frame, lane_spacing));
        }
        truth[i].push(names.name(slot).unwrap().to_string());
    }

    let mut decoy_names = Vec::new();
    for (d, &(start, end, point)) in decoys.iter().enumerate() {
        let slot = assignment.len() + d;
        for frame in start..=end {
            timeline.set_point(frame, 0, slot, point);
        }
        decoy_names.push(names.name(slot).unwrap().to_string());
    }

    Fragmented {
        timeline,
        names,
        truth,
        decoys: decoy_names,
    }
}

/// Four individuals over 500 frames: three are lost one to three times,
/// the fourth is tracked throughout. One decoy sits far from everyone.
pub fn four_individuals(lane_spacing: f64) -> Fragmented {
    lanes(
        500,
        lane_spacing,
        &[
            vec![(0, 120), (130, 300), (305, 499)],
            vec![(0, 200), (215, 499)],
            vec![(0, 80), (95, 250), (260, 400), (410, 499)],
            vec![(0, 499)],
        ],
        &[(100, 150, TrackPoint::new(9000.0, 9000.0))],
    )
}

/// Composite names of every individual that was fragmented, sorted.
pub fn expected_chains(data: &Fragmented) -> Vec<String> {
    let mut names: Vec<String> = data
        .truth
        .iter()
        .filter(|segments| segments.len() > 1)
        .map(|segments| segments.join("_"))
        .collect();
    names.sort();
    names
}
