//! Invariants that hold for any stitch run

mod common;

use std::collections::HashSet;

use common::{expected_chains, four_individuals, Fragmented};
use track_stitcher::{SegmentRegistry, StitchConfig, StitchEngine, StitchResult, TrackSpan};

fn inputs(data: &Fragmented) -> (Vec<TrackSpan>, Vec<TrackSpan>) {
    let registry = SegmentRegistry::build(&data.timeline, &data.names, 0).unwrap();
    let partition = registry.partition(data.timeline.frame_count());
    let roots = partition.broken.iter().map(|s| s.span()).collect();
    let candidates = partition.orphans.iter().map(|s| s.span()).collect();
    (roots, candidates)
}

fn stitch(data: &Fragmented, config: &StitchConfig) -> (StitchResult, usize) {
    let (roots, candidates) = inputs(data);
    let pool_size = candidates.len();
    let result = StitchEngine::new(&data.timeline, &data.names, config).run(roots, candidates);
    (result, pool_size)
}

#[test]
fn test_recovers_ground_truth_on_separated_lanes() {
    let data = four_individuals(5000.0);
    let (result, _) = stitch(&data, &StitchConfig::default());

    let mut completed = result.completed.clone();
    completed.sort();
    assert_eq!(completed, expected_chains(&data));
    assert!(result.still_broken.is_empty());
    assert_eq!(
        result.remaining_candidates,
        vec![TrackSpan::new(data.decoys[0].clone(), 100, 150)]
    );
}

#[test]
fn test_recovers_ground_truth_on_close_lanes() {
    // Neighbouring lanes fall inside the distance threshold
    let data = four_individuals(60.0);
    let (result, _) = stitch(&data, &StitchConfig::default());

    let mut completed = result.completed.clone();
    completed.sort();
    assert_eq!(completed, expected_chains(&data));
    assert_eq!(result.passes, 3);
    assert_eq!(result.connections.len(), 6);
}

#[test]
fn test_terminates_within_pool_size() {
    for spacing in [60.0, 5000.0] {
        let data = four_individuals(spacing);
        let (result, pool_size) = stitch(&data, &StitchConfig::default());
        assert!(result.passes <= pool_size);
        assert!(result.connections.len() <= pool_size);
    }
}

#[test]
fn test_no_candidate_used_twice() {
    let data = four_individuals(60.0);
    let (result, _) = stitch(&data, &StitchConfig::default());

    let mut used = HashSet::new();
    for connection in &result.connections {
        assert!(used.insert(connection.candidate_name.clone()));
    }

    let in_chains: HashSet<&String> = result
        .chains
        .iter()
        .flat_map(|c| c.segments.iter().skip(1))
        .collect();
    assert_eq!(in_chains.len(), used.len());
    for remaining in &result.remaining_candidates {
        assert!(!in_chains.contains(&remaining.name));
    }
}

#[test]
fn test_connections_respect_thresholds() {
    let data = four_individuals(60.0);
    let config = StitchConfig::default();
    let (result, _) = stitch(&data, &config);

    for connection in &result.connections {
        let chain = result
            .chains
            .iter()
            .find(|c| c.segments.contains(&connection.candidate_name))
            .unwrap();
        let at = chain
            .segments
            .iter()
            .position(|s| *s == connection.candidate_name)
            .unwrap();
        let tail = data.names.slot_of(&chain.segments[at - 1]).unwrap();
        let slot = data.names.slot_of(&connection.candidate_name).unwrap();

        let end = data.timeline.point(connection.root_end, 0, tail).unwrap();
        let start = data
            .timeline
            .point(connection.candidate_start, 0, slot)
            .unwrap();
        let distance = end.distance_to(&start);

        assert!(distance <= config.distance_threshold);
        assert!((distance - connection.spatial_distance).abs() < 1e-9);
        assert!(connection.frame_diff <= config.frame_window as i64);
        assert!(2 * connection.frame_diff > -(config.frame_window as i64));
        assert!(connection.candidate_end > connection.root_end);
    }
}

#[test]
fn test_deterministic() {
    let data = four_individuals(60.0);
    let config = StitchConfig::default();
    let (first, _) = stitch(&data, &config);
    let (second, _) = stitch(&data, &config);
    assert_eq!(first, second);
}

#[test]
fn test_no_candidates_leaves_roots_unchanged() {
    let data = four_individuals(60.0);
    let (roots, _) = inputs(&data);

    let result = StitchEngine::new(&data.timeline, &data.names, &StitchConfig::default())
        .run(roots.clone(), Vec::new());

    assert!(result.connections.is_empty());
    assert!(result.completed.is_empty());
    assert_eq!(result.still_broken, roots);
    assert!(result.chains.iter().all(|c| !c.is_extended()));
}

#[test]
fn test_rerun_on_output_is_stable() {
    let data = four_individuals(60.0);
    let config = StitchConfig::default();
    let (result, _) = stitch(&data, &config);

    // Nothing left to stitch: a second run over the leftovers changes nothing
    let again = StitchEngine::new(&data.timeline, &data.names, &config)
        .run(Vec::new(), result.remaining_candidates.clone());
    assert!(again.connections.is_empty());
    assert_eq!(again.remaining_candidates, result.remaining_candidates);
}
