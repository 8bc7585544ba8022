//! Synthetic tracking data for tests, demos and benchmarking.
//!
//! Simulates individuals wandering across an arena and a tracker that loses
//! them: every individual's trajectory is cut into several segments separated
//! by short gaps, each segment under a fresh identity slot. The ground truth
//! records which segments belong to which individual.
//!
//! Feature-gated behind `synthetic`.
//!
//! # Example
//!
//! ```rust
//! use track_stitcher::synthetic::SyntheticScenario;
//!
//! let scenario = SyntheticScenario {
//!     individuals: 4,
//!     breaks_per_individual: 2,
//!     seed: 7,
//!     ..SyntheticScenario::default()
//! };
//!
//! let dataset = scenario.generate();
//! assert_eq!(dataset.names.len(), 12);
//! assert_eq!(dataset.ground_truth.len(), 4);
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

use crate::chain::composite_name;
use crate::timeline::{IdentityTable, PositionTimeline};
use crate::TrackPoint;

// ============================================================================
// Types
// ============================================================================

/// Scenario configuration for generating synthetic data.
#[derive(Debug, Clone)]
pub struct SyntheticScenario {
    /// Number of individuals in the arena.
    pub individuals: usize,
    /// Recording length in frames.
    pub frame_count: usize,
    /// How many times the tracker loses each individual.
    pub breaks_per_individual: usize,
    /// Shortest and longest gap (in frames) after a break.
    pub gap_frames: (usize, usize),
    /// Arena side length; individuals start spread over it.
    pub arena_size: f64,
    /// Standard deviation of the per-frame step.
    pub step_sigma: f64,
    /// RNG seed for deterministic reproduction.
    pub seed: u64,
}

impl Default for SyntheticScenario {
    fn default() -> Self {
        Self {
            individuals: 5,
            frame_count: 1000,
            breaks_per_individual: 2,
            gap_frames: (2, 20),
            arena_size: 20_000.0,
            step_sigma: 1.5,
            seed: 42,
        }
    }
}

/// A generated timeline with ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticDataset {
    pub timeline: PositionTimeline,
    pub names: IdentityTable,
    /// Per individual: its segment names in time order.
    pub ground_truth: Vec<Vec<String>>,
}

impl SyntheticDataset {
    /// Composite chain names the stitcher should produce for a perfect result.
    pub fn expected_chain_names(&self) -> Vec<String> {
        self.ground_truth
            .iter()
            .map(|segments| composite_name(segments))
            .collect()
    }
}

// ============================================================================
// Generation
// ============================================================================

impl SyntheticScenario {
    pub fn generate(&self) -> SyntheticDataset {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let segments_per_individual = self.breaks_per_individual + 1;
        let slot_count = self.individuals * segments_per_individual;

        let mut timeline = PositionTimeline::empty(self.frame_count, 1, slot_count);
        let names = IdentityTable::numbered(slot_count);
        let mut ground_truth = Vec::with_capacity(self.individuals);

        for individual in 0..self.individuals {
            let path = self.random_walk(&mut rng);
            let pieces = self.split_frames(&mut rng);

            // Slots are numbered so all first segments come first, like a
            // tracker that assigns new identities as it goes.
            let mut truth = Vec::with_capacity(pieces.len());
            for (k, (start, end)) in pieces.into_iter().enumerate() {
                let slot = k * self.individuals + individual;
                for frame in start..=end {
                    timeline.set_point(frame, 0, slot, path[frame]);
                }
                truth.push(names.name(slot).unwrap_or_default().to_string());
            }
            if !truth.is_empty() {
                ground_truth.push(truth);
            }
        }

        SyntheticDataset {
            timeline,
            names,
            ground_truth,
        }
    }

    fn random_walk(&self, rng: &mut StdRng) -> Vec<TrackPoint> {
        let mut x = rng.gen_range(0.0..self.arena_size);
        let mut y = rng.gen_range(0.0..self.arena_size);
        (0..self.frame_count)
            .map(|_| {
                x += gaussian(rng) * self.step_sigma;
                y += gaussian(rng) * self.step_sigma;
                TrackPoint::new(x, y)
            })
            .collect()
    }

    /// Frame ranges of the visible pieces: the first starts at frame zero,
    /// the last ends at the final frame. Short recordings get fewer pieces
    /// than asked for; an empty recording gets none.
    fn split_frames(&self, rng: &mut StdRng) -> Vec<(usize, usize)> {
        let Some(last) = self.frame_count.checked_sub(1) else {
            return Vec::new();
        };
        let pieces = self.breaks_per_individual + 1;
        let piece_len = self.frame_count / pieces;
        let (min_gap, max_gap) = self.gap_frames;

        let mut ranges = Vec::with_capacity(pieces);
        let mut start = 0;
        for k in 0..pieces {
            let end = if k + 1 == pieces {
                last
            } else {
                ((k + 1) * piece_len).max(start + 1).min(last)
            };
            ranges.push((start, end));
            if end == last {
                break;
            }
            let gap = rng.gen_range(min_gap..=max_gap.max(min_gap)).max(1);
            start = (end + gap).min(last);
        }
        ranges
    }
}

/// Standard normal sample via Box-Muller.
fn gaussian(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::derive_segment;

    #[test]
    fn test_generate_deterministic() {
        let scenario = SyntheticScenario::default();
        let a = scenario.generate();
        let b = scenario.generate();
        assert_eq!(a.timeline, b.timeline);
        assert_eq!(a.ground_truth, b.ground_truth);
    }

    #[test]
    fn test_pieces_cover_start_and_end() {
        let scenario = SyntheticScenario::default();
        let dataset = scenario.generate();

        for truth in &dataset.ground_truth {
            let first = dataset.names.slot_of(&truth[0]).unwrap();
            let last = dataset.names.slot_of(truth.last().unwrap()).unwrap();
            let (start, _) = derive_segment(first, &dataset.timeline, 0).unwrap();
            let (_, end) = derive_segment(last, &dataset.timeline, 0).unwrap();
            assert_eq!(start, 0);
            assert_eq!(end, scenario.frame_count - 1);
        }
    }

    #[test]
    fn test_short_recordings_stay_in_bounds() {
        let scenario = SyntheticScenario {
            individuals: 1,
            frame_count: 10,
            breaks_per_individual: 20,
            ..SyntheticScenario::default()
        };
        let dataset = scenario.generate();

        let truth = &dataset.ground_truth[0];
        assert!(truth.len() < 21);
        let mut previous_end = None;
        for name in truth {
            let slot = dataset.names.slot_of(name).unwrap();
            let (start, end) = derive_segment(slot, &dataset.timeline, 0).unwrap();
            assert!(end <= 9);
            if let Some(prev) = previous_end {
                assert!(start > prev);
            }
            previous_end = Some(end);
        }
        assert_eq!(previous_end, Some(9));

        let single = SyntheticScenario {
            frame_count: 1,
            ..SyntheticScenario::default()
        }
        .generate();
        assert_eq!(single.ground_truth.len(), 5);
        assert!(single.ground_truth.iter().all(|t| t.len() == 1));
    }

    #[test]
    fn test_empty_recording() {
        let dataset = SyntheticScenario {
            frame_count: 0,
            ..SyntheticScenario::default()
        }
        .generate();
        assert_eq!(dataset.timeline.frame_count(), 0);
        assert!(dataset.ground_truth.is_empty());
        assert!(dataset.expected_chain_names().is_empty());
    }

    #[test]
    fn test_expected_chain_names() {
        let scenario = SyntheticScenario {
            individuals: 2,
            breaks_per_individual: 1,
            ..SyntheticScenario::default()
        };
        let dataset = scenario.generate();
        assert_eq!(
            dataset.expected_chain_names(),
            vec!["track_0_track_2", "track_1_track_3"]
        );
    }
}
