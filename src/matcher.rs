//! # Candidate Matching
//!
//! Finds the orphan segment that best continues a track that ended early.
//!
//! ## Algorithm
//! 1. Take the root's last point `P1` at its end frame `end1`
//! 2. For each candidate `(start2, end2)`, sweep frame offsets from
//!    `-overlap_allowance` to `frame_window` and keep the first
//!    `frame_diff = (start2 - end1) + offset` inside `(-frame_window/2, frame_window]`
//! 3. Reject candidates whose first point is further than `distance_threshold` from `P1`
//! 4. Reject candidates with no point near `P1` in the frames around `start2`
//!    (a single noisy frame is not enough to claim a continuation)
//! 5. Score `frame_diff + spatial_distance`; the lowest score wins, ties go
//!    to the candidate earliest in pool order
//!
//! The score adds frames to distance units without any weighting. It ranks
//! close-in-time-and-space candidates first and is kept as is; calibrating it
//! would change which matches are made.

use log::debug;
use rstar::{PointDistance, RTree, RTreeObject, AABB};
use std::collections::HashSet;

use crate::error::{OptionExt, StitchError};
use crate::timeline::{IdentityTable, PositionTimeline};
use crate::{StitchConfig, TrackPoint, TrackSpan};

// =============================================================================
// Candidate Pool
// =============================================================================

/// Unassigned orphan segments, in a fixed scan order.
///
/// The order is the order of insertion and never changes; removing a
/// candidate keeps the relative order of the rest. Scan order decides ties
/// between equally good candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidatePool {
    entries: Vec<TrackSpan>,
    names: HashSet<String>,
}

impl CandidatePool {
    /// Build a pool; later duplicates of a name are dropped.
    pub fn new(candidates: Vec<TrackSpan>) -> Self {
        let mut pool = Self::default();
        for candidate in candidates {
            pool.push(candidate);
        }
        pool
    }

    /// Append a candidate. Returns `false` if the name is already pooled.
    pub fn push(&mut self, candidate: TrackSpan) -> bool {
        if !self.names.insert(candidate.name.clone()) {
            return false;
        }
        self.entries.push(candidate);
        true
    }

    /// Remove a candidate by name, consuming it.
    pub fn remove(&mut self, name: &str) -> Option<TrackSpan> {
        if !self.names.remove(name) {
            return None;
        }
        let position = self.entries.iter().position(|c| c.name == name)?;
        Some(self.entries.remove(position))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn get(&self, position: usize) -> Option<&TrackSpan> {
        self.entries.get(position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackSpan> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<TrackSpan> {
        self.entries
    }
}

// =============================================================================
// R-tree Indexed Candidate Starts
// =============================================================================

/// First point of a candidate with its position in the pool
#[derive(Debug, Clone, Copy)]
struct IndexedStart {
    position: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedStart {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedStart {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

/// Spatial index over the start points of a frozen candidate pool.
///
/// Only valid for the pool it was built from; the stitch engine rebuilds it
/// at the start of every pass.
pub struct CandidateIndex {
    tree: RTree<IndexedStart>,
}

impl CandidateIndex {
    /// Index every candidate whose first point is known.
    pub fn build(
        pool: &CandidatePool,
        timeline: &PositionTimeline,
        names: &IdentityTable,
        reference_node: usize,
    ) -> Self {
        let starts: Vec<IndexedStart> = pool
            .iter()
            .enumerate()
            .filter_map(|(position, candidate)| {
                let slot = names.slot_of(&candidate.name)?;
                let p = timeline.point(candidate.start_frame, reference_node, slot)?;
                Some(IndexedStart {
                    position,
                    x: p.x,
                    y: p.y,
                })
            })
            .collect();
        Self {
            tree: RTree::bulk_load(starts),
        }
    }

    /// Pool positions of candidates starting within `radius` of `point`,
    /// in ascending pool order.
    pub fn nearby(&self, point: TrackPoint, radius: f64) -> Vec<usize> {
        // Slightly widened so the exact distance check decides boundary cases
        let radius = radius * (1.0 + 1e-9) + 1e-9;
        let mut positions: Vec<usize> = self
            .tree
            .locate_within_distance([point.x, point.y], radius * radius)
            .map(|s| s.position)
            .collect();
        positions.sort_unstable();
        positions
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

// =============================================================================
// Matching
// =============================================================================

/// The best continuation found for a root.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    pub candidate: TrackSpan,
    pub frame_diff: i64,
    pub spatial_distance: f64,
    pub score: f64,
}

/// Result of asking the matcher for one root's continuation.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    /// A candidate passed every check
    Matched(Continuation),
    /// No candidate passed; the root stays broken
    Exhausted,
    /// The root could not be evaluated
    Skipped(StitchError),
}

/// Whether a frame difference falls in `(-frame_window / 2, frame_window]`.
pub fn is_eligible_frame_diff(frame_diff: i64, frame_window: usize) -> bool {
    let window = frame_window as i64;
    2 * frame_diff > -window && frame_diff <= window
}

/// Smallest eligible frame difference reachable by the offset sweep.
///
/// `gap` is `start2 - end1`. Offsets run from `-overlap_allowance` up to
/// `frame_window`; the first one that lands in the eligible window gives the
/// lowest score, so the sweep stops there.
pub fn first_eligible_frame_diff(gap: i64, config: &StitchConfig) -> Option<i64> {
    let low = -(config.overlap_allowance as i64);
    let high = config.frame_window as i64;
    (low..=high)
        .map(|offset| gap + offset)
        .find(|&diff| is_eligible_frame_diff(diff, config.frame_window))
}

/// Scores candidate continuations against a timeline.
#[derive(Debug, Clone, Copy)]
pub struct CandidateMatcher<'a> {
    timeline: &'a PositionTimeline,
    names: &'a IdentityTable,
    config: &'a StitchConfig,
}

impl<'a> CandidateMatcher<'a> {
    pub fn new(
        timeline: &'a PositionTimeline,
        names: &'a IdentityTable,
        config: &'a StitchConfig,
    ) -> Self {
        Self {
            timeline,
            names,
            config,
        }
    }

    pub fn config(&self) -> &StitchConfig {
        self.config
    }

    /// Best continuation for a root, scanning the whole pool in order.
    ///
    /// `tail` is the name of the last segment fused into the root; its slot
    /// provides the root's last point at `end_frame`.
    pub fn find_best_continuation(
        &self,
        tail: &str,
        end_frame: usize,
        pool: &CandidatePool,
    ) -> MatchOutcome {
        match self.last_point(tail, end_frame) {
            Ok(last_point) => self.best_of(last_point, end_frame, pool.iter()),
            Err(err) => MatchOutcome::Skipped(err),
        }
    }

    /// Same as [`find_best_continuation`](Self::find_best_continuation), but
    /// only looks at candidates the index places within the distance
    /// threshold. `index` must have been built from `pool`.
    pub fn find_best_continuation_indexed(
        &self,
        tail: &str,
        end_frame: usize,
        pool: &CandidatePool,
        index: &CandidateIndex,
    ) -> MatchOutcome {
        let last_point = match self.last_point(tail, end_frame) {
            Ok(p) => p,
            Err(err) => return MatchOutcome::Skipped(err),
        };
        let nearby = index.nearby(last_point, self.config.distance_threshold);
        self.best_of(last_point, end_frame, nearby.iter().filter_map(|&i| pool.get(i)))
    }

    fn best_of<'c>(
        &self,
        last_point: TrackPoint,
        end_frame: usize,
        candidates: impl Iterator<Item = &'c TrackSpan>,
    ) -> MatchOutcome {
        let mut best: Option<Continuation> = None;
        for candidate in candidates {
            let Some(continuation) = self.score_candidate(last_point, end_frame, candidate) else {
                continue;
            };
            let better = best
                .as_ref()
                .map_or(true, |b| continuation.score < b.score);
            if better {
                best = Some(continuation);
            }
        }

        match best {
            Some(continuation) => MatchOutcome::Matched(continuation),
            None => MatchOutcome::Exhausted,
        }
    }

    fn last_point(&self, tail: &str, end_frame: usize) -> Result<TrackPoint, StitchError> {
        let slot = self.names.slot_of(tail).ok_or_unknown_identity(tail)?;
        self.timeline
            .point(end_frame, self.config.reference_node, slot)
            .ok_or_else(|| StitchError::MissingEndpoint {
                name: tail.to_string(),
                frame: end_frame,
            })
    }

    /// Check one candidate against a root ending at `end_frame` in `last_point`.
    ///
    /// Returns `None` if any check fails. A candidate ending at or before
    /// `end_frame` is rejected outright rather than accepted with the root's
    /// end frame pulled back, so a chain's coverage never shrinks.
    pub fn score_candidate(
        &self,
        last_point: TrackPoint,
        end_frame: usize,
        candidate: &TrackSpan,
    ) -> Option<Continuation> {
        // A continuation must carry the root past its current end
        if candidate.end_frame <= end_frame {
            return None;
        }

        let Some(slot) = self.names.slot_of(&candidate.name) else {
            debug!("Candidate {} not in identity table, ignored", candidate.name);
            return None;
        };

        let gap = candidate.start_frame as i64 - end_frame as i64;
        let frame_diff = first_eligible_frame_diff(gap, self.config)?;

        let first_point =
            self.timeline
                .point(candidate.start_frame, self.config.reference_node, slot)?;
        let spatial_distance = last_point.distance_to(&first_point);
        if spatial_distance > self.config.distance_threshold {
            return None;
        }

        if !self.is_locally_consistent(last_point, candidate.start_frame, slot) {
            return None;
        }

        Some(Continuation {
            candidate: candidate.clone(),
            frame_diff,
            spatial_distance,
            score: frame_diff as f64 + spatial_distance,
        })
    }

    /// At least one of the candidate's points within `consistency_radius`
    /// frames of its start lies closer than `consistency_radius` to `last_point`.
    fn is_locally_consistent(&self, last_point: TrackPoint, start_frame: usize, slot: usize) -> bool {
        let radius = self.config.consistency_radius;
        let frames = start_frame.saturating_sub(radius)..=start_frame.saturating_add(radius);
        self.timeline
            .points_in(slot, self.config.reference_node, frames)
            .any(|(_, p)| last_point.distance_to(&p) < radius as f64)
    }
}

// =============================================================================
// Tests
// =============================================================================
