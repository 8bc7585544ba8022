//! # Stitch Engine
//!
//! Grows broken tracks into full-length chains by repeatedly fusing the best
//! available continuation onto each of them.
//!
//! ## Algorithm
//! 1. Every unresolved root asks the [`CandidateMatcher`] for its best
//!    continuation, against a frozen snapshot of the candidate pool
//! 2. Proposals are committed one root at a time, in root order. A root whose
//!    candidate was consumed by an earlier root in the same pass is re-scored
//!    against the live pool, so the outcome equals a purely sequential scan
//! 3. A committed match extends the root to the candidate's end frame, appends
//!    the candidate to the chain and removes it from the pool
//! 4. After the pass, matched roots that reach the last frame are complete;
//!    the rest go back to unresolved for another extension
//! 5. Stop at the first pass without a match
//!
//! Every productive pass consumes at least one candidate, so a run takes at
//! most as many passes as there are candidates.

use std::time::Instant;

use log::{debug, info, warn};

use crate::chain::{ChainBuilder, TrackChain};
use crate::completion::{Completion, CompletionDetector};
use crate::error::StitchError;
use crate::matcher::{CandidateIndex, CandidateMatcher, CandidatePool, Continuation, MatchOutcome};
use crate::timeline::{IdentityTable, PositionTimeline};
use crate::{Connection, StitchConfig, TrackSpan};

/// Where a root stands in the stitch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RootState {
    /// Still looking for a continuation
    Unresolved,
    /// Paired with a candidate in the current pass
    Matched,
    /// No eligible candidate; the pool only shrinks, so none will appear
    Exhausted,
    /// Could not be evaluated (unknown identity, missing end point)
    Skipped,
    /// Reaches the last frame
    Complete,
}

/// Final state of one root after a run.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RootReport {
    pub chain: TrackChain,
    /// Span covered by the chain, named by its composite name
    pub span: TrackSpan,
    pub state: RootState,
}

/// Output of a stitch run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StitchResult {
    /// Committed matches in commit order
    pub connections: Vec<Connection>,
    /// Composite names of chains that reach the last frame, in completion order
    pub completed: Vec<String>,
    /// Chain of every root, in root order
    pub chains: Vec<TrackChain>,
    /// Final state of every root, in root order
    pub roots: Vec<RootReport>,
    /// Spans of roots that did not reach the last frame
    pub still_broken: Vec<TrackSpan>,
    /// Candidates nobody claimed, in pool order
    pub remaining_candidates: Vec<TrackSpan>,
    /// Roots and candidates that could not be evaluated
    pub skipped: Vec<StitchError>,
    /// Number of stitch passes run
    pub passes: usize,
}

impl StitchResult {
    /// Chain grown from the given root segment.
    pub fn chain_for(&self, root: &str) -> Option<&TrackChain> {
        self.chains.iter().find(|c| c.root == root)
    }

    /// Final state of the given root segment.
    pub fn root_state(&self, root: &str) -> Option<RootState> {
        self.roots
            .iter()
            .find(|r| r.chain.root == root)
            .map(|r| r.state)
    }
}

// =============================================================================
// Engine
// =============================================================================

/// A root and its progress through the loop
#[derive(Debug, Clone)]
struct RootTrack {
    root: String,
    /// Last fused segment; its slot holds the root's current end point
    tail: String,
    span: TrackSpan,
    state: RootState,
}

/// Mutable bookkeeping of one run
#[derive(Debug, Default)]
struct Run {
    tracks: Vec<RootTrack>,
    pool: CandidatePool,
    chains: ChainBuilder,
    connections: Vec<Connection>,
    completed: Vec<String>,
    skipped: Vec<StitchError>,
    passes: usize,
}

/// Iterative reconnection of broken tracks over one timeline.
pub struct StitchEngine<'a> {
    timeline: &'a PositionTimeline,
    names: &'a IdentityTable,
    config: &'a StitchConfig,
    matcher: CandidateMatcher<'a>,
    detector: CompletionDetector,
}

impl<'a> StitchEngine<'a> {
    pub fn new(
        timeline: &'a PositionTimeline,
        names: &'a IdentityTable,
        config: &'a StitchConfig,
    ) -> Self {
        Self {
            timeline,
            names,
            config,
            matcher: CandidateMatcher::new(timeline, names, config),
            detector: CompletionDetector::new(timeline.frame_count()),
        }
    }

    /// Stitch `roots` with segments from `candidates` until a fixed point.
    ///
    /// Roots are processed in the given order and candidates are scanned in
    /// the given order; both orders decide ties. Duplicate roots, candidates
    /// that repeat a root or another candidate, and candidates missing from
    /// the identity table are dropped before the first pass.
    pub fn run(&self, roots: Vec<TrackSpan>, candidates: Vec<TrackSpan>) -> StitchResult {
        let started = Instant::now();
        let mut run = self.prepare(roots, candidates);

        if run.pool.is_empty() {
            info!(
                "No candidates to stitch, {} roots left unchanged",
                run.tracks.len()
            );
            return self.finish(run, started);
        }

        loop {
            if let Some(max) = self.config.max_passes {
                if run.passes >= max {
                    info!("Stopping after {} passes (pass limit)", run.passes);
                    break;
                }
            }

            let pending: Vec<usize> = run
                .tracks
                .iter()
                .enumerate()
                .filter(|(_, t)| t.state == RootState::Unresolved)
                .map(|(i, _)| i)
                .collect();
            if pending.is_empty() || run.pool.is_empty() {
                break;
            }

            run.passes += 1;
            let matched = self.run_pass(&mut run, &pending);
            debug!(
                "Pass {}: {} of {} roots matched, {} candidates left",
                run.passes,
                matched,
                pending.len(),
                run.pool.len()
            );

            if matched == 0 {
                break;
            }
        }

        self.finish(run, started)
    }

    fn prepare(&self, roots: Vec<TrackSpan>, candidates: Vec<TrackSpan>) -> Run {
        let mut run = Run::default();

        for span in roots {
            if !run.chains.seed(&span.name) {
                warn!("Duplicate root {} ignored", span.name);
                continue;
            }
            let state = if self.detector.is_complete(span.end_frame) {
                run.completed.push(span.name.clone());
                RootState::Complete
            } else {
                RootState::Unresolved
            };
            run.tracks.push(RootTrack {
                root: span.name.clone(),
                tail: span.name.clone(),
                span,
                state,
            });
        }

        for candidate in candidates {
            if run.chains.contains_root(&candidate.name) {
                warn!("Candidate {} is also a root, ignored", candidate.name);
            } else if !self.names.contains(&candidate.name) {
                warn!("Candidate {} not in identity table, ignored", candidate.name);
                run.skipped.push(StitchError::UnknownIdentityReference {
                    name: candidate.name,
                });
            } else if run.pool.contains(&candidate.name) {
                warn!("Duplicate candidate {} ignored", candidate.name);
            } else {
                run.pool.push(candidate);
            }
        }

        run
    }

    /// One pass over the pending roots. Returns the number of matches.
    fn run_pass(&self, run: &mut Run, pending: &[usize]) -> usize {
        let index = CandidateIndex::build(
            &run.pool,
            self.timeline,
            self.names,
            self.config.reference_node,
        );
        let proposals = self.propose(&run.tracks, pending, &run.pool, &index);

        let mut matched = Vec::new();
        for (&i, proposal) in pending.iter().zip(proposals) {
            let outcome = match proposal {
                MatchOutcome::Matched(c) if !run.pool.contains(&c.candidate.name) => {
                    let track = &run.tracks[i];
                    debug!(
                        "{} was claimed earlier in this pass, rescoring {}",
                        c.candidate.name, track.span.name
                    );
                    self.matcher
                        .find_best_continuation(&track.tail, track.span.end_frame, &run.pool)
                }
                other => other,
            };

            match outcome {
                MatchOutcome::Matched(continuation) => {
                    if self.commit(run, i, continuation) {
                        matched.push(i);
                    }
                }
                MatchOutcome::Exhausted => {
                    debug!("No continuation for {}", run.tracks[i].span.name);
                    run.tracks[i].state = RootState::Exhausted;
                }
                MatchOutcome::Skipped(err) => {
                    warn!("Skipping root {}: {}", run.tracks[i].span.name, err);
                    run.tracks[i].state = RootState::Skipped;
                    run.skipped.push(err);
                }
            }
        }

        // Matched roots either reached the end or go back for another extension
        for &i in &matched {
            let track = &mut run.tracks[i];
            let Some(chain) = run.chains.get(&track.root) else {
                continue;
            };
            track.state = match self.detector.classify(chain, &track.span) {
                Completion::Complete(name) => {
                    run.completed.push(name);
                    RootState::Complete
                }
                Completion::Broken(_) => RootState::Unresolved,
            };
        }

        matched.len()
    }

    /// Score pending roots against the frozen pool.
    fn propose(
        &self,
        tracks: &[RootTrack],
        pending: &[usize],
        pool: &CandidatePool,
        index: &CandidateIndex,
    ) -> Vec<MatchOutcome> {
        let query = |&i: &usize| {
            let track = &tracks[i];
            self.matcher
                .find_best_continuation_indexed(&track.tail, track.span.end_frame, pool, index)
        };

        #[cfg(feature = "parallel")]
        let proposals = {
            use rayon::prelude::*;
            pending.par_iter().map(query).collect()
        };

        #[cfg(not(feature = "parallel"))]
        let proposals = pending.iter().map(query).collect();

        proposals
    }

    /// Fuse a continuation onto root `i`. Returns `false` if nothing changed.
    fn commit(&self, run: &mut Run, i: usize, continuation: Continuation) -> bool {
        let track = &mut run.tracks[i];
        if !run.chains.contains_root(&track.root) {
            return false;
        }
        let Some(candidate) = run.pool.remove(&continuation.candidate.name) else {
            return false;
        };

        debug!(
            "Connecting {} (end frame {}) with {} (start frame {}), score {:.2}",
            track.span.name,
            track.span.end_frame,
            candidate.name,
            candidate.start_frame,
            continuation.score
        );

        run.connections.push(Connection {
            root_name: track.span.name.clone(),
            root_start: track.span.start_frame,
            root_end: track.span.end_frame,
            candidate_name: candidate.name.clone(),
            candidate_start: candidate.start_frame,
            candidate_end: candidate.end_frame,
            frame_diff: continuation.frame_diff,
            spatial_distance: continuation.spatial_distance,
            score: continuation.score,
        });

        let composite = run
            .chains
            .append(&track.root, &candidate.name)
            .unwrap_or_else(|| track.span.name.clone());
        track.span = TrackSpan::new(composite, track.span.start_frame, candidate.end_frame);
        track.tail = candidate.name;
        track.state = RootState::Matched;
        true
    }

    fn finish(&self, run: Run, started: Instant) -> StitchResult {
        let Run {
            tracks,
            pool,
            chains,
            connections,
            completed,
            skipped,
            passes,
        } = run;

        // Chains were seeded in the same order the tracks were pushed
        let chains = chains.into_chains();
        let mut roots = Vec::with_capacity(tracks.len());
        let mut still_broken = Vec::new();
        for (chain, track) in chains.iter().zip(tracks) {
            if track.state != RootState::Complete {
                still_broken.push(track.span.clone());
            }
            roots.push(RootReport {
                chain: chain.clone(),
                span: track.span,
                state: track.state,
            });
        }

        info!(
            "Stitched {} connections in {} passes: {} complete, {} still broken, {} candidates left ({:?})",
            connections.len(),
            passes,
            completed.len(),
            still_broken.len(),
            pool.len(),
            started.elapsed()
        );

        StitchResult {
            connections,
            completed,
            chains,
            roots,
            still_broken,
            remaining_candidates: pool.into_vec(),
            skipped,
            passes,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
