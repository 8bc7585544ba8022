//! Completion detection: a chain is done once it reaches the last frame.

use crate::chain::TrackChain;
use crate::TrackSpan;

/// Whether a track ending at `end_frame` reaches the final frame.
pub fn is_complete(end_frame: usize, frame_count: usize) -> bool {
    frame_count.checked_sub(1) == Some(end_frame)
}

/// Where a chain stands after a stitch pass.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// Reached the final frame; carries the composite name
    Complete(String),
    /// Ends early; carries the chain's current span
    Broken(TrackSpan),
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionDetector {
    frame_count: usize,
}

impl CompletionDetector {
    pub fn new(frame_count: usize) -> Self {
        Self { frame_count }
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn is_complete(&self, end_frame: usize) -> bool {
        is_complete(end_frame, self.frame_count)
    }

    /// Classify a chain from the span it currently covers.
    pub fn classify(&self, chain: &TrackChain, span: &TrackSpan) -> Completion {
        if self.is_complete(span.end_frame) {
            Completion::Complete(chain.name())
        } else {
            Completion::Broken(TrackSpan::new(chain.name(), span.start_frame, span.end_frame))
        }
    }
}
