//! Error types for track reconnection.
//!
//! None of these abort a reconnection run. Construction of a
//! [`PositionTimeline`](crate::PositionTimeline) or
//! [`IdentityTable`](crate::IdentityTable) can fail; everything the engine
//! meets per root or per slot is recorded and skipped.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StitchError {
    /// The identity slot has no frame with a valid reference point.
    #[error("identity slot {slot} ({name}) has no valid frame")]
    MissingSegmentData { slot: usize, name: String },

    /// A track name that is not in the identity table.
    #[error("unknown identity reference '{name}'")]
    UnknownIdentityReference { name: String },

    /// A root claims to end at a frame where its tail segment has no position.
    #[error("track '{name}' has no valid position at frame {frame}")]
    MissingEndpoint { name: String, frame: usize },

    /// Flat data does not match the declared timeline shape.
    #[error("timeline of {frames}x{nodes}x2x{slots} needs {expected} values, got {actual}")]
    InvalidShape {
        frames: usize,
        nodes: usize,
        slots: usize,
        expected: usize,
        actual: usize,
    },

    /// The identity table and the timeline disagree on the number of slots.
    #[error("identity table has {names} names but timeline has {slots} slots")]
    IdentityCountMismatch { names: usize, slots: usize },

    /// Two identity slots share a name.
    #[error("duplicate identity name '{name}'")]
    DuplicateIdentity { name: String },
}

pub type Result<T> = std::result::Result<T, StitchError>;

/// Convert lookups that return `Option` into [`StitchError`]s.
pub trait OptionExt<T> {
    fn ok_or_unknown_identity(self, name: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_unknown_identity(self, name: &str) -> Result<T> {
        self.ok_or_else(|| StitchError::UnknownIdentityReference {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StitchError::MissingSegmentData {
            slot: 3,
            name: "track_3".to_string(),
        };
        assert!(err.to_string().contains("slot 3"));
        assert!(err.to_string().contains("track_3"));

        let err = StitchError::InvalidShape {
            frames: 2,
            nodes: 1,
            slots: 1,
            expected: 4,
            actual: 3,
        };
        assert!(err.to_string().contains("needs 4 values, got 3"));
    }

    #[test]
    fn test_option_ext() {
        let none: Option<usize> = None;
        assert!(matches!(
            none.ok_or_unknown_identity("ghost"),
            Err(StitchError::UnknownIdentityReference { ref name }) if name == "ghost"
        ));
        assert_eq!(Some(4).ok_or_unknown_identity("x").unwrap(), 4);
    }
}
