//! Chain bookkeeping.
//!
//! A chain is the ordered list of segment names fused into one root, first
//! segment first. Its composite name (segment names joined by
//! [`CHAIN_SEPARATOR`]) identifies the reconstructed individual.

use std::collections::HashMap;

/// Separator between segment names in a composite chain name.
pub const CHAIN_SEPARATOR: &str = "_";

/// Join segment names into a composite chain name.
///
/// ```
/// use track_stitcher::composite_name;
/// assert_eq!(composite_name(&["track_0", "track_7"]), "track_0_track_7");
/// ```
pub fn composite_name<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<&str>>()
        .join(CHAIN_SEPARATOR)
}

/// Segments fused into one root, in fusion order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrackChain {
    /// Name of the root segment the chain grew from
    pub root: String,
    /// Fused segment names, starting with the root
    pub segments: Vec<String>,
}

impl TrackChain {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        Self {
            segments: vec![root.clone()],
            root,
        }
    }

    /// Composite name of the chain.
    pub fn name(&self) -> String {
        composite_name(&self.segments)
    }

    /// Most recently fused segment.
    pub fn tail(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or(&self.root)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True once at least one segment was fused onto the root.
    pub fn is_extended(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn contains(&self, segment: &str) -> bool {
        self.segments.iter().any(|s| s == segment)
    }
}

/// Chains of every root, in the order the roots were seeded.
#[derive(Debug, Clone, Default)]
pub struct ChainBuilder {
    chains: Vec<TrackChain>,
    by_root: HashMap<String, usize>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a chain for a root. Returns `false` if the root already has one.
    pub fn seed(&mut self, root: &str) -> bool {
        if self.by_root.contains_key(root) {
            return false;
        }
        self.by_root.insert(root.to_string(), self.chains.len());
        self.chains.push(TrackChain::new(root));
        true
    }

    /// Fuse a segment onto a root's chain and return the new composite name.
    ///
    /// Returns `None` if the root was never seeded.
    pub fn append(&mut self, root: &str, segment: &str) -> Option<String> {
        let chain = self.chains.get_mut(*self.by_root.get(root)?)?;
        chain.segments.push(segment.to_string());
        Some(chain.name())
    }

    pub fn get(&self, root: &str) -> Option<&TrackChain> {
        self.by_root.get(root).and_then(|&i| self.chains.get(i))
    }

    pub fn composite_name(&self, root: &str) -> Option<String> {
        self.get(root).map(TrackChain::name)
    }

    pub fn contains_root(&self, root: &str) -> bool {
        self.by_root.contains_key(root)
    }

    pub fn len(&self) -> usize {
        self.chains.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackChain> {
        self.chains.iter()
    }

    pub fn into_chains(self) -> Vec<TrackChain> {
        self.chains
    }
}
