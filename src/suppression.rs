//! Suppression policy for known-benign error noise.
//!
//! Browser extensions and a few platform integrations inject errors that the
//! application cannot act on. A [`SuppressionPolicy`] lists substrings that
//! identify them. It is built once by the composition root and shared with the
//! classifier and the global capture; clones share the same pattern set.

use std::sync::Arc;

use parking_lot::RwLock;

/// Patterns every default policy starts with.
pub const BUILTIN_PATTERNS: [&str; 4] = [
    "ignored-error",
    "chrome-extension://",
    "permission error",
    // Known-problematic Chrome extension.
    "ofpnmcalabcbjgholdjcjblkibolbppb",
];

/// Markers that identify a trace as coming from a browser extension.
pub const BUILTIN_EXTENSION_MARKERS: [&str; 2] =
    ["chrome-extension://", "ofpnmcalabcbjgholdjcjblkibolbppb"];

#[derive(Debug, Default)]
struct Patterns {
    ignore: Vec<String>,
    extension: Vec<String>,
}

/// Shared, growable set of lowercase substring patterns.
///
/// # Examples
///
/// ```
/// use voisin_rail::SuppressionPolicy;
///
/// let policy = SuppressionPolicy::with_builtin();
/// policy.add_pattern("ResizeObserver loop");
///
/// assert!(policy.matches("at chrome-extension://abc/script.js"));
/// assert!(policy.matches("resizeobserver LOOP limit exceeded"));
/// assert!(!policy.matches("TypeError: x is undefined"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct SuppressionPolicy {
    inner: Arc<RwLock<Patterns>>,
}

impl SuppressionPolicy {
    /// Creates an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy seeded with [`BUILTIN_PATTERNS`] and
    /// [`BUILTIN_EXTENSION_MARKERS`].
    pub fn with_builtin() -> Self {
        let policy = Self::new();
        for pattern in BUILTIN_PATTERNS {
            policy.add_pattern(pattern);
        }
        for marker in BUILTIN_EXTENSION_MARKERS {
            policy.add_extension_marker(marker);
        }
        policy
    }

    /// Adds an ignore pattern. Empty and duplicate patterns are skipped.
    pub fn add_pattern(&self, pattern: &str) {
        push_unique(&mut self.inner.write().ignore, pattern);
    }

    /// Adds a marker identifying extension traces.
    ///
    /// Markers also count as ignore patterns.
    pub fn add_extension_marker(&self, marker: &str) {
        let mut guard = self.inner.write();
        push_unique(&mut guard.extension, marker);
        push_unique(&mut guard.ignore, marker);
    }

    /// Snapshot of the ignore patterns, lowercased.
    pub fn patterns(&self) -> Vec<String> {
        self.inner.read().ignore.clone()
    }

    /// Case-insensitive substring match of `haystack` against the ignore patterns.
    pub fn matches(&self, haystack: &str) -> bool {
        self.matching_pattern(haystack).is_some()
    }

    /// Returns the first ignore pattern found in any of the haystacks.
    pub fn first_match<'a, I>(&self, haystacks: I) -> Option<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        haystacks.into_iter().find_map(|haystack| self.matching_pattern(haystack))
    }

    /// Whether a trace contains one of the extension markers.
    pub fn is_extension_trace(&self, trace: &str) -> bool {
        let trace = trace.to_lowercase();
        self.inner.read().extension.iter().any(|marker| trace.contains(marker.as_str()))
    }

    fn matching_pattern(&self, haystack: &str) -> Option<String> {
        if haystack.is_empty() {
            return None;
        }
        let haystack = haystack.to_lowercase();
        self.inner.read().ignore.iter().find(|pattern| haystack.contains(pattern.as_str())).cloned()
    }
}

fn push_unique(target: &mut Vec<String>, pattern: &str) {
    let pattern = pattern.trim().to_lowercase();
    if !pattern.is_empty() && !target.contains(&pattern) {
        target.push(pattern);
    }
}
