use aho_corasick::{AhoCorasick, AhoCorasickBuilder, AhoCorasickKind};
use metrics::Key;
use metrics_util::{MetricKind, MetricKindMask};

use crate::builder::BuildError;

/// Decides which metrics in a snapshot are reported.
pub trait MetricFilter: Send + Sync {
    /// Returns `true` if the metric should be reported.
    fn matches(&self, key: &Key, kind: MetricKind) -> bool;
}

impl<F> MetricFilter for F
where
    F: Fn(&Key, MetricKind) -> bool + Send + Sync,
{
    fn matches(&self, key: &Key, kind: MetricKind) -> bool {
        self(key, kind)
    }
}

/// Reports only the metric kinds in the mask.
impl MetricFilter for MetricKindMask {
    fn matches(&self, _: &Key, kind: MetricKind) -> bool {
        MetricKindMask::matches(self, kind)
    }
}

/// Drops metrics whose name matches any of a set of patterns.
///
/// Patterns are matched as substrings of the metric name with an [Aho-Corasick][ahocorasick] automaton, so any number
/// of patterns is checked in a single pass over the name.
///
/// [ahocorasick]: https://en.wikipedia.org/wiki/Aho–Corasick_algorithm
pub struct PatternFilter {
    automaton: AhoCorasick,
}

impl PatternFilter {
    /// Creates a [`PatternFilterBuilder`] from an existing set of patterns.
    pub fn from_patterns<P, I>(patterns: P) -> PatternFilterBuilder
    where
        P: IntoIterator<Item = I>,
        I: AsRef<str>,
    {
        PatternFilterBuilder {
            patterns: patterns.into_iter().map(|s| s.as_ref().to_string()).collect(),
            case_insensitive: false,
            use_dfa: true,
        }
    }
}

impl MetricFilter for PatternFilter {
    fn matches(&self, key: &Key, _: MetricKind) -> bool {
        !self.automaton.is_match(key.name())
    }
}

/// Builder for a [`PatternFilter`].
pub struct PatternFilterBuilder {
    patterns: Vec<String>,
    case_insensitive: bool,
    use_dfa: bool,
}

impl PatternFilterBuilder {
    /// Adds a pattern to match.
    #[must_use]
    pub fn add_pattern<P: AsRef<str>>(mut self, pattern: P) -> Self {
        self.patterns.push(pattern.as_ref().to_string());
        self
    }

    /// Sets the case sensitivity used for pattern matching.
    ///
    /// Defaults to `false` i.e. searches are case sensitive.
    #[must_use]
    pub fn case_insensitive(mut self, case_insensitive: bool) -> Self {
        self.case_insensitive = case_insensitive;
        self
    }

    /// Sets whether or not to internally use a deterministic finite automaton.
    ///
    /// A DFA searches faster but takes more space and longer to build.
    ///
    /// Defaults to `true`.
    #[must_use]
    pub fn use_dfa(mut self, dfa: bool) -> Self {
        self.use_dfa = dfa;
        self
    }

    /// Builds the filter.
    ///
    /// # Errors
    ///
    /// If the patterns exceed the internal limits of the automaton, an error is returned.
    pub fn build(self) -> Result<PatternFilter, BuildError> {
        let automaton = AhoCorasickBuilder::new()
            .ascii_case_insensitive(self.case_insensitive)
            .kind(self.use_dfa.then_some(AhoCorasickKind::DFA))
            .build(&self.patterns)
            .map_err(|e| BuildError::InvalidFilter { reason: e.to_string() })?;
        Ok(PatternFilter { automaton })
    }
}
