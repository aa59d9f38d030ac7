use std::ops::BitOr;

/// Histogram granularity.
///
/// Defines the time bucket over which Wavefront aggregates a distribution before it is stored.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum HistogramGranularity {
    /// One minute buckets.
    Minute,
    /// One hour buckets.
    Hour,
    /// One day buckets.
    Day,
}

impl HistogramGranularity {
    /// All granularities, from finest to coarsest.
    pub const ALL: [HistogramGranularity; 3] =
        [HistogramGranularity::Minute, HistogramGranularity::Hour, HistogramGranularity::Day];

    /// Returns the single-letter identifier Wavefront uses for this granularity.
    pub const fn as_str(self) -> &'static str {
        match self {
            HistogramGranularity::Minute => "M",
            HistogramGranularity::Hour => "H",
            HistogramGranularity::Day => "D",
        }
    }

    const fn mask(self) -> u8 {
        match self {
            HistogramGranularity::Minute => 1,
            HistogramGranularity::Hour => 2,
            HistogramGranularity::Day => 4,
        }
    }
}

/// A set of histogram granularities.
///
/// Can be combined in a bitmask fashion via bitwise OR, and checked for a specific granularity via
/// [`contains`](HistogramGranularities::contains):
///
/// ```rust
/// # use metrics_exporter_wavefront::{HistogramGranularities, HistogramGranularity};
/// let set = HistogramGranularities::MINUTE | HistogramGranularities::DAY;
///
/// assert!(set.contains(HistogramGranularity::Minute));
/// assert!(!set.contains(HistogramGranularity::Hour));
/// assert!(set.contains(HistogramGranularity::Day));
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct HistogramGranularities(u8);

impl HistogramGranularities {
    /// No granularities.
    pub const NONE: HistogramGranularities = HistogramGranularities(0);

    /// Minute granularity.
    pub const MINUTE: HistogramGranularities = HistogramGranularities(1);

    /// Hour granularity.
    pub const HOUR: HistogramGranularities = HistogramGranularities(2);

    /// Day granularity.
    pub const DAY: HistogramGranularities = HistogramGranularities(4);

    /// All granularities.
    pub const ALL: HistogramGranularities = HistogramGranularities(7);

    /// Builds the set from individual per-granularity flags.
    pub const fn from_flags(minute: bool, hour: bool, day: bool) -> Self {
        let mut bits = 0;
        if minute {
            bits |= HistogramGranularity::Minute.mask();
        }
        if hour {
            bits |= HistogramGranularity::Hour.mask();
        }
        if day {
            bits |= HistogramGranularity::Day.mask();
        }
        HistogramGranularities(bits)
    }

    /// Whether or not the set contains the given granularity.
    pub const fn contains(self, granularity: HistogramGranularity) -> bool {
        self.0 & granularity.mask() != 0
    }

    /// Returns `true` if no granularity is enabled.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns the number of enabled granularities.
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterates over the enabled granularities, from finest to coarsest.
    pub fn iter(self) -> impl Iterator<Item = HistogramGranularity> {
        HistogramGranularity::ALL.into_iter().filter(move |g| self.contains(*g))
    }
}

impl BitOr for HistogramGranularities {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl From<HistogramGranularity> for HistogramGranularities {
    fn from(granularity: HistogramGranularity) -> Self {
        Self(granularity.mask())
    }
}

impl FromIterator<HistogramGranularity> for HistogramGranularities {
    fn from_iter<I: IntoIterator<Item = HistogramGranularity>>(iter: I) -> Self {
        iter.into_iter().fold(HistogramGranularities::NONE, |set, g| set | g.into())
    }
}

#[cfg(test)]
mod tests {
    use super::{HistogramGranularities, HistogramGranularity};

    #[test]
    fn from_flags_covers_every_combination() {
        for bits in 0u8..8 {
            let minute = bits & 1 != 0;
            let hour = bits & 2 != 0;
            let day = bits & 4 != 0;

            let set = HistogramGranularities::from_flags(minute, hour, day);
            assert_eq!(set.contains(HistogramGranularity::Minute), minute);
            assert_eq!(set.contains(HistogramGranularity::Hour), hour);
            assert_eq!(set.contains(HistogramGranularity::Day), day);

            let expected: Vec<_> = [
                (minute, HistogramGranularity::Minute),
                (hour, HistogramGranularity::Hour),
                (day, HistogramGranularity::Day),
            ]
            .into_iter()
            .filter_map(|(enabled, g)| enabled.then_some(g))
            .collect();
            assert_eq!(set.iter().collect::<Vec<_>>(), expected);
            assert_eq!(set.len(), expected.len());
        }
    }

    #[test]
    fn all_false_is_empty() {
        let set = HistogramGranularities::from_flags(false, false, false);
        assert!(set.is_empty());
        assert_eq!(set, HistogramGranularities::NONE);
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn masks_combine() {
        let set = HistogramGranularities::MINUTE | HistogramGranularities::HOUR | HistogramGranularities::DAY;
        assert_eq!(set, HistogramGranularities::ALL);

        let collected: HistogramGranularities =
            [HistogramGranularity::Day, HistogramGranularity::Minute].into_iter().collect();
        assert_eq!(collected, HistogramGranularities::from_flags(true, false, true));
    }
}
