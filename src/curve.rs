//! Miss-rate curves.
//!
//! A [`MissRateCurve`] is the answer a ghost cache gives to "how would this
//! workload have behaved at each of these cache sizes?". Each
//! [`CurvePoint`] pairs a candidate capacity (in entries, and the bytes those
//! entries occupied) with the [`CacheStat`] observed at that capacity.
//!
//! Points render as a single text line, `"<count> <bytes><stat>"`, and parse
//! back from it, which is how curves are stored in per-tenant reports.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;
use thiserror::Error;

use crate::metrics::CacheStat;

/// Errors from parsing a curve line.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseCurveError {
    /// The line ended before the named field.
    #[error("missing {0}")]
    MissingField(&'static str),

    /// The named field was not an unsigned integer.
    #[error("invalid {0}")]
    InvalidNumber(&'static str),

    /// The statistic was not of the form `<pct>% (<hits>/<total>)`.
    #[error("malformed hit statistic")]
    MalformedStat,
}

/// One point of a miss-rate curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurvePoint {
    /// Cache capacity in entries
    pub count: u64,
    /// Bytes held by the `count` most recently used entries
    pub size: u64,
    /// Hits and misses a cache of `count` entries would have seen
    pub stat: CacheStat,
}

impl fmt::Display for CurvePoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}{}", self.count, self.size, self.stat)
    }
}

impl FromStr for CurvePoint {
    type Err = ParseCurveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start();
        let (count, rest) = s
            .split_once(char::is_whitespace)
            .ok_or(ParseCurveError::MissingField("size"))?;
        let rest = rest.trim_start();
        let size_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .ok_or(ParseCurveError::MissingField("hit statistic"))?;
        let (size, stat) = rest.split_at(size_end);

        Ok(Self {
            count: count
                .parse()
                .map_err(|_| ParseCurveError::InvalidNumber("count"))?,
            size: size
                .parse()
                .map_err(|_| ParseCurveError::InvalidNumber("size"))?,
            stat: stat.parse()?,
        })
    }
}

/// A sweep of [`CurvePoint`]s ordered by increasing capacity.
///
/// An empty curve means "nothing observed": no access reached the cache (or
/// the sampler) in the period the curve covers.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MissRateCurve {
    points: Vec<CurvePoint>,
}

impl MissRateCurve {
    /// Creates an empty curve.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point. Points must be pushed in increasing `count` order.
    pub fn push(&mut self, point: CurvePoint) {
        debug_assert!(
            self.points.last().map_or(true, |last| last.count < point.count),
            "curve points must be strictly increasing in capacity"
        );
        self.points.push(point);
    }

    /// The points, smallest capacity first.
    pub fn points(&self) -> &[CurvePoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the curve has no points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The point with the largest capacity.
    pub fn last(&self) -> Option<&CurvePoint> {
        self.points.last()
    }

    /// Returns true if capacities and byte sizes never decrease and capacities
    /// strictly increase.
    pub fn is_well_formed(&self) -> bool {
        self.points
            .windows(2)
            .all(|w| w[0].count < w[1].count && w[0].size <= w[1].size)
    }

    /// Renders every point as a text line.
    pub fn lines(&self) -> Vec<String> {
        use alloc::string::ToString;
        self.points.iter().map(ToString::to_string).collect()
    }

    /// Parses curve lines produced by [`MissRateCurve::lines`].
    pub fn parse_lines<I, S>(lines: I) -> Result<Self, ParseCurveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let points = lines
            .into_iter()
            .map(|line| line.as_ref().parse())
            .collect::<Result<Vec<CurvePoint>, _>>()?;
        Ok(Self { points })
    }

    /// Mean absolute difference in hit rate between two curves, point by
    /// point. Points are paired in order; surplus points of the longer curve
    /// are ignored. Returns 0.0 when there is nothing to compare.
    pub fn mean_absolute_error(&self, other: &MissRateCurve) -> f64 {
        let (sum, pairs) = self
            .points
            .iter()
            .zip(other.points.iter())
            .fold((0.0f64, 0usize), |(sum, pairs), (a, b)| {
                let diff = a.stat.hit_rate() - b.stat.hit_rate();
                (sum + if diff < 0.0 { -diff } else { diff }, pairs + 1)
            });
        if pairs == 0 {
            0.0
        } else {
            sum / pairs as f64
        }
    }
}

impl FromIterator<CurvePoint> for MissRateCurve {
    fn from_iter<I: IntoIterator<Item = CurvePoint>>(iter: I) -> Self {
        let mut curve = MissRateCurve::new();
        for point in iter {
            curve.push(point);
        }
        curve
    }
}
