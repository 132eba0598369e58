//! Byte ranges, consumer range requests and merged range sets
//!
//! All ranges are half-open `[start, end)`. A range whose end is `u64::MAX`
//! is open-ended: it reaches the end of a resource whose length is not known
//! yet.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Half-open byte interval within one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ByteRange {
    /// First byte offset (inclusive)
    pub start: u64,
    /// One past the last byte offset (exclusive)
    pub end: u64,
}

impl ByteRange {
    /// Create a range from an offset and a length
    pub fn new(start: u64, length: u64) -> Self {
        Self {
            start,
            end: start.saturating_add(length),
        }
    }

    /// Create a range from explicit bounds; inverted bounds yield an empty range
    pub fn from_bounds(start: u64, end: u64) -> Self {
        Self {
            start,
            end: end.max(start),
        }
    }

    /// Create an open-ended range starting at `start`
    pub fn to_end(start: u64) -> Self {
        Self {
            start,
            end: u64::MAX,
        }
    }

    /// Number of bytes covered
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Whether the range runs to the (unknown) end of the resource
    pub fn is_open_ended(&self) -> bool {
        self.end == u64::MAX
    }

    pub fn contains(&self, offset: u64) -> bool {
        offset >= self.start && offset < self.end
    }

    /// Overlapping part of two ranges, `None` when they do not overlap
    pub fn intersect(&self, other: &ByteRange) -> Option<ByteRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start < end).then_some(ByteRange { start, end })
    }

    /// Clamp the end of the range to a known resource length
    pub fn clamp_to(&self, content_length: u64) -> ByteRange {
        ByteRange::from_bounds(self.start.min(content_length), self.end.min(content_length))
    }

    /// Value for an HTTP `Range` request header
    pub fn http_header(&self) -> String {
        if self.is_open_ended() {
            format!("bytes={}-", self.start)
        } else {
            format!("bytes={}-{}", self.start, self.end.saturating_sub(1))
        }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_open_ended() {
            write!(f, "[{}, end)", self.start)
        } else {
            write!(f, "[{}, {})", self.start, self.end)
        }
    }
}

/// A consumer read request: an offset plus either a length or "to the end"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeRequest {
    /// Requested start offset
    pub offset: u64,
    /// Requested length, `None` for "until the end of the resource"
    pub length: Option<u64>,
}

impl RangeRequest {
    pub fn new(offset: u64, length: u64) -> Self {
        Self {
            offset,
            length: Some(length),
        }
    }

    /// Request everything from `offset` to the end of the resource
    pub fn to_end(offset: u64) -> Self {
        Self {
            offset,
            length: None,
        }
    }

    /// Resolve the request into a concrete byte range
    ///
    /// With a known content length the result never extends past it. An
    /// open-ended request on a resource of unknown length stays open-ended.
    pub fn resolve(&self, content_length: Option<u64>) -> ByteRange {
        let range = match self.length {
            Some(length) => ByteRange::new(self.offset, length),
            None => ByteRange::to_end(self.offset),
        };
        match content_length {
            Some(total) => range.clamp_to(total),
            None => range,
        }
    }
}

/// Sorted set of non-overlapping, non-adjacent byte ranges
///
/// Inserting always merges the new range with every range it overlaps or
/// touches, so the set stays in canonical form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<ByteRange>", into = "Vec<ByteRange>")]
pub struct RangeSet {
    ranges: Vec<ByteRange>,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a canonical set from arbitrary ranges
    pub fn from_ranges<I>(ranges: I) -> Self
    where
        I: IntoIterator<Item = ByteRange>,
    {
        let mut set = Self::new();
        for range in ranges {
            set.insert(range);
        }
        set
    }

    /// Merge `range` into the set, returning whether the set changed
    pub fn insert(&mut self, range: ByteRange) -> bool {
        if range.is_empty() {
            return false;
        }

        let mut merged = range;
        let first = self.ranges.partition_point(|r| r.end < merged.start);
        let mut last = first;
        while last < self.ranges.len() && self.ranges[last].start <= merged.end {
            merged.start = merged.start.min(self.ranges[last].start);
            merged.end = merged.end.max(self.ranges[last].end);
            last += 1;
        }

        if last - first == 1 && self.ranges[first] == merged {
            return false;
        }

        self.ranges.splice(first..last, std::iter::once(merged));
        true
    }

    /// Whether every byte of `range` is in the set
    pub fn covers(&self, range: &ByteRange) -> bool {
        if range.is_empty() {
            return true;
        }
        let idx = self.ranges.partition_point(|r| r.end <= range.start);
        self.ranges
            .get(idx)
            .is_some_and(|r| r.start <= range.start && r.end >= range.end)
    }

    /// Ranges of the set overlapping `range`, in ascending order
    pub fn intersecting<'a>(
        &'a self,
        range: &'a ByteRange,
    ) -> impl Iterator<Item = &'a ByteRange> + 'a {
        let first = self.ranges.partition_point(|r| r.end <= range.start);
        self.ranges[first..]
            .iter()
            .take_while(move |r| r.start < range.end)
    }

    /// Drop everything at or beyond `length`
    pub fn truncate(&mut self, length: u64) {
        self.ranges.retain(|r| r.start < length);
        if let Some(last) = self.ranges.last_mut() {
            last.end = last.end.min(length);
        }
    }

    /// Total number of bytes in the set
    pub fn covered_bytes(&self) -> u64 {
        self.ranges.iter().map(ByteRange::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ByteRange> {
        self.ranges.iter()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl From<Vec<ByteRange>> for RangeSet {
    fn from(ranges: Vec<ByteRange>) -> Self {
        Self::from_ranges(ranges)
    }
}

impl From<RangeSet> for Vec<ByteRange> {
    fn from(set: RangeSet) -> Self {
        set.ranges
    }
}
