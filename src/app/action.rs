//! Action Planner: split a read request into local and remote work
//!
//! Given a requested byte range and the ranges already on disk, the planner
//! produces the ordered list of [`CacheAction`]s that together cover the
//! request exactly once: `Local` actions for cached bytes, `Remote` actions
//! for the gaps.

use std::fmt;

use crate::app::cache::CacheMediaDescriptor;
use crate::app::range::{ByteRange, RangeSet};

/// Where the bytes of an action come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    /// Read from the local data file
    Local,
    /// Fetch from the origin
    Remote,
}

/// One contiguous unit of work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheAction {
    pub kind: ActionKind,
    pub range: ByteRange,
}

impl CacheAction {
    pub fn local(range: ByteRange) -> Self {
        Self {
            kind: ActionKind::Local,
            range,
        }
    }

    pub fn remote(range: ByteRange) -> Self {
        Self {
            kind: ActionKind::Remote,
            range,
        }
    }

    pub fn is_local(&self) -> bool {
        self.kind == ActionKind::Local
    }
}

impl fmt::Display for CacheAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ActionKind::Local => write!(f, "Local{}", self.range),
            ActionKind::Remote => write!(f, "Remote{}", self.range),
        }
    }
}

/// Stateless planner
pub struct ActionPlanner;

impl ActionPlanner {
    /// Plan the actions covering `request`
    ///
    /// `request` must already be resolved against the known content length.
    /// An origin known not to support byte ranges is always served by one
    /// remote fetch of the whole resource; nothing is read locally for it.
    pub fn plan(
        request: ByteRange,
        cached: &RangeSet,
        descriptor: Option<&CacheMediaDescriptor>,
    ) -> Vec<CacheAction> {
        if request.is_empty() {
            return Vec::new();
        }

        if let Some(descriptor) = descriptor.filter(|d| !d.byte_range_supported) {
            let whole = match descriptor.content_length {
                Some(length) => ByteRange::new(0, length),
                None => ByteRange::to_end(0),
            };
            if whole.is_empty() {
                return Vec::new();
            }
            return vec![CacheAction::remote(whole)];
        }

        // Unknown length: a single fetch reaching the end of the resource
        if request.is_open_ended() {
            return vec![CacheAction::remote(request)];
        }

        let mut actions = Vec::new();
        let mut cursor = request.start;
        for cached_range in cached.intersecting(&request) {
            let Some(covered) = cached_range.intersect(&request) else {
                continue;
            };
            if covered.start > cursor {
                actions.push(CacheAction::remote(ByteRange::from_bounds(
                    cursor,
                    covered.start,
                )));
            }
            actions.push(CacheAction::local(covered));
            cursor = covered.end;
        }
        if cursor < request.end {
            actions.push(CacheAction::remote(ByteRange::from_bounds(
                cursor,
                request.end,
            )));
        }

        actions
    }
}
