//! `LogFileInfo`: the status snapshot index over log segments.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use txm_core::TxId;

/// The inclusive commit-id range a log segment covers. An empty range is
/// represented as `first == last + 1`, i.e. `first` is the id the segment
/// would next receive and there is nothing before it yet — this is exactly
/// how a freshly-created, still-empty segment records its range (see spec
/// §3, `LogFileInfo`).
///
/// On the wire this is the two-element `[first, last]` array the status
/// file format calls for, not an object.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TxRange {
    /// First commit id in the segment (inclusive), or the next id the
    /// segment would receive if `is_empty()`.
    pub first: TxId,
    /// Last commit id in the segment (inclusive).
    pub last: TxId,
}

impl Serialize for TxRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.first, self.last).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for TxRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (first, last) = <(TxId, TxId)>::deserialize(deserializer)?;
        Ok(Self { first, last })
    }
}

impl TxRange {
    /// An empty range that would begin at `next`.
    pub fn empty_starting_at(next: TxId) -> Self {
        Self { first: next, last: next - 1 }
    }

    /// `true` if no commits have landed in this range yet.
    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    /// Extend the range to include `commit_id`, which must be
    /// `self.last + 1` unless the range is currently empty (in which case
    /// `commit_id` becomes both the first and last entry).
    pub fn extend(&mut self, commit_id: TxId) {
        if self.is_empty() {
            self.first = commit_id;
        }
        self.last = commit_id;
    }
}

/// An immutable record describing one on-disk log segment: its file name,
/// the inclusive commit-id range it covers, its byte size, and the
/// timestamp it was created (for current segments) or archived
/// (for historical ones).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LogFileInfo {
    /// File name relative to the system directory (e.g. `txlog.json` or
    /// `txlog_2026-07-27T12:00:00.000000Z.json`).
    pub name: String,
    /// Inclusive commit-id range observed in this segment.
    #[serde(rename = "txIds")]
    pub tx_ids: TxRange,
    /// Size in bytes as of the last time this record was rewritten.
    pub size: u64,
    /// ISO-8601 timestamp associated with the segment (creation time for
    /// the current segment, archival time for historical ones).
    pub timestamp: String,
}
