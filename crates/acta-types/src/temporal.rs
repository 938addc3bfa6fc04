use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Hybrid Logical Clock timestamp attached to every stored version.
///
/// Wall-clock milliseconds alone are not enough to order versions written
/// within the same millisecond, so a logical counter breaks ties and the
/// node id breaks ties between writers.
///
/// Anchors compare by wall clock, then counter, then writer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemporalAnchor {
    /// Milliseconds since the UNIX epoch when the version was issued.
    pub physical_ms: u64,
    /// Logical counter for versions at the same physical time.
    pub logical: u32,
    /// Writer identifier.
    pub node_id: u16,
}

impl TemporalAnchor {
    pub fn new(physical_ms: u64, logical: u32, node_id: u16) -> Self {
        Self {
            physical_ms,
            logical,
            node_id,
        }
    }

    /// Anchor for the current wall-clock time.
    pub fn now(node_id: u16) -> Self {
        Self::new(wall_clock_ms(), 0, node_id)
    }

    pub const fn zero() -> Self {
        Self {
            physical_ms: 0,
            logical: 0,
            node_id: 0,
        }
    }

    /// Next anchor for a writer whose last issued anchor is `previous`.
    ///
    /// Strictly after `previous` even if the wall clock stalled or stepped
    /// backwards.
    pub fn tick(previous: Option<&Self>, node_id: u16) -> Self {
        let now = Self::now(node_id);
        match previous {
            None => now,
            Some(prev) if now.physical_ms > prev.physical_ms => now,
            Some(prev) => match prev.logical.checked_add(1) {
                Some(logical) => Self::new(prev.physical_ms, logical, node_id),
                // Logical counter exhausted: borrow the next millisecond.
                None => Self::new(prev.physical_ms.saturating_add(1), 0, node_id),
            },
        }
    }

    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

impl PartialOrd for TemporalAnchor {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TemporalAnchor {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.physical_ms, self.logical, self.node_id).cmp(&(
            other.physical_ms,
            other.logical,
            other.node_id,
        ))
    }
}

impl fmt::Debug for TemporalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TemporalAnchor({self})")
    }
}

impl fmt::Display for TemporalAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.n{}", self.physical_ms, self.logical, self.node_id)
    }
}
