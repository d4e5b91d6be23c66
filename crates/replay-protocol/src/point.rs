// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Execution points: coordinates inside a recorded execution.
//!
//! A point is `(checkpoint, progress, position?)`. Checkpoints are assigned
//! increasing ids by the backend; `progress` increases monotonically along
//! the recorded order inside a checkpoint; `position` breaks ties between
//! points that share checkpoint and progress.
//!
//! The order is a strict total order. Ties on checkpoint+progress are
//! broken by comparing positions field by field, numerically for the
//! numeric fields, and a point without a position precedes one with a
//! position.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Backend-assigned checkpoint identifier.
pub type CheckpointId = u32;

/// The first checkpoint of every recording. Always known, at time zero.
pub const FIRST_CHECKPOINT_ID: CheckpointId = 1;

/// Fine-grained location of a point inside a script.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    /// Position kind reported by the backend (e.g. "Break", "OnStep").
    pub kind: String,
    /// Script the position lies in.
    pub script: u64,
    /// Bytecode offset inside the script.
    pub offset: u64,
    /// Stack depth of the frame the position belongs to.
    pub frame_index: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.kind, self.script, self.offset, self.frame_index
        )
    }
}

/// A point in a recorded execution.
///
/// Equality, ordering and hashing agree with each other: `progress` is
/// compared with [`f64::total_cmp`], so every value (including NaN) has a
/// place in the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPoint {
    /// Checkpoint the point belongs to.
    pub checkpoint: CheckpointId,
    /// Progress counter within the checkpoint.
    pub progress: f64,
    /// Optional tiebreaking position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
}

impl ExecutionPoint {
    /// Point at the very start of a checkpoint.
    pub fn checkpoint_start(checkpoint: CheckpointId) -> Self {
        Self {
            checkpoint,
            progress: 0.0,
            position: None,
        }
    }

    /// Point without a position.
    pub fn new(checkpoint: CheckpointId, progress: f64) -> Self {
        Self {
            checkpoint,
            progress,
            position: None,
        }
    }

    /// Start of the recording.
    pub fn first() -> Self {
        Self::checkpoint_start(FIRST_CHECKPOINT_ID)
    }

    /// Attach a position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// True when `self` and `other` denote the same point.
    pub fn equals(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }

    /// True when `self` comes strictly before `other` in the recording.
    pub fn precedes(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Less
    }

    /// Canonical map key: `checkpoint:progress[:kind:script:offset:frameIndex]`.
    pub fn to_comparable_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ExecutionPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.position {
            Some(position) => write!(f, "{}:{}:{}", self.checkpoint, self.progress, position),
            None => write!(f, "{}:{}", self.checkpoint, self.progress),
        }
    }
}

impl Ord for ExecutionPoint {
    fn cmp(&self, other: &Self) -> Ordering {
        self.checkpoint
            .cmp(&other.checkpoint)
            .then_with(|| self.progress.total_cmp(&other.progress))
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for ExecutionPoint {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ExecutionPoint {
    fn eq(&self, other: &Self) -> bool {
        self.equals(other)
    }
}

impl Eq for ExecutionPoint {}

impl Hash for ExecutionPoint {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.checkpoint.hash(state);
        self.progress.to_bits().hash(state);
        self.position.hash(state);
    }
}
