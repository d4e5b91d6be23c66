// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Timeline error type.

use thiserror::Error;

use replay_client::ClientError;

/// Errors surfaced by timeline operations.
#[derive(Debug, Error)]
pub enum TimelineError {
    /// Transport or remote failure.
    #[error(transparent)]
    Client(#[from] ClientError),
    /// The logpoint was removed while an operation on it was in flight.
    #[error("logpoint {0} was removed")]
    LogpointRemoved(String),
    /// No script is known for the URL.
    #[error("no scripts loaded for {0}")]
    UnknownUrl(String),
    /// The session actor has shut down.
    #[error("timeline session closed")]
    SessionClosed,
}
