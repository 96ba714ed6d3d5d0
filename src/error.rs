//! Error types for the two component boundaries that can fail: calling out
//! to a peer, and driving the node's own state machine. Kept as small enums
//! rather than one catch-all so callers can match on the three kinds the
//! design calls for (transient remote, invalid input, fatal) instead of
//! string-sniffing a message.

use thiserror::Error;

/// Failure modes of an outbound peer-client call. All three are transient:
/// the caller is expected to retry on the next maintenance tick rather than
/// treat them as fatal.
#[derive(Debug, Error, Clone)]
pub enum PeerError {
    #[error("peer {address} unreachable: {source}")]
    Unreachable { address: String, source: String },

    #[error("call to peer {address} timed out after {elapsed_ms}ms")]
    Timeout { address: String, elapsed_ms: u64 },

    #[error("peer {address} returned an error: {message}")]
    RemoteError { address: String, message: String },
}

impl PeerError {
    pub fn address(&self) -> &str {
        match self {
            PeerError::Unreachable { address, .. } => address,
            PeerError::Timeout { address, .. } => address,
            PeerError::RemoteError { address, .. } => address,
        }
    }
}

/// Failures surfaced by the node's own operations.
#[derive(Debug, Error)]
pub enum NodeError {
    /// A malformed identifier in an inbound request. Does not affect local
    /// state; the RPC handler that hits this turns it into a normal
    /// response with `success = false` rather than an RPC-level error, since
    /// a malformed key is a routing outcome the caller can act on, not a
    /// reason to tear down the call.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The listener could not be bound, `start`/`join` was called out of
    /// order, a `join` bootstrap peer was unreachable or answered but could
    /// not resolve our successor, or a bootstrap returned a colliding
    /// identifier. Retrying the same call again would not help without an
    /// operator fixing the underlying condition (a different bootstrap
    /// address, a free port, calling `start` first).
    #[error("fatal: {0}")]
    Fatal(String),
}
