//! Error type shared by key generation, key decoding, and evaluation.

/// Custom error type.
///
/// All operations in this crate are deterministic pure computations, so every
/// error is a terminal verdict on the offending call; nothing is retried
/// internally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A precondition on the arguments was violated, e.g. `alpha` outside the
    /// domain or an unsupported value bit width.
    InvalidArgument(String),
    /// Serialized key bytes could not be decoded.  Fatal for this key only.
    MalformedKey(String),
    /// An evaluation context was asked to rewind to an earlier level.
    /// Contexts only move forward; create a fresh one to restart.
    OutOfOrder {
        /// The level that was requested.
        requested: usize,
        /// The level the context has already advanced to.
        frontier: usize,
    },
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Error::MalformedKey(msg) => write!(f, "malformed key: {msg}"),
            Error::OutOfOrder {
                requested,
                frontier,
            } => write!(
                f,
                "out of order: level {requested} requested, but the context is already at level {frontier}"
            ),
        }
    }
}

impl std::error::Error for Error {}
