use std::backtrace::Backtrace;

use thiserror::Error;

/// Represents errors that can occur when querying sharding metadata. The error kinds are based on the
/// [Abseil status codes](https://abseil.io/docs/cpp/guides/status-codes) that distributed array runtimes use on their
/// sharding surfaces, restricted to the two codes this crate can actually produce:
///
///   - [`Error::InvalidArgument`]: the supplied shape, dynamic shape, or device list is incompatible with the
///     parameters stored in a sharding or mesh partition (wrong shape, uneven division, device count mismatch).
///   - [`Error::Unimplemented`]: the sharding defines no semantics for the requested operation (opaque shardings
///     always; concrete and mesh shardings when no deterministic mapping can be inferred).
///
/// Both kinds are deterministic given their inputs, so re-invoking a failed operation without changed inputs cannot
/// succeed and no retry logic exists anywhere in this crate. Caller programming errors (e.g., constructing a concrete
/// sharding with mismatched device and shard-shape counts, or reading the static shape of a dynamically shaped
/// instance) are not represented here; they panic at the boundary the caller controls.
///
/// Each variant includes a `backtrace` field that captures the call stack at the point where the error was created,
/// which is useful for debugging. Note that it is represented as a [`String`] and not as a [`Backtrace`] because using
/// the latter is only currently supported in unstable Rust.
#[derive(Error, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    #[error("{message}")]
    InvalidArgument { message: String, backtrace: String },

    #[error("{message}")]
    Unimplemented { message: String, backtrace: String },
}

impl Error {
    /// Creates a new [`Error::InvalidArgument`].
    pub fn invalid_argument<M: Into<String>>(message: M) -> Self {
        Self::InvalidArgument { message: message.into(), backtrace: Backtrace::capture().to_string() }
    }

    /// Creates a new [`Error::Unimplemented`].
    pub fn unimplemented<M: Into<String>>(message: M) -> Self {
        Self::Unimplemented { message: message.into(), backtrace: Backtrace::capture().to_string() }
    }

    /// Message associated with this [`Error`].
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument { message, .. } | Self::Unimplemented { message, .. } => message.as_str(),
        }
    }
}
