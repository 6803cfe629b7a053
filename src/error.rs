use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Error kinds, mirroring the classification in the design's error-handling
/// section: each one maps to a single operator-visible diagnostic, and (bar
/// the bounded connect-retry loop) every failure is fatal to the phase that
/// produced it.
#[derive(Debug, Error)]
pub enum Error {
    /// Socket type/state falls outside the admitted set for dumping or
    /// restoring (stream/dgram, listen/established/close).
    #[error("unsupported socket shape: {0}")]
    UnsupportedShape(String),

    /// The socket graph is inconsistent: an uncollected inode at dump time,
    /// an unreachable peer, a dangling in-flight connection, or an in-flight
    /// connection pointing at a non-listening socket.
    #[error("socket graph inconsistency: {0}")]
    GraphInconsistency(String),

    /// A policy knob (`ext_unix_sk`) forbids what would otherwise be a valid
    /// operation: a runaway external socket, or an external stream socket.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// A syscall or OS-level operation failed: netlink send/recv,
    /// `socketpair`, `socket`, `bind`, `listen`, `connect` after retries,
    /// `stat`, `unlink`, descriptor passing, image I/O.
    #[error("transport failure: {0}")]
    Transport(#[from] std::io::Error),

    /// A `nix` wrapped syscall failed; kept distinct from `Transport` so
    /// callers can match on the richer `nix::Error` when they care to.
    #[error("transport failure: {0}")]
    Nix(#[from] nix::Error),
}

impl Error {
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Error::UnsupportedShape(msg.into())
    }

    pub fn graph(msg: impl Into<String>) -> Self {
        Error::GraphInconsistency(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        Error::PolicyViolation(msg.into())
    }
}
