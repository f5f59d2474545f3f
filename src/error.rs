//! Error types
//!
//! The synchronous manager never fails: terminal errors are broadcast to
//! subscribers through `on_error`. These errors only surface at the boundary
//! of the owning task, see [`ManagerHandle`](crate::manager::ManagerHandle).

/// Error type for manager handle operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The task owning the manager has stopped
    ManagerClosed,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::ManagerClosed => write!(f, "Subscriber manager task is closed"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias for manager handle operations
pub type Result<T> = std::result::Result<T, Error>;
