//! Error types for netlink operations.

use std::io;
use std::time::Duration;

/// Result type for netlink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the generic netlink controller.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The netlink socket could not be created, bound or registered.
    #[error("cannot open netlink socket: {0}")]
    Connection(#[source] io::Error),

    /// A request could not be written to the socket.
    #[error("cannot send netlink request: {0}")]
    Send(#[source] io::Error),

    /// The socket failed while waiting for a reply.
    #[error("cannot receive netlink reply: {0}")]
    Recv(#[source] io::Error),

    /// No reply arrived within the configured timeout.
    #[error("timed out after {elapsed:?} waiting for reply to {operation}")]
    Timeout {
        /// The request that stalled.
        operation: String,
        /// The configured timeout.
        elapsed: Duration,
    },

    /// Kernel returned an error code.
    #[error("kernel error: {message} (errno {errno})")]
    Kernel {
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Kernel error with operation context.
    #[error("{operation}: {message} (errno {errno})")]
    KernelWithContext {
        /// The operation that failed.
        operation: String,
        /// The errno value from the kernel.
        errno: i32,
        /// Human-readable error message.
        message: String,
    },

    /// Message was truncated.
    #[error("message truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Expected message length.
        expected: usize,
        /// Actual bytes received.
        actual: usize,
    },

    /// Invalid message format.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Invalid attribute format.
    #[error("invalid attribute: {0}")]
    InvalidAttribute(String),

    /// Generic netlink family is not registered with the kernel.
    #[error("generic netlink family not found: {name}")]
    FamilyNotFound {
        /// The family name that was not found.
        name: String,
    },
}

/// The discovery stage an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Resolve,
    Send,
    Receive,
    Decode,
    Kernel,
}

impl Stage {
    /// Short lowercase name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Stage::Connect => "connect",
            Stage::Resolve => "resolve",
            Stage::Send => "send",
            Stage::Receive => "receive",
            Stage::Decode => "decode",
            Stage::Kernel => "kernel",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Error {
    /// Create a kernel error from an errno value.
    pub fn from_errno(errno: i32) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::Kernel {
            errno: -errno,
            message,
        }
    }

    /// Create a kernel error with operation context.
    pub fn from_errno_with_context(errno: i32, operation: impl Into<String>) -> Self {
        let message = io::Error::from_raw_os_error(-errno).to_string();
        Self::KernelWithContext {
            operation: operation.into(),
            errno: -errno,
            message,
        }
    }

    /// Add context to this error.
    ///
    /// Wraps kernel errors with operation context. Other errors are returned unchanged.
    pub fn with_context(self, operation: impl Into<String>) -> Self {
        match self {
            Self::Kernel { errno, message } => Self::KernelWithContext {
                operation: operation.into(),
                errno,
                message,
            },
            other => other,
        }
    }

    /// The stage of the exchange this error was raised in.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Connection(_) => Stage::Connect,
            Self::FamilyNotFound { .. } => Stage::Resolve,
            Self::Send(_) => Stage::Send,
            Self::Recv(_) | Self::Timeout { .. } => Stage::Receive,
            Self::Truncated { .. } | Self::InvalidMessage(_) | Self::InvalidAttribute(_) => {
                Stage::Decode
            }
            Self::Kernel { .. } | Self::KernelWithContext { .. } => Stage::Kernel,
        }
    }

    /// Check if this error came from the socket itself rather than from
    /// a kernel reply. These always abort a catalog build.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Send(_) | Self::Recv(_) | Self::Timeout { .. }
        )
    }

    /// Check if this is a "not found" error (ENOENT, ENODEV, etc.).
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, libc::ENOENT | libc::ENODEV)
            }
            Self::FamilyNotFound { .. } => true,
            _ => false,
        }
    }

    /// Check if this is a permission error (EPERM, EACCES).
    pub fn is_permission_denied(&self) -> bool {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => {
                matches!(*errno, libc::EPERM | libc::EACCES)
            }
            Self::Connection(e) => e.kind() == io::ErrorKind::PermissionDenied,
            _ => false,
        }
    }

    /// Get the errno value if this is a kernel error.
    pub fn errno(&self) -> Option<i32> {
        match self {
            Self::Kernel { errno, .. } | Self::KernelWithContext { errno, .. } => Some(*errno),
            _ => None,
        }
    }
}
