use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Generic result type for scanning operations
pub type Result<T> = core::result::Result<T, ScandirError>;

/// Why a caller-supplied path was rejected before any system call was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidPathReason {
    #[error("contains an interior NUL byte")]
    InteriorNul,
    #[error("cannot be represented in the platform path encoding")]
    Encoding,
    #[error("is {len} units long, the platform limit is {max}")]
    TooLong { len: usize, max: usize },
}

/**
 An error type for scanning a directory or inspecting one of its entries.

 Every variant carries the path it concerns. Native failures also keep the
 underlying [`io::Error`] so the raw OS code (errno or Win32 error) is never lost.

 Reaching the end of a directory is not an error, iteration simply returns `None`.
*/
#[derive(Debug, Error)]
pub enum ScandirError {
    #[error("invalid path {path:?}: {reason}")]
    InvalidPath {
        path: PathBuf,
        reason: InvalidPathReason,
    },
    #[error("not found: {path:?}: {source}")]
    NotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("permission denied: {path:?}: {source}")]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScandirError {
    pub(crate) fn invalid_path(path: impl Into<PathBuf>, reason: InvalidPathReason) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason,
        }
    }

    /// Classifies a native failure, keeping the original error as the source.
    pub(crate) fn from_io(source: io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::NotFound => Self::NotFound { path, source },
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path, source },
            _ => Self::Io { path, source },
        }
    }

    /// The path that caused this error.
    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        match self {
            Self::InvalidPath { path, .. }
            | Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::Io { path, .. } => path,
        }
    }

    /// The raw OS error code (errno on unix, `GetLastError` on windows), if any.
    #[must_use]
    #[inline]
    pub fn raw_os_error(&self) -> Option<i32> {
        match self {
            Self::InvalidPath { .. } => None,
            Self::NotFound { source, .. }
            | Self::PermissionDenied { source, .. }
            | Self::Io { source, .. } => source.raw_os_error(),
        }
    }

    /// The [`io::ErrorKind`] this error corresponds to.
    #[must_use]
    #[inline]
    pub fn kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidPath { .. } => io::ErrorKind::InvalidInput,
            Self::NotFound { .. } => io::ErrorKind::NotFound,
            Self::PermissionDenied { .. } => io::ErrorKind::PermissionDenied,
            Self::Io { source, .. } => source.kind(),
        }
    }

    /// Returns `true` if the path vanished or never existed.
    #[must_use]
    #[inline]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Keeps the whole error, path included, as the payload of an [`io::Error`] of the same kind.
impl From<ScandirError> for io::Error {
    fn from(error: ScandirError) -> Self {
        Self::new(error.kind(), error)
    }
}
