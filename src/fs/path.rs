use crate::{InvalidPathReason, Result, ScandirError};
use std::path::{Path, PathBuf};
#[cfg(unix)]
use std::{
    ffi::{CStr, CString, OsStr},
    os::fd::{AsRawFd, BorrowedFd, OwnedFd},
    os::unix::ffi::OsStrExt,
    sync::Arc,
};

/// Longest path, in native units, the OS will accept (terminator excluded).
#[cfg(unix)]
#[allow(clippy::cast_sign_loss)]
pub const MAX_PATH_LEN: usize = libc::PATH_MAX as usize - 1;
/// Longest path, in native units, the OS will accept (terminator excluded).
#[cfg(windows)]
pub const MAX_PATH_LEN: usize = 32_767 - 1;

/// The single OS-facing form a [`PathHandle`] carries.
#[derive(Debug)]
pub(crate) enum NativePath {
    /// NUL-terminated byte string for `opendir`/`stat`
    #[cfg(unix)]
    Narrow(CString),
    /// NUL-terminated UTF-16 for the wide windows APIs
    #[cfg(windows)]
    Wide(Vec<u16>),
    /// A private duplicate of a caller's open directory descriptor
    #[cfg(unix)]
    Descriptor(Arc<OwnedFd>),
}

/**
 A validated path, converted once into the form the OS expects.

 Constructed by [`resolve`](Self::resolve) (a filesystem path),
 [`current_dir`](Self::current_dir) (the default `.` when no path is given) or, on unix,
 [`from_fd`](Self::from_fd) (an already open directory, only when asked for explicitly).
*/
#[derive(Debug)]
pub struct PathHandle {
    pub(crate) native: NativePath,
    display: PathBuf,
    defaulted: bool,
}

impl PathHandle {
    /**
     Validates `path` and converts it to its native representation.

     # Errors
     `InvalidPath` if the path contains an interior NUL or exceeds the platform limit.
    */
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Ok(Self {
            native: to_native(path)?,
            display: path.to_path_buf(),
            defaulted: false,
        })
    }

    /**
     Validates a raw byte path.

     On unix the bytes are used verbatim. Windows paths are UTF-16 underneath, so there the
     bytes must be valid UTF-8.

     # Errors
     `InvalidPath` with [`InvalidPathReason::Encoding`] for undecodable bytes, otherwise as
     [`resolve`](Self::resolve).
    */
    pub fn resolve_bytes(bytes: &[u8]) -> Result<Self> {
        #[cfg(unix)]
        {
            Self::resolve(OsStr::from_bytes(bytes))
        }
        #[cfg(windows)]
        {
            let text = std::str::from_utf8(bytes).map_err(|_| {
                ScandirError::invalid_path(
                    String::from_utf8_lossy(bytes).into_owned(),
                    InvalidPathReason::Encoding,
                )
            })?;
            Self::resolve(text)
        }
    }

    /// The handle used when the caller supplies no path at all.
    #[must_use]
    pub fn current_dir() -> Self {
        Self {
            #[cfg(unix)]
            native: NativePath::Narrow(c".".to_owned()),
            #[cfg(windows)]
            native: NativePath::Wide(vec![u16::from(b'.'), 0]),
            display: PathBuf::from("."),
            defaulted: true,
        }
    }

    /**
     Wraps an open directory descriptor.

     The descriptor is duplicated, so the caller keeps ownership of `fd` and may close it
     whenever it likes.

     # Errors
     `Io` if the descriptor cannot be duplicated.
    */
    #[cfg(unix)]
    pub fn from_fd(fd: BorrowedFd<'_>) -> Result<Self> {
        let display = PathBuf::from(format!("<fd {}>", fd.as_raw_fd()));
        let owned = fd
            .try_clone_to_owned()
            .map_err(|err| ScandirError::from_io(err, &display))?;
        Ok(Self {
            native: NativePath::Descriptor(Arc::new(owned)),
            display,
            defaulted: false,
        })
    }

    /// The path as the caller gave it (`.` when defaulted, `<fd N>` for descriptors).
    #[must_use]
    #[inline]
    pub fn as_path(&self) -> &Path {
        &self.display
    }

    /// Returns `true` if no path was supplied and `.` was used instead.
    #[must_use]
    #[inline]
    pub const fn is_defaulted(&self) -> bool {
        self.defaulted
    }

    /// Returns `true` if this handle wraps a directory descriptor.
    #[must_use]
    #[inline]
    pub const fn is_descriptor(&self) -> bool {
        #[cfg(unix)]
        {
            matches!(self.native, NativePath::Descriptor(_))
        }
        #[cfg(windows)]
        {
            false
        }
    }

    #[cfg(unix)]
    #[inline]
    pub(crate) fn as_cstr(&self) -> Option<&CStr> {
        match &self.native {
            NativePath::Narrow(cpath) => Some(cpath),
            NativePath::Descriptor(_) => None,
        }
    }
}

#[cfg(unix)]
fn to_native(path: &Path) -> Result<NativePath> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.len() > MAX_PATH_LEN {
        return Err(ScandirError::invalid_path(
            path,
            InvalidPathReason::TooLong {
                len: bytes.len(),
                max: MAX_PATH_LEN,
            },
        ));
    }
    CString::new(bytes)
        .map(NativePath::Narrow)
        .map_err(|_| ScandirError::invalid_path(path, InvalidPathReason::InteriorNul))
}

#[cfg(windows)]
fn to_native(path: &Path) -> Result<NativePath> {
    use std::os::windows::ffi::OsStrExt;

    let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    if wide.contains(&0) {
        return Err(ScandirError::invalid_path(path, InvalidPathReason::InteriorNul));
    }
    if wide.len() > MAX_PATH_LEN {
        return Err(ScandirError::invalid_path(
            path,
            InvalidPathReason::TooLong {
                len: wide.len(),
                max: MAX_PATH_LEN,
            },
        ));
    }
    wide.push(0);
    Ok(NativePath::Wide(wide))
}
