use crate::fs::path::NativePath;
use crate::fs::{DirEntry, FileType, Metadata, PathHandle, Timestamp};
use core::ffi::CStr;
use core::ptr::NonNull;
use libc::{AT_SYMLINK_NOFOLLOW, DIR, fstat, fstatat, lstat, stat};
use std::ffi::OsStr;
use std::io;
use std::os::fd::{AsRawFd, IntoRawFd, OwnedFd, RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

#[cfg(all(target_os = "linux", target_env = "gnu"))]
use libc::{dirent64, readdir64};
#[cfg(not(all(target_os = "linux", target_env = "gnu")))]
use libc::{dirent as dirent64, readdir as readdir64};

/**
 An open `DIR` stream.

 Owns the stream from `opendir`/`fdopendir` until it is dropped, at which point
 `closedir` releases it. There is no other way to close it, so every exit path of
 a scan (exhaustion, error, abandonment) goes through `Drop` exactly once.
*/
#[derive(Debug)]
pub(crate) struct RawDir {
    /// Raw directory pointer from libc's `opendir()` wrapped in a nonnull
    dir: NonNull<DIR>,
}

// SAFETY: a DIR stream is not tied to the thread that opened it; every access goes
// through `&mut self` so it is never used from two threads at once.
unsafe impl Send for RawDir {}

impl RawDir {
    /// Opens the directory named by `handle`.
    pub(crate) fn open(handle: &PathHandle) -> io::Result<Self> {
        let dir = match &handle.native {
            // SAFETY: the path is a valid NUL-terminated C string
            NativePath::Narrow(cpath) => unsafe { libc::opendir(cpath.as_ptr()) },
            NativePath::Descriptor(fd) => {
                // fdopendir takes ownership of the descriptor it is given, hand it a fresh dup
                let raw = fd.try_clone()?.into_raw_fd();
                // SAFETY: `raw` is an open descriptor we own
                let dir = unsafe { libc::fdopendir(raw) };
                if dir.is_null() {
                    let err = io::Error::last_os_error();
                    // SAFETY: fdopendir failed so ownership of `raw` was not taken
                    unsafe { libc::close(raw) };
                    return Err(err);
                }
                // the dup shares its file offset with the caller's descriptor
                // SAFETY: `dir` was just checked to be non-null
                unsafe { libc::rewinddir(dir) };
                dir
            }
        };
        NonNull::new(dir)
            .map(|dir| Self { dir })
            .ok_or_else(io::Error::last_os_error)
    }

    /**
     Reads the next raw entry, including "." and "..".

     `readdir` returns NULL both at the end of the stream and on failure, so errno is
     cleared first and inspected afterwards to tell the two apart.
    */
    #[inline]
    pub(crate) fn advance_raw(&mut self) -> io::Result<Option<RawEntry<'_>>> {
        errno::set_errno(errno::Errno(0));
        // SAFETY: `self.dir` is a valid directory pointer owned by this struct
        let dirent_ptr = unsafe { readdir64(self.dir.as_ptr()) };

        match NonNull::new(dirent_ptr) {
            // SAFETY: readdir returned a valid entry, which stays valid until the next call on this stream
            Some(drnt) => Ok(Some(unsafe { RawEntry::from_dirent(drnt) })),
            None => match errno::errno().0 {
                0 => Ok(None),
                code => Err(io::Error::from_raw_os_error(code)),
            },
        }
    }

    /// The descriptor underlying the stream
    #[inline]
    pub(crate) fn dirfd(&self) -> RawFd {
        // SAFETY: `self.dir` is a valid directory pointer
        unsafe { libc::dirfd(self.dir.as_ptr()) }
    }
}

impl Drop for RawDir {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: the stream is open and is never used again
        // closedir owns the descriptor, closing it separately would upset fdsan.
        unsafe { libc::closedir(self.dir.as_ptr()) };
    }
}

/// A borrowed view of one `readdir` record.
#[derive(Debug)]
pub(crate) struct RawEntry<'dir> {
    name: &'dir CStr,
    d_type: u8,
    ino: u64,
}

impl RawEntry<'_> {
    /// # Safety
    /// `drnt` must point to a live dirent that outlives the returned value.
    #[inline]
    unsafe fn from_dirent(drnt: NonNull<dirent64>) -> Self {
        let ptr = drnt.as_ptr();
        // SAFETY: the pointer is valid per the precondition, d_name is NUL-terminated
        unsafe {
            Self {
                name: CStr::from_ptr(access_dirent!(ptr, d_name)),
                d_type: access_dirent!(ptr, d_type),
                ino: access_dirent!(ptr, d_ino),
            }
        }
    }

    #[inline]
    pub(crate) const fn file_type(&self) -> FileType {
        FileType::from_dtype(self.d_type)
    }

    /// "." and ".." are directories (or unknown), checking the type first skips the
    /// name comparison for most entries.
    #[inline]
    pub(crate) fn is_dot(&self) -> bool {
        matches!(self.file_type(), FileType::Directory | FileType::Unknown)
            && matches!(self.name.to_bytes(), b"." | b"..")
    }

    #[inline]
    pub(crate) fn into_dir_entry(self, joiner: &mut PathJoiner, handle: &PathHandle) -> DirEntry {
        let full = joiner.join(self.name);
        let dir_fd = match &handle.native {
            NativePath::Descriptor(fd) => Some(Arc::clone(fd)),
            NativePath::Narrow(_) => None,
        };
        DirEntry::from_parts(
            EntryPath { full, dir_fd },
            joiner.file_name_index,
            self.file_type(),
            OnceLock::from(self.ino),
            OnceLock::new(),
        )
    }
}

/**
 Builds entry paths by reusing one buffer per scan.

 The buffer holds the directory path followed by a separator; each entry name is
 written after `file_name_index`, so the name can later be recovered by slicing.
 Descriptor scans have no path to prefix and produce bare names.
*/
#[derive(Debug)]
pub(crate) struct PathJoiner {
    path_buffer: Vec<u8>,
    file_name_index: usize,
}

impl PathJoiner {
    pub(crate) fn new(handle: &PathHandle) -> Self {
        // Set to ZFS max (1023) + NUL, so no entry name forces a reallocation
        const MAX_SIZED_DIRENT_LENGTH: usize = 1023 + 1;

        let dir_path = handle.as_cstr().map_or(&[][..], CStr::to_bytes);
        let mut path_buffer = Vec::with_capacity(dir_path.len() + 1 + MAX_SIZED_DIRENT_LENGTH);
        path_buffer.extend_from_slice(dir_path);
        if !dir_path.is_empty() && !dir_path.ends_with(b"/") {
            path_buffer.push(b'/');
        }
        let file_name_index = path_buffer.len();
        Self {
            path_buffer,
            file_name_index,
        }
    }

    #[inline]
    fn join(&mut self, name: &CStr) -> Box<CStr> {
        self.path_buffer.truncate(self.file_name_index);
        self.path_buffer.extend_from_slice(name.to_bytes_with_nul());
        // SAFETY: a directory prefix without NULs followed by a name with exactly one trailing NUL
        unsafe { CStr::from_bytes_with_nul_unchecked(&self.path_buffer) }.into()
    }
}

/// The full path of an entry, plus the directory descriptor for descriptor scans.
#[derive(Debug, Clone)]
pub(crate) struct EntryPath {
    full: Box<CStr>,
    dir_fd: Option<Arc<OwnedFd>>,
}

impl EntryPath {
    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.full.to_bytes()
    }

    #[inline]
    pub(crate) fn as_path(&self) -> &Path {
        Path::new(OsStr::from_bytes(self.as_bytes()))
    }

    #[inline]
    pub(crate) fn file_name(&self, file_name_index: usize) -> &OsStr {
        OsStr::from_bytes(self.as_bytes().get(file_name_index..).unwrap_or_default())
    }

    /// Stats the entry, relative to the scanned descriptor when there is one.
    pub(crate) fn fetch_stat(&self, follow: bool) -> io::Result<Metadata> {
        match &self.dir_fd {
            Some(fd) => {
                let flags = if follow { 0 } else { AT_SYMLINK_NOFOLLOW };
                stat_syscall!(fstatat, fd.as_raw_fd(), self.full.as_ptr(), flags)
                    .map(|st| metadata_from_stat(&st))
            }
            None => stat_cstr(&self.full, follow),
        }
    }
}

#[inline]
fn stat_cstr(path: &CStr, follow: bool) -> io::Result<Metadata> {
    let st = if follow {
        stat_syscall!(stat, path.as_ptr())
    } else {
        stat_syscall!(lstat, path.as_ptr())
    }?;
    Ok(metadata_from_stat(&st))
}

/// Stats the directory a handle names. A descriptor is already open, so it is `fstat`ed.
pub(crate) fn stat_handle(handle: &PathHandle, follow: bool) -> io::Result<Metadata> {
    match &handle.native {
        NativePath::Narrow(cpath) => stat_cstr(cpath, follow),
        NativePath::Descriptor(fd) => {
            stat_syscall!(fstat, fd.as_raw_fd()).map(|st| metadata_from_stat(&st))
        }
    }
}

#[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation, clippy::cast_lossless)]
fn metadata_from_stat(st: &libc::stat) -> Metadata {
    Metadata {
        mode: access_stat!(st, st_mode),
        ino: access_stat!(st, st_ino),
        dev: access_stat!(st, st_dev),
        nlink: access_stat!(st, st_nlink),
        uid: access_stat!(st, st_uid),
        gid: access_stat!(st, st_gid),
        size: access_stat!(st, st_size),
        accessed: Timestamp::new(access_stat!(st, st_atime), access_stat!(st, st_atimensec)),
        modified: Timestamp::new(access_stat!(st, st_mtime), access_stat!(st, st_mtimensec)),
        changed: Timestamp::new(access_stat!(st, st_ctime), access_stat!(st, st_ctimensec)),
        file_attributes: 0,
    }
}
