use crate::fs::{FileType, PathHandle, sys};
use crate::{Result, ScandirError};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Whether a metadata query or classification should resolve symbolic links.
///
/// Passed explicitly wherever the choice matters so a call site always reads as
/// `is_dir_with(FollowSymlinks::No)` rather than an anonymous boolean.
///
/// ```compile_fail
/// let follow: scandir::FollowSymlinks = true.into();
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FollowSymlinks {
    /// Report on the link target (`stat`)
    #[default]
    Yes,
    /// Report on the link itself (`lstat`)
    No,
}

impl FollowSymlinks {
    #[must_use]
    #[inline]
    pub const fn follows(self) -> bool {
        matches!(self, Self::Yes)
    }
}

/// A point in time as whole seconds since the unix epoch plus a nanosecond part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timestamp {
    secs: i64,
    nanos: u32,
}

impl Timestamp {
    #[must_use]
    #[inline]
    pub const fn new(secs: i64, nanos: u32) -> Self {
        Self { secs, nanos }
    }

    #[must_use]
    #[inline]
    pub const fn secs(&self) -> i64 {
        self.secs
    }

    #[must_use]
    #[inline]
    pub const fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Seconds since the epoch as a float.
    #[must_use]
    #[inline]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_secs_f64(&self) -> f64 {
        self.secs as f64 + f64::from(self.nanos) / 1e9
    }

    /// Converts to a UTC datetime, `None` if out of chrono's range.
    #[must_use]
    #[inline]
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.secs, self.nanos)
    }
}

/**
 A snapshot of a file's stat information.

 Fields are normalised once at the provider boundary: sizes and identities are `u64`,
 times are [`Timestamp`]s. On windows `uid`/`gid` are zero and `file_attributes`
 carries the raw `FILE_ATTRIBUTE_*` bits; on unix `file_attributes` is zero.

 A windows directory listing does not report file ids, so the lstat an entry gets from
 its listing (and the stat of an entry that is not a symlink, which is the same record)
 has `ino`, `dev` and `nlink` set to zero. [`DirEntry::inode`](crate::DirEntry::inode)
 and [`stat`] open the file and report the real values.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Metadata {
    pub(crate) mode: u32,
    pub(crate) ino: u64,
    pub(crate) dev: u64,
    pub(crate) nlink: u64,
    pub(crate) uid: u32,
    pub(crate) gid: u32,
    pub(crate) size: u64,
    pub(crate) accessed: Timestamp,
    pub(crate) modified: Timestamp,
    pub(crate) changed: Timestamp,
    pub(crate) file_attributes: u32,
}

impl Metadata {
    #[must_use]
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.mode
    }

    /// The permission bits of `mode`
    #[must_use]
    #[inline]
    pub const fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    #[must_use]
    #[inline]
    pub const fn file_type(&self) -> FileType {
        FileType::from_mode(self.mode)
    }

    #[must_use]
    #[inline]
    pub const fn is_dir(&self) -> bool {
        matches!(self.file_type(), FileType::Directory)
    }

    #[must_use]
    #[inline]
    pub const fn is_file(&self) -> bool {
        matches!(self.file_type(), FileType::RegularFile)
    }

    #[must_use]
    #[inline]
    pub const fn is_symlink(&self) -> bool {
        matches!(self.file_type(), FileType::Symlink)
    }

    #[must_use]
    #[inline]
    pub const fn ino(&self) -> u64 {
        self.ino
    }

    #[must_use]
    #[inline]
    pub const fn dev(&self) -> u64 {
        self.dev
    }

    #[must_use]
    #[inline]
    pub const fn nlink(&self) -> u64 {
        self.nlink
    }

    #[must_use]
    #[inline]
    pub const fn uid(&self) -> u32 {
        self.uid
    }

    #[must_use]
    #[inline]
    pub const fn gid(&self) -> u32 {
        self.gid
    }

    #[must_use]
    #[inline]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    #[inline]
    pub const fn accessed(&self) -> Timestamp {
        self.accessed
    }

    #[must_use]
    #[inline]
    pub const fn modified(&self) -> Timestamp {
        self.modified
    }

    /// Status change time on unix, creation time on windows.
    #[must_use]
    #[inline]
    pub const fn changed(&self) -> Timestamp {
        self.changed
    }

    #[must_use]
    #[inline]
    pub const fn file_attributes(&self) -> u32 {
        self.file_attributes
    }

    /// Last modification time as a UTC datetime.
    #[must_use]
    #[inline]
    pub fn modified_time(&self) -> Option<DateTime<Utc>> {
        self.modified.to_datetime()
    }
}

/**
 Returns the metadata for `path`, following symlinks if asked to.

 This is the stateless provider used by directory entries; it is exposed so a caller
 can stat a path with the same conversions and error classification.

 # Errors
 `InvalidPath` if the path cannot be passed to the OS, otherwise the classified
 native failure (`NotFound`, `PermissionDenied`, `Io`).

 # Examples
 ```
 use scandir::{stat, FollowSymlinks};
 let dir = std::env::temp_dir();
 let md = stat(&dir, FollowSymlinks::Yes).unwrap();
 assert!(md.is_dir());
 assert!(stat(dir.join("scandir_stat_doc_missing"), FollowSymlinks::No).unwrap_err().is_not_found());
 ```
*/
pub fn stat<P: AsRef<Path>>(path: P, follow_symlinks: FollowSymlinks) -> Result<Metadata> {
    let path = path.as_ref();
    let handle = PathHandle::resolve(path)?;
    sys::stat_handle(&handle, follow_symlinks.follows())
        .map_err(|err| ScandirError::from_io(err, path))
}
