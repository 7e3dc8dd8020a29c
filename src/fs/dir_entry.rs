use crate::fs::{FileType, FollowSymlinks, Metadata, sys::EntryPath};
use crate::{Result, ScandirError};
use std::ffi::OsStr;
use std::path::Path;
use std::sync::OnceLock;

/**
 One child of a scanned directory.

 An entry is a snapshot taken when the directory was read: its name, its full path,
 the type reported by the listing (which may be [`FileType::Unknown`]) and, on unix,
 its inode number. Anything else is fetched on demand and cached for the lifetime of
 the entry, so each kind of stat is performed at most once.

 Entries are independent of the scan that produced them: they can outlive it, be
 sent to other threads and be shared between them. Cloning copies whatever has been
 cached so far.

 The caches are never invalidated. If the file changes or disappears after the
 listing, the entry keeps reporting what it saw first.
*/
#[derive(Clone)]
pub struct DirEntry {
    pub(crate) path: EntryPath,
    pub(crate) file_name_index: usize,
    pub(crate) file_type: FileType,
    pub(crate) ino: OnceLock<u64>,
    pub(crate) lstat: OnceLock<Metadata>,
    pub(crate) stat: OnceLock<Metadata>,
}

impl DirEntry {
    #[inline]
    pub(crate) const fn from_parts(
        path: EntryPath,
        file_name_index: usize,
        file_type: FileType,
        ino: OnceLock<u64>,
        lstat: OnceLock<Metadata>,
    ) -> Self {
        Self {
            path,
            file_name_index,
            file_type,
            ino,
            lstat,
            stat: OnceLock::new(),
        }
    }

    /// The entry's file name, without any leading directory.
    #[must_use]
    #[inline]
    pub fn name(&self) -> &OsStr {
        self.path.file_name(self.file_name_index)
    }

    /**
     The scanned directory joined with the entry's name.

     The directory part is exactly what was passed to the scan: relative scans give
     relative paths, and a scan with no path gives `./name`. Descriptor scans have no
     directory path, so there this is just the name.
    */
    #[must_use]
    #[inline]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// The path as raw bytes (the encoded form on windows).
    #[must_use]
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.path.as_bytes()
    }

    /// Index into [`as_bytes`](Self::as_bytes) where the file name starts.
    #[must_use]
    #[inline]
    pub const fn file_name_index(&self) -> usize {
        self.file_name_index
    }

    /// The type reported by the directory listing. This costs nothing but may be
    /// [`FileType::Unknown`]; the `is_*` methods resolve that with a stat.
    #[must_use]
    #[inline]
    pub const fn file_type(&self) -> FileType {
        self.file_type
    }

    /**
     Returns `true` if the entry is a symbolic link.

     Answered from the listing type when it is known, otherwise from a (cached) lstat.
     An entry that vanished before the lstat is not a symlink.

     # Errors
     Any lstat failure other than the entry having disappeared.
    */
    #[inline]
    pub fn is_symlink(&self) -> Result<bool> {
        if self.file_type.is_known() {
            return Ok(self.file_type == FileType::Symlink);
        }
        self.test_mode(FollowSymlinks::No, FileType::Symlink)
    }

    /**
     Returns `true` if the entry is a directory, or a symlink to one.

     # Errors
     Any stat failure other than the entry (or a link's target) having disappeared.

     # Examples
     ```
     let dir = std::env::temp_dir().join("scandir_is_dir_doc");
     let _ = std::fs::remove_dir_all(&dir);
     std::fs::create_dir_all(dir.join("sub")).unwrap();
     std::fs::write(dir.join("file.txt"), b"hi").unwrap();

     for entry in scandir::scandir(&dir).unwrap() {
         let entry = entry.unwrap();
         let expect_dir = entry.name() == "sub";
         assert_eq!(entry.is_dir().unwrap(), expect_dir);
         assert_eq!(entry.is_file().unwrap(), !expect_dir);
     }
     std::fs::remove_dir_all(&dir).unwrap();
     ```
    */
    #[inline]
    pub fn is_dir(&self) -> Result<bool> {
        self.is_dir_with(FollowSymlinks::Yes)
    }

    /**
     Returns `true` if the entry is a directory, following symlinks only if asked to.

     A symlink is never a directory when links are not followed.

     # Errors
     As [`is_dir`](Self::is_dir).
    */
    #[inline]
    pub fn is_dir_with(&self, follow_symlinks: FollowSymlinks) -> Result<bool> {
        self.test_mode(follow_symlinks, FileType::Directory)
    }

    /// Returns `true` if the entry is a regular file, or a symlink to one.
    ///
    /// # Errors
    /// Any stat failure other than the entry (or a link's target) having disappeared.
    #[inline]
    pub fn is_file(&self) -> Result<bool> {
        self.is_file_with(FollowSymlinks::Yes)
    }

    /// Returns `true` if the entry is a regular file, following symlinks only if asked to.
    ///
    /// # Errors
    /// As [`is_file`](Self::is_file).
    #[inline]
    pub fn is_file_with(&self, follow_symlinks: FollowSymlinks) -> Result<bool> {
        self.test_mode(follow_symlinks, FileType::RegularFile)
    }

    /**
     The classification procedure shared by `is_dir` and `is_file`.

     A known, non-link listing type answers directly. A link answers `false` unless
     links are followed, in which case its target is stat'ed. An unknown listing type
     is always stat'ed. A stat that finds nothing there answers `false`.
    */
    fn test_mode(&self, follow_symlinks: FollowSymlinks, wanted: FileType) -> Result<bool> {
        let is_symlink = self.file_type == FileType::Symlink;
        let need_stat = !self.file_type.is_known() || (is_symlink && follow_symlinks.follows());

        if !need_stat {
            return Ok(!is_symlink && self.file_type == wanted);
        }

        match self.stat_with(follow_symlinks) {
            Ok(metadata) => Ok(metadata.file_type() == wanted),
            Err(err) if err.is_not_found() => {
                log::debug!("{} vanished before it could be classified", self.path().display());
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    /**
     Returns the entry's metadata, following symlinks.

     # Errors
     The classified stat failure, including `NotFound` for a dangling link.
    */
    #[inline]
    pub fn stat(&self) -> Result<&Metadata> {
        self.stat_with(FollowSymlinks::Yes)
    }

    /**
     Returns the entry's metadata, following symlinks only if asked to.

     Both results are cached. When the entry is not a symlink the two are the same
     record, so the follow variant reuses the lstat instead of issuing a second call.
     On windows the lstat comes straight from the directory listing.

     # Errors
     The classified stat failure.

     # Examples
     ```
     use scandir::FollowSymlinks;
     let dir = std::env::temp_dir().join("scandir_stat_doc");
     let _ = std::fs::remove_dir_all(&dir);
     std::fs::create_dir_all(&dir).unwrap();
     std::fs::write(dir.join("ten"), [0u8; 10]).unwrap();

     let entry = scandir::scandir(&dir).unwrap().next().unwrap().unwrap();
     let first = entry.stat_with(FollowSymlinks::No).unwrap();
     assert_eq!(first.size(), 10);
     assert!(std::ptr::eq(first, entry.stat().unwrap()));
     std::fs::remove_dir_all(&dir).unwrap();
     ```
    */
    pub fn stat_with(&self, follow_symlinks: FollowSymlinks) -> Result<&Metadata> {
        if !follow_symlinks.follows() {
            return self.lstat();
        }
        if let Some(metadata) = self.stat.get() {
            return Ok(metadata);
        }
        if self.file_type.is_known() {
            if self.file_type != FileType::Symlink {
                return self.lstat();
            }
        } else {
            // one lstat both classifies the entry and, for a non-link, answers the query
            let lstat = self.lstat()?;
            if !lstat.is_symlink() {
                return Ok(lstat);
            }
        }
        let metadata = self.fetch(FollowSymlinks::Yes)?;
        Ok(self.stat.get_or_init(|| metadata))
    }

    /**
     The `(device, inode)` pair of whatever the entry resolves to, following symlinks.

     Windows listings carry no file ids, so there an entry that is not a link is opened
     to read them; the file index is cached as the entry's inode on the way.
    */
    pub(crate) fn identity(&self) -> Result<(u64, u64)> {
        #[cfg(windows)]
        {
            if !self.is_symlink()? {
                let metadata = self.fetch(FollowSymlinks::No)?;
                let ino = *self.ino.get_or_init(|| metadata.ino());
                return Ok((metadata.dev(), ino));
            }
        }
        let metadata = self.stat()?;
        Ok((metadata.dev(), metadata.ino()))
    }

    fn lstat(&self) -> Result<&Metadata> {
        if let Some(metadata) = self.lstat.get() {
            return Ok(metadata);
        }
        let metadata = self.fetch(FollowSymlinks::No)?;
        // if another thread got there first, its value wins
        Ok(self.lstat.get_or_init(|| metadata))
    }

    #[inline]
    fn fetch(&self, follow_symlinks: FollowSymlinks) -> Result<Metadata> {
        self.path
            .fetch_stat(follow_symlinks.follows())
            .map_err(|err| ScandirError::from_io(err, self.path()))
    }

    /**
     The entry's inode (file index on windows).

     Unix listings carry it, so this is free there. Windows listings do not, so the
     first call opens the entry to read it and caches the result.

     # Errors
     Only on windows, when the entry cannot be opened.
    */
    pub fn inode(&self) -> Result<u64> {
        if let Some(&ino) = self.ino.get() {
            return Ok(ino);
        }
        let ino = self.fetch(FollowSymlinks::No)?.ino();
        Ok(*self.ino.get_or_init(|| ino))
    }

    /// The listing type, with `Unknown` resolved through lstat.
    /// An entry that vanished stays `Unknown`.
    ///
    /// # Errors
    /// Any lstat failure other than the entry having disappeared.
    pub fn resolved_file_type(&self) -> Result<FileType> {
        if self.file_type.is_known() {
            return Ok(self.file_type);
        }
        match self.stat_with(FollowSymlinks::No) {
            Ok(metadata) => Ok(metadata.file_type()),
            Err(err) if err.is_not_found() => Ok(FileType::Unknown),
            Err(err) => Err(err),
        }
    }

    /// Converts the path to a string, replacing invalid unicode.
    #[must_use]
    #[inline]
    pub fn to_string_lossy(&self) -> std::borrow::Cow<'_, str> {
        self.path().to_string_lossy()
    }
}

impl core::fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DirEntry")
            .field("path", &self.path())
            .field("file_type", &self.file_type)
            .field("ino", &self.ino.get())
            .finish_non_exhaustive()
    }
}

impl core::fmt::Display for DirEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.path().display())
    }
}

impl AsRef<Path> for DirEntry {
    #[inline]
    fn as_ref(&self) -> &Path {
        self.path()
    }
}
