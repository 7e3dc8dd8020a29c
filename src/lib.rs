/*!
 Lazy directory scanning with cached per-entry type and stat information.

 [`scandir`] opens a directory and returns an iterator of [`DirEntry`] values. Each
 entry knows its name, its path and the file type the OS reported while listing the
 directory, so questions such as "is this a directory?" are usually answered without
 a single extra system call. When the listing cannot answer (an unknown type, or a
 symlink that should be followed) the entry stats once and remembers the result.

 - unix: `opendir`/`readdir`/`closedir`, entries carry `d_type` and `d_ino`
 - windows: `FindFirstFileW`/`FindNextFileW`/`FindClose`, entries carry a full lstat

 The directory handle is released as soon as the last entry has been read, when a read
 fails, when the scan is closed, or when it is dropped, whichever comes first.

 # Examples
 ```
 use scandir::FollowSymlinks;

 let dir = std::env::temp_dir().join("scandir_crate_doc");
 let _ = std::fs::remove_dir_all(&dir);
 std::fs::create_dir_all(dir.join("sub")).unwrap();
 std::fs::write(dir.join("a.txt"), b"0123456789").unwrap();

 let mut files = 0;
 for entry in scandir::scandir(&dir).unwrap() {
     let entry = entry.unwrap();
     if entry.is_file().unwrap() {
         files += 1;
         assert_eq!(entry.stat_with(FollowSymlinks::No).unwrap().size(), 10);
     }
 }
 assert_eq!(files, 1);
 std::fs::remove_dir_all(&dir).unwrap();
 ```

 Whole trees can be walked with [`walk::Walk`], top-down or bottom-up.
*/

#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::implicit_return)]
#![allow(clippy::question_mark_used)]
#![allow(clippy::pub_use)]
#![allow(clippy::redundant_pub_crate)]
#![allow(clippy::field_scoped_visibility_modifiers)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::std_instead_of_alloc)]
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::exhaustive_enums)]
#![allow(clippy::exhaustive_structs)]
#![allow(clippy::as_underscore)]
#![allow(clippy::multiple_unsafe_ops_per_block)]

#[cfg(unix)]
#[macro_use]
mod macros;

mod error;
pub mod fs;
pub mod walk;

#[cfg(test)]
mod test;

pub use error::{InvalidPathReason, Result, ScandirError};
pub use fs::{
    DirEntry, FileType, FollowSymlinks, Metadata, Names, PathHandle, ScanState, ScandirIter,
    Timestamp, Typed, list_dir_stat, listdir, stat,
};

use crossbeam_channel::Receiver;
use std::path::Path;

/**
 Opens `path` for scanning.

 The directory is opened immediately, so a missing or unreadable directory fails here
 rather than on the first call to `next`. Entry paths are `path` joined with each name.

 # Errors
 - `InvalidPath` if `path` contains a NUL or is too long for the platform
 - `NotFound`, `PermissionDenied` or `Io` if the directory cannot be opened

 # Examples
 ```
 let missing = std::env::temp_dir().join("scandir_definitely_missing_dir");
 assert!(scandir::scandir(&missing).unwrap_err().is_not_found());
 ```
*/
pub fn scandir<P: AsRef<Path>>(path: P) -> Result<ScandirIter> {
    ScandirIter::open(PathHandle::resolve(path)?)
}

/**
 Scans the current directory. Entry paths are `./name`.

 # Errors
 As [`scandir`].
*/
pub fn scandir_cwd() -> Result<ScandirIter> {
    ScandirIter::open(PathHandle::current_dir())
}

/**
 Scans a path given as raw bytes.

 # Errors
 `InvalidPath` with [`InvalidPathReason::Encoding`] on windows if the bytes are not
 UTF-8, otherwise as [`scandir`].
*/
pub fn scandir_bytes(path: &[u8]) -> Result<ScandirIter> {
    ScandirIter::open(PathHandle::resolve_bytes(path)?)
}

/**
 Scans an already open directory.

 The descriptor is duplicated and left open for the caller. Entry paths are bare
 names, and entries stat themselves relative to the directory (`fstatat`), so they
 stay correct even if the directory is renamed.

 # Errors
 `Io` if the descriptor cannot be duplicated or does not refer to a directory.

 # Examples
 ```
 use std::os::fd::AsFd;
 let dir = std::env::temp_dir().join("scandir_fd_doc");
 let _ = std::fs::remove_dir_all(&dir);
 std::fs::create_dir_all(&dir).unwrap();
 std::fs::write(dir.join("inner"), b"x").unwrap();

 let handle = std::fs::File::open(&dir).unwrap();
 let entry = scandir::scandir_fd(handle.as_fd()).unwrap().next().unwrap().unwrap();
 assert_eq!(entry.path(), std::path::Path::new("inner"));
 assert!(entry.is_file().unwrap());
 std::fs::remove_dir_all(&dir).unwrap();
 ```
*/
#[cfg(unix)]
pub fn scandir_fd(fd: std::os::fd::BorrowedFd<'_>) -> Result<ScandirIter> {
    ScandirIter::open(PathHandle::from_fd(fd)?)
}

/**
 Opens `path` on the calling thread, then reads it on a worker thread.

 Open errors are returned here; everything after arrives through the channel, which
 holds at most `capacity` items. See [`ScandirIter::spawn`].

 # Errors
 As [`scandir`], or `Io` if the worker cannot be spawned.
*/
pub fn spawn_scandir<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Receiver<Result<DirEntry>>> {
    scandir(path)?.spawn(capacity)
}
