use crate::fs::DirEntry;
use crate::Result;
use crossbeam_channel::Receiver;
use std::ffi::OsStr;
use std::path::PathBuf;

/// Generic filter function type for directory entries
pub type DirEntryFilter = fn(&DirEntry) -> bool;

/// Receiving end of a walk running on a worker thread
pub type WalkReceiver = Receiver<Result<WalkStep>>;

/**
 One directory visited by a [`Walk`](crate::walk::Walk).

 The directory's entries are split into those that are directories (symlinks to
 directories included) and everything else.
*/
#[derive(Debug, Clone)]
pub struct WalkStep {
    /// Path of the directory, starting with the walk's root
    pub dir: PathBuf,
    /// Distance from the root, which is depth 0
    pub depth: usize,
    pub dirs: Vec<DirEntry>,
    pub files: Vec<DirEntry>,
}

impl WalkStep {
    pub fn dir_names(&self) -> impl Iterator<Item = &OsStr> {
        self.dirs.iter().map(DirEntry::name)
    }

    pub fn file_names(&self) -> impl Iterator<Item = &OsStr> {
        self.files.iter().map(DirEntry::name)
    }
}
