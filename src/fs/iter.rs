#![allow(clippy::must_use_candidate)]

use crate::fs::{DirEntry, FileType, PathHandle, sys};
use crate::{Result, ScandirError};
use core::iter::FusedIterator;
use crossbeam_channel::Receiver;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;

/// Where a scan is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanState {
    /// The native listing is open and more entries may follow
    Active,
    /// Every entry has been read; the listing has been released
    Exhausted,
    /// Closed by the caller or by a read error; the listing has been released
    Closed,
}

#[derive(Debug)]
enum Session {
    Active(sys::RawDir),
    Exhausted,
    Closed,
}

/**
 A lazy scan over one directory.

 Yields a [`DirEntry`] for every child except "." and "..", in whatever order the
 OS reports them. The native listing (a `DIR` stream or a find handle) is owned by
 the scan and released exactly once: when the last entry has been read, when a read
 fails, when [`close`](Self::close) is called, or when the scan is dropped.

 A read error is yielded once as `Some(Err(..))`, after the listing has already been
 released. From then on, as after exhaustion, the iterator returns `None` without ever
 reopening anything.

 Scans can be moved to another thread but not shared; every read needs `&mut self`.

 # Examples
 ```
 let dir = std::env::temp_dir().join("scandir_iter_doc");
 let _ = std::fs::remove_dir_all(&dir);
 std::fs::create_dir_all(&dir).unwrap();
 for name in ["a", "b", "c"] {
     std::fs::write(dir.join(name), b"").unwrap();
 }

 let mut scan = scandir::scandir(&dir).unwrap();
 let mut names: Vec<_> = scan.by_ref().map(|entry| entry.unwrap().name().to_owned()).collect();
 names.sort();
 assert_eq!(names, ["a", "b", "c"]);
 assert_eq!(scan.state(), scandir::ScanState::Exhausted);
 assert!(scan.next().is_none());
 std::fs::remove_dir_all(&dir).unwrap();
 ```
*/
#[derive(Debug)]
pub struct ScandirIter {
    path: Arc<PathHandle>,
    joiner: sys::PathJoiner,
    session: Session,
}

impl ScandirIter {
    /// Opens the native listing for `path`. Nothing is read until the first `next`.
    pub(crate) fn open(path: PathHandle) -> Result<Self> {
        let raw = sys::RawDir::open(&path).map_err(|err| {
            log::debug!("failed to open {}: {err}", path.as_path().display());
            ScandirError::from_io(err, path.as_path())
        })?;
        log::trace!("opened {}", path.as_path().display());
        Ok(Self {
            joiner: sys::PathJoiner::new(&path),
            path: Arc::new(path),
            session: Session::Active(raw),
        })
    }

    /// The directory being scanned, as it was given.
    #[inline]
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// The handle the scan was opened from.
    #[inline]
    pub fn handle(&self) -> &PathHandle {
        &self.path
    }

    #[inline]
    pub const fn state(&self) -> ScanState {
        match self.session {
            Session::Active(_) => ScanState::Active,
            Session::Exhausted => ScanState::Exhausted,
            Session::Closed => ScanState::Closed,
        }
    }

    /// Returns `true` once the native listing has been released, for any reason.
    #[inline]
    pub const fn is_closed(&self) -> bool {
        !matches!(self.session, Session::Active(_))
    }

    /**
     Releases the native listing now rather than when the scan is dropped.

     Safe to call any number of times, in any state.
    */
    pub fn close(&mut self) {
        if matches!(self.session, Session::Active(_)) {
            log::trace!("closing {} before exhaustion", self.path().display());
        }
        self.session = Session::Closed;
    }

    /// The descriptor of the open listing, `None` once it has been released.
    #[cfg(unix)]
    #[inline]
    pub fn as_raw_fd(&self) -> Option<std::os::fd::RawFd> {
        match &self.session {
            Session::Active(raw) => Some(raw.dirfd()),
            Session::Exhausted | Session::Closed => None,
        }
    }

    /// Reads past "." and ".." to the next real entry, releasing the listing on the
    /// way out if it is finished or broken.
    fn advance(&mut self) -> Option<Result<DirEntry>> {
        let Session::Active(raw) = &mut self.session else {
            return None;
        };

        let outcome = loop {
            match raw.advance_raw() {
                Ok(Some(entry)) if entry.is_dot() => {}
                Ok(Some(entry)) => break Ok(Some(entry.into_dir_entry(&mut self.joiner, &self.path))),
                Ok(None) => break Ok(None),
                Err(err) => break Err(err),
            }
        };

        match outcome {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                log::trace!("finished {}", self.path().display());
                self.session = Session::Exhausted;
                None
            }
            Err(err) => {
                log::debug!("error reading {}: {err}", self.path().display());
                // release first, then report
                self.session = Session::Closed;
                Some(Err(ScandirError::from_io(err, self.path.as_path())))
            }
        }
    }

    /// Only the names of the entries.
    pub fn names(self) -> Names {
        Names { inner: self }
    }

    /// Names paired with their type, resolving types the listing left unknown.
    pub fn typed(self) -> Typed {
        Typed { inner: self }
    }

    /**
     Moves the scan to a worker thread that sends every item through a channel of
     `capacity` slots.

     Dropping the receiver stops the worker at its next send, which drops the scan
     and releases the listing.

     # Errors
     `Io` if the worker thread cannot be spawned.
    */
    pub fn spawn(self, capacity: usize) -> Result<Receiver<Result<DirEntry>>> {
        let path = self.path().to_path_buf();
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        std::thread::Builder::new()
            .name("scandir-scan".into())
            .spawn(move || {
                for item in self {
                    if sender.send(item).is_err() {
                        log::trace!("scan receiver dropped, stopping");
                        break;
                    }
                }
            })
            .map_err(|err| ScandirError::from_io(err, path))?;
        Ok(receiver)
    }
}

impl Iterator for ScandirIter {
    type Item = Result<DirEntry>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

impl FusedIterator for ScandirIter {}

/// Iterator over entry names, see [`ScandirIter::names`].
#[derive(Debug)]
pub struct Names {
    inner: ScandirIter,
}

impl Iterator for Names {
    type Item = Result<OsString>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|entry| entry.map(|entry| entry.name().to_owned()))
    }
}

impl FusedIterator for Names {}

/// Iterator over `(name, type)` pairs, see [`ScandirIter::typed`].
#[derive(Debug)]
pub struct Typed {
    inner: ScandirIter,
}

impl Iterator for Typed {
    type Item = Result<(OsString, FileType)>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|entry| {
            let entry = entry?;
            let file_type = entry.resolved_file_type()?;
            Ok((entry.name().to_owned(), file_type))
        })
    }
}

impl FusedIterator for Typed {}
