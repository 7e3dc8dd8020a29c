use crate::fs::DirEntry;
use crate::walk::{DirEntryFilter, WalkBuilder, WalkReceiver, WalkStep};
use crate::{Result, ScandirError, scandir};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug)]
enum Frame {
    /// A directory still to be read
    Visit { dir: PathBuf, depth: usize },
    /// A bottom-up step whose subdirectories have all been yielded
    Emit(WalkStep),
}

/**
 A directory tree walk driven by [`scandir`](crate::scandir).

 Each item describes one directory: its path, depth and entries split into
 directories and non-directories. Entries keep whatever the walk learned while
 classifying them, so asking them again is free.

 A directory that cannot be read yields one `Err` and the walk carries on with the
 rest of the tree. Symlinks to directories appear in `dirs` but are only descended
 into when `follow_links` is set, in which case directories already visited (by
 device and inode) are skipped so link cycles terminate.

 # Examples
 ```
 use scandir::walk::Walk;
 let root = std::env::temp_dir().join("scandir_walk_doc");
 let _ = std::fs::remove_dir_all(&root);
 std::fs::create_dir_all(root.join("a/b")).unwrap();
 std::fs::write(root.join("a/file"), b"").unwrap();

 let steps: Vec<_> = Walk::init(&root).build().map(Result::unwrap).collect();
 let dirs: Vec<_> = steps.iter().map(|step| step.dir.strip_prefix(&root).unwrap().to_owned()).collect();
 assert_eq!(dirs, [std::path::PathBuf::new(), "a".into(), "a/b".into()]);
 assert_eq!(steps[1].file_names().collect::<Vec<_>>(), ["file"]);
 std::fs::remove_dir_all(&root).unwrap();
 ```
*/
#[derive(Debug)]
pub struct Walk {
    stack: Vec<Frame>,
    topdown: bool,
    follow_links: bool,
    max_depth: Option<usize>,
    filter: Option<DirEntryFilter>,
    /// (device, inode) pairs already descended into, only tracked when following links
    visited: Option<HashSet<(u64, u64)>>,
}

impl Walk {
    /// Create a new walk rooted at `root`.
    #[must_use]
    #[inline]
    pub fn init<P: AsRef<Path>>(root: P) -> WalkBuilder {
        WalkBuilder::new(root)
    }

    pub(crate) fn from_builder(builder: WalkBuilder) -> Self {
        Self {
            stack: vec![Frame::Visit {
                dir: builder.root,
                depth: 0,
            }],
            topdown: builder.topdown,
            follow_links: builder.follow_links,
            max_depth: builder.max_depth,
            filter: builder.filter,
            visited: builder.follow_links.then(HashSet::new),
        }
    }

    /// Reads one directory and partitions its entries.
    fn read_step(&self, dir: PathBuf, depth: usize) -> Result<WalkStep> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        for entry in scandir(&dir)? {
            let entry = entry?;
            if self.filter.is_some_and(|filter| !filter(&entry)) {
                continue;
            }
            let is_dir = entry.is_dir().unwrap_or_else(|err| {
                log::debug!("treating {} as a file: {err}", entry.path().display());
                false
            });
            if is_dir {
                dirs.push(entry);
            } else {
                files.push(entry);
            }
        }

        Ok(WalkStep {
            dir,
            depth,
            dirs,
            files,
        })
    }

    /// Returns `true` if `entry`, a directory at `depth`, should be read as well.
    fn should_descend(&mut self, entry: &DirEntry, depth: usize) -> bool {
        if self.max_depth.is_some_and(|max| depth >= max) {
            return false;
        }
        if !self.follow_links && entry.is_symlink().unwrap_or(false) {
            return false;
        }
        let Some(visited) = self.visited.as_mut() else {
            return true;
        };
        match entry.identity() {
            Ok(identity) => visited.insert(identity),
            Err(err) => {
                log::debug!("not descending into {}: {err}", entry.path().display());
                false
            }
        }
    }

    fn mark_root_visited(&mut self, dir: &Path) -> Result<()> {
        if let Some(visited) = self.visited.as_mut() {
            let metadata = crate::stat(dir, crate::FollowSymlinks::Yes)?;
            visited.insert((metadata.dev(), metadata.ino()));
        }
        Ok(())
    }

    /**
     Runs the walk on a worker thread, sending each step through a channel of
     `capacity` slots. Dropping the receiver stops the worker at its next send.

     # Errors
     `Io` if the worker thread cannot be spawned.
    */
    pub fn traverse(self, capacity: usize) -> Result<WalkReceiver> {
        let root = match self.stack.first() {
            Some(Frame::Visit { dir, .. }) => dir.clone(),
            _ => PathBuf::new(),
        };
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        std::thread::Builder::new()
            .name("scandir-walk".into())
            .spawn(move || {
                for step in self {
                    if sender.send(step).is_err() {
                        log::trace!("walk receiver dropped, stopping");
                        break;
                    }
                }
            })
            .map_err(|err| ScandirError::from_io(err, root))?;
        Ok(receiver)
    }
}

impl Iterator for Walk {
    type Item = Result<WalkStep>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.stack.pop() {
            let (dir, depth) = match frame {
                Frame::Emit(step) => return Some(Ok(step)),
                Frame::Visit { dir, depth } => (dir, depth),
            };

            if depth == 0
                && let Err(err) = self.mark_root_visited(&dir)
            {
                return Some(Err(err));
            }

            let step = match self.read_step(dir, depth) {
                Ok(step) => step,
                Err(err) => return Some(Err(err)),
            };

            let children: Vec<Frame> = step
                .dirs
                .iter()
                .filter(|entry| self.should_descend(entry, depth))
                .map(|entry| Frame::Visit {
                    dir: entry.path().to_path_buf(),
                    depth: depth + 1,
                })
                .collect();

            if self.topdown {
                self.stack.extend(children.into_iter().rev());
                return Some(Ok(step));
            }
            self.stack.push(Frame::Emit(step));
            self.stack.extend(children.into_iter().rev());
        }
        None
    }
}

impl core::iter::FusedIterator for Walk {}
