use crate::walk::{DirEntryFilter, Walk};
use std::path::{Path, PathBuf};

/**
 A builder for creating a [`Walk`] with customisable options.

 Defaults match a plain top-down walk: parents before children, symlinks to
 directories listed but not descended into, no depth limit and no filter.
*/
#[derive(Debug, Clone)]
pub struct WalkBuilder {
    pub(crate) root: PathBuf,
    pub(crate) topdown: bool,
    pub(crate) follow_links: bool,
    pub(crate) max_depth: Option<usize>,
    pub(crate) filter: Option<DirEntryFilter>,
}

impl WalkBuilder {
    /**
      Creates a new `WalkBuilder` with required fields.

      # Arguments
      `root` - The directory to start from
    */
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            topdown: true,
            follow_links: false,
            max_depth: None,
            filter: None,
        }
    }

    /// Yield each directory before its subdirectories, defaults to true
    #[must_use]
    pub const fn topdown(mut self, topdown: bool) -> Self {
        self.topdown = topdown;
        self
    }

    /// Descend into symlinks that point at directories, defaults to false
    #[must_use]
    pub const fn follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    /// Set the maximum depth to descend to, the root being depth 0
    #[must_use]
    pub const fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Keep only entries for which `filter` returns true.
    /// A directory that is filtered out is neither listed nor descended into.
    #[must_use]
    pub const fn filter(mut self, filter: Option<DirEntryFilter>) -> Self {
        self.filter = filter;
        self
    }

    /// Finish configuring. Nothing is read until the walk is iterated.
    #[must_use]
    pub fn build(self) -> Walk {
        Walk::from_builder(self)
    }
}
