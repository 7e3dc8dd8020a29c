mod dir_entry;
pub(crate) mod file_type;
mod iter;
mod listing;
mod metadata;
pub(crate) mod path;
mod sys;

pub use dir_entry::DirEntry;
pub use file_type::FileType;
pub use iter::{Names, ScanState, ScandirIter, Typed};
pub use listing::{list_dir_stat, listdir};
pub use metadata::{FollowSymlinks, Metadata, Timestamp, stat};
pub use path::{MAX_PATH_LEN, PathHandle};
