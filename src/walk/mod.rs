mod types;
mod walk_builder;
mod walker;

pub use types::{DirEntryFilter, WalkReceiver, WalkStep};
pub use walk_builder::WalkBuilder;
pub use walker::Walk;
