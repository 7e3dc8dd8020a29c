#![allow(clippy::inline_always)]

/// `st_mode` format bits. These values are shared by every POSIX platform and are
/// also what the windows metadata conversion synthesises.
pub mod mode {
    pub const S_IFMT: u32 = 0o170_000;
    pub const S_IFSOCK: u32 = 0o140_000;
    pub const S_IFLNK: u32 = 0o120_000;
    pub const S_IFREG: u32 = 0o100_000;
    pub const S_IFBLK: u32 = 0o060_000;
    pub const S_IFDIR: u32 = 0o040_000;
    pub const S_IFCHR: u32 = 0o020_000;
    pub const S_IFIFO: u32 = 0o010_000;
}

/// Represents the type of a file in the filesystem
///
/// `Unknown` is a legitimate answer from a directory listing: some filesystems do
/// not report a type, and callers must fall back to a stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FileType {
    BlockDevice,
    CharDevice,
    Directory,
    Fifo,
    Symlink,
    RegularFile,
    Socket,
    Unknown,
}

impl FileType {
    #[must_use]
    #[inline(always)]
    #[cfg(unix)]
    /// Converts a `d_type` value from a directory listing to a `FileType`
    pub const fn from_dtype(d_type: u8) -> Self {
        match d_type {
            libc::DT_DIR => Self::Directory,
            libc::DT_REG => Self::RegularFile,
            libc::DT_BLK => Self::BlockDevice,
            libc::DT_CHR => Self::CharDevice,
            libc::DT_FIFO => Self::Fifo,
            libc::DT_LNK => Self::Symlink,
            libc::DT_SOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    #[inline(always)]
    /// Converts the format bits of an `st_mode` to a `FileType`
    pub const fn from_mode(st_mode: u32) -> Self {
        match st_mode & mode::S_IFMT {
            mode::S_IFREG => Self::RegularFile,
            mode::S_IFDIR => Self::Directory,
            mode::S_IFBLK => Self::BlockDevice,
            mode::S_IFCHR => Self::CharDevice,
            mode::S_IFIFO => Self::Fifo,
            mode::S_IFLNK => Self::Symlink,
            mode::S_IFSOCK => Self::Socket,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` unless the listing left the type undetermined.
    #[must_use]
    #[inline]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlockDevice => write!(f, "Block device"),
            Self::CharDevice => write!(f, "Character device"),
            Self::Directory => write!(f, "Directory"),
            Self::Fifo => write!(f, "FIFO"),
            Self::Symlink => write!(f, "Symlink"),
            Self::RegularFile => write!(f, "Regular file"),
            Self::Socket => write!(f, "Socket"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}
