use crate::fs::file_type::mode::{S_IFDIR, S_IFLNK, S_IFMT, S_IFREG};
use crate::fs::path::NativePath;
use crate::fs::{DirEntry, FileType, Metadata, PathHandle, Timestamp};
use core::ffi::c_void;
use core::{mem, ptr};
use std::ffi::{OsStr, OsString};
use std::io;
use std::os::windows::ffi::{OsStrExt, OsStringExt};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use windows_sys::Win32::Foundation::{
    CloseHandle, ERROR_NO_MORE_FILES, FILETIME, GetLastError, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    BY_HANDLE_FILE_INFORMATION, CreateFileW, FILE_ATTRIBUTE_DIRECTORY, FILE_ATTRIBUTE_READONLY,
    FILE_ATTRIBUTE_REPARSE_POINT, FILE_ATTRIBUTE_TAG_INFO, FILE_FLAG_BACKUP_SEMANTICS,
    FILE_FLAG_OPEN_REPARSE_POINT, FILE_READ_ATTRIBUTES, FILE_SHARE_DELETE, FILE_SHARE_READ,
    FILE_SHARE_WRITE, FileAttributeTagInfo, FindClose, FindFirstFileW, FindNextFileW,
    GetFileInformationByHandle, GetFileInformationByHandleEx, OPEN_EXISTING, WIN32_FIND_DATAW,
};
use windows_sys::Win32::System::SystemServices::IO_REPARSE_TAG_SYMLINK;

/// 100ns intervals per second in a `FILETIME`
const TICKS_PER_SECOND: u64 = 10_000_000;
/// Seconds between 1601-01-01 (the `FILETIME` epoch) and 1970-01-01
const EPOCH_DIFFERENCE: i64 = 11_644_473_600;

/**
 An open `FindFirstFileW` search.

 `FindFirstFileW` both opens the search and returns its first result, so the first
 advance hands out the buffered record instead of calling `FindNextFileW`.
 `first_pending` is consumed exactly once. The handle is released by `FindClose` in `Drop`.
*/
pub(crate) struct RawDir {
    handle: HANDLE,
    data: WIN32_FIND_DATAW,
    first_pending: bool,
}

// SAFETY: a find handle can be used from any thread; `&mut self` on every access
// keeps it to one thread at a time.
unsafe impl Send for RawDir {}

impl core::fmt::Debug for RawDir {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RawDir")
            .field("handle", &self.handle)
            .field("first_pending", &self.first_pending)
            .finish_non_exhaustive()
    }
}

impl RawDir {
    pub(crate) fn open(handle: &PathHandle) -> io::Result<Self> {
        let NativePath::Wide(wide) = &handle.native;
        let pattern = find_pattern(wide);
        // SAFETY: WIN32_FIND_DATAW is plain old data, all zeroes is a valid value
        let mut data: WIN32_FIND_DATAW = unsafe { mem::zeroed() };
        // SAFETY: `pattern` is NUL-terminated and `data` is a valid out pointer
        let find = unsafe { FindFirstFileW(pattern.as_ptr(), &mut data) };
        if find == INVALID_HANDLE_VALUE {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            handle: find,
            data,
            first_pending: true,
        })
    }

    #[inline]
    pub(crate) fn advance_raw(&mut self) -> io::Result<Option<RawEntry<'_>>> {
        if self.first_pending {
            self.first_pending = false;
        } else {
            // SAFETY: the handle is open and `data` is a valid out pointer
            if unsafe { FindNextFileW(self.handle, &mut self.data) } == 0 {
                // SAFETY: always safe
                let code = unsafe { GetLastError() };
                if code == ERROR_NO_MORE_FILES {
                    return Ok(None);
                }
                #[allow(clippy::cast_possible_wrap)]
                let code = code as i32;
                return Err(io::Error::from_raw_os_error(code));
            }
        }
        Ok(Some(RawEntry { data: &self.data }))
    }
}

impl Drop for RawDir {
    #[inline]
    fn drop(&mut self) {
        // SAFETY: the handle came from FindFirstFileW and is never used again
        unsafe { FindClose(self.handle) };
    }
}

/// Appends the wildcard `FindFirstFileW` needs, adding a separator only when missing.
fn find_pattern(wide: &[u16]) -> Vec<u16> {
    let path = wide.strip_suffix(&[0]).unwrap_or(wide);
    let mut pattern = Vec::with_capacity(path.len() + 5);
    pattern.extend_from_slice(path);
    if path.last().is_some_and(|&unit| !is_separator(unit)) {
        pattern.push(u16::from(b'\\'));
    }
    pattern.extend("*.*".encode_utf16());
    pattern.push(0);
    pattern
}

#[inline]
const fn is_separator(unit: u16) -> bool {
    matches!(unit, 0x5C | 0x2F | 0x3A) // '\\' '/' ':'
}

/// A borrowed view of the current find record.
pub(crate) struct RawEntry<'dir> {
    data: &'dir WIN32_FIND_DATAW,
}

impl RawEntry<'_> {
    #[inline]
    fn name(&self) -> &[u16] {
        let name = &self.data.cFileName;
        let len = name.iter().position(|&unit| unit == 0).unwrap_or(name.len());
        name.get(..len).unwrap_or_default()
    }

    #[inline]
    fn reparse_tag(&self) -> u32 {
        if self.data.dwFileAttributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
            self.data.dwReserved0
        } else {
            0
        }
    }

    #[inline]
    pub(crate) fn file_type(&self) -> FileType {
        if self.reparse_tag() == IO_REPARSE_TAG_SYMLINK {
            FileType::Symlink
        } else if self.data.dwFileAttributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
            FileType::Directory
        } else {
            FileType::RegularFile
        }
    }

    #[inline]
    pub(crate) fn is_dot(&self) -> bool {
        matches!(self.name(), [0x2E] | [0x2E, 0x2E])
    }

    /// The find record already holds everything lstat would return apart from the file id,
    /// so it becomes the entry's lstat.
    fn lstat(&self) -> Metadata {
        let data = self.data;
        let attributes = data.dwFileAttributes;
        Metadata {
            mode: attributes_to_mode(attributes, self.reparse_tag()),
            ino: 0,
            dev: 0,
            nlink: 0,
            uid: 0,
            gid: 0,
            size: (u64::from(data.nFileSizeHigh) << 32) | u64::from(data.nFileSizeLow),
            accessed: filetime_to_timestamp(&data.ftLastAccessTime),
            modified: filetime_to_timestamp(&data.ftLastWriteTime),
            changed: filetime_to_timestamp(&data.ftCreationTime),
            file_attributes: attributes,
        }
    }

    #[inline]
    pub(crate) fn into_dir_entry(self, joiner: &mut PathJoiner, _handle: &PathHandle) -> DirEntry {
        let path = joiner.join(self.name());
        DirEntry::from_parts(
            path,
            joiner.file_name_index,
            self.file_type(),
            OnceLock::new(),
            OnceLock::from(self.lstat()),
        )
    }
}

/// Builds entry paths from the scanned directory, in both display and wide form.
#[derive(Debug)]
pub(crate) struct PathJoiner {
    base: OsString,
    base_wide: Vec<u16>,
    file_name_index: usize,
}

impl PathJoiner {
    pub(crate) fn new(handle: &PathHandle) -> Self {
        let mut base = handle.as_path().as_os_str().to_owned();
        let mut base_wide: Vec<u16> = base.encode_wide().collect();
        if base_wide.last().is_some_and(|&unit| !is_separator(unit)) {
            base.push("\\");
            base_wide.push(u16::from(b'\\'));
        }
        let file_name_index = base.as_encoded_bytes().len();
        Self {
            base,
            base_wide,
            file_name_index,
        }
    }

    fn join(&mut self, name: &[u16]) -> EntryPath {
        let mut full = self.base.clone();
        full.push(OsString::from_wide(name));
        let mut wide = Vec::with_capacity(self.base_wide.len() + name.len() + 1);
        wide.extend_from_slice(&self.base_wide);
        wide.extend_from_slice(name);
        wide.push(0);
        EntryPath {
            full: PathBuf::from(full),
            wide: wide.into_boxed_slice(),
        }
    }
}

/// The full path of an entry, kept in display form and NUL-terminated wide form.
#[derive(Debug, Clone)]
pub(crate) struct EntryPath {
    full: PathBuf,
    wide: Box<[u16]>,
}

impl EntryPath {
    #[inline]
    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.full.as_os_str().as_encoded_bytes()
    }

    #[inline]
    pub(crate) fn as_path(&self) -> &Path {
        &self.full
    }

    #[inline]
    pub(crate) fn file_name(&self, file_name_index: usize) -> &OsStr {
        let name = self.as_bytes().get(file_name_index..).unwrap_or_default();
        // SAFETY: the index sits right after an ASCII separator (or at 0), which is
        // always a boundary in the encoded form
        unsafe { OsStr::from_encoded_bytes_unchecked(name) }
    }

    #[inline]
    pub(crate) fn fetch_stat(&self, follow: bool) -> io::Result<Metadata> {
        stat_wide(&self.wide, follow)
    }
}

pub(crate) fn stat_handle(handle: &PathHandle, follow: bool) -> io::Result<Metadata> {
    let NativePath::Wide(wide) = &handle.native;
    stat_wide(wide, follow)
}

/// Closes a file handle on drop.
struct OwnedHandle(HANDLE);

impl Drop for OwnedHandle {
    fn drop(&mut self) {
        // SAFETY: the handle came from CreateFileW and is never used again
        unsafe { CloseHandle(self.0) };
    }
}

/// `stat`/`lstat` for windows: open the file for attribute reads and query it by handle.
fn stat_wide(wide: &[u16], follow: bool) -> io::Result<Metadata> {
    let flags = if follow {
        FILE_FLAG_BACKUP_SEMANTICS
    } else {
        FILE_FLAG_BACKUP_SEMANTICS | FILE_FLAG_OPEN_REPARSE_POINT
    };
    // SAFETY: `wide` is NUL-terminated, the other arguments are plain values or null
    let raw = unsafe {
        CreateFileW(
            wide.as_ptr(),
            FILE_READ_ATTRIBUTES,
            FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
            ptr::null(),
            OPEN_EXISTING,
            flags,
            ptr::null_mut(),
        )
    };
    if raw == INVALID_HANDLE_VALUE {
        return Err(io::Error::last_os_error());
    }
    let file = OwnedHandle(raw);

    // SAFETY: plain old data, all zeroes is valid
    let mut info: BY_HANDLE_FILE_INFORMATION = unsafe { mem::zeroed() };
    // SAFETY: the handle is open and `info` is a valid out pointer
    if unsafe { GetFileInformationByHandle(file.0, &mut info) } == 0 {
        return Err(io::Error::last_os_error());
    }

    let mut reparse_tag = 0;
    if !follow && info.dwFileAttributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 {
        // SAFETY: plain old data, all zeroes is valid
        let mut tag_info: FILE_ATTRIBUTE_TAG_INFO = unsafe { mem::zeroed() };
        #[allow(clippy::cast_possible_truncation)]
        let size = mem::size_of::<FILE_ATTRIBUTE_TAG_INFO>() as u32;
        // SAFETY: the buffer is exactly the size of the requested information class
        let ok = unsafe {
            GetFileInformationByHandleEx(
                file.0,
                FileAttributeTagInfo,
                (&raw mut tag_info).cast::<c_void>(),
                size,
            )
        };
        if ok == 0 {
            return Err(io::Error::last_os_error());
        }
        reparse_tag = tag_info.ReparseTag;
    }

    Ok(Metadata {
        mode: attributes_to_mode(info.dwFileAttributes, reparse_tag),
        ino: (u64::from(info.nFileIndexHigh) << 32) | u64::from(info.nFileIndexLow),
        dev: u64::from(info.dwVolumeSerialNumber),
        nlink: u64::from(info.nNumberOfLinks),
        uid: 0,
        gid: 0,
        size: (u64::from(info.nFileSizeHigh) << 32) | u64::from(info.nFileSizeLow),
        accessed: filetime_to_timestamp(&info.ftLastAccessTime),
        modified: filetime_to_timestamp(&info.ftLastWriteTime),
        changed: filetime_to_timestamp(&info.ftCreationTime),
        file_attributes: info.dwFileAttributes,
    })
}

/// Synthesises a POSIX mode from windows attributes. Only a symlink reparse tag
/// makes an entry a link, junctions stay directories.
const fn attributes_to_mode(attributes: u32, reparse_tag: u32) -> u32 {
    let mut mode = if attributes & FILE_ATTRIBUTE_DIRECTORY != 0 {
        S_IFDIR | 0o111
    } else {
        S_IFREG
    };
    mode |= if attributes & FILE_ATTRIBUTE_READONLY != 0 {
        0o444
    } else {
        0o666
    };
    if attributes & FILE_ATTRIBUTE_REPARSE_POINT != 0 && reparse_tag == IO_REPARSE_TAG_SYMLINK {
        mode = (mode & !S_IFMT) | S_IFLNK;
    }
    mode
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn filetime_to_timestamp(filetime: &FILETIME) -> Timestamp {
    let ticks = (u64::from(filetime.dwHighDateTime) << 32) | u64::from(filetime.dwLowDateTime);
    Timestamp::new(
        (ticks / TICKS_PER_SECOND) as i64 - EPOCH_DIFFERENCE,
        ((ticks % TICKS_PER_SECOND) * 100) as u32,
    )
}
