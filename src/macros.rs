/**
 A helper macro to safely access dirent(64 on linux-gnu)'s
  fields of a `libc::dirent`/`libc::dirent64` aka 'dirent-type' struct.

  # Safety
  - The caller must ensure that the pointer is valid and points to a 'dirent-type' struct.
  - The field name must be one of the arms below.

  # Field Aliases
  - On BSD systems (FreeBSD, OpenBSD, etc ), `d_ino` is aliased to `d_fileno`
  - Without a `d_type` field (detected by the build script) the type is always `DT_UNKNOWN`
*/
macro_rules! access_dirent {
    ($entry_ptr:expr, d_name) => {{
        //see reference https://github.com/rust-lang/rust/blob/8712e4567551a2714efa66dac204ec7137bc5605/library/std/src/sys/fs/unix.rs#L740
        (&raw const (*$entry_ptr).d_name).cast::<core::ffi::c_char>()
    }};

    ($entry_ptr:expr, d_type) => {{
        #[cfg(not(has_d_type))]
        {
            libc::DT_UNKNOWN
        }
        #[cfg(has_d_type)]
        {
            (*$entry_ptr).d_type
        }
    }};

    ($entry_ptr:expr, d_ino) => {{
        #[cfg(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        ))]
        {
            (*$entry_ptr).d_fileno as u64
        }

        #[cfg(not(any(
            target_os = "freebsd",
            target_os = "openbsd",
            target_os = "netbsd",
            target_os = "dragonfly"
        )))]
        {
            #[allow(clippy::useless_conversion)]
            let ino = u64::from((*$entry_ptr).d_ino);
            ino
        }
    }};
}

///A macro to safely access stat entries in a filesystem independent way
macro_rules! access_stat {
    ($stat_struct:expr, st_atimensec) => {{
        #[cfg(target_os = "netbsd")]
        {
            $stat_struct.st_atimensec as _
        }

        #[cfg(not(target_os = "netbsd"))]
        {
            $stat_struct.st_atime_nsec as _
        }
    }};

    ($stat_struct:expr, st_mtimensec) => {{
        #[cfg(target_os = "netbsd")]
        {
            $stat_struct.st_mtimensec as _
        } //why did they do such a specific change

        #[cfg(not(target_os = "netbsd"))]
        {
            $stat_struct.st_mtime_nsec as _
        }
    }};

    ($stat_struct:expr, st_ctimensec) => {{
        #[cfg(target_os = "netbsd")]
        {
            $stat_struct.st_ctimensec as _
        }

        #[cfg(not(target_os = "netbsd"))]
        {
            $stat_struct.st_ctime_nsec as _
        }
    }};

    // Fallback for other fields
    ($stat_struct:expr, $field:ident) => {{ $stat_struct.$field as _ }};
}

/// Macro for safely calling stat-like functions and handling the result
macro_rules! stat_syscall {
    // For fstatat with flags
    ($syscall:ident, $fd:expr, $path:expr, $flags:expr) => {{
        let mut stat_buf = core::mem::MaybeUninit::<libc::stat>::uninit();
        // SAFETY:
        // - The path is guaranteed to be null-terminated (CStr)
        let res = unsafe { $syscall($fd, $path, stat_buf.as_mut_ptr(), $flags) };

        if res == 0 {
            // SAFETY: If the return code is 0, we know the stat structure has been properly initialized
            Ok(unsafe { stat_buf.assume_init() })
        } else {
            Err(std::io::Error::last_os_error())
        }
    }};

    // For stat/lstat with a path pointer, or fstat with a descriptor
    ($syscall:ident, $target:expr) => {{
        let mut stat_buf = core::mem::MaybeUninit::<libc::stat>::uninit();
        // SAFETY: the target is either a NUL-terminated CStr pointer or an open descriptor
        let res = unsafe { $syscall($target, stat_buf.as_mut_ptr()) };

        if res == 0 {
            // SAFETY: If the return code is 0, we know it's been initialised properly
            Ok(unsafe { stat_buf.assume_init() })
        } else {
            Err(std::io::Error::last_os_error())
        }
    }};
}
