use scandir::{DirEntry, FileType, FollowSymlinks, ScandirError};
use std::collections::HashMap;
use std::io::{self, BufWriter, IsTerminal, Write, stdout};
use std::sync::OnceLock;

const RESET: &[u8] = b"\x1b[0m";

// Default colors if LS_COLORS is not set
const DEFAULT_SYMLINK_COLOR: &[u8] = b"\x1b[38;2;230;150;60m";
const DEFAULT_DIR_COLOR: &[u8] = b"\x1b[38;2;30;144;255m";

static SYMLINK_COLOR: OnceLock<Box<[u8]>> = OnceLock::new();
static DIR_COLOR: OnceLock<Box<[u8]>> = OnceLock::new();

/// How each entry is rendered.
#[derive(Debug, Clone, Copy)]
pub struct PrintOptions {
    pub long: bool,
    pub follow_symlinks: FollowSymlinks,
}

const fn type_char(file_type: FileType) -> char {
    match file_type {
        FileType::Directory => 'd',
        FileType::Symlink => 'l',
        FileType::RegularFile => '-',
        FileType::BlockDevice => 'b',
        FileType::CharDevice => 'c',
        FileType::Fifo => 'p',
        FileType::Socket => 's',
        FileType::Unknown => '?',
    }
}

fn entry_colour(file_type: FileType) -> Option<&'static [u8]> {
    match file_type {
        FileType::Symlink => {
            Some(&**SYMLINK_COLOR.get_or_init(|| parse_ls_colors("ln", DEFAULT_SYMLINK_COLOR)))
        }
        FileType::Directory => Some(&**DIR_COLOR.get_or_init(|| parse_ls_colors("di", DEFAULT_DIR_COLOR))),
        _ => None,
    }
}

/// Writes `"{type} {size} {mtime} "` in front of a path for `--long`.
fn write_long_prefix<W: Write>(writer: &mut W, entry: &DirEntry, options: PrintOptions) -> io::Result<()> {
    match entry.stat_with(options.follow_symlinks) {
        Ok(metadata) => {
            let modified = metadata.modified_time().map_or_else(
                || "????-??-?? ??:??".to_owned(),
                |time| time.format("%Y-%m-%d %H:%M").to_string(),
            );
            write!(
                writer,
                "{} {:>12} {modified} ",
                type_char(metadata.file_type()),
                metadata.size()
            )
        }
        Err(err) => {
            log::warn!("{err}");
            write!(writer, "{} {:>12} {:16} ", type_char(entry.file_type()), "?", "")
        }
    }
}

/**
 Prints every entry on its own line, colouring directories and symlinks when stdout
 is a terminal. Directories get a trailing slash.

 Errors in the stream are logged and skipped, so one unreadable entry does not end
 the listing.
*/
pub fn write_entries<I>(entries: I, options: PrintOptions) -> Result<(), ScandirError>
where
    I: Iterator<Item = Result<DirEntry, ScandirError>>,
{
    let std_out = stdout();
    let use_colors = std_out.is_terminal() && std::env::var_os("NO_COLOR").is_none();
    let mut writer = BufWriter::new(std_out.lock());

    let result = (|| -> io::Result<()> {
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("{err}");
                    continue;
                }
            };
            if options.long {
                write_long_prefix(&mut writer, &entry, options)?;
            }

            let is_dir = entry.is_dir_with(options.follow_symlinks).unwrap_or(false);
            let colour = use_colors.then(|| entry_colour(entry.file_type())).flatten();
            if let Some(colour) = colour {
                writer.write_all(colour)?;
            }
            writer.write_all(entry.to_string_lossy().as_bytes())?;
            if is_dir {
                writer.write_all(b"/")?;
            }
            if colour.is_some() {
                writer.write_all(RESET)?;
            }
            writer.write_all(b"\n")?;
        }
        writer.flush()
    })();

    match result {
        // piping into `head` and friends is not an error
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(source) => Err(ScandirError::Io {
            path: "<stdout>".into(),
            source,
        }),
        Ok(()) => Ok(()),
    }
}

/// parse the `LS_COLORS` environment variable and get color for a specific key
fn parse_ls_colors(key: &str, default_color: &[u8]) -> Box<[u8]> {
    if let Ok(ls_colors) = std::env::var("LS_COLORS") {
        let color_map: HashMap<&str, &str> = ls_colors
            .split(':')
            .filter_map(|entry| entry.split_once('='))
            .collect();

        if let Some(color_code) = color_map.get(key) {
            return ls_color_to_ansi_rgb(color_code)
                .into_bytes()
                .into_boxed_slice();
        }
    }

    default_color.to_vec().into_boxed_slice()
}

/// convert the `LS_COLORS` format (e.g., "01;34") to an RGB ANSI escape sequence
fn ls_color_to_ansi_rgb(ls_color: &str) -> String {
    let code = ls_color
        .split(';')
        .filter_map(|part| part.parse::<u8>().ok())
        .find(|&code| matches!(code, 30..=37 | 90..=97));

    let (red, green, blue) = match code {
        Some(30) => (0, 0, 0),
        Some(31) => (255, 0, 0),
        Some(32) => (0, 255, 0),
        Some(33) => (255, 255, 0),
        Some(34) => (30, 144, 255),
        Some(35) => (255, 0, 255),
        Some(36) => (0, 255, 255),
        Some(90) => (128, 128, 128),
        Some(91) => (255, 100, 100),
        Some(92) => (100, 255, 100),
        Some(93) => (255, 255, 100),
        Some(94) => (100, 100, 255),
        Some(95) => (255, 100, 255),
        Some(96) => (100, 255, 255),
        _ => (255, 255, 255),
    };

    format!("\x1b[38;2;{red};{green};{blue}m")
}
