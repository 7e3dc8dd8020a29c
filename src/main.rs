#![allow(clippy::single_call_fn)]
#![allow(clippy::absolute_paths)]
#![allow(clippy::print_stderr)]
#![allow(clippy::implicit_return)]
#![allow(clippy::missing_docs_in_private_items)]
#![allow(clippy::std_instead_of_core)]
#![allow(clippy::std_instead_of_alloc)]
#![allow(clippy::missing_inline_in_public_items)]
#![allow(clippy::exhaustive_structs)]
#![allow(clippy::pub_use)]
#![allow(clippy::question_mark_used)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::min_ident_chars)]
#![allow(clippy::use_debug)]

use clap::{ArgAction, CommandFactory, Parser, ValueHint, value_parser};
use clap_complete::aot::{Shell, generate};
use scandir::walk::Walk;
use scandir::{DirEntry, FollowSymlinks, ScandirError};
use std::ffi::OsString;
use std::io::stdout;
mod printer;
use printer::{PrintOptions, write_entries};

#[cfg(all(
    feature = "mimalloc",
    any(target_os = "linux", target_os = "macos", target_os = "android")
))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(version = env!("CARGO_PKG_VERSION"), about = "List a directory, or walk a tree")]
#[allow(clippy::struct_excessive_bools)]
///generate our arguments and parse them.
pub struct Args {
    #[arg(
        value_name = "PATH",
        help = "Directory to list (defaults to the current directory)",
        value_hint = ValueHint::DirPath,
        required = false,
        index = 1
    )]
    directory: Option<OsString>,

    #[arg(
        short = 'l',
        long = "long",
        help = "Show type, size and modification time"
    )]
    long: bool,

    #[arg(
        short = 'L',
        long = "follow",
        help = "Follow symlinks when classifying, stat'ing and walking"
    )]
    follow: bool,

    #[arg(short = 'r', long = "recursive", help = "Walk the whole tree")]
    recursive: bool,

    #[arg(
        long = "bottom-up",
        help = "When walking, list a directory's children before the directory itself"
    )]
    bottom_up: bool,

    #[arg(
        short = 'd',
        long = "depth",
        help = "Walk at most this many levels below PATH (implies -r)"
    )]
    depth: Option<usize>,

    #[arg(short = 's', long = "sort", help = "Sort output by path")]
    sort: bool,

    #[arg(
        long = "generate",
        action = ArgAction::Set,
        value_parser = value_parser!(Shell),
        help = "Generate shell completions"
    )]
    generate: Option<Shell>,
}

type EntryResult = Result<DirEntry, ScandirError>;

fn main() -> Result<(), ScandirError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();

    if let Some(generator) = args.generate {
        let mut cmd = Args::command();
        let cmd_clone = cmd.clone();
        generate(
            generator,
            &mut cmd,
            cmd_clone.get_name().to_owned(),
            &mut stdout(),
        );
        return Ok(());
    }

    let options = PrintOptions {
        long: args.long,
        follow_symlinks: if args.follow {
            FollowSymlinks::Yes
        } else {
            FollowSymlinks::No
        },
    };

    let entries: Box<dyn Iterator<Item = EntryResult>> = if args.recursive || args.depth.is_some() {
        let root = args.directory.unwrap_or_else(|| ".".into());
        let walk = Walk::init(root)
            .topdown(!args.bottom_up)
            .follow_links(args.follow)
            .max_depth(args.depth)
            .build();
        Box::new(walk.flat_map(|step| -> Vec<EntryResult> {
            match step {
                Ok(step) => step.dirs.into_iter().chain(step.files).map(Ok).collect(),
                Err(err) => vec![Err(err)],
            }
        }))
    } else {
        // the listing itself failing to open is fatal, later errors are only logged
        let scan = match args.directory {
            Some(directory) => scandir::scandir(directory)?,
            None => scandir::scandir_cwd()?,
        };
        Box::new(scan)
    };

    if args.sort {
        let mut collected: Vec<DirEntry> = entries
            .filter_map(|entry| entry.map_err(|err| log::warn!("{err}")).ok())
            .collect();
        collected.sort_unstable_by(|a, b| a.path().cmp(b.path()));
        write_entries(collected.into_iter().map(Ok), options)
    } else {
        write_entries(entries, options)
    }
}
