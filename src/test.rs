#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use crate::walk::Walk;
    use crate::{
        DirEntry, FileType, FollowSymlinks, ScanState, ScandirError, ScandirIter, list_dir_stat,
        listdir, scandir, scandir_bytes, scandir_cwd, spawn_scandir,
    };
    use std::collections::BTreeSet;
    use std::ffi::OsString;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn drain(path: &Path) -> Vec<DirEntry> {
        scandir(path).unwrap().map(Result::unwrap).collect()
    }

    fn names_of(entries: &[DirEntry]) -> BTreeSet<OsString> {
        entries.iter().map(|entry| entry.name().to_owned()).collect()
    }

    fn find<'a>(entries: &'a [DirEntry], name: &str) -> &'a DirEntry {
        entries
            .iter()
            .find(|entry| entry.name() == name)
            .unwrap_or_else(|| panic!("{name} not listed"))
    }

    /// `a.txt` (10 bytes), `sub/` and, on unix, `broken -> missing`
    fn scenario_dir() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.txt"), b"0123456789").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        #[cfg(unix)]
        std::os::unix::fs::symlink(dir.path().join("missing"), dir.path().join("broken")).unwrap();
        dir
    }

    #[test]
    fn yields_every_child_and_no_dot_entries() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..40 {
            if i % 4 == 0 {
                fs::create_dir(dir.path().join(format!("dir{i}"))).unwrap();
            } else {
                fs::write(dir.path().join(format!("file{i}")), b"").unwrap();
            }
        }
        let entries = drain(dir.path());
        assert_eq!(entries.len(), 40);
        assert!(entries.iter().all(|entry| entry.name() != "." && entry.name() != ".."));
        assert_eq!(names_of(&entries).len(), 40);
    }

    #[test]
    fn empty_directory_is_exhausted_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut scan = scandir(dir.path()).unwrap();
        assert_eq!(scan.state(), ScanState::Active);
        assert!(scan.next().is_none());
        assert_eq!(scan.state(), ScanState::Exhausted);
        assert!(scan.is_closed());
    }

    #[test]
    fn missing_directory_fails_at_call_time() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = scandir(&missing).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.path(), missing);
        assert!(err.raw_os_error().is_some());
    }

    #[cfg(unix)]
    #[test]
    fn file_is_not_a_directory_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"").unwrap();
        let err = scandir(&file).unwrap_err();
        assert!(matches!(err, ScandirError::Io { .. }));
        assert_eq!(err.path(), file);
    }

    #[test]
    fn nul_in_path_is_rejected_before_any_call() {
        assert!(matches!(
            scandir("bad\0path").unwrap_err(),
            ScandirError::InvalidPath { .. }
        ));
        assert!(matches!(
            scandir_bytes(b"bad\0path").unwrap_err(),
            ScandirError::InvalidPath { .. }
        ));
    }

    #[test]
    fn exhaustion_is_idempotent() {
        let dir = scenario_dir();
        let mut scan = scandir(dir.path()).unwrap();
        let count = scan.by_ref().count();
        assert!(count >= 2);
        for _ in 0..3 {
            assert!(scan.next().is_none());
            assert_eq!(scan.state(), ScanState::Exhausted);
        }
        #[cfg(unix)]
        assert!(scan.as_raw_fd().is_none());
    }

    #[test]
    fn close_is_idempotent_and_stops_iteration() {
        let dir = scenario_dir();
        let mut scan = scandir(dir.path()).unwrap();
        assert!(scan.next().is_some());
        scan.close();
        scan.close();
        assert_eq!(scan.state(), ScanState::Closed);
        assert!(scan.next().is_none());
        scan.close();
        assert!(scan.next().is_none());
    }

    #[test]
    fn classifies_from_listing_type() {
        let dir = scenario_dir();
        let entries = drain(dir.path());

        let file = find(&entries, "a.txt");
        assert!(file.is_file().unwrap());
        assert!(!file.is_dir().unwrap());
        assert!(!file.is_symlink().unwrap());

        let sub = find(&entries, "sub");
        assert!(sub.is_dir().unwrap());
        assert!(!sub.is_file().unwrap());
        assert_eq!(sub.path(), dir.path().join("sub"));
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_scenario() {
        let dir = scenario_dir();
        let entries = drain(dir.path());
        assert_eq!(entries.len(), 3);
        assert_eq!(
            names_of(&entries),
            BTreeSet::from(["a.txt", "broken", "sub"].map(OsString::from))
        );

        let broken = find(&entries, "broken");
        assert!(broken.is_symlink().unwrap());
        assert!(!broken.is_file_with(FollowSymlinks::Yes).unwrap());
        assert!(!broken.is_dir_with(FollowSymlinks::No).unwrap());
        assert!(!broken.is_dir().unwrap());
        assert!(broken.stat().unwrap_err().is_not_found());
        assert!(broken.stat_with(FollowSymlinks::No).unwrap().is_symlink());
    }

    #[cfg(unix)]
    #[test]
    fn symlink_to_file_follows_only_when_asked() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

        let entries = drain(dir.path());
        let link = find(&entries, "link");
        assert!(link.is_file_with(FollowSymlinks::Yes).unwrap());
        assert!(!link.is_dir_with(FollowSymlinks::Yes).unwrap());
        assert!(!link.is_file_with(FollowSymlinks::No).unwrap());
        assert!(!link.is_dir_with(FollowSymlinks::No).unwrap());

        let followed = link.stat().unwrap();
        let own = link.stat_with(FollowSymlinks::No).unwrap();
        assert!(followed.is_file());
        assert!(own.is_symlink());
        assert_ne!(followed, own);
    }

    #[cfg(unix)]
    #[test]
    fn vanished_link_target_reads_as_neither() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("target");
        fs::write(&target, b"x").unwrap();
        std::os::unix::fs::symlink(&target, dir.path().join("link")).unwrap();

        let entries = drain(dir.path());
        fs::remove_file(&target).unwrap();

        let link = find(&entries, "link");
        assert!(!link.is_file_with(FollowSymlinks::Yes).unwrap());
        assert!(!link.is_dir_with(FollowSymlinks::Yes).unwrap());
        assert!(link.is_symlink().unwrap());
    }

    #[test]
    fn unknown_listing_type_falls_back_to_stat() {
        let dir = scenario_dir();
        let mut entries = drain(dir.path());
        for entry in &mut entries {
            entry.file_type = FileType::Unknown;
        }

        assert!(find(&entries, "sub").is_dir().unwrap());
        assert!(find(&entries, "a.txt").is_file().unwrap());
        assert!(!find(&entries, "a.txt").is_symlink().unwrap());
        #[cfg(unix)]
        {
            let broken = find(&entries, "broken");
            assert!(broken.is_symlink().unwrap());
            assert_eq!(broken.resolved_file_type().unwrap(), FileType::Symlink);
        }
    }

    // windows listings carry a full lstat, so there is nothing left to go missing
    #[cfg(unix)]
    #[test]
    fn unknown_entry_that_vanished_is_neither() {
        let dir = scenario_dir();
        let mut entries = drain(dir.path());
        for entry in &mut entries {
            entry.file_type = FileType::Unknown;
        }
        fs::remove_file(dir.path().join("a.txt")).unwrap();

        let gone = find(&entries, "a.txt");
        assert!(!gone.is_file().unwrap());
        assert!(!gone.is_dir().unwrap());
        assert!(!gone.is_symlink().unwrap());
        assert!(gone.stat().unwrap_err().is_not_found());
        assert_eq!(gone.resolved_file_type().unwrap(), FileType::Unknown);
    }

    #[test]
    fn unknown_type_stat_classifies_with_its_lstat() {
        let dir = scenario_dir();
        let mut entries = drain(dir.path());
        for entry in &mut entries {
            entry.file_type = FileType::Unknown;
        }

        let file = find(&entries, "a.txt");
        let followed = file.stat().unwrap();
        assert!(std::ptr::eq(followed, file.lstat.get().unwrap()));
        // a regular file never needs the follow cache
        assert!(file.stat.get().is_none());
        assert_eq!(followed.size(), 10);
    }

    #[cfg(unix)]
    #[test]
    fn unknown_type_vanished_stat_fails_without_caching() {
        let dir = scenario_dir();
        let mut entries = drain(dir.path());
        for entry in &mut entries {
            entry.file_type = FileType::Unknown;
        }
        fs::remove_file(dir.path().join("a.txt")).unwrap();

        let gone = find(&entries, "a.txt");
        assert!(gone.stat().unwrap_err().is_not_found());
        assert!(gone.lstat.get().is_none());
        assert!(gone.stat.get().is_none());

        // once the file is back the entry reports it, nothing stale was kept
        fs::write(dir.path().join("a.txt"), b"abc").unwrap();
        assert_eq!(gone.stat().unwrap().size(), 3);
    }

    #[test]
    fn stat_is_filled_once() {
        let dir = scenario_dir();
        let entries = drain(dir.path());
        let file = find(&entries, "a.txt");

        let first = file.stat().unwrap();
        assert_eq!(first.size(), 10);
        // rewriting the file does not change what the entry reports
        fs::write(dir.path().join("a.txt"), b"longer than ten bytes").unwrap();
        let second = file.stat().unwrap();
        assert!(std::ptr::eq(first, second));
        assert_eq!(second.size(), 10);
        // not a symlink, so both stat flavours are the same record
        assert!(std::ptr::eq(first, file.stat_with(FollowSymlinks::No).unwrap()));
    }

    #[test]
    fn concurrent_stat_converges_on_one_value() {
        let dir = scenario_dir();
        let entries = drain(dir.path());
        let file = Arc::new(find(&entries, "a.txt").clone());

        let addresses: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    let file = Arc::clone(&file);
                    scope.spawn(move || core::ptr::from_ref(file.stat().unwrap()) as usize)
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });
        assert!(addresses.windows(2).all(|pair| pair[0] == pair[1]));
    }

    #[test]
    fn inode_matches_stat() {
        let dir = scenario_dir();
        let entries = drain(dir.path());
        let file = find(&entries, "a.txt");
        let expected = crate::stat(file.path(), FollowSymlinks::No).unwrap().ino();
        assert_eq!(file.inode().unwrap(), expected);
        assert_eq!(file.inode().unwrap(), expected);
    }

    #[test]
    fn entries_outlive_their_scan() {
        let dir = scenario_dir();
        let entry = {
            let mut scan = scandir(dir.path()).unwrap();
            let entry = scan.find(|entry| entry.as_ref().unwrap().name() == "sub");
            drop(scan);
            entry.unwrap().unwrap()
        };
        assert!(entry.is_dir().unwrap());
        assert_eq!(entry.stat().unwrap().file_type(), FileType::Directory);
    }

    #[test]
    fn paths_join_without_doubling_separators() {
        let dir = scenario_dir();
        let mut with_slash = dir.path().as_os_str().to_owned();
        with_slash.push(std::path::MAIN_SEPARATOR_STR);
        let entries = drain(Path::new(&with_slash));
        let file = find(&entries, "a.txt");
        let mut expected = with_slash.clone();
        expected.push("a.txt");
        assert_eq!(file.path().as_os_str(), expected.as_os_str());
        assert_eq!(file.name(), "a.txt");
    }

    #[test]
    fn default_scan_uses_current_directory() {
        // cargo runs tests from the package root
        let entries: Vec<_> = scandir_cwd().unwrap().map(Result::unwrap).collect();
        let manifest = find(&entries, "Cargo.toml");
        assert_eq!(manifest.path(), Path::new(".").join("Cargo.toml"));
        assert!(manifest.is_file().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn descriptor_scan_yields_bare_names() {
        use std::os::fd::AsFd;

        let dir = scenario_dir();
        let handle = fs::File::open(dir.path()).unwrap();
        let scan = crate::scandir_fd(handle.as_fd()).unwrap();
        // the scan owns its own duplicate
        drop(handle);

        let entries: Vec<_> = scan.map(Result::unwrap).collect();
        let file = find(&entries, "a.txt");
        assert_eq!(file.path(), Path::new("a.txt"));
        assert_eq!(file.stat().unwrap().size(), 10);
        assert!(find(&entries, "sub").is_dir().unwrap());
        assert!(find(&entries, "broken").is_symlink().unwrap());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dropping_a_scan_releases_its_descriptor() {
        let dir = scenario_dir();
        let mut scan = scandir(dir.path()).unwrap();
        assert!(scan.next().is_some());
        let fd = scan.as_raw_fd().unwrap();
        let fd_link = PathBuf::from(format!("/proc/self/fd/{fd}"));
        assert_eq!(fs::read_link(&fd_link).unwrap(), dir.path());

        drop(scan);
        // the number may have been reused by another test, but not for our directory
        assert_ne!(fs::read_link(&fd_link).ok().as_deref(), Some(dir.path()));
    }

    #[test]
    fn repeated_open_and_abandon_does_not_leak() {
        let dir = scenario_dir();
        for _ in 0..5_000 {
            let mut scan = scandir(dir.path()).unwrap();
            assert!(scan.next().is_some());
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn read_error_closes_the_scan_then_reports() {
        use std::os::fd::AsRawFd;

        let dir = scenario_dir();
        let not_a_dir = fs::File::open(dir.path().join("a.txt")).unwrap();
        let mut scan = scandir(dir.path()).unwrap();
        let fd = scan.as_raw_fd().unwrap();
        // swap a regular file in under the stream so the next read fails with ENOTDIR
        // SAFETY: both descriptors are open and `fd` stays owned by the stream
        assert_ne!(unsafe { libc::dup2(not_a_dir.as_raw_fd(), fd) }, -1);

        let err = scan.next().unwrap().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTDIR));
        assert_eq!(err.path(), dir.path());
        assert_eq!(scan.state(), ScanState::Closed);
        assert!(scan.next().is_none());
    }

    #[test]
    fn names_and_typed_views() {
        let dir = scenario_dir();
        let mut names = listdir(dir.path()).unwrap();
        names.sort();
        #[cfg(unix)]
        assert_eq!(names, ["a.txt", "broken", "sub"]);
        #[cfg(windows)]
        assert_eq!(names, ["a.txt", "sub"]);

        let typed: Vec<(OsString, FileType)> =
            scandir(dir.path()).unwrap().typed().map(Result::unwrap).collect();
        for (name, file_type) in typed {
            let expected = match name.to_str().unwrap() {
                "a.txt" => FileType::RegularFile,
                "sub" => FileType::Directory,
                "broken" => FileType::Symlink,
                other => panic!("unexpected entry {other}"),
            };
            assert_eq!(file_type, expected);
        }
    }

    #[test]
    fn list_dir_stat_reports_lstat() {
        let dir = scenario_dir();
        filetime::set_file_mtime(
            dir.path().join("a.txt"),
            filetime::FileTime::from_unix_time(1_234_567_890, 0),
        )
        .unwrap();

        let listing = list_dir_stat(dir.path()).unwrap();
        let (_, metadata) = listing.iter().find(|(name, _)| name == "a.txt").unwrap();
        assert!(metadata.is_file());
        assert_eq!(metadata.size(), 10);
        assert_eq!(metadata.modified().secs(), 1_234_567_890);
        #[cfg(unix)]
        {
            let (_, link) = listing.iter().find(|(name, _)| name == "broken").unwrap();
            assert!(link.is_symlink());
        }
    }

    #[test]
    fn background_scan_delivers_everything() {
        let dir = scenario_dir();
        let received: Vec<_> = spawn_scandir(dir.path(), 1)
            .unwrap()
            .iter()
            .map(Result::unwrap)
            .collect();
        assert_eq!(names_of(&received), names_of(&drain(dir.path())));
    }

    #[test]
    fn background_scan_stops_when_receiver_dropped() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..64 {
            fs::write(dir.path().join(i.to_string()), b"").unwrap();
        }
        let receiver = spawn_scandir(dir.path(), 1).unwrap();
        assert!(receiver.recv().unwrap().is_ok());
        drop(receiver);
        // the worker notices on its next send; the directory stays scannable
        assert_eq!(drain(dir.path()).len(), 64);
    }

    #[test]
    fn background_scan_reports_open_errors_immediately() {
        let dir = tempfile::tempdir().unwrap();
        assert!(spawn_scandir(dir.path().join("missing"), 4).unwrap_err().is_not_found());
    }

    fn build_tree() -> TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir_all(root.path().join("a/aa")).unwrap();
        fs::create_dir_all(root.path().join("b")).unwrap();
        fs::write(root.path().join("top.txt"), b"").unwrap();
        fs::write(root.path().join("a/one.txt"), b"").unwrap();
        fs::write(root.path().join("a/aa/deep.txt"), b"").unwrap();
        fs::write(root.path().join("b/two.txt"), b"").unwrap();
        root
    }

    fn relative_dirs(root: &Path, walk: Walk) -> Vec<PathBuf> {
        walk.map(|step| step.unwrap().dir.strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    fn position(dirs: &[PathBuf], dir: &str) -> usize {
        dirs.iter().position(|seen| seen == Path::new(dir)).unwrap()
    }

    #[test]
    fn walk_topdown_visits_parents_first() {
        let root = build_tree();
        let dirs = relative_dirs(root.path(), Walk::init(root.path()).build());
        assert_eq!(dirs.len(), 4);
        assert_eq!(dirs[0], Path::new(""));
        assert!(position(&dirs, "a") < position(&dirs, "a/aa"));
    }

    #[test]
    fn walk_bottom_up_visits_children_first() {
        let root = build_tree();
        let dirs = relative_dirs(root.path(), Walk::init(root.path()).topdown(false).build());
        assert_eq!(dirs.len(), 4);
        assert_eq!(dirs[3], Path::new(""));
        assert!(position(&dirs, "a/aa") < position(&dirs, "a"));
    }

    #[test]
    fn walk_partitions_entries() {
        let root = build_tree();
        let step = Walk::init(root.path()).build().next().unwrap().unwrap();
        assert_eq!(step.depth, 0);
        let dirs: BTreeSet<_> = step.dir_names().collect();
        let files: Vec<_> = step.file_names().collect();
        assert_eq!(dirs, BTreeSet::from(["a", "b"].map(std::ffi::OsStr::new)));
        assert_eq!(files, ["top.txt"]);
    }

    #[test]
    fn walk_respects_max_depth_and_filter() {
        let root = build_tree();
        let shallow = relative_dirs(root.path(), Walk::init(root.path()).max_depth(Some(1)).build());
        assert_eq!(shallow.len(), 3);
        assert!(!shallow.contains(&PathBuf::from("a/aa")));

        let skip_a: fn(&DirEntry) -> bool = |entry| entry.name() != "a";
        let pruned = relative_dirs(root.path(), Walk::init(root.path()).filter(Some(skip_a)).build());
        assert_eq!(pruned.len(), 2);
    }

    #[test]
    fn walk_reports_unreadable_root_and_ends() {
        let root = tempfile::tempdir().unwrap();
        let mut walk = Walk::init(root.path().join("missing")).build();
        assert!(walk.next().unwrap().unwrap_err().is_not_found());
        assert!(walk.next().is_none());
    }

    #[test]
    fn walk_continues_past_a_vanished_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("a")).unwrap();
        fs::create_dir_all(root.path().join("b/c")).unwrap();

        let mut walk = Walk::init(root.path()).build();
        let first = walk.next().unwrap().unwrap();
        assert_eq!(first.depth, 0);
        // `a` is already queued, take it away before it is read
        fs::remove_dir(root.path().join("a")).unwrap();

        let rest: Vec<_> = walk.collect();
        let errors: Vec<_> = rest.iter().filter_map(|step| step.as_ref().err()).collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].is_not_found());
        assert_eq!(errors[0].path(), root.path().join("a").as_path());

        let visited: BTreeSet<PathBuf> = rest
            .iter()
            .filter_map(|step| step.as_ref().ok())
            .map(|step| step.dir.strip_prefix(root.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(visited, BTreeSet::from([PathBuf::from("b"), Path::new("b").join("c")]));
    }

    #[test]
    fn walk_following_links_reads_every_sibling() {
        let root = build_tree();
        fs::create_dir(root.path().join("c")).unwrap();
        let dirs = relative_dirs(root.path(), Walk::init(root.path()).follow_links(true).build());
        let dirs: BTreeSet<_> = dirs.into_iter().collect();
        assert_eq!(
            dirs,
            BTreeSet::from([
                PathBuf::new(),
                PathBuf::from("a"),
                Path::new("a").join("aa"),
                PathBuf::from("b"),
                PathBuf::from("c"),
            ])
        );
    }

    #[test]
    fn identity_comes_from_the_file_not_the_listing() {
        let root = build_tree();
        let entries = drain(root.path());
        let mut seen = BTreeSet::new();
        for entry in entries.iter().filter(|entry| entry.is_dir().unwrap()) {
            let metadata = crate::stat(entry.path(), FollowSymlinks::Yes).unwrap();
            let identity = entry.identity().unwrap();
            assert_eq!(identity, (metadata.dev(), metadata.ino()));
            assert!(seen.insert(identity), "{} shares an identity", entry.path().display());
        }
        assert_eq!(seen.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn walk_follows_links_without_looping() {
        let root = build_tree();
        std::os::unix::fs::symlink(root.path(), root.path().join("a/loop")).unwrap();
        std::os::unix::fs::symlink(root.path().join("b"), root.path().join("to_b")).unwrap();

        let plain = relative_dirs(root.path(), Walk::init(root.path()).build());
        assert_eq!(plain.len(), 4);

        let followed = relative_dirs(root.path(), Walk::init(root.path()).follow_links(true).build());
        // `to_b` and `b` are the same directory, only one of them is read
        assert_eq!(followed.len(), 4);
        assert!(!followed.iter().any(|dir| dir.ends_with("loop")));
    }

    #[test]
    fn walk_traverse_over_channel() {
        let root = build_tree();
        let steps: Vec<_> = Walk::init(root.path())
            .build()
            .traverse(2)
            .unwrap()
            .iter()
            .map(Result::unwrap)
            .collect();
        let files: usize = steps.iter().map(|step| step.files.len()).sum();
        assert_eq!(steps.len(), 4);
        assert_eq!(files, 4);
    }

    #[test]
    fn public_types_are_thread_safe() {
        const fn assert_send<T: Send>() {}
        const fn assert_send_sync<T: Send + Sync>() {}
        assert_send::<ScandirIter>();
        assert_send::<Walk>();
        assert_send_sync::<DirEntry>();
        assert_send_sync::<ScandirError>();
    }
}
