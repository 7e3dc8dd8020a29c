use crate::fs::{FollowSymlinks, Metadata};
use crate::{Result, scandir};
use std::ffi::OsString;
use std::path::Path;

/**
 Lists the names in a directory, "." and ".." excluded, in no particular order.

 # Errors
 Fails if the directory cannot be opened or a read fails part way.

 # Examples
 ```
 let dir = std::env::temp_dir().join("scandir_listdir_doc");
 let _ = std::fs::remove_dir_all(&dir);
 std::fs::create_dir_all(dir.join("child")).unwrap();
 assert_eq!(scandir::listdir(&dir).unwrap(), ["child"]);
 std::fs::remove_dir_all(&dir).unwrap();
 ```
*/
pub fn listdir<P: AsRef<Path>>(path: P) -> Result<Vec<OsString>> {
    scandir(path)?.names().collect()
}

/**
 Lists a directory together with each entry's lstat, in one pass.

 On windows the metadata comes with the listing; on unix each entry costs one lstat.

 # Errors
 Fails if the directory cannot be opened, a read fails, or an entry cannot be stat'ed.
*/
pub fn list_dir_stat<P: AsRef<Path>>(path: P) -> Result<Vec<(OsString, Metadata)>> {
    scandir(path)?
        .map(|entry| {
            let entry = entry?;
            let metadata = *entry.stat_with(FollowSymlinks::No)?;
            Ok((entry.name().to_owned(), metadata))
        })
        .collect()
}
