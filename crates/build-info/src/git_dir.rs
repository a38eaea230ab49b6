//! Locating the repository's `.git` directory from a crate directory.
//! Shared with `build.rs` through a `#[path]` module.

use std::fs;
use std::path::{Path, PathBuf};

/// Walk up from `start` until a directory containing `.git/HEAD` is found.
pub fn find_git_dir(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(".git"))
        .find(|git| git.join("HEAD").is_file())
}

/// Loose ref file named by `HEAD`, if HEAD is symbolic and the ref is unpacked.
pub fn head_ref_path(git_dir: &Path) -> Option<PathBuf> {
    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let reference = head.strip_prefix("ref: ")?.trim();
    let path = git_dir.join(reference);
    path.is_file().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn finds_git_dir_above_a_nested_crate() {
        let root = tempdir().unwrap();
        let git = root.path().join(".git");
        fs::create_dir_all(git.join("refs/heads")).unwrap();
        fs::write(git.join("HEAD"), "ref: refs/heads/main\n").unwrap();
        fs::write(git.join("refs/heads/main"), "0123abcd\n").unwrap();

        let crate_dir = root.path().join("crates").join("build-info");
        fs::create_dir_all(&crate_dir).unwrap();

        let found = find_git_dir(&crate_dir).expect("git dir");
        assert_eq!(found, git);
        assert_eq!(head_ref_path(&found), Some(git.join("refs/heads/main")));
    }

    #[test]
    fn detached_or_packed_heads_have_no_ref_file() {
        let root = tempdir().unwrap();
        let git = root.path().join(".git");
        fs::create_dir_all(&git).unwrap();

        fs::write(git.join("HEAD"), "0123abcd\n").unwrap();
        assert_eq!(head_ref_path(&git), None);

        fs::write(git.join("HEAD"), "ref: refs/heads/packed\n").unwrap();
        assert_eq!(head_ref_path(&git), None);
    }

    #[test]
    fn no_repository_means_no_git_dir() {
        let root = tempdir().unwrap();
        let nested = root.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        let found = find_git_dir(&nested);
        assert!(found.map_or(true, |git| !git.starts_with(root.path())));
    }
}
