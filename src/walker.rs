use log::debug;

use crate::constants::PATH_SEPARATOR;
use crate::error::{require_trailing_separator, Result, TransferError};
use crate::models::FileEntry;
use crate::namespace::Namespace;

/// Recursive enumerator of every file under a namespace prefix
pub struct TreeWalker<'a, N: Namespace + ?Sized> {
    namespace: &'a N,
}

impl<'a, N: Namespace + ?Sized> TreeWalker<'a, N> {
    /// Create a new tree walker
    pub fn new(namespace: &'a N) -> Self {
        TreeWalker { namespace }
    }

    /// Walk `prefix` and return every non-directory entry below it.
    ///
    /// Each entry is tagged with the prefix of its immediate parent. A listing
    /// failure at any depth aborts the whole walk.
    pub fn walk(&self, prefix: &str) -> Result<Vec<FileEntry>> {
        require_trailing_separator("source", prefix)?;

        let mut results = Vec::new();
        self.walk_directory_recursive(prefix, &mut results)?;

        debug!("Found {} files under {}", results.len(), prefix);
        Ok(results)
    }

    fn walk_directory_recursive(&self, prefix: &str, results: &mut Vec<FileEntry>) -> Result<()> {
        let entries = self.namespace
            .list_directory(prefix)
            .map_err(|e| TransferError::remote_read(prefix, e))?;

        for entry in entries {
            if entry.is_directory {
                let child = format!("{}{}{}", prefix, entry.name, PATH_SEPARATOR);
                self.walk_directory_recursive(&child, results)?;
            } else {
                results.push(FileEntry::from_listing(prefix, entry));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::local::LocalNamespace;
    use crate::test_utils::{create_test_file_structure, FlakyNamespace};

    #[test]
    fn test_walk_finds_every_file_with_parent_prefix() {
        let temp_dir = create_test_file_structure().unwrap();
        let ns = LocalNamespace::new(temp_dir.path());

        let mut found: Vec<(String, String)> = TreeWalker::new(&ns)
            .walk("/")
            .unwrap()
            .into_iter()
            .map(|e| (e.directory_prefix, e.name))
            .collect();
        found.sort();

        assert_eq!(found, vec![
            ("/".to_string(), "file1.txt".to_string()),
            ("/".to_string(), "file2.log".to_string()),
            ("/dir1/".to_string(), "file3.txt".to_string()),
            ("/dir1/subdir1/".to_string(), "file4.txt".to_string()),
            ("/dir2/".to_string(), "file5.log".to_string()),
        ]);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_descends_into_symlinked_directory() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("real")).unwrap();
        std::fs::write(temp_dir.path().join("real/f"), b"payload").unwrap();
        std::os::unix::fs::symlink(temp_dir.path().join("real"), temp_dir.path().join("link")).unwrap();
        let ns = LocalNamespace::new(temp_dir.path());

        let found: Vec<(String, String)> = TreeWalker::new(&ns)
            .walk("/")
            .unwrap()
            .into_iter()
            .map(|e| (e.directory_prefix, e.name))
            .collect();

        assert_eq!(found, vec![
            ("/link/".to_string(), "f".to_string()),
            ("/real/".to_string(), "f".to_string()),
        ]);
    }

    #[test]
    fn test_walk_empty_tree() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("a/b/c")).unwrap();
        let ns = LocalNamespace::new(temp_dir.path());

        assert!(TreeWalker::new(&ns).walk("/").unwrap().is_empty());
    }

    #[test]
    fn test_walk_requires_trailing_separator() {
        let temp_dir = create_test_file_structure().unwrap();
        let ns = LocalNamespace::new(temp_dir.path());

        let err = TreeWalker::new(&ns).walk("/dir1").unwrap_err();
        assert!(matches!(err, TransferError::Precondition { which: "source", .. }));
    }

    #[test]
    fn test_nested_listing_failure_aborts_walk() {
        let temp_dir = create_test_file_structure().unwrap();
        let ns = FlakyNamespace::new(LocalNamespace::new(temp_dir.path()))
            .fail_list("/dir1/subdir1/");

        let err = TreeWalker::new(&ns).walk("/").unwrap_err();
        match err {
            TransferError::RemoteRead { path, .. } => assert_eq!(path, "/dir1/subdir1/"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
