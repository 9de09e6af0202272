use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{trace, warn};

use crate::error::{LoaderError, LoaderResult};
use crate::normalize::absolutize;

/// Lists loadable plugin candidates in a directory.
///
/// A candidate is either a file with the plugin extension (or with no
/// extension at all) or a directory holding an entry point
/// `<entry_point>.<extension>`.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    extension: String,
    entry_point: String,
}

impl DirectoryScanner {
    pub fn new(extension: impl Into<String>, entry_point: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            entry_point: entry_point.into(),
        }
    }

    /// Lists the candidates under `target`, resolved against `basepath`.
    ///
    /// Results are absolute and sorted. A missing directory is logged and
    /// yields an empty list; any other read failure is an error.
    pub async fn scan(&self, target: &Path, basepath: &Path) -> LoaderResult<Vec<PathBuf>> {
        let dir = absolutize(target, basepath);

        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %dir.display(), "Plugin directory not found");
                return Ok(Vec::new());
            }
            Err(source) => return Err(LoaderError::Discovery { path: dir, source }),
        };

        let mut paths = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => paths.push(entry.path()),
                Ok(None) => break,
                Err(source) => return Err(LoaderError::Discovery { path: dir, source }),
            }
        }
        paths.sort();

        let mut candidates = Vec::with_capacity(paths.len());
        for path in paths {
            if self.is_candidate(&path).await {
                candidates.push(path);
            } else {
                trace!(path = %path.display(), "Skipping non-plugin entry");
            }
        }
        Ok(candidates)
    }

    async fn is_candidate(&self, path: &Path) -> bool {
        let Ok(meta) = tokio::fs::metadata(path).await else {
            return false;
        };

        if meta.is_dir() {
            let entry = path.join(format!("{}.{}", self.entry_point, self.extension));
            return tokio::fs::try_exists(entry).await.unwrap_or(false);
        }

        match path.extension() {
            None => true,
            Some(ext) => ext == self.extension.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect()
    }

    #[tokio::test]
    async fn test_scan_keeps_plugins_only() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("authentication")).unwrap();
        fs::write(root.join("authentication/index.js"), "").unwrap();
        fs::create_dir(root.join("empty")).unwrap();
        fs::write(root.join("logger.js"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        fs::write(root.join("repl"), "").unwrap();

        let scanner = DirectoryScanner::new("js", "index");
        let found = scanner.scan(root, Path::new("/")).await.unwrap();

        assert_eq!(names(&found), ["authentication", "logger.js", "repl"]);
        assert!(found.iter().all(|p| p.is_absolute()));
    }

    #[tokio::test]
    async fn test_scan_relative_to_basepath() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("plugins")).unwrap();
        fs::write(temp.path().join("plugins/pubsub.js"), "").unwrap();

        let scanner = DirectoryScanner::new("js", "index");
        let found = scanner
            .scan(Path::new("./plugins"), temp.path())
            .await
            .unwrap();

        assert_eq!(found, [temp.path().join("plugins/pubsub.js")]);
    }

    #[tokio::test]
    async fn test_missing_directory_is_empty() {
        let temp = TempDir::new().unwrap();
        let scanner = DirectoryScanner::new("js", "index");

        let found = scanner.scan(Path::new("nope"), temp.path()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_custom_extension_and_entry_point() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir(root.join("cache")).unwrap();
        fs::write(root.join("cache/main.lua"), "").unwrap();
        fs::write(root.join("logger.js"), "").unwrap();
        fs::write(root.join("repl.lua"), "").unwrap();

        let scanner = DirectoryScanner::new("lua", "main");
        let found = scanner.scan(root, root).await.unwrap();

        assert_eq!(names(&found), ["cache", "repl.lua"]);
    }
}
