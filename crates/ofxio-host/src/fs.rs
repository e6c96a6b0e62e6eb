//! Filesystem access used to probe frames and scan sequences.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;

/// The two filesystem queries the plugins make.
pub trait FileSystem: Send + Sync {
    fn exists(&self, path: &Path) -> bool;

    /// Names (not paths) of the entries of `dir`.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }
}

/// In-memory filesystem, counting `exists` probes.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<BTreeSet<PathBuf>>,
    probes: AtomicUsize,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        let fs = Self::new();
        for f in files {
            fs.add(f);
        }
        fs
    }

    pub fn add(&self, path: impl Into<PathBuf>) {
        self.files.write().insert(path.into());
    }

    pub fn remove(&self, path: &Path) {
        self.files.write().remove(path);
    }

    /// Number of `exists` calls so far.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::Relaxed)
    }

    pub fn reset_probe_count(&self) {
        self.probes.store(0, Ordering::Relaxed);
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.probes.fetch_add(1, Ordering::Relaxed);
        self.files.read().contains(path)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<String>> {
        let files = self.files.read();
        let names: Vec<String> = files
            .iter()
            .filter(|p| p.parent() == Some(dir))
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .collect();
        if names.is_empty() && !files.iter().any(|p| p.starts_with(dir)) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {}", dir.display()),
            ));
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs() {
        let fs = MemoryFileSystem::with_files(["/seq/a.0001.exr", "/seq/a.0002.exr", "/other/b.exr"]);
        assert!(fs.exists(Path::new("/seq/a.0001.exr")));
        assert!(!fs.exists(Path::new("/seq/a.0003.exr")));
        assert_eq!(fs.probe_count(), 2);

        let mut names = fs.list_dir(Path::new("/seq")).unwrap();
        names.sort();
        assert_eq!(names, vec!["a.0001.exr", "a.0002.exr"]);
        assert!(fs.list_dir(Path::new("/missing")).is_err());
    }

    #[test]
    fn test_std_fs_missing_dir() {
        assert!(StdFileSystem.list_dir(Path::new("/nonexistent/ofxio/dir")).is_err());
        assert!(!StdFileSystem.exists(Path::new("/nonexistent/ofxio/file.exr")));
    }
}
