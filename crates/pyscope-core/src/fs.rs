//! Filesystem collaborator.
//!
//! The loader and file discovery go through [`FileSystem`] so the engine can
//! run against the real disk ([`OsFileSystem`]) or a purely in-memory tree
//! ([`MemoryFileSystem`], used by the test suite and embedders).

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{anyhow, Context, Result};

pub trait FileSystem {
    /// Normalize a path to its canonical form. Fails if the path does not
    /// exist.
    fn canonicalize(&self, path: &str) -> Result<String>;
    fn is_file(&self, path: &str) -> bool;
    fn is_dir(&self, path: &str) -> bool;
    fn read_to_string(&self, path: &str) -> Result<String>;
    /// Immediate entries of a directory as full paths, sorted by name so
    /// discovery order is stable across platforms.
    fn read_dir_sorted(&self, path: &str) -> Result<Vec<String>>;
    fn temp_dir(&self) -> String;
    fn create_dir_all(&self, path: &str) -> Result<()>;
    fn write(&self, path: &str, contents: &str) -> Result<()>;
}

/// Directory part of a path, `""` when there is none.
pub fn dir_name(path: &str) -> String {
    Path::new(path)
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Final component of a path.
pub fn file_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn join(base: &str, name: &str) -> String {
    if base.is_empty() {
        return name.to_string();
    }
    Path::new(base).join(name).to_string_lossy().into_owned()
}

/// The real filesystem.
#[derive(Debug, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn canonicalize(&self, path: &str) -> Result<String> {
        let canonical = std::fs::canonicalize(path).with_context(|| format!("no such path: {path}"))?;
        Ok(canonical.to_string_lossy().into_owned())
    }

    fn is_file(&self, path: &str) -> bool {
        Path::new(path).is_file()
    }

    fn is_dir(&self, path: &str) -> bool {
        Path::new(path).is_dir()
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))
    }

    fn read_dir_sorted(&self, path: &str) -> Result<Vec<String>> {
        let mut entries: Vec<String> = std::fs::read_dir(path)
            .with_context(|| format!("failed to list {path}"))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path().to_string_lossy().into_owned())
            .collect();
        entries.sort();
        Ok(entries)
    }

    fn temp_dir(&self) -> String {
        std::env::temp_dir().to_string_lossy().into_owned()
    }

    fn create_dir_all(&self, path: &str) -> Result<()> {
        std::fs::create_dir_all(path).with_context(|| format!("failed to create {path}"))
    }

    fn write(&self, path: &str, contents: &str) -> Result<()> {
        std::fs::write(path, contents).with_context(|| format!("failed to write {path}"))
    }
}

/// An in-memory tree of files keyed by absolute slash-separated paths.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RefCell<BTreeMap<String, String>>,
    dirs: RefCell<BTreeSet<String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let fs = Self::new();
        for (path, contents) in files {
            fs.add_file(path, contents);
        }
        fs
    }

    pub fn add_file(&self, path: &str, contents: &str) {
        let path = normalize(path);
        let mut dir = dir_name(&path);
        while !dir.is_empty() && dir != "/" {
            self.dirs.borrow_mut().insert(dir.clone());
            dir = dir_name(&dir);
        }
        self.files.borrow_mut().insert(path, contents.to_string());
    }
}

fn normalize(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    format!("/{}", parts.join("/"))
}

impl FileSystem for MemoryFileSystem {
    fn canonicalize(&self, path: &str) -> Result<String> {
        let normalized = normalize(path);
        if self.is_file(&normalized) || self.is_dir(&normalized) {
            Ok(normalized)
        } else {
            Err(anyhow!("no such path: {path}"))
        }
    }

    fn is_file(&self, path: &str) -> bool {
        self.files.borrow().contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &str) -> bool {
        let normalized = normalize(path);
        normalized == "/" || self.dirs.borrow().contains(&normalized)
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        self.files
            .borrow()
            .get(&normalize(path))
            .cloned()
            .ok_or_else(|| anyhow!("failed to read {path}"))
    }

    fn read_dir_sorted(&self, path: &str) -> Result<Vec<String>> {
        let normalized = normalize(path);
        if !self.is_dir(&normalized) {
            return Err(anyhow!("failed to list {path}"));
        }
        let prefix = if normalized == "/" {
            "/".to_string()
        } else {
            format!("{normalized}/")
        };
        let mut entries = BTreeSet::new();
        for candidate in self.files.borrow().keys().chain(self.dirs.borrow().iter()) {
            if let Some(rest) = candidate.strip_prefix(&prefix) {
                if rest.is_empty() {
                    continue;
                }
                let child = rest.split('/').next().unwrap_or(rest);
                entries.insert(format!("{prefix}{child}"));
            }
        }
        Ok(entries.into_iter().collect())
    }

    fn temp_dir(&self) -> String {
        "/tmp".to_string()
    }

    fn create_dir_all(&self, path: &str) -> Result<()> {
        let mut dir = normalize(path);
        while !dir.is_empty() && dir != "/" {
            self.dirs.borrow_mut().insert(dir.clone());
            dir = dir_name(&dir);
        }
        Ok(())
    }

    fn write(&self, path: &str, contents: &str) -> Result<()> {
        self.add_file(path, contents);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_fs_round_trip() {
        let fs = MemoryFileSystem::with_files(&[("/proj/a.py", "x = 1\n")]);
        assert!(fs.is_file("/proj/a.py"));
        assert!(fs.is_dir("/proj"));
        assert_eq!(fs.read_to_string("/proj/a.py").unwrap(), "x = 1\n");
    }

    #[test]
    fn memory_fs_lists_immediate_children() {
        let fs = MemoryFileSystem::with_files(&[
            ("/proj/a.py", ""),
            ("/proj/pkg/__init__.py", ""),
            ("/proj/pkg/b.py", ""),
        ]);
        let entries = fs.read_dir_sorted("/proj").unwrap();
        assert_eq!(entries, vec!["/proj/a.py".to_string(), "/proj/pkg".to_string()]);
    }

    #[test]
    fn normalize_collapses_dots() {
        assert_eq!(normalize("/a/./b/../c.py"), "/a/c.py");
        assert_eq!(normalize("a/b.py"), "/a/b.py");
    }

    #[test]
    fn path_helpers() {
        assert_eq!(dir_name("/a/b/c.py"), "/a/b");
        assert_eq!(file_name("/a/b/c.py"), "c.py");
        assert_eq!(join("/a", "b.py"), "/a/b.py");
    }
}
