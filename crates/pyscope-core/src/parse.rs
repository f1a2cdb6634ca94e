//! The AST collaborator: parsing plus the on-disk AST cache.
//!
//! [`PythonAstSource`] reads source text through the filesystem
//! collaborator, consults a content-addressed cache, and otherwise parses
//! with `rustpython-parser` and lowers the result to the uniform AST.
//! Cached trees are re-numbered before being handed out so node ids stay
//! unique within a run.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::rc::Rc;

use anyhow::Result;
use rustpython_parser::Parse;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::ast::Module;
use crate::bridge::lower_module;
use crate::fs::{join, FileSystem};

/// A failed parse: the message and byte offset reported by the parser.
#[derive(Debug, Clone)]
pub struct ParseFailure {
    pub message: String,
    pub offset: u32,
}

pub trait AstSource {
    /// Produce the AST for `path`, or the parse failure. The caller has
    /// already established that the file exists.
    fn get_ast(&mut self, path: &str) -> Result<Rc<Module>, ParseFailure>;

    /// Flush any buffered cache state.
    fn close(&mut self) -> Result<()>;
}

/// Content-addressed AST cache. Writes are buffered and flushed on
/// [`AstCache::flush`]; reads consult the buffer first, then disk.
struct AstCache {
    fs: Rc<dyn FileSystem>,
    dir: String,
    pending: HashMap<String, String>,
}

impl AstCache {
    fn open(fs: Rc<dyn FileSystem>, dir: String) -> Result<Self> {
        fs.create_dir_all(&dir)?;
        Ok(AstCache {
            fs,
            dir,
            pending: HashMap::new(),
        })
    }

    fn entry_path(&self, key: &str) -> String {
        join(&self.dir, &format!("{key}.json"))
    }

    fn load(&self, key: &str) -> Option<Module> {
        let json = match self.pending.get(key) {
            Some(json) => json.clone(),
            None => {
                let path = self.entry_path(key);
                if !self.fs.is_file(&path) {
                    return None;
                }
                self.fs.read_to_string(&path).ok()?
            }
        };
        serde_json::from_str(&json).ok()
    }

    fn store(&mut self, key: &str, module: &Module) {
        if let Ok(json) = serde_json::to_string(module) {
            self.pending.insert(key.to_string(), json);
        }
    }

    fn flush(&mut self) -> Result<()> {
        for (key, json) in self.pending.drain() {
            let path = join(&self.dir, &format!("{key}.json"));
            self.fs.write(&path, &json)?;
        }
        Ok(())
    }
}

fn content_key(source: &str) -> String {
    let digest = Sha256::digest(source.as_bytes());
    let mut key = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(key, "{byte:02x}");
    }
    key
}

/// Default [`AstSource`]: rustpython parser + cache.
pub struct PythonAstSource {
    fs: Rc<dyn FileSystem>,
    cache: AstCache,
    next_id: u32,
}

impl PythonAstSource {
    /// Open the source against `cache_dir`, creating the directory.
    /// Failure to create it aborts analyzer startup.
    pub fn new(fs: Rc<dyn FileSystem>, cache_dir: String) -> Result<Self> {
        let cache = AstCache::open(fs.clone(), cache_dir)?;
        Ok(PythonAstSource {
            fs,
            cache,
            next_id: 1,
        })
    }
}

impl AstSource for PythonAstSource {
    fn get_ast(&mut self, path: &str) -> Result<Rc<Module>, ParseFailure> {
        let source = self.fs.read_to_string(path).map_err(|err| ParseFailure {
            message: err.to_string(),
            offset: 0,
        })?;

        let key = content_key(&source);
        if let Some(mut module) = self.cache.load(&key) {
            debug!(path, "ast cache hit");
            module.file = path.to_string();
            module.renumber(&mut self.next_id);
            return Ok(Rc::new(module));
        }

        let suite = rustpython_ast::Suite::parse(&source, path).map_err(|err| ParseFailure {
            message: err.to_string(),
            offset: u32::from(err.offset),
        })?;
        let module = lower_module(suite, path, &mut self.next_id);
        self.cache.store(&key, &module);
        debug!(path, "parsed and cached");
        Ok(Rc::new(module))
    }

    fn close(&mut self) -> Result<()> {
        self.cache.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    fn source_over(files: &[(&str, &str)]) -> PythonAstSource {
        let fs: Rc<dyn FileSystem> = Rc::new(MemoryFileSystem::with_files(files));
        PythonAstSource::new(fs, "/tmp/pyscope/ast_cache".to_string()).unwrap()
    }

    #[test]
    fn parses_and_reports_file() {
        let mut source = source_over(&[("/proj/a.py", "x = 1\n")]);
        let module = source.get_ast("/proj/a.py").unwrap();
        assert_eq!(module.file, "/proj/a.py");
        assert_eq!(module.body.len(), 1);
    }

    #[test]
    fn cache_hits_are_renumbered() {
        let mut source = source_over(&[("/proj/a.py", "x = 1\n"), ("/proj/b.py", "x = 1\n")]);
        let first = source.get_ast("/proj/a.py").unwrap();
        let second = source.get_ast("/proj/b.py").unwrap();
        assert_eq!(second.file, "/proj/b.py");
        assert_ne!(first.id, second.id);
        assert_ne!(first.body[0].id, second.body[0].id);
    }

    #[test]
    fn syntax_errors_surface_as_parse_failures() {
        let mut source = source_over(&[("/proj/bad.py", "def f(:\n")]);
        let err = source.get_ast("/proj/bad.py").unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn flush_persists_entries() {
        let fs = Rc::new(MemoryFileSystem::with_files(&[("/proj/a.py", "x = 1\n")]));
        let shared: Rc<dyn FileSystem> = fs.clone();
        let mut source = PythonAstSource::new(shared, "/tmp/pyscope/ast_cache".to_string()).unwrap();
        source.get_ast("/proj/a.py").unwrap();
        source.close().unwrap();
        let entries = fs.read_dir_sorted("/tmp/pyscope/ast_cache").unwrap();
        assert_eq!(entries.len(), 1);
    }
}
