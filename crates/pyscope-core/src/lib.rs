//! # pyscope-core
//!
//! Whole-program static type inference for a dynamically-typed, Python-like
//! language. Given a root directory, the analyzer discovers source files,
//! parses them (via `rustpython-parser` behind the AST collaborator), and
//! runs an inter-procedural, union-widening inference that produces:
//!
//! - a symbol table of [`binding::Binding`]s,
//! - a mapping from AST nodes to the bindings they reference,
//! - a set of semantic diagnostics (unused variables, non-callable calls).
//!
//! ## Modules
//!
//! - **[`analyzer`]** - the coordinator owning all shared state
//! - **[`types`]** - the union type lattice and interning store
//! - **[`scope`]** - lexical symbol tables
//! - **[`loader`]** - module discovery, circular-import handling
//! - **[`parse`]** - the AST collaborator and its on-disk cache
//! - **[`fs`]** - the filesystem collaborator (real and in-memory)
//!
//! ## Quick start
//!
//! ```no_run
//! use pyscope_core::{Analyzer, AnalyzerOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut analyzer = Analyzer::new(AnalyzerOptions::default())?;
//! analyzer.analyze("path/to/project")?;
//! analyzer.finish();
//! for id in analyzer.all_bindings() {
//!     let binding = analyzer.binding(*id);
//!     println!("{}: {}", binding.name, analyzer.type_store().describe(binding.ty));
//! }
//! analyzer.close()?;
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod ast;
pub mod binding;
mod bridge;
mod builtins;
pub mod config;
pub mod diagnostics;
pub mod fs;
mod infer;
pub mod loader;
pub mod parse;
pub mod scope;
pub mod types;

pub use analyzer::Analyzer;
pub use ast::NodeId;
pub use binding::{Binding, BindingId, BindingKind};
pub use config::AnalyzerOptions;
pub use diagnostics::{Diagnostic, Severity};
pub use fs::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use loader::module_qname;
pub use parse::{AstSource, ParseFailure, PythonAstSource};
pub use scope::{ScopeId, ScopeKind};
pub use types::{Type, TypeId, TypeStore};
