//! The analysis coordinator.
//!
//! One [`Analyzer`] owns every piece of shared state: the type, scope and
//! binding stores, the reference registries, the reentrancy guards, the
//! uncalled-function worklist and the diagnostics. It is threaded as
//! `&mut` through the loader and the inference driver; there is no ambient
//! global state.

use std::collections::HashSet;
use std::rc::Rc;

use anyhow::Result;
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, warn};

use crate::ast::NodeId;
use crate::binding::{Binding, BindingId, BindingKind, BindingStore};
use crate::builtins;
use crate::config::AnalyzerOptions;
use crate::diagnostics::Diagnostic;
use crate::fs::{dir_name, join, FileSystem, OsFileSystem};
use crate::parse::{AstSource, PythonAstSource};
use crate::scope::{ScopeId, ScopeKind, ScopeStore};
use crate::types::{Type, TypeId, TypeStore};

/// Identity of one in-flight function application: the function and the
/// frozen argument types. Guards cyclic application.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct CallKey {
    pub fun: TypeId,
    pub args: Vec<TypeId>,
}

/// Accumulator for the return type of one function application.
/// `explicit` distinguishes "no return statement" (the function returns
/// `None`) from "returns only Unknown" (a cycle assumption).
#[derive(Debug, Clone, Copy)]
pub(crate) struct RetFrame {
    pub ty: TypeId,
    pub explicit: bool,
}

pub struct Analyzer {
    pub(crate) types: TypeStore,
    pub(crate) scopes: ScopeStore,
    pub(crate) bindings: BindingStore,

    /// Root registry scope: every module is installed here under its full
    /// qualified name.
    pub(crate) module_scope: ScopeId,
    /// Global scope seeded with builtins; module scopes parent here so
    /// `len`, `print`, … resolve unqualified.
    pub(crate) global_scope: ScopeId,

    all_bindings: Vec<BindingId>,
    references: IndexMap<NodeId, Vec<BindingId>>,
    resolved: IndexSet<NodeId>,
    unresolved: IndexSet<NodeId>,
    semantic_errors: IndexMap<String, Vec<Diagnostic>>,
    parse_errors: IndexMap<String, Vec<Diagnostic>>,
    loaded_files: IndexSet<String>,
    failed_to_parse: IndexSet<String>,

    /// Functions whose body has never been analyzed under a call.
    pub(crate) uncalled: IndexSet<TypeId>,
    pub(crate) call_stack: HashSet<CallKey>,
    /// Call expression nodes currently mid-inference. Guards recursion
    /// whose argument types grow on every level (the pair guard alone
    /// would never see a repeat).
    pub(crate) call_nodes: HashSet<NodeId>,
    pub(crate) import_stack: IndexSet<String>,
    /// File attribution for bindings created while a body is analyzed.
    pub(crate) file_stack: Vec<String>,
    /// Return-type accumulators for the function applications in flight.
    pub(crate) ret_stack: Vec<RetFrame>,

    pub(crate) project_root: String,
    pub(crate) cwd: String,
    pub(crate) search_path: Vec<String>,
    pub(crate) builtin_modules: HashSet<String>,

    pub(crate) fs: Rc<dyn FileSystem>,
    pub(crate) ast_source: Box<dyn AstSource>,

    pub(crate) options: AnalyzerOptions,
    pub(crate) called_functions: usize,
}

impl Analyzer {
    /// Analyzer over the real filesystem, with the AST cache under
    /// `<tempdir>/pyscope/ast_cache`. Failing to create the cache
    /// directory aborts startup.
    pub fn new(options: AnalyzerOptions) -> Result<Self> {
        let fs: Rc<dyn FileSystem> = Rc::new(OsFileSystem);
        let cache_dir = join(&join(&fs.temp_dir(), "pyscope"), "ast_cache");
        let ast_source = Box::new(PythonAstSource::new(fs.clone(), cache_dir)?);
        Ok(Self::with_collaborators(options, fs, ast_source))
    }

    /// Analyzer over explicit collaborators (tests, embedders).
    pub fn with_collaborators(
        options: AnalyzerOptions,
        fs: Rc<dyn FileSystem>,
        ast_source: Box<dyn AstSource>,
    ) -> Self {
        let mut scopes = ScopeStore::new();
        let global_scope = scopes.new_scope(None, ScopeKind::Global, String::new());
        let module_scope = scopes.new_scope(None, ScopeKind::Block, String::new());

        let mut search_path = Vec::new();
        if let Some(raw) = std::env::var_os("PYTHONPATH") {
            for entry in std::env::split_paths(&raw) {
                search_path.push(entry.to_string_lossy().into_owned());
            }
        }

        let mut analyzer = Analyzer {
            types: TypeStore::new(),
            scopes,
            bindings: BindingStore::new(),
            module_scope,
            global_scope,
            all_bindings: Vec::new(),
            references: IndexMap::new(),
            resolved: IndexSet::new(),
            unresolved: IndexSet::new(),
            semantic_errors: IndexMap::new(),
            parse_errors: IndexMap::new(),
            loaded_files: IndexSet::new(),
            failed_to_parse: IndexSet::new(),
            uncalled: IndexSet::new(),
            call_stack: HashSet::new(),
            call_nodes: HashSet::new(),
            import_stack: IndexSet::new(),
            file_stack: Vec::new(),
            ret_stack: Vec::new(),
            project_root: String::new(),
            cwd: String::new(),
            search_path,
            builtin_modules: HashSet::new(),
            fs,
            ast_source,
            options,
            called_functions: 0,
        };
        builtins::seed(&mut analyzer);
        analyzer
    }

    // ---- registries ----------------------------------------------------

    pub(crate) fn current_file(&self) -> String {
        self.file_stack.last().cloned().unwrap_or_default()
    }

    /// Single construction site for bindings. The definition node itself is
    /// recorded as a reference so navigation from the node works; the
    /// unused-variable check ignores that self-reference.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new_binding(
        &mut self,
        name: &str,
        node: NodeId,
        file: String,
        span: (u32, u32),
        ty: TypeId,
        kind: BindingKind,
        builtin: bool,
    ) -> BindingId {
        let synthetic = node.is_synthetic();
        let id = self.bindings.alloc(Binding {
            name: name.to_string(),
            node,
            file,
            start: span.0,
            end: span.1,
            ty,
            kind,
            refs: IndexSet::new(),
            builtin,
            synthetic,
        });
        self.all_bindings.push(id);
        self.add_reference(node, &[id]);
        id
    }

    /// Bind `name` in `scope`.
    ///
    /// Re-binding the same definition node, or re-assigning a value
    /// binding, widens the existing binding's type by union instead of
    /// adding an entry; overloaded namespace definitions accumulate.
    pub(crate) fn bind(
        &mut self,
        scope: ScopeId,
        name: &str,
        node: NodeId,
        span: (u32, u32),
        ty: TypeId,
        kind: BindingKind,
    ) -> BindingId {
        if let Some(ids) = self.scopes.get(scope).table.get(name).cloned() {
            if let Some(&existing) = ids.iter().find(|&&b| self.bindings.get(b).node == node) {
                return self.widen_binding(existing, ty);
            }
            if kind.is_value() {
                if let Some(&existing) = ids
                    .iter()
                    .rev()
                    .find(|&&b| self.bindings.get(b).kind.is_value())
                {
                    return self.widen_binding(existing, ty);
                }
            }
        }
        let file = self.current_file();
        let id = self.new_binding(name, node, file, span, ty, kind, false);
        self.scopes
            .get_mut(scope)
            .table
            .entry(name.to_string())
            .or_default()
            .push(id);
        id
    }

    fn widen_binding(&mut self, id: BindingId, ty: TypeId) -> BindingId {
        let old = self.bindings.get(id).ty;
        let widened = self.types.union(old, ty);
        self.bindings.get_mut(id).ty = widened;
        id
    }

    /// Record that `node` refers to `ids`. Synthetic nodes are ignored.
    pub(crate) fn add_reference(&mut self, node: NodeId, ids: &[BindingId]) {
        if node.is_synthetic() {
            return;
        }
        let slot = self.references.entry(node).or_default();
        for &id in ids {
            if !slot.contains(&id) {
                slot.push(id);
                self.bindings.get_mut(id).refs.insert(node);
            }
        }
    }

    pub(crate) fn mark_resolved(&mut self, node: NodeId) {
        self.unresolved.shift_remove(&node);
        self.resolved.insert(node);
    }

    pub(crate) fn mark_unresolved(&mut self, node: NodeId) {
        if !self.resolved.contains(&node) {
            self.unresolved.insert(node);
        }
    }

    pub(crate) fn add_semantic_error(&mut self, file: &str, span: (u32, u32), message: String) {
        self.semantic_errors
            .entry(file.to_string())
            .or_default()
            .push(Diagnostic::error(file, span.0, span.1, message));
    }

    pub(crate) fn add_parse_error(&mut self, file: &str, span: (u32, u32), message: String) {
        self.parse_errors
            .entry(file.to_string())
            .or_default()
            .push(Diagnostic::error(file, span.0, span.1, message));
    }

    pub(crate) fn record_loaded(&mut self, file: &str) {
        self.loaded_files.insert(file.to_string());
    }

    pub(crate) fn record_parse_failure(&mut self, file: &str) {
        self.failed_to_parse.insert(file.to_string());
    }

    // ---- public surface ------------------------------------------------

    /// Analyze a file or a directory tree of `.py` files.
    pub fn analyze(&mut self, root: &str) -> Result<()> {
        let root = self.fs.canonicalize(root)?;
        self.project_root = if self.fs.is_dir(&root) {
            root.clone()
        } else {
            dir_name(&root)
        };
        self.cwd = self.project_root.clone();
        info!(root = %root, "analysis started");

        if self.fs.is_file(&root) {
            self.load_file(&root);
        } else {
            self.load_dir(&root);
        }
        debug_assert!(self.import_stack.is_empty());
        debug_assert!(self.call_stack.is_empty());
        debug_assert!(self.call_nodes.is_empty());
        Ok(())
    }

    fn load_dir(&mut self, dir: &str) {
        let entries = match self.fs.read_dir_sorted(dir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(dir, %err, "skipping unreadable directory");
                return;
            }
        };
        for entry in entries {
            if self.fs.is_dir(&entry) {
                self.load_dir(&entry);
            } else if entry.ends_with(".py") {
                self.load_file(&entry);
            }
        }
    }

    /// Drive every never-called function to a fixed point, then report
    /// unused variables and the summary.
    pub fn finish(&mut self) {
        self.apply_uncalled();
        self.report_unused();
        if !self.options.quiet {
            info!("{}", self.analysis_summary());
        }
    }

    /// Release collaborator resources (flush the AST cache).
    pub fn close(&mut self) -> Result<()> {
        self.ast_source.close()
    }

    fn apply_uncalled(&mut self) {
        while !self.uncalled.is_empty() {
            let snapshot: Vec<TypeId> = self.uncalled.iter().copied().collect();
            debug!(count = snapshot.len(), "applying uncalled functions");
            for fun in snapshot {
                if !self.uncalled.contains(&fun) {
                    continue;
                }
                let arity = self.types.as_fun(fun).map(|f| f.params.len()).unwrap_or(0);
                let args = vec![self.types.unknown; arity];
                self.apply_fun(fun, &args, None);
            }
        }
    }

    fn report_unused(&mut self) {
        let all: Vec<BindingId> = self.all_bindings.clone();
        for id in all {
            let binding = self.bindings.get(id);
            if binding.builtin || binding.synthetic || binding.is_referenced() {
                continue;
            }
            if binding.kind == BindingKind::Parameter {
                continue;
            }
            if matches!(
                self.types.get(binding.ty),
                Type::Class(_) | Type::Fun(_) | Type::Module(_)
            ) {
                continue;
            }
            let file = binding.file.clone();
            let span = (binding.start, binding.end);
            let message = format!("Unused variable: {}", binding.name);
            self.add_semantic_error(&file, span, message);
        }
    }

    // ---- accessors -----------------------------------------------------

    pub fn all_bindings(&self) -> &[BindingId] {
        &self.all_bindings
    }

    pub fn binding(&self, id: BindingId) -> &Binding {
        self.bindings.get(id)
    }

    pub fn references(&self) -> &IndexMap<NodeId, Vec<BindingId>> {
        &self.references
    }

    pub fn resolved_names(&self) -> &IndexSet<NodeId> {
        &self.resolved
    }

    pub fn unresolved_names(&self) -> &IndexSet<NodeId> {
        &self.unresolved
    }

    pub fn loaded_files(&self) -> &IndexSet<String> {
        &self.loaded_files
    }

    pub fn failed_to_parse(&self) -> &IndexSet<String> {
        &self.failed_to_parse
    }

    pub fn called_functions(&self) -> usize {
        self.called_functions
    }

    pub fn type_store(&self) -> &TypeStore {
        &self.types
    }

    pub fn scope_store(&self) -> &ScopeStore {
        &self.scopes
    }

    pub fn module_scope(&self) -> ScopeId {
        self.module_scope
    }

    /// Number of functions whose body has not been analyzed yet. Zero
    /// after [`Analyzer::finish`].
    pub fn uncalled_count(&self) -> usize {
        self.uncalled.len()
    }

    pub fn global_scope(&self) -> ScopeId {
        self.global_scope
    }

    /// Parse errors first (they happen first), then semantic findings.
    pub fn get_diagnostics_for_file(&self, path: &str) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if let Some(parse) = self.parse_errors.get(path) {
            out.extend(parse.iter().cloned());
        }
        if let Some(semantic) = self.semantic_errors.get(path) {
            out.extend(semantic.iter().cloned());
        }
        out
    }

    /// Human-readable end-of-run summary.
    pub fn analysis_summary(&self) -> String {
        let definitions = self
            .all_bindings
            .iter()
            .filter(|&&id| !self.bindings.get(id).synthetic)
            .count();
        let semantic_count: usize = self.semantic_errors.values().map(Vec::len).sum();
        let total_names = self.resolved.len() + self.unresolved.len();
        let rate = if total_names == 0 {
            100.0
        } else {
            self.resolved.len() as f64 * 100.0 / total_names as f64
        };
        format!(
            "analysis summary\n\
             \x20 modules loaded:   {}\n\
             \x20 parse failures:   {}\n\
             \x20 semantic errors:  {}\n\
             \x20 definitions:      {}\n\
             \x20 references:       {}\n\
             \x20 called functions: {}\n\
             \x20 name resolution:  {}/{} ({:.1}%)",
            self.loaded_files.len(),
            self.failed_to_parse.len(),
            semantic_count,
            definitions,
            self.references.len(),
            self.called_functions,
            self.resolved.len(),
            total_names,
            rate,
        )
    }
}
