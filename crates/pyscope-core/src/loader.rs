//! Module discovery and loading.
//!
//! Dotted imports resolve against a search path (the importing file's
//! directory, the project root, then `PYTHONPATH` entries). Package
//! prefixes load their `__init__.py` and bind each segment in the scope of
//! the previous package; the final segment falls back to a plain `.py`
//! file. Loaded modules are memoized by qualified name in the root module
//! scope, which is also what breaks circular imports: the partially-built
//! module is found there by the time a cycle re-enters.

use tracing::debug;

use crate::analyzer::Analyzer;
use crate::ast::{Ident, NodeId};
use crate::binding::BindingKind;
use crate::fs::{dir_name, file_name, join};
use crate::scope::ScopeId;
use crate::types::TypeId;

/// Qualified name of the module at `path`.
///
/// A pure function: `__init__.py` names its directory, other files drop
/// their suffix; literal dots in path components are escaped as `%20`
/// before separators become dots, so `a/my.mod.py` and `a/my/mod.py`
/// cannot collide.
pub fn module_qname(path: &str) -> String {
    let trimmed = if file_name(path) == "__init__.py" {
        dir_name(path)
    } else {
        path.strip_suffix(".py").unwrap_or(path).to_string()
    };
    let trimmed = trimmed.trim_start_matches(['/', '\\']);
    trimmed
        .replace('.', "%20")
        .replace(['/', '\\'], ".")
}

impl Analyzer {
    /// Load the module named by `dotted`, binding its head segment in
    /// `scope`. `head_node` is the name node at the import site, when the
    /// call comes from one; transitive loads bind synthetically.
    pub fn load_module(
        &mut self,
        dotted: &str,
        scope: ScopeId,
        head_node: Option<&Ident>,
    ) -> Option<TypeId> {
        if dotted.is_empty() {
            return None;
        }
        let head = dotted.split('.').next().unwrap_or(dotted);

        if self.builtin_modules.contains(dotted) {
            let module_ty = self.registered_module(dotted)?;
            let head_ty = self.registered_module(head).unwrap_or(module_ty);
            self.bind_segment(scope, head, head_node, head_ty);
            return Some(module_ty);
        }

        let base_dir = self.locate_module(head)?;

        let segments: Vec<&str> = dotted.split('.').collect();
        let last = segments.len() - 1;
        let mut container = base_dir;
        let mut bind_into = scope;
        let mut loaded = None;
        for (index, segment) in segments.iter().enumerate() {
            let pkg_dir = join(&container, segment);
            let init = join(&pkg_dir, "__init__.py");
            let module_ty = if self.fs.is_file(&init) {
                self.load_file(&init)
            } else if index == last {
                let file = join(&container, &format!("{segment}.py"));
                self.load_file(&file)
            } else {
                None
            }?;

            let node = if index == 0 { head_node } else { None };
            self.bind_segment(bind_into, segment, node, module_ty);

            bind_into = self.types.scope_of(module_ty)?;
            container = pkg_dir;
            loaded = Some(module_ty);
        }
        loaded
    }

    fn registered_module(&self, qname: &str) -> Option<TypeId> {
        let ids = self.scopes.lookup_local(self.module_scope, qname)?;
        ids.iter()
            .map(|&id| self.bindings.get(id).ty)
            .find(|&ty| self.types.as_module(ty).is_some())
    }

    fn bind_segment(&mut self, scope: ScopeId, name: &str, node: Option<&Ident>, ty: TypeId) {
        match node {
            Some(ident) => {
                self.bind(
                    scope,
                    name,
                    ident.id,
                    (ident.start, ident.end),
                    ty,
                    BindingKind::Module,
                );
                self.mark_resolved(ident.id);
            }
            None => {
                self.bind(scope, name, NodeId::SYNTHETIC, (0, 0), ty, BindingKind::Module);
            }
        }
    }

    /// First directory on the search path containing `head` as a package
    /// or a plain module file.
    fn locate_module(&self, head: &str) -> Option<String> {
        let mut candidates = vec![self.cwd.clone(), self.project_root.clone()];
        candidates.extend(self.search_path.iter().cloned());
        for dir in candidates {
            if dir.is_empty() {
                continue;
            }
            if self.fs.is_file(&join(&join(&dir, head), "__init__.py")) {
                return Some(dir);
            }
            if self.fs.is_file(&join(&dir, &format!("{head}.py"))) {
                return Some(dir);
            }
        }
        None
    }

    /// Load one source file, memoized by qualified name.
    ///
    /// Returns `None` on missing files, parse failures, and circular
    /// re-entry (silently: the partially-built module is already installed
    /// under its qname and is what cyclic importers see).
    pub fn load_file(&mut self, path: &str) -> Option<TypeId> {
        let path = self.fs.canonicalize(path).ok()?;
        if !self.fs.is_file(&path) {
            return None;
        }

        let qname = module_qname(&path);
        if let Some(existing) = self.registered_module(&qname) {
            return Some(existing);
        }
        if self.import_stack.contains(&path) {
            return None;
        }

        self.import_stack.insert(path.clone());
        let saved_cwd = std::mem::replace(&mut self.cwd, dir_name(&path));

        let ast = match self.ast_source.get_ast(&path) {
            Ok(ast) => ast,
            Err(failure) => {
                self.record_parse_failure(&path);
                self.add_parse_error(
                    &path,
                    (failure.offset, failure.offset),
                    failure.message,
                );
                self.import_stack.shift_remove(&path);
                self.cwd = saved_cwd;
                return None;
            }
        };

        debug!(path = %path, qname = %qname, "loading module");
        self.record_loaded(&path);
        let module_ty = self.infer_module(&ast, &qname);

        self.import_stack.shift_remove(&path);
        self.cwd = saved_cwd;
        Some(module_ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qname_strips_suffix_and_init() {
        assert_eq!(module_qname("/proj/a.py"), "proj.a");
        assert_eq!(module_qname("/proj/pkg/__init__.py"), "proj.pkg");
        assert_eq!(module_qname("/proj/pkg/mod.py"), "proj.pkg.mod");
    }

    #[test]
    fn qname_escapes_literal_dots() {
        assert_eq!(module_qname("/proj/my.mod.py"), "proj.my%20mod");
        assert_eq!(module_qname("/pro.j/a.py"), "pro%20j.a");
        // The escape keeps distinct paths distinct.
        assert_ne!(module_qname("/p/a.b.py"), module_qname("/p/a/b.py"));
    }

    #[test]
    fn qname_is_deterministic() {
        let a = module_qname("/proj/pkg/mod.py");
        let b = module_qname("/proj/pkg/mod.py");
        assert_eq!(a, b);
    }
}
