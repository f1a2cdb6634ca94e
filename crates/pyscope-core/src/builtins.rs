//! Seeds built-in modules and names before analysis begins.
//!
//! Every seeded binding is marked `builtin` and lives on a synthetic node,
//! which keeps it out of unused-variable reporting and user-facing module
//! listings. The `builtins` module is merged into the global scope so its
//! names resolve unqualified.

use crate::analyzer::Analyzer;
use crate::ast::NodeId;
use crate::binding::BindingKind;
use crate::scope::{ScopeId, ScopeKind};
use crate::types::{ClassType, FunBody, FunType, ModuleType, TypeId};

pub(crate) fn seed(an: &mut Analyzer) {
    let builtins = seed_module(an, "builtins");

    // Constructors for the primitive and container types are functions
    // returning the primitive, so `int("5")` infers as int.
    let prims: &[(&str, TypeId)] = &[
        ("int", an.types.int),
        ("float", an.types.float),
        ("bool", an.types.boolean),
        ("str", an.types.string),
        ("bytes", an.types.bytes),
        ("complex", an.types.complex),
    ];
    for &(name, ret) in prims {
        seed_fun(an, builtins, name, ret);
    }
    let unknown = an.types.unknown;
    let list_any = an.types.list_of(unknown);
    let dict_any = an.types.dict_of(unknown, unknown);
    let set_any = an.types.set_of(unknown);
    seed_fun(an, builtins, "list", list_any);
    seed_fun(an, builtins, "dict", dict_any);
    seed_fun(an, builtins, "set", set_any);
    seed_fun(an, builtins, "tuple", unknown);

    let int = an.types.int;
    let none = an.types.none;
    let boolean = an.types.boolean;
    let string = an.types.string;
    let float = an.types.float;
    let list_int = an.types.list_of(int);
    let list_str = an.types.list_of(string);

    seed_fun(an, builtins, "len", int);
    seed_fun(an, builtins, "print", none);
    seed_fun(an, builtins, "range", list_int);
    seed_fun(an, builtins, "isinstance", boolean);
    seed_fun(an, builtins, "issubclass", boolean);
    seed_fun(an, builtins, "hasattr", boolean);
    seed_fun(an, builtins, "callable", boolean);
    seed_fun(an, builtins, "getattr", unknown);
    seed_fun(an, builtins, "setattr", none);
    seed_fun(an, builtins, "repr", string);
    seed_fun(an, builtins, "input", string);
    seed_fun(an, builtins, "abs", unknown);
    seed_fun(an, builtins, "min", unknown);
    seed_fun(an, builtins, "max", unknown);
    seed_fun(an, builtins, "sum", unknown);
    seed_fun(an, builtins, "sorted", list_any);
    seed_fun(an, builtins, "reversed", list_any);
    seed_fun(an, builtins, "enumerate", list_any);
    seed_fun(an, builtins, "zip", list_any);
    seed_fun(an, builtins, "map", list_any);
    seed_fun(an, builtins, "filter", list_any);
    seed_fun(an, builtins, "open", unknown);
    seed_fun(an, builtins, "id", int);
    seed_fun(an, builtins, "hash", int);
    seed_fun(an, builtins, "ord", int);
    seed_fun(an, builtins, "chr", string);

    let object = seed_class(an, builtins, "object", &[]);
    let exception = seed_class(an, builtins, "Exception", &[object]);
    for name in [
        "ValueError",
        "TypeError",
        "KeyError",
        "IndexError",
        "AttributeError",
        "RuntimeError",
        "StopIteration",
        "NotImplementedError",
        "OSError",
    ] {
        seed_class(an, builtins, name, &[exception]);
    }

    // Unqualified resolution of builtins.
    let builtins_scope = scope_of_module(an, builtins);
    an.scopes.merge(an.global_scope, builtins_scope);

    let sys = seed_module(an, "sys");
    seed_var(an, sys, "argv", list_str);
    seed_var(an, sys, "path", list_str);
    seed_var(an, sys, "platform", string);
    seed_var(an, sys, "stdout", unknown);
    seed_var(an, sys, "stderr", unknown);
    seed_fun(an, sys, "exit", none);

    let os = seed_module(an, "os");
    seed_var(an, os, "sep", string);
    seed_var(an, os, "environ", dict_any);
    seed_fun(an, os, "getcwd", string);
    seed_fun(an, os, "listdir", list_str);
    seed_fun(an, os, "makedirs", none);

    let os_path = seed_module(an, "os.path");
    seed_fun(an, os_path, "join", string);
    seed_fun(an, os_path, "dirname", string);
    seed_fun(an, os_path, "basename", string);
    seed_fun(an, os_path, "exists", boolean);
    seed_fun(an, os_path, "isfile", boolean);
    seed_fun(an, os_path, "isdir", boolean);
    // `os.path` is reachable as an attribute of `os`.
    seed_member(an, os, "path", os_path, BindingKind::Module);

    let math = seed_module(an, "math");
    seed_var(an, math, "pi", float);
    seed_var(an, math, "e", float);
    for name in ["sqrt", "floor", "ceil", "sin", "cos", "log", "exp", "pow"] {
        seed_fun(an, math, name, float);
    }

    let re = seed_module(an, "re");
    seed_fun(an, re, "compile", unknown);
    seed_fun(an, re, "match", unknown);
    seed_fun(an, re, "search", unknown);
    seed_fun(an, re, "findall", list_str);
    seed_fun(an, re, "sub", string);

    let time = seed_module(an, "time");
    seed_fun(an, time, "time", float);
    seed_fun(an, time, "sleep", none);
}

/// Create a builtin module, register it under its qualified name and
/// remember it for the loader's short-circuit.
fn seed_module(an: &mut Analyzer, qname: &str) -> TypeId {
    let scope = an
        .scopes
        .new_scope(None, ScopeKind::Module, qname.to_string());
    let name = qname.rsplit('.').next().unwrap_or(qname).to_string();
    let module = an.types.new_module(ModuleType {
        name,
        qname: qname.to_string(),
        scope,
        file: None,
    });
    an.scopes.get_mut(scope).owner = Some(module);
    let registry = an.module_scope;
    install(an, registry, qname, module, BindingKind::Module);
    an.builtin_modules.insert(qname.to_string());
    module
}

fn scope_of_module(an: &Analyzer, module: TypeId) -> ScopeId {
    an.types
        .scope_of(module)
        .expect("builtin modules always carry a scope")
}

fn seed_fun(an: &mut Analyzer, module: TypeId, name: &str, ret: TypeId) {
    let module_scope = scope_of_module(an, module);
    let path = format!("{}.{}", an.scopes.get(module_scope).path, name);
    let fun_scope = an
        .scopes
        .new_scope(Some(module_scope), ScopeKind::Function, path);
    let fun = an.types.new_fun(FunType {
        def_node: None,
        scope: fun_scope,
        params: smallvec::SmallVec::new(),
        defaults: Vec::new(),
        ret,
        self_type: None,
        body: FunBody::Builtin,
        file: String::new(),
        builtin: true,
    });
    an.scopes.get_mut(fun_scope).owner = Some(fun);
    install(an, module_scope, name, fun, BindingKind::Function);
}

fn seed_class(an: &mut Analyzer, module: TypeId, name: &str, bases: &[TypeId]) -> TypeId {
    let module_scope = scope_of_module(an, module);
    let path = format!("{}.{}", an.scopes.get(module_scope).path, name);
    let class_scope = an
        .scopes
        .new_scope(Some(module_scope), ScopeKind::Class, path);
    let class = an.types.new_class(ClassType {
        name: name.to_string(),
        scope: class_scope,
        bases: bases.to_vec(),
    });
    an.scopes.get_mut(class_scope).owner = Some(class);
    install(an, module_scope, name, class, BindingKind::Class);
    class
}

fn seed_var(an: &mut Analyzer, module: TypeId, name: &str, ty: TypeId) {
    let module_scope = scope_of_module(an, module);
    install(an, module_scope, name, ty, BindingKind::Variable);
}

fn seed_member(an: &mut Analyzer, module: TypeId, name: &str, ty: TypeId, kind: BindingKind) {
    let module_scope = scope_of_module(an, module);
    install(an, module_scope, name, ty, kind);
}

fn install(an: &mut Analyzer, scope: ScopeId, name: &str, ty: TypeId, kind: BindingKind) {
    let id = an.new_binding(name, NodeId::SYNTHETIC, String::new(), (0, 0), ty, kind, true);
    an.scopes
        .get_mut(scope)
        .table
        .entry(name.to_string())
        .or_default()
        .push(id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalyzerOptions;
    use crate::fs::{FileSystem, MemoryFileSystem};
    use crate::parse::PythonAstSource;
    use std::rc::Rc;

    fn analyzer() -> Analyzer {
        let fs: Rc<dyn FileSystem> = Rc::new(MemoryFileSystem::new());
        let source = PythonAstSource::new(fs.clone(), "/tmp/pyscope/ast_cache".to_string()).unwrap();
        Analyzer::with_collaborators(AnalyzerOptions::default(), fs, Box::new(source))
    }

    #[test]
    fn global_scope_resolves_builtin_names() {
        let an = analyzer();
        assert!(an.scopes.lookup(an.global_scope, "len").is_some());
        assert!(an.scopes.lookup(an.global_scope, "print").is_some());
        assert!(an.scopes.lookup(an.global_scope, "Exception").is_some());
    }

    #[test]
    fn builtin_modules_are_registered() {
        let an = analyzer();
        for name in ["builtins", "sys", "os", "os.path", "math"] {
            assert!(an.builtin_modules.contains(name), "missing {name}");
            assert!(an.scopes.lookup_local(an.module_scope, name).is_some());
        }
    }

    #[test]
    fn builtin_bindings_are_flagged() {
        let an = analyzer();
        let ids = an.scopes.lookup(an.global_scope, "len").unwrap();
        for id in ids {
            assert!(an.bindings.get(id).builtin);
            assert!(an.bindings.get(id).synthetic);
        }
    }
}
