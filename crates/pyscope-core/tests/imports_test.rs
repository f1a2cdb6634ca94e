mod common;

use common::{analyze, type_of};
use pyscope_core::module_qname;

#[test]
fn circular_imports_load_both_modules() {
    let analyzer = analyze(&[
        ("/proj/a.py", "import b\nx = 1\n"),
        ("/proj/b.py", "import a\ny = 2\n"),
    ]);

    assert!(analyzer.loaded_files().contains("/proj/a.py"));
    assert!(analyzer.loaded_files().contains("/proj/b.py"));

    let types = analyzer.type_store();
    let scopes = analyzer.scope_store();

    // Each module's scope binds the other as a module.
    for (qname, other) in [("proj.a", "b"), ("proj.b", "a")] {
        let ids = scopes
            .lookup_local(analyzer.module_scope(), qname)
            .unwrap_or_else(|| panic!("{qname} not registered"));
        let module_ty = ids
            .iter()
            .map(|&id| analyzer.binding(id).ty)
            .find(|&ty| types.as_module(ty).is_some())
            .expect("module type");
        let scope = types.scope_of(module_ty).expect("module scope");
        let import = scopes
            .lookup_local(scope, other)
            .unwrap_or_else(|| panic!("{qname} has no binding for {other}"));
        assert!(import
            .iter()
            .any(|&id| types.as_module(analyzer.binding(id).ty).is_some()));
    }
}

#[test]
fn modules_are_memoized_by_qualified_name() {
    let mut analyzer = analyze(&[("/proj/a.py", "x = 1\n")]);
    let first = analyzer.load_file("/proj/a.py").expect("load");
    let second = analyzer.load_file("/proj/a.py").expect("reload");
    assert_eq!(first, second);

    // Round trip: the registered module is the one load_file returns.
    let qname = module_qname("/proj/a.py");
    let ids = analyzer
        .scope_store()
        .lookup_local(analyzer.module_scope(), &qname)
        .expect("registered");
    assert!(ids.iter().any(|&id| analyzer.binding(id).ty == first));
}

#[test]
fn from_import_binds_members() {
    let analyzer = analyze(&[
        ("/proj/main.py", "from util import helper\nz = helper(3)\n"),
        ("/proj/util.py", "def helper(a):\n    return 1\n"),
    ]);
    assert_eq!(type_of(&analyzer, "z"), "int");
}

#[test]
fn star_import_merges_the_module_scope() {
    let analyzer = analyze(&[
        ("/proj/consts.py", "A = 1\nB = \"s\"\n"),
        ("/proj/use.py", "from consts import *\nz = A\n"),
    ]);
    assert_eq!(type_of(&analyzer, "z"), "int");
}

#[test]
fn dotted_import_walks_packages() {
    let analyzer = analyze(&[
        ("/proj/main.py", "import pkg.sub\nv = pkg.sub.val\n"),
        ("/proj/pkg/__init__.py", ""),
        ("/proj/pkg/sub.py", "val = 3\n"),
    ]);

    assert_eq!(type_of(&analyzer, "v"), "int");
    assert!(analyzer.loaded_files().contains("/proj/pkg/__init__.py"));
    assert!(analyzer.loaded_files().contains("/proj/pkg/sub.py"));
}

#[test]
fn import_alias_binds_the_target_module() {
    let analyzer = analyze(&[
        ("/proj/main.py", "import util as u\nz = u.val\n"),
        ("/proj/util.py", "val = \"s\"\n"),
    ]);
    assert_eq!(type_of(&analyzer, "z"), "str");
}

#[test]
fn builtin_modules_import_without_files() {
    let analyzer = analyze(&[(
        "/proj/main.py",
        "import os.path\nimport math\np = os.path.join(\"a\", \"b\")\nx = math.pi\n",
    )]);
    assert_eq!(type_of(&analyzer, "p"), "str");
    assert_eq!(type_of(&analyzer, "x"), "float");
}

#[test]
fn missing_modules_are_unresolved_not_fatal() {
    let analyzer = analyze(&[("/proj/main.py", "import nowhere\nx = 1\n")]);
    assert_eq!(type_of(&analyzer, "x"), "int");
    assert!(!analyzer.unresolved_names().is_empty());
}
