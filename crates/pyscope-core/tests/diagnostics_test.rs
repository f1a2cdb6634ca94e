mod common;

use std::rc::Rc;

use common::{analyze, binding_named};
use pyscope_core::{
    Analyzer, AnalyzerOptions, FileSystem, MemoryFileSystem, PythonAstSource, Severity,
};

#[test]
fn unused_variable_is_reported_at_its_definition() {
    let mut analyzer = analyze(&[("/proj/m.py", "x = 1\n")]);
    analyzer.finish();

    let binding = binding_named(&analyzer, "x");
    let diagnostics = analyzer.get_diagnostics_for_file("/proj/m.py");
    let unused: Vec<_> = diagnostics
        .iter()
        .filter(|d| d.message.contains("Unused variable: x"))
        .collect();
    assert_eq!(unused.len(), 1);
    assert_eq!(unused[0].severity, Severity::Error);
    assert_eq!(unused[0].start, binding.start);
    assert_eq!(unused[0].end, binding.end);
}

#[test]
fn referenced_variables_are_not_reported() {
    let mut analyzer = analyze(&[("/proj/m.py", "x = 1\ny = x\nprint(y)\n")]);
    analyzer.finish();

    let diagnostics = analyzer.get_diagnostics_for_file("/proj/m.py");
    assert!(diagnostics
        .iter()
        .all(|d| !d.message.contains("Unused variable: x")));
    assert!(diagnostics
        .iter()
        .all(|d| !d.message.contains("Unused variable: y")));
}

#[test]
fn functions_classes_and_parameters_are_exempt() {
    let source = "def f(a):\n    return 1\nclass C:\n    pass\n";
    let mut analyzer = analyze(&[("/proj/m.py", source)]);
    analyzer.finish();

    let diagnostics = analyzer.get_diagnostics_for_file("/proj/m.py");
    assert!(diagnostics
        .iter()
        .all(|d| !d.message.contains("Unused variable")));
}

#[test]
fn syntax_errors_are_recorded_and_skipped() {
    let analyzer = analyze(&[("/proj/bad.py", "def f(:\n"), ("/proj/ok.py", "x = 1\nprint(x)\n")]);

    assert!(analyzer.failed_to_parse().contains("/proj/bad.py"));
    assert!(analyzer.loaded_files().contains("/proj/ok.py"));
    assert!(!analyzer.loaded_files().contains("/proj/bad.py"));
    assert!(!analyzer.get_diagnostics_for_file("/proj/bad.py").is_empty());

    // Nothing from the broken file reached the binding registries.
    assert!(analyzer
        .all_bindings()
        .iter()
        .all(|&id| analyzer.binding(id).file != "/proj/bad.py"));
}

#[test]
fn empty_directory_analyzes_cleanly() {
    let fs = Rc::new(MemoryFileSystem::new());
    fs.create_dir_all("/proj").unwrap();
    let shared: Rc<dyn FileSystem> = fs;
    let source = PythonAstSource::new(shared.clone(), "/tmp/pyscope/ast_cache".to_string()).unwrap();
    let mut analyzer =
        Analyzer::with_collaborators(AnalyzerOptions::default(), shared, Box::new(source));

    analyzer.analyze("/proj").unwrap();
    analyzer.finish();

    assert!(analyzer.loaded_files().is_empty());
    assert!(analyzer.failed_to_parse().is_empty());
    let summary = analyzer.analysis_summary();
    assert!(summary.contains("modules loaded:   0"));
}

#[test]
fn non_callable_call_is_a_semantic_error() {
    let mut analyzer = analyze(&[("/proj/m.py", "x = 1\ny = x()\n")]);
    analyzer.finish();

    let diagnostics = analyzer.get_diagnostics_for_file("/proj/m.py");
    assert!(diagnostics.iter().any(|d| d.message.contains("Not callable")));
}

#[test]
fn reference_registry_is_bidirectional() {
    let source = "def f(a):\n    return a\nr = f(1)\nprint(r)\n";
    let mut analyzer = analyze(&[("/proj/m.py", source)]);
    analyzer.finish();

    for (node, ids) in analyzer.references() {
        assert!(!ids.is_empty());
        for &id in ids {
            assert!(
                analyzer.binding(id).refs.contains(node),
                "binding {} missing back-reference",
                analyzer.binding(id).name
            );
        }
    }
}

#[test]
fn resolved_and_unresolved_are_disjoint() {
    let source = "x = 1\ny = x\nz = missing\n";
    let mut analyzer = analyze(&[("/proj/m.py", source)]);
    analyzer.finish();

    assert!(!analyzer.resolved_names().is_empty());
    assert!(!analyzer.unresolved_names().is_empty());
    for node in analyzer.resolved_names() {
        assert!(!analyzer.unresolved_names().contains(node));
    }
}

#[test]
fn summary_counts_line_up() {
    let mut analyzer = analyze(&[("/proj/m.py", "x = 1\nprint(x)\n")]);
    analyzer.finish();

    let summary = analyzer.analysis_summary();
    assert!(summary.contains("modules loaded:   1"));
    assert!(summary.contains("parse failures:   0"));
}
