//! Shared harness: an analyzer over an in-memory project tree.
#![allow(dead_code)] // each test binary uses a subset of the helpers

use std::rc::Rc;

use pyscope_core::{
    Analyzer, AnalyzerOptions, Binding, BindingId, FileSystem, MemoryFileSystem, PythonAstSource,
};

/// Build an analyzer over `files` (absolute paths under `/proj`) and run
/// `analyze` on the project root.
pub fn analyze(files: &[(&str, &str)]) -> Analyzer {
    let fs: Rc<dyn FileSystem> = Rc::new(MemoryFileSystem::with_files(files));
    let source = PythonAstSource::new(fs.clone(), "/tmp/pyscope/ast_cache".to_string())
        .expect("cache dir in memory fs");
    let mut analyzer = Analyzer::with_collaborators(AnalyzerOptions::default(), fs, Box::new(source));
    analyzer.analyze("/proj").expect("analysis");
    analyzer
}

/// All non-builtin bindings with the given name.
pub fn bindings_named<'a>(analyzer: &'a Analyzer, name: &str) -> Vec<(&'a Binding, BindingId)> {
    analyzer
        .all_bindings()
        .iter()
        .map(|&id| (analyzer.binding(id), id))
        .filter(|(b, _)| !b.builtin && b.name == name)
        .collect()
}

/// The single non-builtin binding with the given name.
pub fn binding_named<'a>(analyzer: &'a Analyzer, name: &str) -> &'a Binding {
    let found = bindings_named(analyzer, name);
    assert_eq!(found.len(), 1, "expected exactly one binding for {name}");
    found[0].0
}

/// Render the type of the named binding.
pub fn type_of(analyzer: &Analyzer, name: &str) -> String {
    let binding = binding_named(analyzer, name);
    analyzer.type_store().describe(binding.ty)
}
