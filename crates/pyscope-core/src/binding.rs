//! Definition-site records.
//!
//! A [`Binding`] is created once per definition site; afterwards only its
//! type may widen (by union) and its reference set may grow. All bindings
//! live in the analyzer's [`BindingStore`] and are listed in creation order
//! for deterministic reporting.

use indexmap::IndexSet;

use crate::ast::NodeId;
use crate::types::TypeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingKind {
    Module,
    Class,
    Method,
    Constructor,
    Function,
    Attribute,
    Variable,
    Parameter,
    Scope,
    Alias,
}

impl BindingKind {
    /// Kinds that carry a value rather than introduce a namespace;
    /// re-assignment widens these in place instead of adding an overload.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            BindingKind::Variable | BindingKind::Parameter | BindingKind::Attribute
        )
    }
}

#[derive(Debug)]
pub struct Binding {
    pub name: String,
    pub node: NodeId,
    pub file: String,
    pub start: u32,
    pub end: u32,
    pub ty: TypeId,
    pub kind: BindingKind,
    pub refs: IndexSet<NodeId>,
    pub builtin: bool,
    pub synthetic: bool,
}

impl Binding {
    /// Whether any node other than the definition itself refers to this
    /// binding.
    pub fn is_referenced(&self) -> bool {
        self.refs.iter().any(|&node| node != self.node)
    }
}

#[derive(Debug, Default)]
pub struct BindingStore {
    bindings: Vec<Binding>,
}

impl BindingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, binding: Binding) -> BindingId {
        let id = BindingId(self.bindings.len() as u32);
        self.bindings.push(binding);
        id
    }

    pub fn get(&self, id: BindingId) -> &Binding {
        &self.bindings[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: BindingId) -> &mut Binding {
        &mut self.bindings[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_check_ignores_the_definition_site() {
        let mut store = BindingStore::new();
        let id = store.alloc(Binding {
            name: "x".to_string(),
            node: NodeId(7),
            file: "m.py".to_string(),
            start: 0,
            end: 1,
            ty: TypeId(0),
            kind: BindingKind::Variable,
            refs: IndexSet::new(),
            builtin: false,
            synthetic: false,
        });
        store.get_mut(id).refs.insert(NodeId(7));
        assert!(!store.get(id).is_referenced());
        store.get_mut(id).refs.insert(NodeId(9));
        assert!(store.get(id).is_referenced());
    }
}
