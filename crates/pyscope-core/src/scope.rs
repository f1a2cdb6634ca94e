//! Lexical symbol tables.
//!
//! A [`Scope`] maps names to *sets* of bindings: re-assignment widens a
//! value binding in place, while overloaded definitions (several `def`s of
//! one name) retain separate bindings so cross-references resolve to the
//! right origin. Scopes form a parent chain for lexical lookup, with two
//! extra edges: class scopes consult their base classes during attribute
//! lookup, and instance scopes forward to their class.

use indexmap::IndexMap;

use crate::binding::{BindingId, BindingStore};
use crate::types::{Type, TypeId, TypeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Global,
    Module,
    Class,
    Function,
    Instance,
    Block,
}

#[derive(Debug, Clone)]
pub struct Scope {
    pub table: IndexMap<String, Vec<BindingId>>,
    pub parent: Option<ScopeId>,
    /// Delegate consulted after a local miss (instance → class).
    pub forwarding: Option<ScopeId>,
    pub kind: ScopeKind,
    /// Dotted qualified name of this namespace.
    pub path: String,
    /// The type whose namespace this is, once known.
    pub owner: Option<TypeId>,
}

#[derive(Debug, Default)]
pub struct ScopeStore {
    scopes: Vec<Scope>,
}

impl ScopeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_scope(&mut self, parent: Option<ScopeId>, kind: ScopeKind, path: String) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            table: IndexMap::new(),
            parent,
            forwarding: None,
            kind,
            path,
            owner: None,
        });
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Shallow clone for call frames: the table (sharing binding ids) and
    /// all edges are copied, so re-binding a formal widens the declared
    /// parameter binding.
    pub fn copy(&mut self, id: ScopeId) -> ScopeId {
        let clone = self.get(id).clone();
        let new_id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(clone);
        new_id
    }

    pub fn lookup_local(&self, scope: ScopeId, name: &str) -> Option<Vec<BindingId>> {
        self.get(scope).table.get(name).cloned()
    }

    /// Lexical lookup: the starting scope, then the parent chain. Class
    /// scopes are skipped while climbing — names in a class body are not
    /// free variables of the methods nested inside it.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<Vec<BindingId>> {
        let mut current = Some(scope);
        let mut first = true;
        while let Some(id) = current {
            let s = self.get(id);
            if first || s.kind != ScopeKind::Class {
                if let Some(found) = s.table.get(name) {
                    return Some(found.clone());
                }
            }
            first = false;
            current = s.parent;
        }
        None
    }

    /// Attribute lookup: the scope's own table, then base classes
    /// left-to-right (transitively) for class scopes, then the forwarding
    /// delegate. Cyclic base lists terminate via the visited set.
    pub fn lookup_attribute(
        &self,
        types: &TypeStore,
        scope: ScopeId,
        name: &str,
    ) -> Option<Vec<BindingId>> {
        let mut seen = Vec::new();
        self.lookup_attribute_guarded(types, scope, name, &mut seen)
    }

    fn lookup_attribute_guarded(
        &self,
        types: &TypeStore,
        scope: ScopeId,
        name: &str,
        seen: &mut Vec<ScopeId>,
    ) -> Option<Vec<BindingId>> {
        if seen.contains(&scope) {
            return None;
        }
        seen.push(scope);
        let s = self.get(scope);
        if let Some(found) = s.table.get(name) {
            return Some(found.clone());
        }
        if s.kind == ScopeKind::Class {
            if let Some(owner) = s.owner {
                if let Type::Class(class) = types.get(owner) {
                    for &base in &class.bases {
                        if let Some(base_scope) = types.scope_of(base) {
                            if let Some(found) =
                                self.lookup_attribute_guarded(types, base_scope, name, seen)
                            {
                                return Some(found);
                            }
                        }
                    }
                }
            }
        }
        if let Some(forward) = s.forwarding {
            return self.lookup_attribute_guarded(types, forward, name, seen);
        }
        None
    }

    /// Qualified lookup. A whole-string local hit wins (module registries
    /// key full qualified names); otherwise the head resolves lexically and
    /// each remaining segment descends into the scopes of the resolved
    /// types.
    pub fn lookup_qname(
        &self,
        types: &TypeStore,
        bindings: &BindingStore,
        scope: ScopeId,
        qname: &str,
    ) -> Option<Vec<BindingId>> {
        if let Some(found) = self.lookup_local(scope, qname) {
            return Some(found);
        }
        let mut segments = qname.split('.');
        let head = segments.next()?;
        let mut current = self.lookup(scope, head)?;
        for segment in segments {
            let mut next = Vec::new();
            for &binding in &current {
                let ty = bindings.get(binding).ty;
                if let Some(target) = types.scope_of(ty) {
                    if let Some(found) = self.lookup_local(target, segment) {
                        for id in found {
                            if !next.contains(&id) {
                                next.push(id);
                            }
                        }
                    }
                }
            }
            if next.is_empty() {
                return None;
            }
            current = next;
        }
        Some(current)
    }

    /// Union another scope's entries into `dst` (import-star, base-class
    /// mixin). Existing entries keep their position; new ids append.
    pub fn merge(&mut self, dst: ScopeId, src: ScopeId) {
        let entries: Vec<(String, Vec<BindingId>)> = self
            .get(src)
            .table
            .iter()
            .map(|(name, ids)| (name.clone(), ids.clone()))
            .collect();
        let table = &mut self.get_mut(dst).table;
        for (name, ids) in entries {
            let slot = table.entry(name).or_default();
            for id in ids {
                if !slot.contains(&id) {
                    slot.push(id);
                }
            }
        }
    }

    pub fn set_path(&mut self, scope: ScopeId, path: String) {
        self.get_mut(scope).path = path;
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}
