//! The type universe and its store.
//!
//! Types form a union lattice: `Unknown` is the identity of `union`, and
//! repeated widening reaches a fixed point because the lattice height is
//! bounded by the number of distinct structural types the program produces.
//!
//! Structural variants (lists, dicts, tuples, sets, instances, unions) are
//! interned, so equal structure implies equal [`TypeId`] and reference
//! equality is a valid equality test. Functions, classes and modules are
//! identity types: one fresh id per definition, with their mutable fields
//! (`ret`, `self_type`, `bases`) updated in place as inference learns more.

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::ast::{Expr, NodeId, Stmt};
use crate::scope::{ScopeId, ScopeKind, ScopeStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub u32);

#[derive(Debug, Clone)]
pub enum Type {
    Int,
    Float,
    Bool,
    Str,
    Bytes,
    NoneType,
    Complex,
    Unknown,
    List {
        elem: TypeId,
    },
    Dict {
        key: TypeId,
        value: TypeId,
    },
    Tuple {
        elems: Vec<TypeId>,
    },
    Set {
        elem: TypeId,
    },
    /// The (single, shared) instance type of a class. Its scope holds
    /// assigned attributes and forwards to the class scope.
    Instance {
        class: TypeId,
        scope: ScopeId,
    },
    Union {
        members: BTreeSet<TypeId>,
    },
    Fun(FunType),
    Class(ClassType),
    Module(ModuleType),
}

/// How a function body is carried for (re-)analysis at call sites.
#[derive(Debug, Clone)]
pub enum FunBody {
    Stmts(Rc<Vec<Stmt>>),
    Expr(Rc<Expr>),
    /// Seeded builtins have no analyzable body; application returns `ret`.
    Builtin,
}

#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub node: NodeId,
}

#[derive(Debug, Clone)]
pub struct FunType {
    pub def_node: Option<NodeId>,
    /// The declared scope holding the parameter bindings; call frames are
    /// shallow copies of it.
    pub scope: ScopeId,
    pub params: SmallVec<[ParamSpec; 4]>,
    pub defaults: Vec<TypeId>,
    pub ret: TypeId,
    /// Receiver type, populated when the function is reached through an
    /// instance attribute in call position.
    pub self_type: Option<TypeId>,
    pub body: FunBody,
    /// File the function was defined in; pushed while its body is analyzed
    /// so bindings created there are attributed correctly.
    pub file: String,
    pub builtin: bool,
}

#[derive(Debug, Clone)]
pub struct ClassType {
    pub name: String,
    pub scope: ScopeId,
    pub bases: Vec<TypeId>,
}

#[derive(Debug, Clone)]
pub struct ModuleType {
    pub name: String,
    pub qname: String,
    pub scope: ScopeId,
    pub file: Option<String>,
}

/// Intern key for structural types. Union members are kept sorted so the
/// key is canonical regardless of construction order.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TypeKey {
    List(TypeId),
    Dict(TypeId, TypeId),
    Tuple(Vec<TypeId>),
    Set(TypeId),
    Instance(TypeId),
    Union(Vec<TypeId>),
}

#[derive(Debug)]
pub struct TypeStore {
    types: Vec<Type>,
    intern: HashMap<TypeKey, TypeId>,
    pub int: TypeId,
    pub float: TypeId,
    pub boolean: TypeId,
    pub string: TypeId,
    pub bytes: TypeId,
    pub none: TypeId,
    pub complex: TypeId,
    pub unknown: TypeId,
}

impl TypeStore {
    pub fn new() -> Self {
        let mut store = TypeStore {
            types: Vec::new(),
            intern: HashMap::new(),
            int: TypeId(0),
            float: TypeId(0),
            boolean: TypeId(0),
            string: TypeId(0),
            bytes: TypeId(0),
            none: TypeId(0),
            complex: TypeId(0),
            unknown: TypeId(0),
        };
        store.int = store.alloc(Type::Int);
        store.float = store.alloc(Type::Float);
        store.boolean = store.alloc(Type::Bool);
        store.string = store.alloc(Type::Str);
        store.bytes = store.alloc(Type::Bytes);
        store.none = store.alloc(Type::NoneType);
        store.complex = store.alloc(Type::Complex);
        store.unknown = store.alloc(Type::Unknown);
        store
    }

    fn alloc(&mut self, ty: Type) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(ty);
        id
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut Type {
        &mut self.types[id.0 as usize]
    }

    fn interned(&mut self, key: TypeKey, make: impl FnOnce() -> Type) -> TypeId {
        if let Some(&id) = self.intern.get(&key) {
            return id;
        }
        let id = self.alloc(make());
        self.intern.insert(key, id);
        id
    }

    pub fn list_of(&mut self, elem: TypeId) -> TypeId {
        self.interned(TypeKey::List(elem), || Type::List { elem })
    }

    pub fn dict_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.interned(TypeKey::Dict(key, value), || Type::Dict { key, value })
    }

    pub fn tuple_of(&mut self, elems: Vec<TypeId>) -> TypeId {
        self.interned(TypeKey::Tuple(elems.clone()), || Type::Tuple { elems })
    }

    pub fn set_of(&mut self, elem: TypeId) -> TypeId {
        self.interned(TypeKey::Set(elem), || Type::Set { elem })
    }

    /// The shared instance type of `class`. The first request allocates the
    /// instance scope (forwarding to the class scope) exactly once.
    pub fn instance_of(&mut self, class: TypeId, scopes: &mut ScopeStore) -> TypeId {
        if let Some(&id) = self.intern.get(&TypeKey::Instance(class)) {
            return id;
        }
        let (class_scope, path) = match self.get(class) {
            Type::Class(c) => (c.scope, scopes.get(c.scope).path.clone()),
            _ => return self.unknown,
        };
        let scope = scopes.new_scope(None, ScopeKind::Instance, path);
        scopes.get_mut(scope).forwarding = Some(class_scope);
        let id = self.alloc(Type::Instance { class, scope });
        self.intern.insert(TypeKey::Instance(class), id);
        scopes.get_mut(scope).owner = Some(id);
        id
    }

    pub fn new_fun(&mut self, fun: FunType) -> TypeId {
        self.alloc(Type::Fun(fun))
    }

    pub fn new_class(&mut self, class: ClassType) -> TypeId {
        self.alloc(Type::Class(class))
    }

    pub fn new_module(&mut self, module: ModuleType) -> TypeId {
        self.alloc(Type::Module(module))
    }

    /// The monotone join. `Unknown` is the identity; nested unions flatten;
    /// a singleton result collapses back to its member.
    pub fn union(&mut self, a: TypeId, b: TypeId) -> TypeId {
        if a == b {
            return a;
        }
        if a == self.unknown {
            return b;
        }
        if b == self.unknown {
            return a;
        }
        let mut members = BTreeSet::new();
        self.flatten_into(a, &mut members);
        self.flatten_into(b, &mut members);
        members.remove(&self.unknown);
        match members.len() {
            0 => self.unknown,
            1 => *members.iter().next().expect("non-empty"),
            _ => {
                let key: Vec<TypeId> = members.iter().copied().collect();
                self.interned(TypeKey::Union(key), || Type::Union { members })
            }
        }
    }

    pub fn union_all(&mut self, ids: impl IntoIterator<Item = TypeId>) -> TypeId {
        let mut acc = self.unknown;
        for id in ids {
            acc = self.union(acc, id);
        }
        acc
    }

    fn flatten_into(&self, id: TypeId, out: &mut BTreeSet<TypeId>) {
        match self.get(id) {
            Type::Union { members } => {
                for &member in members {
                    out.insert(member);
                }
            }
            _ => {
                out.insert(id);
            }
        }
    }

    /// Constituents of a type: union members, or the type itself.
    pub fn constituents(&self, id: TypeId) -> Vec<TypeId> {
        match self.get(id) {
            Type::Union { members } => members.iter().copied().collect(),
            _ => vec![id],
        }
    }

    /// The namespace a type introduces, if any.
    pub fn scope_of(&self, id: TypeId) -> Option<ScopeId> {
        match self.get(id) {
            Type::Class(c) => Some(c.scope),
            Type::Module(m) => Some(m.scope),
            Type::Instance { scope, .. } => Some(*scope),
            Type::Fun(f) => Some(f.scope),
            _ => None,
        }
    }

    pub fn is_unknown(&self, id: TypeId) -> bool {
        id == self.unknown
    }

    pub fn as_fun(&self, id: TypeId) -> Option<&FunType> {
        match self.get(id) {
            Type::Fun(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_fun_mut(&mut self, id: TypeId) -> Option<&mut FunType> {
        match self.get_mut(id) {
            Type::Fun(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_class(&self, id: TypeId) -> Option<&ClassType> {
        match self.get(id) {
            Type::Class(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_module(&self, id: TypeId) -> Option<&ModuleType> {
        match self.get(id) {
            Type::Module(m) => Some(m),
            _ => None,
        }
    }

    /// Human-readable rendering for summaries and tests.
    pub fn describe(&self, id: TypeId) -> String {
        self.describe_depth(id, 0)
    }

    fn describe_depth(&self, id: TypeId, depth: usize) -> String {
        if depth > 6 {
            return "…".to_string();
        }
        match self.get(id) {
            Type::Int => "int".to_string(),
            Type::Float => "float".to_string(),
            Type::Bool => "bool".to_string(),
            Type::Str => "str".to_string(),
            Type::Bytes => "bytes".to_string(),
            Type::NoneType => "None".to_string(),
            Type::Complex => "complex".to_string(),
            Type::Unknown => "?".to_string(),
            Type::List { elem } => format!("list[{}]", self.describe_depth(*elem, depth + 1)),
            Type::Dict { key, value } => format!(
                "dict[{}, {}]",
                self.describe_depth(*key, depth + 1),
                self.describe_depth(*value, depth + 1)
            ),
            Type::Tuple { elems } => {
                let parts: Vec<String> = elems.iter().map(|e| self.describe_depth(*e, depth + 1)).collect();
                format!("tuple[{}]", parts.join(", "))
            }
            Type::Set { elem } => format!("set[{}]", self.describe_depth(*elem, depth + 1)),
            Type::Instance { class, .. } => match self.get(*class) {
                Type::Class(c) => c.name.clone(),
                _ => "?".to_string(),
            },
            Type::Union { members } => {
                let parts: Vec<String> = members.iter().map(|m| self.describe_depth(*m, depth + 1)).collect();
                format!("Union[{}]", parts.join(", "))
            }
            Type::Fun(f) => {
                let params: Vec<&str> = f.params.iter().map(|p| p.name.as_str()).collect();
                format!(
                    "fn({}) -> {}",
                    params.join(", "),
                    self.describe_depth(f.ret, depth + 1)
                )
            }
            Type::Class(c) => format!("class {}", c.name),
            Type::Module(m) => format!("module {}", m.qname),
        }
    }
}

impl Default for TypeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_interned_once() {
        let store = TypeStore::new();
        assert_ne!(store.int, store.string);
        assert!(matches!(store.get(store.int), Type::Int));
    }

    #[test]
    fn structural_interning_gives_identity() {
        let mut store = TypeStore::new();
        let a = store.list_of(store.int);
        let b = store.list_of(store.int);
        assert_eq!(a, b);
        let c = store.list_of(store.string);
        assert_ne!(a, c);
    }

    #[test]
    fn union_is_idempotent_and_unknown_is_identity() {
        let mut store = TypeStore::new();
        assert_eq!(store.union(store.int, store.int), store.int);
        assert_eq!(store.union(store.unknown, store.string), store.string);
        assert_eq!(store.union(store.string, store.unknown), store.string);
    }

    #[test]
    fn union_flattens_and_is_commutative() {
        let mut store = TypeStore::new();
        let ab = store.union(store.int, store.string);
        let ba = store.union(store.string, store.int);
        assert_eq!(ab, ba);

        let abc = store.union(ab, store.float);
        let acb = {
            let ac = store.union(store.int, store.float);
            store.union(ac, store.string)
        };
        assert_eq!(abc, acb);
        match store.get(abc) {
            Type::Union { members } => assert_eq!(members.len(), 3),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn union_is_associative() {
        let mut store = TypeStore::new();
        let bc = store.union(store.string, store.float);
        let a_bc = store.union(store.int, bc);
        let ab = store.union(store.int, store.string);
        let ab_c = store.union(ab, store.float);
        assert_eq!(a_bc, ab_c);
    }

    #[test]
    fn singleton_union_collapses() {
        let mut store = TypeStore::new();
        let ab = store.union(store.int, store.string);
        let again = store.union(ab, store.int);
        assert_eq!(ab, again);
    }

    #[test]
    fn describe_renders_compound_types() {
        let mut store = TypeStore::new();
        let list = store.list_of(store.int);
        assert_eq!(store.describe(list), "list[int]");
        let union = store.union(store.int, store.string);
        assert_eq!(store.describe(union), "Union[int, str]");
    }
}
