//! Uniform Python AST consumed by the analysis core.
//!
//! The parser collaborator lowers `rustpython_ast` trees into this
//! representation (see [`crate::bridge`]). Every node carries a [`NodeId`]
//! and byte offsets; the analyzer's registries key on `NodeId`, so ids must
//! be unique within one analyzer run. Trees restored from the on-disk cache
//! are re-numbered through [`Module::renumber`] before use.

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// Identity of an AST node.
///
/// `NodeId::SYNTHETIC` marks nodes fabricated by the analyzer itself
/// (builtin bindings, package segments); those never enter the reference
/// registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const SYNTHETIC: NodeId = NodeId(0);

    pub fn is_synthetic(self) -> bool {
        self == NodeId::SYNTHETIC
    }

    /// Take the next id from a counter. Counters start at 1; 0 is reserved
    /// for synthetic nodes.
    pub fn fresh(next: &mut u32) -> NodeId {
        let id = NodeId(*next);
        *next += 1;
        id
    }
}

/// A named occurrence: definition names, attribute names, import aliases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ident {
    pub id: NodeId,
    pub name: String,
    pub start: u32,
    pub end: u32,
}

/// A parsed source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Module {
    pub id: NodeId,
    pub file: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stmt {
    pub id: NodeId,
    pub start: u32,
    pub end: u32,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StmtKind {
    FunctionDef(FunctionDef),
    ClassDef(ClassDef),
    /// `targets = value`. `value` is `None` for bare annotated declarations
    /// (`x: int`), which bind the name without a known value.
    Assign {
        targets: Vec<Expr>,
        value: Option<Expr>,
    },
    AugAssign {
        target: Expr,
        op: BinOp,
        value: Expr,
    },
    Return {
        value: Option<Expr>,
    },
    Expr {
        value: Expr,
    },
    Import {
        names: Vec<ImportAlias>,
    },
    ImportFrom {
        module: String,
        names: Vec<ImportAlias>,
        star: bool,
    },
    If {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    While {
        test: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    For {
        target: Expr,
        iter: Expr,
        body: Vec<Stmt>,
        orelse: Vec<Stmt>,
    },
    With {
        items: Vec<WithItem>,
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        handlers: Vec<ExceptHandler>,
        orelse: Vec<Stmt>,
        finalbody: Vec<Stmt>,
    },
    Raise {
        exc: Option<Expr>,
    },
    Assert {
        test: Expr,
        msg: Option<Expr>,
    },
    Delete {
        targets: Vec<Expr>,
    },
    Pass,
    Break,
    Continue,
}

/// `def name(params): body`, possibly decorated.
///
/// The body is reference-counted so function types can retain it for
/// re-analysis at later call sites without cloning the tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: Ident,
    pub params: SmallVec<[Param; 4]>,
    pub body: Rc<Vec<Stmt>>,
    pub decorators: Vec<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub default: Option<Box<Expr>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDef {
    pub name: Ident,
    pub bases: Vec<Expr>,
    pub body: Vec<Stmt>,
    pub decorators: Vec<Expr>,
}

/// One name in an `import` or `from … import` statement. For plain imports
/// `name` may be dotted (`os.path`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportAlias {
    pub name: Ident,
    pub asname: Option<Ident>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithItem {
    pub context: Expr,
    pub optional_vars: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExceptHandler {
    pub typ: Option<Expr>,
    pub name: Option<Ident>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    pub id: NodeId,
    pub start: u32,
    pub end: u32,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(Literal),
    Name(String),
    Attribute {
        value: Box<Expr>,
        attr: Ident,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
        keywords: Vec<Keyword>,
    },
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    BoolOp {
        values: Vec<Expr>,
    },
    Compare {
        left: Box<Expr>,
        comparators: Vec<Expr>,
    },
    List(Vec<Expr>),
    Tuple(Vec<Expr>),
    Set(Vec<Expr>),
    Dict {
        /// A `None` key is a `**mapping` splat.
        keys: Vec<Option<Expr>>,
        values: Vec<Expr>,
    },
    Subscript {
        value: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lower: Option<Box<Expr>>,
        upper: Option<Box<Expr>>,
        step: Option<Box<Expr>>,
    },
    Lambda {
        params: SmallVec<[Param; 4]>,
        body: Rc<Expr>,
    },
    IfExp {
        test: Box<Expr>,
        body: Box<Expr>,
        orelse: Box<Expr>,
    },
    Comp {
        kind: CompKind,
        /// Dict comprehensions carry the key here; `elt` is the value.
        key: Option<Box<Expr>>,
        elt: Box<Expr>,
        generators: Vec<Comprehension>,
    },
    Starred(Box<Expr>),
    Yield {
        value: Option<Box<Expr>>,
    },
    Await(Box<Expr>),
    /// An f-string; the parts are visited but the result is always `Str`.
    FString(Vec<Expr>),
    /// A construct the bridge does not model. Inferred as `Unknown`.
    Opaque,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comprehension {
    pub target: Expr,
    pub iter: Expr,
    pub ifs: Vec<Expr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompKind {
    List,
    Set,
    Dict,
    Generator,
}

/// Literal kinds. Only the kind participates in inference, so values are
/// not retained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Literal {
    Int,
    Float,
    Complex,
    Str,
    Bytes,
    Bool,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    MatMul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitAnd,
    BitOr,
    BitXor,
    LShift,
    RShift,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
    Invert,
}

impl Module {
    /// Re-assign every node id in the tree from `next_id`.
    ///
    /// Trees deserialized from the AST cache carry the ids they were written
    /// with; those may collide with ids already handed out in this run.
    pub fn renumber(&mut self, next_id: &mut u32) {
        self.id = NodeId::fresh(next_id);
        for stmt in &mut self.body {
            renumber_stmt(stmt, next_id);
        }
    }
}

fn renumber_ident(ident: &mut Ident, next: &mut u32) {
    ident.id = NodeId::fresh(next);
}

fn renumber_stmts(stmts: &mut [Stmt], next: &mut u32) {
    for stmt in stmts {
        renumber_stmt(stmt, next);
    }
}

fn renumber_stmt(stmt: &mut Stmt, next: &mut u32) {
    stmt.id = NodeId::fresh(next);
    match &mut stmt.kind {
        StmtKind::FunctionDef(def) => {
            renumber_ident(&mut def.name, next);
            for param in &mut def.params {
                renumber_ident(&mut param.name, next);
                if let Some(default) = &mut param.default {
                    renumber_expr(default, next);
                }
            }
            for dec in &mut def.decorators {
                renumber_expr(dec, next);
            }
            // Freshly deserialized bodies are unshared; a shared body means
            // the tree is already live and must not be renumbered.
            if let Some(body) = Rc::get_mut(&mut def.body) {
                renumber_stmts(body, next);
            }
        }
        StmtKind::ClassDef(def) => {
            renumber_ident(&mut def.name, next);
            for base in &mut def.bases {
                renumber_expr(base, next);
            }
            for dec in &mut def.decorators {
                renumber_expr(dec, next);
            }
            renumber_stmts(&mut def.body, next);
        }
        StmtKind::Assign { targets, value } => {
            for target in targets {
                renumber_expr(target, next);
            }
            if let Some(value) = value {
                renumber_expr(value, next);
            }
        }
        StmtKind::AugAssign { target, value, .. } => {
            renumber_expr(target, next);
            renumber_expr(value, next);
        }
        StmtKind::Return { value } => {
            if let Some(value) = value {
                renumber_expr(value, next);
            }
        }
        StmtKind::Expr { value } => renumber_expr(value, next),
        StmtKind::Import { names } => {
            for alias in names {
                renumber_ident(&mut alias.name, next);
                if let Some(asname) = &mut alias.asname {
                    renumber_ident(asname, next);
                }
            }
        }
        StmtKind::ImportFrom { names, .. } => {
            for alias in names {
                renumber_ident(&mut alias.name, next);
                if let Some(asname) = &mut alias.asname {
                    renumber_ident(asname, next);
                }
            }
        }
        StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
            renumber_expr(test, next);
            renumber_stmts(body, next);
            renumber_stmts(orelse, next);
        }
        StmtKind::For {
            target,
            iter,
            body,
            orelse,
        } => {
            renumber_expr(target, next);
            renumber_expr(iter, next);
            renumber_stmts(body, next);
            renumber_stmts(orelse, next);
        }
        StmtKind::With { items, body } => {
            for item in items {
                renumber_expr(&mut item.context, next);
                if let Some(vars) = &mut item.optional_vars {
                    renumber_expr(vars, next);
                }
            }
            renumber_stmts(body, next);
        }
        StmtKind::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            renumber_stmts(body, next);
            for handler in handlers {
                if let Some(typ) = &mut handler.typ {
                    renumber_expr(typ, next);
                }
                if let Some(name) = &mut handler.name {
                    renumber_ident(name, next);
                }
                renumber_stmts(&mut handler.body, next);
            }
            renumber_stmts(orelse, next);
            renumber_stmts(finalbody, next);
        }
        StmtKind::Raise { exc } => {
            if let Some(exc) = exc {
                renumber_expr(exc, next);
            }
        }
        StmtKind::Assert { test, msg } => {
            renumber_expr(test, next);
            if let Some(msg) = msg {
                renumber_expr(msg, next);
            }
        }
        StmtKind::Delete { targets } => {
            for target in targets {
                renumber_expr(target, next);
            }
        }
        StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
    }
}

fn renumber_expr(expr: &mut Expr, next: &mut u32) {
    expr.id = NodeId::fresh(next);
    match &mut expr.kind {
        ExprKind::Literal(_) | ExprKind::Name(_) | ExprKind::Opaque => {}
        ExprKind::Attribute { value, attr } => {
            renumber_expr(value, next);
            renumber_ident(attr, next);
        }
        ExprKind::Call {
            func,
            args,
            keywords,
        } => {
            renumber_expr(func, next);
            for arg in args {
                renumber_expr(arg, next);
            }
            for kw in keywords {
                renumber_expr(&mut kw.value, next);
            }
        }
        ExprKind::Binary { left, right, .. } => {
            renumber_expr(left, next);
            renumber_expr(right, next);
        }
        ExprKind::Unary { operand, .. } => renumber_expr(operand, next),
        ExprKind::BoolOp { values } => {
            for value in values {
                renumber_expr(value, next);
            }
        }
        ExprKind::Compare { left, comparators } => {
            renumber_expr(left, next);
            for cmp in comparators {
                renumber_expr(cmp, next);
            }
        }
        ExprKind::List(elems) | ExprKind::Tuple(elems) | ExprKind::Set(elems) | ExprKind::FString(elems) => {
            for elem in elems {
                renumber_expr(elem, next);
            }
        }
        ExprKind::Dict { keys, values } => {
            for key in keys.iter_mut().flatten() {
                renumber_expr(key, next);
            }
            for value in values {
                renumber_expr(value, next);
            }
        }
        ExprKind::Subscript { value, index } => {
            renumber_expr(value, next);
            renumber_expr(index, next);
        }
        ExprKind::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                renumber_expr(part, next);
            }
        }
        ExprKind::Lambda { params, body } => {
            for param in params {
                renumber_ident(&mut param.name, next);
                if let Some(default) = &mut param.default {
                    renumber_expr(default, next);
                }
            }
            if let Some(body) = Rc::get_mut(body) {
                renumber_expr(body, next);
            }
        }
        ExprKind::IfExp { test, body, orelse } => {
            renumber_expr(test, next);
            renumber_expr(body, next);
            renumber_expr(orelse, next);
        }
        ExprKind::Comp {
            key,
            elt,
            generators,
            ..
        } => {
            if let Some(key) = key {
                renumber_expr(key, next);
            }
            renumber_expr(elt, next);
            for gen in generators {
                renumber_expr(&mut gen.target, next);
                renumber_expr(&mut gen.iter, next);
                for cond in &mut gen.ifs {
                    renumber_expr(cond, next);
                }
            }
        }
        ExprKind::Starred(value) | ExprKind::Await(value) => renumber_expr(value, next),
        ExprKind::Yield { value } => {
            if let Some(value) = value {
                renumber_expr(value, next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name_expr(id: u32, name: &str) -> Expr {
        Expr {
            id: NodeId(id),
            start: 0,
            end: 0,
            kind: ExprKind::Name(name.to_string()),
        }
    }

    #[test]
    fn renumber_assigns_fresh_ids() {
        let mut module = Module {
            id: NodeId(1),
            file: "m.py".to_string(),
            body: vec![Stmt {
                id: NodeId(2),
                start: 0,
                end: 5,
                kind: StmtKind::Assign {
                    targets: vec![name_expr(3, "x")],
                    value: Some(Expr {
                        id: NodeId(4),
                        start: 4,
                        end: 5,
                        kind: ExprKind::Literal(Literal::Int),
                    }),
                },
            }],
        };

        let mut next = 100;
        module.renumber(&mut next);

        assert_eq!(module.id, NodeId(100));
        assert_eq!(module.body[0].id, NodeId(101));
        assert_eq!(next, 104);
    }

    #[test]
    fn synthetic_id_is_reserved() {
        let mut next = 1;
        let id = NodeId::fresh(&mut next);
        assert!(!id.is_synthetic());
        assert!(NodeId::SYNTHETIC.is_synthetic());
    }
}
