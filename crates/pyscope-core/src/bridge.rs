//! Lowering from `rustpython_ast` trees to the uniform AST.
//!
//! The lowering is total: constructs the analyzer does not model become
//! [`ExprKind::Opaque`] or `Pass` rather than failing the parse. Node ids
//! are taken from the caller's counter so that every tree handed to one
//! analyzer run has disjoint ids.

use rustpython_ast as py;
use rustpython_ast::Ranged;
use smallvec::SmallVec;
use std::rc::Rc;

use crate::ast::{
    BinOp, ClassDef, CompKind, Comprehension, ExceptHandler, Expr, ExprKind, FunctionDef, Ident,
    ImportAlias, Keyword, Literal, Module, NodeId, Param, Stmt, StmtKind, UnaryOp, WithItem,
};

/// Lower a parsed suite into a [`Module`] for `file`.
pub fn lower_module(body: py::Suite, file: &str, next_id: &mut u32) -> Module {
    Module {
        id: NodeId::fresh(next_id),
        file: file.to_string(),
        body: lower_stmts(body, next_id),
    }
}

fn span(node: &impl Ranged) -> (u32, u32) {
    let range = node.range();
    (u32::from(range.start()), u32::from(range.end()))
}

fn ident(name: &py::Identifier, range: py::text_size::TextRange, next: &mut u32) -> Ident {
    let start = u32::from(range.start());
    let end = u32::from(range.end());
    Ident {
        id: NodeId::fresh(next),
        name: name.to_string(),
        start,
        end,
    }
}

fn lower_stmts(stmts: Vec<py::Stmt>, next: &mut u32) -> Vec<Stmt> {
    stmts.into_iter().map(|s| lower_stmt(s, next)).collect()
}

fn lower_params(args: py::Arguments, next: &mut u32) -> SmallVec<[Param; 4]> {
    let mut params = SmallVec::new();
    for arg in args.posonlyargs.into_iter().chain(args.args).chain(args.kwonlyargs) {
        params.push(Param {
            name: ident(&arg.def.arg, arg.def.range, next),
            default: arg.default.map(|d| Box::new(lower_expr(*d, next))),
        });
    }
    // *args / **kwargs participate as plain names; their container types
    // are not modeled.
    for extra in [args.vararg, args.kwarg].into_iter().flatten() {
        params.push(Param {
            name: ident(&extra.arg, extra.range, next),
            default: None,
        });
    }
    params
}

fn lower_aliases(names: Vec<py::Alias>, next: &mut u32) -> (Vec<ImportAlias>, bool) {
    let mut aliases = Vec::new();
    let mut star = false;
    for alias in names {
        if alias.name.as_str() == "*" {
            star = true;
            continue;
        }
        aliases.push(ImportAlias {
            name: ident(&alias.name, alias.range, next),
            asname: alias.asname.map(|a| ident(&a, alias.range, next)),
        });
    }
    (aliases, star)
}

fn lower_stmt(stmt: py::Stmt, next: &mut u32) -> Stmt {
    let (start, end) = span(&stmt);
    let id = NodeId::fresh(next);
    let kind = match stmt {
        py::Stmt::FunctionDef(py::StmtFunctionDef {
            range,
            name,
            args,
            body,
            decorator_list,
            ..
        }) => StmtKind::FunctionDef(FunctionDef {
            name: ident(&name, range, next),
            params: lower_params(*args, next),
            body: Rc::new(lower_stmts(body, next)),
            decorators: lower_exprs(decorator_list, next),
        }),
        py::Stmt::AsyncFunctionDef(py::StmtAsyncFunctionDef {
            range,
            name,
            args,
            body,
            decorator_list,
            ..
        }) => StmtKind::FunctionDef(FunctionDef {
            name: ident(&name, range, next),
            params: lower_params(*args, next),
            body: Rc::new(lower_stmts(body, next)),
            decorators: lower_exprs(decorator_list, next),
        }),
        py::Stmt::ClassDef(py::StmtClassDef {
            range,
            name,
            bases,
            body,
            decorator_list,
            ..
        }) => StmtKind::ClassDef(ClassDef {
            name: ident(&name, range, next),
            bases: lower_exprs(bases, next),
            body: lower_stmts(body, next),
            decorators: lower_exprs(decorator_list, next),
        }),
        py::Stmt::Assign(py::StmtAssign { targets, value, .. }) => StmtKind::Assign {
            targets: lower_exprs(targets, next),
            value: Some(lower_expr(*value, next)),
        },
        py::Stmt::AnnAssign(py::StmtAnnAssign { target, value, .. }) => StmtKind::Assign {
            targets: vec![lower_expr(*target, next)],
            value: value.map(|v| lower_expr(*v, next)),
        },
        py::Stmt::AugAssign(py::StmtAugAssign {
            target, op, value, ..
        }) => StmtKind::AugAssign {
            target: lower_expr(*target, next),
            op: lower_binop(op),
            value: lower_expr(*value, next),
        },
        py::Stmt::Return(py::StmtReturn { value, .. }) => StmtKind::Return {
            value: value.map(|v| lower_expr(*v, next)),
        },
        py::Stmt::Expr(py::StmtExpr { value, .. }) => StmtKind::Expr {
            value: lower_expr(*value, next),
        },
        py::Stmt::Import(py::StmtImport { names, .. }) => {
            let (names, _) = lower_aliases(names, next);
            StmtKind::Import { names }
        }
        py::Stmt::ImportFrom(py::StmtImportFrom { module, names, .. }) => {
            let (names, star) = lower_aliases(names, next);
            StmtKind::ImportFrom {
                module: module.map(|m| m.to_string()).unwrap_or_default(),
                names,
                star,
            }
        }
        py::Stmt::If(py::StmtIf {
            test, body, orelse, ..
        }) => StmtKind::If {
            test: lower_expr(*test, next),
            body: lower_stmts(body, next),
            orelse: lower_stmts(orelse, next),
        },
        py::Stmt::While(py::StmtWhile {
            test, body, orelse, ..
        }) => StmtKind::While {
            test: lower_expr(*test, next),
            body: lower_stmts(body, next),
            orelse: lower_stmts(orelse, next),
        },
        py::Stmt::For(py::StmtFor {
            target,
            iter,
            body,
            orelse,
            ..
        }) => StmtKind::For {
            target: lower_expr(*target, next),
            iter: lower_expr(*iter, next),
            body: lower_stmts(body, next),
            orelse: lower_stmts(orelse, next),
        },
        py::Stmt::AsyncFor(py::StmtAsyncFor {
            target,
            iter,
            body,
            orelse,
            ..
        }) => StmtKind::For {
            target: lower_expr(*target, next),
            iter: lower_expr(*iter, next),
            body: lower_stmts(body, next),
            orelse: lower_stmts(orelse, next),
        },
        py::Stmt::With(py::StmtWith { items, body, .. }) => StmtKind::With {
            items: lower_with_items(items, next),
            body: lower_stmts(body, next),
        },
        py::Stmt::AsyncWith(py::StmtAsyncWith { items, body, .. }) => StmtKind::With {
            items: lower_with_items(items, next),
            body: lower_stmts(body, next),
        },
        py::Stmt::Try(py::StmtTry {
            body,
            handlers,
            orelse,
            finalbody,
            ..
        }) => StmtKind::Try {
            body: lower_stmts(body, next),
            handlers: lower_handlers(handlers, next),
            orelse: lower_stmts(orelse, next),
            finalbody: lower_stmts(finalbody, next),
        },
        py::Stmt::Raise(py::StmtRaise { exc, .. }) => StmtKind::Raise {
            exc: exc.map(|e| lower_expr(*e, next)),
        },
        py::Stmt::Assert(py::StmtAssert { test, msg, .. }) => StmtKind::Assert {
            test: lower_expr(*test, next),
            msg: msg.map(|m| lower_expr(*m, next)),
        },
        py::Stmt::Delete(py::StmtDelete { targets, .. }) => StmtKind::Delete {
            targets: lower_exprs(targets, next),
        },
        py::Stmt::Pass(_) => StmtKind::Pass,
        py::Stmt::Break(_) => StmtKind::Break,
        py::Stmt::Continue(_) => StmtKind::Continue,
        // Global/nonlocal declarations, match statements and the rest do
        // not affect the binding model here.
        _ => StmtKind::Pass,
    };
    Stmt {
        id,
        start,
        end,
        kind,
    }
}

fn lower_with_items(items: Vec<py::WithItem>, next: &mut u32) -> Vec<WithItem> {
    items
        .into_iter()
        .map(|item| WithItem {
            context: lower_expr(item.context_expr, next),
            optional_vars: item.optional_vars.map(|v| lower_expr(*v, next)),
        })
        .collect()
}

fn lower_handlers(handlers: Vec<py::ExceptHandler>, next: &mut u32) -> Vec<ExceptHandler> {
    handlers
        .into_iter()
        .map(|handler| {
            let py::ExceptHandler::ExceptHandler(h) = handler;
            ExceptHandler {
                typ: h.type_.map(|t| lower_expr(*t, next)),
                name: h.name.map(|n| ident(&n, h.range, next)),
                body: lower_stmts(h.body, next),
            }
        })
        .collect()
}

fn lower_exprs(exprs: Vec<py::Expr>, next: &mut u32) -> Vec<Expr> {
    exprs.into_iter().map(|e| lower_expr(e, next)).collect()
}

fn lower_expr(expr: py::Expr, next: &mut u32) -> Expr {
    let (start, end) = span(&expr);
    let id = NodeId::fresh(next);
    let kind = match expr {
        py::Expr::Constant(py::ExprConstant { value, .. }) => match value {
            py::Constant::None => ExprKind::Literal(Literal::None),
            py::Constant::Bool(_) => ExprKind::Literal(Literal::Bool),
            py::Constant::Str(_) => ExprKind::Literal(Literal::Str),
            py::Constant::Bytes(_) => ExprKind::Literal(Literal::Bytes),
            py::Constant::Int(_) => ExprKind::Literal(Literal::Int),
            py::Constant::Float(_) => ExprKind::Literal(Literal::Float),
            py::Constant::Complex { .. } => ExprKind::Literal(Literal::Complex),
            _ => ExprKind::Opaque,
        },
        py::Expr::Name(py::ExprName { id: name, .. }) => ExprKind::Name(name.to_string()),
        py::Expr::Attribute(py::ExprAttribute {
            range, value, attr, ..
        }) => ExprKind::Attribute {
            value: Box::new(lower_expr(*value, next)),
            attr: ident(&attr, range, next),
        },
        py::Expr::Call(py::ExprCall {
            func,
            args,
            keywords,
            ..
        }) => ExprKind::Call {
            func: Box::new(lower_expr(*func, next)),
            args: lower_exprs(args, next),
            keywords: keywords
                .into_iter()
                .map(|kw| Keyword {
                    name: kw.arg.map(|a| a.to_string()),
                    value: lower_expr(kw.value, next),
                })
                .collect(),
        },
        py::Expr::BinOp(py::ExprBinOp {
            left, op, right, ..
        }) => ExprKind::Binary {
            op: lower_binop(op),
            left: Box::new(lower_expr(*left, next)),
            right: Box::new(lower_expr(*right, next)),
        },
        py::Expr::UnaryOp(py::ExprUnaryOp { op, operand, .. }) => ExprKind::Unary {
            op: match op {
                py::UnaryOp::Not => UnaryOp::Not,
                py::UnaryOp::USub => UnaryOp::Neg,
                py::UnaryOp::UAdd => UnaryOp::Pos,
                py::UnaryOp::Invert => UnaryOp::Invert,
            },
            operand: Box::new(lower_expr(*operand, next)),
        },
        py::Expr::BoolOp(py::ExprBoolOp { values, .. }) => ExprKind::BoolOp {
            values: lower_exprs(values, next),
        },
        py::Expr::Compare(py::ExprCompare {
            left, comparators, ..
        }) => ExprKind::Compare {
            left: Box::new(lower_expr(*left, next)),
            comparators: lower_exprs(comparators, next),
        },
        py::Expr::List(py::ExprList { elts, .. }) => ExprKind::List(lower_exprs(elts, next)),
        py::Expr::Tuple(py::ExprTuple { elts, .. }) => ExprKind::Tuple(lower_exprs(elts, next)),
        py::Expr::Set(py::ExprSet { elts, .. }) => ExprKind::Set(lower_exprs(elts, next)),
        py::Expr::Dict(py::ExprDict { keys, values, .. }) => ExprKind::Dict {
            keys: keys
                .into_iter()
                .map(|k| k.map(|k| lower_expr(k, next)))
                .collect(),
            values: lower_exprs(values, next),
        },
        py::Expr::Subscript(py::ExprSubscript { value, slice, .. }) => ExprKind::Subscript {
            value: Box::new(lower_expr(*value, next)),
            index: Box::new(lower_expr(*slice, next)),
        },
        py::Expr::Slice(py::ExprSlice {
            lower, upper, step, ..
        }) => ExprKind::Slice {
            lower: lower.map(|e| Box::new(lower_expr(*e, next))),
            upper: upper.map(|e| Box::new(lower_expr(*e, next))),
            step: step.map(|e| Box::new(lower_expr(*e, next))),
        },
        py::Expr::Lambda(py::ExprLambda { args, body, .. }) => ExprKind::Lambda {
            params: lower_params(*args, next),
            body: Rc::new(lower_expr(*body, next)),
        },
        py::Expr::IfExp(py::ExprIfExp {
            test, body, orelse, ..
        }) => ExprKind::IfExp {
            test: Box::new(lower_expr(*test, next)),
            body: Box::new(lower_expr(*body, next)),
            orelse: Box::new(lower_expr(*orelse, next)),
        },
        py::Expr::ListComp(py::ExprListComp {
            elt, generators, ..
        }) => lower_comp(CompKind::List, None, *elt, generators, next),
        py::Expr::SetComp(py::ExprSetComp {
            elt, generators, ..
        }) => lower_comp(CompKind::Set, None, *elt, generators, next),
        py::Expr::GeneratorExp(py::ExprGeneratorExp {
            elt, generators, ..
        }) => lower_comp(CompKind::Generator, None, *elt, generators, next),
        py::Expr::DictComp(py::ExprDictComp {
            key,
            value,
            generators,
            ..
        }) => lower_comp(CompKind::Dict, Some(*key), *value, generators, next),
        py::Expr::Starred(py::ExprStarred { value, .. }) => {
            ExprKind::Starred(Box::new(lower_expr(*value, next)))
        }
        py::Expr::Yield(py::ExprYield { value, .. }) => ExprKind::Yield {
            value: value.map(|v| Box::new(lower_expr(*v, next))),
        },
        py::Expr::YieldFrom(py::ExprYieldFrom { value, .. }) => ExprKind::Yield {
            value: Some(Box::new(lower_expr(*value, next))),
        },
        py::Expr::Await(py::ExprAwait { value, .. }) => {
            ExprKind::Await(Box::new(lower_expr(*value, next)))
        }
        py::Expr::JoinedStr(py::ExprJoinedStr { values, .. }) => {
            ExprKind::FString(lower_exprs(values, next))
        }
        py::Expr::FormattedValue(py::ExprFormattedValue { value, .. }) => {
            return lower_expr(*value, next);
        }
        py::Expr::NamedExpr(py::ExprNamedExpr { value, .. }) => {
            return lower_expr(*value, next);
        }
        _ => ExprKind::Opaque,
    };
    Expr {
        id,
        start,
        end,
        kind,
    }
}

fn lower_comp(
    kind: CompKind,
    key: Option<py::Expr>,
    elt: py::Expr,
    generators: Vec<py::Comprehension>,
    next: &mut u32,
) -> ExprKind {
    ExprKind::Comp {
        kind,
        key: key.map(|k| Box::new(lower_expr(k, next))),
        elt: Box::new(lower_expr(elt, next)),
        generators: generators
            .into_iter()
            .map(|gen| Comprehension {
                target: lower_expr(gen.target, next),
                iter: lower_expr(gen.iter, next),
                ifs: lower_exprs(gen.ifs, next),
            })
            .collect(),
    }
}

fn lower_binop(op: py::Operator) -> BinOp {
    match op {
        py::Operator::Add => BinOp::Add,
        py::Operator::Sub => BinOp::Sub,
        py::Operator::Mult => BinOp::Mul,
        py::Operator::MatMult => BinOp::MatMul,
        py::Operator::Div => BinOp::Div,
        py::Operator::Mod => BinOp::Mod,
        py::Operator::Pow => BinOp::Pow,
        py::Operator::LShift => BinOp::LShift,
        py::Operator::RShift => BinOp::RShift,
        py::Operator::BitOr => BinOp::BitOr,
        py::Operator::BitXor => BinOp::BitXor,
        py::Operator::BitAnd => BinOp::BitAnd,
        py::Operator::FloorDiv => BinOp::FloorDiv,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rustpython_parser::Parse;

    fn lower(source: &str) -> Module {
        let suite = py::Suite::parse(source, "<test>").expect("parse");
        let mut next = 1;
        lower_module(suite, "test.py", &mut next)
    }

    #[test]
    fn lowers_assignment() {
        let module = lower("x = 1\n");
        assert_eq!(module.body.len(), 1);
        match &module.body[0].kind {
            StmtKind::Assign { targets, value } => {
                assert!(matches!(targets[0].kind, ExprKind::Name(ref n) if n == "x"));
                assert!(matches!(
                    value.as_ref().map(|v| &v.kind),
                    Some(ExprKind::Literal(Literal::Int))
                ));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }

    #[test]
    fn lowers_function_def_with_defaults() {
        let module = lower("def f(a, b=1):\n    return a\n");
        match &module.body[0].kind {
            StmtKind::FunctionDef(def) => {
                assert_eq!(def.name.name, "f");
                assert_eq!(def.params.len(), 2);
                assert!(def.params[0].default.is_none());
                assert!(def.params[1].default.is_some());
                assert_eq!(def.body.len(), 1);
            }
            other => panic!("expected def, got {other:?}"),
        }
    }

    #[test]
    fn lowers_star_import() {
        let module = lower("from os import *\n");
        match &module.body[0].kind {
            StmtKind::ImportFrom { module, names, star } => {
                assert_eq!(module, "os");
                assert!(names.is_empty());
                assert!(star);
            }
            other => panic!("expected import-from, got {other:?}"),
        }
    }

    #[test]
    fn ids_are_unique() {
        let module = lower("def f(a):\n    return a + 1\nf(2)\n");
        let mut seen = std::collections::HashSet::new();
        // Walk a few known ids; full uniqueness is guaranteed by the counter.
        assert!(seen.insert(module.id));
        for stmt in &module.body {
            assert!(seen.insert(stmt.id));
        }
    }

    #[test]
    fn unsupported_constructs_become_opaque() {
        let module = lower("x = ...\n");
        match &module.body[0].kind {
            StmtKind::Assign { value, .. } => {
                assert!(matches!(value.as_ref().map(|v| &v.kind), Some(ExprKind::Opaque)));
            }
            other => panic!("expected assign, got {other:?}"),
        }
    }
}
