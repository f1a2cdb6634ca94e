//! The inference driver.
//!
//! Walks the uniform AST in a scope, returning a type per expression and
//! mutating the analyzer's scopes and registries as it goes. The walk is
//! flow-insensitive: branches all contribute, conditional re-assignment
//! widens by union.
//!
//! Function bodies are analyzed at call sites, not at definition sites; a
//! definition only allocates the function's scope, parameter bindings and
//! type, and enqueues it as uncalled. Cyclic applications short-circuit on
//! the `(function, argument types)` call key and return the type assumed
//! so far, which the outer fixed point then widens.

use std::rc::Rc;

use crate::analyzer::{Analyzer, CallKey, RetFrame};
use crate::ast::{
    BinOp, ClassDef, CompKind, Expr, ExprKind, FunctionDef, Ident, Literal, Module, NodeId, Stmt,
    StmtKind, UnaryOp,
};
use crate::binding::BindingKind;
use crate::scope::{ScopeId, ScopeKind};
use crate::types::{ClassType, FunBody, FunType, ModuleType, ParamSpec, Type, TypeId};

impl Analyzer {
    /// Analyze a parsed file, producing its `Module` type. The module is
    /// installed in the root module scope under `qname` *before* its body
    /// runs, so cyclic importers observe the partially-built module.
    pub(crate) fn infer_module(&mut self, ast: &Module, qname: &str) -> TypeId {
        let scope = self
            .scopes
            .new_scope(Some(self.global_scope), ScopeKind::Module, qname.to_string());
        let name = qname.rsplit('.').next().unwrap_or(qname).to_string();
        let module_ty = self.types.new_module(ModuleType {
            name,
            qname: qname.to_string(),
            scope,
            file: Some(ast.file.clone()),
        });
        self.scopes.get_mut(scope).owner = Some(module_ty);
        self.bind(
            self.module_scope,
            qname,
            NodeId::SYNTHETIC,
            (0, 0),
            module_ty,
            BindingKind::Module,
        );

        self.file_stack.push(ast.file.clone());
        self.infer_body(&ast.body, scope);
        self.file_stack.pop();
        module_ty
    }

    pub(crate) fn infer_body(&mut self, stmts: &[Stmt], scope: ScopeId) {
        for stmt in stmts {
            self.infer_stmt(stmt, scope);
        }
    }

    fn infer_stmt(&mut self, stmt: &Stmt, scope: ScopeId) {
        match &stmt.kind {
            StmtKind::FunctionDef(def) => self.infer_function_def(def, scope),
            StmtKind::ClassDef(def) => self.infer_class_def(def, scope),
            StmtKind::Assign { targets, value } => {
                let ty = match value {
                    Some(value) => self.infer_expr(value, scope),
                    None => self.types.unknown,
                };
                for target in targets {
                    self.bind_target(target, ty, scope);
                }
            }
            StmtKind::AugAssign { target, op, value } => {
                let current = self.infer_expr(target, scope);
                let rhs = self.infer_expr(value, scope);
                let result = self.binary_result(*op, current, rhs);
                self.bind_target(target, result, scope);
            }
            StmtKind::Return { value } => {
                let ty = match value {
                    Some(value) => self.infer_expr(value, scope),
                    None => self.types.none,
                };
                if let Some(frame) = self.ret_stack.last().copied() {
                    let widened = self.types.union(frame.ty, ty);
                    if let Some(frame) = self.ret_stack.last_mut() {
                        frame.ty = widened;
                        frame.explicit = true;
                    }
                }
            }
            StmtKind::Expr { value } => {
                self.infer_expr(value, scope);
            }
            StmtKind::Import { names } => {
                for alias in names {
                    let dotted = alias.name.name.clone();
                    match &alias.asname {
                        Some(asname) => match self.load_module(&dotted, scope, None) {
                            Some(ty) => {
                                self.bind(
                                    scope,
                                    &asname.name,
                                    asname.id,
                                    (asname.start, asname.end),
                                    ty,
                                    BindingKind::Alias,
                                );
                                self.mark_resolved(alias.name.id);
                            }
                            None => self.mark_unresolved(alias.name.id),
                        },
                        None => {
                            if self.load_module(&dotted, scope, Some(&alias.name)).is_none() {
                                self.mark_unresolved(alias.name.id);
                            }
                        }
                    }
                }
            }
            StmtKind::ImportFrom {
                module,
                names,
                star,
            } => self.infer_import_from(module, names, *star, scope),
            StmtKind::If { test, body, orelse } | StmtKind::While { test, body, orelse } => {
                self.infer_expr(test, scope);
                self.infer_body(body, scope);
                self.infer_body(orelse, scope);
            }
            StmtKind::For {
                target,
                iter,
                body,
                orelse,
            } => {
                let iter_ty = self.infer_expr(iter, scope);
                let elem = self.element_type(iter_ty);
                self.bind_target(target, elem, scope);
                self.infer_body(body, scope);
                self.infer_body(orelse, scope);
            }
            StmtKind::With { items, body } => {
                for item in items {
                    let ty = self.infer_expr(&item.context, scope);
                    if let Some(vars) = &item.optional_vars {
                        self.bind_target(vars, ty, scope);
                    }
                }
                self.infer_body(body, scope);
            }
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.infer_body(body, scope);
                for handler in handlers {
                    let exc = match &handler.typ {
                        Some(typ) => {
                            let ty = self.infer_expr(typ, scope);
                            self.instance_result(ty)
                        }
                        None => self.types.unknown,
                    };
                    if let Some(name) = &handler.name {
                        self.bind(
                            scope,
                            &name.name,
                            name.id,
                            (name.start, name.end),
                            exc,
                            BindingKind::Variable,
                        );
                    }
                    self.infer_body(&handler.body, scope);
                }
                self.infer_body(orelse, scope);
                self.infer_body(finalbody, scope);
            }
            StmtKind::Raise { exc } => {
                if let Some(exc) = exc {
                    self.infer_expr(exc, scope);
                }
            }
            StmtKind::Assert { test, msg } => {
                self.infer_expr(test, scope);
                if let Some(msg) = msg {
                    self.infer_expr(msg, scope);
                }
            }
            StmtKind::Delete { targets } => {
                for target in targets {
                    self.infer_expr(target, scope);
                }
            }
            StmtKind::Pass | StmtKind::Break | StmtKind::Continue => {}
        }
    }

    fn infer_function_def(&mut self, def: &FunctionDef, scope: ScopeId) {
        for dec in &def.decorators {
            self.infer_expr(dec, scope);
        }

        // Defaults evaluate in the enclosing scope, at definition time.
        let defaults: Vec<TypeId> = def
            .params
            .iter()
            .filter_map(|p| p.default.as_ref())
            .map(|d| self.infer_expr(d, scope))
            .collect();

        let parent_path = self.scopes.get(scope).path.clone();
        let path = qualify(&parent_path, &def.name.name);
        let fun_scope = self
            .scopes
            .new_scope(Some(scope), ScopeKind::Function, path);

        let mut params = smallvec::SmallVec::new();
        for param in &def.params {
            self.bind(
                fun_scope,
                &param.name.name,
                param.name.id,
                (param.name.start, param.name.end),
                self.types.unknown,
                BindingKind::Parameter,
            );
            params.push(ParamSpec {
                name: param.name.name.clone(),
                node: param.name.id,
            });
        }

        let fun_ty = self.types.new_fun(FunType {
            def_node: Some(def.name.id),
            scope: fun_scope,
            params,
            defaults,
            ret: self.types.unknown,
            self_type: None,
            body: FunBody::Stmts(Rc::clone(&def.body)),
            file: self.current_file(),
            builtin: false,
        });
        self.scopes.get_mut(fun_scope).owner = Some(fun_ty);

        let kind = if self.scopes.get(scope).kind == ScopeKind::Class {
            if def.name.name == "__init__" {
                BindingKind::Constructor
            } else {
                BindingKind::Method
            }
        } else {
            BindingKind::Function
        };
        self.bind(
            scope,
            &def.name.name,
            def.name.id,
            (def.name.start, def.name.end),
            fun_ty,
            kind,
        );
        self.uncalled.insert(fun_ty);
    }

    fn infer_class_def(&mut self, def: &ClassDef, scope: ScopeId) {
        for dec in &def.decorators {
            self.infer_expr(dec, scope);
        }

        let mut bases = Vec::new();
        for base in &def.bases {
            let base_ty = self.infer_expr(base, scope);
            for t in self.types.constituents(base_ty) {
                if self.types.as_class(t).is_some() {
                    bases.push(t);
                }
            }
        }

        let parent_path = self.scopes.get(scope).path.clone();
        let path = qualify(&parent_path, &def.name.name);
        let class_scope = self.scopes.new_scope(Some(scope), ScopeKind::Class, path);
        let class_ty = self.types.new_class(ClassType {
            name: def.name.name.clone(),
            scope: class_scope,
            bases,
        });
        self.scopes.get_mut(class_scope).owner = Some(class_ty);

        // Bind the name first so the body can refer to its own class.
        self.bind(
            scope,
            &def.name.name,
            def.name.id,
            (def.name.start, def.name.end),
            class_ty,
            BindingKind::Class,
        );
        self.infer_body(&def.body, class_scope);
    }

    fn infer_import_from(
        &mut self,
        module: &str,
        names: &[crate::ast::ImportAlias],
        star: bool,
        scope: ScopeId,
    ) {
        let module_ty = self.load_module(module, scope, None);
        let module_scope = module_ty.and_then(|ty| self.types.scope_of(ty));

        if star {
            if let Some(src) = module_scope {
                self.scopes.merge(scope, src);
            }
            return;
        }

        for alias in names {
            let member = module_scope
                .and_then(|ms| self.scopes.lookup_local(ms, &alias.name.name));
            let ty = match member {
                Some(ids) => {
                    self.add_reference(alias.name.id, &ids);
                    self.mark_resolved(alias.name.id);
                    let tys: Vec<TypeId> = ids.iter().map(|&id| self.bindings.get(id).ty).collect();
                    self.types.union_all(tys)
                }
                None => {
                    self.mark_unresolved(alias.name.id);
                    self.types.unknown
                }
            };
            let target = alias.asname.as_ref().unwrap_or(&alias.name);
            self.bind(
                scope,
                &target.name,
                target.id,
                (target.start, target.end),
                ty,
                BindingKind::Alias,
            );
        }
    }

    // ---- expressions ---------------------------------------------------

    pub(crate) fn infer_expr(&mut self, expr: &Expr, scope: ScopeId) -> TypeId {
        match &expr.kind {
            ExprKind::Literal(lit) => self.literal_type(*lit),
            ExprKind::Name(name) => match self.scopes.lookup(scope, name) {
                Some(ids) => {
                    self.add_reference(expr.id, &ids);
                    self.mark_resolved(expr.id);
                    let tys: Vec<TypeId> = ids.iter().map(|&id| self.bindings.get(id).ty).collect();
                    self.types.union_all(tys)
                }
                None => {
                    self.mark_unresolved(expr.id);
                    self.types.unknown
                }
            },
            ExprKind::Attribute { value, attr } => {
                let receiver = self.infer_expr(value, scope);
                self.resolve_attribute(receiver, attr, false)
            }
            ExprKind::Call {
                func,
                args,
                keywords,
            } => {
                // Re-entering the same call expression means recursion with
                // ever-changing argument types; assume Unknown and let the
                // fixed point widen it.
                if !self.call_nodes.insert(expr.id) {
                    return self.types.unknown;
                }
                let arg_tys: Vec<TypeId> =
                    args.iter().map(|arg| self.infer_expr(arg, scope)).collect();
                for kw in keywords {
                    self.infer_expr(&kw.value, scope);
                }

                let callee = match &func.kind {
                    // Attribute callees resolve with the receiver known, so
                    // instance methods pick up their bound self type.
                    ExprKind::Attribute { value, attr } => {
                        let receiver = self.infer_expr(value, scope);
                        self.resolve_attribute(receiver, attr, true)
                    }
                    _ => self.infer_expr(func, scope),
                };
                let result = self.apply_callee(callee, &arg_tys, func);
                self.call_nodes.remove(&expr.id);
                result
            }
            ExprKind::Binary { op, left, right } => {
                let l = self.infer_expr(left, scope);
                let r = self.infer_expr(right, scope);
                self.binary_result(*op, l, r)
            }
            ExprKind::Unary { op, operand } => {
                let t = self.infer_expr(operand, scope);
                match op {
                    UnaryOp::Not => self.types.boolean,
                    UnaryOp::Invert => self.types.int,
                    UnaryOp::Neg | UnaryOp::Pos => t,
                }
            }
            ExprKind::BoolOp { values } => {
                let tys: Vec<TypeId> = values.iter().map(|v| self.infer_expr(v, scope)).collect();
                self.types.union_all(tys)
            }
            ExprKind::Compare { left, comparators } => {
                self.infer_expr(left, scope);
                for cmp in comparators {
                    self.infer_expr(cmp, scope);
                }
                self.types.boolean
            }
            ExprKind::List(elems) => {
                let tys: Vec<TypeId> = elems.iter().map(|e| self.infer_expr(e, scope)).collect();
                let elem = self.types.union_all(tys);
                self.types.list_of(elem)
            }
            ExprKind::Tuple(elems) => {
                let tys: Vec<TypeId> = elems.iter().map(|e| self.infer_expr(e, scope)).collect();
                self.types.tuple_of(tys)
            }
            ExprKind::Set(elems) => {
                let tys: Vec<TypeId> = elems.iter().map(|e| self.infer_expr(e, scope)).collect();
                let elem = self.types.union_all(tys);
                self.types.set_of(elem)
            }
            ExprKind::Dict { keys, values } => {
                let key_tys: Vec<TypeId> = keys
                    .iter()
                    .flatten()
                    .map(|k| self.infer_expr(k, scope))
                    .collect();
                let value_tys: Vec<TypeId> =
                    values.iter().map(|v| self.infer_expr(v, scope)).collect();
                let key = self.types.union_all(key_tys);
                let value = self.types.union_all(value_tys);
                self.types.dict_of(key, value)
            }
            ExprKind::Subscript { value, index } => {
                let base = self.infer_expr(value, scope);
                let is_slice = matches!(index.kind, ExprKind::Slice { .. });
                self.infer_expr(index, scope);
                self.subscript_result(base, is_slice)
            }
            ExprKind::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.infer_expr(part, scope);
                }
                self.types.unknown
            }
            ExprKind::Lambda { params, body } => {
                let parent_path = self.scopes.get(scope).path.clone();
                let path = qualify(&parent_path, "<lambda>");
                let fun_scope = self.scopes.new_scope(Some(scope), ScopeKind::Function, path);

                let defaults: Vec<TypeId> = params
                    .iter()
                    .filter_map(|p| p.default.as_ref())
                    .map(|d| self.infer_expr(d, scope))
                    .collect();
                let mut specs = smallvec::SmallVec::new();
                for param in params {
                    self.bind(
                        fun_scope,
                        &param.name.name,
                        param.name.id,
                        (param.name.start, param.name.end),
                        self.types.unknown,
                        BindingKind::Parameter,
                    );
                    specs.push(ParamSpec {
                        name: param.name.name.clone(),
                        node: param.name.id,
                    });
                }
                let fun_ty = self.types.new_fun(FunType {
                    def_node: Some(expr.id),
                    scope: fun_scope,
                    params: specs,
                    defaults,
                    ret: self.types.unknown,
                    self_type: None,
                    body: FunBody::Expr(Rc::clone(body)),
                    file: self.current_file(),
                    builtin: false,
                });
                self.scopes.get_mut(fun_scope).owner = Some(fun_ty);
                self.uncalled.insert(fun_ty);
                fun_ty
            }
            ExprKind::IfExp { test, body, orelse } => {
                self.infer_expr(test, scope);
                let a = self.infer_expr(body, scope);
                let b = self.infer_expr(orelse, scope);
                self.types.union(a, b)
            }
            ExprKind::Comp {
                kind,
                key,
                elt,
                generators,
            } => {
                for gen in generators {
                    let iter_ty = self.infer_expr(&gen.iter, scope);
                    let elem = self.element_type(iter_ty);
                    self.bind_target(&gen.target, elem, scope);
                    for cond in &gen.ifs {
                        self.infer_expr(cond, scope);
                    }
                }
                let elt_ty = self.infer_expr(elt, scope);
                match kind {
                    CompKind::List | CompKind::Generator => self.types.list_of(elt_ty),
                    CompKind::Set => self.types.set_of(elt_ty),
                    CompKind::Dict => {
                        let key_ty = match key {
                            Some(key) => self.infer_expr(key, scope),
                            None => self.types.unknown,
                        };
                        self.types.dict_of(key_ty, elt_ty)
                    }
                }
            }
            ExprKind::Starred(value) => self.infer_expr(value, scope),
            ExprKind::Yield { value } => {
                if let Some(value) = value {
                    let ty = self.infer_expr(value, scope);
                    // A generator's caller sees a stream of these values.
                    if let Some(frame) = self.ret_stack.last().copied() {
                        let elem_list = self.types.list_of(ty);
                        let widened = self.types.union(frame.ty, elem_list);
                        if let Some(frame) = self.ret_stack.last_mut() {
                            frame.ty = widened;
                        }
                    }
                }
                self.types.unknown
            }
            ExprKind::Await(value) => self.infer_expr(value, scope),
            ExprKind::FString(parts) => {
                for part in parts {
                    self.infer_expr(part, scope);
                }
                self.types.string
            }
            ExprKind::Opaque => self.types.unknown,
        }
    }

    fn literal_type(&self, lit: Literal) -> TypeId {
        match lit {
            Literal::Int => self.types.int,
            Literal::Float => self.types.float,
            Literal::Complex => self.types.complex,
            Literal::Str => self.types.string,
            Literal::Bytes => self.types.bytes,
            Literal::Bool => self.types.boolean,
            Literal::None => self.types.none,
        }
    }

    /// Resolve `attr` against every constituent of the receiver type.
    /// In call position, instance-reached functions become bound methods.
    fn resolve_attribute(&mut self, receiver: TypeId, attr: &Ident, in_call: bool) -> TypeId {
        let mut result = self.types.unknown;
        let mut found = false;
        for t in self.types.constituents(receiver) {
            let Some(target_scope) = self.types.scope_of(t) else {
                continue;
            };
            let is_instance = matches!(self.types.get(t), Type::Instance { .. });
            let Some(ids) = self
                .scopes
                .lookup_attribute(&self.types, target_scope, &attr.name)
            else {
                continue;
            };
            found = true;
            self.add_reference(attr.id, &ids);
            for id in ids {
                let bty = self.bindings.get(id).ty;
                if in_call && is_instance {
                    if let Some(fun) = self.types.as_fun_mut(bty) {
                        fun.self_type = Some(t);
                    }
                }
                result = self.types.union(result, bty);
            }
        }
        if found {
            self.mark_resolved(attr.id);
        } else {
            self.mark_unresolved(attr.id);
        }
        result
    }

    /// Apply a (possibly union-typed) callee.
    fn apply_callee(&mut self, callee: TypeId, args: &[TypeId], func: &Expr) -> TypeId {
        let mut result = self.types.unknown;
        for t in self.types.constituents(callee) {
            let applied = match self.types.get(t) {
                Type::Fun(_) => self.apply_fun(t, args, None),
                Type::Class(_) => self.construct_instance(t, args),
                Type::Unknown => self.types.unknown,
                _ => {
                    let rendered = self.types.describe(t);
                    let file = self.current_file();
                    self.add_semantic_error(
                        &file,
                        (func.start, func.end),
                        format!("Not callable: {rendered}"),
                    );
                    self.types.unknown
                }
            };
            result = self.types.union(result, applied);
        }
        result
    }

    /// Construct an instance of `class`, analyzing `__init__` as a bound
    /// call when the class (or a base) defines one.
    fn construct_instance(&mut self, class: TypeId, args: &[TypeId]) -> TypeId {
        let instance = self.types.instance_of(class, &mut self.scopes);
        if let Some(instance_scope) = self.types.scope_of(instance) {
            if let Some(ids) = self
                .scopes
                .lookup_attribute(&self.types, instance_scope, "__init__")
            {
                for id in ids {
                    let init = self.bindings.get(id).ty;
                    if self.types.as_fun(init).is_some() {
                        self.apply_fun(init, args, Some(instance));
                    }
                }
            }
        }
        instance
    }

    fn instance_result(&mut self, ty: TypeId) -> TypeId {
        let mut result = self.types.unknown;
        for t in self.types.constituents(ty) {
            let instantiated = if self.types.as_class(t).is_some() {
                self.types.instance_of(t, &mut self.scopes)
            } else {
                self.types.unknown
            };
            result = self.types.union(result, instantiated);
        }
        result
    }

    /// Analyze one application of `fun`.
    ///
    /// A re-entrant application (same function, same frozen argument
    /// types) returns the return type assumed so far; the enclosing
    /// application widens it. Formals re-bind into a shallow copy of the
    /// declared scope, so parameter bindings accumulate the union of every
    /// actual they have seen.
    pub(crate) fn apply_fun(
        &mut self,
        fun: TypeId,
        args: &[TypeId],
        self_ty: Option<TypeId>,
    ) -> TypeId {
        let Some(f) = self.types.as_fun(fun) else {
            return self.types.unknown;
        };

        if f.builtin {
            self.uncalled.shift_remove(&fun);
            self.called_functions += 1;
            return f.ret;
        }

        let key = CallKey {
            fun,
            args: args.to_vec(),
        };
        if self.call_stack.contains(&key) {
            return f.ret;
        }

        let params: Vec<ParamSpec> = f.params.iter().cloned().collect();
        let defaults = f.defaults.clone();
        let body = f.body.clone();
        let file = f.file.clone();
        let declared = f.scope;
        let bound_self = self_ty.or(f.self_type);

        self.call_stack.insert(key.clone());
        self.uncalled.shift_remove(&fun);

        let frame = self.scopes.copy(declared);
        let mut supplied: Vec<TypeId> = Vec::with_capacity(args.len() + 1);
        if let Some(receiver) = bound_self {
            supplied.push(receiver);
        }
        supplied.extend_from_slice(args);

        // Defaults align with the trailing parameters.
        let default_base = params.len().saturating_sub(defaults.len());
        for (index, param) in params.iter().enumerate() {
            let ty = supplied
                .get(index)
                .copied()
                .or_else(|| {
                    index
                        .checked_sub(default_base)
                        .and_then(|d| defaults.get(d).copied())
                })
                .unwrap_or(self.types.unknown);
            self.bind(frame, &param.name, param.node, (0, 0), ty, BindingKind::Parameter);
        }

        self.file_stack.push(file);
        self.ret_stack.push(RetFrame {
            ty: self.types.unknown,
            explicit: false,
        });
        match &body {
            FunBody::Stmts(stmts) => self.infer_body(stmts, frame),
            FunBody::Expr(expr) => {
                let expr = Rc::clone(expr);
                let ty = self.infer_expr(&expr, frame);
                if let Some(frame) = self.ret_stack.last_mut() {
                    frame.ty = ty;
                    frame.explicit = true;
                }
            }
            FunBody::Builtin => {}
        }
        let ret_frame = self.ret_stack.pop().unwrap_or(RetFrame {
            ty: self.types.unknown,
            explicit: false,
        });
        self.file_stack.pop();
        self.call_stack.remove(&key);

        let ret = if ret_frame.explicit || !self.types.is_unknown(ret_frame.ty) {
            ret_frame.ty
        } else {
            // No return statement anywhere: the function returns None.
            self.types.none
        };

        let old = self.types.as_fun(fun).map(|f| f.ret).unwrap_or(self.types.unknown);
        let widened = self.types.union(old, ret);
        if let Some(f) = self.types.as_fun_mut(fun) {
            f.ret = widened;
        }

        self.called_functions += 1;
        ret
    }

    // ---- binding targets ----------------------------------------------

    /// Bind an assignment target, destructuring tuples and lists.
    fn bind_target(&mut self, target: &Expr, ty: TypeId, scope: ScopeId) {
        match &target.kind {
            ExprKind::Name(name) => {
                let kind = if self.scopes.get(scope).kind == ScopeKind::Class {
                    BindingKind::Attribute
                } else {
                    BindingKind::Variable
                };
                self.bind(scope, name, target.id, (target.start, target.end), ty, kind);
            }
            ExprKind::Tuple(elems) | ExprKind::List(elems) => {
                let elem_tys = self.destructured(ty, elems.len());
                for (elem, elem_ty) in elems.iter().zip(elem_tys) {
                    self.bind_target(elem, elem_ty, scope);
                }
            }
            ExprKind::Attribute { value, attr } => {
                let receiver = self.infer_expr(value, scope);
                for t in self.types.constituents(receiver) {
                    let target_scope = match self.types.get(t) {
                        Type::Instance { scope: s, .. } => Some(*s),
                        Type::Class(c) => Some(c.scope),
                        Type::Module(m) => Some(m.scope),
                        _ => None,
                    };
                    if let Some(target_scope) = target_scope {
                        self.bind(
                            target_scope,
                            &attr.name,
                            attr.id,
                            (attr.start, attr.end),
                            ty,
                            BindingKind::Attribute,
                        );
                    }
                }
            }
            ExprKind::Subscript { value, index } => {
                self.infer_expr(value, scope);
                self.infer_expr(index, scope);
            }
            ExprKind::Starred(inner) => {
                let list = self.types.list_of(ty);
                self.bind_target(inner, list, scope);
            }
            _ => {
                self.infer_expr(target, scope);
            }
        }
    }

    /// Per-position types when destructuring `ty` into `len` targets.
    fn destructured(&mut self, ty: TypeId, len: usize) -> Vec<TypeId> {
        if let Type::Tuple { elems } = self.types.get(ty) {
            if elems.len() == len {
                return elems.clone();
            }
        }
        let elem = self.element_type(ty);
        vec![elem; len]
    }

    // ---- type algebra helpers -----------------------------------------

    /// Element type produced by iterating a value.
    fn element_type(&mut self, ty: TypeId) -> TypeId {
        let mut result = self.types.unknown;
        for t in self.types.constituents(ty) {
            let elem = match self.types.get(t) {
                Type::List { elem } | Type::Set { elem } => *elem,
                Type::Dict { key, .. } => *key,
                Type::Tuple { elems } => {
                    let elems = elems.clone();
                    self.types.union_all(elems)
                }
                Type::Str => self.types.string,
                Type::Bytes => self.types.int,
                _ => self.types.unknown,
            };
            result = self.types.union(result, elem);
        }
        result
    }

    fn subscript_result(&mut self, base: TypeId, is_slice: bool) -> TypeId {
        let mut result = self.types.unknown;
        for t in self.types.constituents(base) {
            let elem = match self.types.get(t) {
                Type::List { elem } => {
                    if is_slice {
                        t
                    } else {
                        *elem
                    }
                }
                Type::Tuple { elems } => {
                    if is_slice {
                        t
                    } else {
                        let elems = elems.clone();
                        self.types.union_all(elems)
                    }
                }
                Type::Dict { value, .. } => *value,
                Type::Str => self.types.string,
                Type::Bytes => {
                    if is_slice {
                        self.types.bytes
                    } else {
                        self.types.int
                    }
                }
                _ => self.types.unknown,
            };
            result = self.types.union(result, elem);
        }
        result
    }

    fn binary_result(&mut self, op: BinOp, left: TypeId, right: TypeId) -> TypeId {
        let int = self.types.int;
        let float = self.types.float;
        let string = self.types.string;
        let complex = self.types.complex;
        let unknown = self.types.unknown;
        match op {
            BinOp::Add => {
                if left == string && right == string {
                    return string;
                }
                let list_elems = match (self.types.get(left), self.types.get(right)) {
                    (Type::List { elem: a }, Type::List { elem: b }) => Some((*a, *b)),
                    _ => None,
                };
                if let Some((a, b)) = list_elems {
                    let elem = self.types.union(a, b);
                    return self.types.list_of(elem);
                }
                self.numeric_result(left, right)
            }
            BinOp::Mul => {
                if (left == string && right == int) || (left == int && right == string) {
                    return string;
                }
                if matches!(self.types.get(left), Type::List { .. }) && right == int {
                    return left;
                }
                self.numeric_result(left, right)
            }
            BinOp::Mod => {
                if left == string {
                    return string;
                }
                self.numeric_result(left, right)
            }
            BinOp::Sub | BinOp::Pow => self.numeric_result(left, right),
            BinOp::Div => {
                if left == complex || right == complex {
                    complex
                } else if left == unknown || right == unknown {
                    unknown
                } else {
                    float
                }
            }
            BinOp::FloorDiv => {
                if left == float || right == float {
                    float
                } else {
                    self.numeric_result(left, right)
                }
            }
            BinOp::BitAnd | BinOp::BitOr | BinOp::BitXor => {
                if matches!(self.types.get(left), Type::Set { .. }) {
                    return self.types.union(left, right);
                }
                int
            }
            BinOp::LShift | BinOp::RShift => int,
            BinOp::MatMul => unknown,
        }
    }

    fn numeric_result(&self, left: TypeId, right: TypeId) -> TypeId {
        let t = &self.types;
        if left == t.unknown || right == t.unknown {
            return t.unknown;
        }
        let numeric =
            |ty: TypeId| ty == t.int || ty == t.float || ty == t.complex || ty == t.boolean;
        if !numeric(left) || !numeric(right) {
            return t.unknown;
        }
        if left == t.complex || right == t.complex {
            t.complex
        } else if left == t.float || right == t.float {
            t.float
        } else {
            t.int
        }
    }
}

fn qualify(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}
