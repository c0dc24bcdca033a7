//! Type checking and lowering to the typed tree.
//!
//! このモジュールは AST から HIR への変換と型検査を担当する。
//!
//! The checker walks the AST once, building the symbol table as it
//! enters and leaves procedure scopes and producing a [`HirProgram`]
//! on the side. It never stops at the first problem: a part that
//! fails to check simply lowers to `None` and the walk goes on, so
//! one run collects every independent error. The typed tree is
//! released only when the whole program checked cleanly.

use crate::ast;
use crate::diagnostic::{Diagnostic, has_errors};
use crate::hir::{HirAssign, HirCall, HirExpr, HirExprKind, HirProc, HirProgram, HirStmt, HirTarget};
use crate::runtime::RUNTIME_PROCS;
use crate::span::Span;
use crate::symbols::{DeclId, DeclKind, SymbolTable};
use crate::types::{Type, arithmetic_result, assignable};

/// Result of checking a program.
///
/// `hir` is `Some` exactly when no error diagnostic was produced.
/// The symbol table is returned in both cases; the code generator
/// needs it alongside the typed tree.
#[derive(Debug)]
pub struct CheckOutcome {
    pub hir: Option<HirProgram>,
    pub table: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Check a parsed program and lower it.
pub fn check(program: &ast::Program) -> CheckOutcome {
    let mut checker = TypeChecker {
        table: SymbolTable::new(),
        diagnostics: Vec::new(),
        in_procedure: false,
        declared_ret: None,
    };
    checker.declare_runtime();
    let hir = checker.check_program(program);

    let failed = has_errors(&checker.diagnostics);
    CheckOutcome {
        hir: if failed { None } else { Some(hir) },
        table: checker.table,
        diagnostics: checker.diagnostics,
    }
}

struct TypeChecker {
    table: SymbolTable,
    diagnostics: Vec<Diagnostic>,
    /// Inside any procedure body, as opposed to the program body.
    in_procedure: bool,
    /// Declared return type of the procedure being checked.
    declared_ret: Option<Type>,
}

impl TypeChecker {
    /// Seed the program scope with the runtime library procedures.
    /// They are global, so programs can call them from any depth.
    fn declare_runtime(&mut self) {
        for proc in RUNTIME_PROCS {
            self.table
                .declare(
                    proc.name,
                    DeclKind::Procedure {
                        params: proc.params.to_vec(),
                        ret: proc.ret.clone(),
                        runtime: true,
                    },
                    true,
                    Span::new(0, 0, 0),
                )
                .expect("runtime procedure names are unique");
        }
    }

    fn error_at(&mut self, span: Span, message: impl Into<String>, code: &'static str) {
        self.diagnostics
            .push(Diagnostic::error(message, span).with_code(code));
    }

    fn check_program(&mut self, program: &ast::Program) -> HirProgram {
        let (vars, procs) = self.check_declarations(&program.decls);
        let body = self.check_statement_list(&program.body);
        HirProgram {
            name: program.name.clone(),
            vars,
            procs,
            body,
        }
    }

    // ----- declarations -------------------------------------------------

    fn check_declarations(&mut self, decls: &[ast::Decl]) -> (Vec<DeclId>, Vec<HirProc>) {
        let mut vars = Vec::new();
        let mut procs = Vec::new();
        for decl in decls {
            match &decl.kind {
                ast::DeclKind::Variable(var) => {
                    if let Some(id) = self.declare_variable(var, decl.is_global, false) {
                        vars.push(id);
                    }
                }
                ast::DeclKind::Procedure(proc) => {
                    if let Some(hir_proc) = self.check_procedure(proc, decl.is_global) {
                        procs.push(hir_proc);
                    }
                }
            }
        }
        (vars, procs)
    }

    fn declare_variable(
        &mut self,
        var: &ast::VarDecl,
        is_global: bool,
        is_param: bool,
    ) -> Option<DeclId> {
        let ty = self.lower_type(var);
        match self
            .table
            .declare(&var.name, DeclKind::Variable { ty, is_param }, is_global, var.span)
        {
            Ok(id) => Some(id),
            Err(existing) => {
                self.duplicate(&var.name, var.span, existing);
                None
            }
        }
    }

    /// Written type of a variable declaration. A bad array bound is
    /// reported and clamped so the name still declares; the clamped
    /// value never reaches code generation because the error blocks
    /// it.
    fn lower_type(&mut self, var: &ast::VarDecl) -> Type {
        let element = scalar_type(var.ty);
        match &var.bound {
            None => element,
            Some(bound) => {
                let mut value = bound.value;
                if value < 1 {
                    self.error_at(
                        bound.span,
                        format!("array bound must be at least 1, found {value}"),
                        "E0301",
                    );
                    value = 1;
                }
                Type::Array(Box::new(element), value)
            }
        }
    }

    fn duplicate(&mut self, name: &str, span: Span, existing: DeclId) {
        let runtime = matches!(
            self.table.decl(existing).kind,
            DeclKind::Procedure { runtime: true, .. }
        );
        let message = if runtime {
            format!("`{name}` is a runtime procedure and cannot be redeclared")
        } else {
            format!("duplicate declaration of `{name}`")
        };
        self.error_at(span, message, "E0201");
    }

    fn check_procedure(&mut self, proc: &ast::ProcDecl, is_global: bool) -> Option<HirProc> {
        let params: Vec<Type> = proc.params.iter().map(|p| self.lower_type(p)).collect();
        let ret = match proc.ret {
            None => None,
            Some(mark) => {
                let ty = scalar_type(mark);
                if ty == Type::String {
                    // String storage is caller-owned buffers; there
                    // is no place for a returned one to live.
                    self.error_at(
                        proc.span,
                        "procedures cannot return string values",
                        "E0301",
                    );
                }
                Some(ty)
            }
        };

        // 手続き名は外側のスコープに先に入れる。自分の本体からの
        // 再帰呼び出しは祖先チェーン経由で解決される。
        let id = match self.table.declare(
            &proc.name,
            DeclKind::Procedure {
                params,
                ret: ret.clone(),
                runtime: false,
            },
            is_global,
            proc.span,
        ) {
            Ok(id) => id,
            Err(existing) => {
                self.duplicate(&proc.name, proc.span, existing);
                return None;
            }
        };

        self.table.enter_scope(id);
        let mut param_ids = Vec::new();
        for param in &proc.params {
            if let Some(param_id) = self.declare_variable(param, false, true) {
                param_ids.push(param_id);
            }
        }
        let (vars, procs) = self.check_declarations(&proc.decls);

        let saved_in = std::mem::replace(&mut self.in_procedure, true);
        let saved_ret = std::mem::replace(&mut self.declared_ret, ret);
        let body = self.check_statement_list(&proc.body);
        self.in_procedure = saved_in;
        self.declared_ret = saved_ret;
        self.table.exit_scope();

        Some(HirProc {
            decl: id,
            params: param_ids,
            vars,
            procs,
            body,
        })
    }

    // ----- statements ---------------------------------------------------

    fn check_statement_list(&mut self, stmts: &[ast::Stmt]) -> Vec<HirStmt> {
        stmts
            .iter()
            .filter_map(|stmt| self.check_statement(stmt))
            .collect()
    }

    fn check_statement(&mut self, stmt: &ast::Stmt) -> Option<HirStmt> {
        match stmt {
            ast::Stmt::Assign(assign) => self.check_assignment(assign).map(HirStmt::Assign),
            ast::Stmt::If(if_stmt) => self.check_if(if_stmt),
            ast::Stmt::For(for_stmt) => self.check_for(for_stmt),
            ast::Stmt::Return(ret) => self.check_return(ret),
            ast::Stmt::Call(call) => self
                .check_call(&call.name, &call.args, call.span, false)
                .map(|(hir_call, _)| HirStmt::Call(hir_call)),
        }
    }

    fn check_assignment(&mut self, assign: &ast::AssignStmt) -> Option<HirAssign> {
        // 両辺を先に検査してから失敗を伝播する。片側の失敗で
        // もう片側のエラーが隠れないように。
        let target = self.check_destination(&assign.dest);
        let value = self.check_expr(&assign.value);
        let target = target?;
        let value = value?;

        if !assignable(&value.ty, &target.ty) {
            self.error_at(
                assign.value.span,
                format!("cannot assign {} to {}", value.ty, target.ty),
                "E0301",
            );
            return None;
        }
        let value = value.widened_to(&target.ty);
        Some(HirAssign { target, value })
    }

    fn check_destination(&mut self, dest: &ast::Destination) -> Option<HirTarget> {
        let id = self.resolve_name(&dest.name, dest.span)?;
        let kind = self.table.decl(id).kind.clone();
        let DeclKind::Variable { ty, .. } = kind else {
            if let Some(index) = &dest.index {
                self.check_expr(index);
            }
            self.error_at(
                dest.span,
                format!("cannot assign to procedure `{}`", dest.name),
                "E0301",
            );
            return None;
        };

        match &dest.index {
            None => Some(HirTarget {
                decl: id,
                index: None,
                ty,
                span: dest.span,
            }),
            Some(index_expr) => {
                let index = self.check_index_expr(index_expr);
                let Type::Array(element, _) = ty else {
                    self.error_at(
                        dest.span,
                        format!("cannot index a value of type {ty}"),
                        "E0301",
                    );
                    return None;
                };
                Some(HirTarget {
                    decl: id,
                    index: Some(index?),
                    ty: *element,
                    span: dest.span,
                })
            }
        }
    }

    fn check_index_expr(&mut self, expr: &ast::Expr) -> Option<HirExpr> {
        let index = self.check_expr(expr)?;
        if index.ty != Type::Integer {
            self.error_at(
                expr.span,
                format!("array index must be an integer, found {}", index.ty),
                "E0301",
            );
            return None;
        }
        Some(index)
    }

    fn check_if(&mut self, if_stmt: &ast::IfStmt) -> Option<HirStmt> {
        let cond = self.check_condition(&if_stmt.cond);
        let then_body = self.check_statement_list(&if_stmt.then_body);
        let else_body = self.check_statement_list(&if_stmt.else_body);
        Some(HirStmt::If {
            cond: cond?,
            then_body,
            else_body,
            span: if_stmt.span,
        })
    }

    fn check_for(&mut self, for_stmt: &ast::ForStmt) -> Option<HirStmt> {
        let init = self.check_assignment(&for_stmt.init);
        let cond = self.check_condition(&for_stmt.cond);
        let body = self.check_statement_list(&for_stmt.body);
        Some(HirStmt::For {
            init: init?,
            cond: cond?,
            body,
            span: for_stmt.span,
        })
    }

    fn check_condition(&mut self, expr: &ast::Expr) -> Option<HirExpr> {
        let cond = self.check_expr(expr)?;
        if cond.ty != Type::Bool {
            self.error_at(
                expr.span,
                format!("condition must be bool, found {}", cond.ty),
                "E0301",
            );
            return None;
        }
        Some(cond)
    }

    fn check_return(&mut self, ret: &ast::ReturnStmt) -> Option<HirStmt> {
        if !self.in_procedure {
            // Program-level `return` ends the program; a value makes
            // no sense there.
            if let Some(value) = &ret.value {
                self.check_expr(value);
                self.error_at(
                    ret.span,
                    "`return` at program level cannot carry a value",
                    "E0303",
                );
                return None;
            }
            return Some(HirStmt::Return {
                value: None,
                span: ret.span,
            });
        }

        let declared = self.declared_ret.clone();
        match (&ret.value, declared) {
            (None, None) => Some(HirStmt::Return {
                value: None,
                span: ret.span,
            }),
            (None, Some(expected)) => {
                self.error_at(
                    ret.span,
                    format!("this procedure must return {expected}"),
                    "E0303",
                );
                None
            }
            (Some(value), None) => {
                self.check_expr(value);
                self.error_at(ret.span, "this procedure does not return a value", "E0303");
                None
            }
            (Some(value), Some(expected)) => {
                let value = self.check_expr(value)?;
                if !assignable(&value.ty, &expected) {
                    self.error_at(
                        value.span,
                        format!("return type mismatch: expected {expected}, found {}", value.ty),
                        "E0303",
                    );
                    return None;
                }
                Some(HirStmt::Return {
                    value: Some(value.widened_to(&expected)),
                    span: ret.span,
                })
            }
        }
    }

    /// Check a call in statement or expression position. Returns the
    /// lowered call and the callee's return type; `require_value`
    /// rejects callees that produce none.
    fn check_call(
        &mut self,
        name: &str,
        args: &[ast::Expr],
        span: Span,
        require_value: bool,
    ) -> Option<(HirCall, Option<Type>)> {
        let id = match self.table.resolve(name) {
            Some(id) => Some(id),
            None => {
                self.error_at(span, format!("undeclared identifier `{name}`"), "E0202");
                None
            }
        };

        // 呼び先が不明でも引数は検査しておく。
        let checked: Vec<Option<HirExpr>> = args.iter().map(|arg| self.check_expr(arg)).collect();

        let id = id?;
        let kind = self.table.decl(id).kind.clone();
        let DeclKind::Procedure { params, ret, .. } = kind else {
            self.error_at(
                span,
                format!("`{name}` is a variable, not a procedure"),
                "E0301",
            );
            return None;
        };

        if require_value && ret.is_none() {
            self.error_at(
                span,
                format!("procedure `{name}` does not produce a value"),
                "E0301",
            );
            return None;
        }
        if args.len() != params.len() {
            self.error_at(
                span,
                format!(
                    "`{name}` expects {} argument(s), found {}",
                    params.len(),
                    args.len()
                ),
                "E0302",
            );
            return None;
        }

        let mut hir_args = Vec::with_capacity(args.len());
        let mut ok = true;
        for (position, (arg, expected)) in checked.into_iter().zip(params.iter()).enumerate() {
            match arg {
                None => ok = false,
                Some(arg) => {
                    if assignable(&arg.ty, expected) {
                        hir_args.push(arg.widened_to(expected));
                    } else {
                        self.error_at(
                            arg.span,
                            format!(
                                "argument {} of `{name}` expects {expected}, found {}",
                                position + 1,
                                arg.ty
                            ),
                            "E0301",
                        );
                        ok = false;
                    }
                }
            }
        }
        if !ok {
            return None;
        }

        Some((
            HirCall {
                decl: id,
                args: hir_args,
                span,
            },
            ret,
        ))
    }

    // ----- expressions --------------------------------------------------

    fn check_expr(&mut self, expr: &ast::Expr) -> Option<HirExpr> {
        match &expr.kind {
            ast::ExprKind::IntLit(value) => Some(HirExpr {
                kind: HirExprKind::IntLit(*value),
                ty: Type::Integer,
                span: expr.span,
            }),
            ast::ExprKind::FloatLit(value) => Some(HirExpr {
                kind: HirExprKind::FloatLit(*value),
                ty: Type::Float,
                span: expr.span,
            }),
            ast::ExprKind::BoolLit(value) => Some(HirExpr {
                kind: HirExprKind::BoolLit(*value),
                ty: Type::Bool,
                span: expr.span,
            }),
            ast::ExprKind::StringLit(value) => Some(HirExpr {
                kind: HirExprKind::StringLit(value.clone()),
                ty: Type::String,
                span: expr.span,
            }),
            ast::ExprKind::Name(name) => {
                let id = self.resolve_name(name, expr.span)?;
                let kind = self.table.decl(id).kind.clone();
                match kind {
                    DeclKind::Variable { ty, .. } => Some(HirExpr {
                        kind: HirExprKind::Var(id),
                        ty,
                        span: expr.span,
                    }),
                    DeclKind::Procedure { .. } => {
                        self.error_at(
                            expr.span,
                            format!("cannot use procedure `{name}` as a value"),
                            "E0301",
                        );
                        None
                    }
                }
            }
            ast::ExprKind::Index { name, index } => {
                let id = self.resolve_name(name, expr.span);
                let index = self.check_index_expr(index);
                let id = id?;
                let kind = self.table.decl(id).kind.clone();
                match kind {
                    DeclKind::Variable {
                        ty: Type::Array(element, _),
                        ..
                    } => Some(HirExpr {
                        kind: HirExprKind::Index {
                            base: id,
                            index: Box::new(index?),
                        },
                        ty: *element,
                        span: expr.span,
                    }),
                    DeclKind::Variable { ty, .. } => {
                        self.error_at(
                            expr.span,
                            format!("cannot index a value of type {ty}"),
                            "E0301",
                        );
                        None
                    }
                    DeclKind::Procedure { .. } => {
                        self.error_at(
                            expr.span,
                            format!("cannot use procedure `{name}` as a value"),
                            "E0301",
                        );
                        None
                    }
                }
            }
            ast::ExprKind::Call { name, args } => {
                let (call, ret) = self.check_call(name, args, expr.span, true)?;
                // require_value above guarantees a return type.
                let ty = ret?;
                Some(HirExpr {
                    kind: HirExprKind::Call(call),
                    ty,
                    span: expr.span,
                })
            }
            ast::ExprKind::Unary { op, operand } => {
                let operand = self.check_expr(operand)?;
                let ty = match op {
                    ast::UnaryOp::Not => {
                        if operand.ty != Type::Bool {
                            self.error_at(
                                expr.span,
                                format!("operand of `not` must be bool, found {}", operand.ty),
                                "E0301",
                            );
                            return None;
                        }
                        Type::Bool
                    }
                    ast::UnaryOp::Neg => {
                        if !operand.ty.is_numeric() {
                            self.error_at(
                                expr.span,
                                format!("cannot negate a value of type {}", operand.ty),
                                "E0301",
                            );
                            return None;
                        }
                        operand.ty.clone()
                    }
                };
                Some(HirExpr {
                    kind: HirExprKind::Unary {
                        op: *op,
                        operand: Box::new(operand),
                    },
                    ty,
                    span: expr.span,
                })
            }
            ast::ExprKind::Binary { op, lhs, rhs } => {
                let lhs = self.check_expr(lhs);
                let rhs = self.check_expr(rhs);
                self.check_binary(*op, lhs?, rhs?, expr.span)
            }
        }
    }

    fn check_binary(
        &mut self,
        op: ast::BinaryOp,
        lhs: HirExpr,
        rhs: HirExpr,
        span: Span,
    ) -> Option<HirExpr> {
        if op.is_logical() {
            if lhs.ty != Type::Bool || rhs.ty != Type::Bool {
                self.error_at(
                    span,
                    format!(
                        "operands of `{}` must be bool, found {} and {}",
                        op.symbol(),
                        lhs.ty,
                        rhs.ty
                    ),
                    "E0301",
                );
                return None;
            }
            return Some(binary_expr(op, lhs, rhs, Type::Bool, span));
        }

        if op.is_relational() {
            if lhs.ty.is_numeric() && rhs.ty.is_numeric() {
                let common = if lhs.ty == Type::Float || rhs.ty == Type::Float {
                    Type::Float
                } else {
                    Type::Integer
                };
                let lhs = lhs.widened_to(&common);
                let rhs = rhs.widened_to(&common);
                return Some(binary_expr(op, lhs, rhs, Type::Bool, span));
            }
            // bool と string は等値比較のみ。
            if lhs.ty == rhs.ty
                && (lhs.ty == Type::Bool || lhs.ty == Type::String)
                && op.is_equality()
            {
                return Some(binary_expr(op, lhs, rhs, Type::Bool, span));
            }
            self.error_at(
                span,
                format!(
                    "cannot compare {} and {} with `{}`",
                    lhs.ty,
                    rhs.ty,
                    op.symbol()
                ),
                "E0301",
            );
            return None;
        }

        match arithmetic_result(&lhs.ty, &rhs.ty) {
            Some(result) => {
                let lhs = lhs.widened_to(&result);
                let rhs = rhs.widened_to(&result);
                Some(binary_expr(op, lhs, rhs, result, span))
            }
            None => {
                self.error_at(
                    span,
                    format!(
                        "operands of `{}` must be numeric, found {} and {}",
                        op.symbol(),
                        lhs.ty,
                        rhs.ty
                    ),
                    "E0301",
                );
                None
            }
        }
    }

    fn resolve_name(&mut self, name: &str, span: Span) -> Option<DeclId> {
        match self.table.resolve(name) {
            Some(id) => Some(id),
            None => {
                self.error_at(span, format!("undeclared identifier `{name}`"), "E0202");
                None
            }
        }
    }
}

fn binary_expr(op: ast::BinaryOp, lhs: HirExpr, rhs: HirExpr, ty: Type, span: Span) -> HirExpr {
    HirExpr {
        kind: HirExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        ty,
        span,
    }
}

fn scalar_type(mark: ast::TypeMark) -> Type {
    match mark {
        ast::TypeMark::Integer => Type::Integer,
        ast::TypeMark::Float => Type::Float,
        ast::TypeMark::Bool => Type::Bool,
        ast::TypeMark::String => Type::String,
    }
}
