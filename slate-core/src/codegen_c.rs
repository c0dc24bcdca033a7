//! C back end.
//!
//! Emits one self-contained C translation unit per program. The
//! program body becomes `main`, procedures become `static` functions
//! with mangled names, and the runtime procedures a program actually
//! calls are declared `extern` so the unit links against the runtime
//! library unchanged.
//!
//! Two schemes carry the language semantics that C lacks:
//!
//! - Call hoisting. Every call that appears inside an expression is
//!   evaluated into a numbered temporary first, in strict
//!   left-to-right source order. The residual C expression is pure,
//!   so C's own evaluation-order freedom cannot reorder observable
//!   effects, and `&&`/`||` short-circuiting cannot skip one.
//!
//! - Frames and displays. Procedures can read and write variables of
//!   the procedures they are nested in. Each function whose locals
//!   are touched from deeper nesting keeps those locals in
//!   `struct frame_F`, and a file-scope `display_F` pointer tracks
//!   the active frame. Inner functions reach outer variables through
//!   `display_F->x`; every entry saves the previous pointer and
//!   every exit restores it, so recursion sees the right frame.

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{BinaryOp, UnaryOp};
use crate::hir::{HirAssign, HirCall, HirExpr, HirExprKind, HirProc, HirProgram, HirStmt};
use crate::runtime::{STRING_CAPACITY, find_runtime_proc};
use crate::symbols::{DeclId, DeclKind, SymbolTable};
use crate::types::Type;

/// The generated translation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedUnit {
    pub c_source: String,
    /// Names of the runtime procedures the program calls, in
    /// declaration order. These are the unit's undefined symbols.
    pub runtime_imports: Vec<&'static str>,
}

/// Generate C for a checked program. `debug` interleaves source line
/// comments into the output.
pub fn generate(program: &HirProgram, table: &SymbolTable, debug: bool) -> GeneratedUnit {
    let Usage { captures, runtime } = collect_usage(program, table);

    let runtime_imports: Vec<&'static str> = runtime
        .iter()
        .filter_map(|&id| find_runtime_proc(&table.decl(id).name))
        .map(|proc| proc.name)
        .collect();

    let mut generator = CGenerator {
        table,
        debug,
        captures,
        out: String::new(),
        indent: 0,
        next_temp: 0,
        current_fn: None,
    };
    generator.emit_unit(program, &runtime);

    GeneratedUnit {
        c_source: generator.out,
        runtime_imports,
    }
}

// ----- usage analysis ---------------------------------------------------

/// What the program touches: per function, the set of its variables
/// referenced from other (deeper) functions, and the runtime
/// procedures called anywhere. `None` keys the program body.
struct Usage {
    captures: BTreeMap<Option<DeclId>, BTreeSet<DeclId>>,
    runtime: BTreeSet<DeclId>,
}

fn collect_usage(program: &HirProgram, table: &SymbolTable) -> Usage {
    let mut usage = Usage {
        captures: BTreeMap::new(),
        runtime: BTreeSet::new(),
    };
    visit_stmts(&program.body, None, table, &mut usage);
    for proc in &program.procs {
        visit_proc(proc, table, &mut usage);
    }
    usage
}

fn visit_proc(proc: &HirProc, table: &SymbolTable, usage: &mut Usage) {
    visit_stmts(&proc.body, Some(proc.decl), table, usage);
    for child in &proc.procs {
        visit_proc(child, table, usage);
    }
}

fn visit_stmts(stmts: &[HirStmt], current: Option<DeclId>, table: &SymbolTable, usage: &mut Usage) {
    for stmt in stmts {
        visit_stmt(stmt, current, table, usage);
    }
}

fn visit_stmt(stmt: &HirStmt, current: Option<DeclId>, table: &SymbolTable, usage: &mut Usage) {
    match stmt {
        HirStmt::Assign(assign) => visit_assign(assign, current, table, usage),
        HirStmt::If {
            cond,
            then_body,
            else_body,
            ..
        } => {
            visit_expr(cond, current, table, usage);
            visit_stmts(then_body, current, table, usage);
            visit_stmts(else_body, current, table, usage);
        }
        HirStmt::For {
            init, cond, body, ..
        } => {
            visit_assign(init, current, table, usage);
            visit_expr(cond, current, table, usage);
            visit_stmts(body, current, table, usage);
        }
        HirStmt::Return { value, .. } => {
            if let Some(value) = value {
                visit_expr(value, current, table, usage);
            }
        }
        HirStmt::Call(call) => visit_call(call, current, table, usage),
    }
}

fn visit_assign(assign: &HirAssign, current: Option<DeclId>, table: &SymbolTable, usage: &mut Usage) {
    touch(assign.target.decl, current, table, usage);
    if let Some(index) = &assign.target.index {
        visit_expr(index, current, table, usage);
    }
    visit_expr(&assign.value, current, table, usage);
}

fn visit_call(call: &HirCall, current: Option<DeclId>, table: &SymbolTable, usage: &mut Usage) {
    if matches!(
        table.decl(call.decl).kind,
        DeclKind::Procedure { runtime: true, .. }
    ) {
        usage.runtime.insert(call.decl);
    }
    for arg in &call.args {
        visit_expr(arg, current, table, usage);
    }
}

fn visit_expr(expr: &HirExpr, current: Option<DeclId>, table: &SymbolTable, usage: &mut Usage) {
    match &expr.kind {
        HirExprKind::IntLit(_)
        | HirExprKind::FloatLit(_)
        | HirExprKind::BoolLit(_)
        | HirExprKind::StringLit(_) => {}
        HirExprKind::Var(id) => touch(*id, current, table, usage),
        HirExprKind::Index { base, index } => {
            touch(*base, current, table, usage);
            visit_expr(index, current, table, usage);
        }
        HirExprKind::Unary { operand, .. } => visit_expr(operand, current, table, usage),
        HirExprKind::Binary { lhs, rhs, .. } => {
            visit_expr(lhs, current, table, usage);
            visit_expr(rhs, current, table, usage);
        }
        HirExprKind::Call(call) => visit_call(call, current, table, usage),
        HirExprKind::Widen(inner) => visit_expr(inner, current, table, usage),
    }
}

/// Record a variable reference. Globals live at file scope and never
/// need a frame; anything else referenced from outside its owning
/// function is a capture.
fn touch(id: DeclId, current: Option<DeclId>, table: &SymbolTable, usage: &mut Usage) {
    let decl = table.decl(id);
    if decl.is_global {
        return;
    }
    if matches!(decl.kind, DeclKind::Variable { .. }) && decl.owner != current {
        usage.captures.entry(decl.owner).or_default().insert(id);
    }
}

// ----- emission ---------------------------------------------------------

struct CGenerator<'a> {
    table: &'a SymbolTable,
    debug: bool,
    captures: BTreeMap<Option<DeclId>, BTreeSet<DeclId>>,
    out: String,
    indent: usize,
    next_temp: u32,
    /// Function being emitted; `None` while inside `main`.
    current_fn: Option<DeclId>,
}

impl<'a> CGenerator<'a> {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("    ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn fresh_temp(&mut self) -> String {
        let n = self.next_temp;
        self.next_temp += 1;
        format!("t{n}")
    }

    fn mangle(&self, id: DeclId) -> String {
        format!("{}_{}", self.table.decl(id).name, id.0)
    }

    fn fn_label(&self, owner: Option<DeclId>) -> String {
        match owner {
            None => "main".to_string(),
            Some(id) => self.mangle(id),
        }
    }

    fn has_frame(&self, owner: Option<DeclId>) -> bool {
        self.captures.get(&owner).is_some_and(|set| !set.is_empty())
    }

    fn is_captured(&self, id: DeclId) -> bool {
        let owner = self.table.decl(id).owner;
        self.captures
            .get(&owner)
            .is_some_and(|set| set.contains(&id))
    }

    /// C expression naming a variable from the current function.
    fn var_ref(&self, id: DeclId) -> String {
        let decl = self.table.decl(id);
        if decl.is_global {
            return self.mangle(id);
        }
        if decl.owner == self.current_fn {
            if self.is_captured(id) {
                format!("frame.{}", self.mangle(id))
            } else {
                self.mangle(id)
            }
        } else {
            // 外側の関数の変数。capture 解析によりフレーム入りが
            // 保証されているので display 経由で届く。
            format!("display_{}->{}", self.fn_label(decl.owner), self.mangle(id))
        }
    }

    // ----- unit layout --------------------------------------------------

    fn emit_unit(&mut self, program: &HirProgram, runtime: &BTreeSet<DeclId>) {
        self.line(format!("/* program {} */", program.name));
        self.line("#include <string.h>");
        self.blank();

        if !runtime.is_empty() {
            for &id in runtime {
                let name = self.table.decl(id).name.clone();
                if let Some(proc) = find_runtime_proc(&name) {
                    self.line(proc.prototype);
                }
            }
            self.blank();
        }

        self.emit_globals();
        self.emit_frames();
        self.emit_prototypes(program);

        for proc in &program.procs {
            self.emit_proc(proc);
        }
        self.emit_main(program);
    }

    fn emit_globals(&mut self) {
        let globals: Vec<(DeclId, Type)> = self
            .table
            .decls()
            .filter_map(|(id, decl)| match &decl.kind {
                DeclKind::Variable { ty, .. } if decl.is_global => Some((id, ty.clone())),
                _ => None,
            })
            .collect();
        if globals.is_empty() {
            return;
        }
        for (id, ty) in globals {
            let name = self.mangle(id);
            self.line(format!("static {};", c_storage_decl(&name, &ty)));
        }
        self.blank();
    }

    fn emit_frames(&mut self) {
        let frames: Vec<(Option<DeclId>, Vec<DeclId>)> = self
            .captures
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(&owner, set)| (owner, set.iter().copied().collect()))
            .collect();
        for (owner, fields) in frames {
            let label = self.fn_label(owner);
            self.line(format!("struct frame_{label} {{"));
            self.indent += 1;
            for id in fields {
                let name = self.mangle(id);
                let (ty, is_param) = match &self.table.decl(id).kind {
                    DeclKind::Variable { ty, is_param } => (ty.clone(), *is_param),
                    DeclKind::Procedure { .. } => continue,
                };
                self.line(format!("{};", c_frame_field(&name, &ty, is_param)));
            }
            self.indent -= 1;
            self.line("};");
            self.line(format!("static struct frame_{label} *display_{label};"));
            self.blank();
        }
    }

    fn proc_signature(&self, proc: &HirProc) -> String {
        let name = self.mangle(proc.decl);
        let ret = match &self.table.decl(proc.decl).kind {
            DeclKind::Procedure { ret, .. } => ret.clone(),
            DeclKind::Variable { .. } => None,
        };
        let ret_c = match &ret {
            None => "void",
            Some(ty) => c_scalar_type(ty),
        };
        let params: Vec<String> = proc
            .params
            .iter()
            .map(|&id| {
                let param_name = self.mangle(id);
                match &self.table.decl(id).kind {
                    DeclKind::Variable { ty, .. } => c_param_decl(&param_name, ty),
                    DeclKind::Procedure { .. } => String::new(),
                }
            })
            .collect();
        let params_text = if params.is_empty() {
            "void".to_string()
        } else {
            params.join(", ")
        };
        format!("static {ret_c} {name}({params_text})")
    }

    fn emit_prototypes(&mut self, program: &HirProgram) {
        fn walk(generator: &CGenerator<'_>, procs: &[HirProc], lines: &mut Vec<String>) {
            for proc in procs {
                lines.push(format!("{};", generator.proc_signature(proc)));
                walk(generator, &proc.procs, lines);
            }
        }
        let mut lines = Vec::new();
        walk(self, &program.procs, &mut lines);
        if lines.is_empty() {
            return;
        }
        for line in lines {
            self.line(line);
        }
        self.blank();
    }

    // ----- functions ----------------------------------------------------

    fn emit_proc(&mut self, proc: &HirProc) {
        // Inner procedures first; prototypes make the order a matter
        // of readability only.
        for child in &proc.procs {
            self.emit_proc(child);
        }

        let signature = self.proc_signature(proc);
        let (name, ret, line_no) = {
            let decl = self.table.decl(proc.decl);
            let ret = match &decl.kind {
                DeclKind::Procedure { ret, .. } => ret.clone(),
                DeclKind::Variable { .. } => None,
            };
            (decl.name.clone(), ret, decl.span.line)
        };
        if self.debug {
            self.line(format!("/* procedure {name} (line {line_no}) */"));
        }

        let saved_fn = std::mem::replace(&mut self.current_fn, Some(proc.decl));
        let saved_temp = std::mem::replace(&mut self.next_temp, 0);
        self.line(format!("{signature} {{"));
        self.indent += 1;
        self.emit_stack_frame(&proc.params, &proc.vars);
        self.emit_statements(&proc.body);
        self.emit_epilogue(ret.as_ref(), false);
        self.indent -= 1;
        self.line("}");
        self.blank();
        self.current_fn = saved_fn;
        self.next_temp = saved_temp;
    }

    fn emit_main(&mut self, program: &HirProgram) {
        if self.debug {
            self.line("/* program body */");
        }
        self.current_fn = None;
        self.next_temp = 0;
        self.line("int main(void) {");
        self.indent += 1;
        self.emit_stack_frame(&[], &program.vars);
        self.emit_statements(&program.body);
        self.emit_epilogue(None, true);
        self.indent -= 1;
        self.line("}");
    }

    /// Entry sequence: install the frame when this function has one,
    /// copy captured parameters into it, and declare the plain
    /// locals.
    fn emit_stack_frame(&mut self, params: &[DeclId], vars: &[DeclId]) {
        let owner = self.current_fn;
        if self.has_frame(owner) {
            let label = self.fn_label(owner);
            self.line(format!("struct frame_{label} frame;"));
            self.line(format!("struct frame_{label} *saved_display = display_{label};"));
            self.line(format!("display_{label} = &frame;"));
            for &param in params {
                if self.is_captured(param) {
                    let name = self.mangle(param);
                    self.line(format!("frame.{name} = {name};"));
                }
            }
        }
        for &var in vars {
            if self.table.decl(var).is_global || self.is_captured(var) {
                continue;
            }
            let ty = match &self.table.decl(var).kind {
                DeclKind::Variable { ty, .. } => ty.clone(),
                DeclKind::Procedure { .. } => continue,
            };
            let name = self.mangle(var);
            self.line(format!("{};", c_storage_decl(&name, &ty)));
        }
    }

    fn emit_epilogue(&mut self, ret: Option<&Type>, is_main: bool) {
        if self.has_frame(self.current_fn) {
            let label = self.fn_label(self.current_fn);
            self.line(format!("display_{label} = saved_display;"));
        }
        if is_main {
            self.line("return 0;");
        } else {
            // Falling off the end of a value-returning procedure
            // yields the type's zero.
            match ret {
                None => {}
                Some(Type::Float) => self.line("return 0.0f;"),
                Some(_) => self.line("return 0;"),
            }
        }
    }

    // ----- statements ---------------------------------------------------

    fn emit_statements(&mut self, stmts: &[HirStmt]) {
        for stmt in stmts {
            if self.debug {
                self.line(format!("/* line {} */", stmt_line(stmt)));
            }
            self.emit_stmt(stmt);
        }
    }

    fn emit_stmt(&mut self, stmt: &HirStmt) {
        match stmt {
            HirStmt::Assign(assign) => self.emit_assign(assign),
            HirStmt::If {
                cond,
                then_body,
                else_body,
                ..
            } => {
                let cond_s = self.gen_expr(cond);
                self.line(format!("if ({cond_s}) {{"));
                self.indent += 1;
                self.emit_statements(then_body);
                self.indent -= 1;
                if else_body.is_empty() {
                    self.line("}");
                } else {
                    self.line("} else {");
                    self.indent += 1;
                    self.emit_statements(else_body);
                    self.indent -= 1;
                    self.line("}");
                }
            }
            HirStmt::For {
                init, cond, body, ..
            } => {
                // The initializer runs once; the condition re-runs
                // each iteration, so its hoisted calls live inside
                // the loop.
                self.emit_assign(init);
                self.line("for (;;) {");
                self.indent += 1;
                let cond_s = self.gen_expr(cond);
                self.line(format!("if (!{cond_s}) break;"));
                self.emit_statements(body);
                self.indent -= 1;
                self.line("}");
            }
            HirStmt::Return { value, .. } => self.emit_return(value.as_ref()),
            HirStmt::Call(call) => {
                let invocation = self.call_expr(call);
                self.line(format!("{invocation};"));
            }
        }
    }

    fn emit_return(&mut self, value: Option<&HirExpr>) {
        let framed = self.has_frame(self.current_fn);
        match value {
            None => {
                if framed {
                    let label = self.fn_label(self.current_fn);
                    self.line(format!("display_{label} = saved_display;"));
                }
                if self.current_fn.is_none() {
                    self.line("return 0;");
                } else {
                    self.line("return;");
                }
            }
            Some(expr) => {
                let value_s = self.gen_expr(expr);
                if framed {
                    // Evaluate before restoring: the expression may
                    // still read through the display.
                    let ty = c_scalar_type(&expr.ty);
                    let temp = self.fresh_temp();
                    self.line(format!("{ty} {temp} = {value_s};"));
                    let label = self.fn_label(self.current_fn);
                    self.line(format!("display_{label} = saved_display;"));
                    self.line(format!("return {temp};"));
                } else {
                    self.line(format!("return {value_s};"));
                }
            }
        }
    }

    fn emit_assign(&mut self, assign: &HirAssign) {
        // Destination index first, value second, matching the order
        // they are written.
        let dst = match &assign.target.index {
            None => self.var_ref(assign.target.decl),
            Some(index) => {
                let index_s = self.gen_expr(index);
                format!("{}[{index_s}]", self.var_ref(assign.target.decl))
            }
        };
        match &assign.target.ty {
            Type::String => {
                let value_s = self.gen_expr(&assign.value);
                self.line(format!("strcpy({dst}, {value_s});"));
            }
            Type::Array(element, count) => {
                // Element size is spelled out; the operands may be
                // pointers, so sizeof on them would be wrong.
                let value_s = self.gen_expr(&assign.value);
                let size = c_size_expr(element, *count);
                self.line(format!("memcpy({dst}, {value_s}, {size});"));
            }
            _ => {
                let value_s = self.gen_expr(&assign.value);
                self.line(format!("{dst} = {value_s};"));
            }
        }
    }

    // ----- expressions --------------------------------------------------

    /// Emit the side effects of an expression and return the pure C
    /// expression for its value.
    fn gen_expr(&mut self, expr: &HirExpr) -> String {
        match &expr.kind {
            HirExprKind::IntLit(value) => value.to_string(),
            HirExprKind::FloatLit(value) => format!("{value:?}f"),
            HirExprKind::BoolLit(value) => if *value { "1" } else { "0" }.to_string(),
            HirExprKind::StringLit(value) => c_string_literal(value),
            HirExprKind::Var(id) => self.var_ref(*id),
            HirExprKind::Index { base, index } => {
                let index_s = self.gen_expr(index);
                format!("{}[{index_s}]", self.var_ref(*base))
            }
            HirExprKind::Unary { op, operand } => {
                let operand_s = self.gen_expr(operand);
                match op {
                    UnaryOp::Not => format!("(!{operand_s})"),
                    UnaryOp::Neg => format!("(-{operand_s})"),
                }
            }
            HirExprKind::Binary { op, lhs, rhs } => {
                let string_compare = lhs.ty == Type::String;
                let lhs_s = self.gen_expr(lhs);
                let rhs_s = self.gen_expr(rhs);
                if string_compare {
                    let c_op = if *op == BinaryOp::Eq { "==" } else { "!=" };
                    format!("(strcmp({lhs_s}, {rhs_s}) {c_op} 0)")
                } else {
                    let symbol = match op {
                        BinaryOp::And => "&&",
                        BinaryOp::Or => "||",
                        other => other.symbol(),
                    };
                    format!("({lhs_s} {symbol} {rhs_s})")
                }
            }
            HirExprKind::Call(call) => {
                let invocation = self.call_expr(call);
                let ty = c_scalar_type(&expr.ty);
                let temp = self.fresh_temp();
                self.line(format!("{ty} {temp} = {invocation};"));
                temp
            }
            HirExprKind::Widen(inner) => {
                let inner_s = self.gen_expr(inner);
                format!("(float)({inner_s})")
            }
        }
    }

    /// The call itself, arguments evaluated left to right. The caller
    /// decides whether to hoist the result.
    fn call_expr(&mut self, call: &HirCall) -> String {
        let mut args = Vec::with_capacity(call.args.len());
        for arg in &call.args {
            args.push(self.gen_expr(arg));
        }
        let decl = self.table.decl(call.decl);
        let name = if matches!(decl.kind, DeclKind::Procedure { runtime: true, .. }) {
            decl.name.clone()
        } else {
            self.mangle(call.decl)
        };
        format!("{name}({})", args.join(", "))
    }
}

fn stmt_line(stmt: &HirStmt) -> u32 {
    match stmt {
        HirStmt::Assign(assign) => assign.target.span.line,
        HirStmt::If { span, .. } | HirStmt::For { span, .. } => span.line,
        HirStmt::Return { span, .. } => span.line,
        HirStmt::Call(call) => call.span.line,
    }
}

// ----- C type spellings -------------------------------------------------

/// C type of a scalar value. Calls and returns are restricted to
/// scalars by the checker, so the aggregate arms never fire.
fn c_scalar_type(ty: &Type) -> &'static str {
    match ty {
        Type::Integer | Type::Bool => "int",
        Type::Float => "float",
        Type::String | Type::Array(..) => "int",
    }
}

/// Declaration of owned storage for a variable.
fn c_storage_decl(name: &str, ty: &Type) -> String {
    match ty {
        Type::Integer | Type::Bool => format!("int {name}"),
        Type::Float => format!("float {name}"),
        Type::String => format!("char {name}[{STRING_CAPACITY}]"),
        Type::Array(element, count) => match element.as_ref() {
            Type::Integer | Type::Bool => format!("int {name}[{count}]"),
            Type::Float => format!("float {name}[{count}]"),
            Type::String => format!("char {name}[{count}][{STRING_CAPACITY}]"),
            // The grammar cannot nest arrays.
            Type::Array(..) => format!("int {name}[{count}]"),
        },
    }
}

/// Declaration of a parameter. Scalars pass by value; strings and
/// arrays arrive as pointers to the caller's storage.
fn c_param_decl(name: &str, ty: &Type) -> String {
    match ty {
        Type::Integer | Type::Bool => format!("int {name}"),
        Type::Float => format!("float {name}"),
        Type::String => format!("char *{name}"),
        Type::Array(element, _) => match element.as_ref() {
            Type::Integer | Type::Bool => format!("int *{name}"),
            Type::Float => format!("float *{name}"),
            Type::String => format!("char (*{name})[{STRING_CAPACITY}]"),
            Type::Array(..) => format!("int *{name}"),
        },
    }
}

/// Declaration of a frame field. Captured parameters keep their
/// by-reference shape; captured locals move their storage into the
/// frame.
fn c_frame_field(name: &str, ty: &Type, is_param: bool) -> String {
    if is_param && !matches!(ty, Type::Integer | Type::Float | Type::Bool) {
        c_param_decl(name, ty)
    } else {
        c_storage_decl(name, ty)
    }
}

/// Byte count of a whole array, spelled without sizeof on the
/// operands.
fn c_size_expr(element: &Type, count: i64) -> String {
    match element {
        Type::Integer | Type::Bool => format!("sizeof(int) * {count}"),
        Type::Float => format!("sizeof(float) * {count}"),
        Type::String => format!("{STRING_CAPACITY} * {count}"),
        Type::Array(..) => format!("sizeof(int) * {count}"),
    }
}

fn c_string_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::parse;
    use crate::typecheck::check;

    fn generate_source(source: &str, debug: bool) -> GeneratedUnit {
        let lexed = lex(source);
        assert!(lexed.diagnostics.is_empty(), "scan: {:?}", lexed.diagnostics);
        let parsed = parse(&lexed.tokens);
        assert!(
            parsed.diagnostics.is_empty(),
            "parse: {:?}",
            parsed.diagnostics
        );
        let outcome = check(&parsed.program.expect("program"));
        assert!(
            outcome.diagnostics.is_empty(),
            "check: {:?}",
            outcome.diagnostics
        );
        generate(&outcome.hir.expect("hir"), &outcome.table, debug)
    }

    fn c_of(source: &str) -> String {
        generate_source(source, false).c_source
    }

    fn offset_of(haystack: &str, needle: &str) -> usize {
        haystack
            .find(needle)
            .unwrap_or_else(|| panic!("`{needle}` not found in:\n{haystack}"))
    }

    #[test]
    fn emits_the_banner_and_string_include() {
        let c = c_of("program demo is begin end program");
        assert!(c.starts_with("/* program demo */\n#include <string.h>\n"));
        assert!(c.contains("int main(void) {"));
        assert!(c.trim_end().ends_with('}'));
    }

    #[test]
    fn declares_only_the_runtime_procedures_a_program_uses() {
        let unit = generate_source(
            "program demo is\n  bool b;\nbegin\n  b := getBool();\n  putInteger(3);\nend program",
            false,
        );
        assert_eq!(unit.runtime_imports, vec!["getBool", "putInteger"]);
        assert!(unit.c_source.contains("extern int getBool(void);"));
        assert!(unit.c_source.contains("extern void putInteger(int value);"));
        assert!(!unit.c_source.contains("getFloat"));
    }

    #[test]
    fn globals_become_file_scope_statics() {
        let c = c_of(
            "program demo is\n  global integer count;\nbegin\n  count := 1;\nend program",
        );
        assert!(c.contains("static int count_8;"));
        assert!(c.contains("count_8 = 1;"));
    }

    #[test]
    fn plain_main_locals_stay_on_the_stack() {
        let c = c_of("program demo is\n  integer x;\nbegin\n  x := 2;\nend program");
        assert!(c.contains("int x_8;"));
        assert!(!c.contains("static int x_8"));
        assert!(!c.contains("frame"));
    }

    #[test]
    fn procedures_get_mangled_names_and_forward_prototypes() {
        let c = c_of(
            "program demo is\n\
             procedure add(integer a, integer b) : integer\n\
             begin\n  return a + b;\nend procedure;\n\
             begin\n  putInteger(add(1, 2));\nend program",
        );
        assert!(c.contains("static int add_8(int a_9, int b_10);"));
        assert!(c.contains("static int add_8(int a_9, int b_10) {"));
        assert!(c.contains("return (a_9 + b_10);"));
        assert!(c.contains("int t0 = add_8(1, 2);"));
        assert!(c.contains("putInteger(t0);"));
    }

    #[test]
    fn captured_locals_move_into_a_frame() {
        let c = c_of(
            "program demo is\n\
             integer x;\n\
             procedure show()\nbegin\n  putInteger(x);\nend procedure;\n\
             begin\n  x := 41;\n  show();\nend program",
        );
        assert!(c.contains("struct frame_main {"));
        assert!(c.contains("int x_8;"));
        assert!(c.contains("static struct frame_main *display_main;"));
        assert!(c.contains("putInteger(display_main->x_8);"));
        assert!(c.contains("frame.x_8 = 41;"));
        assert!(c.contains("display_main = &frame;"));
        assert!(c.contains("display_main = saved_display;"));
    }

    #[test]
    fn captured_parameters_are_copied_into_the_frame() {
        let c = c_of(
            "program demo is\n\
             procedure outer(integer n)\n\
               procedure inner()\n  begin\n    putInteger(n);\n  end procedure;\n\
             begin\n  inner();\nend procedure;\n\
             begin\n  outer(7);\nend program",
        );
        assert!(c.contains("struct frame_outer_8 {"));
        assert!(c.contains("frame.n_9 = n_9;"));
        assert!(c.contains("putInteger(display_outer_8->n_9);"));
    }

    #[test]
    fn early_returns_restore_the_display_after_evaluating_the_value() {
        let c = c_of(
            "program demo is\n\
             procedure f(integer n) : integer\n\
               procedure g() : integer\n  begin\n    return n;\n  end procedure;\n\
             begin\n  return g() + 1;\nend procedure;\n\
             begin\n  putInteger(f(2));\nend program",
        );
        let value = offset_of(&c, "int t1 = (t0 + 1);");
        let restore = offset_of(&c, "display_f_8 = saved_display;");
        let ret = offset_of(&c, "return t1;");
        assert!(value < restore && restore < ret);
    }

    #[test]
    fn calls_hoist_to_temps_in_source_order() {
        let c = c_of(
            "program demo is\nbegin\n  putInteger(getInteger() + getInteger());\nend program",
        );
        let first = offset_of(&c, "int t0 = getInteger();");
        let second = offset_of(&c, "int t1 = getInteger();");
        let call = offset_of(&c, "putInteger((t0 + t1));");
        assert!(first < second && second < call);
    }

    #[test]
    fn for_loops_re_evaluate_their_condition_each_iteration() {
        let c = c_of(
            "program demo is\n  integer i;\nbegin\n\
             for (i := 0; getBool())\n    i := i + 1;\nend for;\nend program",
        );
        let init = offset_of(&c, "i_8 = 0;");
        let loop_top = offset_of(&c, "for (;;) {");
        let cond = offset_of(&c, "int t0 = getBool();");
        let test = offset_of(&c, "if (!t0) break;");
        assert!(init < loop_top && loop_top < cond && cond < test);
    }

    #[test]
    fn strings_copy_with_strcpy_and_compare_with_strcmp() {
        let c = c_of(
            "program demo is\n  string s;\n  bool b;\nbegin\n\
             s := \"hi\";\n  b := s == \"hi\";\nend program",
        );
        assert!(c.contains("char s_8[256];"));
        assert!(c.contains("strcpy(s_8, \"hi\");"));
        assert!(c.contains("(strcmp(s_8, \"hi\") == 0)"));
    }

    #[test]
    fn whole_arrays_copy_with_an_explicit_size() {
        let c = c_of(
            "program demo is\n  integer a[3];\n  integer b[3];\nbegin\n  a := b;\nend program",
        );
        assert!(c.contains("memcpy(a_8, b_9, sizeof(int) * 3);"));
    }

    #[test]
    fn widening_is_an_explicit_cast() {
        let c = c_of(
            "program demo is\n  integer x;\n  float f;\nbegin\n  x := 3;\n  f := x;\nend program",
        );
        assert!(c.contains("f_9 = (float)(x_8);"));
    }

    #[test]
    fn float_literals_keep_their_fraction_and_suffix() {
        let c = c_of("program demo is\n  float f;\nbegin\n  f := 1.5;\n  f := 2.0;\nend program");
        assert!(c.contains("f_8 = 1.5f;"));
        assert!(c.contains("f_8 = 2.0f;"));
    }

    #[test]
    fn booleans_lower_to_ints() {
        let c = c_of(
            "program demo is\n  bool b;\nbegin\n  b := true;\n  b := not b;\nend program",
        );
        assert!(c.contains("int b_8;"));
        assert!(c.contains("b_8 = 1;"));
        assert!(c.contains("b_8 = (!b_8);"));
    }

    #[test]
    fn logical_operators_emit_their_c_forms() {
        let c = c_of(
            "program demo is\n  bool a;\n  bool b;\nbegin\n  a := a & b;\n  a := a | b;\nend program",
        );
        assert!(c.contains("a_8 = (a_8 && b_9);"));
        assert!(c.contains("a_8 = (a_8 || b_9);"));
    }

    #[test]
    fn array_parameters_pass_by_reference() {
        let c = c_of(
            "program demo is\n\
             integer nums[4];\n\
             procedure fill(integer xs[4])\nbegin\n  xs[0] := 9;\nend procedure;\n\
             begin\n  fill(nums);\nend program",
        );
        assert!(c.contains("static void fill_9(int *xs_10)"));
        assert!(c.contains("xs_10[0] = 9;"));
        assert!(c.contains("fill_9(nums_8);"));
    }

    #[test]
    fn string_array_elements_use_the_buffer_type() {
        let c = c_of(
            "program demo is\n  string names[3];\nbegin\n\
             names[0] := \"ann\";\n  putString(names[0]);\nend program",
        );
        assert!(c.contains("char names_8[3][256];"));
        assert!(c.contains("strcpy(names_8[0], \"ann\");"));
        assert!(c.contains("putString(names_8[0]);"));
    }

    #[test]
    fn debug_mode_interleaves_source_line_comments() {
        let source = "program demo is\n  integer x;\nbegin\n  x := 1;\nend program";
        let with = generate_source(source, true).c_source;
        let without = generate_source(source, false).c_source;
        assert!(with.contains("/* line 4 */"));
        assert!(!without.contains("/* line"));
    }

    #[test]
    fn value_returning_procedures_fall_back_to_zero() {
        let c = c_of(
            "program demo is\n\
             procedure f() : float\nbegin end procedure;\n\
             procedure g() : integer\nbegin end procedure;\n\
             begin\n  putFloat(f());\n  putInteger(g());\nend program",
        );
        assert!(c.contains("return 0.0f;"));
        assert!(c.contains("return 0;"));
    }
}
