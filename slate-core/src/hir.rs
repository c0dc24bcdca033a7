//! Typed intermediate representation.
//!
//! The checker lowers the AST into this form: every name is resolved
//! to a [`DeclId`], every expression carries its [`Type`], and the
//! implicit integer-to-float conversions are explicit [`Widen`]
//! nodes. The code generator consumes this tree and never has to
//! re-derive a type or a scope.
//!
//! [`Widen`]: HirExprKind::Widen

use crate::ast::{BinaryOp, UnaryOp};
use crate::span::Span;
use crate::symbols::DeclId;
use crate::types::Type;

/// A checked program: the program-level variables, the procedure
/// tree and the main body.
#[derive(Debug, Clone, PartialEq)]
pub struct HirProgram {
    pub name: String,
    pub vars: Vec<DeclId>,
    pub procs: Vec<HirProc>,
    pub body: Vec<HirStmt>,
}

/// A checked procedure. Nested procedures keep their nesting;
/// 出力順は code generator 側で決める。
#[derive(Debug, Clone, PartialEq)]
pub struct HirProc {
    pub decl: DeclId,
    pub params: Vec<DeclId>,
    pub vars: Vec<DeclId>,
    pub procs: Vec<HirProc>,
    pub body: Vec<HirStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HirStmt {
    Assign(HirAssign),
    If {
        cond: HirExpr,
        then_body: Vec<HirStmt>,
        else_body: Vec<HirStmt>,
        span: Span,
    },
    For {
        init: HirAssign,
        cond: HirExpr,
        body: Vec<HirStmt>,
        span: Span,
    },
    Return {
        value: Option<HirExpr>,
        span: Span,
    },
    Call(HirCall),
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirAssign {
    pub target: HirTarget,
    pub value: HirExpr,
}

/// A storage location: a variable, or one element of an array.
#[derive(Debug, Clone, PartialEq)]
pub struct HirTarget {
    pub decl: DeclId,
    pub index: Option<HirExpr>,
    /// Type of the location itself, after any indexing.
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HirCall {
    pub decl: DeclId,
    pub args: Vec<HirExpr>,
    pub span: Span,
}

/// 式は必ず型と位置を持つ。
#[derive(Debug, Clone, PartialEq)]
pub struct HirExpr {
    pub kind: HirExprKind,
    pub ty: Type,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HirExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    StringLit(String),
    Var(DeclId),
    Index {
        base: DeclId,
        index: Box<HirExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<HirExpr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<HirExpr>,
        rhs: Box<HirExpr>,
    },
    Call(HirCall),
    /// Implicit integer-to-float conversion made explicit.
    Widen(Box<HirExpr>),
}

impl HirExpr {
    /// Wrap in a [`HirExprKind::Widen`] node when `target` is wider
    /// than the expression's own type; otherwise return unchanged.
    pub fn widened_to(self, target: &Type) -> HirExpr {
        if self.ty == Type::Integer && *target == Type::Float {
            let span = self.span;
            HirExpr {
                kind: HirExprKind::Widen(Box::new(self)),
                ty: Type::Float,
                span,
            }
        } else {
            self
        }
    }
}
