//! Abstract syntax tree produced by the parser.
//!
//! The tree mirrors the surface grammar with no name resolution and
//! no types beyond the written type marks. Every node carries the
//! span of its defining token so later phases can report positions.

use crate::span::Span;

/// A whole source file: `program <name> is <decls> begin <stmts> end program`.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub name: String,
    /// Span of the program name.
    pub span: Span,
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    pub kind: DeclKind,
    pub is_global: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    Variable(VarDecl),
    Procedure(ProcDecl),
}

/// `integer x` or `integer xs[10]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub name: String,
    pub ty: TypeMark,
    pub bound: Option<ArrayBound>,
    /// Span of the variable name.
    pub span: Span,
}

/// The literal bound of an array declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayBound {
    pub value: i64,
    pub span: Span,
}

/// A written type name. Arrays are not type marks; the bound lives on
/// the declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeMark {
    Integer,
    Float,
    Bool,
    String,
}

/// `procedure <name> ( <params> ) [: <ret>] <decls> begin <stmts> end procedure`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcDecl {
    pub name: String,
    pub params: Vec<VarDecl>,
    pub ret: Option<TypeMark>,
    pub decls: Vec<Decl>,
    pub body: Vec<Stmt>,
    /// Span of the procedure name.
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Assign(AssignStmt),
    If(IfStmt),
    For(ForStmt),
    Return(ReturnStmt),
    Call(CallStmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub dest: Destination,
    pub value: Expr,
}

/// Left side of an assignment: a name with an optional index.
#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub name: String,
    pub index: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_body: Vec<Stmt>,
    pub else_body: Vec<Stmt>,
    pub span: Span,
}

/// `for ( <init> ; <cond> ) <body> end for`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStmt {
    pub init: AssignStmt,
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallStmt {
    pub name: String,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    IntLit(i64),
    FloatLit(f64),
    BoolLit(bool),
    /// Decoded string contents, escapes already resolved.
    StringLit(String),
    Name(String),
    Index {
        name: String,
        index: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Less,
    LessEq,
    Greater,
    GreaterEq,
    Eq,
    NotEq,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    /// Source spelling of the operator. Also the C spelling for every
    /// operator except `&` and `|`, which the code generator maps to
    /// the C logical forms.
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Less => "<",
            BinaryOp::LessEq => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEq => ">=",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinaryOp::Less
                | BinaryOp::LessEq
                | BinaryOp::Greater
                | BinaryOp::GreaterEq
                | BinaryOp::Eq
                | BinaryOp::NotEq
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::NotEq)
    }
}
