//! Recursive-descent parser.
//!
//! One function per grammar production, a two-token lookahead to tell
//! calls from assignments, and panic-mode recovery: when a production
//! goes wrong it reports one diagnostic and the parser skips ahead to
//! the next `;` (or stops in front of `begin`, `end` or end of file),
//! then resumes with the next declaration or statement. A single run
//! therefore reports every independent syntax error it can find.

use crate::ast::{
    ArrayBound, AssignStmt, BinaryOp, CallStmt, Decl, DeclKind, Destination, Expr, ExprKind,
    ForStmt, IfStmt, ProcDecl, Program, ReturnStmt, Stmt, TypeMark, UnaryOp, VarDecl,
};
use crate::diagnostic::Diagnostic;
use crate::lexer::{Token, TokenKind};
use crate::span::Span;

/// Result of parsing a token stream.
///
/// `program` is `None` only when the `program <name> is` header could
/// not be parsed; any later error still yields a (partial) tree so
/// that the caller can count and render every diagnostic.
#[derive(Debug)]
pub struct ParseResult {
    pub program: Option<Program>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a token stream produced by [`crate::lexer::lex`].
pub fn parse(tokens: &[Token]) -> ParseResult {
    if tokens.is_empty() {
        return ParseResult {
            program: None,
            diagnostics: vec![
                Diagnostic::error("expected `program`, found end of file", Span::new(1, 1, 0))
                    .with_code("E0101"),
            ],
        };
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        diagnostics: Vec::new(),
    };
    let program = parser.parse_program();
    ParseResult {
        program,
        diagnostics: parser.diagnostics,
    }
}

/// Marker for a production that already reported its diagnostic.
struct Recovered;

type Parse<T> = Result<T, Recovered>;

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Parser<'t> {
    // ----- token cursor -------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind
    }

    fn peek_ahead(&self, offset: usize) -> TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        self.tokens[index].kind
    }

    /// Consume and return the current token. Never advances past the
    /// final `Eof` token.
    fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Parse<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.expected(kind.describe()))
        }
    }

    /// Report `expected X, found Y` at the current token.
    fn expected(&mut self, what: &str) -> Recovered {
        let (found, span) = {
            let token = self.peek();
            (token.kind.describe(), token.span)
        };
        self.diagnostics.push(
            Diagnostic::error(format!("expected {what}, found {found}"), span)
                .with_code("E0101"),
        );
        Recovered
    }

    /// Skip ahead to the next statement boundary. Consumes the `;`
    /// when one is found; stops in front of `begin`, `end` and end of
    /// file so the enclosing list can decide what they mean.
    fn resync(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Semi => {
                    self.bump();
                    return;
                }
                TokenKind::Begin | TokenKind::End | TokenKind::Eof => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ----- program structure --------------------------------------------

    fn parse_program(&mut self) -> Option<Program> {
        let (name, span) = match self.parse_program_header() {
            Ok(header) => header,
            Err(Recovered) => return None,
        };

        let decls = self.parse_declaration_list();
        if !self.eat(TokenKind::Begin) {
            self.expected(TokenKind::Begin.describe());
        }
        let body = self.parse_statement_list();

        let mut complete = false;
        if self.eat(TokenKind::End) {
            if self.eat(TokenKind::Program) {
                complete = true;
            } else {
                self.expected(TokenKind::Program.describe());
            }
        } else {
            self.expected("`end program`");
        }

        if complete && !self.at(TokenKind::Eof) {
            let span = self.peek().span;
            self.diagnostics
                .push(Diagnostic::warning("text after `end program` is ignored", span));
        }

        Some(Program {
            name,
            span,
            decls,
            body,
        })
    }

    fn parse_program_header(&mut self) -> Parse<(String, Span)> {
        self.expect(TokenKind::Program)?;
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::Is)?;
        Ok((name.lexeme, name.span))
    }

    // ----- declarations -------------------------------------------------

    fn parse_declaration_list(&mut self) -> Vec<Decl> {
        let mut decls = Vec::new();
        loop {
            match self.peek_kind() {
                TokenKind::Begin | TokenKind::End | TokenKind::Eof => break,
                _ => {}
            }
            match self.parse_declaration() {
                Ok(decl) => {
                    decls.push(decl);
                    if self.expect(TokenKind::Semi).is_err() {
                        self.resync();
                    }
                }
                Err(Recovered) => self.resync(),
            }
        }
        decls
    }

    fn parse_declaration(&mut self) -> Parse<Decl> {
        let is_global = self.eat(TokenKind::Global);
        let kind = match self.peek_kind() {
            TokenKind::Procedure => DeclKind::Procedure(self.parse_procedure_decl()?),
            TokenKind::TypeInteger
            | TokenKind::TypeFloat
            | TokenKind::TypeBool
            | TokenKind::TypeString => DeclKind::Variable(self.parse_variable_decl()?),
            _ => return Err(self.expected("a declaration")),
        };
        let span = match &kind {
            DeclKind::Variable(var) => var.span,
            DeclKind::Procedure(proc) => proc.span,
        };
        Ok(Decl {
            kind,
            is_global,
            span,
        })
    }

    fn parse_variable_decl(&mut self) -> Parse<VarDecl> {
        let ty = self.parse_type_mark()?;
        let name = self.expect(TokenKind::Ident)?;
        let bound = if self.eat(TokenKind::LBracket) {
            let literal = self.expect(TokenKind::IntLiteral)?;
            let value = self.int_value(&literal);
            self.expect(TokenKind::RBracket)?;
            Some(ArrayBound {
                value,
                span: literal.span,
            })
        } else {
            None
        };
        Ok(VarDecl {
            name: name.lexeme,
            ty,
            bound,
            span: name.span,
        })
    }

    fn parse_type_mark(&mut self) -> Parse<TypeMark> {
        let mark = match self.peek_kind() {
            TokenKind::TypeInteger => TypeMark::Integer,
            TokenKind::TypeFloat => TypeMark::Float,
            TokenKind::TypeBool => TypeMark::Bool,
            TokenKind::TypeString => TypeMark::String,
            _ => return Err(self.expected("a type name")),
        };
        self.bump();
        Ok(mark)
    }

    fn parse_procedure_decl(&mut self) -> Parse<ProcDecl> {
        self.expect(TokenKind::Procedure)?;
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(TokenKind::RParen) {
            loop {
                params.push(self.parse_variable_decl()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;
        let ret = if self.eat(TokenKind::Colon) {
            Some(self.parse_type_mark()?)
        } else {
            None
        };

        let decls = self.parse_declaration_list();
        self.expect(TokenKind::Begin)?;
        let body = self.parse_statement_list();
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::Procedure)?;

        Ok(ProcDecl {
            name: name.lexeme,
            params,
            ret,
            decls,
            body,
            span: name.span,
        })
    }

    // ----- statements ---------------------------------------------------

    fn parse_statement_list(&mut self) -> Vec<Stmt> {
        let mut stmts = Vec::new();
        loop {
            match self.peek_kind() {
                // `begin` terminates the list too: resync never
                // consumes it, so looping on it would never end.
                TokenKind::End | TokenKind::Else | TokenKind::Eof | TokenKind::Begin => break,
                _ => {}
            }
            match self.parse_statement() {
                Ok(stmt) => {
                    stmts.push(stmt);
                    if self.expect(TokenKind::Semi).is_err() {
                        self.resync();
                    }
                }
                Err(Recovered) => self.resync(),
            }
        }
        stmts
    }

    fn parse_statement(&mut self) -> Parse<Stmt> {
        match self.peek_kind() {
            TokenKind::If => Ok(Stmt::If(self.parse_if()?)),
            TokenKind::For => Ok(Stmt::For(self.parse_for()?)),
            TokenKind::Return => Ok(Stmt::Return(self.parse_return()?)),
            TokenKind::Ident => {
                // Second-token lookahead tells a call statement apart
                // from an assignment to a variable.
                if self.peek_ahead(1) == TokenKind::LParen {
                    Ok(Stmt::Call(self.parse_call_stmt()?))
                } else {
                    Ok(Stmt::Assign(self.parse_assignment()?))
                }
            }
            _ => Err(self.expected("a statement")),
        }
    }

    fn parse_assignment(&mut self) -> Parse<AssignStmt> {
        let dest = self.parse_destination()?;
        self.expect(TokenKind::Assign)?;
        let value = self.parse_expression()?;
        Ok(AssignStmt { dest, value })
    }

    fn parse_destination(&mut self) -> Parse<Destination> {
        let name = self.expect(TokenKind::Ident)?;
        let index = if self.eat(TokenKind::LBracket) {
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket)?;
            Some(index)
        } else {
            None
        };
        Ok(Destination {
            name: name.lexeme,
            index,
            span: name.span,
        })
    }

    fn parse_if(&mut self) -> Parse<IfStmt> {
        let keyword = self.expect(TokenKind::If)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Then)?;
        let then_body = self.parse_statement_list();
        let else_body = if self.eat(TokenKind::Else) {
            self.parse_statement_list()
        } else {
            Vec::new()
        };
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::If)?;
        Ok(IfStmt {
            cond,
            then_body,
            else_body,
            span: keyword.span,
        })
    }

    fn parse_for(&mut self) -> Parse<ForStmt> {
        let keyword = self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;
        let init = self.parse_assignment()?;
        self.expect(TokenKind::Semi)?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen)?;
        let body = self.parse_statement_list();
        self.expect(TokenKind::End)?;
        self.expect(TokenKind::For)?;
        Ok(ForStmt {
            init,
            cond,
            body,
            span: keyword.span,
        })
    }

    fn parse_return(&mut self) -> Parse<ReturnStmt> {
        let keyword = self.expect(TokenKind::Return)?;
        let value = match self.peek_kind() {
            TokenKind::Semi | TokenKind::End | TokenKind::Eof => None,
            _ => Some(self.parse_expression()?),
        };
        Ok(ReturnStmt {
            value,
            span: keyword.span,
        })
    }

    fn parse_call_stmt(&mut self) -> Parse<CallStmt> {
        let name = self.expect(TokenKind::Ident)?;
        self.expect(TokenKind::LParen)?;
        let args = self.parse_argument_list()?;
        self.expect(TokenKind::RParen)?;
        Ok(CallStmt {
            name: name.lexeme,
            args,
            span: name.span,
        })
    }

    fn parse_argument_list(&mut self) -> Parse<Vec<Expr>> {
        let mut args = Vec::new();
        if self.at(TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        Ok(args)
    }

    // ----- expressions --------------------------------------------------
    //
    // One function per precedence level, lowest first. All binary
    // operators associate to the left.

    fn parse_expression(&mut self) -> Parse<Expr> {
        self.parse_logical()
    }

    fn parse_logical(&mut self) -> Parse<Expr> {
        let mut lhs = self.parse_relation()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Amp => BinaryOp::And,
                TokenKind::Pipe => BinaryOp::Or,
                _ => break,
            };
            let op_span = self.bump().span;
            let rhs = self.parse_relation()?;
            lhs = binary(op, lhs, rhs, op_span);
        }
        Ok(lhs)
    }

    fn parse_relation(&mut self) -> Parse<Expr> {
        let mut lhs = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEq => BinaryOp::LessEq,
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEq => BinaryOp::GreaterEq,
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::NotEq,
                _ => break,
            };
            let op_span = self.bump().span;
            let rhs = self.parse_additive()?;
            lhs = binary(op, lhs, rhs, op_span);
        }
        Ok(lhs)
    }

    fn parse_additive(&mut self) -> Parse<Expr> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let op_span = self.bump().span;
            let rhs = self.parse_term()?;
            lhs = binary(op, lhs, rhs, op_span);
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Parse<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            let op_span = self.bump().span;
            let rhs = self.parse_unary()?;
            lhs = binary(op, lhs, rhs, op_span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Parse<Expr> {
        let op = match self.peek_kind() {
            TokenKind::Not => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        let op_span = self.bump().span;
        let operand = self.parse_unary()?;
        Ok(Expr {
            kind: ExprKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span: op_span,
        })
    }

    fn parse_primary(&mut self) -> Parse<Expr> {
        match self.peek_kind() {
            TokenKind::IntLiteral => {
                let token = self.bump();
                let value = self.int_value(&token);
                Ok(Expr {
                    kind: ExprKind::IntLit(value),
                    span: token.span,
                })
            }
            TokenKind::FloatLiteral => {
                let token = self.bump();
                let value = self.float_value(&token);
                Ok(Expr {
                    kind: ExprKind::FloatLit(value),
                    span: token.span,
                })
            }
            TokenKind::StringLiteral => {
                let token = self.bump();
                Ok(Expr {
                    kind: ExprKind::StringLit(decode_string_literal(&token.lexeme)),
                    span: token.span,
                })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.bump();
                Ok(Expr {
                    kind: ExprKind::BoolLit(token.kind == TokenKind::True),
                    span: token.span,
                })
            }
            TokenKind::Ident => match self.peek_ahead(1) {
                TokenKind::LParen => {
                    let name = self.bump();
                    self.bump();
                    let args = self.parse_argument_list()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(Expr {
                        kind: ExprKind::Call {
                            name: name.lexeme,
                            args,
                        },
                        span: name.span,
                    })
                }
                TokenKind::LBracket => {
                    let name = self.bump();
                    self.bump();
                    let index = self.parse_expression()?;
                    self.expect(TokenKind::RBracket)?;
                    Ok(Expr {
                        kind: ExprKind::Index {
                            name: name.lexeme,
                            index: Box::new(index),
                        },
                        span: name.span,
                    })
                }
                _ => {
                    let name = self.bump();
                    Ok(Expr {
                        kind: ExprKind::Name(name.lexeme),
                        span: name.span,
                    })
                }
            },
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expression()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            _ => Err(self.expected("an expression")),
        }
    }

    // ----- literal values -----------------------------------------------

    /// Value of an integer literal token. Reports literals above the
    /// 32-bit range and substitutes zero so parsing can continue.
    fn int_value(&mut self, token: &Token) -> i64 {
        let digits: String = token.lexeme.chars().filter(|ch| *ch != '_').collect();
        match digits.parse::<i64>() {
            Ok(value) if value <= i64::from(i32::MAX) => value,
            _ => {
                self.diagnostics.push(
                    Diagnostic::error("integer literal is out of range", token.span)
                        .with_code("E0101"),
                );
                0
            }
        }
    }

    fn float_value(&mut self, token: &Token) -> f64 {
        let digits: String = token.lexeme.chars().filter(|ch| *ch != '_').collect();
        match digits.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => {
                self.diagnostics.push(
                    Diagnostic::error("float literal is out of range", token.span)
                        .with_code("E0101"),
                );
                0.0
            }
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr, span: Span) -> Expr {
    Expr {
        kind: ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        span,
    }
}

/// Turn a string literal lexeme into its contents, resolving the
/// escape sequences the scanner accepted.
fn decode_string_literal(lexeme: &str) -> String {
    let inner = lexeme
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            // The scanner already rejected other escapes; keep the
            // character so the tree stays usable.
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_source(source: &str) -> ParseResult {
        let lexed = lex(source);
        assert!(
            lexed.diagnostics.is_empty(),
            "scan errors: {:?}",
            lexed.diagnostics
        );
        parse(&lexed.tokens)
    }

    fn program_of(source: &str) -> Program {
        let result = parse_source(source);
        assert!(
            result.diagnostics.is_empty(),
            "diagnostics: {:?}",
            result.diagnostics
        );
        result.program.expect("program")
    }

    fn with_body(body: &str) -> String {
        format!("program demo is\nbegin\n{body}\nend program\n")
    }

    #[test]
    fn parses_a_minimal_program() {
        let program = program_of("program demo is begin end program");
        assert_eq!(program.name, "demo");
        assert!(program.decls.is_empty());
        assert!(program.body.is_empty());
    }

    #[test]
    fn parses_variable_declarations_with_globals_and_arrays() {
        let program = program_of(
            "program demo is\n  integer x;\n  global float ys[10];\nbegin end program",
        );
        assert_eq!(program.decls.len(), 2);
        assert!(!program.decls[0].is_global);
        assert!(program.decls[1].is_global);
        let DeclKind::Variable(var) = &program.decls[1].kind else {
            panic!("expected a variable");
        };
        assert_eq!(var.name, "ys");
        assert_eq!(var.ty, TypeMark::Float);
        assert_eq!(var.bound.as_ref().map(|b| b.value), Some(10));
    }

    #[test]
    fn parses_a_procedure_with_params_and_return_type() {
        let program = program_of(
            "program demo is\n\
             procedure add(integer a, integer b) : integer\n\
             begin\n  return a + b;\nend procedure;\n\
             begin end program",
        );
        let DeclKind::Procedure(proc) = &program.decls[0].kind else {
            panic!("expected a procedure");
        };
        assert_eq!(proc.name, "add");
        assert_eq!(proc.params.len(), 2);
        assert_eq!(proc.ret, Some(TypeMark::Integer));
        assert_eq!(proc.body.len(), 1);
    }

    #[test]
    fn precedence_orders_logical_below_relational_below_arithmetic() {
        let program = program_of(&with_body("x := a + b * c < d & e;"));
        let Stmt::Assign(assign) = &program.body[0] else {
            panic!("expected an assignment");
        };
        // (((a + (b * c)) < d) & e)
        let ExprKind::Binary { op, lhs, .. } = &assign.value.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOp::And);
        let ExprKind::Binary { op, lhs, .. } = &lhs.kind else {
            panic!("expected a relation");
        };
        assert_eq!(*op, BinaryOp::Less);
        let ExprKind::Binary { op, rhs, .. } = &lhs.kind else {
            panic!("expected an addition");
        };
        assert_eq!(*op, BinaryOp::Add);
        let ExprKind::Binary { op, .. } = &rhs.kind else {
            panic!("expected a multiplication");
        };
        assert_eq!(*op, BinaryOp::Mul);
    }

    #[test]
    fn binary_operators_associate_left() {
        let program = program_of(&with_body("x := a - b - c;"));
        let Stmt::Assign(assign) = &program.body[0] else {
            panic!("expected an assignment");
        };
        let ExprKind::Binary { op, lhs, rhs } = &assign.value.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOp::Sub);
        assert!(matches!(&rhs.kind, ExprKind::Name(n) if n == "c"));
        assert!(matches!(&lhs.kind, ExprKind::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn unary_operators_nest_and_bind_tighter_than_multiplication() {
        let program = program_of(&with_body("x := -a * not b;"));
        let Stmt::Assign(assign) = &program.body[0] else {
            panic!("expected an assignment");
        };
        let ExprKind::Binary { op, lhs, rhs } = &assign.value.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOp::Mul);
        assert!(matches!(&lhs.kind, ExprKind::Unary { op: UnaryOp::Neg, .. }));
        assert!(matches!(&rhs.kind, ExprKind::Unary { op: UnaryOp::Not, .. }));
    }

    #[test]
    fn lookahead_tells_calls_from_assignments() {
        let program = program_of(&with_body("step();\nstep := 1;"));
        assert!(matches!(&program.body[0], Stmt::Call(_)));
        assert!(matches!(&program.body[1], Stmt::Assign(_)));
    }

    #[test]
    fn parses_if_with_else_and_for_loops() {
        let program = program_of(&with_body(
            "if (x < 10) then\n  x := x + 1;\nelse\n  x := 0;\nend if;\n\
             for (i := 0; i < 3)\n  x := x + i;\nend for;",
        ));
        let Stmt::If(if_stmt) = &program.body[0] else {
            panic!("expected if");
        };
        assert_eq!(if_stmt.then_body.len(), 1);
        assert_eq!(if_stmt.else_body.len(), 1);
        let Stmt::For(for_stmt) = &program.body[1] else {
            panic!("expected for");
        };
        assert_eq!(for_stmt.init.dest.name, "i");
        assert_eq!(for_stmt.body.len(), 1);
    }

    #[test]
    fn return_value_is_optional() {
        let program = program_of(&with_body("return;\nreturn x + 1;"));
        let Stmt::Return(bare) = &program.body[0] else {
            panic!("expected return");
        };
        assert!(bare.value.is_none());
        let Stmt::Return(valued) = &program.body[1] else {
            panic!("expected return");
        };
        assert!(valued.value.is_some());
    }

    #[test]
    fn string_literal_escapes_are_decoded() {
        let program = program_of(&with_body(r#"s := "a\n\"b\"";"#));
        let Stmt::Assign(assign) = &program.body[0] else {
            panic!("expected an assignment");
        };
        assert_eq!(assign.value.kind, ExprKind::StringLit("a\n\"b\"".to_string()));
    }

    #[test]
    fn reports_an_error_for_each_bad_statement() {
        let result = parse_source(&with_body("x := ;\ny := ;\nz := 1;"));
        assert_eq!(result.diagnostics.len(), 2);
        assert!(result.diagnostics.iter().all(|d| d.code == Some("E0101")));
        // The good statement after the two bad ones still parses.
        let program = result.program.expect("program");
        assert_eq!(program.body.len(), 1);
    }

    #[test]
    fn missing_semicolon_skips_to_the_next_boundary() {
        let result = parse_source(&with_body("x := 1\ny := 2;\nz := 3;"));
        assert_eq!(result.diagnostics.len(), 1);
        let program = result.program.expect("program");
        // `y := 2` was consumed by recovery; `z := 3` survives.
        assert_eq!(program.body.len(), 2);
    }

    #[test]
    fn recovery_inside_a_procedure_does_not_lose_the_program() {
        let result = parse_source(
            "program demo is\n\
             procedure p()\n  integer x\nbegin\n  x := 1;\nend procedure;\n\
             begin\n  p();\nend program",
        );
        assert!(!result.diagnostics.is_empty());
        assert!(result.program.is_some());
    }

    #[test]
    fn integer_literals_above_the_32_bit_range_are_rejected() {
        let result = parse_source(&with_body("x := 3000000000;"));
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("out of range"));
        assert!(result.program.is_some());
    }

    #[test]
    fn text_after_end_program_is_a_warning_not_an_error() {
        let result = parse_source("program demo is begin end program x := 1;");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(!result.diagnostics[0].is_error());
        assert!(result.program.is_some());
    }

    #[test]
    fn missing_header_yields_no_program() {
        let result = parse_source("begin end program");
        assert!(result.program.is_none());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn parenthesized_expressions_regroup_precedence() {
        let program = program_of(&with_body("x := (a + b) * c;"));
        let Stmt::Assign(assign) = &program.body[0] else {
            panic!("expected an assignment");
        };
        let ExprKind::Binary { op, lhs, .. } = &assign.value.kind else {
            panic!("expected a binary expression");
        };
        assert_eq!(*op, BinaryOp::Mul);
        assert!(matches!(&lhs.kind, ExprKind::Binary { op: BinaryOp::Add, .. }));
    }
}
