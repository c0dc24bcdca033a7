//! Scanner for Slate source text.
//!
//! The scanner is intentionally simple: it recognizes keywords,
//! identifiers, literals and operators, and attaches no semantic
//! meaning beyond that. Higher layers interpret the token text.
//!
//! Scan problems never abort the scan. Each one becomes a diagnostic
//! and scanning resumes at the next character, so a single pass
//! reports every bad character in the file.

use crate::diagnostic::Diagnostic;
use crate::span::Span;

/// Kind of a token produced by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    // Special
    Eof,

    // Identifiers and literals
    Ident,
    IntLiteral,
    FloatLiteral,
    StringLiteral,

    // Keywords
    Program,
    Is,
    Global,
    Procedure,
    Begin,
    End,
    If,
    Then,
    Else,
    For,
    Return,
    Not,
    True,
    False,
    TypeInteger, // integer
    TypeFloat,   // float
    TypeBool,    // bool
    TypeString,  // string

    // Punctuation
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]
    Comma,    // ,
    Semi,     // ;
    Colon,    // :

    // Operators
    Assign,    // :=
    Plus,      // +
    Minus,     // -
    Star,      // *
    Slash,     // /
    Less,      // <
    LessEq,    // <=
    Greater,   // >
    GreaterEq, // >=
    EqEq,      // ==
    NotEq,     // !=
    Amp,       // &
    Pipe,      // |
}

impl TokenKind {
    /// Human name used in parser diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Eof => "end of file",
            TokenKind::Ident => "an identifier",
            TokenKind::IntLiteral => "an integer literal",
            TokenKind::FloatLiteral => "a float literal",
            TokenKind::StringLiteral => "a string literal",
            TokenKind::Program => "`program`",
            TokenKind::Is => "`is`",
            TokenKind::Global => "`global`",
            TokenKind::Procedure => "`procedure`",
            TokenKind::Begin => "`begin`",
            TokenKind::End => "`end`",
            TokenKind::If => "`if`",
            TokenKind::Then => "`then`",
            TokenKind::Else => "`else`",
            TokenKind::For => "`for`",
            TokenKind::Return => "`return`",
            TokenKind::Not => "`not`",
            TokenKind::True => "`true`",
            TokenKind::False => "`false`",
            TokenKind::TypeInteger => "`integer`",
            TokenKind::TypeFloat => "`float`",
            TokenKind::TypeBool => "`bool`",
            TokenKind::TypeString => "`string`",
            TokenKind::LParen => "`(`",
            TokenKind::RParen => "`)`",
            TokenKind::LBracket => "`[`",
            TokenKind::RBracket => "`]`",
            TokenKind::Comma => "`,`",
            TokenKind::Semi => "`;`",
            TokenKind::Colon => "`:`",
            TokenKind::Assign => "`:=`",
            TokenKind::Plus => "`+`",
            TokenKind::Minus => "`-`",
            TokenKind::Star => "`*`",
            TokenKind::Slash => "`/`",
            TokenKind::Less => "`<`",
            TokenKind::LessEq => "`<=`",
            TokenKind::Greater => "`>`",
            TokenKind::GreaterEq => "`>=`",
            TokenKind::EqEq => "`==`",
            TokenKind::NotEq => "`!=`",
            TokenKind::Amp => "`&`",
            TokenKind::Pipe => "`|`",
        }
    }
}

/// A single token with its kind, raw text and position.
///
/// `lexeme` is the text exactly as written, quotes and escapes
/// included for string literals. Concatenating the lexemes of every
/// token except `Eof` reproduces the source minus whitespace and
/// comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

/// Result of scanning a source file.
#[derive(Debug)]
pub struct LexResult {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Scan a source string into tokens.
///
/// The token sequence always terminates with a single `Eof` token,
/// even when the input is empty or ends inside a bad construct.
pub fn lex(source: &str) -> LexResult {
    let mut lexer = Lexer {
        source,
        chars: source.as_bytes(),
        len: source.len(),
        index: 0,
        line: 1,
        line_start: 0,
        diagnostics: Vec::new(),
    };
    lexer.run()
}

struct Lexer<'src> {
    source: &'src str,
    chars: &'src [u8],
    len: usize,
    index: usize,
    line: u32,
    line_start: usize,
    diagnostics: Vec<Diagnostic>,
}

impl<'src> Lexer<'src> {
    fn run(&mut self) -> LexResult {
        let mut tokens = Vec::new();

        while let Some(ch) = self.peek_char() {
            if ch == b'\n' {
                self.consume_char();
                self.line += 1;
                self.line_start = self.index;
                continue;
            }
            if is_whitespace(ch) {
                self.consume_char();
                continue;
            }

            let start = self.index;
            let token = match ch {
                b'(' => {
                    self.consume_char();
                    self.simple_token(TokenKind::LParen, start)
                }
                b')' => {
                    self.consume_char();
                    self.simple_token(TokenKind::RParen, start)
                }
                b'[' => {
                    self.consume_char();
                    self.simple_token(TokenKind::LBracket, start)
                }
                b']' => {
                    self.consume_char();
                    self.simple_token(TokenKind::RBracket, start)
                }
                b',' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Comma, start)
                }
                b';' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Semi, start)
                }
                b'+' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Plus, start)
                }
                b'-' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Minus, start)
                }
                b'*' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Star, start)
                }
                b'&' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Amp, start)
                }
                b'|' => {
                    self.consume_char();
                    self.simple_token(TokenKind::Pipe, start)
                }
                b'/' => {
                    // "//" starts a comment that runs to end of line.
                    if self.peek_next() == Some(b'/') {
                        while let Some(ch) = self.peek_char() {
                            if ch == b'\n' {
                                break;
                            }
                            self.consume_char();
                        }
                        continue;
                    }
                    self.consume_char();
                    self.simple_token(TokenKind::Slash, start)
                }
                b':' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'=') {
                        self.consume_char();
                        self.simple_token(TokenKind::Assign, start)
                    } else {
                        self.simple_token(TokenKind::Colon, start)
                    }
                }
                b'<' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'=') {
                        self.consume_char();
                        self.simple_token(TokenKind::LessEq, start)
                    } else {
                        self.simple_token(TokenKind::Less, start)
                    }
                }
                b'>' => {
                    self.consume_char();
                    if self.peek_char() == Some(b'=') {
                        self.consume_char();
                        self.simple_token(TokenKind::GreaterEq, start)
                    } else {
                        self.simple_token(TokenKind::Greater, start)
                    }
                }
                b'=' => {
                    if self.peek_next() == Some(b'=') {
                        self.consume_char();
                        self.consume_char();
                        self.simple_token(TokenKind::EqEq, start)
                    } else {
                        self.consume_char();
                        self.report(
                            start,
                            "unexpected `=`; assignment is `:=` and comparison is `==`",
                            "E0001",
                        );
                        None
                    }
                }
                b'!' => {
                    if self.peek_next() == Some(b'=') {
                        self.consume_char();
                        self.consume_char();
                        self.simple_token(TokenKind::NotEq, start)
                    } else {
                        self.consume_char();
                        self.report(
                            start,
                            "unexpected `!`; negation is `not` and inequality is `!=`",
                            "E0001",
                        );
                        None
                    }
                }
                b'"' => self.lex_string(start),
                b'0'..=b'9' => self.lex_number(start),
                _ => {
                    if is_ident_start(ch) {
                        self.lex_ident_or_keyword(start)
                    } else {
                        self.lex_unexpected(start)
                    }
                }
            };

            if let Some(tok) = token {
                tokens.push(tok);
            }
        }

        let eof_span = Span::new(self.line, self.col_at(self.len), 0);
        tokens.push(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: eof_span,
        });

        LexResult {
            tokens,
            diagnostics: std::mem::take(&mut self.diagnostics),
        }
    }

    fn col_at(&self, index: usize) -> u32 {
        (index - self.line_start) as u32 + 1
    }

    fn span_from(&self, start: usize) -> Span {
        Span::new(self.line, self.col_at(start), (self.index - start) as u32)
    }

    fn simple_token(&self, kind: TokenKind, start: usize) -> Option<Token> {
        Some(Token {
            kind,
            lexeme: self.source[start..self.index].to_string(),
            span: self.span_from(start),
        })
    }

    fn report(&mut self, start: usize, message: impl Into<String>, code: &'static str) {
        let span = self.span_from(start);
        self.diagnostics.push(Diagnostic::error(message, span).with_code(code));
    }

    fn lex_unexpected(&mut self, start: usize) -> Option<Token> {
        // Consume the whole character, which may be multi-byte.
        let ch = self.source[start..].chars().next().unwrap_or(' ');
        for _ in 0..ch.len_utf8() {
            self.consume_char();
        }
        self.report(start, format!("unexpected character `{ch}`"), "E0001");
        None
    }

    fn lex_string(&mut self, start: usize) -> Option<Token> {
        // Consume the opening quote.
        self.consume_char();

        loop {
            match self.peek_char() {
                Some(b'"') => {
                    self.consume_char();
                    return self.simple_token(TokenKind::StringLiteral, start);
                }
                Some(b'\\') => {
                    let escape_start = self.index;
                    self.consume_char();
                    match self.peek_char() {
                        Some(b'"' | b'\\' | b'n' | b't') => self.consume_char(),
                        Some(other) if other != b'\n' => {
                            let ch = self.source[self.index..].chars().next().unwrap_or(' ');
                            for _ in 0..ch.len_utf8() {
                                self.consume_char();
                            }
                            self.report(
                                escape_start,
                                format!("unknown escape sequence `\\{ch}`"),
                                "E0003",
                            );
                        }
                        _ => {}
                    }
                }
                Some(b'\n') | None => break,
                Some(_) => self.consume_char(),
            }
        }

        // String literals may not span lines.
        self.report(start, "unterminated string literal", "E0002");
        None
    }

    fn lex_number(&mut self, start: usize) -> Option<Token> {
        // digits [ '.' digits ]; underscores group digits and carry
        // no meaning.
        while let Some(ch) = self.peek_char() {
            if matches!(ch, b'0'..=b'9' | b'_') {
                self.consume_char();
            } else {
                break;
            }
        }

        let mut is_float = false;
        if self.peek_char() == Some(b'.') {
            is_float = true;
            self.consume_char();
            while let Some(ch) = self.peek_char() {
                if matches!(ch, b'0'..=b'9' | b'_') {
                    self.consume_char();
                } else {
                    break;
                }
            }
        }

        let kind = if is_float {
            TokenKind::FloatLiteral
        } else {
            TokenKind::IntLiteral
        };
        self.simple_token(kind, start)
    }

    fn lex_ident_or_keyword(&mut self, start: usize) -> Option<Token> {
        while let Some(ch) = self.peek_char() {
            if is_ident_continue(ch) {
                self.consume_char();
            } else {
                break;
            }
        }

        let text = &self.source[start..self.index];
        let kind = match text {
            "program" => TokenKind::Program,
            "is" => TokenKind::Is,
            "global" => TokenKind::Global,
            "procedure" => TokenKind::Procedure,
            "begin" => TokenKind::Begin,
            "end" => TokenKind::End,
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "not" => TokenKind::Not,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "integer" => TokenKind::TypeInteger,
            "float" => TokenKind::TypeFloat,
            "bool" => TokenKind::TypeBool,
            "string" => TokenKind::TypeString,
            _ => TokenKind::Ident,
        };

        self.simple_token(kind, start)
    }

    fn peek_char(&self) -> Option<u8> {
        self.chars.get(self.index).copied()
    }

    fn peek_next(&self) -> Option<u8> {
        self.chars.get(self.index + 1).copied()
    }

    fn consume_char(&mut self) {
        if self.index < self.len {
            self.index += 1;
        }
    }
}

fn is_whitespace(ch: u8) -> bool {
    matches!(ch, b' ' | b'\t' | b'\r')
}

fn is_ident_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic()
}

fn is_ident_continue(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source).tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        let kinds = kinds("program demo is begin end");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Program,
                TokenKind::Ident,
                TokenKind::Is,
                TokenKind::Begin,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keywords_are_case_sensitive() {
        assert_eq!(kinds("Program"), vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn scans_compound_operators() {
        let kinds = kinds(":= == != <= >= : < >");
        assert_eq!(
            kinds,
            vec![
                TokenKind::Assign,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::LessEq,
                TokenKind::GreaterEq,
                TokenKind::Colon,
                TokenKind::Less,
                TokenKind::Greater,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn distinguishes_int_and_float_literals() {
        let result = lex("42 1_000 3.25 7.");
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::IntLiteral,
                TokenKind::IntLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(result.tokens[1].lexeme, "1_000");
        assert_eq!(result.tokens[3].lexeme, "7.");
    }

    #[test]
    fn lexemes_reconstruct_source_without_trivia() {
        let source = "program demo is // banner\n  integer x;\nbegin\n  x := x + 1;\nend program\n";
        let result = lex(source);
        assert!(result.diagnostics.is_empty());
        let rebuilt: String = result.tokens.iter().map(|t| t.lexeme.as_str()).collect();
        // Whitespace and the comment body never reach the token stream.
        assert_eq!(rebuilt, "programdemoisintegerx;beginx:=x+1;endprogram");
    }

    #[test]
    fn reports_unexpected_character_and_resumes() {
        let result = lex("x @ y");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some("E0001"));
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn lone_equals_suggests_the_right_operators() {
        let result = lex("x = 1");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].message.contains("`:=`"));
        assert!(result.diagnostics[0].message.contains("`==`"));
    }

    #[test]
    fn reports_unterminated_string_at_end_of_line() {
        let result = lex("\"hello\nx");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some("E0002"));
        // Scanning resumed on the next line.
        let kinds: Vec<_> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![TokenKind::Ident, TokenKind::Eof]);
    }

    #[test]
    fn reports_unknown_escape_but_keeps_the_token() {
        let result = lex("\"a\\qb\"");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, Some("E0003"));
        assert_eq!(result.tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn accepts_the_supported_escapes() {
        let result = lex(r#""a\"b\\c\nd\te""#);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.tokens[0].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn tracks_line_numbers_across_comments() {
        let result = lex("// one\n// two\nbegin");
        assert_eq!(result.tokens[0].kind, TokenKind::Begin);
        assert_eq!(result.tokens[0].span.line, 3);
        assert_eq!(result.tokens[0].span.col, 1);
    }

    #[test]
    fn empty_input_yields_a_single_eof() {
        let result = lex("");
        assert_eq!(result.tokens.len(), 1);
        assert_eq!(result.tokens[0].kind, TokenKind::Eof);
    }
}
