//! Quill token definitions using logos

use crate::common::Span;
use crate::frontend::ast::PrimitiveType;
use logos::Logos;
use std::fmt;

/// A token with its kind, source location and line-break context
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// A newline separates this token from the previous one
    pub newline_before: bool,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span, newline_before: false }
    }
}

fn parse_int(digits: &str, radix: u32) -> Option<u64> {
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    u64::from_str_radix(&cleaned, radix).ok()
}

fn parse_float(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned.parse().ok()
}

fn unescape(lex: &mut logos::Lexer<'_, TokenKind>) -> Option<String> {
    let slice = lex.slice();
    let body = &slice[1..slice.len() - 1];
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            '0' => out.push('\0'),
            '\\' => out.push('\\'),
            '"' => out.push('"'),
            _ => return None,
        }
    }
    Some(out)
}

/// Quill token kinds
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum TokenKind {
    // Keywords - Declarations
    #[token("func")]
    Func,
    #[token("template")]
    Template,
    #[token("spec")]
    Spec,
    #[token("action")]
    Action,
    #[token("in")]
    In,
    #[token("type")]
    Type,
    #[token("const")]
    Const,
    #[token("let")]
    Let,
    #[token("export")]
    Export,
    #[token("package")]
    Package,

    // Keywords - Control Flow
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("return")]
    Return,

    // Keywords - Other
    #[token("as")]
    As,
    #[token("self")]
    SelfValue,
    #[token("Self")]
    SelfType,
    #[token("true")]
    True,
    #[token("false")]
    False,

    // Primitive types
    #[token("int", |_| PrimitiveType::Int)]
    #[token("int8", |_| PrimitiveType::Int8)]
    #[token("int16", |_| PrimitiveType::Int16)]
    #[token("int32", |_| PrimitiveType::Int32)]
    #[token("int64", |_| PrimitiveType::Int64)]
    #[token("uint", |_| PrimitiveType::UInt)]
    #[token("uint8", |_| PrimitiveType::UInt8)]
    #[token("uint16", |_| PrimitiveType::UInt16)]
    #[token("uint32", |_| PrimitiveType::UInt32)]
    #[token("uint64", |_| PrimitiveType::UInt64)]
    #[token("float", |_| PrimitiveType::Float)]
    #[token("double", |_| PrimitiveType::Double)]
    #[token("bool", |_| PrimitiveType::Bool)]
    #[token("void", |_| PrimitiveType::Void)]
    Primitive(PrimitiveType),

    // Integer literals (decimal, hex, binary)
    #[regex(r"0x[0-9a-fA-F][0-9a-fA-F_]*", priority = 3, callback = |lex| parse_int(&lex.slice()[2..], 16))]
    #[regex(r"0b[01][01_]*", priority = 3, callback = |lex| parse_int(&lex.slice()[2..], 2))]
    #[regex(r"[0-9][0-9_]*", priority = 2, callback = |lex| parse_int(lex.slice(), 10))]
    IntLiteral(u64),

    #[regex(r"[0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", priority = 3, callback = |lex| parse_float(lex.slice()))]
    FloatLiteral(f64),

    #[regex(r#""([^"\\]|\\.)*""#, unescape)]
    StringLiteral(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", priority = 1, callback = |lex| lex.slice().to_string())]
    Identifier(String),

    // Multi-character operators (longer first)
    #[token("=>")]
    FatArrow,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,

    // Single-character operators
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("!")]
    Bang,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,

    // Delimiters
    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,

    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Func => write!(f, "func"),
            TokenKind::Template => write!(f, "template"),
            TokenKind::Spec => write!(f, "spec"),
            TokenKind::Action => write!(f, "action"),
            TokenKind::In => write!(f, "in"),
            TokenKind::Type => write!(f, "type"),
            TokenKind::Const => write!(f, "const"),
            TokenKind::Let => write!(f, "let"),
            TokenKind::Export => write!(f, "export"),
            TokenKind::Package => write!(f, "package"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Break => write!(f, "break"),
            TokenKind::Continue => write!(f, "continue"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::As => write!(f, "as"),
            TokenKind::SelfValue => write!(f, "self"),
            TokenKind::SelfType => write!(f, "Self"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Primitive(p) => write!(f, "{}", p),
            TokenKind::IntLiteral(n) => write!(f, "{}", n),
            TokenKind::FloatLiteral(n) => write!(f, "{}", n),
            TokenKind::StringLiteral(s) => write!(f, "\"{}\"", s.escape_default()),
            TokenKind::Identifier(s) => write!(f, "{}", s),
            TokenKind::FatArrow => write!(f, "=>"),
            TokenKind::Shl => write!(f, "<<"),
            TokenKind::Shr => write!(f, ">>"),
            TokenKind::LtEq => write!(f, "<="),
            TokenKind::GtEq => write!(f, ">="),
            TokenKind::EqEq => write!(f, "=="),
            TokenKind::NotEq => write!(f, "!="),
            TokenKind::AndAnd => write!(f, "&&"),
            TokenKind::OrOr => write!(f, "||"),
            TokenKind::Plus => write!(f, "+"),
            TokenKind::Minus => write!(f, "-"),
            TokenKind::Star => write!(f, "*"),
            TokenKind::Slash => write!(f, "/"),
            TokenKind::Percent => write!(f, "%"),
            TokenKind::Amp => write!(f, "&"),
            TokenKind::Pipe => write!(f, "|"),
            TokenKind::Caret => write!(f, "^"),
            TokenKind::Tilde => write!(f, "~"),
            TokenKind::Bang => write!(f, "!"),
            TokenKind::Eq => write!(f, "="),
            TokenKind::Lt => write!(f, "<"),
            TokenKind::Gt => write!(f, ">"),
            TokenKind::Dot => write!(f, "."),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Colon => write!(f, ":"),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::LParen => write!(f, "("),
            TokenKind::RParen => write!(f, ")"),
            TokenKind::LBrace => write!(f, "{{"),
            TokenKind::RBrace => write!(f, "}}"),
            TokenKind::LBracket => write!(f, "["),
            TokenKind::RBracket => write!(f, "]"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
