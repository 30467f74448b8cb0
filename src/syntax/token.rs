//! Token types produced by the lexer.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::base::{LineCol, TextRange};

/// Reserved words of the DSL.
///
/// This is a closed set: any word spelled exactly like one of these is a
/// keyword wherever it appears, including positions where an identifier is
/// expected. It holds the declaration openers and the expression operators.
/// Words that only introduce an item inside a block (`app`, `section`,
/// `field`, `action`, `step`, `ref`, `index`, `for`, `meta`) are plain
/// identifiers and are recognized by position.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Keyword {
    Module,
    Use,
    Entity,
    Surface,
    Workspace,
    Experience,
    Service,
    ForeignModel,
    Integration,
    Uses,
    Aggregate,
    Unique,
    True,
    False,
    And,
    Or,
    Not,
    In,
    Asc,
    Desc,
    Where,
}

impl Keyword {
    /// Every keyword, in declaration order.
    pub const ALL: &'static [Keyword] = &[
        Keyword::Module,
        Keyword::Use,
        Keyword::Entity,
        Keyword::Surface,
        Keyword::Workspace,
        Keyword::Experience,
        Keyword::Service,
        Keyword::ForeignModel,
        Keyword::Integration,
        Keyword::Uses,
        Keyword::Aggregate,
        Keyword::Unique,
        Keyword::True,
        Keyword::False,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::In,
        Keyword::Asc,
        Keyword::Desc,
        Keyword::Where,
    ];

    /// The source spelling of this keyword.
    pub const fn as_str(self) -> &'static str {
        match self {
            Keyword::Module => "module",
            Keyword::Use => "use",
            Keyword::Entity => "entity",
            Keyword::Surface => "surface",
            Keyword::Workspace => "workspace",
            Keyword::Experience => "experience",
            Keyword::Service => "service",
            Keyword::ForeignModel => "foreign_model",
            Keyword::Integration => "integration",
            Keyword::Uses => "uses",
            Keyword::Aggregate => "aggregate",
            Keyword::Unique => "unique",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::In => "in",
            Keyword::Asc => "asc",
            Keyword::Desc => "desc",
            Keyword::Where => "where",
        }
    }

    /// Keywords that open a top-level declaration.
    ///
    /// The parser resynchronizes on these after a syntax error.
    pub const fn starts_declaration(self) -> bool {
        matches!(
            self,
            Keyword::Module
                | Keyword::Use
                | Keyword::Entity
                | Keyword::Surface
                | Keyword::Workspace
                | Keyword::Experience
                | Keyword::Service
                | Keyword::ForeignModel
                | Keyword::Integration
        )
    }

    /// Check whether a word is reserved.
    pub fn is_reserved(word: &str) -> bool {
        word.parse::<Keyword>().is_ok()
    }
}

impl FromStr for Keyword {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Keyword::ALL
            .iter()
            .copied()
            .find(|kw| kw.as_str() == s)
            .ok_or(())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of a token.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident,
    /// A string literal; the token text holds the unescaped value.
    Str,
    Int,
    Decimal,
    Colon,
    Comma,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Arrow,
    Question,
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Human-readable description used in syntax errors.
    pub fn describe(self) -> String {
        let s = match self {
            TokenKind::Keyword(kw) => return format!("keyword '{kw}'"),
            TokenKind::Ident => "identifier",
            TokenKind::Str => "string",
            TokenKind::Int => "integer",
            TokenKind::Decimal => "decimal",
            TokenKind::Colon => "':'",
            TokenKind::Comma => "','",
            TokenKind::Dot => "'.'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Eq => "'='",
            TokenKind::Ne => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Arrow => "'->'",
            TokenKind::Question => "'?'",
            TokenKind::Newline => "end of line",
            TokenKind::Indent => "indented block",
            TokenKind::Dedent => "end of block",
            TokenKind::Eof => "end of file",
        };
        s.to_string()
    }
}

/// A single token with its position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// The lexeme. Empty for layout tokens, unescaped for strings.
    pub text: SmolStr,
    /// Start position of the token.
    pub pos: LineCol,
    /// Byte range in the source text.
    pub range: TextRange,
}

impl Token {
    /// 1-indexed line of the token.
    pub fn line(&self) -> u32 {
        self.pos.line_one_indexed()
    }

    /// 1-indexed column of the token.
    pub fn col(&self) -> u32 {
        self.pos.col_one_indexed()
    }

    /// Check whether this token is the given keyword.
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    /// Check whether this token is an identifier spelled `word`.
    pub fn is_word(&self, word: &str) -> bool {
        self.kind == TokenKind::Ident && self.text == word
    }
}
