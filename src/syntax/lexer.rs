//! Indentation-aware lexer.
//!
//! Raw scanning is done by a `logos` automaton over the whole file. This
//! module layers the block structure on top: the first token of every line
//! is compared against a stack of indentation widths to emit INDENT and
//! DEDENT tokens, and every non-blank line is terminated by NEWLINE.

use logos::Logos;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::trace;

use super::token::{Keyword, Token, TokenKind};
use crate::base::{LineCol, LineIndex, TextRange, TextSize};

/// A fatal lexical error. Lexing stops at the first one.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LexError {
    #[error("unexpected character '{ch}'")]
    UnexpectedChar { ch: char, pos: LineCol },
    #[error("unterminated string literal")]
    UnterminatedString { pos: LineCol },
    #[error("tab character in indentation; indent with spaces")]
    TabIndentation { pos: LineCol },
    #[error("inconsistent indentation: column {width} does not match any enclosing block")]
    InconsistentDedent { width: u32, pos: LineCol },
}

impl LexError {
    /// Position the error was detected at.
    pub fn pos(&self) -> LineCol {
        match self {
            LexError::UnexpectedChar { pos, .. }
            | LexError::UnterminatedString { pos }
            | LexError::TabIndentation { pos }
            | LexError::InconsistentDedent { pos, .. } => *pos,
        }
    }
}

#[derive(Logos, Copy, Clone, Debug, PartialEq, Eq)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
enum Raw {
    #[token("\n")]
    Newline,
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Word,
    #[regex(r"-?[0-9]+")]
    Int,
    #[regex(r"-?[0-9]+\.[0-9]+")]
    Decimal,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    Str,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("=")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("->")]
    Arrow,
    #[token("?")]
    Question,
}

/// Tokenize a whole source file.
pub fn tokenize(text: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    index: LineIndex,
    indents: Vec<u32>,
    tokens: Vec<Token>,
    line_open: bool,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            index: LineIndex::new(text),
            indents: vec![0],
            tokens: Vec::new(),
            line_open: false,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut raw = Raw::lexer(self.text).spanned();

        while let Some((result, span)) = raw.next() {
            let range = TextRange::new(
                TextSize::from(span.start as u32),
                TextSize::from(span.end as u32),
            );
            let pos = self.index.line_col(range.start());
            let slice = &self.text[span.clone()];

            let kind = match result {
                Ok(Raw::Newline) => {
                    if self.line_open {
                        self.push(TokenKind::Newline, SmolStr::default(), pos, range);
                        self.line_open = false;
                    }
                    continue;
                }
                Ok(kind) => kind,
                Err(()) => return Err(self.error_at(slice, pos)),
            };

            if !self.line_open {
                self.open_line(range.start(), pos)?;
                self.line_open = true;
            }

            let (kind, text) = classify(kind, slice);
            self.push(kind, text, pos, range);
        }

        let end = TextSize::of(self.text);
        let end_pos = self.index.line_col(end);
        let end_range = TextRange::empty(end);
        if self.line_open {
            self.push(TokenKind::Newline, SmolStr::default(), end_pos, end_range);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, SmolStr::default(), end_pos, end_range);
        }
        self.push(TokenKind::Eof, SmolStr::default(), end_pos, end_range);

        Ok(self.tokens)
    }

    /// Handle the indentation in front of the first token of a line.
    fn open_line(&mut self, offset: TextSize, pos: LineCol) -> Result<(), LexError> {
        let prefix = &self.text[self.index.line_prefix(offset)];
        if let Some(tab) = prefix.find('\t') {
            return Err(LexError::TabIndentation {
                pos: LineCol::new(pos.line, tab as u32),
            });
        }

        let width = prefix.len() as u32;
        let range = TextRange::empty(offset);
        let top = self.current_indent();

        if width > top {
            trace!(line = pos.line_one_indexed(), width, "indent");
            self.indents.push(width);
            self.push(TokenKind::Indent, SmolStr::default(), pos, range);
        } else if width < top {
            while self.current_indent() > width {
                self.indents.pop();
                self.push(TokenKind::Dedent, SmolStr::default(), pos, range);
            }
            if self.current_indent() != width {
                return Err(LexError::InconsistentDedent { width, pos });
            }
            trace!(line = pos.line_one_indexed(), width, "dedent");
        }

        Ok(())
    }

    fn current_indent(&self) -> u32 {
        self.indents.last().copied().unwrap_or(0)
    }

    fn push(&mut self, kind: TokenKind, text: SmolStr, pos: LineCol, range: TextRange) {
        self.tokens.push(Token {
            kind,
            text,
            pos,
            range,
        });
    }

    fn error_at(&self, slice: &str, pos: LineCol) -> LexError {
        match slice.chars().next() {
            Some('"') => LexError::UnterminatedString { pos },
            Some(ch) => LexError::UnexpectedChar { ch, pos },
            None => LexError::UnexpectedChar { ch: '\0', pos },
        }
    }
}

fn classify(raw: Raw, slice: &str) -> (TokenKind, SmolStr) {
    let kind = match raw {
        Raw::Word => match slice.parse::<Keyword>() {
            Ok(kw) => TokenKind::Keyword(kw),
            Err(()) => TokenKind::Ident,
        },
        Raw::Str => return (TokenKind::Str, unescape(&slice[1..slice.len() - 1])),
        Raw::Int => TokenKind::Int,
        Raw::Decimal => TokenKind::Decimal,
        Raw::Colon => TokenKind::Colon,
        Raw::Comma => TokenKind::Comma,
        Raw::Dot => TokenKind::Dot,
        Raw::LParen => TokenKind::LParen,
        Raw::RParen => TokenKind::RParen,
        Raw::LBracket => TokenKind::LBracket,
        Raw::RBracket => TokenKind::RBracket,
        Raw::Eq => TokenKind::Eq,
        Raw::Ne => TokenKind::Ne,
        Raw::Lt => TokenKind::Lt,
        Raw::Le => TokenKind::Le,
        Raw::Gt => TokenKind::Gt,
        Raw::Ge => TokenKind::Ge,
        Raw::Arrow => TokenKind::Arrow,
        Raw::Question => TokenKind::Question,
        Raw::Newline => TokenKind::Newline,
    };
    (kind, SmolStr::new(slice))
}

fn unescape(body: &str) -> SmolStr {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    SmolStr::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_simple_block() {
        use TokenKind::*;
        let text = "entity User:\n  id: uuid pk\n";
        assert_eq!(
            kinds(text),
            vec![
                Keyword(super::Keyword::Entity),
                Ident,
                Colon,
                Newline,
                Indent,
                Ident,
                Colon,
                Ident,
                Ident,
                Newline,
                Dedent,
                Eof,
            ]
        );
    }

    #[test]
    fn test_multiple_dedents() {
        let text = "a:\n  b:\n    c\nd\n";
        let dedents = kinds(text)
            .into_iter()
            .filter(|k| *k == TokenKind::Dedent)
            .count();
        assert_eq!(dedents, 2);
    }

    #[test]
    fn test_blank_and_comment_lines_are_ignored() {
        let text = "a:\n\n    # note\n  b  # trailing\n";
        let tokens = tokenize(text).unwrap();
        assert_eq!(tokens.iter().filter(|t| t.kind == TokenKind::Indent).count(), 1);
        let b = tokens.iter().find(|t| t.text == "b").unwrap();
        assert_eq!((b.line(), b.col()), (4, 3));
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = tokenize("a:\n    b\n  c\n").unwrap_err();
        assert!(matches!(err, LexError::InconsistentDedent { width: 2, .. }));
        assert_eq!(err.pos().line_one_indexed(), 3);
    }

    #[test]
    fn test_tab_indentation_rejected() {
        let err = tokenize("a:\n \tb\n").unwrap_err();
        assert_eq!(
            err,
            LexError::TabIndentation {
                pos: LineCol::new(1, 1)
            }
        );
    }

    #[test]
    fn test_keywords_win_over_identifiers() {
        let tokens = tokenize("unique where index owner\n").unwrap();
        assert!(tokens[0].is_keyword(super::Keyword::Unique));
        assert!(tokens[1].is_keyword(super::Keyword::Where));
        assert!(tokens[2].is_word("index"));
        assert!(tokens[3].is_word("owner"));
    }

    #[test]
    fn test_literals_and_operators() {
        use TokenKind::*;
        let tokens = tokenize("x = \"a \\\"b\\\"\" -> 10 -2.50 != >= ?\n").unwrap();
        let ks: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            ks,
            vec![Ident, Eq, Str, Arrow, Int, Decimal, Ne, Ge, Question, Newline, Eof]
        );
        assert_eq!(tokens[2].text, "a \"b\"");
        assert_eq!(tokens[5].text, "-2.50");
    }

    #[test]
    fn test_hash_inside_string_is_not_a_comment() {
        let tokens = tokenize("x: \"#1\"\n").unwrap();
        assert_eq!(tokens[2].text, "#1");
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("title: \"oops\n").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_unexpected_character() {
        let err = tokenize("a: b $ c\n").unwrap_err();
        assert_eq!(
            err,
            LexError::UnexpectedChar {
                ch: '$',
                pos: LineCol::new(0, 5)
            }
        );
    }

    #[test]
    fn test_missing_trailing_newline() {
        let ks = kinds("a:\n  b");
        assert_eq!(&ks[ks.len() - 3..], &[TokenKind::Newline, TokenKind::Dedent, TokenKind::Eof]);
    }
}
