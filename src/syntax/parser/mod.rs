//! Recursive-descent parser.
//!
//! One production per declaration kind. Errors never abort the file: an
//! error inside a block skips the rest of the offending line (and any block
//! it opened), and an error in a declaration header skips ahead to the next
//! declaration keyword at the top level.

mod entity;
mod expr;
mod flow;
mod surface;
mod workspace;

use smol_str::SmolStr;

use super::ast::{AppDecl, Decl, Ident, MetaEntry, SourceFile};
use super::token::{Keyword, Token, TokenKind};
use crate::base::LineCol;
use crate::ir::Literal;

/// A recoverable syntax error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub pos: LineCol,
    pub fix: Option<String>,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, pos: LineCol) -> Self {
        Self {
            message: message.into(),
            pos,
            fix: None,
        }
    }

    pub fn with_fix(mut self, fix: impl Into<String>) -> Self {
        self.fix = Some(fix.into());
        self
    }
}

/// Result of parsing one file: the tree plus every error recovered from.
#[derive(Clone, Debug, PartialEq)]
pub struct Parse {
    pub file: SourceFile,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a token stream produced by [`super::tokenize`].
pub fn parse(tokens: &[Token]) -> Parse {
    let mut parser = Parser::new(tokens);
    let file = parser.file();
    Parse {
        file,
        errors: parser.errors,
    }
}

type PResult<T> = Result<T, SyntaxError>;

pub(super) struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    /// Current block nesting, tracked across INDENT/DEDENT.
    depth: i32,
    /// `not` and parenthesis nesting inside the condition being parsed.
    condition_depth: u32,
    errors: Vec<SyntaxError>,
    eof: Token,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        let eof = tokens.last().cloned().unwrap_or(Token {
            kind: TokenKind::Eof,
            text: SmolStr::default(),
            pos: LineCol::default(),
            range: Default::default(),
        });
        Self {
            tokens,
            pos: 0,
            depth: 0,
            condition_depth: 0,
            errors: Vec::new(),
            eof,
        }
    }

    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.nth(0)
    }

    fn nth(&self, n: usize) -> &Token {
        self.tokens.get(self.pos + n).unwrap_or(&self.eof)
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn at_kw(&self, kw: Keyword) -> bool {
        self.peek().is_keyword(kw)
    }

    fn at_word(&self, word: &str) -> bool {
        self.peek().is_word(word)
    }

    /// `word` opening an item, as opposed to a field or property named
    /// `word` (`index owner` versus `index: int`).
    fn at_item(&self, word: &str) -> bool {
        self.at_word(word) && self.nth(1).kind != TokenKind::Colon
    }

    /// `meta:` at the end of a line.
    fn at_meta_block(&self) -> bool {
        self.at_word("meta")
            && self.nth(1).kind == TokenKind::Colon
            && self.nth(2).kind == TokenKind::Newline
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Eof => return tok,
            TokenKind::Indent => self.depth += 1,
            TokenKind::Dedent => self.depth -= 1,
            _ => {}
        }
        self.pos += 1;
        tok
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        self.eat(TokenKind::Keyword(kw))
    }

    fn expected(&self, what: &str) -> SyntaxError {
        let tok = self.peek();
        let found = match tok.kind {
            TokenKind::Ident => format!("'{}'", tok.text),
            other => other.describe(),
        };
        SyntaxError::new(format!("expected {what}, found {found}"), tok.pos)
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.expected(&kind.describe()))
        }
    }

    fn expect_kw(&mut self, kw: Keyword) -> PResult<Token> {
        self.expect(TokenKind::Keyword(kw))
    }

    fn expect_word(&mut self, word: &str) -> PResult<Token> {
        if self.at_word(word) {
            Ok(self.bump())
        } else {
            Err(self.expected(&format!("'{word}'")))
        }
    }

    fn expect_newline(&mut self) -> PResult<()> {
        if self.at(TokenKind::Newline) {
            self.bump();
            Ok(())
        } else {
            Err(self.expected("end of line"))
        }
    }

    /// An identifier. Reserved words are rejected with a rename hint.
    fn ident(&mut self, what: &str) -> PResult<Ident> {
        let tok = self.peek();
        match tok.kind {
            TokenKind::Ident => {
                let tok = self.bump();
                Ok(Ident::new(tok.text, tok.pos))
            }
            TokenKind::Keyword(kw) => Err(SyntaxError::new(
                format!("expected {what}, found keyword '{kw}'"),
                tok.pos,
            )
            .with_fix(format!("'{kw}' is a reserved word; choose a different name"))),
            _ => Err(self.expected(what)),
        }
    }

    /// An identifier or keyword taken as a plain word, for value positions
    /// such as `kind: surface`.
    fn word(&mut self, what: &str) -> PResult<Ident> {
        match self.peek().kind {
            TokenKind::Ident | TokenKind::Keyword(_) => {
                let tok = self.bump();
                Ok(Ident::new(tok.text, tok.pos))
            }
            _ => Err(self.expected(what)),
        }
    }

    /// `a.b.c` joined into one identifier.
    fn dotted(&mut self, what: &str) -> PResult<Ident> {
        let first = self.ident(what)?;
        let mut text = first.text.to_string();
        while self.eat(TokenKind::Dot) {
            text.push('.');
            text.push_str(&self.ident(what)?.text);
        }
        Ok(Ident::new(text, first.pos))
    }

    fn ident_list(&mut self, what: &str) -> PResult<Vec<Ident>> {
        let mut items = vec![self.ident(what)?];
        while self.eat(TokenKind::Comma) {
            items.push(self.ident(what)?);
        }
        Ok(items)
    }

    fn string_opt(&mut self) -> Option<String> {
        if self.at(TokenKind::Str) {
            Some(self.bump().text.to_string())
        } else {
            None
        }
    }

    fn string(&mut self, what: &str) -> PResult<String> {
        self.string_opt().ok_or_else(|| self.expected(what))
    }

    /// A literal value: string, number, boolean or bare word.
    fn literal(&mut self) -> PResult<Literal> {
        let tok = self.peek().clone();
        let lit = match tok.kind {
            TokenKind::Str => Literal::Str(tok.text.to_string()),
            TokenKind::Int => Literal::Int(tok.text.parse().map_err(|_| {
                SyntaxError::new(format!("integer literal '{}' is out of range", tok.text), tok.pos)
            })?),
            TokenKind::Decimal => Literal::Decimal(tok.text.clone()),
            TokenKind::Keyword(Keyword::True) => Literal::Bool(true),
            TokenKind::Keyword(Keyword::False) => Literal::Bool(false),
            TokenKind::Ident => Literal::Ident(tok.text.clone()),
            _ => return Err(self.expected("a value")),
        };
        self.bump();
        Ok(lit)
    }

    fn int(&mut self, what: &str) -> PResult<(i64, LineCol)> {
        let tok = self.peek().clone();
        if tok.kind != TokenKind::Int {
            return Err(self.expected(what));
        }
        self.bump();
        let value = tok.text.parse().map_err(|_| {
            SyntaxError::new(format!("integer literal '{}' is out of range", tok.text), tok.pos)
        })?;
        Ok((value, tok.pos))
    }

    /// Store a single-valued property, rejecting a second occurrence.
    fn set_once<T>(&self, slot: &mut Option<T>, value: T, what: &str, pos: LineCol) -> PResult<()> {
        if slot.is_some() {
            return Err(SyntaxError::new(format!("duplicate '{what}'"), pos));
        }
        *slot = Some(value);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Blocks and recovery
    // ------------------------------------------------------------------

    /// `: NEWLINE INDENT item+ DEDENT`
    fn block<F>(&mut self, item: F) -> PResult<()>
    where
        F: FnMut(&mut Self) -> PResult<()>,
    {
        self.expect(TokenKind::Colon)?;
        self.block_body(item)
    }

    /// `NEWLINE INDENT item+ DEDENT`, for callers that consumed the colon.
    fn block_body<F>(&mut self, mut item: F) -> PResult<()>
    where
        F: FnMut(&mut Self) -> PResult<()>,
    {
        if !self.at(TokenKind::Newline) {
            return Err(self.expected("end of line"));
        }
        if self.nth(1).kind != TokenKind::Indent {
            let pos = self.nth(1).pos;
            return Err(SyntaxError::new("expected an indented block", pos));
        }
        self.bump();
        self.bump();
        let depth = self.depth;

        while !self.at(TokenKind::Dedent) && !self.at(TokenKind::Eof) {
            if let Err(err) = item(self) {
                self.errors.push(err);
                self.recover_line(depth);
            }
        }
        self.eat(TokenKind::Dedent);
        Ok(())
    }

    /// Skip the rest of the current line at `depth`, including any block it
    /// opened.
    fn recover_line(&mut self, depth: i32) {
        while !self.at(TokenKind::Eof) {
            if self.depth == depth {
                match self.peek().kind {
                    TokenKind::Newline => {
                        self.bump();
                        if self.at(TokenKind::Indent) {
                            self.bump();
                            while self.depth > depth && !self.at(TokenKind::Eof) {
                                self.bump();
                            }
                        }
                        return;
                    }
                    TokenKind::Dedent => return,
                    _ => {}
                }
            }
            self.bump();
        }
    }

    fn at_line_start(&self) -> bool {
        self.pos == 0
            || matches!(
                self.tokens[self.pos - 1].kind,
                TokenKind::Newline | TokenKind::Dedent
            )
    }

    /// Skip to the next declaration at the top level.
    fn synchronize(&mut self) {
        loop {
            let tok = self.peek();
            let opens = match tok.kind {
                TokenKind::Eof => return,
                TokenKind::Keyword(kw) => kw.starts_declaration(),
                _ => tok.is_word("app"),
            };
            if opens && self.depth <= 0 && self.at_line_start() {
                return;
            }
            self.bump();
        }
    }

    // ------------------------------------------------------------------
    // File level
    // ------------------------------------------------------------------

    fn file(&mut self) -> SourceFile {
        let mut file = SourceFile::default();

        loop {
            while self.eat(TokenKind::Newline) {}
            let tok = self.peek().clone();
            let result = match tok.kind {
                TokenKind::Eof => break,
                TokenKind::Keyword(Keyword::Module) => self.module_decl(&mut file),
                TokenKind::Keyword(Keyword::Use) => self.use_decl(&mut file),
                _ if tok.is_word("app") => self.app_decl(&mut file),
                TokenKind::Keyword(Keyword::Entity) => {
                    self.entity().map(|d| file.decls.push(Decl::Entity(d)))
                }
                TokenKind::Keyword(Keyword::Surface) => {
                    self.surface().map(|d| file.decls.push(Decl::Surface(d)))
                }
                TokenKind::Keyword(Keyword::Workspace) => {
                    self.workspace().map(|d| file.decls.push(Decl::Workspace(d)))
                }
                TokenKind::Keyword(Keyword::Experience) => {
                    self.experience().map(|d| file.decls.push(Decl::Experience(d)))
                }
                TokenKind::Keyword(Keyword::Service) => {
                    self.service().map(|d| file.decls.push(Decl::Service(d)))
                }
                TokenKind::Keyword(Keyword::ForeignModel) => {
                    self.foreign_model().map(|d| file.decls.push(Decl::ForeignModel(d)))
                }
                TokenKind::Keyword(Keyword::Integration) => {
                    self.integration().map(|d| file.decls.push(Decl::Integration(d)))
                }
                TokenKind::Indent => {
                    self.bump();
                    Err(SyntaxError::new("unexpected indentation", tok.pos))
                }
                _ => {
                    let err = self.expected("a declaration");
                    self.bump();
                    Err(err)
                }
            };

            if let Err(err) = result {
                self.errors.push(err);
                self.synchronize();
            }
        }

        file
    }

    fn module_decl(&mut self, file: &mut SourceFile) -> PResult<()> {
        let kw = self.bump();
        let name = self.dotted("module name")?;
        self.expect_newline()?;
        if file.module.is_some() {
            return Err(SyntaxError::new("duplicate 'module' declaration", kw.pos));
        }
        if !file.decls.is_empty() || !file.uses.is_empty() {
            return Err(SyntaxError::new(
                "'module' must be the first declaration in a file",
                kw.pos,
            ));
        }
        file.module = Some(name);
        Ok(())
    }

    fn use_decl(&mut self, file: &mut SourceFile) -> PResult<()> {
        self.bump();
        let name = self.dotted("module name")?;
        self.expect_newline()?;
        file.uses.push(name);
        Ok(())
    }

    fn app_decl(&mut self, file: &mut SourceFile) -> PResult<()> {
        self.bump();
        let name = self.ident("app name")?;
        let title = self.string_opt();
        self.expect_newline()?;
        file.apps.push(AppDecl { name, title });
        Ok(())
    }

    /// `meta:` block of `key: literal` lines.
    fn meta_block(&mut self, out: &mut Vec<MetaEntry>) -> PResult<()> {
        self.expect_word("meta")?;
        self.block(|p| {
            let key = p.ident("meta key")?;
            p.expect(TokenKind::Colon)?;
            let value = p.literal()?;
            p.expect_newline()?;
            out.push(MetaEntry { key, value });
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::tokenize;

    pub(super) fn parse_text(text: &str) -> Parse {
        parse(&tokenize(text).unwrap())
    }

    #[test]
    fn test_module_use_app() {
        let parse = parse_text("module shop.core\nuse shop.shared\napp shop \"Shop\"\n");
        assert!(!parse.has_errors(), "{:?}", parse.errors);
        assert_eq!(parse.file.module.as_ref().unwrap().text, "shop.core");
        assert_eq!(parse.file.uses[0].text, "shop.shared");
        assert_eq!(parse.file.apps[0].title.as_deref(), Some("Shop"));
    }

    #[test]
    fn test_recovers_at_next_declaration() {
        let text = "module m\n\
                    entity Broken \"B\" oops:\n  id: uuid pk\n\
                    entity Fine:\n  id: uuid pk\n";
        let parse = parse_text(text);
        assert_eq!(parse.errors.len(), 1);
        assert_eq!(parse.errors[0].pos.line_one_indexed(), 2);
        assert_eq!(parse.file.decls.len(), 1);
        assert_eq!(parse.file.decls[0].name().text, "Fine");
    }

    #[test]
    fn test_recovers_inside_block() {
        let text = "module m\n\
                    entity Task:\n  id: uuid pk\n  title str(20)\n  done: bool\n";
        let parse = parse_text(text);
        assert_eq!(parse.errors.len(), 1);
        assert_eq!(parse.errors[0].pos.line_one_indexed(), 4);
        let Decl::Entity(entity) = &parse.file.decls[0] else {
            panic!("expected entity");
        };
        let names: Vec<_> = entity.fields.iter().map(|f| f.name.text.as_str()).collect();
        assert_eq!(names, vec!["id", "done"]);
    }

    #[test]
    fn test_reserved_word_as_field_name() {
        let parse = parse_text("module m\nentity Task:\n  id: uuid pk\n  where: int\n");
        assert_eq!(parse.errors.len(), 1);
        assert!(parse.errors[0].message.contains("keyword 'where'"));
        assert!(parse.errors[0].fix.as_deref().unwrap().contains("reserved"));
    }

    #[test]
    fn test_item_words_usable_as_names() {
        let text = "module app\n\
                    app app \"App\"\n\
                    entity Step:\n  id: uuid pk\n  index: int\n  step: int\n  ref: ref Step\n  \
                    meta: text\n  index index, step\n  meta:\n    icon: \"x\"\n";
        let parse = parse_text(text);
        assert!(!parse.has_errors(), "{:?}", parse.errors);
        assert_eq!(parse.file.module.as_ref().unwrap().text, "app");
        assert_eq!(parse.file.apps[0].name.text, "app");
        let Decl::Entity(entity) = &parse.file.decls[0] else {
            panic!("expected entity");
        };
        let names: Vec<_> = entity.fields.iter().map(|f| f.name.text.as_str()).collect();
        assert_eq!(names, vec!["id", "index", "step", "ref", "meta"]);
        assert_eq!(entity.constraints.len(), 1);
        assert_eq!(entity.meta.len(), 1);
    }

    #[test]
    fn test_recovers_at_app_declaration() {
        let parse = parse_text("module app\nentity Broken oops:\n  id: uuid pk\napp tasks\n");
        assert_eq!(parse.errors.len(), 1);
        assert_eq!(parse.file.apps[0].name.text, "tasks");
    }

    #[test]
    fn test_multiple_errors_in_one_file() {
        let text = "module m\n\
                    entity A:\n  id uuid\n\
                    surface s:\n  mode list\n\
                    entity B:\n  id: uuid pk\n";
        let parse = parse_text(text);
        assert_eq!(parse.errors.len(), 2);
        assert_eq!(parse.file.decls.len(), 3);
    }

    #[test]
    fn test_module_must_come_first() {
        let parse = parse_text("use a\nmodule m\n");
        assert_eq!(parse.errors.len(), 1);
        assert!(parse.errors[0].message.contains("first declaration"));
    }

    #[test]
    fn test_stray_token_at_top_level() {
        let parse = parse_text("module m\n42\nentity A:\n  id: uuid pk\n");
        assert_eq!(parse.errors.len(), 1);
        assert_eq!(parse.file.decls.len(), 1);
    }
}
