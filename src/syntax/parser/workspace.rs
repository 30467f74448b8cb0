use super::{PResult, Parser, SyntaxError};
use crate::syntax::ast::{Ident, RegionDecl, WorkspaceDecl};
use crate::syntax::token::{Keyword, TokenKind};

impl Parser<'_> {
    pub(super) fn workspace(&mut self) -> PResult<WorkspaceDecl> {
        self.expect_kw(Keyword::Workspace)?;
        let name = self.ident("workspace name")?;
        let title = self.string_opt();

        let mut ws = WorkspaceDecl {
            name,
            title,
            purpose: None,
            engine_hint: None,
            regions: Vec::new(),
            meta: Vec::new(),
        };

        self.block(|p| {
            if p.at_meta_block() {
                return p.meta_block(&mut ws.meta);
            }
            let key = p.ident("region name or workspace property")?;
            p.expect(TokenKind::Colon)?;

            // `name:` at end of line opens a region
            if p.at(TokenKind::Newline) {
                ws.regions.push(p.region(key)?);
                return Ok(());
            }

            match key.text.as_str() {
                "purpose" => {
                    let purpose = p.string("a purpose string")?;
                    p.set_once(&mut ws.purpose, purpose, "purpose", key.pos)?;
                }
                "engine_hint" => {
                    let tok = p.peek().clone();
                    let hint = match tok.kind {
                        TokenKind::Str | TokenKind::Ident => {
                            p.bump();
                            Ident::new(tok.text, tok.pos)
                        }
                        _ => return Err(p.expected("an archetype name")),
                    };
                    p.set_once(&mut ws.engine_hint, hint, "engine_hint", key.pos)?;
                }
                other => {
                    return Err(SyntaxError::new(
                        format!("unknown workspace property '{other}'"),
                        key.pos,
                    )
                    .with_fix("workspace properties are 'purpose' and 'engine_hint'"));
                }
            }
            p.expect_newline()
        })?;

        Ok(ws)
    }

    fn region(&mut self, name: Ident) -> PResult<RegionDecl> {
        let mut region = RegionDecl {
            name,
            source: None,
            filter: None,
            sort: Vec::new(),
            limit: None,
            display: None,
            action: None,
            empty: None,
            aggregates: Vec::new(),
        };

        self.block_body(|p| {
            let tok = p.peek().clone();

            if tok.is_keyword(Keyword::Aggregate) {
                p.bump();
                return p.block(|p| {
                    let name = p.ident("aggregate name")?;
                    p.expect(TokenKind::Colon)?;
                    let expr = p.aggregate_expr()?;
                    p.expect_newline()?;
                    region.aggregates.push((name, expr));
                    Ok(())
                });
            }
            let key = p.ident("region property")?;
            p.expect(TokenKind::Colon)?;
            match key.text.as_str() {
                "action" => {
                    let target = p.ident("surface name")?;
                    p.set_once(&mut region.action, target, "action", key.pos)?;
                }
                "source" => {
                    let source = p.ident("source name")?;
                    p.set_once(&mut region.source, source, "source", key.pos)?;
                }
                "filter" => {
                    let cond = p.condition()?;
                    p.set_once(&mut region.filter, cond, "filter", key.pos)?;
                }
                "sort" => {
                    if !region.sort.is_empty() {
                        return Err(SyntaxError::new("duplicate 'sort'", key.pos));
                    }
                    region.sort = p.sort_keys()?;
                }
                "limit" => {
                    let limit = p.int("an integer limit")?;
                    p.set_once(&mut region.limit, limit, "limit", key.pos)?;
                }
                "display" => {
                    let display = p.ident("display mode")?;
                    p.set_once(&mut region.display, display, "display", key.pos)?;
                }
                "empty" => {
                    let message = p.string("an empty-state message")?;
                    p.set_once(&mut region.empty, message, "empty", key.pos)?;
                }
                other => {
                    return Err(SyntaxError::new(
                        format!("unknown region property '{other}'"),
                        key.pos,
                    ));
                }
            }
            p.expect_newline()
        })?;

        Ok(region)
    }
}
