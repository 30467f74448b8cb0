use super::{PResult, Parser};
use crate::syntax::ast::{
    ActionDecl, ElementDecl, OutcomeDecl, PersonaDecl, SectionDecl, SurfaceDecl,
};
use crate::syntax::token::{Keyword, TokenKind};

impl Parser<'_> {
    pub(super) fn surface(&mut self) -> PResult<SurfaceDecl> {
        self.expect_kw(Keyword::Surface)?;
        let name = self.ident("surface name")?;
        let title = self.string_opt();

        let mut surface = SurfaceDecl {
            name,
            title,
            entity: None,
            mode: None,
            sections: Vec::new(),
            actions: Vec::new(),
            personas: Vec::new(),
            meta: Vec::new(),
        };

        self.block(|p| {
            let tok = p.peek().clone();
            match tok.kind {
                TokenKind::Keyword(Keyword::Uses) => {
                    p.bump();
                    p.expect_kw(Keyword::Entity)?;
                    let entity = p.ident("entity name")?;
                    p.set_once(&mut surface.entity, entity, "uses entity", tok.pos)?;
                    p.expect_newline()
                }
                _ if p.at_item("section") => {
                    surface.sections.push(p.section()?);
                    Ok(())
                }
                _ if p.at_item("action") => {
                    surface.actions.push(p.surface_action()?);
                    Ok(())
                }
                _ if p.at_item("for") => {
                    surface.personas.push(p.persona()?);
                    Ok(())
                }
                _ if p.at_meta_block() => p.meta_block(&mut surface.meta),
                _ if tok.is_word("mode") => {
                    p.bump();
                    p.expect(TokenKind::Colon)?;
                    let mode = p.ident("surface mode")?;
                    p.set_once(&mut surface.mode, mode, "mode", tok.pos)?;
                    p.expect_newline()
                }
                _ => Err(p.expected("a surface item")),
            }
        })?;

        Ok(surface)
    }

    fn section(&mut self) -> PResult<SectionDecl> {
        self.bump();
        let name = self.ident("section name")?;
        let title = self.string_opt();
        let mut elements = Vec::new();
        self.block(|p| {
            p.expect_word("field")?;
            let field = p.ident("field name")?;
            let label = p.string_opt();
            p.expect_newline()?;
            elements.push(ElementDecl { field, label });
            Ok(())
        })?;
        Ok(SectionDecl {
            name,
            title,
            elements,
        })
    }

    fn surface_action(&mut self) -> PResult<ActionDecl> {
        self.bump();
        let name = self.ident("action name")?;
        let label = self.string_opt();
        let mut trigger = None;
        let mut outcome = None;
        self.block(|p| {
            let on = p.expect_word("on")?;
            let event = p.ident("event name")?;
            p.expect(TokenKind::Arrow)?;
            let target = p.outcome()?;
            p.expect_newline()?;
            p.set_once(&mut trigger, event, "on", on.pos)?;
            outcome = Some(target);
            Ok(())
        })?;
        Ok(ActionDecl {
            name,
            label,
            trigger,
            outcome,
        })
    }

    fn outcome(&mut self) -> PResult<OutcomeDecl> {
        if self.eat_kw(Keyword::Surface) {
            return Ok(OutcomeDecl::Surface(self.ident("surface name")?));
        }
        if self.eat_kw(Keyword::Experience) {
            return Ok(OutcomeDecl::Experience(self.ident("experience name")?));
        }
        if self.eat_kw(Keyword::Integration) {
            let integration = self.ident("integration name")?;
            self.expect(TokenKind::Dot)?;
            let action = self.ident("integration action")?;
            return Ok(OutcomeDecl::Integration {
                integration,
                action,
            });
        }
        Err(self
            .expected("an outcome")
            .with_fix("use 'surface NAME', 'experience NAME' or 'integration NAME.ACTION'"))
    }

    fn persona(&mut self) -> PResult<PersonaDecl> {
        self.bump();
        let name = self.ident("persona name")?;
        let mut scope = None;
        self.block(|p| {
            let kw = p.expect_word("scope")?;
            p.expect(TokenKind::Colon)?;
            let cond = p.condition()?;
            p.expect_newline()?;
            p.set_once(&mut scope, cond, "scope", kw.pos)
        })?;
        Ok(PersonaDecl { name, scope })
    }
}
