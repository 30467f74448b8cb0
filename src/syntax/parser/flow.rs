//! Experiences, services and integrations.

use super::{PResult, Parser, SyntaxError};
use crate::ir::Literal;
use crate::syntax::ast::{
    ExperienceDecl, Ident, IntegrationActionDecl, IntegrationDecl, ServiceDecl, StepDecl,
    TransitionDecl,
};
use crate::syntax::token::{Keyword, TokenKind};

impl Parser<'_> {
    pub(super) fn experience(&mut self) -> PResult<ExperienceDecl> {
        self.expect_kw(Keyword::Experience)?;
        let name = self.ident("experience name")?;
        let title = self.string_opt();
        let mut start = None;
        let mut steps = Vec::new();

        self.block(|p| {
            if p.at_item("step") {
                steps.push(p.step()?);
                return Ok(());
            }
            let kw = p.expect_word("start")?;
            p.expect_word("at")?;
            p.expect_word("step")?;
            let target = p.ident("step name")?;
            p.set_once(&mut start, target, "start", kw.pos)?;
            p.expect_newline()
        })?;

        Ok(ExperienceDecl {
            name,
            title,
            start,
            steps,
        })
    }

    fn step(&mut self) -> PResult<StepDecl> {
        self.bump();
        let name = self.ident("step name")?;
        let mut step = StepDecl {
            name,
            kind: None,
            surface: None,
            integration: None,
            transitions: Vec::new(),
        };

        self.block(|p| {
            let tok = p.peek().clone();
            match tok.kind {
                TokenKind::Keyword(Keyword::Surface) => {
                    p.bump();
                    let surface = p.ident("surface name")?;
                    p.set_once(&mut step.surface, surface, "surface", tok.pos)?;
                }
                TokenKind::Keyword(Keyword::Integration) => {
                    p.bump();
                    let integration = p.ident("integration name")?;
                    p.expect(TokenKind::Dot)?;
                    let action = p.ident("integration action")?;
                    p.set_once(&mut step.integration, (integration, action), "integration", tok.pos)?;
                }
                _ if tok.is_word("kind") => {
                    p.bump();
                    p.expect(TokenKind::Colon)?;
                    let kind = p.word("step kind")?;
                    p.set_once(&mut step.kind, kind, "kind", tok.pos)?;
                }
                _ if tok.is_word("on") => {
                    p.bump();
                    let event = p.ident("event name")?;
                    p.expect(TokenKind::Arrow)?;
                    p.expect_word("step")?;
                    let target = p.ident("step name")?;
                    step.transitions.push(TransitionDecl { event, target });
                }
                _ => return Err(p.expected("a step item")),
            }
            p.expect_newline()
        })?;

        Ok(step)
    }

    pub(super) fn service(&mut self) -> PResult<ServiceDecl> {
        self.expect_kw(Keyword::Service)?;
        let name = self.ident("service name")?;
        let title = self.string_opt();
        let mut properties: Vec<(Ident, Literal)> = Vec::new();

        self.block(|p| {
            let key = p.ident("service property")?;
            p.expect(TokenKind::Colon)?;
            let tok = p.peek().clone();
            let value = match tok.kind {
                TokenKind::Str => Literal::Str(tok.text.to_string()),
                TokenKind::Ident => Literal::Ident(tok.text.clone()),
                _ => return Err(p.expected("a string or identifier")),
            };
            p.bump();
            p.expect_newline()?;
            if properties.iter().any(|(k, _)| k.text == key.text) {
                return Err(SyntaxError::new(format!("duplicate '{}'", key.text), key.pos));
            }
            properties.push((key, value));
            Ok(())
        })?;

        Ok(ServiceDecl {
            name,
            title,
            properties,
        })
    }

    pub(super) fn integration(&mut self) -> PResult<IntegrationDecl> {
        self.expect_kw(Keyword::Integration)?;
        let name = self.ident("integration name")?;
        let title = self.string_opt();
        let mut decl = IntegrationDecl {
            name,
            title,
            services: Vec::new(),
            foreign_models: Vec::new(),
            actions: Vec::new(),
        };

        self.block(|p| {
            if p.at_item("action") {
                decl.actions.push(p.integration_action()?);
                return Ok(());
            }
            p.expect_kw(Keyword::Uses)?;
            if p.eat_kw(Keyword::Service) {
                decl.services.extend(p.ident_list("service name")?);
            } else if p.at_word("foreign") {
                p.bump();
                decl.foreign_models.extend(p.ident_list("foreign model name")?);
            } else {
                return Err(p.expected("'service' or 'foreign'"));
            }
            p.expect_newline()
        })?;

        Ok(decl)
    }

    fn integration_action(&mut self) -> PResult<IntegrationActionDecl> {
        self.bump();
        let name = self.ident("action name")?;
        let title = self.string_opt();
        let mut trigger = None;
        let mut call = None;

        self.block(|p| {
            let tok = p.peek().clone();
            if tok.is_word("when") {
                p.bump();
                p.expect_kw(Keyword::Surface)?;
                let surface = p.ident("surface name")?;
                let event = p.ident("event name")?;
                p.set_once(&mut trigger, (surface, event), "when", tok.pos)?;
            } else if tok.is_word("call") {
                p.bump();
                let service = p.ident("service name")?;
                p.expect(TokenKind::Dot)?;
                let operation = p.ident("operation name")?;
                p.set_once(&mut call, (service, operation), "call", tok.pos)?;
            } else {
                return Err(p.expected("'when' or 'call'"));
            }
            p.expect_newline()
        })?;

        Ok(IntegrationActionDecl {
            name,
            title,
            trigger,
            call,
        })
    }
}
