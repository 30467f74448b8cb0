//! Entities, fields, types and foreign models.

use super::{PResult, Parser};
use crate::ir::ConstraintKind;
use crate::syntax::ast::{
    ConstraintDecl, EntityDecl, FieldDecl, ForeignModelDecl, Ident, TypeExpr,
};
use crate::syntax::token::{Keyword, TokenKind};

impl Parser<'_> {
    pub(super) fn entity(&mut self) -> PResult<EntityDecl> {
        self.expect_kw(Keyword::Entity)?;
        let name = self.ident("entity name")?;
        let title = self.string_opt();

        let mut fields = Vec::new();
        let mut constraints = Vec::new();
        let mut meta = Vec::new();

        self.block(|p| {
            if p.at_kw(Keyword::Unique) {
                constraints.push(p.constraint(ConstraintKind::Unique)?);
            } else if p.at_item("index") {
                constraints.push(p.constraint(ConstraintKind::Index)?);
            } else if p.at_meta_block() {
                p.meta_block(&mut meta)?;
            } else {
                fields.push(p.field()?);
            }
            Ok(())
        })?;

        Ok(EntityDecl {
            name,
            title,
            fields,
            constraints,
            meta,
        })
    }

    fn constraint(&mut self, kind: ConstraintKind) -> PResult<ConstraintDecl> {
        let pos = self.bump().pos;
        let fields = self.ident_list("field name")?;
        self.expect_newline()?;
        Ok(ConstraintDecl { kind, fields, pos })
    }

    /// `name: type modifier* (= literal)? modifier*`
    pub(super) fn field(&mut self) -> PResult<FieldDecl> {
        let name = self.ident("field name")?;
        self.expect(TokenKind::Colon)?;
        let ty = self.type_expr()?;

        let mut modifiers = Vec::new();
        let mut default = None;
        while !self.at(TokenKind::Newline) {
            let tok = self.peek().clone();
            match tok.kind {
                TokenKind::Eq => {
                    self.bump();
                    let value = self.literal()?;
                    self.set_once(&mut default, (value, tok.pos), "default value", tok.pos)?;
                }
                TokenKind::Keyword(Keyword::Unique) => {
                    self.bump();
                    let text = if self.eat(TokenKind::Question) {
                        "unique?"
                    } else {
                        "unique"
                    };
                    modifiers.push(Ident::new(text, tok.pos));
                }
                TokenKind::Ident => {
                    self.bump();
                    modifiers.push(Ident::new(tok.text, tok.pos));
                }
                _ => return Err(self.expected("a field modifier or end of line")),
            }
        }
        self.expect_newline()?;

        Ok(FieldDecl {
            name,
            ty,
            modifiers,
            default,
        })
    }

    fn type_expr(&mut self) -> PResult<TypeExpr> {
        let tok = self.peek().clone();
        if tok.is_word("ref") && self.nth(1).kind == TokenKind::Ident {
            self.bump();
            let target = self.ident("entity name")?;
            return Ok(TypeExpr::Ref {
                pos: tok.pos,
                target,
            });
        }

        let name = self.ident("a type")?;
        if name.text == "enum" && self.at(TokenKind::LBracket) {
            self.bump();
            let values = self.ident_list("enum value")?;
            self.expect(TokenKind::RBracket)?;
            return Ok(TypeExpr::Enum {
                pos: name.pos,
                values,
            });
        }

        let mut args = Vec::new();
        if self.eat(TokenKind::LParen) {
            args.push(self.int("an integer")?);
            while self.eat(TokenKind::Comma) {
                args.push(self.int("an integer")?);
            }
            self.expect(TokenKind::RParen)?;
        }
        Ok(TypeExpr::Named { name, args })
    }

    pub(super) fn foreign_model(&mut self) -> PResult<ForeignModelDecl> {
        self.expect_kw(Keyword::ForeignModel)?;
        let name = self.ident("foreign model name")?;
        self.expect_word("from")?;
        let service = self.ident("service name")?;
        let title = self.string_opt();

        let mut keys = Vec::new();
        let mut constraints = Vec::new();
        let mut fields = Vec::new();

        self.block(|p| {
            if p.at_item("key") {
                p.bump();
                keys.extend(p.ident_list("key field")?);
                p.expect_newline()
            } else if p.at_item("constraint") {
                p.bump();
                constraints.extend(p.ident_list("constraint name")?);
                p.expect_newline()
            } else {
                fields.push(p.field()?);
                Ok(())
            }
        })?;

        Ok(ForeignModelDecl {
            name,
            service,
            title,
            keys,
            constraints,
            fields,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::ir::{ConstraintKind, Literal};
    use crate::syntax::ast::{Decl, EntityDecl, TypeExpr};
    use crate::syntax::parser::tests::parse_text;

    fn entity(text: &str) -> EntityDecl {
        let parse = parse_text(text);
        assert!(!parse.has_errors(), "{:?}", parse.errors);
        match parse.file.decls.into_iter().next() {
            Some(Decl::Entity(e)) => e,
            other => panic!("expected entity, got {other:?}"),
        }
    }

    #[test]
    fn test_entity_fields_and_types() {
        let e = entity(
            "entity Task \"Task\":\n\
             \x20 id: uuid pk\n\
             \x20 title: str(200) required\n\
             \x20 price: decimal(10,2) = 9.99\n\
             \x20 status: enum[open,done] = open\n\
             \x20 owner: ref User\n\
             \x20 code: str(8) unique? optional\n",
        );
        assert_eq!(e.name.text, "Task");
        assert_eq!(e.title.as_deref(), Some("Task"));
        assert_eq!(e.fields.len(), 6);

        match &e.fields[1].ty {
            TypeExpr::Named { name, args } => {
                assert_eq!(name.text, "str");
                assert_eq!(args[0].0, 200);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(e.fields[1].modifiers[0].text, "required");
        assert_eq!(
            e.fields[2].default.as_ref().map(|d| &d.0),
            Some(&Literal::Decimal("9.99".into()))
        );
        match &e.fields[3].ty {
            TypeExpr::Enum { values, .. } => assert_eq!(values.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(&e.fields[4].ty, TypeExpr::Ref { target, .. } if target.text == "User"));
        let mods: Vec<_> = e.fields[5].modifiers.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(mods, vec!["unique?", "optional"]);
    }

    #[test]
    fn test_entity_constraints_and_meta() {
        let e = entity(
            "entity Order:\n\
             \x20 id: uuid pk\n\
             \x20 number: str(20)\n\
             \x20 unique number\n\
             \x20 index number, id\n\
             \x20 meta:\n\
             \x20   table: \"orders\"\n\
             \x20   audited: true\n",
        );
        assert_eq!(e.constraints.len(), 2);
        assert_eq!(e.constraints[0].kind, ConstraintKind::Unique);
        assert_eq!(e.constraints[1].fields.len(), 2);
        assert_eq!(e.meta.len(), 2);
        assert_eq!(e.meta[1].value, Literal::Bool(true));
    }

    #[test]
    fn test_duplicate_default_is_an_error() {
        let parse = parse_text("entity A:\n  n: int = 1 = 2\n");
        assert_eq!(parse.errors.len(), 1);
        assert!(parse.errors[0].message.contains("duplicate 'default value'"));
    }

    #[test]
    fn test_foreign_model() {
        let parse = parse_text(
            "foreign_model Customer from crm \"CRM customer\":\n\
             \x20 key customer_id\n\
             \x20 constraint read_only, batch_import\n\
             \x20 customer_id: str(40) required\n\
             \x20 key: str(10)\n",
        );
        assert!(!parse.has_errors(), "{:?}", parse.errors);
        let Decl::ForeignModel(fm) = &parse.file.decls[0] else {
            panic!("expected foreign model");
        };
        assert_eq!(fm.service.text, "crm");
        assert_eq!(fm.keys[0].text, "customer_id");
        assert_eq!(fm.constraints.len(), 2);
        // `key:` with a colon is a field, not a key line
        assert_eq!(fm.fields.len(), 2);
        assert_eq!(fm.fields[1].name.text, "key");
    }
}
