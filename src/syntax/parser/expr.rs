//! Conditions, sort keys and aggregate expressions.

use smol_str::SmolStr;

use super::{PResult, Parser, SyntaxError};
use crate::base::LineCol;
use crate::ir::{
    AggregateExpr, AggregateFn, CompareOp, Condition, FieldPath, SortDirection, SortKey,
};
use crate::syntax::token::{Keyword, TokenKind};

/// Deepest run of `not` and parentheses accepted in one condition.
const MAX_CONDITION_DEPTH: u32 = 64;

impl Parser<'_> {
    /// `and ("or" and)*`
    pub(super) fn condition(&mut self) -> PResult<Condition> {
        let mut lhs = self.and_condition()?;
        while self.eat_kw(Keyword::Or) {
            let rhs = self.and_condition()?;
            lhs = Condition::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_condition(&mut self) -> PResult<Condition> {
        let mut lhs = self.unary_condition()?;
        while self.eat_kw(Keyword::And) {
            let rhs = self.unary_condition()?;
            lhs = Condition::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary_condition(&mut self) -> PResult<Condition> {
        if self.at_kw(Keyword::Not) {
            let pos = self.bump().pos;
            let inner = self.nested_condition(pos, Self::unary_condition)?;
            return Ok(Condition::Not(Box::new(inner)));
        }
        if self.at(TokenKind::LParen) {
            let pos = self.bump().pos;
            let inner = self.nested_condition(pos, Self::condition)?;
            self.expect(TokenKind::RParen)?;
            return Ok(inner);
        }

        let field = self.field_path()?;
        let negated = self.eat_kw(Keyword::Not);
        if negated || self.at_kw(Keyword::In) {
            self.expect_kw(Keyword::In)?;
            self.expect(TokenKind::LBracket)?;
            let mut values = vec![self.literal()?];
            while self.eat(TokenKind::Comma) {
                values.push(self.literal()?);
            }
            self.expect(TokenKind::RBracket)?;
            return Ok(Condition::In {
                field,
                values,
                negated,
            });
        }

        let op = match self.peek().kind {
            TokenKind::Eq => CompareOp::Eq,
            TokenKind::Ne => CompareOp::Ne,
            TokenKind::Lt => CompareOp::Lt,
            TokenKind::Le => CompareOp::Le,
            TokenKind::Gt => CompareOp::Gt,
            TokenKind::Ge => CompareOp::Ge,
            _ => return Err(self.expected("a comparison operator")),
        };
        self.bump();
        let value = self.literal()?;
        Ok(Condition::Compare { field, op, value })
    }

    /// Run `parse` one nesting level down, failing past [`MAX_CONDITION_DEPTH`].
    fn nested_condition(
        &mut self,
        pos: LineCol,
        parse: fn(&mut Self) -> PResult<Condition>,
    ) -> PResult<Condition> {
        if self.condition_depth >= MAX_CONDITION_DEPTH {
            return Err(SyntaxError::new(
                format!("condition nested deeper than {MAX_CONDITION_DEPTH} levels"),
                pos,
            )
            .with_fix("split the condition or remove redundant parentheses"));
        }
        self.condition_depth += 1;
        let inner = parse(self);
        self.condition_depth -= 1;
        inner
    }

    fn field_path(&mut self) -> PResult<FieldPath> {
        let first = self.ident("field name")?;
        let pos = first.pos;
        let mut segments = vec![first.text];
        while self.eat(TokenKind::Dot) {
            segments.push(self.ident("field name")?.text);
        }
        Ok(FieldPath::new(segments, pos))
    }

    /// `field (asc|desc)? ("," field (asc|desc)?)*`
    pub(super) fn sort_keys(&mut self) -> PResult<Vec<SortKey>> {
        let mut keys = Vec::new();
        loop {
            let field = self.field_path()?;
            let direction = if self.eat_kw(Keyword::Desc) {
                SortDirection::Desc
            } else {
                self.eat_kw(Keyword::Asc);
                SortDirection::Asc
            };
            keys.push(SortKey { field, direction });
            if !self.eat(TokenKind::Comma) {
                return Ok(keys);
            }
        }
    }

    /// `func(target (where condition)?)`
    pub(super) fn aggregate_expr(&mut self) -> PResult<AggregateExpr> {
        let func_tok = self.ident("aggregate function")?;
        let func = func_tok.text.parse::<AggregateFn>().map_err(|()| {
            SyntaxError::new(
                format!("unknown aggregate function '{}'", func_tok.text),
                func_tok.pos,
            )
            .with_fix("use one of count, sum, avg, min, max")
        })?;
        self.expect(TokenKind::LParen)?;
        let target: SmolStr = self.ident("aggregate target")?.text;
        let filter = if self.eat_kw(Keyword::Where) {
            Some(self.condition()?)
        } else {
            None
        };
        self.expect(TokenKind::RParen)?;
        Ok(AggregateExpr {
            func,
            target,
            filter,
            pos: func_tok.pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Literal;
    use crate::syntax::tokenize;

    fn with_parser<T>(text: &str, f: impl FnOnce(&mut Parser<'_>) -> T) -> T {
        let tokens = tokenize(text).unwrap();
        let mut parser = Parser::new(&tokens);
        f(&mut parser)
    }

    #[test]
    fn test_precedence_and_binds_tighter_than_or() {
        let cond = with_parser("a = 1 or b = 2 and not c = 3\n", |p| p.condition().unwrap());
        assert_eq!(cond.to_string(), "(a = 1 or (b = 2 and not c = 3))");
    }

    #[test]
    fn test_parenthesized_and_membership() {
        let cond = with_parser(
            "(status not in [open, \"on hold\"] or owner.team = ops) and done = false\n",
            |p| p.condition().unwrap(),
        );
        let Condition::And(lhs, rhs) = &cond else {
            panic!("expected and, got {cond}");
        };
        assert!(matches!(**lhs, Condition::Or(..)));
        assert!(matches!(
            &**rhs,
            Condition::Compare { value: Literal::Bool(false), .. }
        ));
        let fields: Vec<String> = cond.fields().iter().map(|f| f.to_string()).collect();
        assert_eq!(fields, vec!["status", "owner.team", "done"]);
    }

    #[test]
    fn test_missing_operator() {
        let err = with_parser("status open\n", |p| p.condition().unwrap_err());
        assert!(err.message.starts_with("expected a comparison operator"));
    }

    #[test]
    fn test_sort_keys() {
        let keys = with_parser("due_date desc, title\n", |p| p.sort_keys().unwrap());
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].direction, SortDirection::Desc);
        assert_eq!(keys[1].direction, SortDirection::Asc);
    }

    #[test]
    fn test_aggregate() {
        let agg = with_parser("count(Task where done = false)\n", |p| {
            p.aggregate_expr().unwrap()
        });
        assert_eq!(agg.func, AggregateFn::Count);
        assert_eq!(agg.target, "Task");
        assert!(agg.filter.is_some());

        let err = with_parser("median(amount)\n", |p| p.aggregate_expr().unwrap_err());
        assert!(err.message.contains("unknown aggregate function 'median'"));
    }

    fn nested(levels: usize) -> String {
        format!("{}done = true{}\n", "not (".repeat(levels), ")".repeat(levels))
    }

    #[test]
    fn test_nesting_up_to_the_limit() {
        // each `not (` opens two levels
        let levels = MAX_CONDITION_DEPTH as usize / 2;
        let cond = with_parser(&nested(levels), |p| p.condition().unwrap());
        assert!(matches!(cond, Condition::Not(_)));

        let err = with_parser(&nested(levels + 1), |p| p.condition().unwrap_err());
        assert!(err.message.contains("nested deeper than 64 levels"), "{}", err.message);
    }

    #[test]
    fn test_runaway_nesting_is_an_error() {
        let err = with_parser(&nested(50_000), |p| p.condition().unwrap_err());
        assert_eq!(err.pos.line, 0);
        let err = with_parser(&format!("{}a = 1\n", "not ".repeat(50_000)), |p| {
            p.condition().unwrap_err()
        });
        assert!(err.fix.is_some());
    }
}
