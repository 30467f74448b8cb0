//! Conditions, literals and aggregate expressions.
//!
//! This is the whole expression language: comparisons joined by `and`/`or`,
//! membership tests, and a handful of aggregate functions. There is nothing
//! to evaluate here; the compiler only checks which fields are named.

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::base::LineCol;

/// A literal value as written in source.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum Literal {
    Str(String),
    Int(i64),
    /// Fixed-point value kept as its source text.
    Decimal(SmolStr),
    Bool(bool),
    /// A bare word: an enum member or a context value like `today`.
    Ident(SmolStr),
}

impl Literal {
    /// Short name of the literal's kind, used in messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Literal::Str(_) => "string",
            Literal::Int(_) => "integer",
            Literal::Decimal(_) => "decimal",
            Literal::Bool(_) => "boolean",
            Literal::Ident(_) => "identifier",
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => write!(f, "{s:?}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Decimal(d) => f.write_str(d),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Ident(i) => f.write_str(i),
        }
    }
}

/// Comparison operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    pub const fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }
}

/// A possibly dotted field reference such as `owner.name`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct FieldPath {
    pub segments: Vec<SmolStr>,
    pub pos: LineCol,
}

impl FieldPath {
    pub fn new(segments: Vec<SmolStr>, pos: LineCol) -> Self {
        Self { segments, pos }
    }

    /// The first segment, which names a field on the context entity.
    pub fn head(&self) -> &str {
        self.segments.first().map_or("", SmolStr::as_str)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(seg)?;
        }
        Ok(())
    }
}

/// A boolean condition over the fields of one entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum Condition {
    Compare {
        field: FieldPath,
        op: CompareOp,
        value: Literal,
    },
    In {
        field: FieldPath,
        values: Vec<Literal>,
        negated: bool,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Every field path mentioned by the condition, left to right.
    pub fn fields(&self) -> Vec<&FieldPath> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a FieldPath>) {
        match self {
            Condition::Compare { field, .. } | Condition::In { field, .. } => out.push(field),
            Condition::And(a, b) | Condition::Or(a, b) => {
                a.collect_fields(out);
                b.collect_fields(out);
            }
            Condition::Not(inner) => inner.collect_fields(out),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare { field, op, value } => {
                write!(f, "{field} {} {value}", op.symbol())
            }
            Condition::In {
                field,
                values,
                negated,
            } => {
                let not = if *negated { "not " } else { "" };
                write!(f, "{field} {not}in [")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            Condition::And(a, b) => write!(f, "({a} and {b})"),
            Condition::Or(a, b) => write!(f, "({a} or {b})"),
            Condition::Not(inner) => write!(f, "not {inner}"),
        }
    }
}

/// Aggregate function name.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggregateFn {
    pub const fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Count => "count",
            AggregateFn::Sum => "sum",
            AggregateFn::Avg => "avg",
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
        }
    }
}

impl FromStr for AggregateFn {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "count" => Ok(AggregateFn::Count),
            "sum" => Ok(AggregateFn::Sum),
            "avg" => Ok(AggregateFn::Avg),
            "min" => Ok(AggregateFn::Min),
            "max" => Ok(AggregateFn::Max),
            _ => Err(()),
        }
    }
}

/// `count(Task where done = false)` or `sum(amount)`.
///
/// For `count` the target is an entity name; for the other functions it is a
/// field of the region's source entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct AggregateExpr {
    pub func: AggregateFn,
    pub target: SmolStr,
    pub filter: Option<Condition>,
    pub pos: LineCol,
}

impl fmt::Display for AggregateExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}", self.func.as_str(), self.target)?;
        if let Some(filter) = &self.filter {
            write!(f, " where {filter}")?;
        }
        f.write_str(")")
    }
}

/// Sort direction of a sort key.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "interchange", serde(rename_all = "snake_case"))]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// One `field [asc|desc]` entry of a `sort:` line.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub struct SortKey {
    pub field: FieldPath,
    pub direction: SortDirection,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(name: &str) -> FieldPath {
        FieldPath::new(name.split('.').map(SmolStr::new).collect(), LineCol::default())
    }

    #[test]
    fn test_condition_fields_in_order() {
        let cond = Condition::And(
            Box::new(Condition::Compare {
                field: path("status"),
                op: CompareOp::Eq,
                value: Literal::Ident("open".into()),
            }),
            Box::new(Condition::Not(Box::new(Condition::In {
                field: path("owner.team"),
                values: vec![Literal::Str("ops".into())],
                negated: false,
            }))),
        );

        let names: Vec<String> = cond.fields().iter().map(|p| p.to_string()).collect();
        assert_eq!(names, vec!["status", "owner.team"]);
        assert_eq!(cond.fields()[1].head(), "owner");
    }

    #[test]
    fn test_condition_display() {
        let cond = Condition::Or(
            Box::new(Condition::Compare {
                field: path("priority"),
                op: CompareOp::Ge,
                value: Literal::Int(3),
            }),
            Box::new(Condition::In {
                field: path("status"),
                values: vec![Literal::Ident("a".into()), Literal::Ident("b".into())],
                negated: true,
            }),
        );
        assert_eq!(cond.to_string(), "(priority >= 3 or status not in [a, b])");
    }

    #[test]
    fn test_aggregate_display() {
        let agg = AggregateExpr {
            func: AggregateFn::Count,
            target: "Task".into(),
            filter: Some(Condition::Compare {
                field: path("done"),
                op: CompareOp::Eq,
                value: Literal::Bool(false),
            }),
            pos: LineCol::default(),
        };
        assert_eq!(agg.to_string(), "count(Task where done = false)");
        assert_eq!("avg".parse::<AggregateFn>(), Ok(AggregateFn::Avg));
        assert!("median".parse::<AggregateFn>().is_err());
    }
}
