use chrono::{DateTime, SecondsFormat, Utc};
use itertools::Itertools;
use strum_macros::{Display, EnumString};

use crate::dialect::Dialect;

/// Comparison operators that can be shipped to the remote database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum QualOperator {
    #[strum(serialize = "=")]
    Eq,
    #[strum(to_string = "<>", serialize = "!=")]
    NotEq,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = "<=")]
    LtEq,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = ">=")]
    GtEq,
    #[strum(to_string = "LIKE", serialize = "~~")]
    Like,
    #[strum(to_string = "NOT LIKE", serialize = "!~~")]
    NotLike,
    #[strum(to_string = "ILIKE", serialize = "~~*")]
    ILike,
    #[strum(to_string = "NOT ILIKE", serialize = "!~~*")]
    NotILike,
    #[strum(serialize = "~")]
    RegexMatch,
    #[strum(serialize = "~*")]
    RegexIMatch,
    #[strum(serialize = "!~")]
    RegexNotMatch,
    #[strum(serialize = "!~*")]
    RegexNotIMatch,
    #[strum(serialize = "@>")]
    Contains,
    #[strum(serialize = "<@")]
    ContainedBy,
    #[strum(serialize = "IS NULL")]
    IsNull,
    #[strum(serialize = "IS NOT NULL")]
    IsNotNull,
}

impl QualOperator {
    pub fn is_unary(&self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }

    /// The operator to use when the operands are swapped, i.e. `a op b` <=> `b op' a`
    pub fn mirror(&self) -> Option<Self> {
        match self {
            Self::Eq | Self::NotEq => Some(*self),
            Self::Lt => Some(Self::Gt),
            Self::LtEq => Some(Self::GtEq),
            Self::Gt => Some(Self::Lt),
            Self::GtEq => Some(Self::LtEq),
            Self::Contains => Some(Self::ContainedBy),
            Self::ContainedBy => Some(Self::Contains),
            _ => None,
        }
    }
}

/// Typed literal a qualifier compares against
#[derive(Debug, Clone, PartialEq)]
pub enum QualValue {
    Bool(bool),
    Int64(i64),
    Double(f64),
    String(String),
    Jsonb(String),
    Timestamp(DateTime<Utc>),
    /// An address or network in CIDR notation
    Inet(String),
    /// A value of a kind we can't render; see [`QualValue::to_sql`]
    Unsupported { kind: String },
}

/// Rendered for values we have no literal syntax for. It can never parse, so the remote
/// query fails instead of silently matching the wrong rows.
pub const INVALID_LITERAL: &str = "<INVALID>";

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl QualValue {
    pub fn to_sql(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int64(i) => i.to_string(),
            Self::Double(d) if d.is_nan() => "'NaN'".to_string(),
            Self::Double(d) if d.is_infinite() => {
                if d.is_sign_positive() {
                    "'Infinity'".to_string()
                } else {
                    "'-Infinity'".to_string()
                }
            }
            Self::Double(d) => d.to_string(),
            Self::String(s) | Self::Jsonb(s) | Self::Inet(s) => quote_literal(s),
            Self::Timestamp(ts) => {
                quote_literal(&ts.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            Self::Unsupported { .. } => INVALID_LITERAL.to_string(),
        }
    }
}

/// One `column operator [value]` predicate
#[derive(Debug, Clone, PartialEq)]
pub struct Qualifier {
    pub column: String,
    pub operator: QualOperator,
    pub value: Option<QualValue>,
}

impl Qualifier {
    pub fn new(column: &str, operator: QualOperator, value: QualValue) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: Some(value),
        }
    }

    pub fn unary(column: &str, operator: QualOperator) -> Self {
        Self {
            column: column.to_string(),
            operator,
            value: None,
        }
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let column = dialect.escape_ident(&self.column);
        match &self.value {
            None => format!("{column} {}", self.operator),
            Some(value) => format!("{column} {} {}", self.operator, value.to_sql()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WhereClause {
    pub sql: String,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

/// Combine the qualifiers into a single conjunction (without the `WHERE` keyword)
pub fn translate(dialect: Dialect, qualifiers: &[Qualifier]) -> WhereClause {
    WhereClause {
        sql: qualifiers.iter().map(|q| q.to_sql(dialect)).join(" AND "),
    }
}
