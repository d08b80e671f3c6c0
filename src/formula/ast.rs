//! AST types for the aggregate formula language.
//!
//! Every node renders back to canonical formula text through `Display`, so a
//! parsed expression can be re-serialized and fed to the evaluator (or
//! embedded in a report template) without losing structure.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::markup::quote;

// ============================================================================
// Expressions
// ============================================================================

/// A formula expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal: `60`, `0.25`
    Number(f64),
    /// Bare field key referring to a scalar field of the current entry.
    Field(String),
    /// Parenthesized expression. Kept as a node so parentheses survive a round-trip.
    Group(Box<Expr>),
    /// Unary negation: `-x`
    Neg(Box<Expr>),
    /// Binary arithmetic: `a + b`
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Aggregate over the rows of a repeating field.
    Aggregate(Aggregate),
    /// Cross-entity lookup: `KPI_FIELD(12, "budget")`
    KpiField { kpi_id: i64, field_key: String },
    /// `ROUND(expr, digits)`
    Round { expr: Box<Expr>, digits: u32 },
}

impl Expr {
    pub fn number(n: f64) -> Self {
        Expr::Number(n)
    }

    pub fn field(key: impl Into<String>) -> Self {
        Expr::Field(key.into())
    }

    pub fn group(inner: Expr) -> Self {
        Expr::Group(Box::new(inner))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn kpi_field(kpi_id: i64, field_key: impl Into<String>) -> Self {
        Expr::KpiField {
            kpi_id,
            field_key: field_key.into(),
        }
    }

    /// Binding strength used when deciding whether a child needs parentheses.
    fn precedence(&self) -> u8 {
        match self {
            Expr::Binary { op, .. } => op.precedence(),
            Expr::Neg(_) => 3,
            _ => 4,
        }
    }

    /// Collect every field reference this expression makes, in order of
    /// appearance.
    pub fn references(&self) -> Vec<FieldRef<'_>> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references<'a>(&'a self, out: &mut Vec<FieldRef<'a>>) {
        match self {
            Expr::Field(key) => out.push(FieldRef::Scalar(key)),
            Expr::Aggregate(agg) => {
                out.push(FieldRef::Rows(&agg.field_key));
                let filter_key = agg.filter.as_ref().map(|f| f.sub_field_key.as_str());
                for sub in agg.sub_field_key.as_deref().into_iter().chain(filter_key) {
                    out.push(FieldRef::SubField {
                        field_key: &agg.field_key,
                        sub_field_key: sub,
                    });
                }
            }
            Expr::KpiField { kpi_id, field_key } => out.push(FieldRef::OtherKpi {
                kpi_id: *kpi_id,
                field_key,
            }),
            Expr::Group(inner) | Expr::Neg(inner) => inner.collect_references(out),
            Expr::Round { expr, .. } => expr.collect_references(out),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
            Expr::Number(_) => {}
        }
    }
}

/// A field an expression reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef<'a> {
    /// Scalar field of the current entry.
    Scalar(&'a str),
    /// Repeating field of the current entry.
    Rows(&'a str),
    /// Sub-field of a repeating field, aggregated or filtered on.
    SubField {
        field_key: &'a str,
        sub_field_key: &'a str,
    },
    /// `KPI_FIELD` lookup into another KPI.
    OtherKpi { kpi_id: i64, field_key: &'a str },
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Add | BinaryOp::Sub => 1,
            BinaryOp::Mul | BinaryOp::Div => 2,
        }
    }

    /// `a - (b - c)` and `a / (b / c)` need their right operand parenthesized.
    fn is_left_assoc_only(&self) -> bool {
        matches!(self, BinaryOp::Sub | BinaryOp::Div)
    }
}

// ============================================================================
// Aggregates
// ============================================================================

/// Aggregate function over repeating rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregateFn {
    #[serde(rename = "SUM_ITEMS")]
    Sum,
    #[serde(rename = "AVG_ITEMS")]
    Avg,
    #[serde(rename = "COUNT_ITEMS")]
    Count,
    #[serde(rename = "MIN_ITEMS")]
    Min,
    #[serde(rename = "MAX_ITEMS")]
    Max,
}

impl AggregateFn {
    pub const ALL: [AggregateFn; 5] = [
        AggregateFn::Sum,
        AggregateFn::Avg,
        AggregateFn::Count,
        AggregateFn::Min,
        AggregateFn::Max,
    ];

    /// Function name without the `_WHERE` suffix.
    pub fn name(&self) -> &'static str {
        match self {
            AggregateFn::Sum => "SUM_ITEMS",
            AggregateFn::Avg => "AVG_ITEMS",
            AggregateFn::Count => "COUNT_ITEMS",
            AggregateFn::Min => "MIN_ITEMS",
            AggregateFn::Max => "MAX_ITEMS",
        }
    }

    /// Function name of the filtered variant.
    pub fn where_name(&self) -> &'static str {
        match self {
            AggregateFn::Sum => "SUM_ITEMS_WHERE",
            AggregateFn::Avg => "AVG_ITEMS_WHERE",
            AggregateFn::Count => "COUNT_ITEMS_WHERE",
            AggregateFn::Min => "MIN_ITEMS_WHERE",
            AggregateFn::Max => "MAX_ITEMS_WHERE",
        }
    }

    /// Parse a function name (either form). Returns the function and whether
    /// it is the filtered variant.
    pub fn from_name(s: &str) -> Option<(AggregateFn, bool)> {
        Self::ALL.into_iter().find_map(|f| {
            if s == f.name() {
                Some((f, false))
            } else if s == f.where_name() {
                Some((f, true))
            } else {
                None
            }
        })
    }

    /// COUNT counts rows and takes no aggregation sub-field.
    pub fn takes_sub_field(&self) -> bool {
        !matches!(self, AggregateFn::Count)
    }
}

impl fmt::Display for AggregateFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Comparison operator of a `*_WHERE` filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn token(&self) -> &'static str {
        match self {
            CompareOp::Eq => "op_eq",
            CompareOp::Neq => "op_neq",
            CompareOp::Gt => "op_gt",
            CompareOp::Gte => "op_gte",
            CompareOp::Lt => "op_lt",
            CompareOp::Lte => "op_lte",
        }
    }

    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "op_eq" => Some(CompareOp::Eq),
            "op_neq" => Some(CompareOp::Neq),
            "op_gt" => Some(CompareOp::Gt),
            "op_gte" => Some(CompareOp::Gte),
            "op_lt" => Some(CompareOp::Lt),
            "op_lte" => Some(CompareOp::Lte),
            _ => None,
        }
    }
}

/// Right-hand side of a filter comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

/// Row filter of a `*_WHERE` aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub sub_field_key: String,
    pub op: CompareOp,
    pub value: FilterValue,
}

/// An aggregate call, filtered or not.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub func: AggregateFn,
    /// The repeating (multi-line items) field.
    pub field_key: String,
    /// The sub-field being aggregated. Always `None` for COUNT.
    pub sub_field_key: Option<String>,
    pub filter: Option<Filter>,
}

impl Aggregate {
    /// Build an unfiltered aggregate. The sub-field is dropped for COUNT.
    pub fn new(func: AggregateFn, field_key: impl Into<String>, sub_field_key: Option<String>) -> Self {
        Self {
            func,
            field_key: field_key.into(),
            sub_field_key: if func.takes_sub_field() { sub_field_key } else { None },
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }
}

// ============================================================================
// Canonical serialization
// ============================================================================

/// Write a double-quoted formula string literal.
fn write_string_lit(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str(&quote(s))
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Number(n) => write!(f, "{}", n),
            FilterValue::Text(s) => write_string_lit(f, s),
        }
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            None => {
                write!(f, "{}({}", self.func.name(), self.field_key)?;
                if let Some(sub) = &self.sub_field_key {
                    write!(f, ", {}", sub)?;
                }
                f.write_str(")")
            }
            Some(filter) => {
                write!(f, "{}({}", self.func.where_name(), self.field_key)?;
                if let Some(sub) = &self.sub_field_key {
                    write!(f, ", {}", sub)?;
                }
                write!(
                    f,
                    ", {}, {}, {})",
                    filter.sub_field_key,
                    filter.op.token(),
                    filter.value
                )
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Field(key) => f.write_str(key),
            Expr::Group(inner) => write!(f, "({})", inner),
            Expr::Neg(inner) => {
                if inner.precedence() < self.precedence() {
                    write!(f, "-({})", inner)
                } else {
                    write!(f, "-{}", inner)
                }
            }
            Expr::Binary { op, lhs, rhs } => {
                let prec = op.precedence();
                if lhs.precedence() < prec {
                    write!(f, "({})", lhs)?;
                } else {
                    write!(f, "{}", lhs)?;
                }
                write!(f, " {} ", op.symbol())?;
                let rhs_prec = rhs.precedence();
                if rhs_prec < prec || (rhs_prec == prec && op.is_left_assoc_only()) {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
            Expr::Aggregate(agg) => write!(f, "{}", agg),
            Expr::KpiField { kpi_id, field_key } => {
                write!(f, "KPI_FIELD({}, ", kpi_id)?;
                write_string_lit(f, field_key)?;
                f.write_str(")")
            }
            Expr::Round { expr, digits } => write!(f, "ROUND({}, {})", expr, digits),
        }
    }
}
