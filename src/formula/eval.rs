//! Formula evaluation against one resolved KPI entry.
//!
//! Evaluation is total: a missing field, a missing sub-field, a non-numeric
//! operand or a division by zero yields `None` instead of an error, so one
//! bad reference degrades a single value and never the whole report.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};

use super::ast::*;

/// One row of a repeating field, keyed by sub-field.
pub type Row = Map<String, Value>;

/// Values visible to a formula.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// Numeric scalar fields of the entry, by field key.
    scalars: HashMap<String, f64>,
    /// Repeating fields of the entry, by field key.
    items: HashMap<String, Vec<Row>>,
    /// Numeric fields of other KPIs for the same organization and year.
    other_kpis: HashMap<(i64, String), f64>,
}

impl EvalContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scalar(mut self, key: impl Into<String>, value: f64) -> Self {
        self.scalars.insert(key.into(), value);
        self
    }

    pub fn with_items(mut self, key: impl Into<String>, rows: Vec<Row>) -> Self {
        self.items.insert(key.into(), rows);
        self
    }

    pub fn with_kpi_value(mut self, kpi_id: i64, key: impl Into<String>, value: f64) -> Self {
        self.other_kpis.insert((kpi_id, key.into()), value);
        self
    }

    pub fn insert_scalar(&mut self, key: impl Into<String>, value: f64) {
        self.scalars.insert(key.into(), value);
    }

    pub fn insert_items(&mut self, key: impl Into<String>, rows: Vec<Row>) {
        self.items.insert(key.into(), rows);
    }

    pub fn insert_kpi_value(&mut self, kpi_id: i64, key: impl Into<String>, value: f64) {
        self.other_kpis.insert((kpi_id, key.into()), value);
    }

    pub fn scalar(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied()
    }

    pub fn rows(&self, key: &str) -> Option<&[Row]> {
        self.items.get(key).map(Vec::as_slice)
    }
}

/// Digits beyond which `ROUND` leaves its value unchanged.
const MAX_ROUND_DIGITS: u32 = 15;

/// Evaluate an expression. Returns `None` when the value is undefined.
pub fn evaluate(expr: &Expr, ctx: &EvalContext) -> Option<f64> {
    let value = match expr {
        Expr::Number(n) => Some(*n),
        Expr::Field(key) => ctx.scalar(key),
        Expr::Group(inner) => evaluate(inner, ctx),
        Expr::Neg(inner) => evaluate(inner, ctx).map(|v| -v),
        Expr::Binary { op, lhs, rhs } => {
            let l = evaluate(lhs, ctx)?;
            let r = evaluate(rhs, ctx)?;
            match op {
                BinaryOp::Add => Some(l + r),
                BinaryOp::Sub => Some(l - r),
                BinaryOp::Mul => Some(l * r),
                BinaryOp::Div if r == 0.0 => None,
                BinaryOp::Div => Some(l / r),
            }
        }
        Expr::Aggregate(agg) => evaluate_aggregate(agg, ctx),
        Expr::KpiField { kpi_id, field_key } => {
            ctx.other_kpis.get(&(*kpi_id, field_key.clone())).copied()
        }
        Expr::Round { expr, digits } => {
            let v = evaluate(expr, ctx)?;
            // Past f64 precision rounding is a no-op, and the factor would overflow.
            if *digits > MAX_ROUND_DIGITS {
                return Some(v);
            }
            let factor = 10f64.powi(*digits as i32);
            Some((v * factor).round() / factor)
        }
    };
    value.filter(|v| v.is_finite())
}

/// Evaluate formula text. Unparseable formulas evaluate to `None`.
pub fn evaluate_str(source: &str, ctx: &EvalContext) -> Option<f64> {
    match super::parse_formula(source) {
        Ok(expr) => evaluate(&expr, ctx),
        Err(e) => {
            log::debug!("formula '{}' not evaluated: {}", source.trim(), e);
            None
        }
    }
}

fn evaluate_aggregate(agg: &Aggregate, ctx: &EvalContext) -> Option<f64> {
    let rows = ctx.rows(&agg.field_key)?;
    // A sub-field no row carries is missing, not empty.
    let carried = |key: &str| rows.is_empty() || rows.iter().any(|row| row.contains_key(key));

    let selected: Vec<&Row> = match &agg.filter {
        Some(filter) if !carried(&filter.sub_field_key) => return None,
        Some(filter) => rows.iter().filter(|row| row_matches(row, filter)).collect(),
        None => rows.iter().collect(),
    };

    let numeric = || -> Option<Vec<f64>> {
        let sub_key = agg.sub_field_key.as_deref()?;
        if !carried(sub_key) {
            return None;
        }
        Some(
            selected
                .iter()
                .filter_map(|row| row.get(sub_key).and_then(as_number))
                .collect(),
        )
    };

    match agg.func {
        AggregateFn::Count => Some(selected.len() as f64),
        AggregateFn::Sum => Some(total(&numeric()?)),
        AggregateFn::Avg => {
            let values = numeric()?;
            if values.is_empty() {
                None
            } else {
                Some(total(&values) / values.len() as f64)
            }
        }
        AggregateFn::Min => numeric()?.into_iter().reduce(f64::min),
        AggregateFn::Max => numeric()?.into_iter().reduce(f64::max),
    }
}

/// Sum starting from positive zero. `Iterator::sum` over `f64` starts at
/// `-0.0`, which would display as `-0`.
fn total(values: &[f64]) -> f64 {
    values.iter().fold(0.0, |acc, v| acc + v)
}

/// Whether a row passes a `*_WHERE` filter. Rows missing the filter
/// sub-field never match.
fn row_matches(row: &Row, filter: &Filter) -> bool {
    let Some(cell) = row.get(&filter.sub_field_key) else {
        return false;
    };
    if cell.is_null() {
        return false;
    }

    let ordering = match &filter.value {
        FilterValue::Number(n) => match as_number(cell) {
            Some(v) => v.partial_cmp(n),
            None => None,
        },
        FilterValue::Text(text) => match (as_number(cell), text.trim().parse::<f64>().ok()) {
            (Some(v), Some(n)) => v.partial_cmp(&n),
            _ => Some(as_text(cell).as_str().cmp(text.as_str())),
        },
    };

    let Some(ordering) = ordering else {
        return false;
    };
    match filter.op {
        CompareOp::Eq => ordering == Ordering::Equal,
        CompareOp::Neq => ordering != Ordering::Equal,
        CompareOp::Gt => ordering == Ordering::Greater,
        CompareOp::Gte => ordering != Ordering::Less,
        CompareOp::Lt => ordering == Ordering::Less,
        CompareOp::Lte => ordering != Ordering::Greater,
    }
}

/// Numeric view of a JSON value. Numeric strings count as numbers.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
