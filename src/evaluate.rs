//! Dry-run evaluation of a single reference.
//!
//! The editor previews a value or formula before inserting it into a text
//! block. [`SnippetRequest::to_markup`] produces the exact snippet that
//! gets inserted, and [`evaluate_snippet`] resolves the same reference
//! against a [`ReportData`], so preview and compiled output always agree.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::EvaluationSettings;
use crate::dataset::{display_value, ReportData};
use crate::formula::{self, eval, Aggregate, AggregateFn, Expr, FormulaError};
use crate::markup::snippet;

/// One reference to preview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SnippetRequest {
    /// A field value, optionally aggregated over a sub-field.
    KpiValue {
        kpi_id: i64,
        field_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_field_key: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sub_field_group_fn: Option<AggregateFn>,
        #[serde(default)]
        entry_index: u32,
    },
    /// A formula evaluated for one KPI entry.
    Formula {
        kpi_id: i64,
        expression: String,
        #[serde(default)]
        entry_index: u32,
    },
}

/// Errors rejecting a request before evaluation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvaluateError {
    #[error("No field selected")]
    BlankFieldKey,

    #[error(transparent)]
    Formula(#[from] FormulaError),
}

impl SnippetRequest {
    /// The grouped formula this request stands for, if any.
    fn grouped_formula(&self) -> Option<Expr> {
        match self {
            SnippetRequest::KpiValue {
                field_key,
                sub_field_key: Some(sub),
                sub_field_group_fn: Some(func),
                ..
            } if !sub.trim().is_empty() => Some(Expr::Aggregate(Aggregate::new(
                *func,
                field_key.trim(),
                Some(sub.trim().to_string()),
            ))),
            _ => None,
        }
    }

    /// The snippet the editor inserts for this reference.
    pub fn to_markup(&self) -> String {
        match self {
            SnippetRequest::KpiValue {
                kpi_id,
                field_key,
                sub_field_key,
                sub_field_group_fn,
                entry_index,
            } => match (sub_field_key.as_deref(), sub_field_group_fn) {
                (Some(sub), Some(func)) if !sub.trim().is_empty() => snippet::grouped_aggregate(
                    *kpi_id,
                    field_key.trim(),
                    sub.trim(),
                    *func,
                    *entry_index,
                ),
                _ => snippet::scalar_value(
                    *kpi_id,
                    field_key.trim(),
                    sub_field_key.as_deref(),
                    *entry_index,
                ),
            },
            SnippetRequest::Formula {
                kpi_id,
                expression,
                entry_index,
            } => snippet::formula(*kpi_id, *entry_index, expression),
        }
    }
}

/// Evaluate one reference to its display value.
///
/// Unresolvable references (missing KPI, entry or field, division by zero)
/// display as `settings.empty_value`. Only requests that cannot be
/// evaluated at all are errors.
pub fn evaluate_snippet(
    data: &ReportData,
    request: &SnippetRequest,
    settings: &EvaluationSettings,
) -> Result<String, EvaluateError> {
    let empty = || settings.empty_value.clone();

    match request {
        SnippetRequest::KpiValue {
            kpi_id,
            field_key,
            sub_field_key,
            entry_index,
            ..
        } => {
            let field_key = field_key.trim();
            if field_key.is_empty() {
                return Err(EvaluateError::BlankFieldKey);
            }
            if let Some(expr) = request.grouped_formula() {
                let value = data
                    .eval_context(*kpi_id, *entry_index)
                    .and_then(|ctx| eval::evaluate(&expr, &ctx));
                return Ok(value.map_or_else(empty, |n| format_number(n, settings.decimal_places)));
            }
            let value = data.field_value(*kpi_id, field_key, sub_field_key.as_deref(), *entry_index);
            Ok(match value {
                Some(serde_json::Value::Number(n)) => match n.as_f64() {
                    Some(f) => format_number(f, settings.decimal_places),
                    None => n.to_string(),
                },
                Some(other) => display_value(&other),
                None => empty(),
            })
        }
        SnippetRequest::Formula {
            kpi_id,
            expression,
            entry_index,
        } => {
            let expr = formula::parse_formula(expression)?;
            let value = data
                .eval_context(*kpi_id, *entry_index)
                .and_then(|ctx| eval::evaluate(&expr, &ctx));
            if value.is_none() {
                log::debug!(
                    "formula '{}' for KPI {} entry {} has no value",
                    expression.trim(),
                    kpi_id,
                    entry_index
                );
            }
            Ok(value.map_or_else(empty, |n| format_number(n, settings.decimal_places)))
        }
    }
}

/// Format a number for display. Whole numbers print without a fraction
/// unless a fixed number of decimal places is requested.
pub fn format_number(value: f64, decimal_places: Option<u32>) -> String {
    match decimal_places {
        Some(places) => {
            let text = format!("{:.*}", places as usize, value);
            // Values that round to zero print unsigned.
            match text.strip_prefix('-') {
                Some(unsigned) if unsigned.chars().all(|c| c == '0' || c == '.') => {
                    unsigned.to_string()
                }
                _ => text,
            }
        }
        None if value.fract() == 0.0 && value.abs() < 1e15 => format!("{}", value as i64),
        None => value.to_string(),
    }
}
