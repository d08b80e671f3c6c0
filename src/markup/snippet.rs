//! Snippet builders: one resolved reference in, one markup fragment out.
//!
//! The builders are total. They never check that the KPI, field or
//! sub-field exists; that belongs to editor-time validation.

use crate::formula::{Aggregate, AggregateFn, Expr};

use super::escape::quote;
use super::writer::MarkupWriter;

/// Name of the scalar resolver exposed to templates.
pub const SCALAR_RESOLVER: &str = "get_kpi_field_value";

/// Name of the formula resolver exposed to templates.
pub const FORMULA_RESOLVER: &str = "evaluate_report_formula";

/// The "no sub-field" sentinel passed to the scalar resolver.
pub const NO_SUB_FIELD: &str = "None";

/// Scalar value interpolation.
///
/// A missing or blank sub-field key is passed as [`NO_SUB_FIELD`] so the
/// resolver always receives five arguments.
pub fn scalar_value(
    kpi_id: i64,
    field_key: &str,
    sub_field_key: Option<&str>,
    entry_index: u32,
) -> String {
    let sub = match sub_field_key.map(str::trim).filter(|s| !s.is_empty()) {
        Some(key) => quote(key),
        None => NO_SUB_FIELD.to_string(),
    };
    let mut w = MarkupWriter::new();
    w.interpolate(&format!(
        "{}(kpis, {}, {}, {}, {})",
        SCALAR_RESOLVER,
        kpi_id,
        quote(field_key),
        sub,
        entry_index
    ));
    w.finish()
}

/// Table of a repeating field's rows.
///
/// The header is the sub-field keys of the first row. Nothing renders when
/// the KPI, entry or field is absent or the field has no rows.
pub fn repeating_rows_table(kpi_id: i64, field_key: &str, entry_index: u32) -> String {
    let mut w = MarkupWriter::new();
    w.directive(&format!("for kpi in kpis if kpi.kpi_id == {}", kpi_id))
        .directive(&format!("if kpi.entries|length > {}", entry_index))
        .directive(&format!(
            "for field in kpi.entries[{}].fields if field.field_key == {}",
            entry_index,
            quote(field_key)
        ))
        .directive("if field.value and field.value|length > 0")
        .append(&items_table("field.value"))
        .end_if()
        .end_for()
        .end_if()
        .end_for();
    w.finish()
}

/// Grouped aggregate over one sub-field, e.g. `SUM_ITEMS(rows, amount)`,
/// evaluated for `(kpi_id, entry_index)`.
pub fn grouped_aggregate(
    kpi_id: i64,
    field_key: &str,
    sub_field_key: &str,
    group_fn: AggregateFn,
    entry_index: u32,
) -> String {
    let expr = Expr::Aggregate(Aggregate::new(
        group_fn,
        field_key,
        Some(sub_field_key.to_string()),
    ));
    formula(kpi_id, entry_index, &expr.to_string())
}

/// Formula evaluation interpolation. The text is trimmed, then escaped.
pub fn formula(kpi_id: i64, entry_index: u32, text: &str) -> String {
    let mut w = MarkupWriter::new();
    w.interpolate(&format!(
        "{}(kpis, {}, {}, {})",
        FORMULA_RESOLVER,
        kpi_id,
        quote(text.trim()),
        entry_index
    ));
    w.finish()
}

/// Nested table over a list of row objects bound to `rows_expr`.
pub fn items_table(rows_expr: &str) -> MarkupWriter {
    let mut w = MarkupWriter::new();
    w.open("table", "report-items")
        .open_plain("thead")
        .open_plain("tr")
        .directive(&format!("for key in {}[0].keys()", rows_expr))
        .open_plain("th")
        .interpolate("key")
        .close("th")
        .end_for()
        .close("tr")
        .close("thead")
        .open_plain("tbody")
        .directive(&format!("for row in {}", rows_expr))
        .open_plain("tr")
        .directive(&format!("for key in {}[0].keys()", rows_expr))
        .open_plain("td")
        .interpolate("row[key]")
        .close("td")
        .end_for()
        .close("tr")
        .end_for()
        .close("tbody")
        .close("table");
    w
}

/// Nested bullet list over a list of row objects bound to `rows_expr`.
pub fn items_list(rows_expr: &str) -> MarkupWriter {
    let mut w = MarkupWriter::new();
    w.open("ul", "report-items")
        .directive(&format!("for row in {}", rows_expr))
        .open_plain("li")
        .directive("for key in row.keys()")
        .interpolate("key")
        .raw(": ")
        .interpolate("row[key]")
        .directive("if not loop.last")
        .raw(", ")
        .end_if()
        .end_for()
        .close("li")
        .end_for()
        .close("ul");
    w
}
