//! Simple tables and single values.

use super::SkipReason;
use crate::blocks::{Cell, KpiCell, SimpleTableBlock, SingleValueBlock, TableRow};
use crate::markup::{escape_html, snippet, MarkupWriter};

pub(super) fn simple_table(block: &SimpleTableBlock) -> String {
    let default_rows;
    let rows: &[TableRow] = if block.rows.is_empty() {
        default_rows = [TableRow::new(vec![Cell::text("")])];
        &default_rows
    } else {
        &block.rows
    };

    let mut w = MarkupWriter::new();
    w.open("table", "report-simple-table")
        .newline()
        .open_plain("tbody")
        .newline();
    for row in rows {
        w.open_plain("tr");
        if row.cells.is_empty() {
            w.open_plain("td").close("td");
        }
        for cell in &row.cells {
            w.open_plain("td").raw(&cell_markup(cell)).close("td");
        }
        w.close("tr").newline();
    }
    w.close("tbody").newline().close("table");
    w.finish()
}

fn cell_markup(cell: &Cell) -> String {
    match cell {
        Cell::Text(c) => escape_html(&c.text),
        Cell::Kpi(c) => kpi_cell(c).unwrap_or_default(),
        Cell::Formula(c) => match c.kpi_id {
            Some(kpi_id) if !c.formula.trim().is_empty() => {
                snippet::formula(kpi_id, c.entry_index, &c.formula)
            }
            _ => {
                log::debug!("empty formula cell: no KPI or no formula text");
                String::new()
            }
        },
        Cell::Unsupported => String::new(),
    }
}

fn kpi_cell(cell: &KpiCell) -> Option<String> {
    let kpi_id = cell.kpi_id?;
    let field_key = cell.field_key.trim();
    if field_key.is_empty() {
        log::debug!("empty kpi cell for KPI {}: no field selected", kpi_id);
        return None;
    }
    let sub_field = cell
        .sub_field_key
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let markup = if cell.as_group {
        snippet::repeating_rows_table(kpi_id, field_key, cell.entry_index)
    } else if let (Some(sub), Some(func)) = (sub_field, cell.sub_field_group_fn) {
        snippet::grouped_aggregate(kpi_id, field_key, sub, func, cell.entry_index)
    } else {
        snippet::scalar_value(kpi_id, field_key, sub_field, cell.entry_index)
    };
    Some(markup)
}

pub(super) fn single_value(block: &SingleValueBlock) -> Result<String, SkipReason> {
    let field_key = block.field_key.trim();
    if field_key.is_empty() {
        return Err(SkipReason::BlankFieldKey);
    }
    let kpi_id = block.kpi_id.ok_or(SkipReason::MissingKpi)?;
    let mut w = MarkupWriter::new();
    w.open("p", "report-single-value")
        .raw(&snippet::scalar_value(
            kpi_id,
            field_key,
            block.sub_field_key.as_deref(),
            block.entry_index,
        ))
        .close("p");
    Ok(w.finish())
}
