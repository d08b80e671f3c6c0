//! KPI tables, grids and lists.
//!
//! With no KPI and no field selection the block iterates everything. Any
//! selection switches to the filtered form: the selected ids and keys are
//! bound once (`kpi_ids_set`, `field_keys_list`) and fields are looked up
//! by key, since field order on an entry is not stable.

use crate::markup::escape::{int_list, string_list};
use crate::markup::snippet::{items_list, items_table};
use crate::markup::MarkupWriter;

/// Layout of a KPI block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpiLayout {
    Table { one_table_per_kpi: bool },
    Grid,
    List,
}

/// Which KPIs and fields a block iterates.
struct Selection<'a> {
    kpi_ids: &'a [i64],
    field_keys: &'a [String],
}

impl Selection<'_> {
    fn is_wildcard(&self) -> bool {
        self.kpi_ids.is_empty() && self.field_keys.is_empty()
    }

    /// `{% set ... %}` bindings for the non-empty selections.
    fn bindings(&self, w: &mut MarkupWriter) {
        if !self.kpi_ids.is_empty() {
            w.directive(&format!("set kpi_ids_set = {}", int_list(self.kpi_ids)))
                .newline();
        }
        if !self.field_keys.is_empty() {
            w.directive(&format!(
                "set field_keys_list = {}",
                string_list(self.field_keys)
            ))
            .newline();
        }
    }

    fn open_kpi_loop(&self, w: &mut MarkupWriter) {
        if self.kpi_ids.is_empty() {
            w.directive("for kpi in kpis");
        } else {
            w.directive("for kpi in kpis if kpi.kpi_id in kpi_ids_set");
        }
    }

    /// Loop over the entry's fields, running `row` once per field.
    fn field_loop(&self, w: &mut MarkupWriter, row: impl FnOnce(&mut MarkupWriter)) {
        if self.field_keys.is_empty() {
            w.directive("for field in entry.fields").newline();
            row(w);
            w.end_for().newline();
        } else {
            w.directive("for field_key in field_keys_list")
                .directive("for field in entry.fields if field.field_key == field_key")
                .newline();
            row(w);
            w.end_for().end_for().newline();
        }
    }
}

pub(super) fn kpi_block(kpi_ids: &[i64], field_keys: &[String], layout: KpiLayout) -> String {
    let selection = Selection {
        kpi_ids,
        field_keys,
    };
    let mut w = MarkupWriter::new();
    if !selection.is_wildcard() {
        selection.bindings(&mut w);
    }
    match layout {
        KpiLayout::Table {
            one_table_per_kpi: true,
        } => table_per_kpi(&selection, &mut w),
        KpiLayout::Table {
            one_table_per_kpi: false,
        } => single_table(&selection, &mut w),
        KpiLayout::Grid => grid(&selection, &mut w),
        KpiLayout::List => list(&selection, &mut w),
    }
    w.finish()
}

fn table_per_kpi(selection: &Selection<'_>, w: &mut MarkupWriter) {
    selection.open_kpi_loop(w);
    w.newline()
        .open("h3", "report-kpi-name")
        .interpolate("kpi.kpi_name")
        .close("h3")
        .newline()
        .directive("for entry in kpi.entries")
        .newline()
        .open("table", "report-kpi-table")
        .newline()
        .raw("<thead><tr><th>Field</th><th>Value</th></tr></thead>")
        .newline()
        .open_plain("tbody")
        .newline();
    selection.field_loop(w, |w| {
        w.open_plain("tr")
            .open_plain("td")
            .interpolate("field.field_name")
            .close("td")
            .open_plain("td");
        field_value(w, items_table);
        w.close("td").close("tr").newline();
    });
    w.close("tbody")
        .newline()
        .close("table")
        .newline()
        .end_for()
        .newline()
        .end_for();
}

fn single_table(selection: &Selection<'_>, w: &mut MarkupWriter) {
    w.open("table", "report-kpi-table")
        .newline()
        .raw("<thead><tr><th>KPI</th><th>Field</th><th>Value</th></tr></thead>")
        .newline()
        .open_plain("tbody")
        .newline();
    selection.open_kpi_loop(w);
    w.directive("for entry in kpi.entries").newline();
    selection.field_loop(w, |w| {
        w.open_plain("tr")
            .open_plain("td")
            .interpolate("kpi.kpi_name")
            .close("td")
            .open_plain("td")
            .interpolate("field.field_name")
            .close("td")
            .open_plain("td");
        field_value(w, items_table);
        w.close("td").close("tr").newline();
    });
    w.end_for()
        .end_for()
        .newline()
        .close("tbody")
        .newline()
        .close("table");
}

fn grid(selection: &Selection<'_>, w: &mut MarkupWriter) {
    w.open("div", "report-kpi-grid").newline();
    selection.open_kpi_loop(w);
    w.newline()
        .open("div", "report-kpi-card")
        .newline()
        .open("h3", "report-kpi-name")
        .interpolate("kpi.kpi_name")
        .close("h3")
        .newline()
        .directive("for entry in kpi.entries")
        .newline();
    selection.field_loop(w, |w| {
        w.open("div", "report-kpi-field")
            .open("span", "report-field-name")
            .interpolate("field.field_name")
            .close("span")
            .open("span", "report-field-value");
        field_value(w, items_table);
        w.close("span").close("div").newline();
    });
    w.end_for()
        .newline()
        .close("div")
        .newline()
        .end_for()
        .newline()
        .close("div");
}

fn list(selection: &Selection<'_>, w: &mut MarkupWriter) {
    w.open("dl", "report-kpi-list").newline();
    selection.open_kpi_loop(w);
    w.newline()
        .open_plain("dt")
        .interpolate("kpi.kpi_name")
        .close("dt")
        .newline()
        .directive("for entry in kpi.entries")
        .newline();
    selection.field_loop(w, |w| {
        w.open_plain("dd")
            .open("span", "report-field-name")
            .interpolate("field.field_name")
            .close("span")
            .raw(": ");
        field_value(w, items_list);
        w.close("dd").newline();
    });
    w.end_for()
        .newline()
        .end_for()
        .newline()
        .close("dl");
}

/// A field's value: repeating rows rendered by `nested`, anything else
/// interpolated directly.
fn field_value(w: &mut MarkupWriter, nested: fn(&str) -> MarkupWriter) {
    w.directive("if field.field_type == \"multi_line_items\"")
        .directive("if field.value")
        .append(&nested("field.value"))
        .end_if()
        .directive("else")
        .interpolate("field.value if field.value is not none else \"\"")
        .end_if();
}
