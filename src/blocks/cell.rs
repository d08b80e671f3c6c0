//! Rows and cells of a `simple_table` block.

use serde::{Deserialize, Serialize};

use super::de;
use crate::formula::AggregateFn;

/// One row of a simple table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableRow {
    #[serde(deserialize_with = "de::null_as_default")]
    pub cells: Vec<Cell>,
}

impl TableRow {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }
}

/// A table cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Cell {
    /// Literal user text. HTML-escaped on output.
    Text(TextCell),
    /// Reference to a KPI field value.
    Kpi(KpiCell),
    /// Formula evaluated for one KPI entry.
    Formula(FormulaCell),
    /// Unknown cell type. Renders as an empty cell.
    #[serde(other)]
    Unsupported,
}

impl Cell {
    pub fn text(text: impl Into<String>) -> Self {
        Cell::Text(TextCell { text: text.into() })
    }

    pub fn formula(kpi_id: i64, formula: impl Into<String>, entry_index: u32) -> Self {
        Cell::Formula(FormulaCell {
            kpi_id: Some(kpi_id),
            formula: formula.into(),
            entry_index,
        })
    }

    pub fn kpi(kpi_id: i64, field_key: impl Into<String>) -> Self {
        Cell::Kpi(KpiCell::new(kpi_id, field_key))
    }
}

impl From<KpiCell> for Cell {
    fn from(cell: KpiCell) -> Self {
        Cell::Kpi(cell)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextCell {
    #[serde(alias = "content", deserialize_with = "de::null_as_default")]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KpiCell {
    pub kpi_id: Option<i64>,
    #[serde(deserialize_with = "de::null_as_default")]
    pub field_key: String,
    #[serde(
        deserialize_with = "de::blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub sub_field_key: Option<String>,
    #[serde(deserialize_with = "de::group_fn", skip_serializing_if = "Option::is_none")]
    pub sub_field_group_fn: Option<AggregateFn>,
    /// Render the whole repeating field as a nested table.
    #[serde(deserialize_with = "de::null_as_default")]
    pub as_group: bool,
    #[serde(deserialize_with = "de::entry_index")]
    pub entry_index: u32,
}

impl KpiCell {
    pub fn new(kpi_id: i64, field_key: impl Into<String>) -> Self {
        Self {
            kpi_id: Some(kpi_id),
            field_key: field_key.into(),
            ..Self::default()
        }
    }

    pub fn with_sub_field(mut self, sub_field_key: impl Into<String>) -> Self {
        self.sub_field_key = Some(sub_field_key.into());
        self
    }

    pub fn with_group_fn(mut self, func: AggregateFn) -> Self {
        self.sub_field_group_fn = Some(func);
        self
    }

    pub fn grouped(mut self) -> Self {
        self.as_group = true;
        self
    }

    pub fn at_entry(mut self, entry_index: u32) -> Self {
        self.entry_index = entry_index;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FormulaCell {
    pub kpi_id: Option<i64>,
    #[serde(deserialize_with = "de::null_as_default")]
    pub formula: String,
    #[serde(deserialize_with = "de::entry_index")]
    pub entry_index: u32,
}
