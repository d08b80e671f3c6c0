//! The resolved dataset a compiled template renders against.
//!
//! Shape: `template_name`, `year`, `kpis` (KPI → `entries` → `fields`) and
//! `domains` (→ `categories` → `kpis`). A field's `value` is whatever the
//! entry stored: a number, text, a boolean, or for repeating fields a list
//! of row objects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::formula::eval::{as_number, EvalContext, Row};
use crate::metadata::FieldType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    pub field_key: String,
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub value: Value,
    pub field_type: FieldType,
    #[serde(default)]
    pub show_on_card: bool,
}

impl FieldValue {
    /// Rows of a repeating field. Non-object rows are ignored.
    pub fn rows(&self) -> Option<Vec<Row>> {
        if !self.field_type.is_repeating() {
            return None;
        }
        let Value::Array(items) = &self.value else {
            return None;
        };
        Some(
            items
                .iter()
                .filter_map(|item| item.as_object().cloned())
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryData {
    #[serde(default)]
    pub entry_id: Option<i64>,
    #[serde(default)]
    pub fields: Vec<FieldValue>,
}

impl EntryData {
    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.field_key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiData {
    pub kpi_id: i64,
    #[serde(default)]
    pub kpi_name: String,
    #[serde(default)]
    pub entries: Vec<EntryData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryData {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kpis: Vec<KpiData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainData {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<CategoryData>,
}

/// Report data for one organization and year.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    #[serde(default)]
    pub template_name: String,
    #[serde(default)]
    pub template_id: Option<i64>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub kpis: Vec<KpiData>,
    #[serde(default)]
    pub domains: Vec<DomainData>,
}

impl ReportData {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn kpi(&self, kpi_id: i64) -> Option<&KpiData> {
        self.kpis.iter().find(|k| k.kpi_id == kpi_id)
    }

    pub fn entry(&self, kpi_id: i64, entry_index: u32) -> Option<&EntryData> {
        self.kpi(kpi_id)?
            .entries
            .get(usize::try_from(entry_index).ok()?)
    }

    /// Resolve a field value the way the scalar resolver does.
    ///
    /// With a sub-field key, a repeating field yields that sub-field of
    /// every row joined with `", "`. `None` means the value is empty.
    pub fn field_value(
        &self,
        kpi_id: i64,
        field_key: &str,
        sub_field_key: Option<&str>,
        entry_index: u32,
    ) -> Option<Value> {
        let field = self.entry(kpi_id, entry_index)?.field(field_key)?;
        let sub_field_key = sub_field_key.filter(|s| !s.is_empty());
        match (&field.value, sub_field_key) {
            (Value::Array(items), Some(sub)) => {
                let parts: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_object()?.get(sub))
                    .map(display_value)
                    .collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(Value::String(parts.join(", ")))
                }
            }
            (Value::Null, _) => None,
            (value, _) => Some(value.clone()),
        }
    }

    /// Everything a formula attached to `(kpi_id, entry_index)` can see.
    ///
    /// Scalars are the entry's numeric and formula fields, rows come from
    /// its repeating fields, and `KPI_FIELD` resolves against the first
    /// entry of every other KPI.
    pub fn eval_context(&self, kpi_id: i64, entry_index: u32) -> Option<EvalContext> {
        let entry = self.entry(kpi_id, entry_index)?;
        let mut ctx = EvalContext::new();

        for field in &entry.fields {
            if field.field_type.is_numeric() {
                if let Some(n) = as_number(&field.value) {
                    ctx.insert_scalar(field.field_key.clone(), n);
                }
            } else if let Some(rows) = field.rows() {
                ctx.insert_items(field.field_key.clone(), rows);
            }
        }

        for other in self.kpis.iter().filter(|k| k.kpi_id != kpi_id) {
            let Some(first) = other.entries.first() else {
                continue;
            };
            for field in first.fields.iter().filter(|f| f.field_type.is_numeric()) {
                if let Some(n) = as_number(&field.value) {
                    ctx.insert_kpi_value(other.kpi_id, field.field_key.clone(), n);
                }
            }
        }

        Some(ctx)
    }
}

/// Text form of a JSON value as a template would print it.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
