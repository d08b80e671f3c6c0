//! Resolved option lists from the metadata service.
//!
//! The editor fetches the KPIs, fields, sub-fields and domains available
//! to a report and hands them over as a [`Catalog`]. Nothing in this crate
//! fetches them; the catalog is only read, by [`crate::validation`] and
//! the `check` command.

use serde::{Deserialize, Serialize};

/// Data type of a KPI field or sub-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    SingleLineText,
    MultiLineText,
    Number,
    Date,
    Boolean,
    /// Repeating rows keyed by sub-field.
    MultiLineItems,
    Formula,
}

impl FieldType {
    pub fn is_repeating(&self) -> bool {
        matches!(self, FieldType::MultiLineItems)
    }

    /// Fields a formula can read as a number.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Number | FieldType::Formula)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubFieldOption {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub field_type: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOption {
    pub key: String,
    #[serde(default)]
    pub name: String,
    pub field_type: FieldType,
    /// Column definitions of a repeating field.
    #[serde(default)]
    pub sub_fields: Vec<SubFieldOption>,
}

impl FieldOption {
    pub fn sub_field(&self, key: &str) -> Option<&SubFieldOption> {
        self.sub_fields.iter().find(|s| s.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiOption {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldOption>,
}

impl KpiOption {
    pub fn field(&self, key: &str) -> Option<&FieldOption> {
        self.fields.iter().find(|f| f.key == key)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub kpi_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainOption {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<CategoryOption>,
}

/// Everything a report's blocks may reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub kpis: Vec<KpiOption>,
    #[serde(default)]
    pub domains: Vec<DomainOption>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn kpi(&self, id: i64) -> Option<&KpiOption> {
        self.kpis.iter().find(|k| k.id == id)
    }

    pub fn field(&self, kpi_id: i64, key: &str) -> Option<&FieldOption> {
        self.kpi(kpi_id).and_then(|k| k.field(key))
    }

    pub fn domain(&self, id: i64) -> Option<&DomainOption> {
        self.domains.iter().find(|d| d.id == id)
    }

    /// Whether any KPI in the catalog has a field with this key.
    pub fn has_field_key(&self, key: &str) -> bool {
        self.kpis.iter().any(|k| k.field(key).is_some())
    }
}
