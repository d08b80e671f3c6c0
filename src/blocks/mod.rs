//! The report block model.
//!
//! A report body is an ordered list of [`Block`]s. Each block has a stable
//! [`BlockId`] and a [`BlockKind`] discriminated by the JSON `type` tag:
//!
//! ```json
//! [
//!   { "id": "b1", "type": "title", "useTemplateName": true },
//!   { "id": "b2", "type": "kpi_table", "kpiIds": [3], "fieldKeys": [], "oneTablePerKpi": true },
//!   { "id": "b3", "type": "single_value", "kpiId": 7, "fieldKey": "total_budget", "entryIndex": 0 }
//! ]
//! ```
//!
//! Id lists are never `null` once loaded. An empty list means "all".

pub mod cell;
pub(crate) mod de;

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub use cell::{Cell, FormulaCell, KpiCell, TableRow, TextCell};

/// Opaque, stable block identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(String);

impl BlockId {
    /// A fresh random (v4 UUID) id.
    pub fn generate() -> Self {
        BlockId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BlockId {
    fn from(s: &str) -> Self {
        BlockId(s.to_string())
    }
}

impl From<String> for BlockId {
    fn from(s: String) -> Self {
        BlockId(s)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One typed unit of report content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default = "BlockId::generate")]
    pub id: BlockId,
    #[serde(flatten)]
    pub kind: BlockKind,
}

impl Block {
    /// A new block with a freshly generated id.
    pub fn new(kind: BlockKind) -> Self {
        Self {
            id: BlockId::generate(),
            kind,
        }
    }

    pub fn with_id(id: impl Into<BlockId>, kind: BlockKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// Block variants, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockKind {
    Title(TitleBlock),
    SectionHeading(HeadingBlock),
    Spacer(SpacerBlock),
    Text(TextBlock),
    DomainList(DomainBlock),
    DomainCategories(DomainBlock),
    DomainKpis(DomainBlock),
    KpiTable(KpiTableBlock),
    KpiGrid(KpiBlock),
    KpiList(KpiBlock),
    SimpleTable(SimpleTableBlock),
    SingleValue(SingleValueBlock),
    /// Unknown or blank `type`. Skipped by the compiler.
    #[serde(other)]
    Unsupported,
}

impl BlockKind {
    pub const TYPE_NAMES: [&'static str; 12] = [
        "title",
        "section_heading",
        "spacer",
        "text",
        "domain_list",
        "domain_categories",
        "domain_kpis",
        "kpi_table",
        "kpi_grid",
        "kpi_list",
        "simple_table",
        "single_value",
    ];

    pub fn type_name(&self) -> &'static str {
        match self {
            BlockKind::Title(_) => "title",
            BlockKind::SectionHeading(_) => "section_heading",
            BlockKind::Spacer(_) => "spacer",
            BlockKind::Text(_) => "text",
            BlockKind::DomainList(_) => "domain_list",
            BlockKind::DomainCategories(_) => "domain_categories",
            BlockKind::DomainKpis(_) => "domain_kpis",
            BlockKind::KpiTable(_) => "kpi_table",
            BlockKind::KpiGrid(_) => "kpi_grid",
            BlockKind::KpiList(_) => "kpi_list",
            BlockKind::SimpleTable(_) => "simple_table",
            BlockKind::SingleValue(_) => "single_value",
            BlockKind::Unsupported => "unsupported",
        }
    }

    /// The configuration a freshly added block of this type starts with.
    pub fn default_for(type_name: &str) -> Option<BlockKind> {
        let kind = match type_name {
            "title" => BlockKind::Title(TitleBlock::default()),
            "section_heading" => BlockKind::SectionHeading(HeadingBlock::default()),
            "spacer" => BlockKind::Spacer(SpacerBlock::default()),
            "text" => BlockKind::Text(TextBlock::default()),
            "domain_list" => BlockKind::DomainList(DomainBlock::default()),
            "domain_categories" => BlockKind::DomainCategories(DomainBlock::default()),
            "domain_kpis" => BlockKind::DomainKpis(DomainBlock::default()),
            "kpi_table" => BlockKind::KpiTable(KpiTableBlock::default()),
            "kpi_grid" => BlockKind::KpiGrid(KpiBlock::default()),
            "kpi_list" => BlockKind::KpiList(KpiBlock::default()),
            "simple_table" => BlockKind::SimpleTable(SimpleTableBlock::default()),
            "single_value" => BlockKind::SingleValue(SingleValueBlock::default()),
            _ => return None,
        };
        Some(kind)
    }
}

// ============================================================================
// Variant configuration
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TitleBlock {
    #[serde(deserialize_with = "de::null_as_default")]
    pub use_template_name: bool,
    #[serde(deserialize_with = "de::blank_as_none", skip_serializing_if = "Option::is_none")]
    pub custom_text: Option<String>,
}

impl Default for TitleBlock {
    fn default() -> Self {
        Self {
            use_template_name: true,
            custom_text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadingBlock {
    #[serde(deserialize_with = "de::null_as_default")]
    pub text: String,
    /// Clamped to `1..=4` at compile time.
    #[serde(deserialize_with = "de::null_as_default")]
    pub level: i64,
}

impl Default for HeadingBlock {
    fn default() -> Self {
        Self {
            text: String::new(),
            level: 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacerBlock {
    pub size: SpacerSize,
}

/// Vertical gap of a spacer block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SpacerSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl SpacerSize {
    /// Unknown names fall back to medium.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "small" => SpacerSize::Small,
            "large" => SpacerSize::Large,
            _ => SpacerSize::Medium,
        }
    }

    pub fn height_px(&self) -> u32 {
        match self {
            SpacerSize::Small => 16,
            SpacerSize::Medium => 24,
            SpacerSize::Large => 40,
        }
    }
}

impl<'de> Deserialize<'de> for SpacerSize {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = Option::<String>::deserialize(deserializer)?;
        Ok(name.as_deref().map(SpacerSize::parse).unwrap_or_default())
    }
}

/// Free-form text. The content may embed snippets and is emitted verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextBlock {
    #[serde(deserialize_with = "de::null_as_default")]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DomainBlock {
    /// Empty means all domains.
    #[serde(deserialize_with = "de::null_as_default")]
    pub domain_ids: Vec<i64>,
}

/// KPI selection shared by `kpi_grid` and `kpi_list`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KpiBlock {
    /// Empty means all KPIs.
    #[serde(deserialize_with = "de::null_as_default")]
    pub kpi_ids: Vec<i64>,
    /// Empty means all fields.
    #[serde(deserialize_with = "de::null_as_default")]
    pub field_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct KpiTableBlock {
    #[serde(deserialize_with = "de::null_as_default")]
    pub kpi_ids: Vec<i64>,
    #[serde(deserialize_with = "de::null_as_default")]
    pub field_keys: Vec<String>,
    #[serde(deserialize_with = "de::null_as_default")]
    pub one_table_per_kpi: bool,
}

impl Default for KpiTableBlock {
    fn default() -> Self {
        Self {
            kpi_ids: Vec::new(),
            field_keys: Vec::new(),
            one_table_per_kpi: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimpleTableBlock {
    #[serde(deserialize_with = "de::null_as_default")]
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SingleValueBlock {
    pub kpi_id: Option<i64>,
    #[serde(deserialize_with = "de::null_as_default")]
    pub field_key: String,
    #[serde(deserialize_with = "de::blank_as_none", skip_serializing_if = "Option::is_none")]
    pub sub_field_key: Option<String>,
    #[serde(deserialize_with = "de::entry_index")]
    pub entry_index: u32,
}

// ============================================================================
// Loading
// ============================================================================

/// Errors loading a stored block list.
#[derive(Debug, Error)]
pub enum BlockLoadError {
    #[error("Invalid block list JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Block list must be a JSON array, found {0}")]
    NotAList(&'static str),
}

/// Load a stored block list from JSON text.
///
/// `null` loads as an empty list. Elements that are not valid blocks are
/// dropped with a warning so one bad element does not lose the report.
pub fn load_blocks(json: &str) -> Result<Vec<Block>, BlockLoadError> {
    let value: Value = serde_json::from_str(json)?;
    load_blocks_value(value)
}

/// Load a stored block list from a parsed JSON value.
pub fn load_blocks_value(value: Value) -> Result<Vec<Block>, BlockLoadError> {
    let items = match value {
        Value::Null => return Ok(Vec::new()),
        Value::Array(items) => items,
        other => return Err(BlockLoadError::NotAList(json_kind(&other))),
    };

    let mut blocks = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<Block>(item) {
            Ok(block) => blocks.push(block),
            Err(e) => log::warn!("dropping block #{} from stored list: {}", index, e),
        }
    }
    Ok(blocks)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
