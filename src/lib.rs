//! # kpi-report
//!
//! Compiles structured report blocks into Jinja2-compatible template source
//! for KPI reports, and provides the aggregate formula language those
//! templates evaluate.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │             Block list (JSON, editor session)            │
//! │   title, headings, text, KPI tables, simple tables ...   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [blocks::load_blocks]
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Vec<Block> (tagged enums)                │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [compile + codegen + markup]
//! ┌─────────────────────────────────────────────────────────┐
//! │                   Template source                        │
//! │  get_kpi_field_value(...) / evaluate_report_formula(...) │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! Formulas embedded in the source are parsed by [`formula`] and evaluated
//! by [`formula::eval`]. [`reconcile`] keeps the block list and a
//! hand-edited raw template from both being authoritative at once.

pub mod blocks;
pub mod codegen;
pub mod compile;
pub mod config;
pub mod dataset;
pub mod evaluate;
pub mod formula;
pub mod markup;
pub mod metadata;
pub mod reconcile;
pub mod validation;

pub use blocks::{load_blocks, Block, BlockId, BlockKind};
pub use compile::{compile, compile_with, CompileOptions, CompileOutput};
pub use formula::{parse_formula, Expr};
pub use reconcile::{apply_update, EditorSession, ReportTemplate, TemplateUpdate};
