//! Target markup: escaping, a chained writer, and the snippet builders.
//!
//! The target is HTML with Jinja-style `{% %}` directives and `{{ }}`
//! interpolations, rendered with autoescape on. The snippet builders emit
//! the same resolver calls the dry-run evaluator understands, see
//! [`crate::evaluate::SnippetRequest::to_markup`].

pub mod escape;
pub mod snippet;
pub mod writer;

pub use escape::{escape_html, escape_string_literal, quote, unescape_string_literal};
pub use snippet::{formula, grouped_aggregate, repeating_rows_table, scalar_value};
pub use writer::MarkupWriter;
