//! The aggregate formula language.
//!
//! Formulas compute a scalar from the fields of one KPI entry:
//!
//! - **Arithmetic**: `+`, `-`, `*`, `/`, parentheses and numeric literals
//! - **Scalar fields**: a bare field key such as `total_budget`
//! - **Aggregates** over a repeating (multi-line items) field:
//!   `SUM_ITEMS(rows, amount)`, `AVG_ITEMS`, `MIN_ITEMS`, `MAX_ITEMS`,
//!   and `COUNT_ITEMS(rows)`
//! - **Filtered aggregates**: `SUM_ITEMS_WHERE(rows, amount, grade, op_gte, 60)`,
//!   `COUNT_ITEMS_WHERE(rows, grade, op_eq, "A")`
//! - **Cross-KPI lookups**: `KPI_FIELD(12, "budget")`
//! - **Rounding**: `ROUND(expr, 2)`
//!
//! # Example
//!
//! ```
//! use kpi_report::formula;
//!
//! let result = formula::parse("a + SUM_ITEMS(rows, val)");
//! assert!(result.is_ok());
//! let expr = result.expr.unwrap();
//! assert_eq!(expr.to_string(), "a + SUM_ITEMS(rows, val)");
//! ```

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::*;

/// Byte range into the formula text.
pub type Span = std::ops::Range<usize>;

/// Errors surfaced by [`parse_formula`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("Formula is empty")]
    Empty,

    #[error("Formula syntax error: {0}")]
    Syntax(String),
}

/// Result of parsing formula text.
#[derive(Debug)]
pub struct ParseResult {
    /// The parsed expression, if parsing succeeded.
    pub expr: Option<Expr>,
    /// Diagnostic messages (errors and warnings).
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    /// Returns true if parsing succeeded without errors.
    pub fn is_ok(&self) -> bool {
        self.expr.is_some() && !self.has_errors()
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Returns only the error diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }
}

/// A diagnostic message with source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// The span in the formula text where the diagnostic applies.
    pub span: Span,
    /// The severity level.
    pub severity: Severity,
    /// The diagnostic message.
    pub message: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Error,
            message: message.into(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} (at {:?})", level, self.message, self.span)
    }
}

impl std::error::Error for Diagnostic {}

/// Parse formula text.
///
/// Returns a `ParseResult` containing the expression (if successful) and
/// any diagnostics. Blank input yields no expression and one error.
pub fn parse(source: &str) -> ParseResult {
    use chumsky::error::Rich;
    use chumsky::input::Input;
    use chumsky::span::SimpleSpan;
    use chumsky::span::Span as _;
    use chumsky::Parser as _;

    if source.trim().is_empty() {
        return ParseResult {
            expr: None,
            diagnostics: vec![Diagnostic::error(0..source.len(), "formula is empty")],
        };
    }

    // Step 1: Lexical analysis
    let (tokens, lex_errs) = lexer::lexer().parse(source).into_output_errors();

    let mut diagnostics: Vec<Diagnostic> = lex_errs
        .into_iter()
        .map(|e: Rich<'_, char>| {
            let span = e.span();
            Diagnostic::error(span.start()..span.end(), e.to_string())
        })
        .collect();

    let tokens: Vec<(lexer::Token<'_>, SimpleSpan)> = match tokens {
        Some(t) if diagnostics.is_empty() => t,
        _ => {
            return ParseResult {
                expr: None,
                diagnostics,
            };
        }
    };

    // Step 2: Parsing
    let len = source.len();
    let eoi: SimpleSpan = (len..len).into();
    let token_stream = tokens.as_slice().map(
        eoi,
        |(tok, span): &(lexer::Token<'_>, SimpleSpan)| (tok, span),
    );

    let (expr, parse_errs) = parser::parser().parse(token_stream).into_output_errors();

    diagnostics.extend(
        parse_errs
            .into_iter()
            .map(|e: Rich<'_, lexer::Token<'_>, SimpleSpan>| {
                let span = e.span();
                Diagnostic::error(span.start()..span.end(), e.to_string())
            }),
    );

    if expr.is_some() {
        diagnostics.extend(bare_filter_values(&tokens));
    }

    ParseResult { expr, diagnostics }
}

/// Warn about unquoted words used as filter values. They are compared as
/// text, which is easy to mistake for a field reference.
fn bare_filter_values(
    tokens: &[(lexer::Token<'_>, chumsky::span::SimpleSpan)],
) -> Vec<Diagnostic> {
    use lexer::Token;

    tokens
        .windows(3)
        .filter_map(|window| match window {
            [(Token::Compare(_), _), (Token::Comma, _), (Token::Ident(word), span)] => {
                Some(Diagnostic::warning(
                    span.start..span.end,
                    format!("filter value {} is compared as text \"{}\"", word, word),
                ))
            }
            _ => None,
        })
        .collect()
}

/// Parse formula text, collapsing diagnostics into a single error.
pub fn parse_formula(source: &str) -> Result<Expr, FormulaError> {
    if source.trim().is_empty() {
        return Err(FormulaError::Empty);
    }
    let result = parse(source);
    match result.expr {
        Some(expr) if !result.has_errors() => Ok(expr),
        _ => Err(FormulaError::Syntax(
            result
                .errors()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        )),
    }
}

/// Parse and re-serialize formula text into its canonical form.
pub fn canonicalize(source: &str) -> Result<String, FormulaError> {
    parse_formula(source).map(|expr| expr.to_string())
}
