//! Lexer for the aggregate formula language.
//!
//! Converts formula text into a sequence of tokens with span information.
//! Function names and filter operators are recognized as keywords; every
//! other identifier is a field key.

use chumsky::prelude::*;

use super::ast::{AggregateFn, CompareOp};

/// A token in the formula language.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'src> {
    // ========================================================================
    // Function keywords
    // ========================================================================
    /// `SUM_ITEMS`, `AVG_ITEMS`, `COUNT_ITEMS`, `MIN_ITEMS`, `MAX_ITEMS`
    Aggregate(AggregateFn),
    /// `SUM_ITEMS_WHERE`, ..., `COUNT_ITEMS_WHERE`
    AggregateWhere(AggregateFn),
    /// `KPI_FIELD`
    KpiField,
    /// `ROUND`
    Round,

    // ========================================================================
    // Filter operator keywords
    // ========================================================================
    /// `op_eq`, `op_neq`, `op_gt`, `op_gte`, `op_lt`, `op_lte`
    Compare(CompareOp),

    // ========================================================================
    // Literals
    // ========================================================================
    /// A field key (not a keyword).
    Ident(&'src str),
    /// A string literal with escapes already resolved.
    StringLit(String),
    /// An unsigned number (integer or decimal).
    Number(&'src str),

    // ========================================================================
    // Symbols
    // ========================================================================
    LParen,
    RParen,
    Comma,
    Plus,
    Minus,
    Star,
    Slash,
}

impl<'src> std::fmt::Display for Token<'src> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Aggregate(func) => write!(f, "{}", func.name()),
            Token::AggregateWhere(func) => write!(f, "{}", func.where_name()),
            Token::KpiField => write!(f, "KPI_FIELD"),
            Token::Round => write!(f, "ROUND"),
            Token::Compare(op) => write!(f, "{}", op.token()),
            Token::Ident(s) => write!(f, "{}", s),
            Token::StringLit(s) => write!(f, "\"{}\"", s),
            Token::Number(s) => write!(f, "{}", s),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Comma => write!(f, ","),
            Token::Plus => write!(f, "+"),
            Token::Minus => write!(f, "-"),
            Token::Star => write!(f, "*"),
            Token::Slash => write!(f, "/"),
        }
    }
}

/// Map an identifier string to a keyword token or return Ident.
fn keyword_or_ident(s: &str) -> Token<'_> {
    if let Some((func, filtered)) = AggregateFn::from_name(s) {
        return if filtered {
            Token::AggregateWhere(func)
        } else {
            Token::Aggregate(func)
        };
    }
    if let Some(op) = CompareOp::from_token(s) {
        return Token::Compare(op);
    }
    match s {
        "KPI_FIELD" => Token::KpiField,
        "ROUND" => Token::Round,
        _ => Token::Ident(s),
    }
}

/// Whether an identifier is a function name or filter operator, and so
/// cannot be used as a field key.
pub fn is_keyword(s: &str) -> bool {
    !matches!(keyword_or_ident(s), Token::Ident(_))
}

/// Create the lexer for formula text.
pub fn lexer<'src>(
) -> impl Parser<'src, &'src str, Vec<(Token<'src>, SimpleSpan)>, extra::Err<Rich<'src, char>>> {
    // Identifiers: start with letter or underscore, followed by alphanumeric or underscore
    let ident = text::ident().map(keyword_or_ident);

    // String literals: "..." with \\ and \" escapes
    let escape = just('\\').ignore_then(one_of("\\\""));
    let string_lit = just('"')
        .ignore_then(none_of("\\\"").or(escape).repeated().collect::<String>())
        .then_ignore(just('"'))
        .map(Token::StringLit);

    let number = text::digits(10)
        .then(just('.').then(text::digits(10)).or_not())
        .to_slice()
        .map(Token::Number);

    let symbol = choice((
        just('(').to(Token::LParen),
        just(')').to(Token::RParen),
        just(',').to(Token::Comma),
        just('+').to(Token::Plus),
        just('-').to(Token::Minus),
        just('*').to(Token::Star),
        just('/').to(Token::Slash),
    ));

    let token = choice((ident, string_lit, number, symbol)).map_with(|tok, e| (tok, e.span()));

    token.padded().repeated().collect().padded().then_ignore(end())
}

/// Lex a source string into tokens.
///
/// Returns Ok with the token list on success, or Err with the lex errors.
pub fn lex(source: &str) -> Result<Vec<(Token<'_>, SimpleSpan)>, Vec<Rich<'_, char>>> {
    let (tokens, errs) = lexer().parse(source).into_output_errors();
    if errs.is_empty() {
        Ok(tokens.unwrap_or_default())
    } else {
        Err(errs)
    }
}
