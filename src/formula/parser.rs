//! Parser for the aggregate formula language using chumsky.
//!
//! Transforms the token stream from the lexer into an [`Expr`]. Precedence
//! follows ordinary arithmetic: `*` and `/` bind tighter than `+` and `-`,
//! both left-associative, with unary minus binding tightest.

use chumsky::input::ValueInput;
use chumsky::prelude::*;

use super::ast::*;
use super::lexer::Token;

/// Create the formula parser.
///
/// The parser is generic over the input type, accepting any `ValueInput`
/// that produces `Token` values with `SimpleSpan` spans.
pub fn parser<'tokens, 'src: 'tokens, I>(
) -> impl Parser<'tokens, I, Expr, extra::Err<Rich<'tokens, Token<'src>, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token<'src>, Span = SimpleSpan>,
{
    // ==========================================================================
    // Basic token parsers
    // ==========================================================================

    let ident = select! {
        Token::Ident(s) => s.to_string(),
    }
    .labelled("field key");

    let string_lit = select! {
        Token::StringLit(s) => s,
    }
    .labelled("string literal");

    let number = select! {
        Token::Number(s) => s,
    }
    .map(|s: &str| s.parse::<f64>().unwrap_or_default())
    .labelled("number");

    let integer = select! {
        Token::Number(s) => s,
    }
    .try_map(|s: &str, span| {
        s.parse::<i64>()
            .map_err(|_| Rich::custom(span, format!("expected an integer, found '{}'", s)))
    })
    .labelled("integer");

    let compare_op = select! {
        Token::Compare(op) => op,
    }
    .labelled("filter operator (op_eq, op_neq, op_gt, op_gte, op_lt, op_lte)");

    let comma = just(Token::Comma);

    // A filter value: signed number, quoted string, or bare word (read as text)
    let filter_value = choice((
        just(Token::Minus)
            .or_not()
            .then(number.clone())
            .map(|(neg, n)| FilterValue::Number(if neg.is_some() { -n } else { n })),
        string_lit.clone().map(FilterValue::Text),
        ident.clone().map(FilterValue::Text),
    ))
    .labelled("filter value");

    recursive(|expr| {
        // ======================================================================
        // Aggregates: FN(field, sub) / COUNT_ITEMS(field)
        // ======================================================================

        let aggregate = select! {
            Token::Aggregate(func) => func,
        }
        .then_ignore(just(Token::LParen))
        .then(ident.clone())
        .then(comma.clone().ignore_then(ident.clone()).or_not())
        .then_ignore(just(Token::RParen))
        .try_map(|((func, field_key), sub_field_key), span| {
            match (func.takes_sub_field(), sub_field_key) {
                (true, None) => Err(Rich::custom(
                    span,
                    format!("{} requires a sub-field argument", func.name()),
                )),
                (false, Some(_)) => Err(Rich::custom(
                    span,
                    format!("{} takes only the field argument", func.name()),
                )),
                (_, sub) => Ok(Expr::Aggregate(Aggregate::new(func, field_key, sub))),
            }
        });

        // ======================================================================
        // Filtered aggregates:
        //   FN_WHERE(field, sub, filter_sub, op, value)
        //   COUNT_ITEMS_WHERE(field, filter_sub, op, value)
        // ======================================================================

        let aggregate_where = select! {
            Token::AggregateWhere(func) => func,
        }
        .then_ignore(just(Token::LParen))
        .then(
            ident
                .clone()
                .separated_by(comma.clone())
                .at_least(1)
                .collect::<Vec<_>>(),
        )
        .then_ignore(comma.clone())
        .then(compare_op)
        .then_ignore(comma.clone())
        .then(filter_value.clone())
        .then_ignore(just(Token::RParen))
        .try_map(|(((func, keys), op), value), span| {
            let expected = if func.takes_sub_field() { 3 } else { 2 };
            if keys.len() != expected {
                let shape = if func.takes_sub_field() {
                    "(field, sub_field, filter_sub_field, op, value)"
                } else {
                    "(field, filter_sub_field, op, value)"
                };
                return Err(Rich::custom(
                    span,
                    format!("{} expects {}", func.where_name(), shape),
                ));
            }
            let mut keys = keys.into_iter();
            let field_key = keys.next().unwrap_or_default();
            let sub_field_key = if func.takes_sub_field() { keys.next() } else { None };
            let filter_key = keys.next().unwrap_or_default();
            Ok(Expr::Aggregate(Aggregate {
                func,
                field_key,
                sub_field_key,
                filter: Some(Filter {
                    sub_field_key: filter_key,
                    op,
                    value,
                }),
            }))
        });

        // ======================================================================
        // KPI_FIELD(kpi_id, "field_key")
        // ======================================================================

        let kpi_field = just(Token::KpiField)
            .ignore_then(just(Token::LParen))
            .ignore_then(integer.clone())
            .then_ignore(comma.clone())
            .then(string_lit.clone())
            .then_ignore(just(Token::RParen))
            .map(|(kpi_id, field_key)| Expr::KpiField { kpi_id, field_key });

        // ======================================================================
        // ROUND(expr, digits)
        // ======================================================================

        let round = just(Token::Round)
            .ignore_then(just(Token::LParen))
            .ignore_then(expr.clone())
            .then_ignore(comma.clone())
            .then(integer.clone())
            .then_ignore(just(Token::RParen))
            .try_map(|(inner, digits), span| {
                u32::try_from(digits)
                    .map(|digits| Expr::Round {
                        expr: Box::new(inner),
                        digits,
                    })
                    .map_err(|_| Rich::custom(span, "ROUND digits must be non-negative"))
            });

        // ======================================================================
        // Terms and operators
        // ======================================================================

        let atom = choice((
            aggregate,
            aggregate_where,
            kpi_field,
            round,
            number.map(Expr::Number),
            ident.clone().map(Expr::Field),
            expr.clone()
                .delimited_by(just(Token::LParen), just(Token::RParen))
                .map(Expr::group),
        ))
        .labelled("term");

        let unary = just(Token::Minus)
            .repeated()
            .collect::<Vec<_>>()
            .then(atom)
            .map(|(negs, e)| negs.into_iter().fold(e, |e, _| Expr::Neg(Box::new(e))));

        let product_op = select! {
            Token::Star => BinaryOp::Mul,
            Token::Slash => BinaryOp::Div,
        };

        let product = unary
            .clone()
            .then(product_op.then(unary).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| {
                rest.into_iter()
                    .fold(first, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            });

        let sum_op = select! {
            Token::Plus => BinaryOp::Add,
            Token::Minus => BinaryOp::Sub,
        };

        product
            .clone()
            .then(sum_op.then(product).repeated().collect::<Vec<_>>())
            .map(|(first, rest)| {
                rest.into_iter()
                    .fold(first, |lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            })
    })
    .then_ignore(end())
}
