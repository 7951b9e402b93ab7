//! Type-string parser.
//!
//! ## Grammar
//!
//! ```text
//! <type>       := <wildcard> | <named> <dims>
//! <wildcard>   := "?" [("extends" | "super") <type>]
//! <named>      := ident ("." ident)* ["<" <type> ("," <type>)* ">"]
//! <dims>       := "[]"*
//! <param-type> := <type> ["..."]
//! <type-param> := ident ["extends" <type> ("&" <type>)*]
//! ```

use winnow::ascii::{multispace0, multispace1};
use winnow::combinator::{alt, delimited, opt, preceded, repeat, separated};
use winnow::prelude::*;
use winnow::token::take_while;
use winnow::ModalResult;

use super::{TypeParameter, TypeReference, WildcardBound};
use crate::error::ApiError;

/// Parse a type reference such as `java.util.Map<K, java.util.List<V>>[]`.
pub fn parse_type_reference(input: &str) -> Result<TypeReference, ApiError> {
    run(input, |i: &mut &str| {
        let t = parse_type(i)?;
        let _ = multispace0.parse_next(i)?;
        Ok(t)
    })
}

/// Parse a parameter type, returning the type and whether it is a vararg (`T...`).
///
/// The vararg marker is kept separately; the returned reference carries no
/// extra dimension for it.
pub fn parse_parameter_type(input: &str) -> Result<(TypeReference, bool), ApiError> {
    run(input, |i: &mut &str| {
        let t = parse_type(i)?;
        let varargs = opt((multispace0, "...")).parse_next(i)?.is_some();
        let _ = multispace0.parse_next(i)?;
        Ok((t, varargs))
    })
}

/// Parse a type parameter declaration such as `T extends Number & Comparable<T>`.
pub fn parse_type_parameter(input: &str) -> Result<TypeParameter, ApiError> {
    run(input, |i: &mut &str| {
        let t = parse_type_param(i)?;
        let _ = multispace0.parse_next(i)?;
        Ok(t)
    })
}

fn run<O>(
    input: &str,
    mut parser: impl FnMut(&mut &str) -> ModalResult<O>,
) -> Result<O, ApiError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ApiError::InvalidTypeSyntax {
            input: input.to_string(),
            message: "empty type".to_string(),
        });
    }
    parser
        .parse(trimmed)
        .map_err(|e| ApiError::InvalidTypeSyntax {
            input: input.to_string(),
            message: format!("unexpected input at offset {}", e.offset()),
        })
}

// ============================================================================
// Parser implementation using winnow
// ============================================================================

fn parse_type(input: &mut &str) -> ModalResult<TypeReference> {
    let _ = multispace0.parse_next(input)?;
    alt((parse_wildcard, parse_named_with_dims)).parse_next(input)
}

fn parse_wildcard(input: &mut &str) -> ModalResult<TypeReference> {
    let _ = '?'.parse_next(input)?;
    let bound = opt(alt((
        preceded((multispace1, "extends", multispace1), parse_type)
            .map(|t| WildcardBound::Extends(Box::new(t))),
        preceded((multispace1, "super", multispace1), parse_type)
            .map(|t| WildcardBound::Super(Box::new(t))),
    )))
    .parse_next(input)?;
    Ok(TypeReference::wildcard(bound))
}

fn parse_named_with_dims(input: &mut &str) -> ModalResult<TypeReference> {
    let name = parse_qualified_name(input)?;
    let args: Option<Vec<TypeReference>> = opt(delimited(
        (multispace0, '<'),
        separated(1.., parse_type, (multispace0, ',')),
        (multispace0, '>'),
    ))
    .parse_next(input)?;
    let dims: Vec<()> = repeat(0.., (multispace0, '[', multispace0, ']').void()).parse_next(input)?;
    Ok(TypeReference {
        name,
        args: args.unwrap_or_default(),
        dimensions: u8::try_from(dims.len()).unwrap_or(u8::MAX),
        bound: None,
    })
}

fn parse_qualified_name(input: &mut &str) -> ModalResult<String> {
    let first = parse_identifier(input)?;
    let rest: Vec<&str> = repeat(0.., preceded('.', parse_identifier)).parse_next(input)?;
    let mut name = first.to_string();
    for part in rest {
        name.push('.');
        name.push_str(part);
    }
    Ok(name)
}

fn parse_identifier<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    take_while(1.., |c: char| c.is_alphanumeric() || c == '_' || c == '$')
        .verify(|s: &str| !s.starts_with(|c: char| c.is_ascii_digit()))
        .parse_next(input)
}

fn parse_type_param(input: &mut &str) -> ModalResult<TypeParameter> {
    let name = parse_identifier(input)?;
    let bounds: Option<Vec<TypeReference>> = opt(preceded(
        (multispace1, "extends", multispace1),
        separated(1.., parse_type, (multispace0, '&')),
    ))
    .parse_next(input)?;
    Ok(TypeParameter {
        name: name.to_string(),
        bounds: bounds.unwrap_or_default(),
    })
}
