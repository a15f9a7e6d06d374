//! Parser for the list and tuple literal syntax used by ranked event lists,
//! e.g. `[(0.98, 12, 40), (0.41, 55, 61)]`.

use crate::utils::Result;
use pest::iterators::Pair;
use pest::Parser;

#[derive(pest_derive::Parser)]
#[grammar = "utils/literal.pest"]
struct LiteralParser;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
    Bool(bool),
    None,
    Seq(Vec<Literal>),
}

impl Literal {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Literal]> {
        match self {
            Literal::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Render a scalar as a barcode label. Integral numbers lose their
    /// fractional part so that `3` and `'3'` name the same barcode.
    pub fn as_label(&self) -> Option<String> {
        match self {
            Literal::Str(s) => Some(s.clone()),
            Literal::Number(v) if v.fract() == 0.0 => Some(format!("{}", *v as i64)),
            Literal::Number(v) => Some(v.to_string()),
            _ => None,
        }
    }
}

pub fn parse_literal(input: &str) -> Result<Literal> {
    let mut pairs = LiteralParser::parse(Rule::document, input.trim())
        .map_err(|e| format!("Invalid literal `{}`: {}", input.trim(), e))?;
    let pair = pairs
        .next()
        .ok_or_else(|| format!("Empty literal: `{}`", input))?;
    build(pair)
}

fn build(pair: Pair<Rule>) -> Result<Literal> {
    match pair.as_rule() {
        Rule::list | Rule::tuple => Ok(Literal::Seq(
            pair.into_inner().map(build).collect::<Result<Vec<_>>>()?,
        )),
        Rule::string => {
            let inner = pair
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(Literal::Str(inner))
        }
        Rule::number => {
            let text = pair.as_str().trim_end_matches('L');
            text.parse::<f64>()
                .map(Literal::Number)
                .map_err(|e| format!("Invalid number `{}`: {}", text, e))
        }
        Rule::none => Ok(Literal::None),
        Rule::boolean => Ok(Literal::Bool(pair.as_str() == "True")),
        rule => Err(format!("Unexpected token {:?} in literal", rule)),
    }
}
