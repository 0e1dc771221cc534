/// Recursive-descent parser from scanned lexemes to a [`Template`].

use thiserror::Error;
use tracing::debug;

use super::ast::{AggregateKind, AggregateTag, Group, Item, Node, Template};
use super::scanner::{Lexeme, LexemeKind, Scanner};
use crate::schema::tag::{ParticleTag, Selector, SimTag};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("could not completely parse format string, failed on \"{text}\" at offset {offset}")]
    Scan { text: String, offset: usize },
    #[error("the value token {token} at offset {offset} does not specify a valid {expected}")]
    UnknownTag {
        token: String,
        offset: usize,
        expected: &'static str,
    },
    #[error("the value token {token} at offset {offset} is not allowed here: {reason}")]
    InvalidTagContext {
        token: String,
        offset: usize,
        reason: &'static str,
    },
    #[error("cannot embed a list specifier inside another list specifier, failed on \"{text}\" at offset {offset}")]
    NestedGroup { text: String, offset: usize },
}

impl TemplateError {
    /// Byte offset of the offending text in the format string.
    pub fn offset(&self) -> usize {
        match self {
            Self::Scan { offset, .. }
            | Self::UnknownTag { offset, .. }
            | Self::InvalidTagContext { offset, .. }
            | Self::NestedGroup { offset, .. } => *offset,
        }
    }
}

/// A value token resolved through the vocabulary tables, before its
/// placement in the tree is checked.
enum Decoded {
    Simulation(SimTag),
    Particle(ParticleTag),
    Aggregate(AggregateTag),
}

impl Template {
    /// Parse a format string.
    ///
    /// Syntax:
    /// - runs of `, ; : / \`, space and tab → `Literal`
    /// - `#s<code>` → simulation value
    /// - `#a<code>` / `#d<code>` → average / standard deviation over particles
    /// - `{...}` → group, repeated per particle; may hold `#p<code>` tokens
    ///
    /// Anything else fails the whole parse.
    pub fn parse(input: &str) -> Result<Template, TemplateError> {
        let mut nodes = Vec::new();

        for lexeme in Scanner::new(input) {
            let lexeme = lexeme?;
            let node = match lexeme.kind {
                LexemeKind::Punctuation => Node::Literal(lexeme.text.to_string()),
                LexemeKind::Value { selector, code } => {
                    match decode(&lexeme, selector, code)? {
                        Decoded::Simulation(tag) => Node::Simulation(tag),
                        Decoded::Aggregate(agg) => Node::Aggregate(agg),
                        Decoded::Particle(_) => {
                            return Err(invalid_context(
                                &lexeme,
                                "particle values can only be used inside of list specifiers",
                            ))
                        }
                    }
                }
                LexemeKind::List { inner } => {
                    let last = lexeme.span.end == input.len();
                    Node::Group(parse_group(inner, lexeme.span.start + 1, last)?)
                }
            };
            nodes.push(node);
        }

        debug!("parsed format {:?} into {} nodes", input, nodes.len());
        Ok(Template { nodes })
    }
}

fn parse_group(inner: &str, base: usize, last: bool) -> Result<Group, TemplateError> {
    let mut items = Vec::new();

    for lexeme in Scanner::list_interior(inner, base) {
        let lexeme = lexeme?;
        let item = match lexeme.kind {
            LexemeKind::Punctuation => Item::Literal(lexeme.text.to_string()),
            LexemeKind::Value { selector, code } => match decode(&lexeme, selector, code)? {
                Decoded::Simulation(tag) => Item::Simulation(tag),
                Decoded::Particle(tag) => Item::Particle(tag),
                Decoded::Aggregate(agg) => Item::Aggregate(agg),
            },
            // `list_interior` reports a `{` itself, so this arm only keeps the
            // match total.
            LexemeKind::List { .. } => {
                return Err(TemplateError::NestedGroup {
                    text: lexeme.text.to_string(),
                    offset: lexeme.span.start,
                })
            }
        };
        items.push(item);
    }

    Ok(Group {
        items,
        elide_trailing_separator: last,
    })
}

fn decode(lexeme: &Lexeme<'_>, selector: char, code: &str) -> Result<Decoded, TemplateError> {
    let unknown = |expected: &'static str| TemplateError::UnknownTag {
        token: lexeme.text.to_string(),
        offset: lexeme.span.start,
        expected,
    };

    let selector = Selector::from_code(selector).ok_or_else(|| unknown("group identifier"))?;
    match selector {
        Selector::Simulation => SimTag::from_code(code)
            .map(Decoded::Simulation)
            .ok_or_else(|| unknown("simulation value")),
        Selector::Particle => ParticleTag::from_code(code)
            .map(Decoded::Particle)
            .ok_or_else(|| unknown("particle value")),
        Selector::Average | Selector::StdDev => {
            let tag = ParticleTag::from_code(code).ok_or_else(|| unknown("particle value"))?;
            let kind = if selector == Selector::Average {
                AggregateKind::Average
            } else {
                AggregateKind::StdDev
            };
            AggregateTag::new(kind, tag)
                .map(Decoded::Aggregate)
                .ok_or_else(|| match tag {
                    ParticleTag::Name => {
                        invalid_context(lexeme, "cannot request global particle names")
                    }
                    _ => invalid_context(lexeme, "cannot request global particle hashes"),
                })
        }
    }
}

fn invalid_context(lexeme: &Lexeme<'_>, reason: &'static str) -> TemplateError {
    TemplateError::InvalidTagContext {
        token: lexeme.text.to_string(),
        offset: lexeme.span.start,
        reason,
    }
}
