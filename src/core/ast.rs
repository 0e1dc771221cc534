/// Template syntax tree.
///
/// The shape of the types carries the grammar's invariants: group
/// children have no group variant, particle-scope tags only exist as
/// group children, and an [`AggregateTag`] can only be built from a tag
/// with an aggregate meaning.

use serde::Serialize;
use std::fmt;

use crate::schema::tag::{ParticleTag, Selector, SimTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggregateKind {
    Average,
    /// Population standard deviation.
    StdDev,
}

/// A reduction of a particle tag over every particle in the snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AggregateTag {
    kind: AggregateKind,
    tag: ParticleTag,
}

impl AggregateTag {
    /// `None` for tags that identify a particle rather than measure it.
    pub fn new(kind: AggregateKind, tag: ParticleTag) -> Option<Self> {
        tag.is_aggregable().then_some(Self { kind, tag })
    }

    pub fn kind(&self) -> AggregateKind {
        self.kind
    }

    pub fn tag(&self) -> ParticleTag {
        self.tag
    }
}

/// A top-level template node.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Node {
    /// Punctuation, emitted verbatim.
    Literal(String),
    Simulation(SimTag),
    Aggregate(AggregateTag),
    Group(Group),
}

/// A node inside a list block, expanded once per particle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Item {
    Literal(String),
    Simulation(SimTag),
    /// Resolved against the particle bound by the enclosing group.
    Particle(ParticleTag),
    Aggregate(AggregateTag),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub items: Vec<Item>,
    /// Drop the trailing literal from the last particle's expansion.
    /// Only set when the group ends the template.
    pub elide_trailing_separator: bool,
}

impl Group {
    /// The text to strip from the final expansion, if any.
    pub fn trailing_separator(&self) -> Option<&str> {
        if !self.elide_trailing_separator {
            return None;
        }
        match self.items.last() {
            Some(Item::Literal(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}

/// A parsed format string.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Template {
    pub nodes: Vec<Node>,
}

impl Template {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl AggregateKind {
    pub fn selector(&self) -> Selector {
        match self {
            Self::Average => Selector::Average,
            Self::StdDev => Selector::StdDev,
        }
    }
}

impl fmt::Display for AggregateTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}{}", self.kind.selector().code(), self.tag.code())
    }
}

fn write_sim(f: &mut fmt::Formatter<'_>, tag: SimTag) -> fmt::Result {
    write!(f, "#{}{}", Selector::Simulation.code(), tag.code())
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Literal(text) => f.write_str(text),
            Item::Simulation(tag) => write_sim(f, *tag),
            Item::Particle(tag) => write!(f, "#{}{}", Selector::Particle.code(), tag.code()),
            Item::Aggregate(agg) => fmt::Display::fmt(agg, f),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Literal(text) => f.write_str(text),
            Node::Simulation(tag) => write_sim(f, *tag),
            Node::Aggregate(agg) => fmt::Display::fmt(agg, f),
            Node::Group(group) => {
                f.write_str("{")?;
                for item in &group.items {
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

/// Writes the format string the template was parsed from.
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}
