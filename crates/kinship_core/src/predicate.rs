//! Storage-agnostic filter predicates.
//!
//! Builders only ever produce [`Predicate`] values; the storage layer compiles a
//! finished [`Selection`] into its own query form in one step.

use serde::{Deserialize, Serialize};

use crate::{AccountId, AttributeId, CandidateKind, EntityId, Value};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Capability {
    Reader,
    Editor,
}

/// An attribute the value was coerced for, paired with the coerced value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyAlternative {
    pub attribute_id: AttributeId,
    pub value: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyMatch {
    pub name: String,
    pub only_active: bool,
    pub alternatives: Vec<PropertyAlternative>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Atom {
    /// The owning project is not private.
    ProjectPublic,
    /// Entity status is at or above the published threshold.
    Published,
    /// The account holds the capability on the owning project.
    Grant {
        account: AccountId,
        capability: Capability,
    },
    /// Entity has not been merged into another one.
    NotMerged,
    ProjectSlug(String),
    /// At least one attached schema carries one of the names.
    SchemaIn(Vec<String>),
    SourceIs(EntityId),
    TargetIs(EntityId),
    /// Case-insensitive substring match against the active `name` property.
    NameContains(String),
    Property(PropertyMatch),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Atom(Atom),
}

impl Predicate {
    pub fn atom(atom: Atom) -> Self {
        Predicate::Atom(atom)
    }

    /// Conjunction with nested `And`s flattened and constants folded.
    pub fn and(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::True => {}
                Predicate::False => return Predicate::False,
                Predicate::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::True,
            1 => flat.remove(0),
            _ => Predicate::And(flat),
        }
    }

    /// Disjunction with nested `Or`s flattened and constants folded.
    pub fn or(parts: impl IntoIterator<Item = Predicate>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Predicate::False => {}
                Predicate::True => return Predicate::True,
                Predicate::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Predicate::False,
            1 => flat.remove(0),
            _ => Predicate::Or(flat),
        }
    }

    pub fn atoms(&self) -> Vec<&Atom> {
        let mut out = Vec::new();
        self.collect_atoms(&mut out);
        out
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a Atom>) {
        match self {
            Predicate::True | Predicate::False => {}
            Predicate::And(parts) | Predicate::Or(parts) => {
                for part in parts {
                    part.collect_atoms(out);
                }
            }
            Predicate::Atom(atom) => out.push(atom),
        }
    }
}

/// Filtered candidate set of one kind. Each `filter` call returns a new selection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub kind: CandidateKind,
    pub predicate: Predicate,
}

impl Selection {
    pub fn new(kind: CandidateKind) -> Self {
        Self {
            kind,
            predicate: Predicate::True,
        }
    }

    pub fn filter(&self, predicate: Predicate) -> Self {
        Self {
            kind: self.kind,
            predicate: Predicate::and([self.predicate.clone(), predicate]),
        }
    }

    pub fn is_empty_set(&self) -> bool {
        self.predicate == Predicate::False
    }
}
