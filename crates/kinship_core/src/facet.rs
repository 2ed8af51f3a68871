//! Facet path resolution.
//!
//! A facet path such as `outgoing.properties.capital` is consumed one segment at
//! a time. Entities may hop once across a relation (`incoming`/`outgoing`);
//! relations only accept terminal keys.

use serde::{Deserialize, Serialize};

use crate::{CandidateKind, KinshipError, KinshipResult, ProjectId, SchemaId, Value};

const PROPERTIES_PREFIX: &str = "properties.";
const INCOMING_PREFIX: &str = "incoming.";
const OUTGOING_PREFIX: &str = "outgoing.";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FacetKey {
    Project,
    Schema,
    /// Value of the active property with this name.
    Property(String),
}

/// Relation hop taken from an entity before grouping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hop {
    /// Relations whose target is the entity.
    Incoming,
    /// Relations whose source is the entity.
    Outgoing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetPlan {
    pub path: String,
    pub root: CandidateKind,
    pub hop: Option<Hop>,
    pub key: FacetKey,
}

impl FacetPlan {
    /// Kind of row the group key is read from.
    pub fn key_kind(&self) -> CandidateKind {
        match self.hop {
            Some(_) => CandidateKind::Relation,
            None => self.root,
        }
    }
}

pub fn resolve_facet(root: CandidateKind, path: &str) -> KinshipResult<FacetPlan> {
    let (hop, key) = resolve_segment(root, path, true)?;
    Ok(FacetPlan {
        path: path.to_string(),
        root,
        hop,
        key,
    })
}

fn resolve_segment(
    kind: CandidateKind,
    path: &str,
    may_hop: bool,
) -> KinshipResult<(Option<Hop>, FacetKey)> {
    match path {
        "project" => return Ok((None, FacetKey::Project)),
        "schema" => return Ok((None, FacetKey::Schema)),
        _ => {}
    }
    if let Some(name) = path.strip_prefix(PROPERTIES_PREFIX)
        && !name.is_empty()
    {
        return Ok((None, FacetKey::Property(name.to_string())));
    }
    if kind == CandidateKind::Entity && may_hop {
        for (prefix, hop) in [(INCOMING_PREFIX, Hop::Incoming), (OUTGOING_PREFIX, Hop::Outgoing)] {
            if let Some(rest) = path.strip_prefix(prefix) {
                let (_, key) = resolve_segment(CandidateKind::Relation, rest, false)?;
                return Ok((Some(hop), key));
            }
        }
    }
    Err(KinshipError::unknown_facet(path))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum FacetValue {
    Project {
        project_id: ProjectId,
        slug: String,
        label: String,
    },
    Schema {
        schema_id: SchemaId,
        name: String,
        label: String,
    },
    Property(Value),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FacetCount {
    pub value: FacetValue,
    pub count: u64,
}

/// Facet buckets keyed by path, in the order the paths were requested.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetResults {
    facets: Vec<(String, Vec<FacetCount>)>,
}

impl FacetResults {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, counts: Vec<FacetCount>) {
        let path = path.into();
        match self.facets.iter_mut().find(|(existing, _)| *existing == path) {
            Some((_, existing)) => *existing = counts,
            None => self.facets.push((path, counts)),
        }
    }

    pub fn get(&self, path: &str) -> Option<&[FacetCount]> {
        self.facets
            .iter()
            .find(|(existing, _)| existing == path)
            .map(|(_, counts)| counts.as_slice())
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.facets.iter().map(|(path, _)| path.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[FacetCount])> {
        self.facets
            .iter()
            .map(|(path, counts)| (path.as_str(), counts.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }
}
