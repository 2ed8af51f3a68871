use crate::{
    Atom, AttributeRegistry, Caller, CandidateKind, EntityId, Filters, KinshipResult, Predicate,
    Selection, entity_visibility, relation_visibility, resolve_property_filter,
};

/// A malformed endpoint id matches no relation.
fn endpoint_predicate(raw: &str, key: &str, atom: fn(EntityId) -> Atom) -> Predicate {
    match EntityId::parse(raw) {
        Ok(id) => Predicate::atom(atom(id)),
        Err(_) => {
            log::debug!("{key} '{raw}' is not an entity id");
            Predicate::False
        }
    }
}

fn property_predicates(
    filters: &Filters,
    registry: &dyn AttributeRegistry,
) -> KinshipResult<Vec<Predicate>> {
    filters
        .properties
        .iter()
        .map(|filter| resolve_property_filter(filter, registry))
        .collect()
}

/// Entities the caller may read, narrowed by the request filters.
pub fn entity_selection(
    caller: &Caller,
    filters: &Filters,
    registry: &dyn AttributeRegistry,
) -> KinshipResult<Selection> {
    let mut selection = Selection::new(CandidateKind::Entity)
        .filter(Predicate::atom(Atom::NotMerged))
        .filter(entity_visibility(caller));
    if let Some(slug) = &filters.project {
        selection = selection.filter(Predicate::atom(Atom::ProjectSlug(slug.clone())));
    }
    for predicate in property_predicates(filters, registry)? {
        selection = selection.filter(predicate);
    }
    if let Some(text) = &filters.text {
        selection = selection.filter(Predicate::atom(Atom::NameContains(text.clone())));
    }
    for schema in &filters.schemas {
        selection = selection.filter(Predicate::atom(Atom::SchemaIn(schema.names().to_vec())));
    }
    Ok(selection)
}

/// Relations the caller may read, narrowed by the request filters.
pub fn relation_selection(
    caller: &Caller,
    filters: &Filters,
    registry: &dyn AttributeRegistry,
) -> KinshipResult<Selection> {
    let mut selection =
        Selection::new(CandidateKind::Relation).filter(relation_visibility(caller));
    if let Some(slug) = &filters.project {
        selection = selection.filter(Predicate::atom(Atom::ProjectSlug(slug.clone())));
    }
    for predicate in property_predicates(filters, registry)? {
        selection = selection.filter(predicate);
    }
    if let Some(source) = &filters.source {
        selection = selection.filter(endpoint_predicate(source, "source", Atom::SourceIs));
    }
    if let Some(target) = &filters.target {
        selection = selection.filter(endpoint_predicate(target, "target", Atom::TargetIs));
    }
    if let Some(schema) = filters.relation_schema() {
        selection = selection.filter(Predicate::atom(Atom::SchemaIn(schema.names().to_vec())));
    }
    Ok(selection)
}
