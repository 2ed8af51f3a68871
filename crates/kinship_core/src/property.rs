use crate::{
    Atom, Attribute, KinshipError, KinshipResult, Predicate, PropertyAlternative, PropertyFilter,
    PropertyMatch,
};

/// Resolves a logical property name to every attribute definition that uses it.
pub trait AttributeRegistry {
    fn all_named(&self, name: &str) -> Vec<Attribute>;
}

#[derive(Clone, Debug, Default)]
pub struct AttributeCatalog {
    attributes: Vec<Attribute>,
}

impl AttributeCatalog {
    pub fn new(attributes: Vec<Attribute>) -> Self {
        Self { attributes }
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl AttributeRegistry for AttributeCatalog {
    fn all_named(&self, name: &str) -> Vec<Attribute> {
        self.attributes
            .iter()
            .filter(|attribute| attribute.name == name)
            .cloned()
            .collect()
    }
}

/// Turns one `property-*` argument into a predicate over property rows.
///
/// The raw value is coerced once per attribute sharing the name. Attributes whose
/// type rejects the value are dropped; if every attribute rejects it the request is
/// invalid. A name with no attribute at all matches nothing.
pub fn resolve_property_filter(
    filter: &PropertyFilter,
    registry: &dyn AttributeRegistry,
) -> KinshipResult<Predicate> {
    let attributes = registry.all_named(&filter.name);
    if attributes.is_empty() {
        log::warn!("property filter '{}' names no known attribute", filter.name);
        return Ok(Predicate::False);
    }
    let mut alternatives = Vec::with_capacity(attributes.len());
    let mut last_error = None;
    for attribute in &attributes {
        match attribute.value_type.coerce(&filter.raw_value) {
            Ok(value) => alternatives.push(PropertyAlternative {
                attribute_id: attribute.attribute_id,
                value,
            }),
            Err(err) => last_error = Some(err),
        }
    }
    if alternatives.is_empty() {
        return Err(last_error.unwrap_or_else(|| {
            KinshipError::invalid(format!("bad value for property '{}'", filter.name))
        }));
    }
    Ok(Predicate::atom(Atom::Property(PropertyMatch {
        name: filter.name.clone(),
        only_active: filter.only_active(),
        alternatives,
    })))
}
