use serde::{Deserialize, Serialize};

use crate::{
    AccountId, AttributeId, CandidateKind, EntityId, ProjectId, PropertyId, RelationId, SchemaId,
    Value, ValueType,
};

/// Lowest entity status that counts as published for reader-level access.
pub const PUBLISHED_THRESHOLD: i32 = 5;

/// Status assigned to newly created entities.
pub const DRAFT_STATUS: i32 = 0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: AccountId,
    pub login: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub slug: String,
    pub label: String,
    pub private: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Permission {
    pub project_id: ProjectId,
    pub account_id: AccountId,
    pub reader: bool,
    pub editor: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub schema_id: SchemaId,
    pub project_id: ProjectId,
    pub name: String,
    pub label: String,
    pub applies_to: CandidateKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub attribute_id: AttributeId,
    pub schema_id: SchemaId,
    pub name: String,
    pub label: String,
    pub value_type: ValueType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: EntityId,
    pub project_id: ProjectId,
    pub status: i32,
    pub same_as: Option<EntityId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub relation_id: RelationId,
    pub project_id: ProjectId,
    pub schema_id: SchemaId,
    pub source_id: EntityId,
    pub target_id: EntityId,
}

/// One stored property row. Several rows may share a name; at most one is active.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyRecord {
    pub property_id: PropertyId,
    pub attribute_id: AttributeId,
    pub name: String,
    pub active: bool,
    pub value: Value,
}

/// The account a request is evaluated for; `None` is an anonymous caller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub account: Option<AccountId>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { account: None }
    }

    pub fn account(account: AccountId) -> Self {
        Self {
            account: Some(account),
        }
    }
}
