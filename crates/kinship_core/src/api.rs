use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{
    Account, AccountId, Attribute, AttributeCatalog, AttributeId, Caller, CandidateKind,
    EntityId, EntityRecord, FacetResults, KinshipResult, Permission, Project, ProjectId,
    PropertyRecord, RelationId, RelationRecord, RequestParams, SchemaDef, SchemaId, Value,
    ValueType,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateProjectInput {
    pub slug: String,
    pub label: String,
    pub private: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrantPermissionInput {
    pub project_id: ProjectId,
    pub account_id: AccountId,
    pub reader: bool,
    pub editor: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateSchemaInput {
    pub project_id: ProjectId,
    pub name: String,
    pub label: String,
    pub applies_to: CandidateKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateAttributeInput {
    pub schema_id: SchemaId,
    pub name: String,
    pub label: String,
    pub value_type: ValueType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateEntityInput {
    pub project_id: ProjectId,
    pub status: i32,
    pub schema_ids: Vec<SchemaId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateRelationInput {
    pub project_id: ProjectId,
    pub schema_id: SchemaId,
    pub source_id: EntityId,
    pub target_id: EntityId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PropertyOwner {
    Entity(EntityId),
    Relation(RelationId),
}

impl PropertyOwner {
    pub fn kind(self) -> CandidateKind {
        match self {
            PropertyOwner::Entity(_) => CandidateKind::Entity,
            PropertyOwner::Relation(_) => CandidateKind::Relation,
        }
    }
}

/// Writes a new active value; earlier rows with the same name become aliases.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetPropertyInput {
    pub owner: PropertyOwner,
    pub attribute_id: AttributeId,
    pub value: Value,
}

#[async_trait]
pub trait CatalogWriteApi {
    async fn create_account(&self, login: &str) -> KinshipResult<Account>;
    async fn create_project(&self, input: CreateProjectInput) -> KinshipResult<Project>;
    async fn grant_permission(&self, input: GrantPermissionInput) -> KinshipResult<Permission>;
    async fn create_schema(&self, input: CreateSchemaInput) -> KinshipResult<SchemaDef>;
    async fn create_attribute(&self, input: CreateAttributeInput) -> KinshipResult<Attribute>;
}

#[async_trait]
pub trait GraphWriteApi {
    async fn create_entity(&self, input: CreateEntityInput) -> KinshipResult<EntityRecord>;
    async fn set_entity_status(&self, entity_id: EntityId, status: i32) -> KinshipResult<()>;
    async fn merge_entity(&self, entity_id: EntityId, into: EntityId) -> KinshipResult<()>;
    async fn attach_schema(&self, entity_id: EntityId, schema_id: SchemaId) -> KinshipResult<()>;
    async fn create_relation(&self, input: CreateRelationInput) -> KinshipResult<RelationRecord>;
    async fn set_property(&self, input: SetPropertyInput) -> KinshipResult<PropertyRecord>;
}

#[async_trait]
pub trait GraphQueryApi {
    async fn attribute_catalog(&self) -> KinshipResult<AttributeCatalog>;
    async fn list_entities(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<Vec<EntityRecord>>;
    async fn count_entities(&self, caller: &Caller, params: &RequestParams) -> KinshipResult<u64>;
    async fn list_relations(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<Vec<RelationRecord>>;
    async fn count_relations(&self, caller: &Caller, params: &RequestParams)
    -> KinshipResult<u64>;
    async fn compute_facets(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<FacetResults>;
    async fn properties_of(&self, owner: PropertyOwner) -> KinshipResult<Vec<PropertyRecord>>;
}
