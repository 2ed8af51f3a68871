#![allow(dead_code)]

use kinship_store::{
    Account, Attribute, CandidateKind, CatalogWriteApi, CreateAttributeInput, CreateEntityInput,
    CreateProjectInput, CreateRelationInput, CreateSchemaInput, EntityId, EntityRecord,
    GrantPermissionInput, GraphWriteApi, KinshipConfig, KinshipResult, KinshipStore, Project,
    PropertyOwner, PropertyRecord, RelationId, RelationRecord, RequestParams, SchemaDef,
    SetPropertyInput, Value, ValueType,
};
use tempfile::{TempDir, tempdir};

pub async fn open_store() -> KinshipResult<(TempDir, KinshipStore)> {
    let dir = tempdir().expect("tempdir");
    let base = dir.path();
    let config = KinshipConfig::default_sqlite(base.join("kinship.sqlite").to_string_lossy());
    let store = KinshipStore::connect(&config, base).await?;
    Ok((dir, store))
}

pub async fn project(store: &KinshipStore, slug: &str, private: bool) -> KinshipResult<Project> {
    store
        .create_project(CreateProjectInput {
            slug: slug.to_string(),
            label: slug.to_uppercase(),
            private,
        })
        .await
}

pub async fn account(store: &KinshipStore, login: &str) -> KinshipResult<Account> {
    store.create_account(login).await
}

pub async fn grant(
    store: &KinshipStore,
    project: &Project,
    account: &Account,
    reader: bool,
    editor: bool,
) -> KinshipResult<()> {
    store
        .grant_permission(GrantPermissionInput {
            project_id: project.project_id,
            account_id: account.account_id,
            reader,
            editor,
        })
        .await?;
    Ok(())
}

pub async fn schema(
    store: &KinshipStore,
    project: &Project,
    name: &str,
    applies_to: CandidateKind,
) -> KinshipResult<SchemaDef> {
    store
        .create_schema(CreateSchemaInput {
            project_id: project.project_id,
            name: name.to_string(),
            label: name.to_uppercase(),
            applies_to,
        })
        .await
}

pub async fn attribute(
    store: &KinshipStore,
    schema: &SchemaDef,
    name: &str,
    value_type: ValueType,
) -> KinshipResult<Attribute> {
    store
        .create_attribute(CreateAttributeInput {
            schema_id: schema.schema_id,
            name: name.to_string(),
            label: name.to_uppercase(),
            value_type,
        })
        .await
}

pub async fn entity(
    store: &KinshipStore,
    project: &Project,
    status: i32,
    schemas: &[&SchemaDef],
) -> KinshipResult<EntityRecord> {
    store
        .create_entity(CreateEntityInput {
            project_id: project.project_id,
            status,
            schema_ids: schemas.iter().map(|schema| schema.schema_id).collect(),
        })
        .await
}

pub async fn relation(
    store: &KinshipStore,
    project: &Project,
    schema: &SchemaDef,
    source: &EntityRecord,
    target: &EntityRecord,
) -> KinshipResult<RelationRecord> {
    store
        .create_relation(CreateRelationInput {
            project_id: project.project_id,
            schema_id: schema.schema_id,
            source_id: source.entity_id,
            target_id: target.entity_id,
        })
        .await
}

pub async fn set_entity_property(
    store: &KinshipStore,
    entity: &EntityRecord,
    attribute: &Attribute,
    value: impl Into<Value>,
) -> KinshipResult<PropertyRecord> {
    store
        .set_property(SetPropertyInput {
            owner: PropertyOwner::Entity(entity.entity_id),
            attribute_id: attribute.attribute_id,
            value: value.into(),
        })
        .await
}

pub async fn set_relation_property(
    store: &KinshipStore,
    relation: &RelationRecord,
    attribute: &Attribute,
    value: impl Into<Value>,
) -> KinshipResult<PropertyRecord> {
    store
        .set_property(SetPropertyInput {
            owner: PropertyOwner::Relation(relation.relation_id),
            attribute_id: attribute.attribute_id,
            value: value.into(),
        })
        .await
}

pub fn params(pairs: &[(&str, &str)]) -> RequestParams {
    RequestParams::from_pairs(pairs.iter().copied())
}

pub fn entity_ids(records: &[EntityRecord]) -> Vec<EntityId> {
    let mut ids: Vec<_> = records.iter().map(|record| record.entity_id).collect();
    ids.sort();
    ids
}

pub fn relation_ids(records: &[RelationRecord]) -> Vec<RelationId> {
    let mut ids: Vec<_> = records.iter().map(|record| record.relation_id).collect();
    ids.sort();
    ids
}

pub fn sorted<T: Ord>(mut values: Vec<T>) -> Vec<T> {
    values.sort();
    values
}
