use sea_orm_migration::prelude::*;
use sea_orm_migration::sea_orm::DatabaseBackend;

use crate::db::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let backend = manager.get_database_backend();

        manager
            .create_table(
                Table::create()
                    .table(KinshipAccounts::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipAccounts::AccountId, false))
                    .col(
                        ColumnDef::new(KinshipAccounts::Login)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_accounts")
                            .col(KinshipAccounts::AccountId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipProjects::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipProjects::ProjectId, false))
                    .col(
                        ColumnDef::new(KinshipProjects::Slug)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(KinshipProjects::Label).string().not_null())
                    .col(ColumnDef::new(KinshipProjects::Private).boolean().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_projects")
                            .col(KinshipProjects::ProjectId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipPermissions::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipPermissions::ProjectId, false))
                    .col(id_col(backend, KinshipPermissions::AccountId, false))
                    .col(
                        ColumnDef::new(KinshipPermissions::Reader)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(KinshipPermissions::Editor)
                            .boolean()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_permissions")
                            .col(KinshipPermissions::ProjectId)
                            .col(KinshipPermissions::AccountId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipSchemas::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipSchemas::SchemaId, false))
                    .col(id_col(backend, KinshipSchemas::ProjectId, false))
                    .col(ColumnDef::new(KinshipSchemas::Name).string().not_null())
                    .col(ColumnDef::new(KinshipSchemas::Label).string().not_null())
                    .col(ColumnDef::new(KinshipSchemas::Obj).string().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_schemas")
                            .col(KinshipSchemas::SchemaId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_kinship_schemas_name")
                    .table(KinshipSchemas::Table)
                    .col(KinshipSchemas::Name)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipAttributes::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipAttributes::AttributeId, false))
                    .col(id_col(backend, KinshipAttributes::SchemaId, false))
                    .col(ColumnDef::new(KinshipAttributes::Name).string().not_null())
                    .col(ColumnDef::new(KinshipAttributes::Label).string().not_null())
                    .col(
                        ColumnDef::new(KinshipAttributes::Datatype)
                            .string()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_attributes")
                            .col(KinshipAttributes::AttributeId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipEntities::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipEntities::EntityId, false))
                    .col(id_col(backend, KinshipEntities::ProjectId, false))
                    .col(ColumnDef::new(KinshipEntities::Status).integer().not_null())
                    .col(id_col(backend, KinshipEntities::SameAsId, true))
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_entities")
                            .col(KinshipEntities::EntityId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_kinship_entities_project")
                    .table(KinshipEntities::Table)
                    .col(KinshipEntities::ProjectId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipEntitySchemas::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipEntitySchemas::EntityId, false))
                    .col(id_col(backend, KinshipEntitySchemas::SchemaId, false))
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_entity_schemas")
                            .col(KinshipEntitySchemas::EntityId)
                            .col(KinshipEntitySchemas::SchemaId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(KinshipRelations::Table)
                    .if_not_exists()
                    .col(id_col(backend, KinshipRelations::RelationId, false))
                    .col(id_col(backend, KinshipRelations::ProjectId, false))
                    .col(id_col(backend, KinshipRelations::SchemaId, false))
                    .col(id_col(backend, KinshipRelations::SourceId, false))
                    .col(id_col(backend, KinshipRelations::TargetId, false))
                    .primary_key(
                        Index::create()
                            .name("pk_kinship_relations")
                            .col(KinshipRelations::RelationId),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_kinship_relations_source")
                    .table(KinshipRelations::Table)
                    .col(KinshipRelations::SourceId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_kinship_relations_target")
                    .table(KinshipRelations::Table)
                    .col(KinshipRelations::TargetId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        create_property_table(
            manager,
            backend,
            PropertyTableLayout {
                table: KinshipEntityProperties::Table,
                owner_col: KinshipEntityProperties::EntityId,
                pk_name: "pk_kinship_entity_properties",
                owner_idx_name: "idx_kinship_entity_properties_owner",
            },
        )
        .await?;

        create_property_table(
            manager,
            backend,
            PropertyTableLayout {
                table: KinshipRelationProperties::Table,
                owner_col: KinshipRelationProperties::RelationId,
                pk_name: "pk_kinship_relation_properties",
                owner_idx_name: "idx_kinship_relation_properties_owner",
            },
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipRelationProperties::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipEntityProperties::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipRelations::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipEntitySchemas::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipEntities::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipAttributes::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipSchemas::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipPermissions::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipProjects::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .drop_table(
                Table::drop()
                    .table(KinshipAccounts::Table)
                    .if_exists()
                    .to_owned(),
            )
            .await?;
        Ok(())
    }
}

struct PropertyTableLayout<T: Iden + Clone> {
    table: T,
    owner_col: T,
    pk_name: &'static str,
    owner_idx_name: &'static str,
}

async fn create_property_table<T: Iden + Clone + 'static>(
    manager: &SchemaManager<'_>,
    backend: DatabaseBackend,
    layout: PropertyTableLayout<T>,
) -> Result<(), DbErr> {
    manager
        .create_table(
            Table::create()
                .table(layout.table.clone())
                .if_not_exists()
                .col(id_col(backend, PropertyColumn::PropertyId, false))
                .col(id_col(backend, layout.owner_col.clone(), false))
                .col(id_col(backend, PropertyColumn::AttributeId, false))
                .col(ColumnDef::new(PropertyColumn::Name).string().not_null())
                .col(ColumnDef::new(PropertyColumn::Active).boolean().not_null())
                .col(ColumnDef::new(PropertyColumn::ValueString).text())
                .col(ColumnDef::new(PropertyColumn::ValueInteger).big_integer())
                .col(ColumnDef::new(PropertyColumn::ValueFloat).double())
                .col(ColumnDef::new(PropertyColumn::ValueDatetime).big_integer())
                .col(ColumnDef::new(PropertyColumn::ValueBoolean).boolean())
                .col(ColumnDef::new(PropertyColumn::SearchText).text())
                .primary_key(
                    Index::create()
                        .name(layout.pk_name)
                        .col(PropertyColumn::PropertyId),
                )
                .to_owned(),
        )
        .await?;
    manager
        .create_index(
            Index::create()
                .name(layout.owner_idx_name)
                .table(layout.table)
                .col(layout.owner_col)
                .col(PropertyColumn::Name)
                .if_not_exists()
                .to_owned(),
        )
        .await?;
    Ok(())
}

fn id_col(backend: DatabaseBackend, col: impl Iden + 'static, nullable: bool) -> ColumnDef {
    let mut col_def = ColumnDef::new(col);
    match backend {
        DatabaseBackend::Postgres => {
            col_def.uuid();
        }
        DatabaseBackend::MySql => {
            col_def.binary_len(16);
        }
        DatabaseBackend::Sqlite => {
            col_def.string_len(36);
        }
        _ => {
            col_def.string_len(36);
        }
    }
    if nullable {
        col_def.null();
    } else {
        col_def.not_null();
    }
    col_def.to_owned()
}
