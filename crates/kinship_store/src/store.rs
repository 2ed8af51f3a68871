use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::sea_query::{Alias, Expr, Func, Order, Query, SelectStatement, SimpleExpr};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult,
    TransactionTrait,
};
use sea_orm_migration::MigratorTrait;

use crate::codec::{
    col_name, exec, id_value, opt_id_value, query_all, query_one, read_id, read_opt_id,
    read_value, search_text, typed_columns,
};
use crate::compile::{FACET_COUNT, build_entity_query, build_relation_query, facet_statement};
use crate::db::*;
use crate::migration::Migrator;
use crate::{KinshipConfig, QueryLimits};
use kinship_core::{
    Account, AccountId, Attribute, AttributeCatalog, AttributeId, Caller, CandidateKind,
    CatalogWriteApi, CreateAttributeInput, CreateEntityInput, CreateProjectInput,
    CreateRelationInput, CreateSchemaInput, EntityId, EntityRecord, FacetCount, FacetKey,
    FacetResults, FacetValue, Filters, GrantPermissionInput, GraphQueryApi, GraphWriteApi, Id,
    KinshipError, KinshipResult, Permission, Project, ProjectId, PropertyId, PropertyOwner,
    PropertyRecord, RelationId, RelationRecord, RequestParams, SchemaDef, SchemaId,
    SetPropertyInput, ValueType, resolve_facet,
};

const ENTITY_ALIAS: &str = "e";
const RELATION_ALIAS: &str = "r";
const TOTAL: &str = "total";

#[derive(Clone)]
pub struct KinshipStore {
    conn: DatabaseConnection,
    backend: DatabaseBackend,
    limits: QueryLimits,
}

/// Table and owner column of the property rows for one candidate kind.
struct PropertyTable {
    table: Alias,
    owner: Alias,
    owner_id: Id,
}

impl PropertyTable {
    fn of(owner: PropertyOwner) -> Self {
        match owner {
            PropertyOwner::Entity(entity_id) => Self {
                table: Alias::new(col_name(KinshipEntityProperties::Table)),
                owner: Alias::new(col_name(KinshipEntityProperties::EntityId)),
                owner_id: entity_id.0,
            },
            PropertyOwner::Relation(relation_id) => Self {
                table: Alias::new(col_name(KinshipRelationProperties::Table)),
                owner: Alias::new(col_name(KinshipRelationProperties::RelationId)),
                owner_id: relation_id.0,
            },
        }
    }
}

impl KinshipStore {
    pub async fn connect(config: &KinshipConfig, base_dir: &Path) -> KinshipResult<Self> {
        let url = build_connection_url(config, base_dir)?;
        let mut options = ConnectOptions::new(url);
        if let Some(pool) = &config.pool {
            if let Some(max) = pool.max_connections {
                options.max_connections(max);
            }
            if let Some(min) = pool.min_connections {
                options.min_connections(min);
            }
            if let Some(timeout_ms) = pool.connect_timeout_ms {
                options.connect_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.acquire_timeout_ms {
                options.acquire_timeout(Duration::from_millis(timeout_ms));
            }
            if let Some(timeout_ms) = pool.idle_timeout_ms {
                options.idle_timeout(Duration::from_millis(timeout_ms));
            }
        }
        let conn = Database::connect(options).await.map_err(KinshipError::from)?;
        let backend = conn.get_database_backend();
        let store = Self {
            conn,
            backend,
            limits: QueryLimits::from_config(config),
        };
        Migrator::up(&store.conn, None)
            .await
            .map_err(KinshipError::from)?;
        log::debug!("kinship store ready on {}", config.backend_name());
        Ok(store)
    }

    pub async fn connect_sqlite(path: &Path) -> KinshipResult<Self> {
        let config = KinshipConfig::default_sqlite(path.to_string_lossy());
        Self::connect(&config, path.parent().unwrap_or_else(|| Path::new("."))).await
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub fn limits(&self) -> QueryLimits {
        self.limits
    }

    /// Every attribute definition, used to resolve property filters by name.
    pub async fn load_attribute_catalog(&self) -> KinshipResult<AttributeCatalog> {
        let select = Query::select()
            .from(KinshipAttributes::Table)
            .columns([
                KinshipAttributes::AttributeId,
                KinshipAttributes::SchemaId,
                KinshipAttributes::Name,
                KinshipAttributes::Label,
                KinshipAttributes::Datatype,
            ])
            .order_by(KinshipAttributes::Name, Order::Asc)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        let attributes = rows
            .iter()
            .map(attribute_from_row)
            .collect::<KinshipResult<Vec<_>>>()?;
        Ok(AttributeCatalog::new(attributes))
    }

    fn page(&self, filters: &Filters) -> (u64, u64) {
        (self.limits.page_size(filters.page.limit), filters.page.offset)
    }

    async fn fetch_project<C: ConnectionTrait>(
        &self,
        conn: &C,
        project_id: ProjectId,
    ) -> KinshipResult<Project> {
        let select = Query::select()
            .from(KinshipProjects::Table)
            .columns([
                KinshipProjects::ProjectId,
                KinshipProjects::Slug,
                KinshipProjects::Label,
                KinshipProjects::Private,
            ])
            .and_where(
                Expr::col(KinshipProjects::ProjectId).eq(id_value(self.backend, project_id.0)),
            )
            .limit(1)
            .to_owned();
        let row = query_one(conn, &select)
            .await?
            .ok_or_else(|| KinshipError::not_found(format!("project {project_id}")))?;
        Ok(Project {
            project_id: ProjectId(read_id(&row, &col_name(KinshipProjects::ProjectId))?),
            slug: row.try_get("", &col_name(KinshipProjects::Slug))?,
            label: row.try_get("", &col_name(KinshipProjects::Label))?,
            private: row.try_get("", &col_name(KinshipProjects::Private))?,
        })
    }

    async fn ensure_account<C: ConnectionTrait>(
        &self,
        conn: &C,
        account_id: AccountId,
    ) -> KinshipResult<()> {
        let select = Query::select()
            .from(KinshipAccounts::Table)
            .column(KinshipAccounts::AccountId)
            .and_where(
                Expr::col(KinshipAccounts::AccountId).eq(id_value(self.backend, account_id.0)),
            )
            .limit(1)
            .to_owned();
        match query_one(conn, &select).await? {
            Some(_) => Ok(()),
            None => Err(KinshipError::not_found(format!("account {account_id}"))),
        }
    }

    async fn fetch_schema<C: ConnectionTrait>(
        &self,
        conn: &C,
        schema_id: SchemaId,
    ) -> KinshipResult<SchemaDef> {
        let select = Query::select()
            .from(KinshipSchemas::Table)
            .columns([
                KinshipSchemas::SchemaId,
                KinshipSchemas::ProjectId,
                KinshipSchemas::Name,
                KinshipSchemas::Label,
                KinshipSchemas::Obj,
            ])
            .and_where(Expr::col(KinshipSchemas::SchemaId).eq(id_value(self.backend, schema_id.0)))
            .limit(1)
            .to_owned();
        let row = query_one(conn, &select)
            .await?
            .ok_or_else(|| KinshipError::not_found(format!("schema {schema_id}")))?;
        let obj: String = row.try_get("", &col_name(KinshipSchemas::Obj))?;
        Ok(SchemaDef {
            schema_id: SchemaId(read_id(&row, &col_name(KinshipSchemas::SchemaId))?),
            project_id: ProjectId(read_id(&row, &col_name(KinshipSchemas::ProjectId))?),
            name: row.try_get("", &col_name(KinshipSchemas::Name))?,
            label: row.try_get("", &col_name(KinshipSchemas::Label))?,
            applies_to: CandidateKind::parse(&obj)
                .ok_or_else(|| KinshipError::storage(format!("unknown schema object {obj}")))?,
        })
    }

    async fn fetch_schema_for<C: ConnectionTrait>(
        &self,
        conn: &C,
        schema_id: SchemaId,
        kind: CandidateKind,
    ) -> KinshipResult<SchemaDef> {
        let schema = self.fetch_schema(conn, schema_id).await?;
        if schema.applies_to != kind {
            return Err(KinshipError::validation(format!(
                "schema {} applies to {} rows, not {} rows",
                schema.name,
                schema.applies_to.as_str(),
                kind.as_str()
            )));
        }
        Ok(schema)
    }

    async fn fetch_attribute<C: ConnectionTrait>(
        &self,
        conn: &C,
        attribute_id: AttributeId,
    ) -> KinshipResult<Attribute> {
        let select = Query::select()
            .from(KinshipAttributes::Table)
            .columns([
                KinshipAttributes::AttributeId,
                KinshipAttributes::SchemaId,
                KinshipAttributes::Name,
                KinshipAttributes::Label,
                KinshipAttributes::Datatype,
            ])
            .and_where(
                Expr::col(KinshipAttributes::AttributeId)
                    .eq(id_value(self.backend, attribute_id.0)),
            )
            .limit(1)
            .to_owned();
        let row = query_one(conn, &select)
            .await?
            .ok_or_else(|| KinshipError::not_found(format!("attribute {attribute_id}")))?;
        attribute_from_row(&row)
    }

    async fn fetch_entity<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: EntityId,
    ) -> KinshipResult<EntityRecord> {
        let select = Query::select()
            .from(KinshipEntities::Table)
            .columns([
                KinshipEntities::EntityId,
                KinshipEntities::ProjectId,
                KinshipEntities::Status,
                KinshipEntities::SameAsId,
            ])
            .and_where(Expr::col(KinshipEntities::EntityId).eq(id_value(self.backend, entity_id.0)))
            .limit(1)
            .to_owned();
        let row = query_one(conn, &select)
            .await?
            .ok_or_else(|| KinshipError::not_found(format!("entity {entity_id}")))?;
        entity_from_row(&row)
    }

    async fn ensure_relation<C: ConnectionTrait>(
        &self,
        conn: &C,
        relation_id: RelationId,
    ) -> KinshipResult<()> {
        let select = Query::select()
            .from(KinshipRelations::Table)
            .column(KinshipRelations::RelationId)
            .and_where(
                Expr::col(KinshipRelations::RelationId).eq(id_value(self.backend, relation_id.0)),
            )
            .limit(1)
            .to_owned();
        match query_one(conn, &select).await? {
            Some(_) => Ok(()),
            None => Err(KinshipError::not_found(format!("relation {relation_id}"))),
        }
    }

    async fn link_schema<C: ConnectionTrait>(
        &self,
        conn: &C,
        entity_id: EntityId,
        schema_id: SchemaId,
    ) -> KinshipResult<()> {
        let existing = Query::select()
            .from(KinshipEntitySchemas::Table)
            .column(KinshipEntitySchemas::EntityId)
            .and_where(
                Expr::col(KinshipEntitySchemas::EntityId).eq(id_value(self.backend, entity_id.0)),
            )
            .and_where(
                Expr::col(KinshipEntitySchemas::SchemaId).eq(id_value(self.backend, schema_id.0)),
            )
            .limit(1)
            .to_owned();
        if query_one(conn, &existing).await?.is_some() {
            return Ok(());
        }
        let insert = Query::insert()
            .into_table(KinshipEntitySchemas::Table)
            .columns([KinshipEntitySchemas::EntityId, KinshipEntitySchemas::SchemaId])
            .values_panic([
                id_value(self.backend, entity_id.0).into(),
                id_value(self.backend, schema_id.0).into(),
            ])
            .to_owned();
        exec(conn, &insert).await?;
        Ok(())
    }

    fn entity_base(&self) -> SelectStatement {
        let e = Alias::new(ENTITY_ALIAS);
        Query::select()
            .expr_as(
                Expr::col((e.clone(), KinshipEntities::EntityId)),
                KinshipEntities::EntityId,
            )
            .expr_as(
                Expr::col((e.clone(), KinshipEntities::ProjectId)),
                KinshipEntities::ProjectId,
            )
            .expr_as(
                Expr::col((e.clone(), KinshipEntities::Status)),
                KinshipEntities::Status,
            )
            .expr_as(
                Expr::col((e.clone(), KinshipEntities::SameAsId)),
                KinshipEntities::SameAsId,
            )
            .from_as(KinshipEntities::Table, e)
            .to_owned()
    }

    fn relation_base(&self) -> SelectStatement {
        let r = Alias::new(RELATION_ALIAS);
        Query::select()
            .expr_as(
                Expr::col((r.clone(), KinshipRelations::RelationId)),
                KinshipRelations::RelationId,
            )
            .expr_as(
                Expr::col((r.clone(), KinshipRelations::ProjectId)),
                KinshipRelations::ProjectId,
            )
            .expr_as(
                Expr::col((r.clone(), KinshipRelations::SchemaId)),
                KinshipRelations::SchemaId,
            )
            .expr_as(
                Expr::col((r.clone(), KinshipRelations::SourceId)),
                KinshipRelations::SourceId,
            )
            .expr_as(
                Expr::col((r.clone(), KinshipRelations::TargetId)),
                KinshipRelations::TargetId,
            )
            .from_as(KinshipRelations::Table, r)
            .to_owned()
    }

    async fn count<S: sea_orm::sea_query::QueryStatementWriter>(
        &self,
        select: &S,
    ) -> KinshipResult<u64> {
        let row = query_one(&self.conn, select)
            .await?
            .ok_or_else(|| KinshipError::storage("count returned no rows"))?;
        let total: i64 = row.try_get("", TOTAL)?;
        Ok(u64::try_from(total).unwrap_or_default())
    }
}

#[async_trait]
impl CatalogWriteApi for KinshipStore {
    async fn create_account(&self, login: &str) -> KinshipResult<Account> {
        let login = login.trim();
        if login.is_empty() {
            return Err(KinshipError::validation("login must not be empty"));
        }
        let existing = Query::select()
            .from(KinshipAccounts::Table)
            .column(KinshipAccounts::AccountId)
            .and_where(Expr::col(KinshipAccounts::Login).eq(login))
            .limit(1)
            .to_owned();
        if query_one(&self.conn, &existing).await?.is_some() {
            return Err(KinshipError::conflict(format!("login {login} already exists")));
        }
        let account = Account {
            account_id: AccountId::new(),
            login: login.to_string(),
        };
        let insert = Query::insert()
            .into_table(KinshipAccounts::Table)
            .columns([KinshipAccounts::AccountId, KinshipAccounts::Login])
            .values_panic([
                id_value(self.backend, account.account_id.0).into(),
                account.login.clone().into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(account)
    }

    async fn create_project(&self, input: CreateProjectInput) -> KinshipResult<Project> {
        let slug = input.slug.trim();
        if slug.is_empty() {
            return Err(KinshipError::validation("project slug must not be empty"));
        }
        let existing = Query::select()
            .from(KinshipProjects::Table)
            .column(KinshipProjects::ProjectId)
            .and_where(Expr::col(KinshipProjects::Slug).eq(slug))
            .limit(1)
            .to_owned();
        if query_one(&self.conn, &existing).await?.is_some() {
            return Err(KinshipError::conflict(format!("project {slug} already exists")));
        }
        let project = Project {
            project_id: ProjectId::new(),
            slug: slug.to_string(),
            label: input.label,
            private: input.private,
        };
        let insert = Query::insert()
            .into_table(KinshipProjects::Table)
            .columns([
                KinshipProjects::ProjectId,
                KinshipProjects::Slug,
                KinshipProjects::Label,
                KinshipProjects::Private,
            ])
            .values_panic([
                id_value(self.backend, project.project_id.0).into(),
                project.slug.clone().into(),
                project.label.clone().into(),
                project.private.into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(project)
    }

    async fn grant_permission(&self, input: GrantPermissionInput) -> KinshipResult<Permission> {
        let tx = self.conn.begin().await?;
        self.fetch_project(&tx, input.project_id).await?;
        self.ensure_account(&tx, input.account_id).await?;
        let delete = Query::delete()
            .from_table(KinshipPermissions::Table)
            .and_where(
                Expr::col(KinshipPermissions::ProjectId)
                    .eq(id_value(self.backend, input.project_id.0)),
            )
            .and_where(
                Expr::col(KinshipPermissions::AccountId)
                    .eq(id_value(self.backend, input.account_id.0)),
            )
            .to_owned();
        exec(&tx, &delete).await?;
        let insert = Query::insert()
            .into_table(KinshipPermissions::Table)
            .columns([
                KinshipPermissions::ProjectId,
                KinshipPermissions::AccountId,
                KinshipPermissions::Reader,
                KinshipPermissions::Editor,
            ])
            .values_panic([
                id_value(self.backend, input.project_id.0).into(),
                id_value(self.backend, input.account_id.0).into(),
                input.reader.into(),
                input.editor.into(),
            ])
            .to_owned();
        exec(&tx, &insert).await?;
        tx.commit().await?;
        Ok(Permission {
            project_id: input.project_id,
            account_id: input.account_id,
            reader: input.reader,
            editor: input.editor,
        })
    }

    async fn create_schema(&self, input: CreateSchemaInput) -> KinshipResult<SchemaDef> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(KinshipError::validation("schema name must not be empty"));
        }
        self.fetch_project(&self.conn, input.project_id).await?;
        let schema = SchemaDef {
            schema_id: SchemaId::new(),
            project_id: input.project_id,
            name: name.to_string(),
            label: input.label,
            applies_to: input.applies_to,
        };
        let insert = Query::insert()
            .into_table(KinshipSchemas::Table)
            .columns([
                KinshipSchemas::SchemaId,
                KinshipSchemas::ProjectId,
                KinshipSchemas::Name,
                KinshipSchemas::Label,
                KinshipSchemas::Obj,
            ])
            .values_panic([
                id_value(self.backend, schema.schema_id.0).into(),
                id_value(self.backend, schema.project_id.0).into(),
                schema.name.clone().into(),
                schema.label.clone().into(),
                schema.applies_to.as_str().into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(schema)
    }

    async fn create_attribute(&self, input: CreateAttributeInput) -> KinshipResult<Attribute> {
        let name = input.name.trim();
        if name.is_empty() {
            return Err(KinshipError::validation("attribute name must not be empty"));
        }
        self.fetch_schema(&self.conn, input.schema_id).await?;
        let attribute = Attribute {
            attribute_id: AttributeId::new(),
            schema_id: input.schema_id,
            name: name.to_string(),
            label: input.label,
            value_type: input.value_type,
        };
        let insert = Query::insert()
            .into_table(KinshipAttributes::Table)
            .columns([
                KinshipAttributes::AttributeId,
                KinshipAttributes::SchemaId,
                KinshipAttributes::Name,
                KinshipAttributes::Label,
                KinshipAttributes::Datatype,
            ])
            .values_panic([
                id_value(self.backend, attribute.attribute_id.0).into(),
                id_value(self.backend, attribute.schema_id.0).into(),
                attribute.name.clone().into(),
                attribute.label.clone().into(),
                attribute.value_type.as_str().into(),
            ])
            .to_owned();
        exec(&self.conn, &insert).await?;
        Ok(attribute)
    }
}

#[async_trait]
impl GraphWriteApi for KinshipStore {
    async fn create_entity(&self, input: CreateEntityInput) -> KinshipResult<EntityRecord> {
        let tx = self.conn.begin().await?;
        self.fetch_project(&tx, input.project_id).await?;
        let entity = EntityRecord {
            entity_id: EntityId::new(),
            project_id: input.project_id,
            status: input.status,
            same_as: None,
        };
        let insert = Query::insert()
            .into_table(KinshipEntities::Table)
            .columns([
                KinshipEntities::EntityId,
                KinshipEntities::ProjectId,
                KinshipEntities::Status,
                KinshipEntities::SameAsId,
            ])
            .values_panic([
                id_value(self.backend, entity.entity_id.0).into(),
                id_value(self.backend, entity.project_id.0).into(),
                entity.status.into(),
                opt_id_value(self.backend, None).into(),
            ])
            .to_owned();
        exec(&tx, &insert).await?;
        for schema_id in &input.schema_ids {
            self.fetch_schema_for(&tx, *schema_id, CandidateKind::Entity)
                .await?;
            self.link_schema(&tx, entity.entity_id, *schema_id).await?;
        }
        tx.commit().await?;
        Ok(entity)
    }

    async fn set_entity_status(&self, entity_id: EntityId, status: i32) -> KinshipResult<()> {
        let update = Query::update()
            .table(KinshipEntities::Table)
            .values([(KinshipEntities::Status, status.into())])
            .and_where(Expr::col(KinshipEntities::EntityId).eq(id_value(self.backend, entity_id.0)))
            .to_owned();
        if exec(&self.conn, &update).await? == 0 {
            return Err(KinshipError::not_found(format!("entity {entity_id}")));
        }
        Ok(())
    }

    async fn merge_entity(&self, entity_id: EntityId, into: EntityId) -> KinshipResult<()> {
        if entity_id == into {
            return Err(KinshipError::validation("an entity cannot be merged into itself"));
        }
        let tx = self.conn.begin().await?;
        self.fetch_entity(&tx, entity_id).await?;
        self.fetch_entity(&tx, into).await?;
        let update = Query::update()
            .table(KinshipEntities::Table)
            .values([(
                KinshipEntities::SameAsId,
                id_value(self.backend, into.0).into(),
            )])
            .and_where(Expr::col(KinshipEntities::EntityId).eq(id_value(self.backend, entity_id.0)))
            .to_owned();
        exec(&tx, &update).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn attach_schema(&self, entity_id: EntityId, schema_id: SchemaId) -> KinshipResult<()> {
        let tx = self.conn.begin().await?;
        self.fetch_entity(&tx, entity_id).await?;
        self.fetch_schema_for(&tx, schema_id, CandidateKind::Entity)
            .await?;
        self.link_schema(&tx, entity_id, schema_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn create_relation(&self, input: CreateRelationInput) -> KinshipResult<RelationRecord> {
        let tx = self.conn.begin().await?;
        self.fetch_project(&tx, input.project_id).await?;
        self.fetch_schema_for(&tx, input.schema_id, CandidateKind::Relation)
            .await?;
        self.fetch_entity(&tx, input.source_id).await?;
        self.fetch_entity(&tx, input.target_id).await?;
        let relation = RelationRecord {
            relation_id: RelationId::new(),
            project_id: input.project_id,
            schema_id: input.schema_id,
            source_id: input.source_id,
            target_id: input.target_id,
        };
        let insert = Query::insert()
            .into_table(KinshipRelations::Table)
            .columns([
                KinshipRelations::RelationId,
                KinshipRelations::ProjectId,
                KinshipRelations::SchemaId,
                KinshipRelations::SourceId,
                KinshipRelations::TargetId,
            ])
            .values_panic([
                id_value(self.backend, relation.relation_id.0).into(),
                id_value(self.backend, relation.project_id.0).into(),
                id_value(self.backend, relation.schema_id.0).into(),
                id_value(self.backend, relation.source_id.0).into(),
                id_value(self.backend, relation.target_id.0).into(),
            ])
            .to_owned();
        exec(&tx, &insert).await?;
        tx.commit().await?;
        Ok(relation)
    }

    async fn set_property(&self, input: SetPropertyInput) -> KinshipResult<PropertyRecord> {
        let tx = self.conn.begin().await?;
        match input.owner {
            PropertyOwner::Entity(entity_id) => {
                self.fetch_entity(&tx, entity_id).await?;
            }
            PropertyOwner::Relation(relation_id) => {
                self.ensure_relation(&tx, relation_id).await?;
            }
        }
        let attribute = self.fetch_attribute(&tx, input.attribute_id).await?;
        if attribute.value_type.column() != input.value.column() {
            return Err(KinshipError::validation(format!(
                "attribute {} expects {} values",
                attribute.name,
                attribute.value_type.as_str()
            )));
        }
        let table = PropertyTable::of(input.owner);

        let deactivate = Query::update()
            .table(table.table.clone())
            .values([(PropertyColumn::Active, false.into())])
            .and_where(
                Expr::col(table.owner.clone()).eq(id_value(self.backend, table.owner_id)),
            )
            .and_where(Expr::col(PropertyColumn::Name).eq(attribute.name.as_str()))
            .to_owned();
        exec(&tx, &deactivate).await?;

        let record = PropertyRecord {
            property_id: PropertyId::new(),
            attribute_id: attribute.attribute_id,
            name: attribute.name.clone(),
            active: true,
            value: input.value,
        };
        let mut columns = vec![
            Alias::new(col_name(PropertyColumn::PropertyId)),
            table.owner.clone(),
            Alias::new(col_name(PropertyColumn::AttributeId)),
            Alias::new(col_name(PropertyColumn::Name)),
            Alias::new(col_name(PropertyColumn::Active)),
        ];
        columns.extend(
            [
                PropertyColumn::ValueString,
                PropertyColumn::ValueInteger,
                PropertyColumn::ValueFloat,
                PropertyColumn::ValueDatetime,
                PropertyColumn::ValueBoolean,
            ]
            .map(|column| Alias::new(col_name(column))),
        );
        columns.push(Alias::new(col_name(PropertyColumn::SearchText)));
        let mut values: Vec<SimpleExpr> = vec![
            id_value(self.backend, record.property_id.0).into(),
            id_value(self.backend, table.owner_id).into(),
            id_value(self.backend, record.attribute_id.0).into(),
            record.name.clone().into(),
            true.into(),
        ];
        values.extend(typed_columns(&record.value).map(SimpleExpr::from));
        values.push(search_text(&record.value).into());
        let insert = Query::insert()
            .into_table(table.table)
            .columns(columns)
            .values_panic(values)
            .to_owned();
        exec(&tx, &insert).await?;
        tx.commit().await?;
        Ok(record)
    }
}

#[async_trait]
impl GraphQueryApi for KinshipStore {
    async fn attribute_catalog(&self) -> KinshipResult<AttributeCatalog> {
        self.load_attribute_catalog().await
    }

    async fn list_entities(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<Vec<EntityRecord>> {
        let filters = Filters::parse(params)?;
        let catalog = self.load_attribute_catalog().await?;
        let (limit, offset) = self.page(&filters);
        let mut select = build_entity_query(
            self.entity_base(),
            ENTITY_ALIAS,
            caller,
            &filters,
            &catalog,
            self.backend,
        )?;
        select
            .order_by(
                (Alias::new(ENTITY_ALIAS), KinshipEntities::EntityId),
                Order::Asc,
            )
            .limit(limit)
            .offset(offset);
        let rows = query_all(&self.conn, &select).await?;
        rows.iter().map(entity_from_row).collect()
    }

    async fn count_entities(&self, caller: &Caller, params: &RequestParams) -> KinshipResult<u64> {
        let filters = Filters::parse(params)?;
        let catalog = self.load_attribute_catalog().await?;
        let e = Alias::new(ENTITY_ALIAS);
        let base = Query::select()
            .expr_as(
                Func::count(Expr::col((e.clone(), KinshipEntities::EntityId))),
                Alias::new(TOTAL),
            )
            .from_as(KinshipEntities::Table, e)
            .to_owned();
        let select =
            build_entity_query(base, ENTITY_ALIAS, caller, &filters, &catalog, self.backend)?;
        self.count(&select).await
    }

    async fn list_relations(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<Vec<RelationRecord>> {
        let filters = Filters::parse(params)?;
        let catalog = self.load_attribute_catalog().await?;
        let (limit, offset) = self.page(&filters);
        let mut select = build_relation_query(
            self.relation_base(),
            RELATION_ALIAS,
            caller,
            &filters,
            &catalog,
            self.backend,
        )?;
        select
            .order_by(
                (Alias::new(RELATION_ALIAS), KinshipRelations::RelationId),
                Order::Asc,
            )
            .limit(limit)
            .offset(offset);
        let rows = query_all(&self.conn, &select).await?;
        rows.iter().map(relation_from_row).collect()
    }

    async fn count_relations(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<u64> {
        let filters = Filters::parse(params)?;
        let catalog = self.load_attribute_catalog().await?;
        let r = Alias::new(RELATION_ALIAS);
        let base = Query::select()
            .expr_as(
                Func::count(Expr::col((r.clone(), KinshipRelations::RelationId))),
                Alias::new(TOTAL),
            )
            .from_as(KinshipRelations::Table, r)
            .to_owned();
        let select =
            build_relation_query(base, RELATION_ALIAS, caller, &filters, &catalog, self.backend)?;
        self.count(&select).await
    }

    async fn compute_facets(
        &self,
        caller: &Caller,
        params: &RequestParams,
    ) -> KinshipResult<FacetResults> {
        let filters = Filters::parse(params)?;
        if filters.facets.len() > self.limits.max_facets {
            return Err(KinshipError::validation(format!(
                "at most {} facets may be requested, got {}",
                self.limits.max_facets,
                filters.facets.len()
            )));
        }
        let plans = filters
            .facets
            .iter()
            .map(|path| resolve_facet(CandidateKind::Entity, path))
            .collect::<KinshipResult<Vec<_>>>()?;
        let mut results = FacetResults::new();
        if plans.is_empty() {
            return Ok(results);
        }
        let catalog = self.load_attribute_catalog().await?;
        for plan in &plans {
            let select = facet_statement(plan, caller, &filters, &catalog, self.backend)?;
            let rows = query_all(&self.conn, &select).await?;
            let mut counts = Vec::with_capacity(rows.len());
            for row in &rows {
                if let Some(count) = facet_count_from_row(&plan.key, row)? {
                    counts.push(count);
                }
            }
            log::debug!("facet {} produced {} buckets", plan.path, counts.len());
            results.insert(plan.path.clone(), counts);
        }
        Ok(results)
    }

    async fn properties_of(&self, owner: PropertyOwner) -> KinshipResult<Vec<PropertyRecord>> {
        let table = PropertyTable::of(owner);
        let select = Query::select()
            .from(table.table)
            .columns([
                PropertyColumn::PropertyId,
                PropertyColumn::AttributeId,
                PropertyColumn::Name,
                PropertyColumn::Active,
                PropertyColumn::ValueString,
                PropertyColumn::ValueInteger,
                PropertyColumn::ValueFloat,
                PropertyColumn::ValueDatetime,
                PropertyColumn::ValueBoolean,
            ])
            .and_where(Expr::col(table.owner).eq(id_value(self.backend, table.owner_id)))
            .order_by(PropertyColumn::Name, Order::Asc)
            .order_by(PropertyColumn::Active, Order::Desc)
            .to_owned();
        let rows = query_all(&self.conn, &select).await?;
        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            let Some(value) = read_value(row, "")? else {
                log::warn!("skipping property row without a value");
                continue;
            };
            records.push(PropertyRecord {
                property_id: PropertyId(read_id(row, &col_name(PropertyColumn::PropertyId))?),
                attribute_id: AttributeId(read_id(row, &col_name(PropertyColumn::AttributeId))?),
                name: row.try_get("", &col_name(PropertyColumn::Name))?,
                active: row.try_get("", &col_name(PropertyColumn::Active))?,
                value,
            });
        }
        Ok(records)
    }
}

fn attribute_from_row(row: &QueryResult) -> KinshipResult<Attribute> {
    let datatype: String = row.try_get("", &col_name(KinshipAttributes::Datatype))?;
    Ok(Attribute {
        attribute_id: AttributeId(read_id(row, &col_name(KinshipAttributes::AttributeId))?),
        schema_id: SchemaId(read_id(row, &col_name(KinshipAttributes::SchemaId))?),
        name: row.try_get("", &col_name(KinshipAttributes::Name))?,
        label: row.try_get("", &col_name(KinshipAttributes::Label))?,
        value_type: ValueType::parse(&datatype)
            .ok_or_else(|| KinshipError::storage(format!("unknown datatype {datatype}")))?,
    })
}

fn entity_from_row(row: &QueryResult) -> KinshipResult<EntityRecord> {
    Ok(EntityRecord {
        entity_id: EntityId(read_id(row, &col_name(KinshipEntities::EntityId))?),
        project_id: ProjectId(read_id(row, &col_name(KinshipEntities::ProjectId))?),
        status: row.try_get("", &col_name(KinshipEntities::Status))?,
        same_as: read_opt_id(row, &col_name(KinshipEntities::SameAsId))?.map(EntityId),
    })
}

fn relation_from_row(row: &QueryResult) -> KinshipResult<RelationRecord> {
    Ok(RelationRecord {
        relation_id: RelationId(read_id(row, &col_name(KinshipRelations::RelationId))?),
        project_id: ProjectId(read_id(row, &col_name(KinshipRelations::ProjectId))?),
        schema_id: SchemaId(read_id(row, &col_name(KinshipRelations::SchemaId))?),
        source_id: EntityId(read_id(row, &col_name(KinshipRelations::SourceId))?),
        target_id: EntityId(read_id(row, &col_name(KinshipRelations::TargetId))?),
    })
}

fn facet_count_from_row(key: &FacetKey, row: &QueryResult) -> KinshipResult<Option<FacetCount>> {
    let count: i64 = row.try_get("", FACET_COUNT)?;
    let value = match key {
        FacetKey::Project => FacetValue::Project {
            project_id: ProjectId(read_id(row, "facet_project_id")?),
            slug: row.try_get("", "facet_slug")?,
            label: row.try_get("", "facet_label")?,
        },
        FacetKey::Schema => FacetValue::Schema {
            schema_id: SchemaId(read_id(row, "facet_schema_id")?),
            name: row.try_get("", "facet_name")?,
            label: row.try_get("", "facet_label")?,
        },
        FacetKey::Property(_) => match read_value(row, "facet_")? {
            Some(value) => FacetValue::Property(value),
            None => return Ok(None),
        },
    };
    Ok(Some(FacetCount {
        value,
        count: u64::try_from(count).unwrap_or_default(),
    }))
}

fn build_connection_url(config: &KinshipConfig, base_dir: &Path) -> KinshipResult<String> {
    match &config.database {
        crate::DatabaseConfig::Sqlite { .. } => {
            let path = config.sqlite_path(base_dir)?;
            Ok(format!("sqlite://{}?mode=rwc", path.display()))
        }
        crate::DatabaseConfig::Postgres { url } => Ok(url.clone()),
        crate::DatabaseConfig::Mysql { url } => Ok(url.clone()),
    }
}
