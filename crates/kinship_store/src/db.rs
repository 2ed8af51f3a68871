use sea_orm::DeriveIden;

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipAccounts {
    Table,
    AccountId,
    Login,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipProjects {
    Table,
    ProjectId,
    Slug,
    Label,
    Private,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipPermissions {
    Table,
    ProjectId,
    AccountId,
    Reader,
    Editor,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipSchemas {
    Table,
    SchemaId,
    ProjectId,
    Name,
    Label,
    Obj,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipAttributes {
    Table,
    AttributeId,
    SchemaId,
    Name,
    Label,
    Datatype,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipEntities {
    Table,
    EntityId,
    ProjectId,
    Status,
    SameAsId,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipEntitySchemas {
    Table,
    EntityId,
    SchemaId,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipRelations {
    Table,
    RelationId,
    ProjectId,
    SchemaId,
    SourceId,
    TargetId,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipEntityProperties {
    Table,
    EntityId,
}

#[derive(DeriveIden, Clone, Copy)]
pub enum KinshipRelationProperties {
    Table,
    RelationId,
}

/// Columns shared by both property tables.
#[derive(DeriveIden, Clone, Copy)]
pub enum PropertyColumn {
    PropertyId,
    AttributeId,
    Name,
    Active,
    ValueString,
    ValueInteger,
    ValueFloat,
    ValueDatetime,
    ValueBoolean,
    SearchText,
}
