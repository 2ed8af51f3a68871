use sea_orm::sea_query::{
    Iden, MysqlQueryBuilder, PostgresQueryBuilder, QueryStatementWriter, SqliteQueryBuilder,
    Value as SeaValue,
};
use sea_orm::{ConnectionTrait, DatabaseBackend, QueryResult, Statement};
use uuid::Uuid;

use kinship_core::{Id, KinshipError, KinshipResult, Value, ValueColumn};

use crate::db::PropertyColumn;

pub(crate) fn id_value(backend: DatabaseBackend, id: Id) -> SeaValue {
    match backend {
        DatabaseBackend::Postgres => SeaValue::from(Uuid::from_bytes(id.as_bytes())),
        DatabaseBackend::MySql => SeaValue::from(id.as_vec()),
        DatabaseBackend::Sqlite => SeaValue::from(id.to_uuid_string()),
        _ => SeaValue::from(id.to_uuid_string()),
    }
}

pub(crate) fn none_id_value(backend: DatabaseBackend) -> SeaValue {
    match backend {
        DatabaseBackend::Postgres => SeaValue::from(Option::<Uuid>::None),
        DatabaseBackend::MySql => SeaValue::from(Option::<Vec<u8>>::None),
        DatabaseBackend::Sqlite => SeaValue::from(Option::<String>::None),
        _ => SeaValue::from(Option::<String>::None),
    }
}

pub(crate) fn opt_id_value(backend: DatabaseBackend, id: Option<Id>) -> SeaValue {
    match id {
        Some(id) => id_value(backend, id),
        None => none_id_value(backend),
    }
}

fn bytes_to_id(bytes: Vec<u8>) -> Option<Id> {
    if bytes.len() == 16 {
        let mut buf = [0u8; 16];
        buf.copy_from_slice(&bytes);
        Some(Id::from_bytes(buf))
    } else {
        None
    }
}

pub(crate) fn read_id(row: &QueryResult, name: &str) -> KinshipResult<Id> {
    if let Ok(value) = row.try_get::<String>("", name) {
        return Id::from_uuid_str(&value);
    }
    if let Ok(value) = row.try_get::<Uuid>("", name) {
        return Ok(Id::from_bytes(*value.as_bytes()));
    }
    if let Ok(value) = row.try_get::<Vec<u8>>("", name) {
        return bytes_to_id(value).ok_or_else(|| KinshipError::storage("invalid id length"));
    }
    Err(KinshipError::storage(format!("unsupported id format in '{name}'")))
}

pub(crate) fn read_opt_id(row: &QueryResult, name: &str) -> KinshipResult<Option<Id>> {
    if let Ok(value) = row.try_get::<Option<String>>("", name) {
        return value.map(|value| Id::from_uuid_str(&value)).transpose();
    }
    if let Ok(value) = row.try_get::<Option<Uuid>>("", name) {
        return Ok(value.map(|value| Id::from_bytes(*value.as_bytes())));
    }
    if let Ok(value) = row.try_get::<Option<Vec<u8>>>("", name) {
        return Ok(value.and_then(bytes_to_id));
    }
    Ok(None)
}

pub(crate) fn col_name(column: impl Iden) -> String {
    column.to_string()
}

pub(crate) fn value_column(column: ValueColumn) -> PropertyColumn {
    match column {
        ValueColumn::String => PropertyColumn::ValueString,
        ValueColumn::Integer => PropertyColumn::ValueInteger,
        ValueColumn::Float => PropertyColumn::ValueFloat,
        ValueColumn::DateTime => PropertyColumn::ValueDatetime,
        ValueColumn::Boolean => PropertyColumn::ValueBoolean,
    }
}

pub(crate) fn sea_value(value: &Value) -> SeaValue {
    match value {
        Value::Str(value) => SeaValue::from(value.clone()),
        Value::Integer(value) => SeaValue::from(*value),
        Value::Float(value) => SeaValue::from(*value),
        Value::DateTime(value) => SeaValue::from(*value),
        Value::Boolean(value) => SeaValue::from(*value),
    }
}

/// Values for the five typed columns, in `PropertyColumn` order; all but one are null.
pub(crate) fn typed_columns(value: &Value) -> [SeaValue; 5] {
    let mut columns = [
        SeaValue::from(Option::<String>::None),
        SeaValue::from(Option::<i64>::None),
        SeaValue::from(Option::<f64>::None),
        SeaValue::from(Option::<i64>::None),
        SeaValue::from(Option::<bool>::None),
    ];
    let slot = match value.column() {
        ValueColumn::String => 0,
        ValueColumn::Integer => 1,
        ValueColumn::Float => 2,
        ValueColumn::DateTime => 3,
        ValueColumn::Boolean => 4,
    };
    columns[slot] = sea_value(value);
    columns
}

/// Lowercased copy of string values, matched by text search.
pub(crate) fn search_text(value: &Value) -> SeaValue {
    match value {
        Value::Str(text) => SeaValue::from(text.to_lowercase()),
        _ => SeaValue::from(Option::<String>::None),
    }
}

/// Reads a property value from the typed columns, using `prefix` before each column name.
pub(crate) fn read_value(row: &QueryResult, prefix: &str) -> KinshipResult<Option<Value>> {
    let column = |name: &str| format!("{prefix}{name}");
    if let Some(value) = row.try_get::<Option<String>>("", &column("value_string"))? {
        return Ok(Some(Value::Str(value)));
    }
    if let Some(value) = row.try_get::<Option<i64>>("", &column("value_integer"))? {
        return Ok(Some(Value::Integer(value)));
    }
    if let Some(value) = row.try_get::<Option<f64>>("", &column("value_float"))? {
        return Ok(Some(Value::Float(value)));
    }
    if let Some(value) = row.try_get::<Option<i64>>("", &column("value_datetime"))? {
        return Ok(Some(Value::DateTime(value)));
    }
    if let Some(value) = row.try_get::<Option<bool>>("", &column("value_boolean"))? {
        return Ok(Some(Value::Boolean(value)));
    }
    Ok(None)
}

pub(crate) fn build_stmt<S: QueryStatementWriter>(
    backend: DatabaseBackend,
    stmt: &S,
) -> (String, sea_orm::sea_query::Values) {
    match backend {
        DatabaseBackend::Sqlite => stmt.build(SqliteQueryBuilder),
        DatabaseBackend::Postgres => stmt.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => stmt.build(MysqlQueryBuilder),
        _ => stmt.build(SqliteQueryBuilder),
    }
}

pub(crate) async fn exec<C, S>(conn: &C, stmt: &S) -> KinshipResult<u64>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let result = conn
        .execute(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn query_all<C, S>(conn: &C, stmt: &S) -> KinshipResult<Vec<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    log::debug!("kinship query: {sql}");
    let rows = conn
        .query_all(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(rows)
}

pub(crate) async fn query_one<C, S>(conn: &C, stmt: &S) -> KinshipResult<Option<QueryResult>>
where
    C: ConnectionTrait,
    S: QueryStatementWriter,
{
    let backend = conn.get_database_backend();
    let (sql, values) = build_stmt(backend, stmt);
    let row = conn
        .query_one(Statement::from_sql_and_values(backend, sql, values))
        .await?;
    Ok(row)
}
