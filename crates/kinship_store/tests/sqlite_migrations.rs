use std::collections::HashSet;

use kinship_store::{KinshipConfig, KinshipError, KinshipResult, KinshipStore};
use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tempfile::tempdir;

async fn list_tables(store: &KinshipStore) -> KinshipResult<HashSet<String>> {
    let rows = store
        .connection()
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            "SELECT name FROM sqlite_master WHERE type = 'table'",
        ))
        .await
        .map_err(KinshipError::from)?;
    let mut tables = HashSet::new();
    for row in rows {
        let name: String = row.try_get("", "name").map_err(KinshipError::from)?;
        tables.insert(name);
    }
    Ok(tables)
}

#[tokio::test]
async fn sqlite_migrations_create_catalog_tables() -> KinshipResult<()> {
    let dir = tempdir().expect("tempdir");
    let base = dir.path();
    let config = KinshipConfig::default_sqlite(base.join("kinship.sqlite").to_string_lossy());
    let store = KinshipStore::connect(&config, base).await?;
    let tables = list_tables(&store).await?;
    for table in [
        "kinship_accounts",
        "kinship_projects",
        "kinship_permissions",
        "kinship_schemas",
        "kinship_attributes",
        "kinship_entities",
        "kinship_entity_schemas",
        "kinship_relations",
        "kinship_entity_properties",
        "kinship_relation_properties",
    ] {
        assert!(tables.contains(table), "missing table {table}");
    }
    Ok(())
}

#[tokio::test]
async fn reconnecting_reuses_migrated_database() -> KinshipResult<()> {
    let dir = tempdir().expect("tempdir");
    let base = dir.path();
    let path = base.join("kinship.sqlite");
    let first = KinshipStore::connect_sqlite(&path).await?;
    drop(first);
    let second = KinshipStore::connect_sqlite(&path).await?;
    assert_eq!(second.backend(), DatabaseBackend::Sqlite);
    assert!(list_tables(&second).await?.contains("seaql_migrations"));
    Ok(())
}
