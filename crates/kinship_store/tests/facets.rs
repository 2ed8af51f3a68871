mod support;

use kinship_store::{
    Caller, CandidateKind, DRAFT_STATUS, EntityRecord, FacetResults, FacetValue, GraphQueryApi,
    KinshipConfig, KinshipError, KinshipResult, KinshipStore, LimitsConfig, PUBLISHED_THRESHOLD,
    Project, SchemaDef, Value, ValueType,
};
use support::*;
use tempfile::tempdir;

const LIVE: i32 = PUBLISHED_THRESHOLD;

fn buckets(results: &FacetResults, path: &str) -> Vec<(String, u64)> {
    results
        .get(path)
        .unwrap_or_else(|| panic!("missing facet {path}"))
        .iter()
        .map(|bucket| {
            let label = match &bucket.value {
                FacetValue::Project { slug, .. } => slug.clone(),
                FacetValue::Schema { name, .. } => name.clone(),
                FacetValue::Property(Value::Str(value)) => value.clone(),
                FacetValue::Property(other) => format!("{other:?}"),
            };
            (label, bucket.count)
        })
        .collect()
}

fn pairs(expected: &[(&str, u64)]) -> Vec<(String, u64)> {
    expected
        .iter()
        .map(|(label, count)| (label.to_string(), *count))
        .collect()
}

struct Geo {
    project: Project,
    member: SchemaDef,
    a: EntityRecord,
    b: EntityRecord,
}

async fn seed(store: &KinshipStore) -> KinshipResult<Geo> {
    let geo = project(store, "geo", false).await?;
    let city = schema(store, &geo, "city", CandidateKind::Entity).await?;
    let town = schema(store, &geo, "town", CandidateKind::Entity).await?;
    let member = schema(store, &geo, "member", CandidateKind::Relation).await?;
    let owner = schema(store, &geo, "owner", CandidateKind::Relation).await?;
    let capital = attribute(store, &city, "capital", ValueType::Str).await?;
    let since = attribute(store, &member, "since", ValueType::Integer).await?;

    let a = entity(store, &geo, LIVE, &[&city]).await?;
    let b = entity(store, &geo, LIVE, &[&city]).await?;
    let c = entity(store, &geo, LIVE, &[&city, &town]).await?;
    entity(store, &geo, DRAFT_STATUS, &[&town]).await?;

    set_entity_property(store, &a, &capital, "yes").await?;
    set_entity_property(store, &b, &capital, "no").await?;
    set_entity_property(store, &b, &capital, "yes").await?;
    set_entity_property(store, &c, &capital, "no").await?;

    let ab = relation(store, &geo, &member, &a, &b).await?;
    let ac = relation(store, &geo, &member, &a, &c).await?;
    relation(store, &geo, &owner, &b, &c).await?;
    set_relation_property(store, &ab, &since, 1990i64).await?;
    set_relation_property(store, &ac, &since, 1990i64).await?;

    Ok(Geo {
        project: geo,
        member,
        a,
        b,
    })
}

#[tokio::test]
async fn schema_project_and_property_facets() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    seed(&store).await?;

    let results = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[
                ("facet", "schema"),
                ("facet", "project"),
                ("facet", "properties.capital"),
            ]),
        )
        .await?;
    assert_eq!(
        results.paths().collect::<Vec<_>>(),
        vec!["schema", "project", "properties.capital"]
    );
    assert_eq!(
        buckets(&results, "schema"),
        pairs(&[("city", 3), ("town", 1)])
    );
    assert_eq!(buckets(&results, "project"), pairs(&[("geo", 3)]));
    assert_eq!(
        buckets(&results, "properties.capital"),
        pairs(&[("yes", 2), ("no", 1)])
    );
    Ok(())
}

#[tokio::test]
async fn facets_hop_through_relations() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    seed(&store).await?;

    let results = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[
                ("facet", "outgoing.schema"),
                ("facet", "incoming.schema"),
                ("facet", "outgoing.properties.since"),
            ]),
        )
        .await?;
    assert_eq!(
        buckets(&results, "outgoing.schema"),
        pairs(&[("member", 1), ("owner", 1)])
    );
    assert_eq!(
        buckets(&results, "incoming.schema"),
        pairs(&[("member", 2), ("owner", 1)])
    );
    assert_eq!(
        buckets(&results, "outgoing.properties.since"),
        pairs(&[("Integer(1990)", 1)])
    );
    Ok(())
}

#[tokio::test]
async fn facets_respect_request_filters() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    seed(&store).await?;

    let results = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("schema", "town"), ("facet", "schema")]),
        )
        .await?;
    assert_eq!(
        buckets(&results, "schema"),
        pairs(&[("city", 1), ("town", 1)])
    );

    let capitals = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("property-capital", "yes"), ("facet", "outgoing.schema")]),
        )
        .await?;
    assert_eq!(
        buckets(&capitals, "outgoing.schema"),
        pairs(&[("member", 1), ("owner", 1)])
    );
    Ok(())
}

#[tokio::test]
async fn facets_apply_visibility_to_entities_and_hops() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let geo = seed(&store).await?;
    let secret = project(&store, "secret", true).await?;
    let hidden = schema(&store, &secret, "hidden", CandidateKind::Relation).await?;
    entity(&store, &secret, LIVE, &[]).await?;
    relation(&store, &secret, &hidden, &geo.a, &geo.b).await?;
    let reader = account(&store, "reader").await?;
    grant(&store, &secret, &reader, true, false).await?;

    let request = params(&[("facet", "project"), ("facet", "outgoing.schema")]);
    let anonymous = store.compute_facets(&Caller::anonymous(), &request).await?;
    assert_eq!(buckets(&anonymous, "project"), pairs(&[("geo", 3)]));
    assert_eq!(
        buckets(&anonymous, "outgoing.schema"),
        pairs(&[("member", 1), ("owner", 1)])
    );

    let granted = store
        .compute_facets(&Caller::account(reader.account_id), &request)
        .await?;
    assert_eq!(
        buckets(&granted, "project"),
        pairs(&[("geo", 3), ("secret", 1)])
    );
    assert_eq!(
        buckets(&granted, "outgoing.schema"),
        pairs(&[("hidden", 1), ("member", 1), ("owner", 1)])
    );
    assert_eq!(geo.project.slug, "geo");
    assert_eq!(geo.member.name, "member");
    Ok(())
}

#[tokio::test]
async fn unknown_facets_abort_the_request() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    seed(&store).await?;

    let result = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("facet", "schema"), ("facet", "bogus.path")]),
        )
        .await;
    match result {
        Err(KinshipError::UnknownFacet { path }) => assert_eq!(path, "bogus.path"),
        other => panic!("expected unknown facet, got {other:?}"),
    }

    let nested = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("facet", "outgoing.outgoing.schema")]),
        )
        .await;
    assert!(matches!(nested, Err(KinshipError::UnknownFacet { .. })));
    Ok(())
}

#[tokio::test]
async fn duplicate_and_missing_facets() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    seed(&store).await?;

    let none = store
        .compute_facets(&Caller::anonymous(), &params(&[("schema", "city")]))
        .await?;
    assert!(none.is_empty());

    let twice = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("facet", "project"), ("facet", "project")]),
        )
        .await?;
    assert_eq!(twice.len(), 1);

    let empty_property = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("facet", "properties.population")]),
        )
        .await?;
    assert!(
        empty_property
            .get("properties.population")
            .is_some_and(<[_]>::is_empty)
    );
    Ok(())
}

#[tokio::test]
async fn facet_count_is_limited_by_config() -> KinshipResult<()> {
    let dir = tempdir().expect("tempdir");
    let base = dir.path();
    let mut config = KinshipConfig::default_sqlite(base.join("limits.sqlite").to_string_lossy());
    config.limits = Some(LimitsConfig {
        default_page_size: None,
        max_page_size: None,
        max_facets: Some(1),
    });
    let store = KinshipStore::connect(&config, base).await?;
    let result = store
        .compute_facets(
            &Caller::anonymous(),
            &params(&[("facet", "schema"), ("facet", "project")]),
        )
        .await;
    assert!(matches!(result, Err(KinshipError::Validation { .. })));
    Ok(())
}
