mod support;

use kinship_store::{
    Caller, CandidateKind, DRAFT_STATUS, GraphQueryApi, GraphWriteApi, KinshipResult,
    PUBLISHED_THRESHOLD, RequestParams,
};
use support::*;

#[tokio::test]
async fn reader_needs_published_status_in_private_project() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let private = project(&store, "secret", true).await?;
    let reader = account(&store, "reader").await?;
    grant(&store, &private, &reader, true, false).await?;
    let e1 = entity(&store, &private, PUBLISHED_THRESHOLD, &[]).await?;

    let as_reader = Caller::account(reader.account_id);
    let none = RequestParams::new();
    let visible = store.list_entities(&as_reader, &none).await?;
    assert_eq!(entity_ids(&visible), vec![e1.entity_id]);
    assert!(
        store
            .list_entities(&Caller::anonymous(), &none)
            .await?
            .is_empty()
    );

    store
        .set_entity_status(e1.entity_id, PUBLISHED_THRESHOLD - 1)
        .await?;
    assert!(store.list_entities(&as_reader, &none).await?.is_empty());
    assert_eq!(store.count_entities(&as_reader, &none).await?, 0);
    Ok(())
}

#[tokio::test]
async fn public_published_entities_are_visible_to_everyone() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let open = project(&store, "open", false).await?;
    let stranger = account(&store, "stranger").await?;
    let published = entity(&store, &open, PUBLISHED_THRESHOLD + 1, &[]).await?;
    entity(&store, &open, DRAFT_STATUS, &[]).await?;

    for caller in [Caller::anonymous(), Caller::account(stranger.account_id)] {
        let visible = store.list_entities(&caller, &RequestParams::new()).await?;
        assert_eq!(entity_ids(&visible), vec![published.entity_id]);
    }
    Ok(())
}

#[tokio::test]
async fn ungranted_accounts_see_nothing_in_private_projects() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let private = project(&store, "vault", true).await?;
    let other = project(&store, "other", true).await?;
    let outsider = account(&store, "outsider").await?;
    grant(&store, &other, &outsider, true, true).await?;
    entity(&store, &private, PUBLISHED_THRESHOLD, &[]).await?;

    let visible = store
        .list_entities(&Caller::account(outsider.account_id), &RequestParams::new())
        .await?;
    assert!(visible.is_empty());
    Ok(())
}

#[tokio::test]
async fn editors_see_drafts_regardless_of_status() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let private = project(&store, "drafts", true).await?;
    let editor = account(&store, "editor").await?;
    grant(&store, &private, &editor, false, true).await?;
    let draft = entity(&store, &private, DRAFT_STATUS, &[]).await?;
    let published = entity(&store, &private, PUBLISHED_THRESHOLD, &[]).await?;

    let visible = store
        .list_entities(&Caller::account(editor.account_id), &RequestParams::new())
        .await?;
    assert_eq!(
        entity_ids(&visible),
        sorted(vec![draft.entity_id, published.entity_id])
    );

    grant(&store, &private, &editor, false, false).await?;
    let revoked = store
        .list_entities(&Caller::account(editor.account_id), &RequestParams::new())
        .await?;
    assert!(revoked.is_empty());
    Ok(())
}

#[tokio::test]
async fn merged_entities_never_appear() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let open = project(&store, "merge", false).await?;
    let editor = account(&store, "merger").await?;
    grant(&store, &open, &editor, true, true).await?;
    let keep = entity(&store, &open, PUBLISHED_THRESHOLD, &[]).await?;
    let gone = entity(&store, &open, PUBLISHED_THRESHOLD, &[]).await?;
    store.merge_entity(gone.entity_id, keep.entity_id).await?;

    for caller in [Caller::anonymous(), Caller::account(editor.account_id)] {
        let visible = store.list_entities(&caller, &RequestParams::new()).await?;
        assert_eq!(entity_ids(&visible), vec![keep.entity_id]);
        assert_eq!(store.count_entities(&caller, &RequestParams::new()).await?, 1);
    }
    Ok(())
}

#[tokio::test]
async fn relation_visibility_ignores_endpoint_status() -> KinshipResult<()> {
    let (_dir, store) = open_store().await?;
    let open = project(&store, "public-graph", false).await?;
    let closed = project(&store, "private-graph", true).await?;
    let reader = account(&store, "relations-reader").await?;
    grant(&store, &closed, &reader, true, false).await?;

    let open_link = schema(&store, &open, "link", CandidateKind::Relation).await?;
    let closed_link = schema(&store, &closed, "link", CandidateKind::Relation).await?;
    let a = entity(&store, &open, DRAFT_STATUS, &[]).await?;
    let b = entity(&store, &open, DRAFT_STATUS, &[]).await?;
    let c = entity(&store, &closed, DRAFT_STATUS, &[]).await?;
    let d = entity(&store, &closed, DRAFT_STATUS, &[]).await?;
    let public_rel = relation(&store, &open, &open_link, &a, &b).await?;
    let private_rel = relation(&store, &closed, &closed_link, &c, &d).await?;

    let anonymous = store
        .list_relations(&Caller::anonymous(), &RequestParams::new())
        .await?;
    assert_eq!(relation_ids(&anonymous), vec![public_rel.relation_id]);

    let as_reader = Caller::account(reader.account_id);
    let granted = store.list_relations(&as_reader, &RequestParams::new()).await?;
    assert_eq!(
        relation_ids(&granted),
        sorted(vec![public_rel.relation_id, private_rel.relation_id])
    );
    assert_eq!(
        store.count_relations(&as_reader, &RequestParams::new()).await?,
        2
    );
    Ok(())
}
