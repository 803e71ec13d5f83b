//! Integration tests for the PostgreSQL graph store.
//!
//! These tests require a real PostgreSQL database and use SQLx test macros
//! to get an isolated database per test. They are ignored by default.
//!
//! Run with: `DATABASE_URL=... cargo test --test postgres_integration -- --ignored`

use std::collections::BTreeSet;
use std::time::Duration;

use content_graph_repository::{
    GraphStore, GraphTransaction, GraphWriter, PostgresGraphStore, ProjectionHypergraph,
};
use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, DimensionSpacePointSet, HierarchyHyperrelationRecord,
    NodeAggregateClassification, NodeAggregateId, NodeRecord, NodeTypeName,
    OriginDimensionSpacePoint, ReferenceName, ReferenceRelationRecord, RelationAnchorPoint,
    RestrictionHyperrelationRecord, SerializedPropertyValue, SerializedPropertyValues, SubtreeTag,
};

fn dimension(language: &str) -> DimensionSpacePoint {
    DimensionSpacePoint::from_pairs([("language", language)])
}

fn make_node(aggregate: &str, language: &str) -> NodeRecord {
    NodeRecord::new(
        RelationAnchorPoint::create(),
        NodeAggregateId::from(aggregate),
        OriginDimensionSpacePoint::new(dimension(language)),
        SerializedPropertyValues::new().with("title", SerializedPropertyValue::string("Hello")),
        NodeTypeName::from("Acme:Document"),
        NodeAggregateClassification::Regular,
        None,
    )
}

async fn setup_store(pool: sqlx::PgPool) -> PostgresGraphStore {
    let store = PostgresGraphStore::from_pool(pool, "test_graph").unwrap();
    store.setup().await.unwrap();
    store
}

/// Writes a root node and one child in `language` into `stream`.
async fn seed_tree(
    store: &PostgresGraphStore,
    stream: &ContentStreamId,
    language: &str,
) -> (NodeRecord, NodeRecord) {
    let root = make_node("root", language);
    let child = make_node("child", language);

    let mut tx = store.begin().await.unwrap();
    tx.insert_node_record(&root).await.unwrap();
    tx.insert_node_record(&child).await.unwrap();
    tx.insert_hierarchy_hyperrelation(&HierarchyHyperrelationRecord::new(
        stream.clone(),
        RelationAnchorPoint::for_root_edge(),
        dimension(language),
        vec![root.relation_anchor_point],
    ))
    .await
    .unwrap();
    tx.insert_hierarchy_hyperrelation(&HierarchyHyperrelationRecord::new(
        stream.clone(),
        root.relation_anchor_point,
        dimension(language),
        vec![child.relation_anchor_point],
    ))
    .await
    .unwrap();
    tx.commit().await.unwrap();

    (root, child)
}

#[sqlx::test]
#[ignore]
async fn test_setup_is_idempotent(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    store.setup().await.unwrap();

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.count_node_records().await.unwrap(), 0);
}

#[sqlx::test]
#[ignore]
async fn test_node_record_round_trip(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    let stream = ContentStreamId::from("live");
    let (_, child) = seed_tree(&store, &stream, "en").await;

    let mut tx = store.begin().await.unwrap();
    let by_anchor = tx
        .find_node_record_by_relation_anchor_point(child.relation_anchor_point)
        .await
        .unwrap();
    let by_coverage = tx
        .find_node_record_by_coverage(&stream, &dimension("en"), &child.node_aggregate_id)
        .await
        .unwrap();
    let by_origin = tx
        .find_node_record_by_origin(
            &stream,
            &child.origin_dimension_space_point,
            &child.node_aggregate_id,
        )
        .await
        .unwrap();

    assert_eq!(by_anchor, Some(child.clone()));
    assert_eq!(by_coverage, Some(child.clone()));
    assert_eq!(by_origin, Some(child));
}

#[sqlx::test]
#[ignore]
async fn test_rollback_on_drop(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_node_record(&make_node("root", "en")).await.unwrap();
    }

    let mut tx = store.begin().await.unwrap();
    assert_eq!(tx.count_node_records().await.unwrap(), 0);
}

#[sqlx::test]
#[ignore]
async fn test_fork_is_shallow(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    let live = ContentStreamId::from("live");
    let user = ContentStreamId::from("user");
    let (_, child) = seed_tree(&store, &live, "en").await;

    let mut tx = store.begin().await.unwrap();
    let counts = tx.fork_content_stream(&live, &user).await.unwrap();
    assert_eq!(counts, (2, 0));
    assert_eq!(tx.count_node_records().await.unwrap(), 2);
    assert_eq!(
        tx.count_content_stream_coverage(child.relation_anchor_point)
            .await
            .unwrap(),
        2
    );
    assert_eq!(
        tx.find_hierarchy_hyperrelations_for_content_stream(&user)
            .await
            .unwrap()
            .len(),
        2
    );
}

#[sqlx::test]
#[ignore]
async fn test_descendants_include_entry_aggregate(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    let stream = ContentStreamId::from("live");
    seed_tree(&store, &stream, "en").await;

    let points: DimensionSpacePointSet = [dimension("en"), dimension("de")].into_iter().collect();
    let mut tx = store.begin().await.unwrap();
    let descendants = tx
        .find_descendant_node_aggregate_ids(&stream, &points, &NodeAggregateId::from("root"))
        .await
        .unwrap();

    assert_eq!(descendants.len(), 1);
    assert_eq!(
        descendants.get(&dimension("en").hash()),
        Some(&BTreeSet::from([
            NodeAggregateId::from("child"),
            NodeAggregateId::from("root"),
        ]))
    );
}

#[sqlx::test]
#[ignore]
async fn test_orphan_cleanup_removes_references(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    let stream = ContentStreamId::from("live");
    let (root, child) = seed_tree(&store, &stream, "en").await;

    let mut tx = store.begin().await.unwrap();
    tx.insert_reference_relations(&[ReferenceRelationRecord {
        source_node_anchor: child.relation_anchor_point,
        name: ReferenceName::from("related"),
        position: 0,
        properties: None,
        destination_node_aggregate_id: NodeAggregateId::from("root"),
    }])
    .await
    .unwrap();

    let relation = tx
        .find_hierarchy_hyperrelation_by_parent_node_anchor(
            &stream,
            &dimension("en"),
            root.relation_anchor_point,
        )
        .await
        .unwrap()
        .unwrap();
    tx.delete_hierarchy_hyperrelation(&relation).await.unwrap();

    let deleted = tx
        .delete_orphaned_node_records(&[child.relation_anchor_point, root.relation_anchor_point])
        .await
        .unwrap();
    assert_eq!(deleted, 1);
    assert!(tx
        .find_outgoing_reference_relations(child.relation_anchor_point)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test]
#[ignore]
async fn test_orphan_cleanup_waits_for_concurrent_copy(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    let live = ContentStreamId::from("live");
    let user = ContentStreamId::from("user");
    let (root, child) = seed_tree(&store, &live, "en").await;
    {
        let mut tx = store.begin().await.unwrap();
        tx.fork_content_stream(&live, &user).await.unwrap();
        tx.commit().await.unwrap();
    }

    // The user stream starts a copy of the shared child.
    let mut copying = store.begin().await.unwrap();
    assert_eq!(
        copying
            .count_content_stream_coverage(child.relation_anchor_point)
            .await
            .unwrap(),
        2
    );

    // Meanwhile the live stream drops its hierarchy row to the child.
    let mut removing = store.begin().await.unwrap();
    let relation = removing
        .find_hierarchy_hyperrelation_by_parent_node_anchor(
            &live,
            &dimension("en"),
            root.relation_anchor_point,
        )
        .await
        .unwrap()
        .unwrap();
    removing.delete_hierarchy_hyperrelation(&relation).await.unwrap();
    let anchor = child.relation_anchor_point;
    let cleanup = tokio::spawn(async move {
        let deleted = removing.delete_orphaned_node_records(&[anchor]).await;
        removing.commit().await.unwrap();
        deleted
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!cleanup.is_finished());

    let copy = make_node("child", "en");
    copying.insert_node_record(&copy).await.unwrap();
    let mut relation = copying
        .find_hierarchy_hyperrelation_by_parent_node_anchor(
            &user,
            &dimension("en"),
            root.relation_anchor_point,
        )
        .await
        .unwrap()
        .unwrap();
    relation.child_node_anchors = vec![copy.relation_anchor_point];
    copying
        .update_hierarchy_hyperrelation_children(&relation)
        .await
        .unwrap();
    copying.commit().await.unwrap();

    assert_eq!(cleanup.await.unwrap().unwrap(), 1);
    let mut tx = store.begin().await.unwrap();
    assert!(tx
        .find_node_record_by_relation_anchor_point(child.relation_anchor_point)
        .await
        .unwrap()
        .is_none());
    assert_eq!(tx.count_node_records().await.unwrap(), 2);
}

#[sqlx::test]
#[ignore]
async fn test_restrictions_are_keyed_by_tag(pool: sqlx::PgPool) {
    let store = setup_store(pool).await;
    let stream = ContentStreamId::from("live");
    let origin = NodeAggregateId::from("root");
    let hash = dimension("en").hash();

    let mut tx = store.begin().await.unwrap();
    for tag in [SubtreeTag::disabled(), SubtreeTag::from("archived")] {
        tx.upsert_restriction_hyperrelation(&RestrictionHyperrelationRecord::new(
            stream.clone(),
            hash.clone(),
            origin.clone(),
            tag,
            BTreeSet::from([origin.clone(), NodeAggregateId::from("child")]),
        ))
        .await
        .unwrap();
    }

    let ingoing = tx
        .find_ingoing_restriction_relations(&stream, &hash, &NodeAggregateId::from("child"))
        .await
        .unwrap();
    assert_eq!(ingoing.len(), 2);

    let points: DimensionSpacePointSet = [dimension("en")].into_iter().collect();
    let deleted = tx
        .delete_outgoing_restriction_hyperrelations(&stream, &origin, None, &points)
        .await
        .unwrap();
    assert_eq!(deleted, 2);
}
