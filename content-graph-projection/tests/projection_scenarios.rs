//! End-to-end properties of the projection, replayed against the in-memory
//! store.
mod common;

use std::collections::BTreeSet;

use common::*;
use content_graph_repository::ProjectionHypergraph;
use content_graph_shared::DimensionSpacePointHash;

const ROOT: &str = "lady-eleonode-rootford";

/// Every (dimension space point, parent) pair has one hyperrelation and every
/// anchor is the child of at most one hyperrelation per point.
async fn assert_anchor_uniqueness(graph: &TestGraph, stream: &str) {
    let relations = graph
        .read()
        .await
        .find_hierarchy_hyperrelations_for_content_stream(&cs(stream))
        .await
        .unwrap();

    let mut parents = BTreeSet::new();
    let mut children: BTreeSet<(DimensionSpacePointHash, String)> = BTreeSet::new();
    for relation in relations {
        assert!(
            parents.insert((
                relation.dimension_space_point_hash.clone(),
                relation.parent_node_anchor.to_string()
            )),
            "duplicate hyperrelation below {}",
            relation.parent_node_anchor
        );
        for child in &relation.child_node_anchors {
            assert!(
                children.insert((relation.dimension_space_point_hash.clone(), child.to_string())),
                "anchor {child} is a child twice in {}",
                relation.dimension_space_point
            );
        }
    }
}

#[tokio::test]
async fn test_fork_then_write_isolates_streams() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en", "de"])).await;
    graph
        .apply(node_created("cs-0", "nody-mc-nodeface", ROOT, "en", &["en"]))
        .await;

    let original = graph.node("cs-0", "en", "nody-mc-nodeface").await.unwrap();
    assert_eq!(
        graph.child_anchors("cs-0", "en", ROOT).await,
        vec![original.relation_anchor_point]
    );

    graph.apply(forked("cs-0", "cs-1")).await;
    assert_eq!(
        graph.child_anchors("cs-1", "en", ROOT).await,
        vec![original.relation_anchor_point]
    );

    graph
        .apply(title_set("cs-1", "nody-mc-nodeface", "en", "changed"))
        .await;

    let in_source = graph.node("cs-0", "en", "nody-mc-nodeface").await.unwrap();
    let in_fork = graph.node("cs-1", "en", "nody-mc-nodeface").await.unwrap();
    assert_eq!(title_of(&in_source).as_deref(), Some("nody-mc-nodeface"));
    assert_eq!(title_of(&in_fork).as_deref(), Some("changed"));
    assert_eq!(in_source.relation_anchor_point, original.relation_anchor_point);
    assert_ne!(in_source.relation_anchor_point, in_fork.relation_anchor_point);
    assert_eq!(
        graph.child_anchors("cs-1", "en", ROOT).await,
        vec![in_fork.relation_anchor_point]
    );

    assert_anchor_uniqueness(&graph, "cs-0").await;
    assert_anchor_uniqueness(&graph, "cs-1").await;
}

#[tokio::test]
async fn test_write_to_unshared_node_happens_in_place() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en"])).await;
    graph
        .apply(node_created("cs-0", "nody-mc-nodeface", ROOT, "en", &["en"]))
        .await;
    let before = graph.node("cs-0", "en", "nody-mc-nodeface").await.unwrap();
    let count = graph.node_count().await;

    graph
        .apply(title_set("cs-0", "nody-mc-nodeface", "en", "changed"))
        .await;

    let after = graph.node("cs-0", "en", "nody-mc-nodeface").await.unwrap();
    assert_eq!(after.relation_anchor_point, before.relation_anchor_point);
    assert_eq!(title_of(&after).as_deref(), Some("changed"));
    assert_eq!(graph.node_count().await, count);
}

#[tokio::test]
async fn test_copied_node_keeps_children_and_references() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en"])).await;
    graph
        .apply(node_created("cs-0", "parent", ROOT, "en", &["en"]))
        .await;
    graph
        .apply(node_created("cs-0", "child", "parent", "en", &["en"]))
        .await;
    graph
        .apply(references_set("cs-0", "parent", &["en"], "related", &["child"]))
        .await;
    graph.apply(forked("cs-0", "cs-1")).await;

    graph.apply(title_set("cs-1", "parent", "en", "changed")).await;

    let copy = graph.node("cs-1", "en", "parent").await.unwrap();
    assert_eq!(graph.children("cs-1", "en", "parent").await, vec!["child"]);
    assert_eq!(graph.children("cs-0", "en", "parent").await, vec!["child"]);
    assert_eq!(
        graph.references(copy.relation_anchor_point).await,
        vec![("related".to_string(), 0, "child".to_string())]
    );
}

#[tokio::test]
async fn test_removal_deletes_subtree_and_references() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en"])).await;
    graph.apply(node_created("cs-0", "a", ROOT, "en", &["en"])).await;
    graph.apply(node_created("cs-0", "child-1", "a", "en", &["en"])).await;
    graph.apply(node_created("cs-0", "child-2", "a", "en", &["en"])).await;
    graph
        .apply(references_set("cs-0", "child-1", &["en"], "related", &["child-2"]))
        .await;
    let child = graph.node("cs-0", "en", "child-1").await.unwrap();
    assert_eq!(graph.node_count().await, 4);

    graph.apply(removed("cs-0", "a", &["en"])).await;

    assert_eq!(graph.node_count().await, 1);
    assert!(graph.node("cs-0", "en", "a").await.is_none());
    assert!(graph.node("cs-0", "en", "child-2").await.is_none());
    assert!(graph.references(child.relation_anchor_point).await.is_empty());
    assert!(graph.children("cs-0", "en", ROOT).await.is_empty());
    assert_anchor_uniqueness(&graph, "cs-0").await;
}

#[tokio::test]
async fn test_removal_in_fork_keeps_source_records() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en"])).await;
    graph.apply(node_created("cs-0", "a", ROOT, "en", &["en"])).await;
    graph.apply(node_created("cs-0", "child", "a", "en", &["en"])).await;
    graph.apply(forked("cs-0", "cs-1")).await;

    graph.apply(removed("cs-1", "a", &["en"])).await;

    assert_eq!(graph.node_count().await, 3);
    assert!(graph.node("cs-1", "en", "a").await.is_none());
    assert!(graph.node("cs-1", "en", "child").await.is_none());
    assert_eq!(graph.children("cs-0", "en", "a").await, vec!["child"]);
}

#[tokio::test]
async fn test_fork_is_shallow() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en", "de"])).await;
    graph
        .apply(node_created("cs-0", "nody-mc-nodeface", ROOT, "en", &["en", "de"]))
        .await;
    graph
        .apply(node_created("cs-0", "sir-david-nodenborough", "nody-mc-nodeface", "en", &["en", "de"]))
        .await;
    graph
        .apply(tagged("cs-0", "nody-mc-nodeface", &["en"], "hidden"))
        .await;
    let count = graph.node_count().await;

    graph.apply(forked("cs-0", "cs-1")).await;

    let mut tx = graph.read().await;
    let source_hierarchy = tx
        .find_hierarchy_hyperrelations_for_content_stream(&cs("cs-0"))
        .await
        .unwrap();
    let fork_hierarchy = tx
        .find_hierarchy_hyperrelations_for_content_stream(&cs("cs-1"))
        .await
        .unwrap();
    let source_restrictions = tx
        .find_restriction_hyperrelations_for_content_stream(&cs("cs-0"))
        .await
        .unwrap();
    let fork_restrictions = tx
        .find_restriction_hyperrelations_for_content_stream(&cs("cs-1"))
        .await
        .unwrap();
    drop(tx);

    assert_eq!(source_hierarchy.len(), 6);
    assert_eq!(fork_hierarchy.len(), source_hierarchy.len());
    assert_eq!(source_restrictions.len(), 1);
    assert_eq!(fork_restrictions.len(), source_restrictions.len());
    assert_eq!(graph.node_count().await, count);

    for language in ["en", "de"] {
        for id in ["nody-mc-nodeface", "sir-david-nodenborough"] {
            assert_eq!(
                graph.node("cs-1", language, id).await,
                graph.node("cs-0", language, id).await
            );
        }
    }
}

#[tokio::test]
async fn test_setting_references_twice_is_idempotent() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["en"])).await;
    for id in ["source", "target-a", "target-b"] {
        graph.apply(node_created("cs-0", id, ROOT, "en", &["en"])).await;
    }
    let source = graph.node("cs-0", "en", "source").await.unwrap();

    let event = references_set("cs-0", "source", &["en"], "related", &["target-a", "target-b"]);
    graph.apply(event.clone()).await;
    let once = graph.references(source.relation_anchor_point).await;
    graph.apply(event).await;
    let twice = graph.references(source.relation_anchor_point).await;

    assert_eq!(once, twice);
    assert_eq!(
        twice,
        vec![
            ("related".to_string(), 0, "target-a".to_string()),
            ("related".to_string(), 1, "target-b".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_specialization_takes_over_its_coverage() {
    let graph = TestGraph::new();
    graph.apply(root_created("cs-0", ROOT, &["de", "gsw"])).await;
    graph
        .apply(node_created("cs-0", "nody-mc-nodeface", ROOT, "de", &["de", "gsw"]))
        .await;
    let general = graph.node("cs-0", "de", "nody-mc-nodeface").await.unwrap();

    graph
        .apply(specialized("cs-0", "nody-mc-nodeface", "de", "gsw", &["gsw"]))
        .await;

    let special = graph.node("cs-0", "gsw", "nody-mc-nodeface").await.unwrap();
    assert_ne!(special.relation_anchor_point, general.relation_anchor_point);
    assert_eq!(special.origin_dimension_space_point, origin("gsw"));
    assert_eq!(
        graph.node("cs-0", "de", "nody-mc-nodeface").await,
        Some(general.clone())
    );

    let general_points: BTreeSet<String> = graph
        .read()
        .await
        .find_ingoing_hierarchy_hyperrelations(&cs("cs-0"), general.relation_anchor_point, None)
        .await
        .unwrap()
        .into_iter()
        .map(|relation| relation.dimension_space_point.to_string())
        .collect();
    assert_eq!(general_points, BTreeSet::from([dsp("de").to_string()]));
    assert_eq!(graph.coverage("cs-0", "nody-mc-nodeface").await.len(), 2);
    assert_anchor_uniqueness(&graph, "cs-0").await;
}
