//! Specialization, generalization and peer variants of a node aggregate.
//!
//! All three copy the source variant to a new origin and hand it the
//! hierarchy positions of the dimension space points it now covers. They
//! differ in how the previously visible variant is located.
use content_graph_repository::GraphTransaction;
use content_graph_shared::{
    ContentStreamId, DimensionSpacePointSet, NodeAggregateId, NodeGeneralizationVariantWasCreated,
    NodePeerVariantWasCreated, NodeRecord, NodeSpecializationVariantWasCreated,
    OriginDimensionSpacePoint, RelationAnchorPoint,
};
use tracing::debug;

use super::hierarchy::{connect_to_parent, inherit_restrictions, resolve_sibling_anchor};
use crate::errors::ProjectionError;

struct Variation<'a> {
    event_type: &'static str,
    content_stream_id: &'a ContentStreamId,
    node_aggregate_id: &'a NodeAggregateId,
    source_origin: &'a OriginDimensionSpacePoint,
    target_origin: &'a OriginDimensionSpacePoint,
    coverage: &'a DimensionSpacePointSet,
}

pub(crate) async fn when_node_specialization_variant_was_created<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeSpecializationVariantWasCreated,
) -> Result<(), ProjectionError> {
    let variation = Variation {
        event_type: "NodeSpecializationVariantWasCreated",
        content_stream_id: &event.content_stream_id,
        node_aggregate_id: &event.node_aggregate_id,
        source_origin: &event.source_origin,
        target_origin: &event.specialization_origin,
        coverage: &event.specialization_coverage,
    };
    let (source, variant) = create_variant(tx, &variation).await?;

    // The node visible in the specialization's own point is the one the
    // specialization takes over from, in all of its coverage.
    let old_covering = tx
        .find_node_record_by_coverage(
            variation.content_stream_id,
            variation.target_origin.as_dimension_space_point(),
            variation.node_aggregate_id,
        )
        .await?;

    if let Some(old_covering) = old_covering {
        let old_anchor = old_covering.relation_anchor_point;
        let new_anchor = variant.relation_anchor_point;

        for mut relation in tx
            .find_ingoing_hierarchy_hyperrelations(
                variation.content_stream_id,
                old_anchor,
                Some(variation.coverage),
            )
            .await?
        {
            relation.replace_child_node_anchor(old_anchor, new_anchor);
            tx.update_hierarchy_hyperrelation_children(&relation).await?;
        }

        for relation in tx
            .find_outgoing_hierarchy_hyperrelations(
                variation.content_stream_id,
                old_anchor,
                Some(variation.coverage),
            )
            .await?
        {
            tx.reassign_hierarchy_hyperrelation_parent(&relation, new_anchor)
                .await?;
        }
    }

    add_missing_hierarchy_relations(tx, &variation, &variant).await?;
    copy_references(tx, &variation, &source, &variant).await
}

pub(crate) async fn when_node_generalization_variant_was_created<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeGeneralizationVariantWasCreated,
) -> Result<(), ProjectionError> {
    let variation = Variation {
        event_type: "NodeGeneralizationVariantWasCreated",
        content_stream_id: &event.content_stream_id,
        node_aggregate_id: &event.node_aggregate_id,
        source_origin: &event.source_origin,
        target_origin: &event.generalization_origin,
        coverage: &event.generalization_coverage,
    };
    create_lateral_variant(tx, &variation).await
}

pub(crate) async fn when_node_peer_variant_was_created<T: GraphTransaction>(
    tx: &mut T,
    event: &NodePeerVariantWasCreated,
) -> Result<(), ProjectionError> {
    let variation = Variation {
        event_type: "NodePeerVariantWasCreated",
        content_stream_id: &event.content_stream_id,
        node_aggregate_id: &event.node_aggregate_id,
        source_origin: &event.source_origin,
        target_origin: &event.peer_origin,
        coverage: &event.peer_coverage,
    };
    create_lateral_variant(tx, &variation).await
}

/// Generalizations and peers replace whichever variant is visible in each
/// covered point, point by point.
async fn create_lateral_variant<T: GraphTransaction>(
    tx: &mut T,
    variation: &Variation<'_>,
) -> Result<(), ProjectionError> {
    let (source, variant) = create_variant(tx, variation).await?;
    let new_anchor = variant.relation_anchor_point;

    for dimension_space_point in variation.coverage {
        let Some(old_covering) = tx
            .find_node_record_by_coverage(
                variation.content_stream_id,
                dimension_space_point,
                variation.node_aggregate_id,
            )
            .await?
        else {
            continue;
        };
        let old_anchor = old_covering.relation_anchor_point;

        if let Some(mut ingoing) = tx
            .find_hierarchy_hyperrelation_by_child_node_anchor(
                variation.content_stream_id,
                dimension_space_point,
                old_anchor,
            )
            .await?
        {
            ingoing.replace_child_node_anchor(old_anchor, new_anchor);
            tx.update_hierarchy_hyperrelation_children(&ingoing).await?;
        }

        if let Some(outgoing) = tx
            .find_hierarchy_hyperrelation_by_parent_node_anchor(
                variation.content_stream_id,
                dimension_space_point,
                old_anchor,
            )
            .await?
        {
            tx.reassign_hierarchy_hyperrelation_parent(&outgoing, new_anchor)
                .await?;
        }
    }

    add_missing_hierarchy_relations(tx, variation, &variant).await?;
    copy_references(tx, variation, &source, &variant).await
}

/// Resolves the source variant and inserts its copy at the target origin.
async fn create_variant<T: GraphTransaction>(
    tx: &mut T,
    variation: &Variation<'_>,
) -> Result<(NodeRecord, NodeRecord), ProjectionError> {
    let source = tx
        .find_node_record_by_origin(
            variation.content_stream_id,
            variation.source_origin,
            variation.node_aggregate_id,
        )
        .await?
        .ok_or_else(|| {
            ProjectionError::source_node_missing(
                variation.event_type,
                variation.node_aggregate_id,
                Some(variation.source_origin.as_dimension_space_point()),
            )
        })?;

    let variant = source.copy_to_origin(RelationAnchorPoint::create(), variation.target_origin);
    tx.insert_node_record(&variant).await?;
    Ok((source, variant))
}

/// Attaches the variant in every covered point it has no parent in yet,
/// below the variant of the source's parent visible there and before the
/// source's succeeding sibling, if that is visible there as well.
async fn add_missing_hierarchy_relations<T: GraphTransaction>(
    tx: &mut T,
    variation: &Variation<'_>,
    variant: &NodeRecord,
) -> Result<(), ProjectionError> {
    let mut missing = Vec::new();
    for dimension_space_point in variation.coverage {
        if tx
            .find_hierarchy_hyperrelation_by_child_node_anchor(
                variation.content_stream_id,
                dimension_space_point,
                variant.relation_anchor_point,
            )
            .await?
            .is_none()
        {
            missing.push(dimension_space_point);
        }
    }
    if missing.is_empty() {
        return Ok(());
    }

    let parent = tx
        .find_parent_node_record_by_origin(
            variation.content_stream_id,
            variation.source_origin,
            variation.node_aggregate_id,
        )
        .await?
        .ok_or_else(|| {
            ProjectionError::source_parent_node_missing(
                variation.event_type,
                variation.node_aggregate_id,
                Some(variation.source_origin.as_dimension_space_point()),
            )
        })?;
    let sibling = tx
        .find_succeeding_sibling_node_record_by_origin(
            variation.content_stream_id,
            variation.source_origin,
            variation.node_aggregate_id,
        )
        .await?;
    let child_ids = [variation.node_aggregate_id.clone()];

    for dimension_space_point in missing {
        let parent_in_point = tx
            .find_node_record_by_coverage(
                variation.content_stream_id,
                dimension_space_point,
                &parent.node_aggregate_id,
            )
            .await?
            .ok_or_else(|| {
                ProjectionError::target_parent_node_missing(
                    variation.event_type,
                    &parent.node_aggregate_id,
                    Some(dimension_space_point),
                )
            })?;

        let sibling_anchor = resolve_sibling_anchor(
            tx,
            variation.content_stream_id,
            dimension_space_point,
            sibling.as_ref().map(|sibling| &sibling.node_aggregate_id),
        )
        .await?;

        connect_to_parent(
            tx,
            variation.content_stream_id,
            dimension_space_point,
            parent_in_point.relation_anchor_point,
            variant.relation_anchor_point,
            sibling_anchor,
        )
        .await?;

        inherit_restrictions(
            tx,
            variation.content_stream_id,
            dimension_space_point,
            &parent.node_aggregate_id,
            &child_ids,
        )
        .await?;
    }
    Ok(())
}

async fn copy_references<T: GraphTransaction>(
    tx: &mut T,
    variation: &Variation<'_>,
    source: &NodeRecord,
    variant: &NodeRecord,
) -> Result<(), ProjectionError> {
    let copied = tx
        .copy_reference_relations(source.relation_anchor_point, variant.relation_anchor_point)
        .await?;

    debug!(
        event_type = variation.event_type,
        node_aggregate_id = %variation.node_aggregate_id,
        source_origin = %variation.source_origin,
        target_origin = %variation.target_origin,
        anchor = %variant.relation_anchor_point,
        coverage = variation.coverage.len(),
        reference_count = copied,
        "Node variant was created"
    );
    Ok(())
}
