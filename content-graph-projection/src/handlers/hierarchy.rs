//! Hierarchy and restriction steps shared by several handlers.
use content_graph_repository::{GraphTransaction, RepositoryError};
use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, HierarchyHyperrelationRecord, NodeAggregateId,
    RelationAnchorPoint,
};
use tracing::debug;

/// Adds `child_node_anchor` below `parent_node_anchor` in one dimension
/// space point, before `succeeding_sibling_anchor` or at the end. Creates the
/// parent's hyperrelation if it has no children there yet.
pub(crate) async fn connect_to_parent<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    dimension_space_point: &DimensionSpacePoint,
    parent_node_anchor: RelationAnchorPoint,
    child_node_anchor: RelationAnchorPoint,
    succeeding_sibling_anchor: Option<RelationAnchorPoint>,
) -> Result<(), RepositoryError> {
    match tx
        .find_hierarchy_hyperrelation_by_parent_node_anchor(
            content_stream_id,
            dimension_space_point,
            parent_node_anchor,
        )
        .await?
    {
        Some(mut relation) => {
            relation.add_child_node_anchor(child_node_anchor, succeeding_sibling_anchor);
            tx.update_hierarchy_hyperrelation_children(&relation).await?;
        }
        None => {
            let relation = HierarchyHyperrelationRecord::new(
                content_stream_id.clone(),
                parent_node_anchor,
                dimension_space_point.clone(),
                vec![child_node_anchor],
            );
            tx.insert_hierarchy_hyperrelation(&relation).await?;
        }
    }

    debug!(
        content_stream_id = %content_stream_id,
        dimension_space_point = %dimension_space_point,
        parent = %parent_node_anchor,
        child = %child_node_anchor,
        "Connected node to parent"
    );
    Ok(())
}

/// Removes `child_node_anchor` from `relation`, deleting the relation once it
/// has no children left.
pub(crate) async fn detach_from_parent<T: GraphTransaction>(
    tx: &mut T,
    mut relation: HierarchyHyperrelationRecord,
    child_node_anchor: RelationAnchorPoint,
) -> Result<(), RepositoryError> {
    relation.remove_child_node_anchor(child_node_anchor);
    if relation.is_empty() {
        tx.delete_hierarchy_hyperrelation(&relation).await
    } else {
        tx.update_hierarchy_hyperrelation_children(&relation).await
    }
}

/// Resolves an optional sibling aggregate to the anchor visible in the given
/// dimension space point. Siblings not visible there resolve to `None`.
pub(crate) async fn resolve_sibling_anchor<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    dimension_space_point: &DimensionSpacePoint,
    succeeding_sibling_id: Option<&NodeAggregateId>,
) -> Result<Option<RelationAnchorPoint>, RepositoryError> {
    let Some(sibling_id) = succeeding_sibling_id else {
        return Ok(None);
    };

    Ok(tx
        .find_node_record_by_coverage(content_stream_id, dimension_space_point, sibling_id)
        .await?
        .map(|sibling| sibling.relation_anchor_point))
}

/// Every restriction that affects the parent also affects the given child
/// aggregates.
pub(crate) async fn inherit_restrictions<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    dimension_space_point: &DimensionSpacePoint,
    parent_node_aggregate_id: &NodeAggregateId,
    child_node_aggregate_ids: &[NodeAggregateId],
) -> Result<(), RepositoryError> {
    let restrictions = tx
        .find_ingoing_restriction_relations(
            content_stream_id,
            &dimension_space_point.hash(),
            parent_node_aggregate_id,
        )
        .await?;

    for mut restriction in restrictions {
        let mut changed = false;
        for child in child_node_aggregate_ids {
            changed |= restriction.add_affected_node_aggregate_id(child.clone());
        }
        if changed {
            tx.update_restriction_hyperrelation(&restriction).await?;
        }
    }
    Ok(())
}

/// Strips the aggregate from every restriction that lists it as affected in
/// the given dimension space point.
pub(crate) async fn remove_from_restrictions<T: GraphTransaction>(
    tx: &mut T,
    content_stream_id: &ContentStreamId,
    dimension_space_point: &DimensionSpacePoint,
    node_aggregate_id: &NodeAggregateId,
) -> Result<(), RepositoryError> {
    let restrictions = tx
        .find_ingoing_restriction_relations(
            content_stream_id,
            &dimension_space_point.hash(),
            node_aggregate_id,
        )
        .await?;

    for mut restriction in restrictions {
        restriction.remove_affected_node_aggregate_id(node_aggregate_id);
        tx.update_restriction_hyperrelation(&restriction).await?;
    }
    Ok(())
}
