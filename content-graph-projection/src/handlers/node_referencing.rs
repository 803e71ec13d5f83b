use content_graph_repository::GraphTransaction;
use content_graph_shared::{NodeReferencesWereSet, ReferenceRelationRecord};
use tracing::debug;

use crate::copy_on_write::{copy_on_write, NodePatch};
use crate::errors::ProjectionError;

const NODE_REFERENCES_WERE_SET: &str = "NodeReferencesWereSet";

/// Replaces the named references of every affected source variant with the
/// event's list, at positions `0..n`.
pub(crate) async fn when_node_references_were_set<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeReferencesWereSet,
) -> Result<(), ProjectionError> {
    for origin in &event.affected_source_origin_dimension_space_points {
        let node = tx
            .find_node_record_by_origin(
                &event.content_stream_id,
                origin,
                &event.source_node_aggregate_id,
            )
            .await?
            .ok_or_else(|| {
                ProjectionError::source_node_missing(
                    NODE_REFERENCES_WERE_SET,
                    &event.source_node_aggregate_id,
                    Some(origin.as_dimension_space_point()),
                )
            })?;

        let anchor = copy_on_write(tx, &event.content_stream_id, &node, &NodePatch::Touch).await?;

        tx.delete_reference_relations(anchor, Some(&event.reference_name))
            .await?;

        let references: Vec<ReferenceRelationRecord> = event
            .references
            .iter()
            .zip(0u32..)
            .map(|(reference, position)| ReferenceRelationRecord {
                source_node_anchor: anchor,
                name: event.reference_name.clone(),
                position,
                properties: reference.properties.clone(),
                destination_node_aggregate_id: reference.target_node_aggregate_id.clone(),
            })
            .collect();
        tx.insert_reference_relations(&references).await?;

        debug!(
            source_node_aggregate_id = %event.source_node_aggregate_id,
            origin = %origin,
            reference_name = %event.reference_name,
            reference_count = references.len(),
            "Node references were set"
        );
    }
    Ok(())
}
