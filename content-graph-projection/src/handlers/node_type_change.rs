use content_graph_repository::GraphTransaction;
use content_graph_shared::NodeAggregateTypeWasChanged;
use tracing::debug;

use crate::copy_on_write::{copy_on_write, NodePatch};
use crate::errors::ProjectionError;

const NODE_AGGREGATE_TYPE_WAS_CHANGED: &str = "NodeAggregateTypeWasChanged";

/// Retypes every variant of the aggregate visible in the content stream.
pub(crate) async fn when_node_aggregate_type_was_changed<T: GraphTransaction>(
    tx: &mut T,
    event: &NodeAggregateTypeWasChanged,
) -> Result<(), ProjectionError> {
    let nodes = tx
        .find_node_records_for_node_aggregate(&event.content_stream_id, &event.node_aggregate_id)
        .await?;
    if nodes.is_empty() {
        return Err(ProjectionError::source_node_missing(
            NODE_AGGREGATE_TYPE_WAS_CHANGED,
            &event.node_aggregate_id,
            None,
        ));
    }

    let patch = NodePatch::RetypeTo(event.new_node_type_name.clone());
    for node in &nodes {
        copy_on_write(tx, &event.content_stream_id, node, &patch).await?;
    }

    debug!(
        node_aggregate_id = %event.node_aggregate_id,
        new_node_type_name = %event.new_node_type_name,
        variant_count = nodes.len(),
        "Node aggregate type was changed"
    );
    Ok(())
}
