use content_graph_repository::GraphTransaction;
use content_graph_shared::NodePropertiesWereSet;
use tracing::debug;

use crate::copy_on_write::{copy_on_write, NodePatch};
use crate::errors::ProjectionError;

const NODE_PROPERTIES_WERE_SET: &str = "NodePropertiesWereSet";

pub(crate) async fn when_node_properties_were_set<T: GraphTransaction>(
    tx: &mut T,
    event: &NodePropertiesWereSet,
) -> Result<(), ProjectionError> {
    let node = tx
        .find_node_record_by_origin(
            &event.content_stream_id,
            &event.origin_dimension_space_point,
            &event.node_aggregate_id,
        )
        .await?
        .ok_or_else(|| {
            ProjectionError::source_node_missing(
                NODE_PROPERTIES_WERE_SET,
                &event.node_aggregate_id,
                Some(event.origin_dimension_space_point.as_dimension_space_point()),
            )
        })?;

    let patch = NodePatch::MergeProperties {
        values: event.property_values.clone(),
        unset: event.properties_to_unset.clone(),
    };
    let anchor = copy_on_write(tx, &event.content_stream_id, &node, &patch).await?;

    debug!(
        node_aggregate_id = %event.node_aggregate_id,
        anchor = %anchor,
        set_count = event.property_values.len(),
        unset_count = event.properties_to_unset.len(),
        "Node properties were set"
    );
    Ok(())
}
