use content_graph_repository::GraphTransaction;
use content_graph_shared::{ContentStreamWasForked, ContentStreamWasRemoved};
use tracing::info;

use crate::errors::ProjectionError;

/// Duplicates the source stream's hierarchy and restriction rows. Node
/// records stay shared until copy-on-write separates them.
pub(crate) async fn when_content_stream_was_forked<T: GraphTransaction>(
    tx: &mut T,
    event: &ContentStreamWasForked,
) -> Result<(), ProjectionError> {
    let (hierarchy_count, restriction_count) = tx
        .fork_content_stream(
            &event.source_content_stream_id,
            &event.new_content_stream_id,
        )
        .await?;

    info!(
        source_content_stream_id = %event.source_content_stream_id,
        new_content_stream_id = %event.new_content_stream_id,
        hierarchy_count,
        restriction_count,
        "Content stream was forked"
    );
    Ok(())
}

/// Drops the stream's hierarchy and restriction rows, then every node record
/// no other stream reaches anymore.
pub(crate) async fn when_content_stream_was_removed<T: GraphTransaction>(
    tx: &mut T,
    event: &ContentStreamWasRemoved,
) -> Result<(), ProjectionError> {
    let released = tx.remove_content_stream(&event.content_stream_id).await?;
    let deleted = tx.delete_orphaned_node_records(&released).await?;

    info!(
        content_stream_id = %event.content_stream_id,
        released_count = released.len(),
        deleted_count = deleted,
        "Content stream was removed"
    );
    Ok(())
}
