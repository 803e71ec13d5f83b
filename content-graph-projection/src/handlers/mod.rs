//! One module per event family. Every handler reads and writes through the
//! transaction of the event it applies.
mod content_stream;
mod hierarchy;
mod node_creation;
mod node_disabling;
mod node_modification;
mod node_move;
mod node_referencing;
mod node_removal;
mod node_renaming;
mod node_type_change;
mod node_variation;
mod subtree_tagging;

use content_graph_repository::GraphTransaction;
use content_graph_shared::ContentGraphEvent;

use crate::errors::ProjectionError;

pub(crate) async fn apply_event<T: GraphTransaction>(
    tx: &mut T,
    event: &ContentGraphEvent,
) -> Result<(), ProjectionError> {
    match event {
        ContentGraphEvent::ContentStreamWasForked(e) => {
            content_stream::when_content_stream_was_forked(tx, e).await
        }
        ContentGraphEvent::ContentStreamWasRemoved(e) => {
            content_stream::when_content_stream_was_removed(tx, e).await
        }
        ContentGraphEvent::RootNodeAggregateWithNodeWasCreated(e) => {
            node_creation::when_root_node_aggregate_with_node_was_created(tx, e).await
        }
        ContentGraphEvent::NodeAggregateWithNodeWasCreated(e) => {
            node_creation::when_node_aggregate_with_node_was_created(tx, e).await
        }
        ContentGraphEvent::NodeAggregateWasRemoved(e) => {
            node_removal::when_node_aggregate_was_removed(tx, e).await
        }
        ContentGraphEvent::NodePropertiesWereSet(e) => {
            node_modification::when_node_properties_were_set(tx, e).await
        }
        ContentGraphEvent::NodeReferencesWereSet(e) => {
            node_referencing::when_node_references_were_set(tx, e).await
        }
        ContentGraphEvent::NodeAggregateNameWasChanged(e) => {
            node_renaming::when_node_aggregate_name_was_changed(tx, e).await
        }
        ContentGraphEvent::NodeAggregateTypeWasChanged(e) => {
            node_type_change::when_node_aggregate_type_was_changed(tx, e).await
        }
        ContentGraphEvent::NodeSpecializationVariantWasCreated(e) => {
            node_variation::when_node_specialization_variant_was_created(tx, e).await
        }
        ContentGraphEvent::NodeGeneralizationVariantWasCreated(e) => {
            node_variation::when_node_generalization_variant_was_created(tx, e).await
        }
        ContentGraphEvent::NodePeerVariantWasCreated(e) => {
            node_variation::when_node_peer_variant_was_created(tx, e).await
        }
        ContentGraphEvent::SubtreeWasTagged(e) => {
            subtree_tagging::when_subtree_was_tagged(tx, e).await
        }
        ContentGraphEvent::SubtreeWasUntagged(e) => {
            subtree_tagging::when_subtree_was_untagged(tx, e).await
        }
        ContentGraphEvent::NodeAggregateWasDisabled(e) => {
            node_disabling::when_node_aggregate_was_disabled(tx, e).await
        }
        ContentGraphEvent::NodeAggregateWasEnabled(e) => {
            node_disabling::when_node_aggregate_was_enabled(tx, e).await
        }
        ContentGraphEvent::NodeAggregateWasMoved(e) => {
            node_move::when_node_aggregate_was_moved(tx, e).await
        }
    }
}
