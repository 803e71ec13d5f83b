//! Copy-on-write for node records shared between content streams.
//!
//! A forked content stream points at the same node records as its source
//! until one of them is written to. The write then either happens in place,
//! when only one content stream still reaches the record, or on a fresh copy
//! that the writing stream's hierarchy is re-pointed to.
use content_graph_repository::{GraphTransaction, RepositoryError};
use content_graph_shared::{
    ContentStreamId, NodeName, NodeRecord, NodeTypeName, PropertyName, RelationAnchorPoint,
    SerializedPropertyValues,
};
use tracing::debug;

/// A change to the fields of one node record.
#[derive(Clone, Debug, PartialEq)]
pub enum NodePatch {
    /// Merges `values` into the property bag, then removes `unset`.
    MergeProperties {
        values: SerializedPropertyValues,
        unset: Vec<PropertyName>,
    },
    RenameTo(NodeName),
    RetypeTo(NodeTypeName),
    /// Changes nothing. Used to resolve the anchor the writing content
    /// stream owns before touching anchor-scoped rows such as references.
    Touch,
}

impl NodePatch {
    pub fn apply_to(&self, node: &mut NodeRecord) {
        match self {
            NodePatch::MergeProperties { values, unset } => {
                node.properties.merge(values);
                node.properties.unset(unset);
            }
            NodePatch::RenameTo(name) => node.node_name = Some(name.clone()),
            NodePatch::RetypeTo(type_name) => node.node_type_name = type_name.clone(),
            NodePatch::Touch => {}
        }
    }

    fn changes_fields(&self) -> bool {
        !matches!(self, NodePatch::Touch)
    }
}

/// Applies `patch` to `origin_node` as seen from `origin_content_stream_id`
/// and returns the anchor that now represents the node in that stream.
pub async fn copy_on_write<T>(
    tx: &mut T,
    origin_content_stream_id: &ContentStreamId,
    origin_node: &NodeRecord,
    patch: &NodePatch,
) -> Result<RelationAnchorPoint, RepositoryError>
where
    T: GraphTransaction,
{
    let original_anchor = origin_node.relation_anchor_point;
    let coverage = tx.count_content_stream_coverage(original_anchor).await?;

    if coverage <= 1 {
        if patch.changes_fields() {
            let mut node = origin_node.clone();
            patch.apply_to(&mut node);
            tx.update_node_record(&node).await?;
        }
        return Ok(original_anchor);
    }

    let copied_anchor = RelationAnchorPoint::create();
    let mut copy = origin_node.with_relation_anchor_point(copied_anchor);
    patch.apply_to(&mut copy);
    tx.insert_node_record(&copy).await?;

    for mut relation in tx
        .find_ingoing_hierarchy_hyperrelations(origin_content_stream_id, original_anchor, None)
        .await?
    {
        relation.replace_child_node_anchor(original_anchor, copied_anchor);
        tx.update_hierarchy_hyperrelation_children(&relation).await?;
    }

    for relation in tx
        .find_outgoing_hierarchy_hyperrelations(origin_content_stream_id, original_anchor, None)
        .await?
    {
        tx.reassign_hierarchy_hyperrelation_parent(&relation, copied_anchor)
            .await?;
    }

    // The other streams still read the original anchor's references.
    tx.copy_reference_relations(original_anchor, copied_anchor)
        .await?;

    debug!(
        content_stream_id = %origin_content_stream_id,
        node_aggregate_id = %origin_node.node_aggregate_id,
        original_anchor = %original_anchor,
        copied_anchor = %copied_anchor,
        coverage,
        "Copied node record on write"
    );

    Ok(copied_anchor)
}
