//! Domain events consumed by the content graph projection.
//!
//! Events arrive already normalized from the event store. Their JSON shape is
//! `{"type": "<EventName>", "payload": {...camelCase fields...}}`.
use serde::{Deserialize, Serialize};

use super::dimension::{DimensionSpacePoint, DimensionSpacePointSet, OriginDimensionSpacePoint};
use super::ids::{
    ContentStreamId, NodeAggregateId, NodeName, NodeTypeName, PropertyName, ReferenceName,
    SubtreeTag,
};
use super::node::NodeAggregateClassification;
use super::properties::SerializedPropertyValues;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStreamWasForked {
    pub source_content_stream_id: ContentStreamId,
    pub new_content_stream_id: ContentStreamId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStreamWasRemoved {
    pub content_stream_id: ContentStreamId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootNodeAggregateWithNodeWasCreated {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub node_type_name: NodeTypeName,
    pub covered_dimension_space_points: DimensionSpacePointSet,
    pub node_aggregate_classification: NodeAggregateClassification,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateWithNodeWasCreated {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub node_type_name: NodeTypeName,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub covered_dimension_space_points: DimensionSpacePointSet,
    pub parent_node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub node_name: Option<NodeName>,
    #[serde(default)]
    pub initial_property_values: SerializedPropertyValues,
    pub node_aggregate_classification: NodeAggregateClassification,
    #[serde(default)]
    pub succeeding_node_aggregate_id: Option<NodeAggregateId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateWasRemoved {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub affected_covered_dimension_space_points: DimensionSpacePointSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePropertiesWereSet {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub property_values: SerializedPropertyValues,
    #[serde(default)]
    pub properties_to_unset: Vec<PropertyName>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReferenceToWrite {
    pub target_node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub properties: Option<SerializedPropertyValues>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeReferencesWereSet {
    pub content_stream_id: ContentStreamId,
    pub source_node_aggregate_id: NodeAggregateId,
    pub affected_source_origin_dimension_space_points: Vec<OriginDimensionSpacePoint>,
    pub reference_name: ReferenceName,
    pub references: Vec<NodeReferenceToWrite>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateNameWasChanged {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub new_node_name: NodeName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateTypeWasChanged {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub new_node_type_name: NodeTypeName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeSpecializationVariantWasCreated {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub source_origin: OriginDimensionSpacePoint,
    pub specialization_origin: OriginDimensionSpacePoint,
    pub specialization_coverage: DimensionSpacePointSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeGeneralizationVariantWasCreated {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub source_origin: OriginDimensionSpacePoint,
    pub generalization_origin: OriginDimensionSpacePoint,
    pub generalization_coverage: DimensionSpacePointSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePeerVariantWasCreated {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub source_origin: OriginDimensionSpacePoint,
    pub peer_origin: OriginDimensionSpacePoint,
    pub peer_coverage: DimensionSpacePointSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeWasTagged {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub affected_dimension_space_points: DimensionSpacePointSet,
    pub tag: SubtreeTag,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtreeWasUntagged {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub affected_dimension_space_points: DimensionSpacePointSet,
    pub tag: SubtreeTag,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateWasDisabled {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub affected_dimension_space_points: DimensionSpacePointSet,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateWasEnabled {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    pub affected_dimension_space_points: DimensionSpacePointSet,
}

/// Where a moved node lands in one covered dimension space point.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageSucceedingSibling {
    pub dimension_space_point: DimensionSpacePoint,
    #[serde(default)]
    pub succeeding_sibling_node_aggregate_id: Option<NodeAggregateId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAggregateWasMoved {
    pub content_stream_id: ContentStreamId,
    pub node_aggregate_id: NodeAggregateId,
    #[serde(default)]
    pub new_parent_node_aggregate_id: Option<NodeAggregateId>,
    pub succeeding_siblings_for_coverage: Vec<CoverageSucceedingSibling>,
}

/// Every event the projection knows how to apply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ContentGraphEvent {
    ContentStreamWasForked(ContentStreamWasForked),
    ContentStreamWasRemoved(ContentStreamWasRemoved),
    RootNodeAggregateWithNodeWasCreated(RootNodeAggregateWithNodeWasCreated),
    NodeAggregateWithNodeWasCreated(NodeAggregateWithNodeWasCreated),
    NodeAggregateWasRemoved(NodeAggregateWasRemoved),
    NodePropertiesWereSet(NodePropertiesWereSet),
    NodeReferencesWereSet(NodeReferencesWereSet),
    NodeAggregateNameWasChanged(NodeAggregateNameWasChanged),
    NodeAggregateTypeWasChanged(NodeAggregateTypeWasChanged),
    NodeSpecializationVariantWasCreated(NodeSpecializationVariantWasCreated),
    NodeGeneralizationVariantWasCreated(NodeGeneralizationVariantWasCreated),
    NodePeerVariantWasCreated(NodePeerVariantWasCreated),
    SubtreeWasTagged(SubtreeWasTagged),
    SubtreeWasUntagged(SubtreeWasUntagged),
    NodeAggregateWasDisabled(NodeAggregateWasDisabled),
    NodeAggregateWasEnabled(NodeAggregateWasEnabled),
    NodeAggregateWasMoved(NodeAggregateWasMoved),
}

impl ContentGraphEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            ContentGraphEvent::ContentStreamWasForked(_) => "ContentStreamWasForked",
            ContentGraphEvent::ContentStreamWasRemoved(_) => "ContentStreamWasRemoved",
            ContentGraphEvent::RootNodeAggregateWithNodeWasCreated(_) => {
                "RootNodeAggregateWithNodeWasCreated"
            }
            ContentGraphEvent::NodeAggregateWithNodeWasCreated(_) => {
                "NodeAggregateWithNodeWasCreated"
            }
            ContentGraphEvent::NodeAggregateWasRemoved(_) => "NodeAggregateWasRemoved",
            ContentGraphEvent::NodePropertiesWereSet(_) => "NodePropertiesWereSet",
            ContentGraphEvent::NodeReferencesWereSet(_) => "NodeReferencesWereSet",
            ContentGraphEvent::NodeAggregateNameWasChanged(_) => "NodeAggregateNameWasChanged",
            ContentGraphEvent::NodeAggregateTypeWasChanged(_) => "NodeAggregateTypeWasChanged",
            ContentGraphEvent::NodeSpecializationVariantWasCreated(_) => {
                "NodeSpecializationVariantWasCreated"
            }
            ContentGraphEvent::NodeGeneralizationVariantWasCreated(_) => {
                "NodeGeneralizationVariantWasCreated"
            }
            ContentGraphEvent::NodePeerVariantWasCreated(_) => "NodePeerVariantWasCreated",
            ContentGraphEvent::SubtreeWasTagged(_) => "SubtreeWasTagged",
            ContentGraphEvent::SubtreeWasUntagged(_) => "SubtreeWasUntagged",
            ContentGraphEvent::NodeAggregateWasDisabled(_) => "NodeAggregateWasDisabled",
            ContentGraphEvent::NodeAggregateWasEnabled(_) => "NodeAggregateWasEnabled",
            ContentGraphEvent::NodeAggregateWasMoved(_) => "NodeAggregateWasMoved",
        }
    }

    /// The content stream the event is applied to. For forks this is the new
    /// stream.
    pub fn content_stream_id(&self) -> &ContentStreamId {
        match self {
            ContentGraphEvent::ContentStreamWasForked(e) => &e.new_content_stream_id,
            ContentGraphEvent::ContentStreamWasRemoved(e) => &e.content_stream_id,
            ContentGraphEvent::RootNodeAggregateWithNodeWasCreated(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateWithNodeWasCreated(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateWasRemoved(e) => &e.content_stream_id,
            ContentGraphEvent::NodePropertiesWereSet(e) => &e.content_stream_id,
            ContentGraphEvent::NodeReferencesWereSet(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateNameWasChanged(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateTypeWasChanged(e) => &e.content_stream_id,
            ContentGraphEvent::NodeSpecializationVariantWasCreated(e) => &e.content_stream_id,
            ContentGraphEvent::NodeGeneralizationVariantWasCreated(e) => &e.content_stream_id,
            ContentGraphEvent::NodePeerVariantWasCreated(e) => &e.content_stream_id,
            ContentGraphEvent::SubtreeWasTagged(e) => &e.content_stream_id,
            ContentGraphEvent::SubtreeWasUntagged(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateWasDisabled(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateWasEnabled(e) => &e.content_stream_id,
            ContentGraphEvent::NodeAggregateWasMoved(e) => &e.content_stream_id,
        }
    }

    /// Content streams whose appliers must be serialized with this event,
    /// in a stable order so concurrent appliers never lock in opposite order.
    pub fn locked_content_stream_ids(&self) -> Vec<&ContentStreamId> {
        let mut ids = match self {
            ContentGraphEvent::ContentStreamWasForked(e) => {
                vec![&e.source_content_stream_id, &e.new_content_stream_id]
            }
            other => vec![other.content_stream_id()],
        };
        ids.sort();
        ids.dedup();
        ids
    }
}
