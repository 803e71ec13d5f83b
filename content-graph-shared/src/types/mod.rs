//! This module defines and re-exports the content graph value types.
mod dimension;
mod events;
mod hierarchy;
mod ids;
mod node;
mod properties;
mod reference;
mod relation_anchor;
mod restriction;

pub use dimension::{
    DimensionSpacePoint, DimensionSpacePointHash, DimensionSpacePointSet,
    OriginDimensionSpacePoint,
};
pub use events::{
    ContentGraphEvent, ContentStreamWasForked, ContentStreamWasRemoved, CoverageSucceedingSibling,
    NodeAggregateNameWasChanged, NodeAggregateTypeWasChanged, NodeAggregateWasDisabled,
    NodeAggregateWasEnabled, NodeAggregateWasMoved, NodeAggregateWasRemoved,
    NodeAggregateWithNodeWasCreated, NodeGeneralizationVariantWasCreated,
    NodePeerVariantWasCreated, NodePropertiesWereSet, NodeReferenceToWrite,
    NodeReferencesWereSet, NodeSpecializationVariantWasCreated,
    RootNodeAggregateWithNodeWasCreated, SubtreeWasTagged, SubtreeWasUntagged,
};
pub use hierarchy::HierarchyHyperrelationRecord;
pub use ids::{
    ContentStreamId, NodeAggregateId, NodeName, NodeTypeName, PropertyName, ReferenceName,
    SubtreeTag,
};
pub use node::{NodeAggregateClassification, NodeRecord, ParseClassificationError};
pub use properties::{SerializedPropertyValue, SerializedPropertyValues};
pub use reference::ReferenceRelationRecord;
pub use relation_anchor::RelationAnchorPoint;
pub use restriction::RestrictionHyperrelationRecord;
