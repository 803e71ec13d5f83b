use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dimension::{DimensionSpacePointHash, OriginDimensionSpacePoint};
use super::ids::{NodeAggregateId, NodeName, NodeTypeName};
use super::properties::SerializedPropertyValues;
use super::relation_anchor::RelationAnchorPoint;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeAggregateClassification {
    Root,
    Regular,
    Tethered,
}

impl NodeAggregateClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeAggregateClassification::Root => "root",
            NodeAggregateClassification::Regular => "regular",
            NodeAggregateClassification::Tethered => "tethered",
        }
    }
}

impl fmt::Display for NodeAggregateClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("Invalid node aggregate classification: {0}")]
pub struct ParseClassificationError(String);

impl FromStr for NodeAggregateClassification {
    type Err = ParseClassificationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(NodeAggregateClassification::Root),
            "regular" => Ok(NodeAggregateClassification::Regular),
            "tethered" => Ok(NodeAggregateClassification::Tethered),
            other => Err(ParseClassificationError(other.to_string())),
        }
    }
}

/// One content node's state at one origin dimension space point.
///
/// A record is shared by every content stream whose hierarchy still points at
/// its anchor; it is only mutated in place once a single stream owns it.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    pub relation_anchor_point: RelationAnchorPoint,
    pub node_aggregate_id: NodeAggregateId,
    pub origin_dimension_space_point: OriginDimensionSpacePoint,
    pub origin_dimension_space_point_hash: DimensionSpacePointHash,
    pub properties: SerializedPropertyValues,
    pub node_type_name: NodeTypeName,
    pub classification: NodeAggregateClassification,
    pub node_name: Option<NodeName>,
}

impl NodeRecord {
    pub fn new(
        relation_anchor_point: RelationAnchorPoint,
        node_aggregate_id: NodeAggregateId,
        origin_dimension_space_point: OriginDimensionSpacePoint,
        properties: SerializedPropertyValues,
        node_type_name: NodeTypeName,
        classification: NodeAggregateClassification,
        node_name: Option<NodeName>,
    ) -> Self {
        let origin_dimension_space_point_hash = origin_dimension_space_point.hash();
        Self {
            relation_anchor_point,
            node_aggregate_id,
            origin_dimension_space_point,
            origin_dimension_space_point_hash,
            properties,
            node_type_name,
            classification,
            node_name,
        }
    }

    /// Full copy of this record under another anchor.
    pub fn with_relation_anchor_point(&self, relation_anchor_point: RelationAnchorPoint) -> Self {
        Self {
            relation_anchor_point,
            ..self.clone()
        }
    }

    /// Full copy of this record as a new variant originating in `origin`.
    pub fn copy_to_origin(
        &self,
        relation_anchor_point: RelationAnchorPoint,
        origin: &OriginDimensionSpacePoint,
    ) -> Self {
        Self {
            relation_anchor_point,
            origin_dimension_space_point: origin.clone(),
            origin_dimension_space_point_hash: origin.hash(),
            ..self.clone()
        }
    }
}
