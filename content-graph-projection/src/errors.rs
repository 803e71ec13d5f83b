//! Error types for the content graph projection.
use content_graph_repository::RepositoryError;
use content_graph_shared::{DimensionSpacePoint, NodeAggregateId};
use thiserror::Error;

fn location(dimension_space_point: &Option<DimensionSpacePoint>) -> String {
    match dimension_space_point {
        Some(point) => format!(" in {point}"),
        None => String::new(),
    }
}

/// An event could not be applied to the content graph.
///
/// None of these are recovered from: the transaction of the failed event is
/// rolled back and the error is surfaced to whoever drives the replay.
#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(
        "{event_type} could not be applied: source node {node_aggregate_id} is missing{}",
        location(.dimension_space_point)
    )]
    SourceNodeMissing {
        event_type: &'static str,
        node_aggregate_id: NodeAggregateId,
        dimension_space_point: Option<DimensionSpacePoint>,
    },

    #[error(
        "{event_type} could not be applied: parent of source node {node_aggregate_id} is missing{}",
        location(.dimension_space_point)
    )]
    SourceParentNodeMissing {
        event_type: &'static str,
        node_aggregate_id: NodeAggregateId,
        dimension_space_point: Option<DimensionSpacePoint>,
    },

    #[error(
        "{event_type} could not be applied: target parent node {node_aggregate_id} is missing{}",
        location(.dimension_space_point)
    )]
    TargetParentNodeMissing {
        event_type: &'static str,
        node_aggregate_id: NodeAggregateId,
        dimension_space_point: Option<DimensionSpacePoint>,
    },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ProjectionError {
    pub fn source_node_missing(
        event_type: &'static str,
        node_aggregate_id: &NodeAggregateId,
        dimension_space_point: Option<&DimensionSpacePoint>,
    ) -> Self {
        Self::SourceNodeMissing {
            event_type,
            node_aggregate_id: node_aggregate_id.clone(),
            dimension_space_point: dimension_space_point.cloned(),
        }
    }

    pub fn source_parent_node_missing(
        event_type: &'static str,
        node_aggregate_id: &NodeAggregateId,
        dimension_space_point: Option<&DimensionSpacePoint>,
    ) -> Self {
        Self::SourceParentNodeMissing {
            event_type,
            node_aggregate_id: node_aggregate_id.clone(),
            dimension_space_point: dimension_space_point.cloned(),
        }
    }

    pub fn target_parent_node_missing(
        event_type: &'static str,
        node_aggregate_id: &NodeAggregateId,
        dimension_space_point: Option<&DimensionSpacePoint>,
    ) -> Self {
        Self::TargetParentNodeMissing {
            event_type,
            node_aggregate_id: node_aggregate_id.clone(),
            dimension_space_point: dimension_space_point.cloned(),
        }
    }
}
