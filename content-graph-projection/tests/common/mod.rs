//! Fixtures shared by the projection integration tests: an engine over the
//! in-memory store, event builders and read helpers.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Once};

use content_graph_projection::{ProjectionEngine, ProjectionError};
use content_graph_repository::{
    GraphStore, InMemoryGraphStore, InMemoryGraphTransaction, ProjectionHypergraph,
};
use content_graph_shared::{
    ContentGraphEvent, ContentStreamId, ContentStreamWasForked, ContentStreamWasRemoved,
    CoverageSucceedingSibling, DimensionSpacePoint, DimensionSpacePointSet,
    NodeAggregateClassification, NodeAggregateId, NodeAggregateNameWasChanged,
    NodeAggregateTypeWasChanged, NodeAggregateWasDisabled, NodeAggregateWasEnabled,
    NodeAggregateWasMoved, NodeAggregateWasRemoved, NodeAggregateWithNodeWasCreated,
    NodeGeneralizationVariantWasCreated, NodeName, NodePeerVariantWasCreated,
    NodePropertiesWereSet, NodeRecord, NodeReferenceToWrite, NodeReferencesWereSet,
    NodeSpecializationVariantWasCreated, NodeTypeName, OriginDimensionSpacePoint, PropertyName,
    ReferenceName, RelationAnchorPoint, RootNodeAggregateWithNodeWasCreated,
    SerializedPropertyValue, SerializedPropertyValues, SubtreeTag, SubtreeWasTagged,
    SubtreeWasUntagged,
};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Routes handler logs to the test output. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

pub fn dsp(language: &str) -> DimensionSpacePoint {
    DimensionSpacePoint::from_pairs([("language", language)])
}

pub fn origin(language: &str) -> OriginDimensionSpacePoint {
    OriginDimensionSpacePoint::from_pairs([("language", language)])
}

pub fn points(languages: &[&str]) -> DimensionSpacePointSet {
    languages.iter().map(|language| dsp(language)).collect()
}

pub fn cs(id: &str) -> ContentStreamId {
    ContentStreamId::from(id)
}

pub fn agg(id: &str) -> NodeAggregateId {
    NodeAggregateId::from(id)
}

pub fn text(value: &str) -> SerializedPropertyValue {
    SerializedPropertyValue::string(value)
}

pub struct TestGraph {
    pub engine: ProjectionEngine<InMemoryGraphStore>,
}

impl TestGraph {
    pub fn new() -> Self {
        init_tracing();
        Self {
            engine: ProjectionEngine::new(Arc::new(InMemoryGraphStore::new())),
        }
    }

    pub async fn apply(&self, event: ContentGraphEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.engine.apply(&event).await {
            panic!("{event_type} failed: {e}");
        }
    }

    pub async fn try_apply(&self, event: ContentGraphEvent) -> Result<(), ProjectionError> {
        self.engine.apply(&event).await
    }

    /// A read transaction. Drop it before applying further events.
    pub async fn read(&self) -> InMemoryGraphTransaction {
        self.engine.store().begin().await.unwrap()
    }

    pub async fn node(&self, stream: &str, language: &str, id: &str) -> Option<NodeRecord> {
        self.read()
            .await
            .find_node_record_by_coverage(&cs(stream), &dsp(language), &agg(id))
            .await
            .unwrap()
    }

    pub async fn node_by_origin(
        &self,
        stream: &str,
        language: &str,
        id: &str,
    ) -> Option<NodeRecord> {
        self.read()
            .await
            .find_node_record_by_origin(&cs(stream), &origin(language), &agg(id))
            .await
            .unwrap()
    }

    pub async fn child_anchors(
        &self,
        stream: &str,
        language: &str,
        parent: &str,
    ) -> Vec<RelationAnchorPoint> {
        self.read()
            .await
            .find_child_hierarchy_hyperrelation(&cs(stream), &dsp(language), &agg(parent))
            .await
            .unwrap()
            .map(|relation| relation.child_node_anchors)
            .unwrap_or_default()
    }

    /// Aggregate ids of the parent's children in hierarchy order.
    pub async fn children(&self, stream: &str, language: &str, parent: &str) -> Vec<String> {
        let anchors = self.child_anchors(stream, language, parent).await;
        let mut tx = self.read().await;
        let mut ids = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            let node = tx
                .find_node_record_by_relation_anchor_point(anchor)
                .await
                .unwrap()
                .unwrap();
            ids.push(node.node_aggregate_id.to_string());
        }
        ids
    }

    /// Aggregates affected by the restriction `origin_id` carries for `tag`.
    pub async fn restricted(
        &self,
        stream: &str,
        language: &str,
        origin_id: &str,
        tag: &SubtreeTag,
    ) -> Option<BTreeSet<String>> {
        self.read()
            .await
            .find_outgoing_restriction_relations(&cs(stream), &dsp(language).hash(), &agg(origin_id))
            .await
            .unwrap()
            .into_iter()
            .find(|restriction| &restriction.tag == tag)
            .map(|restriction| {
                restriction
                    .affected_node_aggregate_ids
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
    }

    pub async fn is_restricted(&self, stream: &str, language: &str, id: &str) -> bool {
        !self
            .read()
            .await
            .find_ingoing_restriction_relations(&cs(stream), &dsp(language).hash(), &agg(id))
            .await
            .unwrap()
            .is_empty()
    }

    /// `(name, position, destination)` rows hanging off the anchor.
    pub async fn references(&self, anchor: RelationAnchorPoint) -> Vec<(String, u32, String)> {
        self.read()
            .await
            .find_outgoing_reference_relations(anchor)
            .await
            .unwrap()
            .into_iter()
            .map(|reference| {
                (
                    reference.name.to_string(),
                    reference.position,
                    reference.destination_node_aggregate_id.to_string(),
                )
            })
            .collect()
    }

    pub async fn node_count(&self) -> usize {
        self.read().await.count_node_records().await.unwrap()
    }

    pub async fn coverage(&self, stream: &str, id: &str) -> DimensionSpacePointSet {
        self.read()
            .await
            .find_coverage_by_node_aggregate_id(&cs(stream), &agg(id))
            .await
            .unwrap()
    }
}

pub fn title_of(node: &NodeRecord) -> Option<String> {
    node.properties
        .get("title")
        .and_then(|value| value.value.as_str())
        .map(str::to_string)
}

pub fn root_created(stream: &str, id: &str, languages: &[&str]) -> ContentGraphEvent {
    ContentGraphEvent::RootNodeAggregateWithNodeWasCreated(RootNodeAggregateWithNodeWasCreated {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        node_type_name: NodeTypeName::from("Acme:Sites"),
        covered_dimension_space_points: points(languages),
        node_aggregate_classification: NodeAggregateClassification::Root,
    })
}

pub fn node_creation(
    stream: &str,
    id: &str,
    parent: &str,
    origin_language: &str,
    covered: &[&str],
) -> NodeAggregateWithNodeWasCreated {
    NodeAggregateWithNodeWasCreated {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        node_type_name: NodeTypeName::from("Acme:Document"),
        origin_dimension_space_point: origin(origin_language),
        covered_dimension_space_points: points(covered),
        parent_node_aggregate_id: agg(parent),
        node_name: Some(NodeName::from(id)),
        initial_property_values: SerializedPropertyValues::new().with("title", text(id)),
        node_aggregate_classification: NodeAggregateClassification::Regular,
        succeeding_node_aggregate_id: None,
    }
}

pub fn node_created(
    stream: &str,
    id: &str,
    parent: &str,
    origin_language: &str,
    covered: &[&str],
) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateWithNodeWasCreated(node_creation(
        stream,
        id,
        parent,
        origin_language,
        covered,
    ))
}

pub fn node_created_before(
    stream: &str,
    id: &str,
    parent: &str,
    origin_language: &str,
    covered: &[&str],
    succeeding_sibling: &str,
) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateWithNodeWasCreated(NodeAggregateWithNodeWasCreated {
        succeeding_node_aggregate_id: Some(agg(succeeding_sibling)),
        ..node_creation(stream, id, parent, origin_language, covered)
    })
}

pub fn title_set(stream: &str, id: &str, origin_language: &str, title: &str) -> ContentGraphEvent {
    ContentGraphEvent::NodePropertiesWereSet(NodePropertiesWereSet {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        origin_dimension_space_point: origin(origin_language),
        property_values: SerializedPropertyValues::new().with("title", text(title)),
        properties_to_unset: Vec::new(),
    })
}

pub fn properties_set(
    stream: &str,
    id: &str,
    origin_language: &str,
    values: SerializedPropertyValues,
    unset: &[&str],
) -> ContentGraphEvent {
    ContentGraphEvent::NodePropertiesWereSet(NodePropertiesWereSet {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        origin_dimension_space_point: origin(origin_language),
        property_values: values,
        properties_to_unset: unset.iter().map(|name| PropertyName::from(*name)).collect(),
    })
}

pub fn references_set(
    stream: &str,
    id: &str,
    origin_languages: &[&str],
    name: &str,
    targets: &[&str],
) -> ContentGraphEvent {
    ContentGraphEvent::NodeReferencesWereSet(NodeReferencesWereSet {
        content_stream_id: cs(stream),
        source_node_aggregate_id: agg(id),
        affected_source_origin_dimension_space_points: origin_languages
            .iter()
            .map(|language| origin(language))
            .collect(),
        reference_name: ReferenceName::from(name),
        references: targets
            .iter()
            .map(|target| NodeReferenceToWrite {
                target_node_aggregate_id: agg(target),
                properties: None,
            })
            .collect(),
    })
}

pub fn forked(source: &str, new: &str) -> ContentGraphEvent {
    ContentGraphEvent::ContentStreamWasForked(ContentStreamWasForked {
        source_content_stream_id: cs(source),
        new_content_stream_id: cs(new),
    })
}

pub fn stream_removed(stream: &str) -> ContentGraphEvent {
    ContentGraphEvent::ContentStreamWasRemoved(ContentStreamWasRemoved {
        content_stream_id: cs(stream),
    })
}

pub fn removed(stream: &str, id: &str, languages: &[&str]) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateWasRemoved(NodeAggregateWasRemoved {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        affected_covered_dimension_space_points: points(languages),
    })
}

pub fn renamed(stream: &str, id: &str, name: &str) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateNameWasChanged(NodeAggregateNameWasChanged {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        new_node_name: NodeName::from(name),
    })
}

pub fn retyped(stream: &str, id: &str, type_name: &str) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateTypeWasChanged(NodeAggregateTypeWasChanged {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        new_node_type_name: NodeTypeName::from(type_name),
    })
}

pub fn specialized(
    stream: &str,
    id: &str,
    source: &str,
    target: &str,
    coverage: &[&str],
) -> ContentGraphEvent {
    ContentGraphEvent::NodeSpecializationVariantWasCreated(NodeSpecializationVariantWasCreated {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        source_origin: origin(source),
        specialization_origin: origin(target),
        specialization_coverage: points(coverage),
    })
}

pub fn generalized(
    stream: &str,
    id: &str,
    source: &str,
    target: &str,
    coverage: &[&str],
) -> ContentGraphEvent {
    ContentGraphEvent::NodeGeneralizationVariantWasCreated(NodeGeneralizationVariantWasCreated {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        source_origin: origin(source),
        generalization_origin: origin(target),
        generalization_coverage: points(coverage),
    })
}

pub fn peered(
    stream: &str,
    id: &str,
    source: &str,
    target: &str,
    coverage: &[&str],
) -> ContentGraphEvent {
    ContentGraphEvent::NodePeerVariantWasCreated(NodePeerVariantWasCreated {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        source_origin: origin(source),
        peer_origin: origin(target),
        peer_coverage: points(coverage),
    })
}

pub fn tagged(stream: &str, id: &str, languages: &[&str], tag: &str) -> ContentGraphEvent {
    ContentGraphEvent::SubtreeWasTagged(SubtreeWasTagged {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        affected_dimension_space_points: points(languages),
        tag: SubtreeTag::from(tag),
    })
}

pub fn untagged(stream: &str, id: &str, languages: &[&str], tag: &str) -> ContentGraphEvent {
    ContentGraphEvent::SubtreeWasUntagged(SubtreeWasUntagged {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        affected_dimension_space_points: points(languages),
        tag: SubtreeTag::from(tag),
    })
}

pub fn disabled(stream: &str, id: &str, languages: &[&str]) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateWasDisabled(NodeAggregateWasDisabled {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        affected_dimension_space_points: points(languages),
    })
}

pub fn enabled(stream: &str, id: &str, languages: &[&str]) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateWasEnabled(NodeAggregateWasEnabled {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        affected_dimension_space_points: points(languages),
    })
}

/// `siblings` pairs each covered language with the succeeding sibling the
/// node lands before there.
pub fn moved(
    stream: &str,
    id: &str,
    new_parent: Option<&str>,
    siblings: &[(&str, Option<&str>)],
) -> ContentGraphEvent {
    ContentGraphEvent::NodeAggregateWasMoved(NodeAggregateWasMoved {
        content_stream_id: cs(stream),
        node_aggregate_id: agg(id),
        new_parent_node_aggregate_id: new_parent.map(agg),
        succeeding_siblings_for_coverage: siblings
            .iter()
            .map(|&(language, sibling)| CoverageSucceedingSibling {
                dimension_space_point: dsp(language),
                succeeding_sibling_node_aggregate_id: sibling.map(agg),
            })
            .collect(),
    })
}
