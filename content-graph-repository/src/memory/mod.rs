//! In-memory implementation of the storage contract.
//!
//! Transactions take an exclusive lock on the whole state and work on a
//! private copy of it, which replaces the shared state on commit. That gives
//! the same all-or-nothing behavior as a database transaction at the cost of
//! serializing every writer, which is fine for tests and local development.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, DimensionSpacePointHash, DimensionSpacePointSet,
    HierarchyHyperrelationRecord, NodeAggregateId, NodeRecord, OriginDimensionSpacePoint,
    ReferenceName, ReferenceRelationRecord, RelationAnchorPoint, RestrictionHyperrelationRecord,
    SubtreeTag,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::errors::RepositoryError;
use crate::interfaces::{
    DescendantNodeAggregateIds, GraphStore, GraphTransaction, GraphWriter, ProjectionHypergraph,
};

type HierarchyKey = (ContentStreamId, DimensionSpacePointHash, RelationAnchorPoint);
type RestrictionKey = (
    ContentStreamId,
    DimensionSpacePointHash,
    NodeAggregateId,
    SubtreeTag,
);
type ReferenceKey = (RelationAnchorPoint, ReferenceName, u32);

fn hierarchy_key(relation: &HierarchyHyperrelationRecord) -> HierarchyKey {
    (
        relation.content_stream_id.clone(),
        relation.dimension_space_point_hash.clone(),
        relation.parent_node_anchor,
    )
}

fn restriction_key(restriction: &RestrictionHyperrelationRecord) -> RestrictionKey {
    (
        restriction.content_stream_id.clone(),
        restriction.dimension_space_point_hash.clone(),
        restriction.origin_node_aggregate_id.clone(),
        restriction.tag.clone(),
    )
}

fn reference_key(reference: &ReferenceRelationRecord) -> ReferenceKey {
    (
        reference.source_node_anchor,
        reference.name.clone(),
        reference.position,
    )
}

/// The four projection tables, keyed the way their primary keys are.
#[derive(Clone, Debug, Default)]
pub(crate) struct GraphState {
    nodes: HashMap<RelationAnchorPoint, NodeRecord>,
    hierarchy: BTreeMap<HierarchyKey, HierarchyHyperrelationRecord>,
    restrictions: BTreeMap<RestrictionKey, RestrictionHyperrelationRecord>,
    references: BTreeMap<ReferenceKey, ReferenceRelationRecord>,
}

impl GraphState {
    fn stream_hierarchy<'a>(
        &'a self,
        content_stream_id: &'a ContentStreamId,
    ) -> impl Iterator<Item = &'a HierarchyHyperrelationRecord> + 'a {
        self.hierarchy
            .values()
            .filter(move |relation| &relation.content_stream_id == content_stream_id)
    }

    fn is_child_in_stream(
        &self,
        content_stream_id: &ContentStreamId,
        anchor: RelationAnchorPoint,
    ) -> bool {
        self.stream_hierarchy(content_stream_id)
            .any(|relation| relation.contains_child_node_anchor(anchor))
    }

    fn is_child_anywhere(&self, anchor: RelationAnchorPoint) -> bool {
        self.hierarchy
            .values()
            .any(|relation| relation.contains_child_node_anchor(anchor))
    }

    fn node_by_coverage(
        &self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        node_aggregate_id: &NodeAggregateId,
    ) -> Option<&NodeRecord> {
        self.stream_hierarchy(content_stream_id)
            .filter(|relation| &relation.dimension_space_point_hash == dimension_space_point_hash)
            .flat_map(|relation| relation.child_node_anchors.iter())
            .filter_map(|anchor| self.nodes.get(anchor))
            .find(|node| &node.node_aggregate_id == node_aggregate_id)
    }
}

/// Storage contract implementation backed by process memory.
#[derive(Clone, Default)]
pub struct InMemoryGraphStore {
    state: Arc<Mutex<GraphState>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    type Transaction = InMemoryGraphTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let guard = self.state.clone().lock_owned().await;
        let working = (*guard).clone();
        Ok(InMemoryGraphTransaction { guard, working })
    }

    async fn setup(&self) -> Result<(), RepositoryError> {
        Ok(())
    }

    async fn reset(&self) -> Result<(), RepositoryError> {
        *self.state.lock().await = GraphState::default();
        Ok(())
    }
}

/// Holds the store lock for its whole lifetime. Writes go to `working` and
/// only reach the shared state on commit.
pub struct InMemoryGraphTransaction {
    guard: OwnedMutexGuard<GraphState>,
    working: GraphState,
}

#[async_trait]
impl GraphTransaction for InMemoryGraphTransaction {
    async fn commit(mut self) -> Result<(), RepositoryError> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[async_trait]
impl ProjectionHypergraph for InMemoryGraphTransaction {
    async fn find_node_record_by_relation_anchor_point(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        Ok(self.working.nodes.get(&anchor).cloned())
    }

    async fn find_node_record_by_origin(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin: &OriginDimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        let origin_hash = origin.hash();
        let state = &self.working;
        Ok(state
            .nodes
            .values()
            .filter(|node| {
                &node.node_aggregate_id == node_aggregate_id
                    && node.origin_dimension_space_point_hash == origin_hash
            })
            .find(|node| state.is_child_in_stream(content_stream_id, node.relation_anchor_point))
            .cloned())
    }

    async fn find_node_record_by_coverage(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        Ok(self
            .working
            .node_by_coverage(
                content_stream_id,
                &dimension_space_point.hash(),
                node_aggregate_id,
            )
            .cloned())
    }

    async fn find_node_records_for_node_aggregate(
        &mut self,
        content_stream_id: &ContentStreamId,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<NodeRecord>, RepositoryError> {
        let state = &self.working;
        let mut nodes: Vec<NodeRecord> = state
            .nodes
            .values()
            .filter(|node| &node.node_aggregate_id == node_aggregate_id)
            .filter(|node| state.is_child_in_stream(content_stream_id, node.relation_anchor_point))
            .cloned()
            .collect();
        nodes.sort_by(|a, b| {
            a.origin_dimension_space_point_hash
                .cmp(&b.origin_dimension_space_point_hash)
                .then(a.relation_anchor_point.cmp(&b.relation_anchor_point))
        });
        Ok(nodes)
    }

    async fn find_hierarchy_hyperrelation_by_parent_node_anchor(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        parent_node_anchor: RelationAnchorPoint,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError> {
        let key = (
            content_stream_id.clone(),
            dimension_space_point.hash(),
            parent_node_anchor,
        );
        Ok(self.working.hierarchy.get(&key).cloned())
    }

    async fn find_hierarchy_hyperrelation_by_child_node_anchor(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        child_node_anchor: RelationAnchorPoint,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError> {
        let hash = dimension_space_point.hash();
        Ok(self
            .working
            .stream_hierarchy(content_stream_id)
            .find(|relation| {
                relation.dimension_space_point_hash == hash
                    && relation.contains_child_node_anchor(child_node_anchor)
            })
            .cloned())
    }

    async fn find_ingoing_hierarchy_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        child_node_anchor: RelationAnchorPoint,
        dimension_space_points: Option<&DimensionSpacePointSet>,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
        Ok(self
            .working
            .stream_hierarchy(content_stream_id)
            .filter(|relation| relation.contains_child_node_anchor(child_node_anchor))
            .filter(|relation| {
                dimension_space_points
                    .map_or(true, |set| set.contains_hash(&relation.dimension_space_point_hash))
            })
            .cloned()
            .collect())
    }

    async fn find_outgoing_hierarchy_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        parent_node_anchor: RelationAnchorPoint,
        dimension_space_points: Option<&DimensionSpacePointSet>,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
        Ok(self
            .working
            .stream_hierarchy(content_stream_id)
            .filter(|relation| relation.parent_node_anchor == parent_node_anchor)
            .filter(|relation| {
                dimension_space_points
                    .map_or(true, |set| set.contains_hash(&relation.dimension_space_point_hash))
            })
            .cloned()
            .collect())
    }

    async fn find_hierarchy_hyperrelations_for_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
        Ok(self
            .working
            .stream_hierarchy(content_stream_id)
            .cloned()
            .collect())
    }

    async fn is_child_node_anchor_in_any_hierarchy(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<bool, RepositoryError> {
        Ok(self.working.is_child_anywhere(anchor))
    }

    async fn count_content_stream_coverage(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<usize, RepositoryError> {
        let streams: BTreeSet<&ContentStreamId> = self
            .working
            .hierarchy
            .values()
            .filter(|relation| relation.contains_child_node_anchor(anchor))
            .map(|relation| &relation.content_stream_id)
            .collect();
        Ok(streams.len())
    }

    async fn find_coverage_by_node_aggregate_id(
        &mut self,
        content_stream_id: &ContentStreamId,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<DimensionSpacePointSet, RepositoryError> {
        let state = &self.working;
        Ok(state
            .stream_hierarchy(content_stream_id)
            .filter(|relation| {
                relation.child_node_anchors.iter().any(|anchor| {
                    state
                        .nodes
                        .get(anchor)
                        .is_some_and(|node| &node.node_aggregate_id == node_aggregate_id)
                })
            })
            .map(|relation| relation.dimension_space_point.clone())
            .collect())
    }

    async fn find_descendant_node_aggregate_ids(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_points: &DimensionSpacePointSet,
        entry_node_aggregate_id: &NodeAggregateId,
    ) -> Result<DescendantNodeAggregateIds, RepositoryError> {
        let state = &self.working;
        let mut descendants = DescendantNodeAggregateIds::new();

        for hash in dimension_space_points.hashes() {
            let Some(entry) =
                state.node_by_coverage(content_stream_id, hash, entry_node_aggregate_id)
            else {
                continue;
            };

            let mut ids = BTreeSet::from([entry.node_aggregate_id.clone()]);
            let mut stack = vec![entry.relation_anchor_point];
            while let Some(parent) = stack.pop() {
                let key = (content_stream_id.clone(), hash.clone(), parent);
                let Some(relation) = state.hierarchy.get(&key) else {
                    continue;
                };
                for child in &relation.child_node_anchors {
                    if let Some(node) = state.nodes.get(child) {
                        if ids.insert(node.node_aggregate_id.clone()) {
                            stack.push(*child);
                        }
                    }
                }
            }
            descendants.insert(hash.clone(), ids);
        }

        Ok(descendants)
    }

    async fn find_ingoing_restriction_relations(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError> {
        Ok(self
            .working
            .restrictions
            .values()
            .filter(|restriction| {
                &restriction.content_stream_id == content_stream_id
                    && &restriction.dimension_space_point_hash == dimension_space_point_hash
                    && restriction.affects(node_aggregate_id)
            })
            .cloned()
            .collect())
    }

    async fn find_outgoing_restriction_relations(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        origin_node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError> {
        Ok(self
            .working
            .restrictions
            .values()
            .filter(|restriction| {
                &restriction.content_stream_id == content_stream_id
                    && &restriction.dimension_space_point_hash == dimension_space_point_hash
                    && &restriction.origin_node_aggregate_id == origin_node_aggregate_id
            })
            .cloned()
            .collect())
    }

    async fn find_restriction_hyperrelations_for_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError> {
        Ok(self
            .working
            .restrictions
            .values()
            .filter(|restriction| &restriction.content_stream_id == content_stream_id)
            .cloned()
            .collect())
    }

    async fn find_outgoing_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
    ) -> Result<Vec<ReferenceRelationRecord>, RepositoryError> {
        Ok(self
            .working
            .references
            .values()
            .filter(|reference| reference.source_node_anchor == source_node_anchor)
            .cloned()
            .collect())
    }

    async fn count_node_records(&mut self) -> Result<usize, RepositoryError> {
        Ok(self.working.nodes.len())
    }
}

#[async_trait]
impl GraphWriter for InMemoryGraphTransaction {
    async fn lock_content_stream(
        &mut self,
        _content_stream_id: &ContentStreamId,
    ) -> Result<(), RepositoryError> {
        // The transaction already holds the store lock.
        Ok(())
    }

    async fn insert_node_record(&mut self, node: &NodeRecord) -> Result<(), RepositoryError> {
        if self.working.nodes.contains_key(&node.relation_anchor_point) {
            return Err(RepositoryError::invalid_record(format!(
                "duplicate node record {}",
                node.relation_anchor_point
            )));
        }
        self.working
            .nodes
            .insert(node.relation_anchor_point, node.clone());
        Ok(())
    }

    async fn update_node_record(&mut self, node: &NodeRecord) -> Result<(), RepositoryError> {
        match self.working.nodes.get_mut(&node.relation_anchor_point) {
            Some(stored) => {
                *stored = node.clone();
                Ok(())
            }
            None => Err(RepositoryError::invalid_record(format!(
                "no node record {}",
                node.relation_anchor_point
            ))),
        }
    }

    async fn delete_orphaned_node_records(
        &mut self,
        anchors: &[RelationAnchorPoint],
    ) -> Result<u64, RepositoryError> {
        let mut deleted = 0;
        for anchor in anchors {
            if self.working.is_child_anywhere(*anchor) {
                continue;
            }
            if self.working.nodes.remove(anchor).is_some() {
                deleted += 1;
            }
            self.working
                .references
                .retain(|_, reference| reference.source_node_anchor != *anchor);
        }
        Ok(deleted)
    }

    async fn insert_hierarchy_hyperrelation(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        let key = hierarchy_key(relation);
        if self.working.hierarchy.contains_key(&key) {
            return Err(RepositoryError::invalid_record(format!(
                "duplicate hierarchy hyperrelation below {} in {}",
                relation.parent_node_anchor, relation.dimension_space_point
            )));
        }
        self.working.hierarchy.insert(key, relation.clone());
        Ok(())
    }

    async fn update_hierarchy_hyperrelation_children(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        match self.working.hierarchy.get_mut(&hierarchy_key(relation)) {
            Some(stored) => {
                stored.child_node_anchors = relation.child_node_anchors.clone();
                Ok(())
            }
            None => Err(RepositoryError::invalid_record(format!(
                "no hierarchy hyperrelation below {} in {}",
                relation.parent_node_anchor, relation.dimension_space_point
            ))),
        }
    }

    async fn reassign_hierarchy_hyperrelation_parent(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
        new_parent_node_anchor: RelationAnchorPoint,
    ) -> Result<(), RepositoryError> {
        let Some(mut stored) = self.working.hierarchy.remove(&hierarchy_key(relation)) else {
            return Err(RepositoryError::invalid_record(format!(
                "no hierarchy hyperrelation below {} in {}",
                relation.parent_node_anchor, relation.dimension_space_point
            )));
        };
        stored.parent_node_anchor = new_parent_node_anchor;
        self.insert_hierarchy_hyperrelation(&stored).await
    }

    async fn delete_hierarchy_hyperrelation(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        self.working.hierarchy.remove(&hierarchy_key(relation));
        Ok(())
    }

    async fn fork_content_stream(
        &mut self,
        source_content_stream_id: &ContentStreamId,
        target_content_stream_id: &ContentStreamId,
    ) -> Result<(u64, u64), RepositoryError> {
        let hierarchy: Vec<HierarchyHyperrelationRecord> = self
            .working
            .stream_hierarchy(source_content_stream_id)
            .map(|relation| HierarchyHyperrelationRecord {
                content_stream_id: target_content_stream_id.clone(),
                ..relation.clone()
            })
            .collect();
        let restrictions: Vec<RestrictionHyperrelationRecord> = self
            .working
            .restrictions
            .values()
            .filter(|restriction| &restriction.content_stream_id == source_content_stream_id)
            .map(|restriction| RestrictionHyperrelationRecord {
                content_stream_id: target_content_stream_id.clone(),
                ..restriction.clone()
            })
            .collect();

        let counts = (hierarchy.len() as u64, restrictions.len() as u64);
        for relation in &hierarchy {
            self.insert_hierarchy_hyperrelation(relation).await?;
        }
        for restriction in restrictions {
            self.working
                .restrictions
                .insert(restriction_key(&restriction), restriction);
        }
        Ok(counts)
    }

    async fn remove_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<RelationAnchorPoint>, RepositoryError> {
        let mut released = Vec::new();
        let mut seen = BTreeSet::new();
        self.working.hierarchy.retain(|_, relation| {
            if &relation.content_stream_id != content_stream_id {
                return true;
            }
            for anchor in &relation.child_node_anchors {
                if seen.insert(*anchor) {
                    released.push(*anchor);
                }
            }
            false
        });
        self.working
            .restrictions
            .retain(|_, restriction| &restriction.content_stream_id != content_stream_id);
        Ok(released)
    }

    async fn upsert_restriction_hyperrelation(
        &mut self,
        restriction: &RestrictionHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        self.working
            .restrictions
            .insert(restriction_key(restriction), restriction.clone());
        Ok(())
    }

    async fn update_restriction_hyperrelation(
        &mut self,
        restriction: &RestrictionHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        match self.working.restrictions.get_mut(&restriction_key(restriction)) {
            Some(stored) => {
                stored.affected_node_aggregate_ids =
                    restriction.affected_node_aggregate_ids.clone();
                Ok(())
            }
            None => Err(RepositoryError::invalid_record(format!(
                "no restriction hyperrelation from {} tagged {}",
                restriction.origin_node_aggregate_id, restriction.tag
            ))),
        }
    }

    async fn delete_outgoing_restriction_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin_node_aggregate_id: &NodeAggregateId,
        tag: Option<&SubtreeTag>,
        dimension_space_points: &DimensionSpacePointSet,
    ) -> Result<u64, RepositoryError> {
        let before = self.working.restrictions.len();
        self.working.restrictions.retain(|_, restriction| {
            let matches = &restriction.content_stream_id == content_stream_id
                && &restriction.origin_node_aggregate_id == origin_node_aggregate_id
                && tag.map_or(true, |tag| &restriction.tag == tag)
                && dimension_space_points.contains_hash(&restriction.dimension_space_point_hash);
            !matches
        });
        Ok((before - self.working.restrictions.len()) as u64)
    }

    async fn insert_reference_relations(
        &mut self,
        references: &[ReferenceRelationRecord],
    ) -> Result<(), RepositoryError> {
        for reference in references {
            let key = reference_key(reference);
            if self.working.references.contains_key(&key) {
                return Err(RepositoryError::invalid_record(format!(
                    "duplicate reference {} at position {} from {}",
                    reference.name, reference.position, reference.source_node_anchor
                )));
            }
            self.working.references.insert(key, reference.clone());
        }
        Ok(())
    }

    async fn delete_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
        name: Option<&ReferenceName>,
    ) -> Result<u64, RepositoryError> {
        let before = self.working.references.len();
        self.working.references.retain(|_, reference| {
            let matches = reference.source_node_anchor == source_node_anchor
                && name.map_or(true, |name| &reference.name == name);
            !matches
        });
        Ok((before - self.working.references.len()) as u64)
    }

    async fn copy_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
        target_node_anchor: RelationAnchorPoint,
    ) -> Result<u64, RepositoryError> {
        let copies: Vec<ReferenceRelationRecord> = self
            .working
            .references
            .values()
            .filter(|reference| reference.source_node_anchor == source_node_anchor)
            .map(|reference| ReferenceRelationRecord {
                source_node_anchor: target_node_anchor,
                ..reference.clone()
            })
            .collect();
        self.insert_reference_relations(&copies).await?;
        Ok(copies.len() as u64)
    }
}
