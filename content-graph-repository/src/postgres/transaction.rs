use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use content_graph_shared::{
    ContentStreamId, DimensionSpacePoint, DimensionSpacePointHash, DimensionSpacePointSet,
    HierarchyHyperrelationRecord, NodeAggregateId, NodeRecord, OriginDimensionSpacePoint,
    ReferenceName, ReferenceRelationRecord, RelationAnchorPoint, RestrictionHyperrelationRecord,
    SubtreeTag,
};
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;
use uuid::Uuid;

use super::rows::{
    anchors_to_db, position_to_db, HierarchyRow, NodeRow, ReferenceRow, RestrictionRow,
    HIERARCHY_COLUMNS, NODE_COLUMNS, REFERENCE_COLUMNS, RESTRICTION_COLUMNS,
};
use super::TableNames;
use crate::errors::RepositoryError;
use crate::interfaces::{
    DescendantNodeAggregateIds, GraphTransaction, GraphWriter, ProjectionHypergraph,
};

fn hashes_to_db(set: &DimensionSpacePointSet) -> Vec<String> {
    set.hashes().map(|hash| hash.as_str().to_string()).collect()
}

fn to_nodes(rows: Vec<NodeRow>) -> Result<Vec<NodeRecord>, RepositoryError> {
    rows.into_iter().map(NodeRecord::try_from).collect()
}

fn to_hierarchy(
    rows: Vec<HierarchyRow>,
) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
    rows.into_iter()
        .map(HierarchyHyperrelationRecord::try_from)
        .collect()
}

/// A database transaction plus the table names every statement targets.
pub struct PostgresGraphTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
    tables: Arc<TableNames>,
}

impl PostgresGraphTransaction {
    pub(super) fn new(tx: sqlx::Transaction<'static, Postgres>, tables: Arc<TableNames>) -> Self {
        Self { tx, tables }
    }

    /// Row locks on node records, held until commit or rollback.
    async fn lock_node_records(
        &mut self,
        anchors: &[RelationAnchorPoint],
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            SELECT relation_anchor_point FROM {}
            WHERE relation_anchor_point = ANY($1)
            ORDER BY relation_anchor_point
            FOR UPDATE
            "#,
            self.tables.node
        );
        sqlx::query(&sql)
            .bind(anchors_to_db(anchors))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl GraphTransaction for PostgresGraphTransaction {
    async fn commit(self) -> Result<(), RepositoryError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl ProjectionHypergraph for PostgresGraphTransaction {
    async fn find_node_record_by_relation_anchor_point(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        let sql = format!(
            "SELECT {NODE_COLUMNS} FROM {} n WHERE n.relation_anchor_point = $1",
            self.tables.node
        );
        sqlx::query_as::<_, NodeRow>(&sql)
            .bind(anchor.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(NodeRecord::try_from)
            .transpose()
    }

    async fn find_node_record_by_origin(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin: &OriginDimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {NODE_COLUMNS} FROM {} n
            WHERE n.node_aggregate_id = $1
              AND n.origin_dimension_space_point_hash = $2
              AND EXISTS (
                  SELECT 1 FROM {} h
                  WHERE h.content_stream_id = $3
                    AND n.relation_anchor_point = ANY(h.child_node_anchors)
              )
            LIMIT 1
            "#,
            self.tables.node, self.tables.hierarchy_hyperrelation
        );
        sqlx::query_as::<_, NodeRow>(&sql)
            .bind(node_aggregate_id.as_str())
            .bind(origin.hash().as_str())
            .bind(content_stream_id.as_str())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(NodeRecord::try_from)
            .transpose()
    }

    async fn find_node_record_by_coverage(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Option<NodeRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {NODE_COLUMNS} FROM {} n
            JOIN {} h ON n.relation_anchor_point = ANY(h.child_node_anchors)
            WHERE h.content_stream_id = $1
              AND h.dimension_space_point_hash = $2
              AND n.node_aggregate_id = $3
            LIMIT 1
            "#,
            self.tables.node, self.tables.hierarchy_hyperrelation
        );
        sqlx::query_as::<_, NodeRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(dimension_space_point.hash().as_str())
            .bind(node_aggregate_id.as_str())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(NodeRecord::try_from)
            .transpose()
    }

    async fn find_node_records_for_node_aggregate(
        &mut self,
        content_stream_id: &ContentStreamId,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<NodeRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {NODE_COLUMNS} FROM {} n
            WHERE n.node_aggregate_id = $1
              AND EXISTS (
                  SELECT 1 FROM {} h
                  WHERE h.content_stream_id = $2
                    AND n.relation_anchor_point = ANY(h.child_node_anchors)
              )
            ORDER BY n.origin_dimension_space_point_hash, n.relation_anchor_point
            "#,
            self.tables.node, self.tables.hierarchy_hyperrelation
        );
        let rows = sqlx::query_as::<_, NodeRow>(&sql)
            .bind(node_aggregate_id.as_str())
            .bind(content_stream_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;
        to_nodes(rows)
    }

    async fn find_hierarchy_hyperrelation_by_parent_node_anchor(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        parent_node_anchor: RelationAnchorPoint,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {HIERARCHY_COLUMNS} FROM {} h
            WHERE h.content_stream_id = $1
              AND h.dimension_space_point_hash = $2
              AND h.parent_node_anchor = $3
            "#,
            self.tables.hierarchy_hyperrelation
        );
        sqlx::query_as::<_, HierarchyRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(dimension_space_point.hash().as_str())
            .bind(parent_node_anchor.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(HierarchyHyperrelationRecord::try_from)
            .transpose()
    }

    async fn find_hierarchy_hyperrelation_by_child_node_anchor(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point: &DimensionSpacePoint,
        child_node_anchor: RelationAnchorPoint,
    ) -> Result<Option<HierarchyHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {HIERARCHY_COLUMNS} FROM {} h
            WHERE h.content_stream_id = $1
              AND h.dimension_space_point_hash = $2
              AND $3 = ANY(h.child_node_anchors)
            "#,
            self.tables.hierarchy_hyperrelation
        );
        sqlx::query_as::<_, HierarchyRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(dimension_space_point.hash().as_str())
            .bind(child_node_anchor.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await?
            .map(HierarchyHyperrelationRecord::try_from)
            .transpose()
    }

    async fn find_ingoing_hierarchy_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        child_node_anchor: RelationAnchorPoint,
        dimension_space_points: Option<&DimensionSpacePointSet>,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {HIERARCHY_COLUMNS} FROM {} h
            WHERE h.content_stream_id = $1
              AND $2 = ANY(h.child_node_anchors)
              AND ($3::text[] IS NULL OR h.dimension_space_point_hash = ANY($3))
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let rows = sqlx::query_as::<_, HierarchyRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(child_node_anchor.as_uuid())
            .bind(dimension_space_points.map(hashes_to_db))
            .fetch_all(&mut *self.tx)
            .await?;
        to_hierarchy(rows)
    }

    async fn find_outgoing_hierarchy_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        parent_node_anchor: RelationAnchorPoint,
        dimension_space_points: Option<&DimensionSpacePointSet>,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {HIERARCHY_COLUMNS} FROM {} h
            WHERE h.content_stream_id = $1
              AND h.parent_node_anchor = $2
              AND ($3::text[] IS NULL OR h.dimension_space_point_hash = ANY($3))
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let rows = sqlx::query_as::<_, HierarchyRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(parent_node_anchor.as_uuid())
            .bind(dimension_space_points.map(hashes_to_db))
            .fetch_all(&mut *self.tx)
            .await?;
        to_hierarchy(rows)
    }

    async fn find_hierarchy_hyperrelations_for_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<HierarchyHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {HIERARCHY_COLUMNS} FROM {} h
            WHERE h.content_stream_id = $1
            ORDER BY h.dimension_space_point_hash, h.parent_node_anchor
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let rows = sqlx::query_as::<_, HierarchyRow>(&sql)
            .bind(content_stream_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;
        to_hierarchy(rows)
    }

    async fn is_child_node_anchor_in_any_hierarchy(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<bool, RepositoryError> {
        let sql = format!(
            "SELECT EXISTS (SELECT 1 FROM {} h WHERE $1 = ANY(h.child_node_anchors))",
            self.tables.hierarchy_hyperrelation
        );
        Ok(sqlx::query_scalar::<_, bool>(&sql)
            .bind(anchor.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?)
    }

    async fn count_content_stream_coverage(
        &mut self,
        anchor: RelationAnchorPoint,
    ) -> Result<usize, RepositoryError> {
        self.lock_node_records(&[anchor]).await?;

        let sql = format!(
            r#"
            SELECT COUNT(DISTINCT h.content_stream_id) FROM {} h
            WHERE $1 = ANY(h.child_node_anchors)
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .bind(anchor.as_uuid())
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count as usize)
    }

    async fn find_coverage_by_node_aggregate_id(
        &mut self,
        content_stream_id: &ContentStreamId,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<DimensionSpacePointSet, RepositoryError> {
        let sql = format!(
            r#"
            SELECT DISTINCT h.dimension_space_point FROM {} h
            JOIN {} n ON n.relation_anchor_point = ANY(h.child_node_anchors)
            WHERE h.content_stream_id = $1
              AND n.node_aggregate_id = $2
            "#,
            self.tables.hierarchy_hyperrelation, self.tables.node
        );
        let points = sqlx::query_scalar::<_, serde_json::Value>(&sql)
            .bind(content_stream_id.as_str())
            .bind(node_aggregate_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;

        points
            .into_iter()
            .map(|point| {
                serde_json::from_value::<DimensionSpacePoint>(point).map_err(RepositoryError::from)
            })
            .collect()
    }

    async fn find_descendant_node_aggregate_ids(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_points: &DimensionSpacePointSet,
        entry_node_aggregate_id: &NodeAggregateId,
    ) -> Result<DescendantNodeAggregateIds, RepositoryError> {
        let hierarchy = &self.tables.hierarchy_hyperrelation;
        let node = &self.tables.node;
        let sql = format!(
            r#"
            WITH RECURSIVE subtree (dimension_space_point_hash, relation_anchor_point, node_aggregate_id) AS (
                SELECT h.dimension_space_point_hash, n.relation_anchor_point, n.node_aggregate_id
                FROM {hierarchy} h
                JOIN {node} n ON n.relation_anchor_point = ANY(h.child_node_anchors)
                WHERE h.content_stream_id = $1
                  AND h.dimension_space_point_hash = ANY($2)
                  AND n.node_aggregate_id = $3
                UNION
                SELECT h.dimension_space_point_hash, n.relation_anchor_point, n.node_aggregate_id
                FROM subtree s
                JOIN {hierarchy} h
                  ON h.parent_node_anchor = s.relation_anchor_point
                 AND h.content_stream_id = $1
                 AND h.dimension_space_point_hash = s.dimension_space_point_hash
                JOIN {node} n ON n.relation_anchor_point = ANY(h.child_node_anchors)
            )
            SELECT dimension_space_point_hash, node_aggregate_id FROM subtree
            "#
        );
        let rows = sqlx::query_as::<_, (String, String)>(&sql)
            .bind(content_stream_id.as_str())
            .bind(hashes_to_db(dimension_space_points))
            .bind(entry_node_aggregate_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;

        let mut descendants = DescendantNodeAggregateIds::new();
        for (hash, node_aggregate_id) in rows {
            descendants
                .entry(DimensionSpacePointHash::new(hash))
                .or_insert_with(BTreeSet::new)
                .insert(NodeAggregateId::new(node_aggregate_id));
        }
        Ok(descendants)
    }

    async fn find_ingoing_restriction_relations(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {RESTRICTION_COLUMNS} FROM {} r
            WHERE r.content_stream_id = $1
              AND r.dimension_space_point_hash = $2
              AND $3 = ANY(r.affected_node_aggregate_ids)
            ORDER BY r.origin_node_aggregate_id, r.tag
            "#,
            self.tables.restriction_hyperrelation
        );
        let rows = sqlx::query_as::<_, RestrictionRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(dimension_space_point_hash.as_str())
            .bind(node_aggregate_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_outgoing_restriction_relations(
        &mut self,
        content_stream_id: &ContentStreamId,
        dimension_space_point_hash: &DimensionSpacePointHash,
        origin_node_aggregate_id: &NodeAggregateId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {RESTRICTION_COLUMNS} FROM {} r
            WHERE r.content_stream_id = $1
              AND r.dimension_space_point_hash = $2
              AND r.origin_node_aggregate_id = $3
            ORDER BY r.tag
            "#,
            self.tables.restriction_hyperrelation
        );
        let rows = sqlx::query_as::<_, RestrictionRow>(&sql)
            .bind(content_stream_id.as_str())
            .bind(dimension_space_point_hash.as_str())
            .bind(origin_node_aggregate_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_restriction_hyperrelations_for_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<RestrictionHyperrelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {RESTRICTION_COLUMNS} FROM {} r
            WHERE r.content_stream_id = $1
            ORDER BY r.dimension_space_point_hash, r.origin_node_aggregate_id, r.tag
            "#,
            self.tables.restriction_hyperrelation
        );
        let rows = sqlx::query_as::<_, RestrictionRow>(&sql)
            .bind(content_stream_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_outgoing_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
    ) -> Result<Vec<ReferenceRelationRecord>, RepositoryError> {
        let sql = format!(
            r#"
            SELECT {REFERENCE_COLUMNS} FROM {} ref
            WHERE ref.source_node_anchor = $1
            ORDER BY ref.name, ref.position
            "#,
            self.tables.reference_relation
        );
        let rows = sqlx::query_as::<_, ReferenceRow>(&sql)
            .bind(source_node_anchor.as_uuid())
            .fetch_all(&mut *self.tx)
            .await?;
        rows.into_iter()
            .map(ReferenceRelationRecord::try_from)
            .collect()
    }

    async fn count_node_records(&mut self) -> Result<usize, RepositoryError> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.tables.node);
        let count = sqlx::query_scalar::<_, i64>(&sql)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(count as usize)
    }
}

#[async_trait]
impl GraphWriter for PostgresGraphTransaction {
    async fn lock_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<(), RepositoryError> {
        let key = format!("{}:{}", self.tables.prefix, content_stream_id);
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(&key)
            .execute(&mut *self.tx)
            .await?;
        debug!(content_stream_id = %content_stream_id, "Acquired content stream lock");
        Ok(())
    }

    async fn insert_node_record(&mut self, node: &NodeRecord) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                relation_anchor_point, node_aggregate_id, origin_dimension_space_point,
                origin_dimension_space_point_hash, properties, node_type_name,
                classification, node_name
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
            self.tables.node
        );
        sqlx::query(&sql)
            .bind(node.relation_anchor_point.as_uuid())
            .bind(node.node_aggregate_id.as_str())
            .bind(serde_json::to_value(&node.origin_dimension_space_point)?)
            .bind(node.origin_dimension_space_point_hash.as_str())
            .bind(serde_json::to_value(&node.properties)?)
            .bind(node.node_type_name.as_str())
            .bind(node.classification.as_str())
            .bind(node.node_name.as_ref().map(|name| name.as_str()))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_node_record(&mut self, node: &NodeRecord) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            UPDATE {} SET
                node_aggregate_id = $2,
                origin_dimension_space_point = $3,
                origin_dimension_space_point_hash = $4,
                properties = $5,
                node_type_name = $6,
                classification = $7,
                node_name = $8
            WHERE relation_anchor_point = $1
            "#,
            self.tables.node
        );
        let result = sqlx::query(&sql)
            .bind(node.relation_anchor_point.as_uuid())
            .bind(node.node_aggregate_id.as_str())
            .bind(serde_json::to_value(&node.origin_dimension_space_point)?)
            .bind(node.origin_dimension_space_point_hash.as_str())
            .bind(serde_json::to_value(&node.properties)?)
            .bind(node.node_type_name.as_str())
            .bind(node.classification.as_str())
            .bind(node.node_name.as_ref().map(|name| name.as_str()))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::invalid_record(format!(
                "no node record {}",
                node.relation_anchor_point
            )));
        }
        Ok(())
    }

    async fn delete_orphaned_node_records(
        &mut self,
        anchors: &[RelationAnchorPoint],
    ) -> Result<u64, RepositoryError> {
        if anchors.is_empty() {
            return Ok(0);
        }

        // Separate statement: the delete below must see hierarchy rows that
        // a copy-on-write holding one of these locks committed meanwhile.
        self.lock_node_records(anchors).await?;

        let sql = format!(
            r#"
            DELETE FROM {} n
            WHERE n.relation_anchor_point = ANY($1)
              AND NOT EXISTS (
                  SELECT 1 FROM {} h
                  WHERE n.relation_anchor_point = ANY(h.child_node_anchors)
              )
            RETURNING n.relation_anchor_point
            "#,
            self.tables.node, self.tables.hierarchy_hyperrelation
        );
        let deleted = sqlx::query_scalar::<_, Uuid>(&sql)
            .bind(anchors_to_db(anchors))
            .fetch_all(&mut *self.tx)
            .await?;

        if !deleted.is_empty() {
            let sql = format!(
                "DELETE FROM {} WHERE source_node_anchor = ANY($1)",
                self.tables.reference_relation
            );
            sqlx::query(&sql)
                .bind(deleted.as_slice())
                .execute(&mut *self.tx)
                .await?;
        }

        Ok(deleted.len() as u64)
    }

    async fn insert_hierarchy_hyperrelation(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                content_stream_id, parent_node_anchor, dimension_space_point,
                dimension_space_point_hash, child_node_anchors
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
            self.tables.hierarchy_hyperrelation
        );
        sqlx::query(&sql)
            .bind(relation.content_stream_id.as_str())
            .bind(relation.parent_node_anchor.as_uuid())
            .bind(serde_json::to_value(&relation.dimension_space_point)?)
            .bind(relation.dimension_space_point_hash.as_str())
            .bind(anchors_to_db(&relation.child_node_anchors))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_hierarchy_hyperrelation_children(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            UPDATE {} SET child_node_anchors = $4
            WHERE content_stream_id = $1
              AND dimension_space_point_hash = $2
              AND parent_node_anchor = $3
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let result = sqlx::query(&sql)
            .bind(relation.content_stream_id.as_str())
            .bind(relation.dimension_space_point_hash.as_str())
            .bind(relation.parent_node_anchor.as_uuid())
            .bind(anchors_to_db(&relation.child_node_anchors))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::invalid_record(format!(
                "no hierarchy hyperrelation below {} in {}",
                relation.parent_node_anchor, relation.dimension_space_point
            )));
        }
        Ok(())
    }

    async fn reassign_hierarchy_hyperrelation_parent(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
        new_parent_node_anchor: RelationAnchorPoint,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            UPDATE {} SET parent_node_anchor = $4
            WHERE content_stream_id = $1
              AND dimension_space_point_hash = $2
              AND parent_node_anchor = $3
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let result = sqlx::query(&sql)
            .bind(relation.content_stream_id.as_str())
            .bind(relation.dimension_space_point_hash.as_str())
            .bind(relation.parent_node_anchor.as_uuid())
            .bind(new_parent_node_anchor.as_uuid())
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::invalid_record(format!(
                "no hierarchy hyperrelation below {} in {}",
                relation.parent_node_anchor, relation.dimension_space_point
            )));
        }
        Ok(())
    }

    async fn delete_hierarchy_hyperrelation(
        &mut self,
        relation: &HierarchyHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            DELETE FROM {}
            WHERE content_stream_id = $1
              AND dimension_space_point_hash = $2
              AND parent_node_anchor = $3
            "#,
            self.tables.hierarchy_hyperrelation
        );
        sqlx::query(&sql)
            .bind(relation.content_stream_id.as_str())
            .bind(relation.dimension_space_point_hash.as_str())
            .bind(relation.parent_node_anchor.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn fork_content_stream(
        &mut self,
        source_content_stream_id: &ContentStreamId,
        target_content_stream_id: &ContentStreamId,
    ) -> Result<(u64, u64), RepositoryError> {
        let hierarchy_sql = format!(
            r#"
            INSERT INTO {0} (
                content_stream_id, parent_node_anchor, dimension_space_point,
                dimension_space_point_hash, child_node_anchors
            )
            SELECT $2, parent_node_anchor, dimension_space_point,
                   dimension_space_point_hash, child_node_anchors
            FROM {0}
            WHERE content_stream_id = $1
            "#,
            self.tables.hierarchy_hyperrelation
        );
        let hierarchy = sqlx::query(&hierarchy_sql)
            .bind(source_content_stream_id.as_str())
            .bind(target_content_stream_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        let restriction_sql = format!(
            r#"
            INSERT INTO {0} (
                content_stream_id, dimension_space_point_hash, origin_node_aggregate_id,
                tag, affected_node_aggregate_ids
            )
            SELECT $2, dimension_space_point_hash, origin_node_aggregate_id,
                   tag, affected_node_aggregate_ids
            FROM {0}
            WHERE content_stream_id = $1
            "#,
            self.tables.restriction_hyperrelation
        );
        let restrictions = sqlx::query(&restriction_sql)
            .bind(source_content_stream_id.as_str())
            .bind(target_content_stream_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        Ok((hierarchy.rows_affected(), restrictions.rows_affected()))
    }

    async fn remove_content_stream(
        &mut self,
        content_stream_id: &ContentStreamId,
    ) -> Result<Vec<RelationAnchorPoint>, RepositoryError> {
        let sql = format!(
            "DELETE FROM {} WHERE content_stream_id = $1 RETURNING child_node_anchors",
            self.tables.hierarchy_hyperrelation
        );
        let children = sqlx::query_scalar::<_, Vec<Uuid>>(&sql)
            .bind(content_stream_id.as_str())
            .fetch_all(&mut *self.tx)
            .await?;

        let sql = format!(
            "DELETE FROM {} WHERE content_stream_id = $1",
            self.tables.restriction_hyperrelation
        );
        sqlx::query(&sql)
            .bind(content_stream_id.as_str())
            .execute(&mut *self.tx)
            .await?;

        let mut seen = BTreeSet::new();
        Ok(children
            .into_iter()
            .flatten()
            .filter(|anchor| seen.insert(*anchor))
            .map(RelationAnchorPoint::from_uuid)
            .collect())
    }

    async fn upsert_restriction_hyperrelation(
        &mut self,
        restriction: &RestrictionHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO {} (
                content_stream_id, dimension_space_point_hash, origin_node_aggregate_id,
                tag, affected_node_aggregate_ids
            )
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (content_stream_id, dimension_space_point_hash, origin_node_aggregate_id, tag)
            DO UPDATE SET affected_node_aggregate_ids = EXCLUDED.affected_node_aggregate_ids
            "#,
            self.tables.restriction_hyperrelation
        );
        sqlx::query(&sql)
            .bind(restriction.content_stream_id.as_str())
            .bind(restriction.dimension_space_point_hash.as_str())
            .bind(restriction.origin_node_aggregate_id.as_str())
            .bind(restriction.tag.as_str())
            .bind(affected_to_db(restriction))
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn update_restriction_hyperrelation(
        &mut self,
        restriction: &RestrictionHyperrelationRecord,
    ) -> Result<(), RepositoryError> {
        let sql = format!(
            r#"
            UPDATE {} SET affected_node_aggregate_ids = $5
            WHERE content_stream_id = $1
              AND dimension_space_point_hash = $2
              AND origin_node_aggregate_id = $3
              AND tag = $4
            "#,
            self.tables.restriction_hyperrelation
        );
        let result = sqlx::query(&sql)
            .bind(restriction.content_stream_id.as_str())
            .bind(restriction.dimension_space_point_hash.as_str())
            .bind(restriction.origin_node_aggregate_id.as_str())
            .bind(restriction.tag.as_str())
            .bind(affected_to_db(restriction))
            .execute(&mut *self.tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::invalid_record(format!(
                "no restriction hyperrelation from {} tagged {}",
                restriction.origin_node_aggregate_id, restriction.tag
            )));
        }
        Ok(())
    }

    async fn delete_outgoing_restriction_hyperrelations(
        &mut self,
        content_stream_id: &ContentStreamId,
        origin_node_aggregate_id: &NodeAggregateId,
        tag: Option<&SubtreeTag>,
        dimension_space_points: &DimensionSpacePointSet,
    ) -> Result<u64, RepositoryError> {
        let sql = format!(
            r#"
            DELETE FROM {}
            WHERE content_stream_id = $1
              AND origin_node_aggregate_id = $2
              AND ($3::text IS NULL OR tag = $3)
              AND dimension_space_point_hash = ANY($4)
            "#,
            self.tables.restriction_hyperrelation
        );
        let result = sqlx::query(&sql)
            .bind(content_stream_id.as_str())
            .bind(origin_node_aggregate_id.as_str())
            .bind(tag.map(|tag| tag.as_str()))
            .bind(hashes_to_db(dimension_space_points))
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn insert_reference_relations(
        &mut self,
        references: &[ReferenceRelationRecord],
    ) -> Result<(), RepositoryError> {
        if references.is_empty() {
            return Ok(());
        }

        let mut encoded = Vec::with_capacity(references.len());
        for reference in references {
            let properties = reference
                .properties
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?;
            encoded.push((reference, position_to_db(reference.position)?, properties));
        }

        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "INSERT INTO {} (source_node_anchor, name, position, properties, destination_node_aggregate_id) ",
            self.tables.reference_relation
        ));
        query_builder.push_values(encoded, |mut b, (reference, position, properties)| {
            b.push_bind(reference.source_node_anchor.as_uuid())
                .push_bind(reference.name.as_str().to_string())
                .push_bind(position)
                .push_bind(properties)
                .push_bind(reference.destination_node_aggregate_id.as_str().to_string());
        });

        query_builder.build().execute(&mut *self.tx).await?;
        Ok(())
    }

    async fn delete_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
        name: Option<&ReferenceName>,
    ) -> Result<u64, RepositoryError> {
        let sql = format!(
            r#"
            DELETE FROM {}
            WHERE source_node_anchor = $1
              AND ($2::text IS NULL OR name = $2)
            "#,
            self.tables.reference_relation
        );
        let result = sqlx::query(&sql)
            .bind(source_node_anchor.as_uuid())
            .bind(name.map(|name| name.as_str()))
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn copy_reference_relations(
        &mut self,
        source_node_anchor: RelationAnchorPoint,
        target_node_anchor: RelationAnchorPoint,
    ) -> Result<u64, RepositoryError> {
        let sql = format!(
            r#"
            INSERT INTO {0} (source_node_anchor, name, position, properties, destination_node_aggregate_id)
            SELECT $2, name, position, properties, destination_node_aggregate_id
            FROM {0}
            WHERE source_node_anchor = $1
            "#,
            self.tables.reference_relation
        );
        let result = sqlx::query(&sql)
            .bind(source_node_anchor.as_uuid())
            .bind(target_node_anchor.as_uuid())
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }
}

fn affected_to_db(restriction: &RestrictionHyperrelationRecord) -> Vec<String> {
    restriction
        .affected_node_aggregate_ids
        .iter()
        .map(|id| id.as_str().to_string())
        .collect()
}
