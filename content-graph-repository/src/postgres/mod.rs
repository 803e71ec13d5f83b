//! PostgreSQL implementation of the storage contract.
//!
//! ## Tables
//!
//! - `{prefix}_node`: node records keyed by relation anchor point
//! - `{prefix}_hierarchy_hyperrelation`: parent anchor plus ordered `uuid[]`
//!   of child anchors per content stream and dimension space point
//! - `{prefix}_restriction_hyperrelation`: affected aggregate ids per origin
//!   aggregate and tag
//! - `{prefix}_reference_relation`: ordered references per source anchor
mod rows;
mod transaction;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use crate::config::{validate_table_prefix, PostgresGraphStoreConfig};
use crate::errors::RepositoryError;
use crate::interfaces::GraphStore;

pub use transaction::PostgresGraphTransaction;

/// Table names derived from one validated prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableNames {
    pub prefix: String,
    pub node: String,
    pub hierarchy_hyperrelation: String,
    pub restriction_hyperrelation: String,
    pub reference_relation: String,
}

impl TableNames {
    pub fn new(prefix: &str) -> Result<Self, RepositoryError> {
        validate_table_prefix(prefix)?;
        Ok(Self {
            prefix: prefix.to_string(),
            node: format!("{prefix}_node"),
            hierarchy_hyperrelation: format!("{prefix}_hierarchy_hyperrelation"),
            restriction_hyperrelation: format!("{prefix}_restriction_hyperrelation"),
            reference_relation: format!("{prefix}_reference_relation"),
        })
    }

    fn schema(&self) -> String {
        let Self {
            prefix,
            node,
            hierarchy_hyperrelation,
            restriction_hyperrelation,
            reference_relation,
        } = self;

        format!(
            r#"
            CREATE TABLE IF NOT EXISTS {node} (
                relation_anchor_point uuid PRIMARY KEY,
                node_aggregate_id text NOT NULL,
                origin_dimension_space_point jsonb NOT NULL,
                origin_dimension_space_point_hash text NOT NULL,
                properties jsonb NOT NULL,
                node_type_name text NOT NULL,
                classification text NOT NULL,
                node_name text
            );
            CREATE INDEX IF NOT EXISTS {prefix}_node_aggregate_idx
                ON {node} (node_aggregate_id, origin_dimension_space_point_hash);

            CREATE TABLE IF NOT EXISTS {hierarchy_hyperrelation} (
                content_stream_id text NOT NULL,
                parent_node_anchor uuid NOT NULL,
                dimension_space_point jsonb NOT NULL,
                dimension_space_point_hash text NOT NULL,
                child_node_anchors uuid[] NOT NULL,
                PRIMARY KEY (content_stream_id, dimension_space_point_hash, parent_node_anchor)
            );
            CREATE INDEX IF NOT EXISTS {prefix}_hierarchy_children_idx
                ON {hierarchy_hyperrelation} USING GIN (child_node_anchors);

            CREATE TABLE IF NOT EXISTS {restriction_hyperrelation} (
                content_stream_id text NOT NULL,
                dimension_space_point_hash text NOT NULL,
                origin_node_aggregate_id text NOT NULL,
                tag text NOT NULL,
                affected_node_aggregate_ids text[] NOT NULL,
                PRIMARY KEY (content_stream_id, dimension_space_point_hash, origin_node_aggregate_id, tag)
            );
            CREATE INDEX IF NOT EXISTS {prefix}_restriction_affected_idx
                ON {restriction_hyperrelation} USING GIN (affected_node_aggregate_ids);

            CREATE TABLE IF NOT EXISTS {reference_relation} (
                source_node_anchor uuid NOT NULL,
                name text NOT NULL,
                position integer NOT NULL,
                properties jsonb,
                destination_node_aggregate_id text NOT NULL,
                PRIMARY KEY (source_node_anchor, name, position)
            );
            "#
        )
    }
}

/// Storage contract implementation on a PostgreSQL connection pool.
#[derive(Clone)]
pub struct PostgresGraphStore {
    pool: sqlx::PgPool,
    tables: Arc<TableNames>,
}

impl PostgresGraphStore {
    pub async fn new(config: &PostgresGraphStoreConfig) -> Result<Self, RepositoryError> {
        let tables = TableNames::new(&config.table_prefix)?;
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.database_url)
            .await?;

        Ok(Self {
            pool,
            tables: Arc::new(tables),
        })
    }

    pub fn from_pool(pool: sqlx::PgPool, table_prefix: &str) -> Result<Self, RepositoryError> {
        Ok(Self {
            pool,
            tables: Arc::new(TableNames::new(table_prefix)?),
        })
    }

    pub fn tables(&self) -> &TableNames {
        &self.tables
    }
}

#[async_trait]
impl GraphStore for PostgresGraphStore {
    type Transaction = PostgresGraphTransaction;

    async fn begin(&self) -> Result<Self::Transaction, RepositoryError> {
        let tx = self.pool.begin().await?;
        Ok(PostgresGraphTransaction::new(tx, self.tables.clone()))
    }

    async fn setup(&self) -> Result<(), RepositoryError> {
        sqlx::raw_sql(&self.tables.schema())
            .execute(&self.pool)
            .await?;
        info!(prefix = %self.tables.prefix, "Content graph tables are set up");
        Ok(())
    }

    async fn reset(&self) -> Result<(), RepositoryError> {
        let TableNames {
            node,
            hierarchy_hyperrelation,
            restriction_hyperrelation,
            reference_relation,
            ..
        } = self.tables.as_ref();
        sqlx::raw_sql(&format!(
            "TRUNCATE {node}, {hierarchy_hyperrelation}, {restriction_hyperrelation}, {reference_relation}"
        ))
        .execute(&self.pool)
        .await?;
        info!(prefix = %self.tables.prefix, "Content graph tables were reset");
        Ok(())
    }
}
