use std::sync::Arc;

use content_graph_repository::{GraphStore, GraphTransaction, GraphWriter};
use content_graph_shared::ContentGraphEvent;
use tracing::{debug, error, info, instrument};

use crate::errors::ProjectionError;
use crate::handlers;

/// Applies content graph events to a [`GraphStore`], one transaction per
/// event.
///
/// Events of one content stream must be applied in the order they were
/// recorded. Events of different streams may be applied concurrently from
/// several tasks sharing one engine.
pub struct ProjectionEngine<S: GraphStore> {
    store: Arc<S>,
}

impl<S: GraphStore> Clone for ProjectionEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: GraphStore> ProjectionEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub async fn setup(&self) -> Result<(), ProjectionError> {
        self.store.setup().await?;
        Ok(())
    }

    pub async fn reset(&self) -> Result<(), ProjectionError> {
        self.store.reset().await?;
        info!("Content graph projection was reset");
        Ok(())
    }

    /// Applies one event atomically. On error nothing the event's handler
    /// wrote is kept.
    #[instrument(skip_all, fields(
        event_type = event.event_type(),
        content_stream_id = %event.content_stream_id()
    ))]
    pub async fn apply(&self, event: &ContentGraphEvent) -> Result<(), ProjectionError> {
        let mut tx = self.store.begin().await?;

        for content_stream_id in event.locked_content_stream_ids() {
            tx.lock_content_stream(content_stream_id).await?;
        }

        if let Err(e) = handlers::apply_event(&mut tx, event).await {
            error!(error = %e, "Failed to apply event");
            return Err(e);
        }

        tx.commit().await?;
        debug!("Event was applied");
        Ok(())
    }

    /// Applies events in order and stops at the first one that fails.
    /// Returns the number of applied events.
    pub async fn apply_all<'a, I>(&self, events: I) -> Result<usize, ProjectionError>
    where
        I: IntoIterator<Item = &'a ContentGraphEvent>,
    {
        let mut applied = 0;
        for event in events {
            if let Err(e) = self.apply(event).await {
                error!(applied, event_type = event.event_type(), "Replay stopped");
                return Err(e);
            }
            applied += 1;
        }
        info!(applied, "Replay finished");
        Ok(applied)
    }
}
