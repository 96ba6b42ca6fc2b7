use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the snapshot store and report queue pressure.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let store_ok = match state.store().health_check().await {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "snapshot store health check failed");
            false
        }
    };

    let sessions = state.sessions();
    let queued = sessions.iter().map(|session| session.queued()).sum();
    HealthResponse::new(store_ok, sessions.len(), queued, state.feed().subscribers())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::snapshot_store::MemorySnapshotStore,
        gateway::RecordingGateway,
        state::{
            AppState,
            reactions::{JOIN_ONE, ReactionEvent},
            roster::{MessageLinks, Roster, SignupMode},
        },
    };

    #[tokio::test]
    async fn reports_store_failure_and_queue_depth() {
        let store = MemorySnapshotStore::new();
        let state = AppState::new(
            AppConfig::default(),
            Arc::new(store.clone()),
            Arc::new(RecordingGateway::new()),
        );
        let session = state.install_session(1, Roster::new(SignupMode::Simple, 4, MessageLinks::default()));
        session.enqueue(ReactionEvent {
            user_id: 2,
            channel_id: 10,
            message_id: 20,
            emoji: JOIN_ONE.into(),
            reconciled: false,
        });
        let _feed = state.feed().subscribe();

        let healthy = health_status(&state).await;
        assert_eq!(healthy.status, "ok");
        assert_eq!((healthy.guilds, healthy.queued_events, healthy.feed_subscribers), (1, 1, 1));

        store.set_failing(true);
        assert_eq!(health_status(&state).await.status, "degraded");
    }
}
