//! Recurring jobs: reaction drain, status refresh and text backups.

use std::{future::Future, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};
use tracing::{info, trace};

use crate::{
    services::{reaction_service, status_service},
    state::SharedState,
};

/// Handles of the recurring jobs; dropping them leaves the jobs running.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Stop every job. A job interrupted mid-run leaves the rosters consistent because
    /// each run mutates them under the guild lock only.
    pub fn shutdown(self) {
        for handle in self.handles {
            handle.abort();
        }
    }
}

/// Start the drain, refresh and backup loops with the configured periods.
pub fn spawn(state: SharedState) -> BackgroundTasks {
    let config = state.config();
    let (drain, refresh, backup) = (
        config.drain_interval,
        config.refresh_interval,
        config.backup_interval,
    );
    info!(?drain, ?refresh, ?backup, "starting background jobs");

    let handles = vec![
        spawn_every("reaction drain", drain, state.clone(), |state| async move {
            reaction_service::drain_pending(&state).await
        }),
        spawn_every("status refresh", refresh, state.clone(), |state| async move {
            status_service::refresh_all(&state).await
        }),
        spawn_every("backup", backup, state, |state| async move {
            status_service::backup_all(&state).await
        }),
    ];

    BackgroundTasks { handles }
}

fn spawn_every<F, Fut>(name: &'static str, period: Duration, state: SharedState, job: F) -> JoinHandle<()>
where
    F: Fn(SharedState) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            trace!(job = name, "background job tick");
            job(state.clone()).await;
        }
    })
}
