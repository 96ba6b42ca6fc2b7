//! One guild's roster together with its reaction queue.

use std::{
    collections::VecDeque,
    sync::{Mutex as StdMutex, MutexGuard as StdMutexGuard, PoisonError},
};

use tokio::sync::{Mutex, MutexGuard, watch};

use crate::state::{
    reactions::ReactionEvent,
    roster::{GuildId, MessageLinks, Roster},
};

/// Per-guild unit of concurrency.
///
/// The roster sits behind an async lock shared by the queue drain and admin commands.
/// The queue has its own short-lived lock so intake never waits for the roster.
pub struct CommunitySession {
    guild_id: GuildId,
    roster: Mutex<Roster>,
    refresh_gate: Mutex<()>,
    queue: StdMutex<VecDeque<ReactionEvent>>,
    links: watch::Sender<MessageLinks>,
}

impl CommunitySession {
    /// Wrap `roster` for `guild_id`.
    pub fn new(guild_id: GuildId, roster: Roster) -> Self {
        let (links, _rx) = watch::channel(roster.links().clone());
        Self {
            guild_id,
            roster: Mutex::new(roster),
            refresh_gate: Mutex::new(()),
            queue: StdMutex::new(VecDeque::new()),
            links,
        }
    }

    /// Guild this session belongs to.
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// Lock the roster.
    pub async fn lock(&self) -> MutexGuard<'_, Roster> {
        self.roster.lock().await
    }

    /// Serialize status refreshes of this guild. Taken before the roster lock.
    pub async fn refresh_lock(&self) -> MutexGuard<'_, ()> {
        self.refresh_gate.lock().await
    }

    /// Message handles as of the last roster mutation, readable without the roster lock.
    pub fn links(&self) -> MessageLinks {
        self.links.borrow().clone()
    }

    /// Publish the roster's message handles to lock-free readers.
    pub fn sync_links(&self, roster: &Roster) {
        self.links.send_if_modified(|current| {
            if current == roster.links() {
                false
            } else {
                *current = roster.links().clone();
                true
            }
        });
    }

    /// Append an event to the queue.
    pub fn enqueue(&self, event: ReactionEvent) {
        self.queue().push_back(event);
    }

    /// Take every queued event in FIFO order.
    pub fn take_queue(&self) -> Vec<ReactionEvent> {
        self.queue().drain(..).collect()
    }

    /// Drop every queued event. Returns how many were discarded.
    pub fn clear_queue(&self) -> usize {
        let mut queue = self.queue();
        let discarded = queue.len();
        queue.clear();
        discarded
    }

    /// Number of queued events.
    pub fn queued(&self) -> usize {
        self.queue().len()
    }

    fn queue(&self) -> StdMutexGuard<'_, VecDeque<ReactionEvent>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::roster::SignupMode;

    fn event(user: u64) -> ReactionEvent {
        ReactionEvent {
            user_id: user,
            channel_id: 1,
            message_id: 2,
            emoji: "1️⃣".into(),
            reconciled: false,
        }
    }

    #[tokio::test]
    async fn enqueue_does_not_wait_for_roster_lock() {
        let session = CommunitySession::new(
            7,
            Roster::new(SignupMode::Simple, 4, MessageLinks::default()),
        );

        let guard = session.lock().await;
        session.enqueue(event(1));
        session.enqueue(event(2));
        assert_eq!(session.queued(), 2);
        drop(guard);

        let drained = session.take_queue();
        assert_eq!(
            drained.iter().map(|e| e.user_id).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert_eq!(session.queued(), 0);

        session.enqueue(event(3));
        assert_eq!(session.clear_queue(), 1);
    }

    #[tokio::test]
    async fn links_mirror_follows_sync() {
        let session = CommunitySession::new(
            7,
            Roster::new(SignupMode::Simple, 4, MessageLinks::default()),
        );
        {
            let mut roster = session.lock().await;
            roster.links_mut().signup_message = Some(99);
            assert_eq!(session.links().signup_message, None);
            session.sync_links(&roster);
        }
        assert_eq!(session.links().signup_message, Some(99));
    }
}
