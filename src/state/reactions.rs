//! Reaction events and the rules turning them into roster mutations.

use tracing::debug;

use crate::state::{
    members::MemberLookup,
    rotation::{JoinWeight, Rotation, RosterError},
    roster::{ChannelId, MessageId, SignupMode, UserId},
};

/// Join with one round.
pub const JOIN_ONE: &str = "1\u{fe0f}\u{20e3}";
/// Join with two rounds.
pub const JOIN_TWO: &str = "2\u{fe0f}\u{20e3}";
/// Join with three rounds.
pub const JOIN_THREE: &str = "3\u{fe0f}\u{20e3}";
/// Claim a fixed slot.
pub const CLAIM_FIXED: &str = "\u{2764}\u{fe0f}";
/// Leave the waitlist.
pub const LEAVE: &str = "\u{1f5d1}\u{fe0f}";
/// Admin panel: play one rotation.
pub const PANEL_ROTATE: &str = "\u{1f3ae}";
/// Admin panel: open signup.
pub const PANEL_OPEN: &str = "\u{25b6}\u{fe0f}";
/// Admin panel: close signup.
pub const PANEL_CLOSE: &str = "\u{1f6d1}";
/// Admin panel: draw a random map.
pub const PANEL_RANDOM_MAP: &str = "\u{1f3b2}";

/// Reactions put on the admin panel message.
pub const PANEL_EMOJIS: [&str; 4] = [PANEL_ROTATE, PANEL_OPEN, PANEL_CLOSE, PANEL_RANDOM_MAP];

/// Reactions offered on the signup message in `mode`.
pub fn signup_emojis(mode: SignupMode) -> &'static [&'static str] {
    match mode {
        SignupMode::Registration => &[JOIN_ONE, JOIN_TWO, JOIN_THREE, CLAIM_FIXED, LEAVE],
        SignupMode::Simple => &[JOIN_ONE, LEAVE],
    }
}

/// Text of the signup message in `mode`.
pub fn signup_prompt(mode: SignupMode) -> &'static str {
    match mode {
        SignupMode::Registration => "1️⃣ 일반 2️⃣ 1티어구독 3️⃣ 2티어구독 ❤️고정권",
        SignupMode::Simple => "1️⃣ 일반",
    }
}

/// Text of the admin panel message.
pub const PANEL_PROMPT: &str = "🎮로테이션 ▶️시참시작 🛑시참정지 🎲랜덤맵";

/// Strip variation selectors so `❤` and `❤️` compare equal.
pub fn normalize(emoji: &str) -> String {
    emoji.chars().filter(|c| *c != '\u{fe0f}').collect()
}

fn same_emoji(left: &str, right: &str) -> bool {
    normalize(left) == normalize(right)
}

/// Intent carried by a reaction on the signup message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignupReaction {
    /// Join with a weight.
    Join(JoinWeight),
    /// Claim (or upgrade to) a fixed slot.
    ClaimFixed,
    /// Leave the waitlist.
    Leave,
}

impl SignupReaction {
    /// Decode an emoji, ignoring variation selectors.
    pub fn parse(emoji: &str) -> Option<Self> {
        let reaction = if same_emoji(emoji, JOIN_ONE) {
            SignupReaction::Join(JoinWeight::Rounds(1))
        } else if same_emoji(emoji, JOIN_TWO) {
            SignupReaction::Join(JoinWeight::Rounds(2))
        } else if same_emoji(emoji, JOIN_THREE) {
            SignupReaction::Join(JoinWeight::Rounds(3))
        } else if same_emoji(emoji, CLAIM_FIXED) {
            SignupReaction::ClaimFixed
        } else if same_emoji(emoji, LEAVE) {
            SignupReaction::Leave
        } else {
            return None;
        };
        Some(reaction)
    }

    /// Whether the reaction is offered in `mode`.
    pub fn accepted_in(self, mode: SignupMode) -> bool {
        match mode {
            SignupMode::Registration => true,
            SignupMode::Simple => matches!(
                self,
                SignupReaction::Join(JoinWeight::Rounds(1)) | SignupReaction::Leave
            ),
        }
    }

    /// Joins require a registered nickname, leaving does not.
    pub fn is_join(self) -> bool {
        !matches!(self, SignupReaction::Leave)
    }
}

/// Action requested through the admin panel message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelReaction {
    /// Advance the rotation.
    Rotate,
    /// Open signup.
    OpenSignup,
    /// Close signup.
    CloseSignup,
    /// Draw a random map.
    RandomMap,
}

impl PanelReaction {
    /// Decode an emoji, ignoring variation selectors.
    pub fn parse(emoji: &str) -> Option<Self> {
        [
            (PANEL_ROTATE, PanelReaction::Rotate),
            (PANEL_OPEN, PanelReaction::OpenSignup),
            (PANEL_CLOSE, PanelReaction::CloseSignup),
            (PANEL_RANDOM_MAP, PanelReaction::RandomMap),
        ]
        .into_iter()
        .find_map(|(candidate, action)| same_emoji(emoji, candidate).then_some(action))
    }

    /// Emoji to remove from the panel once handled.
    pub fn emoji(self) -> &'static str {
        match self {
            PanelReaction::Rotate => PANEL_ROTATE,
            PanelReaction::OpenSignup => PANEL_OPEN,
            PanelReaction::CloseSignup => PANEL_CLOSE,
            PanelReaction::RandomMap => PANEL_RANDOM_MAP,
        }
    }
}

/// Reaction forwarded by the host and waiting in a guild queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReactionEvent {
    /// Reacting user.
    pub user_id: UserId,
    /// Channel of the reacted message.
    pub channel_id: ChannelId,
    /// Reacted message.
    pub message_id: MessageId,
    /// Raw emoji text.
    pub emoji: String,
    /// Accepted at intake after the gateway confirmed `message_id` is the live signup
    /// message although the roster still pointed at an older one.
    pub reconciled: bool,
}

/// Outcome of one queue drain.
#[derive(Debug, Default)]
pub struct DrainReport {
    /// Events that changed the roster.
    pub applied: usize,
    /// Events discarded before reaching the engine.
    pub dropped: usize,
    /// Events the engine refused.
    pub failures: Vec<(UserId, RosterError)>,
    /// Users that left the waitlist and need their reactions cleared.
    pub cleared: Vec<UserId>,
}

impl DrainReport {
    /// Whether the roster changed and needs a status refresh.
    pub fn mutated(&self) -> bool {
        self.applied > 0
    }
}

/// Apply queued events in FIFO order. A failing event never aborts the batch.
pub fn apply_batch(
    rotation: &mut Rotation<'_>,
    events: impl IntoIterator<Item = ReactionEvent>,
    members: &dyn MemberLookup,
    fixed_role: &str,
) -> DrainReport {
    let mut report = DrainReport::default();

    for event in events {
        let live = rotation.roster().links().signup_message;
        if !event.reconciled && live != Some(event.message_id) {
            debug!(
                user = event.user_id,
                message = event.message_id,
                "dropping reaction on stale signup message"
            );
            report.dropped += 1;
            continue;
        }

        let Some(profile) = members.profile(event.user_id) else {
            debug!(user = event.user_id, "dropping reaction from unknown member");
            report.dropped += 1;
            continue;
        };

        let mode = rotation.roster().mode();
        let Some(reaction) =
            SignupReaction::parse(&event.emoji).filter(|reaction| reaction.accepted_in(mode))
        else {
            report.dropped += 1;
            continue;
        };

        let user = event.user_id;
        let outcome = match reaction {
            SignupReaction::Join(weight) => rotation.join(user, weight).map(|_| ()),
            SignupReaction::ClaimFixed if !profile.has_role(fixed_role) => {
                Err(RosterError::NotEntitled(user))
            }
            SignupReaction::ClaimFixed => rotation.claim_fixed(user).map(|_| ()),
            SignupReaction::Leave => rotation.leave_waitlist(user).inspect(|_| {
                report.cleared.push(user);
            }),
        };

        match outcome {
            Ok(()) => report.applied += 1,
            Err(err) => {
                debug!(user, error = %err, "reaction rejected");
                report.failures.push((user, err));
            }
        }
    }

    report
}
