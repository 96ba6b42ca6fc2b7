//! Per-guild roster: who plays, who waits, how many rounds everybody has left,
//! and the capacity knobs that decide how many slots exist.

use indexmap::IndexMap;

/// Identifier of a chat-platform user.
pub type UserId = u64;
/// Identifier of a community (guild).
pub type GuildId = u64;
/// Identifier of a text channel.
pub type ChannelId = u64;
/// Identifier of a message inside a channel.
pub type MessageId = u64;

/// Remaining number of rotations a user keeps their slot for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoundCredit {
    /// Slot is released once the count runs out.
    Finite(u32),
    /// Permanent slot, never consumed by a rotation.
    Fixed,
}

impl RoundCredit {
    /// Whether the holder keeps their slot through the next rotation advance.
    pub fn survives_rotation(self) -> bool {
        match self {
            RoundCredit::Fixed => true,
            RoundCredit::Finite(left) => left > 1,
        }
    }

    /// Credit left once one rotation has been played.
    pub fn consumed(self) -> Self {
        match self {
            RoundCredit::Fixed => RoundCredit::Fixed,
            RoundCredit::Finite(left) => RoundCredit::Finite(left.saturating_sub(1)),
        }
    }
}

/// Signup flavour of a guild, deciding which weights are offered and the default capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignupMode {
    /// Tiered signup (1/2/3 rounds plus fixed slots).
    #[default]
    Registration,
    /// Single-round signup only.
    Simple,
}

impl SignupMode {
    /// The mode a `change-mode` command switches to.
    pub fn toggled(self) -> Self {
        match self {
            SignupMode::Registration => SignupMode::Simple,
            SignupMode::Simple => SignupMode::Registration,
        }
    }
}

/// External message handles the service must track to edit, delete or replace them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageLinks {
    /// Channel holding the signup and status messages.
    pub viewer_channel: Option<ChannelId>,
    /// Message users react on to sign up.
    pub signup_message: Option<MessageId>,
    /// Message rendering the roster.
    pub status_message: Option<MessageId>,
    /// Channel holding the admin panel.
    pub admin_channel: Option<ChannelId>,
    /// Admin panel message (rotate/open/close/random map reactions).
    pub admin_message: Option<MessageId>,
    /// Last random-map announcement, deleted when a new map is drawn.
    pub last_map_message: Option<MessageId>,
    /// Party code currently advertised.
    pub party_code: Option<String>,
    /// Message advertising the party code.
    pub party_code_message: Option<MessageId>,
}

/// One generation of list state, captured before a rotation advance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Generation {
    /// Participants at capture time.
    pub participants: Vec<UserId>,
    /// Waitlist at capture time.
    pub waitlist: Vec<UserId>,
    /// Round credits at capture time.
    pub credits: IndexMap<UserId, RoundCredit>,
    /// Capacity override of the round that was played.
    pub round_capacity: Option<usize>,
}

/// Loose representation of a roster used to rebuild it from persistence.
#[derive(Debug, Clone, Default)]
#[allow(missing_docs)]
pub struct RosterParts {
    pub mode: SignupMode,
    pub participants: Vec<UserId>,
    pub waitlist: Vec<UserId>,
    pub credits: IndexMap<UserId, RoundCredit>,
    pub configured_capacity: Option<usize>,
    pub round_capacity: Option<usize>,
    pub locked_capacity: Option<usize>,
    pub signup_open: bool,
    pub links: MessageLinks,
    pub previous: Option<Generation>,
}

/// Roster of a single guild.
///
/// List fields are only mutated through [`crate::state::rotation::Rotation`], which keeps
/// the lists disjoint, the credits in sync with the lists and the participant count within
/// the resolved capacity.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub(super) mode: SignupMode,
    pub(super) participants: Vec<UserId>,
    pub(super) waitlist: Vec<UserId>,
    pub(super) credits: IndexMap<UserId, RoundCredit>,
    pub(super) configured_capacity: Option<usize>,
    pub(super) round_capacity: Option<usize>,
    pub(super) locked_capacity: Option<usize>,
    pub(super) signup_open: bool,
    pub(super) links: MessageLinks,
    pub(super) previous: Option<Generation>,
}

impl Roster {
    /// Fresh, closed roster for the given mode.
    pub fn new(mode: SignupMode, configured_capacity: usize, links: MessageLinks) -> Self {
        Self {
            mode,
            participants: Vec::new(),
            waitlist: Vec::new(),
            credits: IndexMap::new(),
            configured_capacity: Some(configured_capacity),
            round_capacity: None,
            locked_capacity: None,
            signup_open: false,
            links,
            previous: None,
        }
    }

    /// Rebuild a roster from persisted parts, repairing anything that breaks the list
    /// invariants (duplicates, users listed twice, orphaned credits).
    ///
    /// Capacity is not enforced here because it depends on the global default; callers run
    /// a capacity adjustment right after restoring.
    pub fn from_parts(parts: RosterParts) -> Self {
        let mut participants: Vec<UserId> = Vec::with_capacity(parts.participants.len());
        for user in parts.participants {
            if !participants.contains(&user) {
                participants.push(user);
            }
        }

        let mut waitlist: Vec<UserId> = Vec::with_capacity(parts.waitlist.len());
        for user in parts.waitlist {
            if !participants.contains(&user) && !waitlist.contains(&user) {
                waitlist.push(user);
            }
        }

        let mut credits = parts.credits;
        credits.retain(|user, _| participants.contains(user) || waitlist.contains(user));

        Self {
            mode: parts.mode,
            participants,
            waitlist,
            credits,
            configured_capacity: parts.configured_capacity,
            round_capacity: parts.round_capacity,
            locked_capacity: parts.locked_capacity,
            signup_open: parts.signup_open,
            links: parts.links,
            previous: parts.previous,
        }
    }

    /// Export the roster into loose parts for persistence.
    pub fn to_parts(&self) -> RosterParts {
        RosterParts {
            mode: self.mode,
            participants: self.participants.clone(),
            waitlist: self.waitlist.clone(),
            credits: self.credits.clone(),
            configured_capacity: self.configured_capacity,
            round_capacity: self.round_capacity,
            locked_capacity: self.locked_capacity,
            signup_open: self.signup_open,
            links: self.links.clone(),
            previous: self.previous.clone(),
        }
    }

    /// Build the roster that replaces this one on a mode change.
    ///
    /// Lists, credits, the round override and the undo history are reset; the capacity lock
    /// and the message linkage survive, except for the signup/status messages which are
    /// replaced and the map announcement which is forgotten. Signup reopens immediately.
    pub fn for_mode_change(
        &self,
        mode: SignupMode,
        configured_capacity: usize,
        signup_message: MessageId,
        status_message: MessageId,
    ) -> Self {
        let links = MessageLinks {
            signup_message: Some(signup_message),
            status_message: Some(status_message),
            last_map_message: None,
            ..self.links.clone()
        };

        Self {
            locked_capacity: self.locked_capacity,
            signup_open: true,
            ..Self::new(mode, configured_capacity, links)
        }
    }

    /// Effective participant limit: lock, then round override, then the configured value,
    /// then `global_default`.
    pub fn resolve_capacity(&self, global_default: usize) -> usize {
        self.locked_capacity
            .or(self.round_capacity)
            .or(self.configured_capacity)
            .unwrap_or(global_default)
    }

    /// Current signup mode.
    pub fn mode(&self) -> SignupMode {
        self.mode
    }

    /// Participants in priority order.
    pub fn participants(&self) -> &[UserId] {
        &self.participants
    }

    /// Waitlist, front first.
    pub fn waitlist(&self) -> &[UserId] {
        &self.waitlist
    }

    /// Round credits of every listed user.
    pub fn credits(&self) -> &IndexMap<UserId, RoundCredit> {
        &self.credits
    }

    /// Round credit recorded for `user`, if any.
    pub fn credit(&self, user: UserId) -> Option<RoundCredit> {
        self.credits.get(&user).copied()
    }

    /// Capacity configured for the mode.
    pub fn configured_capacity(&self) -> Option<usize> {
        self.configured_capacity
    }

    /// Transient override for the current round.
    pub fn round_capacity(&self) -> Option<usize> {
        self.round_capacity
    }

    /// Capacity lock surviving rotations.
    pub fn locked_capacity(&self) -> Option<usize> {
        self.locked_capacity
    }

    /// Whether reaction joins are accepted.
    pub fn signup_open(&self) -> bool {
        self.signup_open
    }

    /// Open or close reaction-based signups.
    pub fn set_signup_open(&mut self, open: bool) {
        self.signup_open = open;
    }

    /// Tracked message handles.
    pub fn links(&self) -> &MessageLinks {
        &self.links
    }

    /// Mutable access to the message handles; they carry no list invariants.
    pub fn links_mut(&mut self) -> &mut MessageLinks {
        &mut self.links
    }

    /// Generation saved by the last rotation advance, if it was not undone yet.
    pub fn previous(&self) -> Option<&Generation> {
        self.previous.as_ref()
    }

    /// Whether `user` holds a slot.
    pub fn is_participant(&self, user: UserId) -> bool {
        self.participants.contains(&user)
    }

    /// Whether `user` waits for a slot.
    pub fn is_waitlisted(&self, user: UserId) -> bool {
        self.waitlist.contains(&user)
    }

    /// Whether `user` appears in either list.
    pub fn contains(&self, user: UserId) -> bool {
        self.is_participant(user) || self.is_waitlisted(user)
    }

    pub(super) fn capture(&self) -> Generation {
        Generation {
            participants: self.participants.clone(),
            waitlist: self.waitlist.clone(),
            credits: self.credits.clone(),
            round_capacity: self.round_capacity,
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self, global_default: usize) {
        for user in &self.participants {
            assert!(
                !self.waitlist.contains(user),
                "user {user} is both participant and waitlisted"
            );
        }
        let mut seen = std::collections::HashSet::new();
        for user in self.participants.iter().chain(self.waitlist.iter()) {
            assert!(seen.insert(*user), "user {user} listed twice");
        }
        for user in self.credits.keys() {
            assert!(self.contains(*user), "orphaned credit for {user}");
        }
        assert!(
            self.participants.len() <= self.resolve_capacity(global_default),
            "participants exceed capacity"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_resolution_prefers_lock_then_override_then_configured() {
        let mut roster = Roster::new(SignupMode::Registration, 9, MessageLinks::default());
        assert_eq!(roster.resolve_capacity(5), 9);

        roster.round_capacity = Some(6);
        assert_eq!(roster.resolve_capacity(5), 6);

        roster.locked_capacity = Some(7);
        assert_eq!(roster.resolve_capacity(5), 7);

        roster.locked_capacity = None;
        roster.round_capacity = None;
        roster.configured_capacity = None;
        assert_eq!(roster.resolve_capacity(5), 5);
    }

    #[test]
    fn from_parts_repairs_broken_lists() {
        let mut credits = IndexMap::new();
        credits.insert(1, RoundCredit::Finite(2));
        credits.insert(2, RoundCredit::Fixed);
        credits.insert(99, RoundCredit::Finite(1));

        let roster = Roster::from_parts(RosterParts {
            participants: vec![1, 1, 2],
            waitlist: vec![2, 3, 3],
            credits,
            configured_capacity: Some(9),
            ..RosterParts::default()
        });

        assert_eq!(roster.participants(), &[1, 2]);
        assert_eq!(roster.waitlist(), &[3]);
        assert_eq!(roster.credit(99), None);
        roster.assert_consistent(9);
    }

    #[test]
    fn mode_change_keeps_lock_and_panel_links() {
        let links = MessageLinks {
            viewer_channel: Some(10),
            signup_message: Some(11),
            status_message: Some(12),
            admin_channel: Some(20),
            admin_message: Some(21),
            last_map_message: Some(30),
            party_code: Some("ABCD".into()),
            party_code_message: Some(31),
        };
        let mut roster = Roster::new(SignupMode::Registration, 9, links);
        roster.locked_capacity = Some(5);
        roster.round_capacity = Some(3);
        roster.participants.push(1);
        roster.credits.insert(1, RoundCredit::Finite(1));

        let next = roster.for_mode_change(SignupMode::Simple, 4, 40, 41);

        assert_eq!(next.mode(), SignupMode::Simple);
        assert!(next.participants().is_empty());
        assert!(next.credits().is_empty());
        assert!(next.signup_open());
        assert_eq!(next.locked_capacity(), Some(5));
        assert_eq!(next.round_capacity(), None);
        assert_eq!(next.configured_capacity(), Some(4));
        assert_eq!(next.links().signup_message, Some(40));
        assert_eq!(next.links().status_message, Some(41));
        assert_eq!(next.links().admin_message, Some(21));
        assert_eq!(next.links().last_map_message, None);
        assert_eq!(next.links().party_code.as_deref(), Some("ABCD"));
    }

    #[test]
    fn credits_survive_only_above_one_round() {
        assert!(RoundCredit::Fixed.survives_rotation());
        assert!(RoundCredit::Finite(2).survives_rotation());
        assert!(!RoundCredit::Finite(1).survives_rotation());
        assert!(!RoundCredit::Finite(0).survives_rotation());
        assert_eq!(RoundCredit::Finite(3).consumed(), RoundCredit::Finite(2));
        assert_eq!(RoundCredit::Fixed.consumed(), RoundCredit::Fixed);
    }
}
