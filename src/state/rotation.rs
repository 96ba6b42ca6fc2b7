//! Rotation engine: every list mutation of a [`Roster`] goes through here.
//!
//! A [`Rotation`] borrows the roster together with the global default capacity so each
//! operation resolves the effective capacity at the moment it runs. Lock and override
//! values can change between two calls, so nothing caches it.

use thiserror::Error;

use crate::state::roster::{MessageId, Roster, RoundCredit, UserId};

/// Failure of a rotation operation. The roster is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    /// Reaction joins are rejected while signup is closed.
    #[error("signup is closed")]
    SignupClosed,
    /// The user already holds a slot or waits for one.
    #[error("user {0} is already listed")]
    AlreadyListed(UserId),
    /// The user is in neither list.
    #[error("user {0} is not listed")]
    NotListed(UserId),
    /// The user is not on the waitlist.
    #[error("user {0} is not on the waitlist")]
    NotWaitlisted(UserId),
    /// The user is not a participant.
    #[error("user {0} is not a participant")]
    NotParticipant(UserId),
    /// Capacity is zero, nobody can be promoted.
    #[error("no participant slot is available")]
    NoCapacity,
    /// No rotation advance has been recorded since the last undo.
    #[error("nothing to undo")]
    NothingToUndo,
    /// Fixed-slot join attempted without the entitlement.
    #[error("user {0} lacks the fixed-slot entitlement")]
    NotEntitled(UserId),
}

/// Coarse class of a [`RosterError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Referenced user is absent.
    NotFound,
    /// Operation is not allowed in the current state.
    InvalidState,
}

impl RosterError {
    /// Map the error to its class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RosterError::NotListed(_)
            | RosterError::NotWaitlisted(_)
            | RosterError::NotParticipant(_) => ErrorKind::NotFound,
            RosterError::SignupClosed
            | RosterError::AlreadyListed(_)
            | RosterError::NoCapacity
            | RosterError::NothingToUndo
            | RosterError::NotEntitled(_) => ErrorKind::InvalidState,
        }
    }
}

/// Priority weight picked when joining.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinWeight {
    /// One to three rounds.
    Rounds(u8),
    /// Permanent slot; the caller verified the entitlement.
    Fixed,
}

impl JoinWeight {
    /// Weight for an ordinary join, accepting only 1 to 3 rounds.
    pub fn rounds(count: u8) -> Option<Self> {
        (1..=3).contains(&count).then_some(JoinWeight::Rounds(count))
    }

    /// Round credit granted by this weight.
    pub fn credit(self) -> RoundCredit {
        match self {
            JoinWeight::Rounds(count) => RoundCredit::Finite(u32::from(count)),
            JoinWeight::Fixed => RoundCredit::Fixed,
        }
    }
}

/// Where a user ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Holds a slot.
    Participant,
    /// Waits at the given 1-based position.
    Waitlist(usize),
}

/// Result of [`Rotation::promote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Promotion {
    /// Participant pushed to the waitlist front to make room.
    pub evicted: Option<UserId>,
    /// Users pulled from the waitlist to fill remaining vacancies.
    pub refilled: Vec<UserId>,
}

/// Result of [`Rotation::demote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Demotion {
    /// 1-based waitlist position once the vacated slot was refilled.
    pub position: usize,
    /// Whether the user held a slot before the move.
    pub was_participant: bool,
    /// Users pulled from the waitlist into the vacated slot.
    pub promoted: Vec<UserId>,
}

/// Result of [`Rotation::advance`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Rotated {
    /// Participants whose credit ran out.
    pub dropped: Vec<UserId>,
    /// Waitlisted users that took the freed slots.
    pub promoted: Vec<UserId>,
}

/// Users moved by a capacity adjustment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CapacityChange {
    /// Participants moved to the waitlist front.
    pub demoted: Vec<UserId>,
    /// Waitlisted users that gained a slot.
    pub promoted: Vec<UserId>,
}

/// Mutation handle over a roster.
pub struct Rotation<'a> {
    roster: &'a mut Roster,
    default_capacity: usize,
}

impl<'a> Rotation<'a> {
    /// Borrow `roster` for mutation; `default_capacity` is the last fallback of capacity
    /// resolution.
    pub fn new(roster: &'a mut Roster, default_capacity: usize) -> Self {
        Self {
            roster,
            default_capacity,
        }
    }

    /// Read-only view of the roster being mutated.
    pub fn roster(&self) -> &Roster {
        self.roster
    }

    /// Mutable access for fields without list invariants (links, signup gate).
    pub fn roster_mut(&mut self) -> &mut Roster {
        self.roster
    }

    /// Capacity in effect right now.
    pub fn capacity(&self) -> usize {
        self.roster.resolve_capacity(self.default_capacity)
    }

    /// Reaction join: rejected while signup is closed or when already listed. Goes to the
    /// participants when a slot is free, else to the waitlist tail.
    pub fn join(&mut self, user: UserId, weight: JoinWeight) -> Result<Placement, RosterError> {
        if !self.roster.signup_open {
            return Err(RosterError::SignupClosed);
        }
        self.insert_new(user, weight.credit())
    }

    /// Fixed-slot reaction. Unlike [`Rotation::join`], an already listed user keeps their
    /// place and has their credit upgraded to [`RoundCredit::Fixed`].
    pub fn claim_fixed(&mut self, user: UserId) -> Result<Placement, RosterError> {
        if !self.roster.signup_open {
            return Err(RosterError::SignupClosed);
        }
        match self.placement_of(user) {
            Some(placement) => {
                self.roster.credits.insert(user, RoundCredit::Fixed);
                Ok(placement)
            }
            None => self.insert_new(user, RoundCredit::Fixed),
        }
    }

    /// Administrator join with a single round; ignores the signup gate.
    pub fn admin_add(&mut self, user: UserId) -> Result<Placement, RosterError> {
        self.insert_new(user, RoundCredit::Finite(1))
    }

    /// Remove `user` from whichever list holds them and forget their credit.
    pub fn remove(&mut self, user: UserId) -> Result<Placement, RosterError> {
        let placement = self.placement_of(user).ok_or(RosterError::NotListed(user))?;
        self.roster.participants.retain(|listed| *listed != user);
        self.roster.waitlist.retain(|listed| *listed != user);
        self.roster.credits.shift_remove(&user);
        Ok(placement)
    }

    /// Self removal from the waitlist; participants cannot leave this way.
    pub fn leave_waitlist(&mut self, user: UserId) -> Result<(), RosterError> {
        if !self.roster.is_waitlisted(user) {
            return Err(RosterError::NotWaitlisted(user));
        }
        self.remove(user).map(|_| ())
    }

    /// Administrator removal; the freed slot is refilled from the waitlist head.
    pub fn delete(&mut self, user: UserId) -> Result<Vec<UserId>, RosterError> {
        self.remove(user)?;
        Ok(self.backfill(&[]))
    }

    /// Member left the guild. Returns whether the roster changed.
    pub fn member_left(&mut self, user: UserId) -> bool {
        self.delete(user).is_ok()
    }

    /// Move a waitlisted user into the participants.
    ///
    /// When every slot is taken, `evict` (or the most recently added participant) goes to
    /// the waitlist front first. `position` is the 1-based participant position to insert
    /// at, clamped; the user is appended when it is absent. Remaining vacancies are filled
    /// from the waitlist head, never with the evicted user.
    pub fn promote(
        &mut self,
        user: UserId,
        evict: Option<UserId>,
        position: Option<usize>,
    ) -> Result<Promotion, RosterError> {
        let wait_index = self
            .roster
            .waitlist
            .iter()
            .position(|listed| *listed == user)
            .ok_or(RosterError::NotWaitlisted(user))?;

        let capacity = self.capacity();
        if capacity == 0 {
            return Err(RosterError::NoCapacity);
        }

        let evicted = if self.roster.participants.len() >= capacity {
            let target = match evict {
                Some(target) if self.roster.is_participant(target) => target,
                Some(target) => return Err(RosterError::NotParticipant(target)),
                None => *self
                    .roster
                    .participants
                    .last()
                    .ok_or(RosterError::NoCapacity)?,
            };
            Some(target)
        } else {
            None
        };

        self.roster.waitlist.remove(wait_index);
        if let Some(target) = evicted {
            self.roster.participants.retain(|listed| *listed != target);
            self.roster.waitlist.insert(0, target);
        }

        let len = self.roster.participants.len();
        let index = position.map_or(len, |slot| slot.clamp(1, len + 1) - 1);
        self.roster.participants.insert(index, user);
        self.roster
            .credits
            .entry(user)
            .or_insert(RoundCredit::Finite(1));

        let refilled = self.backfill(evicted.as_slice());
        Ok(Promotion { evicted, refilled })
    }

    /// Move `user` to the 1-based waitlist `position`, clamped to the valid range.
    ///
    /// A participant gives up their slot, which is refilled from the waitlist head without
    /// picking them again. A waitlisted user is only repositioned.
    pub fn demote(&mut self, user: UserId, position: usize) -> Result<Demotion, RosterError> {
        if let Some(index) = self
            .roster
            .participants
            .iter()
            .position(|listed| *listed == user)
        {
            self.roster.participants.remove(index);
            let slot = self.insert_waiting(user, position);
            let promoted = self.backfill(&[user]);
            let slot = self
                .roster
                .waitlist
                .iter()
                .position(|listed| *listed == user)
                .map_or(slot, |index| index + 1);
            return Ok(Demotion {
                position: slot,
                was_participant: true,
                promoted,
            });
        }

        if let Some(index) = self
            .roster
            .waitlist
            .iter()
            .position(|listed| *listed == user)
        {
            self.roster.waitlist.remove(index);
            let slot = self.insert_waiting(user, position);
            return Ok(Demotion {
                position: slot,
                was_participant: false,
                promoted: Vec::new(),
            });
        }

        Err(RosterError::NotListed(user))
    }

    /// Demote each listed participant to the waitlist front, in order, then refill the
    /// freed slots without picking any of them. Users that are not participants are
    /// skipped; the moved ones are returned.
    pub fn demote_to_front(&mut self, users: &[UserId]) -> Vec<UserId> {
        let mut moved = Vec::new();
        for &user in users {
            if !self.roster.is_participant(user) || moved.contains(&user) {
                continue;
            }
            self.roster.participants.retain(|listed| *listed != user);
            self.roster.waitlist.insert(0, user);
            moved.push(user);
        }
        self.backfill(&moved);
        moved
    }

    /// Play one round: consume a credit from every participant, release those whose credit
    /// ran out and refill from the waitlist. The round capacity override expires with the
    /// round. The previous lists are kept for one undo.
    pub fn advance(&mut self) -> Rotated {
        self.roster.previous = Some(self.roster.capture());
        self.roster.round_capacity = None;

        let current = std::mem::take(&mut self.roster.participants);
        let mut kept = Vec::with_capacity(current.len());
        let mut dropped = Vec::new();
        for user in current {
            match self.roster.credits.get(&user).copied() {
                Some(credit) if credit.survives_rotation() => {
                    self.roster.credits.insert(user, credit.consumed());
                    kept.push(user);
                }
                _ => {
                    self.roster.credits.shift_remove(&user);
                    dropped.push(user);
                }
            }
        }
        self.roster.participants = kept;

        let promoted = self.backfill(&[]);
        self.adjust_capacity(self.capacity());
        Rotated { dropped, promoted }
    }

    /// Restore the lists saved by the last advance. Works once per advance.
    pub fn undo(&mut self) -> Result<(), RosterError> {
        let previous = self
            .roster
            .previous
            .take()
            .ok_or(RosterError::NothingToUndo)?;
        self.roster.participants = previous.participants;
        self.roster.waitlist = previous.waitlist;
        self.roster.credits = previous.credits;
        self.roster.round_capacity = previous.round_capacity;
        self.adjust_capacity(self.capacity());
        Ok(())
    }

    /// Fit the participants to `limit`: the tail moves to the waitlist front when
    /// shrinking, the waitlist head moves up when growing.
    pub fn adjust_capacity(&mut self, limit: usize) -> CapacityChange {
        let mut change = CapacityChange::default();
        while self.roster.participants.len() > limit {
            let Some(user) = self.roster.participants.pop() else {
                break;
            };
            self.roster.waitlist.insert(0, user);
            change.demoted.push(user);
        }
        while self.roster.participants.len() < limit && !self.roster.waitlist.is_empty() {
            let user = self.roster.waitlist.remove(0);
            self.roster.participants.push(user);
            change.promoted.push(user);
        }
        change
    }

    /// Set the transient capacity override and re-fit the lists.
    pub fn set_round_capacity(&mut self, count: usize) -> CapacityChange {
        self.roster.round_capacity = Some(count);
        self.adjust_capacity(self.capacity())
    }

    /// Lock the capacity across rotations and re-fit the lists.
    pub fn lock_capacity(&mut self, count: usize) -> CapacityChange {
        self.roster.locked_capacity = Some(count);
        self.adjust_capacity(self.capacity())
    }

    /// Overwrite a listed user's round credit.
    pub fn set_round_credit(&mut self, user: UserId, credit: RoundCredit) -> Result<(), RosterError> {
        if !self.roster.contains(user) {
            return Err(RosterError::NotListed(user));
        }
        self.roster.credits.insert(user, credit);
        Ok(())
    }

    /// Empty both lists and the credits. Returns the map announcement to delete, if any.
    pub fn clear(&mut self) -> Option<MessageId> {
        self.roster.participants.clear();
        self.roster.waitlist.clear();
        self.roster.credits.clear();
        self.roster.links.last_map_message.take()
    }

    fn placement_of(&self, user: UserId) -> Option<Placement> {
        if self.roster.is_participant(user) {
            return Some(Placement::Participant);
        }
        self.roster
            .waitlist
            .iter()
            .position(|listed| *listed == user)
            .map(|index| Placement::Waitlist(index + 1))
    }

    fn insert_new(&mut self, user: UserId, credit: RoundCredit) -> Result<Placement, RosterError> {
        if self.roster.contains(user) {
            return Err(RosterError::AlreadyListed(user));
        }
        let placement = if self.roster.participants.len() < self.capacity() {
            self.roster.participants.push(user);
            Placement::Participant
        } else {
            self.roster.waitlist.push(user);
            Placement::Waitlist(self.roster.waitlist.len())
        };
        self.roster.credits.insert(user, credit);
        Ok(placement)
    }

    fn insert_waiting(&mut self, user: UserId, position: usize) -> usize {
        let slot = position.clamp(1, self.roster.waitlist.len() + 1);
        self.roster.waitlist.insert(slot - 1, user);
        slot
    }

    /// Pull from the waitlist head while slots are free, passing over `skip`.
    fn backfill(&mut self, skip: &[UserId]) -> Vec<UserId> {
        let capacity = self.capacity();
        let mut promoted = Vec::new();
        while self.roster.participants.len() < capacity {
            let Some(index) = self
                .roster
                .waitlist
                .iter()
                .position(|listed| !skip.contains(listed))
            else {
                break;
            };
            let user = self.roster.waitlist.remove(index);
            self.roster.participants.push(user);
            promoted.push(user);
        }
        promoted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::roster::{MessageLinks, SignupMode};

    const A: UserId = 1;
    const B: UserId = 2;
    const C: UserId = 3;
    const D: UserId = 4;
    const E: UserId = 5;

    fn open_roster(capacity: usize) -> Roster {
        let mut roster = Roster::new(SignupMode::Registration, capacity, MessageLinks::default());
        roster.set_signup_open(true);
        roster
    }

    fn join_all(roster: &mut Roster, users: &[(UserId, JoinWeight)]) {
        let mut rotation = Rotation::new(roster, 9);
        for (user, weight) in users {
            rotation.join(*user, *weight).unwrap();
        }
    }

    fn one() -> JoinWeight {
        JoinWeight::Rounds(1)
    }

    #[test]
    fn join_fills_participants_then_waitlist_tail() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one()), (D, one())]);

        let mut rotation = Rotation::new(&mut roster, 9);
        assert_eq!(rotation.join(E, one()), Ok(Placement::Waitlist(2)));

        assert_eq!(roster.participants(), &[A, B, C]);
        assert_eq!(roster.waitlist(), &[D, E]);
        roster.assert_consistent(9);
    }

    #[test]
    fn join_rejects_when_closed_or_duplicate() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, one())]);

        let mut rotation = Rotation::new(&mut roster, 9);
        assert_eq!(rotation.join(A, JoinWeight::Rounds(3)), Err(RosterError::AlreadyListed(A)));

        rotation.roster_mut().set_signup_open(false);
        assert_eq!(rotation.join(B, one()), Err(RosterError::SignupClosed));
        assert_eq!(roster.credit(A), Some(RoundCredit::Finite(1)));
        assert!(!roster.contains(B));
    }

    #[test]
    fn join_and_remove_sequences_keep_lists_disjoint() {
        let mut roster = open_roster(2);
        let script: &[(bool, UserId)] = &[
            (true, A),
            (true, B),
            (true, C),
            (false, A),
            (true, A),
            (true, D),
            (false, C),
            (true, C),
            (false, B),
            (true, E),
            (true, B),
        ];

        for (join, user) in script {
            let mut rotation = Rotation::new(&mut roster, 9);
            if *join {
                let _ = rotation.join(*user, one());
            } else {
                let _ = rotation.delete(*user);
            }
            roster.assert_consistent(9);
        }
    }

    #[test]
    fn advance_consumes_credits_and_backfills() {
        let mut roster = open_roster(3);
        join_all(
            &mut roster,
            &[
                (A, one()),
                (B, JoinWeight::Rounds(2)),
                (C, JoinWeight::Fixed),
                (D, one()),
            ],
        );

        let rotated = Rotation::new(&mut roster, 9).advance();

        assert_eq!(rotated.dropped, vec![A]);
        assert_eq!(rotated.promoted, vec![D]);
        assert_eq!(roster.participants(), &[B, C, D]);
        assert!(roster.waitlist().is_empty());
        assert_eq!(roster.credit(A), None);
        assert_eq!(roster.credit(B), Some(RoundCredit::Finite(1)));
        assert_eq!(roster.credit(C), Some(RoundCredit::Fixed));
        assert_eq!(roster.credit(D), Some(RoundCredit::Finite(1)));
        roster.assert_consistent(9);
    }

    #[test]
    fn advance_with_only_fixed_participants_changes_nothing() {
        let mut roster = open_roster(3);
        join_all(
            &mut roster,
            &[(A, JoinWeight::Fixed), (B, JoinWeight::Fixed), (C, JoinWeight::Fixed)],
        );

        Rotation::new(&mut roster, 9).advance();
        Rotation::new(&mut roster, 9).advance();

        assert_eq!(roster.participants(), &[A, B, C]);
        assert!(roster.credits().values().all(|c| *c == RoundCredit::Fixed));
    }

    #[test]
    fn advance_drops_participants_without_credit() {
        let mut roster = open_roster(2);
        join_all(&mut roster, &[(A, one()), (B, one())]);
        Rotation::new(&mut roster, 9)
            .set_round_credit(A, RoundCredit::Finite(0))
            .unwrap();

        let rotated = Rotation::new(&mut roster, 9).advance();
        assert_eq!(rotated.dropped, vec![A, B]);
        assert!(roster.participants().is_empty());
        assert!(roster.credits().is_empty());
    }

    #[test]
    fn undo_restores_exactly_once() {
        let mut roster = open_roster(2);
        join_all(
            &mut roster,
            &[(A, one()), (B, JoinWeight::Rounds(3)), (C, one()), (D, JoinWeight::Rounds(2))],
        );
        let before = (
            roster.participants().to_vec(),
            roster.waitlist().to_vec(),
            roster.credits().clone(),
        );

        Rotation::new(&mut roster, 9).advance();
        assert_ne!(roster.participants(), before.0.as_slice());

        Rotation::new(&mut roster, 9).undo().unwrap();
        assert_eq!(roster.participants(), before.0.as_slice());
        assert_eq!(roster.waitlist(), before.1.as_slice());
        assert_eq!(roster.credits(), &before.2);
        assert!(roster.previous().is_none());

        assert_eq!(
            Rotation::new(&mut roster, 9).undo(),
            Err(RosterError::NothingToUndo)
        );
        assert_eq!(RosterError::NothingToUndo.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn adjust_capacity_is_idempotent() {
        let mut roster = open_roster(5);
        join_all(
            &mut roster,
            &[(A, one()), (B, one()), (C, one()), (D, one()), (E, one())],
        );

        let first = Rotation::new(&mut roster, 9).adjust_capacity(3);
        assert_eq!(first.demoted, vec![E, D]);
        let once = roster.clone();

        let second = Rotation::new(&mut roster, 9).adjust_capacity(3);
        assert_eq!(second, CapacityChange::default());
        assert_eq!(roster, once);
        assert_eq!(roster.participants(), &[A, B, C]);
        assert_eq!(roster.waitlist(), &[D, E]);
    }

    #[test]
    fn growing_capacity_pulls_from_waitlist_head() {
        let mut roster = open_roster(1);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one())]);

        let change = Rotation::new(&mut roster, 9).lock_capacity(2);
        assert_eq!(change.promoted, vec![B]);
        assert_eq!(roster.participants(), &[A, B]);
        assert_eq!(roster.waitlist(), &[C]);
        assert_eq!(roster.locked_capacity(), Some(2));

        Rotation::new(&mut roster, 9).set_round_capacity(1);
        assert_eq!(roster.participants(), &[A, B], "lock wins over round override");
        roster.assert_consistent(9);
    }

    #[test]
    fn promote_when_full_evicts_tail_to_waitlist_front() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one()), (D, one())]);

        let promotion = Rotation::new(&mut roster, 9)
            .promote(D, None, Some(1))
            .unwrap();

        assert_eq!(promotion.evicted, Some(C));
        assert!(promotion.refilled.is_empty());
        assert_eq!(roster.participants(), &[D, A, B]);
        assert_eq!(roster.waitlist(), &[C]);
        roster.assert_consistent(9);
    }

    #[test]
    fn promote_honours_named_eviction_and_clamps_position() {
        let mut roster = open_roster(3);
        join_all(
            &mut roster,
            &[(A, one()), (B, one()), (C, one()), (D, one()), (E, one())],
        );

        let promotion = Rotation::new(&mut roster, 9)
            .promote(E, Some(A), Some(42))
            .unwrap();

        assert_eq!(promotion.evicted, Some(A));
        assert_eq!(roster.participants(), &[B, C, E]);
        assert_eq!(roster.waitlist(), &[A, D]);

        let err = Rotation::new(&mut roster, 9).promote(D, Some(99), None);
        assert_eq!(err, Err(RosterError::NotParticipant(99)));
        assert_eq!(roster.waitlist(), &[A, D], "failed promote leaves roster untouched");
    }

    #[test]
    fn promote_requires_waitlisted_user() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, one())]);

        let mut rotation = Rotation::new(&mut roster, 9);
        assert_eq!(rotation.promote(A, None, None), Err(RosterError::NotWaitlisted(A)));
        assert_eq!(rotation.promote(B, None, None), Err(RosterError::NotWaitlisted(B)));
        assert_eq!(RosterError::NotWaitlisted(B).kind(), ErrorKind::NotFound);
    }

    #[test]
    fn promote_with_free_slot_appends_and_grants_one_round() {
        let mut roster = open_roster(1);
        join_all(&mut roster, &[(A, one()), (B, one())]);
        Rotation::new(&mut roster, 9).remove(A).unwrap();
        roster.credits.shift_remove(&B);

        let promotion = Rotation::new(&mut roster, 9).promote(B, None, None).unwrap();
        assert_eq!(promotion.evicted, None);
        assert_eq!(roster.participants(), &[B]);
        assert_eq!(roster.credit(B), Some(RoundCredit::Finite(1)));
    }

    #[test]
    fn demote_clamps_position_and_backfills_someone_else() {
        let mut roster = open_roster(2);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one()), (D, one())]);

        let demotion = Rotation::new(&mut roster, 9).demote(A, 0).unwrap();
        assert_eq!(demotion.position, 1);
        assert!(demotion.was_participant);
        assert_eq!(demotion.promoted, vec![C]);
        assert_eq!(roster.participants(), &[B, C]);
        assert_eq!(roster.waitlist(), &[A, D]);

        let demotion = Rotation::new(&mut roster, 9).demote(A, 10).unwrap();
        assert_eq!(demotion.position, 2);
        assert!(!demotion.was_participant);
        assert_eq!(roster.waitlist(), &[D, A]);

        assert_eq!(
            Rotation::new(&mut roster, 9).demote(E, 1),
            Err(RosterError::NotListed(E))
        );
        roster.assert_consistent(9);
    }

    #[test]
    fn demote_with_empty_waitlist_keeps_user_waiting() {
        let mut roster = open_roster(2);
        join_all(&mut roster, &[(A, one()), (B, one())]);

        let demotion = Rotation::new(&mut roster, 9).demote(B, 1).unwrap();
        assert!(demotion.promoted.is_empty());
        assert_eq!(roster.participants(), &[A]);
        assert_eq!(roster.waitlist(), &[B]);
    }

    #[test]
    fn demote_to_front_skips_non_participants() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one())]);

        let moved = Rotation::new(&mut roster, 9).demote_to_front(&[C, E, A]);
        assert_eq!(moved, vec![C, A]);
        assert_eq!(roster.participants(), &[B]);
        assert_eq!(roster.waitlist(), &[A, C]);
    }

    #[test]
    fn demote_to_front_never_refills_with_moved_users() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one()), (D, one())]);

        let moved = Rotation::new(&mut roster, 9).demote_to_front(&[A, B, A]);

        assert_eq!(moved, vec![A, B]);
        assert_eq!(roster.participants(), &[C, D]);
        assert_eq!(roster.waitlist(), &[B, A]);
        roster.assert_consistent(9);
    }

    #[test]
    fn round_capacity_expires_with_the_round_and_comes_back_on_undo() {
        let mut roster = open_roster(4);
        let three = JoinWeight::Rounds(3);
        join_all(
            &mut roster,
            &[(1, three), (2, three), (3, three), (4, three), (5, three), (6, three)],
        );
        Rotation::new(&mut roster, 9).set_round_capacity(2);
        assert_eq!(roster.participants(), &[1, 2]);
        let before = roster.clone();

        let rotated = Rotation::new(&mut roster, 9).advance();
        assert_eq!(roster.round_capacity(), None);
        assert_eq!(rotated.promoted, vec![3, 4]);
        assert_eq!(roster.participants(), &[1, 2, 3, 4]);

        Rotation::new(&mut roster, 9).undo().unwrap();
        assert_eq!(roster.round_capacity(), Some(2));
        assert_eq!(roster.participants(), before.participants());
        assert_eq!(roster.waitlist(), before.waitlist());
        assert_eq!(roster.credits(), before.credits());

        Rotation::new(&mut roster, 9).advance();
        Rotation::new(&mut roster, 9).advance();
        assert_eq!(roster.round_capacity(), None);
        assert_eq!(roster.participants().len(), 4);
        roster.assert_consistent(9);
    }

    #[test]
    fn claim_fixed_upgrades_listed_user() {
        let mut roster = open_roster(1);
        join_all(&mut roster, &[(A, one()), (B, JoinWeight::Rounds(2))]);

        let mut rotation = Rotation::new(&mut roster, 9);
        assert_eq!(rotation.claim_fixed(B), Ok(Placement::Waitlist(1)));
        assert_eq!(rotation.claim_fixed(C), Ok(Placement::Waitlist(2)));
        assert_eq!(roster.credit(B), Some(RoundCredit::Fixed));
        assert_eq!(roster.credit(C), Some(RoundCredit::Fixed));
    }

    #[test]
    fn leave_waitlist_only_accepts_waiting_users() {
        let mut roster = open_roster(1);
        join_all(&mut roster, &[(A, one()), (B, one())]);

        let mut rotation = Rotation::new(&mut roster, 9);
        assert_eq!(rotation.leave_waitlist(A), Err(RosterError::NotWaitlisted(A)));
        rotation.leave_waitlist(B).unwrap();
        assert!(roster.waitlist().is_empty());
        assert_eq!(roster.credit(B), None);
    }

    #[test]
    fn delete_backfills_and_admin_add_ignores_gate() {
        let mut roster = open_roster(2);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one())]);
        roster.set_signup_open(false);

        let mut rotation = Rotation::new(&mut roster, 9);
        assert_eq!(rotation.delete(A), Ok(vec![C]));
        assert_eq!(rotation.admin_add(D), Ok(Placement::Waitlist(1)));
        assert!(!rotation.member_left(E));
        assert!(rotation.member_left(B));

        assert_eq!(roster.participants(), &[C, D]);
        roster.assert_consistent(9);
    }

    #[test]
    fn set_round_credit_requires_listed_user() {
        let mut roster = open_roster(2);
        join_all(&mut roster, &[(A, one())]);

        let mut rotation = Rotation::new(&mut roster, 9);
        rotation.set_round_credit(A, RoundCredit::Finite(5)).unwrap();
        assert_eq!(
            rotation.set_round_credit(B, RoundCredit::Finite(1)),
            Err(RosterError::NotListed(B))
        );
        assert_eq!(roster.credit(A), Some(RoundCredit::Finite(5)));
    }

    #[test]
    fn clear_empties_lists_and_returns_map_message() {
        let mut roster = open_roster(2);
        join_all(&mut roster, &[(A, one()), (B, one()), (C, one())]);
        roster.links_mut().last_map_message = Some(77);

        let map = Rotation::new(&mut roster, 9).clear();
        assert_eq!(map, Some(77));
        assert!(roster.participants().is_empty());
        assert!(roster.waitlist().is_empty());
        assert!(roster.credits().is_empty());
        assert_eq!(roster.links().last_map_message, None);
    }

    #[test]
    fn undo_after_lock_change_still_respects_capacity() {
        let mut roster = open_roster(3);
        join_all(&mut roster, &[(A, JoinWeight::Fixed), (B, JoinWeight::Fixed), (C, one())]);

        Rotation::new(&mut roster, 9).advance();
        Rotation::new(&mut roster, 9).lock_capacity(2);
        Rotation::new(&mut roster, 9).undo().unwrap();

        assert_eq!(roster.participants(), &[A, B]);
        assert_eq!(roster.waitlist(), &[C]);
        roster.assert_consistent(9);
    }
}
