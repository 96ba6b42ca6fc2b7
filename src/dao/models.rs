//! Persisted layout of the roster and nickname documents.

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::state::roster::{
    Generation, MessageLinks, Roster, RosterParts, RoundCredit, SignupMode, UserId,
};

/// Guild ID (as a string) to roster record.
pub type RosterDocument = BTreeMap<String, RosterEntity>;
/// User ID (as a string) to registered nickname.
pub type NicknameDocument = BTreeMap<String, String>;

/// Persisted signup mode.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModeEntity {
    /// Tiered signup.
    #[default]
    Registration,
    /// Single-round signup.
    Simple,
}

/// Marker value stored for permanent slots.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FixedMarker {
    /// Serialized as `"fixed"`.
    Fixed,
}

/// Persisted round credit: a number of rounds, or `"fixed"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RoundCreditEntity {
    /// Remaining rounds.
    Rounds(u32),
    /// Permanent slot.
    Marker(FixedMarker),
}

/// Lists saved before the last rotation advance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct GenerationEntity {
    /// Participants before the advance.
    #[serde(default)]
    pub participants: Vec<UserId>,
    /// Waitlist before the advance.
    #[serde(default)]
    pub waitlist: Vec<UserId>,
    /// Round credits before the advance.
    #[serde(default)]
    pub round_credits: IndexMap<UserId, RoundCreditEntity>,
    /// Capacity override of the played round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub round_participants: Option<usize>,
}

/// Roster record of one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntity {
    /// Signup mode.
    #[serde(default)]
    pub mode: ModeEntity,
    /// Participants in priority order.
    #[serde(default)]
    pub participants: Vec<UserId>,
    /// Waitlist, front first.
    #[serde(default)]
    pub waitlist: Vec<UserId>,
    /// Round credits keyed by user.
    #[serde(default)]
    pub round_credits: IndexMap<UserId, RoundCreditEntity>,
    /// Capacity configured for the mode.
    pub max_participants: Option<usize>,
    /// Transient capacity override.
    #[serde(default)]
    pub round_participants: Option<usize>,
    /// Capacity lock.
    #[serde(default)]
    pub locked_participants: Option<usize>,
    /// Whether reaction joins are accepted.
    #[serde(default)]
    pub signup_open: bool,
    /// Channel of the signup and status messages.
    #[serde(default)]
    pub viewer_channel_id: Option<u64>,
    /// Signup message.
    #[serde(default)]
    pub viewer_msg_id: Option<u64>,
    /// Status message.
    #[serde(default)]
    pub viewer_status_msg_id: Option<u64>,
    /// Channel of the admin panel.
    #[serde(default)]
    pub admin_channel_id: Option<u64>,
    /// Admin panel message.
    #[serde(default)]
    pub admin_msg_id: Option<u64>,
    /// Last random map announcement.
    #[serde(default)]
    pub last_map_msg_id: Option<u64>,
    /// Advertised party code.
    #[serde(default)]
    pub party_code: Option<String>,
    /// Party code message.
    #[serde(default)]
    pub party_code_msg_id: Option<u64>,
    /// Undo generation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<GenerationEntity>,
}

impl From<RoundCredit> for RoundCreditEntity {
    fn from(value: RoundCredit) -> Self {
        match value {
            RoundCredit::Finite(left) => RoundCreditEntity::Rounds(left),
            RoundCredit::Fixed => RoundCreditEntity::Marker(FixedMarker::Fixed),
        }
    }
}

impl From<RoundCreditEntity> for RoundCredit {
    fn from(value: RoundCreditEntity) -> Self {
        match value {
            RoundCreditEntity::Rounds(left) => RoundCredit::Finite(left),
            RoundCreditEntity::Marker(FixedMarker::Fixed) => RoundCredit::Fixed,
        }
    }
}

impl From<SignupMode> for ModeEntity {
    fn from(value: SignupMode) -> Self {
        match value {
            SignupMode::Registration => ModeEntity::Registration,
            SignupMode::Simple => ModeEntity::Simple,
        }
    }
}

impl From<ModeEntity> for SignupMode {
    fn from(value: ModeEntity) -> Self {
        match value {
            ModeEntity::Registration => SignupMode::Registration,
            ModeEntity::Simple => SignupMode::Simple,
        }
    }
}

fn credits_to_entity(
    credits: &IndexMap<UserId, RoundCredit>,
) -> IndexMap<UserId, RoundCreditEntity> {
    credits
        .iter()
        .map(|(user, credit)| (*user, (*credit).into()))
        .collect()
}

fn credits_from_entity(
    credits: IndexMap<UserId, RoundCreditEntity>,
) -> IndexMap<UserId, RoundCredit> {
    credits
        .into_iter()
        .map(|(user, credit)| (user, credit.into()))
        .collect()
}

impl From<&Roster> for RosterEntity {
    fn from(roster: &Roster) -> Self {
        let parts = roster.to_parts();
        let links = parts.links;
        Self {
            mode: parts.mode.into(),
            participants: parts.participants,
            waitlist: parts.waitlist,
            round_credits: credits_to_entity(&parts.credits),
            max_participants: parts.configured_capacity,
            round_participants: parts.round_capacity,
            locked_participants: parts.locked_capacity,
            signup_open: parts.signup_open,
            viewer_channel_id: links.viewer_channel,
            viewer_msg_id: links.signup_message,
            viewer_status_msg_id: links.status_message,
            admin_channel_id: links.admin_channel,
            admin_msg_id: links.admin_message,
            last_map_msg_id: links.last_map_message,
            party_code: links.party_code,
            party_code_msg_id: links.party_code_message,
            previous: parts.previous.map(|generation| GenerationEntity {
                round_credits: credits_to_entity(&generation.credits),
                participants: generation.participants,
                waitlist: generation.waitlist,
                round_participants: generation.round_capacity,
            }),
        }
    }
}

impl From<RosterEntity> for Roster {
    fn from(entity: RosterEntity) -> Self {
        Roster::from_parts(RosterParts {
            mode: entity.mode.into(),
            participants: entity.participants,
            waitlist: entity.waitlist,
            credits: credits_from_entity(entity.round_credits),
            configured_capacity: entity.max_participants,
            round_capacity: entity.round_participants,
            locked_capacity: entity.locked_participants,
            signup_open: entity.signup_open,
            links: MessageLinks {
                viewer_channel: entity.viewer_channel_id,
                signup_message: entity.viewer_msg_id,
                status_message: entity.viewer_status_msg_id,
                admin_channel: entity.admin_channel_id,
                admin_message: entity.admin_msg_id,
                last_map_message: entity.last_map_msg_id,
                party_code: entity.party_code,
                party_code_message: entity.party_code_msg_id,
            },
            previous: entity.previous.map(|generation| Generation {
                participants: generation.participants,
                waitlist: generation.waitlist,
                credits: credits_from_entity(generation.round_credits),
                round_capacity: generation.round_participants,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn round_credits_use_numbers_and_fixed_marker() {
        let mut credits = IndexMap::new();
        credits.insert(11, RoundCredit::Finite(2));
        credits.insert(12, RoundCredit::Fixed);
        let roster = Roster::from_parts(RosterParts {
            participants: vec![11, 12],
            credits,
            configured_capacity: Some(9),
            locked_capacity: Some(5),
            signup_open: true,
            ..RosterParts::default()
        });

        let value = serde_json::to_value(RosterEntity::from(&roster)).unwrap();

        assert_eq!(value["roundCredits"], json!({"11": 2, "12": "fixed"}));
        assert_eq!(value["maxParticipants"], json!(9));
        assert_eq!(value["lockedParticipants"], json!(5));
        assert_eq!(value["roundParticipants"], json!(null));
        assert_eq!(value["mode"], json!("registration"));
        assert!(value.get("previous").is_none());
    }

    #[test]
    fn legacy_records_without_optional_fields_load() {
        let entity: RosterEntity = serde_json::from_value(json!({
            "participants": [1, 2],
            "waitlist": [3],
            "roundCredits": {"1": 1, "2": "fixed", "3": 3},
            "maxParticipants": 4,
            "viewerMsgId": 100
        }))
        .unwrap();

        let roster = Roster::from(entity);
        assert_eq!(roster.mode(), SignupMode::Registration);
        assert_eq!(roster.credit(2), Some(RoundCredit::Fixed));
        assert_eq!(roster.credit(3), Some(RoundCredit::Finite(3)));
        assert_eq!(roster.links().signup_message, Some(100));
        assert!(!roster.signup_open());
        assert_eq!(roster.resolve_capacity(9), 4);
    }

    #[test]
    fn previous_generation_survives_persistence() {
        let mut credits = IndexMap::new();
        credits.insert(1, RoundCredit::Finite(1));
        let roster = Roster::from_parts(RosterParts {
            mode: SignupMode::Simple,
            participants: vec![1],
            credits: credits.clone(),
            previous: Some(Generation {
                participants: vec![1],
                waitlist: vec![],
                credits,
                round_capacity: Some(3),
            }),
            ..RosterParts::default()
        });

        let text = serde_json::to_string(&RosterEntity::from(&roster)).unwrap();
        let restored = Roster::from(serde_json::from_str::<RosterEntity>(&text).unwrap());

        assert_eq!(restored, roster);
    }
}
