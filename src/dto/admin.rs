//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    dto::validation::{validate_member_ref, validate_nickname},
    state::{
        roster::{ChannelId, RoundCredit, SignupMode},
        rotation::{CapacityChange, Rotated},
    },
};

/// Signup mode as exposed over the API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SignupModeDto {
    /// Weights 1/2/3 plus the fixed slot.
    #[default]
    Registration,
    /// Weight 1 only.
    Simple,
}

impl From<SignupModeDto> for SignupMode {
    fn from(value: SignupModeDto) -> Self {
        match value {
            SignupModeDto::Registration => SignupMode::Registration,
            SignupModeDto::Simple => SignupMode::Simple,
        }
    }
}

impl From<SignupMode> for SignupModeDto {
    fn from(value: SignupMode) -> Self {
        match value {
            SignupMode::Registration => SignupModeDto::Registration,
            SignupMode::Simple => SignupModeDto::Simple,
        }
    }
}

/// Create (or recreate) the signup and status messages of a guild.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SetupRequest {
    /// Channel where the signup prompt and the status message are posted.
    pub viewer_channel_id: ChannelId,
    #[serde(default)]
    pub mode: SignupModeDto,
}

/// Identifiers of the freshly posted signup surfaces.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetupResponse {
    pub mode: SignupModeDto,
    pub signup_message_id: String,
    pub status_message_id: String,
    pub capacity: usize,
}

/// Post the admin panel message.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PanelRequest {
    pub admin_channel_id: ChannelId,
}

/// Panel message identifier.
#[derive(Debug, Serialize, ToSchema)]
pub struct PanelResponse {
    pub admin_message_id: String,
}

/// Participant count used by the round override and the capacity lock.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct CapacityRequest {
    #[validate(range(min = 1, max = 100))]
    pub count: usize,
}

/// Result of a capacity change.
#[derive(Debug, Serialize, ToSchema)]
pub struct CapacityResponse {
    pub message: String,
    pub capacity: usize,
    /// Participants moved to the waitlist front.
    pub demoted: Vec<String>,
    /// Waitlisted users pulled into the participants.
    pub promoted: Vec<String>,
}

impl CapacityResponse {
    pub(crate) fn new(message: String, capacity: usize, change: CapacityChange) -> Self {
        Self {
            message,
            capacity,
            demoted: ids(&change.demoted),
            promoted: ids(&change.promoted),
        }
    }
}

/// Open or close reaction signups.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SignupToggleRequest {
    pub open: bool,
}

/// Command targeting a single member.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct MemberRequest {
    /// Numeric user ID, display name or user name.
    #[validate(custom(function = "validate_member_ref"))]
    pub member: String,
}

/// Move a waitlisted member into the participants.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PromoteRequest {
    #[validate(custom(function = "validate_member_ref"))]
    pub member: String,
    /// Participant sent to the waitlist front when every slot is taken. Defaults to the
    /// most recently added participant.
    #[serde(default)]
    #[validate(custom(function = "validate_member_ref"))]
    pub evict: Option<String>,
    /// 1-based participant position; appended when omitted.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub position: Option<usize>,
}

/// Move participants to the waitlist front.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct DemoteRequest {
    #[validate(length(min = 1))]
    pub members: Vec<String>,
}

/// Move a member to a waitlist position.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct QueuePositionRequest {
    #[validate(custom(function = "validate_member_ref"))]
    pub member: String,
    /// 1-based waitlist position, clamped to the waitlist length.
    #[serde(default = "first_position")]
    #[validate(range(min = 1))]
    pub position: usize,
}

fn first_position() -> usize {
    1
}

/// Set the remaining rounds of a listed member. Exactly one of `rounds` and `fixed`
/// must be provided.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RoundCreditRequest {
    pub member: String,
    #[serde(default)]
    pub rounds: Option<u32>,
    #[serde(default)]
    pub fixed: bool,
}

impl RoundCreditRequest {
    /// Credit requested by a validated payload.
    pub(crate) fn credit(&self) -> RoundCredit {
        match self.rounds {
            Some(rounds) if !self.fixed => RoundCredit::Finite(rounds),
            _ => RoundCredit::Fixed,
        }
    }
}

impl Validate for RoundCreditRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_member_ref(&self.member) {
            errors.add("member", e);
        }

        match (self.rounds, self.fixed) {
            (Some(_), true) | (None, false) => {
                let mut err = ValidationError::new("credit_choice");
                err.message = Some("Provide either `rounds` or `fixed`".into());
                errors.add("rounds", err);
            }
            (Some(0), false) => {
                let mut err = ValidationError::new("credit_range");
                err.message = Some("Rounds must be at least 1".into());
                errors.add("rounds", err);
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Replace the nickname registered for a member.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NicknameOverrideRequest {
    #[validate(custom(function = "validate_member_ref"))]
    pub member: String,
    #[validate(length(min = 1, max = 64))]
    pub nickname: String,
}

/// Party code announced in the viewer channel.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct PartyCodeRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
}

/// Nickname registration through an explicit command.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct NicknameRequest {
    pub user_id: u64,
    #[validate(custom(function = "validate_nickname"))]
    pub nickname: String,
}

/// Generic acknowledgement carrying the reply shown to the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}

impl ActionResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Outcome of a rotation advance.
#[derive(Debug, Serialize, ToSchema)]
pub struct RotationResponse {
    /// Participants whose rounds ran out.
    pub dropped: Vec<String>,
    /// Waitlisted users moved into the freed slots.
    pub promoted: Vec<String>,
}

impl From<Rotated> for RotationResponse {
    fn from(value: Rotated) -> Self {
        Self {
            dropped: ids(&value.dropped),
            promoted: ids(&value.promoted),
        }
    }
}

/// Current roster of a guild.
#[derive(Debug, Serialize, ToSchema)]
pub struct RosterSummary {
    pub mode: SignupModeDto,
    /// Rendered status text.
    pub text: String,
    pub participants: Vec<String>,
    pub waitlist: Vec<String>,
    pub capacity: usize,
    pub signup_open: bool,
    pub party_code: Option<String>,
}

/// Map announced by the random map command.
#[derive(Debug, Serialize, ToSchema)]
pub struct RandomMapResponse {
    pub map: String,
    pub message_id: String,
}

/// Where a manual backup was appended.
#[derive(Debug, Serialize, ToSchema)]
pub struct BackupResponse {
    pub message: String,
    pub location: String,
}

/// New mode after a mode change.
#[derive(Debug, Serialize, ToSchema)]
pub struct ModeChangeResponse {
    pub message: String,
    pub mode: SignupModeDto,
    pub discarded_events: usize,
}

/// User IDs are rendered as strings so 64-bit snowflakes survive JavaScript clients.
pub(crate) fn ids(users: &[u64]) -> Vec<String> {
    users.iter().map(u64::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_credit_requires_exactly_one_choice() {
        let both = RoundCreditRequest {
            member: "alice".into(),
            rounds: Some(2),
            fixed: true,
        };
        assert!(both.validate().is_err());

        let neither = RoundCreditRequest {
            member: "alice".into(),
            rounds: None,
            fixed: false,
        };
        assert!(neither.validate().is_err());

        let zero = RoundCreditRequest {
            member: "alice".into(),
            rounds: Some(0),
            fixed: false,
        };
        assert!(zero.validate().is_err());

        let fixed = RoundCreditRequest {
            member: "alice".into(),
            rounds: None,
            fixed: true,
        };
        assert!(fixed.validate().is_ok());
        assert_eq!(fixed.credit(), RoundCredit::Fixed);
    }

    #[test]
    fn capacity_and_member_rules() {
        assert!(CapacityRequest { count: 0 }.validate().is_err());
        assert!(CapacityRequest { count: 9 }.validate().is_ok());
        assert!(
            MemberRequest {
                member: "  ".into()
            }
            .validate()
            .is_err()
        );
        assert!(DemoteRequest { members: vec![] }.validate().is_err());
    }

    #[test]
    fn setup_mode_defaults_to_registration() {
        let request: SetupRequest = serde_json::from_str(r#"{"viewer_channel_id": 7}"#).unwrap();
        assert_eq!(request.mode, SignupModeDto::Registration);
        assert_eq!(SignupMode::from(request.mode), SignupMode::Registration);
    }
}
