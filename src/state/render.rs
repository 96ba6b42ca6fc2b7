//! Text rendering of a roster for the status message.

use crate::state::{
    members::{MemberLookup, NO_TIER},
    nicknames::NicknameLookup,
    roster::{Roster, RoundCredit, UserId},
};

/// Line shown when nobody holds a slot.
pub const EMPTY_PLACEHOLDER: &str = "(아직 없음)";
/// Heading introducing the waitlist.
pub const WAITLIST_HEADING: &str = "🔼 대기자:";

/// Everything besides the roster needed to render it.
pub struct RenderContext<'a> {
    /// First line of the status message.
    pub header: &'a str,
    /// Role names recognised as tiers, in priority order.
    pub tiers: &'a [String],
    /// Member profiles of the guild.
    pub members: &'a dyn MemberLookup,
    /// Registered nicknames.
    pub nicknames: &'a dyn NicknameLookup,
}

/// Render `roster` as the status message text. Deterministic for equal inputs.
pub fn render(roster: &Roster, context: &RenderContext<'_>) -> String {
    let mut lines = vec![context.header.to_string()];

    if roster.participants().is_empty() {
        lines.push(EMPTY_PLACEHOLDER.to_string());
    } else {
        lines.extend(
            roster
                .participants()
                .iter()
                .map(|user| entry_line(roster, *user, context)),
        );
    }

    if !roster.waitlist().is_empty() {
        lines.push(WAITLIST_HEADING.to_string());
        lines.extend(
            roster
                .waitlist()
                .iter()
                .map(|user| entry_line(roster, *user, context)),
        );
    }

    lines.join("\n")
}

/// Status text of a roster that has no entries yet.
pub fn empty_status(header: &str) -> String {
    format!("{header}\n{EMPTY_PLACEHOLDER}")
}

fn entry_line(roster: &Roster, user: UserId, context: &RenderContext<'_>) -> String {
    let profile = context.members.profile(user);
    let (name, tier) = match &profile {
        Some(profile) => (profile.display_name.clone(), profile.tier(context.tiers)),
        None => (format!("알수없음({user})"), NO_TIER),
    };
    let nickname = context
        .nicknames
        .nickname(user)
        .map(|nick| format!(" / `{nick}`"))
        .unwrap_or_default();

    format!("{name}{nickname} [{tier}]{}", credit_suffix(roster.credit(user)))
}

fn credit_suffix(credit: Option<RoundCredit>) -> String {
    match credit {
        Some(RoundCredit::Fixed) => " (고정)".to_string(),
        Some(RoundCredit::Finite(left)) if left > 1 => format!(" ({left}판)"),
        Some(RoundCredit::Finite(1)) => " (1판)".to_string(),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::state::{
        members::MemberProfile,
        nicknames::NicknameBook,
        rotation::{JoinWeight, Rotation},
        roster::{MessageLinks, SignupMode},
    };

    const HEADER: &str = "📋 참가자 목록:";

    fn tiers() -> Vec<String> {
        ["레", "불", "초"].iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn empty_roster_shows_placeholder() {
        let roster = Roster::new(SignupMode::Registration, 9, MessageLinks::default());
        let members: HashMap<UserId, MemberProfile> = HashMap::new();
        let nicknames = NicknameBook::default();
        let tiers = tiers();
        let context = RenderContext {
            header: HEADER,
            tiers: &tiers,
            members: &members,
            nicknames: &nicknames,
        };

        assert_eq!(render(&roster, &context), format!("{HEADER}\n(아직 없음)"));
        assert_eq!(render(&roster, &context), empty_status(HEADER));
    }

    #[test]
    fn renders_participants_and_waitlist() {
        let mut roster = Roster::new(SignupMode::Registration, 2, MessageLinks::default());
        roster.set_signup_open(true);
        {
            let mut rotation = Rotation::new(&mut roster, 9);
            rotation.join(1, JoinWeight::Rounds(3)).unwrap();
            rotation.join(2, JoinWeight::Fixed).unwrap();
            rotation.join(3, JoinWeight::Rounds(1)).unwrap();
        }

        let mut members = HashMap::new();
        members.insert(
            1,
            MemberProfile {
                display_name: "Alice".into(),
                username: "alice".into(),
                roles: vec!["불".into()],
            },
        );
        members.insert(
            3,
            MemberProfile {
                display_name: "Carol".into(),
                username: "carol".into(),
                roles: vec![],
            },
        );
        let nicknames = NicknameBook::from_entries([(1, "ali#KR1".to_string())]);
        let tiers = tiers();
        let context = RenderContext {
            header: HEADER,
            tiers: &tiers,
            members: &members,
            nicknames: &nicknames,
        };

        let expected = [
            HEADER,
            "Alice / `ali#KR1` [불] (3판)",
            "알수없음(2) [티어 없음] (고정)",
            "🔼 대기자:",
            "Carol [티어 없음] (1판)",
        ]
        .join("\n");
        assert_eq!(render(&roster, &context), expected);
    }

    #[test]
    fn missing_or_spent_credit_has_no_suffix() {
        assert_eq!(credit_suffix(None), "");
        assert_eq!(credit_suffix(Some(RoundCredit::Finite(0))), "");
        assert_eq!(credit_suffix(Some(RoundCredit::Finite(2))), " (2판)");
    }
}
