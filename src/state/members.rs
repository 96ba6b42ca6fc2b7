//! Guild member cache fed by the chat host.

use dashmap::DashMap;

use crate::state::roster::{GuildId, UserId};

/// Placeholder shown when a member has no tier role.
pub const NO_TIER: &str = "티어 없음";

/// What the service knows about a guild member.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemberProfile {
    /// Name shown in the guild.
    pub display_name: String,
    /// Account name, used as a second lookup key by admin commands.
    pub username: String,
    /// Names of the roles the member holds.
    pub roles: Vec<String>,
}

impl MemberProfile {
    /// Whether the member holds a role named `role`.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|held| held == role)
    }

    /// First held role that appears in `tiers`, else [`NO_TIER`].
    pub fn tier<'a>(&'a self, tiers: &[String]) -> &'a str {
        self.roles
            .iter()
            .find(|role| tiers.contains(role))
            .map(String::as_str)
            .unwrap_or(NO_TIER)
    }
}

/// Read access to member profiles of one guild.
pub trait MemberLookup {
    /// Profile of `user`, or `None` when the member is unknown.
    fn profile(&self, user: UserId) -> Option<MemberProfile>;
}

/// Member profiles of every guild, keyed by `(guild, user)`.
#[derive(Default)]
pub struct MemberDirectory {
    members: DashMap<(GuildId, UserId), MemberProfile>,
}

impl MemberDirectory {
    /// Empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a member profile.
    pub fn upsert(&self, guild: GuildId, user: UserId, profile: MemberProfile) {
        self.members.insert((guild, user), profile);
    }

    /// Forget a member. Returns the removed profile.
    pub fn remove(&self, guild: GuildId, user: UserId) -> Option<MemberProfile> {
        self.members.remove(&(guild, user)).map(|(_, profile)| profile)
    }

    /// Profile lookup scoped to a single guild.
    pub fn for_guild(&self, guild: GuildId) -> GuildMembers<'_> {
        GuildMembers {
            directory: self,
            guild,
        }
    }

    /// Find a member of `guild` by display name or account name.
    pub fn find_by_name(&self, guild: GuildId, name: &str) -> Option<(UserId, MemberProfile)> {
        self.members.iter().find_map(|entry| {
            let (entry_guild, user) = *entry.key();
            let profile = entry.value();
            (entry_guild == guild && (profile.display_name == name || profile.username == name))
                .then(|| (user, profile.clone()))
        })
    }
}

/// [`MemberLookup`] view of one guild inside a [`MemberDirectory`].
pub struct GuildMembers<'a> {
    directory: &'a MemberDirectory,
    guild: GuildId,
}

impl MemberLookup for GuildMembers<'_> {
    fn profile(&self, user: UserId) -> Option<MemberProfile> {
        self.directory
            .members
            .get(&(self.guild, user))
            .map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
impl MemberLookup for std::collections::HashMap<UserId, MemberProfile> {
    fn profile(&self, user: UserId) -> Option<MemberProfile> {
        self.get(&user).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, roles: &[&str]) -> MemberProfile {
        MemberProfile {
            display_name: name.into(),
            username: name.to_lowercase(),
            roles: roles.iter().map(|role| role.to_string()).collect(),
        }
    }

    #[test]
    fn tier_is_first_matching_role() {
        let tiers: Vec<String> = ["레", "불", "초"].iter().map(|t| t.to_string()).collect();
        assert_eq!(profile("A", &["멤버", "초", "불"]).tier(&tiers), "초");
        assert_eq!(profile("B", &["멤버"]).tier(&tiers), NO_TIER);
    }

    #[test]
    fn lookups_are_scoped_per_guild() {
        let directory = MemberDirectory::new();
        directory.upsert(1, 10, profile("Alice", &[]));
        directory.upsert(2, 10, profile("Other", &[]));

        assert_eq!(
            directory.for_guild(1).profile(10).map(|p| p.display_name),
            Some("Alice".to_string())
        );
        assert!(directory.for_guild(3).profile(10).is_none());
        assert_eq!(directory.find_by_name(1, "alice").map(|(id, _)| id), Some(10));
        assert!(directory.find_by_name(2, "Alice").is_none());

        directory.remove(1, 10);
        assert!(directory.for_guild(1).profile(10).is_none());
    }
}
