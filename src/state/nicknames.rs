//! In-game nicknames registered by users, shared by every guild.

use std::collections::BTreeMap;

use dashmap::{DashMap, mapref::entry::Entry};
use thiserror::Error;

use crate::state::roster::UserId;

/// Failure of a nickname book operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NicknameError {
    /// The text does not look like a `name#tag` nickname.
    #[error("`{0}` is not a valid nickname")]
    Invalid(String),
    /// Self registration is refused once a nickname exists.
    #[error("user {0} already registered a nickname")]
    AlreadyRegistered(UserId),
    /// No nickname recorded for the user.
    #[error("user {0} has no registered nickname")]
    NotRegistered(UserId),
}

/// Whether free text posted by a user is a nickname registration attempt.
pub fn is_candidate(text: &str) -> bool {
    let text = text.trim();
    text.contains('#') && text.chars().count() >= 3
}

/// Read access to registered nicknames.
pub trait NicknameLookup {
    /// Nickname of `user`, if registered.
    fn nickname(&self, user: UserId) -> Option<String>;
}

/// User ID to in-game nickname map.
#[derive(Default)]
pub struct NicknameBook {
    entries: DashMap<UserId, String>,
}

impl NicknameBook {
    /// Build the book from a persisted document.
    pub fn from_entries(entries: impl IntoIterator<Item = (UserId, String)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Sorted copy of every entry, used for persistence.
    pub fn entries(&self) -> BTreeMap<UserId, String> {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect()
    }

    /// Whether `user` registered a nickname.
    pub fn is_registered(&self, user: UserId) -> bool {
        self.entries.contains_key(&user)
    }

    /// Self registration from posted text. Refused when the user already has one.
    pub fn register(&self, user: UserId, text: &str) -> Result<String, NicknameError> {
        let nickname = text.trim();
        if !is_candidate(nickname) {
            return Err(NicknameError::Invalid(nickname.to_string()));
        }
        match self.entries.entry(user) {
            Entry::Occupied(_) => Err(NicknameError::AlreadyRegistered(user)),
            Entry::Vacant(slot) => {
                slot.insert(nickname.to_string());
                Ok(nickname.to_string())
            }
        }
    }

    /// Administrator override; replaces any existing nickname.
    pub fn set(&self, user: UserId, nickname: &str) -> Result<(), NicknameError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(NicknameError::Invalid(nickname.to_string()));
        }
        self.entries.insert(user, nickname.to_string());
        Ok(())
    }

    /// Delete the nickname of `user`.
    pub fn remove(&self, user: UserId) -> Result<String, NicknameError> {
        self.entries
            .remove(&user)
            .map(|(_, nickname)| nickname)
            .ok_or(NicknameError::NotRegistered(user))
    }
}

impl NicknameLookup for NicknameBook {
    fn nickname(&self, user: UserId) -> Option<String> {
        self.entries.get(&user).map(|entry| entry.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates_need_a_hash_and_three_chars() {
        assert!(is_candidate("abc#KR1"));
        assert!(is_candidate(" a#b "));
        assert!(!is_candidate("a#"));
        assert!(!is_candidate("hello"));
    }

    #[test]
    fn self_registration_happens_once() {
        let book = NicknameBook::default();
        assert_eq!(book.register(1, " player#KR1 "), Ok("player#KR1".to_string()));
        assert_eq!(
            book.register(1, "other#KR1"),
            Err(NicknameError::AlreadyRegistered(1))
        );
        assert_eq!(book.nickname(1).as_deref(), Some("player#KR1"));

        book.set(1, "fixed#KR2").unwrap();
        assert_eq!(book.nickname(1).as_deref(), Some("fixed#KR2"));
    }

    #[test]
    fn removal_requires_registration() {
        let book = NicknameBook::from_entries([(7, "seven#KR1".to_string())]);
        assert_eq!(book.remove(8), Err(NicknameError::NotRegistered(8)));
        assert_eq!(book.remove(7), Ok("seven#KR1".to_string()));
        assert!(!book.is_registered(7));
        assert!(book.entries().is_empty());
    }
}
