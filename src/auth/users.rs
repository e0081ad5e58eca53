use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum UserDatabaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid user database: {0}")]
    Parse(#[from] toml_edit::de::Error),

    #[error("Failed to encode user database: {0}")]
    Encode(#[from] toml_edit::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
}

/// On-disk layout: one `[users.<name>]` table per account.
#[derive(Serialize, Deserialize, Default)]
struct UsersFile {
    #[serde(default)]
    users: BTreeMap<String, User>,
}

/// Accounts allowed to call the API, keyed by lowercase username.
#[derive(Debug, Clone, Default)]
pub struct UserDatabase {
    users: BTreeMap<String, User>,
}

impl UserDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn read(path: &Path) -> Result<Self, UserDatabaseError> {
        let raw = fs::read_to_string(path).await?;
        let file: UsersFile = toml_edit::de::from_str(&raw)?;
        Ok(Self { users: file.users })
    }

    pub async fn write(&self, path: &Path) -> Result<(), UserDatabaseError> {
        let file = UsersFile {
            users: self.users.clone(),
        };
        fs::write(path, toml_edit::ser::to_string_pretty(&file)?).await?;
        Ok(())
    }

    /// Lowercases and trims; rejects empty names and names containing `:`,
    /// which separates the username from the signature in a token.
    pub fn normalize_username(username: &str) -> Option<String> {
        let username = username.trim().to_lowercase();
        (!username.is_empty() && !username.contains(':')).then_some(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &User)> {
        self.users.iter().map(|(name, user)| (name.as_str(), user))
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    /// Looks up an account by username, falling back to a case-insensitive
    /// email match.
    pub fn find(&self, identifier: &str) -> Option<(&str, &User)> {
        self.users
            .get_key_value(identifier)
            .or_else(|| {
                self.users
                    .iter()
                    .find(|(_, user)| user.email.eq_ignore_ascii_case(identifier))
            })
            .map(|(name, user)| (name.as_str(), user))
    }

    /// Returns false without touching the entry when the name is taken.
    pub fn insert(&mut self, username: String, email: String) -> bool {
        if self.users.contains_key(&username) {
            return false;
        }
        self.users.insert(username, User { email });
        true
    }

    pub fn remove(&mut self, username: &str) -> Option<User> {
        self.users.remove(username)
    }
}
