//! User domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a User, assigned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Wraps a store-assigned id.
    pub fn from_i64(id: i64) -> Self {
        Self(id)
    }

    /// Returns the raw id value.
    pub fn get(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Lifecycle status of a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserStatus {
    /// May create and reverse transactions
    Active,
    /// All balance-affecting operations are rejected
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "ACTIVE",
            UserStatus::Blocked => "BLOCKED",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A registered user of the ledger.
///
/// Owns one balance per supported currency and zero-or-more transactions.
/// Users are never hard-deleted; only the status ever changes after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier
    pub id: UserId,
    /// Unique email address
    pub email: String,
    /// Current lifecycle status
    pub status: UserStatus,
    /// When the user was registered
    pub created: DateTime<Utc>,
}

impl User {
    /// Reconstructs a user from database fields.
    pub fn from_parts(
        id: UserId,
        email: String,
        status: UserStatus,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email,
            status,
            created,
        }
    }

    /// Whether balance-affecting operations must be rejected.
    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}
