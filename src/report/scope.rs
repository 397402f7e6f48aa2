//! Access scope resolution.
//! Mission: decide which ledger rows a user may see, failing closed.

use crate::auth::models::UserRole;
use crate::models::LedgerRecord;

/// The subset of records a user/role pair is permitted to see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Administrators see every record.
    All,
    /// Players see only rows whose `player_name` equals their login identity,
    /// byte for byte. No case folding, no trimming.
    Player(String),
}

impl Scope {
    /// Admin visibility is opt-in; every other role is restricted to self.
    pub fn for_role(role: &UserRole, identity: &str) -> Self {
        match role {
            UserRole::Admin => Scope::All,
            UserRole::Player => Scope::Player(identity.to_string()),
        }
    }

    pub fn permits(&self, record: &LedgerRecord) -> bool {
        match self {
            Scope::All => true,
            Scope::Player(name) => name == &record.player_name,
        }
    }

    /// The exact-match player predicate the store should bake into its fetch,
    /// if any.
    pub fn player_predicate(&self) -> Option<&str> {
        match self {
            Scope::All => None,
            Scope::Player(name) => Some(name.as_str()),
        }
    }
}
