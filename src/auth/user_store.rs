//! User Storage
//! Mission: manage dashboard accounts in SQLite, seeded from the ledger

use anyhow::{Context, Result};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::models::{User, UserRole};

/// User storage with SQLite backend
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new user store and initialize database
    pub fn new(db_path: &str) -> Result<Self> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn init_db(&self) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT UNIQUE NOT NULL,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        self.create_default_admin(&conn)?;

        Ok(())
    }

    /// Create default admin user for initial setup
    fn create_default_admin(&self, conn: &Connection) -> Result<()> {
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE role = 'admin'",
                [],
                |row| row.get(0),
            )
            .context("Failed to check for admin users")?;

        if count == 0 {
            let password =
                std::env::var("ADMIN_PASSWORD").unwrap_or_else(|_| "admin123".to_string());
            let password_hash = hash(&password, DEFAULT_COST).context("Failed to hash password")?;

            conn.execute(
                "INSERT INTO users (id, username, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    "admin",
                    password_hash,
                    UserRole::Admin.as_str(),
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to insert admin user")?;

            info!("🔐 Default admin user created (username: admin)");
            warn!("⚠️  CHANGE DEFAULT ADMIN PASSWORD IN PRODUCTION!");
        }

        Ok(())
    }

    /// Get user by username
    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, role, created_at
             FROM users WHERE username = ?1",
        )?;

        let user_result = stmt.query_row(params![username], row_to_user);

        match user_result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Verify username and password
    pub fn verify_password(&self, username: &str, password: &str) -> Result<bool> {
        match self.get_user_by_username(username)? {
            Some(user) => {
                let valid =
                    verify(password, &user.password_hash).context("Failed to verify password")?;
                Ok(valid)
            }
            None => Ok(false),
        }
    }

    /// Create a new user
    pub fn create_user(&self, username: &str, password: &str, role: UserRole) -> Result<User> {
        let password_hash = hash(password, DEFAULT_COST).context("Failed to hash password")?;

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash,
            role,
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = Connection::open(&self.db_path)?;
        conn.execute(
            "INSERT INTO users (id, username, password_hash, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.role.as_str(),
                user.created_at,
            ],
        )
        .context("Failed to insert user")?;

        info!("✅ Created user: {} ({})", user.username, user.role.as_str());

        Ok(user)
    }

    /// Replace a user's password after checking the old one. Returns false
    /// when the old password does not match.
    pub fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<bool> {
        if !self.verify_password(username, old_password)? {
            return Ok(false);
        }

        let password_hash = hash(new_password, DEFAULT_COST).context("Failed to hash password")?;
        let conn = Connection::open(&self.db_path)?;
        let updated = conn.execute(
            "UPDATE users SET password_hash = ?1 WHERE username = ?2",
            params![password_hash, username],
        )?;

        Ok(updated > 0)
    }

    /// Ensure every ledger player has a login. Missing accounts are created
    /// with the standard generated password (see `generated_player_password`),
    /// bcrypt-hashed at rest. Existing accounts are left alone. Returns how
    /// many accounts were created.
    pub fn sync_player_accounts(&self, player_names: &[String]) -> Result<usize> {
        let mut created = 0usize;

        for name in player_names {
            if name.trim().is_empty() {
                continue;
            }
            if self.get_user_by_username(name)?.is_some() {
                continue;
            }
            let password = generated_player_password(name);
            self.create_user(name, &password, UserRole::Player)?;
            created += 1;
        }

        if created > 0 {
            info!("👥 Seeded {} player accounts from the ledger", created);
        }

        Ok(created)
    }

    /// List all users (admin only)
    pub fn list_users(&self) -> Result<Vec<User>> {
        let conn = Connection::open(&self.db_path)?;

        let mut stmt =
            conn.prepare("SELECT id, username, password_hash, role, created_at FROM users")?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }

    /// Delete a user by ID (admin only)
    pub fn delete_user(&self, user_id: &Uuid) -> Result<()> {
        let conn = Connection::open(&self.db_path)?;

        let rows_affected = conn.execute(
            "DELETE FROM users WHERE id = ?1",
            params![user_id.to_string()],
        )?;

        if rows_affected == 0 {
            anyhow::bail!("User not found");
        }

        info!("🗑️  Deleted user: {}", user_id);
        Ok(())
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let role_str: String = row.get(3)?;
    Ok(User {
        id: Uuid::parse_str(&id_str).unwrap_or_default(),
        username: row.get(1)?,
        password_hash: row.get(2)?,
        // Unknown roles fail closed to the restricted one.
        role: UserRole::from_str(&role_str).unwrap_or(UserRole::Player),
        created_at: row.get(4)?,
    })
}

/// The standard initial password for a seeded player account: first letter
/// uppercased + "2025" + the last four characters of the player name. Names
/// shorter than four characters get a fixed fallback.
pub fn generated_player_password(player_name: &str) -> String {
    let chars: Vec<char> = player_name.chars().collect();
    if chars.len() >= 4 {
        let first: String = chars[0].to_uppercase().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{first}2025{tail}")
    } else {
        "DefaultPass2025".to_string()
    }
}
