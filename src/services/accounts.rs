//! Account query builders

use chrono::Utc;

use crate::db::Statement;

/// Builds statements against the `accounts` table
pub struct AccountsDataService;

impl AccountsDataService {
    /// Insert a new account; returns the display name
    pub fn create_account(display_name: &str, password_hash: &str, salt_value: &str) -> Statement {
        let now = Utc::now();
        Statement::new(
            "INSERT INTO accounts (display_name, preferred_name, biography, password_hash, salt_value, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             RETURNING display_name",
        )
        .bind(display_name)
        .bind(display_name)
        .bind("")
        .bind(password_hash)
        .bind(salt_value)
        .bind(now)
        .bind(now)
    }

    pub fn fetch_authentication_information(display_name: &str) -> Statement {
        Statement::new(
            "SELECT display_name, password_hash, salt_value FROM accounts WHERE display_name = ?1",
        )
        .bind(display_name)
    }

    pub fn fetch_account_profile(display_name: &str) -> Statement {
        Statement::new("SELECT preferred_name, biography FROM accounts WHERE display_name = ?1")
            .bind(display_name)
    }
}
