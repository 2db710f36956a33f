use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthenticationStatus {
    /// Not validated since start-up or the last sign-out.
    #[default]
    Unchecked,
    Authorised,
    NotAuthorised,
}

/// In-memory state of one catalog session.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub status: AuthenticationStatus,
    pub session_token: Option<String>,
    pub user_name: String,
    pub purchased_ids: HashSet<String>,
    pub purchased_books: Vec<CatalogEntry>,
    pub account: Option<String>,
    /// Token the cached account and purchases were loaded for.
    pub initialized_for: Option<String>,
    pub account_loaded: bool,
    pub purchases_loaded: bool,
    pub checked_at: Option<DateTime<Utc>>,
}

impl SessionState {
    pub fn new(session_token: Option<String>, user_name: String) -> Self {
        Self {
            session_token,
            user_name,
            ..Self::default()
        }
    }

    pub fn is_purchased(&self, id: &str) -> bool {
        self.purchased_ids.contains(id)
    }

    pub(crate) fn set_status(&mut self, status: AuthenticationStatus) {
        self.status = status;
        self.checked_at = match status {
            AuthenticationStatus::Unchecked => None,
            _ => Some(Utc::now()),
        };
    }

    pub(crate) fn set_purchased(&mut self, books: Vec<CatalogEntry>) {
        self.purchased_ids = books.iter().map(|b| b.id.clone()).collect();
        self.purchased_books = books;
        self.purchases_loaded = true;
    }

    pub(crate) fn add_purchased(&mut self, entry: &CatalogEntry) {
        if self.purchased_ids.insert(entry.id.clone()) {
            self.purchased_books.push(entry.clone());
        }
    }

    /// Drop everything loaded for the previous session token.
    pub(crate) fn clear_cached(&mut self) {
        self.purchased_ids.clear();
        self.purchased_books.clear();
        self.account = None;
        self.initialized_for = None;
        self.account_loaded = false;
        self.purchases_loaded = false;
    }
}
