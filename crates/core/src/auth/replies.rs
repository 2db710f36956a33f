use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::CatalogEntry;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReplyError {
    /// The store understood the request and refused it.
    #[error("{0}")]
    Rejected(String),

    #[error("{0}")]
    Malformed(String),
}

/// Successful sign-in or registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginReply {
    pub user_name: String,
    pub session_token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseReply {
    /// Account summary after the purchase.
    pub account: String,
}

/// Parses bookstore protocol replies.
pub trait StoreReplyReader: Send + Sync {
    fn read_login(&self, body: &[u8]) -> Result<LoginReply, ReplyError>;

    fn read_purchase(&self, body: &[u8]) -> Result<PurchaseReply, ReplyError>;

    fn read_purchased_books(
        &self,
        site_name: &str,
        body: &[u8],
    ) -> Result<Vec<CatalogEntry>, ReplyError>;

    fn read_account(&self, body: &[u8]) -> Result<String, ReplyError>;

    fn read_registration(&self, body: &[u8]) -> Result<LoginReply, ReplyError>;

    fn read_password_recovery(&self, body: &[u8]) -> Result<(), ReplyError>;
}
