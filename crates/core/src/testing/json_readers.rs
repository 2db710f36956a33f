//! JSON implementations of the parser seams.
//!
//! Real catalogs speak Atom/OPDS and bookstore XML; these readers accept the
//! serde form of the same data, with `{"error": "..."}` as the rejection
//! reply.

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::auth::{LoginReply, PurchaseReply, ReplyError, StoreReplyReader};
use crate::catalog::{CatalogEntry, FeedError, FeedPage, FeedReader};

/// Feed reader for serialized [`FeedPage`] bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFeedReader;

impl FeedReader for JsonFeedReader {
    fn read_feed(&self, site_name: &str, body: &[u8]) -> Result<FeedPage, FeedError> {
        let value: serde_json::Value =
            serde_json::from_slice(body).map_err(|e| FeedError::Malformed(e.to_string()))?;
        if let Some(message) = error_of(&value) {
            return Err(FeedError::Remote(message));
        }
        let mut page: FeedPage =
            serde_json::from_value(value).map_err(|e| FeedError::Malformed(e.to_string()))?;
        stamp_site(&mut page.entries, site_name);
        Ok(page)
    }
}

/// Bookstore reply reader for JSON bodies.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonStoreReplies;

#[derive(Deserialize)]
struct AccountReply {
    account: String,
}

#[derive(Deserialize)]
struct BooksReply {
    #[serde(default)]
    books: Vec<CatalogEntry>,
}

impl StoreReplyReader for JsonStoreReplies {
    fn read_login(&self, body: &[u8]) -> Result<LoginReply, ReplyError> {
        parse(body)
    }

    fn read_purchase(&self, body: &[u8]) -> Result<PurchaseReply, ReplyError> {
        parse(body)
    }

    fn read_purchased_books(
        &self,
        site_name: &str,
        body: &[u8],
    ) -> Result<Vec<CatalogEntry>, ReplyError> {
        let mut books = parse::<BooksReply>(body)?.books;
        stamp_site(&mut books, site_name);
        Ok(books)
    }

    fn read_account(&self, body: &[u8]) -> Result<String, ReplyError> {
        Ok(parse::<AccountReply>(body)?.account)
    }

    fn read_registration(&self, body: &[u8]) -> Result<LoginReply, ReplyError> {
        parse(body)
    }

    fn read_password_recovery(&self, body: &[u8]) -> Result<(), ReplyError> {
        parse::<serde_json::Value>(body).map(|_| ())
    }
}

fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ReplyError> {
    let value: serde_json::Value =
        serde_json::from_slice(body).map_err(|e| ReplyError::Malformed(e.to_string()))?;
    if let Some(message) = error_of(&value) {
        return Err(ReplyError::Rejected(message));
    }
    serde_json::from_value(value).map_err(|e| ReplyError::Malformed(e.to_string()))
}

fn error_of(value: &serde_json::Value) -> Option<String> {
    value.get("error")?.as_str().map(str::to_string)
}

fn stamp_site(entries: &mut [CatalogEntry], site_name: &str) {
    for entry in entries.iter_mut().filter(|e| e.site_name.is_empty()) {
        entry.site_name = site_name.to_string();
    }
}
