//! Catalog sign-in, purchases and account state.

mod bookstore_session;
mod replies;
mod traits;
mod types;

pub use bookstore_session::*;
pub use replies::*;
pub use traits::*;
pub use types::*;
