//! Session manager of the built-in bookstore.
//!
//! Sign-in yields a session token that every later request carries. The token
//! and login name persist through the [`SettingsStore`]; purchases and the
//! account summary are cached in memory for the token they were loaded with.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{
    AuthError, AuthenticationManager, AuthenticationStatus, LoginReply, ReplyError, SessionState,
    StoreReplyReader,
};
use crate::catalog::{BookFormat, CatalogEntry};
use crate::config::BookstoreConfig;
use crate::metrics;
use crate::network::{NetworkError, NetworkExecutor, NetworkRequest, SslCertificate};
use crate::settings::SettingsStore;

const AUTHORISE: &str = "catalit_authorise/";
const PURCHASE: &str = "catalit_purchase_book/";
const ACCOUNT: &str = "catalit_account/";
const PURCHASED_BOOKS: &str = "catalit_browser/";
const DOWNLOAD: &str = "catalit_download_book/";
const REFILL: &str = "put_money_on_account/";
const REGISTER: &str = "catalit_refresh_user/";
const RECOVER: &str = "catalit_recover_pass/";

pub struct BookstoreSession {
    site_name: String,
    catalog_url: String,
    secure_url: String,
    certificate: SslCertificate,
    registration: bool,
    password_recovery: bool,
    executor: Arc<dyn NetworkExecutor>,
    replies: Arc<dyn StoreReplyReader>,
    settings: Arc<dyn SettingsStore>,
    state: Mutex<SessionState>,
}

impl BookstoreSession {
    pub fn new(
        config: &BookstoreConfig,
        executor: Arc<dyn NetworkExecutor>,
        replies: Arc<dyn StoreReplyReader>,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        let token_key = option_key(&config.site_name, "session_token");
        let user_key = option_key(&config.site_name, "user_name");
        let session_token = read_option(settings.as_ref(), &token_key).filter(|t| !t.is_empty());
        let user_name = read_option(settings.as_ref(), &user_key).unwrap_or_default();

        Self {
            site_name: config.site_name.clone(),
            catalog_url: config.catalog_url.trim_end_matches('/').to_string(),
            secure_url: config.secure_url.trim_end_matches('/').to_string(),
            certificate: config
                .certificate_path
                .clone()
                .map_or(SslCertificate::System, SslCertificate::Custom),
            registration: config.registration,
            password_recovery: config.password_recovery,
            executor,
            replies,
            settings,
            state: Mutex::new(SessionState::new(session_token, user_name)),
        }
    }

    pub fn site_name(&self) -> &str {
        &self.site_name
    }

    /// Copy of the current session state.
    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    fn secure(&self, endpoint: &str) -> String {
        format!("{}/{}", self.secure_url, endpoint)
    }

    fn form(&self, endpoint: &str, fields: &[(&str, &str)]) -> NetworkRequest {
        NetworkRequest::post_form(
            self.secure(endpoint),
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
        .with_certificate(self.certificate.clone())
    }

    fn account_request(&self, token: &str) -> NetworkRequest {
        self.form(ACCOUNT, &[("sid", token)])
    }

    fn purchased_books_request(&self, token: &str) -> NetworkRequest {
        self.form(PURCHASED_BOOKS, &[("my", "1"), ("sid", token)])
    }

    async fn send(&self, operation: &str, request: NetworkRequest) -> Result<Vec<u8>, AuthError> {
        debug!(site = %self.site_name, operation = operation, "Sending session request");
        let result = self.executor.execute(request).await;
        record(operation, &result);
        Ok(result?)
    }

    fn token_key(&self) -> String {
        option_key(&self.site_name, "session_token")
    }

    fn user_key(&self) -> String {
        option_key(&self.site_name, "user_name")
    }

    /// Install a fresh session after a successful sign-in.
    fn start_session(&self, state: &mut SessionState, reply: LoginReply) -> Result<(), AuthError> {
        self.settings.set(&self.token_key(), &reply.session_token)?;
        if !reply.user_name.is_empty() {
            self.settings.set(&self.user_key(), &reply.user_name)?;
            state.user_name = reply.user_name;
        }
        state.session_token = Some(reply.session_token);
        state.clear_cached();
        state.set_status(AuthenticationStatus::Authorised);
        Ok(())
    }

    fn end_session(
        &self,
        state: &mut SessionState,
        status: AuthenticationStatus,
    ) -> Result<(), AuthError> {
        state.session_token = None;
        state.clear_cached();
        state.set_status(status);
        self.settings.remove(&self.token_key())?;
        Ok(())
    }

    fn apply_account(
        &self,
        state: &mut SessionState,
        body: Result<Vec<u8>, NetworkError>,
    ) -> Result<(), AuthError> {
        let account = self.replies.read_account(&body?).map_err(reply_error)?;
        state.account = Some(account);
        state.account_loaded = true;
        Ok(())
    }

    fn apply_purchased(
        &self,
        state: &mut SessionState,
        body: Result<Vec<u8>, NetworkError>,
    ) -> Result<(), AuthError> {
        let books = self
            .replies
            .read_purchased_books(&self.site_name, &body?)
            .map_err(reply_error)?;
        state.set_purchased(books);
        Ok(())
    }
}

#[async_trait]
impl AuthenticationManager for BookstoreSession {
    async fn is_authorised(&self, use_network: bool) -> Result<AuthenticationStatus, AuthError> {
        let mut state = self.state.lock().await;
        if state.status != AuthenticationStatus::Unchecked || !use_network {
            return Ok(state.status);
        }

        let Some(token) = state.session_token.clone() else {
            state.set_status(AuthenticationStatus::NotAuthorised);
            return Ok(state.status);
        };

        let body = self
            .send("check", self.form(AUTHORISE, &[("sid", token.as_str())]))
            .await?;
        match self.replies.read_login(&body) {
            Ok(reply) => {
                if !reply.user_name.is_empty() && reply.user_name != state.user_name {
                    self.settings.set(&self.user_key(), &reply.user_name)?;
                    state.user_name = reply.user_name;
                }
                state.set_status(AuthenticationStatus::Authorised);
            }
            Err(ReplyError::Rejected(message)) => {
                debug!(site = %self.site_name, reason = %message, "Stored session rejected");
                self.end_session(&mut state, AuthenticationStatus::NotAuthorised)?;
            }
            Err(ReplyError::Malformed(message)) => return Err(AuthError::MalformedReply(message)),
        }
        Ok(state.status)
    }

    async fn current_user_name(&self) -> String {
        self.state.lock().await.user_name.clone()
    }

    async fn set_user_name(&self, user_name: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        self.settings.set(&self.user_key(), user_name)?;
        state.user_name = user_name.to_string();
        Ok(())
    }

    async fn authorise(&self, password: &str) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        if state.user_name.is_empty() {
            return Err(AuthError::MissingUserName);
        }

        let login = state.user_name.clone();
        let body = self
            .send(
                "authorise",
                self.form(
                    AUTHORISE,
                    &[("login", login.as_str()), ("pwd", password), ("skip_ip", "1")],
                ),
            )
            .await?;

        match self.replies.read_login(&body) {
            Ok(reply) => {
                self.start_session(&mut state, reply)?;
                info!(site = %self.site_name, user = %state.user_name, "Signed in");
                Ok(())
            }
            Err(ReplyError::Rejected(message)) => {
                warn!(site = %self.site_name, user = %login, reason = %message, "Sign-in rejected");
                self.end_session(&mut state, AuthenticationStatus::NotAuthorised)?;
                Err(AuthError::InvalidCredentials(message))
            }
            Err(ReplyError::Malformed(message)) => Err(AuthError::MalformedReply(message)),
        }
    }

    async fn log_out(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        self.end_session(&mut state, AuthenticationStatus::Unchecked)?;
        info!(site = %self.site_name, "Signed out");
        Ok(())
    }

    async fn needs_initialization(&self) -> bool {
        let state = self.state.lock().await;
        state.session_token.is_some() && state.initialized_for != state.session_token
    }

    async fn initialize(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        let token = state
            .session_token
            .clone()
            .ok_or(AuthError::AuthorizationRequired)?;
        if state.initialized_for.as_deref() == Some(token.as_str()) {
            return Ok(());
        }

        let mut responses = self
            .executor
            .execute_batch(vec![
                self.account_request(&token),
                self.purchased_books_request(&token),
            ])
            .await
            .into_iter();
        let account = responses.next().unwrap_or(Err(NetworkError::NoResponse));
        let purchased = responses.next().unwrap_or(Err(NetworkError::NoResponse));
        record("account", &account);
        record("purchased_books", &purchased);

        let account = self.apply_account(&mut state, account);
        let purchased = self.apply_purchased(&mut state, purchased);
        account?;
        purchased?;

        state.initialized_for = Some(token);
        debug!(
            site = %self.site_name,
            purchased = state.purchased_books.len(),
            "Session initialized"
        );
        Ok(())
    }

    async fn need_purchase(&self, entry: &CatalogEntry) -> bool {
        entry.purchase_required && !self.state.lock().await.is_purchased(&entry.id)
    }

    async fn purchase_book(&self, entry: &CatalogEntry) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        if state.status != AuthenticationStatus::Authorised {
            return Err(AuthError::AuthorizationRequired);
        }
        if state.is_purchased(&entry.id) {
            return Ok(());
        }
        let token = state
            .session_token
            .clone()
            .ok_or(AuthError::AuthorizationRequired)?;

        let body = self
            .send(
                "purchase",
                self.form(
                    PURCHASE,
                    &[("sid", token.as_str()), ("art", entry.id.as_str())],
                ),
            )
            .await?;
        match self.replies.read_purchase(&body) {
            Ok(reply) => {
                state.add_purchased(entry);
                state.account = Some(reply.account);
                info!(site = %self.site_name, book = %entry.id, title = %entry.title, "Book purchased");
                Ok(())
            }
            Err(ReplyError::Rejected(message)) => {
                warn!(site = %self.site_name, book = %entry.id, reason = %message, "Purchase rejected");
                Err(AuthError::PurchaseRejected(message))
            }
            Err(ReplyError::Malformed(message)) => Err(AuthError::MalformedReply(message)),
        }
    }

    async fn reload_purchased_books(&self) -> Result<(), AuthError> {
        let mut state = self.state.lock().await;
        let token = state
            .session_token
            .clone()
            .ok_or(AuthError::AuthorizationRequired)?;

        let mut responses = self
            .executor
            .execute_batch(vec![
                self.account_request(&token),
                self.purchased_books_request(&token),
            ])
            .await
            .into_iter();
        let account = responses.next().unwrap_or(Err(NetworkError::NoResponse));
        let purchased = responses.next().unwrap_or(Err(NetworkError::NoResponse));
        record("account", &account);
        record("purchased_books", &purchased);

        let account = self.apply_account(&mut state, account);
        if let Err(e) = &account {
            warn!(site = %self.site_name, error = %e, "Keeping cached account");
        }
        let purchased = self.apply_purchased(&mut state, purchased);
        if let Err(e) = &purchased {
            warn!(site = %self.site_name, error = %e, "Keeping cached purchased books");
        }
        account?;
        purchased
    }

    async fn collect_purchased_books(&self) -> Vec<CatalogEntry> {
        self.state.lock().await.purchased_books.clone()
    }

    async fn current_account(&self) -> Option<String> {
        self.state.lock().await.account.clone()
    }

    async fn refill_account_link(&self) -> Option<String> {
        let state = self.state.lock().await;
        let token = state.session_token.as_deref()?;
        Some(format!(
            "{}?sid={}",
            self.secure(REFILL),
            urlencoding::encode(token)
        ))
    }

    fn network_book_id(&self, entry: &CatalogEntry) -> String {
        format!(
            "{}/{}?art={}",
            self.catalog_url,
            DOWNLOAD,
            urlencoding::encode(&entry.id)
        )
    }

    async fn download_link(&self, entry: &CatalogEntry) -> Option<String> {
        let state = self.state.lock().await;
        let token = state.session_token.as_deref()?;
        if entry.purchase_required && !state.is_purchased(&entry.id) {
            return None;
        }
        Some(format!(
            "{}?art={}&sid={}",
            self.secure(DOWNLOAD),
            urlencoding::encode(&entry.id),
            urlencoding::encode(token)
        ))
    }

    fn download_format(&self, _entry: &CatalogEntry) -> BookFormat {
        BookFormat::Fb2Zip
    }

    fn registration_supported(&self) -> bool {
        self.registration
    }

    async fn register_user(&self, login: &str, password: &str, email: &str) -> Result<(), AuthError> {
        if !self.registration {
            return Err(AuthError::Unsupported("registration"));
        }
        let mut state = self.state.lock().await;
        let body = self
            .send(
                "register",
                self.form(
                    REGISTER,
                    &[("new_login", login), ("new_pwd1", password), ("mail", email)],
                ),
            )
            .await?;

        let mut reply = self.replies.read_registration(&body).map_err(reply_error)?;
        if reply.user_name.is_empty() {
            reply.user_name = login.to_string();
        }
        self.start_session(&mut state, reply)?;
        info!(site = %self.site_name, user = %login, "Registered new user");
        Ok(())
    }

    fn password_recovery_supported(&self) -> bool {
        self.password_recovery
    }

    async fn recover_password(&self, email: &str) -> Result<(), AuthError> {
        if !self.password_recovery {
            return Err(AuthError::Unsupported("password recovery"));
        }
        let body = self.send("recover", self.form(RECOVER, &[("mail", email)])).await?;
        self.replies
            .read_password_recovery(&body)
            .map_err(reply_error)
    }
}

fn option_key(site_name: &str, option: &str) -> String {
    format!("{}.{}", site_name, option)
}

fn read_option(settings: &dyn SettingsStore, key: &str) -> Option<String> {
    match settings.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!(key = key, error = %e, "Failed to read session option");
            None
        }
    }
}

fn reply_error(e: ReplyError) -> AuthError {
    match e {
        ReplyError::Rejected(message) => AuthError::Rejected(message),
        ReplyError::Malformed(message) => AuthError::MalformedReply(message),
    }
}

fn record(operation: &str, result: &Result<Vec<u8>, NetworkError>) {
    let status = if result.is_ok() { "success" } else { "error" };
    metrics::SESSION_REQUESTS
        .with_label_values(&[operation, status])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, JsonStoreReplies, MemorySettingsStore, MockExecutor};

    const AUTH_URL: &str = "https://robot.litres.ru/pages/catalit_authorise/";
    const PURCHASE_URL: &str = "https://robot.litres.ru/pages/catalit_purchase_book/";
    const ACCOUNT_URL: &str = "https://robot.litres.ru/pages/catalit_account/";
    const BOOKS_URL: &str = "https://robot.litres.ru/pages/catalit_browser/";

    struct Fixture {
        executor: Arc<MockExecutor>,
        settings: Arc<MemorySettingsStore>,
        session: BookstoreSession,
    }

    fn fixture() -> Fixture {
        let executor = Arc::new(MockExecutor::new());
        let settings = Arc::new(MemorySettingsStore::new());
        let session = BookstoreSession::new(
            &fixtures::bookstore_config(),
            executor.clone(),
            Arc::new(JsonStoreReplies),
            settings.clone(),
        );
        Fixture {
            executor,
            settings,
            session,
        }
    }

    async fn signed_in() -> Fixture {
        let f = fixture();
        f.executor
            .set_body(AUTH_URL, br#"{"user_name":"reader","session_token":"sid-1"}"#.to_vec())
            .await;
        f.session.set_user_name("reader").await.unwrap();
        f.session.authorise("secret").await.unwrap();
        f
    }

    #[tokio::test]
    async fn test_unchecked_without_network() {
        let f = fixture();
        assert_eq!(
            f.session.is_authorised(false).await.unwrap(),
            AuthenticationStatus::Unchecked
        );
        assert_eq!(
            f.session.is_authorised(true).await.unwrap(),
            AuthenticationStatus::NotAuthorised
        );
        assert!(f.executor.requests().await.is_empty());
    }

    #[tokio::test]
    async fn test_authorise_persists_token() {
        let f = signed_in().await;
        assert_eq!(
            f.session.is_authorised(false).await.unwrap(),
            AuthenticationStatus::Authorised
        );
        assert_eq!(
            f.settings.get("litres.ru.session_token").unwrap(),
            Some("sid-1".to_string())
        );
        let request = &f.executor.requests().await[0];
        assert_eq!(request.url, AUTH_URL);
        assert!(request
            .form
            .as_ref()
            .unwrap()
            .contains(&("login".to_string(), "reader".to_string())));
    }

    #[tokio::test]
    async fn test_authorise_without_user_name() {
        let f = fixture();
        assert!(matches!(
            f.session.authorise("secret").await,
            Err(AuthError::MissingUserName)
        ));
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let f = fixture();
        f.executor
            .set_body(AUTH_URL, br#"{"error":"wrong password"}"#.to_vec())
            .await;
        f.session.set_user_name("reader").await.unwrap();

        let err = f.session.authorise("bad").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials(ref m) if m == "wrong password"));
        assert_eq!(
            f.session.is_authorised(false).await.unwrap(),
            AuthenticationStatus::NotAuthorised
        );
    }

    #[tokio::test]
    async fn test_stored_token_validated_once() {
        let executor = Arc::new(MockExecutor::new());
        let settings = Arc::new(MemorySettingsStore::new());
        settings.set("litres.ru.session_token", "stored").unwrap();
        executor
            .set_body(AUTH_URL, br#"{"user_name":"reader","session_token":"stored"}"#.to_vec())
            .await;
        let session = BookstoreSession::new(
            &fixtures::bookstore_config(),
            executor.clone(),
            Arc::new(JsonStoreReplies),
            settings,
        );

        assert_eq!(
            session.is_authorised(true).await.unwrap(),
            AuthenticationStatus::Authorised
        );
        assert_eq!(
            session.is_authorised(true).await.unwrap(),
            AuthenticationStatus::Authorised
        );
        assert_eq!(executor.requests().await.len(), 1);
        assert_eq!(session.current_user_name().await, "reader");
    }

    #[tokio::test]
    async fn test_check_failure_leaves_unchecked() {
        let executor = Arc::new(MockExecutor::new());
        let settings = Arc::new(MemorySettingsStore::new());
        settings.set("litres.ru.session_token", "stored").unwrap();
        executor.set_error(AUTH_URL, NetworkError::Timeout).await;
        let session = BookstoreSession::new(
            &fixtures::bookstore_config(),
            executor,
            Arc::new(JsonStoreReplies),
            settings,
        );

        assert!(matches!(
            session.is_authorised(true).await,
            Err(AuthError::Network(NetworkError::Timeout))
        ));
        assert_eq!(
            session.is_authorised(false).await.unwrap(),
            AuthenticationStatus::Unchecked
        );
    }

    #[tokio::test]
    async fn test_purchase_requires_authorisation() {
        let f = fixture();
        let book = fixtures::purchasable_entry("litres.ru", "177", "Master i Margarita");
        assert!(f.session.need_purchase(&book).await);
        assert!(matches!(
            f.session.purchase_book(&book).await,
            Err(AuthError::AuthorizationRequired)
        ));
    }

    #[tokio::test]
    async fn test_purchase_updates_cache() {
        let f = signed_in().await;
        f.executor
            .set_body(PURCHASE_URL, br#"{"account":"90.00 RUB"}"#.to_vec())
            .await;
        let book = fixtures::purchasable_entry("litres.ru", "177", "Master i Margarita");

        f.session.purchase_book(&book).await.unwrap();
        assert!(!f.session.need_purchase(&book).await);
        assert_eq!(f.session.current_account().await.as_deref(), Some("90.00 RUB"));
        assert_eq!(f.session.collect_purchased_books().await, vec![book.clone()]);

        // already owned, no second request
        f.session.purchase_book(&book).await.unwrap();
        assert_eq!(f.executor.requests().await.len(), 2);
    }

    #[tokio::test]
    async fn test_purchase_rejected() {
        let f = signed_in().await;
        f.executor
            .set_body(PURCHASE_URL, br#"{"error":"not enough money"}"#.to_vec())
            .await;
        let book = fixtures::purchasable_entry("litres.ru", "177", "Master i Margarita");
        assert!(matches!(
            f.session.purchase_book(&book).await,
            Err(AuthError::PurchaseRejected(_))
        ));
        assert!(f.session.need_purchase(&book).await);
    }

    #[tokio::test]
    async fn test_initialize_loads_account_and_books() {
        let f = signed_in().await;
        assert!(f.session.needs_initialization().await);
        f.executor
            .set_body(ACCOUNT_URL, br#"{"account":"120.00 RUB"}"#.to_vec())
            .await;
        f.executor
            .set_body(
                BOOKS_URL,
                br#"{"books":[{"id":"1","title":"Owned","purchase_required":true}]}"#.to_vec(),
            )
            .await;

        f.session.initialize().await.unwrap();
        assert!(!f.session.needs_initialization().await);
        assert_eq!(f.session.current_account().await.as_deref(), Some("120.00 RUB"));
        let owned = f.session.collect_purchased_books().await;
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].site_name, "litres.ru");
        assert_eq!(f.executor.batch_sizes().await.last(), Some(&2));
    }

    #[tokio::test]
    async fn test_reload_refreshes_account() {
        let f = signed_in().await;
        f.executor
            .set_body(ACCOUNT_URL, br#"{"account":"50.00 RUB"}"#.to_vec())
            .await;
        f.executor
            .set_body(BOOKS_URL, br#"{"books":[]}"#.to_vec())
            .await;
        f.session.initialize().await.unwrap();
        assert_eq!(f.session.current_account().await.as_deref(), Some("50.00 RUB"));

        f.executor
            .set_body(ACCOUNT_URL, br#"{"account":"10.00 RUB"}"#.to_vec())
            .await;
        f.session.reload_purchased_books().await.unwrap();
        assert_eq!(f.session.current_account().await.as_deref(), Some("10.00 RUB"));
        assert_eq!(f.executor.batch_sizes().await.last(), Some(&2));
    }

    #[tokio::test]
    async fn test_reload_keeps_the_part_that_failed() {
        let f = signed_in().await;
        f.executor
            .set_body(ACCOUNT_URL, br#"{"account":"50.00 RUB"}"#.to_vec())
            .await;
        f.executor
            .set_body(BOOKS_URL, br#"{"books":[]}"#.to_vec())
            .await;
        f.session.reload_purchased_books().await.unwrap();

        f.executor.set_error(ACCOUNT_URL, NetworkError::Timeout).await;
        f.executor
            .set_body(
                BOOKS_URL,
                br#"{"books":[{"id":"1","title":"Owned","purchase_required":true}]}"#.to_vec(),
            )
            .await;
        assert!(matches!(
            f.session.reload_purchased_books().await,
            Err(AuthError::Network(NetworkError::Timeout))
        ));
        assert_eq!(f.session.current_account().await.as_deref(), Some("50.00 RUB"));
        assert_eq!(f.session.collect_purchased_books().await.len(), 1);
    }

    #[tokio::test]
    async fn test_reload_error_keeps_cache() {
        let f = signed_in().await;
        f.executor
            .set_body(ACCOUNT_URL, br#"{"account":"50.00 RUB"}"#.to_vec())
            .await;
        f.executor
            .set_body(
                BOOKS_URL,
                br#"{"books":[{"id":"1","title":"Owned","purchase_required":true}]}"#.to_vec(),
            )
            .await;
        f.session.reload_purchased_books().await.unwrap();

        f.executor.set_error(BOOKS_URL, NetworkError::Timeout).await;
        assert!(f.session.reload_purchased_books().await.is_err());
        assert_eq!(f.session.collect_purchased_books().await.len(), 1);
    }

    #[tokio::test]
    async fn test_links_for_purchased_book() {
        let f = signed_in().await;
        let book = fixtures::purchasable_entry("litres.ru", "177", "Master i Margarita");
        assert!(f.session.download_link(&book).await.is_none());

        f.executor
            .set_body(PURCHASE_URL, br#"{"account":"0.00 RUB"}"#.to_vec())
            .await;
        f.session.purchase_book(&book).await.unwrap();

        assert_eq!(
            f.session.download_link(&book).await.as_deref(),
            Some("https://robot.litres.ru/pages/catalit_download_book/?art=177&sid=sid-1")
        );
        assert_eq!(
            f.session.network_book_id(&book),
            "http://robot.litres.ru/pages/catalit_download_book/?art=177"
        );
        assert_eq!(f.session.download_format(&book), BookFormat::Fb2Zip);
        assert_eq!(
            f.session.refill_account_link().await.as_deref(),
            Some("https://robot.litres.ru/pages/put_money_on_account/?sid=sid-1")
        );
    }

    #[tokio::test]
    async fn test_log_out_clears_session() {
        let f = signed_in().await;
        f.session.log_out().await.unwrap();
        assert_eq!(
            f.session.is_authorised(false).await.unwrap(),
            AuthenticationStatus::Unchecked
        );
        assert!(f.session.refill_account_link().await.is_none());
        assert_eq!(f.settings.get("litres.ru.session_token").unwrap(), None);
        assert_eq!(f.session.current_user_name().await, "reader");
    }

    #[tokio::test]
    async fn test_unsupported_operations() {
        let mut config = fixtures::bookstore_config();
        config.registration = false;
        config.password_recovery = false;
        let session = BookstoreSession::new(
            &config,
            Arc::new(MockExecutor::new()),
            Arc::new(JsonStoreReplies),
            Arc::new(MemorySettingsStore::new()),
        );
        assert!(!session.registration_supported());
        assert!(matches!(
            session.register_user("a", "b", "c@d.e").await,
            Err(AuthError::Unsupported(_))
        ));
        assert!(matches!(
            session.recover_password("c@d.e").await,
            Err(AuthError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_register_signs_in() {
        let f = fixture();
        f.executor
            .set_body(
                "https://robot.litres.ru/pages/catalit_refresh_user/",
                br#"{"user_name":"","session_token":"sid-new"}"#.to_vec(),
            )
            .await;
        f.session
            .register_user("newbie", "pw", "newbie@example.com")
            .await
            .unwrap();
        assert_eq!(f.session.current_user_name().await, "newbie");
        assert_eq!(
            f.session.is_authorised(false).await.unwrap(),
            AuthenticationStatus::Authorised
        );
    }
}
