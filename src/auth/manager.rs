use chrono::Duration;
use reqwest::Response;
use std::sync::Arc;
use tokio::sync::watch;

use super::refresh::{RefreshCoordinator, RefreshFailure};
use super::timestamp::TokenTimestamp;
use super::types::{LoginResponse, Session, SignInData, SignUpData};
use crate::error::{ClientError, Result};
use crate::http_client::{ApiClient, Channel, RequestConfig};
use crate::navigation::{routes, Navigator};

pub const CURRENT_USER_PATH: &str = "dj-rest-auth/user/";
pub const LOGIN_PATH: &str = "/dj-rest-auth/login/";
pub const LOGOUT_PATH: &str = "dj-rest-auth/logout/";
pub const REGISTRATION_PATH: &str = "/dj-rest-auth/registration/";

/// Session manager
/// Holds the current identity and wraps the `Req`/`Res` channels with
/// refresh interceptors. Anonymous is `None`, authenticated is `Some`.
pub struct SessionManager {
    api: Arc<ApiClient>,

    /// Current identity, subscribers are notified when it changes
    current: watch::Sender<Option<Session>>,

    /// Last successful login/refresh
    timestamp: Arc<TokenTimestamp>,

    refresher: RefreshCoordinator,

    navigator: Arc<dyn Navigator>,

    /// How long after the last refresh the request channel refreshes again
    refresh_window: Duration,
}

impl SessionManager {
    pub fn new(
        api: Arc<ApiClient>,
        timestamp: Arc<TokenTimestamp>,
        navigator: Arc<dyn Navigator>,
        refresh_window_secs: u64,
    ) -> Self {
        let (current, _) = watch::channel(None);
        let refresher = RefreshCoordinator::new(Arc::clone(&api), Arc::clone(&timestamp));

        Self {
            api,
            current,
            timestamp,
            refresher,
            navigator,
            refresh_window: refresh_window(refresh_window_secs),
        }
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.navigator
    }

    pub fn timestamp(&self) -> &Arc<TokenTimestamp> {
        &self.timestamp
    }

    pub fn current_user(&self) -> Option<Session> {
        self.current.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.borrow().is_some()
    }

    /// Replace the current identity
    /// Subscribers only hear about it when the identity actually differs.
    pub fn set_current_user(&self, session: Option<Session>) {
        self.current.send_if_modified(|current| {
            if *current == session {
                return false;
            }
            match session {
                Some(ref s) => tracing::info!(username = %s.username, "Signed in"),
                None => tracing::info!("Signed out"),
            }
            *current = session;
            true
        });
    }

    /// Watch identity changes
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.current.subscribe()
    }

    /// Fetch the current identity at startup
    /// Failure leaves the session anonymous; the error is logged and returned.
    pub async fn init(&self) -> Result<Session> {
        let result = async {
            let response = self
                .send_res(&RequestConfig::get(CURRENT_USER_PATH))
                .await?;
            Ok::<Session, ClientError>(response.json().await?)
        }
        .await;

        match result {
            Ok(session) => {
                self.set_current_user(Some(session.clone()));
                Ok(session)
            }
            Err(e) => {
                tracing::warn!("No current user, staying signed out: {}", e);
                Err(e)
            }
        }
    }

    /// Sign in with username and password
    /// On success the session and refresh timestamp are set and the
    /// navigator returns to the previous page.
    pub async fn login(&self, data: &SignInData) -> Result<Session> {
        let config = RequestConfig::post(LOGIN_PATH)
            .field("username", &data.username)
            .field("password", &data.password);

        let response = self
            .api
            .execute(Channel::Plain, &config)
            .await
            .map_err(ClientError::into_validation)?;
        let body: LoginResponse = response.json().await?;

        self.set_current_user(Some(body.user.clone()));
        self.timestamp.touch().await;
        self.navigator.go_back();

        Ok(body.user)
    }

    /// Create an account, then send the user to the sign-in page
    pub async fn register(&self, data: &SignUpData) -> Result<()> {
        let config = RequestConfig::post(REGISTRATION_PATH)
            .field("username", &data.username)
            .field("password1", &data.password1)
            .field("password2", &data.password2);

        self.api
            .execute(Channel::Plain, &config)
            .await
            .map_err(ClientError::into_validation)?;

        tracing::info!(username = %data.username, "Account created");
        self.navigator.push(routes::SIGN_IN);
        Ok(())
    }

    /// Sign out
    /// Local state is cleared whatever the server says.
    pub async fn logout(&self) -> Result<()> {
        let result = self
            .api
            .execute(Channel::Plain, &RequestConfig::post(LOGOUT_PATH))
            .await;

        if let Err(ref e) = result {
            tracing::warn!("Logout request failed, clearing session anyway: {}", e);
        }

        self.set_current_user(None);
        self.timestamp.clear().await;

        result.map(|_| ())
    }

    /// Refresh the credential without touching session state
    pub async fn refresh(&self) -> std::result::Result<(), RefreshFailure> {
        self.refresher.refresh().await
    }

    /// Send on the request channel
    /// Refreshes first when the window has elapsed. A failed refresh signs
    /// out but the request still goes out.
    pub async fn send_req(&self, config: &RequestConfig) -> Result<Response> {
        if self.timestamp.should_refresh(self.refresh_window).await {
            tracing::debug!(path = %config.path, "Refresh due before request");
            if let Err(failure) = self.refresher.refresh().await {
                self.sign_out_after_refresh_failure(&failure).await;
            }
        }

        self.api.execute(Channel::Req, config).await
    }

    /// Send on the response channel
    /// A 401 triggers one refresh and at most one replay. If the refresh
    /// fails the caller gets the original 401.
    pub async fn send_res(&self, config: &RequestConfig) -> Result<Response> {
        match self.api.execute(Channel::Res, config).await {
            Err(err) if err.is_unauthorized() => {
                tracing::debug!(path = %config.path, "Received 401, refreshing and replaying");
                match self.refresher.refresh().await {
                    Ok(()) => self.api.execute(Channel::Res, config).await,
                    Err(failure) => {
                        self.sign_out_after_refresh_failure(&failure).await;
                        Err(err)
                    }
                }
            }
            other => other,
        }
    }

    async fn sign_out_after_refresh_failure(&self, failure: &RefreshFailure) {
        let was_signed_in = self.is_authenticated();
        tracing::warn!(was_signed_in, "{}, signing out", failure);

        self.set_current_user(None);
        self.timestamp.clear().await;

        if was_signed_in {
            self.navigator.push(routes::SIGN_IN);
        }
    }
}

/// Window as a time delta, saturating at the largest one chrono can hold
fn refresh_window(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
