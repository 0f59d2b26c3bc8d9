// Token refresh logic
// One refresh call in flight at a time, shared by every caller that needs it

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

use super::timestamp::TokenTimestamp;
use crate::http_client::{ApiClient, Channel, RequestConfig};

pub const REFRESH_PATH: &str = "/dj-rest-auth/token/refresh/";

/// Why a refresh didn't go through
/// Cloneable so every waiter on a shared refresh gets a copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Token refresh failed: {message}")]
pub struct RefreshFailure {
    pub status: Option<u16>,
    pub message: String,
}

type RefreshFuture = Shared<BoxFuture<'static, Result<(), RefreshFailure>>>;

/// Deduplicates concurrent refresh attempts
pub struct RefreshCoordinator {
    api: Arc<ApiClient>,
    timestamp: Arc<TokenTimestamp>,
    in_flight: Mutex<Option<RefreshFuture>>,
}

impl RefreshCoordinator {
    pub fn new(api: Arc<ApiClient>, timestamp: Arc<TokenTimestamp>) -> Self {
        Self {
            api,
            timestamp,
            in_flight: Mutex::new(None),
        }
    }

    /// Refresh the credential, joining a refresh already in progress
    pub async fn refresh(&self) -> Result<(), RefreshFailure> {
        let shared = {
            let mut slot = self.in_flight.lock().await;
            let pending = slot.as_ref().filter(|f| f.peek().is_none()).cloned();
            match pending {
                Some(pending) => {
                    tracing::debug!("Joining in-flight token refresh");
                    pending
                }
                None => {
                    let fut = refresh_token(Arc::clone(&self.api), Arc::clone(&self.timestamp))
                        .boxed()
                        .shared();
                    *slot = Some(fut.clone());
                    fut
                }
            }
        };

        let result = shared.await;

        let mut slot = self.in_flight.lock().await;
        if slot.as_ref().is_some_and(|f| f.peek().is_some()) {
            *slot = None;
        }

        result
    }
}

/// POST the refresh endpoint and record the time on success
async fn refresh_token(
    api: Arc<ApiClient>,
    timestamp: Arc<TokenTimestamp>,
) -> Result<(), RefreshFailure> {
    tracing::debug!("Refreshing access token...");

    match api
        .execute(Channel::Plain, &RequestConfig::post(REFRESH_PATH))
        .await
    {
        Ok(_) => {
            timestamp.touch().await;
            tracing::info!("Access token refreshed");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Token refresh failed: {}", e);
            Err(RefreshFailure {
                status: e.status(),
                message: e.to_string(),
            })
        }
    }
}
