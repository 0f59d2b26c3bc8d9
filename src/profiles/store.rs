use std::sync::{Arc, Weak};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use super::types::{FollowResponse, Paginated, Profile, ProfileData};
use crate::auth::SessionManager;
use crate::error::{ClientError, Result};
use crate::http_client::RequestConfig;

pub const LEADERBOARD_PATH: &str = "/profiles/?ordering=-followers_count";
pub const FOLLOWERS_PATH: &str = "/followers/";

/// Cached profile listings plus the follow/unfollow actions on them
///
/// Follow and unfollow only touch the cache after the server confirms, and
/// update every cached copy of the target profile together.
pub struct ProfileStore {
    session: Arc<SessionManager>,
    data: RwLock<ProfileData>,
}

impl ProfileStore {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self {
            session,
            data: RwLock::new(ProfileData::default()),
        }
    }

    /// Snapshot of both collections
    pub async fn data(&self) -> ProfileData {
        self.data.read().await.clone()
    }

    /// Mutate the cache directly
    pub async fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut ProfileData),
    {
        f(&mut *self.data.write().await);
    }

    pub async fn set_page_profile(&self, page: Paginated<Profile>) {
        self.data.write().await.page_profile = page;
    }

    /// Fetch one profile and make it the page collection
    pub async fn load_page_profile(&self, profile_id: u64) -> Result<Profile> {
        let response = self
            .session
            .send_req(&RequestConfig::get(format!("/profiles/{}/", profile_id)))
            .await?;
        let profile: Profile = response.json().await?;

        self.set_page_profile(Paginated::of(vec![profile.clone()]))
            .await;
        Ok(profile)
    }

    /// Replace the leaderboard with a fresh copy from the server
    pub async fn refresh_leaderboard(&self) -> Result<()> {
        let response = self
            .session
            .send_req(&RequestConfig::get(LEADERBOARD_PATH))
            .await?;
        let popular: Paginated<Profile> = response.json().await?;

        tracing::debug!(count = popular.results.len(), "Leaderboard refreshed");
        self.data.write().await.popular_profiles = popular;
        Ok(())
    }

    /// Follow a profile, returns the new relationship id
    pub async fn follow(&self, target: &Profile) -> Result<u64> {
        let config = RequestConfig::post(FOLLOWERS_PATH).field("followed", target.id);
        let response = self.session.send_res(&config).await?;
        let created: FollowResponse = response.json().await?;

        let updated = self.data.write().await.apply_follow(target.id, created.id);
        tracing::info!(
            profile_id = target.id,
            following_id = created.id,
            updated,
            "Followed profile"
        );

        Ok(created.id)
    }

    /// Unfollow a profile using the relationship id it carries
    pub async fn unfollow(&self, target: &Profile) -> Result<()> {
        let following_id = target.following_id.ok_or_else(|| {
            ClientError::InvalidState(format!("profile {} is not followed", target.id))
        })?;

        self.session
            .send_res(&RequestConfig::delete(format!(
                "{}{}/",
                FOLLOWERS_PATH, following_id
            )))
            .await?;

        let updated = self.data.write().await.apply_unfollow(target.id);
        tracing::info!(profile_id = target.id, following_id, updated, "Unfollowed profile");

        Ok(())
    }

    /// Keep the leaderboard in step with the signed-in identity
    ///
    /// Refreshes once immediately, then on every identity change. The task
    /// ends when the store or the session manager goes away.
    pub fn watch_session(self: &Arc<Self>) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        let mut identity = self.session.subscribe();

        tokio::spawn(async move {
            loop {
                let _ = identity.borrow_and_update();

                match store.upgrade() {
                    Some(store) => {
                        if let Err(e) = store.refresh_leaderboard().await {
                            tracing::warn!("Failed to load popular profiles: {}", e);
                        }
                    }
                    None => break,
                }

                if identity.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("Leaderboard watcher stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenTimestamp;
    use crate::http_client::ApiClient;
    use crate::navigation::History;

    fn store(url: &str) -> ProfileStore {
        let session = SessionManager::new(
            Arc::new(ApiClient::new(url, 5, 5).unwrap()),
            Arc::new(TokenTimestamp::in_memory()),
            Arc::new(History::default()),
            240,
        );
        ProfileStore::new(Arc::new(session))
    }

    #[tokio::test]
    async fn test_follow_failure_leaves_cache() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/followers/")
            .with_status(400)
            .with_body(r#"{"detail": "possible duplicate"}"#)
            .create_async()
            .await;

        let store = store(&server.url());
        store
            .set_page_profile(Paginated::of(vec![Profile::new(3, 10, None)]))
            .await;
        let before = store.data().await;

        let target = before.page_profile.results[0].clone();
        assert!(store.follow(&target).await.is_err());
        assert_eq!(store.data().await, before);
    }

    #[tokio::test]
    async fn test_unfollow_without_relationship_is_rejected() {
        let store = store("http://127.0.0.1:1");
        let err = store
            .unfollow(&Profile::new(3, 10, None))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_unfollow_deletes_relationship() {
        let mut server = mockito::Server::new_async().await;
        let delete = server
            .mock("DELETE", "/followers/42/")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let store = store(&server.url());
        let followed = Profile::new(3, 11, Some(42));
        store
            .set_page_profile(Paginated::of(vec![followed.clone()]))
            .await;

        store.unfollow(&followed).await.unwrap();
        delete.assert_async().await;

        let data = store.data().await;
        assert_eq!(data.page_profile.results[0].following_id, None);
        assert_eq!(data.page_profile.results[0].followers_count, 10);
    }

    #[tokio::test]
    async fn test_load_page_profile() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/profiles/3/")
            .with_status(200)
            .with_body(r#"{"id": 3, "owner": "user3", "followers_count": 4, "following_id": null}"#)
            .create_async()
            .await;

        let store = store(&server.url());
        let profile = store.load_page_profile(3).await.unwrap();

        assert_eq!(profile.owner.as_deref(), Some("user3"));
        assert_eq!(store.data().await.page_profile.results, vec![profile]);
    }

    #[tokio::test]
    async fn test_update_mutates_cache() {
        let store = store("http://127.0.0.1:1");
        store
            .update(|data| data.popular_profiles = Paginated::of(vec![Profile::new(1, 0, None)]))
            .await;
        assert_eq!(store.data().await.popular_profiles.count, 1);
    }
}
