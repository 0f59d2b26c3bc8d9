// Integration tests for the DRF Social client
//
// These tests drive the session manager, profile store and navigation bar
// together against a mock API server.

use mockito::{Matcher, Server, ServerGuard};
use reqwest::cookie::CookieStore;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use drf_social_client::{
    auth::{SessionManager, SignInData, TokenTimestamp},
    error::ClientError,
    http_client::{ApiClient, RequestConfig},
    navigation::{routes, History, Navigator},
    profiles::{Paginated, Profile, ProfileStore},
    ui::{Document, NavAction, NavBar},
};

// ==================================================================================================
// Test Helpers
// ==================================================================================================

const USER: &str = r#"{"pk": 19, "username": "user2", "profile_id": 19, "profile_image": "https://example.com/u2.jpg"}"#;

struct TestApp {
    server: ServerGuard,
    session: Arc<SessionManager>,
    history: Arc<History>,
}

async fn test_app() -> TestApp {
    let server = Server::new_async().await;
    let api = Arc::new(ApiClient::new(&server.url(), 5, 5).expect("client"));
    let history = Arc::new(History::default());
    let session = Arc::new(SessionManager::new(
        api,
        Arc::new(TokenTimestamp::in_memory()),
        history.clone(),
        240,
    ));

    TestApp {
        server,
        session,
        history,
    }
}

fn user2() -> drf_social_client::auth::Session {
    serde_json::from_str(USER).unwrap()
}

fn profile_json(id: u64, followers_count: i64, following_id: Option<u64>) -> serde_json::Value {
    json!({
        "id": id,
        "owner": format!("user{}", id),
        "followers_count": followers_count,
        "following_id": following_id,
        "image": "https://example.com/p.jpg"
    })
}

// ==================================================================================================
// Startup
// ==================================================================================================

#[tokio::test]
async fn test_mount_without_cookie_stays_anonymous() {
    let mut app = test_app().await;

    let user = app
        .server
        .mock("GET", "/dj-rest-auth/user/")
        .with_status(401)
        .with_body(r#"{"detail": "Authentication credentials were not provided."}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = app
        .server
        .mock("POST", "/dj-rest-auth/token/refresh/")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;

    let err = app.session.init().await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(app.session.current_user().is_none());

    // Never signed in, so no redirect to the sign-in page
    assert_eq!(app.history.current(), routes::HOME);

    let document = Arc::new(Document::new());
    let node = document.create_element(Document::ROOT);
    let nav = NavBar::mount(&document, node, Arc::clone(&app.session));
    let labels: Vec<_> = nav.links().iter().map(|l| l.label).collect();
    assert_eq!(labels, vec!["Home", "Sign in", "Sign up"]);

    user.assert_async().await;
    refresh.assert_async().await;
}

// ==================================================================================================
// Sign in / sign out
// ==================================================================================================

#[tokio::test]
async fn test_login_sets_session_and_returns_to_previous_page() {
    let mut app = test_app().await;

    let login = app
        .server
        .mock("POST", "/dj-rest-auth/login/")
        .match_header(
            "content-type",
            Matcher::Regex("multipart/form-data".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("user2".to_string()),
            Matcher::Regex("pw".to_string()),
        ]))
        .with_status(200)
        .with_header("set-cookie", "my-app-auth=access; Path=/")
        .with_body(format!(
            r#"{{"user": {}, "access_token": "", "refresh_token": ""}}"#,
            USER
        ))
        .create_async()
        .await;

    app.history.push(routes::FEED);
    app.history.push(routes::SIGN_IN);

    let user = app
        .session
        .login(&SignInData {
            username: "user2".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(user, user2());
    assert_eq!(app.session.current_user(), Some(user2()));
    assert!(app.session.timestamp().get().await.is_some());
    assert_eq!(app.history.current(), routes::FEED);

    // The auth cookie is shared with the other channels
    let cookies = app
        .session
        .api()
        .cookie_jar()
        .cookies(app.session.api().base_url())
        .expect("cookie stored");
    assert!(cookies.to_str().unwrap().contains("my-app-auth=access"));

    login.assert_async().await;
}

#[tokio::test]
async fn test_login_rejected_reports_field_errors() {
    let mut app = test_app().await;

    app.server
        .mock("POST", "/dj-rest-auth/login/")
        .with_status(400)
        .with_body(r#"{"non_field_errors": ["Unable to log in with provided credentials."]}"#)
        .create_async()
        .await;

    let err = app
        .session
        .login(&SignInData {
            username: "user2".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();

    match err {
        ClientError::Validation(fields) => {
            assert_eq!(
                fields.non_field(),
                &["Unable to log in with provided credentials.".to_string()]
            );
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert!(app.session.current_user().is_none());
    assert!(app.session.timestamp().get().await.is_none());
}

#[tokio::test]
async fn test_sign_out_link_clears_session() {
    let mut app = test_app().await;

    let logout = app
        .server
        .mock("POST", "/dj-rest-auth/logout/")
        .with_status(200)
        .with_body(r#"{"detail": "Successfully logged out."}"#)
        .create_async()
        .await;

    app.session.set_current_user(Some(user2()));
    app.session.timestamp().touch().await;
    app.history.push(routes::FEED);

    let document = Arc::new(Document::new());
    let node = document.create_element(Document::ROOT);
    let nav = NavBar::mount(&document, node, Arc::clone(&app.session));

    let sign_out = nav
        .links()
        .into_iter()
        .find(|l| l.action == Some(NavAction::SignOut))
        .expect("sign out link");
    nav.activate(&sign_out).await;

    assert!(app.session.current_user().is_none());
    assert!(app.session.timestamp().get().await.is_none());
    assert_eq!(app.history.current(), routes::HOME);

    logout.assert_async().await;
}

// ==================================================================================================
// Refresh and replay
// ==================================================================================================

#[tokio::test]
async fn test_401_refreshes_and_replays_once() {
    let mut app = test_app().await;
    app.session.set_current_user(Some(user2()));

    let unauthorized = app
        .server
        .mock("GET", "/posts/")
        .with_status(401)
        .expect(1)
        .create_async()
        .await;
    let ok = app
        .server
        .mock("GET", "/posts/")
        .with_status(200)
        .with_body(r#"{"results": []}"#)
        .expect(1)
        .create_async()
        .await;
    let refresh = app
        .server
        .mock("POST", "/dj-rest-auth/token/refresh/")
        .with_status(200)
        .with_body(r#"{"access": "new"}"#)
        .expect(1)
        .create_async()
        .await;

    let response = app
        .session
        .send_res(&RequestConfig::get("/posts/"))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(app.session.current_user(), Some(user2()));
    assert!(app.session.timestamp().get().await.is_some());

    unauthorized.assert_async().await;
    ok.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_second_401_after_replay_is_returned_without_another_refresh() {
    let mut app = test_app().await;
    app.session.set_current_user(Some(user2()));

    let unauthorized = app
        .server
        .mock("GET", "/posts/")
        .with_status(401)
        .with_body(r#"{"detail": "Given token not valid for any token type"}"#)
        .expect(2)
        .create_async()
        .await;
    let refresh = app
        .server
        .mock("POST", "/dj-rest-auth/token/refresh/")
        .with_status(200)
        .with_body(r#"{"access": "new"}"#)
        .expect(1)
        .create_async()
        .await;

    let err = app
        .session
        .send_res(&RequestConfig::get("/posts/"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(401));

    // Original request plus exactly one replay, one refresh in between
    unauthorized.assert_async().await;
    refresh.assert_async().await;
}

#[tokio::test]
async fn test_failed_refresh_signs_out_with_original_error() {
    let mut app = test_app().await;
    app.session.set_current_user(Some(user2()));
    app.session.timestamp().touch().await;

    let unauthorized = app
        .server
        .mock("GET", "/posts/")
        .with_status(401)
        .with_body(r#"{"detail": "Given token not valid for any token type"}"#)
        .expect(1)
        .create_async()
        .await;
    app.server
        .mock("POST", "/dj-rest-auth/token/refresh/")
        .with_status(500)
        .create_async()
        .await;

    let err = app
        .session
        .send_res(&RequestConfig::get("/posts/"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(app.session.current_user().is_none());
    assert!(app.session.timestamp().get().await.is_none());
    assert_eq!(app.history.current(), routes::SIGN_IN);

    unauthorized.assert_async().await;
}

// ==================================================================================================
// Follow graph
// ==================================================================================================

#[tokio::test]
async fn test_follow_and_unfollow_update_both_collections() {
    let mut app = test_app().await;
    app.session.set_current_user(Some(user2()));

    let store = ProfileStore::new(Arc::clone(&app.session));
    store
        .update(|data| {
            data.page_profile = Paginated::of(vec![Profile::new(7, 3, None)]);
            data.popular_profiles = Paginated::of(vec![
                Profile::new(5, 10, None),
                Profile::new(7, 3, None),
                Profile::new(9, 1, Some(2)),
            ]);
        })
        .await;

    let follow = app
        .server
        .mock("POST", "/followers/")
        .match_body(Matcher::Regex("followed".to_string()))
        .with_status(201)
        .with_body(r#"{"id": 42, "owner": "user2", "followed": 7}"#)
        .create_async()
        .await;
    let unfollow = app
        .server
        .mock("DELETE", "/followers/42/")
        .with_status(204)
        .create_async()
        .await;

    let before = store.data().await;
    let following_id = store.follow(&Profile::new(7, 3, None)).await.unwrap();
    assert_eq!(following_id, 42);

    let data = store.data().await;
    assert_eq!(data.page_profile.results[0].followers_count, 4);
    assert_eq!(data.page_profile.results[0].following_id, Some(42));
    assert_eq!(data.popular_profiles.results[1].followers_count, 4);
    assert_eq!(data.popular_profiles.results[1].following_id, Some(42));
    assert_eq!(data.popular_profiles.results[0], before.popular_profiles.results[0]);
    assert_eq!(data.popular_profiles.results[2], before.popular_profiles.results[2]);

    let followed = data.page_profile.results[0].clone();
    store.unfollow(&followed).await.unwrap();
    assert_eq!(store.data().await, before);

    follow.assert_async().await;
    unfollow.assert_async().await;
}

#[tokio::test]
async fn test_failed_follow_leaves_cache_untouched() {
    let mut app = test_app().await;
    app.session.set_current_user(Some(user2()));

    let store = ProfileStore::new(Arc::clone(&app.session));
    store
        .set_page_profile(Paginated::of(vec![Profile::new(7, 3, None)]))
        .await;

    app.server
        .mock("POST", "/followers/")
        .with_status(400)
        .with_body(r#"{"detail": "possible duplicate"}"#)
        .create_async()
        .await;

    let before = store.data().await;
    assert!(store.follow(&Profile::new(7, 3, None)).await.is_err());
    assert_eq!(store.data().await, before);
}

#[tokio::test]
async fn test_load_page_profile_replaces_page_collection() {
    let mut app = test_app().await;

    app.server
        .mock("GET", "/profiles/7/")
        .with_status(200)
        .with_body(profile_json(7, 3, None).to_string())
        .create_async()
        .await;

    let store = ProfileStore::new(Arc::clone(&app.session));
    let profile = store.load_page_profile(7).await.unwrap();

    assert_eq!(profile.owner.as_deref(), Some("user7"));
    assert_eq!(profile.extra["image"], "https://example.com/p.jpg");
    assert_eq!(store.data().await.page_profile.results, vec![profile]);
}

// ==================================================================================================
// Leaderboard
// ==================================================================================================

#[tokio::test]
async fn test_leaderboard_follows_identity_changes() {
    let mut app = test_app().await;

    let leaderboard = app
        .server
        .mock("GET", "/profiles/?ordering=-followers_count")
        .with_status(200)
        .with_body(
            json!({
                "count": 2,
                "next": null,
                "previous": null,
                "results": [profile_json(5, 10, None), profile_json(7, 3, None)]
            })
            .to_string(),
        )
        .expect(2)
        .create_async()
        .await;

    let store = Arc::new(ProfileStore::new(Arc::clone(&app.session)));
    let watcher = store.watch_session();

    wait_for(|| async { store.data().await.popular_profiles.results.len() == 2 }).await;

    app.session.set_current_user(Some(user2()));
    // Same identity again must not trigger another fetch
    app.session.set_current_user(Some(user2()));

    wait_for(|| async { leaderboard.matched_async().await }).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    watcher.abort();
    leaderboard.assert_async().await;

    let data = store.data().await;
    assert_eq!(data.popular_profiles.count, 2);
    assert_eq!(data.popular_profiles.results[0].id, 5);
}

async fn wait_for<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..100 {
        if condition().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not met in time");
}
