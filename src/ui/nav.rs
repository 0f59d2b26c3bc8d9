// Navigation bar model
// Which links are shown for the current session and what following them does

use std::sync::Arc;

use super::click_outside::ClickOutsideToggle;
use super::document::{Document, NodeId};
use crate::auth::{Session, SessionManager};
use crate::navigation::routes;

/// Side effect attached to a link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    SignOut,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    pub label: &'static str,
    pub to: String,
    pub action: Option<NavAction>,
    /// Avatar image shown instead of an icon
    pub avatar: Option<String>,
}

impl NavLink {
    fn to(label: &'static str, to: impl Into<String>) -> Self {
        Self {
            label,
            to: to.into(),
            action: None,
            avatar: None,
        }
    }
}

/// Links for the given session, home first
pub fn nav_links(session: Option<&Session>) -> Vec<NavLink> {
    let mut links = vec![NavLink::to("Home", routes::HOME)];

    match session {
        Some(user) => {
            links.push(NavLink::to("Add post", routes::CREATE_POST));
            links.push(NavLink::to("Feed", routes::FEED));
            links.push(NavLink::to("Liked", routes::LIKED));
            links.push(NavLink {
                action: Some(NavAction::SignOut),
                ..NavLink::to("Sign out", routes::HOME)
            });
            links.push(NavLink {
                avatar: user.profile_image.clone(),
                ..NavLink::to("Profile", routes::profile(user.profile_id))
            });
        }
        None => {
            links.push(NavLink::to("Sign in", routes::SIGN_IN));
            links.push(NavLink::to("Sign up", routes::SIGN_UP));
        }
    }

    links
}

/// Collapsible navigation bar bound to a session
pub struct NavBar {
    session: Arc<SessionManager>,
    toggle: ClickOutsideToggle,
}

impl NavBar {
    /// Mount the bar as the element `node`
    pub fn mount(document: &Arc<Document>, node: NodeId, session: Arc<SessionManager>) -> Self {
        let toggle = ClickOutsideToggle::mount(document);
        toggle.node_ref().attach(node);
        Self { session, toggle }
    }

    pub fn links(&self) -> Vec<NavLink> {
        nav_links(self.session.current_user().as_ref())
    }

    pub fn expanded(&self) -> bool {
        self.toggle.expanded()
    }

    /// Burger button
    pub fn toggle(&self) {
        self.toggle.set_expanded(!self.toggle.expanded());
    }

    /// Follow a link, signing out first when it asks to
    pub async fn activate(&self, link: &NavLink) {
        if link.action == Some(NavAction::SignOut) {
            if let Err(e) = self.session.logout().await {
                tracing::warn!("Sign out request failed: {}", e);
            }
        }
        self.session.navigator().push(&link.to);
    }
}
