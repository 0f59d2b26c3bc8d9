// UI state helpers
// Headless models of the navigation bar and its click-outside collapse

mod click_outside;
mod document;
mod nav;

pub use click_outside::{ClickOutsideToggle, NodeRef};
pub use document::{Document, ListenerHandle, NodeId};
pub use nav::{nav_links, NavAction, NavBar, NavLink};
