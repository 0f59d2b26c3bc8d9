// Authentication module
// Session state, credential refresh and auth-driven redirects

mod manager;
mod redirect;
mod refresh;
mod timestamp;
mod types;

pub use manager::SessionManager;
pub use redirect::redirect_on_auth_status;
pub use refresh::RefreshFailure;
pub use timestamp::TokenTimestamp;
pub use types::{AuthExpectation, LoginResponse, Session, SignInData, SignUpData};
