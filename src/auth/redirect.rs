// Redirect based on auth status
// Pages restricted to one auth state call this when they are shown

use super::manager::SessionManager;
use super::types::AuthExpectation;
use crate::navigation::routes;

/// Probe the credential with a refresh and redirect home on a mismatch
///
/// A successful refresh redirects when the page declared `LoggedIn`; a failed
/// one redirects when it declared `LoggedOut`. Returns true if it navigated.
pub async fn redirect_on_auth_status(
    session: &SessionManager,
    expectation: AuthExpectation,
) -> bool {
    let refreshed = session.refresh().await.is_ok();

    let redirect = match (refreshed, expectation) {
        (true, AuthExpectation::LoggedIn) => true,
        (false, AuthExpectation::LoggedOut) => true,
        _ => false,
    };

    if redirect {
        tracing::debug!(refreshed, ?expectation, "Redirecting home");
        session.navigator().push(routes::HOME);
    }

    redirect
}
