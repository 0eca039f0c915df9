//! # Auth Commands
//!
//! Identity operations. All of them go through the `SessionStore`, which
//! emits the user-facing notice and keeps the session state consistent.
//!
//! ## Sign-in Paths
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Password                                                               │
//! │    sign_up ──► sign_in ──────────────────────────────► signed in        │
//! │                                                                         │
//! │  OAuth                                                                  │
//! │    sign_in_with_oauth ──► URL (state=...)                               │
//! │    complete_oauth(state) ──► pushed SignedIn ─────────► signed in       │
//! │                                                                         │
//! │  Recovery                                                               │
//! │    forgot_password ──► recovery_inbox (link token)                      │
//! │    open_recovery_link(token) ──► pushed PasswordRecovery ► signed in    │
//! │    reset_password(new) ──► UserUpdated                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `complete_oauth`, `open_recovery_link` and `recovery_inbox` play the part
//! of the provider and the user's mailbox for the local backend.

use std::time::Duration;

use bazaar_core::{
    AuthUser, OAuthProvider, ProfileUpdate, Session, SessionPhase, UserProfile,
    VendorApplication, VendorProfile,
};
use bazaar_session::RecoveryEmail;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ApiResult;
use crate::state::SessionState;

/// How long to wait for a pushed auth event to land in the session.
const PUSH_SETTLE_TIMEOUT: Duration = Duration::from_secs(2);

/// Session summary for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub phase: SessionPhase,
    pub user: Option<UserProfile>,
    pub vendor: Option<VendorProfile>,
    pub is_admin: bool,
    pub loading: bool,
}

impl From<Session> for SessionResponse {
    fn from(session: Session) -> Self {
        SessionResponse {
            phase: session.phase(),
            is_admin: session.is_admin,
            loading: session.loading,
            user: session.user,
            vendor: session.vendor,
        }
    }
}

/// Current identity: user, vendor, admin flag.
pub fn get_session(session: &SessionState) -> SessionResponse {
    debug!("get_session command");
    SessionResponse::from(session.inner().snapshot())
}

/// Creates an account. The shopper signs in separately.
pub async fn sign_up(
    session: &SessionState,
    email: &str,
    password: &str,
    full_name: &str,
) -> ApiResult<AuthUser> {
    debug!(email = %email, "sign_up command");
    Ok(session.inner().sign_up(email, password, full_name).await?)
}

pub async fn sign_in(
    session: &SessionState,
    email: &str,
    password: &str,
) -> ApiResult<SessionResponse> {
    debug!(email = %email, "sign_in command");
    session.inner().sign_in(email, password).await?;
    Ok(get_session(session))
}

/// Starts an OAuth sign-in. Returns the provider URL.
pub async fn sign_in_with_oauth(session: &SessionState, provider: &str) -> ApiResult<String> {
    debug!(provider = %provider, "sign_in_with_oauth command");
    let provider: OAuthProvider = provider.parse()?;
    Ok(session.inner().sign_in_with_oauth(provider).await?)
}

/// Plays the provider callback for a pending OAuth sign-in.
///
/// The session picks the sign-in up from the pushed event; this waits
/// briefly for it so the caller sees the signed-in state.
pub async fn complete_oauth(
    session: &SessionState,
    state: &str,
    email: &str,
    display_name: &str,
) -> ApiResult<SessionResponse> {
    debug!(email = %email, "complete_oauth command");
    let auth = session
        .backend()
        .complete_oauth(state, email, display_name)
        .await?;
    wait_for_user(session, &auth.user.id).await;
    Ok(get_session(session))
}

pub async fn sign_out(session: &SessionState) -> ApiResult<()> {
    debug!("sign_out command");
    Ok(session.inner().sign_out().await?)
}

/// Requests a recovery email. Succeeds whether or not the account exists.
pub async fn forgot_password(session: &SessionState, email: &str) -> ApiResult<()> {
    debug!(email = %email, "forgot_password command");
    Ok(session.inner().forgot_password(email).await?)
}

/// Recovery emails sent since the last call.
pub fn recovery_inbox(session: &SessionState) -> Vec<RecoveryEmail> {
    debug!("recovery_inbox command");
    session.backend().take_recovery_emails()
}

/// Follows a recovery link, which signs the account in for the reset.
pub async fn open_recovery_link(
    session: &SessionState,
    token: &str,
) -> ApiResult<SessionResponse> {
    debug!("open_recovery_link command");
    let auth = session.backend().verify_recovery(token).await?;
    wait_for_user(session, &auth.user.id).await;
    Ok(get_session(session))
}

/// Sets a new password for the account signed in by the recovery link.
pub async fn reset_password(session: &SessionState, new_password: &str) -> ApiResult<()> {
    debug!("reset_password command");
    Ok(session.inner().reset_password(new_password).await?)
}

pub async fn update_profile(
    session: &SessionState,
    update: ProfileUpdate,
) -> ApiResult<UserProfile> {
    debug!("update_profile command");
    session.inner().update_profile(update).await?;
    session.require_user()
}

/// Applies to sell on the storefront. The vendor starts out pending.
pub async fn become_vendor(
    session: &SessionState,
    application: VendorApplication,
) -> ApiResult<VendorProfile> {
    debug!(business = %application.business_name, "become_vendor command");
    Ok(session.inner().become_vendor(application).await?)
}

/// Re-reads the user and vendor rows (picks up an approval).
pub async fn refresh_profile(session: &SessionState) -> ApiResult<SessionResponse> {
    debug!("refresh_profile command");
    session.inner().refresh_profile().await?;
    Ok(get_session(session))
}

pub async fn admin_login(session: &SessionState, password: &str) -> ApiResult<()> {
    debug!("admin_login command");
    Ok(session.inner().admin_login(password).await?)
}

async fn wait_for_user(session: &SessionState, user_id: &str) {
    let mut rx = session.inner().subscribe();
    // The watch guard must not outlive this statement: it blocks the reducer.
    let landed = matches!(
        tokio::time::timeout(
            PUSH_SETTLE_TIMEOUT,
            rx.wait_for(|s| s.user.as_ref().is_some_and(|u| u.id == user_id)),
        )
        .await,
        Ok(Ok(_))
    );

    if !landed {
        warn!(user_id = %user_id, "Pushed sign-in not reflected in session yet");
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::test_support::*;

    #[tokio::test]
    async fn test_sign_in_reports_session() {
        let state = test_state().await;
        state.session.inner().initialize().await.unwrap();

        sign_up(&state.session, "ada@example.com", PASSWORD, "Ada Lovelace")
            .await
            .unwrap();
        let response = sign_in(&state.session, "ada@example.com", PASSWORD)
            .await
            .unwrap();

        assert_eq!(response.phase, SessionPhase::Authenticated);
        assert_eq!(response.user.unwrap().full_name, "Ada Lovelace");
    }

    #[tokio::test]
    async fn test_bad_password_is_auth_error() {
        let state = test_state().await;
        sign_up(&state.session, "ada@example.com", PASSWORD, "Ada Lovelace")
            .await
            .unwrap();

        let err = sign_in(&state.session, "ada@example.com", "wrong-one")
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::AuthError);
        assert_eq!(err.message, "Invalid login credentials");
        assert!(get_session(&state.session).user.is_none());
    }

    #[tokio::test]
    async fn test_unknown_oauth_provider_rejected() {
        let state = test_state().await;
        let err = sign_in_with_oauth(&state.session, "myspace").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_oauth_round_trip() {
        let state = test_state().await;
        state.session.inner().initialize().await.unwrap();

        let url = sign_in_with_oauth(&state.session, "github").await.unwrap();
        let oauth_state = url.rsplit("state=").next().unwrap().to_string();

        let response = complete_oauth(
            &state.session,
            &oauth_state,
            "grace@example.com",
            "Grace Hopper",
        )
        .await
        .unwrap();

        assert_eq!(response.user.unwrap().email, "grace@example.com");
    }

    #[tokio::test]
    async fn test_recovery_through_inbox() {
        let state = test_state().await;
        state.session.inner().initialize().await.unwrap();
        sign_up(&state.session, "ada@example.com", PASSWORD, "Ada Lovelace")
            .await
            .unwrap();

        forgot_password(&state.session, "ada@example.com").await.unwrap();
        let inbox = recovery_inbox(&state.session);
        assert_eq!(inbox.len(), 1);
        assert!(recovery_inbox(&state.session).is_empty());

        let response = open_recovery_link(&state.session, &inbox[0].token)
            .await
            .unwrap();
        assert!(response.user.is_some());

        reset_password(&state.session, "another1").await.unwrap();
        sign_out(&state.session).await.unwrap();
        sign_in(&state.session, "ada@example.com", "another1").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_profile_requires_sign_in() {
        let state = test_state().await;
        let err = update_profile(
            &state.session,
            ProfileUpdate {
                phone: Some("+233 20 000 0000".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.code, ErrorCode::Unauthorized);
    }

    #[tokio::test]
    async fn test_admin_login_wrong_password() {
        let state = test_state().await;
        let err = admin_login(&state.session, "nope").await.unwrap_err();

        assert_eq!(err.message, "Invalid admin password");
        assert!(!get_session(&state.session).is_admin);
    }
}
