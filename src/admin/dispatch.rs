//! Admin request dispatch.
//!
//! Each admin action arrives with a nonce. The nonce is checked before
//! anything runs; the response is a redirect whose query string carries the
//! action's outcome as `0` or `1`.

use serde::{Deserialize, Serialize};

use crate::admin::service::SessionService;
use crate::backends::SessionBackend;
use crate::error::{Result, SessionError};

/// Admin page the redirects return to.
pub const ADMIN_PAGE: &str = "redsess";

/// An administrative action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminAction {
    TestConnection,
    EnableSessions,
    DisableSessions,
}

impl AdminAction {
    pub const ALL: [AdminAction; 3] = [
        AdminAction::TestConnection,
        AdminAction::EnableSessions,
        AdminAction::DisableSessions,
    ];

    /// Action name the nonce is bound to.
    pub fn nonce_action(&self) -> &'static str {
        match self {
            AdminAction::TestConnection => "redsess_test_connection",
            AdminAction::EnableSessions => "redsess_enable_sessions",
            AdminAction::DisableSessions => "redsess_disable_sessions",
        }
    }

    /// Redirect query key carrying the outcome.
    pub fn query_key(&self) -> &'static str {
        match self {
            AdminAction::TestConnection => "connection_tested",
            AdminAction::EnableSessions => "sessions_enabled",
            AdminAction::DisableSessions => "sessions_disabled",
        }
    }

    /// Look up an action by its nonce action name.
    pub fn from_nonce_action(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.nonce_action() == name)
    }
}

/// An incoming admin request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminRequest {
    pub action: AdminAction,
    pub nonce: String,
    /// Session key for `EnableSessions`; generated when absent.
    pub session_key: Option<String>,
}

impl AdminRequest {
    pub fn new(action: AdminAction, nonce: impl Into<String>) -> Self {
        Self {
            action,
            nonce: nonce.into(),
            session_key: None,
        }
    }
}

/// Verifies request nonces. Supplied by the host.
pub trait NonceVerifier {
    fn verify(&self, nonce: &str, action: &str) -> bool;
}

impl<F> NonceVerifier for F
where
    F: Fn(&str, &str) -> bool,
{
    fn verify(&self, nonce: &str, action: &str) -> bool {
        self(nonce, action)
    }
}

/// Redirect issued after an admin action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Redirect {
    pub page: String,
    pub key: String,
    pub success: bool,
}

impl Redirect {
    /// Query string, e.g. `page=redsess&connection_tested=1`.
    pub fn query(&self) -> String {
        format!(
            "page={}&{}={}",
            self.page,
            self.key,
            if self.success { 1 } else { 0 }
        )
    }

    /// Full redirect target under `admin_url`.
    pub fn location(&self, admin_url: &str) -> String {
        let separator = if admin_url.contains('?') { '&' } else { '?' };
        format!("{}{}{}", admin_url, separator, self.query())
    }
}

/// Verify and run an admin request.
///
/// # Errors
///
/// Returns `SessionError::Forbidden` without running anything when the
/// nonce is rejected.
pub fn dispatch<B, V>(
    service: &mut SessionService<B>,
    request: &AdminRequest,
    verifier: &V,
) -> Result<Redirect>
where
    B: SessionBackend,
    V: NonceVerifier + ?Sized,
{
    let action = request.action;
    if !verifier.verify(&request.nonce, action.nonce_action()) {
        tracing::warn!("rejected admin request {}: bad nonce", action.nonce_action());
        return Err(SessionError::forbidden(action.nonce_action()));
    }

    let success = match action {
        AdminAction::TestConnection => service.test_connection().success,
        AdminAction::EnableSessions => service.enable_sessions(request.session_key.clone()),
        AdminAction::DisableSessions => service.disable_sessions(),
    };

    Ok(Redirect {
        page: ADMIN_PAGE.to_string(),
        key: action.query_key().to_string(),
        success,
    })
}
