//! Session records: what is persisted, what readers see, what subscribers hear.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::backend::LoginResponse;
use crate::role::Role;

/// Who is logged in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    #[serde(alias = "username")]
    pub name: String,
    #[serde(default)]
    pub role: Option<Role>,
}

/// The durable session record, mirrored into the session store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub token: String,
    #[serde(default)]
    pub user: Option<UserIdentity>,
    #[serde(default)]
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    pub fn new(token: impl Into<String>, user: Option<UserIdentity>) -> Self {
        Self {
            token: token.into(),
            user,
            logged_in_at: Some(Utc::now()),
        }
    }

    /// Build a session from a successful login response.
    ///
    /// Returns `None` unless the backend reported success *and* handed out a
    /// non-empty token. When the response omits the username the login e-mail
    /// stands in for it.
    pub fn from_login(response: &LoginResponse, login_email: &str) -> Option<Self> {
        if !response.success {
            return None;
        }
        let token = response.token.as_deref().filter(|t| !t.trim().is_empty())?;
        let name = response
            .username
            .clone()
            .unwrap_or_else(|| login_email.trim().to_string());
        Some(Self::new(
            token,
            Some(UserIdentity {
                name,
                role: response.role.clone(),
            }),
        ))
    }
}

impl core::fmt::Debug for StoredSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StoredSession")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .field("logged_in_at", &self.logged_in_at)
            .finish()
    }
}

/// Read-only view of the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub user: Option<UserIdentity>,
    pub is_authenticated: bool,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    pub fn anonymous() -> Self {
        Self {
            token: None,
            user: None,
            is_authenticated: false,
            logged_in_at: None,
        }
    }

    pub fn from_session(session: Option<&StoredSession>) -> Self {
        match session {
            Some(s) => Self {
                token: Some(s.token.clone()),
                user: s.user.clone(),
                is_authenticated: true,
                logged_in_at: s.logged_in_at,
            },
            None => Self::anonymous(),
        }
    }
}

/// Session lifecycle notifications published by [`AuthState`](crate::AuthState).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Initial state was read back from the store.
    Restored { authenticated: bool },
    /// This context logged in.
    LoggedIn { user: Option<UserIdentity> },
    /// This context logged out.
    LoggedOut,
    /// Another context removed the session.
    Invalidated,
    /// Another context stored a session different from the one held here.
    Replaced { user: Option<UserIdentity> },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(success: bool, token: Option<&str>) -> LoginResponse {
        LoginResponse {
            success,
            token: token.map(str::to_string),
            username: Some("admin@isp.com".to_string()),
            role: Some(Role::ADMIN),
            message: None,
        }
    }

    #[test]
    fn successful_login_with_token_builds_session() {
        let session = StoredSession::from_login(&response(true, Some("jwt")), "x@y.z").unwrap();
        assert_eq!(session.token, "jwt");
        let user = session.user.unwrap();
        assert_eq!(user.name, "admin@isp.com");
        assert_eq!(user.role, Some(Role::ADMIN));
        assert!(session.logged_in_at.is_some());
    }

    #[test]
    fn failure_or_blank_token_builds_nothing() {
        assert!(StoredSession::from_login(&response(false, Some("jwt")), "x@y.z").is_none());
        assert!(StoredSession::from_login(&response(true, None), "x@y.z").is_none());
        assert!(StoredSession::from_login(&response(true, Some("  ")), "x@y.z").is_none());
    }

    #[test]
    fn missing_username_falls_back_to_login_email() {
        let mut resp = response(true, Some("jwt"));
        resp.username = None;
        let session = StoredSession::from_login(&resp, " ops@isp.com ").unwrap();
        assert_eq!(session.user.unwrap().name, "ops@isp.com");
    }

    #[test]
    fn stored_session_accepts_username_key() {
        let session: StoredSession = serde_json::from_str(
            r#"{"token":"t","user":{"username":"admin@isp.com","role":"ADMIN"}}"#,
        )
        .unwrap();
        assert_eq!(session.user.unwrap().name, "admin@isp.com");
        assert!(session.logged_in_at.is_none());
    }

    #[test]
    fn snapshot_never_serializes_token() {
        let session = StoredSession::new("secret-token", None);
        let snapshot = SessionSnapshot::from_session(Some(&session));
        assert!(snapshot.is_authenticated);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(!json.contains("secret-token"));
        assert!(!format!("{session:?}").contains("secret-token"));
    }
}
