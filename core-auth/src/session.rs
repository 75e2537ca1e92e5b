//! Persisted login session
//!
//! The login flag and the session cookie live in the host settings store
//! under `user.is_login` and `user.cookie`. Every outgoing catalog and login
//! request reads the cookie from here.

use crate::error::{AuthError, Result};
use bridge_traits::storage::SettingsStore;
use core_runtime::logging::redact_if_sensitive;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const KEY_IS_LOGIN: &str = "user.is_login";
pub const KEY_COOKIE: &str = "user.cookie";

/// Typed view over the login keys of a [`SettingsStore`].
///
/// Cookie values are never logged.
#[derive(Clone)]
pub struct SessionStore {
    settings: Arc<dyn SettingsStore>,
}

impl SessionStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Missing flag reads as signed out.
    pub async fn is_logged_in(&self) -> Result<bool> {
        let value = self
            .settings
            .get_bool(KEY_IS_LOGIN)
            .await
            .map_err(settings_error)?;
        Ok(value.unwrap_or(false))
    }

    pub async fn set_logged_in(&self, logged_in: bool) -> Result<()> {
        self.settings
            .set_bool(KEY_IS_LOGIN, logged_in)
            .await
            .map_err(settings_error)
    }

    /// The stored cookie, or `None` when nothing (or an empty string) is stored.
    pub async fn session_cookie(&self) -> Result<Option<String>> {
        let cookie = self
            .settings
            .get_string(KEY_COOKIE)
            .await
            .map_err(settings_error)?;
        Ok(cookie.filter(|c| !c.is_empty()))
    }

    pub async fn set_session_cookie(&self, cookie: &str) -> Result<()> {
        debug!(
            cookie = %redact_if_sensitive(KEY_COOKIE, cookie),
            "Persisting session cookie"
        );
        self.settings
            .set_string(KEY_COOKIE, cookie)
            .await
            .map_err(settings_error)
    }

    /// Cookie header value for outgoing requests; empty when signed out.
    ///
    /// A storage failure degrades to an anonymous request.
    pub async fn cookie_header(&self) -> String {
        match self.session_cookie().await {
            Ok(cookie) => cookie.unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to read session cookie, sending request without it");
                String::new()
            }
        }
    }

    /// Store the cookie and the login flag together.
    ///
    /// Both keys are written in one transaction, so a reader never sees the
    /// flag without the cookie that goes with it.
    pub async fn save_login(&self, cookie: &str) -> Result<()> {
        let mut tx = self
            .settings
            .begin_transaction()
            .await
            .map_err(settings_error)?;

        let written = async {
            tx.set_string(KEY_COOKIE, cookie).await?;
            tx.set_bool(KEY_IS_LOGIN, true).await
        }
        .await;

        match written {
            Ok(()) => {
                tx.commit().await.map_err(settings_error)?;
                info!("Login session saved");
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "Rollback of login session failed");
                }
                Err(settings_error(e))
            }
        }
    }

    /// Forget the cookie and the login flag.
    pub async fn clear(&self) -> Result<()> {
        let mut tx = self
            .settings
            .begin_transaction()
            .await
            .map_err(settings_error)?;
        tx.delete(KEY_COOKIE).await.map_err(settings_error)?;
        tx.set_bool(KEY_IS_LOGIN, false)
            .await
            .map_err(settings_error)?;
        tx.commit().await.map_err(settings_error)?;
        info!("Login session cleared");
        Ok(())
    }
}

fn settings_error(err: bridge_traits::BridgeError) -> AuthError {
    AuthError::Settings(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::SqliteSettingsStore;

    async fn store() -> SessionStore {
        let settings = SqliteSettingsStore::in_memory().await.unwrap();
        SessionStore::new(Arc::new(settings))
    }

    #[tokio::test]
    async fn test_defaults_to_signed_out() {
        let session = store().await;
        assert!(!session.is_logged_in().await.unwrap());
        assert_eq!(session.session_cookie().await.unwrap(), None);
        assert_eq!(session.cookie_header().await, "");
    }

    #[tokio::test]
    async fn test_cookie_round_trip() {
        let session = store().await;
        session.set_session_cookie("MUSIC_U=abc").await.unwrap();
        assert_eq!(
            session.session_cookie().await.unwrap().as_deref(),
            Some("MUSIC_U=abc")
        );
        assert_eq!(session.cookie_header().await, "MUSIC_U=abc");
    }

    #[tokio::test]
    async fn test_empty_cookie_reads_as_none() {
        let session = store().await;
        session.set_session_cookie("").await.unwrap();
        assert_eq!(session.session_cookie().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_login_writes_both_keys() {
        let session = store().await;
        session.save_login("MUSIC_U=xyz").await.unwrap();

        assert!(session.is_logged_in().await.unwrap());
        assert_eq!(
            session.session_cookie().await.unwrap().as_deref(),
            Some("MUSIC_U=xyz")
        );
    }

    #[tokio::test]
    async fn test_clear_signs_out() {
        let session = store().await;
        session.save_login("MUSIC_U=xyz").await.unwrap();
        session.clear().await.unwrap();

        assert!(!session.is_logged_in().await.unwrap());
        assert_eq!(session.session_cookie().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_set_logged_in_flag() {
        let session = store().await;
        session.set_logged_in(true).await.unwrap();
        assert!(session.is_logged_in().await.unwrap());
        session.set_logged_in(false).await.unwrap();
        assert!(!session.is_logged_in().await.unwrap());
    }
}
