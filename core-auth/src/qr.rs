//! QR Code Login Flow
//!
//! Drives one sign-in attempt from key generation to a stored session:
//!
//! 1. Request a key and a QR ticket, emit [`AuthEvent::QrReady`].
//! 2. Poll `login/qr/check` every `poll_interval`, persisting the cookie
//!    from each answer.
//! 3. On `Expired`, issue a new ticket (at most `max_regenerations` times).
//! 4. On `Authorized`, save cookie and login flag atomically and emit
//!    [`AuthEvent::SignedIn`].
//!
//! The loop is bounded by `max_polls` and stops as soon as the caller's
//! [`CancellationToken`] fires.
//!
//! ## Example
//!
//! ```ignore
//! use core_auth::{QrLoginFlow, SessionStore};
//! use core_async::sync::CancellationToken;
//!
//! let flow = QrLoginFlow::new(api, session, events, config.login.clone());
//! let cancel = CancellationToken::new();
//! let profile = flow.run(cancel.clone()).await?;
//! println!("signed in as {:?}", profile.nickname);
//! ```

use crate::api::QrLoginApi;
use crate::error::{AuthError, Result};
use crate::session::SessionStore;
use crate::types::{LoginProfile, QrCheck, QrStatus, QrTicket};
use core_async::sync::CancellationToken;
use core_async::time::sleep;
use core_runtime::config::LoginConfig;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One QR login attempt.
pub struct QrLoginFlow {
    api: Arc<dyn QrLoginApi>,
    session: SessionStore,
    events: EventBus,
    config: LoginConfig,
}

impl QrLoginFlow {
    pub fn new(
        api: Arc<dyn QrLoginApi>,
        session: SessionStore,
        events: EventBus,
        config: LoginConfig,
    ) -> Self {
        Self {
            api,
            session,
            events,
            config,
        }
    }

    /// Run the flow until the login is confirmed, fails, or is cancelled.
    ///
    /// Transient check failures are reported as recoverable
    /// [`AuthEvent::AuthError`]s and polling continues.
    #[instrument(skip(self, cancel))]
    pub async fn run(&self, cancel: CancellationToken) -> Result<LoginProfile> {
        let result = self.poll_until_done(&cancel).await;
        if let Err(e) = &result {
            if !matches!(e, AuthError::Cancelled) {
                self.emit(AuthEvent::AuthError {
                    message: e.to_string(),
                    recoverable: matches!(
                        e,
                        AuthError::QrExpired { .. }
                            | AuthError::LoginTimedOut { .. }
                            | AuthError::Remote(_)
                    ),
                });
            }
        }
        result
    }

    async fn poll_until_done(&self, cancel: &CancellationToken) -> Result<LoginProfile> {
        let mut ticket = self.issue_ticket(cancel).await?;
        let mut regenerations = 0u32;
        let mut last_seen: Option<(QrStatus, Option<String>)> = None;

        for poll in 1..=self.config.max_polls {
            core_async::select! {
                _ = cancel.cancelled() => {
                    info!("QR login cancelled");
                    return Err(AuthError::Cancelled);
                }
                _ = sleep(self.config.poll_interval) => {}
            }

            let check = match self.api.check(&ticket.key).await {
                Ok(check) => check,
                Err(e) => {
                    warn!(poll, error = %e, "QR status check failed");
                    self.emit(AuthEvent::AuthError {
                        message: e.to_string(),
                        recoverable: true,
                    });
                    continue;
                }
            };
            debug!(poll, status = %check.status, "QR status checked");

            if !check.cookie.is_empty() {
                self.session.set_session_cookie(&check.cookie).await?;
            }

            let seen = (check.status, check.nickname.clone());
            if last_seen.as_ref() != Some(&seen) {
                self.emit_status(&check);
                last_seen = Some(seen);
            }

            match check.status {
                QrStatus::Authorized => return self.complete(&check).await,
                QrStatus::Expired => {
                    regenerations += 1;
                    if regenerations > self.config.max_regenerations {
                        warn!(regenerations, "QR code expired too often, giving up");
                        return Err(AuthError::QrExpired {
                            regenerations: self.config.max_regenerations,
                        });
                    }
                    info!(regenerations, "QR code expired, issuing a new one");
                    ticket = self.issue_ticket(cancel).await?;
                    last_seen = None;
                }
                QrStatus::Waiting | QrStatus::Scanned | QrStatus::Other(_) => {}
            }
        }

        warn!(polls = self.config.max_polls, "QR login not confirmed in time");
        Err(AuthError::LoginTimedOut {
            polls: self.config.max_polls,
        })
    }

    async fn issue_ticket(&self, cancel: &CancellationToken) -> Result<QrTicket> {
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        let key = self.api.generate_key().await?;
        let ticket = self.api.create_qr(&key).await?;
        self.emit(AuthEvent::QrReady {
            key: ticket.key.clone(),
            qr_url: ticket.qr_url.clone(),
        });
        Ok(ticket)
    }

    async fn complete(&self, check: &QrCheck) -> Result<LoginProfile> {
        self.session.save_login(&check.cookie).await?;
        let profile = LoginProfile::from(check);
        info!(nickname = ?profile.nickname, "QR login confirmed");
        self.emit(AuthEvent::SignedIn {
            nickname: profile.nickname.clone(),
            avatar_url: profile.avatar_url.clone(),
        });
        Ok(profile)
    }

    fn emit_status(&self, check: &QrCheck) {
        self.emit(AuthEvent::QrStatusChanged {
            status: check.status.code(),
            message: check.message.clone(),
            nickname: check.nickname.clone(),
        });
    }

    fn emit(&self, event: AuthEvent) {
        // No subscribers is fine; the flow result still reaches the caller.
        let _ = self.events.emit(CoreEvent::Auth(event));
    }
}

/// Sign out: forget the stored session and announce it.
pub async fn sign_out(session: &SessionStore, events: &EventBus) -> Result<()> {
    session.clear().await?;
    let _ = events.emit(CoreEvent::Auth(AuthEvent::SignedOut));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_desktop::SqliteSettingsStore;
    use core_async::time::Duration;
    use mockall::{mock, Sequence};

    mock! {
        pub Api {}

        #[async_trait]
        impl QrLoginApi for Api {
            async fn generate_key(&self) -> Result<String>;
            async fn create_qr(&self, key: &str) -> Result<QrTicket>;
            async fn check(&self, key: &str) -> Result<QrCheck>;
        }
    }

    fn check(status: QrStatus, nickname: Option<&str>, cookie: &str) -> QrCheck {
        QrCheck {
            status,
            message: status.default_message().unwrap_or("").to_string(),
            nickname: nickname.map(str::to_string),
            avatar_url: None,
            cookie: cookie.to_string(),
        }
    }

    fn fast_config() -> LoginConfig {
        LoginConfig {
            poll_interval: Duration::from_millis(1),
            max_polls: 10,
            max_regenerations: 1,
        }
    }

    fn expect_tickets(api: &mut MockApi) {
        let mut counter = 0;
        api.expect_generate_key().returning(move || {
            counter += 1;
            Ok(format!("key-{}", counter))
        });
        api.expect_create_qr()
            .returning(|key| Ok(QrTicket::new(key, format!("https://qr.example.com/{}", key))));
    }

    async fn session() -> SessionStore {
        let settings = SqliteSettingsStore::in_memory().await.unwrap();
        SessionStore::new(Arc::new(settings))
    }

    fn drain(stream: &mut core_runtime::events::EventStream) -> Vec<AuthEvent> {
        let mut out = Vec::new();
        while let Some(Ok(event)) = stream.try_recv() {
            if let CoreEvent::Auth(auth) = event {
                out.push(auth);
            }
        }
        out
    }

    #[tokio::test]
    async fn test_login_success_saves_session() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        let mut seq = Sequence::new();
        api.expect_check()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Ok(check(QrStatus::Waiting, None, "")));
        api.expect_check()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(check(QrStatus::Scanned, Some("listener"), "")));
        api.expect_check()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(check(QrStatus::Authorized, Some("listener"), "MUSIC_U=ok")));

        let events = EventBus::new(64);
        let mut stream = core_runtime::events::EventStream::new(events.subscribe());
        let session = session().await;
        let flow = QrLoginFlow::new(Arc::new(api), session.clone(), events, fast_config());

        let profile = flow.run(CancellationToken::new()).await.unwrap();

        assert_eq!(profile.nickname.as_deref(), Some("listener"));
        assert!(session.is_logged_in().await.unwrap());
        assert_eq!(
            session.session_cookie().await.unwrap().as_deref(),
            Some("MUSIC_U=ok")
        );

        let events = drain(&mut stream);
        assert!(matches!(events.first(), Some(AuthEvent::QrReady { key, .. }) if key == "key-1"));
        let statuses: Vec<u16> = events
            .iter()
            .filter_map(|e| match e {
                AuthEvent::QrStatusChanged { status, .. } => Some(*status),
                _ => None,
            })
            .collect();
        // Repeated 801 answers are reported once.
        assert_eq!(statuses, vec![801, 802, 803]);
        assert!(matches!(events.last(), Some(AuthEvent::SignedIn { .. })));
    }

    #[tokio::test]
    async fn test_expired_code_is_regenerated() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        let mut seq = Sequence::new();
        api.expect_check()
            .withf(|key| key == "key-1")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(check(QrStatus::Expired, None, "")));
        api.expect_check()
            .withf(|key| key == "key-2")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(check(QrStatus::Authorized, None, "MUSIC_U=2")));

        let events = EventBus::new(64);
        let mut stream = core_runtime::events::EventStream::new(events.subscribe());
        let flow = QrLoginFlow::new(Arc::new(api), session().await, events, fast_config());

        flow.run(CancellationToken::new()).await.unwrap();

        let ready = drain(&mut stream)
            .into_iter()
            .filter(|e| matches!(e, AuthEvent::QrReady { .. }))
            .count();
        assert_eq!(ready, 2);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_regenerations() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        api.expect_check()
            .returning(|_| Ok(check(QrStatus::Expired, None, "")));

        let flow = QrLoginFlow::new(
            Arc::new(api),
            session().await,
            EventBus::new(64),
            fast_config(),
        );

        let result = flow.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(AuthError::QrExpired { regenerations: 1 })));
    }

    #[tokio::test]
    async fn test_times_out_after_max_polls() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        api.expect_check()
            .times(10)
            .returning(|_| Ok(check(QrStatus::Waiting, None, "")));

        let events = EventBus::new(64);
        let mut stream = core_runtime::events::EventStream::new(events.subscribe());
        let flow = QrLoginFlow::new(Arc::new(api), session().await, events, fast_config());

        let result = flow.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(AuthError::LoginTimedOut { polls: 10 })));
        assert!(matches!(
            drain(&mut stream).last(),
            Some(AuthEvent::AuthError { recoverable: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_check_errors_keep_polling() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        let mut seq = Sequence::new();
        api.expect_check()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(AuthError::Remote("connection reset".to_string())));
        api.expect_check()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(check(QrStatus::Authorized, None, "MUSIC_U=ok")));

        let flow = QrLoginFlow::new(
            Arc::new(api),
            session().await,
            EventBus::new(64),
            fast_config(),
        );

        assert!(flow.run(CancellationToken::new()).await.is_ok());
    }

    #[tokio::test]
    async fn test_cookie_persisted_before_confirmation() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        api.expect_check()
            .returning(|_| Ok(check(QrStatus::Scanned, None, "MUSIC_U=partial")));

        let session = session().await;
        let mut config = fast_config();
        config.max_polls = 2;
        let flow = QrLoginFlow::new(Arc::new(api), session.clone(), EventBus::new(64), config);

        let result = flow.run(CancellationToken::new()).await;
        assert!(matches!(result, Err(AuthError::LoginTimedOut { .. })));
        assert_eq!(
            session.session_cookie().await.unwrap().as_deref(),
            Some("MUSIC_U=partial")
        );
        assert!(!session.is_logged_in().await.unwrap());
    }

    #[tokio::test]
    async fn test_cancellation_stops_polling() {
        let mut api = MockApi::new();
        expect_tickets(&mut api);
        api.expect_check()
            .returning(|_| Ok(check(QrStatus::Waiting, None, "")));

        let mut config = fast_config();
        config.poll_interval = Duration::from_secs(30);
        let flow = QrLoginFlow::new(Arc::new(api), session().await, EventBus::new(64), config);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        core_async::spawn(async move {
            sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = flow.run(cancel).await;
        assert!(matches!(result, Err(AuthError::Cancelled)));
    }

    #[tokio::test]
    async fn test_sign_out_clears_session() {
        let session = session().await;
        session.save_login("MUSIC_U=ok").await.unwrap();
        let events = EventBus::new(8);
        let mut rx = events.subscribe();

        sign_out(&session, &events).await.unwrap();

        assert!(!session.is_logged_in().await.unwrap());
        assert!(matches!(
            rx.try_recv(),
            Ok(CoreEvent::Auth(AuthEvent::SignedOut))
        ));
    }
}
