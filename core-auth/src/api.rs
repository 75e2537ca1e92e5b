//! QR login endpoints
//!
//! Three calls make up a login: `login/qr/key` hands out a key,
//! `login/qr/create` turns it into a QR URL, and `login/qr/check` reports
//! what the phone has done with it.

use crate::error::{AuthError, Result};
use crate::session::SessionStore;
use crate::types::{QrCheck, QrStatus, QrTicket};
use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpRequest};
use bridge_traits::time::Clock;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

const SUCCESS_CODE: i64 = 200;

/// Remote side of the QR login flow.
#[async_trait]
pub trait QrLoginApi: Send + Sync {
    /// Request a fresh login key.
    async fn generate_key(&self) -> Result<String>;

    /// Create the QR ticket for `key`.
    async fn create_qr(&self, key: &str) -> Result<QrTicket>;

    /// Poll the scan status of `key`.
    async fn check(&self, key: &str) -> Result<QrCheck>;
}

#[derive(Debug, Deserialize)]
struct QrKeyDto {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<QrKeyInfoDto>,
}

#[derive(Debug, Deserialize)]
struct QrKeyInfoDto {
    #[serde(default)]
    code: i64,
    #[serde(default, rename = "unikey")]
    uni_key: String,
}

#[derive(Debug, Deserialize)]
struct QrCreateDto {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<QrCreateInfoDto>,
}

#[derive(Debug, Deserialize)]
struct QrCreateInfoDto {
    #[serde(default, rename = "qrurl")]
    qr_url: String,
}

#[derive(Deserialize)]
struct QrStatusDto {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    nickname: String,
    #[serde(default, rename = "avatarUrl")]
    avatar_url: String,
    #[serde(default)]
    cookie: String,
}

impl From<QrStatusDto> for QrCheck {
    fn from(dto: QrStatusDto) -> Self {
        let status = QrStatus::from_code(dto.code);
        let message = status
            .default_message()
            .map(str::to_string)
            .or(dto.message)
            .unwrap_or_else(|| "Unknown error".to_string());
        QrCheck {
            status,
            message,
            nickname: non_empty(dto.nickname),
            avatar_url: non_empty(dto.avatar_url),
            cookie: dto.cookie,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// [`QrLoginApi`] over the host [`HttpClient`].
///
/// Every request carries a `timeStamp` query parameter so intermediaries
/// never serve a cached status, plus the stored session cookie.
pub struct HttpQrLoginApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
    clock: Arc<dyn Clock>,
    session: SessionStore,
}

impl HttpQrLoginApi {
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        clock: Arc<dyn Clock>,
        session: SessionStore,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            clock,
            session,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let mut request = HttpRequest::get(format!("{}/{}", self.base_url, path));
        for (key, value) in query {
            request = request.query(key, value);
        }
        let request = request
            .query("timeStamp", self.clock.unix_timestamp_millis().to_string())
            .header("Cookie", self.session.cookie_header().await);

        debug!(path, "Sending login request");
        let response = self.http.execute(request).await?.error_for_status()?;
        Ok(response.json()?)
    }
}

#[async_trait]
impl QrLoginApi for HttpQrLoginApi {
    #[instrument(skip(self))]
    async fn generate_key(&self) -> Result<String> {
        let dto: QrKeyDto = self.get("login/qr/key", &[]).await?;
        if dto.code != SUCCESS_CODE {
            return Err(AuthError::Remote(
                dto.message
                    .unwrap_or_else(|| format!("login/qr/key returned code {}", dto.code)),
            ));
        }
        match dto.data {
            Some(data) if data.code == SUCCESS_CODE && !data.uni_key.is_empty() => {
                Ok(data.uni_key)
            }
            Some(data) => Err(AuthError::KeyRejected(data.code)),
            None => Err(AuthError::KeyRejected(dto.code)),
        }
    }

    #[instrument(skip(self, key))]
    async fn create_qr(&self, key: &str) -> Result<QrTicket> {
        let dto: QrCreateDto = self.get("login/qr/create", &[("key", key)]).await?;
        if dto.code != SUCCESS_CODE {
            return Err(AuthError::Remote(
                dto.message
                    .unwrap_or_else(|| "QR code creation failed".to_string()),
            ));
        }
        let qr_url = dto.data.map(|d| d.qr_url).unwrap_or_default();
        Ok(QrTicket::new(key, qr_url))
    }

    #[instrument(skip(self, key))]
    async fn check(&self, key: &str) -> Result<QrCheck> {
        let dto: QrStatusDto = self.get("login/qr/check", &[("key", key)]).await?;
        Ok(dto.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::SqliteSettingsStore;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpResponse, RetryPolicy};
    use bridge_traits::time::FixedClock;
    use bytes::Bytes;
    use mockall::mock;
    use std::collections::HashMap;

    mock! {
        pub Http {}

        #[async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
            async fn execute_with_retry(
                &self,
                request: HttpRequest,
                policy: RetryPolicy,
            ) -> BridgeResult<HttpResponse>;
            async fn is_connected(&self) -> bool;
        }
    }

    fn json(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    async fn api(http: MockHttp) -> HttpQrLoginApi {
        let settings = Arc::new(SqliteSettingsStore::in_memory().await.unwrap());
        let session = SessionStore::new(settings);
        session.set_session_cookie("MUSIC_U=abc").await.unwrap();
        HttpQrLoginApi::new(
            Arc::new(http),
            "https://music.example.com/",
            Arc::new(FixedClock::from_millis(1_700_000_000_000)),
            session,
        )
    }

    #[tokio::test]
    async fn test_generate_key_sends_timestamp_and_cookie() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| {
                req.url == "https://music.example.com/login/qr/key?timeStamp=1700000000000"
                    && req.headers.get("Cookie").map(String::as_str) == Some("MUSIC_U=abc")
            })
            .returning(|_| Ok(json(200, r#"{"code":200,"data":{"code":200,"unikey":"k-1"}}"#)));

        let key = api(http).await.generate_key().await.unwrap();
        assert_eq!(key, "k-1");
    }

    #[tokio::test]
    async fn test_generate_key_rejected() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json(200, r#"{"code":200,"data":{"code":502,"unikey":""}}"#)));

        let result = api(http).await.generate_key().await;
        assert!(matches!(result, Err(AuthError::KeyRejected(502))));
    }

    #[tokio::test]
    async fn test_create_qr() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .withf(|req| req.url.contains("login/qr/create?key=k-1&timeStamp="))
            .returning(|_| {
                Ok(json(
                    200,
                    r#"{"code":200,"data":{"qrurl":"https://music.example.com/login?codekey=k-1","qrimg":""}}"#,
                ))
            });

        let ticket = api(http).await.create_qr("k-1").await.unwrap();
        assert_eq!(ticket.key, "k-1");
        assert_eq!(ticket.qr_url, "https://music.example.com/login?codekey=k-1");
    }

    #[tokio::test]
    async fn test_create_qr_failure() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json(200, r#"{"code":400,"message":"bad key"}"#)));

        let result = api(http).await.create_qr("k-1").await;
        assert!(matches!(result, Err(AuthError::Remote(msg)) if msg == "bad key"));
    }

    #[tokio::test]
    async fn test_check_maps_status_body() {
        let mut http = MockHttp::new();
        http.expect_execute().returning(|_| {
            Ok(json(
                200,
                r#"{"code":803,"message":"ok","nickname":"listener","avatarUrl":"https://p1.example.com/a.jpg","cookie":"MUSIC_U=new"}"#,
            ))
        });

        let check = api(http).await.check("k-1").await.unwrap();
        assert_eq!(check.status, QrStatus::Authorized);
        assert_eq!(check.message, "Sign-in authorized");
        assert_eq!(check.nickname.as_deref(), Some("listener"));
        assert_eq!(check.cookie, "MUSIC_U=new");
    }

    #[tokio::test]
    async fn test_check_unknown_status_keeps_server_message() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json(200, r#"{"code":8821,"message":"risky login"}"#)));

        let check = api(http).await.check("k-1").await.unwrap();
        assert_eq!(check.status, QrStatus::Other(8821));
        assert_eq!(check.message, "risky login");
        assert_eq!(check.nickname, None);
    }

    #[tokio::test]
    async fn test_http_error_is_remote() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .returning(|_| Ok(json(502, "bad gateway")));

        let result = api(http).await.check("k-1").await;
        assert!(matches!(result, Err(AuthError::Remote(_))));
    }
}
