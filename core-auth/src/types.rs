use serde::{Deserialize, Serialize};
use std::fmt;

/// A QR login ticket: the server-side key plus the URL to encode as a QR code.
///
/// # Examples
///
/// ```
/// use core_auth::QrTicket;
///
/// let ticket = QrTicket::new("f1b2", "https://music.example.com/login?codekey=f1b2");
/// assert_eq!(ticket.key, "f1b2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QrTicket {
    pub key: String,
    pub qr_url: String,
}

impl QrTicket {
    pub fn new(key: impl Into<String>, qr_url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            qr_url: qr_url.into(),
        }
    }
}

/// Scan status reported by `login/qr/check`.
///
/// The wire codes are 800..=803; anything else is carried through as
/// [`QrStatus::Other`] so an unexpected server answer does not abort polling.
///
/// # Examples
///
/// ```
/// use core_auth::QrStatus;
///
/// assert_eq!(QrStatus::from_code(803), QrStatus::Authorized);
/// assert_eq!(QrStatus::Waiting.code(), 801);
/// assert!(QrStatus::Authorized.is_terminal());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QrStatus {
    /// 800: the code timed out and must be regenerated
    Expired,
    /// 801: waiting for the mobile app to scan the code
    Waiting,
    /// 802: scanned, waiting for the user to confirm on the phone
    Scanned,
    /// 803: confirmed; the check response carries the session cookie
    Authorized,
    Other(u16),
}

impl QrStatus {
    pub fn from_code(code: i64) -> Self {
        match code {
            800 => QrStatus::Expired,
            801 => QrStatus::Waiting,
            802 => QrStatus::Scanned,
            803 => QrStatus::Authorized,
            other => QrStatus::Other(u16::try_from(other).unwrap_or(u16::MAX)),
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            QrStatus::Expired => 800,
            QrStatus::Waiting => 801,
            QrStatus::Scanned => 802,
            QrStatus::Authorized => 803,
            QrStatus::Other(code) => *code,
        }
    }

    /// Message shown next to the QR code. `Other` has none of its own and
    /// falls back to whatever the server sent.
    pub fn default_message(&self) -> Option<&'static str> {
        match self {
            QrStatus::Expired => Some("QR code expired"),
            QrStatus::Waiting => Some("Scan the QR code with the mobile app to sign in"),
            QrStatus::Scanned => Some("Scanned, waiting for confirmation"),
            QrStatus::Authorized => Some("Sign-in authorized"),
            QrStatus::Other(_) => None,
        }
    }

    /// Whether polling stops on this status without regenerating.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QrStatus::Authorized)
    }
}

impl fmt::Display for QrStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QrStatus::Expired => write!(f, "expired"),
            QrStatus::Waiting => write!(f, "waiting"),
            QrStatus::Scanned => write!(f, "scanned"),
            QrStatus::Authorized => write!(f, "authorized"),
            QrStatus::Other(code) => write!(f, "status-{}", code),
        }
    }
}

/// One answer from `login/qr/check`.
#[derive(Clone, PartialEq, Eq)]
pub struct QrCheck {
    pub status: QrStatus,
    pub message: String,
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
    /// Session cookie issued with the answer; empty until the server sets one.
    pub cookie: String,
}

// Manual Debug so the cookie never ends up in a log line.
impl fmt::Debug for QrCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QrCheck")
            .field("status", &self.status)
            .field("message", &self.message)
            .field("nickname", &self.nickname)
            .field("avatar_url", &self.avatar_url)
            .field("has_cookie", &!self.cookie.is_empty())
            .finish()
    }
}

/// The account that confirmed a QR login.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginProfile {
    pub nickname: Option<String>,
    pub avatar_url: Option<String>,
}

impl From<&QrCheck> for LoginProfile {
    fn from(check: &QrCheck) -> Self {
        Self {
            nickname: check.nickname.clone(),
            avatar_url: check.avatar_url.clone(),
        }
    }
}
