use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// The login service could not be reached or answered with an error.
    #[error("Login request failed: {0}")]
    Remote(String),

    #[error("QR code expired {regenerations} times without being confirmed")]
    QrExpired { regenerations: u32 },

    #[error("QR login not confirmed after {polls} status checks")]
    LoginTimedOut { polls: u32 },

    #[error("QR login cancelled")]
    Cancelled,

    #[error("Session storage failed: {0}")]
    Settings(String),

    /// `login/qr/key` answered, but without a usable key.
    #[error("QR key request rejected with code {0}")]
    KeyRejected(i64),
}

impl From<BridgeError> for AuthError {
    fn from(err: BridgeError) -> Self {
        AuthError::Remote(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
