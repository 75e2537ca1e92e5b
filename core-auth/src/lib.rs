//! # Authentication Module
//!
//! QR-code login and the persisted login session.
//!
//! ## Overview
//!
//! Signing in never involves a password on this device. The core asks the
//! login service for a QR code, the user scans it with the mobile app, and
//! the core polls until the scan is confirmed. The resulting session cookie
//! is stored in the host settings store and attached to every later request.
//!
//! ## Features
//!
//! - QR ticket generation and status polling ([`QrLoginFlow`])
//! - Automatic regeneration of expired codes, bounded poll count
//! - Cooperative cancellation through `CancellationToken`
//! - Typed session storage with atomic login writes ([`SessionStore`])
//! - Auth state event emission

pub mod api;
pub mod error;
pub mod qr;
pub mod session;
pub mod types;

pub use api::{HttpQrLoginApi, QrLoginApi};
pub use error::{AuthError, Result};
pub use qr::{sign_out, QrLoginFlow};
pub use session::SessionStore;
pub use types::{LoginProfile, QrCheck, QrStatus, QrTicket};
