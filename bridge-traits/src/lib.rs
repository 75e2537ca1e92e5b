//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the streaming core and the host
//! application. Each trait is a capability the core requires but that must be
//! implemented differently per platform.
//!
//! ## Traits
//!
//! ### Playback
//! - [`MediaEngine`](engine::MediaEngine) - The audio engine the playback controller drives
//! - [`EngineEventStream`](engine::EngineEventStream) - Generation-stamped engine notifications
//!
//! ### Networking & Storage
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Capability     | Desktop default (`bridge-desktop`) | Mobile        |
//! |----------------|------------------------------------|---------------|
//! | `HttpClient`   | `ReqwestHttpClient`                | host-injected |
//! | `SettingsStore`| `SqliteSettingsStore`              | host-injected |
//! | `MediaEngine`  | none, always host-injected         | host-injected |
//!
//! The core fails fast with `core_runtime::Error::CapabilityMissing` when a required
//! capability has no implementation.
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Platform
//! implementations should convert their native errors into it and keep the
//! message actionable.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared behind `Arc`
//! across async tasks.

pub mod engine;
pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

pub use engine::{
    EngineEvent, EngineEventStream, EngineItem, EngineMode, EngineNotification, EngineRepeat,
    EngineState, MediaEngine, QueueGeneration,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{SettingsStore, SettingsTransaction};
pub use time::{Clock, ConsoleLogger, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
