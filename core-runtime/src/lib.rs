//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every core crate:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! Playback, catalog and login crates depend on this one for their config
//! sections and for publishing [`events::CoreEvent`]s.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use config::{
    CatalogConfig, ChartFanoutPolicy, CoreConfig, CoreConfigBuilder, LoginConfig, PlaybackConfig,
};
pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
