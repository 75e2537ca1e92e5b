//! Async runtime facade for the music client core.
//!
//! Every core crate spawns tasks, sleeps, and builds channels through this
//! crate instead of naming Tokio directly. That keeps the executor choice in
//! one place and gives tests a single attribute macro.
//!
//! # Modules
//!
//! - `task`: task spawning and join handles
//! - `time`: sleep, timeouts, intervals
//! - `sync`: channels, locks, and [`sync::CancellationToken`]
//! - `runtime`: blocking entry points used by the attribute macros
//!
//! # Examples
//!
//! ```rust
//! use core_async::task;
//! use core_async::time::{sleep, Duration};
//!
//! async fn example() {
//!     let handle = task::spawn(async {
//!         sleep(Duration::from_millis(10)).await;
//!         42
//!     });
//!     assert_eq!(handle.await.unwrap(), 42);
//! }
//! ```

pub use core_async_macros::{main, test};

pub mod runtime;
pub mod sync;
pub mod task;
pub mod time;

pub use task::spawn;
/// Race several futures, running the branch of the first to finish.
pub use tokio::select;
pub use time::{sleep, Duration, Instant};
