//! Resilient client for a server-status feed.
//!
//! One logical subscription to a backend's server-telemetry snapshots,
//! delivered over a persistent WebSocket channel when possible and over
//! periodic HTTP polling when not. The coordinator keeps exactly one source
//! live, fails over from push to pull when the channel's reconnect budget
//! runs out, and hands every snapshot batch to the same listeners no matter
//! which transport produced it.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use fleetfeed::modes::MemoryModeStore;
//! use fleetfeed::report::LogSink;
//! use fleetfeed::{FeedConfig, FeedCoordinator};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FeedConfig::new("http://127.0.0.1:8080".parse()?);
//! let coordinator = FeedCoordinator::new(
//!     config,
//!     Arc::new(MemoryModeStore::default()),
//!     Arc::new(LogSink),
//! )?;
//! coordinator.events().on_snapshots(|batch| println!("{} servers", batch.len()));
//! coordinator.initialize().await;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod coordinator;
pub mod events;
mod heartbeat;
pub mod modes;
pub mod poll;
pub mod protocol;
pub mod reconnect;
pub mod report;
pub mod status;
pub mod types;
pub mod ws;

pub use coordinator::{FeedConfig, FeedCoordinator};
pub use status::{ActiveMode, ConnectionStats, DisplayStatus, TransportStatus};
pub use types::ServerSnapshot;
