//! Transport status, active mode, and connection statistics.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Lifecycle state of the persistent channel connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    /// Never connected in this subscription.
    Idle,
    /// Establishment in flight.
    Connecting,
    /// Ready to send and receive.
    Open,
    /// Closed, on purpose or by the remote.
    Closed,
    /// Waiting out the backoff before another attempt.
    Reconnecting,
    /// Attempt budget exhausted; terminal for this connection sequence.
    Failed,
}

impl TransportStatus {
    /// External 1:1 mapping used by display surfaces.
    pub fn display(self) -> DisplayStatus {
        match self {
            TransportStatus::Idle => DisplayStatus::Unknown,
            TransportStatus::Connecting => DisplayStatus::Connecting,
            TransportStatus::Open => DisplayStatus::Connected,
            TransportStatus::Closed => DisplayStatus::Disconnected,
            TransportStatus::Reconnecting => DisplayStatus::Reconnecting,
            TransportStatus::Failed => DisplayStatus::Error,
        }
    }
}

/// What a consumer shows for the channel, nothing more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Connecting,
    Connected,
    Reconnecting,
    Disconnected,
    Error,
    Unknown,
}

impl fmt::Display for DisplayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DisplayStatus::Connecting => "connecting",
            DisplayStatus::Connected => "connected",
            DisplayStatus::Reconnecting => "reconnecting",
            DisplayStatus::Disconnected => "disconnected",
            DisplayStatus::Error => "error",
            DisplayStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Which of push/pull is the live data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActiveMode {
    /// Persistent channel, server-initiated delivery.
    #[default]
    Push,
    /// Periodic client-initiated fetches.
    Pull,
}

impl ActiveMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveMode::Push => "push",
            ActiveMode::Pull => "pull",
        }
    }
}

impl fmt::Display for ActiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("mode must be \"push\" or \"pull\"")]
pub struct ParseModeError;

impl FromStr for ActiveMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "push" => Ok(ActiveMode::Push),
            "pull" => Ok(ActiveMode::Pull),
            _ => Err(ParseModeError),
        }
    }
}

/// Non-authoritative counters describing the channel connection. Preserved
/// across transient reconnects; reset only on manual disconnect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionStats {
    pub connect_time: Option<DateTime<Utc>>,
    /// Successful reconnects since the subscription started.
    pub reconnect_count: u32,
    /// Every inbound text frame, pongs included.
    pub message_count: u64,
    pub last_message_time: Option<DateTime<Utc>>,
}

/// Atomic cell for [`TransportStatus`], shared between tasks.
#[derive(Debug)]
pub(crate) struct AtomicStatus(AtomicU8);

impl AtomicStatus {
    pub(crate) const fn new(status: TransportStatus) -> Self {
        Self(AtomicU8::new(status as u8))
    }

    pub(crate) fn load(&self) -> TransportStatus {
        status_from_u8(self.0.load(Ordering::SeqCst))
    }

    /// Store a new status and return the previous one.
    pub(crate) fn swap(&self, status: TransportStatus) -> TransportStatus {
        status_from_u8(self.0.swap(status as u8, Ordering::SeqCst))
    }
}

fn status_from_u8(raw: u8) -> TransportStatus {
    match raw {
        0 => TransportStatus::Idle,
        1 => TransportStatus::Connecting,
        2 => TransportStatus::Open,
        3 => TransportStatus::Closed,
        4 => TransportStatus::Reconnecting,
        _ => TransportStatus::Failed,
    }
}

/// Atomic cell for [`ActiveMode`].
#[derive(Debug)]
pub(crate) struct AtomicMode(AtomicU8);

impl AtomicMode {
    pub(crate) const fn new(mode: ActiveMode) -> Self {
        Self(AtomicU8::new(mode as u8))
    }

    pub(crate) fn load(&self) -> ActiveMode {
        mode_from_u8(self.0.load(Ordering::SeqCst))
    }

    pub(crate) fn store(&self, mode: ActiveMode) {
        self.0.store(mode as u8, Ordering::SeqCst);
    }

    pub(crate) fn swap(&self, mode: ActiveMode) -> ActiveMode {
        mode_from_u8(self.0.swap(mode as u8, Ordering::SeqCst))
    }
}

fn mode_from_u8(raw: u8) -> ActiveMode {
    match raw {
        0 => ActiveMode::Push,
        _ => ActiveMode::Pull,
    }
}
