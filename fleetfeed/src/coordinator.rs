//! Mode coordinator: owns the channel client and the poll loop, decides
//! which one is the live data source, and self-heals push → pull when the
//! channel fails for good.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::api::{FetchError, HttpFetcher, SnapshotFetcher};
use crate::events::FeedEvents;
use crate::modes::ModeStore;
use crate::poll::PollLoop;
use crate::reconnect::ReconnectPolicy;
use crate::report::ErrorSink;
use crate::status::{ActiveMode, AtomicMode, ConnectionStats, TransportStatus};
use crate::ws::{ChannelClient, ChannelConfig, ChannelError};

/// Everything needed to assemble a feed client against one backend.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// HTTP(S) base of the backend; the channel endpoint is derived from it.
    pub base_url: Url,
    pub heartbeat_interval: Duration,
    pub connect_timeout: Duration,
    pub reconnect: ReconnectPolicy,
    pub poll_period: Duration,
}

impl FeedConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            heartbeat_interval: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            poll_period: Duration::from_millis(2000),
        }
    }

    /// Derive the channel endpoint from the base: http→ws, https→wss, path
    /// `/ws-frontend`.
    pub fn channel_url(&self) -> Result<Url, CoordinatorError> {
        let mut url = self.base_url.join("/ws-frontend")?;
        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|()| CoordinatorError::BadBaseUrl)?;
        Ok(url)
    }
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("cannot derive endpoints from base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("base url must be http or https")]
    BadBaseUrl,
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// The orchestration core: exactly one of {channel open, poll loop running}
/// holds at any time after `initialize`, apart from the synchronous window
/// inside a switch.
pub struct FeedCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    mode: AtomicMode,
    channel: ChannelClient,
    poll: PollLoop,
    store: Arc<dyn ModeStore>,
    events: Arc<FeedEvents>,
}

impl FeedCoordinator {
    /// Assemble a coordinator with the default HTTP fetcher.
    pub fn new(
        config: FeedConfig,
        store: Arc<dyn ModeStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self, CoordinatorError> {
        let fetcher = Arc::new(HttpFetcher::new(&config.base_url)?);
        Self::with_fetcher(config, fetcher, store, sink)
    }

    /// Assemble with a custom fetcher; tests inject doubles here.
    pub fn with_fetcher(
        config: FeedConfig,
        fetcher: Arc<dyn SnapshotFetcher>,
        store: Arc<dyn ModeStore>,
        sink: Arc<dyn ErrorSink>,
    ) -> Result<Self, CoordinatorError> {
        let events = Arc::new(FeedEvents::new());
        let channel_config = ChannelConfig {
            url: config.channel_url()?,
            heartbeat_interval: config.heartbeat_interval,
            connect_timeout: config.connect_timeout,
            reconnect: config.reconnect.clone(),
        };
        let channel = ChannelClient::new(channel_config, Arc::clone(&events), Arc::clone(&sink));
        let poll = PollLoop::new(config.poll_period, fetcher, Arc::clone(&events), sink);

        let inner = Arc::new(CoordinatorInner {
            mode: AtomicMode::new(ActiveMode::Push),
            channel,
            poll,
            store,
            events,
        });

        // Self-healing: a terminally failed push transport switches us to
        // polling without operator action. This is the only automatic path.
        let weak = Arc::downgrade(&inner);
        inner.events.on_connection_change(move |status| {
            if status != TransportStatus::Failed {
                return;
            }
            if let Some(inner) = weak.upgrade() {
                if inner.mode.load() == ActiveMode::Push {
                    warn!("push channel failed for good; switching to pull mode");
                    inner.enter_pull_mode(false);
                }
            }
        });

        Ok(Self { inner })
    }

    /// The delivery sink. Register listeners here, ideally before
    /// `initialize`.
    pub fn events(&self) -> &FeedEvents {
        &self.inner.events
    }

    /// Current active mode.
    pub fn mode(&self) -> ActiveMode {
        self.inner.mode.load()
    }

    pub fn channel_status(&self) -> TransportStatus {
        self.inner.channel.status()
    }

    pub fn channel_stats(&self) -> ConnectionStats {
        self.inner.channel.stats()
    }

    pub fn is_polling(&self) -> bool {
        self.inner.poll.is_running()
    }

    /// Bring the feed up in the persisted (or default) mode. A push start
    /// that cannot open the channel falls back to pull, so the feed never
    /// comes up without a live source.
    pub async fn initialize(&self) {
        let mode = self.inner.store.get().unwrap_or_default();
        self.inner.mode.store(mode);
        match mode {
            ActiveMode::Push => match self.inner.channel.connect().await {
                Ok(()) => info!("feed initialized in push mode"),
                Err(e) => {
                    warn!(%e, "channel open failed at startup; falling back to pull");
                    self.inner.set_mode(ActiveMode::Pull);
                    self.inner.poll.fetch_once().await;
                    self.inner.poll.start(true);
                }
            },
            ActiveMode::Pull => {
                self.inner.poll.fetch_once().await;
                self.inner.poll.start(true);
                info!("feed initialized in pull mode");
            }
        }
    }

    /// Operator-initiated switch to pull mode.
    pub fn switch_to_pull(&self) {
        info!("switching to pull mode");
        self.inner.enter_pull_mode(false);
    }

    /// Operator-initiated switch to push mode. If the channel cannot be
    /// opened the feed stays in pull mode with the poll loop running —
    /// a switch attempt never ends with zero active sources.
    pub async fn switch_to_push(&self) -> Result<(), ChannelError> {
        info!("switching to push mode");
        self.inner.poll.stop();
        match self.inner.channel.connect().await {
            Ok(()) => {
                self.inner.set_mode(ActiveMode::Push);
                Ok(())
            }
            Err(e) => {
                warn!(%e, "channel open failed; staying in pull mode");
                self.inner.enter_pull_mode(false);
                Err(e)
            }
        }
    }

    /// Tear everything down: stop polling, close the channel with the
    /// manual-close reason, drop all listeners. Safe to call repeatedly and
    /// from any state.
    pub fn cleanup(&self) {
        self.inner.poll.stop();
        self.inner.channel.disconnect();
        self.inner.events.clear();
    }
}

impl CoordinatorInner {
    /// Record a mode change, persisting it once per actual change.
    fn set_mode(&self, mode: ActiveMode) {
        if self.mode.swap(mode) != mode {
            self.store.set(mode);
            info!(%mode, "active mode changed");
        }
    }

    /// Stop the channel and (re)start polling; `PollLoop::start` guarantees
    /// there is never a duplicate timer.
    fn enter_pull_mode(&self, skip_first_fetch: bool) {
        self.channel.disconnect();
        self.poll.start(skip_first_fetch);
        self.set_mode(ActiveMode::Pull);
    }
}
