//! Heartbeat: periodic ping frames while a connection is being serviced.
//!
//! Pong replies are consumed by the transport and otherwise ignored; liveness
//! enforcement is left to the transport's own closure detection, so there is
//! no ack timeout here.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use crate::protocol::OutgoingFrame;

/// Spawn the ping task. It lives exactly as long as the connection's writer:
/// the caller aborts it on close, and a dropped writer ends it on its own.
pub(crate) fn start_heartbeat(
    tx: mpsc::UnboundedSender<OutgoingFrame>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first ping waits one full period; intervals fire immediately
        timer.tick().await;
        loop {
            timer.tick().await;
            if tx.send(OutgoingFrame::Ping).is_err() {
                break;
            }
            debug!("heartbeat ping queued");
        }
    })
}
