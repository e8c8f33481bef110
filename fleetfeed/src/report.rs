//! Error reporting sink: where every recovered fetch/channel failure goes.

use std::error::Error;

use tracing::warn;

/// Fire-and-forget failure reporting. Implementations must not panic; the
/// callers treat `report` as infallible.
pub trait ErrorSink: Send + Sync {
    fn report(&self, context: &str, error: &(dyn Error + 'static));
}

/// Default sink: a structured warning log per failure.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&self, context: &str, error: &(dyn Error + 'static)) {
        warn!(context, %error, "recovered failure");
    }
}
