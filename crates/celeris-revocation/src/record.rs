//! The options a revocation is requested with, and the record it leaves
//! behind.

use chrono::{DateTime, Duration, Utc};

/// The default TTL applied when a revocation is submitted without an
/// explicit `expiry`. A day comfortably outlives any message's own
/// `eta`/retry horizon in normal operation.
pub const DEFAULT_EXPIRY: Duration = Duration::hours(24);

/// How a revoked task's cancellation token should be signalled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelSignal {
    /// Cooperative: the handler is given a chance to wind down.
    Graceful,
    /// The hard-limit path: the handler is abandoned rather than awaited.
    Immediate,
}

/// Parameters of a revocation request.
#[derive(Debug, Clone, Copy)]
pub struct RevocationOptions {
    /// If `true`, a task already executing must be cancelled; if `false`,
    /// a task still queued is simply never invoked.
    pub terminate: bool,
    /// How long the revocation stays in effect. Defaults to
    /// [`DEFAULT_EXPIRY`] when not set.
    pub expiry: Option<Duration>,
    pub signal: CancelSignal,
}

impl Default for RevocationOptions {
    fn default() -> Self {
        Self {
            terminate: false,
            expiry: None,
            signal: CancelSignal::Graceful,
        }
    }
}

/// A stored revocation, as returned by [`crate::RevocationStore::get`].
#[derive(Debug, Clone)]
pub struct RevocationRecord {
    pub revoked_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub terminate: bool,
    pub signal: CancelSignal,
}

impl RevocationRecord {
    pub fn new(now: DateTime<Utc>, options: RevocationOptions) -> Self {
        let ttl = options.expiry.unwrap_or(DEFAULT_EXPIRY);
        Self {
            revoked_at: now,
            expires_at: now + ttl,
            terminate: options.terminate,
            signal: options.signal,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
