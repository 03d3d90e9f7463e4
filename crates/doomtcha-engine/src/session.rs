//! Verification session records.

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Phases of the verification state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Resting state; nothing in flight.
    Idle,
    /// Asset fetch in progress.
    Loading,
    /// Asset validated; waiting out the feedback floor.
    Validating,
    /// Handing the asset to the runtime.
    Starting,
    /// Runtime running; waiting for its end signal.
    Verifying,
    /// End signal received; confirmation and navigation pending.
    Verified,
    /// A failure was just reported. Transient; the resting phase is Idle.
    Failed,
    /// Encore in progress: countdown, relaunch, then free play.
    Encore,
}

impl Phase {
    /// True when a new trigger may start a session.
    pub fn accepts_trigger(self) -> bool {
        matches!(self, Self::Idle | Self::Failed | Self::Verified)
    }

    /// True when external cancellation (fullscreen exit) resets to Idle.
    pub fn cancellable(self) -> bool {
        !matches!(self, Self::Idle | Self::Verified)
    }
}

/// The single in-flight verification attempt.
///
/// At most one session exists process-wide in a non-terminal phase; the
/// controller's trigger guard enforces that. The token invalidates every
/// pending timer and suspension owned by the session when it is discarded.
#[derive(Debug, Clone)]
pub struct VerificationSession {
    /// Monotonic id used to reject stale asynchronous results.
    pub id: u64,
    /// Set on entering Loading; anchors the minimum feedback duration.
    pub started_at: Instant,
    /// Cancelled when the session is discarded.
    pub token: CancellationToken,
}
