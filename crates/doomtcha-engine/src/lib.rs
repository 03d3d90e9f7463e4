//! Doomtcha Engine
//!
//! The engine behind the fake "I am not a robot" checkbox. Instead of
//! verifying anything, a trigger:
//! - fetches the game asset and checks its `IWAD` magic
//! - paces the busy indicator so instant fetches still read as work
//! - hands the asset to the embedded game runtime
//! - waits for the runtime's end-of-session signal, then confirms and
//!   navigates
//!
//! It also houses the collision-avoiding placement used by UI elements
//! that dodge the pointer ([`placement`]), which is independent of the
//! verification flow.
//!
//! Public surface: [`Controller`] (the state machine you construct and
//! drive), [`AssetLoader`], [`GameBridge`], and [`placement`].

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use doomtcha_protocol::{CheckboxVisual, MsgToUI, NotifyKind};
use parking_lot::Mutex;
use tokio::time::{self, Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

mod asset;
mod bridge;
mod error;
mod notification;
pub mod placement;
mod session;
pub mod test_support;

pub use asset::{ASSET_MAGIC, Asset, AssetLoader, AssetSource, FileSource};
pub use bridge::{
    ASSET_LOGICAL_NAME, AssetPathResolver, GameBridge, GameRuntime, PauseOutcome, RuntimeConfig,
};
pub use error::{Error, Result};
pub use notification::UiDispatcher;
pub use session::{Phase, VerificationSession};

/// Fixed argument vector for a verification launch.
pub const LAUNCH_ARGS: [&str; 2] = ["-iwad", "doom-data.wad"];

/// Seconds counted down before an encore launch.
pub const ENCORE_COUNTDOWN_SECS: u32 = 3;

/// Tuning knobs for the verification flow.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// URL the game asset is fetched from.
    pub asset_url: String,
    /// Minimum time the busy indicator stays up, even when the fetch
    /// resolves instantly. UX pacing, not a correctness requirement.
    pub min_feedback: Duration,
    /// Delay between the verified confirmation and the navigation signal.
    pub confirm_delay: Duration,
    /// Where the navigation signal points on verified completion.
    pub verified_url: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            asset_url: "./doom1.wad".to_string(),
            min_feedback: Duration::from_millis(1500),
            confirm_delay: Duration::from_millis(1000),
            verified_url: "./success.html".to_string(),
        }
    }
}

/// Mutable controller state behind one lock: the phase plus the (at most
/// one) in-flight session.
struct Current {
    phase: Phase,
    session: Option<VerificationSession>,
    next_id: u64,
}

/// The verification state machine.
///
/// Construct via [`Controller::new`] inside a tokio runtime, then feed it
/// UI events: [`Controller::trigger`] for the checkbox,
/// [`Controller::cancel`] for fullscreen exit, and
/// [`Controller::surface_lost`] for a destroyed rendering surface. All
/// outputs flow through the UI channel given to the dispatcher.
#[derive(Clone)]
pub struct Controller {
    loader: AssetLoader,
    bridge: GameBridge,
    ui: UiDispatcher,
    config: Arc<ControllerConfig>,
    current: Arc<Mutex<Current>>,
    /// Sticky poison flag set on surface loss; only a reload clears it.
    lost: Arc<AtomicBool>,
    /// Gates the encore flow: at least one session must have verified.
    verified_once: Arc<AtomicBool>,
}

impl Controller {
    /// Create a new controller.
    pub fn new(
        loader: AssetLoader,
        bridge: GameBridge,
        ui: UiDispatcher,
        config: ControllerConfig,
    ) -> Self {
        Self {
            loader,
            bridge,
            ui,
            config: Arc::new(config),
            current: Arc::new(Mutex::new(Current {
                phase: Phase::Idle,
                session: None,
                next_id: 0,
            })),
            lost: Arc::new(AtomicBool::new(false)),
            verified_once: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current phase (Idle when no session is active).
    pub fn phase(&self) -> Phase {
        self.current.lock().phase
    }

    /// Handle the checkbox trigger.
    ///
    /// No-op while a session is in flight or after the rendering surface
    /// has been lost; triggers are ignored entirely, never queued.
    pub fn trigger(&self) {
        if self.lost.load(Ordering::SeqCst) {
            debug!("trigger ignored: surface lost");
            return;
        }
        let (id, started_at, token) = {
            let mut cur = self.current.lock();
            if !cur.phase.accepts_trigger() {
                debug!(phase = ?cur.phase, "trigger ignored: session in flight");
                return;
            }
            let id = cur.next_id;
            cur.next_id += 1;
            let token = CancellationToken::new();
            let started_at = Instant::now();
            cur.phase = Phase::Loading;
            cur.session = Some(VerificationSession {
                id,
                started_at,
                token: token.clone(),
            });
            (id, started_at, token)
        };
        trace!(id, "session started");
        let _ = self.ui.send_checkbox(CheckboxVisual::Busy);

        let this = self.clone();
        tokio::spawn(async move {
            this.run_session(id, started_at, token).await;
        });
    }

    /// External cancellation: the user left fullscreen. Discards the
    /// in-flight session; a fetch that resolves afterwards is ignored
    /// because the session is no longer armed.
    pub fn cancel(&self) {
        let token = {
            let mut cur = self.current.lock();
            if !cur.phase.cancellable() {
                trace!(phase = ?cur.phase, "cancel ignored");
                return;
            }
            cur.phase = Phase::Idle;
            cur.session.take().map(|s| s.token)
        };
        if let Some(token) = token {
            token.cancel();
        }
        self.bridge.disarm();
        debug!("session cancelled, back to idle");
        let _ = self.ui.send(MsgToUI::HideGame);
        let _ = self.ui.send_checkbox(CheckboxVisual::Unchecked);
    }

    /// The rendering surface was destroyed. Fatal: runtime state is
    /// assumed corrupted, so no reset to Idle is attempted and further
    /// triggers are refused until a full reload.
    pub fn surface_lost(&self) {
        self.lost.store(true, Ordering::SeqCst);
        let token = {
            let mut cur = self.current.lock();
            cur.session.take().map(|s| s.token)
        };
        if let Some(token) = token {
            token.cancel();
        }
        self.bridge.disarm();
        error!("rendering surface lost; reload required");
        let _ = self.ui.send_error(
            "Game",
            "Rendering context lost. You will need to reload the page.".to_string(),
        );
    }

    /// Encore flow from the confirmation page: count down, then relaunch
    /// the runtime for free play with no auto-start args. The end hook
    /// stays disarmed, so a win during free play changes nothing.
    ///
    /// Runs as a session in the [`Phase::Encore`] phase, so the trigger
    /// and encore guards refuse new work for its whole lifetime and
    /// [`Controller::cancel`] / [`Controller::surface_lost`] stop it.
    pub fn confirm_encore(&self) {
        if self.lost.load(Ordering::SeqCst) {
            debug!("encore refused: surface lost");
            return;
        }
        if !self.verified_once.load(Ordering::SeqCst) {
            debug!("encore refused: nothing verified yet");
            return;
        }
        let (id, token) = {
            let mut cur = self.current.lock();
            if cur.phase != Phase::Idle {
                debug!(phase = ?cur.phase, "encore refused: session in flight");
                return;
            }
            let id = cur.next_id;
            cur.next_id += 1;
            let token = CancellationToken::new();
            cur.phase = Phase::Encore;
            cur.session = Some(VerificationSession {
                id,
                started_at: Instant::now(),
                token: token.clone(),
            });
            (id, token)
        };
        trace!(id, "encore started");
        let this = self.clone();
        tokio::spawn(async move {
            this.run_encore(id, token).await;
        });
    }

    /// Drive one session from Loading to its terminal phase.
    async fn run_session(&self, id: u64, started_at: Instant, token: CancellationToken) {
        let asset = tokio::select! {
            _ = token.cancelled() => {
                trace!(id, "cancelled during fetch; result will be ignored");
                return;
            }
            res = self.loader.load(&self.config.asset_url) => res,
        };
        let asset = match asset {
            Ok(a) => a,
            Err(e) => {
                self.fail(id, &e);
                return;
            }
        };
        if !self.advance(id, Phase::Validating) {
            return;
        }

        // Feedback floor: hold the busy indicator even when the fetch was
        // instantaneous.
        let elapsed = started_at.elapsed();
        if elapsed < self.config.min_feedback {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = time::sleep(self.config.min_feedback - elapsed) => {}
            }
        }
        if !self.advance(id, Phase::Starting) {
            return;
        }
        let _ = self.ui.send_checkbox(CheckboxVisual::Checked);

        // Subscribe before arming and launching so a win during startup is
        // not missed.
        let mut end_rx = self.bridge.subscribe_end();
        self.bridge.arm();
        if let Err(e) = self.bridge.launch(asset, &LAUNCH_ARGS) {
            self.bridge.disarm();
            self.fail(id, &e);
            return;
        }
        if !self.advance(id, Phase::Verifying) {
            self.bridge.disarm();
            return;
        }
        let _ = self.ui.send(MsgToUI::ShowGame);

        // No timeout here: the runtime decides when the user has earned
        // the checkmark.
        tokio::select! {
            _ = token.cancelled() => {
                self.bridge.disarm();
                return;
            }
            _ = end_rx.changed() => {}
        }
        self.bridge.disarm();
        if !self.advance(id, Phase::Verified) {
            return;
        }
        self.verified_once.store(true, Ordering::SeqCst);
        let _ = self.ui.send_notification(
            NotifyKind::Success,
            "Verification complete".to_string(),
            "You are definitely not a robot.".to_string(),
        );
        if self.bridge.pause() == PauseOutcome::Failed {
            debug!(id, "continuing without pause");
        }

        // Verified is not cancellable; the only way out is navigation. The
        // guard does admit a fresh trigger here, so the handoff is dropped
        // if the session got replaced during the delay.
        time::sleep(self.config.confirm_delay).await;
        if self.reset_to_idle(id) {
            let _ = self
                .ui
                .send(MsgToUI::Navigate(self.config.verified_url.clone()));
        }
    }

    /// Drive one encore: countdown, fetch, free-play launch.
    async fn run_encore(&self, id: u64, token: CancellationToken) {
        for n in (1..=ENCORE_COUNTDOWN_SECS).rev() {
            let _ = self.ui.send(MsgToUI::Countdown(n));
            tokio::select! {
                _ = token.cancelled() => {
                    trace!(id, "encore cancelled during countdown");
                    return;
                }
                _ = time::sleep(Duration::from_secs(1)) => {}
            }
        }
        let _ = self.ui.send(MsgToUI::Countdown(0));

        let asset = tokio::select! {
            _ = token.cancelled() => return,
            res = self.loader.load(&self.config.asset_url) => res,
        };
        let asset = match asset {
            Ok(a) => a,
            Err(e) => {
                self.encore_fail(id, &e);
                return;
            }
        };
        // Currency check between fetch resolution and the launch; a
        // cancellation or surface loss in that window must keep the asset
        // away from the runtime.
        if !self.advance(id, Phase::Encore) {
            return;
        }
        let _ = self.ui.send(MsgToUI::ShowGame);
        if let Err(e) = self.bridge.launch(asset, &[]) {
            self.encore_fail(id, &e);
        }
        // On success the session stays resident in Encore: the runtime is
        // running free play, and only cancel or surface loss ends it.
    }

    /// Route an encore failure: one alert, then rest at Idle.
    fn encore_fail(&self, id: u64, err: &Error) {
        if !self.advance(id, Phase::Failed) {
            return;
        }
        warn!(id, error = %err, "encore failed");
        let _ = self.ui.send_error(
            "Game",
            "Oh no... the game failed to load. The awkwardness increases.".to_string(),
        );
        self.reset_to_idle(id);
    }

    /// Apply a phase transition for session `id`. Returns false when the
    /// session is no longer current (cancelled or replaced); the caller
    /// must then stop without touching shared state.
    fn advance(&self, id: u64, to: Phase) -> bool {
        let mut cur = self.current.lock();
        match &cur.session {
            Some(s) if s.id == id && !s.token.is_cancelled() => {
                trace!(id, from = ?cur.phase, to = ?to, "phase");
                cur.phase = to;
                true
            }
            _ => {
                trace!(id, to = ?to, "stale transition dropped");
                false
            }
        }
    }

    /// Route a session failure: one alert, then rest at Idle.
    fn fail(&self, id: u64, err: &Error) {
        if !self.advance(id, Phase::Failed) {
            return;
        }
        warn!(id, error = %err, "verification failed");
        let text = match err {
            Error::RuntimeStart(_) => "Failed to start game. Please refresh and try again.",
            _ => "Failed to load game. Please refresh and try again.",
        };
        let _ = self.ui.send_error("Verification", text.to_string());

        let mut cur = self.current.lock();
        if cur.session.as_ref().is_some_and(|s| s.id == id) {
            cur.phase = Phase::Idle;
            cur.session = None;
        }
        drop(cur);
        let _ = self.ui.send_checkbox(CheckboxVisual::Unchecked);
    }

    /// Completion handoff: drop the session and rest at Idle. Returns
    /// false when the session was already discarded or replaced.
    fn reset_to_idle(&self, id: u64) -> bool {
        let mut cur = self.current.lock();
        if cur.session.as_ref().is_some_and(|s| s.id == id) {
            cur.phase = Phase::Idle;
            cur.session = None;
            trace!(id, "session complete");
            true
        } else {
            false
        }
    }
}
