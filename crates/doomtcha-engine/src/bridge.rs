//! Bridge to the external game runtime.
//!
//! The runtime itself is a pre-built black box reached through the
//! [`GameRuntime`] trait. The bridge owns the handle, performs the
//! write-asset-then-start handoff, and turns the runtime's single global
//! end hook into an armed, subscribable signal the controller can wait on.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    asset::Asset,
    error::{Error, Result},
};

/// Logical storage name the asset is written under before start.
pub const ASSET_LOGICAL_NAME: &str = "/doom-data.wad";

/// Maps a logical asset name to the path the runtime fetches it from.
pub type AssetPathResolver = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// One-time startup options for the runtime.
#[derive(Clone)]
pub struct RuntimeConfig {
    /// Identifier of the rendering surface the runtime draws to.
    pub render_target: String,
    /// Resolver for the runtime's own support files.
    pub asset_path_resolver: AssetPathResolver,
}

impl RuntimeConfig {
    /// Config with the default resolver, which serves runtime support files
    /// from a `wasm/` prefix.
    pub fn new(render_target: &str) -> Self {
        Self {
            render_target: render_target.to_string(),
            asset_path_resolver: Arc::new(|name| format!("wasm/{name}")),
        }
    }
}

/// Contract of the external, pre-built game runtime.
///
/// Errors are plain strings because the runtime is opaque; the bridge maps
/// them into the engine's error taxonomy.
#[async_trait]
pub trait GameRuntime: Send + Sync {
    /// One-time startup. Resolves when the runtime is ready for assets.
    async fn initialize(&self, config: &RuntimeConfig) -> std::result::Result<(), String>;

    /// Write `bytes` into the runtime's virtual storage under `name`.
    fn write_asset(&self, name: &str, bytes: &[u8]) -> std::result::Result<(), String>;

    /// Invoke the runtime entrypoint with `args`.
    fn start(&self, args: &[String]) -> std::result::Result<(), String>;

    /// Ask the runtime to pause. Best-effort.
    fn pause(&self) -> std::result::Result<(), String>;

    /// Overwrite-register the hook fired when the run's end condition hits.
    fn set_end_hook(&self, hook: Box<dyn Fn() + Send + Sync>);
}

/// Outcome of a best-effort pause request.
///
/// `Failed` is non-fatal and already logged by the bridge; it must never
/// block the confirmation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// The runtime acknowledged the pause.
    Paused,
    /// The pause attempt failed; the game keeps running.
    Failed,
}

/// Owns the runtime handle and the armed end-signal plumbing.
///
/// Created once per page load via [`GameBridge::initialize`] and reused
/// across verification sessions. Only one `launch` may be outstanding per
/// run; the controller's state machine enforces that, not the bridge.
#[derive(Clone)]
pub struct GameBridge {
    runtime: Arc<dyn GameRuntime>,
    armed: Arc<AtomicBool>,
    end_tx: watch::Sender<u64>,
}

impl GameBridge {
    /// Perform one-time runtime startup and wire the end-signal hook.
    ///
    /// The hook may fire at any time, including when no session is active;
    /// while the bridge is disarmed it is a no-op.
    pub async fn initialize(runtime: Arc<dyn GameRuntime>, config: RuntimeConfig) -> Result<Self> {
        runtime
            .initialize(&config)
            .await
            .map_err(Error::RuntimeStart)?;
        debug!(render_target = %config.render_target, "runtime initialized");

        let armed = Arc::new(AtomicBool::new(false));
        let (end_tx, _end_rx) = watch::channel(0u64);
        {
            let armed = armed.clone();
            let end_tx = end_tx.clone();
            runtime.set_end_hook(Box::new(move || {
                if armed.load(Ordering::SeqCst) {
                    end_tx.send_modify(|n| *n += 1);
                } else {
                    debug!("end hook fired while disarmed; ignoring");
                }
            }));
        }

        Ok(Self {
            runtime,
            armed,
            end_tx,
        })
    }

    /// Write the asset under [`ASSET_LOGICAL_NAME`], then start the runtime
    /// with `args`. The asset is consumed; it is not retained after handoff.
    pub fn launch(&self, asset: Asset, args: &[&str]) -> Result<()> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        self.runtime
            .write_asset(ASSET_LOGICAL_NAME, asset.bytes())
            .map_err(Error::RuntimeStart)?;
        self.runtime.start(&args).map_err(Error::RuntimeStart)?;
        info!(?args, len = asset.len(), "runtime started");
        Ok(())
    }

    /// Best-effort pause. Failures are logged here and reported in the
    /// outcome; they never propagate as errors.
    pub fn pause(&self) -> PauseOutcome {
        match self.runtime.pause() {
            Ok(()) => PauseOutcome::Paused,
            Err(e) => {
                warn!("pause failed (non-fatal): {e}");
                PauseOutcome::Failed
            }
        }
    }

    /// Let the end hook through to subscribers.
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Drop end-hook firings on the floor again.
    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    /// True while a session is armed to receive the end signal.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
    }

    /// Subscribe to the end signal. Only firings after the subscription are
    /// observed, so subscribe before arming and launching.
    pub fn subscribe_end(&self) -> watch::Receiver<u64> {
        self.end_tx.subscribe()
    }
}
