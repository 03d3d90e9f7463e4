//! Test support utilities for doomtcha-engine tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.
//! They are intended for use by the test suite only.

use std::{
    io,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use doomtcha_protocol::{MsgToUI, NotifyKind, ipc, ipc::UiRx};
use parking_lot::Mutex;
use tokio::time::{Duration, Instant, sleep};

use crate::{
    AssetLoader, AssetSource, Controller, ControllerConfig, GameBridge, GameRuntime, Phase,
    RuntimeConfig, UiDispatcher,
};

/// Controller config with short pacing delays suitable for tests.
pub fn fast_config() -> ControllerConfig {
    ControllerConfig {
        min_feedback: Duration::from_millis(20),
        confirm_delay: Duration::from_millis(10),
        ..ControllerConfig::default()
    }
}

/// In-memory asset source with a scripted payload and latency.
pub struct ScriptedSource {
    payload: Result<Vec<u8>, String>,
    latency: Duration,
    /// Number of fetches issued, for re-entrancy assertions.
    pub fetches: AtomicUsize,
}

impl ScriptedSource {
    /// Source that yields `bytes` on every fetch.
    pub fn ok(bytes: Vec<u8>) -> Arc<Self> {
        Arc::new(Self {
            payload: Ok(bytes),
            latency: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        })
    }

    /// Source that fails every fetch with a transport error.
    pub fn err(msg: &str) -> Arc<Self> {
        Arc::new(Self {
            payload: Err(msg.to_string()),
            latency: Duration::ZERO,
            fetches: AtomicUsize::new(0),
        })
    }

    /// Same payload, but each fetch takes `latency` to resolve.
    pub fn with_latency(self: Arc<Self>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            payload: self.payload.clone(),
            latency,
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AssetSource for ScriptedSource {
    async fn fetch(&self, _url: &str) -> io::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        match &self.payload {
            Ok(bytes) => Ok(bytes.clone()),
            Err(msg) => Err(io::Error::other(msg.clone())),
        }
    }
}

/// Recording fake of the black-box game runtime.
#[derive(Default)]
pub struct FakeRuntime {
    /// (logical name, byte length) per write, in order.
    pub writes: Mutex<Vec<(String, usize)>>,
    /// Argument vectors per start, in order.
    pub starts: Mutex<Vec<Vec<String>>>,
    /// Number of pause attempts.
    pub pauses: AtomicUsize,
    /// Make the next start call fail.
    pub fail_start: AtomicBool,
    /// Make pause calls fail.
    pub fail_pause: AtomicBool,
    hook: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl FakeRuntime {
    /// Fresh runtime with nothing recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the end hook, as the runtime would on its win condition.
    pub fn fire_end(&self) {
        if let Some(hook) = &*self.hook.lock() {
            hook();
        }
    }

    /// True once start has been called at least once.
    pub fn started(&self) -> bool {
        !self.starts.lock().is_empty()
    }
}

#[async_trait]
impl GameRuntime for FakeRuntime {
    async fn initialize(&self, _config: &RuntimeConfig) -> Result<(), String> {
        Ok(())
    }

    fn write_asset(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        self.writes.lock().push((name.to_string(), bytes.len()));
        Ok(())
    }

    fn start(&self, args: &[String]) -> Result<(), String> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err("entrypoint exploded".to_string());
        }
        self.starts.lock().push(args.to_vec());
        Ok(())
    }

    fn pause(&self) -> Result<(), String> {
        self.pauses.fetch_add(1, Ordering::SeqCst);
        if self.fail_pause.load(Ordering::SeqCst) {
            return Err("no pause for you".to_string());
        }
        Ok(())
    }

    fn set_end_hook(&self, hook: Box<dyn Fn() + Send + Sync>) {
        *self.hook.lock() = Some(hook);
    }
}

/// Build a controller wired to a fake runtime and the given source.
pub async fn test_controller(
    source: Arc<ScriptedSource>,
    config: ControllerConfig,
) -> (Controller, UiRx, Arc<FakeRuntime>) {
    let (tx, rx) = ipc::ui_channel();
    let runtime = Arc::new(FakeRuntime::new());
    let bridge = GameBridge::initialize(runtime.clone(), RuntimeConfig::new("canvas"))
        .await
        .expect("fake runtime initializes");
    let controller = Controller::new(
        AssetLoader::new(source),
        bridge,
        UiDispatcher::new(tx),
        config,
    );
    (controller, rx, runtime)
}

/// Await until the controller reports `phase`, up to `timeout_ms`.
pub async fn wait_phase(controller: &Controller, phase: Phase, timeout_ms: u64) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if controller.phase() == phase {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(2)).await;
    }
}

/// Await until `pred` holds, up to `timeout_ms`.
pub async fn wait_until<F>(timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        if pred() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        sleep(Duration::from_millis(2)).await;
    }
}

/// Receive UI messages until `pred` matches or `timeout_ms` elapses.
pub async fn recv_until<F>(rx: &mut UiRx, timeout_ms: u64, mut pred: F) -> bool
where
    F: FnMut(&MsgToUI) -> bool,
{
    tokio::time::timeout(Duration::from_millis(timeout_ms), async {
        while let Some(msg) = rx.recv().await {
            if pred(&msg) {
                return true;
            }
        }
        false
    })
    .await
    .unwrap_or(false)
}

/// Drain buffered messages, returning how many were error notifications.
pub fn drain_count_errors(rx: &mut UiRx) -> usize {
    let mut errors = 0;
    while let Ok(msg) = rx.try_recv() {
        if matches!(
            msg,
            MsgToUI::Notify {
                kind: NotifyKind::Error,
                ..
            }
        ) {
            errors += 1;
        }
    }
    errors
}
