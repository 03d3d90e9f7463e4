//! Headless doomtcha demo.
//!
//! Drives one full verification session end to end: the WAD comes from
//! disk instead of the network, the game runtime is simulated, and the
//! "win" fires after a fixed amount of pretend play. UI messages are
//! printed to stdout.

use std::{process, sync::Arc};

use clap::Parser;
use doomtcha_engine::{
    AssetLoader, Controller, ControllerConfig, FileSource, GameBridge, GameRuntime, RuntimeConfig,
    UiDispatcher,
};
use doomtcha_protocol::{CheckboxVisual, MsgToUI, NotifyKind, ipc};
use parking_lot::Mutex;
use tokio::time::{Duration, sleep};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "doomtcha",
    about = "Run one doomtcha verification session against a simulated runtime"
)]
struct Cli {
    /// Path to the IWAD file to feed the engine
    #[arg(long, default_value = "doom1.wad")]
    wad: String,

    /// Simulated play time before the runtime reports the win, in seconds
    #[arg(long, default_value_t = 2)]
    play_secs: u64,

    #[command(flatten)]
    log: logging::LogArgs,
}

/// Minimal stand-in for the embedded game runtime.
#[derive(Default)]
struct SimRuntime {
    hook: Mutex<Option<Box<dyn Fn() + Send + Sync>>>,
}

impl SimRuntime {
    /// Fire the end hook, as the real runtime does on its win condition.
    fn win(&self) {
        if let Some(hook) = &*self.hook.lock() {
            hook();
        }
    }
}

#[async_trait::async_trait]
impl GameRuntime for SimRuntime {
    async fn initialize(&self, config: &RuntimeConfig) -> Result<(), String> {
        info!(render_target = %config.render_target, "sim runtime ready");
        Ok(())
    }

    fn write_asset(&self, name: &str, bytes: &[u8]) -> Result<(), String> {
        info!(name, len = bytes.len(), "asset written to virtual storage");
        Ok(())
    }

    fn start(&self, args: &[String]) -> Result<(), String> {
        info!(?args, "game started");
        Ok(())
    }

    fn pause(&self) -> Result<(), String> {
        info!("game paused");
        Ok(())
    }

    fn set_end_hook(&self, hook: Box<dyn Fn() + Send + Sync>) {
        *self.hook.lock() = Some(hook);
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(&cli.log);

    let runtime = Arc::new(SimRuntime::default());
    let bridge = match GameBridge::initialize(runtime.clone(), RuntimeConfig::new("headless")).await
    {
        Ok(b) => b,
        Err(e) => {
            eprintln!("runtime failed to initialize: {e}");
            process::exit(1);
        }
    };

    let (tx, mut rx) = ipc::ui_channel();
    let config = ControllerConfig {
        asset_url: cli.wad.clone(),
        ..ControllerConfig::default()
    };
    let controller = Controller::new(
        AssetLoader::new(Arc::new(FileSource)),
        bridge,
        UiDispatcher::new(tx),
        config,
    );

    controller.trigger();

    // Simulated play: win well after the feedback floor has passed.
    let sim = runtime.clone();
    let play = Duration::from_secs(cli.play_secs);
    tokio::spawn(async move {
        sleep(play + Duration::from_millis(1600)).await;
        sim.win();
    });

    let mut failed = false;
    while let Some(msg) = rx.recv().await {
        match msg {
            MsgToUI::Checkbox(visual) => {
                println!("checkbox: {visual:?}");
                if failed && visual == CheckboxVisual::Unchecked {
                    // Alert shown and session reset; nothing more will come.
                    break;
                }
            }
            MsgToUI::Notify { kind, title, text } => {
                println!("[{kind:?}] {title}: {text}");
                if kind == NotifyKind::Error {
                    failed = true;
                }
            }
            MsgToUI::ShowGame => println!("game surface shown"),
            MsgToUI::HideGame => println!("game surface hidden"),
            MsgToUI::Countdown(n) => println!("countdown: {n}"),
            MsgToUI::Navigate(url) => {
                println!("navigate -> {url}");
                break;
            }
        }
    }
    if failed {
        process::exit(1);
    }
}
