use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the verification engine.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport or HTTP-level failure while fetching the asset.
    #[error("network error: {0}")]
    Network(String),

    /// The fetched asset failed structural validation.
    #[error("invalid asset: {0}")]
    Validation(String),

    /// Handing the asset to the game runtime failed.
    #[error("runtime start failed: {0}")]
    RuntimeStart(String),

    /// The rendering surface was destroyed. Unrecoverable; only a full
    /// reload brings the runtime back.
    #[error("rendering surface lost")]
    RuntimeLost,

    /// The UI event channel has been closed by the receiver.
    #[error("UI channel closed")]
    ChannelClosed,
}
