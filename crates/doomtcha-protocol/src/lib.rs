//! Messages exchanged between the verification engine and the UI layer.
//!
//! The engine never touches the page directly; it emits [`MsgToUI`] values
//! on a channel and the UI layer renders them however it likes.

use serde::{Deserialize, Serialize};

/// Visual states of the "I am not a robot" checkbox affordance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckboxVisual {
    /// Resting state, nothing in flight.
    Unchecked,
    /// Spinner shown while the asset loads.
    Busy,
    /// Checkmark shown once the handoff to the game begins.
    Checked,
}

/// Notification severity for user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyKind {
    Info,
    Warn,
    Error,
    Success,
}

/// Messages sent from the verification engine to the UI layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MsgToUI {
    /// Update the checkbox affordance.
    Checkbox(CheckboxVisual),

    /// User-facing notification; `Error` kinds are alert-level interruptions.
    Notify {
        kind: NotifyKind,
        title: String,
        text: String,
    },

    /// Swap the captcha box out for the game surface.
    ShowGame,

    /// Hide the game surface and restore the captcha box.
    HideGame,

    /// Countdown tick before an encore launch; `0` clears the display.
    Countdown(u32),

    /// Navigate to the given page on verified completion.
    Navigate(String),
}

/// Channel aliases and helpers for the engine→UI message stream.
pub mod ipc {
    use super::MsgToUI;

    /// Tokio unbounded sender for UI messages.
    pub type UiTx = tokio::sync::mpsc::UnboundedSender<MsgToUI>;
    /// Tokio unbounded receiver for UI messages.
    pub type UiRx = tokio::sync::mpsc::UnboundedReceiver<MsgToUI>;

    /// Create a standard unbounded UI channel (sender, receiver).
    pub fn ui_channel() -> (UiTx, UiRx) {
        tokio::sync::mpsc::unbounded_channel::<MsgToUI>()
    }
}
