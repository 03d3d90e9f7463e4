use doomtcha_protocol::{CheckboxVisual, MsgToUI, NotifyKind, ipc::UiTx};
use tracing::info;

use crate::error::{Error, Result};

/// Sends checkbox visuals, notifications, and navigation to the UI layer.
#[derive(Clone)]
pub struct UiDispatcher {
    tx: UiTx,
}

impl UiDispatcher {
    /// Create a new dispatcher from a UI message channel.
    pub fn new(tx: UiTx) -> Self {
        Self { tx }
    }

    /// Forward an arbitrary message to the UI.
    pub fn send(&self, msg: MsgToUI) -> Result<()> {
        self.tx.send(msg).map_err(|_| Error::ChannelClosed)
    }

    /// Update the checkbox affordance.
    pub fn send_checkbox(&self, visual: CheckboxVisual) -> Result<()> {
        self.send(MsgToUI::Checkbox(visual))
    }

    /// Send a notification with the given kind, title, and text.
    ///
    /// Always logged at info level regardless of kind, for traceability.
    pub fn send_notification(&self, kind: NotifyKind, title: String, text: String) -> Result<()> {
        info!(kind = ?kind, title = %title, text = %text, "notification_display");
        self.send(MsgToUI::Notify { kind, title, text })
    }

    /// Convenience helper for alert-level error notifications.
    pub fn send_error(&self, title: &str, text: String) -> Result<()> {
        self.send_notification(NotifyKind::Error, title.to_string(), text)
    }
}
