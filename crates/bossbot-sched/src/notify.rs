//! Delivery seam between the engine and the chat platform.

use bossbot_types::Notification;

/// Sends a rendered announcement to its destination channel.
///
/// The Discord implementation lives in the channel crate; tests use a
/// recording double.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl<N: Notifier + ?Sized> Notifier for std::sync::Arc<N> {
    async fn send(&self, notification: &Notification) -> anyhow::Result<()> {
        (**self).send(notification).await
    }
}
