use async_trait::async_trait;

use crate::notify::Notice;

/// Outbound notification seam the embedding UI implements.
///
/// Every notice is a local, synchronous side effect; the engine never waits
/// on user input through this trait.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notice: Notice);
}
