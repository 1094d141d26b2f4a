//! Capabilities the host runtime exposes to the worker.

use async_trait::async_trait;
use offcache_core::Error;

use crate::shortcuts::Shortcut;

/// Commands the worker can issue to whatever runtime delivers its events.
#[async_trait]
pub trait Host: Send + Sync {
    /// Activate this worker without waiting for old clients to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Take control of every open client page.
    async fn claim_clients(&self) -> Result<(), Error>;

    /// Replace the host's quick-action shortcut list.
    ///
    /// Returns `Error::HostUnsupported` when the host has no shortcut support.
    async fn set_shortcuts(&self, shortcuts: &[Shortcut]) -> Result<(), Error>;
}
