// Port for the backend command API
use crate::domain::device::{DeviceId, Quantity};
use async_trait::async_trait;

/// Outbound command channel to the station backend. None of these calls
/// return a success payload; success is inferred from later telemetry.
#[async_trait]
pub trait CommandPort: Send + Sync {
    /// Request a new value for a continuous device quantity.
    async fn issue_command(
        &self,
        device: &DeviceId,
        quantity: Quantity,
        value: f64,
    ) -> anyhow::Result<()>;

    async fn connect(&self, device: &DeviceId) -> anyhow::Result<()>;

    async fn disconnect(&self, device: &DeviceId) -> anyhow::Result<()>;
}
