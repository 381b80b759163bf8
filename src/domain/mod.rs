// Domain layer - Device identities, telemetry events, and read models
pub mod bearing;
pub mod device;
pub mod link;
pub mod panel;
