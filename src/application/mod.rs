// Application layer - Reconciliation core, station service, outbound ports
pub mod arbiter;
pub mod clock;
pub mod command_port;
pub mod link_registry;
pub mod reconciler;
pub mod settings_port;
pub mod station_service;
