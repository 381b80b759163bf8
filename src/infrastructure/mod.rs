// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod rest_command_client;
pub mod settings;
pub mod telemetry_ingest;
