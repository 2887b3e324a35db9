//! Failover Proxy Library
//!
//! Backend registry with heartbeat liveness and failover delivery,
//! exposed for integration tests and embedding.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use adapters::inbound::TcpServer;
pub use adapters::outbound::{SenderConfig, TcpBackendSender};
pub use application::RegistryService;
pub use config::{load_config, Config, ConfigError};
pub use domain::entities::{BackendEntry, Envelope, Payload};
pub use domain::error::{AttemptError, CodecError, RouteError, SendError};
pub use domain::ports::{BackendSender, HealthProbe};
pub use domain::services::{BackendRegistry, FailoverRouter};
pub use domain::value_objects::{op, BackendAddress, BackendList};
pub use infrastructure::{HeartbeatConfig, HeartbeatScheduler, ShutdownController, TcpHealthProbe};
