//! Application Layer
//!
//! Use cases wiring the domain services to inbound requests.

mod registry_service;

pub use registry_service::RegistryService;
