mod backend_sender;
mod health_probe;

pub use backend_sender::BackendSender;
pub use health_probe::HealthProbe;
