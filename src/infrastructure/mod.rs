//! Infrastructure Layer
//!
//! Background tasks and process lifecycle.

pub mod health_checker;
pub mod shutdown;

pub use health_checker::{HeartbeatConfig, HeartbeatRound, HeartbeatScheduler, TcpHealthProbe};
pub use shutdown::{shutdown_signal, HandlerGuard, ShutdownController};
