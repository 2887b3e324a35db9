mod backend_registry;
mod failover_router;

pub use backend_registry::BackendRegistry;
pub use failover_router::FailoverRouter;
