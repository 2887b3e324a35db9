//! Health Probe Port

use crate::domain::value_objects::BackendAddress;
use async_trait::async_trait;

/// Reachability check for a single backend.
///
/// Implementations must bound their own running time.
#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, address: &BackendAddress) -> bool;
}
