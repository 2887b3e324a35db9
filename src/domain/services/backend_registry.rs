//! Backend Registry
//!
//! Ordered, deduplicated collection of registered backends. Position 0 is
//! always the preferred routing target; failed backends are rotated to
//! the back instead of being forgotten.

use crate::domain::entities::{BackendEntry, Envelope};
use crate::domain::ports::BackendSender;
use crate::domain::value_objects::{BackendAddress, BackendList};
use parking_lot::RwLock;

/// Process-lifetime registry of backends.
///
/// Every mutation takes the write lock, so two registrations or demotions
/// never interleave. Reads clone under the read lock and never hand out
/// references to live entries.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    entries: RwLock<Vec<BackendEntry>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `address`, or revive it if already known.
    ///
    /// A known address keeps its position. Returns the snapshot taken
    /// right after the change.
    pub fn register(&self, address: BackendAddress) -> BackendList {
        let mut entries = self.entries.write();
        match entries.iter().position(|e| e.address == address) {
            Some(pos) => {
                entries[pos].alive = true;
                tracing::debug!("backend {} re-registered", address);
            }
            None => {
                tracing::info!("backend {} registered", address);
                entries.push(BackendEntry::new(address));
            }
        }
        Self::addresses(&entries)
    }

    /// Ordered copy of the registered addresses.
    pub fn snapshot(&self) -> BackendList {
        Self::addresses(&self.entries.read())
    }

    /// Ordered copy of the entries, liveness included.
    pub fn entries(&self) -> Vec<BackendEntry> {
        self.entries.read().clone()
    }

    /// Address at position 0, dead or alive.
    pub fn preferred(&self) -> Option<BackendAddress> {
        self.entries.read().first().map(|e| e.address.clone())
    }

    /// Liveness of `address`, or `None` if it was never registered.
    pub fn is_alive(&self, address: &BackendAddress) -> Option<bool> {
        self.entries
            .read()
            .iter()
            .find(|e| &e.address == address)
            .map(|e| e.alive)
    }

    pub fn mark_alive(&self, address: &BackendAddress) {
        self.set_alive(address, true);
    }

    pub fn mark_dead(&self, address: &BackendAddress) {
        self.set_alive(address, false);
    }

    /// Move `address` to the end, keeping everyone else's relative order.
    pub fn demote(&self, address: &BackendAddress) {
        let mut entries = self.entries.write();
        if let Some(pos) = entries.iter().position(|e| &e.address == address) {
            let entry = entries.remove(pos);
            entries.push(entry);
            tracing::debug!("backend {} demoted from position {}", address, pos);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Push `list` to every registered backend as an `actualizarS`.
    ///
    /// Best effort: an unreachable backend is logged and skipped. Returns
    /// how many backends accepted the push.
    pub async fn broadcast_update(&self, list: &BackendList, sender: &dyn BackendSender) -> usize {
        let envelope = Envelope::update(list.clone());
        let targets = self.snapshot();
        let mut delivered = 0;

        for address in &targets {
            match sender.push(address, &envelope).await {
                Ok(()) => delivered += 1,
                Err(e) => tracing::warn!("backend list update to {} failed: {}", address, e),
            }
        }

        tracing::debug!(
            "backend list update delivered to {}/{} backends",
            delivered,
            targets.len()
        );
        delivered
    }

    fn set_alive(&self, address: &BackendAddress, alive: bool) {
        let mut entries = self.entries.write();
        if let Some(entry) = entries.iter_mut().find(|e| &e.address == address) {
            entry.alive = alive;
        }
    }

    fn addresses(entries: &[BackendEntry]) -> BackendList {
        entries.iter().map(|e| e.address.clone()).collect::<Vec<_>>().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::{AttemptError, SendError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    fn addr(port: u16) -> BackendAddress {
        BackendAddress::new("127.0.0.1", port)
    }

    /// Records pushes; addresses in `unreachable` fail.
    #[derive(Default)]
    struct RecordingSender {
        unreachable: Vec<BackendAddress>,
        pushed: Mutex<Vec<(BackendAddress, Envelope)>>,
    }

    #[async_trait]
    impl BackendSender for RecordingSender {
        async fn send(
            &self,
            _address: &BackendAddress,
            _envelope: &Envelope,
        ) -> Result<Envelope, SendError> {
            Ok(Envelope::ack())
        }

        async fn push(
            &self,
            address: &BackendAddress,
            envelope: &Envelope,
        ) -> Result<(), AttemptError> {
            if self.unreachable.contains(address) {
                return Err(AttemptError::ConnectTimeout(Duration::from_secs(1)));
            }
            self.pushed.lock().push((address.clone(), envelope.clone()));
            Ok(())
        }
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = BackendRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.preferred().is_none());
        assert!(registry.snapshot().is_empty());
    }

    #[test]
    fn test_register_appends_in_order() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        let list = registry.register(addr(9002));

        assert_eq!(list.into_inner(), vec![addr(9001), addr(9002)]);
        assert_eq!(registry.preferred(), Some(addr(9001)));
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        registry.register(addr(9002));
        let list = registry.register(addr(9001));

        assert_eq!(list.len(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_reregister_revives_without_moving() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        registry.register(addr(9002));

        registry.mark_dead(&addr(9001));
        registry.demote(&addr(9001));
        assert_eq!(registry.is_alive(&addr(9001)), Some(false));

        registry.register(addr(9001));
        assert_eq!(registry.is_alive(&addr(9001)), Some(true));
        assert_eq!(
            registry.snapshot().into_inner(),
            vec![addr(9002), addr(9001)]
        );
    }

    #[test]
    fn test_preferred_matches_snapshot_head() {
        let registry = BackendRegistry::new();
        for port in [9001, 9002, 9003] {
            registry.register(addr(port));
        }
        registry.demote(&addr(9001));
        registry.demote(&addr(9003));

        let snapshot = registry.snapshot();
        assert_eq!(registry.preferred().as_ref(), snapshot.first());
        assert_eq!(registry.preferred(), Some(addr(9002)));
    }

    #[test]
    fn test_preferred_ignores_liveness() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        registry.register(addr(9002));
        registry.mark_dead(&addr(9001));

        assert_eq!(registry.preferred(), Some(addr(9001)));
    }

    #[test]
    fn test_demote_moves_to_back_preserving_others() {
        let registry = BackendRegistry::new();
        for port in [9001, 9002, 9003, 9004] {
            registry.register(addr(port));
        }

        registry.demote(&addr(9002));

        assert_eq!(
            registry.snapshot().into_inner(),
            vec![addr(9001), addr(9003), addr(9004), addr(9002)]
        );
    }

    #[test]
    fn test_demote_last_is_noop_on_order() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        registry.register(addr(9002));
        registry.demote(&addr(9002));

        assert_eq!(
            registry.snapshot().into_inner(),
            vec![addr(9001), addr(9002)]
        );
    }

    #[test]
    fn test_unknown_address_operations_are_noops() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));

        registry.demote(&addr(1));
        registry.mark_dead(&addr(1));
        registry.mark_alive(&addr(1));

        assert_eq!(registry.snapshot().into_inner(), vec![addr(9001)]);
        assert_eq!(registry.is_alive(&addr(1)), None);
        assert_eq!(registry.is_alive(&addr(9001)), Some(true));
    }

    #[test]
    fn test_mark_alive_and_dead() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));

        registry.mark_dead(&addr(9001));
        assert_eq!(registry.is_alive(&addr(9001)), Some(false));

        registry.mark_alive(&addr(9001));
        assert_eq!(registry.is_alive(&addr(9001)), Some(true));
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));

        let snapshot = registry.snapshot();
        registry.register(addr(9002));
        registry.demote(&addr(9001));

        assert_eq!(snapshot.into_inner(), vec![addr(9001)]);
    }

    #[test]
    fn test_entries_report_liveness() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        registry.register(addr(9002));
        registry.mark_dead(&addr(9002));

        let entries = registry.entries();
        assert!(entries[0].alive);
        assert!(!entries[1].alive);
    }

    #[test]
    fn test_concurrent_registration_never_duplicates() {
        let registry = Arc::new(BackendRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for port in 0..50u16 {
                        registry.register(addr(9000 + port));
                        if port % 7 == i {
                            registry.demote(&addr(9000 + port));
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let mut ports: Vec<u16> = registry.snapshot().iter().map(|a| a.port).collect();
        assert_eq!(ports.len(), 50);
        ports.sort_unstable();
        ports.dedup();
        assert_eq!(ports.len(), 50);
    }

    #[tokio::test]
    async fn test_broadcast_update_pushes_to_every_backend() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        let list = registry.register(addr(9002));

        let sender = RecordingSender::default();
        let delivered = registry.broadcast_update(&list, &sender).await;

        assert_eq!(delivered, 2);
        let pushed = sender.pushed.lock();
        assert_eq!(pushed.len(), 2);
        for (_, envelope) in pushed.iter() {
            assert_eq!(envelope, &Envelope::update(list.clone()));
        }
    }

    #[tokio::test]
    async fn test_broadcast_update_skips_unreachable() {
        let registry = BackendRegistry::new();
        registry.register(addr(9001));
        registry.register(addr(9002));
        let list = registry.register(addr(9003));

        let sender = RecordingSender {
            unreachable: vec![addr(9002)],
            ..Default::default()
        };
        let delivered = registry.broadcast_update(&list, &sender).await;

        assert_eq!(delivered, 2);
        let targets: Vec<_> = sender.pushed.lock().iter().map(|(a, _)| a.clone()).collect();
        assert_eq!(targets, vec![addr(9001), addr(9003)]);
        // Failed pushes never touch ordering
        assert_eq!(registry.snapshot(), list);
    }
}
