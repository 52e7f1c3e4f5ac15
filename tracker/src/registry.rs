use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use log::{debug, trace};
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};

/// Membership registry: one expiring entry per miner port.
///
/// A register renews the caller's entry for `entry_timeout`; a miner that
/// stops renewing disappears from the live set within one timeout period.
/// Expired entries are skipped on every access and removed by a periodic
/// sweep, both atomic with respect to other operations through the mutex.
pub struct Registry {
    // port -> expiration deadline
    entries: Mutex<BTreeMap<u16, Instant>>,
    entry_timeout: Duration,
    // test-harness switch: answer register with the caller's parity class only
    partitioned: AtomicBool,
}

impl Registry {
    pub fn new(entry_timeout: Duration) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            entry_timeout,
            partitioned: AtomicBool::new(false),
        }
    }

    /// Renew (or create) the entry for `port` and return the live set,
    /// caller included. Idempotent on duplicate registrations.
    pub async fn register(&self, port: u16) -> Vec<u16> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        purge(&mut entries, now);
        entries.insert(port, now + self.entry_timeout);
        trace!("registered miner on port {}", port);

        let partitioned = self.partitioned.load(Ordering::SeqCst);
        entries
            .keys()
            .copied()
            .filter(|peer| !partitioned || peer % 2 == port % 2)
            .collect()
    }

    /// All currently-live ports.
    pub async fn live_ports(&self) -> Vec<u16> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        purge(&mut entries, now);
        entries.keys().copied().collect()
    }

    pub fn set_partitioned(&self, enabled: bool) {
        self.partitioned.store(enabled, Ordering::SeqCst);
        debug!("partition mode set to {}", enabled);
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioned.load(Ordering::SeqCst)
    }

    async fn sweep(&self) {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        purge(&mut entries, now);
    }

    /// Background purge so dead entries do not linger between queries.
    pub fn start_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                registry.sweep().await;
            }
        })
    }
}

fn purge(entries: &mut BTreeMap<u16, Instant>, now: Instant) {
    entries.retain(|port, deadline| {
        let live = *deadline > now;
        if !live {
            debug!("entry for miner {} expired", port);
        }
        live
    });
}
