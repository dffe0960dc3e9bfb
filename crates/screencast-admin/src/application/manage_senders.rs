//! SenderRegistry: the admin's list of every sender that has announced itself.
//!
//! Each entry is keyed by the sender's IP address.  The list is kept in
//! first-seen order because that is the order the operator sees it in; a
//! repeated beacon only refreshes `last_seen_at` and never moves an entry.
//!
//! # Concurrency
//!
//! The discovery listener thread is the only writer.  The console and the
//! session manager read concurrently, so the list sits behind an `RwLock` and
//! every read returns an owned snapshot.  Writers publish a [`RegistryEvent`]
//! on a broadcast channel after the lock is released.
//!
//! # Expiry
//!
//! By default senders are never removed.  With an expiry configured,
//! [`SenderRegistry::prune_stale`] drops entries whose last beacon is older
//! than the expiry.

use std::net::IpAddr;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 64;

/// A sender known to the admin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderRecord {
    /// Source IP of the sender's beacons; the record's identity.
    pub address: IpAddr,
    /// When the first beacon from this address arrived.
    pub first_seen_at: Instant,
    /// When the most recent beacon from this address arrived.
    pub last_seen_at: Instant,
}

impl SenderRecord {
    /// Creates a record first seen now.
    pub fn new(address: IpAddr) -> Self {
        Self::seen_at(address, Instant::now())
    }

    pub fn seen_at(address: IpAddr, at: Instant) -> Self {
        Self {
            address,
            first_seen_at: at,
            last_seen_at: at,
        }
    }
}

/// Change notification published by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    /// A beacon arrived from an address not yet in the registry.
    SenderDiscovered(SenderRecord),
    /// A sender was pruned after its beacons stopped.
    SenderExpired(IpAddr),
}

/// Result of recording one beacon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// The address was appended to the registry.
    New,
    /// The address was already known; `last_seen_at` was refreshed.
    Refreshed,
}

/// Ordered, de-duplicated registry of known senders.
pub struct SenderRegistry {
    senders: RwLock<Vec<SenderRecord>>,
    expiry: Option<Duration>,
    events: broadcast::Sender<RegistryEvent>,
}

impl Default for SenderRegistry {
    fn default() -> Self {
        Self::with_expiry(None)
    }
}

impl SenderRegistry {
    /// Creates a registry that never expires senders.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry that forgets senders silent for longer than
    /// `expiry`.  `None` keeps every sender for the process lifetime.
    pub fn with_expiry(expiry: Option<Duration>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            senders: RwLock::new(Vec::new()),
            expiry,
            events,
        }
    }

    /// Records a beacon from `address` received now.
    pub fn observe(&self, address: IpAddr) -> Observation {
        self.observe_at(address, Instant::now())
    }

    /// Records a beacon from `address` received at `now`.
    pub fn observe_at(&self, address: IpAddr, now: Instant) -> Observation {
        let discovered = {
            let mut senders = self.senders.write().unwrap_or_else(|e| e.into_inner());
            if let Some(existing) = senders.iter_mut().find(|s| s.address == address) {
                existing.last_seen_at = now;
                None
            } else {
                let record = SenderRecord::seen_at(address, now);
                senders.push(record.clone());
                Some(record)
            }
        };

        match discovered {
            Some(record) => {
                // No subscribers is fine; the registry itself is the source of truth.
                let _ = self.events.send(RegistryEvent::SenderDiscovered(record));
                Observation::New
            }
            None => Observation::Refreshed,
        }
    }

    /// Removes senders whose last beacon is older than the configured expiry.
    ///
    /// Returns the removed addresses.  Always empty when no expiry is set.
    pub fn prune_stale(&self, now: Instant) -> Vec<IpAddr> {
        let Some(expiry) = self.expiry else {
            return Vec::new();
        };

        let removed: Vec<IpAddr> = {
            let mut senders = self.senders.write().unwrap_or_else(|e| e.into_inner());
            let (keep, stale): (Vec<_>, Vec<_>) = senders
                .drain(..)
                .partition(|s| now.saturating_duration_since(s.last_seen_at) <= expiry);
            *senders = keep;
            stale.into_iter().map(|s| s.address).collect()
        };

        for address in &removed {
            let _ = self.events.send(RegistryEvent::SenderExpired(*address));
        }
        removed
    }

    /// Snapshot of all senders in first-seen order.
    pub fn snapshot(&self) -> Vec<SenderRecord> {
        self.senders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Addresses of all senders in first-seen order.
    pub fn addresses(&self) -> Vec<IpAddr> {
        self.snapshot().into_iter().map(|s| s.address).collect()
    }

    /// Returns the sender at display position `index` (zero-based).
    pub fn get(&self, index: usize) -> Option<SenderRecord> {
        self.senders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(index)
            .cloned()
    }

    /// Returns the sender with the given address.
    pub fn find(&self, address: IpAddr) -> Option<SenderRecord> {
        self.senders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|s| s.address == address)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.senders.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscribes to registry change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }
}
