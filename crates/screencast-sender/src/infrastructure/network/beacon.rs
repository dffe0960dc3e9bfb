//! Periodic UDP beacon toward the admin's discovery endpoint.
//!
//! The beacon is fire-and-forget: nothing is read back, and a failed send is
//! logged and retried on the next tick.  The first beacon goes out
//! immediately so a freshly started sender shows up without waiting a full
//! interval.
//!
//! # Shutdown
//!
//! Each wait for the next tick is bounded by a short poll so the `running`
//! flag is re-checked a few times per second, even with long intervals.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use screencast_core::BEACON_PAYLOAD;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

const FLAG_POLL: Duration = Duration::from_millis(200);

/// Error type for the beacon.
#[derive(Debug, Error)]
pub enum BeaconError {
    /// The local UDP socket could not be bound.
    #[error("failed to bind beacon socket on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
}

/// A bound beacon socket plus its schedule.
#[derive(Debug)]
pub struct Beacon {
    socket: UdpSocket,
    target: SocketAddr,
    period: Duration,
}

impl Beacon {
    /// Binds an ephemeral local UDP socket of the same address family as
    /// `target`.
    ///
    /// # Errors
    ///
    /// Returns [`BeaconError::BindFailed`] if the socket cannot be bound.
    pub async fn bind(target: SocketAddr, period: Duration) -> Result<Self, BeaconError> {
        let local: SocketAddr = match target {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)
            .await
            .map_err(|source| BeaconError::BindFailed { addr: local, source })?;
        Ok(Self {
            socket,
            target,
            period,
        })
    }

    /// Sends beacons every period until `running` is cleared.
    pub async fn run(self, running: Arc<AtomicBool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(target = %self.target, period = ?self.period, "beacon started");

        while running.load(Ordering::Relaxed) {
            if timeout(FLAG_POLL, ticker.tick()).await.is_err() {
                continue;
            }
            match self.socket.send_to(BEACON_PAYLOAD, self.target).await {
                Ok(_) => debug!(target = %self.target, "beacon sent"),
                Err(e) => warn!(target = %self.target, "beacon send failed: {e}"),
            }
        }

        info!("beacon stopped");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_beacon_is_sent_immediately() {
        // Arrange
        let admin = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let beacon = Beacon::bind(admin.local_addr().unwrap(), Duration::from_secs(60))
            .await
            .unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(beacon.run(Arc::clone(&running)));

        // Act
        let mut buf = [0u8; 64];
        let (len, _) = timeout(Duration::from_secs(2), admin.recv_from(&mut buf))
            .await
            .expect("beacon within 2s")
            .unwrap();

        // Assert
        assert_eq!(&buf[..len], BEACON_PAYLOAD);
        running.store(false, Ordering::Relaxed);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_beacons_repeat_every_period() {
        // Arrange
        let admin = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let beacon = Beacon::bind(admin.local_addr().unwrap(), Duration::from_millis(50))
            .await
            .unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(beacon.run(Arc::clone(&running)));

        // Act
        let mut buf = [0u8; 64];
        for _ in 0..3 {
            timeout(Duration::from_secs(2), admin.recv_from(&mut buf))
                .await
                .expect("repeated beacon")
                .unwrap();
        }

        // Assert: three beacons arrived; stopping is prompt
        running.store(false, Ordering::Relaxed);
        timeout(Duration::from_secs(1), task)
            .await
            .expect("beacon stops within a poll")
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_failure_does_not_stop_the_loop() {
        // Arrange: nothing listens on the target, sends may fail or vanish
        let target: SocketAddr = {
            let probe = UdpSocket::bind("127.0.0.1:0").await.unwrap();
            probe.local_addr().unwrap()
        };
        let beacon = Beacon::bind(target, Duration::from_millis(20)).await.unwrap();
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(beacon.run(Arc::clone(&running)));

        // Act
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Assert
        assert!(!task.is_finished());
        running.store(false, Ordering::Relaxed);
        task.await.unwrap();
    }
}
