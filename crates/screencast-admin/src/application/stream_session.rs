//! StreamSessionManager: keeps at most one screen stream running.
//!
//! # State machine
//!
//! ```text
//!            request_start(peer) ok
//!   Idle ─────────────────────────────► Active(peer)
//!    ▲                                      │
//!    │  request_stop: join worker,          │ request_start(other) while the
//!    │  release stream, send "stop"         │ worker is alive → AlreadyActive
//!    └──────────────────────────────────────┘
//! ```
//!
//! Every transition runs while holding the session lock, including the
//! blocking join of the stream worker.  A stop therefore releases the old
//! stream before any later start can acquire a new one, and the transport
//! never has two streams open at once.
//!
//! Switching senders is an explicit `request_stop` followed by
//! `request_start`; starting while active is rejected rather than silently
//! replacing the running stream.
//!
//! # Failure policy
//!
//! - A failed start rolls back whatever was acquired and leaves the session
//!   `Idle`.
//! - A stop always completes locally.  Failure to deliver `stop` to the
//!   sender is reported in the [`StopReport`] but does not keep the session
//!   active.
//! - A stream whose worker exited by itself (sender closed the media
//!   connection, transport error) is reaped on the next start.
//! - A start cancelled at an await point leaves what it acquired in the
//!   session.  The next start, stop or shutdown joins it before doing
//!   anything else.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use screencast_core::{ControlMessage, MediaTransport, StreamWorker, TransportError};
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::control::{ControlError, ControlSender};
use super::manage_senders::SenderRecord;

const WORKER_THREAD_NAME: &str = "screencast-rx";

/// Error type for session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The local stream could not be opened or its worker could not start.
    #[error("failed to open media stream: {0}")]
    Transport(#[from] TransportError),

    /// The sender did not receive the `start` command; the local stream was
    /// rolled back.
    #[error("failed to deliver start to {peer}: {source}")]
    Control {
        peer: IpAddr,
        #[source]
        source: ControlError,
    },

    /// Shutdown did not finish within its time budget.
    #[error("session shutdown timed out after {0:?}")]
    ShutdownTimedOut(Duration),
}

/// Static settings for the session manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Port of the media endpoint each sender's stream is bound to.
    pub media_port: u16,
    /// Upper bound on the stop performed during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            media_port: screencast_core::protocol::DEFAULT_MEDIA_PORT,
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}

/// Externally visible session state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Active { peer: SenderRecord, session_id: Uuid },
}

impl SessionState {
    /// The address of the streaming sender, if any.
    pub fn active_peer(&self) -> Option<IpAddr> {
        match self {
            SessionState::Idle => None,
            SessionState::Active { peer, .. } => Some(peer.address),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SessionState::Idle)
    }
}

/// Result of a start request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// The stream is running and the sender acknowledged delivery of `start`.
    Started { session_id: Uuid },
    /// A stream is already running; nothing was changed.
    AlreadyActive { current: IpAddr },
}

/// Details of a completed stop.
#[derive(Debug)]
pub struct StopReport {
    pub peer: IpAddr,
    pub session_id: Uuid,
    /// How the local stream ended.  An error here means the stream had
    /// already failed before it was asked to stop.
    pub stream_result: Result<(), TransportError>,
    /// Whether `stop` reached the sender.
    pub notify_result: Result<(), ControlError>,
}

/// Result of a stop request.
#[derive(Debug)]
pub enum StopOutcome {
    /// The session was idle.
    NothingToStop,
    /// The stream was torn down; see the report for remote delivery.
    Stopped(StopReport),
}

/// The running stream.  Owning the worker means owning the stream: the
/// worker holds the transport handle and releases it when joined.
struct ActiveStream {
    peer: SenderRecord,
    session_id: Uuid,
    worker: StreamWorker,
}

#[derive(Default)]
struct Session {
    active: Option<ActiveStream>,
    /// Stream being opened on the blocking pool.
    opening: Option<JoinHandle<Result<StreamWorker, TransportError>>>,
    /// Stream opened and waiting for `start` to be delivered.
    delivering: Option<StreamWorker>,
}

impl Session {
    /// Joins whatever an interrupted start left behind.
    async fn release_interrupted(&mut self) {
        if let Some(task) = self.opening.take() {
            if let Ok(Ok(worker)) = task.await {
                self.delivering = Some(worker);
            }
        }
        if let Some(worker) = self.delivering.take() {
            let peer = worker.peer();
            let result = join_worker(worker).await;
            warn!(%peer, ?result, "released stream left by an interrupted start");
        }
    }
}

/// Orchestrates start/stop of the single admin-side stream.
pub struct StreamSessionManager {
    session: Mutex<Session>,
    transport: Arc<dyn MediaTransport>,
    control: Arc<dyn ControlSender>,
    config: SessionConfig,
}

impl StreamSessionManager {
    pub fn new(
        transport: Arc<dyn MediaTransport>,
        control: Arc<dyn ControlSender>,
        config: SessionConfig,
    ) -> Self {
        Self {
            session: Mutex::new(Session::default()),
            transport,
            control,
            config,
        }
    }

    /// Returns the current state.  Waits for any in-flight transition.
    pub async fn state(&self) -> SessionState {
        let session = self.session.lock().await;
        match &session.active {
            None => SessionState::Idle,
            Some(active) => SessionState::Active {
                peer: active.peer.clone(),
                session_id: active.session_id,
            },
        }
    }

    /// Starts streaming from `peer`.
    ///
    /// Opens the local stream bound to the peer's media endpoint, spawns the
    /// worker, then delivers `start` to the peer.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Transport`] if the stream cannot be opened and
    /// [`SessionError::Control`] if `start` cannot be delivered.  The session
    /// is `Idle` after either error.
    pub async fn request_start(&self, peer: &SenderRecord) -> Result<StartOutcome, SessionError> {
        let mut session = self.session.lock().await;
        session.release_interrupted().await;

        if let Some(active) = &session.active {
            if active.worker.is_alive() {
                info!(
                    current = %active.peer.address,
                    requested = %peer.address,
                    "stream already active; stop it before starting another"
                );
                return Ok(StartOutcome::AlreadyActive {
                    current: active.peer.address,
                });
            }
        }

        if let Some(stale) = session.active.take() {
            let result = join_worker(stale.worker).await;
            warn!(
                session_id = %stale.session_id,
                peer = %stale.peer.address,
                ?result,
                "reaped stream that ended on its own"
            );
        }

        let session_id = Uuid::new_v4();
        let media = SocketAddr::new(peer.address, self.config.media_port);

        let transport = Arc::clone(&self.transport);
        let opening = session.opening.insert(tokio::task::spawn_blocking(
            move || -> Result<StreamWorker, TransportError> {
                let stream = transport.begin(media)?;
                StreamWorker::spawn(stream, WORKER_THREAD_NAME)
            },
        ));
        let opened = opening.await.unwrap_or(Err(TransportError::WorkerPanicked));
        session.opening = None;
        session.delivering = Some(opened?);
        debug!(%session_id, %media, "local stream open; sending start");

        if let Err(source) = self.control.send(peer.address, ControlMessage::Start).await {
            warn!(%session_id, peer = %peer.address, "start not delivered, rolling back: {source}");
            if let Some(worker) = session.delivering.take() {
                if let Err(e) = join_worker(worker).await {
                    debug!(%session_id, "rolled-back stream ended with: {e}");
                }
            }
            return Err(SessionError::Control {
                peer: peer.address,
                source,
            });
        }

        info!(%session_id, peer = %peer.address, "stream started");
        session.active = session.delivering.take().map(|worker| ActiveStream {
            peer: peer.clone(),
            session_id,
            worker,
        });
        Ok(StartOutcome::Started { session_id })
    }

    /// Stops the active stream, if any.
    ///
    /// The worker is joined before `stop` is sent, so the local stream is
    /// fully released whatever happens on the network.
    pub async fn request_stop(&self) -> StopOutcome {
        let mut session = self.session.lock().await;
        session.release_interrupted().await;

        let Some(active) = session.active.take() else {
            info!("no stream to stop");
            return StopOutcome::NothingToStop;
        };

        let ActiveStream {
            peer,
            session_id,
            worker,
        } = active;

        let stream_result = join_worker(worker).await;
        if let Err(e) = &stream_result {
            warn!(%session_id, peer = %peer.address, "stream had failed before stop: {e}");
        }

        let notify_result = self.control.send(peer.address, ControlMessage::Stop).await;
        match &notify_result {
            Ok(()) => info!(%session_id, peer = %peer.address, "stream stopped"),
            Err(e) => warn!(
                %session_id,
                peer = %peer.address,
                "stream stopped locally; sender not notified: {e}"
            ),
        }

        StopOutcome::Stopped(StopReport {
            peer: peer.address,
            session_id,
            stream_result,
            notify_result,
        })
    }

    /// Stops any active stream, bounded by the configured shutdown timeout.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::ShutdownTimedOut`] if the stop did not finish
    /// in time.  The worker still releases its stream in the background.
    pub async fn shutdown(&self) -> Result<StopOutcome, SessionError> {
        let budget = self.config.shutdown_timeout;
        tokio::time::timeout(budget, self.request_stop())
            .await
            .map_err(|_| SessionError::ShutdownTimedOut(budget))
    }
}

/// Stops and joins a worker without blocking the async runtime.
async fn join_worker(worker: StreamWorker) -> Result<(), TransportError> {
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .unwrap_or(Err(TransportError::WorkerPanicked))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{mock, predicate::eq, Sequence};
    use screencast_core::transport::recording::RecordingTransport;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio_test::{assert_err, assert_ok};

    mock! {
        Control {}

        #[async_trait::async_trait]
        impl ControlSender for Control {
            async fn send(&self, peer: IpAddr, message: ControlMessage) -> Result<(), ControlError>;
        }
    }

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    fn media(s: &str) -> SocketAddr {
        SocketAddr::new(ip(s), SessionConfig::default().media_port)
    }

    fn refused(peer: IpAddr) -> ControlError {
        ControlError::Connect {
            addr: SocketAddr::new(peer, 7777),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
    }

    fn accepting_control() -> MockControl {
        let mut control = MockControl::new();
        control.expect_send().returning(|_, _| Ok(()));
        control
    }

    fn manager(transport: &RecordingTransport, control: MockControl) -> StreamSessionManager {
        StreamSessionManager::new(
            Arc::new(transport.clone()),
            Arc::new(control),
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_new_manager_is_idle() {
        let mgr = manager(&RecordingTransport::new(), MockControl::new());
        assert!(mgr.state().await.is_idle());
    }

    #[tokio::test]
    async fn test_start_sends_start_and_becomes_active() {
        // Arrange
        let transport = RecordingTransport::new();
        let mut control = MockControl::new();
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Start))
            .times(1)
            .returning(|_, _| Ok(()));
        let mgr = manager(&transport, control);

        // Act
        let outcome = assert_ok!(mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await);

        // Assert
        assert!(matches!(outcome, StartOutcome::Started { .. }));
        assert_eq!(mgr.state().await.active_peer(), Some(ip("10.0.0.5")));
        assert_eq!(transport.begins(), vec![media("10.0.0.5")]);
    }

    #[tokio::test]
    async fn test_start_while_active_is_rejected_without_side_effects() {
        // Arrange
        let transport = RecordingTransport::new();
        let mut control = MockControl::new();
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Start))
            .times(1)
            .returning(|_, _| Ok(()));
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Stop))
            .times(1)
            .returning(|_, _| Ok(()));
        let mgr = manager(&transport, control);
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();

        // Act
        let outcome = mgr
            .request_start(&SenderRecord::new(ip("10.0.0.6")))
            .await
            .unwrap();

        // Assert
        assert_eq!(
            outcome,
            StartOutcome::AlreadyActive {
                current: ip("10.0.0.5")
            }
        );
        assert_eq!(mgr.state().await.active_peer(), Some(ip("10.0.0.5")));
        assert_eq!(transport.begin_count(), 1);

        // The original stream is the only one ever ended.
        mgr.request_stop().await;
        assert!(mgr.state().await.is_idle());
        assert_eq!(transport.ends(), vec![media("10.0.0.5")]);
    }

    #[tokio::test]
    async fn test_start_other_peer_after_stop_begins_once_for_it() {
        // Arrange
        let transport = RecordingTransport::new();
        let mgr = manager(&transport, accepting_control());
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();
        mgr.request_stop().await;

        // Act
        let outcome = mgr
            .request_start(&SenderRecord::new(ip("10.0.0.6")))
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, StartOutcome::Started { .. }));
        assert_eq!(mgr.state().await.active_peer(), Some(ip("10.0.0.6")));
        assert_eq!(transport.begins(), vec![media("10.0.0.5"), media("10.0.0.6")]);
        assert_eq!(transport.max_concurrent_open(), 1);
    }

    #[tokio::test]
    async fn test_stop_from_idle_is_a_noop() {
        // Arrange: any control call would panic the mock
        let transport = RecordingTransport::new();
        let mgr = manager(&transport, MockControl::new());

        // Act
        let first = mgr.request_stop().await;
        let second = mgr.request_stop().await;

        // Assert
        assert!(matches!(first, StopOutcome::NothingToStop));
        assert!(matches!(second, StopOutcome::NothingToStop));
        assert!(transport.events().is_empty());
    }

    #[tokio::test]
    async fn test_stop_joins_worker_before_notifying_sender() {
        // Arrange
        let transport = RecordingTransport::new();
        let observer = transport.clone();
        let mut seq = Sequence::new();
        let mut control = MockControl::new();
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Start))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Stop))
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _| {
                // The local stream must already be released when stop goes out.
                assert_eq!(observer.open_count(), 0);
                Ok(())
            });
        let mgr = manager(&transport, control);
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();

        // Act
        let outcome = mgr.request_stop().await;

        // Assert
        let StopOutcome::Stopped(report) = outcome else {
            panic!("expected Stopped");
        };
        assert_eq!(report.peer, ip("10.0.0.5"));
        assert_ok!(report.stream_result);
        assert_ok!(report.notify_result);
        assert!(mgr.state().await.is_idle());
        assert_eq!(transport.end_count(), 1);
    }

    #[tokio::test]
    async fn test_stop_with_unreachable_peer_still_releases_stream() {
        // Arrange
        let transport = RecordingTransport::new();
        let mut control = MockControl::new();
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Start))
            .returning(|_, _| Ok(()));
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Stop))
            .returning(|peer, _| Err(refused(peer)));
        let mgr = manager(&transport, control);
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();

        // Act
        let outcome = mgr.request_stop().await;

        // Assert
        let StopOutcome::Stopped(report) = outcome else {
            panic!("expected Stopped");
        };
        assert_err!(report.notify_result);
        assert!(mgr.state().await.is_idle());
        assert_eq!(transport.open_count(), 0);
        assert_eq!(transport.end_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_start_delivery_rolls_back_stream() {
        // Arrange
        let transport = RecordingTransport::new();
        let mut control = MockControl::new();
        control
            .expect_send()
            .with(eq(ip("10.0.0.5")), eq(ControlMessage::Start))
            .times(1)
            .returning(|peer, _| Err(refused(peer)));
        let mgr = manager(&transport, control);

        // Act
        let result = mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await;

        // Assert
        assert!(matches!(result, Err(SessionError::Control { peer, .. }) if peer == ip("10.0.0.5")));
        assert!(mgr.state().await.is_idle());
        assert_eq!(transport.begin_count(), 1);
        assert_eq!(transport.end_count(), 1);
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_transport_begin_sends_nothing() {
        // Arrange: the mock has no expectations, so any send would panic
        let transport = RecordingTransport::new();
        transport.fail_next_begin();
        let mgr = manager(&transport, MockControl::new());

        // Act
        let result = mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await;

        // Assert
        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert!(mgr.state().await.is_idle());
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_dead_stream_is_reaped_on_next_start() {
        // Arrange: the first stream dies immediately after starting
        let transport = RecordingTransport::new();
        transport.set_pump_fails(true);
        let mgr = manager(&transport, accepting_control());
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();
        assert!(transport.wait_for_ends(1, Duration::from_secs(2)));
        // Let the worker thread finish after ending its stream.
        tokio::time::sleep(Duration::from_millis(50)).await;
        transport.set_pump_fails(false);

        // Act
        let outcome = mgr
            .request_start(&SenderRecord::new(ip("10.0.0.6")))
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, StartOutcome::Started { .. }));
        assert_eq!(mgr.state().await.active_peer(), Some(ip("10.0.0.6")));
        assert_eq!(transport.max_concurrent_open(), 1);
    }

    /// Never completes the first `start`; every later call succeeds.
    #[derive(Default)]
    struct StallFirstStart(AtomicBool);

    #[async_trait::async_trait]
    impl ControlSender for StallFirstStart {
        async fn send(&self, _: IpAddr, message: ControlMessage) -> Result<(), ControlError> {
            if message == ControlMessage::Start && !self.0.swap(true, Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn stalling_manager(transport: &RecordingTransport) -> StreamSessionManager {
        StreamSessionManager::new(
            Arc::new(transport.clone()),
            Arc::new(StallFirstStart::default()),
            SessionConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_cancelled_start_is_released_before_next_start() {
        // Arrange: the first start is abandoned while `start` is in flight
        let transport = RecordingTransport::new();
        let mgr = stalling_manager(&transport);
        let cancelled = tokio::time::timeout(
            Duration::from_millis(200),
            mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))),
        )
        .await;
        assert!(cancelled.is_err());

        // Act
        let outcome = mgr
            .request_start(&SenderRecord::new(ip("10.0.0.6")))
            .await
            .unwrap();

        // Assert
        assert!(matches!(outcome, StartOutcome::Started { .. }));
        assert_eq!(transport.ends(), vec![media("10.0.0.5")]);
        assert_eq!(transport.max_concurrent_open(), 1);
        mgr.request_stop().await;
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_releases_cancelled_start() {
        // Arrange
        let transport = RecordingTransport::new();
        let mgr = stalling_manager(&transport);
        let cancelled = tokio::time::timeout(
            Duration::from_millis(200),
            mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))),
        )
        .await;
        assert!(cancelled.is_err());

        // Act
        let outcome = assert_ok!(mgr.shutdown().await);

        // Assert
        assert!(matches!(outcome, StopOutcome::NothingToStop));
        assert_eq!(transport.open_count(), 0);
        assert_eq!(transport.end_count(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_active_stream() {
        let transport = RecordingTransport::new();
        let mgr = manager(&transport, accepting_control());
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();

        let outcome = assert_ok!(mgr.shutdown().await);

        assert!(matches!(outcome, StopOutcome::Stopped(_)));
        assert_eq!(transport.open_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_on_hung_peer() {
        // Arrange: stop delivery never completes
        struct HangingControl;

        #[async_trait::async_trait]
        impl ControlSender for HangingControl {
            async fn send(&self, _: IpAddr, message: ControlMessage) -> Result<(), ControlError> {
                if message == ControlMessage::Stop {
                    std::future::pending::<()>().await;
                }
                Ok(())
            }
        }

        let transport = RecordingTransport::new();
        let mgr = StreamSessionManager::new(
            Arc::new(transport.clone()),
            Arc::new(HangingControl),
            SessionConfig {
                shutdown_timeout: Duration::from_millis(200),
                ..SessionConfig::default()
            },
        );
        mgr.request_start(&SenderRecord::new(ip("10.0.0.5"))).await.unwrap();

        // Act
        let result = mgr.shutdown().await;

        // Assert: bounded, and the local stream was still released
        assert!(matches!(result, Err(SessionError::ShutdownTimedOut(_))));
        assert_eq!(transport.open_count(), 0);
    }
}
