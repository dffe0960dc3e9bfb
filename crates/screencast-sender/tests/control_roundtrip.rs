//! Integration tests: control commands over loopback TCP drive the agent.

use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use screencast_core::read_frame;
use screencast_core::transport::recording::{RecordingTransport, TransportEvent};
use screencast_sender::application::stream_agent::StreamAgent;
use screencast_sender::infrastructure::media::TcpMediaPusher;
use screencast_sender::infrastructure::network::control_listener::ControlListener;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

struct Harness {
    control: SocketAddr,
    agent: Arc<StreamAgent>,
    running: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl Harness {
    async fn start(transport: Arc<dyn screencast_core::MediaTransport>, admin_media: SocketAddr) -> Self {
        let agent = Arc::new(StreamAgent::new(transport, admin_media));
        let listener = ControlListener::bind(
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&agent),
            Duration::from_secs(1),
        )
        .await
        .unwrap();
        let control = listener.local_addr();
        let running = Arc::new(AtomicBool::new(true));
        let task = tokio::spawn(listener.run(Arc::clone(&running)));
        Self {
            control,
            agent,
            running,
            task,
        }
    }

    /// Sends one token the way the admin does and gives the listener time to apply it.
    async fn send(&self, token: &[u8]) {
        let mut conn = TcpStream::connect(self.control).await.unwrap();
        conn.write_all(token).await.unwrap();
        conn.shutdown().await.unwrap();
        drop(conn);
        tokio::time::sleep(Duration::from_millis(150)).await;
    }

    async fn stop(self) {
        self.running.store(false, Ordering::Relaxed);
        self.task.await.unwrap();
        let agent = self.agent;
        tokio::task::spawn_blocking(move || agent.shutdown())
            .await
            .unwrap()
            .unwrap();
    }
}

fn admin_media() -> SocketAddr {
    "127.0.0.1:9999".parse().unwrap()
}

#[tokio::test]
async fn test_start_then_stop_begins_and_ends_once() {
    // Arrange
    let transport = RecordingTransport::new();
    let harness = Harness::start(Arc::new(transport.clone()), admin_media()).await;

    // Act
    harness.send(b"start").await;
    harness.send(b"stop").await;

    // Assert
    assert!(transport.wait_for_ends(1, Duration::from_secs(2)));
    assert_eq!(
        transport.events(),
        vec![
            TransportEvent::Begin(admin_media()),
            TransportEvent::End(admin_media())
        ]
    );
    harness.stop().await;
}

#[tokio::test]
async fn test_duplicate_start_is_ignored() {
    let transport = RecordingTransport::new();
    let harness = Harness::start(Arc::new(transport.clone()), admin_media()).await;

    harness.send(b"start").await;
    harness.send(b"start").await;

    assert_eq!(transport.begin_count(), 1);
    assert!(harness.agent.is_streaming());
    harness.stop().await;
    assert_eq!(transport.open_count(), 0);
}

#[tokio::test]
async fn test_unknown_token_changes_nothing() {
    let transport = RecordingTransport::new();
    let harness = Harness::start(Arc::new(transport.clone()), admin_media()).await;

    harness.send(b"pause").await;
    harness.send(b"").await;

    assert!(transport.events().is_empty());
    assert!(!harness.agent.is_streaming());
    harness.stop().await;
}

#[tokio::test]
async fn test_stop_before_start_is_harmless() {
    let transport = RecordingTransport::new();
    let harness = Harness::start(Arc::new(transport.clone()), admin_media()).await;

    harness.send(b"stop").await;
    harness.send(b"start\n").await;

    assert_eq!(transport.begin_count(), 1);
    harness.stop().await;
}

#[tokio::test]
async fn test_start_pushes_frames_to_admin_media_endpoint() {
    // Arrange: a plain listener stands in for the admin media endpoint
    let admin = StdTcpListener::bind("127.0.0.1:0").unwrap();
    let media = admin.local_addr().unwrap();
    let pusher = TcpMediaPusher::new(Duration::from_secs(1), 50, 64);
    let harness = Harness::start(Arc::new(pusher), media).await;

    // Act
    harness.send(b"start").await;
    let frames = tokio::task::spawn_blocking(move || {
        let (mut conn, _) = admin.accept().unwrap();
        (0..3)
            .map(|_| read_frame(&mut conn).unwrap().expect("frame"))
            .collect::<Vec<_>>()
    })
    .await
    .unwrap();

    // Assert
    assert_eq!(frames.len(), 3);
    assert!(frames.iter().all(|f| f.len() == 64));
    harness.send(b"stop").await;
    harness.stop().await;
}
