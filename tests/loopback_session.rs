//! Integration tests for full sessions over loopback TCP
//!
//! These tests verify the complete pipeline including:
//! - Accepting one peer per channel
//! - Frame capture, encoding and decoding
//! - Input relay into the fake window system
//! - Teardown when either half stops

mod common;

use std::time::Duration;

use common::{fake_system, Event, FakeControl, ROOT};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;
use winrelay::client::{FrameCounter, ReconnectingClient};
use winrelay::config::Config;
use winrelay::desktop::{FrameCodec, JpegCodec};
use winrelay::network::{
    write_message, InputCommand, MessageReader, MAX_COMMAND_SIZE, MAX_FRAME_SIZE,
};
use winrelay::session::{CaptureStop, DispatchStop, SessionHost};
use winrelay::window::{RawImage, SharedWindowSystem, WindowHandle};

fn loopback_config() -> Config {
    let mut config = Config::default();
    config.network.bind_address = "127.0.0.1".to_string();
    config.network.server_address = "127.0.0.1".to_string();
    config.network.video_port = 0;
    config.network.input_port = 0;
    config.capture.frame_delay_ms = 10;
    config.input.focus_timeout_ms = 50;
    config.input.focus_poll_interval_ms = 5;
    config.client.reconnect_delay_ms = 50;
    config.client.connect_poll_ms = 10;
    config
}

fn shared_window() -> (SharedWindowSystem, FakeControl, WindowHandle) {
    let (system, control) = fake_system(1920, 1080);
    let window = control.add_window(ROOT, 0x80, Some("Shared"), (200, 100, 96, 64));
    (system, control, window)
}

async fn wait_for(control: &FakeControl, event: Event) {
    tokio::time::timeout(Duration::from_secs(10), async {
        while !control.events().contains(&event) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("event never observed");
}

#[tokio::test]
async fn test_stop_key_ends_session() {
    let (system, control, window) = shared_window();
    let host = SessionHost::bind(system, loopback_config()).await.unwrap();
    let video_addr = host.video_addr().unwrap();
    let input_addr = host.input_addr().unwrap();

    let (session, video, input) = tokio::join!(
        host.start(window),
        TcpStream::connect(video_addr),
        TcpStream::connect(input_addr)
    );
    let session = session.unwrap();
    let mut input = input.unwrap();

    let mut frames = MessageReader::new(video.unwrap(), MAX_FRAME_SIZE);
    for _ in 0..2 {
        let payload = frames.recv().await.unwrap();
        let image = image::load_from_memory(&payload).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (96, 64));
    }

    let click = InputCommand::Click {
        x: 10,
        y: 20,
        button: Default::default(),
    };
    write_message(&mut input, &click.to_json().unwrap())
        .await
        .unwrap();
    write_message(&mut input, br#"{"type":"key","key":"\u001b"}"#)
        .await
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(10), session.join())
        .await
        .unwrap();

    assert_eq!(report.window, window);
    assert_eq!(report.dispatch_stop, DispatchStop::StopKey);
    assert_eq!(report.capture_stop, CaptureStop::Cancelled);
    assert_eq!(report.commands_applied, 1);
    assert!(report.frames_sent >= 2);
    assert!(control.events().contains(&Event::Warp(210, 120)));
    assert!(!control
        .events()
        .iter()
        .any(|e| matches!(e, Event::Key(..))));
}

#[tokio::test]
async fn test_viewer_disconnect_ends_session() {
    let (system, _control, window) = shared_window();
    let host = SessionHost::bind(system, loopback_config()).await.unwrap();
    let video_addr = host.video_addr().unwrap();
    let input_addr = host.input_addr().unwrap();

    let (session, video, input) = tokio::join!(
        host.start(window),
        TcpStream::connect(video_addr),
        TcpStream::connect(input_addr)
    );
    let session = session.unwrap();
    drop(video.unwrap());
    drop(input.unwrap());

    let report = tokio::time::timeout(Duration::from_secs(10), session.join())
        .await
        .unwrap();
    // Either half may notice first
    assert!(matches!(
        report.dispatch_stop,
        DispatchStop::PeerClosed | DispatchStop::Cancelled
    ));
    assert!(matches!(
        report.capture_stop,
        CaptureStop::Cancelled | CaptureStop::SendFailed(_)
    ));
}

#[tokio::test]
async fn test_host_serves_consecutive_sessions() {
    let (system, _control, window) = shared_window();
    let host = SessionHost::bind(system, loopback_config()).await.unwrap();
    let video_addr = host.video_addr().unwrap();
    let input_addr = host.input_addr().unwrap();

    for _ in 0..2 {
        let (session, video, input) = tokio::join!(
            host.start(window),
            TcpStream::connect(video_addr),
            TcpStream::connect(input_addr)
        );
        let session = session.unwrap();
        let mut frames = MessageReader::new(video.unwrap(), MAX_FRAME_SIZE);
        frames.recv().await.unwrap();

        let report = session.shutdown().await;
        assert_eq!(report.capture_stop, CaptureStop::Cancelled);
        assert_eq!(report.dispatch_stop, DispatchStop::Cancelled);
        drop(input);
    }
}

#[tokio::test]
async fn test_reconnecting_client_relays_input() {
    let (system, control, window) = shared_window();
    let host = SessionHost::bind(system, loopback_config()).await.unwrap();

    let mut config = loopback_config();
    config.network.video_port = host.video_addr().unwrap().port();
    config.network.input_port = host.input_addr().unwrap().port();

    let counter = FrameCounter::new();
    let mut client = ReconnectingClient::new(config, counter.clone());
    let queue = client.input_queue();
    queue.click(5, 6, Default::default());

    let cancel = CancellationToken::new();
    let viewer = tokio::spawn({
        let cancel = cancel.clone();
        async move { client.run(cancel).await }
    });

    let session = host.start(window).await.unwrap();
    wait_for(&control, Event::Warp(205, 106)).await;
    wait_for(&control, Event::Button(1, false)).await;

    assert!(counter.frames() >= 1);
    assert_eq!(counter.last_size(), Some((96, 64)));
    assert!(queue.is_empty());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), viewer)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let report = session.shutdown().await;
    assert_eq!(report.commands_applied, 1);
}

#[tokio::test]
async fn test_reconnecting_client_survives_session_end() {
    let (system, control, window) = shared_window();
    let host = SessionHost::bind(system, loopback_config()).await.unwrap();

    let mut config = loopback_config();
    config.network.video_port = host.video_addr().unwrap().port();
    config.network.input_port = host.input_addr().unwrap().port();

    let counter = FrameCounter::new();
    let mut client = ReconnectingClient::new(config, counter.clone());
    let queue = client.input_queue();

    let cancel = CancellationToken::new();
    let viewer = tokio::spawn({
        let cancel = cancel.clone();
        async move { client.run(cancel).await }
    });

    let first = host.start(window).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), async {
        while counter.frames() == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    let first_report = first.shutdown().await;
    let frames_before = counter.frames();

    // Both channels were torn down, the viewer has to reconnect both
    let second = tokio::time::timeout(Duration::from_secs(10), host.start(window))
        .await
        .unwrap()
        .unwrap();
    control.clear_events();
    queue.click(7, 8, Default::default());
    wait_for(&control, Event::Button(1, false)).await;

    assert!(control.events().contains(&Event::Warp(207, 108)));
    assert!(counter.frames() > frames_before);
    assert_eq!(first_report.commands_applied, 0);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), viewer)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let second_report = second.shutdown().await;
    assert_eq!(second_report.commands_applied, 1);
}

#[tokio::test]
async fn test_undecodable_frame_is_skipped() {
    let video_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let input_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();

    let mut config = loopback_config();
    config.network.video_port = video_listener.local_addr().unwrap().port();
    config.network.input_port = input_listener.local_addr().unwrap().port();

    let counter = FrameCounter::new();
    let mut client = ReconnectingClient::new(config, counter.clone());
    client.input_queue().key("a");

    let cancel = CancellationToken::new();
    let viewer = tokio::spawn({
        let cancel = cancel.clone();
        async move { client.run(cancel).await }
    });

    let (video, input) = tokio::join!(video_listener.accept(), input_listener.accept());
    let (mut video, _) = video.unwrap();
    let (input, _) = input.unwrap();

    let jpeg = JpegCodec::new(80)
        .encode(&RawImage::new(8, 8, vec![200; 8 * 8 * 4]))
        .unwrap();
    write_message(&mut video, b"garbage").await.unwrap();
    write_message(&mut video, &jpeg).await.unwrap();

    let mut commands = MessageReader::new(input, MAX_COMMAND_SIZE);
    let payload = tokio::time::timeout(Duration::from_secs(5), commands.recv())
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(
        InputCommand::from_json(&payload).unwrap(),
        InputCommand::Key { ref key } if key == "a"
    ));

    tokio::time::timeout(Duration::from_secs(5), async {
        while counter.frames() == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(counter.frames(), 1);
    assert_eq!(counter.last_size(), Some((8, 8)));
    assert!(!viewer.is_finished());

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), viewer)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
