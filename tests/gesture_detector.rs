//! Integration tests for the edge gesture detector

mod common;

use std::time::Duration;

use common::{fake_system, ROOT};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use winrelay::config::GestureConfig;
use winrelay::gesture::EdgeGestureDetector;
use winrelay::window::WindowHandle;

fn config(threshold: u32) -> GestureConfig {
    GestureConfig {
        poll_interval_ms: 1,
        hold_threshold: threshold,
        ..GestureConfig::default()
    }
}

#[tokio::test]
async fn test_gesture_selects_active_window() {
    let (system, control) = fake_system(1920, 1080);
    let window = control.add_window(ROOT, 0x70, Some("Chat"), (100, 100, 400, 300));
    control.set_active(Some(window));
    control.set_pointer(1919, 500, true);

    let mut detector = EdgeGestureDetector::new(system, config(3));
    assert_eq!(detector.poll().await, None);
    assert_eq!(detector.poll().await, None);
    assert_eq!(detector.poll().await, Some(window));

    // Counter restarts after firing
    assert_eq!(detector.poll().await, None);
}

#[tokio::test]
async fn test_release_or_failure_resets_hold() {
    let (system, control) = fake_system(1920, 1080);
    control.set_active(Some(WindowHandle(0x71)));
    let mut detector = EdgeGestureDetector::new(system, config(3));

    control.set_pointer(0, 0, true);
    assert_eq!(detector.poll().await, None);
    assert_eq!(detector.poll().await, None);

    control.fail_pointer();
    assert_eq!(detector.poll().await, None);

    control.set_pointer(0, 0, true);
    assert_eq!(detector.poll().await, None);
    assert_eq!(detector.poll().await, None);

    // Button released away from the edge
    control.set_pointer(900, 500, false);
    assert_eq!(detector.poll().await, None);

    control.set_pointer(0, 0, true);
    assert_eq!(detector.poll().await, None);
    assert_eq!(detector.poll().await, None);
    assert_eq!(detector.poll().await, Some(WindowHandle(0x71)));
}

#[tokio::test]
async fn test_no_active_window_selects_nothing() {
    let (system, control) = fake_system(1920, 1080);
    control.set_pointer(500, 0, true);

    let mut detector = EdgeGestureDetector::new(system, config(1));
    assert_eq!(detector.poll().await, None);
}

#[tokio::test]
async fn test_run_reports_selection() {
    let (system, control) = fake_system(1920, 1080);
    control.set_active(Some(WindowHandle(0x72)));
    control.set_pointer(0, 1079, true);

    let (tx, mut rx) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let detector = EdgeGestureDetector::new(system, config(2));
    let task = tokio::spawn(detector.run(tx, cancel.clone()));

    let selected = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap();
    assert_eq!(selected, Some(WindowHandle(0x72)));

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test(flavor = "current_thread")]
async fn test_display_size_does_not_wait_for_capture() {
    let (system, _control) = fake_system(1920, 1080);

    // Hold the window-system lock on the blocking pool for a while
    let (held_tx, held_rx) = tokio::sync::oneshot::channel();
    let holder = tokio::spawn({
        let system = system.clone();
        async move {
            system
                .call(move |_| {
                    let _ = held_tx.send(());
                    std::thread::sleep(Duration::from_millis(400));
                    Ok(())
                })
                .await
        }
    });
    held_rx.await.unwrap();

    let start = std::time::Instant::now();
    let display = system.display_size();
    assert_eq!(system.root(), ROOT);
    assert!(start.elapsed() < Duration::from_millis(100));
    assert_eq!((display.width, display.height), (1920, 1080));

    holder.await.unwrap().unwrap();
}
